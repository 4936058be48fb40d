use bootpatch_core::FeatureFlag;
use bootpatch_hal::hal::{DiskInfo, FakeFailure, LocalInstaller};
use bootpatch_hal::{FakeHal, Operation};
use bootpatch_tui::app::{App, InputResult};
use bootpatch_tui::demo::demo_hal;
use bootpatch_workflow::{ActionEnv, Session, SessionOptions, StepId};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use std::path::PathBuf;

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent {
        code,
        modifiers: KeyModifiers::NONE,
        kind: KeyEventKind::Press,
        state: KeyEventState::NONE,
    }
}

fn app_with(hal: FakeHal) -> App {
    let session = Session::start(&hal, &SessionOptions::default()).unwrap();
    let env = ActionEnv {
        payload_path: PathBuf::from("/tmp/payloads"),
        installer_sh_path: PathBuf::from("/tmp/payloads/Installer.sh"),
        catalog_seed: "PublicSeed".to_string(),
    };
    App::new(Box::new(hal), session, env).unwrap()
}

fn press(app: &mut App, codes: &[KeyCode]) {
    for code in codes {
        assert_eq!(app.handle_input(key(*code)), InputResult::Continue);
    }
}

#[test]
fn demo_flow_builds_and_installs() {
    let hal = demo_hal();
    let mut app = app_with(hal.clone());
    assert_eq!(app.current_step(), StepId::MainMenu);

    press(&mut app, &[KeyCode::Enter]);
    assert_eq!(app.current_step(), StepId::BuildInstall);

    press(&mut app, &[KeyCode::Enter]);
    assert_eq!(app.current_step(), StepId::BuildRun);
    assert!(hal.has_operation(|op| matches!(op, Operation::Build { model, .. } if model == "MacPro5,1")));
    assert_eq!(app.status_message, "Finished");

    // BuildRun offers "Install OpenCore" before its exit.
    press(&mut app, &[KeyCode::Enter]);
    assert_eq!(app.current_step(), StepId::InstallDisks);
    press(&mut app, &[KeyCode::Enter]);
    assert_eq!(app.current_step(), StepId::InstallPartitions);
    press(&mut app, &[KeyCode::Enter]);
    assert_eq!(app.current_step(), StepId::InstallRun);
    assert_eq!(hal.count("install_to"), 1);

    press(&mut app, &[KeyCode::Esc]);
    assert_eq!(app.current_step(), StepId::MainMenu);
}

#[test]
fn cursor_starts_on_first_selectable_entry() {
    let mut app = app_with(FakeHal::new());
    press(&mut app, &[KeyCode::Enter, KeyCode::Down, KeyCode::Enter]);
    assert_eq!(app.current_step(), StepId::InstallDisks);

    // Only the placeholder and hint are listed, so the cursor lands on the exit.
    assert_eq!(app.selected, app.view.entries.len());
    press(&mut app, &[KeyCode::Enter]);
    assert_eq!(app.current_step(), StepId::MainMenu);
}

#[test]
fn settings_toggle_reports_new_state() {
    let mut app = app_with(FakeHal::new());
    press(&mut app, &[KeyCode::Down, KeyCode::Down, KeyCode::Down, KeyCode::Enter]);
    assert_eq!(app.current_step(), StepId::Settings);

    press(&mut app, &[KeyCode::Down, KeyCode::Down, KeyCode::Enter]);
    assert!(app.session.store.get(FeatureFlag::VerboseDebug));
    assert_eq!(app.status_message, "Verbose enabled");
    assert_eq!(app.current_step(), StepId::Settings);
}

#[test]
fn denied_entry_shows_reason() {
    let hal = FakeHal::new().with_facts("MacPro7,1", bootpatch_core::OsRelease::MONTEREY);
    let mut app = app_with(hal.clone());
    // The build entry is greyed out, so the cursor skips it.
    assert_eq!(app.selected, 1);
    app.selected = 0;
    press(&mut app, &[KeyCode::Enter]);

    assert_eq!(app.current_step(), StepId::MainMenu);
    assert!(app.status_message.contains("Allow Native Models"));
    assert_eq!(hal.count("build"), 0);
}

#[test]
fn failed_selection_still_shows_the_step_it_reached() {
    let hal = FakeHal::new()
        .with_local_installers(vec![LocalInstaller {
            name: "Install macOS Monterey".into(),
            version: "12.6".into(),
            build: "21G115".into(),
            path: PathBuf::from("/Applications/Install macOS Monterey.app"),
        }])
        .with_usb_disks(vec![DiskInfo {
            id: "disk4".into(),
            name: "USB Stick".into(),
            size_bytes: 32_000_000_000,
        }]);
    let mut app = app_with(hal.clone());
    press(&mut app, &[KeyCode::Down, KeyCode::Down, KeyCode::Enter]);
    assert_eq!(app.current_step(), StepId::CreateInstallerMenu);
    press(&mut app, &[KeyCode::Down, KeyCode::Enter]);
    assert_eq!(app.current_step(), StepId::LocalInstallers);
    press(&mut app, &[KeyCode::Enter]);
    assert_eq!(app.current_step(), StepId::UsbDisks);

    app.session.scratch.installer = None;
    press(&mut app, &[KeyCode::Enter]);

    assert!(app.status_message.starts_with("Error:"));
    assert_eq!(app.session.current, StepId::InstallerFlash);
    assert_eq!(app.current_step(), StepId::InstallerFlash);
    assert!(app.selected < app.row_count());
    assert_eq!(hal.count("generate_creation_script"), 0);

    press(&mut app, &[KeyCode::Esc]);
    assert_eq!(app.current_step(), StepId::MainMenu);
}

#[test]
fn failed_action_keeps_step_and_reports_failure() {
    let hal = FakeHal::new().fail("build", FakeFailure::Exit(1));
    let mut app = app_with(hal);
    press(&mut app, &[KeyCode::Enter, KeyCode::Enter]);

    assert_eq!(app.current_step(), StepId::BuildRun);
    assert_eq!(app.status_message, "Failed, see output");
    assert_eq!(app.relay.depth(), 0);
}

#[test]
fn q_quits_and_release_events_are_ignored() {
    let mut app = app_with(FakeHal::new());
    let mut release = key(KeyCode::Enter);
    release.kind = KeyEventKind::Release;
    assert_eq!(app.handle_input(release), InputResult::Continue);
    assert_eq!(app.current_step(), StepId::MainMenu);

    assert_eq!(app.handle_input(key(KeyCode::Char('q'))), InputResult::Quit);
}
