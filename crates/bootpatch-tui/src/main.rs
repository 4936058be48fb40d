use anyhow::Context;
use bootpatch_core::cli::Cli;
use bootpatch_core::{logging, PatcherSettings};
use bootpatch_hal::{CommandBackend, SystemHal};
use bootpatch_tui::app::App;
use bootpatch_tui::demo::demo_hal;
use bootpatch_workflow::{ActionEnv, Session, SessionOptions, StepGraph};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = PatcherSettings::load(cli.config.as_deref())?;
    logging::init(&settings.log_path);
    log::info!("bootpatch {} starting", env!("CARGO_PKG_VERSION"));

    let hal: Box<dyn SystemHal> = if cli.demo {
        log::info!("Using the scripted demo backend");
        Box::new(demo_hal())
    } else {
        Box::new(CommandBackend::new(&settings))
    };
    let options = SessionOptions {
        model: cli.model.clone(),
        os: cli.os_version,
        flag_overrides: settings
            .flag_overrides()
            .context("Invalid flags in settings")?,
    };
    let session = Session::start(hal.as_ref(), &options).context("Failed to detect the host")?;

    if cli.dump_steps {
        print!("{}", StepGraph::standard().dump(&session));
        return Ok(());
    }

    let app = App::new(hal, session, ActionEnv::from_settings(&settings))?;
    bootpatch_tui::run(app)
}
