use std::fs;
use std::path::{Path, PathBuf};

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .to_path_buf()
}

fn manifest(dir: &Path) -> toml::Value {
    let text = fs::read_to_string(dir.join("Cargo.toml")).unwrap();
    toml::from_str(&text).unwrap()
}

fn rust_sources(dir: &Path, out: &mut String) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            rust_sources(&path, out);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            out.push_str(&fs::read_to_string(&path).unwrap());
        }
    }
}

#[test]
fn release_profile_is_a_top_level_profile() {
    let root = manifest(&workspace_root());
    let release = root
        .get("profile")
        .and_then(|p| p.get("release"))
        .expect("[profile.release] is missing");
    assert_eq!(release.get("lto").and_then(|v| v.as_str()), Some("thin"));
    assert_eq!(release.get("codegen-units").and_then(|v| v.as_integer()), Some(1));
    assert!(root.get("workspace").unwrap().get("profile").is_none());
}

#[test]
fn every_dev_dependency_is_used() {
    let root_dir = workspace_root();
    let root = manifest(&root_dir);
    let members = root["workspace"]["members"].as_array().unwrap();
    for member in members {
        let dir = root_dir.join(member.as_str().unwrap());
        let Some(dev) = manifest(&dir).get("dev-dependencies").cloned() else {
            continue;
        };
        let mut sources = String::new();
        rust_sources(&dir.join("src"), &mut sources);
        rust_sources(&dir.join("tests"), &mut sources);
        for name in dev.as_table().unwrap().keys() {
            let ident = name.replace('-', "_");
            assert!(
                sources.contains(&format!("{}::", ident)),
                "{} lists unused dev-dependency {}",
                dir.display(),
                name
            );
        }
    }
}
