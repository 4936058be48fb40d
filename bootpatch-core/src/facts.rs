use crate::models;
use crate::os::OsRelease;
use std::collections::BTreeMap;

/// Patch name -> whether the patch applies to this system.
///
/// Sorted by name. The detector reports a JSON object, which carries no
/// order, so the patch list renders alphabetically and identically on
/// every entry to the menu.
pub type PatchSet = BTreeMap<String, bool>;

/// Facts detected once at session start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemFacts {
    pub detected_model: String,
    pub detected_os: OsRelease,
}

impl SystemFacts {
    pub fn new(detected_model: impl Into<String>, detected_os: OsRelease) -> Self {
        Self {
            detected_model: detected_model.into(),
            detected_os,
        }
    }

    pub fn detected_model_supported(&self) -> bool {
        models::is_supported(&self.detected_model)
    }
}

/// Names of patches that apply. Entries prefixed with `Settings` are
/// configuration echoes from the detector, not patches.
pub fn applicable_patches(patches: &PatchSet) -> Vec<&str> {
    patches
        .iter()
        .filter(|(name, applies)| **applies && !name.starts_with("Settings"))
        .map(|(name, _)| name.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_entries_are_not_patches() {
        let patches: PatchSet = [
            ("Graphics: Nvidia Tesla".to_string(), true),
            ("Settings: Requires AMFIPass".to_string(), true),
            ("Audio: Legacy Realtek".to_string(), false),
        ]
        .into_iter()
        .collect();
        assert_eq!(applicable_patches(&patches), vec!["Graphics: Nvidia Tesla"]);
    }

    #[test]
    fn applicable_patches_are_listed_by_name() {
        let reported = [
            ("Networking: Legacy WiFi", true),
            ("Graphics: Nvidia Kepler", true),
            ("Audio: Legacy Realtek", true),
            ("Brightness: Legacy Backlight", false),
        ];
        let forward: PatchSet = reported
            .iter()
            .map(|(name, applies)| (name.to_string(), *applies))
            .collect();
        let backward: PatchSet = reported
            .iter()
            .rev()
            .map(|(name, applies)| (name.to_string(), *applies))
            .collect();

        let expected = vec![
            "Audio: Legacy Realtek",
            "Graphics: Nvidia Kepler",
            "Networking: Legacy WiFi",
        ];
        assert_eq!(applicable_patches(&forward), expected);
        assert_eq!(applicable_patches(&backward), expected);
    }
}
