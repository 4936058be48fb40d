use bootpatch_error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Flags returned by the defaults prober; only the listed flags are overwritten.
pub type FlagSet = BTreeMap<FeatureFlag, bool>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureFlag {
    AllowNativeModels,
    VerboseDebug,
    KextDebug,
    FirmwareDebug,
    SipEnabled,
    SecureBootEnabled,
    ShowBootPicker,
    LegacyAccelEnabled,
    FireWireBoot,
    NvmeBoot,
    WakeOnWlan,
    DisableThunderbolt,
    Ts2Accel,
    WindowsGmux,
    HibernationWorkaround,
    DisableBatteryThrottling,
    SoftwareDemux,
    DisableCpuFriend,
    AlcUsage,
}

impl FeatureFlag {
    pub const ALL: [FeatureFlag; 19] = [
        FeatureFlag::AllowNativeModels,
        FeatureFlag::VerboseDebug,
        FeatureFlag::KextDebug,
        FeatureFlag::FirmwareDebug,
        FeatureFlag::SipEnabled,
        FeatureFlag::SecureBootEnabled,
        FeatureFlag::ShowBootPicker,
        FeatureFlag::LegacyAccelEnabled,
        FeatureFlag::FireWireBoot,
        FeatureFlag::NvmeBoot,
        FeatureFlag::WakeOnWlan,
        FeatureFlag::DisableThunderbolt,
        FeatureFlag::Ts2Accel,
        FeatureFlag::WindowsGmux,
        FeatureFlag::HibernationWorkaround,
        FeatureFlag::DisableBatteryThrottling,
        FeatureFlag::SoftwareDemux,
        FeatureFlag::DisableCpuFriend,
        FeatureFlag::AlcUsage,
    ];

    /// Flags shown on the main settings page, in display order.
    pub const GENERAL: [FeatureFlag; 8] = [
        FeatureFlag::AllowNativeModels,
        FeatureFlag::VerboseDebug,
        FeatureFlag::KextDebug,
        FeatureFlag::FirmwareDebug,
        FeatureFlag::SipEnabled,
        FeatureFlag::SecureBootEnabled,
        FeatureFlag::ShowBootPicker,
        FeatureFlag::LegacyAccelEnabled,
    ];

    /// Flags shown on the developer settings page, in display order.
    pub const DEVELOPER: [FeatureFlag; 11] = [
        FeatureFlag::FireWireBoot,
        FeatureFlag::NvmeBoot,
        FeatureFlag::WakeOnWlan,
        FeatureFlag::DisableThunderbolt,
        FeatureFlag::Ts2Accel,
        FeatureFlag::WindowsGmux,
        FeatureFlag::HibernationWorkaround,
        FeatureFlag::DisableBatteryThrottling,
        FeatureFlag::SoftwareDemux,
        FeatureFlag::DisableCpuFriend,
        FeatureFlag::AlcUsage,
    ];

    /// Checkbox label.
    pub fn label(&self) -> &'static str {
        match self {
            FeatureFlag::AllowNativeModels => "Allow native models",
            FeatureFlag::VerboseDebug => "Verbose",
            FeatureFlag::KextDebug => "Kext Debug",
            FeatureFlag::FirmwareDebug => "OpenCore Debug",
            FeatureFlag::SipEnabled => "SIP",
            FeatureFlag::SecureBootEnabled => "SecureBootModel",
            FeatureFlag::ShowBootPicker => "Show Boot Picker",
            FeatureFlag::LegacyAccelEnabled => "Allow Accel on 10.14/15",
            FeatureFlag::FireWireBoot => "FireWire Boot",
            FeatureFlag::NvmeBoot => "NVMe Boot",
            FeatureFlag::WakeOnWlan => "Wake on WLAN",
            FeatureFlag::DisableThunderbolt => "Disable Thunderbolt",
            FeatureFlag::Ts2Accel => "Set TeraScale 2 Accel",
            FeatureFlag::WindowsGmux => "Windows GMUX",
            FeatureFlag::HibernationWorkaround => "Hibernation Workaround",
            FeatureFlag::DisableBatteryThrottling => "Disable Battery Throttling",
            FeatureFlag::SoftwareDemux => "Software Demux",
            FeatureFlag::DisableCpuFriend => "Disable CPUFriend",
            FeatureFlag::AlcUsage => "AppleALC Usage",
        }
    }

    /// Stable name used in settings files and on the command line.
    pub fn key(&self) -> &'static str {
        match self {
            FeatureFlag::AllowNativeModels => "allow_native_models",
            FeatureFlag::VerboseDebug => "verbose_debug",
            FeatureFlag::KextDebug => "kext_debug",
            FeatureFlag::FirmwareDebug => "firmware_debug",
            FeatureFlag::SipEnabled => "sip_enabled",
            FeatureFlag::SecureBootEnabled => "secure_boot_enabled",
            FeatureFlag::ShowBootPicker => "show_boot_picker",
            FeatureFlag::LegacyAccelEnabled => "legacy_accel_enabled",
            FeatureFlag::FireWireBoot => "fire_wire_boot",
            FeatureFlag::NvmeBoot => "nvme_boot",
            FeatureFlag::WakeOnWlan => "wake_on_wlan",
            FeatureFlag::DisableThunderbolt => "disable_thunderbolt",
            FeatureFlag::Ts2Accel => "ts2_accel",
            FeatureFlag::WindowsGmux => "windows_gmux",
            FeatureFlag::HibernationWorkaround => "hibernation_workaround",
            FeatureFlag::DisableBatteryThrottling => "disable_battery_throttling",
            FeatureFlag::SoftwareDemux => "software_demux",
            FeatureFlag::DisableCpuFriend => "disable_cpu_friend",
            FeatureFlag::AlcUsage => "alc_usage",
        }
    }

    /// Value a fresh session starts with before the defaults prober runs.
    pub fn initial_value(&self) -> bool {
        matches!(
            self,
            FeatureFlag::SipEnabled
                | FeatureFlag::SecureBootEnabled
                | FeatureFlag::ShowBootPicker
                | FeatureFlag::AlcUsage
        )
    }
}

impl fmt::Display for FeatureFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FeatureFlag {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureFlag::ALL
            .iter()
            .copied()
            .find(|flag| flag.key() == s)
            .ok_or_else(|| ConfigurationError::UnknownFlag(s.to_string()))
    }
}

pub fn initial_flags() -> FlagSet {
    FeatureFlag::ALL
        .iter()
        .map(|flag| (*flag, flag.initial_value()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_flag_appears_on_exactly_one_settings_page() {
        for flag in FeatureFlag::ALL {
            let general = FeatureFlag::GENERAL.contains(&flag);
            let developer = FeatureFlag::DEVELOPER.contains(&flag);
            assert!(general ^ developer, "{flag} must be on exactly one page");
        }
    }

    #[test]
    fn keys_round_trip_through_from_str() {
        for flag in FeatureFlag::ALL {
            assert_eq!(flag.key().parse::<FeatureFlag>().unwrap(), flag);
        }
        assert_eq!(
            "warp_drive".parse::<FeatureFlag>(),
            Err(ConfigurationError::UnknownFlag("warp_drive".into()))
        );
    }
}
