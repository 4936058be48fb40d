//! macOS release identification.
//!
//! Releases are compared by their Darwin kernel major number, so ordering
//! follows release order (High Sierra < Mojave < ... < Monterey).

use bootpatch_error::ConfigurationError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OsRelease(u8);

impl OsRelease {
    pub const EL_CAPITAN: OsRelease = OsRelease(15);
    pub const SIERRA: OsRelease = OsRelease(16);
    pub const HIGH_SIERRA: OsRelease = OsRelease(17);
    pub const MOJAVE: OsRelease = OsRelease(18);
    pub const CATALINA: OsRelease = OsRelease(19);
    pub const BIG_SUR: OsRelease = OsRelease(20);
    pub const MONTEREY: OsRelease = OsRelease(21);

    pub const fn from_darwin(major: u8) -> Self {
        OsRelease(major)
    }

    pub fn darwin_major(&self) -> u8 {
        self.0
    }

    /// Parse a product version such as `10.15.7`, `11.6` or `12`.
    pub fn from_product_version(version: &str) -> Result<Self, ConfigurationError> {
        let invalid = || ConfigurationError::UnknownOsVersion(version.to_string());
        let mut parts = version.trim().split('.');
        let major: u8 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        match major {
            10 => {
                let minor: u8 = parts
                    .next()
                    .and_then(|p| p.parse().ok())
                    .ok_or_else(invalid)?;
                if minor < 4 {
                    return Err(invalid());
                }
                let darwin = minor.checked_add(4).ok_or_else(invalid)?;
                Ok(OsRelease(darwin))
            }
            11..=40 => Ok(OsRelease(major + 9)),
            _ => Err(invalid()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self.0 {
            15 => "El Capitan",
            16 => "Sierra",
            17 => "High Sierra",
            18 => "Mojave",
            19 => "Catalina",
            20 => "Big Sur",
            21 => "Monterey",
            n if n < 15 => "legacy macOS",
            _ => "newer macOS",
        }
    }
}

impl fmt::Display for OsRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Darwin {})", self.name(), self.0)
    }
}

impl FromStr for OsRelease {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase().replace([' ', '_', '-'], "");
        let named = match lowered.as_str() {
            "elcapitan" => Some(OsRelease::EL_CAPITAN),
            "sierra" => Some(OsRelease::SIERRA),
            "highsierra" => Some(OsRelease::HIGH_SIERRA),
            "mojave" => Some(OsRelease::MOJAVE),
            "catalina" => Some(OsRelease::CATALINA),
            "bigsur" => Some(OsRelease::BIG_SUR),
            "monterey" => Some(OsRelease::MONTEREY),
            _ => None,
        };
        match named {
            Some(release) => Ok(release),
            None => OsRelease::from_product_version(s),
        }
    }
}
