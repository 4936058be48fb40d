//! Replacement GPU selection for machines with upgraded graphics cards.

use bootpatch_error::ConfigurationError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuOverride {
    #[default]
    None,
    NvidiaKepler,
    AmdGcn,
    AmdPolaris,
}

/// Vendor/model pair derived from a [`GpuOverride`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuSelection {
    pub vendor: &'static str,
    pub model: Option<&'static str>,
    pub metal_build: bool,
}

impl GpuOverride {
    pub const ALL: [GpuOverride; 4] = [
        GpuOverride::None,
        GpuOverride::NvidiaKepler,
        GpuOverride::AmdGcn,
        GpuOverride::AmdPolaris,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            GpuOverride::None => "None",
            GpuOverride::NvidiaKepler => "Nvidia Kepler",
            GpuOverride::AmdGcn => "AMD GCN",
            GpuOverride::AmdPolaris => "AMD Polaris",
        }
    }

    /// Resolve a free-form label by its vendor and model marker words.
    pub fn from_label(label: &str) -> Result<Self, ConfigurationError> {
        let unknown = || ConfigurationError::UnknownGpuLabel(label.to_string());
        if label.contains("AMD") {
            if label.contains("Polaris") {
                Ok(GpuOverride::AmdPolaris)
            } else if label.contains("GCN") {
                Ok(GpuOverride::AmdGcn)
            } else {
                Err(unknown())
            }
        } else if label.contains("Nvidia") {
            if label.contains("Kepler") {
                Ok(GpuOverride::NvidiaKepler)
            } else {
                Err(unknown())
            }
        } else if label == "None" {
            Ok(GpuOverride::None)
        } else {
            Err(unknown())
        }
    }

    pub fn selection(&self) -> GpuSelection {
        match self {
            GpuOverride::None => GpuSelection {
                vendor: "None",
                model: None,
                metal_build: false,
            },
            GpuOverride::NvidiaKepler => GpuSelection {
                vendor: "Nvidia",
                model: Some("Kepler"),
                metal_build: true,
            },
            GpuOverride::AmdGcn => GpuSelection {
                vendor: "AMD",
                model: Some("Legacy GCN"),
                metal_build: true,
            },
            GpuOverride::AmdPolaris => GpuSelection {
                vendor: "AMD",
                model: Some("Polaris"),
                metal_build: true,
            },
        }
    }
}

impl fmt::Display for GpuOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
