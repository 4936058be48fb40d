//! Session configuration record and the store that guards its invariants.

use crate::flags::{initial_flags, FeatureFlag, FlagSet};
use crate::gpu::{GpuOverride, GpuSelection};
use crate::relay::Progress;
use bootpatch_error::{ConfigurationError, HalResult};
use std::fmt;

/// Supplies default flag values for a model.
pub trait DefaultsProbe {
    fn probe_defaults(&self, model: &str, is_detected: bool) -> HalResult<FlagSet>;
}

/// SMBIOS serial handling; follows AllowNativeModels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialPolicy {
    Minimal,
    None,
}

impl SerialPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SerialPolicy::Minimal => "Minimal",
            SerialPolicy::None => "None",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildVariant {
    Release,
    Debug,
}

impl fmt::Display for BuildVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildVariant::Release => f.write_str("RELEASE"),
            BuildVariant::Debug => f.write_str("DEBUG"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationRecord {
    target_model: Option<String>,
    detected_model: String,
    flags: FlagSet,
    gpu_override: GpuOverride,
    serial_policy: SerialPolicy,
}

impl ConfigurationRecord {
    pub fn target_model(&self) -> Option<&str> {
        self.target_model.as_deref()
    }

    pub fn detected_model(&self) -> &str {
        &self.detected_model
    }

    /// Model the payload is built for.
    pub fn effective_model(&self) -> &str {
        self.target_model.as_deref().unwrap_or(&self.detected_model)
    }

    pub fn flag(&self, flag: FeatureFlag) -> bool {
        self.flags.get(&flag).copied().unwrap_or(false)
    }

    pub fn flags(&self) -> &FlagSet {
        &self.flags
    }

    pub fn gpu_override(&self) -> GpuOverride {
        self.gpu_override
    }

    pub fn gpu_selection(&self) -> GpuSelection {
        self.gpu_override.selection()
    }

    pub fn serial_policy(&self) -> SerialPolicy {
        self.serial_policy
    }

    pub fn build_variant(&self) -> BuildVariant {
        if self.flag(FeatureFlag::FirmwareDebug) {
            BuildVariant::Debug
        } else {
            BuildVariant::Release
        }
    }
}

/// Owns the session's [`ConfigurationRecord`]; every mutation goes through here.
#[derive(Debug, Clone)]
pub struct ConfigurationStore {
    record: ConfigurationRecord,
}

impl ConfigurationStore {
    pub fn new(detected_model: impl Into<String>) -> Self {
        let flags = initial_flags();
        let serial_policy = serial_policy_for(FeatureFlag::AllowNativeModels.initial_value());
        Self {
            record: ConfigurationRecord {
                target_model: None,
                detected_model: detected_model.into(),
                flags,
                gpu_override: GpuOverride::None,
                serial_policy,
            },
        }
    }

    pub fn record(&self) -> &ConfigurationRecord {
        &self.record
    }

    pub fn get(&self, flag: FeatureFlag) -> bool {
        self.record.flag(flag)
    }

    pub fn effective_model(&self) -> &str {
        self.record.effective_model()
    }

    pub fn set(&mut self, flag: FeatureFlag, value: bool, out: &mut dyn Progress) {
        self.write_flag(flag, value);
        let state = if value { "enabled" } else { "disabled" };
        log::info!("{} {}", flag.label(), state);
        out.line(&format!("{} {}", flag.label(), state));
        if flag == FeatureFlag::AllowNativeModels {
            log::debug!("serial policy now {}", self.record.serial_policy.as_str());
        }
    }

    /// Flip a flag and return its new value.
    pub fn toggle(&mut self, flag: FeatureFlag, out: &mut dyn Progress) -> bool {
        let value = !self.get(flag);
        self.set(flag, value, out);
        value
    }

    /// Overwrite the listed flags without echoing each one.
    pub fn apply_defaults(&mut self, defaults: &FlagSet) {
        for (flag, value) in defaults {
            self.write_flag(*flag, *value);
        }
    }

    /// Choose the model to build for and reload its defaults.
    ///
    /// Picking the detected model clears the custom target. The record is left
    /// untouched when the prober fails.
    pub fn set_target_model(
        &mut self,
        model: &str,
        prober: &dyn DefaultsProbe,
        out: &mut dyn Progress,
    ) -> HalResult<()> {
        let is_detected = model == self.record.detected_model;
        let defaults = prober.probe_defaults(model, is_detected)?;
        if is_detected {
            self.record.target_model = None;
            out.line(&format!("Using Real Model: {}", model));
            log::info!("Using Real Model: {}", model);
        } else {
            self.record.target_model = Some(model.to_string());
            out.line(&format!("Using Custom Model: {}", model));
            log::info!("Using Custom Model: {}", model);
        }
        self.apply_defaults(&defaults);
        Ok(())
    }

    pub fn set_gpu_override(&mut self, gpu: GpuOverride, out: &mut dyn Progress) {
        self.record.gpu_override = gpu;
        let selection = gpu.selection();
        log::info!(
            "GPU override: vendor={} model={:?} metal={}",
            selection.vendor,
            selection.model,
            selection.metal_build
        );
        out.line(&format!("GPU Vendor: {}", selection.vendor));
        if let Some(model) = selection.model {
            out.line(&format!("GPU Model: {}", model));
        }
    }

    pub fn select_gpu_label(
        &mut self,
        label: &str,
        out: &mut dyn Progress,
    ) -> Result<GpuOverride, ConfigurationError> {
        let gpu = GpuOverride::from_label(label)?;
        self.set_gpu_override(gpu, out);
        Ok(gpu)
    }

    fn write_flag(&mut self, flag: FeatureFlag, value: bool) {
        self.record.flags.insert(flag, value);
        if flag == FeatureFlag::AllowNativeModels {
            self.record.serial_policy = serial_policy_for(value);
        }
    }
}

fn serial_policy_for(allow_native: bool) -> SerialPolicy {
    if allow_native {
        SerialPolicy::None
    } else {
        SerialPolicy::Minimal
    }
}
