use std::io;
use thiserror::Error;

pub type HalResult<T> = Result<T, HalError>;
pub type PatcherResult<T> = Result<T, PatcherError>;

/// Failures reported by external collaborators (processes, probes, backends).
#[derive(Error, Debug)]
pub enum HalError {
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Command failed: {program} (exit={code:?}): {stderr}")]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Command timed out: {program} after {timeout_secs}s")]
    CommandTimeout { program: String, timeout_secs: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("UTF-8 decode error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    Other(String),
}

/// Internal inconsistencies. Fatal for the operation that hit them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Unknown GPU label: {0:?} (expected an AMD or Nvidia model, or \"None\")")]
    UnknownGpuLabel(String),

    #[error("Unknown feature flag: {0}")]
    UnknownFlag(String),

    #[error("Unknown OS version: {0}")]
    UnknownOsVersion(String),

    #[error("Unknown step: {0}")]
    UnknownStep(String),

    #[error("Step {step} requires a selection that was never made: {what}")]
    MissingSelection { step: String, what: &'static str },
}

#[derive(Error, Debug)]
pub enum PatcherError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Hal(#[from] HalError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Settings error: {0}")]
    Settings(String),
}

impl PatcherError {
    /// True when the error is an internal inconsistency rather than an operational failure.
    pub fn is_configuration(&self) -> bool {
        matches!(self, PatcherError::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_are_flagged() {
        let err: PatcherError = ConfigurationError::UnknownGpuLabel("Intel".into()).into();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("Intel"));

        let err: PatcherError = HalError::Other("boom".into()).into();
        assert!(!err.is_configuration());
    }

    #[test]
    fn command_failed_message_includes_exit_code() {
        let err = HalError::CommandFailed {
            program: "helper".into(),
            code: Some(3),
            stderr: "nope".into(),
        };
        assert_eq!(
            err.to_string(),
            "Command failed: helper (exit=Some(3)): nope"
        );
    }
}
