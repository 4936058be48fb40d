//! Host probing (model identifier and running OS release).

use crate::HalResult;
use bootpatch_core::SystemFacts;

pub trait HostProbeOps {
    /// Detect the machine model and running OS. Called once per session.
    fn detect_facts(&self) -> HalResult<SystemFacts>;
}
