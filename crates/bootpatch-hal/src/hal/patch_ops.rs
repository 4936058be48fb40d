//! Root volume patch detection, application and reversal.

use super::ExitInfo;
use crate::HalResult;
use bootpatch_core::{ConfigurationRecord, PatchSet, Progress};

pub trait PatchOps {
    /// Patches the running system would receive, keyed by patch name.
    fn detect_patches(&self, model: &str, record: &ConfigurationRecord) -> HalResult<PatchSet>;

    fn apply_patches(&self, out: &mut dyn Progress) -> HalResult<ExitInfo>;

    /// Roll the root volume back to its last sealed snapshot.
    fn revert_patches(&self, out: &mut dyn Progress) -> HalResult<ExitInfo>;
}
