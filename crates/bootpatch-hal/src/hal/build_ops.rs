//! Boot-loader payload construction.

use super::ExitInfo;
use crate::HalResult;
use bootpatch_core::{ConfigurationRecord, Progress};

pub trait BuildOps {
    /// Build the payload for `model` using the session configuration.
    ///
    /// Progress lines are written to `out` as they are produced.
    fn build(
        &self,
        model: &str,
        record: &ConfigurationRecord,
        out: &mut dyn Progress,
    ) -> HalResult<ExitInfo>;
}
