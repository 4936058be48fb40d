//! bootpatch collaborator layer.
//!
//! Everything that touches the outside world (launching the patcher, asking
//! it for disks, installers and patches) goes through the traits in [`hal`],
//! so the workflow can be driven against [`hal::FakeHal`] in tests.

pub mod hal;

pub use bootpatch_error::{HalError, HalResult};
pub use hal::{CommandBackend, ExitInfo, FakeHal, Operation, SystemHal};
