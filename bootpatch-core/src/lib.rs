//! Shared state and plumbing for the bootpatch workflow: the configuration
//! store, capability gates, output relay, and the settings/CLI/logging edges.

pub mod cli;
pub mod config;
pub mod facts;
pub mod flags;
pub mod gate;
pub mod gpu;
pub mod logging;
pub mod models;
pub mod os;
pub mod relay;
pub mod settings;

pub use config::{BuildVariant, ConfigurationRecord, ConfigurationStore, DefaultsProbe, SerialPolicy};
pub use facts::{PatchSet, SystemFacts};
pub use flags::{FeatureFlag, FlagSet};
pub use gate::{Gate, GateContext, GateResult};
pub use gpu::GpuOverride;
pub use os::OsRelease;
pub use relay::{OutputRelay, Progress, RelayScope, Sink, SinkMode, YieldPoint};
pub use settings::PatcherSettings;
