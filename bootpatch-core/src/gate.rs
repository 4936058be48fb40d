//! Capability gates: pure predicates deciding whether a step or transition
//! may be taken, with the reason shown when it may not.
//!
//! Gates never mutate anything. They are re-evaluated every time a step is
//! entered, so a settings change immediately changes what is offered.

use crate::config::ConfigurationRecord;
use crate::facts::{applicable_patches, PatchSet, SystemFacts};
use crate::flags::FeatureFlag;
use crate::os::OsRelease;

pub const BUILD_UNSUPPORTED_REASON: &str = "If building for a native Mac model, select 'Allow Native Models' in Settings. If building for another Mac, change model in Settings";
pub const ROOT_PATCH_TOO_OLD_REASON: &str = "Root patching is only available for Mojave and newer";
pub const ROOT_PATCH_EXPERIMENTAL_REASON: &str = "Graphics acceleration for Mojave and Catalina is experimental; enable 'Allow Accel on 10.14/15' in Settings";
pub const REVERT_TOO_OLD_REASON: &str = "Reverting root patches requires Big Sur or newer";
pub const NO_PATCHES_REASON: &str = "No applicable patches available";

/// Primitive predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    FlagEnabled(FeatureFlag),
    FlagDisabled(FeatureFlag),
    CustomModelSelected,
    DetectedModelSupported,
    OsAtLeast(OsRelease),
    /// Detected release falls outside `from..=to`.
    OsOutside { from: OsRelease, to: OsRelease },
    PatchesAvailable,
}

impl Check {
    fn holds(&self, ctx: &GateContext<'_>) -> bool {
        match self {
            Check::FlagEnabled(flag) => ctx.record.flag(*flag),
            Check::FlagDisabled(flag) => !ctx.record.flag(*flag),
            Check::CustomModelSelected => ctx.record.target_model().is_some(),
            Check::DetectedModelSupported => ctx.facts.detected_model_supported(),
            Check::OsAtLeast(release) => ctx.facts.detected_os >= *release,
            Check::OsOutside { from, to } => {
                ctx.facts.detected_os < *from || ctx.facts.detected_os > *to
            }
            Check::PatchesAvailable => ctx
                .patches
                .map(|patches| !applicable_patches(patches).is_empty())
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    Always,
    Check {
        check: Check,
        reason: Option<&'static str>,
    },
    /// Every clause must pass; the first failing clause supplies the reason.
    All(Vec<Gate>),
    /// One clause must pass; `reason` overrides the clauses' own reasons.
    Any {
        clauses: Vec<Gate>,
        reason: Option<&'static str>,
    },
}

/// Everything a gate may look at.
#[derive(Debug, Clone, Copy)]
pub struct GateContext<'a> {
    pub record: &'a ConfigurationRecord,
    pub facts: &'a SystemFacts,
    pub patches: Option<&'a PatchSet>,
}

impl<'a> GateContext<'a> {
    pub fn new(record: &'a ConfigurationRecord, facts: &'a SystemFacts) -> Self {
        Self {
            record,
            facts,
            patches: None,
        }
    }

    pub fn with_patches(mut self, patches: Option<&'a PatchSet>) -> Self {
        self.patches = patches;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateResult {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl GateResult {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn denied(reason: Option<&str>) -> Self {
        Self {
            allowed: false,
            reason: reason.map(str::to_string),
        }
    }
}

impl Gate {
    pub fn check(check: Check, reason: &'static str) -> Self {
        Gate::Check {
            check,
            reason: Some(reason),
        }
    }

    pub fn evaluate(&self, ctx: &GateContext<'_>) -> GateResult {
        match self {
            Gate::Always => GateResult::allowed(),
            Gate::Check { check, reason } => {
                if check.holds(ctx) {
                    GateResult::allowed()
                } else {
                    GateResult::denied(*reason)
                }
            }
            Gate::All(clauses) => clauses
                .iter()
                .map(|clause| clause.evaluate(ctx))
                .find(|result| !result.allowed)
                .unwrap_or_else(GateResult::allowed),
            Gate::Any { clauses, reason } => {
                let mut first_denial = None;
                for clause in clauses {
                    let result = clause.evaluate(ctx);
                    if result.allowed {
                        return result;
                    }
                    first_denial.get_or_insert(result);
                }
                match (reason, first_denial) {
                    (Some(reason), _) => GateResult::denied(Some(reason)),
                    (None, Some(denial)) => denial,
                    (None, None) => GateResult::denied(None),
                }
            }
        }
    }
}

pub fn evaluate(gate: &Gate, ctx: &GateContext<'_>) -> GateResult {
    gate.evaluate(ctx)
}

/// Building is blocked only for an unsupported detected model with no
/// custom target and native models disallowed.
pub fn build_gate() -> Gate {
    Gate::Any {
        clauses: vec![
            Gate::Check {
                check: Check::FlagEnabled(FeatureFlag::AllowNativeModels),
                reason: None,
            },
            Gate::Check {
                check: Check::CustomModelSelected,
                reason: None,
            },
            Gate::Check {
                check: Check::DetectedModelSupported,
                reason: None,
            },
        ],
        reason: Some(BUILD_UNSUPPORTED_REASON),
    }
}

pub fn root_patch_gate() -> Gate {
    Gate::All(vec![
        Gate::check(Check::OsAtLeast(OsRelease::MOJAVE), ROOT_PATCH_TOO_OLD_REASON),
        Gate::Any {
            clauses: vec![
                Gate::Check {
                    check: Check::OsOutside {
                        from: OsRelease::MOJAVE,
                        to: OsRelease::CATALINA,
                    },
                    reason: None,
                },
                Gate::Check {
                    check: Check::FlagEnabled(FeatureFlag::LegacyAccelEnabled),
                    reason: None,
                },
            ],
            reason: Some(ROOT_PATCH_EXPERIMENTAL_REASON),
        },
    ])
}

pub fn revert_gate() -> Gate {
    Gate::check(Check::OsAtLeast(OsRelease::BIG_SUR), REVERT_TOO_OLD_REASON)
}

pub fn start_patch_gate() -> Gate {
    Gate::check(Check::PatchesAvailable, NO_PATCHES_REASON)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigurationStore;
    use crate::relay::{Sink, SinkMode};

    fn facts(model: &str, os: OsRelease) -> SystemFacts {
        SystemFacts::new(model, os)
    }

    #[test]
    fn build_gate_blocks_unsupported_native_model() {
        let facts = facts("MacBookPro8,1", OsRelease::BIG_SUR);
        let mut store = ConfigurationStore::new("MacBookPro8,1");
        let result = build_gate().evaluate(&GateContext::new(store.record(), &facts));
        assert!(!result.allowed);
        assert_eq!(result.reason.as_deref(), Some(BUILD_UNSUPPORTED_REASON));

        let mut out = Sink::new(SinkMode::Append);
        store.set(FeatureFlag::AllowNativeModels, true, &mut out);
        let result = build_gate().evaluate(&GateContext::new(store.record(), &facts));
        assert!(result.allowed);
        assert_eq!(result.reason, None);
    }

    #[test]
    fn build_gate_allows_supported_detected_model() {
        let facts = facts("iMac14,2", OsRelease::MONTEREY);
        let store = ConfigurationStore::new("iMac14,2");
        assert!(build_gate().evaluate(&GateContext::new(store.record(), &facts)).allowed);
    }

    #[test]
    fn root_patch_gate_by_release() {
        let store = ConfigurationStore::new("iMac14,2");

        let high_sierra = facts("iMac14,2", OsRelease::HIGH_SIERRA);
        let result = root_patch_gate().evaluate(&GateContext::new(store.record(), &high_sierra));
        assert_eq!(result.reason.as_deref(), Some(ROOT_PATCH_TOO_OLD_REASON));

        let catalina = facts("iMac14,2", OsRelease::CATALINA);
        let result = root_patch_gate().evaluate(&GateContext::new(store.record(), &catalina));
        assert!(!result.allowed);
        assert_eq!(result.reason.as_deref(), Some(ROOT_PATCH_EXPERIMENTAL_REASON));

        let big_sur = facts("iMac14,2", OsRelease::BIG_SUR);
        assert!(root_patch_gate()
            .evaluate(&GateContext::new(store.record(), &big_sur))
            .allowed);
    }

    #[test]
    fn legacy_accel_unlocks_mojave_and_catalina() {
        let mut store = ConfigurationStore::new("iMac14,2");
        let mut out = Sink::new(SinkMode::Append);
        store.set(FeatureFlag::LegacyAccelEnabled, true, &mut out);
        for os in [OsRelease::MOJAVE, OsRelease::CATALINA] {
            let facts = facts("iMac14,2", os);
            assert!(root_patch_gate()
                .evaluate(&GateContext::new(store.record(), &facts))
                .allowed);
        }
    }

    #[test]
    fn revert_gate_requires_big_sur() {
        let store = ConfigurationStore::new("iMac14,2");
        let catalina = facts("iMac14,2", OsRelease::CATALINA);
        let result = revert_gate().evaluate(&GateContext::new(store.record(), &catalina));
        assert_eq!(result.reason.as_deref(), Some(REVERT_TOO_OLD_REASON));
        let monterey = facts("iMac14,2", OsRelease::MONTEREY);
        assert!(revert_gate()
            .evaluate(&GateContext::new(store.record(), &monterey))
            .allowed);
    }

    #[test]
    fn start_patch_gate_ignores_settings_entries() {
        let store = ConfigurationStore::new("iMac14,2");
        let facts = facts("iMac14,2", OsRelease::MONTEREY);
        let only_settings: PatchSet = [("Settings: Requires AMFIPass".to_string(), true)]
            .into_iter()
            .collect();
        let ctx = GateContext::new(store.record(), &facts).with_patches(Some(&only_settings));
        assert!(!start_patch_gate().evaluate(&ctx).allowed);

        let ctx = GateContext::new(store.record(), &facts);
        assert!(!start_patch_gate().evaluate(&ctx).allowed);
    }

    #[test]
    fn evaluation_is_repeatable() {
        let store = ConfigurationStore::new("MacBookPro8,1");
        let facts = facts("MacBookPro8,1", OsRelease::CATALINA);
        let ctx = GateContext::new(store.record(), &facts);
        let gate = root_patch_gate();
        assert_eq!(evaluate(&gate, &ctx), evaluate(&gate, &ctx));
    }
}
