//! Infrastructure matching: how strongly a record's affected-package
//! data overlaps the declared environment.
//!
//! Containment rules follow the record's ecosystem: version-range
//! ordering when the ecosystem declares semantic versions, exact string
//! membership against explicit version sets otherwise. A record whose
//! ranges do not parse loses only its version evidence — it can still
//! reach the `Ecosystem` tier, and the malformed flag is counted by the
//! orchestrator's degradation summary instead of failing the query.

use serde::{Deserialize, Serialize};
use tracing::debug;
use vulnrank_core::model::{
    AffectedPackage, InfrastructureContext, InstalledPackage, MatchTier, Version, VersionSpec,
    VulnerabilityRecord,
};

/// Patch posture of a record relative to the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchStatus {
    /// No affected range names a fixed release anywhere.
    NoFix,
    /// A fix exists but the context does not (provably) run it.
    FixAvailable,
    /// The context's installed version is at or past a fixed release.
    FixedInstalled,
}

/// Combined infrastructure verdict for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfraAssessment {
    pub tier: MatchTier,
    pub patch: PatchStatus,
    /// True when at least one range was unparseable and version
    /// evidence had to be skipped for this record.
    pub malformed: bool,
}

/// Assess one record against a context snapshot. Pure; no I/O.
#[must_use]
pub fn assess(record: &VulnerabilityRecord, context: &InfrastructureContext) -> InfraAssessment {
    let mut malformed = false;
    let mut tier = MatchTier::None;

    for affected in &record.affected {
        for installed in context
            .packages
            .iter()
            .filter(|pkg| installed_matches(pkg, affected))
        {
            match version_in_ranges(&installed.version, affected) {
                Ok(true) => {
                    return InfraAssessment {
                        tier: MatchTier::Exact,
                        patch: patch_status(record, context, &mut malformed),
                        malformed,
                    };
                }
                Ok(false) => {
                    // Name+ecosystem overlap without version containment
                    // is still ecosystem-level evidence.
                    tier = tier.max(MatchTier::Ecosystem);
                }
                Err(()) => {
                    debug!(
                        "record {}: unparseable range for {}, skipping version evidence",
                        record.id, affected.name
                    );
                    malformed = true;
                    tier = tier.max(MatchTier::Ecosystem);
                }
            }
        }
    }

    if tier == MatchTier::None && ecosystem_overlap(record, context) {
        tier = MatchTier::Ecosystem;
    }

    InfraAssessment {
        tier,
        patch: patch_status(record, context, &mut malformed),
        malformed,
    }
}

fn installed_matches(installed: &InstalledPackage, affected: &AffectedPackage) -> bool {
    installed.ecosystem == affected.ecosystem
        && installed.name.eq_ignore_ascii_case(&affected.name)
}

/// Ecosystem or service-name overlap, the weaker evidence class.
fn ecosystem_overlap(record: &VulnerabilityRecord, context: &InfrastructureContext) -> bool {
    let ecosystems_overlap = context
        .packages
        .iter()
        .any(|pkg| pkg.ecosystem == record.ecosystem);
    let service_overlap = record.affected.iter().any(|affected| {
        context
            .services
            .iter()
            .any(|service| service.eq_ignore_ascii_case(&affected.name))
    });
    ecosystems_overlap || service_overlap
}

/// Whether `version` falls inside any of the affected ranges.
///
/// `Err(())` marks an unparseable range: the caller records the record
/// as malformed and falls back to ecosystem evidence.
fn version_in_ranges(version: &str, affected: &AffectedPackage) -> Result<bool, ()> {
    let semver = affected.ecosystem.uses_semver();
    let installed = if semver {
        Some(Version::parse(version).map_err(|_| ())?)
    } else {
        None
    };

    for spec in &affected.ranges {
        match spec {
            VersionSpec::Range { introduced, fixed } => {
                // Range containment needs version ordering; without a
                // semver ecosystem this spec carries no evidence.
                let Some(installed) = &installed else {
                    continue;
                };
                let introduced = Version::parse(introduced).map_err(|_| ())?;
                if *installed < introduced {
                    continue;
                }
                match fixed {
                    Some(fixed) => {
                        let fixed = Version::parse(fixed).map_err(|_| ())?;
                        if *installed < fixed {
                            return Ok(true);
                        }
                    }
                    None => return Ok(true),
                }
            }
            VersionSpec::Exact(set) => {
                if set.iter().any(|candidate| candidate.trim() == version.trim()) {
                    return Ok(true);
                }
            }
        }
    }
    Ok(false)
}

/// Derive the patch posture; parse failures downgrade to the
/// conservative `FixAvailable` and mark the record malformed.
fn patch_status(
    record: &VulnerabilityRecord,
    context: &InfrastructureContext,
    malformed: &mut bool,
) -> PatchStatus {
    let mut any_fix = false;

    for affected in &record.affected {
        for spec in &affected.ranges {
            let VersionSpec::Range {
                fixed: Some(fixed), ..
            } = spec
            else {
                continue;
            };
            any_fix = true;

            if !affected.ecosystem.uses_semver() {
                continue;
            }
            let Ok(fixed) = Version::parse(fixed) else {
                *malformed = true;
                continue;
            };

            for installed in context
                .packages
                .iter()
                .filter(|pkg| installed_matches(pkg, affected))
            {
                match Version::parse(&installed.version) {
                    Ok(installed) if installed >= fixed => return PatchStatus::FixedInstalled,
                    Ok(_) => {}
                    Err(_) => *malformed = true,
                }
            }
        }
    }

    if any_fix {
        PatchStatus::FixAvailable
    } else {
        PatchStatus::NoFix
    }
}
