//! Configuration checks that accumulate every violation.
//!
//! Uses Stillwater's `Validation` so that a misconfigured engine reports all
//! of its problems at once instead of one per restart.

use super::EngineConfig;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// A single problem with an engine configuration
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigViolation {
    #[error("default_ttl_secs must be greater than zero")]
    ZeroDefaultTtl,

    #[error("max_continuations must be greater than zero")]
    ZeroCapacity,

    #[error("page id for '{slot}' replies must not be empty")]
    EmptyPage { slot: &'static str },
}

/// Check every rule, accumulating ALL violations.
pub fn validate(config: &EngineConfig) -> Validation<(), NonEmptyVec<ConfigViolation>> {
    let mut checks: Vec<Validation<(), NonEmptyVec<ConfigViolation>>> = Vec::new();

    checks.push(if config.default_ttl_secs == 0 {
        Validation::fail(ConfigViolation::ZeroDefaultTtl)
    } else {
        Validation::success(())
    });

    checks.push(if config.max_continuations == 0 {
        Validation::fail(ConfigViolation::ZeroCapacity)
    } else {
        Validation::success(())
    });

    let pages = &config.pages;
    for (slot, page) in [
        ("expired", &pages.expired),
        ("error", &pages.error),
        ("not_found", &pages.not_found),
        ("unavailable", &pages.unavailable),
        ("busy", &pages.busy),
    ] {
        checks.push(if page.trim().is_empty() {
            Validation::fail(ConfigViolation::EmptyPage { slot })
        } else {
            Validation::success(())
        });
    }

    Validation::all_vec(checks).map(|_| ())
}

/// Collapse a validation into a plain list of violations.
pub fn violations(config: &EngineConfig) -> Vec<ConfigViolation> {
    match validate(config) {
        Validation::Success(_) => Vec::new(),
        Validation::Failure(errors) => errors.iter().cloned().collect(),
    }
}
