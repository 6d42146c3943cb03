//! Configuration loading.
//!
//! Group rules arrive as TOML and are normalized once into the canonical
//! [`crate::entities::group::GroupRules`] schema before any calculation
//! sees them.

/// Rules file parsing and normalization
pub mod rules;

pub use rules::{RulesConfig, load_rules};
