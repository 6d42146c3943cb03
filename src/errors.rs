//! Unified error types for the ledger calculation core.
//!
//! The core performs no I/O and never retries: every error is returned
//! synchronously to the caller, which owns presentation and persistence.

use crate::core::money::Money;
use rust_decimal::Decimal;
use thiserror::Error;

/// All errors the calculation core can produce.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input: empty proof reference, period key that does not match
    /// the rules schedule, out-of-range rule values, and the like.
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable description of what failed validation
        message: String,
    },

    /// A monetary amount outside the accepted range (zero, negative, or not
    /// representable at two decimal places).
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The offending amount
        amount: Decimal,
    },

    /// An operation attempted against an entity whose current state forbids
    /// it, e.g. a repayment against a loan that is not active.
    #[error("Illegal {entity} transition: {from} -> {to}")]
    StateTransition {
        /// Which entity the transition was attempted on
        entity: &'static str,
        /// State the entity was in
        from: String,
        /// State the operation required or targeted
        to: String,
    },

    /// A recompute-from-source produced a different value than the cached
    /// derived field, signalling upstream data corruption. Surfaced rather
    /// than silently overwritten.
    #[error("Ledger inconsistency on {entity} {id}: cached {cached}, recomputed {recomputed}")]
    InconsistentLedger {
        /// Entity kind ("payment record" or "loan")
        entity: &'static str,
        /// Identifier of the inconsistent entity
        id: String,
        /// The stored derived value
        cached: Money,
        /// The value recomputed from the entry ledger
        recomputed: Money,
    },

    /// A payment or repayment entry index that does not exist on the record.
    #[error("Entry {index} not found on {record_id}")]
    EntryNotFound {
        /// Identifier of the record or loan
        record_id: String,
        /// The out-of-range entry index
        index: usize,
    },

    /// Rules configuration could not be read, parsed, or normalized.
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description of the configuration problem
        message: String,
    },
}

/// Convenience `Result` type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
