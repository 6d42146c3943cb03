//! Core calculation engines - framework-agnostic, pure, and synchronous.
//!
//! Every function here computes over an explicit snapshot plus an injected
//! `now`; there is no clock access, no I/O, and no shared mutable state.
//! Operations return new snapshots rather than mutating their inputs.

/// Group and member rollups
pub mod aggregate;
/// Arrears and penalty derivation for payment records
pub mod arrears;
/// Loan state machine, interest schedule, and repayments
pub mod loan;
/// Monetary primitives
pub mod money;
/// Payment application and the approval workflow
pub mod payment;
