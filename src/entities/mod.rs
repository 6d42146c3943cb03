//! Domain snapshots consumed and produced by the calculation core.
//!
//! These are plain data: serde-serializable structs and closed enums with no
//! behavior beyond constructors and small derivation helpers. The core takes
//! them by reference and returns new values (immutable-update style); it
//! never mutates a snapshot in place.

/// Groups, members, and the rules schema
pub mod group;
/// Loans and repayments
pub mod loan;
/// Payment records, periods, and payment entries
pub mod payment;

pub use group::{
    ContributionRule, Group, GroupRules, GroupStatus, LoanInterestSchedule, Member, MemberRole,
    MemberStatus, MemberSummary, PenaltyRule, SeedMoneyRule,
};
pub use loan::{Loan, LoanPayment, LoanStatus};
pub use payment::{
    EntryStatus, PaymentEntry, PaymentMethod, PaymentRecord, PaymentStatus, PaymentType, Period,
    RecordApproval,
};
