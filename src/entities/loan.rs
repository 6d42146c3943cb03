//! Loan snapshots and the loan state machine's states.
//!
//! Interest is fixed once at approval time from the elapsed-month bucket
//! rule; unlike contribution penalties it never changes as time passes. The
//! repayment list is append-only and `amount_repaid` is derived from it.

use crate::core::money::Money;
use crate::entities::payment::{EntryStatus, PaymentMethod};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a loan.
///
/// `Rejected` and `Repaid` are terminal. The "active/disbursed" stage of the
/// original workflow is the single [`LoanStatus::Active`] state, entered at
/// disbursement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// Requested, awaiting admin decision
    Pending,
    /// Approved with a fixed interest schedule, not yet disbursed
    Approved,
    /// Disbursed; repayments may be submitted
    Active,
    /// Fully repaid (terminal)
    Repaid,
    /// Declined (terminal)
    Rejected,
}

impl LoanStatus {
    /// Whether the state machine permits moving to `next` from here.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved | Self::Rejected)
                | (Self::Approved, Self::Active)
                | (Self::Active, Self::Repaid)
        )
    }

    /// Display name used in transition errors.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Active => "active",
            Self::Repaid => "repaid",
            Self::Rejected => "rejected",
        }
    }
}

/// One repayment against a loan.
///
/// Mirrors a contribution payment entry, with one addition: a late repayment
/// may carry a penalty of its own. That penalty stays attached to the entry
/// and is never folded back into the loan's `total_repayable`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanPayment {
    /// Amount repaid
    pub amount: Money,
    /// When the repayment was submitted
    pub submitted_at: DateTime<Utc>,
    /// Member or admin who submitted it
    pub submitted_by: String,
    /// How it was paid
    pub method: PaymentMethod,
    /// Proof-of-payment reference
    pub proof_url: String,
    /// Admin who approved it, once approved
    pub approved_by: Option<String>,
    /// Current approval state
    pub status: EntryStatus,
    /// Late-payment penalty attached to this repayment, if it was late
    pub penalty: Option<Money>,
    /// Required reason when the repayment was rejected
    pub rejection_reason: Option<String>,
}

/// A credit extended to a member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    /// Unique identifier for the loan
    pub id: String,
    /// The borrowing member
    pub member_id: String,
    /// Principal
    pub amount: Money,
    /// What the loan is for
    pub purpose: String,
    /// Agreed repayment term in months; fixes the interest schedule
    pub term_months: u32,
    /// When the member requested the loan
    pub requested_at: DateTime<Utc>,
    /// Current lifecycle state
    pub status: LoanStatus,
    /// When an admin approved it
    pub approved_at: Option<DateTime<Utc>>,
    /// The approving admin
    pub approved_by: Option<String>,
    /// When the funds went out
    pub disbursed_at: Option<DateTime<Utc>>,
    /// Repayment deadline, set at disbursement from the term
    pub due_date: Option<NaiveDate>,
    /// Total interest, fixed at approval; never changes with elapsed time
    pub total_interest: Money,
    /// Principal plus total interest, fixed at approval
    pub total_repayable: Money,
    /// Cached sum of approved repayments (derived)
    pub amount_repaid: Money,
    /// Append-only list of repayments
    pub payments: Vec<LoanPayment>,
    /// Required reason when the loan was rejected
    pub rejection_reason: Option<String>,
}

impl Loan {
    /// Amount still owed: `total_repayable - amount_repaid`, clamped at
    /// zero.
    #[must_use]
    pub fn amount_remaining(&self) -> Money {
        self.total_repayable.saturating_sub(self.amount_repaid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_allowed() {
        assert!(LoanStatus::Pending.can_transition_to(LoanStatus::Approved));
        assert!(LoanStatus::Pending.can_transition_to(LoanStatus::Rejected));
        assert!(LoanStatus::Approved.can_transition_to(LoanStatus::Active));
        assert!(LoanStatus::Active.can_transition_to(LoanStatus::Repaid));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for next in [
            LoanStatus::Pending,
            LoanStatus::Approved,
            LoanStatus::Active,
            LoanStatus::Repaid,
            LoanStatus::Rejected,
        ] {
            assert!(!LoanStatus::Repaid.can_transition_to(next));
            assert!(!LoanStatus::Rejected.can_transition_to(next));
        }
    }

    #[test]
    fn test_no_skipping_states() {
        assert!(!LoanStatus::Pending.can_transition_to(LoanStatus::Active));
        assert!(!LoanStatus::Pending.can_transition_to(LoanStatus::Repaid));
        assert!(!LoanStatus::Approved.can_transition_to(LoanStatus::Repaid));
        assert!(!LoanStatus::Approved.can_transition_to(LoanStatus::Rejected));
        assert!(!LoanStatus::Active.can_transition_to(LoanStatus::Rejected));
    }
}
