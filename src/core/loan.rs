//! Loan ledger - the loan state machine, the one-time interest schedule,
//! and repayment application.
//!
//! Interest is fixed when a loan is approved: the elapsed-month bucket rates
//! are applied to the principal for each month of the agreed term and
//! summed, flat, not compounding. From then on `total_interest` and
//! `total_repayable` never move; only repayments do. This is deliberately
//! asymmetric with contribution penalties, which accrue as time passes.
//!
//! As with payment records, every operation returns a new snapshot with
//! derived fields recomputed from the repayment list, and the caller owns
//! write serialization (at most one concurrent writer per loan).

use crate::core::arrears::is_overdue;
use crate::core::money::Money;
use crate::core::payment::PaymentInput;
use crate::entities::group::GroupRules;
use crate::entities::loan::{Loan, LoanPayment, LoanStatus};
use crate::entities::payment::EntryStatus;
use crate::errors::{Error, Result};
use chrono::{DateTime, Months, Utc};
use tracing::{debug, warn};

/// Creates a new loan request in the `Pending` state.
///
/// `term_months` is the agreed repayment term; it fixes which interest
/// buckets will apply once the loan is approved.
pub fn request(
    id: String,
    member_id: String,
    amount: Money,
    purpose: String,
    term_months: u32,
    requested_at: DateTime<Utc>,
) -> Result<Loan> {
    if amount.is_zero() {
        return Err(Error::InvalidAmount {
            amount: amount.amount(),
        });
    }
    if term_months == 0 {
        return Err(Error::Validation {
            message: "loan term must be at least one month".to_string(),
        });
    }

    Ok(Loan {
        id,
        member_id,
        amount,
        purpose,
        term_months,
        requested_at,
        status: LoanStatus::Pending,
        approved_at: None,
        approved_by: None,
        disbursed_at: None,
        due_date: None,
        total_interest: Money::ZERO,
        total_repayable: Money::ZERO,
        amount_repaid: Money::ZERO,
        payments: Vec::new(),
        rejection_reason: None,
    })
}

/// Total interest for a principal over a term, from the bucket schedule.
///
/// Month one accrues `month1` percent of the principal, month two `month2`,
/// and every later month `month3_and_beyond`; the per-month amounts are
/// summed. A three-month loan at 10/15/20 therefore owes 45% of the
/// principal in interest.
#[must_use]
pub fn interest_for(principal: Money, term_months: u32, rules: &GroupRules) -> Money {
    (1..=term_months)
        .map(|month| principal.percent(rules.loan_interest.rate_for_month(month)))
        .sum()
}

/// Approves a pending loan, fixing its interest schedule.
pub fn approve(
    loan: &Loan,
    admin_id: &str,
    rules: &GroupRules,
    now: DateTime<Utc>,
) -> Result<Loan> {
    let mut updated = transition(loan, LoanStatus::Approved)?;
    let interest = interest_for(loan.amount, loan.term_months, rules);
    updated.total_interest = interest;
    updated.total_repayable = loan.amount + interest;
    updated.approved_at = Some(now);
    updated.approved_by = Some(admin_id.to_string());
    debug!(
        loan_id = %updated.id,
        interest = %interest,
        repayable = %updated.total_repayable,
        "loan approved"
    );
    Ok(updated)
}

/// Rejects a pending loan with a required reason. Terminal.
pub fn reject(loan: &Loan, admin_id: &str, reason: &str, now: DateTime<Utc>) -> Result<Loan> {
    if reason.trim().is_empty() {
        return Err(Error::Validation {
            message: "a rejection reason is required".to_string(),
        });
    }
    let mut updated = transition(loan, LoanStatus::Rejected)?;
    updated.approved_at = Some(now);
    updated.approved_by = Some(admin_id.to_string());
    updated.rejection_reason = Some(reason.trim().to_string());
    Ok(updated)
}

/// Disburses an approved loan, making it active and setting the repayment
/// deadline from the term.
pub fn disburse(loan: &Loan, now: DateTime<Utc>) -> Result<Loan> {
    let mut updated = transition(loan, LoanStatus::Active)?;
    updated.disbursed_at = Some(now);
    updated.due_date = now
        .date_naive()
        .checked_add_months(Months::new(loan.term_months));
    Ok(updated)
}

/// Appends a member-submitted repayment, starting `Pending`.
///
/// Repayments may only be submitted against an active loan, are capped at
/// the amount remaining, and pick up a late-payment penalty (attached to the
/// individual entry, never folded into `total_repayable`) when submitted
/// past the loan's due date plus grace.
pub fn submit_repayment(loan: &Loan, input: PaymentInput, rules: &GroupRules) -> Result<Loan> {
    append_repayment(loan, input, rules, None)
}

/// Appends an admin-entered repayment, auto-approved and attributed to the
/// admin. The loan auto-transitions to `Repaid` if this settles it.
pub fn record_admin_repayment(
    loan: &Loan,
    input: PaymentInput,
    admin_id: &str,
    rules: &GroupRules,
) -> Result<Loan> {
    append_repayment(loan, input, rules, Some(admin_id))
}

fn append_repayment(
    loan: &Loan,
    input: PaymentInput,
    rules: &GroupRules,
    auto_approve_by: Option<&str>,
) -> Result<Loan> {
    require_active(loan, "repayment")?;
    if input.amount.is_zero() {
        return Err(Error::InvalidAmount {
            amount: input.amount.amount(),
        });
    }
    if input.proof_url.trim().is_empty() {
        return Err(Error::Validation {
            message: "proof of payment reference is required".to_string(),
        });
    }

    let remaining = loan.amount_remaining();
    if input.amount > remaining {
        return Err(Error::Validation {
            message: format!(
                "repayment {} exceeds amount remaining {}",
                input.amount, remaining
            ),
        });
    }

    let penalty = late_penalty(loan, rules, input.submitted_at);
    let (status, approved_by) = match auto_approve_by {
        Some(admin) => (EntryStatus::Approved, Some(admin.to_string())),
        None => (EntryStatus::Pending, None),
    };

    let mut updated = loan.clone();
    updated.payments.push(LoanPayment {
        amount: input.amount,
        submitted_at: input.submitted_at,
        submitted_by: input.submitted_by,
        method: input.method,
        proof_url: input.proof_url,
        approved_by,
        status,
        penalty,
        rejection_reason: None,
    });
    Ok(recompute(&updated))
}

/// Approves a pending repayment; settling the balance auto-transitions the
/// loan to `Repaid` here, not via manual admin action.
///
/// Only an active loan's entries can be reviewed: once the loan is `Repaid`
/// or `Rejected` its ledger is immutable, so a repayment left pending at
/// settlement stays pending forever.
pub fn approve_repayment(loan: &Loan, payment_index: usize, admin_id: &str) -> Result<Loan> {
    require_active(loan, "repayment approval")?;
    let mut updated = loan.clone();
    let payment = payment_mut(&mut updated, payment_index)?;
    require_pending(payment, EntryStatus::Approved)?;
    payment.status = EntryStatus::Approved;
    payment.approved_by = Some(admin_id.to_string());
    Ok(recompute(&updated))
}

/// Rejects a pending repayment with a required reason; kept for audit,
/// excluded from `amount_repaid`.
pub fn reject_repayment(
    loan: &Loan,
    payment_index: usize,
    admin_id: &str,
    reason: &str,
) -> Result<Loan> {
    require_active(loan, "repayment rejection")?;
    if reason.trim().is_empty() {
        return Err(Error::Validation {
            message: "a rejection reason is required".to_string(),
        });
    }
    let mut updated = loan.clone();
    let payment = payment_mut(&mut updated, payment_index)?;
    require_pending(payment, EntryStatus::Rejected)?;
    payment.status = EntryStatus::Rejected;
    payment.approved_by = Some(admin_id.to_string());
    payment.rejection_reason = Some(reason.trim().to_string());
    Ok(recompute(&updated))
}

/// Recomputes `amount_repaid` from the repayment ledger and applies the
/// automatic `Active -> Repaid` transition when nothing remains. Idempotent.
#[must_use]
pub fn recompute(loan: &Loan) -> Loan {
    let mut updated = loan.clone();
    updated.amount_repaid = updated
        .payments
        .iter()
        .filter(|p| p.status == EntryStatus::Approved)
        .map(|p| p.amount)
        .sum();

    if updated.status == LoanStatus::Active
        && !updated.total_repayable.is_zero()
        && updated.amount_remaining().is_zero()
    {
        warn!(loan_id = %updated.id, "loan fully repaid, transitioning to repaid");
        updated.status = LoanStatus::Repaid;
    }
    updated
}

/// Recomputes from source and compares against the cached `amount_repaid`,
/// surfacing a divergence as upstream data corruption.
pub fn verify_cached(loan: &Loan) -> Result<Money> {
    let recomputed: Money = loan
        .payments
        .iter()
        .filter(|p| p.status == EntryStatus::Approved)
        .map(|p| p.amount)
        .sum();
    if recomputed != loan.amount_repaid {
        warn!(
            loan_id = %loan.id,
            cached = %loan.amount_repaid,
            recomputed = %recomputed,
            "cached amount repaid diverged from ledger"
        );
        return Err(Error::InconsistentLedger {
            entity: "loan",
            id: loan.id.clone(),
            cached: loan.amount_repaid,
            recomputed,
        });
    }
    Ok(recomputed)
}

fn late_penalty(loan: &Loan, rules: &GroupRules, submitted_at: DateTime<Utc>) -> Option<Money> {
    if is_overdue(
        loan.due_date,
        rules.loan_penalty.grace_period_days,
        submitted_at,
    ) {
        Some(loan.amount_remaining().percent(rules.loan_penalty.rate))
    } else {
        None
    }
}

fn require_active(loan: &Loan, action: &str) -> Result<()> {
    if loan.status != LoanStatus::Active {
        return Err(Error::StateTransition {
            entity: "loan",
            from: loan.status.name().to_string(),
            to: action.to_string(),
        });
    }
    Ok(())
}

fn transition(loan: &Loan, next: LoanStatus) -> Result<Loan> {
    if !loan.status.can_transition_to(next) {
        return Err(Error::StateTransition {
            entity: "loan",
            from: loan.status.name().to_string(),
            to: next.name().to_string(),
        });
    }
    let mut updated = loan.clone();
    updated.status = next;
    Ok(updated)
}

fn payment_mut(loan: &mut Loan, index: usize) -> Result<&mut LoanPayment> {
    let record_id = loan.id.clone();
    loan
        .payments
        .get_mut(index)
        .ok_or(Error::EntryNotFound { record_id, index })
}

fn require_pending(payment: &LoanPayment, target: EntryStatus) -> Result<()> {
    if payment.status != EntryStatus::Pending {
        return Err(Error::StateTransition {
            entity: "loan repayment",
            from: payment.status.name().to_string(),
            to: target.name().to_string(),
        });
    }
    Ok(())
}
