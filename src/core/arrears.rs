//! Arrears/penalty engine.
//!
//! Given a payment record, the owning group's rules, and an injected "now",
//! derives the outstanding balance, accrued penalty, total due, surplus, and
//! settlement status. Pure and idempotent: the same inputs always produce
//! the same breakdown, and nothing is mutated.

use crate::core::money::Money;
use crate::entities::group::GroupRules;
use crate::entities::payment::{EntryStatus, PaymentRecord, PaymentStatus};
use chrono::{DateTime, Days, NaiveDate, Utc};

/// The derived financial state of one payment record at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Breakdown {
    /// Sum of approved payment entries
    pub paid_so_far: Money,
    /// Obligation minus approved payments, clamped at zero
    pub base_arrears: Money,
    /// Penalty assessed on the base left unpaid at the due date plus grace;
    /// zero unless overdue
    pub penalty: Money,
    /// Obligation plus penalty, minus approved payments, clamped at zero
    pub total_due: Money,
    /// Overpayment beyond obligation and penalty, clamped at zero. Reported
    /// only; never applied to another period.
    pub surplus: Money,
    /// Completed once the base obligation is fully covered (an accrued
    /// penalty may still be due)
    pub status: PaymentStatus,
}

/// Computes the full breakdown for a payment record.
///
/// Penalty accrues only when a due date exists and `now` is strictly past
/// it plus the rule's grace period. It is assessed against the base still
/// owed at that deadline: approved payments made by the deadline shrink it,
/// payments made after settle it. A record with no due date is never
/// overdue - some obligations intentionally have a flexible schedule.
#[must_use]
pub fn compute(record: &PaymentRecord, rules: &GroupRules, now: DateTime<Utc>) -> Breakdown {
    let paid_so_far: Money = record
        .paid
        .iter()
        .filter(|entry| entry.status == EntryStatus::Approved)
        .map(|entry| entry.amount)
        .sum();

    let rule = rules.penalty_rule_for(record.payment_type);
    let penalty = if is_overdue(record.due_date, rule.grace_period_days, now) {
        let paid_by_deadline: Money = record
            .paid
            .iter()
            .filter(|entry| {
                entry.status == EntryStatus::Approved
                    && !is_overdue(record.due_date, rule.grace_period_days, entry.paid_at)
            })
            .map(|entry| entry.amount)
            .sum();
        record
            .total_amount
            .saturating_sub(paid_by_deadline)
            .percent(rule.rate)
    } else {
        Money::ZERO
    };

    let base_arrears = record.total_amount.saturating_sub(paid_so_far);
    let total_due = (record.total_amount + penalty).saturating_sub(paid_so_far);
    let surplus = paid_so_far.saturating_sub(record.total_amount + penalty);
    let status = if base_arrears.is_zero() {
        PaymentStatus::Completed
    } else {
        PaymentStatus::Pending
    };

    Breakdown {
        paid_so_far,
        base_arrears,
        penalty,
        total_due,
        surplus,
        status,
    }
}

/// Whether `now` is strictly past the due date plus grace. A missing due
/// date is never overdue.
pub(crate) fn is_overdue(
    due_date: Option<NaiveDate>,
    grace_period_days: u16,
    now: DateTime<Utc>,
) -> bool {
    match due_date {
        None => false,
        Some(due) => {
            let threshold = due
                .checked_add_days(Days::new(u64::from(grace_period_days)))
                .unwrap_or(due);
            now.date_naive() > threshold
        }
    }
}
