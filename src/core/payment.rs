//! Payment application - appending entries to a payment record and moving
//! them through the approval workflow.
//!
//! Every operation takes the record by reference and returns a new record
//! with its derived fields fully recomputed from the entry list. The
//! recompute is idempotent by construction: there is no increment-in-place,
//! so re-running it on the same data can never double count.
//!
//! Callers own write serialization: at most one concurrent writer per
//! record, or two submissions could both read stale arrears and lose an
//! update. That guard (a transaction or optimistic-concurrency check)
//! belongs to the persistence layer, not here.

use crate::core::arrears::{self, Breakdown};
use crate::core::money::Money;
use crate::entities::group::GroupRules;
use crate::entities::payment::{
    EntryStatus, PaymentEntry, PaymentMethod, PaymentRecord, RecordApproval,
};
use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// An incoming payment to apply to a record.
#[derive(Debug, Clone)]
pub struct PaymentInput {
    /// Amount paid; must be strictly positive
    pub amount: Money,
    /// How it was paid
    pub method: PaymentMethod,
    /// Proof-of-payment reference; required in all flows
    pub proof_url: String,
    /// Who is submitting the payment
    pub submitted_by: String,
    /// When the payment was made
    pub submitted_at: DateTime<Utc>,
}

fn validate_input(input: &PaymentInput) -> Result<()> {
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
    Ok(())
}

/// Appends a member-submitted payment entry, which starts `Pending` and
/// requires a separate admin approval step before it counts.
///
/// Overpayment beyond the outstanding balance is allowed for contributions
/// and shows up as surplus in the breakdown.
pub fn submit(
    record: &PaymentRecord,
    input: PaymentInput,
    rules: &GroupRules,
    now: DateTime<Utc>,
) -> Result<PaymentRecord> {
    validate_input(&input)?;
    record.validate_period()?;

    let mut updated = record.clone();
    updated.paid.push(PaymentEntry {
        amount: input.amount,
        paid_at: input.submitted_at,
        method: input.method,
        proof_url: input.proof_url,
        submitted_by: input.submitted_by,
        approved_by: None,
        status: EntryStatus::Pending,
        rejection_reason: None,
    });
    Ok(recompute(&updated, rules, now))
}

/// Appends an admin-entered payment entry, auto-approved and attributed to
/// the admin.
pub fn record_admin_payment(
    record: &PaymentRecord,
    input: PaymentInput,
    admin_id: &str,
    rules: &GroupRules,
    now: DateTime<Utc>,
) -> Result<PaymentRecord> {
    validate_input(&input)?;
    record.validate_period()?;

    let mut updated = record.clone();
    updated.paid.push(PaymentEntry {
        amount: input.amount,
        paid_at: input.submitted_at,
        method: input.method,
        proof_url: input.proof_url,
        submitted_by: input.submitted_by,
        approved_by: Some(admin_id.to_string()),
        status: EntryStatus::Approved,
        rejection_reason: None,
    });
    Ok(recompute(&updated, rules, now))
}

/// Approves a pending entry. Only `Pending -> Approved` is legal; approving
/// an already-approved or rejected entry is a state-transition error.
pub fn approve(
    record: &PaymentRecord,
    entry_index: usize,
    admin_id: &str,
    rules: &GroupRules,
    now: DateTime<Utc>,
) -> Result<PaymentRecord> {
    let mut updated = record.clone();
    let entry = entry_mut(&mut updated, entry_index)?;
    require_pending(entry, EntryStatus::Approved)?;
    entry.status = EntryStatus::Approved;
    entry.approved_by = Some(admin_id.to_string());
    Ok(recompute(&updated, rules, now))
}

/// Rejects a pending entry with a required reason. The entry stays in the
/// list for audit but no longer counts towards the obligation.
pub fn reject(
    record: &PaymentRecord,
    entry_index: usize,
    admin_id: &str,
    reason: &str,
    rules: &GroupRules,
    now: DateTime<Utc>,
) -> Result<PaymentRecord> {
    if reason.trim().is_empty() {
        return Err(Error::Validation {
            message: "a rejection reason is required".to_string(),
        });
    }

    let mut updated = record.clone();
    let entry = entry_mut(&mut updated, entry_index)?;
    require_pending(entry, EntryStatus::Rejected)?;
    entry.status = EntryStatus::Rejected;
    entry.approved_by = Some(admin_id.to_string());
    entry.rejection_reason = Some(reason.trim().to_string());
    Ok(recompute(&updated, rules, now))
}

/// Recomputes every derived field on the record from the entry ledger.
///
/// This is a full recompute-from-source, safe to run any number of times.
#[must_use]
pub fn recompute(record: &PaymentRecord, rules: &GroupRules, now: DateTime<Utc>) -> PaymentRecord {
    let breakdown = arrears::compute(record, rules, now);
    debug!(
        record_id = %record.id,
        arrears = %breakdown.total_due,
        penalty = %breakdown.penalty,
        "recomputed payment record"
    );

    let mut updated = record.clone();
    updated.arrears = breakdown.total_due;
    updated.payment_status = breakdown.status;
    updated.approval = rollup_approval(&updated.paid);
    updated
}

/// Recomputes from source and compares against the cached `arrears` field.
///
/// A mismatch means some upstream writer bypassed the recompute step; it is
/// logged and surfaced rather than silently overwritten.
pub fn verify_cached(
    record: &PaymentRecord,
    rules: &GroupRules,
    now: DateTime<Utc>,
) -> Result<Breakdown> {
    let breakdown = arrears::compute(record, rules, now);
    if breakdown.total_due != record.arrears {
        warn!(
            record_id = %record.id,
            cached = %record.arrears,
            recomputed = %breakdown.total_due,
            "cached arrears diverged from ledger"
        );
        return Err(Error::InconsistentLedger {
            entity: "payment record",
            id: record.id.clone(),
            cached: record.arrears,
            recomputed: breakdown.total_due,
        });
    }
    Ok(breakdown)
}

/// Derives the record-level approval rollup from the entry list.
#[must_use]
pub fn rollup_approval(entries: &[PaymentEntry]) -> RecordApproval {
    if entries.is_empty() {
        return RecordApproval::Unpaid;
    }
    if entries.iter().any(|e| e.status == EntryStatus::Pending) {
        return RecordApproval::Pending;
    }
    if entries.iter().any(|e| e.status == EntryStatus::Approved) {
        return RecordApproval::Approved;
    }
    RecordApproval::Rejected
}

fn entry_mut(record: &mut PaymentRecord, index: usize) -> Result<&mut PaymentEntry> {
    let record_id = record.id.clone();
    record
        .paid
        .get_mut(index)
        .ok_or(Error::EntryNotFound { record_id, index })
}

fn require_pending(entry: &PaymentEntry, target: EntryStatus) -> Result<()> {
    if entry.status != EntryStatus::Pending {
        return Err(Error::StateTransition {
            entity: "payment entry",
            from: entry.status.name().to_string(),
            to: target.name().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::payment::PaymentStatus;
    use crate::test_utils::*;

    #[test]
    fn test_submit_starts_pending_and_does_not_reduce_arrears() {
        let rules = test_rules();
        let now = noon(2026, 4, 1);
        let record = monthly_record(&rules, 2026, 4);

        let updated = submit(&record, payment_input(Money::from_major(5000)), &rules, now).unwrap();

        assert_eq!(updated.paid.len(), 1);
        assert_eq!(updated.paid[0].status, EntryStatus::Pending);
        assert_eq!(updated.approval, RecordApproval::Pending);
        // Pending money does not count yet
        assert_eq!(updated.arrears, Money::from_major(5000));
        assert_eq!(updated.payment_status, PaymentStatus::Pending);
        // Original untouched (immutable-update style)
        assert!(record.paid.is_empty());
    }

    #[test]
    fn test_admin_payment_is_auto_approved() {
        let rules = test_rules();
        let now = noon(2026, 4, 1);
        let record = monthly_record(&rules, 2026, 4);

        let updated = record_admin_payment(
            &record,
            payment_input(Money::from_major(5000)),
            "admin-1",
            &rules,
            now,
        )
        .unwrap();

        assert_eq!(updated.paid[0].status, EntryStatus::Approved);
        assert_eq!(updated.paid[0].approved_by.as_deref(), Some("admin-1"));
        assert_eq!(updated.arrears, Money::ZERO);
        assert_eq!(updated.payment_status, PaymentStatus::Completed);
        assert_eq!(updated.approval, RecordApproval::Approved);
    }

    #[test]
    fn test_zero_amount_rejected() {
        let rules = test_rules();
        let now = noon(2026, 4, 1);
        let record = monthly_record(&rules, 2026, 4);

        let result = submit(&record, payment_input(Money::ZERO), &rules, now);
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));
    }

    #[test]
    fn test_missing_proof_rejected() {
        let rules = test_rules();
        let now = noon(2026, 4, 1);
        let record = monthly_record(&rules, 2026, 4);

        let mut input = payment_input(Money::from_major(1000));
        input.proof_url = "   ".to_string();
        let result = submit(&record, input, &rules, now);
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[test]
    fn test_approve_counts_payment_and_settles_record() {
        let rules = test_rules();
        let now = noon(2026, 4, 1);
        let record = monthly_record(&rules, 2026, 4);

        let submitted =
            submit(&record, payment_input(Money::from_major(5000)), &rules, now).unwrap();
        let approved = approve(&submitted, 0, "admin-1", &rules, now).unwrap();

        assert_eq!(approved.paid[0].status, EntryStatus::Approved);
        assert_eq!(approved.arrears, Money::ZERO);
        assert_eq!(approved.payment_status, PaymentStatus::Completed);
        assert_eq!(approved.approval, RecordApproval::Approved);
    }

    #[test]
    fn test_reject_requires_reason_and_excludes_entry() {
        let rules = test_rules();
        let now = noon(2026, 4, 1);
        let record = monthly_record(&rules, 2026, 4);

        let submitted =
            submit(&record, payment_input(Money::from_major(5000)), &rules, now).unwrap();

        let no_reason = reject(&submitted, 0, "admin-1", "  ", &rules, now);
        assert!(matches!(no_reason, Err(Error::Validation { .. })));

        let rejected = reject(&submitted, 0, "admin-1", "unreadable receipt", &rules, now).unwrap();
        assert_eq!(rejected.paid[0].status, EntryStatus::Rejected);
        assert_eq!(
            rejected.paid[0].rejection_reason.as_deref(),
            Some("unreadable receipt")
        );
        // Still on the record for audit, but not counted
        assert_eq!(rejected.paid.len(), 1);
        assert_eq!(rejected.arrears, Money::from_major(5000));
        assert_eq!(rejected.approval, RecordApproval::Rejected);
    }

    #[test]
    fn test_double_approve_is_illegal() {
        let rules = test_rules();
        let now = noon(2026, 4, 1);
        let record = monthly_record(&rules, 2026, 4);

        let submitted =
            submit(&record, payment_input(Money::from_major(1000)), &rules, now).unwrap();
        let approved = approve(&submitted, 0, "admin-1", &rules, now).unwrap();

        let again = approve(&approved, 0, "admin-2", &rules, now);
        assert!(matches!(again, Err(Error::StateTransition { .. })));

        let reject_approved = reject(&approved, 0, "admin-2", "changed my mind", &rules, now);
        assert!(matches!(reject_approved, Err(Error::StateTransition { .. })));
    }

    #[test]
    fn test_approve_missing_entry() {
        let rules = test_rules();
        let now = noon(2026, 4, 1);
        let record = monthly_record(&rules, 2026, 4);

        let result = approve(&record, 3, "admin-1", &rules, now);
        assert!(matches!(result, Err(Error::EntryNotFound { index: 3, .. })));
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let rules = test_rules();
        let now = noon(2026, 4, 10); // overdue
        let mut record = monthly_record(&rules, 2026, 4);
        record.paid.push(approved_entry(Money::from_major(2000)));

        let once = recompute(&record, &rules, now);
        let twice = recompute(&once, &rules, now);
        assert_eq!(once, twice);
        // 3000 base + 300 penalty
        assert_eq!(once.arrears, Money::from_major(3300));
    }

    #[test]
    fn test_approved_payment_never_increases_arrears() {
        let rules = test_rules();
        let now = noon(2026, 4, 10);
        let mut record = recompute(&monthly_record(&rules, 2026, 4), &rules, now);

        for amount in [500, 1500, 100, 4000] {
            let before = record.arrears;
            record = record_admin_payment(
                &record,
                payment_input(Money::from_major(amount)),
                "admin-1",
                &rules,
                now,
            )
            .unwrap();
            assert!(record.arrears <= before);
        }
        assert_eq!(record.arrears, Money::ZERO);
    }

    #[test]
    fn test_verify_cached_detects_drift() {
        let rules = test_rules();
        let now = noon(2026, 4, 1);
        let record = monthly_record(&rules, 2026, 4);

        // Fresh record is consistent
        verify_cached(&record, &rules, now).unwrap();

        // Simulate an upstream writer that incremented in place
        let mut corrupted = record;
        corrupted.arrears = Money::from_major(1234);
        let result = verify_cached(&corrupted, &rules, now);
        match result {
            Err(Error::InconsistentLedger {
                cached, recomputed, ..
            }) => {
                assert_eq!(cached, Money::from_major(1234));
                assert_eq!(recomputed, Money::from_major(5000));
            }
            other => panic!("expected InconsistentLedger, got {other:?}"),
        }
    }

    #[test]
    fn test_rollup_approval_states() {
        let rules = test_rules();
        let record = monthly_record(&rules, 2026, 4);
        assert_eq!(rollup_approval(&record.paid), RecordApproval::Unpaid);

        let entries = vec![
            approved_entry(Money::from_major(100)),
            pending_entry(Money::from_major(100)),
        ];
        assert_eq!(rollup_approval(&entries), RecordApproval::Pending);

        let entries = vec![
            approved_entry(Money::from_major(100)),
            rejected_entry(Money::from_major(100)),
        ];
        assert_eq!(rollup_approval(&entries), RecordApproval::Approved);

        let entries = vec![rejected_entry(Money::from_major(100))];
        assert_eq!(rollup_approval(&entries), RecordApproval::Rejected);
    }
}
