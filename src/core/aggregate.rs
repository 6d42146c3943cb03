//! Aggregation - rolling payment records and loans up into per-member and
//! per-group summaries.
//!
//! Everything here is recomputed from the entry ledgers on every call. The
//! cached `MemberSummary` on a member is only ever a convenience copy of
//! [`rebuild_member_summary`]'s output; [`reconcile_member_summary`] is the
//! guard that catches a cache which drifted from its ledgers.

use crate::core::arrears;
use crate::core::money::Money;
use crate::entities::group::{GroupRules, MemberSummary};
use crate::entities::loan::{Loan, LoanStatus};
use crate::entities::payment::{EntryStatus, PaymentRecord};
use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeMap;
use tracing::warn;

/// One member's row in a period summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberBreakdown {
    /// The member this row covers
    pub member_id: String,
    /// Total owed by this member across the summarized records
    pub expected: Money,
    /// Total approved payments
    pub paid: Money,
    /// Total outstanding including accrued penalty
    pub arrears: Money,
    /// `paid / expected * 100`; zero when nothing is expected. May exceed
    /// 100 on overpayment.
    pub percent_paid: Decimal,
}

/// How many members fall in each compliance bucket.
///
/// A member is "fully paid" iff approved payments cover the base obligation;
/// unpaid penalty does not demote them, mirroring the per-record `Completed`
/// status. The penalty still shows up in the outstanding totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    /// Paid at least the full obligation
    pub fully_paid: usize,
    /// Paid something, but less than the obligation
    pub partial: usize,
    /// Paid nothing
    pub unpaid: usize,
}

/// Group-level rollup of a set of payment records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPeriodSummary {
    /// Sum of all obligations
    pub total_expected: Money,
    /// Sum of approved payments
    pub total_collected: Money,
    /// Sum of submitted-but-unreviewed payment entries
    pub total_pending_approval: Money,
    /// Sum of outstanding amounts including penalties
    pub total_outstanding: Money,
    /// `collected / expected * 100`, zero when nothing is expected; not
    /// clamped, so overpayment reads above 100
    pub collection_rate: Decimal,
    /// Per-member rows, ordered by member id
    pub members: Vec<MemberBreakdown>,
    /// Compliance bucket counts over the member rows
    pub classification: Classification,
}

/// Rolls a set of payment records (typically one group-period) into a
/// summary.
#[must_use]
pub fn summarize_period(
    records: &[PaymentRecord],
    rules: &GroupRules,
    now: DateTime<Utc>,
) -> GroupPeriodSummary {
    let mut total_expected = Money::ZERO;
    let mut total_collected = Money::ZERO;
    let mut total_pending = Money::ZERO;
    let mut total_outstanding = Money::ZERO;
    let mut per_member: BTreeMap<String, (Money, Money, Money)> = BTreeMap::new();

    for record in records {
        let breakdown = arrears::compute(record, rules, now);
        let pending: Money = record
            .paid
            .iter()
            .filter(|e| e.status == EntryStatus::Pending)
            .map(|e| e.amount)
            .sum();

        total_expected = total_expected + record.total_amount;
        total_collected = total_collected + breakdown.paid_so_far;
        total_pending = total_pending + pending;
        total_outstanding = total_outstanding + breakdown.total_due;

        let row = per_member
            .entry(record.member_id.clone())
            .or_insert((Money::ZERO, Money::ZERO, Money::ZERO));
        row.0 = row.0 + record.total_amount;
        row.1 = row.1 + breakdown.paid_so_far;
        row.2 = row.2 + breakdown.total_due;
    }

    let mut classification = Classification::default();
    let members: Vec<MemberBreakdown> = per_member
        .into_iter()
        .map(|(member_id, (expected, paid, outstanding))| {
            if paid >= expected {
                classification.fully_paid += 1;
            } else if paid.is_zero() {
                classification.unpaid += 1;
            } else {
                classification.partial += 1;
            }
            MemberBreakdown {
                member_id,
                expected,
                paid,
                arrears: outstanding,
                percent_paid: rate(paid, expected),
            }
        })
        .collect();

    GroupPeriodSummary {
        total_expected,
        total_collected,
        total_pending_approval: total_pending,
        total_outstanding,
        collection_rate: rate(total_collected, total_expected),
        members,
        classification,
    }
}

/// `part / whole * 100` rounded to two decimal places; zero when `whole` is
/// zero rather than dividing by it.
fn rate(part: Money, whole: Money) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    (part.amount() / whole.amount() * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Recomputes one member's financial summary from their payment and loan
/// ledgers. This is the source of truth the cached summary must match.
///
/// Loans count once disbursed: `total_loans` sums `total_repayable` over
/// active and repaid loans, and `total_loans_paid` sums their approved
/// repayments.
#[must_use]
pub fn rebuild_member_summary(
    member_id: &str,
    records: &[PaymentRecord],
    loans: &[Loan],
    rules: &GroupRules,
    now: DateTime<Utc>,
) -> MemberSummary {
    let mut summary = MemberSummary::default();

    for record in records.iter().filter(|r| r.member_id == member_id) {
        let breakdown = arrears::compute(record, rules, now);
        summary.total_paid = summary.total_paid + breakdown.paid_so_far;
        summary.total_arrears = summary.total_arrears + breakdown.total_due;
    }

    for loan in loans.iter().filter(|l| {
        l.member_id == member_id && matches!(l.status, LoanStatus::Active | LoanStatus::Repaid)
    }) {
        let repaid: Money = loan
            .payments
            .iter()
            .filter(|p| p.status == EntryStatus::Approved)
            .map(|p| p.amount)
            .sum();
        summary.total_loans = summary.total_loans + loan.total_repayable;
        summary.total_loans_paid = summary.total_loans_paid + repaid;
    }

    summary
}

/// Rebuilds a member's summary and compares it with the cached copy,
/// surfacing any divergence instead of silently overwriting it.
pub fn reconcile_member_summary(
    member_id: &str,
    cached: &MemberSummary,
    records: &[PaymentRecord],
    loans: &[Loan],
    rules: &GroupRules,
    now: DateTime<Utc>,
) -> Result<MemberSummary> {
    let rebuilt = rebuild_member_summary(member_id, records, loans, rules, now);
    let fields = [
        ("total_paid", cached.total_paid, rebuilt.total_paid),
        ("total_arrears", cached.total_arrears, rebuilt.total_arrears),
        ("total_loans", cached.total_loans, rebuilt.total_loans),
        (
            "total_loans_paid",
            cached.total_loans_paid,
            rebuilt.total_loans_paid,
        ),
    ];
    for (field, cached_value, rebuilt_value) in fields {
        if cached_value != rebuilt_value {
            warn!(
                member_id,
                field,
                cached = %cached_value,
                recomputed = %rebuilt_value,
                "cached member summary diverged from ledgers"
            );
            return Err(Error::InconsistentLedger {
                entity: "member summary",
                id: format!("{member_id}/{field}"),
                cached: cached_value,
                recomputed: rebuilt_value,
            });
        }
    }
    Ok(rebuilt)
}
