//! Shared test utilities.
//!
//! Common fixtures for the calculation tests: a standard rules set, record
//! and loan factories, and a fixed clock so results never depend on when the
//! tests run.

#![allow(clippy::unwrap_used)]

use crate::core::money::Money;
use crate::core::payment::PaymentInput;
use crate::core::loan as loan_core;
use crate::entities::group::{
    ContributionRule, GroupRules, LoanInterestSchedule, PenaltyRule, SeedMoneyRule,
};
use crate::entities::loan::Loan;
use crate::entities::payment::{EntryStatus, PaymentEntry, PaymentMethod, PaymentRecord};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

/// Installs a test subscriber so `RUST_LOG`-filtered spans show up when
/// debugging a failing test. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// The standard rules set used across tests: 1000 seed money due end of
/// January, 5000 monthly due on the 5th, 10% monthly penalty with no grace,
/// 5% loan penalty, 10/15/20 interest buckets.
pub fn test_rules() -> GroupRules {
    GroupRules {
        seed_money: SeedMoneyRule {
            amount: Money::from_major(1000),
            due_date: Some(NaiveDate::from_ymd_opt(2026, 1, 31).unwrap()),
            required: true,
        },
        monthly_contribution: ContributionRule {
            amount: Money::from_major(5000),
            day_of_month: 5,
            allow_partial_payment: true,
        },
        monthly_penalty: PenaltyRule {
            rate: Decimal::from(10),
            grace_period_days: 0,
        },
        loan_penalty: PenaltyRule {
            rate: Decimal::from(5),
            grace_period_days: 0,
        },
        seed_money_penalty: None,
        loan_interest: LoanInterestSchedule {
            month1: Decimal::from(10),
            month2: Decimal::from(15),
            month3_and_beyond: Decimal::from(20),
        },
    }
}

/// Noon UTC on the given day - a fixed, injectable "now".
pub fn noon(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
        .and_utc()
}

/// A fresh monthly-contribution record for member `m-1`.
pub fn monthly_record(rules: &GroupRules, year: i32, month: u32) -> PaymentRecord {
    PaymentRecord::monthly("pr-1".to_string(), "m-1".to_string(), year, month, rules).unwrap()
}

/// A fresh seed-money record for member `m-1`.
pub fn seed_record(rules: &GroupRules, year: i32) -> PaymentRecord {
    PaymentRecord::seed_money("pr-seed".to_string(), "m-1".to_string(), year, rules)
}

fn entry(amount: Money, status: EntryStatus) -> PaymentEntry {
    PaymentEntry {
        amount,
        paid_at: noon(2026, 4, 1),
        method: PaymentMethod::MobileMoney,
        proof_url: "https://proofs.example/receipt.png".to_string(),
        submitted_by: "m-1".to_string(),
        approved_by: (status != EntryStatus::Pending).then(|| "admin-1".to_string()),
        status,
        rejection_reason: (status == EntryStatus::Rejected).then(|| "test rejection".to_string()),
    }
}

/// An approved payment entry.
pub fn approved_entry(amount: Money) -> PaymentEntry {
    entry(amount, EntryStatus::Approved)
}

/// An approved payment entry paid at a specific instant, for exercising
/// on-time versus late settlement.
pub fn approved_entry_at(amount: Money, paid_at: DateTime<Utc>) -> PaymentEntry {
    let mut e = entry(amount, EntryStatus::Approved);
    e.paid_at = paid_at;
    e
}

/// A pending (unreviewed) payment entry.
pub fn pending_entry(amount: Money) -> PaymentEntry {
    entry(amount, EntryStatus::Pending)
}

/// A rejected payment entry.
pub fn rejected_entry(amount: Money) -> PaymentEntry {
    entry(amount, EntryStatus::Rejected)
}

/// A valid payment input for the given amount, submitted by member `m-1`.
pub fn payment_input(amount: Money) -> PaymentInput {
    PaymentInput {
        amount,
        method: PaymentMethod::MobileMoney,
        proof_url: "https://proofs.example/receipt.png".to_string(),
        submitted_by: "m-1".to_string(),
        submitted_at: noon(2026, 1, 10),
    }
}

/// A pending loan request for member `m-1`.
pub fn pending_loan(amount: Money, term_months: u32) -> Loan {
    loan_core::request(
        "loan-1".to_string(),
        "m-1".to_string(),
        amount,
        "business stock".to_string(),
        term_months,
        noon(2026, 1, 1),
    )
    .unwrap()
}

/// A loan taken all the way to `Active`: requested, approved on Jan 2,
/// disbursed on Jan 3.
pub fn active_loan(rules: &GroupRules, amount: Money, term_months: u32) -> Loan {
    let requested = pending_loan(amount, term_months);
    let approved = loan_core::approve(&requested, "admin-1", rules, noon(2026, 1, 2)).unwrap();
    loan_core::disburse(&approved, noon(2026, 1, 3)).unwrap()
}

// Keeps the module self-checking: the fixtures themselves satisfy the
// engine's invariants.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::payment as payment_core;

    #[test]
    fn test_fixtures_are_internally_consistent() {
        init_tracing();
        let rules = test_rules();
        let record = monthly_record(&rules, 2026, 4);
        payment_core::verify_cached(&record, &rules, noon(2026, 4, 1)).unwrap();

        let loan = active_loan(&rules, Money::from_major(100_000), 1);
        loan_core::verify_cached(&loan).unwrap();
    }
}
