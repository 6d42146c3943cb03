//! Group, membership, and rules snapshots.
//!
//! A group is a savings circle; its `rules` drive every calculation in the
//! core. Member financial summaries are a derived cache and must always be
//! re-derivable from the payment and loan ledgers - see
//! [`crate::core::aggregate`].

use crate::core::money::Money;
use crate::entities::payment::PaymentType;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a savings group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    /// The group is operating and accepting contributions
    Active,
    /// The group has been wound down
    Closed,
}

/// A savings group snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Unique identifier for the group
    pub id: String,
    /// Human-readable display name
    pub name: String,
    /// When the group was registered
    pub created_at: DateTime<Utc>,
    /// The contribution, penalty, and loan rules for this group
    pub rules: GroupRules,
    /// Current lifecycle state
    pub status: GroupStatus,
}

/// Role a member holds within one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    /// Ordinary contributing member
    Member,
    /// Can approve payments and manage members
    Admin,
    /// Admin with rule-management powers
    SeniorAdmin,
}

/// Membership state within one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    /// Full member
    Active,
    /// Invited or awaiting acceptance
    Pending,
}

/// Cached per-member financial totals.
///
/// Derived, never authoritative: always re-derivable from the member's
/// payment records and loans via
/// [`crate::core::aggregate::rebuild_member_summary`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSummary {
    /// Total approved contribution payments across all periods
    pub total_paid: Money,
    /// Total outstanding (arrears plus accrued penalty) across all periods
    pub total_arrears: Money,
    /// Total repayable across the member's disbursed loans
    pub total_loans: Money,
    /// Total approved loan repayments
    pub total_loans_paid: Money,
}

/// A person's membership in one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// Identifier shared with the global user identity
    pub id: String,
    /// Display name
    pub display_name: String,
    /// Role within this group
    pub role: MemberRole,
    /// When the member joined
    pub joined_at: DateTime<Utc>,
    /// Membership state
    pub status: MemberStatus,
    /// Cached financial totals (derived - see [`MemberSummary`])
    pub summary: MemberSummary,
}

/// One-time joining contribution rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedMoneyRule {
    /// Amount each member owes on joining
    pub amount: Money,
    /// Optional deadline; absent means the obligation is never overdue
    pub due_date: Option<NaiveDate>,
    /// Whether seed money is required at all for this group
    pub required: bool,
}

/// Recurring monthly contribution rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionRule {
    /// Amount owed each month
    pub amount: Money,
    /// Day of month the contribution falls due (1..=31, clamped to the
    /// month's last day for short months)
    pub day_of_month: u8,
    /// Whether members may pay in instalments
    pub allow_partial_payment: bool,
}

/// A late-payment penalty rule: a flat percentage applied to the outstanding
/// base once the due date (plus grace) has passed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyRule {
    /// Percentage rate, e.g. `10` for 10%
    pub rate: Decimal,
    /// Days past the due date before the penalty starts applying
    pub grace_period_days: u16,
}

/// Flat loan interest rates by elapsed-month bucket.
///
/// Month one of the term accrues `month1` percent of the principal, month
/// two `month2`, and every month from the third onward `month3_and_beyond`.
/// The buckets are summed progressively, not compounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanInterestSchedule {
    /// Rate for the first month of the term
    pub month1: Decimal,
    /// Rate for the second month
    pub month2: Decimal,
    /// Rate for the third and every subsequent month
    pub month3_and_beyond: Decimal,
}

impl LoanInterestSchedule {
    /// The flat rate for month `month_of_term` (1-based) of a loan's term.
    #[must_use]
    pub fn rate_for_month(&self, month_of_term: u32) -> Decimal {
        match month_of_term {
            0 => Decimal::ZERO,
            1 => self.month1,
            2 => self.month2,
            _ => self.month3_and_beyond,
        }
    }
}

/// The full rules schema for one group. This is the canonical, normalized
/// form; raw configuration is converted into it exactly once by
/// [`crate::config::rules`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRules {
    /// One-time joining contribution
    pub seed_money: SeedMoneyRule,
    /// Recurring monthly obligation
    pub monthly_contribution: ContributionRule,
    /// Penalty on overdue monthly contributions
    pub monthly_penalty: PenaltyRule,
    /// Penalty on late loan repayments
    pub loan_penalty: PenaltyRule,
    /// Dedicated penalty for overdue seed money. When absent, seed-money
    /// arrears fall back to `monthly_penalty` - an explicit configuration
    /// choice, not an engine default.
    pub seed_money_penalty: Option<PenaltyRule>,
    /// Loan interest rates by elapsed-month bucket
    pub loan_interest: LoanInterestSchedule,
}

impl GroupRules {
    /// The penalty rule governing a payment record of the given type.
    #[must_use]
    pub fn penalty_rule_for(&self, payment_type: PaymentType) -> &PenaltyRule {
        match payment_type {
            PaymentType::MonthlyContribution => &self.monthly_penalty,
            PaymentType::SeedMoney => self
                .seed_money_penalty
                .as_ref()
                .unwrap_or(&self.monthly_penalty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_rules;

    #[test]
    fn test_rate_for_month_buckets() {
        let schedule = LoanInterestSchedule {
            month1: Decimal::from(10),
            month2: Decimal::from(15),
            month3_and_beyond: Decimal::from(20),
        };
        assert_eq!(schedule.rate_for_month(1), Decimal::from(10));
        assert_eq!(schedule.rate_for_month(2), Decimal::from(15));
        assert_eq!(schedule.rate_for_month(3), Decimal::from(20));
        assert_eq!(schedule.rate_for_month(12), Decimal::from(20));
        assert_eq!(schedule.rate_for_month(0), Decimal::ZERO);
    }

    #[test]
    fn test_seed_money_penalty_falls_back_to_monthly() {
        let mut rules = test_rules();
        rules.seed_money_penalty = None;
        assert_eq!(
            rules.penalty_rule_for(PaymentType::SeedMoney),
            &rules.monthly_penalty
        );
    }

    #[test]
    fn test_seed_money_penalty_dedicated_rate_wins() {
        let mut rules = test_rules();
        rules.seed_money_penalty = Some(PenaltyRule {
            rate: Decimal::from(2),
            grace_period_days: 14,
        });
        let rule = rules.penalty_rule_for(PaymentType::SeedMoney);
        assert_eq!(rule.rate, Decimal::from(2));
        assert_eq!(rule.grace_period_days, 14);
    }
}
