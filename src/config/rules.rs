//! Group rules loading from rules.toml.
//!
//! The TOML file carries plain numbers and date strings; `normalize()`
//! converts that raw shape into the canonical [`GroupRules`] domain schema
//! exactly once, validating as it goes. Nothing downstream ever falls back
//! across alternative field names - schema drift stops at this boundary.

use crate::core::money::Money;
use crate::entities::group::{
    ContributionRule, GroupRules, LoanInterestSchedule, PenaltyRule, SeedMoneyRule,
};
use crate::errors::{Error, Result};
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use std::path::Path;

/// Raw shape of a rules.toml file.
#[derive(Debug, Deserialize)]
pub struct RulesConfig {
    /// One-time joining contribution
    pub seed_money: SeedMoneyConfig,
    /// Recurring monthly obligation
    pub monthly_contribution: ContributionConfig,
    /// Penalty on overdue monthly contributions
    pub monthly_penalty: PenaltyConfig,
    /// Penalty on late loan repayments
    pub loan_penalty: PenaltyConfig,
    /// Optional dedicated penalty for overdue seed money
    pub seed_money_penalty: Option<PenaltyConfig>,
    /// Loan interest rates by elapsed-month bucket
    pub loan_interest: InterestConfig,
}

/// Raw seed-money section.
#[derive(Debug, Deserialize)]
pub struct SeedMoneyConfig {
    /// Amount owed on joining
    pub amount: f64,
    /// Optional due date as `YYYY-MM-DD`
    pub due_date: Option<String>,
    /// Whether seed money is required
    #[serde(default = "default_true")]
    pub required: bool,
}

/// Raw monthly-contribution section.
#[derive(Debug, Deserialize)]
pub struct ContributionConfig {
    /// Amount owed each month
    pub amount: f64,
    /// Day of month the contribution falls due
    pub day_of_month: u8,
    /// Whether instalments are allowed
    #[serde(default = "default_true")]
    pub allow_partial_payment: bool,
}

/// Raw penalty section.
#[derive(Debug, Deserialize)]
pub struct PenaltyConfig {
    /// Percentage rate
    pub rate: f64,
    /// Days of grace past the due date
    #[serde(default)]
    pub grace_period_days: u16,
}

/// Raw loan-interest section.
#[derive(Debug, Deserialize)]
pub struct InterestConfig {
    /// Rate for the first month of the term
    pub month1: f64,
    /// Rate for the second month
    pub month2: f64,
    /// Rate for every month from the third onward
    pub month3_and_beyond: f64,
}

const fn default_true() -> bool {
    true
}

/// Loads and normalizes group rules from a TOML file.
///
/// # Errors
/// Returns a `Config` error if the file cannot be read, the TOML is
/// invalid, or any value fails normalization.
pub fn load_rules<P: AsRef<Path>>(path: P) -> Result<GroupRules> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read rules file: {e}"),
    })?;

    let raw: RulesConfig = toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse rules.toml: {e}"),
    })?;

    raw.normalize()
}

impl RulesConfig {
    /// Converts the raw configuration into the canonical domain schema,
    /// validating amounts, rates, and the due-day range.
    pub fn normalize(&self) -> Result<GroupRules> {
        if !(1..=31).contains(&self.monthly_contribution.day_of_month) {
            return Err(Error::Config {
                message: format!(
                    "day_of_month {} is out of range (1..=31)",
                    self.monthly_contribution.day_of_month
                ),
            });
        }

        let due_date = match &self.seed_money.due_date {
            Some(raw) => Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
                Error::Config {
                    message: format!("Failed to parse seed money due date {raw:?}: {e}"),
                }
            })?),
            None => None,
        };

        Ok(GroupRules {
            seed_money: SeedMoneyRule {
                amount: amount(self.seed_money.amount, "seed_money.amount")?,
                due_date,
                required: self.seed_money.required,
            },
            monthly_contribution: ContributionRule {
                amount: amount(
                    self.monthly_contribution.amount,
                    "monthly_contribution.amount",
                )?,
                day_of_month: self.monthly_contribution.day_of_month,
                allow_partial_payment: self.monthly_contribution.allow_partial_payment,
            },
            monthly_penalty: penalty(&self.monthly_penalty, "monthly_penalty")?,
            loan_penalty: penalty(&self.loan_penalty, "loan_penalty")?,
            seed_money_penalty: self
                .seed_money_penalty
                .as_ref()
                .map(|p| penalty(p, "seed_money_penalty"))
                .transpose()?,
            loan_interest: LoanInterestSchedule {
                month1: rate(self.loan_interest.month1, "loan_interest.month1")?,
                month2: rate(self.loan_interest.month2, "loan_interest.month2")?,
                month3_and_beyond: rate(
                    self.loan_interest.month3_and_beyond,
                    "loan_interest.month3_and_beyond",
                )?,
            },
        })
    }
}

fn amount(value: f64, field: &str) -> Result<Money> {
    Money::try_from_f64(value).map_err(|e| Error::Config {
        message: format!("Invalid {field}: {e}"),
    })
}

fn rate(value: f64, field: &str) -> Result<Decimal> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::Config {
            message: format!("Invalid {field}: rate {value} must be non-negative"),
        });
    }
    let decimal = Decimal::try_from(value).map_err(|e| Error::Config {
        message: format!("Invalid {field}: {e}"),
    })?;
    Ok(decimal.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

fn penalty(config: &PenaltyConfig, field: &str) -> Result<PenaltyRule> {
    Ok(PenaltyRule {
        rate: rate(config.rate, field)?,
        grace_period_days: config.grace_period_days,
    })
}
