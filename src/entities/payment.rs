//! Payment record snapshots - one obligation per member per period.
//!
//! A payment record carries an append-only list of individual payment
//! entries; everything else on it (`arrears`, `approval`, `payment_status`)
//! is derived from that list by [`crate::core::arrears`] and
//! [`crate::core::payment`]. Records are never deleted.

use crate::core::money::Money;
use crate::entities::group::GroupRules;
use crate::errors::{Error, Result};
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of obligation a payment record represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    /// One-time joining contribution
    SeedMoney,
    /// Recurring monthly contribution
    MonthlyContribution,
}

/// The period an obligation belongs to: a year, plus a month for monthly
/// contributions. Seed money has no month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    /// Calendar year
    pub year: i32,
    /// Calendar month (1..=12) for monthly contributions, absent for seed
    /// money
    pub month: Option<u32>,
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

impl Period {
    /// Period for a seed-money obligation (year only).
    #[must_use]
    pub fn seed(year: i32) -> Self {
        Self { year, month: None }
    }

    /// Period for a monthly contribution. Rejects months outside 1..=12.
    pub fn monthly(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::Validation {
                message: format!("month {month} is out of range (1..=12)"),
            });
        }
        Ok(Self {
            year,
            month: Some(month),
        })
    }

    /// The English month name, if this period has a month.
    #[must_use]
    pub fn month_name(&self) -> Option<&'static str> {
        self.month
            .and_then(|m| MONTH_NAMES.get(m as usize - 1).copied())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.month_name() {
            Some(name) => write!(f, "{name} {}", self.year),
            None => write!(f, "{}", self.year),
        }
    }
}

/// How an individual payment was made. An open set in practice, so unknown
/// methods survive as [`PaymentMethod::Other`] instead of failing to parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentMethod {
    /// Physical cash handed to an admin
    Cash,
    /// Direct bank transfer
    BankTransfer,
    /// Mobile money (M-Pesa and friends)
    MobileMoney,
    /// PayPal
    PayPal,
    /// Cryptocurrency
    Crypto,
    /// Anything else, preserved verbatim
    Other(String),
}

impl From<String> for PaymentMethod {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "cash" => Self::Cash,
            "bank transfer" | "bank_transfer" => Self::BankTransfer,
            "mobile money" | "mobile_money" => Self::MobileMoney,
            "paypal" => Self::PayPal,
            "crypto" | "cryptocurrency" => Self::Crypto,
            _ => Self::Other(value),
        }
    }
}

impl From<PaymentMethod> for String {
    fn from(value: PaymentMethod) -> Self {
        match value {
            PaymentMethod::Cash => "Cash".to_string(),
            PaymentMethod::BankTransfer => "Bank Transfer".to_string(),
            PaymentMethod::MobileMoney => "Mobile Money".to_string(),
            PaymentMethod::PayPal => "PayPal".to_string(),
            PaymentMethod::Crypto => "Crypto".to_string(),
            PaymentMethod::Other(raw) => raw,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from(self.clone()))
    }
}

/// Approval state of one payment entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Submitted by a member, awaiting admin review
    Pending,
    /// Counted towards the obligation
    Approved,
    /// Excluded from totals but kept for audit
    Rejected,
}

impl EntryStatus {
    /// Display name used in transition errors.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// One individual payment against an obligation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentEntry {
    /// Amount paid
    pub amount: Money,
    /// When the payment was made
    pub paid_at: DateTime<Utc>,
    /// How it was paid
    pub method: PaymentMethod,
    /// Proof-of-payment reference (receipt URL, transaction code)
    pub proof_url: String,
    /// Who submitted the entry (member or admin id)
    pub submitted_by: String,
    /// Admin who approved it, once approved
    pub approved_by: Option<String>,
    /// Current approval state
    pub status: EntryStatus,
    /// Required reason when the entry was rejected
    pub rejection_reason: Option<String>,
}

/// Record-level approval rollup, derived from the entry list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordApproval {
    /// No entries at all
    Unpaid,
    /// At least one entry awaits review
    Pending,
    /// Entries exist, none pending, at least one approved
    Approved,
    /// Entries exist and every one was rejected
    Rejected,
}

/// Whether the obligation itself is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Base arrears remain
    Pending,
    /// The base obligation is fully covered by approved payments
    Completed,
}

/// One obligation instance for one member for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Unique identifier for the record
    pub id: String,
    /// The owing member
    pub member_id: String,
    /// Seed money or monthly contribution
    pub payment_type: PaymentType,
    /// Which period the obligation covers
    pub period: Period,
    /// Amount owed, fixed at creation from the group rules
    pub total_amount: Money,
    /// Due date; absent means the obligation is never overdue
    pub due_date: Option<NaiveDate>,
    /// Append-only list of individual payments
    pub paid: Vec<PaymentEntry>,
    /// Cached amount outstanding including accrued penalty (derived)
    pub arrears: Money,
    /// Record-level approval rollup (derived)
    pub approval: RecordApproval,
    /// Whether the base obligation is settled (derived)
    pub payment_status: PaymentStatus,
}

impl PaymentRecord {
    /// Creates the seed-money obligation for a member, priced from the group
    /// rules.
    #[must_use]
    pub fn seed_money(id: String, member_id: String, year: i32, rules: &GroupRules) -> Self {
        Self {
            id,
            member_id,
            payment_type: PaymentType::SeedMoney,
            period: Period::seed(year),
            total_amount: rules.seed_money.amount,
            due_date: rules.seed_money.due_date,
            paid: Vec::new(),
            arrears: rules.seed_money.amount,
            approval: RecordApproval::Unpaid,
            payment_status: PaymentStatus::Pending,
        }
    }

    /// Creates the monthly-contribution obligation for a member for one
    /// period, deriving the due date from the rules' day-of-month (clamped
    /// to the month's last day for short months).
    pub fn monthly(
        id: String,
        member_id: String,
        year: i32,
        month: u32,
        rules: &GroupRules,
    ) -> Result<Self> {
        let period = Period::monthly(year, month)?;
        let due = due_date_in_month(year, month, rules.monthly_contribution.day_of_month)?;
        Ok(Self {
            id,
            member_id,
            payment_type: PaymentType::MonthlyContribution,
            period,
            total_amount: rules.monthly_contribution.amount,
            due_date: Some(due),
            paid: Vec::new(),
            arrears: rules.monthly_contribution.amount,
            approval: RecordApproval::Unpaid,
            payment_status: PaymentStatus::Pending,
        })
    }

    /// Checks that the period shape matches the payment type: seed money has
    /// no month, monthly contributions require one.
    pub fn validate_period(&self) -> Result<()> {
        match (self.payment_type, self.period.month) {
            (PaymentType::SeedMoney, Some(_)) => Err(Error::Validation {
                message: format!("seed-money record {} must not carry a month", self.id),
            }),
            (PaymentType::MonthlyContribution, None) => Err(Error::Validation {
                message: format!("monthly record {} is missing its month", self.id),
            }),
            _ => Ok(()),
        }
    }
}

/// Resolves a day-of-month rule to a concrete date, clamping to the last day
/// of short months (e.g. day 31 in February becomes February 28/29).
pub fn due_date_in_month(year: i32, month: u32, day_of_month: u8) -> Result<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| Error::Validation {
        message: format!("invalid period {year}-{month}"),
    })?;
    let last_day = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.checked_sub_days(Days::new(1)))
        .map_or(31, |d| d.day());
    let day = u32::from(day_of_month).min(last_day);
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| Error::Validation {
        message: format!("invalid due date {year}-{month}-{day}"),
    })
}
