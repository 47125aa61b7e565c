use crate::error::{JobError, Result};
use hmt_types::{Address, HmtAmount};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// A job manifest as uploaded for the oracles.
///
/// Kept as a JSON object so fields this library does not interpret
/// (task data, request config, ...) survive the upload untouched and
/// hash exactly as the requester wrote them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(Map<String, Value>);

impl Manifest {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(JobError::Configuration(format!(
                "manifest must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| JobError::Configuration(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Parse the fields the escrow needs.
    pub fn terms(&self) -> Result<JobTerms> {
        let task_bid_price = self.decimal("task_bid_price")?;
        if task_bid_price.is_sign_negative() && !task_bid_price.is_zero() {
            return Err(invalid("task_bid_price", "must not be negative"));
        }

        let job_total_tasks = self.integer("job_total_tasks")?;

        let oracle_stake = self.decimal("oracle_stake")?;
        if oracle_stake < Decimal::ZERO || oracle_stake > Decimal::ONE {
            return Err(invalid("oracle_stake", "must be between 0 and 1"));
        }

        Ok(JobTerms {
            task_bid_price,
            job_total_tasks,
            oracle_stake,
            reputation_oracle: self.address("reputation_oracle_addr")?,
            recording_oracle: self.address("recording_oracle_addr")?,
        })
    }

    fn required(&self, field: &str) -> Result<&Value> {
        self.0
            .get(field)
            .filter(|v| !v.is_null())
            .ok_or_else(|| invalid(field, "missing"))
    }

    /// Accepts `"0.05"` or `0.05`.
    fn decimal(&self, field: &str) -> Result<Decimal> {
        let text = match self.required(field)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            other => return Err(invalid(field, &format!("expected a decimal, got {}", json_kind(other)))),
        };
        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .map_err(|e| invalid(field, &e.to_string()))
    }

    /// Accepts `"40"`, `40` or `40.0`.
    fn integer(&self, field: &str) -> Result<u64> {
        match self.required(field)? {
            Value::String(s) => s
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| invalid(field, &e.to_string())),
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().and_then(integral_f64))
                .ok_or_else(|| invalid(field, "expected a non-negative integer")),
            other => Err(invalid(field, &format!("expected an integer, got {}", json_kind(other)))),
        }
    }

    fn address(&self, field: &str) -> Result<Address> {
        match self.required(field)? {
            Value::String(s) => s.parse().map_err(|e: hmt_types::TypesError| invalid(field, &e.to_string())),
            other => Err(invalid(field, &format!("expected an address, got {}", json_kind(other)))),
        }
    }
}

impl From<Map<String, Value>> for Manifest {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// The manifest fields that drive escrow funding and setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTerms {
    pub task_bid_price: Decimal,
    pub job_total_tasks: u64,
    /// Fraction of every payout each oracle keeps, `0..=1`.
    pub oracle_stake: Decimal,
    pub reputation_oracle: Address,
    pub recording_oracle: Address,
}

impl JobTerms {
    /// `task_bid_price * job_total_tasks`, exact.
    pub fn amount(&self) -> Result<Decimal> {
        self.task_bid_price
            .checked_mul(Decimal::from(self.job_total_tasks))
            .ok_or_else(|| invalid("task_bid_price", "amount overflows"))
    }

    pub fn amount_base_units(&self) -> Result<HmtAmount> {
        Ok(HmtAmount::from_decimal(self.amount()?)?)
    }

    /// `oracle_stake * 100`, truncated. Both oracles are set up with it.
    pub fn oracle_stake_percent(&self) -> u8 {
        (self.oracle_stake * Decimal::ONE_HUNDRED)
            .trunc()
            .to_u8()
            .unwrap_or(0)
            .min(100)
    }
}

fn invalid(field: &str, reason: &str) -> JobError {
    JobError::Configuration(format!("manifest field {}: {}", field, reason))
}

// 2^64, the first f64 past u64::MAX.
const U64_LIMIT: f64 = 18_446_744_073_709_551_616.0;

fn integral_f64(value: f64) -> Option<u64> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value < U64_LIMIT {
        Some(value as u64)
    } else {
        None
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
