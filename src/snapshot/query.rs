//! Snapshot Query Trigger
//!
//! A query for today is live and carries no date. Any other date is a
//! historical query, bounded by the [`DatePolicy`] and formatted the way
//! the backend expects.

use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::client::{RecordId, ReserveBackend, ReserveRequest};
use crate::error::{DashboardResult, ValidationError};

/// Wire format of historical dates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFormat {
    /// `YYYY-MM-DD`
    #[default]
    Iso,
    /// `DD.MM.YYYY`
    Dotted,
}

impl DateFormat {
    fn pattern(self) -> &'static str {
        match self {
            DateFormat::Iso => "%Y-%m-%d",
            DateFormat::Dotted => "%d.%m.%Y",
        }
    }

    pub fn format(self, date: NaiveDate) -> String {
        date.format(self.pattern()).to_string()
    }

    /// Parse in this format, falling back to ISO
    pub fn parse(self, input: &str) -> Result<NaiveDate, ValidationError> {
        let input = input.trim();
        NaiveDate::parse_from_str(input, self.pattern())
            .or_else(|_| NaiveDate::parse_from_str(input, DateFormat::Iso.pattern()))
            .map_err(|_| ValidationError::InvalidDate(input.to_string()))
    }
}

impl FromStr for DateFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "iso" => Ok(DateFormat::Iso),
            "dotted" => Ok(DateFormat::Dotted),
            other => Err(format!("unknown date format {:?}", other)),
        }
    }
}

/// Latest selectable historical date
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaxDate {
    #[default]
    Yesterday,
    Today,
}

impl MaxDate {
    pub fn latest(self, today: NaiveDate) -> NaiveDate {
        match self {
            MaxDate::Yesterday => today - Duration::days(1),
            MaxDate::Today => today,
        }
    }
}

impl FromStr for MaxDate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yesterday" => Ok(MaxDate::Yesterday),
            "today" => Ok(MaxDate::Today),
            other => Err(format!("unknown max date rule {:?}", other)),
        }
    }
}

/// Selectable range and wire format of historical queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatePolicy {
    pub format: DateFormat,
    pub max_date: MaxDate,
    pub earliest: NaiveDate,
}

impl Default for DatePolicy {
    fn default() -> Self {
        Self {
            format: DateFormat::default(),
            max_date: MaxDate::default(),
            earliest: NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid calendar date"),
        }
    }
}

impl DatePolicy {
    pub fn latest(&self, today: NaiveDate) -> NaiveDate {
        self.max_date.latest(today)
    }

    /// Ensure a historical date lies in `[earliest, latest]`
    pub fn check(&self, date: NaiveDate, today: NaiveDate) -> Result<(), ValidationError> {
        let latest = self.latest(today);
        if date < self.earliest || date > latest {
            return Err(ValidationError::DateOutOfRange {
                date,
                earliest: self.earliest,
                latest,
            });
        }
        Ok(())
    }

    /// Request body for a query; `None` or today means live
    pub fn request(
        &self,
        list_id: &RecordId,
        date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<ReserveRequest, ValidationError> {
        let date = match date {
            Some(date) if date != today => {
                self.check(date, today)?;
                Some(self.format.format(date))
            }
            _ => None,
        };

        Ok(ReserveRequest {
            list_id: list_id.clone(),
            date,
        })
    }
}

/// What the backend said about a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// A snapshot was produced and can be shown
    Snapshot(RecordId),
    /// Accepted without an identifier
    Accepted,
}

impl fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOutcome::Snapshot(id) => write!(f, "snapshot {}", id),
            QueryOutcome::Accepted => f.write_str("accepted"),
        }
    }
}

/// Issues reserve queries for lists
pub struct QueryTrigger<'a> {
    backend: &'a dyn ReserveBackend,
    policy: DatePolicy,
}

impl<'a> QueryTrigger<'a> {
    pub fn new(backend: &'a dyn ReserveBackend, policy: DatePolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> &DatePolicy {
        &self.policy
    }

    /// Send one query; no retry on failure
    pub async fn query(
        &self,
        list_id: &RecordId,
        date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> DashboardResult<QueryOutcome> {
        let request = self.policy.request(list_id, date, today)?;
        let live = request.date.is_none();

        let response = self.backend.create_reserve(&request).await?;
        let outcome = match response.snapshot_id() {
            Some(id) => QueryOutcome::Snapshot(id.clone()),
            None => QueryOutcome::Accepted,
        };

        tracing::info!(%list_id, live, %outcome, "Reserve query sent");
        Ok(outcome)
    }
}
