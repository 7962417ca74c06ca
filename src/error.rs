//! Error types
//!
//! Every dashboard operation returns [`DashboardResult`]. Front-ends turn
//! errors into a single notification at the call site.

use chrono::NaiveDate;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while driving the dashboard
#[derive(Error, Debug)]
pub enum DashboardError {
    /// User input rejected before any network call
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Transport-level failure talking to a remote service
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Remote service answered with a non-success status
    #[error("API error {status}: {message}")]
    Http { status: u16, message: String },

    /// Requested list or snapshot does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// No token in the session, or the backend refused it
    #[error("Not authenticated")]
    Unauthenticated,

    /// Backend answered the import call without an "ok" status
    #[error("Import rejected with status {0:?}")]
    ImportRejected(String),

    /// Response body did not have the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Input problems caught before a request is sent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no chain selected")]
    ChainNotSelected,

    #[error("address is empty")]
    EmptyAddress,

    #[error("invalid chain: {0}")]
    InvalidChain(String),

    #[error("address {address} is not a valid {chain} address")]
    InvalidAddress { chain: String, address: String },

    #[error("{0} wallets cannot hold tokens")]
    TokensUnsupported(String),

    #[error("no draft wallet at index {0}")]
    WalletNotFound(usize),

    #[error("{0} name is empty")]
    EmptyName(&'static str),

    #[error("no exchange selected")]
    NoActiveExchange,

    #[error("date {date} is outside the selectable range {earliest}..={latest}")]
    DateOutOfRange {
        date: NaiveDate,
        earliest: NaiveDate,
        latest: NaiveDate,
    },

    #[error("cannot parse date: {0}")]
    InvalidDate(String),

    #[error("malformed draft row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },
}

impl DashboardError {
    /// Whether the error should render as an empty state instead of a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, DashboardError::NotFound(_))
    }
}

/// Result type for dashboard operations
pub type DashboardResult<T> = Result<T, DashboardError>;
