//! Toast-style notifications
//!
//! Every user action ends in exactly one [`Notification`]. Front-ends decide
//! how to show it; the terminal front-end prints it and mirrors it to the log.

use std::fmt;

use crate::error::DashboardError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }

    /// Convert a failed `action` into the message the user sees.
    ///
    /// A missing record is an empty state, not a failure.
    pub fn from_error(action: &str, error: &DashboardError) -> Self {
        let message = match error {
            DashboardError::Validation(e) => format!("{}: {}", action, e),
            DashboardError::NotFound(_) => return Self::info(format!("{}: not found", action)),
            DashboardError::Unauthenticated => {
                "Session expired or missing, log in again with `por login`".to_string()
            }
            DashboardError::ImportRejected(status) => {
                format!("{}: backend answered {:?}, draft kept", action, status)
            }
            DashboardError::Network(_) | DashboardError::Http { .. } => {
                format!("{} failed, check the connection and try again", action)
            }
            other => format!("{} failed: {}", action, other),
        };
        Self::error(message)
    }

    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }

    /// Print to the terminal and record a matching log event
    pub fn emit(&self) {
        match self.level {
            Level::Success => {
                tracing::info!(text = %self.message, "notification");
                println!("{}", self);
            }
            Level::Info => {
                tracing::debug!(text = %self.message, "notification");
                println!("{}", self);
            }
            Level::Error => {
                tracing::error!(text = %self.message, "notification");
                eprintln!("{}", self);
            }
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.level {
            Level::Success => "✓",
            Level::Info => "i",
            Level::Error => "✕",
        };
        write!(f, "{} {}", marker, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    #[test]
    fn test_error_messages() {
        let validation = Notification::from_error(
            "Add wallet",
            &DashboardError::Validation(ValidationError::ChainNotSelected),
        );
        assert_eq!(validation.message, "Add wallet: no chain selected");
        assert!(validation.is_error());

        let missing = Notification::from_error(
            "Load snapshot",
            &DashboardError::NotFound("/snapshots/3".into()),
        );
        assert_eq!(missing.message, "Load snapshot: not found");
        assert!(!missing.is_error());

        let http = Notification::from_error(
            "Import",
            &DashboardError::Http {
                status: 500,
                message: "boom".into(),
            },
        );
        assert_eq!(http.message, "Import failed, check the connection and try again");
    }

    #[test]
    fn test_display_markers() {
        assert_eq!(Notification::success("Saved").to_string(), "✓ Saved");
        assert_eq!(Notification::error("Nope").to_string(), "✕ Nope");
    }
}
