//! Reaper Types
//!
//! Accounts as the directory reports them, the decisions the reaper makes
//! about them, and the errors that can stop a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ExecutionMode;

/// A user account as listed by the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account name (e.g. `vault-approle-slides-app-qa-1`)
    pub name: String,
    /// When the account was created
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            created_at,
        }
    }
}

/// One page of a cursor-paginated account listing
#[derive(Debug, Clone, Default)]
pub struct AccountPage {
    pub accounts: Vec<Account>,
    /// Cursor for the next page, present when `has_more` is set
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// A family of machine accounts sharing a name prefix and one managed policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Family {
    /// Short name used in logs and reports
    pub name: &'static str,
    /// Account names in this family start with this prefix
    pub prefix: &'static str,
    /// Policy attached to every account in the family
    pub policy_arn: &'static str,
}

impl Family {
    pub fn matches(&self, account_name: &str) -> bool {
        account_name.starts_with(self.prefix)
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// What the reaper decided for an account that passed the scope and age filters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// The account does not have exactly one access key
    Anomaly { account: String, key_count: usize },
    /// The access key has been used and only never-used keys are eligible
    InUse { account: String },
    /// The account is eligible and is (or in a dry run, would be) deleted
    Delete {
        account: String,
        created_at: DateTime<Utc>,
    },
}

impl Decision {
    pub fn account(&self) -> &str {
        match self {
            Decision::Anomaly { account, .. }
            | Decision::InUse { account }
            | Decision::Delete { account, .. } => account,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Anomaly { account, key_count } => write!(
                f,
                "Got {} keys for {}. This is unexpected and no action will be taken for this user",
                key_count, account
            ),
            Decision::InUse { account } => {
                write!(f, "Key for {} has been used. No action will be taken.", account)
            }
            Decision::Delete {
                account,
                created_at,
            } => write!(f, "User {} ({})...deleting.", account, created_at),
        }
    }
}

/// Outcome of reaping one family
#[derive(Debug, Clone, Serialize)]
pub struct ReapReport {
    pub family: String,
    pub mode: ExecutionMode,
    /// Accounts seen across all pages
    pub scanned: usize,
    /// Accounts dropped by the scope or age filter
    pub filtered: usize,
    /// Decisions in listing order
    pub decisions: Vec<Decision>,
    /// Accounts whose deletion sequence completed
    pub deleted: usize,
}

impl ReapReport {
    pub fn new(family: &Family, mode: ExecutionMode) -> Self {
        Self {
            family: family.name.to_string(),
            mode,
            scanned: 0,
            filtered: 0,
            decisions: Vec::new(),
            deleted: 0,
        }
    }

    pub fn anomalies(&self) -> usize {
        self.decisions
            .iter()
            .filter(|d| matches!(d, Decision::Anomaly { .. }))
            .count()
    }

    pub fn eligible(&self) -> usize {
        self.decisions
            .iter()
            .filter(|d| matches!(d, Decision::Delete { .. }))
            .count()
    }

    /// Format the report for display
    pub fn display(&self) -> String {
        format!(
            "Family {} ({}):\n  Scanned: {}\n  Filtered out: {}\n  Anomalies: {}\n  Eligible: {}\n  Deleted: {}",
            self.family,
            self.mode,
            self.scanned,
            self.filtered,
            self.anomalies(),
            self.eligible(),
            self.deleted
        )
    }
}

/// Errors returned by an account directory
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// A call to the directory service failed
    #[error("{operation} failed: {message}")]
    Request {
        operation: &'static str,
        message: String,
    },

    /// The directory returned something the reaper cannot act on
    #[error("Malformed {operation} response: {message}")]
    MalformedResponse {
        operation: &'static str,
        message: String,
    },
}

/// Errors in the run configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// All-families scope combined with deleting used keys
    #[error("Delete all users older than {retention_days} days? This is not safe!")]
    UnsafeScope { retention_days: u32 },

    /// Page size outside what the directory accepts
    #[error("Page size must be between 1 and {max}, got {got}")]
    PageSize { got: i32, max: i32 },
}

/// Errors that stop a reaper run
#[derive(Debug, Error)]
pub enum ReapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}
