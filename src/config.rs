//! Run Configuration
//!
//! Everything that shapes a reaper run, fixed for its duration and passed
//! in explicitly.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::types::ConfigError;

/// Only consider users older than this many days
pub const DEFAULT_RETENTION_DAYS: u32 = 3;

/// Users requested per listing call
pub const DEFAULT_PAGE_SIZE: i32 = 1000;

/// Largest page the IAM ListUsers call accepts
pub const MAX_PAGE_SIZE: i32 = 1000;

/// Which accounts a run looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    /// Only accounts whose name matches the family prefix
    #[default]
    Family,
    /// Every account in the directory, regardless of name
    AllAccounts,
}

/// Which access-key usage states are eligible for deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum UsageFilter {
    /// Any key, used or not
    #[default]
    Any,
    /// Only keys with no last-used timestamp
    NeverUsedOnly,
}

/// Whether decisions are carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// Report decisions without changing anything
    Simulate,
    /// Report decisions and delete eligible accounts
    #[default]
    Execute,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Simulate => write!(f, "dry-run"),
            ExecutionMode::Execute => write!(f, "execute"),
        }
    }
}

/// Configuration for one reaper run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Minimum account age in days
    pub retention_days: u32,
    /// Accounts requested per listing call
    pub page_size: i32,
    pub scope: Scope,
    pub usage: UsageFilter,
    pub mode: ExecutionMode,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            retention_days: DEFAULT_RETENTION_DAYS,
            page_size: DEFAULT_PAGE_SIZE,
            scope: Scope::default(),
            usage: UsageFilter::default(),
            mode: ExecutionMode::default(),
        }
    }
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    pub fn page_size(mut self, size: i32) -> Self {
        self.page_size = size;
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn usage(mut self, usage: UsageFilter) -> Self {
        self.usage = usage;
        self
    }

    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn is_simulation(&self) -> bool {
        self.mode == ExecutionMode::Simulate
    }

    /// Check the configuration before any directory call is made.
    ///
    /// Scanning every account while also deleting used keys is refused.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scope == Scope::AllAccounts && self.usage != UsageFilter::NeverUsedOnly {
            return Err(ConfigError::UnsafeScope {
                retention_days: self.retention_days,
            });
        }

        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(ConfigError::PageSize {
                got: self.page_size,
                max: MAX_PAGE_SIZE,
            });
        }

        Ok(())
    }

    /// Accounts created on or after this date are kept
    pub fn cutoff(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_sub_days(Days::new(u64::from(self.retention_days)))
            .unwrap_or(NaiveDate::MIN)
    }
}
