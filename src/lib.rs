//! AppRole Reaper Library
//!
//! Finds short-lived Vault AppRole IAM users that are past their retention
//! window and have never used their access key, then removes them.

pub mod config;
pub mod directory;
pub mod families;
pub mod iam;
pub mod reaper;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ExecutionMode, RunConfig, Scope, UsageFilter};
pub use directory::{account_pages, AccountDirectory};
pub use families::FamilyKind;
pub use iam::IamDirectory;
pub use reaper::Reaper;
pub use types::{Account, AccountPage, Decision, Family, ReapReport};
