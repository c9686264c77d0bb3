//! In-memory directory for tests
//!
//! Holds accounts and keys in memory, applies deletions, and records every
//! call in order.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::directory::AccountDirectory;
use crate::types::{Account, AccountPage, DirectoryError};

/// A recorded directory call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListAccounts {
        cursor: Option<String>,
        page_size: i32,
    },
    ListAccessKeys(String),
    GetKeyLastUsed(String),
    DetachAuthorization {
        account: String,
        policy_arn: String,
    },
    DeleteAccessKey {
        account: String,
        key_id: String,
    },
    DeleteAccount(String),
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::DetachAuthorization { .. } | Call::DeleteAccessKey { .. } | Call::DeleteAccount(_)
        )
    }

    pub fn account(&self) -> Option<&str> {
        match self {
            Call::ListAccounts { .. } | Call::GetKeyLastUsed(_) => None,
            Call::ListAccessKeys(account) | Call::DeleteAccount(account) => Some(account),
            Call::DetachAuthorization { account, .. } | Call::DeleteAccessKey { account, .. } => {
                Some(account)
            }
        }
    }
}

/// Fixed "today" the reaper tests run as of
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

/// Noon UTC, `days` before [`today`]
pub fn days_ago(days: i64) -> DateTime<Utc> {
    today().and_hms_opt(12, 0, 0).unwrap().and_utc() - Duration::days(days)
}

#[derive(Default)]
struct State {
    accounts: Vec<Account>,
    deleted: HashSet<String>,
    keys: HashMap<String, Vec<String>>,
    calls: Vec<Call>,
}

#[derive(Default)]
pub struct InMemoryDirectory {
    state: Mutex<State>,
    last_used: HashMap<String, DateTime<Utc>>,
    fail_on: Option<&'static str>,
    drop_cursor: bool,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, name: &str, created_at: DateTime<Utc>, keys: &[&str]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.accounts.push(Account::new(name, created_at));
            state.keys.insert(
                name.to_string(),
                keys.iter().map(|key| key.to_string()).collect(),
            );
        }
        self
    }

    pub fn with_last_used(mut self, key_id: &str, at: DateTime<Utc>) -> Self {
        self.last_used.insert(key_id.to_string(), at);
        self
    }

    /// Fail every call to the named operation
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.fail_on = Some(operation);
        self
    }

    /// Report truncated pages without a marker
    pub fn dropping_cursor(mut self) -> Self {
        self.drop_cursor = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn calls_for(&self, account: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.account() == Some(account))
            .collect()
    }

    /// Accounts that have not been deleted
    pub fn account_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .accounts
            .iter()
            .filter(|a| !state.deleted.contains(&a.name))
            .map(|a| a.name.clone())
            .collect()
    }

    fn record(&self, operation: &'static str, call: Call) -> Result<(), DirectoryError> {
        self.state.lock().unwrap().calls.push(call);
        if self.fail_on == Some(operation) {
            return Err(DirectoryError::Request {
                operation,
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AccountDirectory for InMemoryDirectory {
    async fn list_accounts(
        &self,
        cursor: Option<String>,
        page_size: i32,
    ) -> Result<AccountPage, DirectoryError> {
        self.record(
            "ListUsers",
            Call::ListAccounts {
                cursor: cursor.clone(),
                page_size,
            },
        )?;

        let state = self.state.lock().unwrap();
        let start: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
        let end = (start + page_size as usize).min(state.accounts.len());
        let has_more = end < state.accounts.len();

        // Offsets index the original listing so deletions never shift a cursor
        Ok(AccountPage {
            accounts: state.accounts[start..end]
                .iter()
                .filter(|a| !state.deleted.contains(&a.name))
                .cloned()
                .collect(),
            next_cursor: (has_more && !self.drop_cursor).then(|| end.to_string()),
            has_more,
        })
    }

    async fn list_access_keys(&self, account_name: &str) -> Result<Vec<String>, DirectoryError> {
        self.record("ListAccessKeys", Call::ListAccessKeys(account_name.to_string()))?;
        let state = self.state.lock().unwrap();
        Ok(state.keys.get(account_name).cloned().unwrap_or_default())
    }

    async fn get_key_last_used(
        &self,
        key_id: &str,
    ) -> Result<Option<DateTime<Utc>>, DirectoryError> {
        self.record("GetAccessKeyLastUsed", Call::GetKeyLastUsed(key_id.to_string()))?;
        Ok(self.last_used.get(key_id).copied())
    }

    async fn detach_authorization(
        &self,
        account_name: &str,
        policy_arn: &str,
    ) -> Result<(), DirectoryError> {
        self.record(
            "DetachUserPolicy",
            Call::DetachAuthorization {
                account: account_name.to_string(),
                policy_arn: policy_arn.to_string(),
            },
        )
    }

    async fn delete_access_key(
        &self,
        account_name: &str,
        key_id: &str,
    ) -> Result<(), DirectoryError> {
        self.record(
            "DeleteAccessKey",
            Call::DeleteAccessKey {
                account: account_name.to_string(),
                key_id: key_id.to_string(),
            },
        )?;
        let mut state = self.state.lock().unwrap();
        if let Some(keys) = state.keys.get_mut(account_name) {
            keys.retain(|key| key != key_id);
        }
        Ok(())
    }

    async fn delete_account(&self, account_name: &str) -> Result<(), DirectoryError> {
        self.record("DeleteUser", Call::DeleteAccount(account_name.to_string()))?;
        let mut state = self.state.lock().unwrap();
        state.deleted.insert(account_name.to_string());
        state.keys.remove(account_name);
        Ok(())
    }
}
