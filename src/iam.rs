//! AWS IAM Directory
//!
//! [`AccountDirectory`] backed by the AWS IAM API. Credentials come from the
//! default provider chain (environment, shared profile, SSO, instance role).

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_iam::error::DisplayErrorContext;
use aws_sdk_iam::primitives::DateTime as AwsDateTime;
use aws_sdk_iam::Client;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::directory::AccountDirectory;
use crate::types::{Account, AccountPage, DirectoryError};

/// IAM client wrapper
pub struct IamDirectory {
    client: Client,
}

impl IamDirectory {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the shared AWS configuration
    pub async fn from_env(profile: Option<&str>, region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }

        let shared_config = loader.load().await;
        debug!(region = ?shared_config.region(), "Loaded AWS configuration");

        Self::new(Client::new(&shared_config))
    }
}

fn request_error<E>(operation: &'static str, err: E) -> DirectoryError
where
    E: std::error::Error + 'static,
{
    DirectoryError::Request {
        operation,
        message: DisplayErrorContext(err).to_string(),
    }
}

fn to_utc(operation: &'static str, timestamp: &AwsDateTime) -> Result<DateTime<Utc>, DirectoryError> {
    DateTime::<Utc>::from_timestamp(timestamp.secs(), timestamp.subsec_nanos()).ok_or_else(|| {
        DirectoryError::MalformedResponse {
            operation,
            message: format!("timestamp out of range: {}", timestamp),
        }
    })
}

#[async_trait]
impl AccountDirectory for IamDirectory {
    async fn list_accounts(
        &self,
        cursor: Option<String>,
        page_size: i32,
    ) -> Result<AccountPage, DirectoryError> {
        debug!(marker = ?cursor, page_size, "ListUsers");

        let output = self
            .client
            .list_users()
            .max_items(page_size)
            .set_marker(cursor)
            .send()
            .await
            .map_err(|e| request_error("ListUsers", e))?;

        let accounts = output
            .users()
            .iter()
            .map(|user| {
                Ok(Account::new(
                    user.user_name(),
                    to_utc("ListUsers", user.create_date())?,
                ))
            })
            .collect::<Result<Vec<_>, DirectoryError>>()?;

        Ok(AccountPage {
            accounts,
            next_cursor: output.marker().map(str::to_string),
            has_more: output.is_truncated(),
        })
    }

    async fn list_access_keys(&self, account_name: &str) -> Result<Vec<String>, DirectoryError> {
        let output = self
            .client
            .list_access_keys()
            .user_name(account_name)
            .send()
            .await
            .map_err(|e| request_error("ListAccessKeys", e))?;

        output
            .access_key_metadata()
            .iter()
            .map(|key| {
                key.access_key_id()
                    .map(str::to_string)
                    .ok_or_else(|| DirectoryError::MalformedResponse {
                        operation: "ListAccessKeys",
                        message: format!("key without an ID for {}", account_name),
                    })
            })
            .collect()
    }

    async fn get_key_last_used(
        &self,
        key_id: &str,
    ) -> Result<Option<DateTime<Utc>>, DirectoryError> {
        let output = self
            .client
            .get_access_key_last_used()
            .access_key_id(key_id)
            .send()
            .await
            .map_err(|e| request_error("GetAccessKeyLastUsed", e))?;

        output
            .access_key_last_used()
            .and_then(|usage| usage.last_used_date())
            .map(|at| to_utc("GetAccessKeyLastUsed", at))
            .transpose()
    }

    async fn detach_authorization(
        &self,
        account_name: &str,
        policy_arn: &str,
    ) -> Result<(), DirectoryError> {
        self.client
            .detach_user_policy()
            .user_name(account_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(|e| request_error("DetachUserPolicy", e))?;
        Ok(())
    }

    async fn delete_access_key(
        &self,
        account_name: &str,
        key_id: &str,
    ) -> Result<(), DirectoryError> {
        self.client
            .delete_access_key()
            .user_name(account_name)
            .access_key_id(key_id)
            .send()
            .await
            .map_err(|e| request_error("DeleteAccessKey", e))?;
        Ok(())
    }

    async fn delete_account(&self, account_name: &str) -> Result<(), DirectoryError> {
        self.client
            .delete_user()
            .user_name(account_name)
            .send()
            .await
            .map_err(|e| request_error("DeleteUser", e))?;
        Ok(())
    }
}
