//! Account Directory
//!
//! Trait-based abstraction over the identity directory the reaper reads
//! from and deletes in, plus a lazy stream over its paginated user listing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream};

use crate::types::{AccountPage, DirectoryError};

/// Calls the reaper makes against the identity directory
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// List one page of accounts, starting after `cursor`
    async fn list_accounts(
        &self,
        cursor: Option<String>,
        page_size: i32,
    ) -> Result<AccountPage, DirectoryError>;

    /// List the access key IDs belonging to an account
    async fn list_access_keys(&self, account_name: &str) -> Result<Vec<String>, DirectoryError>;

    /// When the key was last used, `None` if never
    async fn get_key_last_used(&self, key_id: &str)
        -> Result<Option<DateTime<Utc>>, DirectoryError>;

    /// Detach a managed policy from an account
    async fn detach_authorization(
        &self,
        account_name: &str,
        policy_arn: &str,
    ) -> Result<(), DirectoryError>;

    async fn delete_access_key(&self, account_name: &str, key_id: &str)
        -> Result<(), DirectoryError>;

    /// Delete the account. Fails while a policy or key is still attached.
    async fn delete_account(&self, account_name: &str) -> Result<(), DirectoryError>;
}

enum PageCursor {
    Start,
    Next(String),
    Done,
}

/// Stream every page of the account listing, following cursors until the
/// directory reports no more pages.
///
/// Pages are fetched lazily as the stream is polled. A page that claims more
/// results without a cursor ends the stream with an error.
pub fn account_pages<'a, D>(
    directory: &'a D,
    page_size: i32,
) -> impl Stream<Item = Result<AccountPage, DirectoryError>> + 'a
where
    D: AccountDirectory + ?Sized,
{
    stream::try_unfold(PageCursor::Start, move |cursor| async move {
        let marker = match cursor {
            PageCursor::Done => return Ok(None),
            PageCursor::Start => None,
            PageCursor::Next(marker) => Some(marker),
        };

        let page = directory.list_accounts(marker, page_size).await?;

        let next = match (page.has_more, page.next_cursor.as_ref()) {
            (false, _) => PageCursor::Done,
            (true, Some(cursor)) => PageCursor::Next(cursor.clone()),
            (true, None) => {
                return Err(DirectoryError::MalformedResponse {
                    operation: "ListUsers",
                    message: "truncated page without a marker".to_string(),
                })
            }
        };

        Ok::<_, DirectoryError>(Some((page, next)))
    })
}
