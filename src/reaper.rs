//! Account Reaper
//!
//! Pages through every user in the directory and removes the stale ones in
//! a family. For each user:
//!
//! 1. Skip unless the name has the family prefix (or the scope is all accounts)
//! 2. Skip unless it was created before the retention cutoff
//! 3. Skip with an anomaly unless it has exactly one access key
//! 4. Skip if the key has been used and only never-used keys are eligible
//! 5. Otherwise report the deletion, then detach the policy, delete the key
//!    and delete the user. A dry run stops after the report.
//!
//! Users are handled one at a time in listing order. The first directory
//! error ends the run; steps already completed are not rolled back.

use chrono::{NaiveDate, Utc};
use futures::TryStreamExt;
use tracing::{debug, info, warn};

use crate::config::{RunConfig, Scope, UsageFilter};
use crate::directory::{account_pages, AccountDirectory};
use crate::types::{Account, Decision, DirectoryError, Family, ReapError, ReapReport};

/// Outcome of inspecting one in-scope account
enum Verdict {
    Skip(Decision),
    Eligible { decision: Decision, key_id: String },
}

/// Deletes stale accounts from a directory
pub struct Reaper<D> {
    directory: D,
    config: RunConfig,
    today: NaiveDate,
}

impl<D: AccountDirectory> Reaper<D> {
    pub fn new(directory: D, config: RunConfig) -> Self {
        Self {
            directory,
            config,
            today: Utc::now().date_naive(),
        }
    }

    /// Compute the retention cutoff from this date instead of today
    pub fn as_of(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Reap each family in order, one report per family.
    ///
    /// The configuration is checked before anything is listed.
    pub async fn run(&self, families: &[Family]) -> Result<Vec<ReapReport>, ReapError> {
        self.config.validate()?;

        let mut reports = Vec::with_capacity(families.len());
        for family in families {
            reports.push(self.reap(family).await?);
        }
        Ok(reports)
    }

    /// Scan the whole directory for stale accounts in one family
    pub async fn reap(&self, family: &Family) -> Result<ReapReport, ReapError> {
        self.config.validate()?;

        let cutoff = self.config.cutoff(self.today);
        info!(
            family = %family,
            cutoff = %cutoff,
            scope = ?self.config.scope,
            usage = ?self.config.usage,
            mode = %self.config.mode,
            "Scanning for stale users"
        );

        let mut report = ReapReport::new(family, self.config.mode);

        let pages = account_pages(&self.directory, self.config.page_size);
        futures::pin_mut!(pages);

        while let Some(page) = pages.try_next().await? {
            debug!(count = page.accounts.len(), has_more = page.has_more, "Fetched page");

            for account in page.accounts {
                report.scanned += 1;

                if !self.in_scope(family, &account) || !is_stale(&account, cutoff) {
                    debug!(account = %account.name, "Filtered out");
                    report.filtered += 1;
                    continue;
                }

                match self.inspect(&account).await? {
                    Verdict::Skip(decision) => {
                        self.announce(&decision);
                        report.decisions.push(decision);
                    }
                    Verdict::Eligible { decision, key_id } => {
                        self.announce(&decision);
                        report.decisions.push(decision);

                        if !self.config.is_simulation() {
                            self.delete(family, &account.name, &key_id).await?;
                            report.deleted += 1;
                        }
                    }
                }
            }
        }

        info!(
            family = %family,
            scanned = report.scanned,
            eligible = report.eligible(),
            deleted = report.deleted,
            anomalies = report.anomalies(),
            "Scan complete"
        );

        Ok(report)
    }

    fn in_scope(&self, family: &Family, account: &Account) -> bool {
        self.config.scope == Scope::AllAccounts || family.matches(&account.name)
    }

    async fn inspect(&self, account: &Account) -> Result<Verdict, DirectoryError> {
        let mut keys = self.directory.list_access_keys(&account.name).await?;

        // Exactly one key is expected; never guess which one to delete
        if keys.len() != 1 {
            return Ok(Verdict::Skip(Decision::Anomaly {
                account: account.name.clone(),
                key_count: keys.len(),
            }));
        }
        let key_id = keys.remove(0);

        let last_used = self.directory.get_key_last_used(&key_id).await?;
        if self.config.usage == UsageFilter::NeverUsedOnly && last_used.is_some() {
            return Ok(Verdict::Skip(Decision::InUse {
                account: account.name.clone(),
            }));
        }

        Ok(Verdict::Eligible {
            decision: Decision::Delete {
                account: account.name.clone(),
                created_at: account.created_at,
            },
            key_id,
        })
    }

    fn announce(&self, decision: &Decision) {
        let mode = self.config.mode;
        match decision {
            Decision::Anomaly { key_count, .. } => {
                warn!(account = %decision.account(), key_count, %mode, "{}", decision)
            }
            Decision::InUse { .. } => info!(account = %decision.account(), %mode, "{}", decision),
            Decision::Delete { .. } => info!(account = %decision.account(), %mode, "{}", decision),
        }
    }

    /// The directory refuses each step until the previous one is done
    async fn delete(
        &self,
        family: &Family,
        account_name: &str,
        key_id: &str,
    ) -> Result<(), DirectoryError> {
        self.directory
            .detach_authorization(account_name, family.policy_arn)
            .await?;
        self.directory.delete_access_key(account_name, key_id).await?;
        self.directory.delete_account(account_name).await?;

        debug!(account = %account_name, "Deleted");
        Ok(())
    }
}

fn is_stale(account: &Account, cutoff: NaiveDate) -> bool {
    account.created_at.date_naive() < cutoff
}
