//! Known AppRole account families
//!
//! Vault creates one IAM user per AppRole login with a fixed policy
//! attached. Each family pairs that user-name prefix with its policy.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::types::Family;

pub const SLIDES_APP_QA: Family = Family {
    name: "slides-app-qa",
    prefix: "vault-approle-slides-app-qa",
    policy_arn: "arn:aws:iam::241984356181:policy/slidesapp-access",
};

pub const MONOCLE_STAGING: Family = Family {
    name: "monocle-staging",
    prefix: "vault-approle-monocle-staging",
    policy_arn: "arn:aws:iam::241984356181:policy/monocle-staging",
};

/// Selector for a known family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FamilyKind {
    /// vault-approle-slides-app-qa* users
    SlidesAppQa,
    /// vault-approle-monocle-staging* users
    MonocleStaging,
}

impl FamilyKind {
    /// All known families, in the order they are processed
    pub const ALL: [FamilyKind; 2] = [FamilyKind::SlidesAppQa, FamilyKind::MonocleStaging];

    pub fn family(self) -> Family {
        match self {
            FamilyKind::SlidesAppQa => SLIDES_APP_QA,
            FamilyKind::MonocleStaging => MONOCLE_STAGING,
        }
    }
}

impl std::fmt::Display for FamilyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.family().name)
    }
}

/// Resolve a selection to families, deduplicated, keeping the known order.
/// An empty selection means every known family.
pub fn select(kinds: &[FamilyKind]) -> Vec<Family> {
    FamilyKind::ALL
        .iter()
        .filter(|kind| kinds.is_empty() || kinds.contains(*kind))
        .map(|kind| kind.family())
        .collect()
}
