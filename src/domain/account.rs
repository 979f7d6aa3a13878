use crate::domain::package::{AccountTier, Package};
use serde::{Deserialize, Serialize};

/// Daily survey quota granted to accounts that have never purchased a package.
pub const FREE_DAILY_LIMIT: u32 = 3;

/// The slice of a user's account this subsystem is allowed to touch.
///
/// `account_tier` and `daily_survey_limit` are mutated only as a side effect
/// of an upgrade request reaching `verified`; every other account attribute
/// belongs to other subsystems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub account_tier: AccountTier,
    pub daily_survey_limit: u32,
}

impl Profile {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            account_tier: AccountTier::Free,
            daily_survey_limit: FREE_DAILY_LIMIT,
        }
    }

    pub fn apply_upgrade(&mut self, package: &Package) {
        self.account_tier = package.tier;
        self.daily_survey_limit = package.daily_limit;
    }
}
