use serde::{Deserialize, Serialize};
use std::fmt;

/// Account service level, determining the daily survey quota.
///
/// The serde names (`business_basic`, ...) are the storage and wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountTier {
    Free,
    BusinessBasic,
    BusinessPremium,
    BusinessExpert,
    Platinum,
}

impl fmt::Display for AccountTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccountTier::Free => "free",
            AccountTier::BusinessBasic => "business_basic",
            AccountTier::BusinessPremium => "business_premium",
            AccountTier::BusinessExpert => "business_expert",
            AccountTier::Platinum => "platinum",
        };
        f.write_str(name)
    }
}

/// A purchasable upgrade package.
///
/// `price` is in whole Kenyan shillings; confirmation messages quoting less
/// than this amount are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub price: u32,
    pub tier: AccountTier,
    pub daily_limit: u32,
}

/// Immutable package table, loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    packages: Vec<Package>,
}

impl Catalog {
    pub fn new(packages: Vec<Package>) -> Self {
        Self { packages }
    }

    /// The production package table.
    pub fn builtin() -> Self {
        let package = |name: &str, price: u32, tier: AccountTier, daily_limit: u32| Package {
            name: name.to_string(),
            price,
            tier,
            daily_limit,
        };
        Self::new(vec![
            package("Business Basic", 200, AccountTier::BusinessBasic, 10),
            package("Business Premium", 400, AccountTier::BusinessPremium, 15),
            package("Business Expert", 800, AccountTier::BusinessExpert, 20),
            package("PLATINUM", 1200, AccountTier::Platinum, 40),
        ])
    }

    /// Exact-name lookup. Unknown names are a client error, not a fault.
    pub fn lookup(&self, package_name: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.name == package_name)
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
