use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Ledger account identifier, e.g. `alice.test`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One persisted PnL statement as read back from the ledger. Accounts that
/// never submitted read as `0.0` rather than an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub account_id: AccountId,
    pub value: f64,
}

/// Ledger network the client is pointed at. Controls which block explorer
/// the confirmation notice links to; `Development` shares the testnet
/// explorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    Development,
    #[default]
    Testnet,
    Mainnet,
}

impl Network {
    fn explorer_network(&self) -> &'static str {
        match self {
            Network::Development | Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
        }
    }

    pub fn explorer_account_url(&self, account_id: &AccountId) -> String {
        format!(
            "https://explorer.{}.near.org/accounts/{}",
            self.explorer_network(),
            account_id
        )
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Development => "development",
            Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown network {0:?} (expected development, testnet or mainnet)")]
pub struct UnknownNetwork(String);

impl FromStr for Network {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Network::Development),
            "testnet" => Ok(Network::Testnet),
            "mainnet" => Ok(Network::Mainnet),
            other => Err(UnknownNetwork(other.to_string())),
        }
    }
}
