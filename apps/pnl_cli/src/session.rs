use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use anyhow::{Context, Result};
use client_core::WalletSession;
use serde::{Deserialize, Serialize};
use shared::domain::AccountId;
use tracing::{info, warn};

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    account_id: AccountId,
}

/// Wallet session persisted as a small JSON file under the user data
/// directory. The stored account is the signer the gateway authorizes
/// writes against.
pub struct FileWalletSession {
    path: PathBuf,
    account: RwLock<Option<AccountId>>,
}

impl FileWalletSession {
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let account = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<StoredSession>(&raw) {
                Ok(stored) => Some(stored.account_id),
                Err(err) => {
                    warn!("ignoring unreadable session file {}: {err}", path.display());
                    None
                }
            },
            Err(_) => None,
        };
        Self {
            path,
            account: RwLock::new(account),
        }
    }

    pub fn sign_in_as(&self, account_id: AccountId) -> Result<()> {
        let raw = serde_json::to_string_pretty(&StoredSession {
            account_id: account_id.clone(),
        })?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        fs::write(&self.path, raw)
            .with_context(|| format!("cannot write session file {}", self.path.display()))?;
        *self.account.write().expect("session state") = Some(account_id);
        Ok(())
    }
}

impl WalletSession for FileWalletSession {
    fn is_signed_in(&self) -> bool {
        self.account.read().expect("session state").is_some()
    }

    fn account_id(&self) -> Option<AccountId> {
        self.account.read().expect("session state").clone()
    }

    fn login(&self) {
        // redirect-style sign-in has no meaning for a file-backed session
        info!("sign-in needs an account id; run `pnl login <account_id>`");
    }

    fn logout(&self) {
        self.account.write().expect("session state").take();
        // fire-and-forget; a failed removal only leaves a stale file
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "could not remove session file {}: {err}",
                    self.path.display()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_persists_across_reload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");

        let session = FileWalletSession::load(&path);
        assert!(!session.is_signed_in());

        session
            .sign_in_as(AccountId::from("alice.test"))
            .expect("sign in");
        assert_eq!(session.account_id(), Some(AccountId::from("alice.test")));

        let reloaded = FileWalletSession::load(&path);
        assert!(reloaded.is_signed_in());
        assert_eq!(reloaded.account_id(), Some(AccountId::from("alice.test")));
    }

    #[test]
    fn logout_clears_state_and_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");

        let session = FileWalletSession::load(&path);
        session
            .sign_in_as(AccountId::from("alice.test"))
            .expect("sign in");
        session.logout();

        assert!(!session.is_signed_in());
        assert!(!path.exists());
        assert!(!FileWalletSession::load(&path).is_signed_in());
    }

    #[test]
    fn corrupt_session_file_reads_as_signed_out() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").expect("write");

        let session = FileWalletSession::load(&path);
        assert!(!session.is_signed_in());
    }
}
