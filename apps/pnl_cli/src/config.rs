use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use shared::domain::{AccountId, Network};

const DEFAULT_CONFIG_FILE: &str = "pnl.toml";

#[derive(Debug, Clone)]
pub struct Settings {
    pub gateway_url: String,
    pub contract_account: AccountId,
    pub network: Network,
    pub session_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gateway_url: "http://127.0.0.1:8080/".into(),
            contract_account: AccountId::from("pnl-statements.testnet"),
            network: Network::Testnet,
            session_file: default_session_file(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    gateway_url: Option<String>,
    contract_account: Option<String>,
    network: Option<String>,
    session_file: Option<PathBuf>,
}

/// Defaults, overlaid by an optional `pnl.toml`, overlaid by `PNL_*`
/// environment variables.
pub fn load_settings(config_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();

    let explicit = config_path.is_some();
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    match fs::read_to_string(&path) {
        Ok(raw) => apply_file(&mut settings, &raw, &path)?,
        Err(err) if explicit => {
            return Err(err).with_context(|| format!("cannot read config {}", path.display()));
        }
        Err(_) => {}
    }

    if let Ok(v) = env::var("PNL_GATEWAY_URL") {
        settings.gateway_url = v;
    }
    if let Ok(v) = env::var("PNL_CONTRACT_ACCOUNT") {
        settings.contract_account = AccountId::new(v);
    }
    if let Ok(v) = env::var("PNL_NETWORK") {
        settings.network = v.parse().context("PNL_NETWORK")?;
    }
    if let Ok(v) = env::var("PNL_SESSION_FILE") {
        settings.session_file = PathBuf::from(v);
    }

    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str, path: &Path) -> Result<()> {
    let file: FileSettings =
        toml::from_str(raw).with_context(|| format!("malformed config {}", path.display()))?;
    if let Some(v) = file.gateway_url {
        settings.gateway_url = v;
    }
    if let Some(v) = file.contract_account {
        settings.contract_account = AccountId::new(v);
    }
    if let Some(v) = file.network {
        settings.network = v
            .parse()
            .with_context(|| format!("network in {}", path.display()))?;
    }
    if let Some(v) = file.session_file {
        settings.session_file = v;
    }
    Ok(())
}

fn default_session_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pnl")
        .join("session.json")
}
