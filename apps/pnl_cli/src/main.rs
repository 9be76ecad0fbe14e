mod config;
mod session;
mod surface;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use client_core::{
    ControllerConfig, ControllerEvent, GatewayContractProxy, StatementController, WalletSession,
};
use shared::domain::AccountId;

use crate::config::load_settings;
use crate::session::FileWalletSession;
use crate::surface::TerminalSurface;

#[derive(Parser, Debug)]
#[command(name = "pnl", about = "Query and submit PnL statements on the ledger")]
struct Cli {
    /// Config file; defaults to ./pnl.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read any account's statement; works without a session.
    Query { account_id: String },
    /// Submit a new statement for the signed-in account.
    Submit {
        value: String,
        /// Exit right after the confirmation instead of waiting out the
        /// notice window.
        #[arg(long)]
        no_wait: bool,
    },
    /// Show the session and its last persisted statement.
    Status,
    /// Store a wallet session for the given account.
    Login { account_id: String },
    /// Clear the stored wallet session.
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;

    let session = Arc::new(FileWalletSession::load(&settings.session_file));
    let wallet: Arc<dyn WalletSession> = Arc::clone(&session) as Arc<dyn WalletSession>;
    let proxy = Arc::new(GatewayContractProxy::new(
        &settings.gateway_url,
        Arc::clone(&wallet),
    )?);
    let controller = StatementController::new_with_surface(
        ControllerConfig {
            contract_account: settings.contract_account.clone(),
            network: settings.network,
        },
        wallet,
        proxy,
        Arc::new(TerminalSurface),
    );

    match cli.command {
        Command::Query { account_id } => {
            controller
                .load_statement(&AccountId::new(account_id))
                .await?;
        }
        Command::Submit { value, no_wait } => {
            run_submit(&controller, &value, no_wait).await?;
        }
        Command::Status => {
            match session.account_id() {
                Some(account_id) => {
                    println!("Signed in as {account_id} ({})", settings.network);
                    controller.load_statement(&account_id).await?;
                }
                None => println!("Signed out ({})", settings.network),
            }
        }
        Command::Login { account_id } => {
            session.sign_in_as(AccountId::new(account_id.clone()))?;
            println!("Signed in as {account_id}");
        }
        Command::Logout => {
            controller.logout();
            println!("Signed out");
        }
    }

    Ok(())
}

async fn run_submit(
    controller: &Arc<StatementController>,
    value: &str,
    no_wait: bool,
) -> Result<()> {
    let seeded = controller.load_for_session().await?;
    if seeded.is_none() {
        return Err(anyhow!(
            "not signed in; run `pnl login <account_id>` first"
        ));
    }

    controller.on_edit_input(value).await;
    if !controller.state().await.submit_enabled {
        println!("Value matches the persisted statement; nothing to submit.");
        return Ok(());
    }

    let mut events = controller.subscribe_events();
    controller.submit_statement(value).await?;

    if no_wait {
        return Ok(());
    }

    // stay alive until the notice window elapses, so the timed dismissal
    // is observable like in a long-lived UI
    loop {
        match events.recv().await {
            Ok(ControllerEvent::NotificationCleared) => break,
            Ok(_) => continue,
            Err(_) => break,
        }
    }
    Ok(())
}
