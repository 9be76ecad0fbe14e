use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::domain::{AccountId, Network, Statement};
use thiserror::Error;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

pub mod gateway;

pub use gateway::GatewayContractProxy;

/// How long the success notice stays visible after a submit before it is
/// dismissed without user action.
pub const NOTIFICATION_WINDOW: Duration = Duration::from_millis(11_000);

/// Rendered in place of a statement before the first successful load.
pub const VALUE_SENTINEL: &str = "N.A.";

/// Authenticated wallet identity for the current client. Sign-in and
/// sign-out are fire-and-forget: the wallet owns the handshake, the
/// controller only reads the outcome.
pub trait WalletSession: Send + Sync {
    fn is_signed_in(&self) -> bool;
    fn account_id(&self) -> Option<AccountId>;
    fn login(&self);
    fn logout(&self);
}

pub struct MissingWalletSession;

impl WalletSession for MissingWalletSession {
    fn is_signed_in(&self) -> bool {
        false
    }

    fn account_id(&self) -> Option<AccountId> {
        None
    }

    fn login(&self) {
        warn!("wallet session is unavailable; sign-in ignored");
    }

    fn logout(&self) {
        warn!("wallet session is unavailable; sign-out ignored");
    }
}

/// The contract's two remote methods, treated as an opaque RPC boundary.
/// `get_pnl` is a read-only view call returning `0.0` for accounts that
/// never submitted; `add_statement` is a state change authorized against
/// the signer encoded in the wallet session.
#[async_trait]
pub trait ContractProxy: Send + Sync {
    async fn get_pnl(&self, account_id: &AccountId) -> Result<f64>;
    async fn add_statement(&self, statement: f64) -> Result<()>;
}

pub struct MissingContractProxy;

#[async_trait]
impl ContractProxy for MissingContractProxy {
    async fn get_pnl(&self, account_id: &AccountId) -> Result<f64> {
        Err(anyhow!("contract proxy unavailable for {account_id}"))
    }

    async fn add_statement(&self, _statement: f64) -> Result<()> {
        Err(anyhow!("contract proxy unavailable"))
    }
}

/// Contract between the controller and whatever renders it. The controller
/// only ever needs these six primitives; markup, layout and widget
/// technology stay on the other side of the seam.
pub trait StatementSurface: Send + Sync {
    fn display_value(&self, rendered: &str);
    fn set_submit_enabled(&self, enabled: bool);
    fn set_form_enabled(&self, enabled: bool);
    fn show_notification(&self, context: &NotificationContext);
    fn hide_notification(&self);
    fn alert(&self, message: &str);
}

pub struct NullSurface;

impl StatementSurface for NullSurface {
    fn display_value(&self, _rendered: &str) {}
    fn set_submit_enabled(&self, _enabled: bool) {}
    fn set_form_enabled(&self, _enabled: bool) {}
    fn show_notification(&self, _context: &NotificationContext) {}
    fn hide_notification(&self) {}
    fn alert(&self, _message: &str) {}
}

/// Everything a surface needs to render the success notice, including the
/// explorer links for the signer and the contract account.
#[derive(Debug, Clone)]
pub struct NotificationContext {
    pub account_id: AccountId,
    pub contract_account: AccountId,
    pub network: Network,
    pub shown_at: DateTime<Utc>,
}

impl NotificationContext {
    pub fn signer_explorer_url(&self) -> String {
        self.network.explorer_account_url(&self.account_id)
    }

    pub fn contract_explorer_url(&self) -> String {
        self.network.explorer_account_url(&self.contract_account)
    }
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("statement query failed")]
    QueryFailed {
        #[source]
        source: anyhow::Error,
    },
    #[error("statement submit failed")]
    SubmitFailed {
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Clone)]
pub enum ControllerEvent {
    StatementLoaded(Statement),
    SubmitSucceeded { account_id: AccountId, value: f64 },
    SubmitFailed { message: String },
    NotificationShown,
    NotificationCleared,
}

/// Static wiring for one controller instance.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub contract_account: AccountId,
    pub network: Network,
}

/// Point-in-time copy of the edit state, for surfaces and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct EditStateSnapshot {
    pub last_known_value: Option<f64>,
    pub pending_edit: String,
    pub submit_enabled: bool,
    pub in_flight: bool,
    pub notification_visible: bool,
}

struct EditState {
    last_known_value: Option<f64>,
    pending_edit: String,
    edited: bool,
    submit_enabled: bool,
    in_flight: bool,
    notification_visible: bool,
}

impl EditState {
    fn new() -> Self {
        Self {
            last_known_value: None,
            pending_edit: String::new(),
            edited: false,
            submit_enabled: false,
            in_flight: false,
            notification_visible: false,
        }
    }

    // Invariant: never enabled while a call is in flight, and never
    // enabled before the user has actually edited something.
    fn recompute_submit_enabled(&mut self) {
        let persisted = self.last_known_value.map(render_value);
        self.submit_enabled = !self.in_flight
            && self.edited
            && persisted.as_deref() != Some(self.pending_edit.as_str());
    }

    fn snapshot(&self) -> EditStateSnapshot {
        EditStateSnapshot {
            last_known_value: self.last_known_value,
            pending_edit: self.pending_edit.clone(),
            submit_enabled: self.submit_enabled,
            in_flight: self.in_flight,
            notification_visible: self.notification_visible,
        }
    }
}

/// The query/submit interaction controller.
///
/// Owns the ephemeral edit state for one bound form: which value the ledger
/// last reported, what the user has typed over it, whether the submit
/// control is armed, and whether the timed success notice is up. All
/// durable state lives behind the injected [`ContractProxy`].
pub struct StatementController {
    session: Arc<dyn WalletSession>,
    contract: Arc<dyn ContractProxy>,
    surface: Arc<dyn StatementSurface>,
    config: ControllerConfig,
    state: Mutex<EditState>,
    notification_timer: Mutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<ControllerEvent>,
}

impl StatementController {
    pub fn new(
        config: ControllerConfig,
        session: Arc<dyn WalletSession>,
        contract: Arc<dyn ContractProxy>,
    ) -> Arc<Self> {
        Self::new_with_surface(config, session, contract, Arc::new(NullSurface))
    }

    pub fn new_with_surface(
        config: ControllerConfig,
        session: Arc<dyn WalletSession>,
        contract: Arc<dyn ContractProxy>,
        surface: Arc<dyn StatementSurface>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            session,
            contract,
            surface,
            config,
            state: Mutex::new(EditState::new()),
            notification_timer: Mutex::new(None),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> EditStateSnapshot {
        self.state.lock().await.snapshot()
    }

    /// Startup flow: with a signed-in session, load that account's
    /// statement and seed the edit field with it; signed out, leave the
    /// display at the sentinel.
    pub async fn load_for_session(&self) -> Result<Option<Statement>, ControllerError> {
        match self.current_account() {
            Some(account_id) => self.load_statement(&account_id).await.map(Some),
            None => {
                self.surface.display_value(VALUE_SENTINEL);
                Ok(None)
            }
        }
    }

    /// Read-only query for any account. On success the returned value
    /// becomes the new `last_known_value` and the bound display and edit
    /// field are refreshed from it; on failure the prior value stays
    /// untouched. A single failed query is surfaced immediately, retrying
    /// is the caller's decision.
    pub async fn load_statement(
        &self,
        account_id: &AccountId,
    ) -> Result<Statement, ControllerError> {
        let value = match self.contract.get_pnl(account_id).await {
            Ok(value) => value,
            Err(source) => {
                warn!("query failed for {account_id}: {source:#}");
                return Err(ControllerError::QueryFailed { source });
            }
        };

        let rendered = render_value(value);
        {
            let mut state = self.state.lock().await;
            state.last_known_value = Some(value);
            // the edit field now mirrors the persisted value, so there is
            // nothing to submit until the user types again
            state.pending_edit = rendered.clone();
            state.edited = false;
            state.submit_enabled = false;
        }
        self.surface.display_value(&rendered);
        self.surface.set_submit_enabled(false);

        let statement = Statement {
            account_id: account_id.clone(),
            value,
        };
        debug!("loaded statement {value} for {account_id}");
        let _ = self
            .events
            .send(ControllerEvent::StatementLoaded(statement.clone()));
        Ok(statement)
    }

    /// Called on every keystroke of the bound edit field. Recomputes the
    /// submit-control arming from the raw text alone; no I/O.
    pub async fn on_edit_input(&self, raw: &str) {
        let (was_enabled, enabled) = {
            let mut state = self.state.lock().await;
            state.pending_edit = raw.to_string();
            state.edited = true;
            let was_enabled = state.submit_enabled;
            state.recompute_submit_enabled();
            (was_enabled, state.submit_enabled)
        };
        if enabled != was_enabled {
            self.surface.set_submit_enabled(enabled);
        }
    }

    /// State-changing submit of the edited value for the signed-in
    /// account, followed by a refresh from the source of truth and the
    /// timed success notice.
    ///
    /// With the submit control disarmed or a call already in flight this
    /// is a defensive no-op; the bound control should not have fired.
    pub async fn submit_statement(self: &Arc<Self>, raw: &str) -> Result<(), ControllerError> {
        let account_id = {
            let mut state = self.state.lock().await;
            if !state.submit_enabled || state.in_flight {
                debug!(
                    "submit ignored (enabled={}, in_flight={})",
                    state.submit_enabled, state.in_flight
                );
                return Ok(());
            }
            match self.current_account() {
                Some(account_id) => {
                    state.in_flight = true;
                    state.submit_enabled = false;
                    account_id
                }
                None => {
                    drop(state);
                    self.surface.alert(
                        "Something went wrong! Maybe you need to sign out and back in? \
                         Check the logs for more info.",
                    );
                    let source = anyhow!("no signed-in wallet session");
                    error!("submit rejected: {source}");
                    let _ = self.events.send(ControllerEvent::SubmitFailed {
                        message: source.to_string(),
                    });
                    return Err(ControllerError::SubmitFailed { source });
                }
            }
        };
        self.surface.set_form_enabled(false);
        self.surface.set_submit_enabled(false);

        // Unparsable input deliberately degrades to NaN and still goes out
        // on the wire; the ledger is the validation authority here.
        let parsed = parse_statement(raw);

        if let Err(source) = self.contract.add_statement(parsed).await {
            self.surface.alert(
                "Something went wrong! Maybe you need to sign out and back in? \
                 Check the logs for more info.",
            );
            {
                let mut state = self.state.lock().await;
                state.in_flight = false;
                state.recompute_submit_enabled();
            }
            self.surface.set_form_enabled(true);
            error!("submit failed for {account_id}: {source:#}");
            let _ = self.events.send(ControllerEvent::SubmitFailed {
                message: source.to_string(),
            });
            return Err(ControllerError::SubmitFailed { source });
        }

        // Write acknowledged. Re-read the persisted value rather than
        // trusting what was just sent; the post-submit read is issued
        // strictly after the write's acknowledgment.
        let refreshed = self.load_statement(&account_id).await;
        let statement = match refreshed {
            Ok(statement) => statement,
            Err(err) => {
                {
                    let mut state = self.state.lock().await;
                    state.in_flight = false;
                    state.recompute_submit_enabled();
                }
                self.surface.set_form_enabled(true);
                return Err(err);
            }
        };

        {
            let mut state = self.state.lock().await;
            state.notification_visible = true;
            state.in_flight = false;
        }
        self.surface.set_form_enabled(true);

        let context = NotificationContext {
            account_id: account_id.clone(),
            contract_account: self.config.contract_account.clone(),
            network: self.config.network,
            shown_at: Utc::now(),
        };
        self.surface.show_notification(&context);
        info!("statement {} recorded for {account_id}", statement.value);
        let _ = self.events.send(ControllerEvent::SubmitSucceeded {
            account_id,
            value: statement.value,
        });
        let _ = self.events.send(ControllerEvent::NotificationShown);
        self.restart_notification_timer().await;

        Ok(())
    }

    pub fn login(&self) {
        info!("delegating sign-in to the wallet session");
        self.session.login();
    }

    pub fn logout(&self) {
        info!("delegating sign-out to the wallet session");
        self.session.logout();
    }

    fn current_account(&self) -> Option<AccountId> {
        if !self.session.is_signed_in() {
            return None;
        }
        self.session.account_id()
    }

    // One owned timer per controller: a new success replaces the pending
    // handle and aborts it, so two clears never race.
    async fn restart_notification_timer(self: &Arc<Self>) {
        let controller = Arc::clone(self);
        let task = tokio::spawn(async move {
            tokio::time::sleep(NOTIFICATION_WINDOW).await;
            {
                let mut state = controller.state.lock().await;
                state.notification_visible = false;
            }
            controller.surface.hide_notification();
            let _ = controller.events.send(ControllerEvent::NotificationCleared);
        });

        let previous = {
            let mut timer = self.notification_timer.lock().await;
            timer.replace(task)
        };
        if let Some(previous) = previous {
            previous.abort();
        }
    }
}

/// String form a statement is compared and displayed as. Submit arming
/// compares the raw edit text against this rendering of the last
/// persisted value.
pub fn render_value(value: f64) -> String {
    format!("{value}")
}

/// Permissive numeric parse: anything that is not a number degrades to
/// NaN instead of being rejected client-side.
pub fn parse_statement(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(f64::NAN)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
