use super::*;

use std::collections::HashMap;
use std::sync::Mutex as StdMutex;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use shared::protocol::SubmitOutcome;
use tokio::net::TcpListener;

struct StaticSession(Option<AccountId>);

impl WalletSession for StaticSession {
    fn is_signed_in(&self) -> bool {
        self.0.is_some()
    }

    fn account_id(&self) -> Option<AccountId> {
        self.0.clone()
    }

    fn login(&self) {}

    fn logout(&self) {}
}

#[derive(Clone)]
struct GatewayState {
    owner: String,
    records: Arc<StdMutex<HashMap<String, f64>>>,
    signers_seen: Arc<StdMutex<Vec<String>>>,
}

impl GatewayState {
    fn owned_by(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            records: Arc::new(StdMutex::new(HashMap::new())),
            signers_seen: Arc::new(StdMutex::new(Vec::new())),
        }
    }
}

type CallFailure = (StatusCode, Json<ApiError>);

async fn call_get_pnl(
    State(state): State<GatewayState>,
    Json(call): Json<ContractCall>,
) -> Result<Json<PnlResponse>, CallFailure> {
    match call {
        ContractCall::GetPnl { account_id } => {
            let value = state
                .records
                .lock()
                .expect("records")
                .get(account_id.as_str())
                .copied()
                .unwrap_or(0.0);
            Ok(Json(PnlResponse { value }))
        }
        other => Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(
                ErrorCode::Validation,
                format!("unexpected call {other:?}"),
            )),
        )),
    }
}

async fn call_add_statement(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(call): Json<ContractCall>,
) -> Result<Json<SubmitReceipt>, CallFailure> {
    let Some(signer) = headers
        .get(SIGNER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
    else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiError::new(ErrorCode::Unauthorized, "missing signer")),
        ));
    };
    state
        .signers_seen
        .lock()
        .expect("signers")
        .push(signer.clone());

    if signer != state.owner {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiError::new(
                ErrorCode::Forbidden,
                "caller is not the statement owner",
            )),
        ));
    }

    match call {
        ContractCall::AddStatement { statement } => {
            state
                .records
                .lock()
                .expect("records")
                .insert(signer.clone(), statement);
            Ok(Json(SubmitReceipt {
                account_id: AccountId::new(signer),
                outcome: SubmitOutcome::Recorded,
            }))
        }
        other => Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(
                ErrorCode::Validation,
                format!("unexpected call {other:?}"),
            )),
        )),
    }
}

async fn spawn_gateway(state: GatewayState) -> String {
    let app = Router::new()
        .route("/call/get_pnl", post(call_get_pnl))
        .route("/call/add_statement", post(call_add_statement))
        .with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}/")
}

#[tokio::test]
async fn get_pnl_defaults_to_zero_for_unknown_accounts() {
    let base = spawn_gateway(GatewayState::owned_by("alice.test")).await;
    let proxy =
        GatewayContractProxy::new(&base, Arc::new(StaticSession(None))).expect("proxy");

    let value = proxy
        .get_pnl(&AccountId::from("idontexist.test"))
        .await
        .expect("view call");
    assert_eq!(value, 0.0);
}

#[tokio::test]
async fn add_then_get_round_trips_through_the_gateway() {
    let state = GatewayState::owned_by("alice.test");
    let signers_seen = Arc::clone(&state.signers_seen);
    let base = spawn_gateway(state).await;
    let session = Arc::new(StaticSession(Some(AccountId::from("alice.test"))));
    let proxy = GatewayContractProxy::new(&base, session).expect("proxy");

    proxy.add_statement(0.1).await.expect("write");
    let value = proxy
        .get_pnl(&AccountId::from("alice.test"))
        .await
        .expect("read back");

    assert_eq!(value, 0.1);
    assert_eq!(
        *signers_seen.lock().expect("signers"),
        vec!["alice.test".to_string()]
    );
}

#[tokio::test]
async fn foreign_account_write_decodes_into_an_auth_failure() {
    let base = spawn_gateway(GatewayState::owned_by("alice.test")).await;
    let session = Arc::new(StaticSession(Some(AccountId::from("mallory.test"))));
    let proxy = GatewayContractProxy::new(&base, session).expect("proxy");

    let err = proxy.add_statement(9.9).await.expect_err("forbidden write");
    let api = err
        .downcast_ref::<ApiException>()
        .expect("decoded gateway failure");
    assert!(api.is_auth_failure());
    assert_eq!(api.code, ErrorCode::Forbidden);
}

#[tokio::test]
async fn signed_out_write_is_rejected_before_the_network() {
    // port 9 is the discard service; nothing is listening, so reaching
    // the network at all would fail the test differently
    let proxy = GatewayContractProxy::new(
        "http://127.0.0.1:9/",
        Arc::new(StaticSession(None)),
    )
    .expect("proxy");

    let err = proxy.add_statement(1.0).await.expect_err("no session");
    let api = err
        .downcast_ref::<ApiException>()
        .expect("client-side rejection");
    assert_eq!(api.code, ErrorCode::Unauthorized);
}

#[tokio::test]
async fn call_urls_respect_a_path_style_base() {
    let session: Arc<dyn WalletSession> = Arc::new(StaticSession(None));
    let plain = GatewayContractProxy::new("http://gw.test/", Arc::clone(&session)).expect("proxy");
    assert_eq!(
        plain.call_url("get_pnl").expect("url").as_str(),
        "http://gw.test/call/get_pnl"
    );

    let prefixed =
        GatewayContractProxy::new("http://gw.test/api", session).expect("proxy");
    assert_eq!(
        prefixed.call_url("add_statement").expect("url").as_str(),
        "http://gw.test/api/call/add_statement"
    );
}
