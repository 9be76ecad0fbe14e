//! HTTP realization of the contract RPC boundary.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use shared::{
    domain::AccountId,
    error::{ApiError, ApiException, ErrorCode},
    protocol::{ContractCall, PnlResponse, SubmitReceipt},
};
use tracing::debug;
use url::Url;

use crate::{ContractProxy, WalletSession};

/// Header naming the account the write is signed for. The gateway checks
/// it against the statement owner before forwarding the state change.
pub const SIGNER_HEADER: &str = "x-signer-account";

/// [`ContractProxy`] speaking to an HTTP contract gateway: one POST per
/// contract method under `{base}/call/`, JSON bodies in the
/// [`ContractCall`] wire shape, failures decoded from the gateway's
/// [`ApiError`] body.
pub struct GatewayContractProxy {
    http: Client,
    base_url: Url,
    session: Arc<dyn WalletSession>,
}

impl GatewayContractProxy {
    pub fn new(base_url: &str, session: Arc<dyn WalletSession>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("invalid gateway base url {base_url:?}"))?;
        Ok(Self {
            http: Client::new(),
            base_url,
            session,
        })
    }

    fn call_url(&self, method: &str) -> Result<Url> {
        // joining on "call/x" would resolve against the parent of a
        // path-style base, so build the path explicitly
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("gateway base url cannot carry a path"))?
            .pop_if_empty()
            .extend(["call", method]);
        Ok(url)
    }

    async fn decode_failure(response: Response) -> anyhow::Error {
        let status = response.status();
        match response.json::<ApiError>().await {
            Ok(body) => ApiException::new(body.code, body.message).into(),
            Err(_) => anyhow!("gateway returned status {status}"),
        }
    }
}

#[async_trait]
impl ContractProxy for GatewayContractProxy {
    async fn get_pnl(&self, account_id: &AccountId) -> Result<f64> {
        let url = self.call_url("get_pnl")?;
        debug!("get_pnl {account_id} via {url}");
        let response = self
            .http
            .post(url)
            .json(&ContractCall::GetPnl {
                account_id: account_id.clone(),
            })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::decode_failure(response).await);
        }
        let body: PnlResponse = response.json().await?;
        Ok(body.value)
    }

    async fn add_statement(&self, statement: f64) -> Result<()> {
        // reject an absent session before touching the network; the
        // gateway would only bounce it with the same code
        let signer = self
            .session
            .account_id()
            .filter(|_| self.session.is_signed_in())
            .ok_or_else(|| {
                anyhow::Error::from(ApiException::new(
                    ErrorCode::Unauthorized,
                    "no signed-in wallet session",
                ))
            })?;

        let url = self.call_url("add_statement")?;
        debug!("add_statement {statement} as {signer} via {url}");
        let response = self
            .http
            .post(url)
            .header(SIGNER_HEADER, signer.as_str())
            .json(&ContractCall::AddStatement { statement })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::decode_failure(response).await);
        }
        let receipt: SubmitReceipt = response.json().await?;
        debug!(
            "add_statement acknowledged for {} ({:?})",
            receipt.account_id, receipt.outcome
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
