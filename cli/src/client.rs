//! Thin HTTP client for the node API.

use anyhow::{Result, anyhow};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

pub const DEFAULT_NODE_URL: &str = "http://127.0.0.1:8080";

/// Error body returned by the node on every rejected request.
#[derive(Debug, Deserialize, Error)]
#[error("{error} ({code}, HTTP {status}{})", retry_note(.retryable))]
pub struct NodeError {
    pub error: String,
    pub code: String,
    pub retryable: bool,
    #[serde(skip)]
    pub status: u16,
}

impl NodeError {
    /// The node answered and refused the request. Nothing was settled.
    pub fn is_rejection(&self) -> bool {
        StatusCode::from_u16(self.status).is_ok_and(|s| s.is_client_error())
    }

    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND.as_u16()
    }
}

fn retry_note(retryable: &bool) -> &'static str {
    if *retryable { ", retryable" } else { "" }
}

/// The node's own answer, if `err` carries one.
pub fn node_error(err: &anyhow::Error) -> Option<&NodeError> {
    err.downcast_ref::<NodeError>()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReceipt {
    pub settlement_ref: String,
    pub sequence: u64,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub relayer_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    pub total_deposited: u64,
    pub total_withdrawn: u64,
    pub deposit_count: u64,
    pub withdraw_count: u64,
    pub churn_count: u64,
    pub sequence: u64,
    pub vault_balance: u64,
    pub churn_balances: Vec<u64>,
    pub allowed_amounts: Vec<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayerStatus {
    pub configured: bool,
    pub relayer_address: Option<String>,
    pub balance: u64,
    pub settlement_fee: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pending {
    pub record: String,
    pub amount: u64,
    pub available_at: i64,
    pub claimed: bool,
    pub ready: bool,
}

#[derive(Debug, Deserialize)]
pub struct Balance {
    pub balance: u64,
}

#[derive(Debug, Deserialize)]
pub struct CommitmentStatus {
    pub amount: u64,
    pub spent: bool,
}

#[derive(Debug, Deserialize)]
pub struct NullifierStatus {
    pub used: bool,
}

pub struct NodeClient {
    base_url: String,
    http: reqwest::Client,
}

impl NodeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Uses `MURK_NODE_URL` or the local default.
    pub fn from_env() -> Self {
        Self::new(std::env::var("MURK_NODE_URL").unwrap_or_else(|_| DEFAULT_NODE_URL.to_string()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<NodeError>(&body) {
            Ok(mut e) => {
                e.status = status.as_u16();
                Err(e.into())
            }
            Err(_) => Err(anyhow!("node returned {}: {}", status, body)),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        Self::read(response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;
        Self::read(response).await
    }

    pub async fn pool_stats(&self) -> Result<PoolStats> {
        self.get("/pool/stats").await
    }

    pub async fn relayer_status(&self) -> Result<RelayerStatus> {
        self.get("/relayer-status").await
    }

    pub async fn pending(&self, recipient: &str) -> Result<Pending> {
        self.get(&format!("/pending/{}", recipient)).await
    }

    pub async fn balance(&self, account: &str) -> Result<Balance> {
        self.get(&format!("/balance/{}", account)).await
    }

    /// `None` when the node has never seen `commitment`.
    pub async fn commitment(&self, commitment: &str) -> Result<Option<CommitmentStatus>> {
        match self.get(&format!("/commitment/{}", commitment)).await {
            Ok(c) => Ok(Some(c)),
            Err(e) if node_error(&e).is_some_and(NodeError::is_not_found) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn nullifier(&self, nullifier: &str) -> Result<NullifierStatus> {
        self.get(&format!("/nullifier/{}", nullifier)).await
    }

    pub async fn deposit(
        &self,
        depositor: &str,
        commitment: &str,
        amount: u64,
        signature: &str,
    ) -> Result<SettlementReceipt> {
        let body = json!({
            "depositor": depositor,
            "commitment": commitment,
            "amount": amount,
            "signature": signature,
        });
        self.post("/deposit", &body).await
    }

    pub async fn request(
        &self,
        recipient: &str,
        amount: u64,
        signature: &str,
    ) -> Result<SettlementReceipt> {
        let body = json!({
            "recipient": recipient,
            "amount": amount,
            "signature": signature,
        });
        self.post("/request", &body).await
    }

    pub async fn claim(
        &self,
        record: &str,
        recipient: &str,
        signature: &str,
    ) -> Result<SettlementReceipt> {
        let body = json!({
            "recordRef": record,
            "recipient": recipient,
            "signature": signature,
        });
        self.post("/claim", &body).await
    }

    pub async fn private_claim(&self, body: &Value) -> Result<SettlementReceipt> {
        self.post("/private-claim", body).await
    }

    /// Posts a signed operator call to `/operator/<op>`.
    pub async fn operator(&self, op: &str, body: &Value) -> Result<SettlementReceipt> {
        self.post(&format!("/operator/{}", op), body).await
    }

    pub async fn airdrop(&self, account: &str, amount: u64) -> Result<Balance> {
        self.post("/dev/airdrop", &json!({ "account": account, "amount": amount }))
            .await
    }
}
