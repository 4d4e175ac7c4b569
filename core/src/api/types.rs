//! API Types
//!
//! Request/response types for the HTTP API. Field names are camelCase on the
//! wire. Account ids, record ids and signatures travel as base58 strings;
//! commitments, nullifiers and secret hashes as hex or base58.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use murk_account::AccountId;
use murk_privacy::{ALLOWED_AMOUNTS, DENOMINATION_VERSION};

use crate::error::{ErrorKind, PoolError};
use crate::pool::{PendingWithdrawal, PoolStats, Settlement};
use crate::relayer::{RelayError, RelayerStatus};

// ============================================================================
// Relay
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    /// Pending record address of the recipient
    pub record_ref: String,
    pub recipient: String,
    /// Recipient signature over `claim:<recordRef>`
    pub signature: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateClaimRequest {
    pub commitment: String,
    pub nullifier: String,
    pub secret_hash: String,
    pub amount: u64,
    pub recipient: String,
    /// Recipient signature over `claim:<commitment>`
    pub signature: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayResponse {
    pub settlement_ref: String,
    pub relayer_id: String,
    pub sequence: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayerStatusResponse {
    pub configured: bool,
    pub relayer_address: Option<String>,
    pub balance: u64,
    pub settlement_fee: u64,
}

impl From<RelayerStatus> for RelayerStatusResponse {
    fn from(s: RelayerStatus) -> Self {
        Self {
            configured: s.configured,
            relayer_address: s.address.map(|a| a.to_bs58()),
            balance: s.balance,
            settlement_fee: s.settlement_fee,
        }
    }
}

// ============================================================================
// Submissions
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    pub depositor: String,
    pub commitment: String,
    pub amount: u64,
    /// Depositor signature over `deposit:<commitment>:<amount>`
    pub signature: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequest {
    pub recipient: String,
    pub amount: u64,
    /// Recipient signature over `request:<pending record>:<amount>`
    pub signature: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResponse {
    pub settlement_ref: String,
    pub sequence: u64,
    pub kind: String,
}

impl From<Settlement> for SettlementResponse {
    fn from(s: Settlement) -> Self {
        Self {
            settlement_ref: s.reference_bs58(),
            sequence: s.sequence,
            kind: s.kind.as_str().to_string(),
        }
    }
}

// ============================================================================
// Operator
// ============================================================================

// Operator bodies carry the pool authority's signature over the matching
// operator message at the current pool sequence.

#[derive(Debug, Deserialize)]
pub struct BatchClaimRequest {
    /// Flattened `[record, recipient, record, recipient, ..]`
    pub accounts: Vec<String>,
    /// Signature over `batch:<accounts..>:<sequence>`
    #[serde(default)]
    pub signature: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChurnVaultRequest {
    pub index: u8,
    /// Signature over `churn-vault:<index>:<sequence>`
    #[serde(default)]
    pub signature: Option<String>,
}

/// Body of both `/operator/churn` and `/operator/unchurn`.
#[derive(Debug, Deserialize)]
pub struct ChurnRequest {
    pub index: u8,
    pub amount: u64,
    #[serde(default)]
    pub signature: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AirdropRequest {
    pub account: String,
    pub amount: u64,
}

// ============================================================================
// Reads
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStatsResponse {
    pub authority: String,
    pub total_deposited: u64,
    pub total_withdrawn: u64,
    pub deposit_count: u64,
    pub withdraw_count: u64,
    pub churn_count: u64,
    pub sequence: u64,
    pub vault_balance: u64,
    pub churn_balances: Vec<u64>,
    pub denomination_version: u8,
    pub allowed_amounts: Vec<u64>,
}

impl From<PoolStats> for PoolStatsResponse {
    fn from(s: PoolStats) -> Self {
        let a = s.aggregate;
        Self {
            authority: a.authority.to_bs58(),
            total_deposited: a.total_deposited,
            total_withdrawn: a.total_withdrawn,
            deposit_count: a.deposit_count,
            withdraw_count: a.withdraw_count,
            churn_count: a.churn_count,
            sequence: a.sequence,
            vault_balance: s.vault_balance,
            churn_balances: s.churn_balances.to_vec(),
            denomination_version: DENOMINATION_VERSION,
            allowed_amounts: ALLOWED_AMOUNTS.to_vec(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingResponse {
    pub recipient: String,
    pub record: String,
    pub amount: u64,
    pub requested_at: i64,
    pub available_at: i64,
    pub claimed: bool,
    pub ready: bool,
}

impl PendingResponse {
    pub fn new(p: &PendingWithdrawal, now: i64) -> Self {
        Self {
            recipient: p.recipient.to_bs58(),
            record: p.address().to_bs58(),
            amount: p.amount,
            requested_at: p.requested_at,
            available_at: p.available_at,
            claimed: p.claimed,
            ready: !p.claimed && p.is_ready(now),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentResponse {
    pub commitment: String,
    pub amount: u64,
    pub timestamp: i64,
    pub spent: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NullifierResponse {
    pub nullifier: String,
    pub used: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub account: String,
    pub balance: u64,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub retryable: bool,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>, retryable: bool) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            retryable,
        }
    }

    /// Unparseable input.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(msg, ErrorKind::Validation.as_str(), false)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(msg, "NOT_FOUND", false)
    }

    pub fn from_pool(err: &PoolError) -> Self {
        Self::new(err.to_string(), err.kind().as_str(), err.is_retryable())
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::BatchShape => StatusCode::BAD_REQUEST,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::StateConflict => StatusCode::CONFLICT,
        ErrorKind::Resource => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn relay_error_parts(err: &RelayError) -> (StatusCode, ErrorResponse) {
    match err {
        RelayError::NotConfigured => (
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorResponse::new(err.to_string(), "RELAYER_NOT_CONFIGURED", true),
        ),
        RelayError::Pool(e) => (status_for(e.kind()), ErrorResponse::from_pool(e)),
    }
}

// ============================================================================
// Parsing
// ============================================================================

pub fn parse_account(field: &str, value: &str) -> Result<AccountId, ErrorResponse> {
    value
        .parse()
        .map_err(|e| ErrorResponse::validation(format!("invalid {}: {}", field, e)))
}

pub fn parse_hash<T>(
    field: &str,
    value: &str,
    parse: fn(&str) -> Option<T>,
) -> Result<T, ErrorResponse> {
    parse(value).ok_or_else(|| ErrorResponse::validation(format!("invalid {}", field)))
}

pub fn parse_signature(value: &str) -> Result<Vec<u8>, ErrorResponse> {
    let bytes = bs58::decode(value)
        .into_vec()
        .map_err(|_| ErrorResponse::validation("invalid signature encoding"))?;
    if bytes.len() != 64 {
        return Err(ErrorResponse::validation(format!(
            "signature must be 64 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::Validation), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::BatchShape), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::Authorization), StatusCode::FORBIDDEN);
        assert_eq!(status_for(ErrorKind::StateConflict), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::Resource), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(ErrorKind::Storage), StatusCode::INTERNAL_SERVER_ERROR);

        let (status, body) = relay_error_parts(&RelayError::NotConfigured);
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.retryable);
    }

    #[test]
    fn test_error_body() {
        let body = ErrorResponse::from_pool(&PoolError::NullifierUsed);
        assert_eq!(body.code, "STATE_CONFLICT");
        assert!(!body.retryable);
        assert_eq!(body.error, "Nullifier already used");
    }

    #[test]
    fn test_claim_request_is_camel_case() {
        let req: ClaimRequest = serde_json::from_str(
            r#"{"recordRef":"a","recipient":"b","signature":"c"}"#,
        )
        .unwrap();
        assert_eq!(req.record_ref, "a");
    }

    #[test]
    fn test_operator_signature_is_optional_on_the_wire() {
        let req: ChurnRequest = serde_json::from_str(r#"{"index":1,"amount":5}"#).unwrap();
        assert!(req.signature.is_none());
    }

    #[test]
    fn test_parse_signature_length() {
        assert!(parse_signature(&bs58::encode([1u8; 64]).into_string()).is_ok());
        assert!(parse_signature(&bs58::encode([1u8; 10]).into_string()).is_err());
        assert!(parse_signature("0OIl").is_err());
    }
}
