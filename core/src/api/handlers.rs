//! API Handlers
//!
//! Request handlers for the HTTP API.

use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::{info, warn};

use murk_account::AccountId;
use murk_privacy::{Commitment, Nullifier, SecretHash};

use super::types::*;
use crate::clock::Clock;
use crate::error::PoolError;
use crate::pool::{ClaimBatch, PoolManager, Settlement};
use crate::relayer::Relayer;

// ============================================================================
// Shared State
// ============================================================================

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub pool: PoolManager,
    pub relayer: Arc<Relayer>,
    pub clock: Arc<dyn Clock>,
    pub dev_mode: bool,
    pub operator_api: bool,
    pub start_time: std::time::Instant,
}

// ============================================================================
// Helpers
// ============================================================================

fn reject(status: StatusCode, body: ErrorResponse) -> Response {
    (status, Json(body)).into_response()
}

fn invalid(body: ErrorResponse) -> Response {
    reject(StatusCode::BAD_REQUEST, body)
}

fn pool_error(context: &str, err: PoolError) -> Response {
    if err.is_retryable() {
        warn!("{} failed: {}", context, err);
    } else {
        info!("{} rejected: {}", context, err);
    }
    reject(status_for(err.kind()), ErrorResponse::from_pool(&err))
}

fn settled(result: Result<Settlement, PoolError>, context: &str) -> Response {
    match result {
        Ok(s) => Json(SettlementResponse::from(s)).into_response(),
        Err(e) => pool_error(context, e),
    }
}

/// Operator calls without a signature never reach the engine.
fn operator_signature(signature: Option<&str>) -> Result<Vec<u8>, Response> {
    let Some(signature) = signature else {
        return Err(reject(
            StatusCode::FORBIDDEN,
            ErrorResponse::from_pool(&PoolError::Unauthorized),
        ));
    };
    parse_signature(signature).map_err(invalid)
}

// ============================================================================
// Health & Status
// ============================================================================

pub async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

pub async fn pool_stats(State(state): State<ApiState>) -> impl IntoResponse {
    match state.pool.stats().await {
        Ok(stats) => Json(PoolStatsResponse::from(stats)).into_response(),
        Err(e) => pool_error("Pool stats", e),
    }
}

// ============================================================================
// Relay
// ============================================================================

/// Relayed legacy claim
pub async fn relay_claim(
    State(state): State<ApiState>,
    Json(req): Json<ClaimRequest>,
) -> impl IntoResponse {
    let parsed = (|| {
        Ok::<_, ErrorResponse>((
            parse_account("recordRef", &req.record_ref)?,
            parse_account("recipient", &req.recipient)?,
            parse_signature(&req.signature)?,
        ))
    })();
    let (record, recipient, signature) = match parsed {
        Ok(p) => p,
        Err(body) => return invalid(body),
    };

    match state
        .relayer
        .relay_claim(&state.pool, record, recipient, &signature)
        .await
    {
        Ok(s) => Json(RelayResponse {
            settlement_ref: s.reference_bs58(),
            relayer_id: state.relayer.address().map(|a| a.to_bs58()).unwrap_or_default(),
            sequence: s.sequence,
        })
        .into_response(),
        Err(e) => {
            info!("Relayed claim rejected: {}", e);
            let (status, body) = relay_error_parts(&e);
            reject(status, body)
        }
    }
}

/// Relayed private withdrawal
pub async fn relay_private_claim(
    State(state): State<ApiState>,
    Json(req): Json<PrivateClaimRequest>,
) -> impl IntoResponse {
    let parsed = (|| {
        Ok::<_, ErrorResponse>((
            parse_hash("commitment", &req.commitment, Commitment::parse)?,
            parse_hash("secretHash", &req.secret_hash, SecretHash::parse)?,
            parse_hash("nullifier", &req.nullifier, Nullifier::parse)?,
            parse_account("recipient", &req.recipient)?,
            parse_signature(&req.signature)?,
        ))
    })();
    let (commitment, secret_hash, nullifier, recipient, signature) = match parsed {
        Ok(p) => p,
        Err(body) => return invalid(body),
    };

    match state
        .relayer
        .relay_private_claim(
            &state.pool,
            commitment,
            secret_hash,
            nullifier,
            req.amount,
            recipient,
            &signature,
        )
        .await
    {
        Ok(s) => Json(RelayResponse {
            settlement_ref: s.reference_bs58(),
            relayer_id: state.relayer.address().map(|a| a.to_bs58()).unwrap_or_default(),
            sequence: s.sequence,
        })
        .into_response(),
        Err(e) => {
            info!("Relayed private claim rejected: {}", e);
            let (status, body) = relay_error_parts(&e);
            reject(status, body)
        }
    }
}

pub async fn relayer_status(State(state): State<ApiState>) -> impl IntoResponse {
    match state.relayer.status(&state.pool).await {
        Ok(status) => Json(RelayerStatusResponse::from(status)).into_response(),
        Err(e) => {
            let (status, body) = relay_error_parts(&e);
            reject(status, body)
        }
    }
}

// ============================================================================
// Submissions
// ============================================================================

/// Signed private deposit
pub async fn submit_deposit(
    State(state): State<ApiState>,
    Json(req): Json<DepositRequest>,
) -> impl IntoResponse {
    let parsed = (|| {
        Ok::<_, ErrorResponse>((
            parse_account("depositor", &req.depositor)?,
            parse_hash("commitment", &req.commitment, Commitment::parse)?,
            parse_signature(&req.signature)?,
        ))
    })();
    let (depositor, commitment, signature) = match parsed {
        Ok(p) => p,
        Err(body) => return invalid(body),
    };

    settled(
        state
            .pool
            .deposit_signed(depositor, commitment, req.amount, &signature)
            .await,
        "Deposit",
    )
}

/// Signed delayed-withdrawal request
pub async fn submit_request(
    State(state): State<ApiState>,
    Json(req): Json<WithdrawalRequest>,
) -> impl IntoResponse {
    let parsed = (|| {
        Ok::<_, ErrorResponse>((
            parse_account("recipient", &req.recipient)?,
            parse_signature(&req.signature)?,
        ))
    })();
    let (recipient, signature) = match parsed {
        Ok(p) => p,
        Err(body) => return invalid(body),
    };

    settled(
        state
            .pool
            .request_withdrawal_signed(recipient, req.amount, &signature)
            .await,
        "Withdrawal request",
    )
}

// ============================================================================
// Reads
// ============================================================================

pub async fn get_pending(
    State(state): State<ApiState>,
    Path(recipient): Path<String>,
) -> impl IntoResponse {
    let recipient = match parse_account("recipient", &recipient) {
        Ok(r) => r,
        Err(body) => return invalid(body),
    };
    match state.pool.pending(&recipient).await {
        Ok(Some(p)) => Json(PendingResponse::new(&p, state.clock.now())).into_response(),
        Ok(None) => reject(
            StatusCode::NOT_FOUND,
            ErrorResponse::not_found("No pending withdrawal"),
        ),
        Err(e) => pool_error("Pending lookup", e),
    }
}

pub async fn get_commitment(
    State(state): State<ApiState>,
    Path(commitment): Path<String>,
) -> impl IntoResponse {
    let commitment = match parse_hash("commitment", &commitment, Commitment::parse) {
        Ok(c) => c,
        Err(body) => return invalid(body),
    };
    match state.pool.commitment(&commitment).await {
        Ok(Some(r)) => Json(CommitmentResponse {
            commitment: r.commitment.to_hex(),
            amount: r.amount,
            timestamp: r.timestamp,
            spent: r.spent,
        })
        .into_response(),
        Ok(None) => reject(
            StatusCode::NOT_FOUND,
            ErrorResponse::not_found("Unknown commitment"),
        ),
        Err(e) => pool_error("Commitment lookup", e),
    }
}

pub async fn get_nullifier(
    State(state): State<ApiState>,
    Path(nullifier): Path<String>,
) -> impl IntoResponse {
    let nullifier = match parse_hash("nullifier", &nullifier, Nullifier::parse) {
        Ok(n) => n,
        Err(body) => return invalid(body),
    };
    match state.pool.nullifier_used(&nullifier).await {
        Ok(used) => Json(NullifierResponse {
            nullifier: nullifier.to_hex(),
            used,
        })
        .into_response(),
        Err(e) => pool_error("Nullifier lookup", e),
    }
}

pub async fn get_balance(
    State(state): State<ApiState>,
    Path(account): Path<String>,
) -> impl IntoResponse {
    let account = match parse_account("account", &account) {
        Ok(a) => a,
        Err(body) => return invalid(body),
    };
    match state.pool.balance(&account).await {
        Ok(balance) => Json(BalanceResponse {
            account: account.to_bs58(),
            balance,
        })
        .into_response(),
        Err(e) => pool_error("Balance lookup", e),
    }
}

// ============================================================================
// Operator
// ============================================================================

pub async fn batch_claim(
    State(state): State<ApiState>,
    Json(req): Json<BatchClaimRequest>,
) -> impl IntoResponse {
    let signature = match operator_signature(req.signature.as_deref()) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let accounts: Result<Vec<AccountId>, ErrorResponse> = req
        .accounts
        .iter()
        .enumerate()
        .map(|(i, a)| parse_account(&format!("accounts[{}]", i), a))
        .collect();
    let accounts = match accounts {
        Ok(a) => a,
        Err(body) => return invalid(body),
    };
    let batch = match ClaimBatch::from_flat(&accounts) {
        Ok(b) => b,
        Err(e) => return pool_error("Batch claim", e),
    };

    settled(
        state.pool.batch_claim_signed(&batch, &signature).await,
        "Batch claim",
    )
}

pub async fn init_churn_vault(
    State(state): State<ApiState>,
    Json(req): Json<ChurnVaultRequest>,
) -> impl IntoResponse {
    let signature = match operator_signature(req.signature.as_deref()) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    settled(
        state.pool.init_churn_vault_signed(req.index, &signature).await,
        "Churn vault init",
    )
}

pub async fn churn(
    State(state): State<ApiState>,
    Json(req): Json<ChurnRequest>,
) -> impl IntoResponse {
    let signature = match operator_signature(req.signature.as_deref()) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    settled(
        state.pool.churn_signed(req.index, req.amount, &signature).await,
        "Churn",
    )
}

pub async fn unchurn(
    State(state): State<ApiState>,
    Json(req): Json<ChurnRequest>,
) -> impl IntoResponse {
    let signature = match operator_signature(req.signature.as_deref()) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    settled(
        state.pool.unchurn_signed(req.index, req.amount, &signature).await,
        "Unchurn",
    )
}

// ============================================================================
// Dev
// ============================================================================

pub async fn dev_airdrop(
    State(state): State<ApiState>,
    Json(req): Json<AirdropRequest>,
) -> impl IntoResponse {
    let account = match parse_account("account", &req.account) {
        Ok(a) => a,
        Err(body) => return invalid(body),
    };
    match state.pool.airdrop(account, req.amount).await {
        Ok(balance) => Json(BalanceResponse {
            account: account.to_bs58(),
            balance,
        })
        .into_response(),
        Err(e) => pool_error("Airdrop", e),
    }
}
