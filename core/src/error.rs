//! Settlement errors.
//!
//! Every [`PoolError`] belongs to one [`ErrorKind`]. Any error aborts the
//! whole operation: nothing is written until validation has passed.
//! Messages carry ids and amounts only, never note secrets.

use murk_account::AccountId;
use murk_privacy::Commitment;
use thiserror::Error;

/// Error taxonomy exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    StateConflict,
    Resource,
    BatchShape,
    Storage,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION",
            Self::Authorization => "AUTHORIZATION",
            Self::StateConflict => "STATE_CONFLICT",
            Self::Resource => "RESOURCE",
            Self::BatchShape => "BATCH_SHAPE",
            Self::Storage => "STORAGE",
        }
    }
}

#[derive(Debug, Error)]
pub enum PoolError {
    // ---- validation ----
    #[error("Amount {0} is not a standardized denomination")]
    NonStandardAmount(u64),

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Churn vault index {0} out of range (0..3)")]
    InvalidChurnIndex(u8),

    #[error("Malformed signature")]
    MalformedSignature,

    #[error("Malformed signer key")]
    MalformedSignerKey,

    #[error("Arithmetic overflow")]
    Overflow,

    // ---- authorization ----
    #[error("Record {record} does not belong to {recipient}")]
    RecordMismatch {
        record: AccountId,
        recipient: AccountId,
    },

    #[error("Signature does not match the declared signer and record")]
    SignerMismatch,

    #[error("Only the pool authority may perform this operation")]
    Unauthorized,

    // ---- state conflict ----
    #[error("Pool already initialized")]
    PoolAlreadyInitialized,

    #[error("Pool not initialized")]
    PoolNotInitialized,

    #[error("Commitment {0} already exists")]
    CommitmentExists(Commitment),

    #[error("Unknown commitment")]
    UnknownCommitment,

    #[error("Commitment already spent")]
    CommitmentSpent,

    #[error("Nullifier already used")]
    NullifierUsed,

    #[error("A pending withdrawal already exists for {0}")]
    PendingExists(AccountId),

    #[error("No pending withdrawal for {0}")]
    NoPendingWithdrawal(AccountId),

    #[error("Withdrawal already claimed")]
    AlreadyClaimed,

    #[error("Withdrawal not ready until {available_at} (now {now})")]
    NotReady { available_at: i64, now: i64 },

    #[error("Churn vault {0} already initialized")]
    ChurnVaultExists(u8),

    #[error("Churn vault {0} not initialized")]
    ChurnVaultMissing(u8),

    // ---- resource ----
    #[error("Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u64, available: u64 },

    #[error("Insufficient pool funds: need {needed}, have {available}")]
    InsufficientPoolFunds { needed: u64, available: u64 },

    #[error("Insufficient funds in churn vault {index}: need {needed}, have {available}")]
    InsufficientChurnFunds {
        index: u8,
        needed: u64,
        available: u64,
    },

    #[error("Relayer cannot cover settlement fee {fee} (balance {available})")]
    InsufficientRelayerFunds { fee: u64, available: u64 },

    // ---- batch shape ----
    #[error("Batch must hold 1 to 5 pairs, got {0}")]
    BatchSize(usize),

    #[error("Batch account list must be evenly paired, got {0} entries")]
    BatchUnpaired(usize),

    #[error("Recipient {0} appears more than once in the batch")]
    DuplicateRecipient(AccountId),

    #[error("Batch pair {index} rejected: {source}")]
    BatchPair {
        index: usize,
        #[source]
        source: Box<PoolError>,
    },

    // ---- storage ----
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PoolError>;

impl PoolError {
    pub fn kind(&self) -> ErrorKind {
        use PoolError::*;
        match self {
            NonStandardAmount(_)
            | ZeroAmount
            | InvalidChurnIndex(_)
            | MalformedSignature
            | MalformedSignerKey
            | Overflow => ErrorKind::Validation,

            SignerMismatch | RecordMismatch { .. } | Unauthorized => ErrorKind::Authorization,

            PoolAlreadyInitialized
            | PoolNotInitialized
            | CommitmentExists(_)
            | UnknownCommitment
            | CommitmentSpent
            | NullifierUsed
            | PendingExists(_)
            | NoPendingWithdrawal(_)
            | AlreadyClaimed
            | NotReady { .. }
            | ChurnVaultExists(_)
            | ChurnVaultMissing(_) => ErrorKind::StateConflict,

            InsufficientBalance { .. }
            | InsufficientPoolFunds { .. }
            | InsufficientChurnFunds { .. }
            | InsufficientRelayerFunds { .. } => ErrorKind::Resource,

            BatchSize(_) | BatchUnpaired(_) | DuplicateRecipient(_) | BatchPair { .. } => {
                ErrorKind::BatchShape
            }

            Storage(_) => ErrorKind::Storage,
        }
    }

    /// Resource shortfalls and storage hiccups may succeed later.
    /// Conflicts never do.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Resource | ErrorKind::Storage)
    }

    /// Wraps a per-pair failure with its position in the batch.
    pub fn at_pair(self, index: usize) -> Self {
        Self::BatchPair {
            index,
            source: Box::new(self),
        }
    }

    /// The innermost cause of a batch rejection.
    pub fn root(&self) -> &PoolError {
        match self {
            Self::BatchPair { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<murk_keypair::KeyError> for PoolError {
    fn from(err: murk_keypair::KeyError) -> Self {
        use murk_keypair::KeyError;
        match err {
            KeyError::MalformedSignature => Self::MalformedSignature,
            KeyError::MalformedPublicKey => Self::MalformedSignerKey,
            KeyError::SignerMismatch => Self::SignerMismatch,
            other => Self::Storage(anyhow::Error::new(other)),
        }
    }
}
