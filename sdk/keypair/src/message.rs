//! Signed settlement messages
//!
//! ```text
//! claim:<record-id>
//! deposit:<commitment>:<amount>
//! request:<record-id>:<amount>
//!
//! churn-vault:<index>:<sequence>
//! churn:<index>:<amount>:<sequence>
//! unchurn:<index>:<amount>:<sequence>
//! batch:<record-id>:<recipient>:..:<sequence>
//! ```
//!
//! Ids are base58, amounts are decimal lamports. A claim signature is bound
//! to one record, so it cannot be replayed against another. Operator
//! messages are signed by the pool authority and bound to the pool sequence
//! they were issued against, so they go stale after the next settlement.

use std::fmt;

use ed25519_dalek::{Verifier, VerifyingKey};
use murk_account::AccountId;

use crate::{KeyError, signature_from_slice};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementMessage {
    /// Authorizes paying out the record to the signer.
    Claim { record: AccountId },
    /// Authorizes debiting the signer for a deposit of `commitment`.
    Deposit { commitment: AccountId, amount: u64 },
    /// Authorizes a delayed withdrawal request for the signer.
    Request { record: AccountId, amount: u64 },
    /// Authorizes creating churn vault `index`.
    InitChurnVault { index: u8, sequence: u64 },
    /// Authorizes moving `amount` from the pool vault into churn vault `index`.
    Churn { index: u8, amount: u64, sequence: u64 },
    /// Authorizes moving `amount` from churn vault `index` back to the pool vault.
    Unchurn { index: u8, amount: u64, sequence: u64 },
    /// Authorizes settling the flattened `[record, recipient, ..]` pairs.
    BatchClaim { accounts: Vec<AccountId>, sequence: u64 },
}

impl fmt::Display for SettlementMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Claim { record } => write!(f, "claim:{}", record),
            Self::Deposit { commitment, amount } => write!(f, "deposit:{}:{}", commitment, amount),
            Self::Request { record, amount } => write!(f, "request:{}:{}", record, amount),
            Self::InitChurnVault { index, sequence } => {
                write!(f, "churn-vault:{}:{}", index, sequence)
            }
            Self::Churn {
                index,
                amount,
                sequence,
            } => write!(f, "churn:{}:{}:{}", index, amount, sequence),
            Self::Unchurn {
                index,
                amount,
                sequence,
            } => write!(f, "unchurn:{}:{}:{}", index, amount, sequence),
            Self::BatchClaim { accounts, sequence } => {
                f.write_str("batch")?;
                for account in accounts {
                    write!(f, ":{}", account)?;
                }
                write!(f, ":{}", sequence)
            }
        }
    }
}

/// Checks `signature` over `message` against `signer`.
///
/// Malformed input yields [`KeyError::MalformedSignature`] or
/// [`KeyError::MalformedPublicKey`]. A well-formed signature from anyone
/// else, or over another message, yields [`KeyError::SignerMismatch`].
pub fn verify_signature(
    signer: &AccountId,
    message: &SettlementMessage,
    signature: &[u8],
) -> Result<(), KeyError> {
    let signature = signature_from_slice(signature)?;
    let key =
        VerifyingKey::from_bytes(signer.as_bytes()).map_err(|_| KeyError::MalformedPublicKey)?;
    key.verify(message.to_string().as_bytes(), &signature)
        .map_err(|_| KeyError::SignerMismatch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Keypair;

    #[test]
    fn test_message_formats() {
        let id = AccountId([0u8; 32]);
        let b58 = id.to_bs58();
        assert_eq!(
            SettlementMessage::Claim { record: id }.to_string(),
            format!("claim:{}", b58)
        );
        assert_eq!(
            SettlementMessage::Deposit { commitment: id, amount: 100_000_000 }.to_string(),
            format!("deposit:{}:100000000", b58)
        );
        assert_eq!(
            SettlementMessage::Request { record: id, amount: 5 }.to_string(),
            format!("request:{}:5", b58)
        );
    }

    #[test]
    fn test_operator_message_formats() {
        let a = AccountId([1u8; 32]);
        let b = AccountId([2u8; 32]);
        assert_eq!(
            SettlementMessage::InitChurnVault { index: 2, sequence: 9 }.to_string(),
            "churn-vault:2:9"
        );
        assert_eq!(
            SettlementMessage::Churn { index: 0, amount: 100, sequence: 4 }.to_string(),
            "churn:0:100:4"
        );
        assert_eq!(
            SettlementMessage::Unchurn { index: 1, amount: 7, sequence: 4 }.to_string(),
            "unchurn:1:7:4"
        );
        assert_eq!(
            SettlementMessage::BatchClaim { accounts: vec![a, b], sequence: 12 }.to_string(),
            format!("batch:{}:{}:12", a.to_bs58(), b.to_bs58())
        );
    }

    #[test]
    fn test_operator_signature_is_bound_to_sequence() {
        let authority = Keypair::from_seed(&[6u8; 32]);
        let sig = authority.sign_message(&SettlementMessage::Churn {
            index: 0,
            amount: 100,
            sequence: 4,
        });
        let later = SettlementMessage::Churn { index: 0, amount: 100, sequence: 5 };
        assert!(matches!(
            verify_signature(&authority.account_id(), &later, &sig),
            Err(KeyError::SignerMismatch)
        ));
    }

    #[test]
    fn test_verify_accepts_matching_signer() {
        let kp = Keypair::from_seed(&[4u8; 32]);
        let msg = SettlementMessage::Claim { record: AccountId([1u8; 32]) };
        let sig = kp.sign_message(&msg);
        assert!(verify_signature(&kp.account_id(), &msg, &sig).is_ok());
    }

    #[test]
    fn test_verify_rejects_other_record_and_signer() {
        let kp = Keypair::from_seed(&[4u8; 32]);
        let other = Keypair::from_seed(&[5u8; 32]);
        let msg = SettlementMessage::Claim { record: AccountId([1u8; 32]) };
        let sig = kp.sign_message(&msg);

        let wrong_record = SettlementMessage::Claim { record: AccountId([2u8; 32]) };
        assert!(matches!(
            verify_signature(&kp.account_id(), &wrong_record, &sig),
            Err(KeyError::SignerMismatch)
        ));
        assert!(matches!(
            verify_signature(&other.account_id(), &msg, &sig),
            Err(KeyError::SignerMismatch)
        ));
    }

    #[test]
    fn test_verify_rejects_malformed_signature() {
        let kp = Keypair::from_seed(&[4u8; 32]);
        let msg = SettlementMessage::Claim { record: AccountId([1u8; 32]) };
        assert!(matches!(
            verify_signature(&kp.account_id(), &msg, &[0u8; 10]),
            Err(KeyError::MalformedSignature)
        ));
    }
}
