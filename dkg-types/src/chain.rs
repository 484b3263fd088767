//! Types for on-ledger messages.
//!
//! This module defines the submissions participants send to the DKG ledger
//! and the events the ledger emits back in total order. Points travel in
//! their wire representation ([`G1Repr`]/[`G2Repr`]) and are only decoded -
//! with curve membership checks - by the consuming side.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use dkg_core::proofs::{dleq::DleqProof, schnorr::SchnorrProof};

use crate::wire::{G1Repr, G2Repr};

/// A node registered on the ledger. Registration lists are sorted by
/// address; share-slot positions derive from that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredNode {
    /// The account that registered.
    pub address: Address,
    /// Its long-term encryption public key.
    pub public_key: G1Repr,
}

/// Registration: the long-term encryption key with a proof of knowledge of
/// its secret key, bound to the submitting account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationSubmission {
    /// The long-term encryption public key.
    pub public_key: G1Repr,
    /// Schnorr proof of knowledge of the secret key, bound to the account.
    pub proof: SchnorrProof,
}

/// Share distribution: one encrypted share per other participant, in the
/// fixed ledger list order with the issuer skipped, plus the Feldman
/// commitments to the sharing polynomial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareDistributionSubmission {
    /// Encrypted shares, ordered by the registration list minus the issuer.
    pub encrypted_shares: Vec<U256>,
    /// Commitments `C_k = c_k * G1`, `threshold + 1` of them.
    pub commitments: Vec<G1Repr>,
}

/// A dispute against an issuer whose share failed verification.
///
/// The disputer reveals the pairwise shared key together with a DLEQ proof
/// of its correctness; the issuer's published material is echoed so the
/// ledger can re-derive the bad share without storing full distributions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeSubmission {
    /// The accused issuer.
    pub issuer: Address,
    /// Index of the issuer in the registration list.
    pub issuer_index: usize,
    /// Index of the disputer in the registration list.
    pub disputer_index: usize,
    /// The issuer's published encrypted shares, echoed back.
    pub encrypted_shares: Vec<U256>,
    /// The issuer's published commitments, echoed back.
    pub commitments: Vec<G1Repr>,
    /// The pairwise key `k = sk_disputer * pk_issuer`.
    pub shared_key: G1Repr,
    /// DLEQ proof of `(G1, pk_disputer, pk_issuer, k)`.
    pub proof: DleqProof,
}

/// A key share `(h1, h2)` with the DLEQ proof tying `h1` to the issuer's
/// constant-term commitment `C_0`. Submitted for oneself, or on behalf of an
/// absent participant after recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyShareSubmission {
    /// The participant the key share belongs to.
    pub issuer: Address,
    /// `h1 = s * H1`.
    pub key_share_g1: G1Repr,
    /// DLEQ proof of `(H1, h1, G1, C_0)`.
    pub proof: DleqProof,
    /// `h2 = s * H2`.
    pub key_share_g2: G2Repr,
}

/// Pairwise keys revealed to let everyone decrypt the shares of absent
/// qualified participants, one entry per recovered node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyShareRecoverySubmission {
    /// The absent participants being recovered.
    pub recovered: Vec<Address>,
    /// The pairwise keys `k = sk_recoverer * pk_recovered`.
    pub shared_keys: Vec<G1Repr>,
    /// DLEQ proofs of `(G1, pk_recoverer, pk_recovered, k)`.
    pub proofs: Vec<DleqProof>,
}

/// The derived master public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterPublicKeySubmission {
    /// `MPK = sum of h2 over the qualified set`.
    pub master_public_key: G2Repr,
}

/// An event emitted by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// A node registered.
    Registration {
        /// The registered account.
        node: Address,
        /// Its long-term encryption public key.
        public_key: G1Repr,
    },
    /// A node distributed its encrypted shares and commitments.
    ShareDistribution {
        /// The distributing node.
        issuer: Address,
        /// Encrypted shares in ledger list order minus the issuer.
        encrypted_shares: Vec<U256>,
        /// The Feldman commitments.
        commitments: Vec<G1Repr>,
    },
    /// A dispute was accepted by the ledger.
    Dispute {
        /// The accused issuer.
        issuer: Address,
        /// The accusing node.
        disputer: Address,
        /// The revealed pairwise key.
        shared_key: G1Repr,
        /// DLEQ proof of the pairwise key.
        proof: DleqProof,
    },
    /// A key share was submitted (own or recovered).
    KeyShareSubmission {
        /// The participant the key share belongs to.
        issuer: Address,
        /// `h1 = s * H1`.
        key_share_g1: G1Repr,
        /// DLEQ proof of `(H1, h1, G1, C_0)`.
        proof: DleqProof,
        /// `h2 = s * H2`.
        key_share_g2: G2Repr,
    },
    /// Pairwise keys were revealed to recover absent participants.
    KeyShareRecovery {
        /// The node revealing its pairwise keys.
        recoverer: Address,
        /// The absent participants being recovered.
        recovered: Vec<Address>,
        /// The revealed pairwise keys.
        shared_keys: Vec<G1Repr>,
        /// DLEQ proofs for the pairwise keys.
        proofs: Vec<DleqProof>,
    },
}

/// A ledger event together with the block it was recorded in. Events are
/// delivered in ledger-total order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedEvent {
    /// Block number at which the event was recorded.
    pub block: u64,
    /// The event payload.
    pub event: LedgerEvent,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::CurveGroup;
    use dkg_core::curve::{ScalarField, g1, h2};

    #[test]
    fn submissions_serde_round_trip() {
        let commitment = G1Repr::from((g1() * ScalarField::from(7u64)).into_affine());
        let submission = ShareDistributionSubmission {
            encrypted_shares: vec![U256::from(1u64), U256::from(2u64)],
            commitments: vec![G1Repr::from(g1()), commitment],
        };
        let json = serde_json::to_string(&submission).unwrap();
        let decoded: ShareDistributionSubmission = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, submission);
    }

    #[test]
    fn events_serde_round_trip() {
        let event = OrderedEvent {
            block: 42,
            event: LedgerEvent::KeyShareSubmission {
                issuer: Address::from([7u8; 20]),
                key_share_g1: G1Repr::from(g1()),
                proof: DleqProof {
                    challenge: U256::from(1u64),
                    response: U256::from(2u64),
                },
                key_share_g2: G2Repr::from(h2()),
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        let decoded: OrderedEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
    }
}
