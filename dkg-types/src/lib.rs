#![deny(missing_docs)]
//! Shared type definitions for the on-chain DKG protocol.
//!
//! This crate groups the strongly-typed values exchanged between the
//! participant state machine and the ledger:
//!
//! * [`ParticipantId`], the stable identity that doubles as the Shamir
//!   evaluation point.
//! * Checked cryptographic wrappers and key material (see [`crypto`]).
//! * The wire encoding of curve points as 32-byte words (see [`wire`]).
//! * Submission payloads and ledger events (see [`chain`]).

use std::fmt;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use dkg_core::curve::{ScalarField, u256_to_scalar};

pub mod chain;
pub mod crypto;
pub mod wire;

/// The stable identity of a DKG participant.
///
/// Either a small integer (fixtures) or the integer reading of the
/// participant's ledger address. Non-zero by construction, since it doubles
/// as the Shamir evaluation point and evaluating the secret polynomial at
/// zero would reveal the secret itself.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ParticipantId(U256);

impl ParticipantId {
    /// Wraps a raw id, rejecting zero.
    pub fn new(value: U256) -> eyre::Result<Self> {
        if value.is_zero() {
            eyre::bail!("participant id must be non-zero");
        }
        Ok(Self(value))
    }

    /// The integer reading of a ledger address.
    ///
    /// The zero address is not a valid participant, so this cannot produce
    /// the zero id for any registrable account.
    pub fn from_address(address: Address) -> Self {
        Self(U256::from_be_slice(address.as_slice()))
    }

    /// A small fixture id `1..n`.
    pub fn from_index(index: u64) -> eyre::Result<Self> {
        Self::new(U256::from(index))
    }

    /// The id as a scalar field element, i.e. the evaluation point.
    pub fn to_scalar(self) -> ScalarField {
        u256_to_scalar(self.0)
    }

    /// The raw 256-bit id.
    pub fn into_inner(self) -> U256 {
        self.0
    }
}

impl From<ParticipantId> for U256 {
    fn from(value: ParticipantId) -> Self {
        value.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format!("ParticipantId({:#x})", self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_id_rejected() {
        assert!(ParticipantId::new(U256::ZERO).is_err());
        assert!(ParticipantId::from_index(0).is_err());
    }

    #[test]
    fn address_reading_matches_integer_value() {
        let mut bytes = [0u8; 20];
        bytes[18] = 0x01;
        bytes[19] = 0x02;
        let id = ParticipantId::from_address(Address::from(bytes));
        assert_eq!(id.into_inner(), U256::from(0x0102u64));
        assert_eq!(id.to_scalar(), ScalarField::from(0x0102u64));
    }

    #[test]
    fn ids_order_by_integer_value() {
        let a = ParticipantId::from_index(3).unwrap();
        let b = ParticipantId::from_index(12).unwrap();
        assert!(a < b);
    }
}
