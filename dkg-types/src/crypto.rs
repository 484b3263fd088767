//! Checked cryptographic wrappers shared across the DKG system.

use std::fmt;

use serde::{Deserialize, Serialize};

use dkg_core::curve::{G1, G2, is_valid_g1};

use crate::wire::G1Repr;

/// The long-term encryption public key of a participant.
///
/// Used for deriving the pairwise Diffie-Hellman keys that secure shares in
/// transit - this is *not* a BLS key. Can only be constructed from a point
/// that is on the curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "G1Repr", into = "G1Repr")]
pub struct EncryptionPublicKey(G1);

impl EncryptionPublicKey {
    /// Wraps a G1 point, checking curve membership.
    pub fn new(value: G1) -> eyre::Result<Self> {
        Self::try_from(value)
    }

    /// Wraps a G1 point without checking curve membership.
    ///
    /// Only use this for points produced by local group arithmetic; external
    /// inputs must go through [`Self::new`] or the `G1Repr` conversion.
    pub fn new_unchecked(value: G1) -> Self {
        Self(value)
    }

    /// The inner affine point.
    pub fn inner(self) -> G1 {
        self.0
    }
}

impl TryFrom<G1> for EncryptionPublicKey {
    type Error = eyre::Report;

    fn try_from(value: G1) -> Result<Self, Self::Error> {
        if !is_valid_g1(&value) {
            eyre::bail!("public key is not on the curve");
        }
        Ok(Self(value))
    }
}

impl TryFrom<G1Repr> for EncryptionPublicKey {
    type Error = eyre::Report;

    fn try_from(value: G1Repr) -> Result<Self, Self::Error> {
        Ok(Self(G1::try_from(value)?))
    }
}

impl From<EncryptionPublicKey> for G1Repr {
    fn from(value: EncryptionPublicKey) -> Self {
        value.0.into()
    }
}

impl fmt::Display for EncryptionPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format!("EncryptionPublicKey({})", self.0))
    }
}

/// A verified key share `(h1, h2) = (s * H1, s * H2)` of a qualified
/// participant, as stored by observers after the pairing check passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyShare {
    /// The G1 component `s * H1`.
    pub h1: G1,
    /// The G2 component `s * H2`; these sum up to the master public key.
    pub h2: G2,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;
    use ark_ec::CurveGroup;
    use ark_ff::UniformRand;
    use dkg_core::curve::{ScalarField, g1};

    #[test]
    fn valid_key_accepted() {
        let mut rng = rand::thread_rng();
        let pk = (g1() * ScalarField::rand(&mut rng)).into_affine();
        assert!(EncryptionPublicKey::new(pk).is_ok());
    }

    #[test]
    fn off_curve_key_rejected_via_wire() {
        let repr = G1Repr {
            x: U256::from(3u64),
            y: U256::from(4u64),
        };
        assert!(EncryptionPublicKey::try_from(repr).is_err());
    }
}
