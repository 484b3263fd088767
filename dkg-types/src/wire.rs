//! Wire encoding of BN254 points as 32-byte big-endian words.
//!
//! G1 is `(x, y)`. G2 serializes each `Fq2` coordinate with the imaginary
//! part first, i.e. `(x_i, x, y_i, y)` - the word order the ledger's pairing
//! precompile expects. Swapping the two words of a coordinate breaks every
//! pairing check on the ledger side, so the field order here is load-bearing.
//!
//! Decoding always validates: coordinates must be canonical field elements
//! and the point must lie on the curve (and for G2 in the correct subgroup).
//! `(0, 0)` encodes the point at infinity, matching the precompile
//! convention.

use alloy::primitives::U256;
use ark_bn254::Fq2;
use ark_ec::AffineRepr;
use ark_ff::Zero;
use serde::{Deserialize, Serialize};

use dkg_core::curve::{G1, G2, base_to_u256, is_valid_g1, is_valid_g2, u256_to_base};

/// A G1 point on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct G1Repr {
    /// Affine x-coordinate.
    pub x: U256,
    /// Affine y-coordinate.
    pub y: U256,
}

/// A G2 point on the wire, imaginary parts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct G2Repr {
    /// Imaginary part of the x-coordinate.
    pub x_imag: U256,
    /// Real part of the x-coordinate.
    pub x_real: U256,
    /// Imaginary part of the y-coordinate.
    pub y_imag: U256,
    /// Real part of the y-coordinate.
    pub y_real: U256,
}

impl From<G1> for G1Repr {
    fn from(point: G1) -> Self {
        match point.xy() {
            Some((x, y)) => Self {
                x: base_to_u256(x),
                y: base_to_u256(y),
            },
            None => Self {
                x: U256::ZERO,
                y: U256::ZERO,
            },
        }
    }
}

impl TryFrom<G1Repr> for G1 {
    type Error = eyre::Report;

    fn try_from(repr: G1Repr) -> Result<Self, Self::Error> {
        if repr.x.is_zero() && repr.y.is_zero() {
            return Ok(G1::zero());
        }
        let x = u256_to_base(repr.x).ok_or_else(|| eyre::eyre!("G1 x-coordinate exceeds field modulus"))?;
        let y = u256_to_base(repr.y).ok_or_else(|| eyre::eyre!("G1 y-coordinate exceeds field modulus"))?;
        let point = G1::new_unchecked(x, y);
        if !is_valid_g1(&point) {
            eyre::bail!("point is not on the G1 curve");
        }
        Ok(point)
    }
}

impl From<G2> for G2Repr {
    fn from(point: G2) -> Self {
        match point.xy() {
            Some((x, y)) => Self {
                x_imag: base_to_u256(x.c1),
                x_real: base_to_u256(x.c0),
                y_imag: base_to_u256(y.c1),
                y_real: base_to_u256(y.c0),
            },
            None => Self {
                x_imag: U256::ZERO,
                x_real: U256::ZERO,
                y_imag: U256::ZERO,
                y_real: U256::ZERO,
            },
        }
    }
}

impl TryFrom<G2Repr> for G2 {
    type Error = eyre::Report;

    fn try_from(repr: G2Repr) -> Result<Self, Self::Error> {
        if repr.x_imag.is_zero()
            && repr.x_real.is_zero()
            && repr.y_imag.is_zero()
            && repr.y_real.is_zero()
        {
            return Ok(G2::zero());
        }
        let decode = |word: U256, label: &str| {
            u256_to_base(word).ok_or_else(|| eyre::eyre!("G2 {label} exceeds field modulus"))
        };
        let x = Fq2::new(
            decode(repr.x_real, "x real part")?,
            decode(repr.x_imag, "x imaginary part")?,
        );
        let y = Fq2::new(
            decode(repr.y_real, "y real part")?,
            decode(repr.y_imag, "y imaginary part")?,
        );
        let point = G2::new_unchecked(x, y);
        if !is_valid_g2(&point) {
            eyre::bail!("point is not in the G2 group");
        }
        Ok(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::CurveGroup;
    use ark_ff::UniformRand;
    use dkg_core::curve::{ScalarField, g1, g2, h2};

    #[test]
    fn g1_round_trip() {
        let mut rng = rand::thread_rng();
        for _ in 0..8 {
            let point = (g1() * ScalarField::rand(&mut rng)).into_affine();
            let repr = G1Repr::from(point);
            assert_eq!(G1::try_from(repr).unwrap(), point);
        }
    }

    #[test]
    fn g2_round_trip() {
        let mut rng = rand::thread_rng();
        for _ in 0..8 {
            let point = (g2() * ScalarField::rand(&mut rng)).into_affine();
            let repr = G2Repr::from(point);
            assert_eq!(G2::try_from(repr).unwrap(), point);
        }
    }

    #[test]
    fn off_curve_g1_rejected() {
        let repr = G1Repr {
            x: U256::from(1u64),
            y: U256::from(5u64),
        };
        assert!(G1::try_from(repr).is_err());
    }

    #[test]
    fn non_canonical_coordinate_rejected() {
        let repr = G1Repr {
            x: U256::MAX,
            y: U256::from(2u64),
        };
        assert!(G1::try_from(repr).is_err());
    }

    #[test]
    fn infinity_encodes_as_zero_words() {
        let repr = G1Repr::from(G1::zero());
        assert_eq!(repr.x, U256::ZERO);
        assert_eq!(repr.y, U256::ZERO);
        assert!(G1::try_from(repr).unwrap().is_zero());
    }

    #[test]
    fn g2_word_order_is_imaginary_first() {
        let repr = G2Repr::from(h2());
        // The real part of H2.x is the first coefficient of the Fq2 element;
        // on the wire it must come second.
        assert_eq!(
            repr.x_real,
            base_to_u256(h2().x().unwrap().c0)
        );
        assert_eq!(
            repr.x_imag,
            base_to_u256(h2().x().unwrap().c1)
        );
    }
}
