//! BN254 group helpers and the two generator pairs used by the protocol.
//!
//! `(G1, G2)` are the standard BN254 generators. `(H1, H2)` are a second
//! pair of generators with no known discrete log to the first pair among
//! themselves; key shares commit against them so that knowledge of the
//! long-term encryption keys never translates into knowledge of BLS key
//! material. Both pairs satisfy `e(G1, H2) == e(H1, G2)`, which the
//! pairing-based key-share checks rely on.

use alloy::primitives::U256;
use ark_bn254::{Bn254, Fq2};
use ark_ec::{AffineRepr, CurveGroup, pairing::Pairing};
use ark_ff::{BigInt, MontFp, PrimeField, Zero};

/// Scalar field `Z/rZ` of BN254.
pub type ScalarField = ark_bn254::Fr;
/// Base field of the BN254 G1 curve.
pub type BaseField = ark_bn254::Fq;
/// G1 point in affine representation.
pub type G1 = ark_bn254::G1Affine;
/// G2 point in affine representation.
pub type G2 = ark_bn254::G2Affine;
/// G1 point in projective representation, used for sums.
pub type G1Projective = ark_bn254::G1Projective;
/// G2 point in projective representation, used for sums.
pub type G2Projective = ark_bn254::G2Projective;

/// The standard G1 generator `(1, 2)`.
pub fn g1() -> G1 {
    G1::generator()
}

/// The standard G2 generator as specified by EIP-197.
pub fn g2() -> G2 {
    G2::generator()
}

/// The alternate G1 generator `H1`.
pub fn h1() -> G1 {
    G1::new_unchecked(
        MontFp!("9727523064272218541460723335320998459488975639302513747055235660443850046724"),
        MontFp!("5031696974169251245229961296941447383441169981934237515842977230762345915487"),
    )
}

/// The alternate G2 generator `H2`, the G2 counterpart of [`h1`].
pub fn h2() -> G2 {
    G2::new_unchecked(
        Fq2::new(
            MontFp!(
                "9110522554455888802745409460679507850660709404525090688071718755658817738702"
            ),
            MontFp!(
                "14120302265976430476300156362541817133873389322564306174224598966336605751189"
            ),
        ),
        Fq2::new(
            MontFp!(
                "8015061597608194114184122605728732604411275728909990814600934336120589400179"
            ),
            MontFp!(
                "21550838471174089343030649382112381550278244756451022825185015902639198926789"
            ),
        ),
    )
}

/// Returns `true` iff the point is a valid G1 element.
///
/// G1 has cofactor one, so on-curve implies correct subgroup.
pub fn is_valid_g1(point: &G1) -> bool {
    point.is_zero() || point.is_on_curve()
}

/// Returns `true` iff the point is a valid G2 element, including the
/// subgroup check (the G2 cofactor is non-trivial).
pub fn is_valid_g2(point: &G2) -> bool {
    point.is_zero()
        || (point.is_on_curve() && point.is_in_correct_subgroup_assuming_on_curve())
}

/// Sums G1 points.
pub fn sum_g1(points: impl IntoIterator<Item = G1>) -> G1 {
    points
        .into_iter()
        .fold(G1Projective::zero(), |acc, p| acc + p)
        .into_affine()
}

/// Sums G2 points.
pub fn sum_g2(points: impl IntoIterator<Item = G2>) -> G2 {
    points
        .into_iter()
        .fold(G2Projective::zero(), |acc, p| acc + p)
        .into_affine()
}

/// Checks the pairing equality `e(a1, a2) == e(b1, b2)`.
pub fn pairings_equal(a1: G1, a2: G2, b1: G1, b2: G2) -> bool {
    Bn254::pairing(a1, a2) == Bn254::pairing(b1, b2)
}

/// Encodes a scalar as a 32-byte big-endian word.
pub fn scalar_to_u256(scalar: ScalarField) -> U256 {
    U256::from_limbs(scalar.into_bigint().0)
}

/// Reduces a 32-byte big-endian word into the scalar field.
pub fn u256_to_scalar(word: U256) -> ScalarField {
    ScalarField::from_be_bytes_mod_order(&word.to_be_bytes::<32>())
}

/// Encodes a base field element as a 32-byte big-endian word.
pub fn base_to_u256(element: BaseField) -> U256 {
    U256::from_limbs(element.into_bigint().0)
}

/// Decodes a 32-byte big-endian word into the base field.
///
/// Returns `None` iff the word is not a canonical representative, i.e. is
/// greater or equal to the field modulus. External inputs must go through
/// this so that non-canonical encodings are rejected instead of silently
/// reduced.
pub fn u256_to_base(word: U256) -> Option<BaseField> {
    BaseField::from_bigint(BigInt::new(word.into_limbs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::UniformRand;

    #[test]
    fn alternate_generators_are_valid() {
        assert!(is_valid_g1(&h1()));
        assert!(is_valid_g2(&h2()));
        assert!(!h1().is_zero());
        assert!(!h2().is_zero());
    }

    #[test]
    fn generator_pairs_are_pairing_consistent() {
        let mut rng = rand::thread_rng();
        let sk = ScalarField::rand(&mut rng);
        let pk1 = (g1() * sk).into_affine();
        let pk2 = (g2() * sk).into_affine();
        // e(sk*G1, G2) == e(G1, sk*G2) and the same relation across the
        // alternate pair, which requires H1 and H2 to share their exponent.
        assert!(pairings_equal(pk1, g2(), g1(), pk2));
        assert!(pairings_equal(pk1, h2(), h1(), pk2));
    }

    #[test]
    fn scalar_word_round_trip() {
        let mut rng = rand::thread_rng();
        for _ in 0..16 {
            let s = ScalarField::rand(&mut rng);
            assert_eq!(u256_to_scalar(scalar_to_u256(s)), s);
        }
    }

    #[test]
    fn base_field_decoding_rejects_non_canonical_words() {
        assert_eq!(u256_to_base(U256::from_limbs(BaseField::MODULUS.0)), None);
        assert_eq!(u256_to_base(U256::MAX), None);
        assert_eq!(u256_to_base(U256::from(7u64)), Some(BaseField::from(7u64)));
    }

    #[test]
    fn sums_match_scalar_arithmetic() {
        let four = (g1() * ScalarField::from(4u64)).into_affine();
        let two = (g1() * ScalarField::from(2u64)).into_affine();
        assert_eq!(sum_g1([g1(), g1(), two]), four);
    }
}
