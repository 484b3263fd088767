//! Schnorr proof of knowledge of a secret key, optionally bound to a ledger
//! account.

use alloy::primitives::{Address, U256};
use ark_ec::CurveGroup;
use ark_ff::UniformRand;
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};

use crate::{
    curve::{G1, ScalarField, g1, scalar_to_u256, u256_to_scalar},
    hashing::Transcript,
};

/// A non-interactive Schnorr proof `(c, r)` for `pk = sk * G1`.
///
/// The challenge is the full 256-bit transcript hash; the response is a
/// scalar encoded as a 32-byte word. Both travel on the wire as `uint256`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchnorrProof {
    /// Transcript hash `c`.
    pub challenge: U256,
    /// Response `r = w - sk * c mod r`.
    pub response: U256,
}

/// Proves knowledge of `sk` with `pk = sk * G1`, binding the proof to
/// `account` when given.
pub fn prove(
    sk: &ScalarField,
    pk: &G1,
    account: Option<Address>,
    rng: &mut (impl Rng + CryptoRng),
) -> SchnorrProof {
    let nonce = ScalarField::rand(rng);
    let commitment = (g1() * nonce).into_affine();
    let challenge = challenge_hash(pk, &commitment, account);
    let response = nonce - *sk * u256_to_scalar(challenge);
    SchnorrProof {
        challenge,
        response: scalar_to_u256(response),
    }
}

/// Verifies a proof of knowledge for `pk`, with the same account binding
/// the prover used.
pub fn verify(pk: &G1, proof: &SchnorrProof, account: Option<Address>) -> bool {
    let challenge = u256_to_scalar(proof.challenge);
    let response = u256_to_scalar(proof.response);
    let commitment = (g1() * response + *pk * challenge).into_affine();
    challenge_hash(pk, &commitment, account) == proof.challenge
}

/// `c = Keccak256(G1 || pk || T [|| account])` over packed words.
fn challenge_hash(pk: &G1, commitment: &G1, account: Option<Address>) -> U256 {
    let mut transcript = Transcript::new();
    transcript
        .append_g1(&g1())
        .append_g1(pk)
        .append_g1(commitment);
    if let Some(account) = account {
        transcript.append_address(account);
    }
    transcript.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng as _;
    use rand_chacha::ChaCha12Rng;
    use std::str::FromStr;

    #[test]
    fn proof_round_trip() {
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let sk = ScalarField::rand(&mut rng);
        let pk = (g1() * sk).into_affine();
        let proof = prove(&sk, &pk, None, &mut rng);
        assert!(verify(&pk, &proof, None));
    }

    #[test]
    fn account_binding_is_enforced() {
        let mut rng = ChaCha12Rng::seed_from_u64(2);
        let sk = ScalarField::rand(&mut rng);
        let pk = (g1() * sk).into_affine();
        let account = Address::from([0x11u8; 20]);
        let proof = prove(&sk, &pk, Some(account), &mut rng);
        assert!(verify(&pk, &proof, Some(account)));
        assert!(!verify(&pk, &proof, None));
        assert!(!verify(&pk, &proof, Some(Address::from([0x22u8; 20]))));
    }

    #[test]
    fn bit_flips_reject() {
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        let sk = ScalarField::rand(&mut rng);
        let pk = (g1() * sk).into_affine();
        let proof = prove(&sk, &pk, None, &mut rng);

        let mut flipped = proof;
        flipped.challenge ^= U256::from(1u64);
        assert!(!verify(&pk, &flipped, None));

        let mut flipped = proof;
        flipped.response ^= U256::from(1u64) << 17;
        assert!(!verify(&pk, &flipped, None));
    }

    #[test]
    fn wrong_witness_rejects() {
        let mut rng = ChaCha12Rng::seed_from_u64(4);
        let sk = ScalarField::rand(&mut rng);
        let pk = (g1() * (sk + ScalarField::from(1u64))).into_affine();
        let proof = prove(&sk, &pk, None, &mut rng);
        assert!(!verify(&pk, &proof, None));
    }

    #[test]
    fn challenge_transcript_golden_vector() {
        // sk = 7, nonce = 11; pinned against the ledger-side encoding.
        let sk = ScalarField::from(7u64);
        let pk = (g1() * sk).into_affine();
        let commitment = (g1() * ScalarField::from(11u64)).into_affine();
        assert_eq!(
            challenge_hash(&pk, &commitment, None),
            U256::from_str(
                "26814658045653474654239153301834495468289021626548689133344260923799185586693"
            )
            .unwrap()
        );
        let mut account = [0u8; 20];
        account[19] = 1;
        assert_eq!(
            challenge_hash(&pk, &commitment, Some(Address::from(account))),
            U256::from_str(
                "51027962224253273303880837086021102623138859445019755649453684989854300816782"
            )
            .unwrap()
        );
    }
}
