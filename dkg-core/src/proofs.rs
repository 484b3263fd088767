//! Non-interactive zero-knowledge proofs used by the DKG protocol.
//!
//! Two proof systems, both made non-interactive with a keccak Fiat-Shamir
//! transcript over the ledger's packed word encoding:
//! - [`schnorr`]: proof of knowledge of the discrete log of a public key,
//!   optionally bound to the prover's ledger account so a registration
//!   cannot be replayed by another account.
//! - [`dleq`]: Chaum-Pedersen proof that two points share the same discrete
//!   log with respect to two bases. Disputes, key shares and recovery all
//!   rest on it.
//!
//! Proof nonces must come from a CSPRNG and must never be reused across two
//! statements: two responses under the same nonce reveal the witness.

pub mod dleq;
pub mod schnorr;
