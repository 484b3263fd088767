#![deny(missing_docs)]
//! Cryptographic core of an on-chain distributed key generation (DKG)
//! protocol for BLS threshold keys over BN254 (alt-bn128).
//!
//! The crate is split into four layers, leaves first:
//! - [`curve`]: BN254 group helpers, the standard generator pair `(G1, G2)`
//!   and the independent generator pair `(H1, H2)` used for key-share
//!   commitments, plus pairing-equality checks.
//! - [`hashing`]: keccak-based Fiat-Shamir transcripts in the exact packed
//!   encoding the on-ledger verifier hashes, hash-to-scalar, and the
//!   try-and-increment map into G1.
//! - [`proofs`]: non-interactive Schnorr proofs of key ownership and
//!   Chaum-Pedersen discrete log equality (DLEQ) proofs.
//! - [`vss`]: Shamir sharing with Feldman commitments, share verification,
//!   Lagrange reconstruction of scalars and group elements, and the
//!   Diffie-Hellman keyed xor-mask share encryption.
//!
//! Everything here is deterministic given its inputs (and RNG) and performs
//! no IO; the participant state machine in `dkg-node` drives it.

pub mod curve;
pub mod hashing;
pub mod proofs;
pub mod vss;
