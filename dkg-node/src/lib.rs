#![deny(missing_docs)]
//! Participant node for an on-chain distributed key generation protocol
//! producing BLS threshold keys over BN254.
//!
//! The crate is organized around a pure [`participant::Participant`] state
//! machine that holds all secret material and runs every verification, a
//! narrow [`ledger::Ledger`] capability that orders submissions and streams
//! events back, and an async [`driver`] that sequences the five protocol
//! phases (registration, share distribution, dispute, key-share submission,
//! key derivation) over both. An in-memory ledger running the same
//! acceptance predicates as the on-chain verifier lives in
//! [`ledger::memory`] and backs the integration tests and the demo binary.

pub mod config;
pub mod driver;
pub mod error;
pub mod ledger;
pub mod participant;
pub mod store;
