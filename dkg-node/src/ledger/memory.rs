//! An in-memory ledger running the contract's acceptance predicates.
//!
//! The smart contract is a replicated verifier: it accepts a submission iff
//! every honest participant would. This implementation holds the same
//! predicates - deadline checks, curve membership, proof-of-knowledge at
//! registration, full dispute re-verification, first-submission-wins for
//! key shares and the master key - behind the [`Ledger`] trait, appending
//! one block per accepted transaction so events carry a total order. It
//! backs the integration tests and the demo binary; a deployment would swap
//! in an RPC adapter against the real contract.

use alloy::primitives::Address;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use dkg_core::{
    curve::{G1, G2, g1, h1, h2, pairings_equal, sum_g2},
    proofs::{dleq, schnorr},
    vss,
};
use dkg_types::{
    ParticipantId,
    chain::{
        DisputeSubmission, KeyShareRecoverySubmission, KeyShareSubmission, LedgerEvent,
        MasterPublicKeySubmission, OrderedEvent, RegisteredNode, RegistrationSubmission,
        ShareDistributionSubmission,
    },
    crypto::EncryptionPublicKey,
    wire::{G1Repr, G2Repr},
};

use super::{Ledger, LedgerError, PhaseSchedule};

#[derive(Default)]
struct LedgerState {
    block: u64,
    registrations: Vec<RegisteredNode>,
    distributions: BTreeMap<Address, ShareDistributionSubmission>,
    disputed: BTreeSet<Address>,
    key_shares: BTreeMap<Address, (G1Repr, G2Repr)>,
    master_public_key: Option<G2Repr>,
    events: Vec<OrderedEvent>,
}

/// In-memory DKG ledger; see the module docs.
pub struct InMemoryLedger {
    schedule: PhaseSchedule,
    state: Mutex<LedgerState>,
}

fn reverted(reason: impl Into<String>) -> LedgerError {
    LedgerError::Reverted(reason.into())
}

impl LedgerState {
    fn record(&mut self, event: LedgerEvent) {
        self.block += 1;
        self.events.push(OrderedEvent {
            block: self.block,
            event,
        });
    }

    fn registration(&self, address: Address) -> Option<&RegisteredNode> {
        self.registrations
            .iter()
            .find(|node| node.address == address)
    }

    fn public_key(&self, address: Address) -> Result<G1, LedgerError> {
        let node = self
            .registration(address)
            .ok_or_else(|| reverted(format!("{address} is not registered")))?;
        // Registration only accepts decodable keys.
        G1::try_from(node.public_key)
            .map_err(|_| reverted("stored public key corrupt"))
    }

    fn threshold(&self) -> usize {
        self.registrations.len().div_ceil(2) - 1
    }

    /// The receivers of an issuer's encrypted share list, in registration
    /// order with the issuer skipped.
    fn receivers_of(&self, issuer: Address) -> Vec<Address> {
        self.registrations
            .iter()
            .map(|node| node.address)
            .filter(|&address| address != issuer)
            .collect()
    }

    fn qualified(&self) -> Vec<Address> {
        self.registrations
            .iter()
            .map(|node| node.address)
            .filter(|address| {
                self.distributions.contains_key(address) && !self.disputed.contains(address)
            })
            .collect()
    }
}

impl InMemoryLedger {
    /// Creates a ledger with the given phase schedule, at block zero.
    pub fn new(schedule: PhaseSchedule) -> Self {
        Self {
            schedule,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Advances the chain head by `delta` blocks.
    pub fn advance_blocks(&self, delta: u64) {
        self.state.lock().block += delta;
    }

    /// Advances the chain head to at least `block`.
    pub fn advance_to(&self, block: u64) {
        let mut state = self.state.lock();
        state.block = state.block.max(block);
    }

    /// The accepted master public key, if any.
    pub fn master_public_key(&self) -> Option<G2Repr> {
        self.state.lock().master_public_key
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn schedule(&self) -> Result<PhaseSchedule, LedgerError> {
        Ok(self.schedule)
    }

    async fn block_number(&self) -> Result<u64, LedgerError> {
        Ok(self.state.lock().block)
    }

    async fn register(
        &self,
        from: Address,
        submission: RegistrationSubmission,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        if state.block > self.schedule.registration_end {
            return Err(reverted("registration phase closed"));
        }
        if state.registration(from).is_some() {
            return Err(reverted("already registered"));
        }
        let public_key = EncryptionPublicKey::try_from(submission.public_key)
            .map_err(|_| reverted("public key not on curve"))?;
        if !schnorr::verify(&public_key.inner(), &submission.proof, Some(from)) {
            return Err(reverted("invalid proof of secret key knowledge"));
        }
        // The list stays sorted by address; every participant derives its
        // share-slot positions from this order.
        let position = state
            .registrations
            .iter()
            .position(|existing| existing.address > from)
            .unwrap_or(state.registrations.len());
        state.registrations.insert(
            position,
            RegisteredNode {
                address: from,
                public_key: submission.public_key,
            },
        );
        state.record(LedgerEvent::Registration {
            node: from,
            public_key: submission.public_key,
        });
        Ok(())
    }

    async fn registrations(&self) -> Result<Vec<RegisteredNode>, LedgerError> {
        Ok(self.state.lock().registrations.clone())
    }

    async fn distribute_shares(
        &self,
        from: Address,
        submission: ShareDistributionSubmission,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        if state.block > self.schedule.share_distribution_end {
            return Err(reverted("share distribution phase closed"));
        }
        if state.registration(from).is_none() {
            return Err(reverted(format!("{from} is not registered")));
        }
        if state.distributions.contains_key(&from) {
            return Err(reverted("shares already distributed"));
        }
        let n = state.registrations.len();
        if submission.encrypted_shares.len() != n - 1 {
            return Err(reverted("wrong number of encrypted shares"));
        }
        if submission.commitments.len() != state.threshold() + 1 {
            return Err(reverted("wrong number of commitments"));
        }
        for commitment in &submission.commitments {
            G1::try_from(*commitment).map_err(|_| reverted("commitment not on curve"))?;
        }
        state.distributions.insert(from, submission.clone());
        state.record(LedgerEvent::ShareDistribution {
            issuer: from,
            encrypted_shares: submission.encrypted_shares,
            commitments: submission.commitments,
        });
        Ok(())
    }

    async fn submit_dispute(
        &self,
        from: Address,
        submission: DisputeSubmission,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        if state.block > self.schedule.dispute_end {
            return Err(reverted("dispute phase closed"));
        }
        let issuer = submission.issuer;
        let issuer_pk = state.public_key(issuer)?;
        let disputer_pk = state.public_key(from)?;
        let stored = state
            .distributions
            .get(&issuer)
            .ok_or_else(|| reverted("issuer did not distribute shares"))?;
        // The contract holds only a digest of each distribution; the
        // disputer echoes the material and the echo must match.
        if stored.encrypted_shares != submission.encrypted_shares
            || stored.commitments != submission.commitments
        {
            return Err(reverted("echoed distribution does not match publication"));
        }
        let position = |address: Address| {
            state
                .registrations
                .iter()
                .position(|node| node.address == address)
        };
        if position(issuer) != Some(submission.issuer_index)
            || position(from) != Some(submission.disputer_index)
        {
            return Err(reverted("registration list indices do not match"));
        }

        let shared_key = G1::try_from(submission.shared_key)
            .map_err(|_| reverted("shared key not on curve"))?;
        if !dleq::verify(&g1(), &disputer_pk, &issuer_pk, &shared_key, &submission.proof) {
            return Err(reverted("shared key correctness proof invalid"));
        }

        let receivers = state.receivers_of(issuer);
        let slot = receivers
            .iter()
            .position(|&address| address == from)
            .ok_or_else(|| reverted("disputer not among receivers"))?;
        let disputer_id = ParticipantId::from_address(from);
        let share = vss::decrypt_share(
            submission.encrypted_shares[slot],
            &shared_key,
            disputer_id.into_inner(),
        );
        let commitments: Vec<G1> = submission
            .commitments
            .iter()
            .map(|&repr| G1::try_from(repr))
            .collect::<Result<_, _>>()
            .map_err(|_| reverted("commitment not on curve"))?;
        if vss::verify_share(disputer_id.to_scalar(), share, &commitments) {
            return Err(reverted("dispute rejected: share is valid"));
        }

        state.disputed.insert(issuer);
        state.record(LedgerEvent::Dispute {
            issuer,
            disputer: from,
            shared_key: submission.shared_key,
            proof: submission.proof,
        });
        Ok(())
    }

    async fn submit_key_share(
        &self,
        _from: Address,
        submission: KeyShareSubmission,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        if state.block <= self.schedule.dispute_end {
            return Err(reverted("dispute phase still open"));
        }
        if state.key_shares.contains_key(&submission.issuer) {
            // First submission per participant wins; later ones are
            // accepted without effect.
            return Ok(());
        }
        if state.disputed.contains(&submission.issuer) {
            return Err(reverted("issuer was disqualified"));
        }
        let stored = state
            .distributions
            .get(&submission.issuer)
            .ok_or_else(|| reverted("issuer did not distribute shares"))?;
        let constant_commitment = G1::try_from(stored.commitments[0])
            .map_err(|_| reverted("stored commitment corrupt"))?;
        let h1_share = G1::try_from(submission.key_share_g1)
            .map_err(|_| reverted("key share not on curve"))?;
        let h2_share = G2::try_from(submission.key_share_g2)
            .map_err(|_| reverted("key share not in G2"))?;
        if !dleq::verify(
            &h1(),
            &h1_share,
            &g1(),
            &constant_commitment,
            &submission.proof,
        ) {
            return Err(reverted("key share correctness proof invalid"));
        }
        if !pairings_equal(h1_share, h2(), h1(), h2_share) {
            return Err(reverted("key share pairing check failed"));
        }
        state.key_shares.insert(
            submission.issuer,
            (submission.key_share_g1, submission.key_share_g2),
        );
        state.record(LedgerEvent::KeyShareSubmission {
            issuer: submission.issuer,
            key_share_g1: submission.key_share_g1,
            proof: submission.proof,
            key_share_g2: submission.key_share_g2,
        });
        Ok(())
    }

    async fn recover_key_shares(
        &self,
        from: Address,
        submission: KeyShareRecoverySubmission,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        if state.block <= self.schedule.key_share_submission_end {
            return Err(reverted("key share submission phase still open"));
        }
        if submission.recovered.len() != submission.shared_keys.len()
            || submission.recovered.len() != submission.proofs.len()
        {
            return Err(reverted("recovery submission length mismatch"));
        }
        let recoverer_pk = state.public_key(from)?;
        for ((&recovered, &shared_key), proof) in submission
            .recovered
            .iter()
            .zip(&submission.shared_keys)
            .zip(&submission.proofs)
        {
            if recovered == from {
                return Err(reverted("cannot recover oneself"));
            }
            let recovered_pk = state.public_key(recovered)?;
            if !state.distributions.contains_key(&recovered) {
                return Err(reverted("recovered participant did not distribute shares"));
            }
            let shared_key =
                G1::try_from(shared_key).map_err(|_| reverted("shared key not on curve"))?;
            if !dleq::verify(&g1(), &recoverer_pk, &recovered_pk, &shared_key, proof) {
                return Err(reverted("shared key correctness proof invalid"));
            }
        }
        state.record(LedgerEvent::KeyShareRecovery {
            recoverer: from,
            recovered: submission.recovered,
            shared_keys: submission.shared_keys,
            proofs: submission.proofs,
        });
        Ok(())
    }

    async fn submit_master_public_key(
        &self,
        _from: Address,
        submission: MasterPublicKeySubmission,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        if state.master_public_key.is_some() {
            // First valid submission wins.
            return Ok(());
        }
        let qualified = state.qualified();
        let mut components = Vec::with_capacity(qualified.len());
        for address in &qualified {
            let (_, h2_share) = state
                .key_shares
                .get(address)
                .ok_or_else(|| reverted(format!("missing key share for {address}")))?;
            components.push(
                G2::try_from(*h2_share).map_err(|_| reverted("stored key share corrupt"))?,
            );
        }
        let expected = sum_g2(components);
        let submitted = G2::try_from(submission.master_public_key)
            .map_err(|_| reverted("master public key not in G2"))?;
        if submitted != expected {
            return Err(reverted("master public key does not match key shares"));
        }
        state.master_public_key = Some(submission.master_public_key);
        // No event for the master key; observers derive it themselves and
        // can read the accepted value from state.
        state.block += 1;
        Ok(())
    }

    async fn events_since(&self, after: u64) -> Result<Vec<OrderedEvent>, LedgerError> {
        Ok(self
            .state
            .lock()
            .events
            .iter()
            .filter(|event| event.block > after)
            .cloned()
            .collect())
    }
}
