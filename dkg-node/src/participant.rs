//! The participant state machine of the DKG protocol.
//!
//! A [`Participant`] owns the node's secret material (the long-term
//! encryption key and the secret contribution to the master key), tracks
//! every other participant's published material, verifies everything it
//! loads, computes accusations from publicly checkable evidence, runs the
//! key-share recovery sub-protocol, and finally derives the master public
//! key and the node's individual group keys.
//!
//! The machine is pure: it performs no IO and holds no locks. The async
//! [`driver`](crate::driver) feeds it ledger events in total order and
//! pushes its submissions out. States progress linearly and each state is
//! entered exactly once:
//!
//! `New -> Registered -> SharesDistributed -> SharesLoaded ->
//! DisputesSubmitted -> DisputesLoaded -> KeyShareSubmitted ->
//! KeySharesLoaded -> KeysDerived`, with `Aborted` as the terminal failure
//! state once fewer than `t + 1` usable participants remain.

use std::collections::{BTreeMap, BTreeSet};

use alloy::primitives::{Address, U256};
use ark_ec::CurveGroup;
use ark_ff::UniformRand;
use rand::{CryptoRng, Rng};
use zeroize::ZeroizeOnDrop;

use dkg_core::{
    curve::{G1, G2, ScalarField, g1, h1, h2, pairings_equal, sum_g2},
    proofs::{dleq, schnorr},
    vss,
};
use dkg_types::{
    ParticipantId,
    chain::{
        DisputeSubmission, KeyShareRecoverySubmission, KeyShareSubmission, RegisteredNode,
        RegistrationSubmission, ShareDistributionSubmission,
    },
    crypto::{EncryptionPublicKey, KeyShare},
    wire::{G1Repr, G2Repr},
};

use crate::error::DkgError;

/// Protocol phase of a participant; linear, each phase entered once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Created, nothing submitted yet.
    New,
    /// Registration submitted.
    Registered,
    /// Encrypted shares and commitments submitted.
    SharesDistributed,
    /// All share-distribution events consumed and verified.
    SharesLoaded,
    /// Disputes (possibly none) submitted.
    DisputesSubmitted,
    /// All dispute events consumed; qualified set fixed.
    DisputesLoaded,
    /// Own key share submitted.
    KeyShareSubmitted,
    /// All key-share events consumed; recovery may still be pending.
    KeySharesLoaded,
    /// Master public key and group keys derived.
    KeysDerived,
    /// Terminal failure: fewer than `t + 1` usable participants.
    Aborted,
}

/// The share a participant decrypted from an issuer, or the sentinel for a
/// share that failed verification and is about to be disputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecryptedShare {
    Valid(ScalarField),
    Invalid,
}

/// The secret scalars of a participant. Wiped from memory on drop.
#[derive(ZeroizeOnDrop)]
struct LocalSecrets {
    /// Long-term encryption secret key; never leaves the participant.
    secret_key: ScalarField,
    /// The contribution `s` to the master secret.
    secret: ScalarField,
}

/// The individual group keys a participant derives at the end of a run.
#[derive(Clone)]
pub struct GroupKeys {
    /// `gsk = sum of the received shares over the qualified set`.
    pub group_secret_key: ScalarField,
    /// `gsk * H2`; the share of the master public key.
    pub group_public_key: G2,
    /// `gsk * H1`; the G1 twin used in verification.
    pub group_public_key_g1: G1,
    /// DLEQ proof tying `gsk * G1` to `gsk * H1`.
    pub proof: dleq::DleqProof,
}

/// A single participant of the DKG protocol. See the module docs for the
/// lifecycle.
pub struct Participant {
    address: Address,
    id: ParticipantId,
    secrets: LocalSecrets,
    public_key: G1,
    phase: Phase,

    n: usize,
    t: usize,
    /// All participant ids in ledger list order (sorted by address).
    ids: Vec<ParticipantId>,
    addresses: BTreeMap<ParticipantId, Address>,
    public_keys: BTreeMap<ParticipantId, G1>,
    shared_keys: BTreeMap<ParticipantId, G1>,

    /// Raw published distributions, archived for disputes and recovery.
    distributions: BTreeMap<ParticipantId, ShareDistributionSubmission>,
    /// Decoded commitments per issuer.
    commitments: BTreeMap<ParticipantId, Vec<G1>>,
    /// Encrypted shares per issuer, keyed by receiver.
    encrypted_shares: BTreeMap<ParticipantId, BTreeMap<ParticipantId, U256>>,
    /// Shares addressed to this participant.
    decrypted_shares: BTreeMap<ParticipantId, DecryptedShare>,

    disputed: BTreeSet<ParticipantId>,
    qualified: Vec<ParticipantId>,

    key_shares: BTreeMap<ParticipantId, KeyShare>,
    /// Verified recovery shares per recovered participant, keyed by
    /// recoverer. Inner maps are capped at `t + 1` entries.
    recovery_shares: BTreeMap<ParticipantId, BTreeMap<ParticipantId, ScalarField>>,
    recovered_secrets: BTreeMap<ParticipantId, ScalarField>,

    master_public_key: Option<G2>,
    group_keys: Option<GroupKeys>,
}

impl Participant {
    /// Creates a participant with fresh secret material.
    pub fn new(address: Address, rng: &mut (impl Rng + CryptoRng)) -> Self {
        let secret_key = ScalarField::rand(rng);
        let secret = ScalarField::rand(rng);
        Self::with_secrets(address, secret_key, secret)
    }

    /// Creates a participant from persisted secret material, e.g. after a
    /// restart between phases.
    pub fn with_secrets(address: Address, secret_key: ScalarField, secret: ScalarField) -> Self {
        let public_key = (g1() * secret_key).into_affine();
        Self {
            address,
            id: ParticipantId::from_address(address),
            secrets: LocalSecrets { secret_key, secret },
            public_key,
            phase: Phase::New,
            n: 0,
            t: 0,
            ids: Vec::new(),
            addresses: BTreeMap::new(),
            public_keys: BTreeMap::new(),
            shared_keys: BTreeMap::new(),
            distributions: BTreeMap::new(),
            commitments: BTreeMap::new(),
            encrypted_shares: BTreeMap::new(),
            decrypted_shares: BTreeMap::new(),
            disputed: BTreeSet::new(),
            qualified: Vec::new(),
            key_shares: BTreeMap::new(),
            recovery_shares: BTreeMap::new(),
            recovered_secrets: BTreeMap::new(),
            master_public_key: None,
            group_keys: None,
        }
    }

    /// The ledger account of this participant.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The participant id (integer reading of the account).
    pub fn id(&self) -> ParticipantId {
        self.id
    }

    /// The long-term encryption public key.
    pub fn public_key(&self) -> G1 {
        self.public_key
    }

    /// The current protocol phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of registered participants; zero before setup.
    pub fn n(&self) -> usize {
        self.n
    }

    /// The reconstruction threshold `t = ceil(n / 2) - 1`.
    pub fn t(&self) -> usize {
        self.t
    }

    /// The qualified set, fixed once disputes are loaded.
    pub fn qualified(&self) -> &[ParticipantId] {
        &self.qualified
    }

    /// The secret contribution `s`. Sensitive - exposed only for
    /// persistence and test assertions.
    pub fn secret(&self) -> ScalarField {
        self.secrets.secret
    }

    /// The long-term encryption secret key. Sensitive - exposed only for
    /// persistence; losing it after registration makes this participant an
    /// unavoidable recovery target.
    pub fn secret_key(&self) -> ScalarField {
        self.secrets.secret_key
    }

    /// The master public key, available once derived.
    pub fn master_public_key(&self) -> Option<G2> {
        self.master_public_key
    }

    /// The derived group keys, available once [`Self::derive_group_keys`]
    /// ran.
    pub fn group_keys(&self) -> Option<&GroupKeys> {
        self.group_keys.as_ref()
    }

    /// Own published commitments, available after share distribution.
    pub fn own_commitments(&self) -> Option<&[G1]> {
        self.commitments.get(&self.id).map(Vec::as_slice)
    }

    /// The shares this participant decrypted from qualified issuers, for
    /// persistence.
    pub fn valid_decrypted_shares(&self) -> BTreeMap<ParticipantId, ScalarField> {
        self.decrypted_shares
            .iter()
            .filter_map(|(&issuer, share)| match share {
                DecryptedShare::Valid(share) => Some((issuer, *share)),
                DecryptedShare::Invalid => None,
            })
            .collect()
    }

    fn transition(&mut self, from: Phase, to: Phase) {
        assert_eq!(
            self.phase, from,
            "phase transition to {to:?} out of order - this is a bug"
        );
        self.phase = to;
    }

    /// Builds the registration: the encryption public key with a Schnorr
    /// proof of knowledge of its secret key, bound to the account.
    pub fn registration(&mut self, rng: &mut (impl Rng + CryptoRng)) -> RegistrationSubmission {
        let proof = schnorr::prove(
            &self.secrets.secret_key,
            &self.public_key,
            Some(self.address),
            rng,
        );
        self.transition(Phase::New, Phase::Registered);
        RegistrationSubmission {
            public_key: self.public_key.into(),
            proof,
        }
    }

    /// Consumes the closed registration list: fixes `n`, the threshold
    /// `t = ceil(n / 2) - 1`, everyone's id and public key, and precomputes
    /// the pairwise shared keys.
    pub fn setup(&mut self, registrations: &[RegisteredNode]) -> Result<(), DkgError> {
        assert_eq!(self.phase, Phase::Registered, "setup before registration");
        self.n = registrations.len();
        self.t = self.n.div_ceil(2) - 1;

        for node in registrations {
            let id = ParticipantId::from_address(node.address);
            let public_key = EncryptionPublicKey::try_from(node.public_key)
                .map_err(|_| DkgError::PointNotOnCurve { issuer: node.address })?;
            self.ids.push(id);
            self.addresses.insert(id, node.address);
            self.public_keys.insert(id, public_key.inner());
        }
        if self.addresses.get(&self.id) != Some(&self.address) {
            return Err(DkgError::VerificationFailed(
                "own registration missing from the ledger".into(),
            ));
        }
        for (&id, public_key) in &self.public_keys {
            if id != self.id {
                self.shared_keys
                    .insert(id, vss::shared_key(&self.secrets.secret_key, public_key));
            }
        }
        tracing::debug!(n = self.n, t = self.t, "setup complete");
        Ok(())
    }

    /// Runs the `(t, n)` sharing of the secret contribution and encrypts
    /// each peer's share under the pairwise key. The own share is kept
    /// locally; the returned submission lists the others in registration
    /// order.
    pub fn share_distribution(
        &mut self,
        rng: &mut (impl Rng + CryptoRng),
    ) -> ShareDistributionSubmission {
        assert!(self.n > 0, "share distribution before setup");
        let indices: Vec<ScalarField> = self.ids.iter().map(|id| id.to_scalar()).collect();
        let (shares, commitments) =
            vss::share_secret(self.secrets.secret, &indices, self.t, rng);

        let mut encrypted = BTreeMap::new();
        let mut ordered = Vec::with_capacity(self.n - 1);
        for (&id, &share) in self.ids.iter().zip(&shares) {
            if id == self.id {
                self.decrypted_shares.insert(id, DecryptedShare::Valid(share));
                continue;
            }
            let ciphertext =
                vss::encrypt_share(share, &self.shared_keys[&id], id.into_inner());
            encrypted.insert(id, ciphertext);
            ordered.push(ciphertext);
        }

        let submission = ShareDistributionSubmission {
            encrypted_shares: ordered,
            commitments: commitments.iter().map(|&c| c.into()).collect(),
        };
        self.distributions.insert(self.id, submission.clone());
        self.commitments.insert(self.id, commitments);
        self.encrypted_shares.insert(self.id, encrypted);
        self.transition(Phase::Registered, Phase::SharesDistributed);
        submission
    }

    /// Loads a peer's share distribution: archives it, decrypts the share
    /// addressed to this participant and verifies it against the issuer's
    /// commitments.
    ///
    /// Returns `Ok(false)` iff the share (or a commitment point) is bad and
    /// the issuer is now a dispute candidate. Structurally malformed
    /// distributions - which a faithful ledger never accepts - are an
    /// error.
    pub fn load_share_distribution(
        &mut self,
        issuer: Address,
        encrypted_shares: &[U256],
        commitments: &[G1Repr],
    ) -> Result<bool, DkgError> {
        let issuer_id = self.known_id(issuer)?;
        if issuer_id == self.id {
            return Ok(true);
        }
        if encrypted_shares.len() != self.n - 1 || commitments.len() != self.t + 1 {
            return Err(DkgError::VerificationFailed(format!(
                "malformed share distribution from {issuer}"
            )));
        }

        let receivers: Vec<ParticipantId> = self
            .ids
            .iter()
            .copied()
            .filter(|&id| id != issuer_id)
            .collect();
        self.encrypted_shares.insert(
            issuer_id,
            receivers.iter().copied().zip(encrypted_shares.iter().copied()).collect(),
        );
        self.distributions.insert(
            issuer_id,
            ShareDistributionSubmission {
                encrypted_shares: encrypted_shares.to_vec(),
                commitments: commitments.to_vec(),
            },
        );

        let decoded: Result<Vec<G1>, _> =
            commitments.iter().map(|&repr| G1::try_from(repr)).collect();
        let Ok(decoded) = decoded else {
            tracing::warn!(%issuer, "commitment not on curve, marking issuer for dispute");
            self.decrypted_shares.insert(issuer_id, DecryptedShare::Invalid);
            return Ok(false);
        };

        let ciphertext = self.encrypted_shares[&issuer_id][&self.id];
        let share = vss::decrypt_share(
            ciphertext,
            &self.shared_keys[&issuer_id],
            self.id.into_inner(),
        );
        let ok = vss::verify_share(self.id.to_scalar(), share, &decoded);
        self.commitments.insert(issuer_id, decoded);
        if ok {
            self.decrypted_shares.insert(issuer_id, DecryptedShare::Valid(share));
        } else {
            tracing::warn!(%issuer, "received share fails verification, marking for dispute");
            self.decrypted_shares.insert(issuer_id, DecryptedShare::Invalid);
        }
        Ok(ok)
    }

    /// Closes the share-loading step. Aborts the run when more than `t`
    /// issuers failed to deliver a valid share, since the remaining honest
    /// material could no longer tolerate `t` adversaries.
    pub fn finish_share_loading(&mut self) -> Result<(), DkgError> {
        let unusable = self
            .ids
            .iter()
            .filter(|id| {
                !matches!(
                    self.decrypted_shares.get(id),
                    Some(DecryptedShare::Valid(_))
                )
            })
            .count();
        if unusable > self.t {
            self.phase = Phase::Aborted;
            return Err(DkgError::InsufficientQualified {
                available: self.n - unusable,
                required: self.n - self.t,
            });
        }
        self.transition(Phase::SharesDistributed, Phase::SharesLoaded);
        Ok(())
    }

    /// Builds one dispute per issuer whose share failed verification: the
    /// pairwise shared key with a DLEQ proof of its correctness, plus the
    /// issuer's echoed publication. Revealing the key lets everyone re-derive
    /// the bad share; only the key's correctness needs proving.
    pub fn dispute_submissions(
        &mut self,
        rng: &mut (impl Rng + CryptoRng),
    ) -> Vec<DisputeSubmission> {
        let accused: Vec<ParticipantId> = self
            .decrypted_shares
            .iter()
            .filter(|(_, share)| matches!(share, DecryptedShare::Invalid))
            .map(|(&issuer, _)| issuer)
            .collect();

        let mut submissions = Vec::with_capacity(accused.len());
        for issuer_id in accused {
            self.disputed.insert(issuer_id);
            let shared_key = self.shared_keys[&issuer_id];
            let proof = dleq::prove(
                &g1(),
                &self.public_key,
                &self.public_keys[&issuer_id],
                &shared_key,
                &self.secrets.secret_key,
                rng,
            );
            let publication = &self.distributions[&issuer_id];
            submissions.push(DisputeSubmission {
                issuer: self.addresses[&issuer_id],
                issuer_index: self.index_of(issuer_id),
                disputer_index: self.index_of(self.id),
                encrypted_shares: publication.encrypted_shares.clone(),
                commitments: publication.commitments.clone(),
                shared_key: shared_key.into(),
                proof,
            });
        }
        self.transition(Phase::SharesLoaded, Phase::DisputesSubmitted);
        submissions
    }

    /// Verifies a dispute observed on the ledger and grows the disputed set
    /// when it holds.
    ///
    /// Returns `Ok(false)` for a discarded dispute: unknown parties, a
    /// shared key whose DLEQ proof does not verify, or an accusation whose
    /// re-derived share is actually valid (a false dispute penalizing the
    /// disputer, not the issuer).
    pub fn load_dispute(
        &mut self,
        issuer: Address,
        disputer: Address,
        shared_key: G1Repr,
        proof: &dleq::DleqProof,
    ) -> Result<bool, DkgError> {
        let issuer_id = ParticipantId::from_address(issuer);
        let disputer_id = ParticipantId::from_address(disputer);
        if issuer_id == disputer_id {
            return Ok(false);
        }
        let (Some(issuer_pk), Some(disputer_pk)) = (
            self.public_keys.get(&issuer_id),
            self.public_keys.get(&disputer_id),
        ) else {
            return Ok(false);
        };
        let Ok(shared_key) = G1::try_from(shared_key) else {
            return Ok(false);
        };
        if !dleq::verify(&g1(), disputer_pk, issuer_pk, &shared_key, proof) {
            return Ok(false);
        }

        let Some(ciphertext) = self
            .encrypted_shares
            .get(&issuer_id)
            .and_then(|shares| shares.get(&disputer_id))
        else {
            return Ok(false);
        };
        let Some(commitments) = self.commitments.get(&issuer_id) else {
            return Ok(false);
        };
        let disputed_share =
            vss::decrypt_share(*ciphertext, &shared_key, disputer_id.into_inner());
        if vss::verify_share(disputer_id.to_scalar(), disputed_share, commitments) {
            // The accusation is itself invalid; the ledger penalizes the
            // disputer and the issuer stays qualified.
            return Ok(false);
        }

        self.disputed.insert(issuer_id);
        Ok(true)
    }

    /// Fixes the qualified set: every participant that published shares and
    /// was not successfully disputed. Aborts when fewer than `t + 1`
    /// remain.
    pub fn compute_qualified(&mut self) -> Result<&[ParticipantId], DkgError> {
        self.qualified = self
            .ids
            .iter()
            .copied()
            .filter(|id| self.distributions.contains_key(id) && !self.disputed.contains(id))
            .collect();
        if self.qualified.len() < self.t + 1 {
            self.phase = Phase::Aborted;
            return Err(DkgError::InsufficientQualified {
                available: self.qualified.len(),
                required: self.t + 1,
            });
        }
        self.transition(Phase::DisputesSubmitted, Phase::DisputesLoaded);
        Ok(&self.qualified)
    }

    /// Computes the own key share `(h1, h2) = (s * H1, s * H2)` with the
    /// DLEQ proof tying `h1` to the published constant-term commitment.
    pub fn key_share_submission(
        &mut self,
        rng: &mut (impl Rng + CryptoRng),
    ) -> Result<KeyShareSubmission, DkgError> {
        if !self.qualified.contains(&self.id) {
            return Err(DkgError::InsufficientQualified {
                available: self.qualified.len(),
                required: self.t + 1,
            });
        }
        let secret = self.secrets.secret;
        let h1_share = (h1() * secret).into_affine();
        let h2_share = (h2() * secret).into_affine();
        let proof = dleq::prove(
            &h1(),
            &h1_share,
            &g1(),
            &self.commitments[&self.id][0],
            &secret,
            rng,
        );
        self.key_shares.insert(
            self.id,
            KeyShare {
                h1: h1_share,
                h2: h2_share,
            },
        );
        self.transition(Phase::DisputesLoaded, Phase::KeyShareSubmitted);
        Ok(KeyShareSubmission {
            issuer: self.address,
            key_share_g1: h1_share.into(),
            proof,
            key_share_g2: h2_share.into(),
        })
    }

    /// Verifies and stores a key share observed on the ledger: the DLEQ
    /// proof against the issuer's `C_0` and the cross-group pairing check
    /// `e(h1, H2) == e(H1, h2)`.
    ///
    /// Returns `Ok(false)` if any check fails; since the ledger runs the
    /// same predicates, a failure here means the two verifiers have
    /// diverged and the caller should treat the run as broken.
    pub fn load_key_share(
        &mut self,
        issuer: Address,
        key_share_g1: G1Repr,
        proof: &dleq::DleqProof,
        key_share_g2: G2Repr,
    ) -> Result<bool, DkgError> {
        let issuer_id = ParticipantId::from_address(issuer);
        if !self.qualified.contains(&issuer_id) {
            return Ok(false);
        }
        let (Ok(h1_share), Ok(h2_share)) =
            (G1::try_from(key_share_g1), G2::try_from(key_share_g2))
        else {
            return Ok(false);
        };
        let Some(constant_commitment) = self.commitments.get(&issuer_id).map(|c| c[0]) else {
            return Ok(false);
        };
        if !dleq::verify(&h1(), &h1_share, &g1(), &constant_commitment, proof) {
            return Ok(false);
        }
        if !pairings_equal(h1_share, h2(), h1(), h2_share) {
            return Ok(false);
        }
        self.key_shares.insert(
            issuer_id,
            KeyShare {
                h1: h1_share,
                h2: h2_share,
            },
        );
        Ok(true)
    }

    /// Closes the key-share loading step; missing shares are handled by the
    /// recovery sub-protocol afterwards.
    pub fn finish_key_share_loading(&mut self) {
        self.transition(Phase::KeyShareSubmitted, Phase::KeySharesLoaded);
    }

    /// Qualified participants whose key share has not been observed (or
    /// recovered) yet.
    pub fn missing_key_shares(&self) -> Vec<ParticipantId> {
        self.qualified
            .iter()
            .copied()
            .filter(|id| !self.key_shares.contains_key(id))
            .collect()
    }

    /// Ledger accounts of the qualified participants whose key shares are
    /// still missing.
    pub fn missing_key_share_addresses(&self) -> Vec<Address> {
        self.missing_key_shares()
            .iter()
            .map(|id| self.addresses[id])
            .collect()
    }

    /// Reveals the pairwise keys for all qualified participants without a
    /// key share, each with a DLEQ correctness proof, so their archived
    /// shares become publicly decryptable. `None` when nothing is missing.
    pub fn recovery_submission(
        &self,
        rng: &mut (impl Rng + CryptoRng),
    ) -> Option<KeyShareRecoverySubmission> {
        let missing = self.missing_key_shares();
        if missing.is_empty() {
            return None;
        }
        let mut recovered = Vec::with_capacity(missing.len());
        let mut shared_keys = Vec::with_capacity(missing.len());
        let mut proofs = Vec::with_capacity(missing.len());
        for id in missing {
            let shared_key = self.shared_keys[&id];
            let proof = dleq::prove(
                &g1(),
                &self.public_key,
                &self.public_keys[&id],
                &shared_key,
                &self.secrets.secret_key,
                rng,
            );
            recovered.push(self.addresses[&id]);
            shared_keys.push(shared_key.into());
            proofs.push(proof);
        }
        Some(KeyShareRecoverySubmission {
            recovered,
            shared_keys,
            proofs,
        })
    }

    /// Verifies a revealed pairwise key, decrypts the archived share of the
    /// recovered participant and banks it towards reconstruction. Buckets
    /// stop growing once `t + 1` shares are collected.
    ///
    /// Returns `Ok(false)` iff the reveal is invalid (bad proof, bad point,
    /// or a share that fails the Feldman check).
    pub fn load_recovery_share(
        &mut self,
        recovered: Address,
        recoverer: Address,
        shared_key: G1Repr,
        proof: &dleq::DleqProof,
    ) -> Result<bool, DkgError> {
        let recovered_id = ParticipantId::from_address(recovered);
        let recoverer_id = ParticipantId::from_address(recoverer);
        if recovered_id == recoverer_id || !self.qualified.contains(&recovered_id) {
            return Ok(false);
        }
        if self.key_shares.contains_key(&recovered_id) {
            // Already have this key share; nothing to bank.
            return Ok(true);
        }
        let (Some(recoverer_pk), Some(recovered_pk)) = (
            self.public_keys.get(&recoverer_id),
            self.public_keys.get(&recovered_id),
        ) else {
            return Ok(false);
        };
        let Ok(shared_key) = G1::try_from(shared_key) else {
            return Ok(false);
        };
        if !dleq::verify(&g1(), recoverer_pk, recovered_pk, &shared_key, proof) {
            return Ok(false);
        }
        let Some(ciphertext) = self
            .encrypted_shares
            .get(&recovered_id)
            .and_then(|shares| shares.get(&recoverer_id))
        else {
            return Ok(false);
        };
        let Some(commitments) = self.commitments.get(&recovered_id) else {
            return Ok(false);
        };
        let share = vss::decrypt_share(*ciphertext, &shared_key, recoverer_id.into_inner());
        if !vss::verify_share(recoverer_id.to_scalar(), share, commitments) {
            return Ok(false);
        }

        let bucket = self.recovery_shares.entry(recovered_id).or_default();
        if bucket.len() < self.t + 1 {
            bucket.insert(recoverer_id, share);
        }
        Ok(true)
    }

    /// Attempts the Lagrange reconstruction of a missing participant's
    /// secret from the banked recovery shares. Returns `true` once the key
    /// share is available (reconstruction happens exactly once).
    pub fn try_recover_key_share(&mut self, recovered: ParticipantId) -> bool {
        if self.key_shares.contains_key(&recovered) {
            return true;
        }
        let Some(bucket) = self.recovery_shares.get(&recovered) else {
            return false;
        };
        if bucket.len() < self.t + 1 {
            return false;
        }
        let shares: Vec<(ScalarField, ScalarField)> = bucket
            .iter()
            .map(|(recoverer, &share)| (recoverer.to_scalar(), share))
            .collect();
        let secret = vss::reconstruct_secret(&shares);
        self.recovered_secrets.insert(recovered, secret);
        self.key_shares.insert(
            recovered,
            KeyShare {
                h1: (h1() * secret).into_affine(),
                h2: (h2() * secret).into_affine(),
            },
        );
        tracing::info!(participant = %recovered, "key share reconstructed");
        true
    }

    /// Key-share submissions on behalf of every participant this node
    /// reconstructed. Only the first successful submission per participant
    /// counts on the ledger; redundant ones have no effect.
    pub fn recovered_key_share_submissions(
        &self,
        rng: &mut (impl Rng + CryptoRng),
    ) -> Vec<KeyShareSubmission> {
        self.recovered_secrets
            .iter()
            .map(|(&id, secret)| {
                let share = self.key_shares[&id];
                let proof = dleq::prove(
                    &h1(),
                    &share.h1,
                    &g1(),
                    &self.commitments[&id][0],
                    secret,
                    rng,
                );
                KeyShareSubmission {
                    issuer: self.addresses[&id],
                    key_share_g1: share.h1.into(),
                    proof,
                    key_share_g2: share.h2.into(),
                }
            })
            .collect()
    }

    /// Derives the master public key `MPK = sum of h2 over the qualified
    /// set`. Requires every qualified key share to be present.
    pub fn derive_master_public_key(&mut self) -> Result<G2, DkgError> {
        let mut components = Vec::with_capacity(self.qualified.len());
        for id in &self.qualified {
            let share = self.key_shares.get(id).ok_or_else(|| {
                DkgError::VerificationFailed(format!("missing key share for {id}"))
            })?;
            components.push(share.h2);
        }
        let master_public_key = sum_g2(components);
        self.master_public_key = Some(master_public_key);
        Ok(master_public_key)
    }

    /// Derives the individual group keys: `gsk` as the sum of the received
    /// qualified shares, its `H1`/`H2` images, and the DLEQ proof linking
    /// them.
    pub fn derive_group_keys(
        &mut self,
        rng: &mut (impl Rng + CryptoRng),
    ) -> Result<&GroupKeys, DkgError> {
        let mut shares = Vec::with_capacity(self.qualified.len());
        for id in &self.qualified {
            match self.decrypted_shares.get(id) {
                Some(DecryptedShare::Valid(share)) => shares.push(*share),
                _ => {
                    return Err(DkgError::VerificationFailed(format!(
                        "no valid share from qualified participant {id}"
                    )));
                }
            }
        }
        let group_secret_key = vss::sum_scalars(shares);
        let group_public_key = (h2() * group_secret_key).into_affine();
        let group_public_key_g1 = (h1() * group_secret_key).into_affine();
        let proof = dleq::prove(
            &g1(),
            &(g1() * group_secret_key).into_affine(),
            &h1(),
            &group_public_key_g1,
            &group_secret_key,
            rng,
        );
        self.transition(Phase::KeySharesLoaded, Phase::KeysDerived);
        self.group_keys = Some(GroupKeys {
            group_secret_key,
            group_public_key,
            group_public_key_g1,
            proof,
        });
        Ok(self.group_keys.as_ref().expect("just set"))
    }

    /// Verifies a peer's group public key: evaluates every qualified
    /// commitment polynomial at the peer's id, checks the DLEQ base change
    /// from `G1` to `H1`, and moves to G2 with a pairing check.
    pub fn verify_group_public_key(
        &self,
        participant: ParticipantId,
        group_public_key: G2,
        group_public_key_g1: G1,
        proof: &dleq::DleqProof,
    ) -> bool {
        let expected_g1 = dkg_core::curve::sum_g1(
            self.qualified
                .iter()
                .map(|id| vss::evaluate_commitments(&self.commitments[id], participant.to_scalar())),
        );
        if !dleq::verify(&g1(), &expected_g1, &h1(), &group_public_key_g1, proof) {
            return false;
        }
        pairings_equal(group_public_key_g1, h2(), h1(), group_public_key)
    }

    fn index_of(&self, id: ParticipantId) -> usize {
        self.ids
            .iter()
            .position(|&candidate| candidate == id)
            .expect("id is registered")
    }

    fn known_id(&self, address: Address) -> Result<ParticipantId, DkgError> {
        let id = ParticipantId::from_address(address);
        if !self.addresses.contains_key(&id) {
            return Err(DkgError::VerificationFailed(format!(
                "event from unregistered account {address}"
            )));
        }
        Ok(id)
    }
}
