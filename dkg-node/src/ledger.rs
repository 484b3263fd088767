//! The ledger capability the participant state machine is driven against.
//!
//! The ledger is the protocol's single linearizer: it orders submissions,
//! enforces the same acceptance predicates as every honest participant, and
//! streams the accepted material back as events in total order. The core is
//! written against the narrow [`Ledger`] trait; any faithful implementation
//! (an RPC adapter against the deployed contract, or the in-memory
//! [`memory::InMemoryLedger`]) can be plugged in by the caller.

use alloy::primitives::Address;
use async_trait::async_trait;

use dkg_types::chain::{
    DisputeSubmission, KeyShareRecoverySubmission, KeyShareSubmission,
    MasterPublicKeySubmission, OrderedEvent, RegisteredNode, RegistrationSubmission,
    ShareDistributionSubmission,
};

pub mod memory;

/// The block numbers that delimit the protocol phases, read from the
/// ledger at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSchedule {
    /// Last block at which registrations are accepted.
    pub registration_end: u64,
    /// Last block at which share distributions are accepted.
    pub share_distribution_end: u64,
    /// Last block at which disputes are accepted.
    pub dispute_end: u64,
    /// Last block at which own key shares are accepted.
    pub key_share_submission_end: u64,
    /// Blocks to wait after a phase ends until its submissions are
    /// considered final.
    pub delta_confirm: u64,
    /// Blocks guaranteed to be enough for a submitted transaction to be
    /// included.
    pub delta_include: u64,
}

impl PhaseSchedule {
    /// Derives a schedule from per-phase lengths, matching the way the
    /// contract constructor lays the phases out back to back.
    pub fn from_phase_length(phase_length: u64, delta_confirm: u64, delta_include: u64) -> Self {
        let registration_end = phase_length;
        let share_distribution_end = registration_end + delta_confirm + phase_length;
        let dispute_end = share_distribution_end + delta_confirm + phase_length;
        let key_share_submission_end = dispute_end + delta_confirm + delta_include;
        Self {
            registration_end,
            share_distribution_end,
            dispute_end,
            key_share_submission_end,
            delta_confirm,
            delta_include,
        }
    }

    /// The block past which a stalled recovery becomes terminal. The
    /// schedule has no dedicated constant for this, so the recovery loop is
    /// bounded by one confirmation plus one inclusion window after the
    /// key-share deadline.
    pub fn recovery_end(&self) -> u64 {
        self.key_share_submission_end + self.delta_confirm + self.delta_include
    }
}

/// Errors of ledger interactions.
///
/// Rejections are the ledger saying no (a reverted transaction, with the
/// revert reason); transport failures are everything between the node and
/// the ledger and are retriable by the adapter.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The ledger reverted the submission.
    #[error("transaction reverted: {0}")]
    Reverted(String),
    /// The ledger could not be reached.
    #[error(transparent)]
    Transport(#[from] eyre::Report),
}

/// The narrow surface the DKG core needs from the chain.
///
/// All submissions carry the sender explicitly; a deployed adapter binds
/// `from` to its transaction signer. Events are delivered in ledger-total
/// order, which the state machine relies on for the monotonic growth of the
/// disputed set and the first-recovery-wins rule.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// The phase boundaries of this deployment.
    async fn schedule(&self) -> Result<PhaseSchedule, LedgerError>;

    /// Current block height.
    async fn block_number(&self) -> Result<u64, LedgerError>;

    /// Registers a participant for the upcoming run.
    async fn register(
        &self,
        from: Address,
        submission: RegistrationSubmission,
    ) -> Result<(), LedgerError>;

    /// All accepted registrations, sorted by account address. Meaningful
    /// once the registration phase closed. The share-slot positions of
    /// every distribution derive from this order.
    async fn registrations(&self) -> Result<Vec<RegisteredNode>, LedgerError>;

    /// Publishes encrypted shares and commitments.
    async fn distribute_shares(
        &self,
        from: Address,
        submission: ShareDistributionSubmission,
    ) -> Result<(), LedgerError>;

    /// Submits a dispute; the ledger verifies it and reverts if the
    /// accusation does not hold.
    async fn submit_dispute(
        &self,
        from: Address,
        submission: DisputeSubmission,
    ) -> Result<(), LedgerError>;

    /// Submits a key share (own, or on behalf of a recovered participant).
    /// Redundant submissions for an already-covered participant are
    /// accepted without effect.
    async fn submit_key_share(
        &self,
        from: Address,
        submission: KeyShareSubmission,
    ) -> Result<(), LedgerError>;

    /// Reveals pairwise keys to start recovering absent participants.
    async fn recover_key_shares(
        &self,
        from: Address,
        submission: KeyShareRecoverySubmission,
    ) -> Result<(), LedgerError>;

    /// Publishes the derived master public key. The first valid submission
    /// wins; later identical ones have no effect.
    async fn submit_master_public_key(
        &self,
        from: Address,
        submission: MasterPublicKeySubmission,
    ) -> Result<(), LedgerError>;

    /// All events recorded at blocks strictly greater than `after`, in
    /// total order.
    async fn events_since(&self, after: u64) -> Result<Vec<OrderedEvent>, LedgerError>;
}
