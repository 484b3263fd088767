//! Error types of the participant state machine and driver.

use alloy::primitives::Address;

/// Errors a DKG participant can raise, in the order the state machine can
/// encounter them.
///
/// Local verification failures of peer material never surface here - they
/// become evidence for accusations instead. What does surface is missed
/// submission windows, ledger rejections, structurally malformed events,
/// and the terminal conditions that end a run.
#[derive(Debug, thiserror::Error)]
pub enum DkgError {
    /// A submission window was missed; the participant skips that
    /// submission and continues with whatever inputs it has.
    #[error("{phase} window closed at block {deadline}, current block is {current}")]
    LatePhase {
        /// The phase whose window was missed.
        phase: &'static str,
        /// Last block at which the submission was accepted.
        deadline: u64,
        /// Block height at the time of the attempt.
        current: u64,
    },

    /// The ledger reverted a transaction. Fatal for the affected phase;
    /// the participant will most likely end up outside the qualified set.
    #[error("ledger rejected submission: {reason}")]
    LedgerRejected {
        /// The revert reason as reported by the ledger.
        reason: String,
    },

    /// A point received from the ledger failed curve membership checks.
    #[error("point published by {issuer} is not a valid curve point")]
    PointNotOnCurve {
        /// The account that published the bad point.
        issuer: Address,
    },

    /// A structural or consistency check failed on data the ledger should
    /// never have accepted.
    #[error("verification failed: {0}")]
    VerificationFailed(String),

    /// Fewer than `t + 1` qualified participants remain; the DKG run is
    /// aborted for everyone.
    #[error("only {available} of the required {required} participants remain")]
    InsufficientQualified {
        /// Participants still usable.
        available: usize,
        /// Minimum participants required to continue.
        required: usize,
    },

    /// Key-share recovery could not gather `t + 1` valid shares for some
    /// qualified participant before the deadline.
    #[error("key-share recovery stalled; still missing {missing:?}")]
    RecoveryStall {
        /// Accounts whose key shares could not be recovered.
        missing: Vec<Address>,
    },
}
