//! The async phase driver.
//!
//! Sequences one participant through the protocol against a [`Ledger`]:
//! registration, setup, share distribution, share loading, dispute
//! submission and verification, key-share submission and loading, the
//! recovery loop, and finally key derivation. The driver owns all waiting -
//! block-height polls on a configurable interval, honoring a cancellation
//! token - while every cryptographic decision stays inside the
//! [`Participant`].
//!
//! Deadlines are block numbers, not wall-clock: a participant that misses a
//! window skips that submission ([`DkgError::LatePhase`]) and carries on
//! with whatever inputs it has; a ledger rejection is terminal for the
//! affected phase.

use std::time::Duration;

use eyre::Context as _;
use tokio_util::sync::CancellationToken;

use dkg_core::curve::G2;

use crate::{
    error::DkgError,
    ledger::{Ledger, PhaseSchedule},
    participant::{GroupKeys, Participant},
};
use dkg_types::chain::{LedgerEvent, MasterPublicKeySubmission, OrderedEvent};

/// Driver tuning; the protocol semantics live elsewhere.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// How often to poll the ledger for block height and new events.
    pub poll_interval: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// The outputs of a completed DKG run for one participant.
pub struct DkgOutputs {
    /// The master public key, identical across all honest participants.
    pub master_public_key: G2,
    /// This participant's individual group keys.
    pub group_keys: GroupKeys,
}

/// Runs the full protocol for `participant` against `ledger`.
///
/// Returns the derived keys, or the error that ended the run. Transport
/// errors bubble up as `eyre` reports; protocol-level failures carry a
/// [`DkgError`] in their chain.
pub async fn run_dkg<L: Ledger>(
    participant: &mut Participant,
    ledger: &L,
    config: &DriverConfig,
    cancellation_token: &CancellationToken,
) -> eyre::Result<DkgOutputs> {
    let schedule = ledger.schedule().await.context("while reading schedule")?;
    tracing::info!(address = %participant.address(), "starting DKG run");

    registration(participant, ledger, &schedule).await?;
    wait_for_block(
        ledger,
        schedule.registration_end + schedule.delta_confirm,
        config,
        cancellation_token,
    )
    .await?;
    setup(participant, ledger).await?;

    share_distribution(participant, ledger, &schedule).await?;
    wait_for_block(
        ledger,
        schedule.share_distribution_end + schedule.delta_confirm,
        config,
        cancellation_token,
    )
    .await?;
    load_shares(participant, ledger).await?;

    submit_disputes(participant, ledger, &schedule).await?;
    wait_for_block(
        ledger,
        schedule.dispute_end + schedule.delta_confirm,
        config,
        cancellation_token,
    )
    .await?;
    load_disputes(participant, ledger).await?;

    submit_key_share(participant, ledger).await?;
    wait_for_block(
        ledger,
        schedule.key_share_submission_end + schedule.delta_confirm,
        config,
        cancellation_token,
    )
    .await?;
    load_key_shares(participant, ledger).await?;

    recover_missing_key_shares(participant, ledger, &schedule, config, cancellation_token)
        .await?;

    derive_keys(participant, ledger).await
}

async fn registration<L: Ledger>(
    participant: &mut Participant,
    ledger: &L,
    schedule: &PhaseSchedule,
) -> eyre::Result<()> {
    tracing::info!("registration phase");
    let current = ledger.block_number().await?;
    if current > schedule.registration_end {
        return Err(DkgError::LatePhase {
            phase: "registration",
            deadline: schedule.registration_end,
            current,
        }
        .into());
    }
    let submission = participant.registration(&mut rand::thread_rng());
    ledger
        .register(participant.address(), submission)
        .await
        .map_err(reject)?;
    tracing::info!("registered");
    Ok(())
}

async fn setup<L: Ledger>(participant: &mut Participant, ledger: &L) -> eyre::Result<()> {
    let registrations = ledger
        .registrations()
        .await
        .context("while loading registrations")?;
    participant.setup(&registrations)?;
    tracing::info!(
        n = participant.n(),
        t = participant.t(),
        "setup complete"
    );
    Ok(())
}

async fn share_distribution<L: Ledger>(
    participant: &mut Participant,
    ledger: &L,
    schedule: &PhaseSchedule,
) -> eyre::Result<()> {
    tracing::info!("share distribution phase");
    let current = ledger.block_number().await?;
    if current > schedule.share_distribution_end {
        return Err(DkgError::LatePhase {
            phase: "share distribution",
            deadline: schedule.share_distribution_end,
            current,
        }
        .into());
    }
    let submission = participant.share_distribution(&mut rand::thread_rng());
    ledger
        .distribute_shares(participant.address(), submission)
        .await
        .map_err(reject)?;
    tracing::info!("shares distributed");
    Ok(())
}

async fn load_shares<L: Ledger>(participant: &mut Participant, ledger: &L) -> eyre::Result<()> {
    let events = ledger.events_since(0).await?;
    let mut ok = 0usize;
    let mut invalid = 0usize;
    for OrderedEvent { event, .. } in events {
        let LedgerEvent::ShareDistribution {
            issuer,
            encrypted_shares,
            commitments,
        } = event
        else {
            continue;
        };
        if issuer == participant.address() {
            continue;
        }
        if participant.load_share_distribution(issuer, &encrypted_shares, &commitments)? {
            ok += 1;
        } else {
            invalid += 1;
        }
    }
    let missing = participant.n().saturating_sub(1 + ok + invalid);
    if invalid > 0 {
        tracing::error!(ok, missing, invalid, "shares received");
    } else if missing > 0 {
        tracing::warn!(ok, missing, invalid, "shares received");
    } else {
        tracing::info!(ok, missing, invalid, "shares received");
    }
    participant.finish_share_loading()?;
    Ok(())
}

async fn submit_disputes<L: Ledger>(
    participant: &mut Participant,
    ledger: &L,
    schedule: &PhaseSchedule,
) -> eyre::Result<()> {
    let disputes = participant.dispute_submissions(&mut rand::thread_rng());
    if disputes.is_empty() {
        tracing::info!("no disputes to submit");
        return Ok(());
    }
    let current = ledger.block_number().await?;
    if current > schedule.dispute_end {
        return Err(DkgError::LatePhase {
            phase: "dispute",
            deadline: schedule.dispute_end,
            current,
        }
        .into());
    }
    tracing::info!(count = disputes.len(), "submitting disputes");
    for dispute in disputes {
        let issuer = dispute.issuer;
        ledger
            .submit_dispute(participant.address(), dispute)
            .await
            .map_err(reject)
            .with_context(|| format!("while disputing {issuer}"))?;
    }
    Ok(())
}

async fn load_disputes<L: Ledger>(participant: &mut Participant, ledger: &L) -> eyre::Result<()> {
    let events = ledger.events_since(0).await?;
    for OrderedEvent { event, .. } in events {
        let LedgerEvent::Dispute {
            issuer,
            disputer,
            shared_key,
            proof,
        } = event
        else {
            continue;
        };
        if participant.load_dispute(issuer, disputer, shared_key, &proof)? {
            tracing::info!(%issuer, %disputer, "dispute verified, issuer disqualified");
        } else {
            // The ledger accepted it but we cannot verify it; with both
            // sides running the same predicates this means divergence.
            tracing::warn!(%issuer, %disputer, "discarding dispute that does not verify");
        }
    }
    let qualified = participant.compute_qualified()?.len();
    tracing::info!(qualified, n = participant.n(), "qualified set fixed");
    Ok(())
}

async fn submit_key_share<L: Ledger>(
    participant: &mut Participant,
    ledger: &L,
) -> eyre::Result<()> {
    tracing::info!("key share submission phase");
    let submission = participant.key_share_submission(&mut rand::thread_rng())?;
    ledger
        .submit_key_share(participant.address(), submission)
        .await
        .map_err(reject)?;
    tracing::info!("key share submitted");
    Ok(())
}

async fn load_key_shares<L: Ledger>(
    participant: &mut Participant,
    ledger: &L,
) -> eyre::Result<()> {
    let events = ledger.events_since(0).await?;
    for OrderedEvent { event, .. } in events {
        let LedgerEvent::KeyShareSubmission {
            issuer,
            key_share_g1,
            proof,
            key_share_g2,
        } = event
        else {
            continue;
        };
        if issuer == participant.address() {
            continue;
        }
        if !participant.load_key_share(issuer, key_share_g1, &proof, key_share_g2)? {
            // The ledger verified this submission already; disagreeing
            // with it is fatal for the run.
            return Err(DkgError::VerificationFailed(format!(
                "key share from {issuer} was accepted by the ledger but fails locally"
            ))
            .into());
        }
    }
    participant.finish_key_share_loading();
    Ok(())
}

/// The recovery loop: reveal pairwise keys for absent qualified
/// participants, bank incoming recovery shares, reconstruct once `t + 1`
/// are available, and republish the reconstructed key shares. Bounded by
/// the schedule's recovery deadline.
async fn recover_missing_key_shares<L: Ledger>(
    participant: &mut Participant,
    ledger: &L,
    schedule: &PhaseSchedule,
    config: &DriverConfig,
    cancellation_token: &CancellationToken,
) -> eyre::Result<()> {
    let missing = participant.missing_key_shares();
    if missing.is_empty() {
        tracing::info!("no key shares to recover");
        return Ok(());
    }
    tracing::info!(count = missing.len(), "initiating key share recovery");
    let recovery_submission = participant.recovery_submission(&mut rand::thread_rng());
    if let Some(submission) = recovery_submission {
        ledger
            .recover_key_shares(participant.address(), submission)
            .await
            .map_err(reject)?;
    }

    let mut cursor = 0u64;
    loop {
        let events = ledger.events_since(cursor).await?;
        for OrderedEvent { block, event } in events {
            cursor = cursor.max(block);
            let LedgerEvent::KeyShareRecovery {
                recoverer,
                recovered,
                shared_keys,
                proofs,
            } = event
            else {
                continue;
            };
            for ((recovered, shared_key), proof) in
                recovered.iter().zip(shared_keys).zip(proofs)
            {
                if participant.load_recovery_share(*recovered, recoverer, shared_key, &proof)? {
                    participant.try_recover_key_share(
                        dkg_types::ParticipantId::from_address(*recovered),
                    );
                } else {
                    tracing::warn!(%recoverer, "invalid recovery share received");
                }
            }
        }

        let recovered_submissions =
            participant.recovered_key_share_submissions(&mut rand::thread_rng());
        for submission in recovered_submissions {
            // Only the first submission per recovered participant takes
            // effect; racing with other recoverers is expected.
            ledger
                .submit_key_share(participant.address(), submission)
                .await
                .map_err(reject)?;
        }

        if participant.missing_key_shares().is_empty() {
            tracing::info!("all key shares recovered");
            return Ok(());
        }
        let current = ledger.block_number().await?;
        if current > schedule.recovery_end() {
            return Err(DkgError::RecoveryStall {
                missing: participant.missing_key_share_addresses(),
            }
            .into());
        }
        sleep_or_cancel(config.poll_interval, cancellation_token).await?;
    }
}

async fn derive_keys<L: Ledger>(
    participant: &mut Participant,
    ledger: &L,
) -> eyre::Result<DkgOutputs> {
    let master_public_key = participant.derive_master_public_key()?;
    // A peer may have published the key already (first submission wins),
    // and this node's view may simply be too late; neither ends the run.
    if let Err(err) = ledger
        .submit_master_public_key(
            participant.address(),
            MasterPublicKeySubmission {
                master_public_key: master_public_key.into(),
            },
        )
        .await
    {
        tracing::warn!("master public key submission rejected: {err}");
    }
    let group_keys = participant
        .derive_group_keys(&mut rand::thread_rng())?
        .clone();
    tracing::info!("DKG protocol completed");
    Ok(DkgOutputs {
        master_public_key,
        group_keys,
    })
}

async fn wait_for_block<L: Ledger>(
    ledger: &L,
    target: u64,
    config: &DriverConfig,
    cancellation_token: &CancellationToken,
) -> eyre::Result<()> {
    let mut last_seen = None;
    loop {
        let current = ledger.block_number().await?;
        if current >= target {
            return Ok(());
        }
        if last_seen != Some(current) {
            tracing::debug!(current, target, "waiting for target block");
            last_seen = Some(current);
        }
        sleep_or_cancel(config.poll_interval, cancellation_token).await?;
    }
}

async fn sleep_or_cancel(
    interval: Duration,
    cancellation_token: &CancellationToken,
) -> eyre::Result<()> {
    tokio::select! {
        _ = tokio::time::sleep(interval) => Ok(()),
        _ = cancellation_token.cancelled() => Err(eyre::eyre!("DKG run cancelled")),
    }
}

/// Maps a ledger rejection into the protocol error; transport failures
/// stay as reports.
fn reject(error: crate::ledger::LedgerError) -> eyre::Report {
    match error {
        crate::ledger::LedgerError::Reverted(reason) => {
            DkgError::LedgerRejected { reason }.into()
        }
        crate::ledger::LedgerError::Transport(report) => report,
    }
}
