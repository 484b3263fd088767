//! Demo DKG run.
//!
//! Spawns `n` participants against the in-memory ledger, drives the block
//! clock, and prints the master public key every honest participant
//! derived. The on-chain RPC transport is a deployment concern; this
//! binary exercises the full protocol logic end to end.

use std::{process::ExitCode, sync::Arc};

use alloy::primitives::Address;
use clap::Parser as _;
use eyre::Context as _;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use dkg_node::{
    config::DkgNodeConfig,
    driver::{self, DriverConfig},
    ledger::{PhaseSchedule, memory::InMemoryLedger},
    participant::Participant,
    store::{PersistedSecrets, SecretStore},
};
use dkg_types::wire::G2Repr;

#[tokio::main]
async fn main() -> eyre::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let config = DkgNodeConfig::parse();
    tracing::info!("starting demo DKG with config: {config:#?}");
    if config.participants < 4 {
        eyre::bail!("need at least 4 participants for a meaningful threshold");
    }

    let schedule = PhaseSchedule::from_phase_length(
        config.phase_length,
        config.delta_confirm,
        config.delta_include,
    );
    let ledger = Arc::new(InMemoryLedger::new(schedule));
    let cancellation_token = CancellationToken::new();

    tracing::info!("spawning block clock ({:?} per block)", config.block_time);
    let clock = tokio::spawn({
        let ledger = ledger.clone();
        let block_time = config.block_time;
        let cancellation_token = cancellation_token.clone();
        async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(block_time) => ledger.advance_blocks(1),
                    _ = cancellation_token.cancelled() => break,
                }
            }
        }
    });

    tokio::spawn({
        let cancellation_token = cancellation_token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("shutdown signal received");
                cancellation_token.cancel();
            }
        }
    });

    let driver_config = DriverConfig {
        poll_interval: config.poll_interval,
    };
    let mut runs = Vec::with_capacity(config.participants);
    for index in 0..config.participants {
        let mut address_bytes = [0u8; 20];
        address_bytes[18] = 0x10;
        address_bytes[19] = index as u8 + 1;
        let address = Address::from(address_bytes);

        let store = config
            .store_dir
            .as_deref()
            .map(|directory| SecretStore::for_account(directory, address));
        let mut participant = match store.as_ref().and_then(|s| s.load().ok().flatten()) {
            Some(persisted) => {
                tracing::info!(%address, "restoring participant from store");
                Participant::with_secrets(
                    address,
                    dkg_core::curve::u256_to_scalar(persisted.secret_key),
                    dkg_core::curve::u256_to_scalar(persisted.secret),
                )
            }
            None => Participant::new(address, &mut rand::thread_rng()),
        };

        let ledger = ledger.clone();
        let driver_config = driver_config.clone();
        let cancellation_token = cancellation_token.clone();
        runs.push(tokio::spawn(async move {
            let outputs = driver::run_dkg(
                &mut participant,
                ledger.as_ref(),
                &driver_config,
                &cancellation_token,
            )
            .await?;
            if let Some(store) = store {
                store
                    .save(&PersistedSecrets::snapshot(&participant))
                    .context("while persisting participant secrets")?;
            }
            eyre::Ok((address, outputs))
        }));
    }

    let mut master_keys = Vec::with_capacity(runs.len());
    for run in runs {
        let (address, outputs) = run.await.context("participant task panicked")??;
        tracing::info!(
            %address,
            "participant finished; group public key {:?}",
            G2Repr::from(outputs.group_keys.group_public_key)
        );
        master_keys.push(outputs.master_public_key);
    }
    cancellation_token.cancel();
    clock.await.ok();

    let first = master_keys[0];
    if master_keys.iter().any(|key| *key != first) {
        tracing::error!("participants disagree on the master public key");
        return Ok(ExitCode::FAILURE);
    }
    tracing::info!("master public key: {:?}", G2Repr::from(first));
    Ok(ExitCode::SUCCESS)
}
