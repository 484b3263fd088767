//! File-backed persistence of a participant's correctness-critical state.
//!
//! Losing the long-term secret key after registration makes a participant
//! an unavoidable recovery target, and losing the secret contribution or
//! the received shares makes key derivation impossible. This store writes
//! exactly that material - the two secret scalars, the decrypted shares,
//! and the own published commitments - as JSON so a restarted node can
//! resume with [`Participant::with_secrets`].
//!
//! The file contains secrets in the clear; deployments are expected to
//! place it on an encrypted volume or swap this store for a secret
//! manager.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use alloy::primitives::{Address, U256};
use eyre::Context as _;
use serde::{Deserialize, Serialize};

use dkg_core::curve::scalar_to_u256;
use dkg_types::{ParticipantId, wire::G1Repr};

use crate::participant::Participant;

/// The persisted material of one participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSecrets {
    /// The participant's ledger account.
    pub address: Address,
    /// Long-term encryption secret key.
    pub secret_key: U256,
    /// The secret contribution to the master key.
    pub secret: U256,
    /// Shares received from other participants, by issuer id.
    pub decrypted_shares: BTreeMap<ParticipantId, U256>,
    /// The participant's own published commitments.
    pub commitments: Vec<G1Repr>,
}

impl PersistedSecrets {
    /// Snapshots the persistable state of a participant.
    pub fn snapshot(participant: &Participant) -> Self {
        Self {
            address: participant.address(),
            secret_key: scalar_to_u256(participant.secret_key()),
            secret: scalar_to_u256(participant.secret()),
            decrypted_shares: participant
                .valid_decrypted_shares()
                .into_iter()
                .map(|(issuer, share)| (issuer, scalar_to_u256(share)))
                .collect(),
            commitments: participant
                .own_commitments()
                .unwrap_or_default()
                .iter()
                .map(|&commitment| commitment.into())
                .collect(),
        }
    }
}

/// A JSON file store for [`PersistedSecrets`].
pub struct SecretStore {
    path: PathBuf,
}

impl SecretStore {
    /// Creates a store at `path`; nothing is written until [`Self::save`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The conventional store path for an account inside a directory.
    pub fn for_account(directory: &Path, address: Address) -> Self {
        Self::new(directory.join(format!("participant-{address}.json")))
    }

    /// Loads the persisted state, or `None` if the store does not exist
    /// yet.
    pub fn load(&self) -> eyre::Result<Option<PersistedSecrets>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("while reading {}", self.path.display()))?;
        let secrets = serde_json::from_str(&data)
            .with_context(|| format!("while decoding {}", self.path.display()))?;
        Ok(Some(secrets))
    }

    /// Writes the persisted state, replacing any previous content.
    pub fn save(&self, secrets: &PersistedSecrets) -> eyre::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("while creating {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(secrets)?;
        fs::write(&self.path, data)
            .with_context(|| format!("while writing {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dkg_core::curve::u256_to_scalar;
    use rand::SeedableRng as _;
    use rand_chacha::ChaCha12Rng;

    #[test]
    fn snapshot_round_trips_through_file() {
        let mut rng = ChaCha12Rng::seed_from_u64(55);
        let address = Address::from([9u8; 20]);
        let participant = Participant::new(address, &mut rng);
        let snapshot = PersistedSecrets::snapshot(&participant);

        let directory = std::env::temp_dir().join(format!(
            "dkg-store-test-{}",
            std::process::id()
        ));
        let store = SecretStore::for_account(&directory, address);
        store.save(&snapshot).unwrap();
        let loaded = store.load().unwrap().expect("store exists");
        fs::remove_dir_all(&directory).ok();

        assert_eq!(loaded.address, address);
        assert_eq!(loaded.secret_key, snapshot.secret_key);
        assert_eq!(loaded.secret, snapshot.secret);

        // A participant restored from the snapshot derives the same
        // public key.
        let restored = Participant::with_secrets(
            loaded.address,
            u256_to_scalar(loaded.secret_key),
            u256_to_scalar(loaded.secret),
        );
        assert_eq!(restored.public_key(), participant.public_key());
    }

    #[test]
    fn missing_store_loads_as_none() {
        let store = SecretStore::new("/nonexistent/dkg-secrets.json");
        assert!(store.load().unwrap().is_none());
    }
}
