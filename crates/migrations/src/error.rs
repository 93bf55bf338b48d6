//! Error taxonomy of the migration compiler.
//!
//! Every variant here means the migration cannot be safely constructed; there
//! is no partial or best-effort plan. Repository I/O failures are surfaced
//! unchanged through the transparent variant, with no retries at this layer.

use {
    ethereum_types::{H160, H256},
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum MigrationError {
    /// The repository has no pool registered under the requested id.
    #[error("pool {0:?} not found")]
    PoolNotFound(H256),

    /// A gauge-aware migration was requested for a pool that has no gauge.
    #[error("no gauge registered for pool {0:?}")]
    GaugeNotFound(H256),

    /// A resolved pool is missing one of the fields every migration needs
    /// (id, tokens or pool type).
    #[error("pool {0:?} is missing id, tokens or pool type")]
    IncompleteMigrationPool(H160),

    /// A linear wrapper pool is missing the data needed to route through its
    /// main token (main index, tokens or id).
    #[error("linear pool {0:?} is missing main token data")]
    MissingPoolTokenData(H160),

    /// A step could not be turned into call data.
    #[error("failed to encode migration step: {0}")]
    Encoding(anyhow::Error),

    /// Repository I/O failure, surfaced unchanged to the caller.
    #[error(transparent)]
    Repository(#[from] anyhow::Error),
}
