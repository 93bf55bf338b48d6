//! Collaborator interfaces consumed by the migration compiler.
//!
//! Implementations live elsewhere (the subgraph-backed ones in
//! [`crate::graph_api`]); the compiler only depends on these traits so tests
//! can drive it with mocks.

use {
    anyhow::Result,
    ethereum_types::{H160, H256},
};

/// A pool as reported by the pool repository.
///
/// Fields that the data source may omit are optional here; the sequencer
/// validates that everything a migration needs is actually present before
/// emitting any step.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Pool {
    pub id: H256,
    pub address: H160,
    pub pool_type: Option<String>,
    pub pool_type_version: u32,
    /// Index, within `tokens`, of the single main underlying asset of a
    /// linear wrapper pool.
    pub main_index: Option<usize>,
    pub tokens: Vec<PoolToken>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolToken {
    pub address: H160,
}

/// A staking gauge associated with a pool.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Gauge {
    pub id: H160,
    pub pool_id: H256,
}

#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait PoolRepository: Send + Sync {
    /// Looks up a pool by its id.
    async fn find(&self, id: H256) -> Result<Option<Pool>>;

    /// Looks up the pool whose own share token is the specified address.
    async fn find_by_address(&self, address: H160) -> Result<Option<Pool>>;
}

#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait GaugeRepository: Send + Sync {
    /// Looks up the gauge staking the specified pool's share token.
    async fn find_by_pool_id(&self, pool_id: H256) -> Result<Option<Gauge>>;
}
