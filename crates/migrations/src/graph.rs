//! Recursive resolution of a pool's nested token structure.
//!
//! Pools can be composed of other pools (a composable stable pool wrapping
//! linear pools wrapping a yield-bearing asset, for instance), so a pool's
//! flat token list is expanded into a tree before any migration plan is
//! built. Sibling subtrees are resolved concurrently; total latency is
//! bounded by tree depth rather than tree size.

use {
    crate::{
        error::MigrationError,
        repository::{Pool, PoolRepository},
    },
    ethereum_types::{H160, H256},
    futures::{
        FutureExt,
        future::{BoxFuture, try_join_all},
    },
    std::sync::Arc,
};

/// A resolved, ordered view of a pool's composition.
///
/// `tokens` is always sorted ascending by token address, which is the order
/// the vault expects. Tokens that are themselves pools carry their own
/// (again sorted, possibly further nested) token list; leaf tokens carry
/// only their address.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MigrationPool {
    pub address: H160,
    pub id: Option<H256>,
    pub pool_type: Option<String>,
    pub pool_type_version: u32,
    pub main_index: Option<usize>,
    pub tokens: Vec<MigrationPool>,
}

impl MigrationPool {
    /// A plain token that is not itself a pool.
    pub fn leaf(address: H160) -> Self {
        Self {
            address,
            ..Default::default()
        }
    }

    /// Whether this node is a linear wrapper pool. Linear pools come in
    /// several flavours (Aave, ERC4626, ...) that all carry "Linear" in
    /// their pool type name.
    pub fn is_linear(&self) -> bool {
        self.pool_type
            .as_deref()
            .is_some_and(|kind| kind.contains("Linear"))
    }

    pub fn is_composable_stable(&self) -> bool {
        self.pool_type
            .as_deref()
            .is_some_and(|kind| kind.contains("ComposableStable"))
    }
}

/// Materializes [`MigrationPool`] trees from the pool repository.
pub struct PoolGraphResolver {
    pools: Arc<dyn PoolRepository>,
}

impl PoolGraphResolver {
    pub fn new(pools: Arc<dyn PoolRepository>) -> Self {
        Self { pools }
    }

    /// Resolves the pool with the specified id into its nested token tree.
    pub async fn resolve(&self, pool_id: H256) -> Result<MigrationPool, MigrationError> {
        let pool = self
            .pools
            .find(pool_id)
            .await?
            .ok_or(MigrationError::PoolNotFound(pool_id))?;
        self.expand(pool).await
    }

    /// Expands a fetched pool into a tree node, recursing into every token
    /// that is itself a pool. Sibling subtrees resolve concurrently and are
    /// joined back in the parent's sorted token order.
    fn expand(&self, pool: Pool) -> BoxFuture<'_, Result<MigrationPool, MigrationError>> {
        async move {
            let mut addresses = pool
                .tokens
                .iter()
                .map(|token| token.address)
                .collect::<Vec<_>>();
            addresses.sort();

            let tokens = try_join_all(
                addresses
                    .into_iter()
                    .map(|token| self.resolve_token(token, pool.address)),
            )
            .await?;

            Ok(MigrationPool {
                address: pool.address,
                id: Some(pool.id),
                pool_type: pool.pool_type,
                pool_type_version: pool.pool_type_version,
                main_index: pool.main_index,
                tokens,
            })
        }
        .boxed()
    }

    /// Resolves a single token, nesting into the pool registered under the
    /// token's address unless that pool is the token's own parent. A pool's
    /// share token may appear in its own token list and must not be expanded
    /// again.
    fn resolve_token(
        &self,
        token: H160,
        parent: H160,
    ) -> BoxFuture<'_, Result<MigrationPool, MigrationError>> {
        async move {
            if token == parent {
                return Ok(MigrationPool::leaf(token));
            }
            match self.pools.find_by_address(token).await? {
                Some(pool) if pool.address != parent => self.expand(pool).await,
                _ => Ok(MigrationPool::leaf(token)),
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::repository::{MockPoolRepository, PoolToken},
    };

    fn pool_id(byte: u8) -> H256 {
        H256([byte; 32])
    }

    fn tokens(addresses: &[H160]) -> Vec<PoolToken> {
        addresses
            .iter()
            .map(|&address| PoolToken { address })
            .collect()
    }

    /// A composable stable pool wrapping three linear pools, each of which
    /// wraps a main asset, a wrapped asset and its own share token.
    fn nested_fixture() -> MockPoolRepository {
        let composable = H160([0x70; 20]);
        let linears = [H160([0x10; 20]), H160([0x20; 20]), H160([0x30; 20])];

        let mut pools = MockPoolRepository::new();
        pools.expect_find().returning(move |id| {
            Ok((id == pool_id(0x70)).then(|| Pool {
                id: pool_id(0x70),
                address: composable,
                pool_type: Some("ComposableStable".to_string()),
                pool_type_version: 1,
                main_index: None,
                tokens: tokens(&[linears[2], composable, linears[0], linears[1]]),
            }))
        });
        pools.expect_find_by_address().returning(move |address| {
            let Some(index) = linears.iter().position(|&linear| linear == address) else {
                return Ok(None);
            };
            let nibble = (index as u8 + 1) * 0x10;
            Ok(Some(Pool {
                id: pool_id(nibble),
                address,
                pool_type: Some("AaveLinear".to_string()),
                pool_type_version: 1,
                main_index: Some(1),
                // main asset, wrapped asset and the pool's own share token
                tokens: tokens(&[
                    H160([nibble + 2; 20]),
                    H160([nibble + 1; 20]),
                    address,
                ]),
            }))
        });
        pools
    }

    fn assert_sorted(pool: &MigrationPool) {
        for pair in pool.tokens.windows(2) {
            assert!(pair[0].address < pair[1].address);
        }
        for token in &pool.tokens {
            assert_sorted(token);
        }
    }

    #[tokio::test]
    async fn resolves_nested_pool_composition() {
        let resolver = PoolGraphResolver::new(Arc::new(nested_fixture()));
        let pool = resolver.resolve(pool_id(0x70)).await.unwrap();

        // Three linear wrappers plus the pool's own share token.
        assert_eq!(pool.tokens.len(), 4);
        assert_sorted(&pool);

        // The third token (0x30 sorts after 0x10 and 0x20) is the last
        // linear wrapper; its subtree holds the main asset, the wrapped
        // asset and the wrapper's own share token.
        let linear = &pool.tokens[2];
        assert_eq!(linear.address, H160([0x30; 20]));
        assert_eq!(linear.tokens.len(), 3);
        let main = linear.main_index.unwrap();
        assert_eq!(linear.tokens[main].address, H160([0x31; 20]));

        // The composable pool's own token is a leaf and was not expanded.
        let own = pool
            .tokens
            .iter()
            .find(|token| token.address == pool.address)
            .unwrap();
        assert!(own.tokens.is_empty());
        assert!(own.id.is_none());
    }

    #[tokio::test]
    async fn self_reference_terminates() {
        let address = H160([0x42; 20]);
        let mut pools = MockPoolRepository::new();
        pools.expect_find().returning(move |_| {
            Ok(Some(Pool {
                id: pool_id(0x42),
                address,
                pool_type: Some("ComposableStable".to_string()),
                pool_type_version: 2,
                main_index: None,
                tokens: tokens(&[address, H160([0x01; 20])]),
            }))
        });
        // Answer the self-referential address too; the resolver must not
        // even consider expanding it into its parent again.
        pools.expect_find_by_address().returning(move |queried| {
            Ok((queried == address).then(|| Pool {
                id: pool_id(0x42),
                address,
                pool_type: Some("ComposableStable".to_string()),
                pool_type_version: 2,
                main_index: None,
                tokens: tokens(&[address]),
            }))
        });

        let resolver = PoolGraphResolver::new(Arc::new(pools));
        let pool = resolver.resolve(pool_id(0x42)).await.unwrap();

        assert_eq!(pool.tokens.len(), 2);
        let own = pool
            .tokens
            .iter()
            .find(|token| token.address == address)
            .unwrap();
        assert!(own.tokens.is_empty());
    }

    #[tokio::test]
    async fn missing_pool_fails() {
        let mut pools = MockPoolRepository::new();
        pools.expect_find().returning(|_| Ok(None));

        let resolver = PoolGraphResolver::new(Arc::new(pools));
        let result = resolver.resolve(pool_id(0x99)).await;

        assert!(matches!(result, Err(MigrationError::PoolNotFound(_))));
    }

    #[tokio::test]
    async fn sorts_unordered_token_lists() {
        let address = H160([0xaa; 20]);
        let mut pools = MockPoolRepository::new();
        pools.expect_find().returning(move |_| {
            Ok(Some(Pool {
                id: pool_id(0xaa),
                address,
                pool_type: Some("MetaStable".to_string()),
                pool_type_version: 1,
                main_index: None,
                tokens: tokens(&[H160([0x03; 20]), H160([0x01; 20]), H160([0x02; 20])]),
            }))
        });
        pools.expect_find_by_address().returning(|_| Ok(None));

        let resolver = PoolGraphResolver::new(Arc::new(pools));
        let pool = resolver.resolve(pool_id(0xaa)).await.unwrap();

        assert_eq!(
            pool.tokens
                .iter()
                .map(|token| token.address)
                .collect::<Vec<_>>(),
            vec![H160([0x01; 20]), H160([0x02; 20]), H160([0x03; 20])],
        );
    }
}
