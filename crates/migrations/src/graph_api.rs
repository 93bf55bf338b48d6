//! Subgraph-backed implementations of the pool and gauge repositories.
//!
//! Pool composition comes from the Balancer pools subgraph and gauge
//! membership from the gauges subgraph. Both repositories are thin lookup
//! wrappers: pagination and caching are deliberately absent since one
//! migration only touches a handful of pools.

use {
    crate::{
        json_map,
        repository::{Gauge, GaugeRepository, Pool, PoolRepository, PoolToken},
        subgraph::SubgraphClient,
    },
    anyhow::Result,
    ethereum_types::{H160, H256},
    reqwest::{Client, Url},
    serde::Deserialize,
};

/// Pool lookups against the Balancer pools subgraph.
pub struct SubgraphPoolRepository {
    client: SubgraphClient,
}

impl SubgraphPoolRepository {
    pub fn new(subgraph_url: Url, client: Client) -> Self {
        Self {
            client: SubgraphClient::new(subgraph_url, client),
        }
    }
}

#[async_trait::async_trait]
impl PoolRepository for SubgraphPoolRepository {
    async fn find(&self, id: H256) -> Result<Option<Pool>> {
        let data = self
            .client
            .query::<pool_query::Data>(
                pool_query::QUERY,
                Some(json_map! { "id" => format!("{id:?}") }),
            )
            .await?;
        Ok(data.pool.map(Into::into))
    }

    async fn find_by_address(&self, address: H160) -> Result<Option<Pool>> {
        let data = self
            .client
            .query::<pools_query::Data>(
                pools_query::QUERY,
                Some(json_map! { "address" => format!("{address:?}") }),
            )
            .await?;
        Ok(data.pools.into_iter().next().map(Into::into))
    }
}

/// Gauge lookups against the Balancer gauges subgraph.
pub struct SubgraphGaugeRepository {
    client: SubgraphClient,
}

impl SubgraphGaugeRepository {
    pub fn new(subgraph_url: Url, client: Client) -> Self {
        Self {
            client: SubgraphClient::new(subgraph_url, client),
        }
    }
}

#[async_trait::async_trait]
impl GaugeRepository for SubgraphGaugeRepository {
    async fn find_by_pool_id(&self, pool_id: H256) -> Result<Option<Gauge>> {
        let data = self
            .client
            .query::<gauges_query::Data>(
                gauges_query::QUERY,
                Some(json_map! { "poolId" => format!("{pool_id:?}") }),
            )
            .await?;
        Ok(data
            .liquidity_gauges
            .into_iter()
            .next()
            .map(|gauge| Gauge {
                id: gauge.id,
                pool_id,
            }))
    }
}

/// Pool data from the Balancer pools subgraph.
#[derive(Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoolData {
    pub id: H256,
    pub address: H160,
    #[serde(default)]
    pub pool_type: Option<String>,
    #[serde(default)]
    pub pool_type_version: Option<u32>,
    #[serde(default)]
    pub main_index: Option<usize>,
    #[serde(default)]
    pub tokens: Vec<TokenData>,
}

/// Token data for pools.
#[derive(Debug, Deserialize, Eq, PartialEq)]
pub struct TokenData {
    pub address: H160,
}

impl From<PoolData> for Pool {
    fn from(pool: PoolData) -> Self {
        Self {
            id: pool.id,
            address: pool.address,
            pool_type: pool.pool_type,
            pool_type_version: pool.pool_type_version.unwrap_or(1),
            main_index: pool.main_index,
            tokens: pool
                .tokens
                .into_iter()
                .map(|token| PoolToken {
                    address: token.address,
                })
                .collect(),
        }
    }
}

mod pool_query {
    use {super::PoolData, serde::Deserialize};

    pub const QUERY: &str = r#"
        query pool($id: ID!) {
            pool(id: $id) {
                id
                address
                poolType
                poolTypeVersion
                mainIndex
                tokens {
                    address
                }
            }
        }
    "#;

    #[derive(Debug, Deserialize)]
    pub struct Data {
        pub pool: Option<PoolData>,
    }
}

mod pools_query {
    use {super::PoolData, serde::Deserialize};

    pub const QUERY: &str = r#"
        query pools($address: Bytes!) {
            pools(where: { address: $address }) {
                id
                address
                poolType
                poolTypeVersion
                mainIndex
                tokens {
                    address
                }
            }
        }
    "#;

    #[derive(Debug, Deserialize)]
    pub struct Data {
        pub pools: Vec<PoolData>,
    }
}

mod gauges_query {
    use {super::GaugeData, serde::Deserialize};

    pub const QUERY: &str = r#"
        query liquidityGauges($poolId: Bytes!) {
            liquidityGauges(where: { poolId: $poolId }) {
                id
            }
        }
    "#;

    #[derive(Debug, Deserialize)]
    pub struct Data {
        #[serde(rename = "liquidityGauges")]
        pub liquidity_gauges: Vec<GaugeData>,
    }
}

/// Gauge data from the Balancer gauges subgraph.
#[derive(Debug, Deserialize, Eq, PartialEq)]
pub struct GaugeData {
    pub id: H160,
}
