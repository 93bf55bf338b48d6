//! A general client for querying subgraphs.

use {
    anyhow::{Context, Result, bail},
    reqwest::{Client, Url},
    serde::{Deserialize, Serialize, de::DeserializeOwned},
    serde_json::{Map, Value},
    thiserror::Error,
};

/// A macro for instantiating GraphQL query variables.
#[macro_export]
macro_rules! json_map {
    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut map = serde_json::Map::new();
        $(
            map.insert(($key).into(), serde_json::json!($value));
        )*
        map
    }};
}

/// A client for issuing GraphQL queries against one subgraph endpoint.
pub struct SubgraphClient {
    client: Client,
    subgraph_url: Url,
}

impl SubgraphClient {
    /// Creates a new subgraph client for the specified endpoint.
    pub fn new(subgraph_url: Url, client: Client) -> Self {
        Self {
            client,
            subgraph_url,
        }
    }

    /// Performs the specified GraphQL query on the current subgraph.
    pub async fn query<T>(&self, query: &str, variables: Option<Map<String, Value>>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.client
            .post(self.subgraph_url.clone())
            .json(&Query { query, variables })
            .send()
            .await?
            .error_for_status()?
            .json::<QueryResponse<T>>()
            .await?
            .into_result()
    }
}

/// A GraphQL query.
#[derive(Serialize)]
struct Query<'a> {
    query: &'a str,
    variables: Option<Map<String, Value>>,
}

/// A GraphQL query response.
///
/// This type gets converted into a Rust `Result`, while handling invalid
/// responses (with missing data and errors).
#[derive(Debug, Deserialize)]
struct QueryResponse<T> {
    #[serde(default = "empty_data")]
    data: Option<T>,
    #[serde(default)]
    errors: Option<Vec<QueryError>>,
}

impl<T> QueryResponse<T> {
    fn into_result(self) -> Result<T> {
        if let Some(errors) = self.errors.filter(|errors| !errors.is_empty()) {
            if self.data.is_some() {
                bail!("GraphQL response carries both data and errors");
            }
            // Bubble up the first error; the rest only get logged.
            for error in &errors[1..] {
                tracing::warn!("additional GraphQL error: {}", error.message);
            }
            bail!("{}", errors[0]);
        }
        self.data.context("GraphQL response carries no data")
    }
}

#[derive(Debug, Deserialize, Error)]
#[error("{}", .message)]
struct QueryError {
    message: String,
}

/// Works around the fact that `#[serde(default)]` on an `Option<T>` requires
/// `T: Default`.
fn empty_data<T>() -> Option<T> {
    None
}
