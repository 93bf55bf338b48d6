//! Swap-path computation between two resolved token trees.

use {
    crate::{error::MigrationError, graph::MigrationPool},
    ethereum_types::{H160, H256},
};

/// A single swap hop through one pool.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SwapHop {
    pub pool_id: H256,
    pub asset_in: H160,
    pub asset_out: H160,
}

/// Computes the hop lists converting the source pool's exit tokens into the
/// destination pool's join tokens.
///
/// Linear wrappers on both sides are matched by their main underlying asset;
/// each match yields a two-hop path (exit the source wrapper into the main
/// asset, then join the destination wrapper from it). Source tokens without
/// a match, or that are not linear wrappers, pass straight through from exit
/// to join and contribute an empty path.
///
/// When `exit_token_index` is set (single-token exit policy) only the path
/// at that index is returned, as a single-path list; otherwise one path per
/// source token is returned in source-token order.
pub fn build_paths(
    source_tokens: &[MigrationPool],
    destination_tokens: &[MigrationPool],
    exit_token_index: Option<usize>,
) -> Result<Vec<Vec<SwapHop>>, MigrationError> {
    let destinations = destination_tokens
        .iter()
        .filter(|token| token.is_linear())
        .map(|token| Ok((main_asset(token)?, token)))
        .collect::<Result<Vec<_>, MigrationError>>()?;

    let mut paths = Vec::with_capacity(source_tokens.len());
    for token in source_tokens {
        if !token.is_linear() {
            paths.push(Vec::new());
            continue;
        }
        let main = main_asset(token)?;
        let Some((_, target)) = destinations.iter().find(|(asset, _)| *asset == main) else {
            paths.push(Vec::new());
            continue;
        };
        paths.push(vec![
            SwapHop {
                pool_id: pool_id(token)?,
                asset_in: token.address,
                asset_out: main,
            },
            SwapHop {
                pool_id: pool_id(target)?,
                asset_in: main,
                asset_out: target.address,
            },
        ]);
    }

    match exit_token_index {
        Some(index) => Ok(vec![paths.into_iter().nth(index).unwrap_or_default()]),
        None => Ok(paths),
    }
}

/// The designated main underlying asset of a linear wrapper pool.
fn main_asset(pool: &MigrationPool) -> Result<H160, MigrationError> {
    pool.main_index
        .and_then(|index| pool.tokens.get(index))
        .map(|token| token.address)
        .ok_or(MigrationError::MissingPoolTokenData(pool.address))
}

fn pool_id(pool: &MigrationPool) -> Result<H256, MigrationError> {
    pool.id.ok_or(MigrationError::MissingPoolTokenData(pool.address))
}
