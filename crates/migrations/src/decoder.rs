//! Extraction of the final pool-share amount from an executed multicall.
//!
//! The relayer returns one result blob per step, in step order. Steps that
//! intentionally produce no return value (approvals, for instance) appear as
//! empty blobs and are dropped before reading the trailing value. When a
//! gauge deposit is present it is always the terminal step, so preferring
//! the very last value-bearing blob yields the post-deposit amount; without
//! one it is the join's direct output (or the peek of it).

use {
    crate::relayer,
    anyhow::{Context, Result, bail},
    ethabi::{ParamType, Token},
    ethereum_types::U256,
};

/// Decodes the BPT amount received by a migration from the raw return data
/// of its (static or executed) multicall.
pub fn decode_output(data: &[u8]) -> Result<U256> {
    let blob = relayer::decode_multicall_results(data)?
        .into_iter()
        .filter(|blob| !blob.is_empty())
        .next_back()
        .context("multicall produced no value-bearing result")?;
    let tokens = ethabi::decode(&[ParamType::Uint(256)], &blob)
        .context("multicall result is not an amount")?;
    match tokens.into_iter().next() {
        Some(Token::Uint(amount)) => Ok(amount),
        _ => bail!("multicall result is not an amount"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn multicall_return(blobs: Vec<Vec<u8>>) -> Vec<u8> {
        ethabi::encode(&[Token::Array(
            blobs.into_iter().map(Token::Bytes).collect(),
        )])
    }

    fn amount(value: u64) -> Vec<u8> {
        ethabi::encode(&[Token::Uint(U256::from(value))])
    }

    #[test]
    fn takes_join_output_without_gauges() {
        // approval and exit produce nothing, the peek surfaces the join
        // output as the only value-bearing blob.
        let data = multicall_return(vec![vec![], vec![], amount(1337)]);
        assert_eq!(decode_output(&data).unwrap(), U256::from(1337));
    }

    #[test]
    fn prefers_trailing_deposit_output() {
        // With a destination gauge the deposit is the terminal step; its
        // effective output wins over the join's.
        let data = multicall_return(vec![vec![], amount(1337), amount(42)]);
        assert_eq!(decode_output(&data).unwrap(), U256::from(42));
    }

    #[test]
    fn interleaved_empty_blobs_are_skipped() {
        let data = multicall_return(vec![vec![], amount(7), vec![], vec![]]);
        assert_eq!(decode_output(&data).unwrap(), U256::from(7));
    }

    #[test]
    fn all_empty_is_an_error() {
        let data = multicall_return(vec![vec![], vec![]]);
        assert!(decode_output(&data).is_err());
    }

    #[test]
    fn malformed_return_data_is_an_error() {
        assert!(decode_output(&[0xde, 0xad]).is_err());
    }
}
