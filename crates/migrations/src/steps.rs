//! The abstract migration steps and the action-encoder boundary.

use {
    crate::{
        paths::SwapHop,
        relayer::{Amount, ChainedReference, OutputReference},
    },
    anyhow::Result,
    ethereum_types::{H160, H256, U256},
};

/// One swap path: consecutive hops spending one input amount, with the final
/// output captured into a chained-reference slot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SwapPath {
    pub hops: Vec<SwapHop>,
    pub amount_in: Amount,
    pub output: OutputReference,
}

/// An abstract step of the migration call.
///
/// Steps are ordered; any [`Amount::Reference`] input refers to the output
/// of an earlier step in the same list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MigrationStep {
    /// Grants the relayer the right to act on the user's behalf through an
    /// off-chain signed authorization. Always the first step when present.
    Approval {
        user: H160,
        relayer: H160,
        authorisation: Vec<u8>,
    },
    /// Unstakes pool shares from a gauge.
    GaugeWithdraw {
        gauge: H160,
        sender: H160,
        recipient: H160,
        amount: Amount,
    },
    /// Burns pool shares for the pool's tokens.
    Exit {
        pool_id: H256,
        pool_type: String,
        pool_type_version: u32,
        sender: H160,
        recipient: H160,
        bpt_amount_in: Amount,
        tokens: Vec<H160>,
        /// Exit through this single token; `None` exits proportionally
        /// across every token.
        exit_token_index: Option<usize>,
        outputs: Vec<OutputReference>,
    },
    /// Converts exit tokens into the destination pool's join tokens.
    Swap {
        sender: H160,
        recipient: H160,
        paths: Vec<SwapPath>,
    },
    /// Provides tokens to the destination pool for its shares.
    Join {
        pool_id: H256,
        pool_type: String,
        pool_type_version: u32,
        sender: H160,
        recipient: H160,
        tokens: Vec<H160>,
        amounts_in: Vec<Amount>,
        /// Slippage limit: the join reverts if it would mint fewer shares.
        /// Unset in discovery mode, where the caller peeks the output first.
        min_bpt_out: Option<U256>,
        output: OutputReference,
    },
    /// Surfaces a chained-reference value in the multicall return data so a
    /// static call can read it before the real execution.
    Peek { reference: ChainedReference },
    /// Stakes pool shares into a gauge on the user's behalf.
    GaugeDeposit {
        gauge: H160,
        sender: H160,
        recipient: H160,
        amount: Amount,
    },
}

/// Turns one abstract step into opaque call data for the relayer.
///
/// The per-action byte layout is a property of the destination chain
/// protocol, not of this crate, so it lives behind this boundary.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
pub trait ActionEncoder: Send + Sync {
    fn encode(&self, step: &MigrationStep) -> Result<Vec<u8>>;
}
