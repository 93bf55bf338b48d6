//! Chained-reference slot keys and the relayer's multicall envelope.
//!
//! A chained reference is an opaque numeric key that, when placed into a
//! step's amount field instead of a literal number, instructs the relayer to
//! substitute the value produced by an earlier step of the same call. The
//! keys are minted from small decimal seeds so they stay human readable in
//! traces while carrying a marker prefix in their top bytes that literal
//! amounts can never collide with.

use {
    anyhow::{Context, Result, bail},
    ethabi::{ParamType, Token},
    ethereum_types::U256,
    hex_literal::hex,
};

/// Selector of the relayer's `multicall(bytes[])` entry point.
const MULTICALL_SELECTOR: [u8; 4] = hex!("ac9650d8");

/// Marker carried in the top two bytes of every chained reference.
const REFERENCE_MARKER: u64 = 0xba10;

/// A symbolic slot key referring to the runtime output of an earlier step.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ChainedReference(U256);

impl ChainedReference {
    fn from_seed(seed: u64) -> Self {
        Self((U256::from(REFERENCE_MARKER) << 240) + seed)
    }

    /// The raw word placed into a step's amount or output-reference field.
    pub fn value(&self) -> U256 {
        self.0
    }

    /// Whether the specified amount word is a chained reference rather than
    /// a literal amount.
    pub fn is_chained_reference(value: U256) -> bool {
        value >> 240 == U256::from(REFERENCE_MARKER)
    }
}

/// Mints the chained-reference keys used within one migration.
///
/// Keys are namespaced by purpose with disjoint decimal prefixes so that no
/// two `(namespace, index)` pairs collide within one call: exit outputs use
/// seeds `10{i}`, swap outputs `20{i}`, and the single join output the
/// reserved seed `999` (only one join occurs per migration).
pub struct ReferenceAllocator;

impl ReferenceAllocator {
    /// The slot capturing the amount exited at the specified token index.
    pub fn exit_output(index: usize) -> ChainedReference {
        ChainedReference::from_seed(seed(10, index))
    }

    /// The slot capturing the output of the swap path at the specified
    /// index.
    pub fn swap_output(index: usize) -> ChainedReference {
        ChainedReference::from_seed(seed(20, index))
    }

    /// The reserved slot capturing the join's pool-share output.
    pub fn join_output() -> ChainedReference {
        ChainedReference::from_seed(999)
    }
}

/// Concatenates a namespace prefix and a token index into one decimal seed
/// (`prefix` followed by the decimal digits of `index`).
fn seed(prefix: u64, index: usize) -> u64 {
    let index = index as u64;
    let mut shift = 10;
    while shift <= index {
        shift *= 10;
    }
    prefix * shift + index
}

/// A step input that is either a literal token amount or a chained reference
/// to the output of an earlier step.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Amount {
    Literal(U256),
    Reference(ChainedReference),
}

impl Amount {
    /// The raw word that gets encoded into the step's amount field.
    pub fn as_wire_word(&self) -> U256 {
        match self {
            Self::Literal(amount) => *amount,
            Self::Reference(reference) => reference.value(),
        }
    }
}

/// Marks the position within a step's return data whose value should be
/// written into the given chained-reference slot.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OutputReference {
    pub index: usize,
    pub key: ChainedReference,
}

/// Wraps the encoded per-step calls into the relayer's `multicall(bytes[])`
/// payload.
pub fn encode_multicall(calls: Vec<Vec<u8>>) -> Vec<u8> {
    let calls = Token::Array(calls.into_iter().map(Token::Bytes).collect());
    let mut data = MULTICALL_SELECTOR.to_vec();
    data.extend(ethabi::encode(&[calls]));
    data
}

/// Splits an executed multicall's return data into the per-step result
/// blobs, in step order. Steps that produced no return value appear as empty
/// blobs.
pub fn decode_multicall_results(data: &[u8]) -> Result<Vec<Vec<u8>>> {
    let tokens = ethabi::decode(&[ParamType::Array(Box::new(ParamType::Bytes))], data)
        .context("malformed multicall return data")?;
    let Some(Token::Array(blobs)) = tokens.into_iter().next() else {
        bail!("multicall return data is not a bytes array");
    };
    blobs
        .into_iter()
        .map(|blob| match blob {
            Token::Bytes(bytes) => Ok(bytes),
            _ => bail!("multicall result is not a bytes value"),
        })
        .collect()
}
