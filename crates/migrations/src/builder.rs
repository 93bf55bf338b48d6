//! Assembly of the ordered migration step list and the public entry points.
//!
//! Sequencing is straight-line: steps are conditionally included but never
//! reordered, and every runtime amount flows between steps through the
//! chained-reference slots minted by [`ReferenceAllocator`]. The sequencer
//! itself performs no I/O and is fully deterministic given its two resolved
//! pool trees.

use {
    crate::{
        decoder,
        error::MigrationError,
        graph::{MigrationPool, PoolGraphResolver},
        paths,
        relayer::{self, Amount, OutputReference, ReferenceAllocator},
        repository::{GaugeRepository, PoolRepository},
        steps::{ActionEncoder, MigrationStep, SwapPath},
    },
    anyhow::Result,
    ethereum_types::{H160, H256, U256},
    std::sync::Arc,
};

/// Caller-supplied parameters of one migration.
#[derive(Clone, Debug)]
pub struct MigrationRequest {
    pub user: H160,
    pub source_pool: H256,
    pub destination_pool: H256,
    /// The pool-share (or staked) balance being migrated.
    pub balance: U256,
    /// When unset the sequencer appends a peek step so the caller can
    /// discover the output with a static call before executing for real
    /// with an enforced minimum.
    pub min_bpt_out: Option<U256>,
    /// Off-chain signed relayer authorization, set when the user has not
    /// yet approved the relayer on-chain.
    pub authorisation: Option<Vec<u8>>,
}

/// The finished migration transaction: the relayer address and the encoded
/// multicall payload.
#[derive(Clone, Debug)]
pub struct MigrationTx {
    pub to: H160,
    pub data: Vec<u8>,
}

impl MigrationTx {
    /// Recovers the received pool-share amount from the return data of a
    /// static call executing this transaction.
    pub fn decode_output(&self, data: &[u8]) -> Result<U256> {
        decoder::decode_output(data)
    }
}

/// Everything the pure sequencer needs to emit the ordered step list.
pub struct MigrationPlan<'a> {
    pub request: &'a MigrationRequest,
    pub relayer: H160,
    pub source: &'a MigrationPool,
    pub destination: &'a MigrationPool,
    pub source_gauge: Option<H160>,
    pub destination_gauge: Option<H160>,
}

/// Builds atomic pool-to-pool migration transactions for the relayer.
pub struct Migrations {
    pools: Arc<dyn PoolRepository>,
    gauges: Arc<dyn GaugeRepository>,
    encoder: Arc<dyn ActionEncoder>,
    relayer: H160,
}

impl Migrations {
    pub fn new(
        pools: Arc<dyn PoolRepository>,
        gauges: Arc<dyn GaugeRepository>,
        encoder: Arc<dyn ActionEncoder>,
        relayer: H160,
    ) -> Self {
        Self {
            pools,
            gauges,
            encoder,
            relayer,
        }
    }

    /// Migrates between two unstaked pool positions.
    pub async fn pool2pool(
        &self,
        request: &MigrationRequest,
    ) -> Result<MigrationTx, MigrationError> {
        self.build(request, None, None).await
    }

    /// Migrates between two staked positions: unstakes from the source
    /// pool's gauge first and restakes into the destination pool's gauge at
    /// the end.
    pub async fn pool2pool_with_gauges(
        &self,
        request: &MigrationRequest,
    ) -> Result<MigrationTx, MigrationError> {
        let source_gauge = self.gauge(request.source_pool).await?;
        let destination_gauge = self.gauge(request.destination_pool).await?;
        self.build(request, Some(source_gauge), Some(destination_gauge))
            .await
    }

    /// Moves a staked position between two gauges of the same pool without
    /// touching the position itself.
    pub async fn gauge2gauge(
        &self,
        request: &MigrationRequest,
        source_gauge: H160,
        destination_gauge: H160,
    ) -> Result<MigrationTx, MigrationError> {
        self.build(request, Some(source_gauge), Some(destination_gauge))
            .await
    }

    async fn build(
        &self,
        request: &MigrationRequest,
        source_gauge: Option<H160>,
        destination_gauge: Option<H160>,
    ) -> Result<MigrationTx, MigrationError> {
        let resolver = PoolGraphResolver::new(self.pools.clone());
        let (source, destination) = futures::try_join!(
            resolver.resolve(request.source_pool),
            resolver.resolve(request.destination_pool),
        )?;

        let steps = build_migration_steps(&MigrationPlan {
            request,
            relayer: self.relayer,
            source: &source,
            destination: &destination,
            source_gauge,
            destination_gauge,
        })?;

        let calls = steps
            .iter()
            .map(|step| self.encoder.encode(step))
            .collect::<Result<Vec<_>>>()
            .map_err(MigrationError::Encoding)?;

        Ok(MigrationTx {
            to: self.relayer,
            data: relayer::encode_multicall(calls),
        })
    }

    async fn gauge(&self, pool_id: H256) -> Result<H160, MigrationError> {
        Ok(self
            .gauges
            .find_by_pool_id(pool_id)
            .await?
            .ok_or(MigrationError::GaugeNotFound(pool_id))?
            .id)
    }
}

/// Sequences one migration into its ordered step list.
pub fn build_migration_steps(
    plan: &MigrationPlan,
) -> Result<Vec<MigrationStep>, MigrationError> {
    let source = validate(plan.source)?;
    let destination = validate(plan.destination)?;
    let request = plan.request;

    let mut steps = Vec::new();

    if let Some(authorisation) = &request.authorisation {
        steps.push(MigrationStep::Approval {
            user: request.user,
            relayer: plan.relayer,
            authorisation: authorisation.clone(),
        });
    }

    // Moving between two gauges of the same pool leaves the position itself
    // untouched.
    let gauge_only = source.id == destination.id
        && plan.source_gauge.is_some()
        && plan.destination_gauge.is_some();

    // When the position passes through the relayer (both gauge legs are
    // present) the intermediate steps act on the relayer's holdings.
    let custody = match (plan.source_gauge, plan.destination_gauge) {
        (Some(_), Some(_)) => plan.relayer,
        _ => request.user,
    };

    if let Some(gauge) = plan.source_gauge {
        steps.push(MigrationStep::GaugeWithdraw {
            gauge,
            sender: request.user,
            recipient: match plan.destination_gauge {
                Some(_) => plan.relayer,
                None => request.user,
            },
            amount: Amount::Literal(request.balance),
        });
    }

    if !gauge_only {
        let exit_token_index = exit_token_index(&source);

        let exit_outputs = match exit_token_index {
            Some(index) => vec![OutputReference {
                index,
                key: ReferenceAllocator::exit_output(index),
            }],
            None => (0..plan.source.tokens.len())
                .map(|index| OutputReference {
                    index,
                    key: ReferenceAllocator::exit_output(index),
                })
                .collect(),
        };

        steps.push(MigrationStep::Exit {
            pool_id: source.id,
            pool_type: source.pool_type.to_string(),
            pool_type_version: plan.source.pool_type_version,
            sender: custody,
            recipient: custody,
            bpt_amount_in: Amount::Literal(request.balance),
            tokens: plan.source.tokens.iter().map(|token| token.address).collect(),
            exit_token_index,
            outputs: exit_outputs.clone(),
        });

        // Composable stable exits hand back the nested linear wrapper
        // tokens, which must be converted before the destination join;
        // other pool families exit straight into joinable tokens.
        let swap_paths = if plan.source.is_composable_stable() {
            let hop_lists = paths::build_paths(
                &plan.source.tokens,
                &plan.destination.tokens,
                exit_token_index,
            )?;
            hop_lists
                .into_iter()
                .enumerate()
                .filter(|(_, hops)| !hops.is_empty())
                .map(|(index, hops)| SwapPath {
                    hops,
                    // Swap inputs align positionally with the exit outputs:
                    // under the single-token exit policy there is exactly
                    // one of each.
                    amount_in: Amount::Reference(match exit_token_index {
                        Some(exit_index) => ReferenceAllocator::exit_output(exit_index),
                        None => ReferenceAllocator::exit_output(index),
                    }),
                    output: OutputReference {
                        index,
                        key: ReferenceAllocator::swap_output(index),
                    },
                })
                .collect::<Vec<_>>()
        } else {
            Vec::new()
        };

        if !swap_paths.is_empty() {
            steps.push(MigrationStep::Swap {
                sender: custody,
                recipient: custody,
                paths: swap_paths.clone(),
            });
        }

        // The destination pool's own share token is never a join input.
        let join_tokens = plan
            .destination
            .tokens
            .iter()
            .filter(|token| token.address != plan.destination.address)
            .collect::<Vec<_>>();
        let amounts_in = join_tokens
            .iter()
            .map(|token| join_amount(token, plan.source, &swap_paths, &exit_outputs))
            .collect();

        let join_output = OutputReference {
            index: 0,
            key: ReferenceAllocator::join_output(),
        };
        steps.push(MigrationStep::Join {
            pool_id: destination.id,
            pool_type: destination.pool_type.to_string(),
            pool_type_version: plan.destination.pool_type_version,
            sender: custody,
            recipient: match plan.destination_gauge {
                Some(_) => plan.relayer,
                None => request.user,
            },
            tokens: join_tokens.iter().map(|token| token.address).collect(),
            amounts_in,
            min_bpt_out: request.min_bpt_out,
            output: join_output,
        });

        if request.min_bpt_out.is_none() {
            steps.push(MigrationStep::Peek {
                reference: join_output.key,
            });
        }
    }

    if let Some(gauge) = plan.destination_gauge {
        let amount = if gauge_only {
            Amount::Literal(request.balance)
        } else {
            match request.min_bpt_out {
                Some(min_bpt_out) => Amount::Literal(min_bpt_out),
                None => Amount::Reference(ReferenceAllocator::join_output()),
            }
        };
        steps.push(MigrationStep::GaugeDeposit {
            gauge,
            sender: plan.relayer,
            recipient: request.user,
            amount,
        });
    }

    tracing::debug!(steps = steps.len(), "sequenced migration");
    Ok(steps)
}

/// The amount wired into the join for one destination token: the output of
/// the swap path ending in that token if one exists, else the matching exit
/// output when the source pool holds the same token, else zero.
fn join_amount(
    token: &MigrationPool,
    source: &MigrationPool,
    swap_paths: &[SwapPath],
    exit_outputs: &[OutputReference],
) -> Amount {
    if let Some(path) = swap_paths.iter().find(|path| {
        path.hops
            .last()
            .is_some_and(|hop| hop.asset_out == token.address)
    }) {
        return Amount::Reference(path.output.key);
    }
    exit_outputs
        .iter()
        .find(|output| {
            source
                .tokens
                .get(output.index)
                .is_some_and(|source_token| source_token.address == token.address)
        })
        .map(|output| Amount::Reference(output.key))
        .unwrap_or(Amount::Literal(U256::zero()))
}

/// Pools exiting through a single designated token instead of
/// proportionally across every token (`None`).
///
/// Composable stable pools at schema version 1 have no reliable
/// proportional-exit path, so they exit through their first token.
// TODO: derive the designated exit token per pool family instead of
// hardcoding composable stable v1.
fn exit_token_index(pool: &ValidPool) -> Option<usize> {
    (pool.pool.is_composable_stable() && pool.pool.pool_type_version == 1).then_some(0)
}

/// A resolved pool that carries everything a migration needs.
struct ValidPool<'a> {
    id: H256,
    pool_type: &'a str,
    pool: &'a MigrationPool,
}

fn validate(pool: &MigrationPool) -> Result<ValidPool<'_>, MigrationError> {
    match (pool.id, pool.pool_type.as_deref()) {
        (Some(id), Some(pool_type)) if !pool.tokens.is_empty() => Ok(ValidPool {
            id,
            pool_type,
            pool,
        }),
        _ => Err(MigrationError::IncompleteMigrationPool(pool.address)),
    }
}
