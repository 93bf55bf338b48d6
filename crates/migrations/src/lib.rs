//! Compiler for atomic liquidity-pool migrations executed through the
//! Balancer relayer.
//!
//! A migration moves a user's position from one pool to another (optionally
//! unstaking from and restaking into gauges) inside a single `multicall`
//! transaction. The interesting part is that the amounts produced by an exit
//! or swap are only known at execution time, so steps pass values to each
//! other through symbolic "chained reference" slots instead of literal
//! numbers.
//!
//! The crate is organised around the plan-construction pipeline:
//! - [`graph`] resolves a pool id into its nested token tree,
//! - [`paths`] computes the swap hops between two resolved trees,
//! - [`relayer`] mints the chained-reference slot keys and assembles the
//!   multicall envelope,
//! - [`builder`] sequences the ordered step list and exposes the
//!   [`builder::Migrations`] entry points,
//! - [`decoder`] recovers the received pool-share amount from a static
//!   call's return data.
//!
//! Pool and gauge lookups happen behind the [`repository`] traits; the
//! production implementations in [`graph_api`] query the Balancer subgraphs.
//! Per-action call data is produced behind the [`steps::ActionEncoder`]
//! boundary, which is owned by the chain protocol rather than this crate.

pub mod builder;
pub mod decoder;
pub mod error;
pub mod graph;
pub mod graph_api;
pub mod paths;
pub mod relayer;
pub mod repository;
pub mod steps;
pub mod subgraph;

pub use self::{
    builder::{MigrationRequest, MigrationTx, Migrations, build_migration_steps},
    error::MigrationError,
    graph::{MigrationPool, PoolGraphResolver},
    relayer::{Amount, ChainedReference, OutputReference, ReferenceAllocator},
    steps::{ActionEncoder, MigrationStep},
};
