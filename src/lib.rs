#![cfg_attr(docsrs, feature(doc_cfg))]
//! `pg-converge` is a library for converging a PostgreSQL database onto a
//! target schema, without a migration-version ledger.
//!
//! Core concepts:
//! - The live catalog is the only source of truth: every run inspects
//!   `information_schema` / `pg_catalog` and applies only what is missing.
//! - A plan is a set of idempotent steps, each pairing an existence predicate
//!   with a DDL definition. Running the same plan twice applies nothing the
//!   second time.
//!
//! # Motivation
//!
//! ## Introspection instead of a version ledger
//!
//! Version-ledger migration tools record which scripts have run in a history
//! table and trust that record over the database itself. That breaks down
//! when the schema is also touched out-of-band, and it makes the history
//! table a single point of corruption.
//!
//! `pg-converge` instead derives idempotency from the catalog: a step that
//! checks `information_schema.columns` before `ALTER TABLE ADD COLUMN` is
//! safe to rerun against any database, whatever intermediate shape it
//! stopped at. The trade-off is deliberate: renames and destructive changes
//! are out of scope, because an existence check cannot distinguish "never
//! created" from "renamed away".
//!
//! ## Converge-on-startup
//!
//! The intended use is embedding: run the plan during application startup so
//! a deployment brings its own schema up to date. A failed step aborts the
//! run and leaves prior steps applied; fixing the cause and rerunning
//! converges the rest.
//!
//! # Benefits
//! - Safe against databases in any intermediate shape.
//! - Typed tri-state step outcomes (applied / already-present / tolerated
//!   conflict), no suppressed exceptions.
//! - Preview / dry-run support.
//! - Observability hooks.
//! - Tracing integration - available with the `tracing` feature flag.
//! - Testing utilities - available with the `testing` feature flag.

mod core;
pub use core::{
    ObjectKind, Phase, RunReport, RunStatus, SchemaStep, StepFailure, StepOutcome, Warning,
};

mod error;
pub use error::Error;

mod inspect;
pub use inspect::{
    ColumnInfo, ConstraintInfo, ConstraintKind, IndexInfo, SchemaInspector, SchemaSnapshot,
    TableSchema,
};

mod plan;
pub use plan::MigrationPlan;

mod runner;
pub use runner::MigrationRunner;

pub mod backfill;
pub mod config;
pub mod schema;
pub mod step;

#[cfg(any(test, feature = "testing"))]
#[cfg_attr(docsrs, doc(cfg(feature = "testing")))]
pub mod testing;

#[cfg(test)]
pub(crate) mod test_support;
