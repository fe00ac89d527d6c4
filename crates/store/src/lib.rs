//! Postgres-backed persistence for both coordination subsystems (spec §6.3,
//! §9 "capability abstractions": "a persistence contract (read/write/
//! transaction)").
//!
//! Saga tables and `twophase_`-prefixed tables are disjoint (spec §6.3); this
//! crate exposes one store type per subsystem so the two are never mixed
//! through a shared pool by accident, even though both typically point at
//! the same Postgres instance in development.

pub mod pool;

pub mod saga;
pub mod twopc;

pub use pool::connect;
