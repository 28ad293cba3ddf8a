//! docket - optimistic task sync for case-management front ends
//!
//! The library keeps a local, shared view of tasks, applies edits to it
//! before the backend confirms them, and derives notifications from it.
//!
//! # Core Concepts
//!
//! - **Task store**: the single mutable task collection; every read is a copy
//! - **Reconciliation**: apply locally, await the backend, then commit the
//!   server copy or roll back and report a sync failure
//! - **Notifications**: overdue, due-soon, completed and assigned entries
//!   re-derived from the store, keeping read/dismiss state by id
//!
//! # Module Organization
//!
//! - `task`: task records, patches, drafts and filters
//! - `store`: in-memory task store with optimistic primitives
//! - `reconcile`: optimistic mutation protocol
//! - `notification`: pure notification derivation
//! - `center`: notification list with read/dismiss state
//! - `ticker`: fixed-interval rescans
//! - `backend`: remote task service contract and REST client
//! - `desk`: the facade a front end drives
//! - `config`: configuration loading from `.docket.toml`
//! - `cache`: locked, atomic offline snapshot
//! - `user`: current user resolution
//! - `events`: JSONL events for integrations
//! - `output`: human and JSON CLI output
//! - `cli`: command-line interface using clap
//! - `error`: error types and result aliases

pub mod backend;
pub mod cache;
pub mod center;
pub mod cli;
pub mod config;
pub mod desk;
pub mod error;
pub mod events;
pub mod notification;
pub mod output;
pub mod reconcile;
pub mod store;
pub mod task;
pub mod ticker;
pub mod user;

pub use error::{Error, Result};
