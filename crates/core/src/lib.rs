//! Domain logic for the jig print workflow.
//!
//! Everything in this crate is pure: no database, network or filesystem
//! access. The `db`, `api`, `compose` and `agent` crates all build on
//! these rules so the authority and the printer agent agree on state,
//! ordering and naming.

pub mod agent_protocol;
pub mod api_keys;
pub mod error;
pub mod geometry;
pub mod hashing;
pub mod hot_folder;
pub mod job;
pub mod job_status;
pub mod notes;
pub mod queue;
pub mod reprint;
pub mod template;
pub mod types;
