//! Printer-PC agent for the jigprint authority.
//!
//! Pulls composed jobs into a local queue directory and, once the operator
//! presses print, drops them into the printer software's hot folder.

pub mod agent;
pub mod client;
pub mod config;
pub mod discovery;
pub mod heartbeat;
pub mod reconcile;
pub mod spool;
pub mod trigger;
