//! Request handlers, one submodule per resource.
//!
//! Handlers delegate to the repositories in `jigprint_db`, validate through
//! `jigprint_core` and map errors via [`AppError`](crate::error::AppError).

pub mod agent;
pub mod jobs;
pub mod operator;
pub mod printers;
pub mod templates;
