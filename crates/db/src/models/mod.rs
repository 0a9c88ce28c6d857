//! Row models and DTOs.
//!
//! Each submodule contains:
//! - `FromRow` + `Serialize` structs matching database rows
//! - `Deserialize` create / update DTOs

pub mod job;
pub mod printer;
pub mod template;
