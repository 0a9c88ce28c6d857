//! Request extractors for authentication.
//!
//! - [`agent_auth::AgentPrinter`] -- Resolves the calling printer from its agent key.

pub mod agent_auth;
