//! Configuration system
//!
//! Layered loading (defaults → file → env) with post-load validation.

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    Config, DatabaseConfig, GenerationConfig, ServerConfig, SessionConfig, StripeConfig,
};
