//! Scribeflow - Writing-Assistant SaaS Backend
//!
//! A REST backend for an AI writing assistant: editor endpoints that call a
//! generative-text vendor, session auth, a subscription/payment flow, and
//! admin analytics.
//!
//! ## Core Features
//!
//! - **Generation Gateway**: two-phase SDK/REST fallback across an ordered
//!   candidate model list; callers never see a raw vendor error if any
//!   candidate succeeds
//! - **Fire-and-Forget Telemetry**: usage and query logging that can never
//!   affect a generation result
//! - **Session Auth**: cookie sessions over an in-memory store
//! - **SQLite Storage**: pooled connections, WAL, tracked migrations
//!
//! ## Modules
//!
//! - [`ai`]: generation gateway, transports, resolver, prompt shaping
//! - [`http`]: axum router, session extractors, route handlers
//! - [`storage`]: SQLite persistence with connection pooling
//! - [`billing`]: payment provider client and webhook verification
//! - [`events`]: best-effort usage/query sinks
//! - [`config`]: layered configuration

pub mod ai;
pub mod billing;
pub mod config;
pub mod constants;
pub mod events;
pub mod http;
pub mod storage;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::error::{Result, ResultExt, ScribeError};

// Storage
pub use storage::database::PoolConfig;
pub use storage::{Database, SharedDatabase};

// =============================================================================
// Gateway Re-exports
// =============================================================================

pub use ai::{
    BackendResolver,
    GenerationBackend,
    GenerationGateway,
    GenerationResult,
    Operation,
    RestClient,
    SdkClient,
    TransportKind,
    build_candidate_list,
    shape_prompt,
};

// =============================================================================
// HTTP Re-exports
// =============================================================================

pub use events::{EventSink, NullEventSink, SharedEventSink, SqliteEventSink};
pub use http::{AppState, router, serve};
