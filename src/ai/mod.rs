//! AI Integration Layer
//!
//! The generation gateway and everything it drives: candidate list
//! construction, prompt shaping, the SDK/REST transports, and the resolver
//! that owns the process-wide SDK binding.

pub mod candidates;
pub mod gateway;
pub mod prompt;
pub mod resolver;
pub mod timeout;
pub mod transport;

pub use candidates::build_candidate_list;
pub use gateway::{GenerationGateway, GenerationResult, TransportKind};
pub use prompt::{Operation, shape_prompt};
pub use resolver::{BackendResolver, MISSING_KEY_ERROR, ResolverSnapshot};
pub use timeout::with_timeout;
pub use transport::{GenerationBackend, RestClient, SdkClient, SharedBackend};
