//! Generation Gateway
//!
//! Two-phase ordered fallback in front of the vendor's generation API:
//!
//! 1. Phase A (SDK): one attempt through the currently bound client, if any.
//!    Any error discards the binding; the walk continues, it never retries.
//! 2. Phase B (REST): the ordered candidate list, one direct call each,
//!    first non-empty text wins and becomes the last-known-good hint.
//!
//! Only terminal outcomes leave this module; per-candidate failures are
//! logged and advance the walk. Usage/query logging is fire-and-forget and
//! can never influence the result.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::candidates::build_candidate_list;
use super::prompt::{Operation, shape_prompt};
use super::resolver::{BackendResolver, MISSING_KEY_ERROR, ResolverSnapshot};
use super::timeout::with_timeout;
use super::transport::{RestClient, SdkClient, SharedBackend};
use crate::config::GenerationConfig;
use crate::constants::generation::FALLBACK_MODELS;
use crate::events::SharedEventSink;
use crate::types::{Result, ScribeError, SearchSource};

/// Which transport produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransportKind {
    Sdk,
    Http,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Sdk => write!(f, "SDK"),
            TransportKind::Http => write!(f, "REST"),
        }
    }
}

/// Successful generation outcome
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// Generated text, trimmed
    pub text: String,
    /// Model that produced it
    pub model: String,
    /// Transport that produced it
    pub transport: TransportKind,
}

/// Resilient front door for text generation
pub struct GenerationGateway {
    resolver: Arc<BackendResolver>,
    rest: Option<SharedBackend>,
    events: SharedEventSink,
    preferred_model: Option<String>,
    request_timeout: Duration,
}

impl GenerationGateway {
    /// Assemble a gateway from explicit parts. Tests inject fake backends
    /// and sinks here; production goes through `from_config`.
    pub fn new(
        resolver: Arc<BackendResolver>,
        rest: Option<SharedBackend>,
        events: SharedEventSink,
        preferred_model: Option<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            rest,
            events,
            preferred_model,
            request_timeout,
        }
    }

    /// Build the production gateway. A missing API key produces a gateway
    /// with no transports: status reports it, generation returns 503.
    pub fn from_config(config: &GenerationConfig, events: SharedEventSink) -> Result<Self> {
        let probe_timeout = Duration::from_secs(config.probe_timeout_secs);
        let request_timeout = Duration::from_secs(config.request_timeout_secs);

        let key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty());

        let (sdk, rest): (Option<SharedBackend>, Option<SharedBackend>) = match key {
            Some(key) => {
                let sdk = SdkClient::new(key.to_string(), config.api_base.clone(), request_timeout)?;
                let rest =
                    RestClient::new(key.to_string(), config.api_base.clone(), request_timeout)?;
                (Some(Arc::new(sdk)), Some(Arc::new(rest)))
            }
            None => {
                warn!("{} - generation endpoints will return 503", MISSING_KEY_ERROR);
                (None, None)
            }
        };

        Ok(Self {
            resolver: Arc::new(BackendResolver::new(sdk, probe_timeout)),
            rest,
            events,
            preferred_model: config.preferred_model.clone(),
            request_timeout,
        })
    }

    /// Whether vendor credentials are configured
    pub fn has_api_key(&self) -> bool {
        self.rest.is_some() || self.resolver.is_configured()
    }

    pub fn resolver(&self) -> &BackendResolver {
        &self.resolver
    }

    /// Status-endpoint view of the resolver
    pub fn snapshot(&self) -> ResolverSnapshot {
        self.resolver.snapshot()
    }

    /// Startup/explicit re-probing of the SDK binding
    pub async fn reinit(&self, override_model: Option<&str>) -> bool {
        let candidates = build_candidate_list(self.preferred_model.as_deref());
        self.resolver.bind(&candidates, override_model).await
    }

    /// Generate or transform text for a user prompt.
    ///
    /// Preconditions: prompt non-empty after trim. Emits best-effort usage
    /// and query events; their failure never surfaces here.
    #[instrument(skip(self, prompt, operation, tool_label), fields(operation = %operation))]
    pub async fn generate(
        &self,
        prompt: &str,
        operation: &Operation,
        tool_label: Option<&str>,
        user_id: Option<Uuid>,
    ) -> Result<GenerationResult> {
        if prompt.trim().is_empty() {
            return Err(ScribeError::invalid("Prompt is required"));
        }

        // Fire-and-forget side channels, before any backend work
        self.events
            .log_search(prompt, user_id, tool_label, SearchSource::ToolUse);
        let tool_name = tool_label
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .or_else(|| {
                let op = operation.as_str().trim();
                (!op.is_empty()).then(|| op.to_string())
            })
            .unwrap_or_else(|| "Content Gen".to_string());
        self.events.log_usage(user_id, &tool_name);

        if !self.has_api_key() {
            return Err(ScribeError::not_configured(MISSING_KEY_ERROR));
        }

        let shaped = shape_prompt(operation, prompt);

        // Phase A: one attempt through the bound SDK client only
        if let (Some(model), Some(sdk)) = (self.resolver.bound_model(), self.resolver.transport()) {
            debug!(%model, "Phase A: trying bound SDK client");
            match with_timeout(
                self.request_timeout,
                sdk.generate(&model, &shaped),
                "SDK generation",
            )
            .await
            {
                Ok(text) if !text.trim().is_empty() => {
                    info!(%model, "SDK call succeeded");
                    return Ok(GenerationResult {
                        text: text.trim().to_string(),
                        model,
                        transport: TransportKind::Sdk,
                    });
                }
                Ok(_) => {
                    // Empty text is not an SDK failure; the binding stays
                    warn!(%model, "SDK returned empty response, falling back to REST");
                }
                Err(e) => {
                    warn!(%model, error = %e, "SDK call failed, discarding binding");
                    self.resolver.unbind();
                }
            }
        } else {
            debug!("Phase A skipped: SDK client not bound");
        }

        // Phase B: walk the candidate list over direct REST
        let Some(rest) = self.rest.clone() else {
            return Err(ScribeError::not_configured(MISSING_KEY_ERROR));
        };

        let candidates = build_candidate_list(self.preferred_model.as_deref());
        let mut last_error: Option<String> = None;

        for model in &candidates {
            debug!(%model, "Phase B: trying REST candidate");
            match with_timeout(
                self.request_timeout,
                rest.generate(model, &shaped),
                "REST generation",
            )
            .await
            {
                Ok(text) if !text.trim().is_empty() => {
                    info!(%model, "REST call succeeded");
                    self.resolver.record_good_model(model);
                    return Ok(GenerationResult {
                        text: text.trim().to_string(),
                        model: model.clone(),
                        transport: TransportKind::Http,
                    });
                }
                Ok(_) => {
                    warn!(%model, "REST candidate returned empty response");
                    last_error = Some(format!("{}: empty response", model));
                }
                Err(e) => {
                    warn!(%model, error = %e, "REST candidate failed");
                    last_error = Some(e.to_string());
                }
            }
        }

        Err(ScribeError::exhausted(
            last_error.unwrap_or_else(|| "No working models found".to_string()),
        ))
    }

    /// Diagnostic single call through the SDK transport. Late-binds when no
    /// initialization was ever attempted.
    pub async fn sdk_probe(&self) -> Result<(String, String)> {
        if !self.resolver.initialization_attempted() {
            debug!("Attempting late SDK initialization");
            self.reinit(None).await;
        }

        let (Some(model), Some(sdk)) = (self.resolver.bound_model(), self.resolver.transport())
        else {
            return Err(ScribeError::not_configured("Gemini SDK not available"));
        };

        let text = with_timeout(
            self.request_timeout,
            sdk.generate(&model, "Hello world, respond with just \"OK\""),
            "SDK probe",
        )
        .await?;
        Ok((model, text))
    }

    /// Diagnostic single call through the REST transport.
    pub async fn rest_probe(&self) -> Result<String> {
        let Some(rest) = self.rest.clone() else {
            return Err(ScribeError::not_configured(MISSING_KEY_ERROR));
        };

        with_timeout(
            self.request_timeout,
            rest.generate(FALLBACK_MODELS[0], "Say \"REST works\""),
            "REST probe",
        )
        .await
    }

    /// Raw vendor model listing, for operator diagnostics.
    pub async fn models_raw(&self) -> Result<serde_json::Value> {
        let Some(rest) = self.rest.clone() else {
            return Err(ScribeError::not_configured(MISSING_KEY_ERROR));
        };
        rest.list_models().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::transport::GenerationBackend;
    use crate::events::EventSink;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend that replays a script of responses, one per call
    struct MockBackend {
        script: Mutex<VecDeque<std::result::Result<String, String>>>,
        calls: AtomicUsize,
        last_prompt: Mutex<Option<String>>,
    }

    impl MockBackend {
        fn new(script: Vec<std::result::Result<&str, &str>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(
                    script
                        .into_iter()
                        .map(|r| r.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_prompt(&self) -> Option<String> {
            self.last_prompt.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerationBackend for MockBackend {
        async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            match self.script.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(text),
                Some(Err(message)) => Err(ScribeError::vendor(model, message)),
                None => Err(ScribeError::vendor(model, "unscripted call")),
            }
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    /// Sink that counts emissions
    #[derive(Default)]
    struct CountingSink {
        usage: AtomicUsize,
        searches: AtomicUsize,
    }

    impl EventSink for CountingSink {
        fn log_usage(&self, _user_id: Option<Uuid>, _tool_name: &str) {
            self.usage.fetch_add(1, Ordering::SeqCst);
        }

        fn log_search(
            &self,
            _query: &str,
            _user_id: Option<Uuid>,
            _tool_name: Option<&str>,
            _source: SearchSource,
        ) {
            self.searches.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn gateway_with(
        sdk: Option<Arc<MockBackend>>,
        rest: Option<Arc<MockBackend>>,
    ) -> (GenerationGateway, Arc<CountingSink>) {
        let sink = Arc::new(CountingSink::default());
        let resolver = Arc::new(BackendResolver::new(
            sdk.map(|b| b as SharedBackend),
            Duration::from_secs(1),
        ));
        let gateway = GenerationGateway::new(
            resolver,
            rest.map(|b| b as SharedBackend),
            sink.clone(),
            None,
            Duration::from_secs(1),
        );
        (gateway, sink)
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected_without_backend_calls() {
        let rest = MockBackend::new(vec![Ok("should never be used")]);
        let (gateway, sink) = gateway_with(None, Some(rest.clone()));

        for prompt in ["", "   ", "\n\t"] {
            let err = gateway
                .generate(prompt, &Operation::Generate, None, None)
                .await
                .unwrap_err();
            assert!(matches!(err, ScribeError::InvalidRequest(_)));
        }

        assert_eq!(rest.call_count(), 0);
        // Rejected requests are not logged either
        assert_eq!(sink.usage.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_not_configured_short_circuits() {
        let (gateway, sink) = gateway_with(None, None);

        let err = gateway
            .generate("write a poem", &Operation::Generate, None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ScribeError::NotConfigured(_)));
        // Side-channel logging still happened before the credential check
        assert_eq!(sink.usage.load(Ordering::SeqCst), 1);
        assert_eq!(sink.searches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sdk_success_returns_immediately() {
        // First script entry binds the probe, second serves the request
        let sdk = MockBackend::new(vec![Ok("probe ok"), Ok("Generated text")]);
        let rest = MockBackend::new(vec![Ok("should never be used")]);
        let (gateway, _) = gateway_with(Some(sdk.clone()), Some(rest.clone()));

        assert!(gateway.reinit(None).await);
        let result = gateway
            .generate("write a poem", &Operation::Generate, None, None)
            .await
            .unwrap();

        assert_eq!(result.transport, TransportKind::Sdk);
        assert_eq!(result.text, "Generated text");
        assert_eq!(result.model, "gemini-2.5-flash");
        assert_eq!(rest.call_count(), 0);
    }

    #[tokio::test]
    async fn test_sdk_failure_falls_back_to_rest_and_unbinds() {
        let sdk = MockBackend::new(vec![Ok("probe ok"), Err("boom")]);
        let rest = MockBackend::new(vec![Ok("REST text")]);
        let (gateway, _) = gateway_with(Some(sdk.clone()), Some(rest.clone()));

        assert!(gateway.reinit(None).await);
        assert!(gateway.resolver().is_bound());

        let result = gateway
            .generate("write a poem", &Operation::Generate, None, None)
            .await
            .unwrap();

        assert_eq!(result.transport, TransportKind::Http);
        assert_eq!(result.text, "REST text");
        assert_eq!(rest.call_count(), 1);
        // The failed binding was discarded
        assert!(!gateway.resolver().is_bound());
    }

    #[tokio::test]
    async fn test_grammar_scenario_second_candidate_wins() {
        // SDK unbound; candidate 1 returns empty, candidate 2 the fix
        let rest = MockBackend::new(vec![Ok(""), Ok("Fixed sentence.")]);
        let (gateway, _) = gateway_with(None, Some(rest.clone()));

        let result = gateway
            .generate("Fix this sentence", &Operation::Grammar, None, None)
            .await
            .unwrap();

        assert_eq!(result.text, "Fixed sentence.");
        assert_eq!(result.transport, TransportKind::Http);
        assert_eq!(result.model, "gemini-2.5-pro");
        assert_eq!(rest.call_count(), 2);
        // The prompt reached the backend shaped for grammar
        assert!(rest.last_prompt().unwrap().starts_with("Fix grammar/spelling."));
        // The winning model becomes the new hint
        assert_eq!(
            gateway.resolver().current_model().as_deref(),
            Some("gemini-2.5-pro")
        );
    }

    #[tokio::test]
    async fn test_exhaustion_calls_every_candidate_exactly_once() {
        let rest = MockBackend::new(vec![Ok(""), Ok(""), Ok(""), Ok("")]);
        let (gateway, _) = gateway_with(None, Some(rest.clone()));

        let err = gateway
            .generate("write a poem", &Operation::Generate, None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ScribeError::AllBackendsUnavailable { .. }));
        assert_eq!(rest.call_count(), FALLBACK_MODELS.len());
    }

    #[tokio::test]
    async fn test_exhaustion_carries_last_error_detail() {
        let rest = MockBackend::new(vec![
            Err("HTTP 404"),
            Err("HTTP 429"),
            Err("HTTP 500"),
            Err("final failure"),
        ]);
        let (gateway, _) = gateway_with(None, Some(rest));

        let err = gateway
            .generate("write a poem", &Operation::Generate, None, None)
            .await
            .unwrap_err();

        match err {
            ScribeError::AllBackendsUnavailable { detail } => {
                assert!(detail.contains("final failure"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_sdk_empty_response_keeps_binding() {
        let sdk = MockBackend::new(vec![Ok("probe ok"), Ok("   ")]);
        let rest = MockBackend::new(vec![Ok("REST text")]);
        let (gateway, _) = gateway_with(Some(sdk), Some(rest));

        assert!(gateway.reinit(None).await);
        let result = gateway
            .generate("write a poem", &Operation::Generate, None, None)
            .await
            .unwrap();

        assert_eq!(result.transport, TransportKind::Http);
        // Empty SDK text falls through without discarding the binding
        assert!(gateway.resolver().is_bound());
    }

    #[tokio::test]
    async fn test_usage_logged_with_tool_label_priority() {
        let rest = MockBackend::new(vec![Ok("text")]);
        let (gateway, sink) = gateway_with(None, Some(rest));

        gateway
            .generate(
                "prompt",
                &Operation::Grammar,
                Some("Content Improve"),
                None,
            )
            .await
            .unwrap();

        assert_eq!(sink.usage.load(Ordering::SeqCst), 1);
        assert_eq!(sink.searches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transport_kind_wire_names() {
        assert_eq!(TransportKind::Sdk.to_string(), "SDK");
        assert_eq!(TransportKind::Http.to_string(), "REST");
    }
}
