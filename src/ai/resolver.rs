//! Backend resolver
//!
//! Owns the process-wide SDK binding: which model (if any) the stateful
//! client is currently bound to, the last-known-good hint recorded by REST
//! successes, and the most recent probe error for diagnostics.
//!
//! State machine per process: Uninitialized -> Probing -> {Bound, Unbound}.
//! Any generation failure through the bound client unbinds it; a REST success
//! only updates the hint and never rebinds. Rebinding happens through
//! `bind()` (startup or explicit reinit).
//!
//! Locks are held only for state reads/writes, never across a probe call, so
//! one request unbinding can never cancel another request's in-flight call.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use super::timeout::with_timeout;
use super::transport::SharedBackend;
use crate::constants::generation::PROBE_PROMPT;

/// Missing-credentials message, also surfaced by the status endpoint
pub const MISSING_KEY_ERROR: &str = "GEMINI_API_KEY missing";

#[derive(Debug, Default)]
struct ResolverState {
    bound_model: Option<String>,
    last_good_model: Option<String>,
    initialization_attempted: bool,
    last_error: Option<String>,
}

/// Diagnostic view of the resolver, serialized by the status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ResolverSnapshot {
    #[serde(rename = "sdkInitialized")]
    pub bound: bool,
    #[serde(rename = "currentModel")]
    pub current_model: Option<String>,
    #[serde(rename = "initializationAttempted")]
    pub initialization_attempted: bool,
    #[serde(rename = "lastError")]
    pub last_error: Option<String>,
}

/// Injectable owner of the SDK client binding
pub struct BackendResolver {
    /// None when no API key is configured; bind() then reports and stays Unbound
    transport: Option<SharedBackend>,
    state: RwLock<ResolverState>,
    probe_timeout: Duration,
}

impl BackendResolver {
    pub fn new(transport: Option<SharedBackend>, probe_timeout: Duration) -> Self {
        Self {
            transport,
            state: RwLock::new(ResolverState::default()),
            probe_timeout,
        }
    }

    /// Whether vendor credentials were configured at construction
    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    /// The SDK transport, for callers that must run a call outside the lock
    pub fn transport(&self) -> Option<SharedBackend> {
        self.transport.clone()
    }

    /// Model the SDK client is bound to right now (Phase A gate)
    pub fn bound_model(&self) -> Option<String> {
        self.read().bound_model.clone()
    }

    /// Model reported to clients: the binding if present, else the last
    /// model any transport succeeded with
    pub fn current_model(&self) -> Option<String> {
        let state = self.read();
        state
            .bound_model
            .clone()
            .or_else(|| state.last_good_model.clone())
    }

    pub fn is_bound(&self) -> bool {
        self.read().bound_model.is_some()
    }

    pub fn initialization_attempted(&self) -> bool {
        self.read().initialization_attempted
    }

    pub fn last_error(&self) -> Option<String> {
        self.read().last_error.clone()
    }

    /// Drop the binding. The next Phase A is skipped until a rebind.
    pub fn unbind(&self) {
        self.write().bound_model = None;
    }

    /// Record a model that just produced text over REST. Hint only; the SDK
    /// client stays unbound because rebinding costs a fresh probe round.
    pub fn record_good_model(&self, model: &str) {
        self.write().last_good_model = Some(model.to_string());
    }

    /// Probe candidates through the SDK transport and bind the first model
    /// that returns non-empty text within the probe timeout.
    ///
    /// `override_model` (an explicit reinit request) is tried first, then the
    /// last-known-good hint, then the provided candidates. Total failure
    /// leaves the resolver Unbound and is not an error.
    pub async fn bind(&self, candidates: &[String], override_model: Option<&str>) -> bool {
        {
            let mut state = self.write();
            state.initialization_attempted = true;
            state.last_error = None;
            state.bound_model = None;
        }

        let Some(transport) = self.transport.clone() else {
            self.write().last_error = Some(MISSING_KEY_ERROR.to_string());
            warn!("{} - generation disabled", MISSING_KEY_ERROR);
            return false;
        };

        let hint = self.read().last_good_model.clone();
        let mut order: Vec<String> = Vec::with_capacity(candidates.len() + 2);
        for model in override_model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .into_iter()
            .chain(hint)
            .chain(candidates.iter().cloned())
        {
            if !order.contains(&model) {
                order.push(model);
            }
        }

        info!(candidates = ?order, "Probing models for SDK binding");

        for model in &order {
            match with_timeout(
                self.probe_timeout,
                transport.generate(model, PROBE_PROMPT),
                "model probe",
            )
            .await
            {
                Ok(text) if !text.trim().is_empty() => {
                    info!(%model, "Model probe succeeded, binding SDK client");
                    self.write().bound_model = Some(model.clone());
                    return true;
                }
                Ok(_) => {
                    warn!(%model, "Model probe returned empty response");
                    self.write().last_error = Some(format!("{}: empty response", model));
                }
                Err(e) => {
                    warn!(%model, error = %e, "Model probe failed");
                    self.write().last_error = Some(format!("{}: {}", model, e));
                }
            }
        }

        self.write().last_error = Some("No working models found".to_string());
        false
    }

    /// Status-endpoint view
    pub fn snapshot(&self) -> ResolverSnapshot {
        let state = self.read();
        ResolverSnapshot {
            bound: state.bound_model.is_some(),
            current_model: state
                .bound_model
                .clone()
                .or_else(|| state.last_good_model.clone()),
            initialization_attempted: state.initialization_attempted,
            last_error: state.last_error.clone(),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, ResolverState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, ResolverState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::transport::GenerationBackend;
    use crate::types::{Result, ScribeError};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend scripted per-model: Some(text) responds, None errors
    struct ScriptedBackend {
        responses: Vec<(String, Option<String>)>,
        calls: AtomicUsize,
    }

    impl ScriptedBackend {
        fn new(responses: Vec<(&str, Option<&str>)>) -> Self {
            Self {
                responses: responses
                    .into_iter()
                    .map(|(m, r)| (m.to_string(), r.map(str::to_string)))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        async fn generate(&self, model: &str, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.responses.iter().find(|(m, _)| m == model) {
                Some((_, Some(text))) => Ok(text.clone()),
                Some((_, None)) => Err(ScribeError::vendor(model, "scripted failure")),
                None => Err(ScribeError::vendor(model, "unknown model")),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn models(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_bind_picks_first_working_model() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            ("model-a", None),
            ("model-b", Some("Hello")),
            ("model-c", Some("Hello")),
        ]));
        let resolver = BackendResolver::new(Some(backend.clone()), Duration::from_secs(1));

        let bound = resolver
            .bind(&models(&["model-a", "model-b", "model-c"]), None)
            .await;

        assert!(bound);
        assert_eq!(resolver.bound_model().as_deref(), Some("model-b"));
        // model-c is never probed once a binding is found
        assert_eq!(backend.call_count(), 2);
        // The failed candidate's error is retained for diagnostics
        assert!(resolver.last_error().unwrap().starts_with("model-a"));
    }

    #[tokio::test]
    async fn test_bind_without_transport_reports_missing_key() {
        let resolver = BackendResolver::new(None, Duration::from_secs(1));

        assert!(!resolver.bind(&models(&["model-a"]), None).await);
        assert!(!resolver.is_bound());
        assert!(resolver.initialization_attempted());
        assert_eq!(resolver.last_error().as_deref(), Some(MISSING_KEY_ERROR));
    }

    #[tokio::test]
    async fn test_bind_total_failure_leaves_unbound() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            ("model-a", None),
            ("model-b", Some("")),
        ]));
        let resolver = BackendResolver::new(Some(backend), Duration::from_secs(1));

        assert!(!resolver.bind(&models(&["model-a", "model-b"]), None).await);
        assert!(!resolver.is_bound());
        assert_eq!(
            resolver.last_error().as_deref(),
            Some("No working models found")
        );
    }

    #[tokio::test]
    async fn test_override_model_is_probed_first() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            ("forced", Some("ok")),
            ("model-a", Some("ok")),
        ]));
        let resolver = BackendResolver::new(Some(backend.clone()), Duration::from_secs(1));

        assert!(resolver.bind(&models(&["model-a"]), Some("forced")).await);
        assert_eq!(resolver.bound_model().as_deref(), Some("forced"));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_rest_hint_updates_current_model_but_not_binding() {
        let resolver = BackendResolver::new(None, Duration::from_secs(1));
        resolver.record_good_model("model-b");

        assert!(!resolver.is_bound());
        assert_eq!(resolver.current_model().as_deref(), Some("model-b"));
        assert!(resolver.bound_model().is_none());
    }

    #[tokio::test]
    async fn test_unbind_keeps_hint() {
        let backend = Arc::new(ScriptedBackend::new(vec![("model-a", Some("hi"))]));
        let resolver = BackendResolver::new(Some(backend), Duration::from_secs(1));

        assert!(resolver.bind(&models(&["model-a"]), None).await);
        resolver.record_good_model("model-a");
        resolver.unbind();

        assert!(!resolver.is_bound());
        assert_eq!(resolver.current_model().as_deref(), Some("model-a"));
    }
}
