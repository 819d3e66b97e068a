//! Model fallback engine.
//!
//! Tries an ordered candidate list against the backend, one call at a
//! time. Quota-classified failures advance to the next candidate; any
//! other failure is terminal for the whole request, because it is assumed
//! to reproduce identically on the remaining candidates.

use std::sync::Arc;

use crate::{
    AnimflowError, Result,
    config::Config,
    generate::{
        CandidateList, GenerationOutcome, GenerationRequest,
        backend::GenerationBackend,
        classifier::{ErrorVerdict, classify},
    },
};

/// Routing decided once per session from configuration.
#[derive(Debug, Clone)]
enum RoutingMode {
    /// Exactly one call through the gateway-selected model, no fallback.
    Gateway(String),
    /// Iterate the candidate list, falling back on quota failures.
    Fallback(CandidateList),
}

/// Drives generation calls through the configured routing mode.
pub struct GenerationEngine {
    routing: RoutingMode,
    backend: Arc<dyn GenerationBackend>,
}

impl GenerationEngine {
    pub fn new(
        config: &Config,
        backend: Arc<dyn GenerationBackend>,
    ) -> Self {
        let routing = if config.models.gateway {
            RoutingMode::Gateway(config.models.gateway_model())
        } else {
            RoutingMode::Fallback(CandidateList::assemble(config.models.primary.as_deref()))
        };

        Self {
            routing,
            backend,
        }
    }

    /// Run one generation request to a terminal outcome.
    ///
    /// Success carries the trimmed response text and the model that
    /// produced it; terminal failure is a [`AnimflowError::Backend`]
    /// tagged with the last-tried model and its classification.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutcome> {
        match &self.routing {
            RoutingMode::Gateway(model) => self.invoke_candidate(model, request).await.map_err(|(message, verdict)| Self::terminal(model, message, verdict)),
            RoutingMode::Fallback(candidates) => self.run_fallback(candidates, request).await,
        }
    }

    async fn run_fallback(
        &self,
        candidates: &CandidateList,
        request: &GenerationRequest,
    ) -> Result<GenerationOutcome> {
        let mut last_error: Option<(String, String, ErrorVerdict)> = None;

        for candidate in candidates.iter() {
            tracing::debug!(model = candidate, "invoking backend candidate");

            match self.invoke_candidate(candidate, request).await {
                Ok(outcome) => return Ok(outcome),
                Err((message, verdict)) => {
                    let advance = verdict.is_quota_exceeded;
                    last_error = Some((candidate.to_string(), message, verdict));
                    if !advance {
                        // non-quota failures reproduce on siblings, stop here
                        break;
                    }
                    tracing::debug!(model = candidate, "quota exhausted, trying next candidate");
                }
            }
        }

        match last_error {
            Some((model, message, verdict)) => Err(Self::terminal(&model, message, verdict)),
            // the loop never ran: the effective candidate list is empty
            None => Err(AnimflowError::Config("no candidate models configured".to_string())),
        }
    }

    /// One backend call; failures come back as (verbatim message, verdict).
    async fn invoke_candidate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> std::result::Result<GenerationOutcome, (String, ErrorVerdict)> {
        match self.backend.invoke(model, request).await {
            Ok(text) => Ok(GenerationOutcome {
                output_content: text.trim().to_string(),
                model_used: model.to_string(),
            }),
            Err(err) => {
                let message = match err.backend_message() {
                    Some(message) => message.to_string(),
                    None => err.to_string(),
                };
                let verdict = classify(&message);
                Err((message, verdict))
            }
        }
    }

    fn terminal(
        model: &str,
        message: String,
        verdict: ErrorVerdict,
    ) -> AnimflowError {
        AnimflowError::Backend {
            model: model.to_string(),
            message,
            quota_exceeded: verdict.is_quota_exceeded,
            retry_after_seconds: verdict.retry_after_seconds,
        }
    }
}
