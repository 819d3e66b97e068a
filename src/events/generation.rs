use crate::AnimflowError;

/// Lifecycle events of one generation run against an output node.
#[derive(Debug, Clone)]
pub enum GenerationEvent {
    /// Generation started; carries the start timestamp in milliseconds.
    Loading(i64),
    Succeeded(GenerationSucceeded),
    Failed(GenerationFailed),
}

impl GenerationEvent {
    pub fn str(&self) -> &str {
        match self {
            GenerationEvent::Loading(_) => "Loading",
            GenerationEvent::Succeeded(_) => "Succeeded",
            GenerationEvent::Failed(_) => "Failed",
        }
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, GenerationEvent::Succeeded(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, GenerationEvent::Failed(_))
    }
}

/// Payload of a successful generation event.
#[derive(Debug, Clone)]
pub struct GenerationSucceeded {
    /// The candidate that produced the output.
    pub model_used: String,
    /// End timestamp in milliseconds.
    pub finished_at: i64,
}

/// Payload of a failed generation event, the failure surface handed to
/// the notification collaborator.
#[derive(Debug, Clone)]
pub struct GenerationFailed {
    /// Verbatim failure message.
    pub message: String,
    /// The failure was quota/rate-limit classified.
    pub quota_exceeded: bool,
    /// Retry hint extracted from the message, when present.
    pub retry_after_seconds: Option<u64>,
    /// Last-tried model, when the failure came from the backend.
    pub model: Option<String>,
    /// End timestamp in milliseconds.
    pub finished_at: i64,
}

impl GenerationFailed {
    /// Build the failure surface from a terminal error.
    pub fn from_error(
        error: &AnimflowError,
        finished_at: i64,
    ) -> Self {
        match error {
            AnimflowError::Backend {
                model,
                message,
                quota_exceeded,
                retry_after_seconds,
            } => Self {
                message: message.clone(),
                quota_exceeded: *quota_exceeded,
                retry_after_seconds: *retry_after_seconds,
                model: Some(model.clone()),
                finished_at,
            },
            other => Self {
                message: other.to_string(),
                quota_exceeded: false,
                retry_after_seconds: None,
                model: None,
                finished_at,
            },
        }
    }
}
