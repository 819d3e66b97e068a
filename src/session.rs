//! Editing session - the main entry point for Animflow.
//!
//! The session owns the chain graph for its lifetime, together with the
//! notification channel, the generation dispatcher and the tokio runtime
//! they run on. The UI collaborator mutates the graph through the handle
//! returned by [`Session::graph`] and subscribes to generation events
//! through [`Session::channel`]; ambient global state is never used.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::runtime::Runtime;

use crate::{
    AnimflowError, Result,
    config::Config,
    dispatcher::Dispatcher,
    generate::{GenerationBackend, GenerationEngine, ModelInfo},
    graph::{Graph, NodeId},
    model::GraphModel,
    runtime::Channel,
};

/// The editing session.
///
/// # Example
///
/// ```rust,ignore
/// let session = SessionBuilder::new().config(config).build()?;
/// session.launch();
///
/// session.load_graph(&GraphModel::from_json(json_str)?)?;
/// let output_id = session.trigger_from_instruction(None)?;
///
/// // ... the output node payload and the channel carry the outcome
/// session.shutdown();
/// ```
pub struct Session {
    /// The chain being edited.
    graph: Arc<Graph>,
    /// Generation dispatcher.
    dispatcher: Arc<Dispatcher>,
    /// Notification channel for generation events.
    channel: Arc<Channel>,
    /// Backend serving generation calls.
    backend: Arc<dyn GenerationBackend>,
    /// Flag indicating if the session is running.
    running: Arc<AtomicBool>,
    /// Tokio runtime for async task execution.
    runtime: Arc<Runtime>,
}

impl Session {
    /// Creates a session from parts assembled by the builder.
    pub(crate) fn new_with_parts(
        config: &Config,
        runtime: Arc<Runtime>,
        backend: Arc<dyn GenerationBackend>,
    ) -> Self {
        let graph = Arc::new(Graph::new());
        let channel = Arc::new(Channel::new(runtime.clone()));
        let engine = Arc::new(GenerationEngine::new(config, backend.clone()));
        let dispatcher = Arc::new(Dispatcher::new(graph.clone(), engine, channel.clone(), runtime.clone()));

        Self {
            graph,
            dispatcher,
            channel,
            backend,
            running: Arc::new(AtomicBool::new(false)),
            runtime,
        }
    }

    /// Starts the session: the channel begins dispatching events and the
    /// dispatcher begins consuming generation jobs.
    pub fn launch(&self) {
        if self.running.swap(true, Ordering::Relaxed) {
            return;
        }

        self.channel.listen();
        self.dispatcher.start();
    }

    /// Gracefully shuts down the session. Backend calls already issued
    /// run to completion; queued jobs are dropped.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::Relaxed) {
            return;
        }

        self.dispatcher.stop();
        self.channel.shutdown();
    }

    /// Replace the session's chain with a parsed graph model.
    pub fn load_graph(
        &self,
        model: &GraphModel,
    ) -> Result<()> {
        self.graph.load_model(model)
    }

    /// The chain handle for the UI collaborator's reads and mutations.
    pub fn graph(&self) -> Arc<Graph> {
        self.graph.clone()
    }

    /// Returns a reference to the event channel.
    pub fn channel(&self) -> Arc<Channel> {
        self.channel.clone()
    }

    /// Trigger a generation from an instruction node (the first-inserted
    /// one when no id is given). Returns the output node id.
    pub fn trigger_from_instruction(
        &self,
        instruction_id: Option<&NodeId>,
    ) -> Result<NodeId> {
        self.ensure_running()?;
        self.dispatcher.trigger_from_instruction(instruction_id)
    }

    /// Re-trigger the generation of an output node.
    pub fn trigger_regeneration(
        &self,
        output_id: &NodeId,
    ) -> Result<NodeId> {
        self.ensure_running()?;
        self.dispatcher.trigger_regeneration(output_id)
    }

    /// List the models the configured backend can serve.
    pub fn available_models(&self) -> Result<Vec<ModelInfo>> {
        self.runtime.block_on(self.backend.list_models())
    }

    fn ensure_running(&self) -> Result<()> {
        if !self.running.load(Ordering::Relaxed) {
            return Err(AnimflowError::Session("Session is not running".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::Mutex,
        time::{Duration, Instant},
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{
        GenerationState, SessionBuilder,
        events::GenerationEvent,
        generate::GenerationRequest,
        runtime::{ChannelEvent, ChannelOptions},
    };

    /// Backend stub replaying scripted results, with an optional delay to
    /// keep generations in flight.
    struct ScriptedBackend {
        script: Mutex<Vec<Result<String>>>,
        delay: Option<Duration>,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                delay: None,
            })
        }

        fn slow(
            script: Vec<Result<String>>,
            delay: Duration,
        ) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                delay: Some(delay),
            })
        }
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        async fn invoke(
            &self,
            _model: &str,
            _request: &GenerationRequest,
        ) -> Result<String> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                return Err(AnimflowError::Backend {
                    model: String::new(),
                    message: "script exhausted".to_string(),
                    quota_exceeded: false,
                    retry_after_seconds: None,
                });
            }
            script.remove(0)
        }
    }

    const CHAIN_JSON: &str = r#"{
        "nodes": [
            { "id": "src", "kind": "source_asset", "payload": { "markup": "<svg/>" } },
            { "id": "ins", "kind": "instruction", "payload": { "prompt": "make it spin" } },
            { "id": "out", "kind": "generation_output" }
        ],
        "edges": [
            { "source": "src", "target": "ins" },
            { "source": "ins", "target": "out" }
        ]
    }"#;

    fn session_with(backend: Arc<dyn GenerationBackend>) -> Session {
        let session = SessionBuilder::new().backend(backend).build().unwrap();
        session.launch();
        session
    }

    fn wait_for_state(
        session: &Session,
        nid: &NodeId,
        state: GenerationState,
    ) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if session.graph().generation_state(nid) == Some(state) {
                return;
            }
            if Instant::now() > deadline {
                panic!("node {} never reached {:?}", nid, state);
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    // ==================== end-to-end trigger tests ====================

    #[test]
    fn test_trigger_from_instruction_succeeds() {
        let session = session_with(ScriptedBackend::new(vec![Ok("  <svg>spin</svg>  ".to_string())]));
        session.load_graph(&GraphModel::from_json(CHAIN_JSON).unwrap()).unwrap();

        let output_id = session.trigger_from_instruction(None).unwrap();
        assert_eq!(output_id, "out");

        wait_for_state(&session, &output_id, GenerationState::Succeeded);

        let node = session.graph().get_node(&output_id).unwrap();
        let output = node.output().unwrap();
        assert_eq!(output.output_content.as_deref(), Some("<svg>spin</svg>"));
        assert!(output.chosen_model.is_some());

        session.shutdown();
    }

    #[test]
    fn test_trigger_without_source_leaves_output_idle() {
        let session = session_with(ScriptedBackend::new(vec![]));
        session
            .load_graph(
                &GraphModel::from_json(
                    r#"{
                "nodes": [
                    { "id": "ins", "kind": "instruction", "payload": { "prompt": "spin" } },
                    { "id": "out", "kind": "generation_output" }
                ],
                "edges": [ { "source": "ins", "target": "out" } ]
            }"#,
                )
                .unwrap(),
            )
            .unwrap();

        let result = session.trigger_from_instruction(None);
        assert_eq!(result, Err(AnimflowError::MissingSource));
        assert_eq!(session.graph().generation_state(&"out".to_string()), Some(GenerationState::Idle));

        session.shutdown();
    }

    #[test]
    fn test_trigger_without_instruction() {
        let session = session_with(ScriptedBackend::new(vec![]));
        session
            .load_graph(
                &GraphModel::from_json(
                    r#"{
                "nodes": [ { "id": "src", "kind": "source_asset" } ],
                "edges": []
            }"#,
                )
                .unwrap(),
            )
            .unwrap();

        let result = session.trigger_from_instruction(None);
        assert_eq!(result, Err(AnimflowError::MissingInstruction));

        session.shutdown();
    }

    #[test]
    fn test_trigger_without_output() {
        let session = session_with(ScriptedBackend::new(vec![]));
        session
            .load_graph(
                &GraphModel::from_json(
                    r#"{
                "nodes": [
                    { "id": "src", "kind": "source_asset", "payload": { "markup": "<svg/>" } },
                    { "id": "ins", "kind": "instruction", "payload": { "prompt": "spin" } }
                ],
                "edges": [ { "source": "src", "target": "ins" } ]
            }"#,
                )
                .unwrap(),
            )
            .unwrap();

        let result = session.trigger_from_instruction(None);
        assert_eq!(result, Err(AnimflowError::MissingOutput));

        session.shutdown();
    }

    #[test]
    fn test_empty_prompt_is_a_validation_error() {
        let session = session_with(ScriptedBackend::new(vec![]));
        session
            .load_graph(
                &GraphModel::from_json(
                    r#"{
                "nodes": [
                    { "id": "src", "kind": "source_asset", "payload": { "markup": "<svg/>" } },
                    { "id": "ins", "kind": "instruction", "payload": { "prompt": "   " } },
                    { "id": "out", "kind": "generation_output" }
                ],
                "edges": [
                    { "source": "src", "target": "ins" },
                    { "source": "ins", "target": "out" }
                ]
            }"#,
                )
                .unwrap(),
            )
            .unwrap();

        let result = session.trigger_from_instruction(None);
        assert!(matches!(result, Err(AnimflowError::Validation(_))));
        assert_eq!(session.graph().generation_state(&"out".to_string()), Some(GenerationState::Idle));

        session.shutdown();
    }

    #[test]
    fn test_regeneration_failure_preserves_last_output() {
        let session = session_with(ScriptedBackend::new(vec![
            Ok("<svg>v1</svg>".to_string()),
            Err(AnimflowError::Backend {
                model: "gemini-3.1-pro-preview".to_string(),
                message: "invalid argument: prompt too long".to_string(),
                quota_exceeded: false,
                retry_after_seconds: None,
            }),
        ]));
        session.load_graph(&GraphModel::from_json(CHAIN_JSON).unwrap()).unwrap();

        let output_id = session.trigger_from_instruction(None).unwrap();
        wait_for_state(&session, &output_id, GenerationState::Succeeded);

        session.trigger_regeneration(&output_id).unwrap();
        wait_for_state(&session, &output_id, GenerationState::Failed);

        let node = session.graph().get_node(&output_id).unwrap();
        assert_eq!(node.output().unwrap().output_content.as_deref(), Some("<svg>v1</svg>"));

        session.shutdown();
    }

    #[test]
    fn test_second_trigger_while_loading_is_rejected() {
        let session = session_with(ScriptedBackend::slow(vec![Ok("<svg/>".to_string())], Duration::from_millis(300)));
        session.load_graph(&GraphModel::from_json(CHAIN_JSON).unwrap()).unwrap();

        let output_id = session.trigger_from_instruction(None).unwrap();
        let second = session.trigger_regeneration(&output_id);
        assert!(matches!(second, Err(AnimflowError::Node(_))));

        wait_for_state(&session, &output_id, GenerationState::Succeeded);
        session.shutdown();
    }

    #[test]
    fn test_trigger_before_launch_is_rejected() {
        let session = SessionBuilder::new().backend(ScriptedBackend::new(vec![])).build().unwrap();
        let result = session.trigger_from_instruction(None);
        assert!(matches!(result, Err(AnimflowError::Session(_))));
    }

    #[test]
    fn test_model_listing_not_supported_by_stub_backend() {
        let session = session_with(ScriptedBackend::new(vec![]));
        let result = session.available_models();
        assert!(matches!(result, Err(AnimflowError::Session(_))));
        session.shutdown();
    }

    // ==================== event delivery tests ====================

    #[test]
    fn test_failure_event_carries_classification() {
        // every candidate fails with the same quota message, exhausting the list
        let quota_failure: Result<String> = Err(AnimflowError::Backend {
            model: String::new(),
            message: "Error 429: RESOURCE_EXHAUSTED, retry in 3.2s".to_string(),
            quota_exceeded: false,
            retry_after_seconds: None,
        });
        let session = session_with(ScriptedBackend::new(vec![quota_failure; 5]));
        session.load_graph(&GraphModel::from_json(CHAIN_JSON).unwrap()).unwrap();

        let (tx, rx) = std::sync::mpsc::channel();
        ChannelEvent::channel(session.channel(), ChannelOptions::default()).on_failed(move |e| {
            if let GenerationEvent::Failed(failed) = &e.event {
                let _ = tx.send(failed.clone());
            }
        });

        let output_id = session.trigger_from_instruction(None).unwrap();
        let failed = rx.recv_timeout(Duration::from_secs(5)).unwrap();

        assert_eq!(failed.model.as_deref(), Some("gemini-flash-latest"));
        assert!(failed.quota_exceeded);
        assert_eq!(failed.retry_after_seconds, Some(4));
        assert!(failed.message.contains("RESOURCE_EXHAUSTED"));

        wait_for_state(&session, &output_id, GenerationState::Failed);
        session.shutdown();
    }

    #[test]
    fn test_success_event_reaches_async_handler() {
        let session = session_with(ScriptedBackend::new(vec![Ok("<svg>ok</svg>".to_string())]));
        session.load_graph(&GraphModel::from_json(CHAIN_JSON).unwrap()).unwrap();

        let (tx, rx) = std::sync::mpsc::channel();
        ChannelEvent::channel(session.channel(), ChannelOptions::with_nid("out".to_string())).on_event_async(move |e| {
            let tx = tx.clone();
            let event_name = e.event.str().to_string();
            Box::pin(async move {
                let _ = tx.send(event_name);
            })
        });

        session.trigger_from_instruction(None).unwrap();

        // async handlers run on spawned tasks, so only membership is stable
        let mut seen = Vec::new();
        while seen.len() < 2 {
            let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            seen.push(name);
        }
        assert!(seen.contains(&"Loading".to_string()));
        assert!(seen.contains(&"Succeeded".to_string()));

        session.shutdown();
    }
}
