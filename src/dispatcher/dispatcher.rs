//! Generation dispatcher.
//!
//! The dispatcher is the orchestration entry point: it resolves the chain
//! around the trigger node, validates the request, and runs the fallback
//! engine against the output node, updating its state and emitting events
//! along the way.
//!
//! Resolution and validation happen synchronously at trigger time, before
//! any state change, so a failed trigger leaves the output node exactly
//! as it was. The backend outcome is delivered asynchronously through the
//! node payload and the notification channel.

use std::sync::Arc;

use tokio::runtime::Runtime;

use crate::{
    AnimflowError, Result,
    common::{MemCache, Queue, Shutdown},
    events::{Event, GenerationEvent, GenerationFailed, GenerationSucceeded, Message},
    generate::{GenerationEngine, GenerationRequest},
    graph::{Graph, NodeId, NodeKind, resolver},
    runtime::Channel,
    utils,
};

/// Size of the queue feeding generation jobs to the dispatch loop.
const JOB_QUEUE_SIZE: usize = 100;
/// Capacity of the in-flight generation registry.
const IN_FLIGHT_CACHE_SIZE: usize = 1024;

/// One resolved, validated generation ready to run.
struct GenerationJob {
    request: GenerationRequest,
    output: NodeId,
}

/// Generation execution dispatcher.
///
/// Per output node the state machine is
/// `Idle -> Loading -> (Succeeded | Failed) -> Loading -> ...`: terminal
/// states are re-triggerable. Distinct output nodes may have generations in
/// flight concurrently; per node, triggers are serialized through an
/// explicit in-flight guard.
pub struct Dispatcher {
    /// The chain being edited.
    graph: Arc<Graph>,
    /// The fallback engine driving backend calls.
    engine: Arc<GenerationEngine>,
    /// Notification channel to the UI collaborator.
    channel: Arc<Channel>,
    /// Queue for receiving generation jobs.
    job_queue: Arc<Queue<GenerationJob>>,
    /// Tokio runtime for spawning tasks.
    runtime: Arc<Runtime>,
    /// Output nodes with a generation in flight, by start timestamp.
    in_flight: Arc<MemCache<NodeId, i64>>,
    /// Shutdown coordinator.
    shutdown: Arc<Shutdown>,
}

impl Dispatcher {
    /// Creates a new dispatcher over the given chain.
    pub(crate) fn new(
        graph: Arc<Graph>,
        engine: Arc<GenerationEngine>,
        channel: Arc<Channel>,
        runtime: Arc<Runtime>,
    ) -> Self {
        Self {
            graph,
            engine,
            channel,
            job_queue: Queue::new(JOB_QUEUE_SIZE),
            runtime,
            in_flight: Arc::new(MemCache::new(IN_FLIGHT_CACHE_SIZE)),
            shutdown: Arc::new(Shutdown::new()),
        }
    }

    /// Starts the dispatch loop consuming queued generation jobs.
    pub(crate) fn start(&self) {
        let graph = self.graph.clone();
        let engine = self.engine.clone();
        let channel = self.channel.clone();
        let job_queue = self.job_queue.clone();
        let runtime = self.runtime.clone();
        let in_flight = self.in_flight.clone();
        let shutdown = self.shutdown.clone();

        self.runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.wait() => break,

                    job_opt = job_queue.next_async() => {
                        if let Some(job) = job_opt {
                            Self::spawn_job(&graph, &engine, &channel, &runtime, &in_flight, job);
                        }
                    }
                }
            }
        });
    }

    /// Stops the dispatch loop. Jobs already handed to the backend run to
    /// completion; queued jobs are dropped.
    pub(crate) fn stop(&self) {
        self.shutdown.shutdown();
    }

    /// Trigger a generation starting from an instruction node.
    ///
    /// When no id is given the first-inserted instruction node is used.
    /// Resolves the upstream source and the downstream output; each
    /// missing link fails with its own reason (`MissingInstruction`,
    /// `MissingSource`, `MissingOutput`). Returns the output node id the
    /// generation runs against.
    pub fn trigger_from_instruction(
        &self,
        instruction_id: Option<&NodeId>,
    ) -> Result<NodeId> {
        let instruction = match instruction_id {
            Some(id) => match self.graph.node_kind(id) {
                Some(NodeKind::Instruction) => id.clone(),
                _ => return Err(AnimflowError::MissingInstruction),
            },
            None => resolver::resolve_default_instruction(&self.graph)?,
        };

        let source = resolver::resolve_for_instruction(&self.graph, &instruction)?;
        let output = resolver::resolve_downstream_output(&self.graph, &instruction)?;

        self.submit(source, instruction, output)
    }

    /// Re-trigger the generation of an output node, resolving its inputs
    /// backward through the chain.
    pub fn trigger_regeneration(
        &self,
        output_id: &NodeId,
    ) -> Result<NodeId> {
        if self.graph.node_kind(output_id) != Some(NodeKind::GenerationOutput) {
            return Err(AnimflowError::Node(format!("node {} is not a generation output", output_id)));
        }

        let (source, instruction) = resolver::resolve_for_output(&self.graph, output_id)?;
        self.submit(source, instruction, output_id.clone())
    }

    /// Validate the resolved triple and enqueue the job.
    fn submit(
        &self,
        source: NodeId,
        instruction: NodeId,
        output: NodeId,
    ) -> Result<NodeId> {
        let request = self.build_request(&source, &instruction)?;

        if self.in_flight.get(&output).is_some() {
            return Err(AnimflowError::Node(format!("generation already in flight for node {}", output)));
        }
        self.in_flight.set(output.clone(), utils::time::time_millis());

        let job = GenerationJob {
            request,
            output: output.clone(),
        };
        if let Err(err) = self.job_queue.send(job) {
            self.in_flight.remove(&output);
            return Err(err);
        }

        Ok(output)
    }

    /// Snapshot the chain inputs into a validated request.
    fn build_request(
        &self,
        source: &NodeId,
        instruction: &NodeId,
    ) -> Result<GenerationRequest> {
        let source_node = self.graph.get_node(source).ok_or(AnimflowError::Node(format!("node {} not found", source)))?;
        let instruction_node = self.graph.get_node(instruction).ok_or(AnimflowError::Node(format!("node {} not found", instruction)))?;

        let markup = source_node.markup().ok_or(AnimflowError::MissingSource)?;
        let prompt = instruction_node.prompt().ok_or(AnimflowError::MissingInstruction)?;

        GenerationRequest::new(markup, prompt)
    }

    /// Runs a single generation job in a separate task.
    fn spawn_job(
        graph: &Arc<Graph>,
        engine: &Arc<GenerationEngine>,
        channel: &Arc<Channel>,
        runtime: &Arc<Runtime>,
        in_flight: &Arc<MemCache<NodeId, i64>>,
        job: GenerationJob,
    ) {
        let graph = graph.clone();
        let engine = engine.clone();
        let channel = channel.clone();
        let in_flight = in_flight.clone();

        runtime.spawn(async move {
            let nid = job.output.clone();
            let event_queue = channel.event_queue();

            let start_time = utils::time::time_millis();
            if let Err(err) = graph.begin_generation(&nid) {
                // the output node vanished between trigger and dispatch
                tracing::error!(nid = %nid, error = %err, "failed to start generation");
                in_flight.remove(&nid);
                return;
            }
            let _ = event_queue.send(Event::new(&Message {
                nid: nid.clone(),
                event: GenerationEvent::Loading(start_time),
            }));

            let result = engine.generate(&job.request).await;
            let end_time = utils::time::time_millis();

            match result {
                Ok(outcome) => {
                    let _ = graph.complete_generation(&nid, &outcome);
                    let _ = event_queue.send(Event::new(&Message {
                        nid: nid.clone(),
                        event: GenerationEvent::Succeeded(GenerationSucceeded {
                            model_used: outcome.model_used.clone(),
                            finished_at: end_time,
                        }),
                    }));
                }
                Err(err) => {
                    tracing::error!(nid = %nid, error = %err, "generation failed");
                    let _ = graph.fail_generation(&nid);
                    let _ = event_queue.send(Event::new(&Message {
                        nid: nid.clone(),
                        event: GenerationEvent::Failed(GenerationFailed::from_error(&err, end_time)),
                    }));
                }
            }

            in_flight.remove(&nid);
        });
    }
}
