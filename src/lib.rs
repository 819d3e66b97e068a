//! # Animflow
//!
//! Animflow is a lightweight node-chain engine for AI-assisted SVG
//! animation generation. It is designed to be embedded behind a visual
//! canvas application: the UI owns node placement and rendering, Animflow
//! owns the chain semantics and the generation calls.
//!
//! ## Core Features
//!
//! - **Typed Node Chain**: source asset, instruction and generation output
//!   nodes connected by directed edges, with kind-checked payload updates
//! - **Chain Resolution**: locate the upstream/downstream collaborators a
//!   generation needs from any node in the chain
//! - **Model Fallback**: try an ordered candidate list, advancing past
//!   quota-classified failures and failing fast on everything else
//! - **Async Execution**: powered by `tokio`, with independent output nodes
//!   generating concurrently
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use animflow::{GraphModel, SessionBuilder};
//!
//! let session = SessionBuilder::new().build().unwrap();
//! session.launch();
//!
//! // Load a chain and drive a generation through it
//! let model = GraphModel::from_json(json_str)?;
//! session.load_graph(&model)?;
//! let output_id = session.trigger_from_instruction(None)?;
//! ```

mod builder;
mod common;
mod config;
mod dispatcher;
mod error;
mod events;
mod generate;
mod graph;
mod model;
mod runtime;
mod session;
mod utils;

use std::sync::{Arc, RwLock};

pub use builder::SessionBuilder;
pub use config::{BackendConfig, Config, ModelsConfig};
pub use error::AnimflowError;
pub use events::{Event, GenerationEvent, GenerationFailed, GenerationSucceeded, Message};
pub use generate::{
    CandidateList, ErrorVerdict, GenerationBackend, GenerationEngine, GenerationOutcome, GenerationRequest, HttpBackend, ModelInfo, classify,
};
pub use graph::{Edge, EdgeId, GenerationState, Graph, Node, NodeId, NodeKind, NodePayload, OutputPayload, resolver};
pub use model::{EdgeModel, GraphModel, NodeModel};
pub use runtime::{ChannelEvent, ChannelOptions};
pub use session::Session;

/// Result type alias for Animflow operations.
pub type Result<T> = std::result::Result<T, AnimflowError>;

/// Thread-safe shared lock wrapper using Arc<RwLock<T>>.
pub(crate) type ShareLock<T> = Arc<RwLock<T>>;
