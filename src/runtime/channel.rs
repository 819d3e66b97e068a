//! Notification channel between the session and the UI collaborator.
//!
//! Generation events are broadcast to every registered handler; handlers
//! can filter by output node id with a glob pattern.

use std::sync::{Arc, RwLock};

use futures::future::BoxFuture;
use tokio::runtime::Runtime;

use crate::{
    ShareLock,
    common::{BroadcastQueue, Shutdown},
    events::{Event, Message},
};

macro_rules! dispatch_event {
    ($handles:expr, $(&$item:ident), +) => {
        let handlers = $handles.read().unwrap();
        for handle in handlers.iter() {
            (handle)($(&$item),+);
        }
    };
}

macro_rules! dispatch_event_async {
    ($handles:expr, $(&$item:ident), +) => {
        let handles = $handles.clone();

        tokio::spawn(async move {
            let handlers = handles.read().unwrap().clone();
            for handle in handlers.iter() {
                (handle)($(&$item),+).await;
            }
        });
    };
}

const EVENT_QUEUE_SIZE: usize = 2048;

pub type GenerationEventHandle = Arc<dyn Fn(&Event<Message>) + Send + Sync>;
pub type GenerationEventHandleAsync = Arc<dyn Fn(&Event<Message>) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ChannelOptions {
    /// use the glob pattern to match the output node id
    /// eg. nid1*
    pub nid: String,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            nid: "*".to_string(),
        }
    }
}

impl ChannelOptions {
    pub fn with_nid(nid: String) -> Self {
        Self {
            nid,
        }
    }
}

#[derive(Clone)]
pub struct Channel {
    event_queue: Arc<BroadcastQueue<Event<Message>>>,

    events: ShareLock<Vec<GenerationEventHandle>>,
    events_async: ShareLock<Vec<GenerationEventHandleAsync>>,

    runtime: Arc<Runtime>,
    shutdown: Arc<Shutdown>,
}

impl Channel {
    pub(crate) fn new(runtime: Arc<Runtime>) -> Self {
        Self {
            event_queue: BroadcastQueue::new(EVENT_QUEUE_SIZE),
            events: Arc::new(RwLock::new(Vec::new())),
            events_async: Arc::new(RwLock::new(Vec::new())),
            runtime,
            shutdown: Arc::new(Shutdown::new()),
        }
    }

    pub(crate) fn event_queue(&self) -> Arc<BroadcastQueue<Event<Message>>> {
        self.event_queue.clone()
    }

    pub(crate) fn listen(&self) {
        let mut event_queue = self.event_queue.subscribe();
        let events = self.events.clone();
        let events_async = self.events_async.clone();

        let shutdown = self.shutdown.clone();
        self.runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.wait() => break,
                    Ok(e) = event_queue.recv() => {
                        tracing::trace!(nid = %e.nid, event = e.event.str(), "dispatching generation event");
                        let evt = e.clone();
                        dispatch_event!(events, &evt);
                        dispatch_event_async!(events_async, &e);
                    }
                }
            }
        });
    }

    pub(crate) fn shutdown(&self) {
        self.shutdown.shutdown();
    }
}

/// Handler registration with glob filtering by output node id.
#[derive(Clone)]
pub struct ChannelEvent {
    channel: Arc<Channel>,

    glob: globset::GlobMatcher,
}

impl ChannelEvent {
    pub fn channel(
        channel: Arc<Channel>,
        options: ChannelOptions,
    ) -> Self {
        Self {
            channel,
            glob: globset::Glob::new(&options.nid).unwrap().compile_matcher(),
        }
    }

    /// Register a handler for successful generations.
    pub fn on_succeeded(
        &self,
        f: impl Fn(&Event<Message>) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.events.write().unwrap().push(Arc::new(move |e| {
            if e.event.is_succeeded() && glob.is_match(&e.nid) {
                f(e);
            }
        }));
    }

    /// Register a handler for failed generations.
    pub fn on_failed(
        &self,
        f: impl Fn(&Event<Message>) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.events.write().unwrap().push(Arc::new(move |e| {
            if e.event.is_failed() && glob.is_match(&e.nid) {
                f(e);
            }
        }));
    }

    /// Register a handler for every generation event.
    pub fn on_event(
        &self,
        f: impl Fn(&Event<Message>) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.events.write().unwrap().push(Arc::new(move |e| {
            if glob.is_match(&e.nid) {
                f(e);
            }
        }));
    }

    /// Register an async handler for every generation event.
    pub fn on_event_async<F>(
        &self,
        f: F,
    ) where
        F: Fn(&Event<Message>) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let glob = self.glob.clone();

        self.channel.events_async.write().unwrap().push(Arc::new(move |e| {
            if glob.is_match(&e.nid) {
                f(e)
            } else {
                Box::pin(async {})
            }
        }));
    }
}
