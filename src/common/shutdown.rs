//! Shutdown coordination for background loops.

use tokio::sync::watch;

/// One-shot shutdown signal shared between a coordinator and its loops.
///
/// `wait()` resolves once `shutdown()` has been called, including when the
/// call happened before the waiter subscribed.
pub struct Shutdown {
    state: watch::Sender<bool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    /// create a new shutdown coordinator
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);

        Self {
            state: tx,
        }
    }

    /// signal shutdown to all waiters
    pub fn shutdown(&self) {
        let _ = self.state.send_replace(true);
    }

    /// wait until shutdown is signaled
    pub fn wait(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.state.subscribe();
        async move {
            let _ = rx.wait_for(|terminated| *terminated).await;
        }
    }
}
