use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};

use crate::{
    Result, Session,
    config::Config,
    generate::{GenerationBackend, HttpBackend},
};

/// Builder assembling a [`Session`] from configuration, an optional
/// external runtime and an injectable backend.
pub struct SessionBuilder {
    config: Config,
    rt: Option<Arc<Runtime>>,
    backend: Option<Arc<dyn GenerationBackend>>,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            config: Config::default(),
            rt: None,
            backend: None,
        }
    }
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(
        mut self,
        config: Config,
    ) -> Self {
        self.config = config;
        self
    }

    pub fn runtime(
        mut self,
        runtime: Arc<Runtime>,
    ) -> Self {
        self.rt = Some(runtime);
        self
    }

    /// Inject a custom generation backend, replacing the HTTP one.
    pub fn backend(
        mut self,
        backend: Arc<dyn GenerationBackend>,
    ) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn build(&self) -> Result<Session> {
        let runtime = if self.rt.is_some() {
            self.rt.as_ref().unwrap().clone()
        } else {
            Arc::new(Builder::new_multi_thread().worker_threads(self.config.async_worker_thread_number.into()).enable_all().build().unwrap())
        };
        let backend: Arc<dyn GenerationBackend> = match &self.backend {
            Some(backend) => backend.clone(),
            None => Arc::new(HttpBackend::new(&self.config.backend)),
        };
        let session = Session::new_with_parts(&self.config, runtime, backend);

        Ok(session)
    }
}
