use std::{fs, path::Path};

use serde::Deserialize;

/// Default generative-language API base.
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default backend transport timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 60_000;
/// Model routed to when gateway mode is enabled without an explicit model.
const DEFAULT_GATEWAY_MODEL: &str = "google/gemini-3.1-pro-preview";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// backend transport config
    pub backend: BackendConfig,
    /// model routing config
    pub models: ModelsConfig,
    /// number of async worker threads, range [1, 32768), defaults to 16
    pub async_worker_thread_number: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// base url of the generation API
    pub api_base: String,
    /// API key sent with every call
    pub api_key: String,
    /// per-call transport timeout in milliseconds
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelsConfig {
    /// preferred model, tried before the fixed fallback list
    pub primary: Option<String>,
    /// route every request through a single gateway-selected model
    pub gateway: bool,
    /// model used in gateway mode
    pub gateway_model: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            models: ModelsConfig::default(),
            async_worker_thread_number: 16,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: String::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl ModelsConfig {
    /// The model used when gateway mode is enabled.
    pub fn gateway_model(&self) -> String {
        self.gateway_model.clone().unwrap_or_else(|| DEFAULT_GATEWAY_MODEL.to_string())
    }
}

impl Config {
    pub fn create<T: AsRef<Path>>(path: T) -> Self {
        let data = fs::read_to_string(path.as_ref()).expect(&format!("failed to load config file {:?}", path.as_ref()));

        Self::load_from_str(data.as_str())
    }

    pub fn load_from_str(toml_str: &str) -> Self {
        let config = toml::from_str::<Config>(toml_str).expect("failed to parse the toml str");
        config
    }
}
