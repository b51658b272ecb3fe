use crate::config::Config;
use crate::generation::generator::Generator;
use crate::jobs::JobFetcher;
use crate::llm_client::LlmClient;

/// Shared application state injected into all route handlers via Axum extractors.
/// Every field is cheap to clone; nothing here outlives a request except clients.
#[derive(Clone)]
pub struct AppState {
    pub llm: LlmClient,
    pub fetcher: JobFetcher,
    /// Orchestrator; holds its own handle to `llm`.
    pub generator: Generator,
    pub config: Config,
}
