pub mod environment;
pub mod extract;
pub mod fetch;
pub mod limiter;
pub mod logging;
pub mod nlp;
pub mod pipeline;
pub mod portfolio;
pub mod store;
pub mod summarize;
pub mod types;

pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_LLM_REQUEST: &str = "llm_request";
pub const TARGET_PIPELINE: &str = "pipeline";

/// Sentinel stored in `Article::full_text` when extraction failed.
/// Persisted verbatim in the news cache, so treat it as part of the
/// on-disk format.
pub const FULL_TEXT_NOT_FOUND: &str = "Full article text not found.";
