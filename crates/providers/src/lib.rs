//! LLM Provider implementations for recall.
//!
//! All providers implement the `recall_core::Provider` trait. The
//! classifier only needs a single non-streaming completion, so one
//! OpenAI-compatible client covers hosted APIs and local model servers.

pub mod factory;
pub mod openai_compat;

pub use factory::{build_from_config, default_base_url};
pub use openai_compat::OpenAiCompatProvider;
