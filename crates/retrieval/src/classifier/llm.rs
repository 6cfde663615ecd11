//! LLM backend: asks a chat model for a JSON intent verdict.
//!
//! Works with any [`Provider`], hosted or local. The model is asked for
//! `{"type": ..., "confidence": ..., "reasoning": ...}`; code fences and
//! prose around the object are tolerated, anything else is unparsable.

use std::sync::Arc;

use async_trait::async_trait;
use recall_core::classification::QueryType;
use recall_core::error::ClassificationError;
use recall_core::message::Message;
use recall_core::provider::{Provider, ProviderRequest};
use tracing::{debug, warn};

use super::{ClassifierBackend, IntentVerdict};

const SYSTEM_PROMPT: &str = "\
You classify questions asked to an AI coding assistant so the right memory \
stores can be searched. Pick exactly one type:

- procedural: continuing or performing work (\"continue\", \"implement\", \"add\", \"build\", \"fix\")
- factual: general knowledge (\"what is\", \"how does X work\"), not about this codebase's structure
- architectural: code structure (\"what imports\", \"what depends on\", \"who calls\")
- user: the user's own preferences or expertise (\"my preferred\", \"my expertise\")
- historical: past decisions (\"why did we choose\", \"what was decided\")

If none fits, use \"unknown\".

Reply with a single JSON object and nothing else:
{\"type\": \"<type>\", \"confidence\": <0.0-1.0>, \"reasoning\": \"<one sentence>\"}";

const DEFAULT_CONFIDENCE: f32 = 0.5;

pub struct LlmBackend {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
}

impl LlmBackend {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn request(&self, query: &str) -> ProviderRequest {
        ProviderRequest {
            model: self.model.clone(),
            messages: vec![Message::system(SYSTEM_PROMPT), Message::user(query)],
            temperature: self.temperature,
            max_tokens: Some(200),
        }
    }
}

/// Pull the verdict object out of a model reply.
pub fn parse_verdict(reply: &str) -> Result<IntentVerdict, ClassificationError> {
    let json = extract_object(reply)
        .ok_or_else(|| ClassificationError::Unparsable(truncate(reply)))?;
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| ClassificationError::Unparsable(format!("{e}: {}", truncate(reply))))?;

    let type_str = value
        .get("type")
        .and_then(|t| t.as_str())
        .ok_or_else(|| ClassificationError::Unparsable(format!("missing string 'type': {}", truncate(reply))))?;

    let query_type = match type_str.parse::<QueryType>() {
        Ok(t) => Some(t),
        Err(_) => {
            if !type_str.eq_ignore_ascii_case("unknown") {
                warn!(query_type = type_str, "Classifier returned an unrecognised type");
            }
            None
        }
    };

    let confidence = value
        .get("confidence")
        .and_then(|c| c.as_f64())
        .map_or(DEFAULT_CONFIDENCE, |c| c as f32);

    let reasoning = value
        .get("reasoning")
        .and_then(|r| r.as_str())
        .unwrap_or_default()
        .to_string();

    Ok(IntentVerdict {
        query_type,
        confidence,
        reasoning,
    })
}

/// The outermost `{ ... }` span, ignoring fences and surrounding prose.
fn extract_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

fn truncate(reply: &str) -> String {
    const MAX: usize = 200;
    match reply.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}…", &reply[..idx]),
        None => reply.to_string(),
    }
}

#[async_trait]
impl ClassifierBackend for LlmBackend {
    fn name(&self) -> &str {
        "llm"
    }

    async fn init(&self) -> Result<(), ClassificationError> {
        match self.provider.health_check().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(ClassificationError::InitFailed {
                backend: format!("llm/{}", self.provider.name()),
                reason: "health check reported the provider unavailable".into(),
            }),
            Err(e) => Err(ClassificationError::InitFailed {
                backend: format!("llm/{}", self.provider.name()),
                reason: e.to_string(),
            }),
        }
    }

    async fn detect(&self, query: &str) -> Result<IntentVerdict, ClassificationError> {
        let response = self.provider.complete(self.request(query)).await?;
        debug!(
            provider = self.provider.name(),
            model = %response.model,
            reply = %response.message.content,
            "Classifier reply"
        );
        parse_verdict(&response.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedProvider;
    use recall_core::error::ProviderError;

    #[test]
    fn plain_json_reply() {
        let v = parse_verdict(r#"{"type":"historical","confidence":0.92,"reasoning":"asks why"}"#).unwrap();
        assert_eq!(v.query_type, Some(QueryType::Historical));
        assert!((v.confidence - 0.92).abs() < 1e-6);
        assert_eq!(v.reasoning, "asks why");
    }

    #[test]
    fn fenced_reply_with_prose() {
        let reply = "Sure! Here you go:\n```json\n{\"type\": \"Architectural\", \"confidence\": 0.7}\n```";
        let v = parse_verdict(reply).unwrap();
        assert_eq!(v.query_type, Some(QueryType::Architectural));
        assert_eq!(v.reasoning, "");
    }

    #[test]
    fn unknown_type_is_undecided() {
        let v = parse_verdict(r#"{"type":"unknown","confidence":0.2}"#).unwrap();
        assert_eq!(v.query_type, None);
        let v = parse_verdict(r#"{"type":"philosophical"}"#).unwrap();
        assert_eq!(v.query_type, None);
        assert_eq!(v.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn unparsable_replies() {
        for reply in [
            "I think this is procedural.",
            "{not json}",
            r#"{"confidence": 0.9}"#,
            r#"{"type": 3}"#,
            "",
        ] {
            assert!(
                matches!(parse_verdict(reply), Err(ClassificationError::Unparsable(_))),
                "accepted {reply:?}"
            );
        }
    }

    #[tokio::test]
    async fn detect_round_trip_through_provider() {
        let provider = Arc::new(ScriptedProvider::replies(&[
            r#"{"type":"procedural","confidence":0.95,"reasoning":"continue verb"}"#,
        ]));
        let backend = LlmBackend::new(provider.clone(), "llama3.2");
        let v = backend.detect("continue the auth refactor").await.unwrap();
        assert_eq!(v.query_type, Some(QueryType::Procedural));

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "llama3.2");
        assert_eq!(requests[0].messages.len(), 2);
        assert_eq!(requests[0].messages[1].content, "continue the auth refactor");
    }

    #[tokio::test]
    async fn provider_error_becomes_backend_error() {
        let provider = Arc::new(ScriptedProvider::failing(ProviderError::Network("refused".into())));
        let backend = LlmBackend::new(provider, "m");
        let err = backend.detect("x").await.unwrap_err();
        assert!(matches!(err, ClassificationError::Backend(ProviderError::Network(_))));
    }

    #[tokio::test]
    async fn init_runs_health_check() {
        let healthy = LlmBackend::new(Arc::new(ScriptedProvider::replies(&[])), "m");
        assert!(healthy.init().await.is_ok());

        let down = LlmBackend::new(Arc::new(ScriptedProvider::unhealthy()), "m");
        assert!(matches!(
            down.init().await,
            Err(ClassificationError::InitFailed { .. })
        ));
    }
}
