//! Query intents, classification results, and the intent → layer policy table.
//!
//! Which layers a given intent should consult, and how much each one counts,
//! is a tuning decision. It lives in [`LayerPolicy`], a plain data table that
//! configuration can override, rather than in classifier branches.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ClassificationError;
use crate::layer::MemoryLayer;

/// The five query intents the classifier recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    /// "continue / implement / add / build X"
    Procedural,
    /// "what is / how does X work" (general knowledge)
    Factual,
    /// "what imports / depends on X" (code structure)
    Architectural,
    /// "my preferred / my expertise" (personal state)
    User,
    /// "why did we choose X" (past decisions)
    Historical,
}

impl QueryType {
    pub const ALL: [QueryType; 5] = [
        QueryType::Procedural,
        QueryType::Factual,
        QueryType::Architectural,
        QueryType::User,
        QueryType::Historical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Procedural => "procedural",
            Self::Factual => "factual",
            Self::Architectural => "architectural",
            Self::User => "user",
            Self::Historical => "historical",
        }
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QueryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueryType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown query type '{s}'"))
    }
}

/// The outcome of classifying one query. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Detected intent. `None` when the backend could not decide and the
    /// policy's fallback route was used.
    #[serde(rename = "type")]
    pub query_type: Option<QueryType>,

    /// Backend confidence in [0, 1]
    pub confidence: f32,

    /// Layers worth querying, in fan-out order. Non-empty, no duplicates.
    pub layers: Vec<MemoryLayer>,

    /// Per-layer weight in [0, 1]
    pub weights: BTreeMap<MemoryLayer, f32>,

    /// Human-readable justification from the backend
    pub reasoning: String,
}

impl ClassificationResult {
    /// Build a result, enforcing the structural invariants.
    pub fn new(
        query_type: Option<QueryType>,
        confidence: f32,
        route: &IntentRoute,
        reasoning: impl Into<String>,
    ) -> Result<Self, ClassificationError> {
        if !confidence.is_finite() {
            return Err(ClassificationError::InvalidResult(format!(
                "confidence is not finite: {confidence}"
            )));
        }
        route
            .validate()
            .map_err(ClassificationError::InvalidResult)?;

        Ok(Self {
            query_type,
            confidence: confidence.clamp(0.0, 1.0),
            layers: route.layers(),
            weights: route.0.iter().map(|lw| (lw.layer, lw.weight)).collect(),
            reasoning: reasoning.into(),
        })
    }

    /// Weight of `layer`, or 1.0 when the layer carries no explicit weight.
    pub fn weight(&self, layer: MemoryLayer) -> f32 {
        self.weights.get(&layer).copied().unwrap_or(1.0)
    }

    /// Whether the backend failed to settle on an intent.
    pub fn is_fallback(&self) -> bool {
        self.query_type.is_none()
    }
}

/// A layer and its weight inside an intent route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerWeight {
    pub layer: MemoryLayer,
    pub weight: f32,
}

impl LayerWeight {
    pub fn new(layer: MemoryLayer, weight: f32) -> Self {
        Self { layer, weight }
    }
}

/// The ordered set of weighted layers one intent routes to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntentRoute(pub Vec<LayerWeight>);

impl IntentRoute {
    pub fn new(entries: impl IntoIterator<Item = (MemoryLayer, f32)>) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(layer, weight)| LayerWeight::new(layer, weight))
                .collect(),
        )
    }

    pub fn layers(&self) -> Vec<MemoryLayer> {
        self.0.iter().map(|lw| lw.layer).collect()
    }

    /// A route must name at least one layer, each at most once, with weights
    /// in [0, 1].
    pub fn validate(&self) -> Result<(), String> {
        if self.0.is_empty() {
            return Err("route has no layers".into());
        }
        for (i, lw) in self.0.iter().enumerate() {
            if !(0.0..=1.0).contains(&lw.weight) {
                return Err(format!(
                    "weight for layer {} must be within [0, 1], got {}",
                    lw.layer, lw.weight
                ));
            }
            if self.0[..i].iter().any(|prev| prev.layer == lw.layer) {
                return Err(format!("layer {} listed more than once", lw.layer));
            }
        }
        Ok(())
    }
}

/// Intent → weighted layers table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerPolicy {
    #[serde(default = "default_procedural")]
    pub procedural: IntentRoute,
    #[serde(default = "default_factual")]
    pub factual: IntentRoute,
    #[serde(default = "default_architectural")]
    pub architectural: IntentRoute,
    #[serde(default = "default_user")]
    pub user: IntentRoute,
    #[serde(default = "default_historical")]
    pub historical: IntentRoute,
    /// Used when the backend cannot decide. Should be broad.
    #[serde(default = "default_fallback")]
    pub fallback: IntentRoute,
}

fn default_procedural() -> IntentRoute {
    IntentRoute::new([
        (MemoryLayer::Session, 1.0),
        (MemoryLayer::Project, 0.9),
        (MemoryLayer::Vector, 0.7),
    ])
}
fn default_factual() -> IntentRoute {
    IntentRoute::new([(MemoryLayer::Vector, 1.0), (MemoryLayer::Project, 0.6)])
}
fn default_architectural() -> IntentRoute {
    IntentRoute::new([(MemoryLayer::Graph, 1.0), (MemoryLayer::Vector, 0.8)])
}
fn default_user() -> IntentRoute {
    IntentRoute::new([(MemoryLayer::User, 1.0)])
}
fn default_historical() -> IntentRoute {
    IntentRoute::new([(MemoryLayer::Project, 0.9), (MemoryLayer::Governance, 1.0)])
}
fn default_fallback() -> IntentRoute {
    IntentRoute::new([
        (MemoryLayer::Session, 0.8),
        (MemoryLayer::Project, 0.8),
        (MemoryLayer::Vector, 0.8),
        (MemoryLayer::Graph, 0.6),
        (MemoryLayer::User, 0.5),
        (MemoryLayer::Governance, 0.5),
    ])
}

impl Default for LayerPolicy {
    fn default() -> Self {
        Self {
            procedural: default_procedural(),
            factual: default_factual(),
            architectural: default_architectural(),
            user: default_user(),
            historical: default_historical(),
            fallback: default_fallback(),
        }
    }
}

impl LayerPolicy {
    /// The route for an intent, or the fallback route when there is none.
    pub fn route_for(&self, query_type: Option<QueryType>) -> &IntentRoute {
        match query_type {
            Some(QueryType::Procedural) => &self.procedural,
            Some(QueryType::Factual) => &self.factual,
            Some(QueryType::Architectural) => &self.architectural,
            Some(QueryType::User) => &self.user,
            Some(QueryType::Historical) => &self.historical,
            None => &self.fallback,
        }
    }

    /// Turn a backend verdict into a full classification.
    pub fn resolve(
        &self,
        query_type: Option<QueryType>,
        confidence: f32,
        reasoning: impl Into<String>,
    ) -> Result<ClassificationResult, ClassificationError> {
        ClassificationResult::new(query_type, confidence, self.route_for(query_type), reasoning)
    }

    /// Validate every route in the table.
    pub fn validate(&self) -> Result<(), String> {
        let named = QueryType::ALL
            .into_iter()
            .map(|t| (t.as_str(), self.route_for(Some(t))))
            .chain(std::iter::once(("fallback", &self.fallback)));
        for (name, route) in named {
            route.validate().map_err(|e| format!("policy.{name}: {e}"))?;
        }
        Ok(())
    }
}
