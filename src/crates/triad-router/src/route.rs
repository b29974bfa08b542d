//! Triad route definitions and semantic scoring.

use serde::{Deserialize, Serialize};
use triad_llm::Embedder;

/// One routable triad: the corpus of description + example prompts an
/// embedding is computed from, plus keyword hints kept around for
/// diagnostics even though scoring is embedding-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriadRoute {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub example_prompts: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl TriadRoute {
    /// The text whose embedding represents this route: description plus
    /// every example prompt, combined into one string.
    pub fn corpus_text(&self) -> String {
        let mut parts = vec![self.description.clone()];
        parts.extend(self.example_prompts.iter().cloned());
        parts.join(". ")
    }
}

/// A route scored against a single prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRoute {
    pub route_id: String,
    pub score: f64,
}

/// Cosine similarity between two vectors; zero vectors score `0.0` rather
/// than dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)) as f64
}

/// A semantic router over a fixed set of triad routes, with each route's
/// embedding pre-computed once at load time.
pub struct SemanticRouter {
    routes: Vec<TriadRoute>,
    embeddings: Vec<Vec<f32>>,
}

impl SemanticRouter {
    /// Compute each route's embedding from its corpus text.
    pub async fn load(routes: Vec<TriadRoute>, embedder: &dyn Embedder) -> triad_llm::Result<Self> {
        let mut embeddings = Vec::with_capacity(routes.len());
        for route in &routes {
            embeddings.push(embedder.embed(&route.corpus_text()).await?);
        }
        Ok(Self { routes, embeddings })
    }

    /// Build directly from pre-computed embeddings (useful for tests and for
    /// caching route embeddings across process restarts).
    pub fn from_embeddings(routes: Vec<TriadRoute>, embeddings: Vec<Vec<f32>>) -> Self {
        Self { routes, embeddings }
    }

    pub fn routes(&self) -> &[TriadRoute] {
        &self.routes
    }

    /// Score `prompt_embedding` against every route, ranked descending by
    /// cosine similarity. Ties keep route-definition order (stable sort).
    pub fn score(&self, prompt_embedding: &[f32]) -> Vec<ScoredRoute> {
        let mut scored: Vec<ScoredRoute> = self
            .routes
            .iter()
            .zip(self.embeddings.iter())
            .map(|(route, embedding)| ScoredRoute {
                route_id: route.id.clone(),
                score: cosine_similarity(prompt_embedding, embedding),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored
    }

    pub async fn route(
        &self,
        prompt: &str,
        embedder: &dyn Embedder,
    ) -> triad_llm::Result<Vec<ScoredRoute>> {
        let embedding = embedder.embed(prompt).await?;
        Ok(self.score(&embedding))
    }
}
