//! Knowledge-lookup capability: `lookup(query)` returns ranked passages.
//! Real deployments put a vector store behind the trait; the in-process
//! implementation ranks seeded passages by term overlap, which is enough for
//! development and deterministic tests.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum KnowledgeError {
    #[error("knowledge lookup failure: {0}")]
    Lookup(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Passage {
    pub source: String,
    pub content: String,
    pub score: f32,
}

#[async_trait]
pub trait KnowledgeLookup: Send + Sync {
    async fn lookup(&self, query: &str) -> Result<Vec<Passage>, KnowledgeError>;
}

pub struct StaticKnowledgeBase {
    name: String,
    documents: Vec<(String, String)>,
    max_results: usize,
}

impl StaticKnowledgeBase {
    pub fn new(name: impl Into<String>, documents: Vec<(String, String)>) -> Self {
        Self { name: name.into(), documents, max_results: 3 }
    }

    /// How the forecasting process works, for the forecast agent.
    pub fn forecast_playbook() -> Self {
        Self::new(
            "forecast-kb",
            vec![
                (
                    "forecasting-process".to_string(),
                    "Monthly forecasts combine the trailing six months of measured consumption \
                     with seasonal adjustment. A forecast month is recomputed whenever a new \
                     meter reading lands or an agent updates the expected usage."
                        .to_string(),
                ),
                (
                    "forecast-accuracy".to_string(),
                    "Forecast confidence degrades beyond three months out, so projections are \
                     limited to the next three months. Updated forecasts override the seasonal \
                     model for their month."
                        .to_string(),
                ),
                (
                    "usage-statistics".to_string(),
                    "Usage statistics compare the current month against the trailing average \
                     and flag months that deviate by more than fifteen percent."
                        .to_string(),
                ),
            ],
        )
    }

    /// Installation and maintenance guidance, for the solar agent.
    pub fn solar_manual() -> Self {
        Self::new(
            "solar-kb",
            vec![
                (
                    "panel-installation".to_string(),
                    "Panels should be mounted facing the equator at a tilt close to the site \
                     latitude. Leave at least ten centimetres of clearance for airflow and \
                     torque mounting bolts to the rail manufacturer's specification."
                        .to_string(),
                ),
                (
                    "panel-maintenance".to_string(),
                    "Rinse panels with low-pressure water at dawn or dusk. Inspect cabling and \
                     connectors twice a year; discoloration or hot spots warrant a specialist \
                     inspection."
                        .to_string(),
                ),
                (
                    "inverter-troubleshooting".to_string(),
                    "If the inverter reports an earth fault or output drops sharply on clear \
                     days, power the array down and escalate to a specialist. Do not open the \
                     inverter housing."
                        .to_string(),
                ),
            ],
        )
    }
}

#[async_trait]
impl KnowledgeLookup for StaticKnowledgeBase {
    async fn lookup(&self, query: &str) -> Result<Vec<Passage>, KnowledgeError> {
        let query_terms: Vec<String> = query
            .to_ascii_lowercase()
            .split_whitespace()
            .filter(|term| term.len() > 2)
            .map(|term| term.to_string())
            .collect();

        let mut passages: Vec<Passage> = self
            .documents
            .iter()
            .filter_map(|(source, content)| {
                let haystack = content.to_ascii_lowercase();
                let hits =
                    query_terms.iter().filter(|term| haystack.contains(term.as_str())).count();
                if hits == 0 || query_terms.is_empty() {
                    return None;
                }
                Some(Passage {
                    source: format!("{}/{}", self.name, source),
                    content: content.clone(),
                    score: hits as f32 / query_terms.len() as f32,
                })
            })
            .collect();

        passages.sort_by(|left, right| {
            right.score.partial_cmp(&left.score).unwrap_or(std::cmp::Ordering::Equal)
        });
        passages.truncate(self.max_results);
        Ok(passages)
    }
}

#[cfg(test)]
mod tests {
    use super::{KnowledgeLookup, StaticKnowledgeBase};

    #[tokio::test]
    async fn relevant_passages_rank_first() {
        let kb = StaticKnowledgeBase::solar_manual();
        let passages = kb.lookup("how do I install a panel on my roof").await.expect("lookup");

        assert!(!passages.is_empty());
        assert!(passages[0].source.contains("panel-installation"));
    }

    #[tokio::test]
    async fn unrelated_queries_return_nothing() {
        let kb = StaticKnowledgeBase::forecast_playbook();
        let passages = kb.lookup("zzz qqq").await.expect("lookup");
        assert!(passages.is_empty());
    }
}
