//! Search orchestration: fetch → filter → embed → score → rank → explain.
//!
//! `SearchService` owns nothing mutable. Repeated calls with identical inputs
//! over an unchanged candidate set return identical results.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::matching::embeddings::job_text;
use crate::matching::error::{Result, SearchError};
use crate::matching::explainer::Explainer;
use crate::matching::filters::{passes, SearchFilters};
use crate::matching::scoring::{
    ranking_order, skill_gaps, MatchResult, ScoringEngine, SubScores,
};
use crate::matching::source::JobSource;
use crate::models::{JobRecord, UserProfile};

/// Minimum rescaled semantic score for a job to count as similar.
pub const SIMILARITY_THRESHOLD: f64 = 0.65;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchStats {
    pub total_jobs: i64,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub explainer: String,
    pub engine_version: String,
}

pub struct SearchService {
    engine: ScoringEngine,
    source: Arc<dyn JobSource>,
    explainer: Arc<dyn Explainer>,
}

impl SearchService {
    pub fn new(
        engine: ScoringEngine,
        source: Arc<dyn JobSource>,
        explainer: Arc<dyn Explainer>,
    ) -> Self {
        Self {
            engine,
            source,
            explainer,
        }
    }

    /// Ranks candidate jobs for `query`, best first, at most `limit` long.
    pub async fn search(
        &self,
        query: &str,
        profile: Option<&UserProfile>,
        filters: Option<&SearchFilters>,
        limit: i64,
    ) -> Result<Vec<MatchResult>> {
        let query_vector = self.engine.embed_query(query)?;
        let limit = validate_limit(limit)?;

        let candidates = self.source.fetch_candidates(filters).await?;
        let fetched = candidates.len();

        let now = Utc::now();
        let passing: Vec<JobRecord> = match filters {
            Some(filters) => candidates
                .into_iter()
                .filter(|job| passes(filters, job, now))
                .collect(),
            None => candidates,
        };
        let (jobs, texts) = embeddable(passing);
        debug!("{} of {} candidates passed filters", jobs.len(), fetched);

        let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let job_vectors = self.engine.embeddings().embed_batch(&text_refs)?;

        let mut scored: Vec<(JobRecord, SubScores)> = Vec::with_capacity(jobs.len());
        for (job, job_vector) in jobs.into_iter().zip(&job_vectors) {
            let sub_scores = self
                .engine
                .sub_scores(&query_vector, job_vector, &job, profile)?;
            scored.push((job, sub_scores));
        }

        scored.sort_by(|(a, a_scores), (b, b_scores)| {
            ranking_order(a_scores.overall(), a, b_scores.overall(), b)
        });
        scored.truncate(limit);

        // Only the kept results are explained.
        let reasons = join_all(
            scored
                .iter()
                .map(|(job, sub_scores)| self.explainer.explain(job, profile, sub_scores)),
        )
        .await;

        let results: Vec<MatchResult> = scored
            .into_iter()
            .zip(reasons)
            .map(|((job, sub_scores), reasons)| {
                let gaps = skill_gaps(profile, &job);
                MatchResult::new(job, sub_scores, reasons, gaps)
            })
            .collect();

        info!(
            "Search returned {} results ({} candidates, explainer: {})",
            results.len(),
            fetched,
            self.explainer.strategy()
        );
        Ok(results)
    }

    /// Jobs semantically close to `job_id`, ranked like a search result.
    pub async fn find_similar(&self, job_id: &str, limit: i64) -> Result<Vec<MatchResult>> {
        let limit = validate_limit(limit)?;

        let reference = self
            .source
            .get_job(job_id)
            .await?
            .ok_or_else(|| SearchError::JobNotFound(job_id.to_string()))?;
        let reference_vector = self.engine.embeddings().embed_job(&reference)?;

        let others: Vec<JobRecord> = self
            .source
            .fetch_candidates(None)
            .await?
            .into_iter()
            .filter(|job| job.id != reference.id)
            .collect();
        let (jobs, texts) = embeddable(others);

        let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let vectors = self.engine.embeddings().embed_batch(&text_refs)?;

        let mut similar: Vec<(JobRecord, f64)> = Vec::new();
        for (job, vector) in jobs.into_iter().zip(&vectors) {
            let score = self.engine.semantic_score(&reference_vector, vector)?;
            if score > SIMILARITY_THRESHOLD {
                similar.push((job, score));
            }
        }
        similar.sort_by(|(a, a_score), (b, b_score)| ranking_order(*a_score, a, *b_score, b));
        similar.truncate(limit);

        let reason = format!("Similar to {} at {}", reference.title, reference.company);
        Ok(similar
            .into_iter()
            .map(|(job, semantic)| {
                let sub_scores = SubScores {
                    semantic,
                    skills: None,
                    experience: None,
                    salary: None,
                    location: None,
                };
                MatchResult::new(job, sub_scores, vec![reason.clone()], Vec::new())
            })
            .collect())
    }

    pub async fn stats(&self) -> Result<SearchStats> {
        let embeddings = self.engine.embeddings();
        Ok(SearchStats {
            total_jobs: self.source.count().await?,
            embedding_model: embeddings.model_name().to_string(),
            embedding_dimension: embeddings.dimension(),
            explainer: self.explainer.strategy().to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}

fn validate_limit(limit: i64) -> Result<usize> {
    if limit <= 0 {
        return Err(SearchError::InvalidLimit(limit));
    }
    Ok(usize::try_from(limit).unwrap_or(usize::MAX))
}

/// Splits off jobs whose canonical text is blank; they cannot be embedded.
fn embeddable(jobs: Vec<JobRecord>) -> (Vec<JobRecord>, Vec<String>) {
    let mut kept = Vec::with_capacity(jobs.len());
    let mut texts = Vec::with_capacity(jobs.len());
    for job in jobs {
        let text = job_text(&job);
        if text.trim().is_empty() {
            warn!("Skipping job {}: no embeddable text", job.id);
            continue;
        }
        kept.push(job);
        texts.push(text);
    }
    (kept, texts)
}
