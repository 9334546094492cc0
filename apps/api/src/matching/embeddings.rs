//! Embedding Provider: text → fixed-length vector, plus cosine similarity.
//!
//! The model sits behind the `Embedder` trait. `EmbeddingProvider` wraps one
//! loaded model, memoises vectors per normalised text, and builds the
//! canonical job/profile texts so identical structured input always embeds
//! to the same vector.
//!
//! The provider is constructed once in `main` via `EmbeddingProvider::load`
//! and handed to the search service as `Arc<EmbeddingProvider>`.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use moka::sync::Cache;
use siphasher::sip::SipHasher13;
use tracing::{debug, info};

use crate::matching::error::EmbeddingError;
use crate::models::{JobRecord, UserProfile};

/// Fixed seeds: changing them changes every embedding.
const HASH_SEED_K0: u64 = 0x0123_4567_89ab_cdef;
const HASH_SEED_K1: u64 = 0xfedc_ba98_7654_3210;

const UNIGRAM_WEIGHT: f32 = 1.0;
const BIGRAM_WEIGHT: f32 = 0.5;

const PROBE_TEXT: &str = "embedding model readiness probe";

// ────────────────────────────────────────────────────────────────────────────
// Model trait
// ────────────────────────────────────────────────────────────────────────────

/// A black-box text embedding model.
///
/// Implementations must be deterministic and must return vectors of exactly
/// `dimension()` elements.
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    fn dimension(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Default implementation calls `embed` sequentially.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// HashEmbedder: bundled local model
// ────────────────────────────────────────────────────────────────────────────

/// Feature-hashing embedder: signed SipHash-1-3 buckets over lower-cased word
/// unigrams and bigrams, L2-normalised. No training, no I/O.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Result<Self, EmbeddingError> {
        if dimension == 0 {
            return Err(EmbeddingError::ModelUnavailable(
                "embedding dimension must be positive".to_string(),
            ));
        }
        Ok(Self { dimension })
    }

    fn hash(token: &str) -> u64 {
        let mut hasher = SipHasher13::new_with_keys(HASH_SEED_K0, HASH_SEED_K1);
        token.hash(&mut hasher);
        hasher.finish()
    }

    fn accumulate(&self, vector: &mut [f32], token: &str, weight: f32) {
        let h = Self::hash(token);
        let idx = (h % self.dimension as u64) as usize;
        // High bit picks the sign so collisions tend to cancel.
        let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
        vector[idx] += sign * weight;
    }
}

/// Lower-cases and splits on anything that is not alphanumeric, `+` or `#`
/// (so "C++" and "C#" survive).
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

impl Embedder for HashEmbedder {
    fn name(&self) -> &str {
        "hash-sip13-v1"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let tokens = tokenize(text);
        let mut vector = vec![0.0f32; self.dimension];

        for token in &tokens {
            self.accumulate(&mut vector, token, UNIGRAM_WEIGHT);
        }
        for pair in tokens.windows(2) {
            self.accumulate(&mut vector, &format!("{} {}", pair[0], pair[1]), BIGRAM_WEIGHT);
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Similarity
// ────────────────────────────────────────────────────────────────────────────

/// Cosine similarity in [-1, 1].
///
/// Zero-norm vectors have no direction: they are 1.0 against an identical
/// vector and 0.0 against anything else.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, EmbeddingError> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(if a == b { 1.0 } else { 0.0 });
    }
    if a == b {
        return Ok(1.0);
    }

    Ok((dot / (norm_a * norm_b)).clamp(-1.0, 1.0))
}

// ────────────────────────────────────────────────────────────────────────────
// Canonical texts
// ────────────────────────────────────────────────────────────────────────────

/// Canonical embedding text for a job: title, description, requirements,
/// then required skills, in that order.
pub fn job_text(job: &JobRecord) -> String {
    let requirements = job.requirements.join("; ");
    let skills = job.required_skills.join(", ");
    join_parts(&[
        job.title.as_str(),
        job.description.as_str(),
        requirements.as_str(),
        skills.as_str(),
    ])
}

/// Canonical embedding text for a profile: current title, preferred titles,
/// skills, then industry.
pub fn profile_text(profile: &UserProfile) -> String {
    let titles = profile.preferred_titles.join(", ");
    let skills = profile.skills.join(", ");
    let industry = profile.industry.as_deref().unwrap_or_default();
    join_parts(&[
        profile.current_title.as_str(),
        titles.as_str(),
        skills.as_str(),
        industry,
    ])
}

fn join_parts(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

// ────────────────────────────────────────────────────────────────────────────
// EmbeddingProvider
// ────────────────────────────────────────────────────────────────────────────

/// The loaded, shared embedding model. Read-only after `load`.
pub struct EmbeddingProvider {
    model: Arc<dyn Embedder>,
    cache: Option<Cache<String, Arc<Vec<f32>>>>,
}

impl EmbeddingProvider {
    /// Loads the provider and probes the model once. Fails closed: a model that
    /// cannot embed the probe, or returns the wrong length, is rejected here
    /// instead of failing mid-search.
    pub fn load(model: Arc<dyn Embedder>, cache_capacity: u64) -> Result<Self, EmbeddingError> {
        let probe = model
            .embed(PROBE_TEXT)
            .map_err(|e| EmbeddingError::ModelUnavailable(format!("probe failed: {e}")))?;

        if probe.len() != model.dimension() {
            return Err(EmbeddingError::ModelUnavailable(format!(
                "model {} declared dimension {} but produced {}",
                model.name(),
                model.dimension(),
                probe.len()
            )));
        }

        let cache = (cache_capacity > 0).then(|| Cache::new(cache_capacity));

        info!(
            "Embedding model loaded: {} ({} dims, cache capacity {})",
            model.name(),
            model.dimension(),
            cache_capacity
        );

        Ok(Self { model, cache })
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn dimension(&self) -> usize {
        self.model.dimension()
    }

    /// Embeds one text. Whitespace is trimmed; empty input is rejected.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let text = normalize(text)?;

        if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(text)) {
            return Ok(hit.as_ref().clone());
        }

        let vector = self.model.embed(text)?;
        self.check_dimension(&vector)?;
        self.remember(text, &vector);
        Ok(vector)
    }

    /// Embeds many texts, preserving input order. Equivalent value-for-value
    /// to calling `embed` on each text.
    pub fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let normalized = texts
            .iter()
            .map(|t| normalize(t))
            .collect::<Result<Vec<_>, _>>()?;

        let mut results: Vec<Option<Vec<f32>>> = normalized
            .iter()
            .map(|t| {
                self.cache
                    .as_ref()
                    .and_then(|c| c.get(*t))
                    .map(|v| v.as_ref().clone())
            })
            .collect();

        let missing: Vec<usize> = (0..results.len()).filter(|&i| results[i].is_none()).collect();
        if !missing.is_empty() {
            let batch: Vec<&str> = missing.iter().map(|&i| normalized[i]).collect();
            let vectors = self.model.embed_batch(&batch)?;
            if vectors.len() != batch.len() {
                return Err(EmbeddingError::ModelUnavailable(format!(
                    "batch returned {} vectors for {} texts",
                    vectors.len(),
                    batch.len()
                )));
            }
            debug!("Embedded {} of {} texts (rest cached)", batch.len(), texts.len());

            for (&i, vector) in missing.iter().zip(vectors) {
                self.check_dimension(&vector)?;
                self.remember(normalized[i], &vector);
                results[i] = Some(vector);
            }
        }

        Ok(results.into_iter().flatten().collect())
    }

    pub fn similarity(&self, a: &[f32], b: &[f32]) -> Result<f64, EmbeddingError> {
        cosine_similarity(a, b)
    }

    pub fn embed_job(&self, job: &JobRecord) -> Result<Vec<f32>, EmbeddingError> {
        self.embed(&job_text(job))
    }

    /// Embeds a profile's canonical text, for ranking jobs against a profile
    /// instead of a query. `search` always embeds the query, so the server
    /// binary itself has no caller.
    #[allow(dead_code)]
    pub fn embed_profile(&self, profile: &UserProfile) -> Result<Vec<f32>, EmbeddingError> {
        self.embed(&profile_text(profile))
    }

    /// Explicit teardown: drops memoised vectors.
    pub fn shutdown(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
        info!("Embedding model {} released", self.model.name());
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), EmbeddingError> {
        if vector.len() != self.model.dimension() {
            return Err(EmbeddingError::DimensionMismatch {
                left: vector.len(),
                right: self.model.dimension(),
            });
        }
        Ok(())
    }

    fn remember(&self, text: &str, vector: &[f32]) {
        if let Some(cache) = &self.cache {
            cache.insert(text.to_string(), Arc::new(vector.to_vec()));
        }
    }
}

fn normalize(text: &str) -> Result<&str, EmbeddingError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(EmbeddingError::EmptyInput);
    }
    Ok(trimmed)
}
