//! Scoring Engine: per-dimension sub-scores and their weighted combination.
//!
//! Each sub-score is `Option<f64>` in [0, 1]: `None` means the dimension was
//! not evaluable for this (job, profile) pair and is left out of the weighted
//! sum. Weights are re-normalised over the evaluable subset, so a search
//! without a profile scores on semantics alone.
//!
//! Every function here is pure given its inputs; the engine only holds the
//! shared embedding provider.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::matching::embeddings::EmbeddingProvider;
use crate::matching::error::{Result, SearchError};
use crate::matching::explainer::rule_based_reasons;
use crate::matching::filters::{normalize_term, SalaryRange};
use crate::models::{JobRecord, RemoteType, UserProfile};

/// Score lost per year below a level's band.
const UNDER_QUALIFIED_DECAY: f64 = 0.2;
/// Score lost per year above a level's band.
const OVER_QUALIFIED_DECAY: f64 = 0.1;
/// Location score when one location string contains the other.
const PARTIAL_LOCATION_SCORE: f64 = 0.5;
/// Longest skill-gap list reported per result.
pub const MAX_SKILL_GAPS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Semantic,
    Skills,
    Experience,
    Salary,
    Location,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Semantic,
        Dimension::Skills,
        Dimension::Experience,
        Dimension::Salary,
        Dimension::Location,
    ];

    /// Canonical weights; they sum to 1.0.
    pub fn weight(self) -> f64 {
        match self {
            Dimension::Semantic => 0.35,
            Dimension::Skills => 0.25,
            Dimension::Experience => 0.20,
            Dimension::Salary => 0.15,
            Dimension::Location => 0.05,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Dimension::Semantic => "semantic",
            Dimension::Skills => "skills",
            Dimension::Experience => "experience",
            Dimension::Salary => "salary",
            Dimension::Location => "location",
        }
    }
}

/// Per-dimension scores for one job. Semantic is always evaluable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub semantic: f64,
    pub skills: Option<f64>,
    pub experience: Option<f64>,
    pub salary: Option<f64>,
    pub location: Option<f64>,
}

impl SubScores {
    pub fn get(&self, dimension: Dimension) -> Option<f64> {
        match dimension {
            Dimension::Semantic => Some(self.semantic),
            Dimension::Skills => self.skills,
            Dimension::Experience => self.experience,
            Dimension::Salary => self.salary,
            Dimension::Location => self.location,
        }
    }

    /// Evaluable dimensions with their scores, in canonical order.
    pub fn evaluable(&self) -> impl Iterator<Item = (Dimension, f64)> + '_ {
        Dimension::ALL
            .into_iter()
            .filter_map(|d| self.get(d).map(|s| (d, s)))
    }

    /// `Σ(wᵢ·sᵢ) / Σ(wᵢ)` over evaluable dimensions.
    pub fn overall(&self) -> f64 {
        let evaluable: Vec<(Dimension, f64)> = self.evaluable().collect();
        if let [(_, only)] = evaluable.as_slice() {
            return *only;
        }

        let total_weight: f64 = evaluable.iter().map(|(d, _)| d.weight()).sum();
        let weighted: f64 = evaluable.iter().map(|(d, s)| d.weight() * s).sum();
        (weighted / total_weight).clamp(0.0, 1.0)
    }
}

/// A ranked job. Built once per search call and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub job: JobRecord,
    pub overall_score: f64,
    pub sub_scores: SubScores,
    pub reasons: Vec<String>,
    /// Required skills the profile lacks, in job order. Empty without a profile.
    pub skill_gaps: Vec<String>,
}

impl MatchResult {
    pub fn new(
        job: JobRecord,
        sub_scores: SubScores,
        reasons: Vec<String>,
        skill_gaps: Vec<String>,
    ) -> Self {
        Self {
            overall_score: sub_scores.overall(),
            job,
            sub_scores,
            reasons,
            skill_gaps,
        }
    }
}

/// Result ordering: score descending, then most recent `posted_at`
/// (unknown dates last), then job id ascending.
pub fn ranking_order(a_score: f64, a: &JobRecord, b_score: f64, b: &JobRecord) -> Ordering {
    b_score
        .total_cmp(&a_score)
        .then_with(|| b.posted_at.cmp(&a.posted_at))
        .then_with(|| a.id.cmp(&b.id))
}

// ────────────────────────────────────────────────────────────────────────────
// ScoringEngine
// ────────────────────────────────────────────────────────────────────────────

pub struct ScoringEngine {
    embeddings: Arc<EmbeddingProvider>,
}

impl ScoringEngine {
    pub fn new(embeddings: Arc<EmbeddingProvider>) -> Self {
        Self { embeddings }
    }

    pub fn embeddings(&self) -> &EmbeddingProvider {
        &self.embeddings
    }

    /// Scores one job against a query and optional profile, with rule-based
    /// reasons.
    pub fn score(
        &self,
        query: &str,
        job: &JobRecord,
        profile: Option<&UserProfile>,
    ) -> Result<MatchResult> {
        let query_vector = self.embed_query(query)?;
        let job_vector = self.embeddings.embed_job(job)?;
        let sub_scores = self.sub_scores(&query_vector, &job_vector, job, profile)?;
        let reasons = rule_based_reasons(job, profile, &sub_scores);
        let gaps = skill_gaps(profile, job);
        Ok(MatchResult::new(job.clone(), sub_scores, reasons, gaps))
    }

    /// Embeds a search query, rejecting blank input as `InvalidQuery`.
    pub fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        if query.trim().is_empty() {
            return Err(SearchError::InvalidQuery);
        }
        Ok(self.embeddings.embed(query)?)
    }

    /// Computes all sub-scores from precomputed vectors.
    pub fn sub_scores(
        &self,
        query_vector: &[f32],
        job_vector: &[f32],
        job: &JobRecord,
        profile: Option<&UserProfile>,
    ) -> Result<SubScores> {
        let semantic = self.semantic_score(query_vector, job_vector)?;

        Ok(match profile {
            None => SubScores {
                semantic,
                skills: None,
                experience: None,
                salary: None,
                location: None,
            },
            Some(profile) => SubScores {
                semantic,
                skills: skills_score(profile, job),
                experience: experience_score(profile, job),
                salary: salary_score(profile, job),
                location: location_score(profile, job),
            },
        })
    }

    /// Cosine similarity rescaled from [-1, 1] to [0, 1].
    pub fn semantic_score(&self, a: &[f32], b: &[f32]) -> Result<f64> {
        let cosine = self.embeddings.similarity(a, b)?;
        Ok(((cosine + 1.0) / 2.0).clamp(0.0, 1.0))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Dimension scorers
// ────────────────────────────────────────────────────────────────────────────

/// Job skills (as written, job order, deduplicated) split into those
/// the profile has and those it lacks.
pub fn skill_overlap(profile: &UserProfile, job: &JobRecord) -> (Vec<String>, Vec<String>) {
    let mine: Vec<String> = profile.skills.iter().map(|s| normalize_term(s)).collect();
    let mut seen: Vec<String> = Vec::new();
    let mut matched = Vec::new();
    let mut missing = Vec::new();

    for skill in &job.required_skills {
        let key = normalize_term(skill);
        if key.is_empty() || seen.contains(&key) {
            continue;
        }
        if mine.contains(&key) {
            matched.push(skill.trim().to_string());
        } else {
            missing.push(skill.trim().to_string());
        }
        seen.push(key);
    }
    (matched, missing)
}

/// The job's required skills missing from the profile, capped at
/// `MAX_SKILL_GAPS`.
pub fn skill_gaps(profile: Option<&UserProfile>, job: &JobRecord) -> Vec<String> {
    let Some(profile) = profile else {
        return Vec::new();
    };
    let (_, mut missing) = skill_overlap(profile, job);
    missing.truncate(MAX_SKILL_GAPS);
    missing
}

/// `|profile ∩ job| / |job|`; `None` when the job lists no skills.
pub fn skills_score(profile: &UserProfile, job: &JobRecord) -> Option<f64> {
    let (matched, missing) = skill_overlap(profile, job);
    let total = matched.len() + missing.len();
    if total == 0 {
        return None;
    }
    Some(matched.len() as f64 / total as f64)
}

/// 1.0 inside the level's year band, linear decay outside, floored at 0.
pub fn experience_score(profile: &UserProfile, job: &JobRecord) -> Option<f64> {
    let level = job.experience_level?;
    let years = profile.experience_years;
    if !years.is_finite() {
        return None;
    }
    let years = years.max(0.0);
    let (lo, hi) = level.year_range();

    let score = if years < lo {
        1.0 - (lo - years) * UNDER_QUALIFIED_DECAY
    } else if years > hi {
        1.0 - (years - hi) * OVER_QUALIFIED_DECAY
    } else {
        1.0
    };
    Some(score.clamp(0.0, 1.0))
}

/// Overlap of desired and offered salary ranges.
///
/// 1.0 when either range contains the other, 0.0 when disjoint, otherwise
/// the overlap as a fraction of the desired range (or of the job range when
/// the desired range is open-ended).
pub fn salary_score(profile: &UserProfile, job: &JobRecord) -> Option<f64> {
    if !profile.has_salary_preference() || !job.has_salary() {
        return None;
    }

    let (d_lo, d_hi) = ordered(
        SalaryRange {
            min: profile.desired_salary_min,
            max: profile.desired_salary_max,
        }
        .bounds(),
    );
    let (j_lo, j_hi) = ordered(
        SalaryRange {
            min: job.salary_min,
            max: job.salary_max,
        }
        .bounds(),
    );

    let job_inside = j_lo >= d_lo && j_hi <= d_hi;
    let desired_inside = d_lo >= j_lo && d_hi <= j_hi;
    if job_inside || desired_inside {
        return Some(1.0);
    }

    let overlap = d_hi.min(j_hi) - d_lo.max(j_lo);
    if overlap <= 0.0 {
        return Some(0.0);
    }

    let desired_span = d_hi - d_lo;
    let span = if desired_span.is_finite() {
        desired_span
    } else {
        j_hi - j_lo
    };
    if !span.is_finite() || span <= 0.0 {
        return Some(1.0);
    }
    Some((overlap / span).clamp(0.0, 1.0))
}

fn ordered((lo, hi): (f64, f64)) -> (f64, f64) {
    if lo <= hi {
        (lo, hi)
    } else {
        (hi, lo)
    }
}

/// Remote preference or exact location match → 1.0, substring match in
/// either direction → 0.5, else 0.0. `None` without preferred locations.
pub fn location_score(profile: &UserProfile, job: &JobRecord) -> Option<f64> {
    let preferred: Vec<String> = profile.locations().map(normalize_term).collect();
    if preferred.is_empty() {
        return None;
    }

    if job.remote_type == Some(RemoteType::Remote) && preferred.iter().any(|p| p == "remote") {
        return Some(1.0);
    }

    let location = normalize_term(&job.location);
    if location.is_empty() {
        return Some(0.0);
    }

    let best = preferred
        .iter()
        .map(|p| {
            if *p == location {
                1.0
            } else if location.contains(p.as_str()) || p.contains(location.as_str()) {
                PARTIAL_LOCATION_SCORE
            } else {
                0.0
            }
        })
        .fold(0.0, f64::max);
    Some(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::embeddings::HashEmbedder;
    use crate::models::ExperienceLevel;
    use chrono::{TimeZone, Utc};

    fn engine() -> ScoringEngine {
        let model = Arc::new(HashEmbedder::new(256).unwrap());
        ScoringEngine::new(Arc::new(EmbeddingProvider::load(model, 100).unwrap()))
    }

    fn job() -> JobRecord {
        JobRecord {
            id: "a".to_string(),
            title: "Senior Python Backend Engineer".to_string(),
            company: "Acme".to_string(),
            description: "Python services with Django and PostgreSQL".to_string(),
            requirements: vec![],
            required_skills: vec!["Python".to_string(), "SQL".to_string(), "Django".to_string()],
            experience_level: Some(ExperienceLevel::Senior),
            salary_min: Some(110_000),
            salary_max: Some(140_000),
            remote_type: Some(RemoteType::Remote),
            job_type: None,
            location: "Austin, TX".to_string(),
            posted_at: None,
        }
    }

    fn profile() -> UserProfile {
        UserProfile {
            current_title: "Backend Developer".to_string(),
            experience_years: 6.0,
            skills: vec!["python".to_string(), " SQL ".to_string()],
            preferred_locations: vec!["Remote".to_string()],
            desired_salary_min: Some(100_000),
            desired_salary_max: Some(150_000),
            ..Default::default()
        }
    }

    fn with_salary(min: Option<u64>, max: Option<u64>) -> JobRecord {
        JobRecord {
            salary_min: min,
            salary_max: max,
            ..job()
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = Dimension::ALL.iter().map(|d| d.weight()).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_overall_equals_semantic_without_profile() {
        let engine = engine();
        let result = engine.score("python backend developer", &job(), None).unwrap();
        assert_eq!(result.overall_score, result.sub_scores.semantic);
        assert!(result.sub_scores.skills.is_none());
        assert!(result.sub_scores.location.is_none());
    }

    #[test]
    fn test_overall_renormalizes_over_evaluable_dimensions() {
        let scores = SubScores {
            semantic: 0.5,
            skills: Some(1.0),
            experience: None,
            salary: None,
            location: None,
        };
        let expected = (0.35 * 0.5 + 0.25 * 1.0) / 0.60;
        assert!((scores.overall() - expected).abs() < 1e-12);

        let all_ones = SubScores {
            semantic: 1.0,
            skills: Some(1.0),
            experience: Some(1.0),
            salary: Some(1.0),
            location: Some(1.0),
        };
        assert!((all_ones.overall() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_query_is_rejected() {
        let engine = engine();
        assert!(matches!(
            engine.score("   ", &job(), None),
            Err(SearchError::InvalidQuery)
        ));
    }

    #[test]
    fn test_score_is_deterministic() {
        let engine = engine();
        let a = engine.score("python", &job(), Some(&profile())).unwrap();
        let b = engine.score("python", &job(), Some(&profile())).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_semantic_score_rescales_cosine() {
        let engine = engine();
        assert_eq!(engine.semantic_score(&[1.0, 0.0], &[1.0, 0.0]).unwrap(), 1.0);
        assert_eq!(engine.semantic_score(&[1.0, 0.0], &[-1.0, 0.0]).unwrap(), 0.0);
        assert!((engine.semantic_score(&[1.0, 0.0], &[0.0, 1.0]).unwrap() - 0.5).abs() < 1e-12);
        assert!(matches!(
            engine.semantic_score(&[1.0], &[1.0, 0.0]),
            Err(SearchError::DimensionMismatch { left: 1, right: 2 })
        ));
    }

    #[test]
    fn test_skills_score_is_case_insensitive_overlap() {
        let score = skills_score(&profile(), &job()).unwrap();
        assert!((score - 2.0 / 3.0).abs() < 1e-12);

        let (matched, missing) = skill_overlap(&profile(), &job());
        assert_eq!(matched, vec!["Python", "SQL"]);
        assert_eq!(missing, vec!["Django"]);
    }

    #[test]
    fn test_skill_gaps_list_missing_job_skills() {
        assert_eq!(skill_gaps(Some(&profile()), &job()), vec!["Django"]);
        assert!(skill_gaps(None, &job()).is_empty());

        let many = JobRecord {
            required_skills: ["Go", "Rust", "Kafka", "Redis", "gRPC", "Terraform", "Python"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ..job()
        };
        assert_eq!(
            skill_gaps(Some(&profile()), &many),
            vec!["Go", "Rust", "Kafka", "Redis", "gRPC"]
        );
    }

    #[test]
    fn test_score_reports_skill_gaps() {
        let result = engine().score("python", &job(), Some(&profile())).unwrap();
        assert_eq!(result.skill_gaps, vec!["Django"]);
    }

    #[test]
    fn test_skills_not_evaluable_without_job_skills() {
        let job = JobRecord {
            required_skills: vec![],
            ..job()
        };
        assert_eq!(skills_score(&profile(), &job), None);
    }

    #[test]
    fn test_experience_inside_band_scores_one() {
        assert_eq!(experience_score(&profile(), &job()), Some(1.0));
    }

    #[test]
    fn test_experience_decays_outside_band() {
        let junior = UserProfile {
            experience_years: 3.0,
            ..profile()
        };
        // senior band starts at 5 years: 2 years short
        let score = experience_score(&junior, &job()).unwrap();
        assert!((score - 0.6).abs() < 1e-12);

        let veteran = UserProfile {
            experience_years: 15.0,
            ..profile()
        };
        let score = experience_score(&veteran, &job()).unwrap();
        assert!((score - 0.7).abs() < 1e-12);

        let novice = UserProfile {
            experience_years: 0.0,
            ..profile()
        };
        let exec = JobRecord {
            experience_level: Some(ExperienceLevel::Executive),
            ..job()
        };
        assert_eq!(experience_score(&novice, &exec), Some(0.0));
    }

    #[test]
    fn test_experience_not_evaluable_without_level() {
        let job = JobRecord {
            experience_level: None,
            ..job()
        };
        assert_eq!(experience_score(&profile(), &job), None);
    }

    #[test]
    fn test_salary_full_containment() {
        assert_eq!(salary_score(&profile(), &job()), Some(1.0));
        assert_eq!(
            salary_score(&profile(), &with_salary(Some(90_000), Some(200_000))),
            Some(1.0)
        );
    }

    #[test]
    fn test_salary_partial_overlap_is_fraction_of_desired_range() {
        let score = salary_score(&profile(), &with_salary(Some(80_000), Some(120_000))).unwrap();
        assert!((score - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_salary_disjoint_is_zero() {
        assert_eq!(
            salary_score(&profile(), &with_salary(Some(60_000), Some(70_000))),
            Some(0.0)
        );
    }

    #[test]
    fn test_salary_open_ended_ranges() {
        let open = UserProfile {
            desired_salary_max: None,
            ..profile()
        };
        let score = salary_score(&open, &with_salary(Some(80_000), Some(120_000))).unwrap();
        assert!((score - 0.5).abs() < 1e-12);
        assert_eq!(salary_score(&open, &with_salary(Some(120_000), None)), Some(1.0));
    }

    #[test]
    fn test_salary_not_evaluable_without_data() {
        assert_eq!(salary_score(&profile(), &with_salary(None, None)), None);
        let no_pref = UserProfile {
            desired_salary_min: None,
            desired_salary_max: None,
            ..profile()
        };
        assert_eq!(salary_score(&no_pref, &job()), None);
    }

    #[test]
    fn test_location_scores() {
        assert_eq!(location_score(&profile(), &job()), Some(1.0));

        let city = UserProfile {
            preferred_locations: vec!["austin, tx".to_string()],
            ..profile()
        };
        let onsite = JobRecord {
            remote_type: Some(RemoteType::OnSite),
            ..job()
        };
        assert_eq!(location_score(&city, &onsite), Some(1.0));

        let partial = UserProfile {
            preferred_locations: vec!["Austin".to_string()],
            ..profile()
        };
        assert_eq!(location_score(&partial, &onsite), Some(0.5));

        let elsewhere = UserProfile {
            preferred_locations: vec!["Lisbon".to_string()],
            ..profile()
        };
        assert_eq!(location_score(&elsewhere, &onsite), Some(0.0));

        let none = UserProfile {
            preferred_locations: vec!["  ".to_string()],
            ..profile()
        };
        assert_eq!(location_score(&none, &onsite), None);
    }

    #[test]
    fn test_ranking_order_tie_breaks() {
        let older = JobRecord {
            id: "b".to_string(),
            posted_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            ..job()
        };
        let newer = JobRecord {
            id: "c".to_string(),
            posted_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
            ..job()
        };
        let undated_a = JobRecord {
            id: "a".to_string(),
            ..job()
        };
        let undated_z = JobRecord {
            id: "z".to_string(),
            ..job()
        };

        assert_eq!(ranking_order(0.5, &newer, 0.5, &older), Ordering::Less);
        assert_eq!(ranking_order(0.5, &older, 0.5, &undated_a), Ordering::Less);
        assert_eq!(ranking_order(0.5, &undated_a, 0.5, &undated_z), Ordering::Less);
        assert_eq!(ranking_order(0.4, &newer, 0.6, &undated_z), Ordering::Greater);
    }
}
