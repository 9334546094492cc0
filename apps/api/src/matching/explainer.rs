//! Match Explainer: pluggable, trait-based reason generation.
//!
//! Default: `RuleBasedExplainer` (pure, deterministic, one sentence per strong
//! dimension). Optional: `DelegatedExplainer`, which asks a text-generation
//! collaborator and falls back to the rules on any failure or timeout.
//!
//! The search service holds an `Arc<dyn Explainer>`, chosen at startup from
//! config.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::llm_client::{strip_json_fences, TextGenerator};
use crate::matching::error::ExplanationUnavailable;
use crate::matching::prompts::{EXPLAIN_PROMPT_TEMPLATE, MAX_DESCRIPTION_CHARS};
use crate::matching::scoring::{skill_overlap, Dimension, SubScores};
use crate::models::{JobRecord, RemoteType, UserProfile};

/// A dimension must score strictly above this to earn a reason.
pub const REASON_THRESHOLD: f64 = 0.6;
const MAX_LISTED_SKILLS: usize = 5;
const MAX_DELEGATED_REASONS: usize = 5;

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Turns sub-scores into human-readable reasons. Never fails: implementations
/// that depend on a collaborator must recover locally.
#[async_trait]
pub trait Explainer: Send + Sync {
    /// "rule" or "llm", reported by the stats endpoint.
    fn strategy(&self) -> &'static str;

    async fn explain(
        &self,
        job: &JobRecord,
        profile: Option<&UserProfile>,
        sub_scores: &SubScores,
    ) -> Vec<String>;
}

// ────────────────────────────────────────────────────────────────────────────
// RuleBasedExplainer
// ────────────────────────────────────────────────────────────────────────────

pub struct RuleBasedExplainer;

#[async_trait]
impl Explainer for RuleBasedExplainer {
    fn strategy(&self) -> &'static str {
        "rule"
    }

    async fn explain(
        &self,
        job: &JobRecord,
        profile: Option<&UserProfile>,
        sub_scores: &SubScores,
    ) -> Vec<String> {
        rule_based_reasons(job, profile, sub_scores)
    }
}

/// One sentence per evaluable dimension scoring above `REASON_THRESHOLD`, in
/// canonical dimension order.
pub fn rule_based_reasons(
    job: &JobRecord,
    profile: Option<&UserProfile>,
    sub_scores: &SubScores,
) -> Vec<String> {
    sub_scores
        .evaluable()
        .filter(|(_, score)| *score > REASON_THRESHOLD)
        .filter_map(|(dimension, score)| match dimension {
            Dimension::Semantic => Some(format!(
                "Strong match for your search ({}% relevance)",
                percent(score)
            )),
            Dimension::Skills => profile.and_then(|p| skills_reason(p, job)),
            Dimension::Experience => profile.and_then(|p| experience_reason(p, job, score)),
            Dimension::Salary => profile.and_then(|p| salary_reason(p, job, score)),
            Dimension::Location => profile.map(|p| location_reason(p, job)),
        })
        .collect()
}

fn skills_reason(profile: &UserProfile, job: &JobRecord) -> Option<String> {
    let (matched, missing) = skill_overlap(profile, job);
    if matched.is_empty() {
        return None;
    }
    let total = matched.len() + missing.len();
    let mut listed = matched
        .iter()
        .take(MAX_LISTED_SKILLS)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if matched.len() > MAX_LISTED_SKILLS {
        listed.push_str(", ...");
    }
    Some(format!(
        "Shares {} of {} required skills with your profile: {}",
        matched.len(),
        total,
        listed
    ))
}

fn experience_reason(profile: &UserProfile, job: &JobRecord, score: f64) -> Option<String> {
    let level = job.experience_level?;
    let (lo, hi) = level.year_range();
    let years = format_years(profile.experience_years);
    Some(if score >= 1.0 {
        format!(
            "Your {years} years of experience fit this {} role ({}-{} years)",
            level.label(),
            lo,
            hi
        )
    } else {
        format!(
            "Your {years} years of experience are close to the {}-{} years expected for this {} role",
            lo,
            hi,
            level.label()
        )
    })
}

fn salary_reason(profile: &UserProfile, job: &JobRecord, score: f64) -> Option<String> {
    let offered = format_salary_range(job.salary_min, job.salary_max)?;
    let desired = format_salary_range(profile.desired_salary_min, profile.desired_salary_max)?;
    let verb = if score >= 1.0 { "fits" } else { "overlaps" };
    Some(format!("Salary range {offered} {verb} your target of {desired}"))
}

fn location_reason(profile: &UserProfile, job: &JobRecord) -> String {
    let wants_remote = profile.locations().any(|l| l.eq_ignore_ascii_case("remote"));
    if job.remote_type == Some(RemoteType::Remote) && wants_remote {
        "Fully remote position matches your preference for remote work".to_string()
    } else {
        format!("Located in {}, one of your preferred locations", job.location.trim())
    }
}

fn percent(score: f64) -> i64 {
    (score * 100.0).round() as i64
}

fn format_years(years: f64) -> String {
    if years.fract() == 0.0 {
        format!("{}", years as i64)
    } else {
        format!("{years:.1}")
    }
}

/// `$1,234,567`
pub fn format_money(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    format!("${out}")
}

fn format_salary_range(min: Option<u64>, max: Option<u64>) -> Option<String> {
    match (min, max) {
        (Some(lo), Some(hi)) if lo == hi => Some(format_money(lo)),
        (Some(lo), Some(hi)) => Some(format!("{}-{}", format_money(lo), format_money(hi))),
        (Some(lo), None) => Some(format!("from {}", format_money(lo))),
        (None, Some(hi)) => Some(format!("up to {}", format_money(hi))),
        (None, None) => None,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// DelegatedExplainer
// ────────────────────────────────────────────────────────────────────────────

/// Delegates to a text-generation collaborator, bounded by `timeout`.
/// Any failure degrades to `rule_based_reasons` and is logged, never raised.
pub struct DelegatedExplainer {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl DelegatedExplainer {
    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    async fn try_explain(
        &self,
        job: &JobRecord,
        profile: Option<&UserProfile>,
        sub_scores: &SubScores,
    ) -> Result<Vec<String>, ExplanationUnavailable> {
        let prompt = build_prompt(job, profile, sub_scores);

        let text = tokio::time::timeout(self.timeout, self.generator.generate(&prompt))
            .await
            .map_err(|_| {
                ExplanationUnavailable(format!("timed out after {}ms", self.timeout.as_millis()))
            })?
            .map_err(|e| ExplanationUnavailable(e.to_string()))?;

        let reasons = parse_reasons(&text);
        if reasons.is_empty() {
            return Err(ExplanationUnavailable("empty explanation".to_string()));
        }
        Ok(reasons)
    }
}

#[async_trait]
impl Explainer for DelegatedExplainer {
    fn strategy(&self) -> &'static str {
        "llm"
    }

    async fn explain(
        &self,
        job: &JobRecord,
        profile: Option<&UserProfile>,
        sub_scores: &SubScores,
    ) -> Vec<String> {
        match self.try_explain(job, profile, sub_scores).await {
            Ok(reasons) => {
                debug!("Delegated explanation for job {}", job.id);
                reasons
            }
            Err(e) => {
                warn!("Falling back to rule-based reasons for job {}: {e}", job.id);
                rule_based_reasons(job, profile, sub_scores)
            }
        }
    }
}

/// Accepts a JSON array of strings, or falls back to one reason per
/// non-empty line with list markers stripped.
fn parse_reasons(text: &str) -> Vec<String> {
    let body = strip_json_fences(text);
    let reasons = match serde_json::from_str::<Vec<String>>(body) {
        Ok(items) => items,
        Err(_) => body
            .lines()
            .map(|line| {
                line.trim()
                    .trim_start_matches(|c: char| {
                        c == '-' || c == '*' || c == '•' || c.is_ascii_digit() || c == '.' || c == ')'
                    })
                    .to_string()
            })
            .collect(),
    };

    reasons
        .into_iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .take(MAX_DELEGATED_REASONS)
        .collect()
}

fn build_prompt(job: &JobRecord, profile: Option<&UserProfile>, sub_scores: &SubScores) -> String {
    EXPLAIN_PROMPT_TEMPLATE
        .replace("{job}", &describe_job(job))
        .replace("{profile}", &describe_profile(profile))
        .replace("{scores}", &describe_scores(sub_scores))
}

fn describe_job(job: &JobRecord) -> String {
    let mut parts = vec![format!("Title: {}", job.title), format!("Company: {}", job.company)];
    if !job.location.trim().is_empty() {
        parts.push(format!("Location: {}", job.location.trim()));
    }
    if let Some(remote) = job.remote_type {
        parts.push(format!("Work arrangement: {remote:?}"));
    }
    if let Some(level) = job.experience_level {
        parts.push(format!("Level: {}", level.label()));
    }
    if let Some(salary) = format_salary_range(job.salary_min, job.salary_max) {
        parts.push(format!("Salary: {salary}"));
    }
    if !job.required_skills.is_empty() {
        parts.push(format!("Required skills: {}", job.required_skills.join(", ")));
    }
    let description: String = job.description.chars().take(MAX_DESCRIPTION_CHARS).collect();
    if !description.trim().is_empty() {
        parts.push(format!("Description: {}", description.trim()));
    }
    parts.join("\n")
}

fn describe_profile(profile: Option<&UserProfile>) -> String {
    let Some(profile) = profile else {
        return "No profile supplied".to_string();
    };
    let mut parts = Vec::new();
    if !profile.current_title.trim().is_empty() {
        parts.push(format!("Current role: {}", profile.current_title.trim()));
    }
    parts.push(format!(
        "Years of experience: {}",
        format_years(profile.experience_years)
    ));
    if !profile.skills.is_empty() {
        parts.push(format!("Skills: {}", profile.skills.join(", ")));
    }
    if !profile.preferred_locations.is_empty() {
        parts.push(format!(
            "Preferred locations: {}",
            profile.preferred_locations.join(", ")
        ));
    }
    if let Some(salary) = format_salary_range(profile.desired_salary_min, profile.desired_salary_max)
    {
        parts.push(format!("Desired salary: {salary}"));
    }
    parts.join("\n")
}

fn describe_scores(sub_scores: &SubScores) -> String {
    Dimension::ALL
        .iter()
        .map(|d| match sub_scores.get(*d) {
            Some(score) => format!("{}: {}%", d.label(), percent(score)),
            None => format!("{}: not evaluated", d.label()),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use crate::models::ExperienceLevel;

    fn job() -> JobRecord {
        JobRecord {
            id: "a".to_string(),
            title: "Senior Python Engineer".to_string(),
            company: "Acme".to_string(),
            description: "Backend services".to_string(),
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
            experience_years: 6.0,
            skills: vec!["Python".to_string(), "SQL".to_string()],
            preferred_locations: vec!["Remote".to_string()],
            desired_salary_min: Some(100_000),
            desired_salary_max: Some(150_000),
            ..Default::default()
        }
    }

    fn strong_scores() -> SubScores {
        SubScores {
            semantic: 0.8,
            skills: Some(2.0 / 3.0),
            experience: Some(1.0),
            salary: Some(1.0),
            location: Some(1.0),
        }
    }

    struct FixedGenerator(Result<String, ()>);

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            self.0.clone().map_err(|_| LlmError::EmptyContent)
        }
    }

    struct SlowGenerator;

    #[async_trait]
    impl TextGenerator for SlowGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(r#"["too late"]"#.to_string())
        }
    }

    #[test]
    fn test_rule_reasons_cover_each_strong_dimension() {
        let reasons = rule_based_reasons(&job(), Some(&profile()), &strong_scores());
        assert_eq!(
            reasons,
            vec![
                "Strong match for your search (80% relevance)".to_string(),
                "Shares 2 of 3 required skills with your profile: Python, SQL".to_string(),
                "Your 6 years of experience fit this senior role (5-12 years)".to_string(),
                "Salary range $110,000-$140,000 fits your target of $100,000-$150,000".to_string(),
                "Fully remote position matches your preference for remote work".to_string(),
            ]
        );
    }

    #[test]
    fn test_rule_reasons_skip_weak_and_missing_dimensions() {
        let scores = SubScores {
            semantic: 0.6,
            skills: Some(0.2),
            experience: None,
            salary: Some(0.0),
            location: None,
        };
        assert!(rule_based_reasons(&job(), Some(&profile()), &scores).is_empty());
    }

    #[test]
    fn test_rule_reasons_without_profile_mention_only_semantics() {
        let scores = SubScores {
            semantic: 0.9,
            skills: None,
            experience: None,
            salary: None,
            location: None,
        };
        let reasons = rule_based_reasons(&job(), None, &scores);
        assert_eq!(reasons.len(), 1);
        assert!(reasons[0].contains("90%"));
    }

    #[test]
    fn test_near_miss_experience_wording() {
        let junior = UserProfile {
            experience_years: 4.5,
            ..profile()
        };
        let reason = experience_reason(&junior, &job(), 0.9).unwrap();
        assert!(reason.contains("4.5 years"));
        assert!(reason.contains("close to"));
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(0), "$0");
        assert_eq!(format_money(999), "$999");
        assert_eq!(format_money(110_000), "$110,000");
        assert_eq!(format_money(1_234_567), "$1,234,567");
        assert_eq!(format_salary_range(Some(5), None).unwrap(), "from $5");
    }

    #[test]
    fn test_parse_reasons_json_and_lines() {
        let json = "```json\n[\"Great skills fit\", \"  \", \"Remote friendly\"]\n```";
        assert_eq!(parse_reasons(json), vec!["Great skills fit", "Remote friendly"]);

        let lines = "- Great skills fit\n\n2. Remote friendly\n";
        assert_eq!(parse_reasons(lines), vec!["Great skills fit", "Remote friendly"]);
    }

    #[test]
    fn test_prompt_contains_job_profile_and_scores() {
        let prompt = build_prompt(&job(), Some(&profile()), &strong_scores());
        assert!(prompt.contains("Title: Senior Python Engineer"));
        assert!(prompt.contains("Skills: Python, SQL"));
        assert!(prompt.contains("semantic: 80%"));
        assert!(!prompt.contains("{job}"));

        let anonymous = build_prompt(&job(), None, &strong_scores());
        assert!(anonymous.contains("No profile supplied"));
    }

    #[tokio::test]
    async fn test_delegated_output_replaces_rules() {
        let explainer = DelegatedExplainer::new(
            Arc::new(FixedGenerator(Ok(r#"["Custom reason"]"#.to_string()))),
            Duration::from_secs(1),
        );
        let reasons = explainer.explain(&job(), Some(&profile()), &strong_scores()).await;
        assert_eq!(reasons, vec!["Custom reason"]);
        assert_eq!(explainer.strategy(), "llm");
    }

    #[tokio::test]
    async fn test_delegated_error_falls_back_to_rules() {
        let explainer =
            DelegatedExplainer::new(Arc::new(FixedGenerator(Err(()))), Duration::from_secs(1));
        let reasons = explainer.explain(&job(), Some(&profile()), &strong_scores()).await;
        assert_eq!(
            reasons,
            rule_based_reasons(&job(), Some(&profile()), &strong_scores())
        );
    }

    #[tokio::test]
    async fn test_delegated_empty_output_falls_back_to_rules() {
        let explainer = DelegatedExplainer::new(
            Arc::new(FixedGenerator(Ok("[]".to_string()))),
            Duration::from_secs(1),
        );
        let reasons = explainer.explain(&job(), Some(&profile()), &strong_scores()).await;
        assert_eq!(reasons.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delegated_timeout_falls_back_to_rules() {
        let explainer = DelegatedExplainer::new(Arc::new(SlowGenerator), Duration::from_millis(50));
        let reasons = explainer.explain(&job(), Some(&profile()), &strong_scores()).await;
        assert_eq!(
            reasons,
            rule_based_reasons(&job(), Some(&profile()), &strong_scores())
        );
    }

    #[tokio::test]
    async fn test_rule_based_explainer_matches_free_function() {
        let reasons = RuleBasedExplainer
            .explain(&job(), Some(&profile()), &strong_scores())
            .await;
        assert_eq!(
            reasons,
            rule_based_reasons(&job(), Some(&profile()), &strong_scores())
        );
        assert_eq!(RuleBasedExplainer.strategy(), "rule");
    }
}
