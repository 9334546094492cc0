//! Filter Evaluator: pure predicates over a job record.
//!
//! Every filter field is optional and an empty collection means "no
//! constraint". Specified fields are ANDed. Missing job data never excludes a
//! job: unknown salary, age, or enumerated value passes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ExperienceLevel, JobRecord, JobType, RemoteType};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilters {
    pub min_salary: Option<u64>,
    pub max_salary: Option<u64>,
    pub job_types: Vec<JobType>,
    pub remote_types: Vec<RemoteType>,
    pub experience_levels: Vec<ExperienceLevel>,
    /// All must be present in the job's skills or description.
    pub required_skills: Vec<String>,
    pub max_age_days: Option<u32>,
    /// Any may be a substring of the job location.
    pub locations: Vec<String>,
    pub companies: Vec<String>,
    /// None may be among the job's skills.
    pub excluded_skills: Vec<String>,
}

/// Closed-or-open salary interval. A missing bound is open on that side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SalaryRange {
    pub min: Option<u64>,
    pub max: Option<u64>,
}

impl SalaryRange {
    pub fn is_unknown(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// `(lower, upper)` with open ends as `0` and `+inf`.
    pub fn bounds(&self) -> (f64, f64) {
        (
            self.min.map_or(0.0, |v| v as f64),
            self.max.map_or(f64::INFINITY, |v| v as f64),
        )
    }

    pub fn overlaps(&self, other: &SalaryRange) -> bool {
        let (a_lo, a_hi) = self.bounds();
        let (b_lo, b_hi) = other.bounds();
        a_lo <= b_hi && b_lo <= a_hi
    }
}

/// Comparable view of a job's filterable fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobFacets {
    pub salary: SalaryRange,
    pub remote_type: Option<RemoteType>,
    pub job_type: Option<JobType>,
    pub experience_level: Option<ExperienceLevel>,
    /// Whole days since posting; `None` when the posting date is unknown.
    pub age_days: Option<i64>,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterVerdict {
    pub passed: bool,
    pub facets: JobFacets,
}

/// Trimmed, lower-cased comparison key for skills, companies and locations.
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

pub fn facets(job: &JobRecord, now: DateTime<Utc>) -> JobFacets {
    let mut skills: Vec<String> = job
        .required_skills
        .iter()
        .map(|s| normalize_term(s))
        .filter(|s| !s.is_empty())
        .collect();
    skills.sort();
    skills.dedup();

    JobFacets {
        salary: SalaryRange {
            min: job.salary_min,
            max: job.salary_max,
        },
        remote_type: job.remote_type,
        job_type: job.job_type,
        experience_level: job.experience_level,
        age_days: job
            .posted_at
            .map(|posted| now.signed_duration_since(posted).num_days()),
        skills,
    }
}

pub fn evaluate(filters: &SearchFilters, job: &JobRecord, now: DateTime<Utc>) -> FilterVerdict {
    let facets = facets(job, now);
    let passed = salary_passes(filters, &facets)
        && member_or_unknown(&filters.job_types, facets.job_type)
        && member_or_unknown(&filters.remote_types, facets.remote_type)
        && member_or_unknown(&filters.experience_levels, facets.experience_level)
        && required_skills_pass(filters, job, &facets)
        && excluded_skills_pass(filters, &facets)
        && age_passes(filters, job, now)
        && locations_pass(filters, job)
        && companies_pass(filters, job);

    FilterVerdict { passed, facets }
}

pub fn passes(filters: &SearchFilters, job: &JobRecord, now: DateTime<Utc>) -> bool {
    evaluate(filters, job, now).passed
}

fn salary_passes(filters: &SearchFilters, facets: &JobFacets) -> bool {
    let wanted = SalaryRange {
        min: filters.min_salary,
        max: filters.max_salary,
    };
    if wanted.is_unknown() || facets.salary.is_unknown() {
        return true;
    }
    facets.salary.overlaps(&wanted)
}

fn member_or_unknown<T: PartialEq>(allowed: &[T], value: Option<T>) -> bool {
    match value {
        Some(v) if !allowed.is_empty() => allowed.contains(&v),
        _ => true,
    }
}

fn required_skills_pass(filters: &SearchFilters, job: &JobRecord, facets: &JobFacets) -> bool {
    if filters.required_skills.is_empty() {
        return true;
    }
    // Scraped skill lists are often incomplete, so fall back to the description.
    let description = job.description.to_lowercase();
    filters
        .required_skills
        .iter()
        .map(|s| normalize_term(s))
        .filter(|s| !s.is_empty())
        .all(|skill| facets.skills.contains(&skill) || description.contains(&skill))
}

fn excluded_skills_pass(filters: &SearchFilters, facets: &JobFacets) -> bool {
    !filters
        .excluded_skills
        .iter()
        .map(|s| normalize_term(s))
        .any(|skill| facets.skills.contains(&skill))
}

fn age_passes(filters: &SearchFilters, job: &JobRecord, now: DateTime<Utc>) -> bool {
    match (filters.max_age_days, job.posted_at) {
        (Some(max_days), Some(posted)) => {
            now.signed_duration_since(posted) <= Duration::days(i64::from(max_days))
        }
        _ => true,
    }
}

fn locations_pass(filters: &SearchFilters, job: &JobRecord) -> bool {
    let wanted: Vec<String> = filters
        .locations
        .iter()
        .map(|l| normalize_term(l))
        .filter(|l| !l.is_empty())
        .collect();
    if wanted.is_empty() {
        return true;
    }
    let location = normalize_term(&job.location);
    wanted.iter().any(|w| {
        (w == "remote" && job.remote_type == Some(RemoteType::Remote))
            || (!location.is_empty() && location.contains(w.as_str()))
    })
}

fn companies_pass(filters: &SearchFilters, job: &JobRecord) -> bool {
    if filters.companies.is_empty() {
        return true;
    }
    let company = normalize_term(&job.company);
    filters.companies.iter().any(|c| normalize_term(c) == company)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn job() -> JobRecord {
        JobRecord {
            id: "job-1".to_string(),
            title: "Backend Engineer".to_string(),
            company: "Acme Corp".to_string(),
            description: "We use Kubernetes and PostgreSQL daily.".to_string(),
            requirements: vec![],
            required_skills: vec![" Python ".to_string(), "SQL".to_string()],
            experience_level: Some(ExperienceLevel::Mid),
            salary_min: Some(100_000),
            salary_max: Some(130_000),
            remote_type: Some(RemoteType::Hybrid),
            job_type: Some(JobType::FullTime),
            location: "Berlin, Germany".to_string(),
            posted_at: Some(now() - Duration::days(10)),
        }
    }

    fn bare_job() -> JobRecord {
        JobRecord {
            salary_min: None,
            salary_max: None,
            experience_level: None,
            remote_type: None,
            job_type: None,
            posted_at: None,
            ..job()
        }
    }

    #[test]
    fn test_empty_filters_pass_everything() {
        let filters = SearchFilters::default();
        assert!(passes(&filters, &job(), now()));
        assert!(passes(&filters, &bare_job(), now()));
    }

    #[test]
    fn test_salary_overlap() {
        let mut filters = SearchFilters {
            min_salary: Some(120_000),
            ..Default::default()
        };
        assert!(passes(&filters, &job(), now()));

        filters.min_salary = Some(140_000);
        assert!(!passes(&filters, &job(), now()));

        filters.min_salary = None;
        filters.max_salary = Some(90_000);
        assert!(!passes(&filters, &job(), now()));

        filters.max_salary = Some(100_000);
        assert!(passes(&filters, &job(), now()));
    }

    #[test]
    fn test_salary_filter_never_excludes_missing_salary() {
        let filters = SearchFilters {
            min_salary: Some(500_000),
            max_salary: Some(600_000),
            ..Default::default()
        };
        assert!(passes(&filters, &bare_job(), now()));
    }

    #[test]
    fn test_one_sided_job_salary_is_open_ended() {
        let only_min = JobRecord {
            salary_max: None,
            ..job()
        };
        let filters = SearchFilters {
            min_salary: Some(250_000),
            ..Default::default()
        };
        assert!(passes(&filters, &only_min, now()));
    }

    #[test]
    fn test_enumerated_filters() {
        let filters = SearchFilters {
            remote_types: vec![RemoteType::Remote],
            ..Default::default()
        };
        assert!(!passes(&filters, &job(), now()));

        let filters = SearchFilters {
            job_types: vec![JobType::Contract, JobType::FullTime],
            experience_levels: vec![ExperienceLevel::Mid],
            ..Default::default()
        };
        assert!(passes(&filters, &job(), now()));
    }

    #[test]
    fn test_enumerated_filters_pass_unknown_values() {
        let filters = SearchFilters {
            remote_types: vec![RemoteType::Remote],
            experience_levels: vec![ExperienceLevel::Senior],
            ..Default::default()
        };
        assert!(passes(&filters, &bare_job(), now()));
    }

    #[test]
    fn test_required_skills_case_insensitive_with_description_fallback() {
        let filters = SearchFilters {
            required_skills: vec!["python".to_string(), " kubernetes ".to_string()],
            ..Default::default()
        };
        assert!(passes(&filters, &job(), now()));

        let filters = SearchFilters {
            required_skills: vec!["python".to_string(), "rust".to_string()],
            ..Default::default()
        };
        assert!(!passes(&filters, &job(), now()));
    }

    #[test]
    fn test_excluded_skills() {
        let filters = SearchFilters {
            excluded_skills: vec!["sql".to_string()],
            ..Default::default()
        };
        assert!(!passes(&filters, &job(), now()));
    }

    #[test]
    fn test_max_age_days() {
        let filters = SearchFilters {
            max_age_days: Some(10),
            ..Default::default()
        };
        assert!(passes(&filters, &job(), now()));

        let filters = SearchFilters {
            max_age_days: Some(9),
            ..Default::default()
        };
        assert!(!passes(&filters, &job(), now()));
        assert!(passes(&filters, &bare_job(), now()));
    }

    #[test]
    fn test_locations_and_companies() {
        let filters = SearchFilters {
            locations: vec!["berlin".to_string()],
            companies: vec!["ACME corp".to_string()],
            ..Default::default()
        };
        assert!(passes(&filters, &job(), now()));

        let filters = SearchFilters {
            locations: vec!["Remote".to_string()],
            ..Default::default()
        };
        assert!(!passes(&filters, &job(), now()));

        let remote = JobRecord {
            remote_type: Some(RemoteType::Remote),
            location: String::new(),
            ..job()
        };
        assert!(passes(&filters, &remote, now()));
    }

    #[test]
    fn test_facets_normalize_job_fields() {
        let verdict = evaluate(&SearchFilters::default(), &job(), now());
        assert!(verdict.passed);
        assert_eq!(verdict.facets.age_days, Some(10));
        assert_eq!(verdict.facets.skills, vec!["python", "sql"]);
        assert_eq!(verdict.facets.salary.bounds(), (100_000.0, 130_000.0));
        assert_eq!(bare_job().posted_at, None);
        assert_eq!(facets(&bare_job(), now()).age_days, None);
    }
}
