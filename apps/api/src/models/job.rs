use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// Seniority band of a posting. Ordered from most junior to most senior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    #[serde(alias = "entry_level")]
    Entry,
    Associate,
    #[serde(alias = "mid_level")]
    Mid,
    #[serde(alias = "senior_level")]
    Senior,
    Director,
    Executive,
}

impl ExperienceLevel {
    /// Years-of-experience band used by the experience sub-score.
    pub fn year_range(self) -> (f64, f64) {
        match self {
            ExperienceLevel::Entry => (0.0, 2.0),
            ExperienceLevel::Associate => (1.0, 3.0),
            ExperienceLevel::Mid => (3.0, 7.0),
            ExperienceLevel::Senior => (5.0, 12.0),
            ExperienceLevel::Director => (8.0, 20.0),
            ExperienceLevel::Executive => (10.0, 30.0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExperienceLevel::Entry => "entry-level",
            ExperienceLevel::Associate => "associate",
            ExperienceLevel::Mid => "mid-level",
            ExperienceLevel::Senior => "senior",
            ExperienceLevel::Director => "director",
            ExperienceLevel::Executive => "executive",
        }
    }

    /// Parses stored column values; accepts both short and `*_level` spellings.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "entry" | "entry_level" => Some(ExperienceLevel::Entry),
            "associate" => Some(ExperienceLevel::Associate),
            "mid" | "mid_level" => Some(ExperienceLevel::Mid),
            "senior" | "senior_level" => Some(ExperienceLevel::Senior),
            "director" => Some(ExperienceLevel::Director),
            "executive" => Some(ExperienceLevel::Executive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteType {
    #[serde(alias = "onsite")]
    OnSite,
    Remote,
    Hybrid,
}

impl RemoteType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "on_site" | "onsite" => Some(RemoteType::OnSite),
            "remote" => Some(RemoteType::Remote),
            "hybrid" => Some(RemoteType::Hybrid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Internship,
    Other,
}

impl JobType {
    /// Unrecognised types (freelance, temporary, ...) collapse into `Other`.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "" => None,
            "full_time" => Some(JobType::FullTime),
            "part_time" => Some(JobType::PartTime),
            "contract" => Some(JobType::Contract),
            "internship" => Some(JobType::Internship),
            _ => Some(JobType::Other),
        }
    }
}

/// A scraped job posting as consumed by the matching engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    pub experience_level: Option<ExperienceLevel>,
    pub salary_min: Option<u64>,
    pub salary_max: Option<u64>,
    pub remote_type: Option<RemoteType>,
    pub job_type: Option<JobType>,
    #[serde(default)]
    pub location: String,
    pub posted_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    pub fn has_salary(&self) -> bool {
        self.salary_min.is_some() || self.salary_max.is_some()
    }
}

/// Row shape of the `job_listings` table. List columns are `json` and
/// `posted_date` is a zone-less `timestamp` written in UTC.
#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: String,
    pub title: String,
    pub company: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub requirements: Option<Json<Vec<String>>>,
    pub skills_required: Option<Json<Vec<String>>>,
    pub experience_level: Option<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub remote_type: Option<String>,
    pub job_type: Option<String>,
    pub posted_date: Option<NaiveDateTime>,
}

impl From<JobRow> for JobRecord {
    fn from(row: JobRow) -> Self {
        // Negative or NaN salaries are scraper noise; treat them as missing.
        let salary = |v: Option<f64>| v.filter(|s| s.is_finite() && *s >= 0.0).map(|s| s as u64);
        let mut salary_min = salary(row.salary_min);
        let mut salary_max = salary(row.salary_max);
        if let (Some(lo), Some(hi)) = (salary_min, salary_max) {
            if lo > hi {
                salary_min = Some(hi);
                salary_max = Some(lo);
            }
        }

        JobRecord {
            id: row.id,
            title: row.title,
            company: row.company,
            description: row.description.unwrap_or_default(),
            requirements: row.requirements.map(|Json(v)| v).unwrap_or_default(),
            required_skills: row.skills_required.map(|Json(v)| v).unwrap_or_default(),
            experience_level: row.experience_level.as_deref().and_then(ExperienceLevel::parse),
            salary_min,
            salary_max,
            remote_type: row.remote_type.as_deref().and_then(RemoteType::parse),
            job_type: row.job_type.as_deref().and_then(JobType::parse),
            location: row.location.unwrap_or_default(),
            posted_at: row.posted_date.map(|naive| naive.and_utc()),
        }
    }
}
