use serde::{Deserialize, Serialize};

/// Per-request candidate profile. Never persisted by the matching engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub current_title: String,
    #[serde(default)]
    pub experience_years: f64,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub preferred_locations: Vec<String>,
    pub desired_salary_min: Option<u64>,
    pub desired_salary_max: Option<u64>,
    #[serde(default)]
    pub preferred_titles: Vec<String>,
    pub industry: Option<String>,
}

impl UserProfile {
    pub fn has_salary_preference(&self) -> bool {
        self.desired_salary_min.is_some() || self.desired_salary_max.is_some()
    }

    /// Preferred locations with blanks removed.
    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.preferred_locations
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
    }
}
