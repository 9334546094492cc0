// Prompt templates for delegated match explanations.
// Placeholders are substituted with `str::replace`.

pub const EXPLAIN_PROMPT_TEMPLATE: &str = r#"You are a career advisor explaining why a job posting was ranked for a candidate.

Job posting:
{job}

Candidate profile:
{profile}

Match scores (0-100%, higher is better):
{scores}

Write 2 to 4 short, specific sentences explaining the match. Reference concrete skills,
experience, salary or location facts from the data above. Be honest about gaps.
Do not invent facts that are not in the data.

Respond with a JSON array of strings, one sentence per element, and nothing else."#;

/// Character cap on the job description embedded in the prompt.
pub const MAX_DESCRIPTION_CHARS: usize = 1500;
