pub mod job;
pub mod profile;

pub use job::{ExperienceLevel, JobRecord, JobRow, JobType, RemoteType};
pub use profile::UserProfile;
