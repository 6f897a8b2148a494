pub mod matching;
pub mod models;

pub use matching::{MatchCandidate, MatchSource, VolunteerMatch};
pub use models::Volunteer;
