pub mod models;

pub use models::{ChatMessage, FollowUp, Interaction};
