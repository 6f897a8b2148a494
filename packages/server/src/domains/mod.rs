pub mod agent;
pub mod interactions;
pub mod volunteers;
