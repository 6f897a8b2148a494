pub mod config;
pub mod domains;
pub mod kernel;

pub use config::Config;
pub use kernel::deps::ServerDeps;
