pub mod ai;
pub mod deps;
pub mod traits;

#[cfg(test)]
pub mod test_dependencies;

pub use traits::{BaseAI, BaseEmbeddingService, BaseSchedulingService, ChatTurn};

/// Chat completion model.
pub const CLAUDE_SONNET: &str = "claude-sonnet-4-20250514";

/// Embedding model. 1536 dimensions, matches the vector column width.
pub const EMBEDDING_MODEL: &str = "text-embedding-3-small";
