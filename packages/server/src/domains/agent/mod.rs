pub mod classify;
pub mod context;
pub mod dates;
pub mod extract;
pub mod format;
pub mod orchestrator;
pub mod prompts;
pub mod retrieval;

pub use context::{ConversationContext, PendingAction};
pub use orchestrator::{answer_question, process_interaction, ChatUser};
