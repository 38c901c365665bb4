// Public modules
pub mod message;
pub mod transcript;

// Re-exports
pub use message::{Message, MessageRole};
pub use transcript::Transcript;
