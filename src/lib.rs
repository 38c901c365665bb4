//! palaver is a streaming chat client for a key-authenticated chat endpoint.
//!
//! A [`ChatSession`] holds the conversation, sends each accepted message as one
//! `POST {base_url}/chat` request, and folds the streamed reply into the transcript
//! fragment by fragment.  State lives in a [`KeyValueStore`] so the credential and
//! conversation survive restarts.

// Public modules
pub mod chat;
pub mod client;
pub mod credential;
pub mod decode;
pub mod error;
pub mod render;
pub mod session;
pub mod store;
pub mod types;

mod observability;

// Re-exports
pub use client::{ChatClient, ChatTransport, TextStream, chat_endpoint};
pub use credential::{CredentialGate, accept_credential};
pub use decode::{Utf8Decoder, decode_text_stream};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use render::{PlainTextRenderer, Renderer, render_transcript};
pub use session::{
    ChatSession, ChatState, ERROR_MESSAGE, SkipReason, TurnOutcome, load_transcript,
    save_transcript,
};
pub use store::{CREDENTIAL_KEY, FileStore, KeyValueStore, MemoryStore, TRANSCRIPT_KEY};
pub use types::*;
