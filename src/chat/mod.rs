//! Interactive chat application support.
//!
//! This module holds the pieces of the `palaver-chat` REPL that are not part of the
//! session itself:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`commands`]: slash command parsing and help text
//! - [`secret`]: masked entry of the API key

mod commands;
mod config;
mod secret;

pub use crate::render::{PlainTextRenderer, Renderer, render_transcript};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{BASE_URL_ENV, ChatArgs, ChatConfig};
pub use secret::{SecretMask, mask};
