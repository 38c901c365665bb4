//! Core chat session management.
//!
//! [`ChatState`] is the synchronous reducer: it owns the transcript and the busy flag
//! and knows how a turn moves from submission through streaming to completion or
//! failure.  [`ChatSession`] drives it, pairing each accepted submission with exactly
//! one streaming request and persisting the transcript after every change.

use std::time::Instant;

use futures::StreamExt;
use tracing::{debug, warn};

use crate::client::ChatTransport;
use crate::credential::CredentialGate;
use crate::error::{Error, Result};
use crate::observability::{
    SESSION_TURN_DURATION, SESSION_TURN_ERRORS, SESSION_TURNS, SESSION_TURNS_SKIPPED,
};
use crate::render::Renderer;
use crate::store::{KeyValueStore, TRANSCRIPT_KEY};
use crate::types::{Message, Transcript};

/// Text left in place of the reply when a turn fails for any reason.
pub const ERROR_MESSAGE: &str =
    "Sorry, there was an error processing your request. Please check your API key and try again.";

/// Why a submission was dropped without touching the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The input was empty after trimming.
    EmptyInput,
    /// Another turn is still streaming.
    Busy,
    /// No credential is held.
    MissingCredential,
}

/// The result of one call to [`ChatSession::submit`].
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// The response streamed to completion.
    Completed,
    /// The request failed; the reply slot holds [`ERROR_MESSAGE`].
    Failed(Error),
    /// Nothing was sent.
    Skipped(SkipReason),
}

impl TurnOutcome {
    /// True if the response streamed to completion.
    pub fn is_completed(&self) -> bool {
        matches!(self, TurnOutcome::Completed)
    }

    /// True if the turn ended in an error.
    pub fn is_failed(&self) -> bool {
        matches!(self, TurnOutcome::Failed(_))
    }

    /// The skip reason, if the submission was dropped.
    pub fn skipped(&self) -> Option<SkipReason> {
        match self {
            TurnOutcome::Skipped(reason) => Some(*reason),
            _ => None,
        }
    }
}

///////////////////////////////////////// ChatState /////////////////////////////////////////

/// Transcript plus in-flight bookkeeping.
///
/// While busy, the transcript ends with the user's message followed by the assistant
/// reply being filled in.  Each fragment replaces that reply with everything received
/// so far.
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    transcript: Transcript,
    busy: bool,
    received: String,
}

impl ChatState {
    /// An idle state over `transcript`.
    pub fn new(transcript: Transcript) -> Self {
        Self {
            transcript,
            busy: false,
            received: String::new(),
        }
    }

    /// Accepts `input` as the next turn and appends it as a user message.
    ///
    /// Returns the trimmed prompt to send.  Empty input and input arriving while a turn
    /// is in flight are refused and leave the state untouched.
    pub fn begin_turn(&mut self, input: &str) -> std::result::Result<String, SkipReason> {
        let prompt = input.trim();
        if prompt.is_empty() {
            return Err(SkipReason::EmptyInput);
        }
        if self.busy {
            return Err(SkipReason::Busy);
        }
        self.busy = true;
        self.received.clear();
        self.transcript.push(Message::user(prompt));
        Ok(prompt.to_string())
    }

    /// Appends the empty assistant message that streamed text will fill.
    pub fn reserve_reply(&mut self) {
        self.transcript.push(Message::placeholder());
    }

    /// Folds `fragment` into the reply.
    ///
    /// Returns false if no turn is in flight or the reply slot is gone.
    pub fn apply_chunk(&mut self, fragment: &str) -> bool {
        if !self.busy {
            return false;
        }
        self.received.push_str(fragment);
        self.transcript
            .replace_last_assistant(self.received.as_str())
    }

    /// Ends the turn successfully.
    pub fn finish_turn(&mut self) {
        self.busy = false;
        self.received.clear();
    }

    /// Ends the turn with [`ERROR_MESSAGE`] in the reply slot.
    pub fn fail_turn(&mut self) {
        self.transcript.replace_last_assistant(ERROR_MESSAGE);
        self.busy = false;
        self.received.clear();
    }

    /// Drops every message.
    pub fn clear(&mut self) {
        self.transcript.clear();
    }

    /// True while a turn is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// The current transcript.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }
}

//////////////////////////////////////// ChatSession ////////////////////////////////////////

/// A chat session that manages conversation state and API interactions.
pub struct ChatSession<T: ChatTransport, S: KeyValueStore> {
    transport: T,
    store: S,
    gate: CredentialGate,
    state: ChatState,
}

impl<T: ChatTransport, S: KeyValueStore> ChatSession<T, S> {
    /// Creates a session, restoring the credential and transcript from `store`.
    ///
    /// A transcript that cannot be read or parsed is logged and replaced by an empty
    /// one.  Failing to read the credential is an error.
    pub fn open(transport: T, store: S) -> Result<Self> {
        let gate = CredentialGate::load(&store)?;
        let transcript = load_transcript(&store);
        Ok(Self {
            transport,
            store,
            gate,
            state: ChatState::new(transcript),
        })
    }

    /// Sends `input` and streams the reply into the transcript.
    ///
    /// The user message and an empty reply are appended before the request goes out.
    /// Each fragment then replaces the reply with all text received so far.  On any
    /// failure the reply becomes [`ERROR_MESSAGE`]; the error is returned in the
    /// outcome and not retried.
    pub async fn submit(&mut self, input: &str, renderer: &mut dyn Renderer) -> TurnOutcome {
        let Some(credential) = self.gate.get().map(str::to_string) else {
            SESSION_TURNS_SKIPPED.click();
            return TurnOutcome::Skipped(SkipReason::MissingCredential);
        };
        let prompt = match self.state.begin_turn(input) {
            Ok(prompt) => prompt,
            Err(reason) => {
                SESSION_TURNS_SKIPPED.click();
                debug!(?reason, "submission skipped");
                return TurnOutcome::Skipped(reason);
            }
        };
        SESSION_TURNS.click();
        let start = Instant::now();
        self.sync(renderer);
        renderer.start_response();
        self.state.reserve_reply();
        self.sync(renderer);

        let failure = match self.transport.stream_chat(&prompt, &credential).await {
            Ok(mut fragments) => {
                let mut failure = None;
                while let Some(fragment) = fragments.next().await {
                    match fragment {
                        Ok(fragment) => {
                            self.state.apply_chunk(&fragment);
                            self.sync(renderer);
                            renderer.print_text(&fragment);
                        }
                        Err(err) => {
                            failure = Some(err);
                            break;
                        }
                    }
                }
                failure
            }
            Err(err) => Some(err),
        };
        SESSION_TURN_DURATION.add(start.elapsed().as_secs_f64());

        match failure {
            None => {
                self.state.finish_turn();
                renderer.finish_response();
                TurnOutcome::Completed
            }
            Some(err) => {
                SESSION_TURN_ERRORS.click();
                warn!(error = %err, "chat request failed");
                self.state.fail_turn();
                self.sync(renderer);
                renderer.print_error(ERROR_MESSAGE);
                TurnOutcome::Failed(err)
            }
        }
    }

    /// Offers `input` to the credential gate.  Returns whether it was accepted.
    pub fn set_credential(&mut self, input: &str) -> Result<bool> {
        self.gate.submit(&mut self.store, input)
    }

    /// Forgets the credential.  Submissions are refused until a new one is set.
    pub fn clear_credential(&mut self) -> Result<()> {
        self.gate.clear(&mut self.store)
    }

    /// Empties the transcript and removes its persisted form.
    pub fn clear_transcript(&mut self) -> Result<()> {
        self.state.clear();
        self.store.remove(TRANSCRIPT_KEY)
    }

    /// True when a credential is held.
    pub fn has_credential(&self) -> bool {
        self.gate.is_unlocked()
    }

    /// True while a turn is in flight.
    pub fn is_busy(&self) -> bool {
        self.state.is_busy()
    }

    /// The current transcript.
    pub fn transcript(&self) -> &Transcript {
        self.state.transcript()
    }

    /// Returns the number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.state.transcript().len()
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn sync(&mut self, renderer: &mut dyn Renderer) {
        if let Err(err) = save_transcript(&mut self.store, self.state.transcript()) {
            warn!(error = %err, "failed to persist transcript");
        }
        renderer.transcript_changed(self.state.transcript());
    }
}

/// Reads the persisted transcript, falling back to empty on any problem.
pub fn load_transcript<S: KeyValueStore>(store: &S) -> Transcript {
    let json = match store.get(TRANSCRIPT_KEY) {
        Ok(Some(json)) => json,
        Ok(None) => return Transcript::new(),
        Err(err) => {
            warn!(error = %err, "failed to read saved messages");
            return Transcript::new();
        }
    };
    match Transcript::from_json(&json) {
        Ok(transcript) => transcript,
        Err(err) => {
            warn!(error = %err, "failed to parse saved messages");
            Transcript::new()
        }
    }
}

/// Writes `transcript` to its persisted form.
pub fn save_transcript<S: KeyValueStore>(store: &mut S, transcript: &Transcript) -> Result<()> {
    store.set(TRANSCRIPT_KEY, &transcript.to_json()?)
}
