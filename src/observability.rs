use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("palaver.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("palaver.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("palaver.client.request_duration_seconds");

pub(crate) static STREAM_CHUNKS: Counter = Counter::new("palaver.stream.chunks");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("palaver.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("palaver.stream.bytes");

pub(crate) static SESSION_TURNS: Counter = Counter::new("palaver.session.turns");
pub(crate) static SESSION_TURN_ERRORS: Counter = Counter::new("palaver.session.turn_errors");
pub(crate) static SESSION_TURNS_SKIPPED: Counter = Counter::new("palaver.session.turns_skipped");
pub(crate) static SESSION_TURN_DURATION: Moments =
    Moments::new("palaver.session.turn_duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);

    collector.register_counter(&SESSION_TURNS);
    collector.register_counter(&SESSION_TURN_ERRORS);
    collector.register_counter(&SESSION_TURNS_SKIPPED);
    collector.register_moments(&SESSION_TURN_DURATION);
}
