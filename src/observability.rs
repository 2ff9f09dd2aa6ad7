use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("chatline.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("chatline.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("chatline.client.request_duration_seconds");

pub(crate) static SESSION_AUTHENTICATIONS: Counter =
    Counter::new("chatline.session.authentications");
pub(crate) static SESSION_VALIDATIONS: Counter = Counter::new("chatline.session.validations");
pub(crate) static SESSION_FAILURES: Counter = Counter::new("chatline.session.failures");

pub(crate) static THREAD_CREATIONS: Counter = Counter::new("chatline.thread.creations");
pub(crate) static THREAD_CREATION_ERRORS: Counter =
    Counter::new("chatline.thread.creation_errors");

pub(crate) static STREAM_CHUNKS: Counter = Counter::new("chatline.stream.chunks");
pub(crate) static STREAM_BYTES: Counter = Counter::new("chatline.stream.bytes");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("chatline.stream.errors");
pub(crate) static STREAM_DURATION: Moments = Moments::new("chatline.stream.duration_seconds");

pub(crate) static EVALUATIONS: Counter = Counter::new("chatline.evaluation.sent");
pub(crate) static EVALUATION_ERRORS: Counter = Counter::new("chatline.evaluation.errors");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&SESSION_AUTHENTICATIONS);
    collector.register_counter(&SESSION_VALIDATIONS);
    collector.register_counter(&SESSION_FAILURES);

    collector.register_counter(&THREAD_CREATIONS);
    collector.register_counter(&THREAD_CREATION_ERRORS);

    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&EVALUATIONS);
    collector.register_counter(&EVALUATION_ERRORS);
}
