//! Fakes and builders shared by the unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use bes_proto::build_event::{
    BuildComponentStreamFinished, BuildEnqueued, BuildFinished, ConsoleOutput, Event,
    InvocationAttemptFinished, InvocationAttemptStarted, console_output,
};
use bes_proto::build_event_stream::{self, TestResult, TestStatus};
use bes_proto::stream_id::BuildComponent;
use bes_proto::{
    Any, BuildEvent, OrderedBuildEvent, PublishBuildToolEventStreamRequest,
    PublishBuildToolEventStreamResponse, StreamId,
};

use crate::errors::{ObserverError, TransportError};
use crate::observer::{EventContext, EventObserver};
use crate::transport::{AckSink, EnvelopeStream};

/// Observer that remembers every test result it was shown.
#[derive(Default)]
pub struct RecordingObserver {
    results: Mutex<Vec<String>>,
    unrecognized: AtomicUsize,
    fail: bool,
}

impl RecordingObserver {
    /// Records like the default observer but reports every callback as failed.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// `status_details` of every test result seen, in callback order.
    pub fn results(&self) -> Vec<String> {
        self.results.lock().expect("observer lock").clone()
    }

    pub fn unrecognized(&self) -> usize {
        self.unrecognized.load(Ordering::SeqCst)
    }
}

impl EventObserver for RecordingObserver {
    fn test_result(
        &self,
        _ctx: &EventContext<'_>,
        result: &TestResult,
    ) -> Result<(), ObserverError> {
        self.results
            .lock()
            .expect("observer lock")
            .push(result.status_details.clone());
        if self.fail {
            return Err(ObserverError::new("sink unavailable"));
        }
        Ok(())
    }

    fn unrecognized_variant(&self, _ctx: &EventContext<'_>) {
        self.unrecognized.fetch_add(1, Ordering::SeqCst);
    }
}

/// Ack sink that stores what it was sent, optionally failing after `n` sends.
#[derive(Default)]
pub struct RecordingSink {
    pub acks: Vec<PublishBuildToolEventStreamResponse>,
    fail_after: Option<usize>,
}

impl RecordingSink {
    pub fn failing_after(sends: usize) -> Self {
        Self {
            acks: Vec::new(),
            fail_after: Some(sends),
        }
    }

    pub fn sequence_numbers(&self) -> Vec<i64> {
        self.acks.iter().map(|ack| ack.sequence_number).collect()
    }
}

#[async_trait::async_trait]
impl AckSink for RecordingSink {
    async fn send(
        &mut self,
        ack: PublishBuildToolEventStreamResponse,
    ) -> Result<(), TransportError> {
        if self.fail_after.is_some_and(|limit| self.acks.len() >= limit) {
            return Err(TransportError::send("connection reset"));
        }
        self.acks.push(ack);
        Ok(())
    }
}

pub fn stream_id() -> StreamId {
    StreamId::new("build-1", "invocation-1", BuildComponent::Tool)
}

/// Detail blob holding a test-result record with the given `status_details`.
pub fn test_result_details(status_details: &str) -> Any {
    build_event_stream::BuildEvent {
        payload: Some(build_event_stream::build_event::Payload::TestResult(
            TestResult {
                status: TestStatus::Passed as i32,
                status_details: status_details.to_string(),
                ..Default::default()
            },
        )),
        ..Default::default()
    }
    .to_any()
}

/// Detail blob with the right type URL and a truncated body.
pub fn malformed_details() -> Any {
    let mut any = build_event_stream::BuildEvent::default().to_any();
    // field 1, length 5, one byte of payload
    any.value = vec![0x0a, 0x05, 0x01];
    any
}

/// One event per detail-bearing variant, each carrying `details`.
pub fn detail_variants(details: Option<Any>) -> Vec<BuildEvent> {
    vec![
        BuildEvent::from(Event::InvocationAttemptStarted(InvocationAttemptStarted {
            attempt_number: 1,
            details: details.clone(),
        })),
        BuildEvent::from(Event::InvocationAttemptFinished(InvocationAttemptFinished {
            invocation_status: None,
            details: details.clone(),
        })),
        BuildEvent::from(Event::BuildEnqueued(BuildEnqueued {
            details: details.clone(),
        })),
        BuildEvent::from(Event::BuildFinished(BuildFinished {
            status: None,
            details,
        })),
    ]
}

/// One event per variant that carries nothing to decode.
pub fn plain_variants() -> Vec<BuildEvent> {
    vec![
        console_output_event(),
        BuildEvent::from(Event::ComponentStreamFinished(
            BuildComponentStreamFinished::default(),
        )),
        BuildEvent::from(Event::BazelEvent(test_result_details("opaque"))),
        BuildEvent::from(Event::BuildExecutionEvent(Any::default())),
        BuildEvent::from(Event::SourceFetchEvent(Any::default())),
    ]
}

pub fn console_output_event() -> BuildEvent {
    BuildEvent::from(Event::ConsoleOutput(ConsoleOutput {
        r#type: 1,
        output: Some(console_output::Output::TextOutput("hello\n".into())),
    }))
}

/// Envelope on the default stream id.
pub fn envelope(sequence_number: i64, event: BuildEvent) -> PublishBuildToolEventStreamRequest {
    OrderedBuildEvent::new(Some(stream_id()), sequence_number, event).into()
}

/// Console-output envelope; always accepted.
pub fn console_envelope(sequence_number: i64) -> PublishBuildToolEventStreamRequest {
    envelope(sequence_number, console_output_event())
}

/// Envelope whose detail blob fails to decode.
pub fn undecodable_envelope(sequence_number: i64) -> PublishBuildToolEventStreamRequest {
    envelope(
        sequence_number,
        BuildEvent::from(Event::BuildEnqueued(BuildEnqueued {
            details: Some(malformed_details()),
        })),
    )
}

pub fn envelope_stream(
    items: Vec<Result<PublishBuildToolEventStreamRequest, TransportError>>,
) -> EnvelopeStream {
    Box::pin(futures::stream::iter(items))
}

/// Stream of well-formed console envelopes with the given sequence numbers.
pub fn console_stream(sequence_numbers: &[i64]) -> EnvelopeStream {
    envelope_stream(
        sequence_numbers
            .iter()
            .map(|&n| Ok(console_envelope(n)))
            .collect(),
    )
}
