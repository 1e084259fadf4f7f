//! Polymorphic payload dispatch.
//!
//! Four lifecycle variants carry an optional `google.protobuf.Any` detail blob
//! holding a `build_event_stream.BuildEvent`; every other variant is passed
//! through untouched. An event whose oneof is absent was sent with a tag this
//! service does not know and is reported, not rejected.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bes_proto::build_event::Event;
use bes_proto::build_event_stream::{self, BUILD_EVENT_TYPE_NAME};
use bes_proto::{Any, BuildEvent, Message as _};
use tracing::{debug, error, warn};

use crate::errors::DecodeError;
use crate::observer::{EventContext, EventObserver};

/// Record decoded from a detail blob.
pub type DecodedBuildEvent = build_event_stream::BuildEvent;

/// Known variants of the build event oneof.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventVariant {
    InvocationAttemptStarted,
    InvocationAttemptFinished,
    BuildEnqueued,
    BuildFinished,
    ConsoleOutput,
    ComponentStreamFinished,
    BazelEvent,
    BuildExecutionEvent,
    SourceFetchEvent,
}

impl EventVariant {
    /// Stable snake_case name used in logs and errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvocationAttemptStarted => "invocation_attempt_started",
            Self::InvocationAttemptFinished => "invocation_attempt_finished",
            Self::BuildEnqueued => "build_enqueued",
            Self::BuildFinished => "build_finished",
            Self::ConsoleOutput => "console_output",
            Self::ComponentStreamFinished => "component_stream_finished",
            Self::BazelEvent => "bazel_event",
            Self::BuildExecutionEvent => "build_execution_event",
            Self::SourceFetchEvent => "source_fetch_event",
        }
    }
}

/// Dispatch decision for one event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PayloadKind<'a> {
    /// Variant that may carry a detail blob. `details` is `None` when the client left it out.
    Detailed {
        variant: EventVariant,
        details: Option<&'a Any>,
    },
    /// Variant with nothing this service decodes.
    Plain(EventVariant),
    /// Oneof absent: a tag outside the known set.
    Unrecognized,
}

/// Classifies an event without decoding anything.
pub fn classify(event: &BuildEvent) -> PayloadKind<'_> {
    let Some(payload) = event.event.as_ref() else {
        return PayloadKind::Unrecognized;
    };
    match payload {
        Event::InvocationAttemptStarted(e) => PayloadKind::Detailed {
            variant: EventVariant::InvocationAttemptStarted,
            details: e.details.as_ref(),
        },
        Event::InvocationAttemptFinished(e) => PayloadKind::Detailed {
            variant: EventVariant::InvocationAttemptFinished,
            details: e.details.as_ref(),
        },
        Event::BuildEnqueued(e) => PayloadKind::Detailed {
            variant: EventVariant::BuildEnqueued,
            details: e.details.as_ref(),
        },
        Event::BuildFinished(e) => PayloadKind::Detailed {
            variant: EventVariant::BuildFinished,
            details: e.details.as_ref(),
        },
        Event::ConsoleOutput(_) => PayloadKind::Plain(EventVariant::ConsoleOutput),
        Event::ComponentStreamFinished(_) => {
            PayloadKind::Plain(EventVariant::ComponentStreamFinished)
        }
        Event::BazelEvent(_) => PayloadKind::Plain(EventVariant::BazelEvent),
        Event::BuildExecutionEvent(_) => PayloadKind::Plain(EventVariant::BuildExecutionEvent),
        Event::SourceFetchEvent(_) => PayloadKind::Plain(EventVariant::SourceFetchEvent),
    }
}

/// Point-in-time decoder counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct DecoderStats {
    /// Detail blobs that reached the deserialization step.
    pub attempted: u64,
    /// Detail blobs decoded successfully.
    pub decoded: u64,
    /// Detail blobs rejected with a [`DecodeError`].
    pub failed: u64,
    /// Events with an unknown variant.
    pub unrecognized: u64,
}

#[derive(Default)]
struct Counters {
    attempted: AtomicU64,
    decoded: AtomicU64,
    failed: AtomicU64,
    unrecognized: AtomicU64,
}

/// Decodes detail blobs and surfaces test results to an [`EventObserver`].
///
/// Shared read-only between sessions; counters are atomic.
pub struct PayloadDecoder {
    observer: Arc<dyn EventObserver>,
    counters: Counters,
}

impl PayloadDecoder {
    pub fn new(observer: Arc<dyn EventObserver>) -> Self {
        Self {
            observer,
            counters: Counters::default(),
        }
    }

    pub fn stats(&self) -> DecoderStats {
        DecoderStats {
            attempted: self.counters.attempted.load(Ordering::Relaxed),
            decoded: self.counters.decoded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            unrecognized: self.counters.unrecognized.load(Ordering::Relaxed),
        }
    }

    /// Decodes the detail blob of `event`, if it has one.
    ///
    /// Returns `Ok(None)` for variants without details, for detail-bearing variants whose
    /// blob is absent, and for unrecognized variants. A blob of the wrong type or with
    /// undecodable bytes is a [`DecodeError`].
    pub fn decode(
        &self,
        event: &BuildEvent,
        ctx: &EventContext<'_>,
    ) -> Result<Option<DecodedBuildEvent>, DecodeError> {
        match classify(event) {
            PayloadKind::Detailed {
                variant,
                details: Some(details),
            } => {
                let record = self.decode_details(variant, details)?;
                self.surface_test_result(ctx, variant, &record);
                Ok(Some(record))
            }
            PayloadKind::Detailed {
                variant,
                details: None,
            } => {
                debug!(variant = variant.as_str(), "event carries no details");
                Ok(None)
            }
            PayloadKind::Plain(variant) => {
                debug!(variant = variant.as_str(), "event has no payload to decode");
                Ok(None)
            }
            PayloadKind::Unrecognized => {
                self.report_unrecognized(ctx);
                Ok(None)
            }
        }
    }

    pub(crate) fn report_unrecognized(&self, ctx: &EventContext<'_>) {
        self.counters.unrecognized.fetch_add(1, Ordering::Relaxed);
        error!(
            sequence_number = ctx.sequence_number,
            "unknown event type"
        );
        self.observer.unrecognized_variant(ctx);
    }

    fn decode_details(
        &self,
        variant: EventVariant,
        details: &Any,
    ) -> Result<DecodedBuildEvent, DecodeError> {
        self.counters.attempted.fetch_add(1, Ordering::Relaxed);
        match unpack(variant, details) {
            Ok(record) => {
                self.counters.decoded.fetch_add(1, Ordering::Relaxed);
                Ok(record)
            }
            Err(err) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                error!(variant = variant.as_str(), error = %err, "failed to unmarshal event");
                Err(err)
            }
        }
    }

    fn surface_test_result(
        &self,
        ctx: &EventContext<'_>,
        variant: EventVariant,
        record: &DecodedBuildEvent,
    ) {
        let Some(result) = record.test_result() else {
            return;
        };
        if let Err(err) = self.observer.test_result(ctx, result) {
            warn!(variant = variant.as_str(), error = %err, "test result callback failed");
        }
    }
}

fn unpack(variant: EventVariant, details: &Any) -> Result<DecodedBuildEvent, DecodeError> {
    // message name is everything after the last '/' of the type URL
    let name = details.type_url.rsplit('/').next().unwrap_or_default();
    if name != BUILD_EVENT_TYPE_NAME {
        return Err(DecodeError::TypeMismatch {
            variant: variant.as_str(),
            expected: BUILD_EVENT_TYPE_NAME,
            actual: details.type_url.clone(),
        });
    }
    DecodedBuildEvent::decode(details.value.as_slice()).map_err(|e| DecodeError::Malformed {
        variant: variant.as_str(),
        message: e.to_string(),
    })
}
