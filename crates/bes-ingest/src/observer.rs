use bes_proto::StreamId;
use bes_proto::build_event_stream::TestResult;
use tracing::{info, warn};

use crate::errors::ObserverError;

/// Where a decoded event came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventContext<'a> {
    /// Stream the event arrived on, if known yet.
    pub stream_id: Option<&'a StreamId>,
    /// Client-assigned sequence number. `None` for lifecycle calls without one.
    pub sequence_number: Option<i64>,
}

/// Ingestion callback invoked synchronously while decoding.
///
/// Implementations decide what happens to extracted test results (persist, alert, ...).
/// A returned error is logged by the decoder and otherwise ignored.
pub trait EventObserver: Send + Sync {
    /// Called once per successfully decoded record that carries a test result.
    fn test_result(&self, ctx: &EventContext<'_>, result: &TestResult)
    -> Result<(), ObserverError>;

    /// Called when an event carries a variant this service does not know.
    fn unrecognized_variant(&self, _ctx: &EventContext<'_>) {}
}

/// Default observer: logs test results and unknown variants, nothing else.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl EventObserver for TracingObserver {
    fn test_result(
        &self,
        ctx: &EventContext<'_>,
        result: &TestResult,
    ) -> Result<(), ObserverError> {
        info!(
            invocation_id = ctx.stream_id.map(|id| id.invocation_id.as_str()).unwrap_or(""),
            sequence_number = ctx.sequence_number,
            status = result.status().as_str_name(),
            cached = result.cached_locally,
            result = %result.status_details,
            "test result"
        );
        Ok(())
    }

    fn unrecognized_variant(&self, ctx: &EventContext<'_>) {
        warn!(
            invocation_id = ctx.stream_id.map(|id| id.invocation_id.as_str()).unwrap_or(""),
            sequence_number = ctx.sequence_number,
            "event variant not recognized, skipping"
        );
    }
}
