//! Per-stream receive loop.
//!
//! A session pulls envelopes until the client half-closes, decoding each one and
//! recording its sequence number, then flushes the collected acknowledgments in
//! ascending order. A decode failure ends the stream early; by default the acks
//! gathered so far are flushed first.

use std::sync::Arc;

use bes_proto::{PublishBuildToolEventStreamRequest, StreamId};
use futures::StreamExt as _;
use tracing::{Instrument as _, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::ack::{AckSequencer, acknowledge};
use crate::config::IngestConfig;
use crate::decoder::{PayloadDecoder, PayloadKind, classify};
use crate::errors::IngestError;
use crate::observer::EventContext;
use crate::transport::{AckSink, EnvelopeStream};

/// Lifecycle of a [`StreamSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Receiving,
    /// Input is exhausted; buffered acks are being sent.
    Acking,
    Closed,
    Failed(String),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed(_))
    }
}

/// Summary of a completed stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub build_id: Option<String>,
    pub invocation_id: Option<String>,
    /// Envelopes accepted, duplicates included.
    pub events_received: usize,
    pub acks_sent: usize,
    /// Decoded records that carried a test result.
    pub test_results: usize,
    pub unrecognized_events: usize,
}

/// One inbound publish stream.
pub struct StreamSession {
    id: Uuid,
    decoder: Arc<PayloadDecoder>,
    config: IngestConfig,
    state: SessionState,
    stream_id: Option<StreamId>,
    sequencer: AckSequencer,
    report: SessionReport,
}

impl StreamSession {
    pub fn new(decoder: Arc<PayloadDecoder>, config: IngestConfig) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            decoder,
            sequencer: AckSequencer::new(config.ack_mode),
            config,
            state: SessionState::Idle,
            stream_id: None,
            report: SessionReport {
                session_id: id,
                ..SessionReport::default()
            },
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Stream id learned from the first envelope that carried one.
    pub fn stream_id(&self) -> Option<&StreamId> {
        self.stream_id.as_ref()
    }

    /// Drives the session to completion.
    ///
    /// Returns the report once every ack has been sent, or the first fatal error.
    /// A session runs once; a second call fails with [`IngestError::SessionReused`].
    pub async fn run<S: AckSink + ?Sized>(
        &mut self,
        envelopes: EnvelopeStream,
        sink: &mut S,
    ) -> Result<SessionReport, IngestError> {
        if self.state != SessionState::Idle {
            return Err(IngestError::SessionReused(self.id));
        }
        let span = info_span!(
            "bes_stream",
            session_id = %self.id,
            invocation_id = tracing::field::Empty
        );
        self.drive(envelopes, sink).instrument(span).await
    }

    async fn drive<S: AckSink + ?Sized>(
        &mut self,
        mut envelopes: EnvelopeStream,
        sink: &mut S,
    ) -> Result<SessionReport, IngestError> {
        self.state = SessionState::Receiving;
        info!(ack_mode = %self.config.ack_mode, "stream opened");

        loop {
            debug!("waiting for event");
            let request = match envelopes.next().await {
                None => break,
                Some(Ok(request)) => request,
                Some(Err(err)) => return Err(self.fail(err.into())),
            };
            if let Err(err) = self.accept(request, sink).await {
                if err.is_transport() {
                    return Err(self.fail(err));
                }
                return Err(self.abort(err, sink).await);
            }
        }

        self.state = SessionState::Acking;
        let pending = self.sequencer.drain();
        match acknowledge(sink, self.stream_id.as_ref(), pending).await {
            Ok(sent) => self.report.acks_sent += sent,
            Err(err) => return Err(self.fail(err.into())),
        }

        self.state = SessionState::Closed;
        info!(
            events = self.report.events_received,
            acks = self.report.acks_sent,
            "stream closed"
        );
        Ok(self.report.clone())
    }

    async fn accept<S: AckSink + ?Sized>(
        &mut self,
        request: PublishBuildToolEventStreamRequest,
        sink: &mut S,
    ) -> Result<(), IngestError> {
        let ordered = request
            .ordered_build_event
            .ok_or_else(|| IngestError::malformed("request carries no ordered_build_event"))?;
        self.learn_stream_id(ordered.stream_id)?;
        let sequence_number = ordered.sequence_number;
        debug!(sequence_number, "event received");

        if let Some(event) = ordered.event.as_ref() {
            let unrecognized = matches!(classify(event), PayloadKind::Unrecognized);
            let ctx = EventContext {
                stream_id: self.stream_id.as_ref(),
                sequence_number: Some(sequence_number),
            };
            let record = self.decoder.decode(event, &ctx)?;
            if record.as_ref().is_some_and(|r| r.test_result().is_some()) {
                self.report.test_results += 1;
            }
            if unrecognized {
                self.report.unrecognized_events += 1;
            }
        }
        self.report.events_received += 1;

        let ready = self.sequencer.record(sequence_number);
        if !ready.is_empty() {
            self.report.acks_sent += acknowledge(sink, self.stream_id.as_ref(), ready).await?;
        }
        Ok(())
    }

    fn learn_stream_id(&mut self, incoming: Option<StreamId>) -> Result<(), IngestError> {
        let Some(incoming) = incoming else {
            return Ok(());
        };
        match &self.stream_id {
            None => {
                info!(stream_id = %incoming, "stream id learned");
                tracing::Span::current().record("invocation_id", incoming.invocation_id.as_str());
                self.report.build_id = Some(incoming.build_id.clone());
                self.report.invocation_id = Some(incoming.invocation_id.clone());
                self.stream_id = Some(incoming);
            }
            Some(expected) if self.config.validate_stream_id && *expected != incoming => {
                return Err(IngestError::StreamIdMismatch {
                    expected: Box::new(expected.clone()),
                    actual: Box::new(incoming),
                });
            }
            Some(_) => {}
        }
        Ok(())
    }

    /// Ends the stream after a content error, flushing buffered acks first when configured.
    async fn abort<S: AckSink + ?Sized>(&mut self, err: IngestError, sink: &mut S) -> IngestError {
        if self.config.flush_on_decode_error {
            let pending = self.sequencer.drain();
            match acknowledge(sink, self.stream_id.as_ref(), pending).await {
                Ok(sent) => self.report.acks_sent += sent,
                Err(send_err) => {
                    warn!(error = %send_err, "failed to flush acks before aborting stream");
                }
            }
        }
        self.fail(err)
    }

    fn fail(&mut self, err: IngestError) -> IngestError {
        error!(error = %err, acks = self.report.acks_sent, "stream failed");
        self.state = SessionState::Failed(err.to_string());
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AckMode;
    use crate::errors::{DecodeError, TransportError};
    use crate::testing::{
        RecordingObserver, RecordingSink, console_envelope, console_stream, envelope,
        envelope_stream, stream_id, test_result_details, undecodable_envelope,
    };
    use bes_proto::build_event::{BuildEnqueued, Event};
    use bes_proto::stream_id::BuildComponent;
    use bes_proto::{BuildEvent, OrderedBuildEvent};

    fn session(config: IngestConfig) -> StreamSession {
        let decoder = PayloadDecoder::new(Arc::new(RecordingObserver::default()));
        StreamSession::new(Arc::new(decoder), config)
    }

    #[tokio::test]
    async fn acks_out_of_order_events_in_ascending_order() {
        let mut session = session(IngestConfig::default());
        let mut sink = RecordingSink::default();
        let report = session
            .run(console_stream(&[3, 1, 2]), &mut sink)
            .await
            .expect("stream completes");
        assert_eq!(sink.sequence_numbers(), vec![1, 2, 3]);
        assert_eq!(report.events_received, 3);
        assert_eq!(report.acks_sent, 3);
        assert_eq!(report.invocation_id.as_deref(), Some("invocation-1"));
        assert_eq!(session.state(), &SessionState::Closed);
        assert!(
            sink.acks
                .iter()
                .all(|ack| ack.stream_id.as_ref() == Some(&stream_id()))
        );
    }

    #[tokio::test]
    async fn duplicates_are_acked_once_per_arrival() {
        let mut session = session(IngestConfig::default());
        let mut sink = RecordingSink::default();
        session
            .run(console_stream(&[5, 3, 3, 1, 4, 2]), &mut sink)
            .await
            .expect("stream completes");
        assert_eq!(sink.sequence_numbers(), vec![1, 2, 3, 3, 4, 5]);
    }

    #[tokio::test]
    async fn empty_stream_closes_without_acks() {
        let mut session = session(IngestConfig::default());
        let mut sink = RecordingSink::default();
        let report = session
            .run(console_stream(&[]), &mut sink)
            .await
            .expect("empty stream is fine");
        assert_eq!(report.acks_sent, 0);
        assert!(sink.acks.is_empty());
        assert!(session.stream_id().is_none());
        assert_eq!(session.state(), &SessionState::Closed);
    }

    #[tokio::test]
    async fn decode_failure_flushes_prior_acks_and_stops_receiving() {
        let mut session = session(IngestConfig::default());
        let mut sink = RecordingSink::default();
        let stream = envelope_stream(vec![
            Ok(console_envelope(1)),
            Ok(console_envelope(2)),
            Ok(undecodable_envelope(3)),
            Ok(console_envelope(4)),
            Ok(console_envelope(5)),
        ]);
        let err = session
            .run(stream, &mut sink)
            .await
            .expect_err("decode failure is fatal");
        assert!(matches!(err, IngestError::Decode(DecodeError::Malformed { .. })));
        assert_eq!(sink.sequence_numbers(), vec![1, 2]);
        assert!(matches!(session.state(), SessionState::Failed(_)));
    }

    #[tokio::test]
    async fn decode_failure_without_flush_sends_nothing() {
        let mut session = session(IngestConfig::default().flush_on_decode_error(false));
        let mut sink = RecordingSink::default();
        let stream = envelope_stream(vec![Ok(console_envelope(1)), Ok(undecodable_envelope(2))]);
        let err = session.run(stream, &mut sink).await.expect_err("fatal");
        assert!(matches!(err, IngestError::Decode(_)));
        assert!(sink.acks.is_empty());
    }

    #[tokio::test]
    async fn flush_failure_during_abort_keeps_decode_error() {
        let mut session = session(IngestConfig::default());
        let mut sink = RecordingSink::failing_after(0);
        let stream = envelope_stream(vec![Ok(console_envelope(1)), Ok(undecodable_envelope(2))]);
        let err = session.run(stream, &mut sink).await.expect_err("fatal");
        assert!(matches!(err, IngestError::Decode(_)));
    }

    #[tokio::test]
    async fn receive_error_fails_without_acks() {
        let mut session = session(IngestConfig::default());
        let mut sink = RecordingSink::default();
        let stream = envelope_stream(vec![
            Ok(console_envelope(1)),
            Err(TransportError::receive("connection reset")),
            Ok(console_envelope(2)),
        ]);
        let err = session.run(stream, &mut sink).await.expect_err("fatal");
        assert_eq!(
            err,
            IngestError::Transport(TransportError::receive("connection reset"))
        );
        assert!(sink.acks.is_empty());
    }

    #[tokio::test]
    async fn send_failure_stops_remaining_acks() {
        let mut session = session(IngestConfig::default());
        let mut sink = RecordingSink::failing_after(2);
        let err = session
            .run(console_stream(&[4, 3, 2, 1]), &mut sink)
            .await
            .expect_err("send fails");
        assert!(matches!(err, IngestError::Transport(TransportError::Send { .. })));
        assert_eq!(sink.sequence_numbers(), vec![1, 2]);
        assert!(matches!(session.state(), SessionState::Failed(_)));
    }

    #[tokio::test]
    async fn unrecognized_variant_is_acked() {
        let mut session = session(IngestConfig::default());
        let mut sink = RecordingSink::default();
        let stream = envelope_stream(vec![
            Ok(envelope(1, BuildEvent::default())),
            Ok(console_envelope(2)),
        ]);
        let report = session.run(stream, &mut sink).await.expect("tolerated");
        assert_eq!(report.unrecognized_events, 1);
        assert_eq!(sink.sequence_numbers(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_results_are_counted() {
        let mut session = session(IngestConfig::default());
        let mut sink = RecordingSink::default();
        let passed = BuildEvent::from(Event::BuildEnqueued(BuildEnqueued {
            details: Some(test_result_details("passed")),
        }));
        let stream = envelope_stream(vec![Ok(envelope(1, passed)), Ok(console_envelope(2))]);
        let report = session.run(stream, &mut sink).await.expect("completes");
        assert_eq!(report.test_results, 1);
    }

    #[tokio::test]
    async fn envelope_without_event_is_still_acked() {
        let mut session = session(IngestConfig::default());
        let mut sink = RecordingSink::default();
        let bare = OrderedBuildEvent {
            stream_id: Some(stream_id()),
            sequence_number: 1,
            event: None,
        };
        let stream = envelope_stream(vec![Ok(bare.into())]);
        session.run(stream, &mut sink).await.expect("completes");
        assert_eq!(sink.sequence_numbers(), vec![1]);
    }

    #[tokio::test]
    async fn missing_ordered_event_is_malformed() {
        let mut session = session(IngestConfig::default());
        let mut sink = RecordingSink::default();
        let stream = envelope_stream(vec![
            Ok(console_envelope(1)),
            Ok(PublishBuildToolEventStreamRequest::default()),
        ]);
        let err = session.run(stream, &mut sink).await.expect_err("fatal");
        assert!(matches!(err, IngestError::MalformedEnvelope(_)));
        assert_eq!(sink.sequence_numbers(), vec![1]);
    }

    #[tokio::test]
    async fn stream_id_is_learned_from_first_envelope_that_has_one() {
        let mut session = session(IngestConfig::default());
        let mut sink = RecordingSink::default();
        let anonymous = OrderedBuildEvent::new(None, 1, BuildEvent::default());
        let stream = envelope_stream(vec![Ok(anonymous.into()), Ok(console_envelope(2))]);
        session.run(stream, &mut sink).await.expect("completes");
        assert_eq!(session.stream_id(), Some(&stream_id()));
        assert!(
            sink.acks
                .iter()
                .all(|ack| ack.stream_id.as_ref() == Some(&stream_id()))
        );
    }

    #[tokio::test]
    async fn foreign_stream_id_is_ignored_unless_validated() {
        let other = StreamId::new("build-1", "invocation-2", BuildComponent::Tool);
        let foreign = OrderedBuildEvent::new(Some(other), 2, BuildEvent::default());
        let items = || {
            envelope_stream(vec![
                Ok(console_envelope(1)),
                Ok(foreign.clone().into()),
            ])
        };

        let mut lenient = session(IngestConfig::default());
        let mut sink = RecordingSink::default();
        lenient.run(items(), &mut sink).await.expect("not validated");
        assert_eq!(lenient.stream_id(), Some(&stream_id()));

        let mut strict = session(IngestConfig::default().validate_stream_id(true));
        let mut sink = RecordingSink::default();
        let err = strict.run(items(), &mut sink).await.expect_err("mismatch");
        assert!(matches!(err, IngestError::StreamIdMismatch { .. }));
        assert_eq!(sink.sequence_numbers(), vec![1]);
    }

    #[tokio::test]
    async fn incremental_mode_acks_before_stream_ends() {
        let mut session = session(IngestConfig::default().ack_mode(AckMode::Incremental));
        let mut sink = RecordingSink::default();
        let stream = envelope_stream(vec![
            Ok(console_envelope(2)),
            Ok(console_envelope(1)),
            Ok(console_envelope(4)),
            Err(TransportError::receive("client went away")),
        ]);
        let err = session.run(stream, &mut sink).await.expect_err("fatal");
        assert!(err.is_transport());
        assert_eq!(sink.sequence_numbers(), vec![1, 2]);
    }

    #[tokio::test]
    async fn incremental_mode_drains_gaps_at_end_of_stream() {
        let mut session = session(IngestConfig::default().ack_mode(AckMode::Incremental));
        let mut sink = RecordingSink::default();
        let report = session
            .run(console_stream(&[1, 2, 5, 4]), &mut sink)
            .await
            .expect("completes");
        assert_eq!(sink.sequence_numbers(), vec![1, 2, 4, 5]);
        assert_eq!(report.acks_sent, 4);
    }

    #[tokio::test]
    async fn session_runs_only_once() {
        let mut session = session(IngestConfig::default());
        let mut sink = RecordingSink::default();
        session
            .run(console_stream(&[1]), &mut sink)
            .await
            .expect("first run");
        let err = session
            .run(console_stream(&[2]), &mut sink)
            .await
            .expect_err("second run rejected");
        assert_eq!(err, IngestError::SessionReused(session.id()));
        assert_eq!(sink.sequence_numbers(), vec![1]);
    }
}
