use std::sync::Arc;

use bes_proto::{
    PublishBuildToolEventStreamRequest, PublishBuildToolEventStreamResponse,
    PublishLifecycleEventRequest,
};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::config::IngestConfig;
use crate::decoder::{DecoderStats, PayloadDecoder};
use crate::errors::{IngestError, TransportError};
use crate::lifecycle::LifecycleHandler;
use crate::observer::{EventObserver, TracingObserver};
use crate::session::{SessionReport, StreamSession};
use crate::transport::{self, AckSink, EnvelopeStream};

pub(crate) struct ServiceInner {
    config: IngestConfig,
    decoder: Arc<PayloadDecoder>,
    lifecycle: LifecycleHandler,
}

/// Entry point for both publish operations.
///
/// Cheap to clone; every clone shares one decoder and its counters. Sessions
/// share nothing else.
#[derive(Clone)]
pub struct BuildEventService {
    inner: Arc<ServiceInner>,
}

impl BuildEventService {
    /// Starts a builder for configuring a `BuildEventService`.
    pub fn builder() -> BuildEventServiceBuilder {
        BuildEventServiceBuilder::default()
    }

    pub fn config(&self) -> &IngestConfig {
        &self.inner.config
    }

    /// Decoder counters accumulated across every session and lifecycle call.
    pub fn decoder_stats(&self) -> DecoderStats {
        self.inner.decoder.stats()
    }

    /// Creates an idle session bound to this service's decoder and config.
    pub fn new_session(&self) -> StreamSession {
        StreamSession::new(self.inner.decoder.clone(), self.inner.config.clone())
    }

    /// Runs one publish stream to completion on the caller's task.
    pub async fn publish_build_tool_event_stream<S: AckSink + ?Sized>(
        &self,
        envelopes: EnvelopeStream,
        sink: &mut S,
    ) -> Result<SessionReport, IngestError> {
        self.new_session().run(envelopes, sink).await
    }

    /// Handles one unary lifecycle event.
    pub async fn publish_lifecycle_event(
        &self,
        request: &PublishLifecycleEventRequest,
    ) -> Result<(), IngestError> {
        self.inner.lifecycle.handle(request)
    }

    /// Spawns a session on the current tokio runtime and returns the client side of it.
    ///
    /// Acks are buffered up to `channel_capacity`; a client that sends more than that
    /// in incremental mode must read acks concurrently.
    pub fn open_stream(&self) -> StreamHandle {
        let (client, envelopes, mut sink) =
            transport::channel_pair(self.inner.config.channel_capacity);
        let (final_tx, final_rx) = oneshot::channel();
        let mut session = self.new_session();
        let session_id = session.id();
        tokio::spawn(async move {
            let result = session.run(envelopes, &mut sink).await;
            let _ = final_tx.send(result);
        });
        debug!(%session_id, "stream opened in process");
        StreamHandle {
            session_id,
            tx: Some(client.envelopes),
            ack_rx: client.acks,
            final_rx,
        }
    }
}

/// Builder used to set the config and observer before creating a `BuildEventService`.
#[derive(Default)]
pub struct BuildEventServiceBuilder {
    config: IngestConfig,
    observer: Option<Arc<dyn EventObserver>>,
}

impl BuildEventServiceBuilder {
    pub fn config(mut self, config: IngestConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the test-result observer. Defaults to [`TracingObserver`].
    pub fn observer(mut self, observer: Arc<dyn EventObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Validates the config and builds the service.
    pub fn build(self) -> Result<BuildEventService, IngestError> {
        self.config.validate()?;
        let observer = self
            .observer
            .unwrap_or_else(|| Arc::new(TracingObserver) as Arc<dyn EventObserver>);
        let decoder = Arc::new(PayloadDecoder::new(observer));
        Ok(BuildEventService {
            inner: Arc::new(ServiceInner {
                config: self.config,
                lifecycle: LifecycleHandler::new(decoder.clone()),
                decoder,
            }),
        })
    }
}

/// Client side of a stream started with [`BuildEventService::open_stream`].
///
/// Send envelopes, then call `close_send()` (or `finish()`, which closes for you)
/// to half-close. Acks can be read as they arrive with `next_ack()`.
pub struct StreamHandle {
    session_id: uuid::Uuid,
    tx: Option<mpsc::Sender<Result<PublishBuildToolEventStreamRequest, TransportError>>>,
    ack_rx: mpsc::Receiver<PublishBuildToolEventStreamResponse>,
    final_rx: oneshot::Receiver<Result<SessionReport, IngestError>>,
}

impl StreamHandle {
    pub fn session_id(&self) -> uuid::Uuid {
        self.session_id
    }

    /// Sends one envelope, waiting for buffer space.
    ///
    /// Fails once the stream is half-closed or the session has stopped receiving.
    pub async fn send(
        &mut self,
        request: PublishBuildToolEventStreamRequest,
    ) -> Result<(), IngestError> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| TransportError::send("stream is already half-closed"))?;
        tx.send(Ok(request))
            .await
            .map_err(|_| TransportError::send("session is no longer receiving").into())
    }

    /// Half-closes the stream. The session flushes its acks and completes.
    pub fn close_send(&mut self) {
        self.tx = None;
    }

    /// Injects a receive failure, as a dropped connection would.
    pub async fn abort(&mut self, message: impl Into<String>) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Err(TransportError::receive(message))).await;
        }
    }

    /// Waits for the next ack. Returns `None` once the session is done sending.
    pub async fn next_ack(&mut self) -> Option<PublishBuildToolEventStreamResponse> {
        self.ack_rx.recv().await
    }

    /// Half-closes, collects every ack not yet read, and returns them with the session outcome.
    pub async fn collect_acks(
        mut self,
    ) -> (
        Vec<PublishBuildToolEventStreamResponse>,
        Result<SessionReport, IngestError>,
    ) {
        self.close_send();
        let mut acks = Vec::new();
        while let Some(ack) = self.ack_rx.recv().await {
            acks.push(ack);
        }
        let result = self.final_rx.await.unwrap_or(Err(IngestError::SessionLost));
        (acks, result)
    }

    /// Half-closes and returns the session outcome, discarding unread acks.
    pub async fn finish(self) -> Result<SessionReport, IngestError> {
        self.collect_acks().await.1
    }
}
