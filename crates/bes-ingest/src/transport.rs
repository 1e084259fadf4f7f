use std::pin::Pin;

use bes_proto::{PublishBuildToolEventStreamRequest, PublishBuildToolEventStreamResponse};
use tokio::sync::mpsc;

use crate::errors::TransportError;

/// Inbound half of a publish stream.
///
/// Yields envelopes in wire-arrival order. `None` is the client's half-close; an `Err`
/// item is a transport failure and ends the session.
pub type EnvelopeStream = Pin<
    Box<
        dyn futures::Stream<Item = Result<PublishBuildToolEventStreamRequest, TransportError>>
            + Send
            + 'static,
    >,
>;

/// Outbound half of a publish stream.
#[async_trait::async_trait]
pub trait AckSink: Send {
    /// Sends one acknowledgment, waiting until the transport accepts it.
    async fn send(&mut self, ack: PublishBuildToolEventStreamResponse)
    -> Result<(), TransportError>;
}

/// [`AckSink`] backed by a bounded channel.
pub struct ChannelAckSink {
    tx: mpsc::Sender<PublishBuildToolEventStreamResponse>,
}

impl ChannelAckSink {
    pub fn new(tx: mpsc::Sender<PublishBuildToolEventStreamResponse>) -> Self {
        Self { tx }
    }
}

#[async_trait::async_trait]
impl AckSink for ChannelAckSink {
    async fn send(
        &mut self,
        ack: PublishBuildToolEventStreamResponse,
    ) -> Result<(), TransportError> {
        self.tx
            .send(ack)
            .await
            .map_err(|_| TransportError::send("client dropped the acknowledgment receiver"))
    }
}

/// Adapts a channel receiver into an [`EnvelopeStream`]. Dropping every sender half-closes it.
pub fn envelope_stream(
    rx: mpsc::Receiver<Result<PublishBuildToolEventStreamRequest, TransportError>>,
) -> EnvelopeStream {
    Box::pin(futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    }))
}

/// Client side of an in-process stream.
pub(crate) struct ClientChannels {
    pub envelopes: mpsc::Sender<Result<PublishBuildToolEventStreamRequest, TransportError>>,
    pub acks: mpsc::Receiver<PublishBuildToolEventStreamResponse>,
}

/// Creates both halves of an in-process stream with bounded buffers.
pub(crate) fn channel_pair(capacity: usize) -> (ClientChannels, EnvelopeStream, ChannelAckSink) {
    let (envelope_tx, envelope_rx) = mpsc::channel(capacity);
    let (ack_tx, ack_rx) = mpsc::channel(capacity);
    (
        ClientChannels {
            envelopes: envelope_tx,
            acks: ack_rx,
        },
        envelope_stream(envelope_rx),
        ChannelAckSink::new(ack_tx),
    )
}
