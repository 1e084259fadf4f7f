use bes_proto::StreamId;

/// Failure to turn a detail blob into a build event record.
///
/// Always fatal for the stream or unary call that produced it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The blob names a message type other than `build_event_stream.BuildEvent`.
    #[error("{variant} details have type {actual:?}, expected {expected}")]
    TypeMismatch {
        variant: &'static str,
        expected: &'static str,
        actual: String,
    },
    /// The blob bytes are not a valid encoding of the expected message.
    #[error("failed to decode {variant} details: {message}")]
    Malformed {
        variant: &'static str,
        message: String,
    },
}

impl DecodeError {
    /// Returns the event variant whose details failed to decode.
    pub fn variant(&self) -> &'static str {
        match self {
            Self::TypeMismatch { variant, .. } | Self::Malformed { variant, .. } => variant,
        }
    }
}

/// Errors raised by the stream transport at a suspension point.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Receiving the next envelope failed (reset, cancelled, malformed frame).
    #[error("receive failed: {message}")]
    Receive { message: String },
    /// Sending an acknowledgment failed.
    #[error("send failed: {message}")]
    Send { message: String },
}

impl TransportError {
    /// Creates a receive-side error.
    pub fn receive(message: impl Into<String>) -> Self {
        Self::Receive {
            message: message.into(),
        }
    }

    /// Creates a send-side error.
    pub fn send(message: impl Into<String>) -> Self {
        Self::Send {
            message: message.into(),
        }
    }
}

/// Error returned by an [`EventObserver`](crate::observer::EventObserver) callback.
///
/// Callback failures are logged and never change the outcome of a decode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("observer failed: {0}")]
pub struct ObserverError(pub String);

impl ObserverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Terminal outcome of a failed stream or lifecycle call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    /// A detail blob could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// The transport failed while receiving envelopes or sending acknowledgments.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The request is missing a field the protocol requires.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
    /// An envelope named a different stream than the one learned for the session.
    #[error("stream id mismatch: session is {expected}, envelope carries {actual}")]
    StreamIdMismatch {
        expected: Box<StreamId>,
        actual: Box<StreamId>,
    },
    /// Invalid service configuration.
    #[error("config error: {0}")]
    Config(String),
    /// The session task ended without reporting an outcome.
    #[error("session ended without a result")]
    SessionLost,
    /// A session was asked to run a second stream.
    #[error("session {0} already ran")]
    SessionReused(uuid::Uuid),
}

impl IngestError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedEnvelope(message.into())
    }

    /// Whether this error came from the transport rather than from envelope content.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
