//! Ingestion side of a Build Event Service.
//!
//! Build tools publish events either as one bidirectional stream per invocation or as
//! unary lifecycle calls. For streams, every envelope is decoded and acknowledged by
//! sequence number, with acks always reaching the client in ascending order. Test
//! results found in detail blobs are handed to an [`EventObserver`].
//!
//! ```no_run
//! use bes_ingest::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), IngestError> {
//! # let envelopes = Vec::new();
//! let service = BuildEventService::builder()
//!     .config(IngestConfig::from_env()?)
//!     .build()?;
//!
//! let mut stream = service.open_stream();
//! for envelope in envelopes {
//!     stream.send(envelope).await?;
//! }
//! let report = stream.finish().await?;
//! println!("acked {} events", report.acks_sent);
//! # Ok(())
//! # }
//! ```

/// Ordered acknowledgment release.
pub mod ack;
/// Service-wide settings.
pub mod config;
/// Detail blob dispatch and decoding.
pub mod decoder;
/// Public error types.
pub mod errors;
/// Unary lifecycle handling.
pub mod lifecycle;
/// Logging setup.
pub mod observability;
/// Test-result callback contract.
pub mod observer;
/// Common imports for typical usage.
pub mod prelude;
/// Service entry point, builder, and in-process stream handle.
pub mod service;
/// Per-stream state machine.
pub mod session;
/// Stream transport contracts.
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use ack::{AckSequencer, FIRST_SEQUENCE_NUMBER, acknowledge};
pub use config::{AckMode, IngestConfig};
pub use decoder::{
    DecodedBuildEvent, DecoderStats, EventVariant, PayloadDecoder, PayloadKind, classify,
};
pub use errors::{DecodeError, IngestError, ObserverError, TransportError};
pub use lifecycle::LifecycleHandler;
pub use observability::init_observability;
pub use observer::{EventContext, EventObserver, TracingObserver};
pub use service::{BuildEventService, BuildEventServiceBuilder, StreamHandle};
pub use session::{SessionReport, SessionState, StreamSession};
pub use transport::{AckSink, ChannelAckSink, EnvelopeStream, envelope_stream};
