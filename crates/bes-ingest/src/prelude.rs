//! Common imports for embedding the ingestion service.
pub use crate::{
    AckMode, AckSink, BuildEventService, BuildEventServiceBuilder, DecodeError, EnvelopeStream,
    EventContext, EventObserver, IngestConfig, IngestError, ObserverError, SessionReport,
    StreamHandle, TracingObserver, TransportError,
};
