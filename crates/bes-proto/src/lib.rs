//! Wire messages for the Build Event Service publish protocol.
//!
//! The message layout mirrors `google.devtools.build.v1` (envelopes, stream ids and
//! lifecycle variants) and the subset of `build_event_stream` that travels inside the
//! opaque `details` blobs. Field tags match the upstream `.proto` files so recorded
//! streams decode unchanged.

/// Stream ids, ordered events and the tagged-union build event.
pub mod events;
/// Publish requests and acknowledgments.
pub mod publish;
/// Records carried inside detail blobs.
pub mod build_event_stream;

pub use events::{BuildEvent, OrderedBuildEvent, StreamId, build_event, stream_id};
pub use publish::{
    PublishBuildToolEventStreamRequest, PublishBuildToolEventStreamResponse,
    PublishLifecycleEventRequest,
};

pub use prost::Message;
pub use prost_types::Any;
