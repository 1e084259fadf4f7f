use crate::events::{OrderedBuildEvent, StreamId};

/// Streaming request carrying one ordered build event.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PublishBuildToolEventStreamRequest {
    /// The build event with position info.
    #[prost(message, optional, tag = "4")]
    pub ordered_build_event: ::core::option::Option<OrderedBuildEvent>,
    /// Keywords a subscriber may filter notifications by.
    #[prost(string, repeated, tag = "5")]
    pub notification_keywords: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    /// The project this build is associated with.
    #[prost(string, tag = "6")]
    pub project_id: ::prost::alloc::string::String,
    /// Whether the server should verify that lifecycle events precede this stream.
    #[prost(bool, tag = "7")]
    pub check_preceding_lifecycle_events_present: bool,
}

impl From<OrderedBuildEvent> for PublishBuildToolEventStreamRequest {
    fn from(ordered_build_event: OrderedBuildEvent) -> Self {
        Self {
            ordered_build_event: Some(ordered_build_event),
            ..Default::default()
        }
    }
}

/// Acknowledgment for one received sequence number.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PublishBuildToolEventStreamResponse {
    /// The stream that contains this event.
    #[prost(message, optional, tag = "1")]
    pub stream_id: ::core::option::Option<StreamId>,
    /// The sequence number of this event that has been committed.
    #[prost(int64, tag = "2")]
    pub sequence_number: i64,
}

/// Unary request publishing a single lifecycle event.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PublishLifecycleEventRequest {
    /// The interactivity of this build.
    #[prost(enumeration = "publish_lifecycle_event_request::ServiceLevel", tag = "1")]
    pub service_level: i32,
    /// The lifecycle build event.
    #[prost(message, optional, tag = "2")]
    pub build_event: ::core::option::Option<OrderedBuildEvent>,
    /// How long the server should wait for the next lifecycle event.
    #[prost(message, optional, tag = "3")]
    pub stream_timeout: ::core::option::Option<::prost_types::Duration>,
    /// Keywords a subscriber may filter notifications by.
    #[prost(string, repeated, tag = "4")]
    pub notification_keywords: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    /// The project this build is associated with.
    #[prost(string, tag = "6")]
    pub project_id: ::prost::alloc::string::String,
    /// Whether the server should verify that earlier lifecycle events were received.
    #[prost(bool, tag = "7")]
    pub check_preceding_lifecycle_events_present: bool,
}

/// Nested message and enum types in `PublishLifecycleEventRequest`.
pub mod publish_lifecycle_event_request {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum ServiceLevel {
        Interactive = 0,
        Batch = 1,
    }
}

impl From<OrderedBuildEvent> for PublishLifecycleEventRequest {
    fn from(build_event: OrderedBuildEvent) -> Self {
        Self {
            build_event: Some(build_event),
            ..Default::default()
        }
    }
}
