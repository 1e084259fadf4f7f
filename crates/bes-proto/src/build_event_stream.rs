//! Subset of Bazel's `build_event_stream` protocol carried inside the `details`
//! blob of lifecycle events.

use prost::Message as _;

/// Fully-qualified message name of [`BuildEvent`].
pub const BUILD_EVENT_TYPE_NAME: &str = "build_event_stream.BuildEvent";

/// Type URL prefix used when packing messages into `google.protobuf.Any`.
pub const TYPE_URL_PREFIX: &str = "type.googleapis.com/";

/// Identifier for a build event.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BuildEventId {
    #[prost(oneof = "build_event_id::Id", tags = "1, 2, 3, 8, 9")]
    pub id: ::core::option::Option<build_event_id::Id>,
}

/// Nested message and enum types in `BuildEventId`.
pub mod build_event_id {
    /// Generic identifier for a build event.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct UnknownBuildEventId {
        #[prost(string, tag = "1")]
        pub details: ::prost::alloc::string::String,
    }

    /// Identifier of a progress event.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ProgressId {
        #[prost(int32, tag = "1")]
        pub opaque_count: i32,
    }

    /// Identifier of the build-started event.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct BuildStartedId {}

    /// Identifier of a single test attempt.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct TestResultId {
        #[prost(string, tag = "1")]
        pub label: ::prost::alloc::string::String,
        #[prost(int32, tag = "2")]
        pub run: i32,
        #[prost(int32, tag = "3")]
        pub shard: i32,
        #[prost(int32, tag = "4")]
        pub attempt: i32,
    }

    /// Identifier of the build-finished event.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct BuildFinishedId {}

    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Id {
        #[prost(message, tag = "1")]
        Unknown(UnknownBuildEventId),
        #[prost(message, tag = "2")]
        Progress(ProgressId),
        #[prost(message, tag = "3")]
        Started(BuildStartedId),
        #[prost(message, tag = "8")]
        TestResult(TestResultId),
        #[prost(message, tag = "9")]
        BuildFinished(BuildFinishedId),
    }
}

/// Chunk of stdout/stderr produced since the previous progress event.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Progress {
    #[prost(string, tag = "1")]
    pub stdout: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub stderr: ::prost::alloc::string::String,
}

/// Payload of the event indicating the start of a build.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BuildStarted {
    #[prost(string, tag = "1")]
    pub uuid: ::prost::alloc::string::String,
    #[prost(int64, tag = "2")]
    pub start_time_millis: i64,
    #[prost(string, tag = "3")]
    pub build_tool_version: ::prost::alloc::string::String,
    #[prost(string, tag = "5")]
    pub command: ::prost::alloc::string::String,
}

/// Payload of the event summarizing a single test attempt.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TestResult {
    #[prost(int64, tag = "3")]
    pub test_attempt_duration_millis: i64,
    #[prost(bool, tag = "4")]
    pub cached_locally: bool,
    #[prost(enumeration = "TestStatus", tag = "5")]
    pub status: i32,
    #[prost(string, repeated, tag = "7")]
    pub warning: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    /// Additional details about the status, e.g. the failure message.
    #[prost(string, tag = "16")]
    pub status_details: ::prost::alloc::string::String,
}

/// Outcome of a test attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum TestStatus {
    NoStatus = 0,
    Passed = 1,
    Flaky = 2,
    Timeout = 3,
    Failed = 4,
    Incomplete = 5,
    RemoteFailure = 6,
    FailedToBuild = 7,
    ToolHaltedBeforeTesting = 8,
}

impl TestStatus {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::NoStatus => "NO_STATUS",
            Self::Passed => "PASSED",
            Self::Flaky => "FLAKY",
            Self::Timeout => "TIMEOUT",
            Self::Failed => "FAILED",
            Self::Incomplete => "INCOMPLETE",
            Self::RemoteFailure => "REMOTE_FAILURE",
            Self::FailedToBuild => "FAILED_TO_BUILD",
            Self::ToolHaltedBeforeTesting => "TOOL_HALTED_BEFORE_TESTING",
        }
    }
}

/// Exit code of the build tool.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExitCode {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(int32, tag = "2")]
    pub code: i32,
}

/// Payload of the event indicating the completion of the build.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BuildFinished {
    #[prost(int64, tag = "2")]
    pub finish_time_millis: i64,
    #[prost(message, optional, tag = "3")]
    pub exit_code: ::core::option::Option<ExitCode>,
}

/// A single build event as emitted by the build tool.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BuildEvent {
    #[prost(message, optional, tag = "1")]
    pub id: ::core::option::Option<BuildEventId>,
    #[prost(message, repeated, tag = "2")]
    pub children: ::prost::alloc::vec::Vec<BuildEventId>,
    #[prost(bool, tag = "20")]
    pub last_message: bool,
    #[prost(oneof = "build_event::Payload", tags = "3, 5, 10, 14")]
    pub payload: ::core::option::Option<build_event::Payload>,
}

/// Nested message and enum types in `BuildEvent`.
pub mod build_event {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "3")]
        Progress(super::Progress),
        #[prost(message, tag = "5")]
        Started(super::BuildStarted),
        #[prost(message, tag = "10")]
        TestResult(super::TestResult),
        #[prost(message, tag = "14")]
        Finished(super::BuildFinished),
    }
}

impl BuildEvent {
    /// Returns the test result payload, if this event carries one.
    pub fn test_result(&self) -> Option<&TestResult> {
        match &self.payload {
            Some(build_event::Payload::TestResult(result)) => Some(result),
            _ => None,
        }
    }

    /// Packs this event into a `google.protobuf.Any` detail blob.
    pub fn to_any(&self) -> prost_types::Any {
        prost_types::Any {
            type_url: format!("{TYPE_URL_PREFIX}{BUILD_EVENT_TYPE_NAME}"),
            value: self.encode_to_vec(),
        }
    }
}
