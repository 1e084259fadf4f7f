use std::fmt;

/// Unique identifier for a build event stream.
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct StreamId {
    /// The id of a build. A build is the sum of all invocations of a build tool.
    #[prost(string, tag = "1")]
    pub build_id: ::prost::alloc::string::String,
    /// The unique invocation id within the build.
    #[prost(string, tag = "6")]
    pub invocation_id: ::prost::alloc::string::String,
    /// The component that emitted this stream.
    #[prost(enumeration = "stream_id::BuildComponent", tag = "3")]
    pub component: i32,
}

/// Nested message and enum types in `StreamId`.
pub mod stream_id {
    /// Which build component generated this event stream.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum BuildComponent {
        UnknownComponent = 0,
        Controller = 1,
        Worker = 2,
        Tool = 3,
    }

    impl BuildComponent {
        pub fn as_str_name(&self) -> &'static str {
            match self {
                Self::UnknownComponent => "UNKNOWN_COMPONENT",
                Self::Controller => "CONTROLLER",
                Self::Worker => "WORKER",
                Self::Tool => "TOOL",
            }
        }
    }
}

impl StreamId {
    pub fn new(
        build_id: impl Into<String>,
        invocation_id: impl Into<String>,
        component: stream_id::BuildComponent,
    ) -> Self {
        Self {
            build_id: build_id.into(),
            invocation_id: invocation_id.into(),
            component: component as i32,
        }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.build_id,
            self.invocation_id,
            self.component().as_str_name()
        )
    }
}

/// A build event with the sequence number assigned by the publishing client.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OrderedBuildEvent {
    /// Which build event stream this event belongs to.
    #[prost(message, optional, tag = "1")]
    pub stream_id: ::core::option::Option<StreamId>,
    /// The position of this event in the stream. Sequence numbers start at 1.
    #[prost(int64, tag = "2")]
    pub sequence_number: i64,
    /// The event itself.
    #[prost(message, optional, tag = "3")]
    pub event: ::core::option::Option<BuildEvent>,
}

impl OrderedBuildEvent {
    pub fn new(stream_id: Option<StreamId>, sequence_number: i64, event: BuildEvent) -> Self {
        Self {
            stream_id,
            sequence_number,
            event: Some(event),
        }
    }
}

/// An event representing some state change that occurred in the build.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BuildEvent {
    /// When the event was emitted by the client.
    #[prost(message, optional, tag = "1")]
    pub event_time: ::core::option::Option<::prost_types::Timestamp>,
    /// The event payload. An unknown tag from a newer client decodes as `None`.
    #[prost(
        oneof = "build_event::Event",
        tags = "51, 52, 53, 55, 56, 59, 60, 61, 62"
    )]
    pub event: ::core::option::Option<build_event::Event>,
}

impl From<build_event::Event> for BuildEvent {
    fn from(event: build_event::Event) -> Self {
        Self {
            event_time: None,
            event: Some(event),
        }
    }
}

/// Nested message and enum types in `BuildEvent`.
pub mod build_event {
    /// An invocation attempt has started.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct InvocationAttemptStarted {
        /// The number of the invocation attempt, starting at 1.
        #[prost(int64, tag = "1")]
        pub attempt_number: i64,
        /// Arbitrary details about the invocation attempt.
        #[prost(message, optional, tag = "2")]
        pub details: ::core::option::Option<::prost_types::Any>,
    }

    /// An invocation attempt has finished.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct InvocationAttemptFinished {
        /// Final status of the invocation.
        #[prost(message, optional, tag = "3")]
        pub invocation_status: ::core::option::Option<super::BuildStatus>,
        /// Arbitrary details about the invocation attempt.
        #[prost(message, optional, tag = "4")]
        pub details: ::core::option::Option<::prost_types::Any>,
    }

    /// The build has been enqueued.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct BuildEnqueued {
        /// Additional details about the build.
        #[prost(message, optional, tag = "1")]
        pub details: ::core::option::Option<::prost_types::Any>,
    }

    /// The build has finished.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct BuildFinished {
        /// Final status of the build.
        #[prost(message, optional, tag = "1")]
        pub status: ::core::option::Option<super::BuildStatus>,
        /// Additional details about the build.
        #[prost(message, optional, tag = "2")]
        pub details: ::core::option::Option<::prost_types::Any>,
    }

    /// Textual output written to stdout or stderr.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ConsoleOutput {
        /// The output stream type.
        #[prost(enumeration = "super::ConsoleOutputStream", tag = "1")]
        pub r#type: i32,
        /// The output data.
        #[prost(oneof = "console_output::Output", tags = "2, 3")]
        pub output: ::core::option::Option<console_output::Output>,
    }

    /// Nested message and enum types in `ConsoleOutput`.
    pub mod console_output {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Output {
            /// UTF-8 encoded text.
            #[prost(string, tag = "2")]
            TextOutput(::prost::alloc::string::String),
            /// Arbitrary bytes.
            #[prost(bytes, tag = "3")]
            BinaryOutput(::prost::alloc::vec::Vec<u8>),
        }
    }

    /// Last event of a component stream.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct BuildComponentStreamFinished {
        /// How the event stream finished.
        #[prost(enumeration = "build_component_stream_finished::FinishType", tag = "1")]
        pub r#type: i32,
    }

    /// Nested message and enum types in `BuildComponentStreamFinished`.
    pub mod build_component_stream_finished {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
        #[repr(i32)]
        pub enum FinishType {
            Unspecified = 0,
            Finished = 1,
            Expired = 2,
        }
    }

    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Event {
        #[prost(message, tag = "51")]
        InvocationAttemptStarted(InvocationAttemptStarted),
        #[prost(message, tag = "52")]
        InvocationAttemptFinished(InvocationAttemptFinished),
        #[prost(message, tag = "53")]
        BuildEnqueued(BuildEnqueued),
        #[prost(message, tag = "55")]
        BuildFinished(BuildFinished),
        #[prost(message, tag = "56")]
        ConsoleOutput(ConsoleOutput),
        #[prost(message, tag = "59")]
        ComponentStreamFinished(BuildComponentStreamFinished),
        /// Structured build event generated by Bazel.
        #[prost(message, tag = "60")]
        BazelEvent(::prost_types::Any),
        /// An event that contains supplemental tool-specific information about build execution.
        #[prost(message, tag = "61")]
        BuildExecutionEvent(::prost_types::Any),
        /// An event that contains supplemental tool-specific information about source fetching.
        #[prost(message, tag = "62")]
        SourceFetchEvent(::prost_types::Any),
    }
}

/// Status used for both invocation attempt and overall build completion.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BuildStatus {
    /// The end result.
    #[prost(enumeration = "build_status::Result", tag = "1")]
    pub result: i32,
    /// Final invocation id of the build, if there was one.
    #[prost(string, tag = "3")]
    pub final_invocation_id: ::prost::alloc::string::String,
}

/// Nested message and enum types in `BuildStatus`.
pub mod build_status {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Result {
        UnknownStatus = 0,
        CommandSucceeded = 1,
        CommandFailed = 2,
        UserError = 3,
        SystemError = 4,
        ResourceExhausted = 5,
        InvocationDeadlineExceeded = 6,
        Cancelled = 7,
        RequestDeadlineExceeded = 8,
    }
}

/// The type of console output stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ConsoleOutputStream {
    Unknown = 0,
    Stdout = 1,
    Stderr = 2,
}
