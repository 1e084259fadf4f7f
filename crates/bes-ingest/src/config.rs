use std::fmt;
use std::str::FromStr;

use crate::errors::IngestError;

/// When acknowledgments are released to the client.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckMode {
    /// Hold every ack until the client half-closes, then send them sorted.
    #[default]
    EndOfStream,
    /// Release acks while receiving, as soon as they extend the contiguous run
    /// starting at sequence number 1. The remainder is flushed at end of stream.
    Incremental,
}

impl AckMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EndOfStream => "end_of_stream",
            Self::Incremental => "incremental",
        }
    }
}

impl fmt::Display for AckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AckMode {
    type Err = IngestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "end_of_stream" | "batch" => Ok(Self::EndOfStream),
            "incremental" => Ok(Self::Incremental),
            other => Err(IngestError::Config(format!("unknown ack mode: {other}"))),
        }
    }
}

/// Per-service ingestion behavior.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IngestConfig {
    /// When acks are sent.
    pub ack_mode: AckMode,
    /// Flush the acks recorded so far before surfacing a mid-stream decode failure.
    pub flush_on_decode_error: bool,
    /// Reject envelopes whose stream id differs from the one learned first.
    pub validate_stream_id: bool,
    /// Bounded buffer size of the in-process transport channels.
    pub channel_capacity: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            ack_mode: AckMode::EndOfStream,
            flush_on_decode_error: true,
            validate_stream_id: false,
            channel_capacity: 128,
        }
    }
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

impl IngestConfig {
    /// Builds a config from `BES_*` environment variables, falling back to defaults.
    ///
    /// - `BES_ACK_MODE`: `end_of_stream` or `incremental`.
    /// - `BES_FLUSH_ON_DECODE_ERROR`: boolean.
    /// - `BES_VALIDATE_STREAM_ID`: boolean.
    /// - `BES_CHANNEL_CAPACITY`: positive integer.
    pub fn from_env() -> Result<Self, IngestError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, IngestError> {
        let mut config = Self::default();
        if let Some(mode) = lookup("BES_ACK_MODE") {
            config.ack_mode = mode.parse()?;
        }
        if let Some(value) = lookup("BES_FLUSH_ON_DECODE_ERROR") {
            config.flush_on_decode_error = bool_var("BES_FLUSH_ON_DECODE_ERROR", &value)?;
        }
        if let Some(value) = lookup("BES_VALIDATE_STREAM_ID") {
            config.validate_stream_id = bool_var("BES_VALIDATE_STREAM_ID", &value)?;
        }
        if let Some(value) = lookup("BES_CHANNEL_CAPACITY") {
            config.channel_capacity = value.trim().parse().map_err(|e| {
                IngestError::Config(format!("invalid BES_CHANNEL_CAPACITY {value:?}: {e}"))
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Sets the ack mode.
    pub fn ack_mode(mut self, mode: AckMode) -> Self {
        self.ack_mode = mode;
        self
    }

    /// Sets whether recorded acks are flushed before a decode failure is returned.
    pub fn flush_on_decode_error(mut self, flush: bool) -> Self {
        self.flush_on_decode_error = flush;
        self
    }

    /// Enables or disables per-envelope stream id checks.
    pub fn validate_stream_id(mut self, validate: bool) -> Self {
        self.validate_stream_id = validate;
        self
    }

    /// Sets the in-process transport buffer size.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), IngestError> {
        if self.channel_capacity == 0 {
            return Err(IngestError::Config(
                "channel_capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn bool_var(key: &str, value: &str) -> Result<bool, IngestError> {
    parse_bool(value).ok_or_else(|| IngestError::Config(format!("invalid {key}: {value:?}")))
}
