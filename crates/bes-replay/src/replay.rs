use std::io::Write;
use std::path::Path;

use bes_ingest::{
    AckSink, BuildEventService, DecoderStats, EnvelopeStream, IngestError, SessionReport,
    TransportError,
};
use bes_proto::{
    PublishBuildToolEventStreamRequest, PublishBuildToolEventStreamResponse,
    PublishLifecycleEventRequest,
};
use prost::Message;

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("record {index} in {path} is not a valid length-delimited message: {message}")]
    Frame {
        path: String,
        index: usize,
        message: String,
    },
    #[error(transparent)]
    Ingest(#[from] IngestError),
}

/// Reads a file of length-delimited protobuf records.
pub fn read_records<M: Message + Default>(path: &Path) -> Result<Vec<M>, ReplayError> {
    let bytes = std::fs::read(path).map_err(|source| ReplayError::Io {
        path: path.display().to_string(),
        source,
    })?;
    decode_records(&path.display().to_string(), &bytes)
}

fn decode_records<M: Message + Default>(
    path: &str,
    mut buf: &[u8],
) -> Result<Vec<M>, ReplayError> {
    let mut records = Vec::new();
    while !buf.is_empty() {
        let record = M::decode_length_delimited(&mut buf).map_err(|e| ReplayError::Frame {
            path: path.to_string(),
            index: records.len(),
            message: e.to_string(),
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Writes one line per ack as soon as the session releases it.
pub struct AckPrinter<W> {
    out: W,
    json: bool,
}

impl<W: Write + Send> AckPrinter<W> {
    pub fn new(out: W, json: bool) -> Self {
        Self { out, json }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[async_trait::async_trait]
impl<W: Write + Send> AckSink for AckPrinter<W> {
    async fn send(
        &mut self,
        ack: PublishBuildToolEventStreamResponse,
    ) -> Result<(), TransportError> {
        let line = format_ack(&ack, self.json);
        writeln!(self.out, "{line}").map_err(|e| TransportError::send(e.to_string()))
    }
}

fn format_ack(ack: &PublishBuildToolEventStreamResponse, json: bool) -> String {
    if json {
        return serde_json::json!({
            "type": "ack",
            "sequence_number": ack.sequence_number,
            "build_id": ack.stream_id.as_ref().map(|id| id.build_id.as_str()),
            "invocation_id": ack.stream_id.as_ref().map(|id| id.invocation_id.as_str()),
        })
        .to_string();
    }
    match &ack.stream_id {
        Some(id) => format!("ack {} {id}", ack.sequence_number),
        None => format!("ack {} -", ack.sequence_number),
    }
}

/// Runs every request through one session on the current task.
pub async fn replay_stream<S: AckSink + ?Sized>(
    service: &BuildEventService,
    requests: Vec<PublishBuildToolEventStreamRequest>,
    sink: &mut S,
) -> Result<SessionReport, IngestError> {
    let envelopes: EnvelopeStream = Box::pin(futures::stream::iter(
        requests.into_iter().map(Ok::<_, TransportError>),
    ));
    service.publish_build_tool_event_stream(envelopes, sink).await
}

/// Publishes lifecycle requests in order, stopping at the first failure.
///
/// Returns how many were accepted.
pub async fn replay_lifecycle(
    service: &BuildEventService,
    requests: &[PublishLifecycleEventRequest],
) -> Result<usize, IngestError> {
    for (index, request) in requests.iter().enumerate() {
        service.publish_lifecycle_event(request).await.inspect_err(|err| {
            tracing::warn!(index, error = %err, "lifecycle replay stopped");
        })?;
    }
    Ok(requests.len())
}

pub fn format_report(report: &SessionReport, stats: &DecoderStats, json: bool) -> String {
    if json {
        return serde_json::json!({
            "type": "report",
            "session": report,
            "decoder": stats,
        })
        .to_string();
    }
    format!(
        "session {} invocation {}: {} events, {} acks, {} test results, {} unrecognized ({} blobs decoded, {} failed)",
        report.session_id,
        report.invocation_id.as_deref().unwrap_or("-"),
        report.events_received,
        report.acks_sent,
        report.test_results,
        report.unrecognized_events,
        stats.decoded,
        stats.failed,
    )
}
