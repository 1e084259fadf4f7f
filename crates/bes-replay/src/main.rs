//! Replays recorded publish requests through the ingestion service.
//!
//! Input files hold length-delimited protobuf records, one request per record.

mod replay;

use std::path::PathBuf;

use bes_ingest::{AckMode, BuildEventService, IngestConfig, init_observability};
use bes_proto::{PublishBuildToolEventStreamRequest, PublishLifecycleEventRequest};
use clap::{Parser, ValueEnum};

use crate::replay::{
    AckPrinter, ReplayError, format_report, read_records, replay_lifecycle, replay_stream,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ReplayMode {
    /// File holds `PublishBuildToolEventStreamRequest` records for one stream.
    Stream,
    /// File holds `PublishLifecycleEventRequest` records.
    Lifecycle,
}

#[derive(Parser, Debug)]
#[command(name = "bes-replay", about = "Replay recorded build events through the ingestion core")]
struct Args {
    /// Overrides `BES_ACK_MODE` (`end_of_stream` or `incremental`).
    #[arg(long)]
    ack_mode: Option<AckMode>,
    /// Reject envelopes whose stream id differs from the first one.
    #[arg(long)]
    validate_stream_id: bool,
    /// Drop buffered acks when a detail blob fails to decode.
    #[arg(long)]
    no_flush_on_decode_error: bool,
    /// Print acks and the report as JSON lines.
    #[arg(long)]
    json: bool,
    #[arg(value_enum)]
    mode: ReplayMode,
    file: PathBuf,
}

impl Args {
    fn config(&self) -> Result<IngestConfig, ReplayError> {
        Ok(self.apply(IngestConfig::from_env()?))
    }

    fn apply(&self, mut config: IngestConfig) -> IngestConfig {
        if let Some(mode) = self.ack_mode {
            config = config.ack_mode(mode);
        }
        if self.validate_stream_id {
            config = config.validate_stream_id(true);
        }
        if self.no_flush_on_decode_error {
            config = config.flush_on_decode_error(false);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    init_observability();
    let args = Args::parse();
    run(args).await?;
    Ok(())
}

async fn run(args: Args) -> Result<(), ReplayError> {
    let service = BuildEventService::builder().config(args.config()?).build()?;
    match args.mode {
        ReplayMode::Stream => {
            let requests: Vec<PublishBuildToolEventStreamRequest> = read_records(&args.file)?;
            tracing::info!(records = requests.len(), file = %args.file.display(), "replaying stream");
            let mut printer = AckPrinter::new(std::io::stdout(), args.json);
            let report = replay_stream(&service, requests, &mut printer).await?;
            println!(
                "{}",
                format_report(&report, &service.decoder_stats(), args.json)
            );
        }
        ReplayMode::Lifecycle => {
            let requests: Vec<PublishLifecycleEventRequest> = read_records(&args.file)?;
            tracing::info!(
                records = requests.len(),
                file = %args.file.display(),
                "replaying lifecycle events"
            );
            let accepted = replay_lifecycle(&service, &requests).await?;
            if args.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "type": "lifecycle",
                        "accepted": accepted,
                        "decoder": service.decoder_stats(),
                    })
                );
            } else {
                println!("{accepted} lifecycle events accepted");
            }
        }
    }
    Ok(())
}
