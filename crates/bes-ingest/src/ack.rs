//! Acknowledgment ordering.
//!
//! Acks for one stream must reach the client in non-decreasing sequence-number
//! order even though envelopes may arrive in any order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use bes_proto::{PublishBuildToolEventStreamResponse, StreamId};
use tracing::{debug, warn};

use crate::config::AckMode;
use crate::errors::TransportError;
use crate::transport::AckSink;

/// Sequence number of the first event on every stream.
pub const FIRST_SEQUENCE_NUMBER: i64 = 1;

/// Sorts `sequence_numbers` ascending and sends one ack per entry, duplicates included.
///
/// Stops at the first transport error and returns it; acks already sent stand.
/// Returns the number of acks sent.
pub async fn acknowledge<S: AckSink + ?Sized>(
    sink: &mut S,
    stream_id: Option<&StreamId>,
    mut sequence_numbers: Vec<i64>,
) -> Result<usize, TransportError> {
    sequence_numbers.sort_unstable();
    let mut sent = 0;
    for sequence_number in sequence_numbers {
        let ack = PublishBuildToolEventStreamResponse {
            stream_id: stream_id.cloned(),
            sequence_number,
        };
        if let Err(err) = sink.send(ack).await {
            warn!(
                invocation_id = stream_id.map(|id| id.invocation_id.as_str()).unwrap_or(""),
                sequence_number,
                error = %err,
                "error sending ack for invocation"
            );
            return Err(err);
        }
        sent += 1;
    }
    Ok(sent)
}

/// Accumulates received sequence numbers and decides when each can be acked.
#[derive(Debug)]
pub struct AckSequencer {
    mode: AckMode,
    pending: BinaryHeap<Reverse<i64>>,
    last_released: Option<i64>,
}

impl AckSequencer {
    pub fn new(mode: AckMode) -> Self {
        Self {
            mode,
            pending: BinaryHeap::new(),
            last_released: None,
        }
    }

    /// Records one received sequence number and returns the numbers that may be acked now.
    ///
    /// Always empty in [`AckMode::EndOfStream`]. In [`AckMode::Incremental`] the result
    /// extends the contiguous run starting at [`FIRST_SEQUENCE_NUMBER`]; a number below the
    /// last released one was already acked and is dropped.
    pub fn record(&mut self, sequence_number: i64) -> Vec<i64> {
        match self.mode {
            AckMode::EndOfStream => {
                self.pending.push(Reverse(sequence_number));
                Vec::new()
            }
            AckMode::Incremental => {
                if let Some(last) = self.last_released
                    && sequence_number < last
                {
                    debug!(sequence_number, last, "sequence number already acknowledged");
                    return Vec::new();
                }
                self.pending.push(Reverse(sequence_number));
                self.release_contiguous()
            }
        }
    }

    /// Takes every number not yet released, sorted ascending.
    pub fn drain(&mut self) -> Vec<i64> {
        let mut remaining: Vec<i64> = self.pending.drain().map(|Reverse(n)| n).collect();
        remaining.sort_unstable();
        if let Some(&last) = remaining.last() {
            self.last_released = Some(last);
        }
        remaining
    }

    /// Numbers recorded but not yet released.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn release_contiguous(&mut self) -> Vec<i64> {
        let mut ready = Vec::new();
        while let Some(&Reverse(next)) = self.pending.peek() {
            let expected = self
                .last_released
                .map_or(FIRST_SEQUENCE_NUMBER, |last| last + 1);
            if next != expected && Some(next) != self.last_released {
                break;
            }
            self.pending.pop();
            self.last_released = Some(next);
            ready.push(next);
        }
        ready
    }
}
