use std::sync::Arc;

use bes_proto::PublishLifecycleEventRequest;
use tracing::{debug, info};

use crate::decoder::{PayloadDecoder, PayloadKind, classify};
use crate::errors::IngestError;
use crate::observer::EventContext;

/// Handles unary lifecycle calls.
///
/// Variants without details are acknowledged without touching the decoder; the
/// others go through the same decode path as streamed events.
pub struct LifecycleHandler {
    decoder: Arc<PayloadDecoder>,
}

impl LifecycleHandler {
    pub fn new(decoder: Arc<PayloadDecoder>) -> Self {
        Self { decoder }
    }

    pub fn handle(&self, request: &PublishLifecycleEventRequest) -> Result<(), IngestError> {
        let ordered = request
            .build_event
            .as_ref()
            .ok_or_else(|| IngestError::malformed("lifecycle request carries no build_event"))?;
        let event = ordered
            .event
            .as_ref()
            .ok_or_else(|| IngestError::malformed("lifecycle build_event carries no event"))?;
        let ctx = EventContext {
            stream_id: ordered.stream_id.as_ref(),
            sequence_number: Some(ordered.sequence_number),
        };
        info!(
            invocation_id = ctx.stream_id.map(|id| id.invocation_id.as_str()).unwrap_or(""),
            sequence_number = ordered.sequence_number,
            "lifecycle event received"
        );

        match classify(event) {
            PayloadKind::Plain(variant) => {
                debug!(variant = variant.as_str(), "lifecycle event acknowledged");
            }
            PayloadKind::Unrecognized => self.decoder.report_unrecognized(&ctx),
            PayloadKind::Detailed { .. } => {
                self.decoder.decode(event, &ctx)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::DecoderStats;
    use crate::testing::{
        RecordingObserver, console_output_event, detail_variants, malformed_details, stream_id,
        test_result_details,
    };
    use bes_proto::{BuildEvent, OrderedBuildEvent};

    fn handler() -> (LifecycleHandler, Arc<PayloadDecoder>, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::default());
        let decoder = Arc::new(PayloadDecoder::new(observer.clone()));
        (LifecycleHandler::new(decoder.clone()), decoder, observer)
    }

    fn request(event: BuildEvent) -> PublishLifecycleEventRequest {
        OrderedBuildEvent::new(Some(stream_id()), 1, event).into()
    }

    #[test]
    fn console_output_returns_without_decoding() {
        let (handler, decoder, _) = handler();
        handler
            .handle(&request(console_output_event()))
            .expect("acknowledged");
        assert_eq!(decoder.stats(), DecoderStats::default());
    }

    #[test]
    fn detail_variants_surface_test_results() {
        let (handler, decoder, observer) = handler();
        for event in detail_variants(Some(test_result_details("lifecycle"))) {
            handler.handle(&request(event)).expect("decodes");
        }
        assert_eq!(decoder.stats().decoded, 4);
        assert_eq!(observer.results().len(), 4);
    }

    #[test]
    fn undecodable_details_fail_the_call() {
        let (handler, _, _) = handler();
        let event = detail_variants(Some(malformed_details())).remove(0);
        let err = handler.handle(&request(event)).expect_err("decode error");
        assert!(matches!(err, IngestError::Decode(_)));
    }

    #[test]
    fn unrecognized_variant_is_tolerated() {
        let (handler, decoder, observer) = handler();
        handler
            .handle(&request(BuildEvent::default()))
            .expect("tolerated");
        assert_eq!(decoder.stats().unrecognized, 1);
        assert_eq!(observer.unrecognized(), 1);
    }

    #[test]
    fn missing_build_event_is_malformed() {
        let (handler, _, _) = handler();
        let err = handler
            .handle(&PublishLifecycleEventRequest::default())
            .expect_err("malformed");
        assert!(matches!(err, IngestError::MalformedEnvelope(_)));

        let bare: PublishLifecycleEventRequest = OrderedBuildEvent {
            stream_id: None,
            sequence_number: 1,
            event: None,
        }
        .into();
        assert!(matches!(
            handler.handle(&bare),
            Err(IngestError::MalformedEnvelope(_))
        ));
    }
}
