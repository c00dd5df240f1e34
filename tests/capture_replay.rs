//! Replaying a recorded capture with arrival offsets.

use std::{
    num::NonZeroUsize,
    time::{Duration, Instant},
};

use lstream::{
    NodeId,
    ReceiveStatus,
    Receiver,
    ReceiverConfig,
    SessionId,
    capture::{CaptureReader, encode_record},
};
use lstream_testing::{FrameBuilder, RecordingHandler, fragment_transaction};

fn replay(capture: &[u8], receiver: &mut Receiver) -> Vec<ReceiveStatus> {
    let start = Instant::now();
    CaptureReader::new(capture)
        .map(|record| {
            let record = record.expect("well-formed capture");
            ReceiveStatus::from_result(&receiver.receive_at(record.frame, start + record.offset))
        })
        .collect()
}

#[test]
fn late_fragment_is_stale_once_evicted() {
    let builder = FrameBuilder::new(3, 1);
    let slow = fragment_transaction(builder.frame(1), 4, b"slow-payload");
    let quick = fragment_transaction(builder.frame(2), 4, b"ok");

    let mut capture = Vec::new();
    for (millis, frame) in [(0, &slow[0]), (10, &slow[1]), (20, &quick[0]), (1_500, &slow[2])] {
        encode_record(Duration::from_millis(millis), frame, &mut capture).expect("encodable");
    }

    let handler = RecordingHandler::default();
    let mut receiver = Receiver::new(
        ReceiverConfig::default()
            .with_node_id(NodeId::new(3))
            .with_session_id(SessionId::new(1))
            .with_fragment_payload_cap(NonZeroUsize::new(4).expect("non-zero")),
    );
    receiver.set_handler(handler.clone());

    assert_eq!(
        replay(&capture, &mut receiver),
        vec![
            ReceiveStatus::NoFailure,
            ReceiveStatus::NoFailure,
            ReceiveStatus::NoFailure,
            ReceiveStatus::BadFrameOrder,
        ]
    );
    assert_eq!(handler.payloads(), vec![b"ok".to_vec()]);
}
