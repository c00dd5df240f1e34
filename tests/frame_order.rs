//! Frame-number ordering across the 8-bit wrap.

use lstream::{FrameNumber, NodeId, ReceiveStatus, Receiver, ReceiverConfig, SessionId};
use lstream_testing::{FrameBuilder, RecordingHandler};
use rstest::{fixture, rstest};

#[fixture]
fn receiver() -> Receiver {
    let mut receiver = Receiver::new(
        ReceiverConfig::default()
            .with_node_id(NodeId::new(1))
            .with_session_id(SessionId::new(1)),
    );
    receiver.set_handler(RecordingHandler::default());
    receiver
}

fn status(receiver: &mut Receiver, frame: u8) -> ReceiveStatus {
    receiver.receive_status(&FrameBuilder::new(1, 1).frame(frame).single(&[frame]))
}

#[rstest]
#[case::ascending(&[1, 2, 3], &[ReceiveStatus::NoFailure; 3])]
#[case::gap(&[1, 40], &[ReceiveStatus::NoFailure; 2])]
#[case::wrap(&[254, 255, 0, 1], &[ReceiveStatus::NoFailure; 4])]
#[case::wrap_skipping_zero(
    &[250, 3],
    &[ReceiveStatus::NoFailure, ReceiveStatus::OtherFailure]
)]
#[case::stale(
    &[10, 9],
    &[ReceiveStatus::NoFailure, ReceiveStatus::BadFrameOrder]
)]
#[case::stale_across_wrap(
    &[2, 250],
    &[ReceiveStatus::NoFailure, ReceiveStatus::BadFrameOrder]
)]
#[case::repeat_is_not_stale(
    &[10, 10],
    &[ReceiveStatus::NoFailure, ReceiveStatus::OtherFailure]
)]
fn sequence(
    mut receiver: Receiver,
    #[case] frames: &[u8],
    #[case] expected: &[ReceiveStatus],
) {
    let statuses: Vec<_> = frames.iter().map(|&f| status(&mut receiver, f)).collect();
    assert_eq!(statuses, expected);
}

#[rstest]
fn full_cycle_is_accepted(mut receiver: Receiver) {
    for round in 0..2 {
        for frame in 0..=u8::MAX {
            assert_eq!(
                status(&mut receiver, frame),
                ReceiveStatus::NoFailure,
                "round {round}, frame {frame}"
            );
        }
    }
    assert_eq!(receiver.last_downstream_frame(), Some(FrameNumber::new(u8::MAX)));
}

#[rstest]
fn rejected_frames_do_not_advance_the_counter(mut receiver: Receiver) {
    assert_eq!(status(&mut receiver, 10), ReceiveStatus::NoFailure);
    let wrong_node = FrameBuilder::new(2, 1).frame(100).single(b"x");
    assert_eq!(receiver.receive_status(&wrong_node), ReceiveStatus::IncorrectNode);
    assert_eq!(receiver.last_downstream_frame(), Some(FrameNumber::new(10)));
    assert_eq!(status(&mut receiver, 11), ReceiveStatus::NoFailure);
}
