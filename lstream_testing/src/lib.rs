//! Helpers for building Little Stream frames and observing deliveries in
//! tests.
//!
//! ```rust
//! use lstream::{NodeId, Receiver, ReceiverConfig, SessionId};
//! use lstream_testing::{FrameBuilder, RecordingHandler};
//!
//! let mut receiver = Receiver::new(
//!     ReceiverConfig::default()
//!         .with_node_id(NodeId::new(7))
//!         .with_session_id(SessionId::new(3)),
//! );
//! let handler = RecordingHandler::default();
//! receiver.set_handler(handler.clone());
//!
//! let frame = FrameBuilder::new(7, 3).frame(1).single(b"hi");
//! receiver.receive(&frame).expect("accepted");
//! assert_eq!(handler.payloads(), vec![b"hi".to_vec()]);
//! ```

pub mod frames;
pub mod logging;
mod recording;

pub use frames::{FrameBuilder, fragment_transaction};
pub use logging::{LoggerHandle, logger};
pub use recording::RecordingHandler;
