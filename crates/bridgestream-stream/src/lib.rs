//! BridgeStream Stream
//!
//! Normalizes vendor response streams into caller-facing events.
//!
//! A [`StreamProcessor`] opens a response through an [`InvokeStream`]
//! transport, decodes each frame with a [`ChunkParser`] bound to the request's
//! adapter, and yields [`StreamEvent`]s until the vendor signals completion
//! or an error.

pub mod parser;
pub mod processor;
pub mod transport;

pub use parser::{ChunkParser, RawFrame, StreamEvent};
pub use processor::{collect_events, EventStream, StreamProcessor};
pub use transport::{FrameStream, InvokeStream, StreamRequest};
