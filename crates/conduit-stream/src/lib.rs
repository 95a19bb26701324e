mod buffering;
mod decoder;

pub use buffering::LineBuffer;
pub use decoder::{decode_event_stream, decode_response, parse_data_line, EventStream, LineOutcome};
