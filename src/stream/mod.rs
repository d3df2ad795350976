pub mod reframe;

pub use reframe::{reframe_sse_stream, ReframeError, DEFAULT_MAX_EVENT_BYTES};
