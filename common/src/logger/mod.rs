mod init;
mod slow;
mod span;
mod trace_id;

pub use init::{LogFormat, LogOptions, init_logger};
pub use slow::warn_if_slow;
pub use span::request_span;
pub use trace_id::TraceId;
