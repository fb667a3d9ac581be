use tracing::{Span, field};

use super::TraceId;

/// Root span for one HTTP request. `user_id` and `seat_id` are recorded
/// later, once the body has been parsed.
pub fn request_span(action: &'static str, trace_id: &TraceId) -> Span {
    tracing::info_span!(
        "request",
        action = %action,
        trace_id = %trace_id,
        user_id = field::Empty,
        seat_id = field::Empty
    )
}
