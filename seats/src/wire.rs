//! JSON bodies shared by the HTTP service and the load harness.

use serde::{Deserialize, Serialize};

use crate::model::{SeatId, UserId};

pub const RESERVATION_SUCCESSFUL: &str = "Reservation successful";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveRequest {
    pub user_id: UserId,
    pub seat_id: SeatId,
}

impl ReserveRequest {
    /// Both ids must be positive. Checked before any store access.
    pub fn validate(&self) -> Result<(), String> {
        if self.user_id <= 0 {
            return Err(format!("user_id must be positive, got {}", self.user_id));
        }
        if self.seat_id <= 0 {
            return Err(format!("seat_id must be positive, got {}", self.seat_id));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveResponse {
    pub message: String,
}

impl ReserveResponse {
    pub fn success() -> Self {
        Self {
            message: RESERVATION_SUCCESSFUL.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_request_uses_snake_case_fields() {
        let req: ReserveRequest = serde_json::from_str(r#"{"user_id":1,"seat_id":42}"#).unwrap();
        assert_eq!(req, ReserveRequest { user_id: 1, seat_id: 42 });
    }

    #[test]
    fn reserve_request_rejects_wrong_types() {
        assert!(serde_json::from_str::<ReserveRequest>(r#"{"user_id":"x"}"#).is_err());
    }

    #[test]
    fn validate_rejects_non_positive_ids() {
        assert!(ReserveRequest { user_id: 1, seat_id: 1 }.validate().is_ok());

        let err = ReserveRequest { user_id: 0, seat_id: 1 }.validate().unwrap_err();
        assert!(err.contains("user_id"), "got: {err}");

        let err = ReserveRequest { user_id: 1, seat_id: -4 }.validate().unwrap_err();
        assert!(err.contains("seat_id"), "got: {err}");
    }
}
