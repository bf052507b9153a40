use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Pending,
    Accepted,
    Declined,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Pending => "pending",
            ConnectionStatus::Accepted => "accepted",
            ConnectionStatus::Declined => "declined",
        }
    }

    pub fn parse(s: &str) -> Option<ConnectionStatus> {
        match s {
            "pending" => Some(ConnectionStatus::Pending),
            "accepted" => Some(ConnectionStatus::Accepted),
            "declined" => Some(ConnectionStatus::Declined),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub recipient_id: Uuid,
    pub status: ConnectionStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Connection {
    pub fn request(requester_id: Uuid, recipient_id: Uuid, now: OffsetDateTime) -> Connection {
        Connection {
            id: Uuid::now_v7(),
            requester_id,
            recipient_id,
            status: ConnectionStatus::Pending,
            created_at: now,
        }
    }

    /// Order-insensitive pair key.
    pub fn pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
        if a <= b { (a, b) } else { (b, a) }
    }

    pub fn involves(&self, a: Uuid, b: Uuid) -> bool {
        Connection::pair(self.requester_id, self.recipient_id) == Connection::pair(a, b)
    }

    /// Only a pending request moves, and only once.
    pub fn respond(&mut self, accept: bool) -> AppResult<()> {
        if self.status != ConnectionStatus::Pending {
            return Err(AppError::Validation(format!(
                "This request was already {}.",
                self.status.as_str()
            )));
        }

        self.status = if accept {
            ConnectionStatus::Accepted
        } else {
            ConnectionStatus::Declined
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn pair_ignores_direction() {
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let request = Connection::request(a, b, datetime!(2025-01-01 0:00 UTC));
        assert!(request.involves(b, a));
        assert!(request.involves(a, b));
        assert!(!request.involves(a, Uuid::now_v7()));
    }

    #[test]
    fn responses_are_terminal() {
        let mut request =
            Connection::request(Uuid::now_v7(), Uuid::now_v7(), datetime!(2025-01-01 0:00 UTC));
        request.respond(true).unwrap();
        assert_eq!(request.status, ConnectionStatus::Accepted);

        assert!(matches!(request.respond(false), Err(AppError::Validation(_))));
        assert_eq!(request.status, ConnectionStatus::Accepted);
    }
}
