use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    /// `None` for root comments.
    pub parent_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Comment {
    pub fn new(
        post_id: Uuid,
        author_id: Uuid,
        body: String,
        parent_id: Option<Uuid>,
        now: OffsetDateTime,
    ) -> Comment {
        Comment {
            id: Uuid::now_v7(),
            post_id,
            author_id,
            body,
            parent_id,
            created_at: now,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
