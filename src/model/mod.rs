mod comment;
mod connection;
mod post;
mod profile;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use comment::Comment;
pub use connection::{Connection, ConnectionStatus};
pub use post::{Post, PostKind};
pub use profile::{AlumniDetails, Placement, Profile, Role, RoleKind, AVATARS, BRANCHES};

use crate::votes::VoteKind;

/// One user's standing vote on one post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub kind: VoteKind,
}
