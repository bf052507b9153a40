use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::votes::{VoteKind, VoteTally};

use super::Profile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostKind {
    Global,
    Branch,
    Doubt,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostKind::Global => "global",
            PostKind::Branch => "branch",
            PostKind::Doubt => "doubt",
        }
    }

    pub fn parse(s: &str) -> Option<PostKind> {
        match s {
            "global" => Some(PostKind::Global),
            "branch" => Some(PostKind::Branch),
            "doubt" => Some(PostKind::Doubt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub kind: PostKind,
    pub title: Option<String>,
    pub body: String,
    pub image: Option<String>,
    pub upvotes: u32,
    pub downvotes: u32,
    pub comment_count: u32,
    /// Always set for branch posts.
    pub branch: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Post {
    /// Branch and doubt posts are tagged with the author's branch.
    pub fn new(
        author: &Profile,
        kind: PostKind,
        title: Option<String>,
        body: String,
        image: Option<String>,
        now: OffsetDateTime,
    ) -> Post {
        let branch = match kind {
            PostKind::Global => None,
            PostKind::Branch | PostKind::Doubt => Some(author.branch.clone()),
        };

        Post {
            id: Uuid::now_v7(),
            author_id: author.id,
            kind,
            title,
            body,
            image,
            upvotes: 0,
            downvotes: 0,
            comment_count: 0,
            branch,
            created_at: now,
        }
    }

    pub fn net(&self) -> i64 {
        self.tally(None).net()
    }

    pub fn tally(&self, user_vote: Option<VoteKind>) -> VoteTally {
        VoteTally::new(self.upvotes, self.downvotes, user_vote)
    }
}
