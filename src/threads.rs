use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::model::Comment;

/// A root comment and its direct replies, both oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thread {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

/// Builds the two-level thread view of one post's comments.
///
/// Only replies whose parent is a root in `comments` are kept. Orphans (parent missing) and
/// replies to replies are left out rather than promoted. The result depends only on the set of
/// comments, not on their order; equal timestamps fall back to id order.
pub fn build(comments: impl IntoIterator<Item = Comment>) -> Vec<Thread> {
    let mut comments: Vec<Comment> = comments.into_iter().collect();
    comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    let (roots, replies): (Vec<Comment>, Vec<Comment>) =
        comments.into_iter().partition(Comment::is_root);

    let index: HashMap<Uuid, usize> = roots
        .iter()
        .enumerate()
        .map(|(at, root)| (root.id, at))
        .collect();

    let mut threads: Vec<Thread> = roots
        .into_iter()
        .map(|comment| Thread { comment, replies: Vec::new() })
        .collect();

    for reply in replies {
        let Some(&at) = reply.parent_id.as_ref().and_then(|parent| index.get(parent)) else {
            continue;
        };
        threads[at].replies.push(reply);
    }

    threads
}

/// Every comment in `threads`, each root followed by its replies.
pub fn flatten(threads: &[Thread]) -> Vec<&Comment> {
    threads
        .iter()
        .flat_map(|thread| std::iter::once(&thread.comment).chain(&thread.replies))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::seq::SliceRandom;
    use time::{macros::datetime, Duration, OffsetDateTime};

    use super::*;

    const START: OffsetDateTime = datetime!(2025-04-01 10:00 UTC);

    fn comment(n: u128, parent: Option<u128>, minute: i64) -> Comment {
        Comment {
            id: Uuid::from_u128(n),
            post_id: Uuid::from_u128(1000),
            author_id: Uuid::from_u128(2000),
            body: format!("comment {n}"),
            parent_id: parent.map(Uuid::from_u128),
            created_at: START + Duration::minutes(minute),
        }
    }

    fn ids(comments: &[Comment]) -> Vec<u128> {
        comments.iter().map(|c| c.id.as_u128()).collect()
    }

    #[test]
    fn orphan_reply_is_dropped() {
        let threads = build(vec![
            comment(1, None, 0),
            comment(2, Some(1), 1),
            comment(3, Some(99), 2),
        ]);

        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].comment.id, Uuid::from_u128(1));
        assert_eq!(ids(&threads[0].replies), vec![2]);
    }

    #[test]
    fn roots_and_replies_are_oldest_first() {
        let threads = build(vec![
            comment(10, None, 5),
            comment(11, Some(10), 9),
            comment(12, None, 1),
            comment(13, Some(10), 6),
            comment(14, Some(12), 2),
        ]);

        let roots: Vec<u128> = threads.iter().map(|t| t.comment.id.as_u128()).collect();
        assert_eq!(roots, vec![12, 10]);
        assert_eq!(ids(&threads[0].replies), vec![14]);
        assert_eq!(ids(&threads[1].replies), vec![13, 11]);
    }

    #[test]
    fn replies_to_replies_stay_out_of_view() {
        let threads = build(vec![
            comment(1, None, 0),
            comment(2, Some(1), 1),
            comment(3, Some(2), 2),
        ]);

        let shown: Vec<u128> = flatten(&threads).iter().map(|c| c.id.as_u128()).collect();
        assert_eq!(shown, vec![1, 2]);
    }

    #[test]
    fn flatten_recovers_comments_one_hop_from_a_root() {
        let comments = vec![
            comment(1, None, 0),
            comment(2, Some(1), 1),
            comment(3, None, 2),
            comment(4, Some(3), 3),
            comment(5, Some(4), 4),
            comment(6, Some(77), 5),
            comment(7, Some(1), 6),
        ];
        let roots: HashSet<Uuid> =
            comments.iter().filter(|c| c.is_root()).map(|c| c.id).collect();
        let expected: HashSet<Uuid> = comments
            .iter()
            .filter(|c| c.parent_id.is_none_or(|parent| roots.contains(&parent)))
            .map(|c| c.id)
            .collect();

        let threads = build(comments);
        let shown: HashSet<Uuid> = flatten(&threads).iter().map(|c| c.id).collect();
        assert_eq!(shown, expected);
    }

    #[test]
    fn order_of_input_does_not_matter() {
        let mut comments = vec![
            comment(1, None, 0),
            comment(2, Some(1), 1),
            comment(3, None, 1),
            comment(4, Some(3), 1),
            comment(5, Some(1), 1),
            comment(6, None, 0),
        ];
        let expected = build(comments.clone());

        for _ in 0..20 {
            comments.shuffle(&mut rand::rng());
            assert_eq!(build(comments.clone()), expected);
        }
    }

    #[test]
    fn rebuilding_is_idempotent() {
        let comments = vec![comment(1, None, 0), comment(2, Some(1), 1)];
        let first = build(comments.clone());
        let second = build(comments);
        assert_eq!(first, second);
        assert!(build(Vec::new()).is_empty());
    }
}
