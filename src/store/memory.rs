use std::{cmp::Reverse, collections::HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{model::{Comment, Connection, Post, Profile, Vote}, AppError, AppResult};

use super::{CommentFilter, ConnectionFilter, Db, PostFilter, PostOrder, ProfileFilter, ProfileOrder, Record, Repository, VoteFilter};

/// Everything in process memory; used by tests and throwaway demos.
#[derive(Default)]
pub struct MemoryStore {
    profiles: Table<Profile>,
    posts: Table<Post>,
    comments: Table<Comment>,
    connections: Table<Connection>,
    votes: Table<Vote>,
}

impl Db for MemoryStore {
    fn profiles(&self) -> &dyn Repository<Profile> { &self.profiles }
    fn posts(&self) -> &dyn Repository<Post> { &self.posts }
    fn comments(&self) -> &dyn Repository<Comment> { &self.comments }
    fn connections(&self) -> &dyn Repository<Connection> { &self.connections }
    fn votes(&self) -> &dyn Repository<Vote> { &self.votes }
}

struct Table<T> {
    rows: RwLock<HashMap<Uuid, T>>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Table { rows: RwLock::new(HashMap::new()) }
    }
}

/// In-memory counterpart of the SQL each back end runs.
trait Scan: Record {
    fn matches(&self, filter: &Self::Filter) -> bool;

    fn arrange(rows: &mut Vec<Self>, filter: &Self::Filter);

    /// Uniqueness the schema would enforce.
    fn conflicts(&self, _other: &Self) -> Option<AppError> {
        None
    }
}

#[async_trait]
impl<T: Scan> Repository<T> for Table<T> {
    async fn get(&self, id: Uuid) -> AppResult<Option<T>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn list(&self, filter: &T::Filter) -> AppResult<Vec<T>> {
        let mut rows: Vec<T> = self
            .rows
            .read()
            .await
            .values()
            .filter(|row| row.matches(filter))
            .cloned()
            .collect();
        T::arrange(&mut rows, filter);
        Ok(rows)
    }

    async fn put(&self, record: &T) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        let conflict = rows
            .values()
            .filter(|row| row.id() != record.id())
            .find_map(|row| record.conflicts(row));
        if let Some(err) = conflict {
            return Err(err);
        }

        rows.insert(record.id(), record.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.rows.write().await.remove(&id).is_some())
    }
}

fn eq<T: PartialEq>(wanted: &Option<T>, actual: &T) -> bool {
    wanted.as_ref().is_none_or(|wanted| wanted == actual)
}

fn truncate<T>(rows: &mut Vec<T>, limit: Option<usize>) {
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
}

impl Scan for Profile {
    fn matches(&self, filter: &ProfileFilter) -> bool {
        eq(&filter.email, &self.email)
            && eq(&filter.role, &self.role.kind())
            && eq(&filter.branch, &self.branch)
            && filter.exclude != Some(self.id)
            && filter.name_like.as_ref().is_none_or(|pattern| {
                self.full_name.to_lowercase().contains(&pattern.to_lowercase())
            })
    }

    fn arrange(rows: &mut Vec<Self>, filter: &ProfileFilter) {
        match filter.order {
            ProfileOrder::Aura => rows.sort_by_key(|p| (Reverse(p.aura()), Reverse(p.created_at), p.id)),
            ProfileOrder::Newest => rows.sort_by_key(|p| (Reverse(p.created_at), p.id)),
        }
        truncate(rows, filter.limit);
    }

    fn conflicts(&self, other: &Self) -> Option<AppError> {
        (self.email == other.email).then_some(AppError::DuplicateAccount)
    }
}

impl Scan for Post {
    fn matches(&self, filter: &PostFilter) -> bool {
        eq(&filter.kind, &self.kind)
            && filter.branch.as_ref().is_none_or(|branch| self.branch.as_ref() == Some(branch))
    }

    fn arrange(rows: &mut Vec<Self>, filter: &PostFilter) {
        match filter.order {
            PostOrder::Recent => rows.sort_by_key(|p| (Reverse(p.created_at), p.id)),
            PostOrder::Top => rows.sort_by_key(|p| (Reverse(p.net()), Reverse(p.created_at), p.id)),
        }
        truncate(rows, filter.limit);
    }
}

impl Scan for Comment {
    fn matches(&self, filter: &CommentFilter) -> bool {
        eq(&filter.post_id, &self.post_id)
    }

    fn arrange(rows: &mut Vec<Self>, _filter: &CommentFilter) {
        rows.sort_by_key(|c| (c.created_at, c.id));
    }
}

impl Scan for Connection {
    fn matches(&self, filter: &ConnectionFilter) -> bool {
        filter.between.is_none_or(|(a, b)| self.involves(a, b))
            && filter.member.is_none_or(|id| self.requester_id == id || self.recipient_id == id)
            && eq(&filter.recipient_id, &self.recipient_id)
            && eq(&filter.status, &self.status)
    }

    fn arrange(rows: &mut Vec<Self>, _filter: &ConnectionFilter) {
        rows.sort_by_key(|c| (Reverse(c.created_at), c.id));
    }

    fn conflicts(&self, other: &Self) -> Option<AppError> {
        other
            .involves(self.requester_id, self.recipient_id)
            .then(|| AppError::invalid("A connection between you two already exists."))
    }
}

impl Scan for Vote {
    fn matches(&self, filter: &VoteFilter) -> bool {
        eq(&filter.post_id, &self.post_id) && eq(&filter.user_id, &self.user_id)
    }

    fn arrange(rows: &mut Vec<Self>, _filter: &VoteFilter) {
        rows.sort_by_key(|v| v.id);
    }

    fn conflicts(&self, other: &Self) -> Option<AppError> {
        (self.post_id == other.post_id && self.user_id == other.user_id)
            .then(|| AppError::invalid("You already voted on this post."))
    }
}
