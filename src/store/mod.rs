//! Typed record storage.
//!
//! Call sites only see [`Store`]; whether records live in memory or in SQLite is decided once
//! at startup.

mod memory;
mod sqlite;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{model::{Comment, Connection, ConnectionStatus, Post, PostKind, Profile, RoleKind, Vote}, AppResult};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub trait Record: Clone + Send + Sync + 'static {
    type Filter: Send + Sync;

    fn id(&self) -> Uuid;
}

#[async_trait]
pub trait Repository<T: Record>: Send + Sync {
    async fn get(&self, id: Uuid) -> AppResult<Option<T>>;
    async fn list(&self, filter: &T::Filter) -> AppResult<Vec<T>>;
    /// Inserts, or replaces the record with the same id.
    async fn put(&self, record: &T) -> AppResult<()>;
    /// `false` when nothing had that id.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

pub trait Db: Send + Sync {
    fn profiles(&self) -> &dyn Repository<Profile>;
    fn posts(&self) -> &dyn Repository<Post>;
    fn comments(&self) -> &dyn Repository<Comment>;
    fn connections(&self) -> &dyn Repository<Connection>;
    fn votes(&self) -> &dyn Repository<Vote>;
}

#[derive(Clone)]
pub struct Store(Arc<dyn Db>);

impl Store {
    pub fn new(db: impl Db + 'static) -> Store {
        Store(Arc::new(db))
    }

    pub fn memory() -> Store {
        Store::new(MemoryStore::default())
    }
}

impl Deref for Store {
    type Target = dyn Db;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfileOrder {
    /// Highest aura first.
    #[default]
    Aura,
    Newest,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileFilter {
    pub email: Option<String>,
    /// Case-insensitive substring of the full name.
    pub name_like: Option<String>,
    pub role: Option<RoleKind>,
    pub branch: Option<String>,
    pub exclude: Option<Uuid>,
    pub order: ProfileOrder,
    pub limit: Option<usize>,
}

impl ProfileFilter {
    pub fn by_email(email: &str) -> ProfileFilter {
        ProfileFilter {
            email: Some(email.to_owned()),
            limit: Some(1),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostOrder {
    #[default]
    Recent,
    /// Highest net score first.
    Top,
}

#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub kind: Option<PostKind>,
    pub branch: Option<String>,
    pub order: PostOrder,
    pub limit: Option<usize>,
}

/// Comments come back oldest first.
#[derive(Debug, Clone, Default)]
pub struct CommentFilter {
    pub post_id: Option<Uuid>,
}

impl CommentFilter {
    pub fn for_post(post_id: Uuid) -> CommentFilter {
        CommentFilter { post_id: Some(post_id) }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionFilter {
    /// Either direction.
    pub between: Option<(Uuid, Uuid)>,
    /// Requester or recipient.
    pub member: Option<Uuid>,
    pub recipient_id: Option<Uuid>,
    pub status: Option<ConnectionStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct VoteFilter {
    pub post_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

macro_rules! record_impl {
    ($T:ty, $F:ty) => {
        impl Record for $T {
            type Filter = $F;

            fn id(&self) -> Uuid {
                self.id
            }
        }
    };
}

record_impl!(Profile, ProfileFilter);
record_impl!(Post, PostFilter);
record_impl!(Comment, CommentFilter);
record_impl!(Connection, ConnectionFilter);
record_impl!(Vote, VoteFilter);
