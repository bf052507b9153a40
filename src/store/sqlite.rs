use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, FromRow, QueryBuilder, Sqlite, SqlitePool};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{aura::ActivityStats, model::{AlumniDetails, Comment, Connection, ConnectionStatus, Placement, Post, PostKind, Profile, Role, Vote}, votes::VoteKind, AppError, AppResult};

use super::{CommentFilter, ConnectionFilter, Db, PostFilter, PostOrder, ProfileFilter, ProfileOrder, Repository, VoteFilter};

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str) -> AppResult<SqliteStore> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(16)
            .connect_with(options)
            .await?;

        SqliteStore::migrated(pool).await
    }

    /// A private database that lives as long as the store; a single connection keeps it alive.
    pub async fn in_memory() -> AppResult<SqliteStore> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        SqliteStore::migrated(pool).await
    }

    async fn migrated(pool: SqlitePool) -> AppResult<SqliteStore> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("database schema up to date");
        Ok(SqliteStore { pool })
    }
}

impl Db for SqliteStore {
    fn profiles(&self) -> &dyn Repository<Profile> { self }
    fn posts(&self) -> &dyn Repository<Post> { self }
    fn comments(&self) -> &dyn Repository<Comment> { self }
    fn connections(&self) -> &dyn Repository<Connection> { self }
    fn votes(&self) -> &dyn Repository<Vote> { self }
}

fn nanos(at: OffsetDateTime) -> AppResult<i64> {
    Ok(i64::try_from(at.unix_timestamp_nanos())?)
}

fn timestamp(nanos: i64) -> AppResult<OffsetDateTime> {
    Ok(OffsetDateTime::from_unix_timestamp_nanos(i128::from(nanos))?)
}

fn uuid(s: &str) -> AppResult<Uuid> {
    Ok(Uuid::parse_str(s)?)
}

fn count(n: i64) -> AppResult<u32> {
    Ok(u32::try_from(n)?)
}

fn limit(query: &mut QueryBuilder<'_, Sqlite>, limit: Option<usize>) -> AppResult<()> {
    if let Some(limit) = limit {
        query.push(" LIMIT ").push_bind(i64::try_from(limit)?);
    }
    Ok(())
}

/// `LIKE` pattern matching `text` anywhere, with wildcards in `text` taken literally.
fn contains_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[derive(FromRow)]
struct ProfileRow {
    id: String,
    full_name: String,
    email: String,
    password_hash: Option<String>,
    role: String,
    college: String,
    branch: String,
    year_of_passing: Option<i64>,
    placement_done: bool,
    company_name: Option<String>,
    role_description: Option<String>,
    avatar: Option<String>,
    post_count: i64,
    vote_count: i64,
    comment_count: i64,
    message_count: i64,
    created_at: i64,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = AppError;

    fn try_from(row: ProfileRow) -> AppResult<Profile> {
        let role = match row.role.as_str() {
            "student" => Role::Student,
            "alumni" => {
                let year = row.year_of_passing.ok_or("alumni profile without year_of_passing")?;
                let placement = match (row.placement_done, row.company_name) {
                    (true, Some(company)) => Some(Placement {
                        company,
                        role_description: row.role_description,
                    }),
                    _ => None,
                };
                Role::Alumni(AlumniDetails {
                    year_of_passing: u16::try_from(year)?,
                    placement,
                })
            }
            other => return Err(format!("unknown role {other}").into()),
        };

        Ok(Profile {
            id: uuid(&row.id)?,
            full_name: row.full_name,
            email: row.email,
            password_hash: row.password_hash,
            role,
            college: row.college,
            branch: row.branch,
            avatar: row.avatar,
            stats: ActivityStats {
                posts: count(row.post_count)?,
                votes: count(row.vote_count)?,
                comments: count(row.comment_count)?,
                messages: count(row.message_count)?,
            },
            created_at: timestamp(row.created_at)?,
        })
    }
}

#[async_trait]
impl Repository<Profile> for SqliteStore {
    async fn get(&self, id: Uuid) -> AppResult<Option<Profile>> {
        sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE id=?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(Profile::try_from)
            .transpose()
    }

    async fn list(&self, filter: &ProfileFilter) -> AppResult<Vec<Profile>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM profiles WHERE 1=1");
        if let Some(email) = &filter.email {
            query.push(" AND email = ").push_bind(email.clone());
        }
        if let Some(pattern) = &filter.name_like {
            query
                .push(" AND full_name LIKE ")
                .push_bind(contains_pattern(pattern))
                .push(" ESCAPE '\\'");
        }
        if let Some(role) = &filter.role {
            query.push(" AND role = ").push_bind(role.as_str());
        }
        if let Some(branch) = &filter.branch {
            query.push(" AND branch = ").push_bind(branch.clone());
        }
        if let Some(exclude) = &filter.exclude {
            query.push(" AND id <> ").push_bind(exclude.to_string());
        }
        query.push(match filter.order {
            ProfileOrder::Aura => {
                " ORDER BY (10*post_count + 2*vote_count + 5*comment_count + 3*message_count) DESC, created_at DESC, id"
            }
            ProfileOrder::Newest => " ORDER BY created_at DESC, id",
        });
        limit(&mut query, filter.limit)?;

        query
            .build_query_as::<ProfileRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Profile::try_from)
            .collect()
    }

    async fn put(&self, profile: &Profile) -> AppResult<()> {
        let (year, placement) = match &profile.role {
            Role::Student => (None, None),
            Role::Alumni(details) => (Some(i64::from(details.year_of_passing)), details.placement.as_ref()),
        };

        sqlx::query(
            "INSERT INTO profiles (id,full_name,email,password_hash,role,college,branch,year_of_passing,placement_done,company_name,role_description,avatar,post_count,vote_count,comment_count,message_count,created_at)
             VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)
             ON CONFLICT(id) DO UPDATE SET
                full_name=excluded.full_name, email=excluded.email, password_hash=excluded.password_hash,
                college=excluded.college, branch=excluded.branch, year_of_passing=excluded.year_of_passing,
                placement_done=excluded.placement_done, company_name=excluded.company_name,
                role_description=excluded.role_description, avatar=excluded.avatar,
                post_count=excluded.post_count, vote_count=excluded.vote_count,
                comment_count=excluded.comment_count, message_count=excluded.message_count",
        )
        .bind(profile.id.to_string())
        .bind(&profile.full_name)
        .bind(&profile.email)
        .bind(&profile.password_hash)
        .bind(profile.role.kind().as_str())
        .bind(&profile.college)
        .bind(&profile.branch)
        .bind(year)
        .bind(placement.is_some())
        .bind(placement.map(|p| p.company.clone()))
        .bind(placement.and_then(|p| p.role_description.clone()))
        .bind(&profile.avatar)
        .bind(i64::from(profile.stats.posts))
        .bind(i64::from(profile.stats.votes))
        .bind(i64::from(profile.stats.comments))
        .bind(i64::from(profile.stats.messages))
        .bind(nanos(profile.created_at)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM profiles WHERE id=?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(FromRow)]
struct PostRow {
    id: String,
    author_id: String,
    kind: String,
    title: Option<String>,
    body: String,
    image: Option<String>,
    upvotes: i64,
    downvotes: i64,
    comment_count: i64,
    branch: Option<String>,
    created_at: i64,
}

impl TryFrom<PostRow> for Post {
    type Error = AppError;

    fn try_from(row: PostRow) -> AppResult<Post> {
        Ok(Post {
            id: uuid(&row.id)?,
            author_id: uuid(&row.author_id)?,
            kind: PostKind::parse(&row.kind).ok_or(format!("unknown post kind {}", row.kind))?,
            title: row.title,
            body: row.body,
            image: row.image,
            upvotes: count(row.upvotes)?,
            downvotes: count(row.downvotes)?,
            comment_count: count(row.comment_count)?,
            branch: row.branch,
            created_at: timestamp(row.created_at)?,
        })
    }
}

#[async_trait]
impl Repository<Post> for SqliteStore {
    async fn get(&self, id: Uuid) -> AppResult<Option<Post>> {
        sqlx::query_as::<_, PostRow>("SELECT * FROM posts WHERE id=?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(Post::try_from)
            .transpose()
    }

    async fn list(&self, filter: &PostFilter) -> AppResult<Vec<Post>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM posts WHERE 1=1");
        if let Some(kind) = &filter.kind {
            query.push(" AND kind = ").push_bind(kind.as_str());
        }
        if let Some(branch) = &filter.branch {
            query.push(" AND branch = ").push_bind(branch.clone());
        }
        query.push(match filter.order {
            PostOrder::Recent => " ORDER BY created_at DESC, id",
            PostOrder::Top => " ORDER BY (upvotes - downvotes) DESC, created_at DESC, id",
        });
        limit(&mut query, filter.limit)?;

        query
            .build_query_as::<PostRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Post::try_from)
            .collect()
    }

    async fn put(&self, post: &Post) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO posts (id,author_id,kind,title,body,image,upvotes,downvotes,comment_count,branch,created_at)
             VALUES (?,?,?,?,?,?,?,?,?,?,?)
             ON CONFLICT(id) DO UPDATE SET
                title=excluded.title, body=excluded.body, image=excluded.image,
                upvotes=excluded.upvotes, downvotes=excluded.downvotes,
                comment_count=excluded.comment_count",
        )
        .bind(post.id.to_string())
        .bind(post.author_id.to_string())
        .bind(post.kind.as_str())
        .bind(&post.title)
        .bind(&post.body)
        .bind(&post.image)
        .bind(i64::from(post.upvotes))
        .bind(i64::from(post.downvotes))
        .bind(i64::from(post.comment_count))
        .bind(&post.branch)
        .bind(nanos(post.created_at)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id=?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(FromRow)]
struct CommentRow {
    id: String,
    post_id: String,
    author_id: String,
    body: String,
    parent_id: Option<String>,
    created_at: i64,
}

impl TryFrom<CommentRow> for Comment {
    type Error = AppError;

    fn try_from(row: CommentRow) -> AppResult<Comment> {
        Ok(Comment {
            id: uuid(&row.id)?,
            post_id: uuid(&row.post_id)?,
            author_id: uuid(&row.author_id)?,
            body: row.body,
            parent_id: row.parent_id.as_deref().map(uuid).transpose()?,
            created_at: timestamp(row.created_at)?,
        })
    }
}

#[async_trait]
impl Repository<Comment> for SqliteStore {
    async fn get(&self, id: Uuid) -> AppResult<Option<Comment>> {
        sqlx::query_as::<_, CommentRow>("SELECT * FROM comments WHERE id=?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(Comment::try_from)
            .transpose()
    }

    async fn list(&self, filter: &CommentFilter) -> AppResult<Vec<Comment>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM comments WHERE 1=1");
        if let Some(post_id) = &filter.post_id {
            query.push(" AND post_id = ").push_bind(post_id.to_string());
        }
        query.push(" ORDER BY created_at, id");

        query
            .build_query_as::<CommentRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Comment::try_from)
            .collect()
    }

    async fn put(&self, comment: &Comment) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO comments (id,post_id,author_id,body,parent_id,created_at) VALUES (?,?,?,?,?,?)
             ON CONFLICT(id) DO UPDATE SET body=excluded.body",
        )
        .bind(comment.id.to_string())
        .bind(comment.post_id.to_string())
        .bind(comment.author_id.to_string())
        .bind(&comment.body)
        .bind(comment.parent_id.as_ref().map(Uuid::to_string))
        .bind(nanos(comment.created_at)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id=?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(FromRow)]
struct ConnectionRow {
    id: String,
    requester_id: String,
    recipient_id: String,
    status: String,
    created_at: i64,
}

impl TryFrom<ConnectionRow> for Connection {
    type Error = AppError;

    fn try_from(row: ConnectionRow) -> AppResult<Connection> {
        Ok(Connection {
            id: uuid(&row.id)?,
            requester_id: uuid(&row.requester_id)?,
            recipient_id: uuid(&row.recipient_id)?,
            status: ConnectionStatus::parse(&row.status)
                .ok_or(format!("unknown connection status {}", row.status))?,
            created_at: timestamp(row.created_at)?,
        })
    }
}

#[async_trait]
impl Repository<Connection> for SqliteStore {
    async fn get(&self, id: Uuid) -> AppResult<Option<Connection>> {
        sqlx::query_as::<_, ConnectionRow>("SELECT * FROM connections WHERE id=?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(Connection::try_from)
            .transpose()
    }

    async fn list(&self, filter: &ConnectionFilter) -> AppResult<Vec<Connection>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM connections WHERE 1=1");
        if let Some((a, b)) = filter.between {
            let (low, high) = Connection::pair(a, b);
            query
                .push(" AND min(requester_id, recipient_id) = ")
                .push_bind(low.to_string())
                .push(" AND max(requester_id, recipient_id) = ")
                .push_bind(high.to_string());
        }
        if let Some(member) = &filter.member {
            query
                .push(" AND (requester_id = ")
                .push_bind(member.to_string())
                .push(" OR recipient_id = ")
                .push_bind(member.to_string())
                .push(")");
        }
        if let Some(recipient_id) = &filter.recipient_id {
            query.push(" AND recipient_id = ").push_bind(recipient_id.to_string());
        }
        if let Some(status) = &filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        query.push(" ORDER BY created_at DESC, id");

        query
            .build_query_as::<ConnectionRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Connection::try_from)
            .collect()
    }

    async fn put(&self, connection: &Connection) -> AppResult<()> {
        let result = sqlx::query(
            "INSERT INTO connections (id,requester_id,recipient_id,status,created_at) VALUES (?,?,?,?,?)
             ON CONFLICT(id) DO UPDATE SET status=excluded.status",
        )
        .bind(connection.id.to_string())
        .bind(connection.requester_id.to_string())
        .bind(connection.recipient_id.to_string())
        .bind(connection.status.as_str())
        .bind(nanos(connection.created_at)?)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if err.as_database_error().is_some_and(|db| db.is_unique_violation()) => {
                Err(AppError::invalid("A connection between you two already exists."))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM connections WHERE id=?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(FromRow)]
struct VoteRow {
    id: String,
    post_id: String,
    user_id: String,
    kind: String,
}

impl TryFrom<VoteRow> for Vote {
    type Error = AppError;

    fn try_from(row: VoteRow) -> AppResult<Vote> {
        Ok(Vote {
            id: uuid(&row.id)?,
            post_id: uuid(&row.post_id)?,
            user_id: uuid(&row.user_id)?,
            kind: VoteKind::parse(&row.kind).ok_or(format!("unknown vote kind {}", row.kind))?,
        })
    }
}

#[async_trait]
impl Repository<Vote> for SqliteStore {
    async fn get(&self, id: Uuid) -> AppResult<Option<Vote>> {
        sqlx::query_as::<_, VoteRow>("SELECT * FROM votes WHERE id=?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(Vote::try_from)
            .transpose()
    }

    async fn list(&self, filter: &VoteFilter) -> AppResult<Vec<Vote>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM votes WHERE 1=1");
        if let Some(post_id) = &filter.post_id {
            query.push(" AND post_id = ").push_bind(post_id.to_string());
        }
        if let Some(user_id) = &filter.user_id {
            query.push(" AND user_id = ").push_bind(user_id.to_string());
        }
        query.push(" ORDER BY id");

        query
            .build_query_as::<VoteRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Vote::try_from)
            .collect()
    }

    async fn put(&self, vote: &Vote) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO votes (id,post_id,user_id,kind) VALUES (?,?,?,?)
             ON CONFLICT(id) DO UPDATE SET kind=excluded.kind",
        )
        .bind(vote.id.to_string())
        .bind(vote.post_id.to_string())
        .bind(vote.user_id.to_string())
        .bind(vote.kind.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM votes WHERE id=?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
