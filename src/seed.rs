use time::{Duration, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use crate::{aura::ActivityStats, model::{AlumniDetails, Placement, Post, PostKind, Profile, Role}, store::{ProfileFilter, Store}, AppResult};

fn sample(
    full_name: &str,
    email: &str,
    role: Role,
    branch: &str,
    avatar: &str,
    stats: ActivityStats,
    created_at: OffsetDateTime,
) -> Profile {
    Profile {
        id: Uuid::now_v7(),
        full_name: full_name.to_owned(),
        email: email.to_owned(),
        password_hash: None,
        role,
        college: "IIT Delhi".to_owned(),
        branch: branch.to_owned(),
        avatar: Some(avatar.to_owned()),
        stats,
        created_at,
    }
}

fn alumni(year_of_passing: u16, company: &str, role_description: &str) -> Role {
    Role::Alumni(AlumniDetails {
        year_of_passing,
        placement: Some(Placement {
            company: company.to_owned(),
            role_description: Some(role_description.to_owned()),
        }),
    })
}

/// Fills an empty store with a few members and posts. Returns whether anything was added.
///
/// Sample accounts have no password, so nobody can sign in as them.
pub async fn seed_if_empty(store: &Store, now: OffsetDateTime) -> AppResult<bool> {
    let anyone = ProfileFilter { limit: Some(1), ..Default::default() };
    if !store.profiles().list(&anyone).await?.is_empty() {
        return Ok(false);
    }

    let sarah = sample(
        "Sarah Johnson",
        "sarah.johnson@example.com",
        alumni(2019, "Google", "Senior Software Engineer"),
        "Computer Science Engineering",
        "👩‍💼",
        ActivityStats { posts: 2, votes: 14, comments: 6, messages: 3 },
        now - Duration::days(400),
    );
    let raj = sample(
        "Raj Patel",
        "raj.patel@example.com",
        alumni(2020, "Microsoft", "Product Manager"),
        "Computer Science Engineering",
        "👨‍💻",
        ActivityStats { posts: 1, votes: 8, comments: 4, messages: 1 },
        now - Duration::days(200),
    );
    let priya = sample(
        "Priya Singh",
        "priya.singh@example.com",
        Role::Student,
        "Electronics & Communication",
        "🧑‍🎓",
        ActivityStats { posts: 1, votes: 3, comments: 2, messages: 0 },
        now - Duration::days(12),
    );

    let posts = [
        (
            &sarah,
            PostKind::Global,
            Some("How to Ace Technical Interviews at Top Tech Companies"),
            "Practice problems every day, explain your thinking out loud, and always ask clarifying questions before you start coding.",
            Duration::hours(2),
        ),
        (
            &raj,
            PostKind::Global,
            Some("Remote Work Tips for New Graduates"),
            "Keep a fixed schedule, overcommunicate with your team, and set up a workspace that is only for work.",
            Duration::hours(5),
        ),
        (
            &priya,
            PostKind::Doubt,
            None,
            "Which electives helped you most in placements? Trying to plan my next semester.",
            Duration::minutes(40),
        ),
    ];

    for profile in [&sarah, &raj, &priya] {
        store.profiles().put(profile).await?;
    }
    for (author, kind, title, body, age) in posts {
        let post = Post::new(author, kind, title.map(str::to_owned), body.to_owned(), None, now - age);
        store.posts().put(&post).await?;
    }

    info!("seeded sample members and posts");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use crate::store::PostFilter;

    use super::*;

    #[tokio::test]
    async fn seeds_only_once() {
        let store = Store::memory();
        let now = OffsetDateTime::now_utc();

        assert!(seed_if_empty(&store, now).await.unwrap());
        assert!(!seed_if_empty(&store, now).await.unwrap());

        let profiles = store.profiles().list(&ProfileFilter::default()).await.unwrap();
        assert_eq!(profiles.len(), 3);
        assert!(profiles.iter().all(|p| p.password_hash.is_none()));
        assert_eq!(store.posts().list(&PostFilter::default()).await.unwrap().len(), 3);
    }
}
