use alumnet::{
    aura::ActivityStats,
    auth::{sign_in_with_password, sign_up, SignupForm},
    changes::ChangeFeed,
    comments::{add_comment, comment_tree, delete_comment},
    connections::{self, between, respond, send_request},
    model::{AlumniDetails, Comment, ConnectionStatus, Placement, Post, PostKind, Profile, Role},
    posts::{cast_vote, create_post, delete_post, list_feed, suggested_alumni, CounterLock, PostForm, Tab},
    search::search_profiles,
    store::{PostOrder, SqliteStore, Store},
    threads,
    votes::VoteKind,
    AppError,
};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

const CSE: &str = "Computer Science Engineering";

fn profile(full_name: &str, role: Role, branch: &str, stats: ActivityStats) -> Profile {
    Profile {
        id: Uuid::now_v7(),
        full_name: full_name.to_owned(),
        email: format!("{}@example.com", full_name.to_lowercase().replace(' ', ".")),
        password_hash: None,
        role,
        college: "IIT Delhi".to_owned(),
        branch: branch.to_owned(),
        avatar: None,
        stats,
        created_at: OffsetDateTime::now_utc() - Duration::days(10),
    }
}

fn alumni(company: &str) -> Role {
    Role::Alumni(AlumniDetails {
        year_of_passing: 2019,
        placement: Some(Placement { company: company.to_owned(), role_description: None }),
    })
}

async fn stored(store: &Store, profile: Profile) -> Profile {
    store.profiles().put(&profile).await.unwrap();
    profile
}

async fn stores() -> Vec<Store> {
    vec![Store::memory(), Store::new(SqliteStore::in_memory().await.unwrap())]
}

fn signup_form(email: &str) -> SignupForm {
    SignupForm {
        role: "alumni".to_owned(),
        full_name: "Asha Rao".to_owned(),
        email: email.to_owned(),
        password: "correct horse".to_owned(),
        college: "IIT Delhi".to_owned(),
        branch: CSE.to_owned(),
        year_of_passing: "2018".to_owned(),
        placement_done: "yes".to_owned(),
        company_name: "Google".to_owned(),
        ..Default::default()
    }
}

#[tokio::test]
async fn duplicate_signup_is_rejected() {
    for store in stores().await {
        let now = OffsetDateTime::now_utc();
        let profile = sign_up(&store, signup_form("asha@example.com"), now).await.unwrap();
        assert_eq!(profile.company(), Some("Google"));

        let again = sign_up(&store, signup_form("  ASHA@example.com "), now).await;
        assert!(matches!(again, Err(AppError::DuplicateAccount)));

        // the store itself refuses a second account with the email
        let mut clone = profile.clone();
        clone.id = Uuid::now_v7();
        assert!(matches!(store.profiles().put(&clone).await, Err(AppError::DuplicateAccount)));

        let signed_in = sign_in_with_password(&store, "Asha@Example.com", "correct horse").await.unwrap();
        assert_eq!(signed_in.id, profile.id);
        assert!(matches!(
            sign_in_with_password(&store, "asha@example.com", "wrong horse").await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            sign_in_with_password(&store, "nobody@example.com", "correct horse").await,
            Err(AppError::NotFound(_))
        ));
    }
}

#[tokio::test]
async fn invalid_signups_store_nothing() {
    let store = Store::memory();
    let now = OffsetDateTime::now_utc();

    let mut no_year = signup_form("a@example.com");
    no_year.year_of_passing.clear();
    let mut no_company = signup_form("b@example.com");
    no_company.company_name.clear();
    let mut bad_branch = signup_form("c@example.com");
    bad_branch.branch = "Astrology".to_owned();

    for form in [no_year, no_company, bad_branch] {
        assert!(matches!(sign_up(&store, form, now).await, Err(AppError::Validation(_))));
    }
    assert!(search_profiles(&store, "Asha").await.unwrap().is_empty());
}

#[tokio::test]
async fn votes_through_the_store_stay_consistent() {
    for store in stores().await {
        let lock = CounterLock::default();
        let author = stored(&store, profile("Sarah Johnson", alumni("Google"), CSE, ActivityStats::default())).await;
        let voters = [
            stored(&store, profile("Raj Patel", alumni("Microsoft"), CSE, ActivityStats::default())).await,
            stored(&store, profile("Priya Singh", Role::Student, CSE, ActivityStats::default())).await,
        ];

        let form = PostForm { body: "Interview tips".to_owned(), ..Default::default() };
        let post = create_post(&store, &author, &form, OffsetDateTime::now_utc()).await.unwrap();

        let sequence = [
            (0, VoteKind::Up),
            (1, VoteKind::Up),
            (0, VoteKind::Down),
            (1, VoteKind::Up),
            (0, VoteKind::Down),
            (1, VoteKind::Down),
        ];
        for (voter, kind) in sequence {
            cast_vote(&store, &lock, &voters[voter], post.id, kind).await.unwrap();
        }

        // voter 0 retracted, voter 1 ends down
        let post = store.posts().get(post.id).await.unwrap().unwrap();
        assert_eq!((post.upvotes, post.downvotes, post.net()), (0, 1, -1));

        let raj = store.profiles().get(voters[0].id).await.unwrap().unwrap();
        let priya = store.profiles().get(voters[1].id).await.unwrap().unwrap();
        assert_eq!((raj.stats.votes, priya.stats.votes), (0, 1));

        let author = store.profiles().get(author.id).await.unwrap().unwrap();
        assert_eq!(author.stats.posts, 1);
    }
}

#[tokio::test]
async fn duplicate_notifications_rebuild_the_same_tree() {
    for store in stores().await {
        let lock = CounterLock::default();
        let changes = ChangeFeed::default();
        let author = stored(&store, profile("Sarah Johnson", alumni("Google"), CSE, ActivityStats::default())).await;
        let post = Post::new(&author, PostKind::Global, None, "hello".to_owned(), None, OffsetDateTime::now_utc());
        store.posts().put(&post).await.unwrap();

        let mut subscription = changes.subscribe(post.id);
        let now = OffsetDateTime::now_utc();
        let root = add_comment(&store, &lock, &changes, &author, post.id, "first", None, now).await.unwrap();
        let reply = add_comment(&store, &lock, &changes, &author, post.id, "reply", Some(root.id), now + Duration::seconds(1))
            .await
            .unwrap();

        let mut seen = Vec::new();
        for _ in 0..2 {
            assert!(subscription.changed().await);
            seen.push(comment_tree(&store, post.id).await.unwrap());
        }
        assert_eq!(seen[0], seen[1]);
        assert_eq!(seen[0].len(), 1);
        assert_eq!(seen[0][0].comment.id, root.id);
        assert_eq!(seen[0][0].replies, vec![reply.clone()]);

        // replies to replies are refused
        let nested = add_comment(&store, &lock, &changes, &author, post.id, "deeper", Some(reply.id), now).await;
        assert!(matches!(nested, Err(AppError::Validation(_))));

        let post = store.posts().get(post.id).await.unwrap().unwrap();
        assert_eq!(post.comment_count, 2);
    }
}

#[tokio::test]
async fn deleting_a_root_leaves_its_replies_out_of_the_tree() {
    for store in stores().await {
        let lock = CounterLock::default();
        let changes = ChangeFeed::default();
        let author = stored(&store, profile("Sarah Johnson", alumni("Google"), CSE, ActivityStats::default())).await;
        let other = stored(&store, profile("Raj Patel", alumni("Microsoft"), CSE, ActivityStats::default())).await;
        let post = Post::new(&author, PostKind::Global, None, "hello".to_owned(), None, OffsetDateTime::now_utc());
        store.posts().put(&post).await.unwrap();

        let now = OffsetDateTime::now_utc();
        let root = add_comment(&store, &lock, &changes, &author, post.id, "root", None, now).await.unwrap();
        let reply = add_comment(&store, &lock, &changes, &other, post.id, "reply", Some(root.id), now).await.unwrap();

        assert!(matches!(
            delete_comment(&store, &lock, &changes, &other, root.id).await,
            Err(AppError::Forbidden(_))
        ));
        delete_comment(&store, &lock, &changes, &author, root.id).await.unwrap();

        assert!(comment_tree(&store, post.id).await.unwrap().is_empty());
        assert!(store.comments().get(reply.id).await.unwrap().is_some());

        let post = store.posts().get(post.id).await.unwrap().unwrap();
        assert_eq!(post.comment_count, 1);
        let author = store.profiles().get(author.id).await.unwrap().unwrap();
        assert_eq!(author.stats.comments, 0);
    }
}

#[tokio::test]
async fn stored_grandchildren_and_orphans_are_not_rendered() {
    let store = Store::memory();
    let author = stored(&store, profile("Sarah Johnson", alumni("Google"), CSE, ActivityStats::default())).await;
    let post_id = Uuid::now_v7();
    let now = OffsetDateTime::now_utc();

    let root = Comment::new(post_id, author.id, "root".to_owned(), None, now);
    let child = Comment::new(post_id, author.id, "child".to_owned(), Some(root.id), now + Duration::seconds(1));
    let grandchild = Comment::new(post_id, author.id, "grandchild".to_owned(), Some(child.id), now + Duration::seconds(2));
    let orphan = Comment::new(post_id, author.id, "orphan".to_owned(), Some(Uuid::now_v7()), now);
    for comment in [&grandchild, &orphan, &child, &root] {
        store.comments().put(comment).await.unwrap();
    }

    let tree = comment_tree(&store, post_id).await.unwrap();
    let shown: Vec<Uuid> = threads::flatten(&tree).into_iter().map(|c| c.id).collect();
    assert_eq!(shown, vec![root.id, child.id]);
}

#[tokio::test]
async fn connections_are_unique_per_pair_and_answered_once() {
    for store in stores().await {
        let now = OffsetDateTime::now_utc();
        let asha = stored(&store, profile("Asha Rao", Role::Student, CSE, ActivityStats::default())).await;
        let raj = stored(&store, profile("Raj Patel", alumni("Microsoft"), CSE, ActivityStats::default())).await;

        assert!(matches!(send_request(&store, &asha, asha.id, now).await, Err(AppError::Validation(_))));
        assert!(matches!(send_request(&store, &asha, Uuid::now_v7(), now).await, Err(AppError::NotFound(_))));

        let request = send_request(&store, &asha, raj.id, now).await.unwrap();
        assert!(matches!(send_request(&store, &raj, asha.id, now).await, Err(AppError::Validation(_))));

        let pending = connections::pending_for(&store, raj.id).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].1.id, asha.id);

        assert!(matches!(respond(&store, &asha, request.id, true).await, Err(AppError::Forbidden(_))));
        let accepted = respond(&store, &raj, request.id, true).await.unwrap();
        assert_eq!(accepted.status, ConnectionStatus::Accepted);
        assert!(matches!(respond(&store, &raj, request.id, false).await, Err(AppError::Validation(_))));

        let found = between(&store, raj.id, asha.id).await.unwrap().unwrap();
        assert_eq!(found.status, ConnectionStatus::Accepted);
        assert!(connections::pending_for(&store, raj.id).await.unwrap().is_empty());
        assert_eq!(connections::count_accepted(&store, asha.id).await.unwrap(), 1);
    }
}

#[tokio::test]
async fn search_finds_names_by_aura() {
    for store in stores().await {
        let stats = |posts| ActivityStats { posts, ..Default::default() };
        for (name, posts) in [
            ("Anita Sharma", 1),
            ("Sharmila Das", 5),
            ("Rohan Sharma", 3),
            ("Priya Singh", 9),
            ("Kiran Sharma", 0),
            ("Vikram Sharma", 2),
            ("Meera Sharma", 4),
        ] {
            stored(&store, profile(name, Role::Student, CSE, stats(posts))).await;
        }

        assert!(search_profiles(&store, "s").await.unwrap().is_empty());
        assert!(search_profiles(&store, " ").await.unwrap().is_empty());

        let hits: Vec<String> = search_profiles(&store, "SHARM")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.full_name)
            .collect();
        assert_eq!(hits, ["Sharmila Das", "Meera Sharma", "Rohan Sharma", "Vikram Sharma", "Anita Sharma"]);
    }
}

#[tokio::test]
async fn feed_tabs_and_suggestions_follow_the_branch() {
    for store in stores().await {
        let now = OffsetDateTime::now_utc();
        let me = stored(&store, profile("Asha Rao", Role::Student, CSE, ActivityStats::default())).await;
        let sarah = stored(&store, profile("Sarah Johnson", alumni("Google"), CSE, ActivityStats { posts: 3, ..Default::default() })).await;
        let raj = stored(&store, profile("Raj Patel", alumni("Microsoft"), CSE, ActivityStats { posts: 1, ..Default::default() })).await;
        let civil = stored(&store, profile("Dev Mehta", alumni("L&T"), "Civil Engineering", ActivityStats::default())).await;

        let suggested: Vec<Uuid> = suggested_alumni(&store, &me).await.unwrap().iter().map(|p| p.id).collect();
        assert_eq!(suggested, vec![sarah.id, raj.id]);

        let post = |kind: &str, body: &str| PostForm {
            kind: kind.to_owned(),
            body: body.to_owned(),
            ..Default::default()
        };
        create_post(&store, &sarah, &post("branch", "cse only"), now).await.unwrap();
        create_post(&store, &civil, &post("branch", "civil only"), now).await.unwrap();
        create_post(&store, &raj, &post("global", "everyone"), now).await.unwrap();
        let doubt = create_post(&store, &me, &post("doubt", "help?"), now).await.unwrap();
        assert_eq!(doubt.branch.as_deref(), Some(CSE));

        let bodies = |posts: Vec<Post>| posts.into_iter().map(|p| p.body).collect::<Vec<_>>();
        assert_eq!(bodies(list_feed(&store, &me, Tab::Branch, PostOrder::Recent).await.unwrap()), ["cse only"]);
        assert_eq!(bodies(list_feed(&store, &me, Tab::Global, PostOrder::Top).await.unwrap()), ["everyone"]);
        assert_eq!(bodies(list_feed(&store, &me, Tab::Doubts, PostOrder::Recent).await.unwrap()), ["help?"]);

        let (lock, changes) = (CounterLock::default(), ChangeFeed::default());
        assert!(matches!(delete_post(&store, &lock, &changes, &sarah, doubt.id).await, Err(AppError::Forbidden(_))));
        delete_post(&store, &lock, &changes, &me, doubt.id).await.unwrap();
        assert!(list_feed(&store, &me, Tab::Doubts, PostOrder::Recent).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn deleting_a_post_takes_back_its_activity() {
    for store in stores().await {
        let now = OffsetDateTime::now_utc();
        let (lock, changes) = (CounterLock::default(), ChangeFeed::default());
        let author = stored(&store, profile("Asha Rao", Role::Student, CSE, ActivityStats::default())).await;
        let reader = stored(&store, profile("Raj Patel", alumni("Microsoft"), CSE, ActivityStats::default())).await;

        let post = PostForm { body: "Internship leads?".to_owned(), ..Default::default() };
        let post = create_post(&store, &author, &post, now).await.unwrap();
        cast_vote(&store, &lock, &reader, post.id, VoteKind::Up).await.unwrap();
        add_comment(&store, &lock, &changes, &reader, post.id, "Ask the placement cell", None, now).await.unwrap();
        add_comment(&store, &lock, &changes, &author, post.id, "Thanks!", None, now).await.unwrap();

        let mut listener = changes.subscribe(post.id);
        delete_post(&store, &lock, &changes, &author, post.id).await.unwrap();
        assert!(listener.changed().await);

        let reader = store.profiles().get(reader.id).await.unwrap().unwrap();
        assert_eq!(reader.stats, ActivityStats::default());
        let author = store.profiles().get(author.id).await.unwrap().unwrap();
        assert_eq!(author.stats, ActivityStats::default());
        assert!(comment_tree(&store, post.id).await.unwrap().is_empty());
    }
}
