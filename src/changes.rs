use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;
use uuid::Uuid;

/// Tells listeners that a post's comments changed. Carries no payload; listeners refetch.
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<Uuid>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> ChangeFeed {
        ChangeFeed { tx: broadcast::channel(capacity).0 }
    }

    pub fn notify(&self, post_id: Uuid) {
        // nobody listening is fine
        let receivers = self.tx.send(post_id).unwrap_or(0);
        debug!("comments of {post_id} changed, {receivers} listening");
    }

    pub fn subscribe(&self, post_id: Uuid) -> Subscription {
        Subscription { post_id, rx: self.tx.subscribe() }
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        ChangeFeed::new(64)
    }
}

pub struct Subscription {
    post_id: Uuid,
    rx: broadcast::Receiver<Uuid>,
}

impl Subscription {
    /// Resolves on the next change to this post, or `false` once the feed is gone.
    /// Falling behind counts as a change since the listener refetches everything anyway.
    pub async fn changed(&mut self) -> bool {
        loop {
            match self.rx.recv().await {
                Ok(post_id) if post_id == self.post_id => return true,
                Ok(_) => continue,
                Err(RecvError::Lagged(_)) => return true,
                Err(RecvError::Closed) => return false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn only_the_subscribed_post_wakes() {
        let feed = ChangeFeed::default();
        let (mine, other) = (Uuid::now_v7(), Uuid::now_v7());
        let mut subscription = feed.subscribe(mine);

        feed.notify(other);
        feed.notify(mine);
        assert!(subscription.changed().await);

        feed.notify(other);
        let quiet = timeout(Duration::from_millis(20), subscription.changed()).await;
        assert!(quiet.is_err());
    }

    #[tokio::test]
    async fn closed_feed_ends_subscription() {
        let feed = ChangeFeed::default();
        let mut subscription = feed.subscribe(Uuid::now_v7());
        drop(feed);
        assert!(!subscription.changed().await);
    }
}
