use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActivityStats {
    pub posts: u32,
    pub votes: u32,
    pub comments: u32,
    pub messages: u32,
}

pub fn aura_score(stats: &ActivityStats) -> u64 {
    10 * u64::from(stats.posts)
        + 2 * u64::from(stats.votes)
        + 5 * u64::from(stats.comments)
        + 3 * u64::from(stats.messages)
}

/// Membership tiers, ordered by tenure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum TenureBadge {
    NewMember,
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl TenureBadge {
    pub fn for_days(days: i64) -> TenureBadge {
        match days {
            365.. => TenureBadge::Platinum,
            180.. => TenureBadge::Gold,
            30.. => TenureBadge::Silver,
            7.. => TenureBadge::Bronze,
            _ => TenureBadge::NewMember,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TenureBadge::NewMember => "New Member",
            TenureBadge::Bronze => "Bronze",
            TenureBadge::Silver => "Silver",
            TenureBadge::Gold => "Gold",
            TenureBadge::Platinum => "Platinum",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            TenureBadge::NewMember => "⭐",
            TenureBadge::Bronze => "🥉",
            TenureBadge::Silver => "🥈",
            TenureBadge::Gold => "🥇",
            TenureBadge::Platinum => "🏆",
        }
    }
}

impl fmt::Display for TenureBadge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Elapsed whole days clamp at zero so skewed clocks read as brand new.
pub fn tenure_badge(created_at: OffsetDateTime, now: OffsetDateTime) -> TenureBadge {
    TenureBadge::for_days((now - created_at).whole_days().max(0))
}

#[cfg(test)]
mod tests {
    use time::{macros::datetime, Duration};

    use super::*;

    #[test]
    fn aura_weights() {
        let stats = ActivityStats { posts: 2, votes: 3, comments: 1, messages: 0 };
        assert_eq!(aura_score(&stats), 31);
        assert_eq!(aura_score(&ActivityStats::default()), 0);
        assert_eq!(
            aura_score(&ActivityStats { posts: 0, votes: 0, comments: 0, messages: 4 }),
            12
        );
    }

    #[test]
    fn badge_boundaries() {
        let now = datetime!(2025-06-01 09:30 UTC);

        assert_eq!(tenure_badge(now - Duration::days(7), now), TenureBadge::Bronze);
        assert_eq!(
            tenure_badge(now - (Duration::days(7) - Duration::minutes(1)), now),
            TenureBadge::NewMember
        );
        assert_eq!(tenure_badge(now - Duration::days(29), now), TenureBadge::Bronze);
        assert_eq!(tenure_badge(now - Duration::days(30), now), TenureBadge::Silver);
        assert_eq!(tenure_badge(now - Duration::days(180), now), TenureBadge::Gold);
        assert_eq!(tenure_badge(now - Duration::days(364), now), TenureBadge::Gold);
        assert_eq!(tenure_badge(now - Duration::days(365), now), TenureBadge::Platinum);
    }

    #[test]
    fn future_creation_reads_as_new() {
        let now = datetime!(2025-06-01 09:30 UTC);
        assert_eq!(tenure_badge(now + Duration::days(400), now), TenureBadge::NewMember);
    }

    #[test]
    fn badges_are_ordered() {
        assert!(TenureBadge::NewMember < TenureBadge::Bronze);
        assert!(TenureBadge::Gold < TenureBadge::Platinum);
        assert_eq!(TenureBadge::Silver.to_string(), "Silver");
    }
}
