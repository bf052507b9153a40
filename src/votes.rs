use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteKind {
    Up,
    Down,
}

impl VoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteKind::Up => "up",
            VoteKind::Down => "down",
        }
    }

    pub fn parse(s: &str) -> Option<VoteKind> {
        match s {
            "up" => Some(VoteKind::Up),
            "down" => Some(VoteKind::Down),
            _ => None,
        }
    }
}

/// A post's counters as seen by one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct VoteTally {
    pub upvotes: u32,
    pub downvotes: u32,
    pub user_vote: Option<VoteKind>,
}

impl VoteTally {
    pub fn new(upvotes: u32, downvotes: u32, user_vote: Option<VoteKind>) -> VoteTally {
        VoteTally { upvotes, downvotes, user_vote }
    }

    pub fn net(&self) -> i64 {
        i64::from(self.upvotes) - i64::from(self.downvotes)
    }

    /// Requesting the vote the user already holds clears it; anything else replaces it.
    pub fn apply_vote(self, requested: VoteKind) -> VoteTally {
        let mut next = self.retract();
        if self.user_vote != Some(requested) {
            match requested {
                VoteKind::Up => next.upvotes = next.upvotes.saturating_add(1),
                VoteKind::Down => next.downvotes = next.downvotes.saturating_add(1),
            }
            next.user_vote = Some(requested);
        }
        next
    }

    fn retract(self) -> VoteTally {
        let mut next = self;
        match self.user_vote {
            Some(VoteKind::Up) => next.upvotes = next.upvotes.saturating_sub(1),
            Some(VoteKind::Down) => next.downvotes = next.downvotes.saturating_sub(1),
            None => {}
        }
        next.user_vote = None;
        next
    }

    /// Net score change going from `self` to `after`, always within -2..=2 for one vote.
    pub fn net_change(&self, after: &VoteTally) -> i64 {
        after.net() - self.net()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use VoteKind::*;

    #[test]
    fn first_vote_counts_once() {
        let tally = VoteTally::new(3, 1, None).apply_vote(Up);
        assert_eq!(tally, VoteTally::new(4, 1, Some(Up)));
        assert_eq!(tally.net(), 3);
    }

    #[test]
    fn same_vote_twice_clears_it() {
        let start = VoteTally::new(3, 1, None);
        let up = start.apply_vote(Up);
        let cleared = up.apply_vote(Up);
        assert_eq!(cleared, start);
        assert_eq!(up.net_change(&cleared), -1);

        let down = start.apply_vote(Down);
        assert_eq!(down.net_change(&down.apply_vote(Down)), 1);
    }

    #[test]
    fn switching_moves_net_by_two() {
        let up = VoteTally::new(0, 0, None).apply_vote(Up);
        let down = up.apply_vote(Down);
        assert_eq!(down, VoteTally::new(0, 1, Some(Down)));
        assert_eq!(up.net_change(&down), -2);
        assert_eq!(down.net_change(&down.apply_vote(Up)), 2);
    }

    #[test]
    fn counters_never_go_negative() {
        // a user vote the counters never recorded, e.g. from drifted data
        let tally = VoteTally::new(0, 0, Some(Up)).apply_vote(Down);
        assert_eq!(tally, VoteTally::new(0, 1, Some(Down)));

        let cleared = VoteTally::new(0, 0, Some(Down)).apply_vote(Down);
        assert_eq!(cleared, VoteTally::new(0, 0, None));
    }

    #[test]
    fn net_follows_effective_vote_over_any_sequence() {
        let sequences: [&[VoteKind]; 5] = [
            &[Up, Up, Up],
            &[Down, Up, Down, Down],
            &[Up, Down, Up, Down, Down, Up],
            &[Down],
            &[],
        ];

        for sequence in sequences {
            let start = VoteTally::new(10, 4, None);
            let mut tally = start;
            for requested in sequence {
                let before = tally;
                tally = tally.apply_vote(*requested);
                assert!((-2..=2).contains(&before.net_change(&tally)));
            }
            assert_eq!(tally.net(), start.net() + match tally.user_vote {
                Some(Up) => 1,
                Some(Down) => -1,
                None => 0,
            });
        }
    }
}
