use crate::models::{Vote, VoteValue};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Derived per-caption vote tally. Recomputed from the raw records on every
/// read; never persisted.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteCounts {
    pub upvotes: u32,
    pub downvotes: u32,
    pub neutrals: u32,
}

impl VoteCounts {
    pub fn total(&self) -> u32 {
        self.upvotes + self.downvotes + self.neutrals
    }

    /// Share of upvotes among signed votes. None when there are no up or
    /// down votes, so callers never divide by zero.
    pub fn approval_ratio(&self) -> Option<f64> {
        let signed = self.upvotes + self.downvotes;
        if signed == 0 {
            None
        } else {
            Some(f64::from(self.upvotes) / f64::from(signed))
        }
    }

    fn record(&mut self, value: VoteValue) {
        match value {
            VoteValue::Up => self.upvotes += 1,
            VoteValue::Down => self.downvotes += 1,
            VoteValue::Neutral => self.neutrals += 1,
        }
    }
}

/// Tallies a flat set of votes into one bucket triple.
pub fn tally_votes<'a, I>(votes: I) -> VoteCounts
where
    I: IntoIterator<Item = &'a Vote>,
{
    let mut counts = VoteCounts::default();
    for vote in votes {
        counts.record(vote.value);
    }
    counts
}

/// Groups votes by caption and tallies each group. Captions without votes
/// have no entry; callers fall back to the all-zero default.
pub fn tally_by_caption(votes: &[Vote]) -> HashMap<Uuid, VoteCounts> {
    let mut by_caption: HashMap<Uuid, VoteCounts> = HashMap::new();
    for vote in votes {
        by_caption
            .entry(vote.caption_id)
            .or_default()
            .record(vote.value);
    }
    by_caption
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(caption_id: Uuid, value: i8) -> Vote {
        Vote {
            vote_id: Uuid::new_v4(),
            caption_id,
            voter_id: Uuid::new_v4(),
            value: VoteValue::try_from(value).unwrap(),
        }
    }

    #[test]
    fn buckets_by_sign() {
        let caption = Uuid::new_v4();
        let votes: Vec<Vote> = [1, 1, -1, 0].iter().map(|&v| vote(caption, v)).collect();

        let counts = tally_votes(&votes);
        assert_eq!(
            counts,
            VoteCounts {
                upvotes: 2,
                downvotes: 1,
                neutrals: 1
            }
        );
        assert_eq!(counts.total(), 4);

        let ratio = counts.approval_ratio().unwrap();
        assert!((ratio - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn zero_votes_yield_zero_counts_and_no_ratio() {
        let counts = tally_votes(&[]);
        assert_eq!(counts, VoteCounts::default());
        assert_eq!(counts.total(), 0);
        assert_eq!(counts.approval_ratio(), None);
    }

    #[test]
    fn neutral_only_votes_have_no_ratio() {
        let caption = Uuid::new_v4();
        let votes = vec![vote(caption, 0), vote(caption, 0)];
        assert_eq!(tally_votes(&votes).approval_ratio(), None);
    }

    #[test]
    fn buckets_sum_to_record_count() {
        let caption = Uuid::new_v4();
        let values = [1, -1, 0, 1, 1, -1, 0, 0, 1, -1];
        let votes: Vec<Vote> = values.iter().map(|&v| vote(caption, v)).collect();
        assert_eq!(tally_votes(&votes).total() as usize, votes.len());
    }

    #[test]
    fn tallying_twice_yields_identical_results() {
        let caption = Uuid::new_v4();
        let votes: Vec<Vote> = [1, 0, -1, 1].iter().map(|&v| vote(caption, v)).collect();
        assert_eq!(tally_votes(&votes), tally_votes(&votes));
    }

    #[test]
    fn groups_by_caption() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let votes = vec![vote(a, 1), vote(a, -1), vote(b, 0)];

        let grouped = tally_by_caption(&votes);
        assert_eq!(
            grouped[&a],
            VoteCounts {
                upvotes: 1,
                downvotes: 1,
                neutrals: 0
            }
        );
        assert_eq!(
            grouped[&b],
            VoteCounts {
                upvotes: 0,
                downvotes: 0,
                neutrals: 1
            }
        );
        assert!(!grouped.contains_key(&Uuid::new_v4()));
    }

    #[test]
    fn incremental_bucket_adjustment_matches_fresh_tally() {
        // The optimistic revote rule a client applies: drop the previous
        // value's bucket, bump the new one. Must agree with recomputing
        // from the raw rows or displayed counts drift.
        let caption = Uuid::new_v4();
        let mut votes: Vec<Vote> = [1, 1, -1, 0].iter().map(|&v| vote(caption, v)).collect();

        let mut adjusted = tally_votes(&votes);
        adjusted.downvotes -= 1; // previous value of the revoted record
        adjusted.upvotes += 1; // new value

        votes[2].value = VoteValue::Up;
        assert_eq!(adjusted, tally_votes(&votes));
    }
}
