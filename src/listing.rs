use crate::models::{Caption, Vote, VoteValue};
use crate::tally::{VoteCounts, tally_by_caption};
use rand::Rng;
use serde::Serialize;
use std::str::FromStr;
use uuid::Uuid;

/// Upper bound on the candidate batch fetched before in-memory ordering.
/// The store has no native random ordering, so every mode orders this
/// bounded superset in memory and reports its size as `total`.
pub const CANDIDATE_FETCH_CAP: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    Newest,
    Oldest,
    MostLiked,
    Random,
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(SortMode::Newest),
            "oldest" => Ok(SortMode::Oldest),
            "most_liked" => Ok(SortMode::MostLiked),
            "random" => Ok(SortMode::Random),
            other => Err(format!(
                "unknown sort mode '{}', expected newest|oldest|most_liked|random",
                other
            )),
        }
    }
}

/// Orders candidates in place: deterministic modes sort by their key,
/// random mode shuffles.
pub fn arrange(captions: &mut [Caption], mode: SortMode, rng: &mut impl Rng) {
    match mode {
        SortMode::Newest => captions.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortMode::Oldest => captions.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortMode::MostLiked => captions.sort_by(|a, b| b.like_count.cmp(&a.like_count)),
        SortMode::Random => shuffle(captions, rng),
    }
}

/// Unbiased Fisher-Yates shuffle: walk i from the last index down to 1 and
/// swap element i with a uniformly drawn element in [0, i].
pub fn shuffle<T>(items: &mut [T], rng: &mut impl Rng) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// Pagination metadata for a listing window.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

/// Slices the window [offset, offset+limit) out of the ordered candidates.
/// An offset at or past the end yields an empty page with `has_more` false.
pub fn window<T>(items: Vec<T>, limit: usize, offset: usize) -> (Vec<T>, PageInfo) {
    let total = items.len();
    let page: Vec<T> = items.into_iter().skip(offset).take(limit).collect();
    let info = PageInfo {
        total,
        limit,
        offset,
        has_more: offset + limit < total,
    };
    (page, info)
}

/// A caption as returned by the listing endpoint: the record plus its
/// derived tally and the requesting voter's own value (null when anonymous
/// or unvoted).
#[derive(Serialize, Debug, Clone)]
pub struct CaptionWithVotes {
    #[serde(flatten)]
    pub caption: Caption,
    pub vote_counts: VoteCounts,
    pub total_votes: u32,
    pub user_vote: Option<VoteValue>,
}

/// Joins a page of captions with the votes fetched for those captions.
/// `votes` must hold the full vote set of every caption in the page or the
/// tallies under-count.
pub fn enrich(
    captions: Vec<Caption>,
    votes: &[Vote],
    voter_id: Option<Uuid>,
) -> Vec<CaptionWithVotes> {
    let tallies = tally_by_caption(votes);
    captions
        .into_iter()
        .map(|caption| {
            let counts = tallies
                .get(&caption.caption_id)
                .copied()
                .unwrap_or_default();
            let user_vote = voter_id.and_then(|voter| {
                votes
                    .iter()
                    .find(|v| v.caption_id == caption.caption_id && v.voter_id == voter)
                    .map(|v| v.value)
            });
            CaptionWithVotes {
                vote_counts: counts,
                total_votes: counts.total(),
                user_vote,
                caption,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn caption(likes: u32, day: u32) -> Caption {
        Caption {
            caption_id: Uuid::new_v4(),
            content: format!("caption {}", day),
            like_count: likes,
            created_at: Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap(),
            flavor_id: None,
            image_id: None,
        }
    }

    fn ids(captions: &[Caption]) -> Vec<Uuid> {
        captions.iter().map(|c| c.caption_id).collect()
    }

    #[test]
    fn sort_mode_parsing() {
        assert_eq!("newest".parse::<SortMode>().unwrap(), SortMode::Newest);
        assert_eq!("oldest".parse::<SortMode>().unwrap(), SortMode::Oldest);
        assert_eq!(
            "most_liked".parse::<SortMode>().unwrap(),
            SortMode::MostLiked
        );
        assert_eq!("random".parse::<SortMode>().unwrap(), SortMode::Random);
        assert!("trending".parse::<SortMode>().is_err());
    }

    #[test]
    fn deterministic_modes_order_by_their_key() {
        let mut rng = StdRng::seed_from_u64(0);
        let a = caption(5, 1);
        let b = caption(0, 2);
        let c = caption(9, 3);

        let mut newest = vec![a.clone(), b.clone(), c.clone()];
        arrange(&mut newest, SortMode::Newest, &mut rng);
        assert_eq!(ids(&newest), vec![c.caption_id, b.caption_id, a.caption_id]);

        let mut oldest = vec![c.clone(), a.clone(), b.clone()];
        arrange(&mut oldest, SortMode::Oldest, &mut rng);
        assert_eq!(ids(&oldest), vec![a.caption_id, b.caption_id, c.caption_id]);

        let mut liked = vec![a.clone(), b.clone(), c.clone()];
        arrange(&mut liked, SortMode::MostLiked, &mut rng);
        assert_eq!(ids(&liked), vec![c.caption_id, a.caption_id, b.caption_id]);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut items: Vec<usize> = (0..100).collect();
        shuffle(&mut items, &mut rng);

        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn shuffle_handles_trivial_slices() {
        let mut rng = StdRng::seed_from_u64(1);

        let mut empty: Vec<u8> = vec![];
        shuffle(&mut empty, &mut rng);
        assert!(empty.is_empty());

        let mut single = vec![9];
        shuffle(&mut single, &mut rng);
        assert_eq!(single, vec![9]);
    }

    #[test]
    fn repeated_shuffles_cover_elements_roughly_uniformly() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 10usize;
        let trials = 4000;
        let limit = 2;

        let mut hits = vec![0u32; n];
        for _ in 0..trials {
            let mut items: Vec<usize> = (0..n).collect();
            shuffle(&mut items, &mut rng);
            for &element in items.iter().take(limit) {
                hits[element] += 1;
            }
        }

        // Each element lands in the window with p = limit/n; the seeded run
        // stays well inside a generous band around the expectation.
        let expected = (trials * limit / n) as f64;
        for (element, &count) in hits.iter().enumerate() {
            let count = f64::from(count);
            assert!(
                (count - expected).abs() < expected * 0.25,
                "element {} appeared {} times, expected about {}",
                element,
                count,
                expected
            );
        }
    }

    #[test]
    fn window_slices_and_reports_has_more() {
        let (page, info) = window((0..10).collect::<Vec<i32>>(), 3, 0);
        assert_eq!(page, vec![0, 1, 2]);
        assert_eq!(
            info,
            PageInfo {
                total: 10,
                limit: 3,
                offset: 0,
                has_more: true
            }
        );

        let (page, info) = window((0..10).collect::<Vec<i32>>(), 3, 9);
        assert_eq!(page, vec![9]);
        assert!(!info.has_more);

        // Exact boundary: the last full window has nothing after it.
        let (_, info) = window((0..10).collect::<Vec<i32>>(), 5, 5);
        assert!(!info.has_more);
    }

    #[test]
    fn window_past_the_end_is_empty() {
        let (page, info) = window((0..5).collect::<Vec<i32>>(), 10, 5);
        assert!(page.is_empty());
        assert!(!info.has_more);

        let (page, info) = window((0..5).collect::<Vec<i32>>(), 10, 50);
        assert!(page.is_empty());
        assert!(!info.has_more);
        assert_eq!(info.total, 5);
    }

    #[test]
    fn enrich_joins_tallies_and_own_vote() {
        let voter = Uuid::new_v4();
        let voted = caption(0, 1);
        let unvoted = caption(0, 2);
        let votes = vec![
            Vote {
                vote_id: Uuid::new_v4(),
                caption_id: voted.caption_id,
                voter_id: voter,
                value: VoteValue::Up,
            },
            Vote {
                vote_id: Uuid::new_v4(),
                caption_id: voted.caption_id,
                voter_id: Uuid::new_v4(),
                value: VoteValue::Down,
            },
        ];

        let enriched = enrich(vec![voted.clone(), unvoted], &votes, Some(voter));
        assert_eq!(
            enriched[0].vote_counts,
            VoteCounts {
                upvotes: 1,
                downvotes: 1,
                neutrals: 0
            }
        );
        assert_eq!(enriched[0].total_votes, 2);
        assert_eq!(enriched[0].user_vote, Some(VoteValue::Up));
        assert_eq!(enriched[1].vote_counts, VoteCounts::default());
        assert_eq!(enriched[1].user_vote, None);

        let anonymous = enrich(vec![voted], &votes, None);
        assert_eq!(anonymous[0].user_vote, None);
    }
}
