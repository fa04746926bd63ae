use crate::models::{Caption, HumorFlavor, Vote};
use crate::tally::{VoteCounts, tally_votes};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Platform-wide statistics, recomputed from scratch on every request.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PlatformAnalytics {
    pub total_captions: u64,
    pub total_likes: u64,
    pub total_votes: u64,
    pub flavor_breakdown: Vec<FlavorStats>,
    pub vote_breakdown: VoteCounts,
    pub engagement: EngagementStats,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlavorStats {
    pub flavor: String,
    pub caption_count: u64,
    pub total_likes: u64,
    pub avg_likes: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EngagementStats {
    pub captions_with_likes: u64,
    /// Averaged over captions with at least one like.
    pub avg_likes_per_caption: f64,
    pub max_likes: u32,
    /// Fraction of captions with at least one like, in [0, 1].
    pub like_rate: f64,
}

pub fn compute(captions: &[Caption], votes: &[Vote], flavors: &[HumorFlavor]) -> PlatformAnalytics {
    let total_captions = captions.len() as u64;
    let total_likes: u64 = captions.iter().map(|c| u64::from(c.like_count)).sum();

    let slugs: HashMap<Uuid, &str> = flavors
        .iter()
        .map(|f| (f.flavor_id, f.slug.as_str()))
        .collect();

    // (caption count, like total) per referenced flavor; unstyled captions
    // contribute to the global numbers only.
    let mut grouped: HashMap<Uuid, (u64, u64)> = HashMap::new();
    for caption in captions {
        if let Some(flavor_id) = caption.flavor_id {
            let entry = grouped.entry(flavor_id).or_default();
            entry.0 += 1;
            entry.1 += u64::from(caption.like_count);
        }
    }
    let mut flavor_breakdown: Vec<FlavorStats> = grouped
        .into_iter()
        .map(|(flavor_id, (caption_count, likes))| FlavorStats {
            flavor: slugs
                .get(&flavor_id)
                .map(|s| (*s).to_string())
                .unwrap_or_else(|| flavor_id.to_string()),
            caption_count,
            total_likes: likes,
            avg_likes: if caption_count == 0 {
                0.0
            } else {
                likes as f64 / caption_count as f64
            },
        })
        .collect();
    // HashMap order is arbitrary; sort so repeated runs emit the same report.
    flavor_breakdown.sort_by(|a, b| {
        b.avg_likes
            .partial_cmp(&a.avg_likes)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.flavor.cmp(&b.flavor))
    });

    let liked: Vec<u32> = captions
        .iter()
        .map(|c| c.like_count)
        .filter(|&l| l > 0)
        .collect();
    let captions_with_likes = liked.len() as u64;
    let liked_sum: u64 = liked.iter().map(|&l| u64::from(l)).sum();
    let engagement = EngagementStats {
        captions_with_likes,
        avg_likes_per_caption: if captions_with_likes == 0 {
            0.0
        } else {
            liked_sum as f64 / captions_with_likes as f64
        },
        max_likes: captions.iter().map(|c| c.like_count).max().unwrap_or(0),
        like_rate: if total_captions == 0 {
            0.0
        } else {
            captions_with_likes as f64 / total_captions as f64
        },
    };

    PlatformAnalytics {
        total_captions,
        total_likes,
        total_votes: votes.len() as u64,
        flavor_breakdown,
        vote_breakdown: tally_votes(votes),
        engagement,
    }
}

/// Short human-readable highlights derived from a computed report.
pub fn insights(report: &PlatformAnalytics) -> Vec<String> {
    if report.total_captions == 0 {
        return vec!["No captions have been generated yet.".to_string()];
    }

    let mut lines = Vec::new();
    lines.push(format!(
        "{:.0}% of {} captions have collected at least one like.",
        report.engagement.like_rate * 100.0,
        report.total_captions
    ));

    match report.vote_breakdown.approval_ratio() {
        Some(ratio) => lines.push(format!(
            "Upvotes make up {:.1}% of signed votes.",
            ratio * 100.0
        )),
        None => lines.push("No up or down votes have been cast yet.".to_string()),
    }

    if let Some(top) = report.flavor_breakdown.first() {
        lines.push(format!(
            "'{}' captions average the most likes ({:.1} per caption).",
            top.flavor, top.avg_likes
        ));
    }

    if report.engagement.max_likes > 0 {
        lines.push(format!(
            "The most liked caption holds {} likes.",
            report.engagement.max_likes
        ));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VoteValue;
    use chrono::{TimeZone, Utc};

    fn caption(likes: u32, flavor_id: Option<Uuid>) -> Caption {
        Caption {
            caption_id: Uuid::new_v4(),
            content: "something witty".to_string(),
            like_count: likes,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            flavor_id,
            image_id: None,
        }
    }

    fn vote(value: i8) -> Vote {
        Vote {
            vote_id: Uuid::new_v4(),
            caption_id: Uuid::new_v4(),
            voter_id: Uuid::new_v4(),
            value: VoteValue::try_from(value).unwrap(),
        }
    }

    fn flavor(slug: &str) -> HumorFlavor {
        HumorFlavor {
            flavor_id: Uuid::new_v4(),
            slug: slug.to_string(),
            description: format!("{} humor", slug),
        }
    }

    #[test]
    fn engagement_metrics_from_like_counts() {
        let captions: Vec<Caption> = [0, 0, 5, 10].iter().map(|&l| caption(l, None)).collect();
        let report = compute(&captions, &[], &[]);

        assert_eq!(report.total_captions, 4);
        assert_eq!(report.total_likes, 15);
        assert_eq!(report.engagement.captions_with_likes, 2);
        assert!((report.engagement.avg_likes_per_caption - 7.5).abs() < 1e-9);
        assert_eq!(report.engagement.max_likes, 10);
        assert!((report.engagement.like_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn empty_platform_reports_zeroes_not_nan() {
        let report = compute(&[], &[], &[]);

        assert_eq!(report.total_captions, 0);
        assert_eq!(report.total_likes, 0);
        assert_eq!(report.total_votes, 0);
        assert_eq!(report.engagement.like_rate, 0.0);
        assert_eq!(report.engagement.avg_likes_per_caption, 0.0);
        assert_eq!(report.engagement.max_likes, 0);
        assert!(report.flavor_breakdown.is_empty());

        assert_eq!(
            insights(&report),
            vec!["No captions have been generated yet.".to_string()]
        );
    }

    #[test]
    fn per_flavor_breakdown_groups_and_averages() {
        let dry = flavor("dry");
        let slapstick = flavor("slapstick");
        let unknown_flavor = Uuid::new_v4();
        let captions = vec![
            caption(4, Some(dry.flavor_id)),
            caption(2, Some(dry.flavor_id)),
            caption(1, Some(slapstick.flavor_id)),
            caption(7, Some(unknown_flavor)),
            caption(9, None),
        ];

        let report = compute(&captions, &[], &[dry.clone(), slapstick.clone()]);
        assert_eq!(report.flavor_breakdown.len(), 3);

        // Sorted by average likes descending.
        assert_eq!(report.flavor_breakdown[0].flavor, unknown_flavor.to_string());
        assert_eq!(report.flavor_breakdown[1].flavor, "dry");
        assert_eq!(report.flavor_breakdown[1].caption_count, 2);
        assert_eq!(report.flavor_breakdown[1].total_likes, 6);
        assert!((report.flavor_breakdown[1].avg_likes - 3.0).abs() < 1e-9);
        assert_eq!(report.flavor_breakdown[2].flavor, "slapstick");

        // The unstyled caption still counts globally.
        assert_eq!(report.total_captions, 5);
        assert_eq!(report.total_likes, 23);
    }

    #[test]
    fn vote_breakdown_covers_every_record() {
        let votes: Vec<Vote> = [1, 1, -1, 0, 0, 1].iter().map(|&v| vote(v)).collect();
        let report = compute(&[], &votes, &[]);

        assert_eq!(report.total_votes, 6);
        assert_eq!(report.vote_breakdown.upvotes, 3);
        assert_eq!(report.vote_breakdown.downvotes, 1);
        assert_eq!(report.vote_breakdown.neutrals, 2);
        assert_eq!(report.vote_breakdown.total(), 6);
    }

    #[test]
    fn insights_mention_likes_and_votes() {
        let dry = flavor("dry");
        let captions = vec![caption(3, Some(dry.flavor_id)), caption(0, None)];
        let votes = vec![vote(1), vote(1), vote(-1)];

        let report = compute(&captions, &votes, &[dry]);
        let lines = insights(&report);

        assert!(lines.iter().any(|l| l.contains("50% of 2 captions")));
        assert!(lines.iter().any(|l| l.contains("66.7%")));
        assert!(lines.iter().any(|l| l.contains("'dry'")));
        assert!(lines.iter().any(|l| l.contains("3 likes")));
    }
}
