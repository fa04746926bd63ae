use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A short text attached to an image, produced by the captioning flow.
/// `like_count` is the only field mutated after creation; vote tallies are
/// derived on read and never stored on the record.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Caption {
    pub caption_id: Uuid,
    pub content: String,
    pub like_count: u32,
    pub created_at: DateTime<Utc>,
    pub flavor_id: Option<Uuid>,
    pub image_id: Option<Uuid>,
}

/// A per-user, per-caption preference. The votes table keys items by
/// (caption_id, voter_id), so one record per pair is a store-level
/// guarantee; a revote overwrites `value` in place and keeps the vote_id.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Vote {
    pub vote_id: Uuid,
    pub caption_id: Uuid,
    pub voter_id: Uuid,
    pub value: VoteValue,
}

/// Signed vote value constrained to {-1, 0, 1}. Out-of-range wire values
/// fail deserialization instead of reaching the store.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(try_from = "i8", into = "i8")]
pub enum VoteValue {
    Down,
    Neutral,
    Up,
}

impl VoteValue {
    pub fn as_i8(self) -> i8 {
        match self {
            VoteValue::Down => -1,
            VoteValue::Neutral => 0,
            VoteValue::Up => 1,
        }
    }
}

impl From<VoteValue> for i8 {
    fn from(value: VoteValue) -> Self {
        value.as_i8()
    }
}

impl TryFrom<i8> for VoteValue {
    type Error = String;

    fn try_from(raw: i8) -> Result<Self, Self::Error> {
        match raw {
            -1 => Ok(VoteValue::Down),
            0 => Ok(VoteValue::Neutral),
            1 => Ok(VoteValue::Up),
            other => Err(format!("vote value must be -1, 0 or 1, got {}", other)),
        }
    }
}

/// Uploaded image metadata. The bytes live in the object store; the record
/// is immutable once registered.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Image {
    pub image_id: Uuid,
    pub url: String,
    pub description: String,
}

/// A humor style tag referenced by captions; groups analytics and steers
/// caption generation.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HumorFlavor {
    pub flavor_id: Uuid,
    pub slug: String,
    pub description: String,
}
