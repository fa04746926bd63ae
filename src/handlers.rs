use crate::{
    analytics,
    auth::{MaybePrincipal, RequirePrincipal},
    errors::AppError,
    listing::{self, CaptionWithVotes, PageInfo, SortMode},
    models::{Caption, HumorFlavor, Image, Vote, VoteValue},
    tally::{self, VoteCounts},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use mime_guess;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing;
use uuid::Uuid;

/// Ceiling on votes read for one caption's tally.
const VOTES_PER_CAPTION_CAP: usize = 10_000;
/// Ceilings on records read by the analytics pass.
const ANALYTICS_CAPTION_CAP: usize = 5_000;
const ANALYTICS_VOTE_CAP: usize = 50_000;

const DEFAULT_PAGE_LIMIT: usize = 20;
const MAX_PAGE_LIMIT: usize = 100;

/// Success envelope; the failure side lives in `errors.rs`.
#[derive(Serialize)]
struct ApiOk<T> {
    success: bool,
    data: T,
}

fn ok<T: Serialize>(data: T) -> Json<ApiOk<T>> {
    Json(ApiOk {
        success: true,
        data,
    })
}

// --- Request / response bodies ---

#[derive(Deserialize, Debug)]
pub struct ListCaptionsQuery {
    limit: Option<String>,
    offset: Option<String>,
    sort: Option<String>,
}

#[derive(Serialize)]
struct ListCaptionsResponse {
    captions: Vec<CaptionWithVotes>,
    pagination: PageInfo,
}

#[derive(Deserialize, Debug)]
pub struct SubmitVoteRequest {
    caption_id: String,
    vote_value: i8,
}

#[derive(Serialize, Debug, Clone, Copy)]
#[serde(rename_all = "snake_case")]
enum VoteAction {
    Created,
    Updated,
}

#[derive(Serialize)]
struct SubmitVoteResponse {
    action: VoteAction,
    vote: Vote,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_vote: Option<VoteValue>,
}

#[derive(Deserialize, Debug)]
pub struct VoteLookupQuery {
    caption_id: Option<String>,
}

#[derive(Serialize)]
struct VoteLookupResponse {
    caption_id: Uuid,
    counts: VoteCounts,
    total: u32,
    user_vote: Option<VoteValue>,
}

#[derive(Serialize)]
struct AnalyticsResponse {
    #[serde(flatten)]
    report: analytics::PlatformAnalytics,
    insights: Vec<String>,
    #[serde(rename = "generatedAt")]
    generated_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug)]
pub struct RegisterImageRequest {
    file_name: String,
    #[serde(default)]
    description: String,
}

#[derive(Serialize)]
struct RegisterImageResponse {
    image: Image,
    upload_url: String,
    expires_in_secs: u64,
}

#[derive(Deserialize, Debug)]
pub struct GenerateCaptionRequest {
    image_id: String,
    flavor_id: Option<String>,
}

#[derive(Serialize)]
struct GenerateCaptionResponse {
    caption: Caption,
}

#[derive(Serialize)]
struct ListFlavorsResponse {
    flavors: Vec<HumorFlavor>,
}

#[derive(Serialize)]
struct LikeCaptionResponse {
    caption_id: Uuid,
    like_count: u32,
}

// --- Handlers ---

/// Handler for GET /captions
pub async fn list_captions(
    State(state): State<Arc<AppState>>,
    MaybePrincipal(principal): MaybePrincipal,
    Query(query): Query<ListCaptionsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let sort = match query.sort.as_deref() {
        Some(raw) => raw.parse::<SortMode>().map_err(AppError::InvalidInput)?,
        None => SortMode::Newest,
    };
    // Unparseable numbers fall back to the defaults rather than failing.
    let limit = query
        .limit
        .as_deref()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT);
    let offset = query
        .offset
        .as_deref()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(0);

    tracing::debug!(?sort, limit, offset, "Listing captions via handler");

    let mut candidates: Vec<Caption> = state
        .caption_repo
        .list(listing::CANDIDATE_FETCH_CAP)
        .await?
        .into_iter()
        .filter(|c| !c.content.trim().is_empty())
        .collect();

    listing::arrange(&mut candidates, sort, &mut rand::thread_rng());
    let (page, pagination) = listing::window(candidates, limit, offset);

    // The window holds at most MAX_PAGE_LIMIT captions, so enrichment stays
    // a bounded set of key queries.
    let mut votes: Vec<Vote> = Vec::new();
    for caption in &page {
        votes.extend(
            state
                .vote_repo
                .list_for_caption(caption.caption_id, VOTES_PER_CAPTION_CAP)
                .await?,
        );
    }

    let captions = listing::enrich(page, &votes, principal.map(|p| p.user_id));
    Ok(ok(ListCaptionsResponse {
        captions,
        pagination,
    }))
}

/// Handler for POST /votes
pub async fn submit_vote(
    State(state): State<Arc<AppState>>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(body): Json<SubmitVoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let caption_id = Uuid::parse_str(&body.caption_id)?;
    let value = VoteValue::try_from(body.vote_value).map_err(AppError::InvalidInput)?;

    let existing = state.vote_repo.get(caption_id, principal.user_id).await?;

    // A revote keeps the original vote_id; the composite key makes the put
    // an in-place overwrite either way.
    let vote = Vote {
        vote_id: existing
            .as_ref()
            .map(|v| v.vote_id)
            .unwrap_or_else(Uuid::new_v4),
        caption_id,
        voter_id: principal.user_id,
        value,
    };
    state.vote_repo.put(&vote).await?;

    let (action, previous_vote) = match existing {
        Some(previous) => (VoteAction::Updated, Some(previous.value)),
        None => (VoteAction::Created, None),
    };

    tracing::info!(%caption_id, voter_id = %principal.user_id, ?action, "Vote submitted via handler");
    Ok(ok(SubmitVoteResponse {
        action,
        vote,
        previous_vote,
    }))
}

/// Handler for GET /votes
pub async fn lookup_votes(
    State(state): State<Arc<AppState>>,
    MaybePrincipal(principal): MaybePrincipal,
    Query(query): Query<VoteLookupQuery>,
) -> Result<impl IntoResponse, AppError> {
    let raw_id = query.caption_id.ok_or_else(|| {
        AppError::InvalidInput("Missing required query parameter: caption_id".to_string())
    })?;
    let caption_id = Uuid::parse_str(&raw_id)?;

    let votes = state
        .vote_repo
        .list_for_caption(caption_id, VOTES_PER_CAPTION_CAP)
        .await?;
    let counts = tally::tally_votes(&votes);
    let user_vote = principal.and_then(|p| {
        votes
            .iter()
            .find(|v| v.voter_id == p.user_id)
            .map(|v| v.value)
    });

    Ok(ok(VoteLookupResponse {
        caption_id,
        counts,
        total: counts.total(),
        user_vote,
    }))
}

/// Handler for GET /analytics
pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let captions = state.caption_repo.list(ANALYTICS_CAPTION_CAP).await?;
    let votes = state.vote_repo.list_all(ANALYTICS_VOTE_CAP).await?;
    let flavors = state.flavor_repo.list_all().await?;

    let report = analytics::compute(&captions, &votes, &flavors);
    let insights = analytics::insights(&report);

    tracing::debug!(
        total_captions = report.total_captions,
        total_votes = report.total_votes,
        "Computed analytics report via handler"
    );

    Ok(ok(AnalyticsResponse {
        report,
        insights,
        generated_at: Utc::now(),
    }))
}

/// Handler for GET /flavors
pub async fn list_flavors(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let flavors = state.flavor_repo.list_all().await?;
    Ok(ok(ListFlavorsResponse { flavors }))
}

/// Handler for POST /images
pub async fn register_image(
    State(state): State<Arc<AppState>>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(body): Json<RegisterImageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let file_name = body.file_name.trim();
    if file_name.is_empty() {
        return Err(AppError::InvalidInput(
            "file_name cannot be empty".to_string(),
        ));
    }

    let image_id = Uuid::new_v4();
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "bin".to_string());
    let object_key = format!("{}.{}", image_id, extension);

    // Guess the content type from the file name; the presigned URL binds
    // the upload to it.
    let content_type = mime_guess::from_path(file_name)
        .first_raw()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let upload = state
        .media_storage
        .presign_upload(&object_key, &content_type)
        .await?;

    let image = Image {
        image_id,
        url: state.media_storage.object_url(&object_key),
        description: body.description,
    };
    state.image_repo.create(&image).await?;

    tracing::info!(%image_id, registered_by = %principal.user_id, "Image registered via handler");
    Ok((
        StatusCode::CREATED,
        ok(RegisterImageResponse {
            image,
            upload_url: upload.url,
            expires_in_secs: upload.expires_in_secs,
        }),
    ))
}

/// Handler for POST /captions/generate
pub async fn generate_caption(
    State(state): State<Arc<AppState>>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(body): Json<GenerateCaptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let image_id = Uuid::parse_str(&body.image_id)?;
    let flavor_id = body.flavor_id.as_deref().map(Uuid::parse_str).transpose()?;

    let image = state
        .image_repo
        .get_by_id(image_id)
        .await?
        .ok_or(AppError::ImageNotFound(image_id))?;

    // An unknown flavor is a caller mistake, not a missing resource.
    let flavor = match flavor_id {
        Some(id) => Some(
            state
                .flavor_repo
                .get_by_id(id)
                .await?
                .ok_or_else(|| AppError::InvalidInput(format!("Unknown flavor: {}", id)))?,
        ),
        None => None,
    };

    let content = state
        .captioner
        .generate(&image.url, flavor.as_ref().map(|f| f.slug.as_str()))
        .await?;

    let caption = Caption {
        caption_id: Uuid::new_v4(),
        content,
        like_count: 0,
        created_at: Utc::now(),
        flavor_id,
        image_id: Some(image_id),
    };
    state.caption_repo.create(&caption).await?;

    tracing::info!(caption_id = %caption.caption_id, %image_id, requested_by = %principal.user_id, "Caption generated via handler");
    Ok((StatusCode::CREATED, ok(GenerateCaptionResponse { caption })))
}

/// Handler for POST /captions/{id}/like
pub async fn like_caption(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let caption_id = Uuid::parse_str(&id_str)?;
    let like_count = state.caption_repo.increment_likes(caption_id).await?;
    tracing::debug!(%caption_id, like_count, "Caption liked via handler");
    Ok(ok(LikeCaptionResponse {
        caption_id,
        like_count,
    }))
}
