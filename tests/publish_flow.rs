//! End-to-end publication against an in-process fake of the four vendor APIs

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post, put};
use chrono::{TimeZone, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use video_publisher::core::{EndpointsConfig, PollingConfig, ServiceConfig, VideoRecord};
use video_publisher::orchestration::{
    OverallStatus, PublicationOptions, PublicationService, PublicationStatus,
};
use video_publisher::platforms::PublisherRegistry;
use video_publisher::security::EnvCredentialStore;
use video_publisher::storage::{InMemoryObjectStore, InMemoryVideoRepository};
use video_publisher::validation::VideoValidator;

const CONTAINER_ID: &str = "c-1";
const SOURCE_SIZE: usize = 4096;

/// How the fake vendors answer
#[derive(Debug, Clone, Copy)]
struct Scenario {
    reject_credentials: bool,
    instagram_container: &'static str,
    x_processing: &'static str,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            reject_credentials: false,
            instagram_container: "FINISHED",
            x_processing: "succeeded",
        }
    }
}

struct VendorState {
    base: String,
    scenario: Scenario,
    calls: AtomicUsize,
    tiktok_chunks: AtomicUsize,
    x_segments: AtomicUsize,
    x_status_checks: AtomicUsize,
}

impl VendorState {
    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn credential_check(&self, body: serde_json::Value) -> Response {
        if self.scenario.reject_credentials {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": { "message": "Invalid OAuth access token" } })),
            )
                .into_response();
        }
        Json(body).into_response()
    }
}

type Shared = State<Arc<VendorState>>;

async fn video_file(State(state): Shared) -> Vec<u8> {
    state.hit();
    vec![7u8; SOURCE_SIZE]
}

async fn instagram_object(State(state): Shared, Path(id): Path<String>) -> Response {
    state.hit();
    if id == CONTAINER_ID {
        let status = state.scenario.instagram_container;
        return Json(json!({ "status_code": status, "id": id })).into_response();
    }
    state.credential_check(json!({ "id": id }))
}

async fn instagram_media(State(state): Shared) -> Json<serde_json::Value> {
    state.hit();
    Json(json!({ "id": CONTAINER_ID }))
}

async fn instagram_media_publish(State(state): Shared) -> Json<serde_json::Value> {
    state.hit();
    Json(json!({ "id": 17895695668004550u64 }))
}

async fn facebook_page(State(state): Shared, Path(id): Path<String>) -> Response {
    state.hit();
    state.credential_check(json!({ "id": id, "name": "Studio" }))
}

async fn facebook_videos(State(state): Shared, body: Bytes) -> Json<serde_json::Value> {
    state.hit();
    assert!(body.len() > SOURCE_SIZE);
    Json(json!({ "id": "fb-video-1" }))
}

async fn tiktok_user(State(state): Shared) -> Response {
    state.hit();
    state.credential_check(json!({ "data": { "user": { "open_id": "abc" } } }))
}

async fn tiktok_init(State(state): Shared, Json(body): Json<serde_json::Value>) -> Json<serde_json::Value> {
    state.hit();
    assert_eq!(body["source_info"]["source"], "FILE_UPLOAD");
    assert_eq!(body["source_info"]["video_size"], SOURCE_SIZE);
    assert_eq!(body["source_info"]["total_chunk_count"], 1);
    Json(json!({
        "data": {
            "upload_url": format!("{}/tiktok-upload", state.base),
            "publish_id": "tt-init-1"
        }
    }))
}

async fn tiktok_upload(State(state): Shared, body: Bytes) -> StatusCode {
    state.hit();
    state.tiktok_chunks.fetch_add(1, Ordering::SeqCst);
    assert_eq!(body.len(), SOURCE_SIZE);
    StatusCode::CREATED
}

async fn tiktok_commit(State(state): Shared, Json(body): Json<serde_json::Value>) -> Json<serde_json::Value> {
    state.hit();
    assert!(body["post_info"]["title"]
        .as_str()
        .is_some_and(|title| title.starts_with("Launch day")));
    Json(json!({
        "data": {
            "publish_id": "tt-1",
            "share_url": "https://www.tiktok.com/@studio/video/1"
        }
    }))
}

async fn x_me(State(state): Shared) -> Response {
    state.hit();
    state.credential_check(json!({ "data": { "id": "99", "username": "studio" } }))
}

async fn x_upload_command(State(state): Shared, body: Bytes) -> Response {
    state.hit();
    let text = String::from_utf8_lossy(&body);

    if text.contains("command=INIT") {
        assert!(text.contains(&format!("total_bytes={}", SOURCE_SIZE)));
        return Json(json!({ "media_id": 710511363345354753u64, "media_id_string": "x-media-1" }))
            .into_response();
    }
    if text.contains("command=FINALIZE") {
        return Json(json!({
            "media_id_string": "x-media-1",
            "processing_info": { "state": "pending", "check_after_secs": 1 }
        }))
        .into_response();
    }

    assert!(text.contains("APPEND"));
    state.x_segments.fetch_add(1, Ordering::SeqCst);
    StatusCode::NO_CONTENT.into_response()
}

async fn x_upload_status(
    State(state): Shared,
    Query(params): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    state.hit();
    assert_eq!(params.get("command").map(String::as_str), Some("STATUS"));
    state.x_status_checks.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "media_id_string": "x-media-1",
        "processing_info": { "state": state.scenario.x_processing }
    }))
}

async fn x_tweets(State(state): Shared, Json(body): Json<serde_json::Value>) -> Json<serde_json::Value> {
    state.hit();
    assert_eq!(body["media"]["media_ids"][0], "x-media-1");
    Json(json!({ "data": { "id": "tw-1", "text": body["text"] } }))
}

async fn spawn_vendor(scenario: Scenario) -> Arc<VendorState> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let state = Arc::new(VendorState {
        base,
        scenario,
        calls: AtomicUsize::new(0),
        tiktok_chunks: AtomicUsize::new(0),
        x_segments: AtomicUsize::new(0),
        x_status_checks: AtomicUsize::new(0),
    });

    let app = Router::new()
        .route("/files/{*key}", get(video_file))
        .route("/ig/{id}", get(instagram_object))
        .route("/ig/{id}/media", post(instagram_media))
        .route("/ig/{id}/media_publish", post(instagram_media_publish))
        .route("/fb/{id}", get(facebook_page))
        .route("/fb/{id}/videos", post(facebook_videos))
        .route("/tiktok/user/info/", get(tiktok_user))
        .route("/tiktok/post/publish/video/init/", post(tiktok_init))
        .route("/tiktok/post/publish/video/commit/", post(tiktok_commit))
        .route("/tiktok-upload", put(tiktok_upload))
        .route("/x2/users/me", get(x_me))
        .route("/x2/tweets", post(x_tweets))
        .route(
            "/x1/media/upload.json",
            post(x_upload_command).get(x_upload_status),
        )
        .with_state(state.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    state
}

fn video() -> VideoRecord {
    VideoRecord {
        id: 42,
        filename: "launch.mp4".to_string(),
        s3_key: "videos/launch.mp4".to_string(),
        title: "Launch day".to_string(),
        description: "Behind the scenes".to_string(),
        tags: vec!["launch".to_string()],
        file_size: 5 * 1024 * 1024,
        duration: 30.0,
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    }
}

fn full_credentials() -> EnvCredentialStore {
    let vars = [
        ("INSTAGRAM_ACCESS_TOKEN", "ig-token"),
        ("INSTAGRAM_BUSINESS_ACCOUNT_ID", "17841400000000000"),
        ("TIKTOK_CLIENT_KEY", "tt-key"),
        ("TIKTOK_CLIENT_SECRET", "tt-secret"),
        ("TIKTOK_ACCESS_TOKEN", "tt-token"),
        ("X_API_KEY", "x-key"),
        ("X_API_SECRET", "x-secret"),
        ("X_ACCESS_TOKEN", "x-token"),
        ("X_ACCESS_TOKEN_SECRET", "x-token-secret"),
        ("FACEBOOK_ACCESS_TOKEN", "fb-token"),
        ("FACEBOOK_PAGE_ID", "1029384756"),
    ];
    EnvCredentialStore::from_vars(
        vars.into_iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
    )
}

struct Setup {
    vendor: Arc<VendorState>,
    repository: Arc<InMemoryVideoRepository>,
    service: PublicationService,
}

async fn setup(credentials: EnvCredentialStore, scenario: Scenario) -> Setup {
    let vendor = spawn_vendor(scenario).await;
    let base = vendor.base.clone();

    let config = ServiceConfig {
        endpoints: EndpointsConfig {
            instagram_graph: format!("{}/ig", base),
            facebook_graph: format!("{}/fb", base),
            tiktok_api: format!("{}/tiktok", base),
            x_api: format!("{}/x2", base),
            x_upload: format!("{}/x1", base),
        },
        polling: PollingConfig {
            max_attempts: 3,
            interval_ms: 10,
        },
        ..ServiceConfig::default()
    };

    let repository = Arc::new(InMemoryVideoRepository::with_videos([video()]));
    let object_store = Arc::new(InMemoryObjectStore::with_keys(
        format!("{}/files", base),
        ["videos/launch.mp4"],
    ));
    let registry = PublisherRegistry::from_config(&config, &credentials, reqwest::Client::new());

    let service = PublicationService::new(
        repository.clone(),
        object_store,
        registry,
        VideoValidator::new(&config.validation),
        PublicationOptions::from_config(&config),
    );

    Setup {
        vendor,
        repository,
        service,
    }
}

fn all_platforms() -> Vec<String> {
    ["instagram", "tiktok", "x", "facebook"]
        .iter()
        .map(|name| name.to_string())
        .collect()
}

#[tokio::test]
async fn test_publish_to_all_platforms() {
    let setup = setup(full_credentials(), Scenario::default()).await;

    let result = setup.service.publish_video(42, &all_platforms()).await.unwrap();

    assert!(
        result.failed_publications.is_empty(),
        "unexpected failures: {:?}",
        result.failed_publications
    );
    assert_eq!(result.successful_count(), 4);
    assert_eq!(result.overall_status(), OverallStatus::Success);
    assert_eq!(result.success_rate(), 100.0);

    let urls: Vec<Option<&str>> = result
        .successful_publications
        .iter()
        .map(|entry| entry.url.as_deref())
        .collect();
    assert_eq!(
        urls,
        vec![
            Some("https://www.instagram.com/p/17895695668004550/"),
            Some("https://www.tiktok.com/@studio/video/1"),
            Some("https://x.com/user/status/tw-1"),
            Some("https://www.facebook.com/fb-video-1"),
        ]
    );
    assert_eq!(
        result.successful_publications[1].remote_id.as_deref(),
        Some("tt-1")
    );

    assert_eq!(setup.vendor.tiktok_chunks.load(Ordering::SeqCst), 1);
    assert_eq!(setup.vendor.x_segments.load(Ordering::SeqCst), 1);
    assert_eq!(setup.vendor.x_status_checks.load(Ordering::SeqCst), 1);

    let records = setup.repository.all_publications();
    assert_eq!(records.len(), 4);
    assert!(records
        .iter()
        .all(|record| record.status == PublicationStatus::Success));
}

#[tokio::test]
async fn test_instagram_processing_never_finishes() {
    let scenario = Scenario {
        instagram_container: "IN_PROGRESS",
        ..Scenario::default()
    };
    let setup = setup(full_credentials(), scenario).await;

    let result = setup.service.publish_video(42, &all_platforms()).await.unwrap();

    assert_eq!(result.successful_count(), 3);
    assert_eq!(result.failed_count(), 1);
    assert_eq!(result.overall_status(), OverallStatus::Partial);
    assert_eq!(result.success_rate(), 75.0);

    let failure = &result.failed_publications[0];
    assert_eq!(failure.platform, "instagram");
    assert_eq!(
        failure.error.as_deref(),
        Some("Instagram media processing timeout after 3 status checks")
    );

    let records = setup.service.publication_status(42).await.unwrap();
    assert_eq!(records.publications.len(), 4);
    assert_eq!(
        records
            .publications
            .iter()
            .filter(|record| record.status == PublicationStatus::Failed)
            .count(),
        1
    );
}

#[tokio::test]
async fn test_instagram_container_error() {
    let scenario = Scenario {
        instagram_container: "ERROR",
        ..Scenario::default()
    };
    let setup = setup(full_credentials(), scenario).await;

    let result = setup.service.publish_video(42, &all_platforms()).await.unwrap();

    assert_eq!(result.successful_count(), 3);
    assert_eq!(result.overall_status(), OverallStatus::Partial);
    assert_eq!(result.failed_publications.len(), 1);
    assert_eq!(result.failed_publications[0].platform, "instagram");
    assert_eq!(
        result.failed_publications[0].error.as_deref(),
        Some("Instagram media processing failed")
    );

    let records = setup.repository.all_publications();
    assert_eq!(records[0].status, PublicationStatus::Failed);
    assert_eq!(
        records[0].publication_data["error"],
        "Instagram media processing failed"
    );
}

#[tokio::test]
async fn test_x_media_processing_failed() {
    let scenario = Scenario {
        x_processing: "failed",
        ..Scenario::default()
    };
    let setup = setup(full_credentials(), scenario).await;

    let result = setup.service.publish_video(42, &all_platforms()).await.unwrap();

    assert_eq!(result.successful_count(), 3);
    assert_eq!(result.overall_status(), OverallStatus::Partial);
    assert_eq!(result.failed_publications.len(), 1);
    assert_eq!(result.failed_publications[0].platform, "x");
    assert_eq!(
        result.failed_publications[0].error.as_deref(),
        Some("X media processing failed")
    );
    assert_eq!(setup.vendor.x_status_checks.load(Ordering::SeqCst), 1);

    let succeeded: Vec<&str> = result
        .successful_publications
        .iter()
        .map(|entry| entry.platform.as_str())
        .collect();
    assert_eq!(succeeded, vec!["instagram", "tiktok", "facebook"]);
}

#[tokio::test]
async fn test_supported_and_unsupported_platform() {
    let setup = setup(full_credentials(), Scenario::default()).await;

    let platforms = vec!["instagram".to_string(), "bluesky".to_string()];
    let result = setup.service.publish_video(42, &platforms).await.unwrap();

    assert_eq!(result.successful_count(), 1);
    assert_eq!(result.failed_count(), 1);
    assert_eq!(result.overall_status(), OverallStatus::Partial);
    assert_eq!(result.success_rate(), 50.0);
    assert_eq!(
        result.failed_publications[0].error.as_deref(),
        Some("Platform not supported")
    );

    let records = setup.repository.all_publications();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, PublicationStatus::Success);
    assert_eq!(records[0].publication_data["status"], "published");

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["overall_status"], "partial");
    assert_eq!(json["success_rate"], 50.0);
}

#[tokio::test]
async fn test_missing_credentials_make_no_calls() {
    let setup = setup(EnvCredentialStore::default(), Scenario::default()).await;

    let result = setup.service.publish_video(42, &all_platforms()).await.unwrap();

    assert_eq!(result.successful_count(), 0);
    assert_eq!(result.overall_status(), OverallStatus::Failed);
    assert!(result.failed_publications.iter().all(|entry| entry
        .error
        .as_deref()
        .is_some_and(|error| error.contains("credentials not configured"))));
    assert_eq!(setup.vendor.calls(), 0);
    assert_eq!(setup.repository.all_publications().len(), 4);
}

#[tokio::test]
async fn test_rejected_credentials() {
    let scenario = Scenario {
        reject_credentials: true,
        ..Scenario::default()
    };
    let setup = setup(full_credentials(), scenario).await;

    let result = setup.service.publish_video(42, &all_platforms()).await.unwrap();

    assert_eq!(result.successful_count(), 0);
    assert_eq!(result.failed_count(), 4);
    assert_eq!(result.overall_status(), OverallStatus::Failed);
    assert!(result.failed_publications.iter().all(|entry| entry
        .error
        .as_deref()
        .is_some_and(|error| error.contains("credential validation failed"))));

    // One credential check per platform and nothing else
    assert_eq!(setup.vendor.calls(), 4);
}
