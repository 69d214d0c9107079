//! Integration tests for the portal admin backend.

use std::path::PathBuf;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::{Config, LogFormat, StoreBackend};
use crate::models::RecordDefaults;
use crate::store::RetryPolicy;
use crate::{build_state, create_router};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    store_root: PathBuf,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_image_limit(4 * 1024 * 1024).await
    }

    async fn with_image_limit(max_image_bytes: usize) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store_root = temp_dir.path().join("store");

        // Create config
        let config = Config {
            store: StoreBackend::Local {
                root: store_root.clone(),
            },
            storage_root: "public".to_string(),
            careers_path: "public/data/career.json".to_string(),
            activities_path: "public/data/activity.json".to_string(),
            descriptions_dir: "public/docs".to_string(),
            snapshot_dir: Some(temp_dir.path().join("drafts")),
            max_image_bytes,
            retry: RetryPolicy {
                attempts: 3,
                backoff: Duration::from_millis(5),
                pacing: Duration::from_millis(1),
            },
            first_record_id: 1,
            defaults: RecordDefaults::default(),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            log_format: LogFormat::Text,
        };

        let state = build_state(&config).await.expect("Failed to build state");
        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            store_root,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    fn stored_json(&self, path: &str) -> Value {
        let raw = std::fs::read(self.store_root.join(path)).expect("stored file missing");
        serde_json::from_slice(&raw).unwrap()
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_test_endpoint() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/test"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Test API is working!");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_save_careers_writes_pretty_document() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post(
            "/api/careers/save",
            json!({"data": [{"id": 1, "title": "Engineer", "isVisible": true}]}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["path"], "public/data/career.json");
    assert_eq!(body["data"]["written"], true);

    let raw =
        std::fs::read_to_string(fixture.store_root.join("public/data/career.json")).unwrap();
    assert!(raw.starts_with("[\n  {"));

    // Identical content is not rewritten
    let (status, body) = fixture
        .post(
            "/api/careers/save",
            json!({"data": [{"id": 1, "title": "Engineer", "isVisible": true}]}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["written"], false);
}

#[tokio::test]
async fn test_save_without_data_is_rejected() {
    let fixture = TestFixture::new().await;

    for path in ["/api/careers/save", "/api/activities/save", "/api/github/save-activity"] {
        let (status, body) = fixture.post(path, json!({})).await;
        assert_eq!(status, 400, "{path}");
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "BAD_REQUEST");
        assert_eq!(body["error"], "No data provided");

        let (status, _) = fixture.post(path, json!({"data": null})).await;
        assert_eq!(status, 400, "{path}");
    }
    assert!(!fixture.store_root.join("public/data").exists());
}

#[tokio::test]
async fn test_save_career_action_dispatch() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post(
            "/api/github/save-career",
            json!({"action": "save-career-json", "data": [{"id": 3, "title": "Analyst"}]}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(
        fixture.stored_json("public/data/career.json"),
        json!([{"id": 3, "title": "Analyst"}])
    );

    let (status, body) = fixture
        .post(
            "/api/github/save-career",
            json!({"action": "save-description", "fileName": "analyst.txt", "content": "Details"}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["path"], "public/docs/analyst.txt");
    let text = std::fs::read_to_string(fixture.store_root.join("public/docs/analyst.txt")).unwrap();
    assert_eq!(text, "Details");

    let (status, body) = fixture
        .post("/api/github/save-career", json!({"action": "launch-rocket"}))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_save_description_requires_fields() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post("/api/github/save-description", json!({"fileName": "a.txt"}))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "FileName and content are required");

    let (status, _) = fixture
        .post(
            "/api/github/save-description",
            json!({"fileName": "../escape.txt", "content": "x"}),
        )
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_upload_image() {
    let fixture = TestFixture::new().await;
    let image = format!("data:image/jpeg;base64,{}", STANDARD.encode([0xFFu8, 0xD8, 0xFF]));

    let (status, body) = fixture
        .post(
            "/api/github/upload-image",
            json!({"image": image, "folderName": "42", "imageNumber": 2}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["path"], "/image/social/42/2.jpg");

    let stored = std::fs::read(fixture.store_root.join("public/image/social/42/2.jpg")).unwrap();
    assert_eq!(stored, vec![0xFF, 0xD8, 0xFF]);

    let (status, body) = fixture
        .post(
            "/api/github/upload-image",
            json!({"image": STANDARD.encode(b"png"), "folderName": "x", "imageNumber": "1", "baseFolder": "image/career"}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["path"], "/image/career/x/1.jpg");
}

#[tokio::test]
async fn test_upload_image_validation() {
    let fixture = TestFixture::with_image_limit(1024).await;

    let (status, body) = fixture
        .post(
            "/api/github/upload-image",
            json!({"image": STANDARD.encode(vec![0u8; 2048]), "folderName": "1", "imageNumber": 1}),
        )
        .await;
    assert_eq!(status, 413);
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
    assert!(!fixture.store_root.join("public/image").exists());

    let (status, body) = fixture
        .post("/api/github/upload-image", json!({"folderName": "1", "imageNumber": 1}))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "No image data provided");

    let (status, _) = fixture
        .post(
            "/api/github/upload-image",
            json!({"image": STANDARD.encode(b"img"), "folderName": "..", "imageNumber": 1}),
        )
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_wrong_method_returns_json_405() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/careers/save"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 405);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "METHOD_NOT_ALLOWED");

    let resp = fixture
        .client
        .get(fixture.url("/api/nothing-here"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_career_draft_flow() {
    let fixture = TestFixture::new().await;

    // Seed the document; the clean draft follows it
    fixture
        .post(
            "/api/careers/save",
            json!({"data": [{"id": 4, "title": "Existing", "isVisible": true}]}),
        )
        .await;

    let resp = fixture
        .client
        .get(fixture.url("/api/drafts/careers"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["records"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["dirty"], false);

    // Add
    let (status, body) = fixture
        .post(
            "/api/drafts/careers",
            json!({
                "title": "QA Engineer",
                "description": "Long description",
                "descriptionFile": "qa.txt"
            }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["id"], 5);
    assert_eq!(body["data"]["location"], "Bakı, Azərbaycan");
    assert_eq!(body["data"]["type"], "Tam iş günü");

    // Adding without a title fails
    let (status, body) = fixture.post("/api/drafts/careers", json!({})).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Please enter a title");

    // Edit
    let resp = fixture
        .client
        .put(fixture.url("/api/drafts/careers/5"))
        .json(&json!({"title": "Senior QA Engineer", "view": "7"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["title"], "Senior QA Engineer");
    assert_eq!(body["data"]["view"], 7);

    // Toggle visibility
    let (status, body) = fixture
        .post("/api/drafts/careers/4/visibility", json!({}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["isVisible"], false);

    // Nothing reaches the store before publish
    assert_eq!(
        fixture.stored_json("public/data/career.json")[0]["isVisible"],
        true
    );

    // Publish
    let (status, body) = fixture
        .post("/api/drafts/careers/publish", json!({}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["records"], 2);
    assert_eq!(body["data"]["documentWritten"], true);
    assert_eq!(body["data"]["auxiliaryWritten"], 1);

    let stored = fixture.stored_json("public/data/career.json");
    assert_eq!(stored[0]["isVisible"], false);
    assert_eq!(stored[1]["title"], "Senior QA Engineer");
    let description =
        std::fs::read_to_string(fixture.store_root.join("public/docs/qa.txt")).unwrap();
    assert_eq!(description, "Long description");

    let resp = fixture
        .client
        .get(fixture.url("/api/drafts/careers"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["dirty"], false);
}

#[tokio::test]
async fn test_delete_and_reload_activity_drafts() {
    let fixture = TestFixture::new().await;

    fixture
        .post(
            "/api/activities/save",
            json!({"data": [{"id": 1, "title": "Open day"}, {"id": 2, "title": "Hackathon"}]}),
        )
        .await;

    let resp = fixture
        .client
        .delete(fixture.url("/api/drafts/activities/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .delete(fixture.url("/api/drafts/activities/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "NOT_FOUND");

    // Reload drops the unpublished delete
    let (status, body) = fixture
        .post("/api/drafts/activities/reload", json!({}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["loadedFrom"], "remote");
    assert_eq!(body["data"]["records"].as_array().unwrap().len(), 2);

    // Delete then publish removes the record from the document
    fixture
        .client
        .delete(fixture.url("/api/drafts/activities/2"))
        .send()
        .await
        .unwrap();
    let (status, _) = fixture
        .post("/api/drafts/activities/publish", json!({}))
        .await;
    assert_eq!(status, 200);

    let stored = fixture.stored_json("public/data/activity.json");
    let ids: Vec<i64> = stored
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1]);
}

#[tokio::test]
async fn test_five_mib_upload_gets_json_413() {
    let fixture = TestFixture::new().await;
    let image = STANDARD.encode(vec![0u8; 5 * 1024 * 1024]);

    let (status, body) = fixture
        .post(
            "/api/github/upload-image",
            json!({"image": image, "folderName": "big", "imageNumber": 1}),
        )
        .await;
    assert_eq!(status, 413);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
    assert_eq!(body["details"]["limit"], 4 * 1024 * 1024);
    assert!(!fixture.store_root.join("public/image").exists());
}

#[tokio::test]
async fn test_body_over_router_limit_gets_json_413() {
    let fixture = TestFixture::with_image_limit(1024).await;
    let padding = "a".repeat(1536 * 1024);

    let (status, body) = fixture
        .post("/api/careers/save", json!({"data": [{"id": 1, "title": padding}]}))
        .await;
    assert_eq!(status, 413);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
    assert!(!fixture.store_root.join("public/data").exists());
}

#[tokio::test]
async fn test_rejected_requests_use_error_envelope() {
    let fixture = TestFixture::new().await;

    // Mistyped field
    let (status, body) = fixture
        .post(
            "/api/github/save-description",
            json!({"fileName": 5, "content": "x"}),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "BAD_REQUEST");

    // Malformed JSON
    let resp = fixture
        .client
        .post(fixture.url("/api/careers/save"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "BAD_REQUEST");

    // Wrong content type
    let resp = fixture
        .client
        .post(fixture.url("/api/activities/save"))
        .header("content-type", "text/plain")
        .body(r#"{"data": []}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);

    // Non-numeric record id
    let resp = fixture
        .client
        .put(fixture.url("/api/drafts/careers/abc"))
        .json(&json!({"title": "x"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_multipart_image_upload() {
    let fixture = TestFixture::new().await;

    let form = Form::new()
        .part(
            "image",
            Part::bytes(vec![0xFFu8, 0xD8, 0xFF]).file_name("photo.jpg"),
        )
        .text("folderName", "7")
        .text("imageNumber", "additional_1");
    let resp = fixture
        .client
        .post(fixture.url("/api/images/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["path"], "/image/social/7/additional_1.jpg");
    let stored =
        std::fs::read(fixture.store_root.join("public/image/social/7/additional_1.jpg")).unwrap();
    assert_eq!(stored, vec![0xFF, 0xD8, 0xFF]);

    // Folder and number fall back to their defaults
    let form = Form::new().part("image", Part::bytes(b"img".to_vec()).file_name("a.jpg"));
    let resp = fixture
        .client
        .post(fixture.url("/api/images/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["path"], "/image/social/activity_images/0.jpg");

    // No file
    let form = Form::new().text("folderName", "7");
    let resp = fixture
        .client
        .post(fixture.url("/api/images/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "No file uploaded");
}

#[tokio::test]
async fn test_multipart_upload_respects_image_limit() {
    let fixture = TestFixture::with_image_limit(1024).await;

    let form = Form::new()
        .part("image", Part::bytes(vec![0u8; 2048]).file_name("big.jpg"))
        .text("folderName", "7");
    let resp = fixture
        .client
        .post(fixture.url("/api/images/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 413);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
    assert!(!fixture.store_root.join("public/image").exists());
}
