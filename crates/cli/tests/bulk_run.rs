use alttext_core::api::ApiError;
use alttext_core::auth::{Capability, TokenGrant};
use alttext_core::config::{AppConfig, AuditConfig, AuthConfig, DatabaseConfig, SiteConfig};
use alttext_core::models::{AltStatus, AssetId, BatchCursor, NewAsset};
use alttext_core::pipeline::Engine;
use cli::{bulk, report};
use serde_json::json;
use sqlx::Row;
use tempfile::{tempdir, TempDir};

async fn engine_in(temp: &TempDir, site: &str, tokens: Vec<TokenGrant>) -> Engine {
    let cfg = AppConfig {
        database: DatabaseConfig {
            path: temp.path().join("catalog.db").to_string_lossy().into_owned(),
        },
        site: SiteConfig {
            name: site.to_string(),
        },
        audit: AuditConfig {
            path: temp.path().join("logs/alttext.log").to_string_lossy().into_owned(),
        },
        auth: AuthConfig { tokens },
        ..Default::default()
    };
    Engine::open(cfg).await.unwrap()
}

async fn add(engine: &Engine, title: &str, filename: &str, mime: &str) -> AssetId {
    let (id, created) = engine
        .catalog
        .upsert(&NewAsset {
            path: Some(format!("/uploads/{filename}")),
            filename: filename.to_string(),
            title: title.to_string(),
            mime: mime.to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(created);
    id
}

async fn alt_of(engine: &Engine, id: AssetId) -> Option<String> {
    let row = sqlx::query("SELECT alt_text FROM assets WHERE id = ?1")
        .bind(id)
        .fetch_one(engine.catalog.pool())
        .await
        .unwrap();
    row.get("alt_text")
}

#[tokio::test]
async fn full_run_pages_through_catalog() {
    let temp = tempdir().unwrap();
    let engine = engine_in(&temp, "PhotoBlog", vec![]).await;
    for i in 0..12 {
        add(&engine, &format!("Photo {i}"), &format!("photo-{i}.jpg"), "image/jpeg").await;
    }
    engine
        .api
        .update_settings("", &json!({ "batch_size": 5 }))
        .await
        .unwrap();

    let mut offsets = Vec::new();
    let summary = engine
        .api
        .run_to_completion("", BatchCursor::start(), |resp| offsets.push(resp.offset))
        .await
        .unwrap();
    assert_eq!(summary.calls, 3);
    assert_eq!(summary.processed, 12);
    assert_eq!(offsets, vec![0, 5, 10]);

    let status = report::status(&engine, true, None).await.unwrap();
    assert!(status.assets.is_empty());
    assert_eq!(status.counts.present, 12);
    assert_eq!(engine.audit.entries().unwrap().len(), 12);

    // A second full run finds nothing left to write.
    let again = bulk::run_all(&engine, "", BatchCursor::start(), true).await.unwrap();
    assert_eq!((again.calls, again.fetched, again.processed), (1, 0, 0));
    assert_ne!(again.run, summary.run);
    assert_eq!(engine.audit.entries().unwrap().len(), 12);
}

#[tokio::test]
async fn covered_catalog_only_rescans_new_assets() {
    let temp = tempdir().unwrap();
    let engine = engine_in(&temp, "", vec![]).await;
    for i in 0..12 {
        add(&engine, "", &format!("meadow-{i}.jpg"), "image/jpeg").await;
    }
    engine
        .api
        .update_settings("", &json!({ "batch_size": 5 }))
        .await
        .unwrap();
    let first = bulk::run_all(&engine, "", BatchCursor::start(), true).await.unwrap();
    assert_eq!((first.calls, first.processed), (3, 12));

    let fresh: Vec<AssetId> = vec![
        add(&engine, "Heron", "heron.png", "image/png").await,
        add(&engine, "Otter", "otter.png", "image/png").await,
        add(&engine, "Badger", "badger.png", "image/png").await,
    ];
    let second = bulk::run_all(&engine, "", BatchCursor::start(), true).await.unwrap();
    assert_eq!(
        (second.calls, second.fetched, second.processed, second.skipped),
        (1, 3, 3, 0)
    );
    assert_eq!(alt_of(&engine, fresh[2]).await.as_deref(), Some("Badger"));
}

#[tokio::test]
async fn resumed_run_keeps_its_pages() {
    let temp = tempdir().unwrap();
    let engine = engine_in(&temp, "", vec![]).await;
    for i in 0..7 {
        add(&engine, "", &format!("tide-pool-{i}.jpg"), "image/jpeg").await;
    }
    engine
        .api
        .update_settings("", &json!({ "batch_size": 5 }))
        .await
        .unwrap();

    let first = bulk::run_once(&engine, "", 0, None).await.unwrap();
    assert_eq!((first.count, first.processed), (5, 5));
    assert!(first.more);

    // Continuing with the run id keeps offset 5 pointing at the sixth asset.
    let second = bulk::run_once(&engine, "", first.next_offset as i64, Some(first.run))
        .await
        .unwrap();
    assert_eq!((second.count, second.processed), (2, 2));
    assert_eq!(second.run, first.run);
    assert!(!second.more);

    let status = report::status(&engine, false, None).await.unwrap();
    assert!(status.assets.iter().all(|a| a.status == AltStatus::Present));
}

#[tokio::test]
async fn divisible_catalog_ends_on_empty_page() {
    let temp = tempdir().unwrap();
    let engine = engine_in(&temp, "", vec![]).await;
    for i in 0..10 {
        add(&engine, "", &format!("walk_{i}.png"), "image/png").await;
    }
    engine
        .api
        .update_settings("", &json!({ "batch_size": 5 }))
        .await
        .unwrap();

    let last = bulk::run_once(&engine, "", 10, None).await.unwrap();
    assert_eq!(last.count, 0);
    assert!(!last.more);

    let summary = bulk::run_all(&engine, "", BatchCursor::start(), true).await.unwrap();
    assert_eq!(summary.calls, 3);
    assert_eq!(summary.processed, 10);
}

#[tokio::test]
async fn generation_modes_on_real_catalog() {
    let temp = tempdir().unwrap();
    let engine = engine_in(&temp, "PhotoBlog", vec![]).await;
    let cat = add(&engine, "My Cat", "cat.jpg", "image/jpeg").await;
    let sunset = add(&engine, "", "IMG_2024_sunset-at-beach.jpg", "image/jpeg").await;
    let digits = add(&engine, "", "12345.png", "image/png").await;

    engine
        .api
        .update_settings("", &json!({ "mode": "title_site" }))
        .await
        .unwrap();
    let resp = bulk::run_once(&engine, "", 0, None).await.unwrap();
    assert_eq!(resp.count, 3);
    assert_eq!((resp.processed, resp.skipped), (2, 1));
    assert!(!resp.more);

    assert_eq!(alt_of(&engine, cat).await.as_deref(), Some("My Cat - PhotoBlog"));
    assert_eq!(
        alt_of(&engine, sunset).await.as_deref(),
        Some("Img 2024 Sunset At Beach")
    );
    assert_eq!(alt_of(&engine, digits).await, None);

    let source: Option<String> = sqlx::query("SELECT alt_source FROM assets WHERE id = ?1")
        .bind(cat)
        .fetch_one(engine.catalog.pool())
        .await
        .unwrap()
        .get("alt_source");
    assert_eq!(source.as_deref(), Some("generated"));

    let lines = report::log_tail(&engine, 10).unwrap();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| l.context == "scan"));
}

#[tokio::test]
async fn manual_and_whitespace_alt() {
    let temp = tempdir().unwrap();
    let engine = engine_in(&temp, "", vec![]).await;
    let manual = add(&engine, "Dog", "dog.jpg", "image/jpeg").await;
    let blank = add(&engine, "Bird", "bird.jpg", "image/jpeg").await;
    sqlx::query("UPDATE assets SET alt_text = 'A brown dog', alt_source = 'manual' WHERE id = ?1")
        .bind(manual)
        .execute(engine.catalog.pool())
        .await
        .unwrap();
    sqlx::query("UPDATE assets SET alt_text = '   ' WHERE id = ?1")
        .bind(blank)
        .execute(engine.catalog.pool())
        .await
        .unwrap();

    let resp = bulk::run_once(&engine, "", 0, None).await.unwrap();
    assert_eq!(resp.count, 1);
    assert_eq!(resp.processed, 1);
    assert_eq!(alt_of(&engine, manual).await.as_deref(), Some("A brown dog"));
    assert_eq!(alt_of(&engine, blank).await.as_deref(), Some("Bird"));
}

#[tokio::test]
async fn mime_filter_limits_the_scan() {
    let temp = tempdir().unwrap();
    let engine = engine_in(&temp, "", vec![]).await;
    let png = add(&engine, "Fern", "fern.png", "image/png").await;
    let gif = add(&engine, "Spinner", "spinner.gif", "image/gif").await;
    engine
        .api
        .update_settings("", &json!({ "allowed_mimes": ["image/png", "text/plain"] }))
        .await
        .unwrap();
    let settings = engine.api.settings().await.unwrap();
    assert_eq!(settings.allowed_mimes, vec!["image/png".to_string()]);

    let resp = bulk::run_once(&engine, "", 0, None).await.unwrap();
    assert_eq!(resp.count, 1);
    assert_eq!(alt_of(&engine, png).await.as_deref(), Some("Fern"));
    assert_eq!(alt_of(&engine, gif).await, None);
}

#[tokio::test]
async fn logging_can_be_switched_off() {
    let temp = tempdir().unwrap();
    let engine = engine_in(&temp, "", vec![]).await;
    add(&engine, "Fern", "fern.png", "image/png").await;
    engine
        .api
        .update_settings("", &json!({ "enable_logging": false }))
        .await
        .unwrap();

    let resp = bulk::run_once(&engine, "", 0, None).await.unwrap();
    assert_eq!(resp.processed, 1);
    assert!(report::log_tail(&engine, 10).unwrap().is_empty());
}

#[tokio::test]
async fn authorization_and_validation() {
    let temp = tempdir().unwrap();
    let engine = engine_in(
        &temp,
        "",
        vec![
            TokenGrant {
                token: "admin".into(),
                capabilities: vec![Capability::ManageOptions, Capability::UploadFiles],
            },
            TokenGrant {
                token: "author".into(),
                capabilities: vec![Capability::UploadFiles],
            },
        ],
    )
    .await;
    let id = add(&engine, "Fern", "fern.png", "image/png").await;

    let err = bulk::run_once(&engine, "author", 0, None).await.unwrap_err();
    assert!(matches!(err, ApiError::Auth(_)));
    assert_eq!(err.body().error, "permission");
    assert_eq!(err.status(), 403);

    let err = bulk::run_once(&engine, "nope", 0, None).await.unwrap_err();
    assert_eq!(err.code(), "invalid_token");
    assert_eq!(err.status(), 401);

    // Unauthorized callers learn nothing about the request itself.
    let err = bulk::run_once(&engine, "author", -5, None).await.unwrap_err();
    assert_eq!(err.code(), "permission");

    let err = bulk::run_once(&engine, "admin", -5, None).await.unwrap_err();
    assert_eq!(err.code(), "invalid_request");
    assert_eq!(err.status(), 400);

    let err = bulk::select(&engine, "nope", vec![id]).await.unwrap_err();
    assert_eq!(err.selection_code(), "perm");

    let err = engine
        .api
        .update_settings("author", &json!({ "batch_size": 10 }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "permission");

    assert_eq!(alt_of(&engine, id).await, None);

    let resp = bulk::select(&engine, "author", vec![id]).await.unwrap();
    assert_eq!((resp.processed, resp.skipped), (1, 0));
    assert_eq!(report::log_tail(&engine, 1).unwrap()[0].context, "bulk");
}

#[tokio::test]
async fn selection_reports_counts() {
    let temp = tempdir().unwrap();
    let engine = engine_in(&temp, "", vec![]).await;
    let a = add(&engine, "Fern", "fern.png", "image/png").await;
    let b = add(&engine, "", "12345.png", "image/png").await;

    let resp = bulk::select(&engine, "", vec![a, b, 4242]).await.unwrap();
    assert_eq!((resp.processed, resp.skipped), (1, 2));

    let empty = bulk::select(&engine, "", vec![]).await.unwrap();
    assert_eq!((empty.processed, empty.skipped), (0, 0));

    let err = bulk::select(&engine, "", vec![a, 0]).await.unwrap_err();
    assert_eq!(err.selection_code(), "invalid_request");
}

#[tokio::test]
async fn settings_persist_across_engines() {
    let temp = tempdir().unwrap();
    {
        let engine = engine_in(&temp, "", vec![]).await;
        let settings = engine
            .api
            .update_settings("", &json!({ "batch_size": 1000, "mode": "filename_clean" }))
            .await
            .unwrap();
        assert_eq!(settings.batch_size, 200);
    }
    let engine = engine_in(&temp, "", vec![]).await;
    let settings = engine.api.settings().await.unwrap();
    assert_eq!(settings.batch_size, 200);
    assert_eq!(settings.mode.as_str(), "filename_clean");
}
