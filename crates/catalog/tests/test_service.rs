use ai::{EmbedderKind, EmbeddingConfig, HashEmbedder};
use catalog::{
    mirror_images, CatalogConfig, CatalogError, EmbeddingVector, HealthStatus, RecommenderService, StoreManager,
};
use image::{ImageFormat, Rgb, RgbImage};
use std::path::Path;
use std::sync::Arc;

fn write_png(dir: &Path, name: &str, color: [u8; 3]) {
    RgbImage::from_pixel(24, 24, Rgb(color))
        .save_with_format(dir.join(name), ImageFormat::Png)
        .unwrap();
}

/// Left half `left`, right half `right`
fn write_split_png(dir: &Path, name: &str, left: [u8; 3], right: [u8; 3]) {
    RgbImage::from_fn(24, 24, |x, _| if x < 12 { Rgb(left) } else { Rgb(right) })
        .save_with_format(dir.join(name), ImageFormat::Png)
        .unwrap();
}

fn config_in(root: &Path) -> CatalogConfig {
    CatalogConfig {
        artifact_path: root.join("artifacts").join("catalog.bin"),
        source_dir: root.join("images"),
        static_dir: root.join("static").join("images"),
        embedding: EmbeddingConfig {
            bins_per_channel: 4,
            input_size: 32,
            ..EmbeddingConfig::default()
        },
        ..CatalogConfig::default()
    }
}

fn seed_images(dir: &Path) {
    std::fs::create_dir_all(dir).unwrap();
    write_png(dir, "red.png", [250, 10, 10]);
    write_png(dir, "green.png", [10, 250, 10]);
    write_png(dir, "blue.png", [10, 10, 250]);
    write_split_png(dir, "red_blue.png", [250, 10, 10], [10, 10, 250]);
}

#[tokio::test]
async fn test_startup_without_artifact_is_degraded() {
    let root = tempfile::tempdir().unwrap();
    let service = RecommenderService::from_config(&config_in(root.path())).unwrap();

    let health = service.health();
    assert_eq!(health.status, HealthStatus::Degraded);
    assert_eq!(health.entries, 0);
    assert!(health.last_reload_error.is_some());

    let query = EmbeddingVector::normalized(vec![1.0; 64]).unwrap();
    let result = service.recommend(&query, 6).unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_rebuild_then_recommend_image() {
    let root = tempfile::tempdir().unwrap();
    let config = config_in(root.path());
    seed_images(&config.source_dir);

    let service = RecommenderService::from_config(&config).unwrap();
    let version = service.rebuild_catalog(&config.source_dir, None).await.unwrap();
    assert_eq!(service.manager().version(), version);
    assert!(config.artifact_path.exists());

    let upload = std::fs::read(config.source_dir.join("red.png")).unwrap();
    let result = service.recommend_image(&upload, 2).unwrap();

    assert_eq!(result.file_names(), vec!["red.png", "red_blue.png"]);
    assert!((result.matches[0].score - 1.0).abs() < 1e-4);
    assert_eq!(result.store_version, version);

    let health = service.health();
    assert_eq!(health.status, HealthStatus::Healthy);
    assert_eq!(health.entries, 4);
    assert_eq!(health.dimension, 64);
    assert_eq!(health.embedder.as_deref(), Some("color-histogram"));
    assert_eq!(health.queries_served, 1);
}

#[tokio::test]
async fn test_undecodable_upload_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let config = config_in(root.path());
    seed_images(&config.source_dir);

    let service = RecommenderService::from_config(&config).unwrap();
    service.rebuild_catalog(&config.source_dir, None).await.unwrap();

    let err = service.recommend_image(b"plain text", 3).unwrap_err();
    assert!(matches!(err, CatalogError::Embedding(_)));
    assert_eq!(service.health().queries_failed, 1);
}

#[tokio::test]
async fn test_failed_rebuild_keeps_serving_previous_catalog() {
    let root = tempfile::tempdir().unwrap();
    let config = config_in(root.path());
    seed_images(&config.source_dir);

    let service = RecommenderService::from_config(&config).unwrap();
    let version = service.rebuild_catalog(&config.source_dir, None).await.unwrap();

    std::fs::write(config.source_dir.join("zz_broken.png"), b"not a png").unwrap();
    let err = service.rebuild_catalog(&config.source_dir, None).await.unwrap_err();
    assert!(matches!(err, CatalogError::Ingestion { .. }));

    assert_eq!(service.manager().version(), version);
    let on_disk = catalog::FeatureStore::load(&config.artifact_path).unwrap();
    assert_eq!(on_disk.version(), version);
    assert_eq!(service.health().status, HealthStatus::Healthy);
}

#[tokio::test]
async fn test_zero_k_is_invalid() {
    let root = tempfile::tempdir().unwrap();
    let config = config_in(root.path());
    let service = RecommenderService::new(&config, Arc::new(HashEmbedder::new(8)), Arc::new(StoreManager::new()));

    let query = EmbeddingVector::normalized(vec![1.0; 8]).unwrap();
    assert!(matches!(
        service.recommend(&query, 0),
        Err(CatalogError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_score_threshold_filters_matches() {
    let root = tempfile::tempdir().unwrap();
    let mut config = config_in(root.path());
    config.score_threshold = Some(0.99);
    seed_images(&config.source_dir);

    let service = RecommenderService::from_config(&config).unwrap();
    service.rebuild_catalog(&config.source_dir, None).await.unwrap();

    let upload = std::fs::read(config.source_dir.join("green.png")).unwrap();
    let result = service.recommend_image(&upload, 6).unwrap();
    assert_eq!(result.file_names(), vec!["green.png"]);
}

#[tokio::test]
async fn test_hash_embedder_config() {
    let root = tempfile::tempdir().unwrap();
    let mut config = config_in(root.path());
    config.embedding.kind = EmbedderKind::Hash;
    config.embedding.hash_dimension = 32;
    seed_images(&config.source_dir);

    let service = RecommenderService::from_config(&config).unwrap();
    service.rebuild_catalog(&config.source_dir, None).await.unwrap();

    let upload = std::fs::read(config.source_dir.join("blue.png")).unwrap();
    let result = service.recommend_image(&upload, 1).unwrap();
    assert_eq!(result.file_names(), vec!["blue.png"]);
    assert_eq!(service.health().dimension, 32);
}

#[tokio::test]
async fn test_mirror_after_rebuild() {
    let root = tempfile::tempdir().unwrap();
    let config = config_in(root.path());
    seed_images(&config.source_dir);

    let service = RecommenderService::from_config(&config).unwrap();
    service.rebuild_catalog(&config.source_dir, None).await.unwrap();

    let report = mirror_images(&service.manager().current(), &config.static_dir).unwrap();
    assert_eq!(report.copied, 4);
    assert!(report.missing.is_empty());
    assert!(config.static_dir.join("red_blue.png").is_file());

    let again = mirror_images(&service.manager().current(), &config.static_dir).unwrap();
    assert_eq!(again.copied, 0);
    assert_eq!(again.already_present, 4);
}
