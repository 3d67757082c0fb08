use ai::{create_embedder, EmbedderKind, EmbeddingConfig, EmbeddingError, ImageEmbedder};
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let mut bytes = Vec::new();
    RgbImage::from_pixel(width, height, Rgb(color))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[test]
fn test_default_config_builds_histogram_embedder() {
    let embedder = create_embedder(&EmbeddingConfig::default()).unwrap();
    assert_eq!(embedder.name(), "color-histogram");
    assert_eq!(embedder.dimension(), 512);

    let v = embedder.embed(&png_bytes(40, 30, [12, 200, 90])).unwrap();
    assert_eq!(v.len(), 512);
    assert!((norm(&v) - 1.0).abs() < 1e-5);
}

#[test]
fn test_resolution_does_not_change_solid_colour_embedding() {
    let embedder = create_embedder(&EmbeddingConfig::default()).unwrap();
    let small = embedder.embed(&png_bytes(8, 8, [180, 40, 40])).unwrap();
    let large = embedder.embed(&png_bytes(300, 120, [180, 40, 40])).unwrap();
    assert_eq!(small, large);
}

#[test]
fn test_embedding_is_deterministic() {
    for kind in [EmbedderKind::ColorHistogram, EmbedderKind::Hash] {
        let config = EmbeddingConfig {
            kind,
            ..EmbeddingConfig::default()
        };
        let embedder = create_embedder(&config).unwrap();
        let bytes = png_bytes(20, 20, [1, 2, 3]);
        assert_eq!(embedder.embed(&bytes).unwrap(), embedder.embed(&bytes).unwrap());
    }
}

#[test]
fn test_hash_embedder_from_config() {
    let config = EmbeddingConfig {
        kind: EmbedderKind::Hash,
        hash_dimension: 100,
        ..EmbeddingConfig::default()
    };
    let embedder = create_embedder(&config).unwrap();
    assert_eq!(embedder.name(), "hash");

    let v = embedder.embed(b"any bytes at all").unwrap();
    assert_eq!(v.len(), 100);
    assert!((norm(&v) - 1.0).abs() < 1e-5);
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = EmbeddingConfig {
        bins_per_channel: 1,
        ..EmbeddingConfig::default()
    };
    assert!(matches!(
        create_embedder(&config),
        Err(EmbeddingError::Config { .. })
    ));
}

#[test]
fn test_embed_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shoe.png");
    std::fs::write(&path, png_bytes(10, 10, [90, 90, 90])).unwrap();

    let embedder = create_embedder(&EmbeddingConfig::default()).unwrap();
    let from_file = embedder.embed_file(&path).unwrap();
    let from_bytes = embedder.embed(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(from_file, from_bytes);

    let err = embedder.embed_file(&dir.path().join("missing.png")).unwrap_err();
    assert!(matches!(err, EmbeddingError::Read { .. }));
}

#[test]
fn test_truncated_png_is_decode_error() {
    let embedder = create_embedder(&EmbeddingConfig::default()).unwrap();
    let bytes = png_bytes(32, 32, [5, 6, 7]);
    let err = embedder.embed(&bytes[..bytes.len() / 3]).unwrap_err();
    assert!(matches!(err, EmbeddingError::Decode { .. }));
}
