use crate::embeddings::{l2_normalize, ImageEmbedder};
use common::{EmbeddingError, EmbeddingResult};
use image::imageops::FilterType;
use tracing::debug;

/// Colour-distribution feature extractor.
///
/// Decodes the image, converts it to RGB, resizes it to a fixed square
/// resolution and counts pixels in a joint RGB histogram with
/// `bins_per_channel^3` cells. The histogram is L2-normalized, so the dot
/// product of two embeddings is their cosine similarity.
#[derive(Debug, Clone)]
pub struct ColorHistogramEmbedder {
    input_size: u32,
    bins_per_channel: u32,
}

impl ColorHistogramEmbedder {
    pub fn new(input_size: u32, bins_per_channel: u32) -> EmbeddingResult<Self> {
        if input_size == 0 || !(2..=64).contains(&bins_per_channel) {
            return Err(EmbeddingError::Config {
                reason: format!(
                    "input_size={} bins_per_channel={} is not a valid histogram shape",
                    input_size, bins_per_channel
                ),
            });
        }

        Ok(Self {
            input_size,
            bins_per_channel,
        })
    }

    fn bin(&self, channel: u8) -> usize {
        (channel as usize * self.bins_per_channel as usize) / 256
    }
}

impl ImageEmbedder for ColorHistogramEmbedder {
    fn name(&self) -> &'static str {
        "color-histogram"
    }

    fn dimension(&self) -> usize {
        (self.bins_per_channel as usize).pow(3)
    }

    fn embed(&self, image_bytes: &[u8]) -> EmbeddingResult<Vec<f32>> {
        let decoded = image::load_from_memory(image_bytes).map_err(|e| EmbeddingError::Decode {
            reason: e.to_string(),
        })?;

        let rgb = decoded
            .resize_exact(self.input_size, self.input_size, FilterType::Triangle)
            .to_rgb8();

        let bins = self.bins_per_channel as usize;
        let mut histogram = vec![0f32; self.dimension()];
        for pixel in rgb.pixels() {
            let [r, g, b] = pixel.0;
            let cell = (self.bin(r) * bins + self.bin(g)) * bins + self.bin(b);
            histogram[cell] += 1.0;
        }

        debug!(
            width = decoded.width(),
            height = decoded.height(),
            dimension = histogram.len(),
            "Extracted colour histogram"
        );

        l2_normalize(&mut histogram)?;
        Ok(histogram)
    }
}
