//! Default onset detector: half-wave-rectified spectral flux with a mean
//! filter and threshold peak-picking.

use serde::{Deserialize, Serialize};

use crate::dsp::stft::Stft;
use crate::dsp::{magnitude, OnsetDetector, StftParams};
use crate::error::{Error, Result};

/// Detection parameters. `min_slice_length` is the minimum gap between
/// reported onsets, in analysis frames.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OnsetConfig {
    pub threshold: f32,
    pub filter_size: usize,
    pub min_slice_length: usize,
    pub stft: StftParams,
}

impl Default for OnsetConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            filter_size: 5,
            min_slice_length: 2,
            stft: StftParams::new(1024),
        }
    }
}

pub struct FluxOnsetDetector;

impl OnsetDetector for FluxOnsetDetector {
    fn detect(&self, samples: &[f32], config: &OnsetConfig) -> Result<Vec<u64>> {
        if config.filter_size == 0 {
            return Err(Error::InvalidParameter {
                name: "filter_size",
                value: "0".to_string(),
                reason: "must be a positive integer",
            });
        }

        let stft = Stft::new(&config.stft)?;
        let mag = magnitude(&stft.forward(samples));
        let frames = mag.nrows();
        let hop = config.stft.hop() as u64;

        // rectified spectral flux per frame
        let mut flux = vec![0.0f32; frames];
        for t in 1..frames {
            let mut sum = 0.0;
            for b in 0..mag.ncols() {
                let d = mag[(t, b)] - mag[(t - 1, b)];
                if d > 0.0 {
                    sum += d;
                }
            }
            flux[t] = sum;
        }

        let smoothed = mean_filter(&flux, config.filter_size);

        let peak = smoothed.iter().cloned().fold(0.0f32, f32::max);
        if peak <= 0.0 {
            return Ok(Vec::new());
        }

        // normalized threshold peak-picking with a minimum inter-onset gap
        let mut onsets = Vec::new();
        let mut last_frame: Option<usize> = None;
        for t in 0..frames {
            let value = smoothed[t] / peak;
            if value < config.threshold {
                continue;
            }
            let rising = t == 0 || smoothed[t] >= smoothed[t - 1];
            let falling = t + 1 >= frames || smoothed[t] > smoothed[t + 1];
            if !(rising && falling) {
                continue;
            }
            if let Some(prev) = last_frame {
                if t - prev < config.min_slice_length {
                    continue;
                }
            }
            last_frame = Some(t);
            onsets.push(t as u64 * hop);
        }

        Ok(onsets)
    }
}

/// Centered moving mean; `size` is clamped to odd.
fn mean_filter(values: &[f32], size: usize) -> Vec<f32> {
    if size <= 1 {
        return values.to_vec();
    }
    let half = size / 2;
    let n = values.len();
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(n);
            values[lo..hi].iter().sum::<f32>() / (hi - lo) as f32
        })
        .collect()
}
