//! Numeric kernel seam.
//!
//! The analysis and separation layers talk to the windowed transform, the
//! matrix factorization, and the onset detector through the traits below,
//! so they can be swapped for another backend (or a counting stub in
//! tests). [`stft`], [`nmf`], and [`onset`] provide the default
//! implementations.

pub mod nmf;
pub mod onset;
pub mod stft;

use ndarray::Array2;
use num_complex::Complex32;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use onset::{FluxOnsetDetector, OnsetConfig};
pub use stft::Stft;

/// Transform geometry. Window and hop default to `fft_size` and
/// `fft_size / 2` when unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StftParams {
    pub fft_size: usize,
    #[serde(default)]
    pub window_size: Option<usize>,
    #[serde(default)]
    pub hop_size: Option<usize>,
}

impl StftParams {
    pub fn new(fft_size: usize) -> Self {
        Self {
            fft_size,
            window_size: None,
            hop_size: None,
        }
    }

    pub fn window(&self) -> usize {
        self.window_size.unwrap_or(self.fft_size)
    }

    pub fn hop(&self) -> usize {
        self.hop_size.unwrap_or(self.fft_size / 2)
    }

    pub fn bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Frame count for a signal of `num_samples` samples. The exact
    /// rounding here determines every downstream matrix shape.
    pub fn frames(&self, num_samples: usize) -> usize {
        (num_samples + self.hop()) / self.hop()
    }
}

impl Default for StftParams {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// A factorization of a magnitude spectrogram: `bases` is
/// (components x bins), `activations` is (frames x components).
#[derive(Debug, Clone)]
pub struct Factorization {
    pub bases: Array2<f32>,
    pub activations: Array2<f32>,
    pub converged: bool,
}

impl Factorization {
    pub fn component_count(&self) -> usize {
        self.bases.nrows()
    }
}

/// The four numeric primitives consumed by analysis and separation.
pub trait SpectralKernel: Send + Sync {
    /// Complex spectrogram of `samples`, shaped (frames x bins).
    fn forward(&self, samples: &[f32], params: &StftParams) -> Result<Array2<Complex32>>;

    /// Time-domain signal of exactly `length` samples.
    fn inverse(
        &self,
        spectrum: &Array2<Complex32>,
        params: &StftParams,
        length: usize,
    ) -> Result<Vec<f32>>;

    /// Factorize a (frames x bins) magnitude spectrogram into
    /// `components` non-negative parts.
    fn factorize(
        &self,
        magnitude: &Array2<f32>,
        components: usize,
        iterations: usize,
        seed: i64,
    ) -> Result<Factorization>;

    /// Magnitude estimate (frames x bins) for one component.
    fn estimate_component(
        &self,
        factorization: &Factorization,
        component_index: usize,
    ) -> Result<Array2<f32>>;
}

/// Onset detection over a raw signal, reporting onset positions in
/// samples, ascending.
pub trait OnsetDetector: Send + Sync {
    fn detect(&self, samples: &[f32], config: &OnsetConfig) -> Result<Vec<u64>>;
}

/// Elementwise magnitude of a complex spectrogram.
pub fn magnitude(spectrum: &Array2<Complex32>) -> Array2<f32> {
    spectrum.mapv(|c| c.norm())
}

/// The built-in kernel: Hann STFT + multiplicative-update NMF.
pub struct DefaultKernel;

impl SpectralKernel for DefaultKernel {
    fn forward(&self, samples: &[f32], params: &StftParams) -> Result<Array2<Complex32>> {
        Ok(Stft::new(params)?.forward(samples))
    }

    fn inverse(
        &self,
        spectrum: &Array2<Complex32>,
        params: &StftParams,
        length: usize,
    ) -> Result<Vec<f32>> {
        Ok(Stft::new(params)?.inverse(spectrum, length))
    }

    fn factorize(
        &self,
        magnitude: &Array2<f32>,
        components: usize,
        iterations: usize,
        seed: i64,
    ) -> Result<Factorization> {
        nmf::factorize(magnitude, components, iterations, seed)
    }

    fn estimate_component(
        &self,
        factorization: &Factorization,
        component_index: usize,
    ) -> Result<Array2<f32>> {
        nmf::estimate_component(factorization, component_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_sizes() {
        let p = StftParams::new(1024);
        assert_eq!(p.window(), 1024);
        assert_eq!(p.hop(), 512);
        assert_eq!(p.bins(), 513);
    }

    #[test]
    fn test_explicit_sizes_override() {
        let p = StftParams {
            fft_size: 2048,
            window_size: Some(1024),
            hop_size: Some(256),
        };
        assert_eq!(p.window(), 1024);
        assert_eq!(p.hop(), 256);
        assert_eq!(p.bins(), 1025);
    }

    #[test]
    fn test_frame_count_rule() {
        // frames = floor((n + hop) / hop)
        let p = StftParams::new(1024);
        assert_eq!(p.frames(0), 1);
        assert_eq!(p.frames(512), 2);
        assert_eq!(p.frames(1000), 2);
        assert_eq!(p.frames(1024), 3);
        assert_eq!(p.frames(44100), 87);
    }
}
