//! Default windowed transform: Hann-windowed STFT and overlap-add ISTFT.

use ndarray::Array2;
use num_complex::Complex32;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use crate::dsp::StftParams;
use crate::error::{Error, Result};

/// Forward/inverse transform pair for one geometry. Plans are cached on
/// construction and reused across frames.
pub struct Stft {
    params: StftParams,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
}

/// Periodic Hann window of length `len`.
fn hann(len: usize) -> Vec<f32> {
    let n = len as f32;
    (0..len)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / n).cos())
        .collect()
}

impl Stft {
    pub fn new(params: &StftParams) -> Result<Self> {
        if params.fft_size == 0 {
            return Err(Error::InvalidParameter {
                name: "fft_size",
                value: "0".to_string(),
                reason: "must be > 0",
            });
        }
        if params.hop() == 0 {
            return Err(Error::InvalidParameter {
                name: "hop_size",
                value: "0".to_string(),
                reason: "must be > 0",
            });
        }
        if params.window() > params.fft_size {
            return Err(Error::InvalidParameter {
                name: "window_size",
                value: params.window().to_string(),
                reason: "must not exceed fft_size",
            });
        }

        let mut planner = FftPlanner::new();
        Ok(Self {
            params: *params,
            forward: planner.plan_fft_forward(params.fft_size),
            inverse: planner.plan_fft_inverse(params.fft_size),
            window: hann(params.window()),
        })
    }

    /// Complex spectrogram, shaped (frames x bins). Frames past the end of
    /// the signal are zero-padded.
    pub fn forward(&self, samples: &[f32]) -> Array2<Complex32> {
        let hop = self.params.hop();
        let win_len = self.params.window();
        let bins = self.params.bins();
        let frames = self.params.frames(samples.len());

        let mut out = Array2::from_elem((frames, bins), Complex32::new(0.0, 0.0));
        let mut buffer = vec![Complex32::new(0.0, 0.0); self.params.fft_size];

        for t in 0..frames {
            let offset = t * hop;
            buffer.fill(Complex32::new(0.0, 0.0));
            for j in 0..win_len {
                if let Some(&s) = samples.get(offset + j) {
                    buffer[j] = Complex32::new(s * self.window[j], 0.0);
                }
            }
            self.forward.process(&mut buffer);
            for b in 0..bins {
                out[(t, b)] = buffer[b];
            }
        }

        out
    }

    /// Overlap-add inverse, forced to exactly `length` samples.
    pub fn inverse(&self, spectrum: &Array2<Complex32>, length: usize) -> Vec<f32> {
        let frames = spectrum.nrows();
        let bins = spectrum.ncols();
        let n_fft = self.params.fft_size;
        let hop = self.params.hop();
        let win_len = self.params.window();

        let mut signal = vec![0.0f32; frames.saturating_sub(1) * hop + n_fft];
        let mut window_sums = vec![0.0f32; signal.len()];
        let mut buffer = vec![Complex32::new(0.0, 0.0); n_fft];
        let scale = 1.0 / n_fft as f32;

        for t in 0..frames {
            buffer.fill(Complex32::new(0.0, 0.0));
            for b in 0..bins.min(n_fft / 2 + 1) {
                buffer[b] = spectrum[(t, b)];
            }
            // conjugate symmetry for the real-signal inverse
            for b in 1..n_fft / 2 {
                buffer[n_fft - b] = buffer[b].conj();
            }
            self.inverse.process(&mut buffer);

            let offset = t * hop;
            for j in 0..win_len {
                signal[offset + j] += buffer[j].re * scale * self.window[j];
                window_sums[offset + j] += self.window[j] * self.window[j];
            }
        }

        for (s, w) in signal.iter_mut().zip(window_sums.iter()) {
            if *w > 1e-8 {
                *s /= *w;
            }
        }

        signal.resize(length, 0.0);
        signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::magnitude;

    #[test]
    fn test_forward_shape() {
        let params = StftParams::new(512);
        let stft = Stft::new(&params).unwrap();
        let samples = vec![0.25f32; 2000];

        let spec = stft.forward(&samples);
        assert_eq!(spec.nrows(), params.frames(2000));
        assert_eq!(spec.ncols(), 257);
    }

    #[test]
    fn test_inverse_length_forcing() {
        let params = StftParams::new(256);
        let stft = Stft::new(&params).unwrap();
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 * 0.05).sin()).collect();

        let spec = stft.forward(&samples);
        let out = stft.inverse(&spec, samples.len());
        assert_eq!(out.len(), samples.len());

        let longer = stft.inverse(&spec, 5000);
        assert_eq!(longer.len(), 5000);
    }

    #[test]
    fn test_round_trip_preserves_signal_interior() {
        let params = StftParams::new(256);
        let stft = Stft::new(&params).unwrap();
        let samples: Vec<f32> = (0..4096).map(|i| (i as f32 * 0.03).sin() * 0.5).collect();

        let spec = stft.forward(&samples);
        let out = stft.inverse(&spec, samples.len());

        // edges suffer from partial windows; the interior should match
        for i in 512..3500 {
            assert!(
                (out[i] - samples[i]).abs() < 1e-2,
                "sample {} diverged: {} vs {}",
                i,
                out[i],
                samples[i]
            );
        }
    }

    #[test]
    fn test_tone_concentrates_energy() {
        // bin = freq * n_fft / sr; pick an exact bin frequency
        let params = StftParams::new(512);
        let stft = Stft::new(&params).unwrap();
        let sr = 8192.0f32;
        let freq = 16.0 * sr / 512.0;
        let samples: Vec<f32> = (0..8192)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr).sin())
            .collect();

        let mag = magnitude(&stft.forward(&samples));
        let mid = mag.nrows() / 2;
        let row = mag.row(mid);
        let peak = row
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(b, _)| b)
            .unwrap();
        assert_eq!(peak, 16);
    }

    #[test]
    fn test_invalid_geometry_rejected() {
        assert!(Stft::new(&StftParams {
            fft_size: 512,
            window_size: Some(1024),
            hop_size: None,
        })
        .is_err());
        assert!(Stft::new(&StftParams {
            fft_size: 512,
            window_size: None,
            hop_size: Some(0),
        })
        .is_err());
    }
}
