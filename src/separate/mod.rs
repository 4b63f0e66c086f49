//! Ratio-mask component separation.
//!
//! Given an NMF feature, each component is isolated by masking the
//! mixture's complex spectrogram with `est_k / sum(est_c)` and inverting
//! back to audio. The forward transform and the full-mix magnitude
//! reference are computed once per batch, not per component. Phase is
//! taken from the mixture; the mask only scales magnitudes.

use ndarray::Array2;
use num_complex::Complex32;
use std::sync::{Arc, Mutex};

use crate::analysis::{FeatureType, NmfOptions, NmfPayload};
use crate::dsp::{Factorization, SpectralKernel, StftParams};
use crate::error::{Error, Result};
use crate::store::{short_hash, FeatureRow, SampleBank, SampleRow};

/// Result of a bulk separation: one stored component row per NMF
/// component, indices covering `0..component_count`.
#[derive(Debug, Clone)]
pub struct SeparationOutcome {
    pub feature_id: i64,
    pub component_ids: Vec<i64>,
}

pub struct Separator {
    store: Arc<Mutex<SampleBank>>,
    kernel: Arc<dyn SpectralKernel>,
}

impl Separator {
    pub fn new(store: Arc<Mutex<SampleBank>>, kernel: Arc<dyn SpectralKernel>) -> Self {
        Self { store, kernel }
    }

    /// Resynthesize and persist every component of the sample's most
    /// recent NMF feature.
    pub fn separate_all(&self, sample_hash: &str) -> Result<SeparationOutcome> {
        let (sample, feature, options, payload) = self.load_context(sample_hash)?;
        let batch = self.prepare_batch(&sample, &options, &payload)?;

        let mut component_ids = Vec::with_capacity(payload.components);
        for k in 0..payload.components {
            let pcm = self
                .resynthesize(&sample, &batch, k)
                .map_err(|e| batch_error(&sample.hash, k, e))?;
            let id = self
                .store
                .lock()
                .unwrap()
                .store_component(&sample.hash, feature.id, k, &pcm)?;
            component_ids.push(id);
        }

        Ok(SeparationOutcome {
            feature_id: feature.id,
            component_ids,
        })
    }

    /// Resynthesize a single component, persisting it and returning the
    /// audio.
    pub fn separate_component(&self, sample_hash: &str, component_index: usize) -> Result<Vec<f32>> {
        let (sample, feature, options, payload) = self.load_context(sample_hash)?;
        if component_index >= payload.components {
            return Err(Error::ComponentIndexOutOfRange {
                index: component_index,
                count: payload.components,
            });
        }

        let batch = self.prepare_batch(&sample, &options, &payload)?;
        let pcm = self.resynthesize(&sample, &batch, component_index)?;
        self.store
            .lock()
            .unwrap()
            .store_component(&sample.hash, feature.id, component_index, &pcm)?;
        Ok(pcm)
    }

    fn load_context(
        &self,
        sample_hash: &str,
    ) -> Result<(SampleRow, FeatureRow, NmfOptions, NmfPayload)> {
        let store = self.store.lock().unwrap();
        let sample = store
            .sample(sample_hash)?
            .ok_or_else(|| Error::SampleNotFound {
                query: sample_hash.to_string(),
            })?;
        let feature = store
            .latest_feature(Some(sample_hash), Some(FeatureType::Nmf))?
            .ok_or_else(|| Error::NoAnalysisFound {
                sample: short_hash(sample_hash).to_string(),
                feature_type: FeatureType::Nmf,
            })?;
        drop(store);

        let options: NmfOptions = serde_json::from_str(&feature.options)?;
        let payload: NmfPayload = serde_json::from_str(&feature.payload)?;
        Ok((sample, feature, options, payload))
    }

    /// The per-batch work shared by every component: one forward transform
    /// and one full-mix magnitude reference.
    fn prepare_batch(
        &self,
        sample: &SampleRow,
        options: &NmfOptions,
        payload: &NmfPayload,
    ) -> Result<Batch> {
        let params = options.stft_params();
        let spectrum = self
            .kernel
            .forward(&sample.pcm, &params)
            .map_err(|e| transform_error("forward transform", &sample.hash, e))?;

        let factorization = payload.to_factorization(spectrum.nrows(), spectrum.ncols());

        let mut full_magnitude = Array2::<f32>::zeros(spectrum.dim());
        for k in 0..payload.components {
            let est = self.kernel.estimate_component(&factorization, k)?;
            full_magnitude += &est;
        }

        Ok(Batch {
            params,
            spectrum,
            full_magnitude,
            factorization,
        })
    }

    fn resynthesize(&self, sample: &SampleRow, batch: &Batch, component_index: usize) -> Result<Vec<f32>> {
        let est = self
            .kernel
            .estimate_component(&batch.factorization, component_index)?;

        // ratio mask; a zero full-mix bin masks to silence, never NaN
        let mut masked = batch.spectrum.clone();
        ndarray::Zip::from(&mut masked)
            .and(&est)
            .and(&batch.full_magnitude)
            .for_each(|bin, &target, &full| {
                *bin = if full > 0.0 {
                    *bin * (target / full)
                } else {
                    Complex32::new(0.0, 0.0)
                };
            });

        self.kernel
            .inverse(&masked, &batch.params, sample.pcm.len())
            .map_err(|e| transform_error("inverse transform", &sample.hash, e))
    }
}

struct Batch {
    params: StftParams,
    spectrum: Array2<Complex32>,
    full_magnitude: Array2<f32>,
    factorization: Factorization,
}

fn transform_error(op: &'static str, sample_hash: &str, e: Error) -> Error {
    match e {
        Error::InvalidParameter { .. } => e,
        other => Error::Computation {
            op,
            sample: short_hash(sample_hash).to_string(),
            message: other.to_string(),
        },
    }
}

fn batch_error(sample_hash: &str, component_index: usize, e: Error) -> Error {
    match e {
        Error::Computation { op, sample, message } => Error::Computation {
            op,
            sample,
            message: format!("component {}: {}", component_index, message),
        },
        other => other,
    }
}
