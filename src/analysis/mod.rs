//! Feature analysis orchestration.
//!
//! `Analyzer` runs an NMF or onset-slice analysis against a stored sample.
//! The expensive kernels are skipped entirely when a feature with the same
//! sample, type, and options already exists, and concurrent calls for the
//! same input are collapsed to a single computation (mutex per input
//! digest).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ndarray::Array2;

use crate::dsp::{magnitude, Factorization, OnsetConfig, OnsetDetector, SpectralKernel, StftParams};
use crate::error::{Error, Result};
use crate::store::{short_hash, FeatureRow, SampleBank, SampleRow};

/// Tag distinguishing the two analysis families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureType {
    Nmf,
    OnsetSlice,
}

impl FeatureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureType::Nmf => "nmf",
            FeatureType::OnsetSlice => "onset-slice",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "nmf" => Some(FeatureType::Nmf),
            "onset-slice" => Some(FeatureType::OnsetSlice),
            _ => None,
        }
    }
}

impl std::fmt::Display for FeatureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// OPTIONS
// ============================================

/// NMF analysis options. Closed struct with explicit defaults so the
/// serialized form, and therefore the feature hash, is stable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NmfOptions {
    #[serde(default = "default_components")]
    pub components: usize,
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    /// Unset means "derive from fft_size".
    #[serde(default)]
    pub window_size: Option<usize>,
    /// Unset means "fft_size / 2".
    #[serde(default)]
    pub hop_size: Option<usize>,
    #[serde(default = "default_seed")]
    pub seed: i64,
}

/// Onset-slice analysis options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OnsetOptions {
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default = "default_filter_size")]
    pub filter_size: usize,
    #[serde(default = "default_min_slice_length")]
    pub min_slice_length: usize,
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default)]
    pub window_size: Option<usize>,
    #[serde(default)]
    pub hop_size: Option<usize>,
}

fn default_components() -> usize {
    1
}
fn default_iterations() -> usize {
    100
}
fn default_fft_size() -> usize {
    1024
}
fn default_seed() -> i64 {
    -1
}
fn default_threshold() -> f32 {
    0.5
}
fn default_filter_size() -> usize {
    5
}
fn default_min_slice_length() -> usize {
    2
}

impl Default for NmfOptions {
    fn default() -> Self {
        Self {
            components: default_components(),
            iterations: default_iterations(),
            fft_size: default_fft_size(),
            window_size: None,
            hop_size: None,
            seed: default_seed(),
        }
    }
}

impl Default for OnsetOptions {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            filter_size: default_filter_size(),
            min_slice_length: default_min_slice_length(),
            fft_size: default_fft_size(),
            window_size: None,
            hop_size: None,
        }
    }
}

impl NmfOptions {
    pub fn stft_params(&self) -> StftParams {
        StftParams {
            fft_size: self.fft_size,
            window_size: self.window_size,
            hop_size: self.hop_size,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.components == 0 {
            return Err(Error::InvalidParameter {
                name: "components",
                value: "0".to_string(),
                reason: "must be a positive integer",
            });
        }
        if self.iterations == 0 {
            return Err(Error::InvalidParameter {
                name: "iterations",
                value: "0".to_string(),
                reason: "must be a positive integer",
            });
        }
        validate_sizes(self.fft_size, self.window_size, self.hop_size)
    }
}

impl OnsetOptions {
    pub fn stft_params(&self) -> StftParams {
        StftParams {
            fft_size: self.fft_size,
            window_size: self.window_size,
            hop_size: self.hop_size,
        }
    }

    fn onset_config(&self) -> OnsetConfig {
        OnsetConfig {
            threshold: self.threshold,
            filter_size: self.filter_size,
            min_slice_length: self.min_slice_length,
            stft: self.stft_params(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.threshold > 0.0) {
            return Err(Error::InvalidParameter {
                name: "threshold",
                value: self.threshold.to_string(),
                reason: "must be positive",
            });
        }
        if self.filter_size == 0 {
            return Err(Error::InvalidParameter {
                name: "filter_size",
                value: "0".to_string(),
                reason: "must be a positive integer",
            });
        }
        if self.min_slice_length == 0 {
            return Err(Error::InvalidParameter {
                name: "min_slice_length",
                value: "0".to_string(),
                reason: "must be a positive integer",
            });
        }
        validate_sizes(self.fft_size, self.window_size, self.hop_size)
    }
}

fn validate_sizes(fft_size: usize, window_size: Option<usize>, hop_size: Option<usize>) -> Result<()> {
    if fft_size == 0 {
        return Err(Error::InvalidParameter {
            name: "fft_size",
            value: "0".to_string(),
            reason: "must be > 0",
        });
    }
    if hop_size == Some(0) {
        return Err(Error::InvalidParameter {
            name: "hop_size",
            value: "0".to_string(),
            reason: "must be > 0",
        });
    }
    if let Some(w) = window_size {
        if w == 0 || w > fft_size {
            return Err(Error::InvalidParameter {
                name: "window_size",
                value: w.to_string(),
                reason: "must be > 0 and not exceed fft_size",
            });
        }
    }
    Ok(())
}

/// Options for one analysis run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnalysisOptions {
    Nmf(NmfOptions),
    OnsetSlice(OnsetOptions),
}

impl AnalysisOptions {
    pub fn feature_type(&self) -> FeatureType {
        match self {
            AnalysisOptions::Nmf(_) => FeatureType::Nmf,
            AnalysisOptions::OnsetSlice(_) => FeatureType::OnsetSlice,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            AnalysisOptions::Nmf(o) => o.validate(),
            AnalysisOptions::OnsetSlice(o) => o.validate(),
        }
    }

    /// Canonical serialized form, used both for storage and for the
    /// pre-kernel cache check.
    pub fn to_json(&self) -> Result<String> {
        let json = match self {
            AnalysisOptions::Nmf(o) => serde_json::to_string(o)?,
            AnalysisOptions::OnsetSlice(o) => serde_json::to_string(o)?,
        };
        Ok(json)
    }
}

// ============================================
// PAYLOADS
// ============================================

/// Serialized NMF result. `bases` is component-major (components x bins);
/// `activations` is component-major too (components x frames), matching
/// the per-component vectors consumers index into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NmfPayload {
    pub components: usize,
    pub iterations: usize,
    pub converged: bool,
    pub bases: Vec<Vec<f32>>,
    pub activations: Vec<Vec<f32>>,
}

impl NmfPayload {
    pub fn from_factorization(f: &Factorization, iterations: usize) -> Self {
        let components = f.component_count();
        let bases = (0..components).map(|k| f.bases.row(k).to_vec()).collect();
        let activations = (0..components)
            .map(|k| f.activations.column(k).to_vec())
            .collect();
        Self {
            components,
            iterations,
            converged: f.converged,
            bases,
            activations,
        }
    }

    /// Rebuild matrices shaped for a (frames x bins) spectrogram. Stored
    /// vectors are clamped into the expected shape; missing entries stay
    /// zero.
    pub fn to_factorization(&self, frames: usize, bins: usize) -> Factorization {
        let k = self.components;
        let mut bases = Array2::zeros((k, bins));
        let mut activations = Array2::zeros((frames, k));

        for (ki, basis) in self.bases.iter().enumerate().take(k) {
            for (b, &v) in basis.iter().enumerate().take(bins) {
                bases[(ki, b)] = v;
            }
        }
        for (ki, act) in self.activations.iter().enumerate().take(k) {
            for (t, &v) in act.iter().enumerate().take(frames) {
                activations[(t, ki)] = v;
            }
        }

        Factorization {
            bases,
            activations,
            converged: self.converged,
        }
    }
}

/// Serialized onset-slice result: ascending onset sample positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnsetPayload {
    pub positions: Vec<u64>,
}

// ============================================
// ANALYZER
// ============================================

/// Outcome of an `analyze` call. `cached` is true when the feature row
/// predates the call and no kernel ran.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub feature: FeatureRow,
    pub cached: bool,
}

pub struct Analyzer {
    store: Arc<Mutex<SampleBank>>,
    kernel: Arc<dyn SpectralKernel>,
    onsets: Arc<dyn OnsetDetector>,
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Analyzer {
    pub fn new(
        store: Arc<Mutex<SampleBank>>,
        kernel: Arc<dyn SpectralKernel>,
        onsets: Arc<dyn OnsetDetector>,
    ) -> Self {
        Self {
            store,
            kernel,
            onsets,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Run (or reuse) an analysis for the sample with the given full hash.
    pub fn analyze(&self, sample_hash: &str, options: &AnalysisOptions) -> Result<AnalysisOutcome> {
        options.validate()?;
        let feature_type = options.feature_type();
        let options_json = options.to_json()?;

        let sample = self
            .store
            .lock()
            .unwrap()
            .sample(sample_hash)?
            .ok_or_else(|| Error::SampleNotFound {
                query: sample_hash.to_string(),
            })?;

        // cheap path: identical analysis already stored, kernel never runs
        if let Some(feature) = self.store.lock().unwrap().find_feature_with_options(
            sample_hash,
            feature_type,
            &options_json,
        )? {
            return Ok(AnalysisOutcome {
                feature,
                cached: true,
            });
        }

        // single-flight: at most one computation per unique input
        let key = input_digest(sample_hash, feature_type, &options_json);
        let key_lock = {
            let mut map = self.inflight.lock().unwrap();
            map.entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _running = key_lock.lock().unwrap();

        // a concurrent caller may have finished while we waited
        if let Some(feature) = self.store.lock().unwrap().find_feature_with_options(
            sample_hash,
            feature_type,
            &options_json,
        )? {
            self.inflight.lock().unwrap().remove(&key);
            return Ok(AnalysisOutcome {
                feature,
                cached: true,
            });
        }

        let result = self.run_kernel(&sample, options);
        self.inflight.lock().unwrap().remove(&key);
        let (payload_json, onset_positions) = result?;

        let mut store = self.store.lock().unwrap();
        let (id, created) =
            store.store_feature(sample_hash, feature_type, &payload_json, &options_json)?;

        // onset features come with their slice rows
        if created {
            if let Some(positions) = onset_positions {
                if positions.len() >= 2 {
                    store.create_slices(sample_hash, id, &positions)?;
                }
            }
        }

        let feature = store
            .feature(id)?
            .ok_or(Error::FeatureNotFound { id })?;
        Ok(AnalysisOutcome {
            feature,
            cached: !created,
        })
    }

    fn run_kernel(
        &self,
        sample: &SampleRow,
        options: &AnalysisOptions,
    ) -> Result<(String, Option<Vec<u64>>)> {
        match options {
            AnalysisOptions::Nmf(opts) => {
                let params = opts.stft_params();
                let spectrum = self
                    .kernel
                    .forward(&sample.pcm, &params)
                    .map_err(|e| kernel_error("forward transform", &sample.hash, e))?;
                let mag = magnitude(&spectrum);
                let factorization = self
                    .kernel
                    .factorize(&mag, opts.components, opts.iterations, opts.seed)
                    .map_err(|e| kernel_error("factorization", &sample.hash, e))?;

                let payload = NmfPayload::from_factorization(&factorization, opts.iterations);
                Ok((serde_json::to_string(&payload)?, None))
            }
            AnalysisOptions::OnsetSlice(opts) => {
                let positions = self
                    .onsets
                    .detect(&sample.pcm, &opts.onset_config())
                    .map_err(|e| kernel_error("onset detection", &sample.hash, e))?;

                let payload = OnsetPayload {
                    positions: positions.clone(),
                };
                Ok((serde_json::to_string(&payload)?, Some(positions)))
            }
        }
    }
}

fn kernel_error(op: &'static str, sample_hash: &str, e: Error) -> Error {
    match e {
        // precondition errors keep their specific kind
        Error::InvalidParameter { .. } | Error::ComponentIndexOutOfRange { .. } => e,
        other => Error::Computation {
            op,
            sample: short_hash(sample_hash).to_string(),
            message: other.to_string(),
        },
    }
}

/// Digest over the inputs of an analysis, used as the single-flight key.
fn input_digest(sample_hash: &str, feature_type: FeatureType, options_json: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sample_hash.as_bytes());
    hasher.update(feature_type.as_str().as_bytes());
    hasher.update(options_json.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex32;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Kernel stub that counts invocations and returns fixed shapes.
    struct StubKernel {
        forward_calls: AtomicUsize,
        factorize_calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl StubKernel {
        fn new() -> Self {
            Self {
                forward_calls: AtomicUsize::new(0),
                factorize_calls: AtomicUsize::new(0),
                delay: None,
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::new()
            }
        }
    }

    impl SpectralKernel for StubKernel {
        fn forward(&self, samples: &[f32], params: &StftParams) -> Result<Array2<Complex32>> {
            self.forward_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Array2::from_elem(
                (params.frames(samples.len()), params.bins()),
                Complex32::new(1.0, 0.0),
            ))
        }

        fn inverse(
            &self,
            _spectrum: &Array2<Complex32>,
            _params: &StftParams,
            length: usize,
        ) -> Result<Vec<f32>> {
            Ok(vec![0.0; length])
        }

        fn factorize(
            &self,
            magnitude: &Array2<f32>,
            components: usize,
            _iterations: usize,
            _seed: i64,
        ) -> Result<Factorization> {
            self.factorize_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            Ok(Factorization {
                bases: Array2::from_elem((components, magnitude.ncols()), 0.5),
                activations: Array2::from_elem((magnitude.nrows(), components), 0.5),
                converged: true,
            })
        }

        fn estimate_component(
            &self,
            factorization: &Factorization,
            component_index: usize,
        ) -> Result<Array2<f32>> {
            crate::dsp::nmf::estimate_component(factorization, component_index)
        }
    }

    struct StubOnsets {
        calls: AtomicUsize,
        positions: Vec<u64>,
    }

    impl OnsetDetector for StubOnsets {
        fn detect(&self, _samples: &[f32], _config: &OnsetConfig) -> Result<Vec<u64>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.positions.clone())
        }
    }

    fn setup(
        kernel: StubKernel,
        positions: Vec<u64>,
    ) -> (Arc<Mutex<SampleBank>>, Arc<StubKernel>, Arc<StubOnsets>, Analyzer, String) {
        let store = Arc::new(Mutex::new(SampleBank::open_in_memory().unwrap()));
        let kernel = Arc::new(kernel);
        let onsets = Arc::new(StubOnsets {
            calls: AtomicUsize::new(0),
            positions,
        });
        let analyzer = Analyzer::new(store.clone(), kernel.clone(), onsets.clone());

        let pcm: Vec<f32> = (0..2048).map(|i| (i as f32 * 0.01).sin()).collect();
        let hash = store
            .lock()
            .unwrap()
            .store_sample(&pcm, Some("test.wav"), 44100, 1, 0.046)
            .unwrap();

        (store, kernel, onsets, analyzer, hash)
    }

    #[test]
    fn test_analyze_runs_kernel_once_per_input() {
        let (_, kernel, _, analyzer, hash) = setup(StubKernel::new(), vec![]);
        let options = AnalysisOptions::Nmf(NmfOptions {
            components: 2,
            ..Default::default()
        });

        let first = analyzer.analyze(&hash, &options).unwrap();
        let second = analyzer.analyze(&hash, &options).unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.feature.id, second.feature.id);
        assert_eq!(kernel.factorize_calls.load(Ordering::SeqCst), 1);
        assert_eq!(kernel.forward_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_option_change_creates_new_feature() {
        let (_, _, _, analyzer, hash) = setup(StubKernel::new(), vec![]);

        let a = analyzer
            .analyze(
                &hash,
                &AnalysisOptions::Nmf(NmfOptions {
                    components: 2,
                    ..Default::default()
                }),
            )
            .unwrap();
        let b = analyzer
            .analyze(
                &hash,
                &AnalysisOptions::Nmf(NmfOptions {
                    components: 3,
                    ..Default::default()
                }),
            )
            .unwrap();

        assert!(!b.cached);
        assert_ne!(a.feature.id, b.feature.id);
        assert_ne!(a.feature.feature_hash, b.feature.feature_hash);
    }

    #[test]
    fn test_onset_analysis_materializes_slices() {
        let (store, _, onsets, analyzer, hash) =
            setup(StubKernel::new(), vec![0, 100, 250, 400]);

        let outcome = analyzer
            .analyze(&hash, &AnalysisOptions::OnsetSlice(OnsetOptions::default()))
            .unwrap();

        assert_eq!(onsets.calls.load(Ordering::SeqCst), 1);
        let slices = store.lock().unwrap().list_slices(outcome.feature.id).unwrap();
        assert_eq!(slices.len(), 3);
        assert_eq!(slices[2].end_sample, 400);

        let payload: OnsetPayload = serde_json::from_str(&outcome.feature.payload).unwrap();
        assert_eq!(payload.positions, vec![0, 100, 250, 400]);
    }

    #[test]
    fn test_single_onset_yields_no_slices() {
        let (store, _, _, analyzer, hash) = setup(StubKernel::new(), vec![42]);

        let outcome = analyzer
            .analyze(&hash, &AnalysisOptions::OnsetSlice(OnsetOptions::default()))
            .unwrap();

        assert!(store.lock().unwrap().list_slices(outcome.feature.id).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_sample_rejected() {
        let (_, kernel, _, analyzer, _) = setup(StubKernel::new(), vec![]);
        let err = analyzer
            .analyze(
                &"0".repeat(64),
                &AnalysisOptions::Nmf(NmfOptions::default()),
            )
            .unwrap_err();

        assert!(matches!(err, Error::SampleNotFound { .. }));
        assert_eq!(kernel.forward_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_options_fail_before_kernel() {
        let (_, kernel, _, analyzer, hash) = setup(StubKernel::new(), vec![]);
        let err = analyzer
            .analyze(
                &hash,
                &AnalysisOptions::Nmf(NmfOptions {
                    components: 0,
                    ..Default::default()
                }),
            )
            .unwrap_err();

        assert!(matches!(err, Error::InvalidParameter { name: "components", .. }));
        assert_eq!(kernel.forward_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_concurrent_analyze_single_flight() {
        let (_, kernel, _, analyzer, hash) =
            setup(StubKernel::slow(Duration::from_millis(50)), vec![]);
        let analyzer = Arc::new(analyzer);
        let options = AnalysisOptions::Nmf(NmfOptions {
            components: 2,
            ..Default::default()
        });

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let analyzer = analyzer.clone();
                let hash = hash.clone();
                std::thread::spawn(move || analyzer.analyze(&hash, &options).unwrap())
            })
            .collect();

        let outcomes: Vec<AnalysisOutcome> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        let ids: Vec<i64> = outcomes.iter().map(|o| o.feature.id).collect();
        assert!(ids.iter().all(|&id| id == ids[0]));
        assert_eq!(kernel.factorize_calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcomes.iter().filter(|o| !o.cached).count(), 1);
    }

    #[test]
    fn test_payload_round_trip() {
        let f = Factorization {
            bases: Array2::from_shape_vec((2, 3), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap(),
            activations: Array2::from_shape_vec((4, 2), (0..8).map(|i| i as f32).collect())
                .unwrap(),
            converged: true,
        };

        let payload = NmfPayload::from_factorization(&f, 100);
        assert_eq!(payload.bases.len(), 2);
        assert_eq!(payload.activations[0].len(), 4);

        let rebuilt = payload.to_factorization(4, 3);
        assert_eq!(rebuilt.bases, f.bases);
        assert_eq!(rebuilt.activations, f.activations);

        // clamping into a different expected shape keeps what fits
        let clipped = payload.to_factorization(2, 2);
        assert_eq!(clipped.activations.dim(), (2, 2));
        assert_eq!(clipped.bases.dim(), (2, 2));
    }
}
