//! Default matrix factorization: multiplicative-update NMF.
//!
//! Factorizes a (frames x bins) magnitude spectrogram V into activations
//! (frames x components) and bases (components x bins) under the Frobenius
//! objective, with the classic Lee-Seung update rules.

use ndarray::Array2;

use crate::dsp::Factorization;
use crate::error::{Error, Result};

const EPS: f32 = 1e-10;
const TOL: f32 = 1e-4;

/// Deterministic positive initialization. The same seed always produces
/// the same factorization.
fn seeded_init(rows: usize, cols: usize, seed: i64, scale: f32) -> Array2<f32> {
    let mut state = if seed >= 0 {
        (seed as u64) | 1
    } else {
        0x9e37_79b9_7f4a_7c15
    };
    Array2::from_shape_fn((rows, cols), |_| {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let unit = ((state >> 33) as f32) / (u32::MAX >> 1) as f32;
        (unit + 0.1) * scale
    })
}

pub fn factorize(
    magnitude: &Array2<f32>,
    components: usize,
    iterations: usize,
    seed: i64,
) -> Result<Factorization> {
    if components == 0 {
        return Err(Error::InvalidParameter {
            name: "components",
            value: "0".to_string(),
            reason: "must be a positive integer",
        });
    }
    if iterations == 0 {
        return Err(Error::InvalidParameter {
            name: "iterations",
            value: "0".to_string(),
            reason: "must be a positive integer",
        });
    }

    let frames = magnitude.nrows();
    let bins = magnitude.ncols();
    let mean = magnitude.mean().unwrap_or(1.0).max(EPS);
    let scale = (mean / components as f32).sqrt();

    let mut activations = seeded_init(frames, components, seed, scale);
    let mut bases = seeded_init(components, bins, seed.wrapping_add(1), scale);

    let mut prev_error = f32::MAX;
    let mut converged = false;

    for _ in 0..iterations {
        // H <- H .* (V * W^T) ./ (H * W * W^T)
        let numer_h = magnitude.dot(&bases.t());
        let denom_h = activations.dot(&bases.dot(&bases.t()));
        ndarray::Zip::from(&mut activations)
            .and(&numer_h)
            .and(&denom_h)
            .for_each(|h, &n, &d| *h *= n / (d + EPS));

        // W <- W .* (H^T * V) ./ (H^T * H * W)
        let numer_w = activations.t().dot(magnitude);
        let denom_w = activations.t().dot(&activations).dot(&bases);
        ndarray::Zip::from(&mut bases)
            .and(&numer_w)
            .and(&denom_w)
            .for_each(|w, &n, &d| *w *= n / (d + EPS));

        let approx = activations.dot(&bases);
        let error = (magnitude - &approx).mapv(|x| x * x).sum().sqrt();
        if prev_error.is_finite() && (prev_error - error).abs() <= TOL * prev_error.max(EPS) {
            converged = true;
            break;
        }
        prev_error = error;
    }

    Ok(Factorization {
        bases,
        activations,
        converged,
    })
}

/// Rank-1 magnitude estimate for one component:
/// `est[t, b] = activations[t, k] * bases[k, b]`.
pub fn estimate_component(
    factorization: &Factorization,
    component_index: usize,
) -> Result<Array2<f32>> {
    let count = factorization.component_count();
    if component_index >= count {
        return Err(Error::ComponentIndexOutOfRange {
            index: component_index,
            count,
        });
    }

    let frames = factorization.activations.nrows();
    let bins = factorization.bases.ncols();
    let act = factorization.activations.column(component_index);
    let basis = factorization.bases.row(component_index);

    Ok(Array2::from_shape_fn((frames, bins), |(t, b)| {
        act[t] * basis[b]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_magnitude() -> Array2<f32> {
        Array2::from_shape_fn((12, 9), |(t, b)| {
            let low = if b < 4 { (t as f32 * 0.5).sin().abs() } else { 0.0 };
            let high = if b >= 5 { (t as f32 * 0.9).cos().abs() } else { 0.0 };
            low + high + 0.01
        })
    }

    #[test]
    fn test_output_shapes() {
        let v = toy_magnitude();
        let f = factorize(&v, 2, 50, 1).unwrap();
        assert_eq!(f.bases.dim(), (2, 9));
        assert_eq!(f.activations.dim(), (12, 2));
        assert_eq!(f.component_count(), 2);
    }

    #[test]
    fn test_factors_non_negative() {
        let v = toy_magnitude();
        let f = factorize(&v, 3, 80, 7).unwrap();
        assert!(f.bases.iter().all(|&x| x >= 0.0));
        assert!(f.activations.iter().all(|&x| x >= 0.0));
    }

    #[test]
    fn test_deterministic_for_seed() {
        let v = toy_magnitude();
        let a = factorize(&v, 2, 40, 5).unwrap();
        let b = factorize(&v, 2, 40, 5).unwrap();
        assert_eq!(a.bases, b.bases);
        assert_eq!(a.activations, b.activations);
    }

    #[test]
    fn test_reconstruction_improves() {
        let v = toy_magnitude();
        let short = factorize(&v, 2, 1, 3).unwrap();
        let long = factorize(&v, 2, 100, 3).unwrap();
        let err = |f: &Factorization| {
            (&v - &f.activations.dot(&f.bases))
                .mapv(|x| x * x)
                .sum()
                .sqrt()
        };
        assert!(err(&long) <= err(&short) + 1e-6);
    }

    #[test]
    fn test_invalid_counts_rejected() {
        let v = toy_magnitude();
        assert!(matches!(
            factorize(&v, 0, 10, 0),
            Err(Error::InvalidParameter { name: "components", .. })
        ));
        assert!(matches!(
            factorize(&v, 2, 0, 0),
            Err(Error::InvalidParameter { name: "iterations", .. })
        ));
    }

    #[test]
    fn test_estimate_is_rank_one() {
        let f = Factorization {
            bases: Array2::from_shape_vec((2, 3), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap(),
            activations: Array2::from_shape_vec((2, 2), vec![1.0, 0.5, 2.0, 0.25]).unwrap(),
            converged: true,
        };

        let est = estimate_component(&f, 1).unwrap();
        assert_eq!(est.dim(), (2, 3));
        assert_eq!(est[(0, 0)], 0.5 * 4.0);
        assert_eq!(est[(1, 2)], 0.25 * 6.0);
    }

    #[test]
    fn test_estimate_index_out_of_range() {
        let f = factorize(&toy_magnitude(), 2, 10, 0).unwrap();
        assert!(matches!(
            estimate_component(&f, 2),
            Err(Error::ComponentIndexOutOfRange { index: 2, count: 2 })
        ));
    }
}
