//! The YIN pitch detection algorithm is based on the algorithm from the paper
//! *YIN, a fundamental frequency estimator for speech and music* (de Cheveigné & Kawahara, 2002).
//!
//! Let $x=(x_0,x_1,\ldots,x_{N-1})$ be a frame and $W=N/2$. The *difference function* is
//! $$ d(\tau) = \sum_{j=0}^{W-1} (x_j-x_{j+\tau})^2, $$
//! and the *cumulative mean normalized difference* (CMND) is
//! $$ d\'(\tau) = \begin{cases}1&\text{if }\tau=0\\\\ d(\tau) / \left[ \tfrac{1}{\tau}\sum_{i=1}^{\tau} d(i) \right] & \text{otherwise}\end{cases}. $$
//! The period is the first local minimum of $d\'$ below an absolute threshold,
//! refined with parabolic interpolation.
//!
//! The functions here work on caller-owned buffers so the estimator can reuse
//! them from frame to frame.

/// Clarity reported when the frame holds fewer than [`MIN_CLARITY_PERIODS`] periods.
pub const CLARITY_FLOOR: f32 = 0.4;
pub const MIN_CLARITY_PERIODS: usize = 3;

/// Computes the difference function `d(τ)` for `τ ∈ [0, lags)` into `result`.
///
/// The comparison window is half the signal length, so `lags` must not exceed
/// `signal.len() / 2 + 1`.
pub fn difference_function(signal: &[f32], lags: usize, result: &mut Vec<f32>) {
    let window = signal.len() / 2;
    assert!(
        lags <= window + 1,
        "The lag count cannot exceed half the signal length"
    );
    result.clear();
    result.extend((0..lags).map(|tau| {
        signal[..window]
            .iter()
            .zip(&signal[tau..tau + window])
            .map(|(a, b)| {
                let delta = a - b;
                delta * delta
            })
            .sum::<f32>()
    }));
}

/// Turns a difference function into the CMND in place.
pub fn cumulative_mean_normalize(difference: &mut [f32]) {
    if difference.is_empty() {
        return;
    }
    difference[0] = 1.0;
    let mut running_sum = 0.0_f32;
    for (tau, value) in difference.iter_mut().enumerate().skip(1) {
        running_sum += *value;
        *value = if running_sum > 0.0 {
            *value * tau as f32 / running_sum
        } else {
            1.0
        };
    }
}

/// Absolute threshold search over lags `min_lag..=max_lag`.
///
/// Returns the bottom of the first dip below `threshold`. When nothing dips
/// below it, falls back to the global minimum in range.
pub fn absolute_threshold(
    cmnd: &[f32],
    min_lag: usize,
    max_lag: usize,
    threshold: f32,
) -> Option<usize> {
    let max_lag = max_lag.min(cmnd.len().checked_sub(1)?);
    if min_lag > max_lag {
        return None;
    }

    let mut tau = min_lag;
    while tau <= max_lag {
        if cmnd[tau] < threshold {
            // Walk down to the bottom of this dip.
            while tau < max_lag && cmnd[tau + 1] < cmnd[tau] {
                tau += 1;
            }
            return Some(tau);
        }
        tau += 1;
    }

    (min_lag..=max_lag).min_by(|&a, &b| {
        cmnd[a]
            .partial_cmp(&cmnd[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

/// Refines `tau` with a parabola through its neighbours.
///
/// Falls back to the integer lag at the edges of `values` or when the
/// neighbourhood is flat.
pub fn parabolic_interpolation(values: &[f32], tau: usize) -> f32 {
    if tau == 0 || tau + 1 >= values.len() {
        return tau as f32;
    }
    let y1 = values[tau - 1];
    let y2 = values[tau];
    let y3 = values[tau + 1];
    let denominator = y1 - 2.0 * y2 + y3;
    if denominator.abs() <= f32::EPSILON {
        return tau as f32;
    }
    let shift = (y1 - y3) / (2.0 * denominator);
    if shift.is_finite() && shift.abs() < 1.0 {
        tau as f32 + shift
    } else {
        tau as f32
    }
}

/// YIN confidence for the chosen CMND value.
pub fn confidence_from_cmnd(value: f32, threshold: f32, boost: f32) -> f32 {
    let base = (1.0 - value).max(0.0);
    let boosted = if value < threshold / 2.0 {
        base * boost
    } else {
        base
    };
    boosted.clamp(0.0, 1.0)
}

/// Average normalised correlation between successive periods of `signal`.
///
/// Needs at least [`MIN_CLARITY_PERIODS`] whole periods; otherwise the
/// measurement is too noisy and [`CLARITY_FLOOR`] is reported.
pub fn period_clarity(signal: &[f32], period: f32) -> f32 {
    let period = period.round() as usize;
    if period < 2 || signal.len() / period < MIN_CLARITY_PERIODS {
        return CLARITY_FLOOR;
    }

    let periods = signal.len() / period;
    let mut total = 0.0_f32;
    let mut pairs = 0_usize;
    for k in 0..periods - 1 {
        let a = &signal[k * period..(k + 1) * period];
        let b = &signal[(k + 1) * period..(k + 2) * period];
        let (mut ab, mut aa, mut bb) = (0.0_f32, 0.0_f32, 0.0_f32);
        for (x, y) in a.iter().zip(b) {
            ab += x * y;
            aa += x * x;
            bb += y * y;
        }
        let norm = (aa * bb).sqrt();
        if norm > f32::EPSILON {
            total += ab / norm;
            pairs += 1;
        }
    }

    if pairs == 0 {
        return 0.0;
    }
    (total / pairs as f32).clamp(0.0, 1.0)
}
