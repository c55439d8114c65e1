//! Whole-signal algorithms used by the vectorized evaluator.
//!
//! Every function in this module takes a value array aligned to an array of strictly increasing
//! sample times, and returns an array of the same length aligned to the same times. Values that
//! cannot be computed from the available samples, because the computation would need to look
//! past either end of the trace, are undefined and represented by `NaN`. Undefined values
//! propagate through the lattice operators in [`metrics`](crate::metrics).
//!
//! The bounded temporal operators follow Donzé, Ferrère and Maler, "Efficient Robust Monitoring
//! for STL" (CAV 2013). Signals are treated as piecewise-linear between samples.

use std::collections::VecDeque;

use crate::metrics::{Join, Meet};

fn interpolate(t0: f64, v0: f64, t1: f64, v1: f64, at: f64) -> f64 {
    v0 + (v1 - v0) * (at - t0) / (t1 - t0)
}

/// Resample a signal so that output `i` holds the signal's value at time `times[i] - delta`.
///
/// Targets that fall on a sample are copied, targets between two samples are linearly
/// interpolated, and targets outside of the trace are undefined.
pub fn shift(values: &[f64], times: &[f64], delta: f64) -> Vec<f64> {
    let mut output = Vec::with_capacity(times.len());
    let mut cursor = 0;

    for &time in times {
        let target = time - delta;

        while cursor < times.len() && times[cursor] < target {
            cursor += 1;
        }

        let value = if cursor < times.len() && times[cursor] == target {
            values[cursor]
        } else if cursor > 0 && cursor < times.len() {
            interpolate(times[cursor - 1], values[cursor - 1], times[cursor], values[cursor], target)
        } else {
            f64::NAN
        };

        output.push(value);
    }

    output
}

/// Elementwise maximum of two signals that treats an undefined value as absent.
fn combine(first: &[f64], second: &[f64]) -> Vec<f64> {
    first
        .iter()
        .zip(second)
        .map(|(&a, &b)| match (a.is_nan(), b.is_nan()) {
            (false, false) => f64::max(a, b),
            (false, true) => a,
            (true, false) => b,
            (true, true) => f64::NAN,
        })
        .collect()
}

/// Robustness of `F[a,b] φ` given the robustness signal of `φ`.
///
/// Output `k` is the maximum of the signal over the window `[t_k + a, t_k + b]`, and is
/// undefined when the window extends past the last sample. The window maximum is kept in a
/// monotone deque of sample indices, so the whole signal is computed in amortized linear time.
/// The bounds must satisfy `0 <= a <= b`.
pub fn eventually(values: &[f64], times: &[f64], a: f64, b: f64) -> Vec<f64> {
    let n = times.len();
    let mut output = vec![f64::NAN; n];

    let Some(&last) = times.last() else {
        return output;
    };

    // Values at the two window edges, which need not fall on samples.
    let edges = combine(&shift(values, times, -a), &shift(values, times, -b));

    // Prefix counts of undefined samples, so that undefined inputs inside a window are not
    // skipped over by the deque.
    let mut undefined = Vec::with_capacity(n + 1);
    undefined.push(0usize);
    for value in values {
        let count = undefined[undefined.len() - 1] + usize::from(value.is_nan());
        undefined.push(count);
    }

    let mut window: VecDeque<usize> = VecDeque::new();
    let mut start = 0; // first sample with time >= t_k + a
    let mut end = 0; // first sample with time > t_k + b

    for (k, &time) in times.iter().enumerate() {
        let left = time + a;
        let right = time + b;

        if right > last {
            break;
        }

        while end < n && times[end] <= right {
            if !values[end].is_nan() {
                while window.back().map_or(false, |&index| values[index] <= values[end]) {
                    window.pop_back();
                }

                window.push_back(end);
            }

            end += 1;
        }

        while start < n && times[start] < left {
            start += 1;
        }

        while window.front().map_or(false, |&index| index < start) {
            window.pop_front();
        }

        // Samples whose values are used for this window, including the neighbours used to
        // interpolate the edges.
        let first = if start > 0 && (start == n || times[start] > left) {
            start - 1
        } else {
            start
        };
        let stop = if end > 0 && end < n && times[end - 1] < right { end + 1 } else { end };

        output[k] = if undefined[stop] > undefined[first] {
            f64::NAN
        } else {
            match window.front() {
                Some(&index) => edges[k].join(values[index]),
                None => edges[k],
            }
        };
    }

    output
}

/// Robustness of `G[a,b] φ`, computed as `!F[a,b] !φ`.
pub fn always(values: &[f64], times: &[f64], a: f64, b: f64) -> Vec<f64> {
    let negated: Vec<f64> = values.iter().map(|value| -value).collect();

    eventually(&negated, times, a, b).into_iter().map(|value| -value).collect()
}

/// Robustness of the unbounded strong until `lhs U rhs`.
///
/// Output `i` is `max_{j >= i} min(rhs[j], min_{i <= k <= j} lhs[k])`, computed in a single
/// backward pass. An undefined sample ends the stretch of samples seen by the outputs before it:
/// output `i` only looks ahead to the next undefined sample, and is itself undefined when either
/// input is undefined at `i`.
pub fn until_unbounded(lhs: &[f64], rhs: &[f64]) -> Vec<f64> {
    let n = lhs.len().min(rhs.len());
    let mut output = vec![f64::NAN; n];
    let mut z0 = f64::NAN;

    for i in (0..n).rev() {
        if lhs[i].is_nan() || rhs[i].is_nan() {
            z0 = f64::NAN;
            continue;
        }

        // First sample of a defined stretch.
        if z0.is_nan() {
            z0 = lhs[i].meet(rhs[i]);
            output[i] = z0;
            continue;
        }

        let (z2, z3) = if lhs[i] >= lhs[i + 1] {
            let z1 = lhs[i].meet(rhs[i]);
            let z2 = z1.join(lhs[i + 1].meet(rhs[i + 1]));

            (z2, lhs[i + 1].meet(z0))
        } else {
            let z1 = rhs[i].join(rhs[i + 1]);
            let z2 = z1.meet(lhs[i]);

            (z2, lhs[i].meet(z0))
        };

        z0 = z2.join(z3);
        output[i] = z0;
    }

    output
}

/// Robustness of `lhs U[a,b] rhs`, computed as `F[a,b] rhs && G[0,a] (lhs U rhs)`.
///
/// Output `k` is undefined when either input is undefined anywhere in `[t_k, t_k + b]`.
pub fn until(lhs: &[f64], rhs: &[f64], times: &[f64], a: f64, b: f64) -> Vec<f64> {
    let reached = eventually(rhs, times, a, b);
    let held = always(&until_unbounded(lhs, rhs), times, 0.0, a);
    let covered = eventually(lhs, times, 0.0, b);

    reached
        .into_iter()
        .zip(held)
        .zip(covered)
        .map(|((r, h), c)| if c.is_nan() { f64::NAN } else { r.meet(h) })
        .collect()
}

/// Forward-difference derivative. The first sample is zero.
pub fn derivative(values: &[f64], times: &[f64]) -> Vec<f64> {
    let differences = values
        .windows(2)
        .zip(times.windows(2))
        .map(|(v, t)| (v[1] - v[0]) / (t[1] - t[0]));

    std::iter::once(0.0).chain(differences).take(values.len()).collect()
}

/// Running trapezoidal integral from the first sample. The first sample is zero.
pub fn integral(values: &[f64], times: &[f64]) -> Vec<f64> {
    let areas = values
        .windows(2)
        .zip(times.windows(2))
        .scan(0.0, |total, (v, t)| {
            *total += (v[1] + v[0]) / 2.0 * (t[1] - t[0]);
            Some(*total)
        });

    std::iter::once(0.0).chain(areas).take(values.len()).collect()
}
