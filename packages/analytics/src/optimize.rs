//! Derivative-free minimizers used by the maximum-likelihood fits.

use std::cmp::Ordering;

/// Options for [`nelder_mead`].
#[derive(Debug, Clone, Copy)]
pub struct MinimizeOptions {
    /// Maximum number of simplex iterations.
    pub max_iter: usize,
    /// Stop once the spread of function values across the simplex is
    /// below this.
    pub f_tol: f64,
    /// Initial step along each coordinate axis.
    pub initial_step: f64,
}

impl Default for MinimizeOptions {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            f_tol: 1e-10,
            initial_step: 0.1,
        }
    }
}

/// Result of a minimization.
#[derive(Debug, Clone)]
pub struct Minimum {
    /// Location of the best point found.
    pub x: Vec<f64>,
    /// Function value at `x`.
    pub fun: f64,
    /// Iterations performed.
    pub iterations: usize,
    /// Whether the tolerance was reached before `max_iter`.
    pub converged: bool,
}

/// NaN sorts last so it is always the first vertex to be replaced.
fn nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.total_cmp(&b),
    }
}

/// `base + scale * (toward - base)`, component-wise.
fn step(base: &[f64], toward: &[f64], scale: f64) -> Vec<f64> {
    base.iter()
        .zip(toward)
        .map(|(b, t)| b + scale * (t - b))
        .collect()
}

/// Nelder-Mead simplex minimization of `f` starting from `x0`.
///
/// Uses the standard coefficients: reflection 1, expansion 2,
/// contraction 0.5, shrink 0.5.
///
/// Returns `None` if `x0` is empty or every vertex evaluates to NaN.
#[must_use]
pub fn nelder_mead<F>(f: F, x0: &[f64], options: &MinimizeOptions) -> Option<Minimum>
where
    F: Fn(&[f64]) -> f64,
{
    let n = x0.len();
    if n == 0 {
        return None;
    }

    let mut vertices: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    vertices.push(x0.to_vec());
    for i in 0..n {
        let mut vertex = x0.to_vec();
        vertex[i] += options.initial_step * vertex[i].abs().max(1.0);
        vertices.push(vertex);
    }
    let mut values: Vec<f64> = vertices.iter().map(|v| f(v)).collect();

    for iteration in 0..options.max_iter {
        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| nan_last(values[a], values[b]));
        let best = order[0];
        let worst = order[n];
        let second_worst = order[n - 1];

        if values[best].is_nan() {
            return None;
        }

        if values[worst] - values[best] < options.f_tol {
            return Some(Minimum {
                x: vertices[best].clone(),
                fun: values[best],
                iterations: iteration + 1,
                converged: true,
            });
        }

        let mut centroid = vec![0.0; n];
        for &idx in &order[..n] {
            for (c, x) in centroid.iter_mut().zip(&vertices[idx]) {
                *c += x;
            }
        }
        #[allow(clippy::cast_precision_loss)]
        let scale = 1.0 / n as f64;
        for c in &mut centroid {
            *c *= scale;
        }

        let reflected = step(&centroid, &vertices[worst], -1.0);
        let f_reflected = f(&reflected);

        if f_reflected < values[second_worst] && f_reflected >= values[best] {
            vertices[worst] = reflected;
            values[worst] = f_reflected;
            continue;
        }

        if f_reflected < values[best] {
            let expanded = step(&centroid, &reflected, 2.0);
            let f_expanded = f(&expanded);
            if f_expanded < f_reflected {
                vertices[worst] = expanded;
                values[worst] = f_expanded;
            } else {
                vertices[worst] = reflected;
                values[worst] = f_reflected;
            }
            continue;
        }

        let contracted = if f_reflected < values[worst] {
            step(&centroid, &reflected, 0.5)
        } else {
            step(&centroid, &vertices[worst], 0.5)
        };
        let f_contracted = f(&contracted);

        // NaN never compares less, so a NaN worst vertex is always replaced.
        if f_contracted < f_reflected.min(values[worst]) || values[worst].is_nan() {
            vertices[worst] = contracted;
            values[worst] = f_contracted;
            continue;
        }

        let anchor = vertices[best].clone();
        for &idx in &order[1..] {
            vertices[idx] = step(&anchor, &vertices[idx], 0.5);
            values[idx] = f(&vertices[idx]);
        }
    }

    let best = (0..=n).min_by(|&a, &b| nan_last(values[a], values[b]))?;
    if values[best].is_nan() {
        return None;
    }
    Some(Minimum {
        x: vertices[best].clone(),
        fun: values[best],
        iterations: options.max_iter,
        converged: false,
    })
}

/// Golden-section search for the minimum of a unimodal `f` on `[lo, hi]`.
///
/// Returns the abscissa of the minimum to within `tol`.
#[must_use]
pub fn golden_section<F>(f: F, mut lo: f64, mut hi: f64, tol: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    const INV_PHI: f64 = 0.618_033_988_749_894_9;

    let mut c = hi - INV_PHI * (hi - lo);
    let mut d = lo + INV_PHI * (hi - lo);
    let mut fc = f(c);
    let mut fd = f(d);

    while (hi - lo).abs() > tol {
        if fc < fd {
            hi = d;
            d = c;
            fd = fc;
            c = hi - INV_PHI * (hi - lo);
            fc = f(c);
        } else {
            lo = c;
            c = d;
            fc = fd;
            d = lo + INV_PHI * (hi - lo);
            fd = f(d);
        }
    }

    0.5 * (lo + hi)
}
