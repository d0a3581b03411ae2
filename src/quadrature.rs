//! Gauss-Legendre quadrature used for arc lengths and pathway volumes.

/// Abscissae of the five point Gauss-Legendre rule on [-1, 1].
const NODES: [f64; 5] = [
    -0.906_179_845_938_664,
    -0.538_469_310_105_683,
    0.0,
    0.538_469_310_105_683,
    0.906_179_845_938_664,
];

/// Weights belonging to `NODES`.
const WEIGHTS: [f64; 5] = [
    0.236_926_885_056_189,
    0.478_628_670_499_366,
    0.568_888_888_888_889,
    0.478_628_670_499_366,
    0.236_926_885_056_189,
];

/// Each piece between breakpoints is split this many times before the rule is applied.
const SUBDIVISIONS: usize = 4;

/// Integrate `f` over `[a, b]` with the five point rule. Exact for
/// polynomials up to degree nine.
pub fn gauss_legendre<F: Fn(f64) -> f64>(f: &F, a: f64, b: f64) -> f64 {
    let half = 0.5 * (b - a);
    let mid = 0.5 * (a + b);
    NODES
        .iter()
        .zip(WEIGHTS.iter())
        .map(|(x, w)| w * f(mid + half * x))
        .sum::<f64>()
        * half
}

/// Integrate `f` over `[lo, hi]`, splitting the range at every breakpoint in
/// between so that each piece is smooth. Breakpoints must be sorted.
/// Returns a negative value if `hi < lo`.
pub fn integrate_piecewise<F: Fn(f64) -> f64>(f: &F, breaks: &[f64], lo: f64, hi: f64) -> f64 {
    if hi < lo {
        return -integrate_piecewise(f, breaks, hi, lo);
    }

    let mut total = 0.0;
    let mut a = lo;
    for &b in breaks.iter().filter(|&&k| k > lo && k < hi).chain(core::iter::once(&hi)) {
        let step = (b - a) / SUBDIVISIONS as f64;
        for n in 0..SUBDIVISIONS {
            let sa = a + n as f64 * step;
            let sb = if n + 1 == SUBDIVISIONS { b } else { sa + step };
            total += gauss_legendre(f, sa, sb);
        }
        a = b;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn exact_for_degree_nine() {
        let f = |x: f64| x.powi(9) - 2.0 * x.powi(4) + 1.0;
        let exact = |x: f64| x.powi(10) / 10.0 - 2.0 * x.powi(5) / 5.0 + x;
        assert_relative_eq!(gauss_legendre(&f, -0.5, 1.5), exact(1.5) - exact(-0.5), epsilon = 1e-12);
    }

    #[test]
    fn piecewise_respects_breaks_and_orientation() {
        // |x| has a kink at zero
        let f = |x: f64| x.abs();
        let value = integrate_piecewise(&f, &[-1.0, 0.0, 2.0], -1.0, 2.0);
        assert_relative_eq!(value, 2.5, epsilon = 1e-12);
        assert_relative_eq!(integrate_piecewise(&f, &[0.0], 2.0, -1.0), -2.5, epsilon = 1e-12);
        assert_eq!(integrate_piecewise(&f, &[], 1.0, 1.0), 0.0);
    }
}
