//! Fixed-order Gauss-Legendre quadrature on finite intervals.

/// Positive half of the symmetric 32-point rule on `[-1, 1]`.
const GL32_NODES: [f64; 16] = [
    0.04830766568773831,
    0.14447196158279649,
    0.23928736225213707,
    0.33186860228212767,
    0.42135127613063534,
    0.50689990893222942,
    0.58771575724076233,
    0.66304426693021520,
    0.73218211874028968,
    0.79448379596794241,
    0.84936761373256997,
    0.89632115576605212,
    0.93490607593773969,
    0.96476225558750643,
    0.98561151154526834,
    0.99726386184948156,
];

const GL32_WEIGHTS: [f64; 16] = [
    0.09654008851472780,
    0.09563872007927486,
    0.09384439908080457,
    0.09117387869576389,
    0.08765209300440381,
    0.08331192422694676,
    0.07819389578707031,
    0.07234579410884851,
    0.06582222277636185,
    0.05868409347853555,
    0.05099805926237618,
    0.04283589802222668,
    0.03427386291302143,
    0.02539206530926206,
    0.01627439473090567,
    0.00701861000947009,
];

/// Integrate `f` over `[a, b]` with the 32-point rule.
pub fn gauss_legendre_32<F: Fn(f64) -> f64>(f: F, a: f64, b: f64) -> f64 {
    let mid = 0.5 * (a + b);
    let half = 0.5 * (b - a);
    let mut acc = 0.0;
    for (x, w) in GL32_NODES.iter().zip(GL32_WEIGHTS.iter()) {
        acc += w * (f(mid - half * x) + f(mid + half * x));
    }
    acc * half
}

/// Composite rule: split `[a, b]` into `panels` equal pieces and apply
/// [`gauss_legendre_32`] to each.
pub fn composite<F: Fn(f64) -> f64>(f: F, a: f64, b: f64, panels: usize) -> f64 {
    let panels = panels.max(1);
    let h = (b - a) / panels as f64;
    (0..panels)
        .map(|i| {
            let lo = a + h * i as f64;
            gauss_legendre_32(&f, lo, lo + h)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_weights_sum_to_two() {
        let s: f64 = GL32_WEIGHTS.iter().sum::<f64>() * 2.0;
        assert_abs_diff_eq!(s, 2.0, epsilon = 1e-13);
    }

    #[test]
    fn test_polynomial_exact() {
        // x^5 - 3x^2 + 1 on [0, 2] = 64/6 - 8 + 2
        let v = gauss_legendre_32(|x| x.powi(5) - 3.0 * x * x + 1.0, 0.0, 2.0);
        assert_abs_diff_eq!(v, 64.0 / 6.0 - 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_composite_gaussian_mass() {
        let phi = |x: f64| (-0.5 * x * x).exp() / (2.0 * std::f64::consts::PI).sqrt();
        let v = composite(phi, -10.0, 10.0, 8);
        assert_abs_diff_eq!(v, 1.0, epsilon = 1e-12);
    }
}
