use num::Float;

/// Degree of membership of `x` in the trapezoid `a <= b <= c <= d`.
///
/// Rises linearly on `[a, b)`, is flat at one on `[b, c]` and falls linearly on
/// `(c, d]`. A vertical edge (`a == b` or `c == d`) counts as already inside.
/// Total over every `x`, including values outside the support.
pub fn trapezoid<F: Float>(x: F, a: F, b: F, c: F, d: F) -> F {
    if x < a {
        F::zero()
    } else if x < b {
        if a == b {
            return F::one();
        }

        ramp(a, x, b)
    } else if x <= c {
        F::one()
    } else if x <= d {
        if c == d {
            return F::one();
        }

        ramp(d, x, c)
    } else {
        F::zero()
    }
}

// Fraction of the way `x` has moved from `from` towards `to`, clamped to [0, 1].
// Falls back to halved operands when a difference overflows.
fn ramp<F: Float>(from: F, x: F, to: F) -> F {
    let (num, den) = (x - from, to - from);
    let y = if num.is_finite() && den.is_finite() {
        num / den
    } else {
        let half = F::one() / (F::one() + F::one());

        (x * half - from * half) / (to * half - from * half)
    };

    y.max(F::zero()).min(F::one())
}

#[test]
fn test_trapezoid_shape() {
    let (a, b, c, d) = (10., 20., 30., 40.);

    assert_eq!(trapezoid(5., a, b, c, d), 0.);
    assert_eq!(trapezoid(a, a, b, c, d), 0.);
    assert_eq!(trapezoid(15., a, b, c, d), 0.5);
    assert_eq!(trapezoid(b, a, b, c, d), 1.);
    assert_eq!(trapezoid(25., a, b, c, d), 1.);
    assert_eq!(trapezoid(c, a, b, c, d), 1.);
    assert_eq!(trapezoid(37.5, a, b, c, d), 0.25);
    assert_eq!(trapezoid(d, a, b, c, d), 0.);
    assert_eq!(trapezoid(41., a, b, c, d), 0.);
}

#[test]
fn test_trapezoid_monotonic_edges() {
    let (a, b, c, d) = (30.0f64, 40., 60., 70.);
    let mut prev = 0.;

    for i in 0..=100 {
        let x = a + (b - a) * i as f64 / 100.;
        let y = trapezoid(x, a, b, c, d);

        assert!(y >= prev, "rising edge decreased at {x}");
        assert!((0. ..=1.).contains(&y));
        prev = y;
    }

    for i in 0..=100 {
        let x = c + (d - c) * i as f64 / 100.;
        let y = trapezoid(x, a, b, c, d);

        assert!(y <= prev, "falling edge increased at {x}");
        prev = y;
    }
}

#[test]
fn test_trapezoid_degenerate_edges() {
    // Left shoulder
    assert_eq!(trapezoid(0., 0., 0., 10., 20.), 1.);
    assert_eq!(trapezoid(-0.1, 0., 0., 10., 20.), 0.);
    // Right shoulder
    assert_eq!(trapezoid(100., 60., 70., 100., 100.), 1.);
    assert_eq!(trapezoid(100.1, 60., 70., 100., 100.), 0.);
    // Singleton
    assert_eq!(trapezoid(5.0f32, 5., 5., 5., 5.), 1.);
    assert_eq!(trapezoid(5.5f32, 5., 5., 5., 5.), 0.);
}

#[test]
fn test_trapezoid_is_total() {
    let y = trapezoid(f64::INFINITY, 0., 1., 2., 3.);
    assert_eq!(y, 0.);

    let y = trapezoid(f64::NEG_INFINITY, 0., 1., 2., 3.);
    assert_eq!(y, 0.);
}

#[test]
fn test_trapezoid_extreme_breakpoints() {
    let (lo, hi) = (-1.7e308, 1.7e308);

    let y = trapezoid(1.5e308, lo, hi, hi, hi);
    assert!((y - 3.2 / 3.4).abs() < 1e-12);

    let y = trapezoid(-1.5e308, lo, lo, lo, hi);
    assert!((y - 3.2 / 3.4).abs() < 1e-12);

    for x in [lo, -1e308, 0., 1e308, hi] {
        let y = trapezoid(x, lo, hi, hi, hi);
        assert!((0. ..=1.).contains(&y), "{x} -> {y}");
    }
}
