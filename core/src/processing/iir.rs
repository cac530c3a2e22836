//! Low-pass IIR designs and zero-phase application.
//!
//! Designs start from an analog prototype (poles plus gain), are scaled to
//! the pre-warped cutoff and mapped to the z-plane with the bilinear
//! transform. Cutoffs are normalized to the Nyquist frequency, so `0.1`
//! means one tenth of half the sample rate.
//!
//! ## Design Methods
//!
//! - **Butterworth**: maximally flat passband
//! - **Chebyshev Type I**: equiripple passband, steeper rolloff
//! - **Bessel**: maximally flat group delay, phase-matched normalization
//!
//! Filters are realized as a cascade of second-order sections rather than one
//! expanded polynomial, which keeps high orders at small cutoffs stable.
//! Application is forward-backward ([`TransferFunction::filtfilt`]) with odd
//! extension at both ends and steady-state initial conditions, which removes
//! the phase shift of the single pass.

use num_complex::Complex64;
use std::f64::consts::PI;

use crate::prelude::{FilterError, FilterResult};
use crate::processing::StageError;

/// Analog prototype in pole/gain form (all zeros at infinity).
#[derive(Debug, Clone)]
struct AnalogPrototype {
    poles: Vec<Complex64>,
    gain: f64,
}

impl AnalogPrototype {
    /// `H(0) = gain / prod(-p)`; the bilinear transform maps it to `H(z = 1)`.
    fn dc_gain(&self) -> f64 {
        let product = self
            .poles
            .iter()
            .fold(Complex64::new(1.0, 0.0), |acc, &p| acc * -p);
        self.gain / product.re
    }
}

/// One biquad `(b0 + b1 z^-1 + b2 z^-2) / (1 + a1 z^-1 + a2 z^-2)`.
/// First-order sections carry `b2 == a2 == 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Section {
    b: [f64; 3],
    a: [f64; 3],
}

impl Section {
    /// Accepts only finite coefficients whose denominator lies inside the
    /// stability triangle `|a2| < 1`, `|a1| < 1 + a2` (Jury test for order 2).
    fn checked(b: [f64; 3], a: [f64; 3]) -> FilterResult<Self> {
        if b.iter().chain(a.iter()).any(|v| !v.is_finite()) || a[0] != 1.0 {
            return Err(FilterError::Design(
                "section coefficients must be finite with a[0] == 1".into(),
            ));
        }
        if !(a[2].abs() < 1.0 && a[1].abs() < 1.0 + a[2]) {
            return Err(FilterError::Design(format!(
                "unstable section: a = [1, {:.6}, {:.6}]",
                a[1], a[2]
            )));
        }
        Ok(Self { b, a })
    }

    /// Section with zeros at `z = -1` and unit gain at DC.
    fn lowpass(a: [f64; 3], first_order: bool) -> FilterResult<Self> {
        let shape = if first_order {
            [1.0, 1.0, 0.0]
        } else {
            [1.0, 2.0, 1.0]
        };
        let scale = a.iter().sum::<f64>() / shape.iter().sum::<f64>();
        Self::checked(shape.map(|v| v * scale), a)
    }

    fn is_first_order(&self) -> bool {
        self.b[2] == 0.0 && self.a[2] == 0.0
    }

    fn dc_gain(&self) -> f64 {
        self.b.iter().sum::<f64>() / self.a.iter().sum::<f64>()
    }

    /// State that holds a unit step at steady state. `1 + a1 + a2 > 0` for
    /// every section that passed [`Self::checked`].
    fn steady_state(&self) -> [f64; 2] {
        let [b0, b1, b2] = self.b;
        let [_, a1, a2] = self.a;
        let r0 = b1 - a1 * b0;
        let r1 = b2 - a2 * b0;
        let z0 = (r0 + r1) / (1.0 + a1 + a2);
        [z0, r1 - a2 * z0]
    }

    /// Direct form II transposed, in place.
    fn apply(&self, signal: &mut [f64], state: [f64; 2]) {
        let [b0, b1, b2] = self.b;
        let [_, a1, a2] = self.a;
        let [mut z0, mut z1] = state;
        for sample in signal.iter_mut() {
            let x = *sample;
            let y = b0 * x + z0;
            z0 = b1 * x - a1 * y + z1;
            z1 = b2 * x - a2 * y;
            *sample = y;
        }
    }
}

/// Digital low-pass as a cascade of second-order sections.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferFunction {
    sections: Vec<Section>,
}

impl TransferFunction {
    /// Butterworth low-pass of the given order.
    pub fn butterworth(order: usize, cutoff: f64) -> FilterResult<Self> {
        check_design(order, cutoff)?;
        digital_lowpass(butterworth_prototype(order), cutoff)
    }

    /// Chebyshev Type I low-pass with `ripple_db` of passband ripple.
    pub fn chebyshev1(order: usize, ripple_db: f64, cutoff: f64) -> FilterResult<Self> {
        check_design(order, cutoff)?;
        if !(ripple_db.is_finite() && ripple_db > 0.0) {
            return Err(FilterError::InvalidParameter(format!(
                "passband ripple must be positive, got {}",
                ripple_db
            )));
        }
        digital_lowpass(chebyshev1_prototype(order, ripple_db), cutoff)
    }

    /// Bessel low-pass whose phase response matches Butterworth asymptotically.
    pub fn bessel(order: usize, cutoff: f64) -> FilterResult<Self> {
        check_design(order, cutoff)?;
        digital_lowpass(bessel_prototype(order)?, cutoff)
    }

    /// Sections as `[b0, b1, b2, 1, a1, a2]` rows.
    pub fn sections(&self) -> Vec<[f64; 6]> {
        self.sections
            .iter()
            .map(|s| [s.b[0], s.b[1], s.b[2], s.a[0], s.a[1], s.a[2]])
            .collect()
    }

    /// Expanded numerator, highest power of `z^-1` last.
    pub fn numerator(&self) -> Vec<f64> {
        self.expand(|s| &s.b)
    }

    /// Expanded denominator with leading `1`.
    pub fn denominator(&self) -> Vec<f64> {
        self.expand(|s| &s.a)
    }

    fn expand(&self, pick: impl Fn(&Section) -> &[f64; 3]) -> Vec<f64> {
        self.sections.iter().fold(vec![1.0], |acc, section| {
            let taps = if section.is_first_order() { 2 } else { 3 };
            let coeffs = &pick(section)[..taps];
            let mut next = vec![0.0; acc.len() + taps - 1];
            for (i, x) in acc.iter().enumerate() {
                for (j, c) in coeffs.iter().enumerate() {
                    next[i + j] += x * c;
                }
            }
            next
        })
    }

    pub fn order(&self) -> usize {
        self.sections
            .iter()
            .map(|s| if s.is_first_order() { 1 } else { 2 })
            .sum()
    }

    /// Samples of odd extension added at each end by [`Self::filtfilt`]:
    /// `3 * (2 * sections + 1 - first_order_sections)`, i.e. `3 * (order + 1)`.
    pub fn padlen(&self) -> usize {
        let first_order = self.sections.iter().filter(|s| s.is_first_order()).count();
        3 * (2 * self.sections.len() + 1 - first_order)
    }

    /// Shortest signal [`Self::filtfilt`] accepts.
    pub fn min_samples(&self) -> usize {
        self.padlen() + 1
    }

    /// Gain at DC, the product of the section gains.
    pub fn dc_gain(&self) -> f64 {
        self.sections.iter().map(Section::dc_gain).product()
    }

    /// Single causal pass through every section, optionally seeded with one
    /// state pair per section.
    pub fn filter(&self, input: &[f64], initial: Option<&[[f64; 2]]>) -> Vec<f64> {
        let mut output = input.to_vec();
        for (idx, section) in self.sections.iter().enumerate() {
            let state = initial
                .and_then(|states| states.get(idx).copied())
                .unwrap_or([0.0; 2]);
            section.apply(&mut output, state);
        }
        output
    }

    /// Per-section initial states giving the steady-state response to a unit
    /// step; each is scaled by the DC gain of the sections before it.
    pub fn steady_state(&self) -> Vec<[f64; 2]> {
        let mut scale = 1.0;
        self.sections
            .iter()
            .map(|section| {
                let [z0, z1] = section.steady_state();
                let state = [z0 * scale, z1 * scale];
                scale *= section.dc_gain();
                state
            })
            .collect()
    }

    /// Zero-phase forward-backward filtering.
    pub fn filtfilt(&self, input: &[f64]) -> Result<Vec<f64>, StageError> {
        let edge = self.padlen();
        if input.len() <= edge {
            return Err(StageError::InsufficientSamples {
                required: self.min_samples(),
                available: input.len(),
            });
        }

        let zi = self.steady_state();
        let scaled = |x0: f64| -> Vec<[f64; 2]> {
            zi.iter().map(|[z0, z1]| [z0 * x0, z1 * x0]).collect()
        };
        let extended = odd_extension(input, edge);

        let mut forward = self.filter(&extended, Some(&scaled(extended[0])));
        let last = forward.last().copied().unwrap_or(0.0);
        forward.reverse();
        let mut backward = self.filter(&forward, Some(&scaled(last)));
        backward.reverse();

        Ok(backward[edge..edge + input.len()].to_vec())
    }
}

fn check_design(order: usize, cutoff: f64) -> FilterResult<()> {
    if order == 0 || order > crate::processing::config::MAX_IIR_ORDER {
        return Err(FilterError::InvalidParameter(format!(
            "filter order must be within 1..={}, got {}",
            crate::processing::config::MAX_IIR_ORDER,
            order
        )));
    }
    if !(cutoff > 0.0 && cutoff < 1.0) {
        return Err(FilterError::InvalidParameter(format!(
            "normalized cutoff must be within (0, 1), got {}",
            cutoff
        )));
    }
    Ok(())
}

/// Mirror the signal about its end points: `2 * x[0] - x[n..1]` in front and
/// `2 * x[last] - x[last-1..]` behind.
fn odd_extension(input: &[f64], edge: usize) -> Vec<f64> {
    let n = input.len();
    let first = input[0];
    let last = input[n - 1];

    let mut extended = Vec::with_capacity(n + 2 * edge);
    extended.extend((1..=edge).rev().map(|i| 2.0 * first - input[i]));
    extended.extend_from_slice(input);
    extended.extend((1..=edge).map(|i| 2.0 * last - input[n - 1 - i]));
    extended
}

/// Pre-warp, scale the prototype poles, map them through the bilinear
/// transform and group them into sections ordered from the pole farthest
/// from the unit circle to the closest.
fn digital_lowpass(prototype: AnalogPrototype, cutoff: f64) -> FilterResult<TransferFunction> {
    // Normalized frequencies correspond to a sample rate of 2.
    let fs = 2.0;
    let fs2 = 2.0 * fs;
    let warped = 2.0 * fs * (PI * cutoff / fs).tan();
    let order = prototype.poles.len();

    let target_dc = prototype.dc_gain();
    if !(target_dc.is_finite() && target_dc > 0.0) {
        return Err(FilterError::Design(format!(
            "prototype has unusable DC gain {}",
            target_dc
        )));
    }

    let mut complex_poles = Vec::new();
    let mut real_poles = Vec::new();
    for &pole in &prototype.poles {
        let analog = pole * warped;
        let digital = (fs2 + analog) / (fs2 - analog);
        let tolerance = 1e-8 * (1.0 + digital.norm());
        if digital.im > tolerance {
            complex_poles.push(digital);
        } else if digital.im.abs() <= tolerance {
            real_poles.push(digital.re);
        }
    }
    if 2 * complex_poles.len() + real_poles.len() != order {
        return Err(FilterError::Design(
            "prototype poles do not form conjugate pairs".into(),
        ));
    }
    complex_poles.sort_by(|x, y| x.norm().total_cmp(&y.norm()));
    real_poles.sort_by(|x, y| x.abs().total_cmp(&y.abs()));

    let mut sections = Vec::with_capacity((order + 1) / 2);
    for pair in real_poles.chunks(2) {
        let section = if let [p, q] = *pair {
            Section::lowpass([1.0, -(p + q), p * q], false)?
        } else {
            Section::lowpass([1.0, -pair[0], 0.0], true)?
        };
        sections.push(section);
    }
    for pole in complex_poles {
        sections.push(Section::lowpass([1.0, -2.0 * pole.re, pole.norm_sqr()], false)?);
    }

    if let Some(first) = sections.first_mut() {
        first.b = first.b.map(|v| v * target_dc);
    }
    let tf = TransferFunction { sections };

    let realized = tf.dc_gain();
    if !((realized - target_dc).abs() <= 1e-9 * target_dc.max(1.0)) {
        return Err(FilterError::Design(format!(
            "realized DC gain {} differs from design {}",
            realized, target_dc
        )));
    }
    Ok(tf)
}

fn butterworth_prototype(order: usize) -> AnalogPrototype {
    let n = order as f64;
    let poles = (0..order)
        .map(|k| {
            let m = -(n - 1.0) + 2.0 * k as f64;
            -Complex64::new(0.0, PI * m / (2.0 * n)).exp()
        })
        .collect();
    AnalogPrototype { poles, gain: 1.0 }
}

fn chebyshev1_prototype(order: usize, ripple_db: f64) -> AnalogPrototype {
    let n = order as f64;
    let eps = (10f64.powf(0.1 * ripple_db) - 1.0).sqrt();
    let mu = (1.0 / eps).asinh() / n;

    let poles: Vec<Complex64> = (0..order)
        .map(|k| {
            let m = -(n - 1.0) + 2.0 * k as f64;
            let theta = PI * m / (2.0 * n);
            -Complex64::new(mu, theta).sinh()
        })
        .collect();

    let mut gain = poles
        .iter()
        .fold(Complex64::new(1.0, 0.0), |acc, &p| acc * -p)
        .re;
    if order % 2 == 0 {
        gain /= (1.0 + eps * eps).sqrt();
    }
    AnalogPrototype { poles, gain }
}

/// Roots of the reverse Bessel polynomial, scaled so the phase response
/// approaches that of a Butterworth filter of the same order.
fn bessel_prototype(order: usize) -> FilterResult<AnalogPrototype> {
    let n = order;

    // theta_n(s) = sum a_k s^k with a_n = 1 and
    // a_k = a_{k+1} * (2n - k)(k + 1) / (2(n - k)).
    let mut coeffs = vec![0.0; n + 1];
    coeffs[n] = 1.0;
    for k in (0..n).rev() {
        coeffs[k] = coeffs[k + 1] * ((2 * n - k) * (k + 1)) as f64 / (2 * (n - k)) as f64;
    }

    // Substituting s = r * u with r = a_0^(1/n) keeps the coefficients
    // well scaled and yields the phase-normalized poles directly.
    let radius = coeffs[0].powf(1.0 / n as f64);
    let scaled: Vec<f64> = coeffs
        .iter()
        .enumerate()
        .map(|(k, &c)| c / radius.powi((n - k) as i32))
        .collect();

    let poles = polynomial_roots(&scaled)?;
    Ok(AnalogPrototype { poles, gain: 1.0 })
}

/// Durand-Kerner iteration for the roots of a monic polynomial given with
/// ascending coefficients.
fn polynomial_roots(ascending: &[f64]) -> FilterResult<Vec<Complex64>> {
    let degree = ascending.len() - 1;
    let eval = |z: Complex64| {
        ascending
            .iter()
            .rev()
            .fold(Complex64::new(0.0, 0.0), |acc, &c| acc * z + c)
    };

    let mut roots: Vec<Complex64> = (0..degree)
        .map(|k| Complex64::from_polar(1.0, 2.0 * PI * k as f64 / degree as f64 + 0.4))
        .collect();

    for _ in 0..2_000 {
        let mut largest_step = 0.0f64;
        for k in 0..degree {
            let zk = roots[k];
            let denominator = roots
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != k)
                .fold(Complex64::new(1.0, 0.0), |acc, (_, &zj)| acc * (zk - zj));
            if denominator.norm() == 0.0 {
                continue;
            }
            let step = eval(zk) / denominator;
            roots[k] = zk - step;
            largest_step = largest_step.max(step.norm());
        }
        if largest_step < 1e-15 {
            break;
        }
    }

    if roots.iter().any(|r| !r.re.is_finite() || !r.im.is_finite()) {
        return Err(FilterError::Design(
            "Bessel polynomial root search diverged".into(),
        ));
    }
    Ok(roots)
}
