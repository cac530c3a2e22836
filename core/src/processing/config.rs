//! Filter selection payload and its canonical cache key.
//!
//! External filter panels hand the engine a flat settings map such as
//! `{"type": "bessel", "bessel_order": 4, "bessel_cutoff": 0.1}`. The map is
//! parsed into a typed [`FilterConfig`]; keys that do not belong to the
//! selected kind are ignored and missing keys take their defaults.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::prelude::{FilterError, FilterResult};

/// Flat key/value payload produced by filter selection widgets.
pub type FilterSettings = Map<String, Value>;

pub const BUTTERWORTH_ORDER: usize = 4;
pub const BUTTERWORTH_CUTOFF: f64 = 0.1;
pub const CHEBY1_ORDER: usize = 4;
pub const CHEBY1_RIPPLE_DB: f64 = 1.0;
pub const CHEBY1_CUTOFF: f64 = 0.1;
pub const BESSEL_ORDER: usize = 4;
pub const BESSEL_CUTOFF: f64 = 0.1;
pub const SAVGOL_WINDOW: usize = 11;
pub const SAVGOL_POLYORDER: usize = 2;
pub const MEDIAN_KERNEL: usize = 5;
pub const MOVING_AVG_WINDOW: usize = 5;

/// Highest IIR order accepted by the designers.
pub const MAX_IIR_ORDER: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterKind {
    Butterworth,
    ChebyshevTypeI,
    Bessel,
    SavitzkyGolay,
    Median,
    MovingAverage,
}

impl FilterKind {
    pub const ALL: [FilterKind; 6] = [
        FilterKind::Butterworth,
        FilterKind::ChebyshevTypeI,
        FilterKind::Bessel,
        FilterKind::SavitzkyGolay,
        FilterKind::Median,
        FilterKind::MovingAverage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKind::Butterworth => "butterworth",
            FilterKind::ChebyshevTypeI => "chebyshev_type_i",
            FilterKind::Bessel => "bessel",
            FilterKind::SavitzkyGolay => "savitzky_golay",
            FilterKind::Median => "median",
            FilterKind::MovingAverage => "moving_average",
        }
    }

    /// Unknown names map to `None`; callers fall back to Butterworth.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Whether the kind is applied forward and backward.
    pub fn is_zero_phase(&self) -> bool {
        matches!(
            self,
            FilterKind::Butterworth | FilterKind::ChebyshevTypeI | FilterKind::Bessel
        )
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed filter selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FilterSettings", into = "FilterSettings")]
pub enum FilterConfig {
    Butterworth {
        order: usize,
        cutoff: f64,
    },
    ChebyshevTypeI {
        order: usize,
        ripple_db: f64,
        cutoff: f64,
    },
    Bessel {
        order: usize,
        cutoff: f64,
    },
    SavitzkyGolay {
        window: usize,
        polyorder: usize,
    },
    Median {
        kernel: usize,
    },
    MovingAverage {
        window: usize,
    },
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig::Butterworth {
            order: BUTTERWORTH_ORDER,
            cutoff: BUTTERWORTH_CUTOFF,
        }
    }
}

impl FilterConfig {
    /// Default parameters for the given kind.
    pub fn defaults_for(kind: FilterKind) -> Self {
        Self::from_kind_and_settings(kind, &FilterSettings::new())
            .unwrap_or_default()
    }

    /// Parse a settings payload. A missing or unrecognised `type` selects
    /// Butterworth.
    pub fn from_settings(settings: &FilterSettings) -> FilterResult<Self> {
        let kind = settings
            .get("type")
            .and_then(Value::as_str)
            .and_then(FilterKind::parse)
            .unwrap_or(FilterKind::Butterworth);
        Self::from_kind_and_settings(kind, settings)
    }

    fn from_kind_and_settings(kind: FilterKind, settings: &FilterSettings) -> FilterResult<Self> {
        let config = match kind {
            FilterKind::Butterworth => FilterConfig::Butterworth {
                order: integer(settings, "butter_order", BUTTERWORTH_ORDER)?,
                cutoff: real(settings, "butter_cutoff", BUTTERWORTH_CUTOFF)?,
            },
            FilterKind::ChebyshevTypeI => FilterConfig::ChebyshevTypeI {
                order: integer(settings, "cheby1_order", CHEBY1_ORDER)?,
                ripple_db: real(settings, "cheby1_rp", CHEBY1_RIPPLE_DB)?,
                cutoff: real(settings, "cheby1_cutoff", CHEBY1_CUTOFF)?,
            },
            FilterKind::Bessel => FilterConfig::Bessel {
                order: integer(settings, "bessel_order", BESSEL_ORDER)?,
                cutoff: real(settings, "bessel_cutoff", BESSEL_CUTOFF)?,
            },
            FilterKind::SavitzkyGolay => FilterConfig::SavitzkyGolay {
                window: integer(settings, "savgol_window", SAVGOL_WINDOW)?,
                polyorder: integer(settings, "savgol_polyorder", SAVGOL_POLYORDER)?,
            },
            FilterKind::Median => FilterConfig::Median {
                kernel: integer(settings, "median_kernel", MEDIAN_KERNEL)?,
            },
            FilterKind::MovingAverage => FilterConfig::MovingAverage {
                window: integer(settings, "moving_avg_window", MOVING_AVG_WINDOW)?,
            },
        };
        Ok(config)
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            FilterConfig::Butterworth { .. } => FilterKind::Butterworth,
            FilterConfig::ChebyshevTypeI { .. } => FilterKind::ChebyshevTypeI,
            FilterConfig::Bessel { .. } => FilterKind::Bessel,
            FilterConfig::SavitzkyGolay { .. } => FilterKind::SavitzkyGolay,
            FilterConfig::Median { .. } => FilterKind::Median,
            FilterConfig::MovingAverage { .. } => FilterKind::MovingAverage,
        }
    }

    /// Parameters under their settings-payload names, sorted by name.
    pub fn params(&self) -> Vec<(&'static str, f64)> {
        let mut params = match *self {
            FilterConfig::Butterworth { order, cutoff } => {
                vec![("butter_order", order as f64), ("butter_cutoff", cutoff)]
            }
            FilterConfig::ChebyshevTypeI {
                order,
                ripple_db,
                cutoff,
            } => vec![
                ("cheby1_order", order as f64),
                ("cheby1_rp", ripple_db),
                ("cheby1_cutoff", cutoff),
            ],
            FilterConfig::Bessel { order, cutoff } => {
                vec![("bessel_order", order as f64), ("bessel_cutoff", cutoff)]
            }
            FilterConfig::SavitzkyGolay { window, polyorder } => vec![
                ("savgol_window", window as f64),
                ("savgol_polyorder", polyorder as f64),
            ],
            FilterConfig::Median { kernel } => vec![("median_kernel", kernel as f64)],
            FilterConfig::MovingAverage { window } => {
                vec![("moving_avg_window", window as f64)]
            }
        };
        params.sort_by(|a, b| a.0.cmp(b.0));
        params
    }

    /// Canonical, ordering-independent cache key.
    pub fn key(&self) -> FilterKey {
        FilterKey {
            kind: self.kind(),
            params: self
                .params()
                .into_iter()
                .map(|(name, value)| (name, canonical_bits(value)))
                .collect(),
        }
    }

    /// Range checks shared by every design and application path.
    pub fn validate(&self) -> FilterResult<()> {
        match *self {
            FilterConfig::Butterworth { order, cutoff }
            | FilterConfig::Bessel { order, cutoff } => {
                check_order(order)?;
                check_cutoff(cutoff)
            }
            FilterConfig::ChebyshevTypeI {
                order,
                ripple_db,
                cutoff,
            } => {
                check_order(order)?;
                check_cutoff(cutoff)?;
                if !(ripple_db.is_finite() && ripple_db > 0.0) {
                    return Err(FilterError::InvalidParameter(format!(
                        "passband ripple must be positive, got {} dB",
                        ripple_db
                    )));
                }
                Ok(())
            }
            FilterConfig::SavitzkyGolay { window, polyorder } => {
                check_odd("savgol_window", window)?;
                if polyorder >= window {
                    return Err(FilterError::InvalidParameter(format!(
                        "polyorder {} must be less than window length {}",
                        polyorder, window
                    )));
                }
                Ok(())
            }
            FilterConfig::Median { kernel } => check_odd("median_kernel", kernel),
            FilterConfig::MovingAverage { window } => {
                if window == 0 {
                    return Err(FilterError::InvalidParameter(
                        "moving_avg_window must be at least 1".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}

impl TryFrom<FilterSettings> for FilterConfig {
    type Error = FilterError;

    fn try_from(settings: FilterSettings) -> Result<Self, Self::Error> {
        FilterConfig::from_settings(&settings)
    }
}

impl From<FilterConfig> for FilterSettings {
    fn from(config: FilterConfig) -> Self {
        let mut settings = FilterSettings::new();
        settings.insert("type".into(), Value::from(config.kind().as_str()));
        for (name, value) in config.params() {
            let value = if name.ends_with("cutoff") || name.ends_with("_rp") {
                Value::from(value)
            } else {
                Value::from(value as u64)
            };
            settings.insert(name.into(), value);
        }
        settings
    }
}

impl fmt::Display for FilterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.kind())?;
        for (idx, (name, value)) in self.params().iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        f.write_str(")")
    }
}

/// Hashable identity of a [`FilterConfig`]: the kind plus its parameters
/// sorted by name, with values compared bit-for-bit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterKey {
    kind: FilterKind,
    params: Vec<(&'static str, u64)>,
}

impl FilterKey {
    pub fn kind(&self) -> FilterKind {
        self.kind
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.kind)?;
        for (idx, (name, bits)) in self.params.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", name, f64::from_bits(*bits))?;
        }
        f.write_str("}")
    }
}

fn canonical_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

fn integer(settings: &FilterSettings, key: &str, default: usize) -> FilterResult<usize> {
    let Some(value) = settings.get(key) else {
        return Ok(default);
    };
    if let Some(n) = value.as_u64() {
        return usize::try_from(n)
            .map_err(|_| FilterError::InvalidParameter(format!("{} is too large", key)));
    }
    match value.as_f64() {
        Some(n) if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 => Ok(n as usize),
        _ => Err(FilterError::InvalidParameter(format!(
            "{} must be a non-negative integer, got {}",
            key, value
        ))),
    }
}

fn real(settings: &FilterSettings, key: &str, default: f64) -> FilterResult<f64> {
    match settings.get(key) {
        None => Ok(default),
        Some(value) => value.as_f64().ok_or_else(|| {
            FilterError::InvalidParameter(format!("{} must be a number, got {}", key, value))
        }),
    }
}

fn check_order(order: usize) -> FilterResult<()> {
    if order == 0 || order > MAX_IIR_ORDER {
        return Err(FilterError::InvalidParameter(format!(
            "filter order must be within 1..={}, got {}",
            MAX_IIR_ORDER, order
        )));
    }
    Ok(())
}

fn check_cutoff(cutoff: f64) -> FilterResult<()> {
    if !(cutoff > 0.0 && cutoff < 1.0) {
        return Err(FilterError::InvalidParameter(format!(
            "normalized cutoff must be within (0, 1), got {}",
            cutoff
        )));
    }
    Ok(())
}

fn check_odd(name: &str, value: usize) -> FilterResult<()> {
    if value == 0 || value % 2 == 0 {
        return Err(FilterError::InvalidParameter(format!(
            "{} must be a positive odd integer, got {}",
            name, value
        )));
    }
    Ok(())
}
