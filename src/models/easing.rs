//! Easing curves for animated transitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Base shape of an easing curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Curve {
    /// Constant speed
    Linear,
    /// Quadratic
    Quad,
    /// Cubic
    Cubic,
    /// Sinusoidal
    Sin,
    /// Exponential
    Exp,
    /// Circular
    Circle,
    /// Spring-like oscillation
    Elastic,
    /// Slight overshoot before settling
    Back,
    /// Overshoots and settles
    Bounce,
}

/// Which end(s) of the transition the curve is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EaseMode {
    /// Slow start
    In,
    /// Slow end
    Out,
    /// Slow start and end
    InOut,
}

/// A named interpolation curve such as `elastic` or `cubic-in-out`.
///
/// The bare curve name (`elastic`) is kept distinct from its explicit
/// `-in-out` spelling so the name round-trips unchanged into outgoing
/// messages, but both evaluate identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Easing {
    pub curve: Curve,
    pub mode: Option<EaseMode>,
}

impl Default for Easing {
    fn default() -> Self {
        Self { curve: Curve::Cubic, mode: Some(EaseMode::InOut) }
    }
}

impl Easing {
    pub const fn new(curve: Curve, mode: Option<EaseMode>) -> Self {
        Self { curve, mode }
    }

    /// Apply the easing function to a normalized time value (0.0 to 1.0).
    ///
    /// Returns the eased value (also 0.0 to 1.0, but may exceed bounds for
    /// back/elastic).
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self.mode.unwrap_or(EaseMode::InOut) {
            EaseMode::In => ease_in(self.curve, t),
            EaseMode::Out => 1.0 - ease_in(self.curve, 1.0 - t),
            EaseMode::InOut => {
                if t < 0.5 {
                    ease_in(self.curve, 2.0 * t) / 2.0
                } else {
                    1.0 - ease_in(self.curve, 2.0 - 2.0 * t) / 2.0
                }
            }
        }
    }

    /// Parse an easing function from a string.
    pub fn from_str(s: &str) -> Option<Easing> {
        let name = s.trim().to_lowercase().replace('_', "-");
        let (base, mode) = if let Some(base) = name.strip_suffix("-in-out") {
            (base, Some(EaseMode::InOut))
        } else if let Some(base) = name.strip_suffix("-in") {
            (base, Some(EaseMode::In))
        } else if let Some(base) = name.strip_suffix("-out") {
            (base, Some(EaseMode::Out))
        } else {
            (name.as_str(), None)
        };

        let curve = match base {
            "linear" => Curve::Linear,
            "quad" => Curve::Quad,
            "cubic" => Curve::Cubic,
            "sin" => Curve::Sin,
            "exp" => Curve::Exp,
            "circle" => Curve::Circle,
            "elastic" => Curve::Elastic,
            "back" => Curve::Back,
            "bounce" => Curve::Bounce,
            _ => return None,
        };
        Some(Easing { curve, mode })
    }

    /// All accepted curve base names.
    pub fn curve_names() -> &'static [&'static str] {
        &["linear", "quad", "cubic", "sin", "exp", "circle", "elastic", "back", "bounce"]
    }
}

fn ease_in(curve: Curve, t: f64) -> f64 {
    use std::f64::consts::PI;

    match curve {
        Curve::Linear => t,
        Curve::Quad => t * t,
        Curve::Cubic => t * t * t,
        Curve::Sin => 1.0 - (t * PI / 2.0).cos(),
        Curve::Exp => {
            if t == 0.0 {
                0.0
            } else {
                2.0_f64.powf(10.0 * t - 10.0)
            }
        }
        Curve::Circle => 1.0 - (1.0 - t * t).max(0.0).sqrt(),
        Curve::Elastic => {
            if t == 0.0 || t == 1.0 {
                t
            } else {
                let c4 = (2.0 * PI) / 3.0;
                -(2.0_f64.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * c4).sin()
            }
        }
        Curve::Back => {
            let c1 = 1.70158;
            let c3 = c1 + 1.0;
            c3 * t * t * t - c1 * t * t
        }
        Curve::Bounce => 1.0 - bounce_out(1.0 - t),
    }
}

fn bounce_out(t: f64) -> f64 {
    let n1 = 7.5625;
    let d1 = 2.75;
    if t < 1.0 / d1 {
        n1 * t * t
    } else if t < 2.0 / d1 {
        let t = t - 1.5 / d1;
        n1 * t * t + 0.75
    } else if t < 2.5 / d1 {
        let t = t - 2.25 / d1;
        n1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / d1;
        n1 * t * t + 0.984375
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = match self.curve {
            Curve::Linear => "linear",
            Curve::Quad => "quad",
            Curve::Cubic => "cubic",
            Curve::Sin => "sin",
            Curve::Exp => "exp",
            Curve::Circle => "circle",
            Curve::Elastic => "elastic",
            Curve::Back => "back",
            Curve::Bounce => "bounce",
        };
        match self.mode {
            None => write!(f, "{}", base),
            Some(EaseMode::In) => write!(f, "{}-in", base),
            Some(EaseMode::Out) => write!(f, "{}-out", base),
            Some(EaseMode::InOut) => write!(f, "{}-in-out", base),
        }
    }
}

impl TryFrom<String> for Easing {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Easing::from_str(&value).ok_or_else(|| {
            format!(
                "unknown easing '{}' (expected one of {}, optionally suffixed -in, -out or -in-out)",
                value,
                Easing::curve_names().join(", ")
            )
        })
    }
}

impl From<Easing> for String {
    fn from(value: Easing) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_and_suffixed() {
        assert_eq!(Easing::from_str("elastic"), Some(Easing::new(Curve::Elastic, None)));
        assert_eq!(
            Easing::from_str("cubic-in-out"),
            Some(Easing::new(Curve::Cubic, Some(EaseMode::InOut)))
        );
        assert_eq!(Easing::from_str("quad_out"), Some(Easing::new(Curve::Quad, Some(EaseMode::Out))));
        assert_eq!(Easing::from_str("wobble"), None);
        assert_eq!(Easing::from_str("cubic-sideways"), None);
    }

    #[test]
    fn test_name_round_trips() {
        for name in ["elastic", "linear-in", "bounce-out", "cubic-in-out"] {
            assert_eq!(Easing::from_str(name).unwrap().to_string(), name);
        }
    }

    #[test]
    fn test_default_is_cubic_in_out() {
        assert_eq!(Easing::default().to_string(), "cubic-in-out");
    }

    #[test]
    fn test_endpoints() {
        for name in Easing::curve_names() {
            for suffix in ["", "-in", "-out", "-in-out"] {
                let easing = Easing::from_str(&format!("{}{}", name, suffix)).unwrap();
                assert!(easing.apply(0.0).abs() < 1e-6, "{}{} at 0", name, suffix);
                assert!((easing.apply(1.0) - 1.0).abs() < 1e-6, "{}{} at 1", name, suffix);
            }
        }
    }

    #[test]
    fn test_bare_name_evaluates_as_in_out() {
        let bare = Easing::from_str("quad").unwrap();
        let explicit = Easing::from_str("quad-in-out").unwrap();
        for t in [0.1, 0.3, 0.5, 0.8] {
            assert_eq!(bare.apply(t), explicit.apply(t));
        }
    }

    #[test]
    fn test_ease_in_is_slow_start() {
        let easing = Easing::from_str("cubic-in").unwrap();
        assert!(easing.apply(0.25) < 0.25);
        let easing = Easing::from_str("cubic-out").unwrap();
        assert!(easing.apply(0.25) > 0.25);
    }

    #[test]
    fn test_serde_as_string() {
        let easing: Easing = serde_json::from_str("\"elastic\"").unwrap();
        assert_eq!(easing.curve, Curve::Elastic);
        assert_eq!(serde_json::to_string(&easing).unwrap(), "\"elastic\"");
        assert!(serde_json::from_str::<Easing>("\"nope\"").is_err());
    }
}
