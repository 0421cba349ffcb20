//! Animation options carried by batch-animate scopes.

use serde::{Deserialize, Serialize};

use super::easing::Easing;

/// Default transition duration in milliseconds.
pub const DEFAULT_DURATION_MS: u64 = 500;

/// Options given when opening an animate scope.
///
/// # Examples
///
/// ```
/// use figbatch::models::AnimationOptions;
///
/// let opts = AnimationOptions::parse("elastic", 1200).unwrap();
/// assert_eq!(opts.easing.to_string(), "elastic");
/// assert_eq!(opts.duration, 1200);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationOptions {
    /// Interpolation curve for the transition
    #[serde(default)]
    pub easing: Easing,
    /// Transition and frame duration in milliseconds
    #[serde(default = "default_duration")]
    pub duration: u64,
}

fn default_duration() -> u64 {
    DEFAULT_DURATION_MS
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self { easing: Easing::default(), duration: DEFAULT_DURATION_MS }
    }
}

impl AnimationOptions {
    pub fn new(easing: Easing, duration: u64) -> Self {
        Self { easing, duration }
    }

    /// Build options from an easing name, failing on unknown names.
    pub fn parse(easing: &str, duration: u64) -> Result<Self, String> {
        let easing = Easing::try_from(easing.to_string())?;
        Ok(Self { easing, duration })
    }

    /// The `animation_opts` record sent alongside an animate message.
    pub fn to_animation_opts(&self) -> AnimationOpts {
        AnimationOpts {
            transition: TransitionOpts { easing: self.easing, duration: self.duration },
            frame: FrameOpts { duration: self.duration },
        }
    }
}

/// `{transition: {easing, duration}, frame: {duration}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationOpts {
    pub transition: TransitionOpts,
    pub frame: FrameOpts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOpts {
    pub easing: Easing,
    pub duration: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameOpts {
    pub duration: u64,
}
