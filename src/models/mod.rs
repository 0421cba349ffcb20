//! Data models for figures (traces, layout, frames) and animation options

mod animation;
mod easing;
mod node;

// Re-export all public types
pub use animation::{
    AnimationOptions, AnimationOpts, FrameOpts, TransitionOpts, DEFAULT_DURATION_MS,
};
pub use easing::{Curve, EaseMode, Easing};
pub use node::{Frame, Layout, NodeKind, NodeRef, PropertyNode, Trace};
