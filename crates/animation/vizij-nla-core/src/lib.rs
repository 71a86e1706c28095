//! Vizij NLA Core (engine-agnostic)
//!
//! Keyframe curves with Bezier and easing interpolation, procedural modifiers,
//! drivers, and a non-linear animation stack that selects one strip per track and
//! blends the results into host properties. The host's object model is reached only
//! through [`PropertyAccessor`]; evaluation never fails, it skips and reports.

pub mod accessor;
pub mod action;
pub mod anim_data;
pub mod baking;
pub mod clipboard;
pub mod config;
pub mod context;
pub mod curve;
pub mod driver;
pub mod easing;
pub mod error;
pub mod ids;
pub mod keyframe;
pub mod modifier;
pub mod nla;
pub mod report;
pub mod scratch;
pub mod solver;

// Re-exports for hosts
pub use accessor::{BindingCache, ChannelKey, PropertyAccessor, PropertyHandle};
pub use action::{Action, ActionLibrary, Group};
pub use anim_data::{AnimData, AnimFlags, Override, Recalc, TweakTarget};
pub use clipboard::{KeyframeClipboard, PasteMerge};
pub use config::Config;
pub use context::AnimationContext;
pub use curve::{Curve, CurveData, CurveFlags, CycleType, Extrapolation};
pub use driver::{
    Driver, DriverKind, ExpressionBackend, ExpressionError, SimpleExpressionBackend, Target,
    Variable, VariableKind, VariableMap,
};
pub use error::{NlaError, Result};
pub use ids::{ActionId, OwnerId, StripId};
pub use keyframe::{Easing, HandleType, InsertMode, Interpolation, Keyframe, Sample};
pub use modifier::{Modifier, ModifierKind, ModifierStack};
pub use nla::{BlendMode, EvalChannels, Extend, Strip, StripFlags, StripKind, Track, TrackFlags};
pub use report::{EvalReport, SkipEvent, SkipReason};
