//! Non-linear animation: strips placed on tracks, selected per track and blended
//! into one value per channel.

pub mod channels;
pub mod eval;
pub mod select;
pub mod strip;
pub mod track;

pub use channels::{blend, EvalChannels};
pub use eval::EvalGuard;
pub use select::{select_active, EvalStrip, Neighbours, StripTimeMode};
pub use strip::{BlendMode, Extend, Strip, StripControls, StripFlags, StripKind};
pub use track::{Track, TrackFlags};
