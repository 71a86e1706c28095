//! What one evaluation pass did.
//!
//! Evaluation never fails. Everything it had to skip is listed here as a
//! [`SkipEvent`] next to the matching `tracing` record, so hosts can surface
//! broken paths without parsing logs.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum SkipReason {
    /// The accessor could not resolve the path.
    Unresolved,
    NotAnimatable,
    IndexOutOfRange { len: usize },
    /// Driver skipped because it is flagged invalid.
    DriverInvalid,
    /// The accessor refused the value.
    WriteFailed,
    /// Strip re-entered itself or nesting exceeded the configured depth.
    GuardHit { depth: usize },
    /// Clip strip points at an action the library does not hold.
    MissingAction,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkipEvent {
    pub reason: SkipReason,
    /// Property path, or the strip name for strip-level skips.
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl SkipEvent {
    pub fn new(reason: SkipReason, path: impl Into<String>, index: Option<usize>) -> Self {
        Self {
            reason,
            path: path.into(),
            index,
        }
    }
}

/// Returned by `AnimationContext::evaluate`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EvalReport {
    pub time: f32,
    /// Channels written by curves or the NLA flush.
    pub channels_written: usize,
    /// Untouched domain channels put back to their default.
    pub channels_reset: usize,
    pub drivers_evaluated: usize,
    pub overrides_applied: usize,
    #[serde(default)]
    pub skipped: Vec<SkipEvent>,
}

impl EvalReport {
    pub fn at(time: f32) -> Self {
        Self {
            time,
            ..Self::default()
        }
    }

    #[inline]
    pub fn skip(&mut self, event: SkipEvent) {
        self.skipped.push(event);
    }

    pub fn skipped_because(&self, reason: &SkipReason) -> impl Iterator<Item = &SkipEvent> + '_ {
        let reason = reason.clone();
        self.skipped.iter().filter(move |e| e.reason == reason)
    }

    #[inline]
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_by_reason() {
        let mut report = EvalReport::at(3.0);
        assert!(report.is_clean());
        report.skip(SkipEvent::new(SkipReason::Unresolved, "location", Some(0)));
        report.skip(SkipEvent::new(SkipReason::WriteFailed, "scale", Some(2)));
        report.skip(SkipEvent::new(SkipReason::Unresolved, "rotation", Some(1)));
        let paths: Vec<_> = report
            .skipped_because(&SkipReason::Unresolved)
            .map(|e| e.path.as_str())
            .collect();
        assert_eq!(paths, ["location", "rotation"]);
    }

    #[test]
    fn serializes_reason_tag() {
        let event = SkipEvent::new(SkipReason::IndexOutOfRange { len: 3 }, "location", Some(5));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["reason"]["kind"], "index_out_of_range");
        assert_eq!(json["reason"]["len"], 3);
    }
}
