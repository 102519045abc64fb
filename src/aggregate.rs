//! Per-frame and per-session detection counts.

use std::collections::BTreeMap;
use std::fmt;

use crate::detect::Detection;

/// Class name to count within a single frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameCounters {
    counts: BTreeMap<String, u64>,
}

impl FrameCounters {
    pub fn from_detections(detections: &[Detection]) -> Self {
        let mut counts = BTreeMap::new();
        for det in detections {
            *counts.entry(det.class_name.clone()).or_insert(0) += 1;
        }
        Self { counts }
    }

    /// True when the frame had no detections.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn get(&self, class_name: &str) -> u64 {
        self.counts.get(class_name).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(name, count)| (name.as_str(), *count))
    }

    /// Per-frame log line, e.g. `Frame 3: car:2 person:1`.
    pub fn summary_line(&self, frame_index: u64) -> String {
        let joined: Vec<String> = self
            .iter()
            .map(|(name, count)| format!("{}:{}", name, count))
            .collect();
        format!("Frame {}: {}", frame_index, joined.join(" "))
    }
}

/// Cumulative class counts for one session. Never decreases.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionCounters {
    counts: BTreeMap<String, u64>,
}

impl SessionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    fn merge(&mut self, frame: &FrameCounters) {
        for (name, count) in frame.iter() {
            *self.counts.entry(name.to_string()).or_insert(0) += count;
        }
    }

    pub fn get(&self, class_name: &str) -> u64 {
        self.counts.get(class_name).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(name, count)| (name.as_str(), *count))
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

impl fmt::Display for SessionCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, count) in self.iter() {
            writeln!(f, "  {}: {}", name, count)?;
        }
        Ok(())
    }
}

/// Builds frame counters and folds them into the session totals.
#[derive(Debug, Default)]
pub struct DetectionAggregator {
    session: SessionCounters,
}

impl DetectionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one frame's detections. Empty input returns empty counters and
    /// leaves the session untouched.
    pub fn ingest(&mut self, detections: &[Detection]) -> FrameCounters {
        let frame = FrameCounters::from_detections(detections);
        if !frame.is_empty() {
            self.session.merge(&frame);
        }
        frame
    }

    pub fn session(&self) -> &SessionCounters {
        &self.session
    }
}
