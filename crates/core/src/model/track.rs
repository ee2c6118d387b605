use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timeline::{Timeline, Timing};

/// A large-scale part of a track (verse, chorus, bridge...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub start: f64,
    pub duration: f64,
    #[serde(default)]
    pub loudness: Option<f64>,
    #[serde(default)]
    pub tempo: Option<f64>,
}

impl Section {
    pub fn new(start: f64, duration: f64) -> Self {
        Self {
            start,
            duration,
            loudness: None,
            tempo: None,
        }
    }
}

impl Timing for Section {
    fn start(&self) -> f64 {
        self.start
    }
}

/// A short, roughly note-length slice of a track with its loudness envelope
/// and pitch/timbre vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub duration: f64,
    #[serde(default)]
    pub loudness_start: Option<f64>,
    #[serde(default)]
    pub loudness_max: Option<f64>,
    #[serde(default)]
    pub loudness_max_time: Option<f64>,
    #[serde(default)]
    pub loudness_end: Option<f64>,
    #[serde(default)]
    pub pitches: Vec<f64>,
    #[serde(default)]
    pub timbre: Vec<f64>,
}

impl Segment {
    pub fn new(start: f64, duration: f64) -> Self {
        Self {
            start,
            duration,
            loudness_start: None,
            loudness_max: None,
            loudness_max_time: None,
            loudness_end: None,
            pitches: Vec::new(),
            timbre: Vec::new(),
        }
    }
}

impl Timing for Segment {
    fn start(&self) -> f64 {
        self.start
    }
}

/// Track-level audio features plus the section and segment timelines.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub loudness: Option<f64>,
    pub speechiness: Option<f64>,
    pub acousticness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub liveness: Option<f64>,
    pub valence: Option<f64>,
    pub sections: Timeline<Section>,
    pub segments: Timeline<Segment>,
}

/// Identity of a piece of media. A new id is issued every time the track is
/// replaced; resyncing the start time keeps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MediaId(pub u64);

/// The track currently playing, as reported by the media source.
#[derive(Debug, Clone, Default)]
pub struct Track {
    pub id: MediaId,
    pub artist: Option<String>,
    pub title: Option<String>,
    pub uri: Option<String>,
    pub media_type: Option<String>,
    pub start_datetime: Option<DateTime<Utc>>,
    pub analysis: Arc<Analysis>,
}

impl Track {
    /// Elapsed seconds since the track started, if it is playing.
    pub fn position(&self) -> Option<f64> {
        self.position_at(Utc::now())
    }

    pub fn position_at(&self, now: DateTime<Utc>) -> Option<f64> {
        self.start_datetime.map(|start| {
            let elapsed = now - start;
            elapsed.num_microseconds().unwrap_or(i64::MAX) as f64 / 1_000_000.0
        })
    }

    /// Same track with a corrected start instant.
    pub fn resynced(&self, start_datetime: DateTime<Utc>) -> Self {
        Self {
            start_datetime: Some(start_datetime),
            ..self.clone()
        }
    }

    pub fn summary(&self, now: DateTime<Utc>) -> TrackSummary {
        TrackSummary {
            artist: self.artist.clone(),
            title: self.title.clone(),
            uri: self.uri.clone(),
            position: self.position_at(now),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSummary {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub uri: Option<String>,
    pub position: Option<f64>,
}
