//! Wire formats for the track metadata pushed in by the media source.
//!
//! These mirror the JSON the browser companion posts. Conversion into the
//! domain types sorts the timelines; nothing else is checked.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use thiserror::Error;

use super::timeline::Timeline;
use super::track::{Analysis, MediaId, Section, Segment, Track};

#[derive(Debug, Error, PartialEq)]
pub enum PayloadError {
    #[error("start_datetime out of range: {elapsed}s elapsed at {at}")]
    StartOutOfRange { elapsed: f64, at: DateTime<Utc> },
}

/// "`elapsed` seconds into the track at instant `at`".
#[derive(Debug, Clone, Deserialize)]
pub struct StartDateTimePayload {
    pub elapsed: f64,
    pub at: DateTime<Utc>,
}

impl StartDateTimePayload {
    /// The instant the track started playing.
    pub fn start_instant(&self) -> Result<DateTime<Utc>, PayloadError> {
        let out_of_range = || PayloadError::StartOutOfRange {
            elapsed: self.elapsed,
            at: self.at,
        };
        if !self.elapsed.is_finite() {
            return Err(out_of_range());
        }
        let elapsed = Duration::microseconds((self.elapsed * 1_000_000.0) as i64);
        self.at.checked_sub_signed(elapsed).ok_or_else(out_of_range)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnalysisPayload {
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub loudness: Option<f64>,
    pub speechiness: Option<f64>,
    pub acousticness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub liveness: Option<f64>,
    pub valence: Option<f64>,
    pub sections: Vec<Section>,
    pub segments: Vec<Segment>,
}

impl From<AnalysisPayload> for Analysis {
    fn from(payload: AnalysisPayload) -> Self {
        Analysis {
            danceability: payload.danceability,
            energy: payload.energy,
            loudness: payload.loudness,
            speechiness: payload.speechiness,
            acousticness: payload.acousticness,
            instrumentalness: payload.instrumentalness,
            liveness: payload.liveness,
            valence: payload.valence,
            sections: Timeline::new(payload.sections),
            segments: Timeline::new(payload.segments),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MediaPayload {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub uri: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub start_datetime: Option<StartDateTimePayload>,
    pub analysis: Option<AnalysisPayload>,
}

impl MediaPayload {
    pub fn into_track(self, id: MediaId) -> Result<Track, PayloadError> {
        let start_datetime = self
            .start_datetime
            .map(|s| s.start_instant())
            .transpose()?;
        Ok(Track {
            id,
            artist: self.artist,
            title: self.title,
            uri: self.uri,
            media_type: self.media_type,
            start_datetime,
            analysis: Arc::new(self.analysis.map(Analysis::from).unwrap_or_default()),
        })
    }
}
