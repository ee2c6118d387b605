use chrono::{DateTime, Utc};
use homestage_fixtures::Fixture;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::{ManualOverride, Pattern, PatternBehavior, PatternKind, RenderContext};
use crate::audio::FeatureSnapshot;
use crate::control::ManualControlState;
use crate::model::{MediaId, Track};

/// When the automatic variant is re-chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionPolicy {
    /// Random variant from the bank on every media change.
    #[default]
    Random,
    /// Variant derived from the section length on every section change.
    Section,
}

/// Which change callbacks fired during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub media: bool,
    pub section: bool,
    pub segment: bool,
}

/// Interval identity: the media it belongs to plus its timeline index.
type IntervalKey = (MediaId, usize);

/// Tracks media, section and segment identity across ticks and drives the
/// active pattern.
pub struct PatternController {
    policy: SelectionPolicy,
    rng: SmallRng,
    active: ManualOverride,
    last_media: Option<MediaId>,
    last_section: Option<IntervalKey>,
    last_segment: Option<IntervalKey>,
}

impl PatternController {
    pub fn new(policy: SelectionPolicy, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        let pattern = Pattern::new(PatternKind::RainbowSweep, &mut rng, 0.0);

        Self {
            policy,
            rng,
            active: ManualOverride::new(pattern),
            last_media: None,
            last_section: None,
            last_segment: None,
        }
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    pub fn active(&self) -> &ManualOverride {
        &self.active
    }

    /// Run change detection, then render one tick onto `fixtures`.
    pub fn update(
        &mut self,
        fixtures: &mut [Fixture],
        track: &Track,
        audio: &FeatureSnapshot,
        control: &ManualControlState,
        now: DateTime<Utc>,
    ) -> ChangeSet {
        let time = now.timestamp_micros() as f64 / 1_000_000.0;
        let mut changes = ChangeSet::default();

        let analysis = &track.analysis;
        let position = track.position_at(now);
        let section = position.and_then(|p| analysis.sections.index_at(p));
        let segment = position.and_then(|p| analysis.segments.index_at(p));
        let section_key = section.map(|index| (track.id, index));
        let segment_key = segment.map(|index| (track.id, index));

        if self.last_media != Some(track.id) {
            self.last_media = Some(track.id);
            changes.media = true;
            log_media_change(track);

            self.active.on_media_change(track);
            if self.policy == SelectionPolicy::Random {
                let pattern = Pattern::random(&mut self.rng, time);
                self.active.replace(pattern);
            }
        }

        if self.last_section != section_key {
            self.last_section = section_key;
            changes.section = true;

            let section = section.and_then(|index| analysis.sections.get(index));
            self.active.on_section_change(section, &mut self.rng);
            if self.policy == SelectionPolicy::Section {
                let pattern = Pattern::for_section(section, &mut self.rng, time);
                self.active.replace(pattern);
            }
        }

        if self.last_segment != segment_key {
            self.last_segment = segment_key;
            changes.segment = true;

            let segment = segment.and_then(|index| analysis.segments.get(index));
            self.active.on_segment_change(segment);
        }

        let mut ctx = RenderContext {
            time,
            audio,
            control,
            rng: &mut self.rng,
        };
        self.active.update(fixtures, &mut ctx);

        changes
    }
}

fn log_media_change(track: &Track) {
    let analysis = &track.analysis;
    log::info!(
        "Media changed: {} - {} (danceability: {:?}, energy: {:?}, valence: {:?})",
        track.artist.as_deref().unwrap_or("unknown artist"),
        track.title.as_deref().unwrap_or("unknown title"),
        analysis.danceability,
        analysis.energy,
        analysis.valence,
    );
}
