use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::audio::{CaptureBackend, FeatureExtractor};
use crate::config::StageConfig;
use crate::control::ManualControlState;
use crate::control_loop::{ControlLoop, Lifecycle, StageState};
use crate::messages::{CommandReply, StageCommand, StageStatus};
use crate::model::{MediaId, MediaPayload, PayloadError, Track};
use crate::output::Transmitter;
use crate::pattern::PatternController;

/// Loops built by [`Stage::new`] that haven't been spawned yet.
struct Pending {
    extractor: FeatureExtractor,
    control_loop: ControlLoop,
}

/// The running show: everything the control surface talks to.
///
/// Owns the feature extractor thread and the control loop task once started.
/// All methods take `&self` and may be called from any thread.
pub struct Stage {
    state: Arc<StageState>,
    lifecycle: Arc<Lifecycle>,
    microphone: Arc<RwLock<Option<String>>>,
    running: Arc<AtomicBool>,
    media_ids: AtomicU64,
    backend: Arc<dyn CaptureBackend>,
    pending: Mutex<Option<Pending>>,
    extractor_thread: Mutex<Option<thread::JoinHandle<()>>>,
    control_task: Mutex<Option<JoinHandle<()>>>,
}

impl Stage {
    pub fn new(
        config: &StageConfig,
        backend: Arc<dyn CaptureBackend>,
        transmitter: Arc<dyn Transmitter>,
    ) -> Self {
        let analysis = Arc::new(AtomicBool::new(false));
        let extractor = FeatureExtractor::new(config.audio.clone(), Arc::clone(&analysis));
        let state = Arc::new(StageState::new(extractor.snapshot_handle()));
        let lifecycle = Arc::new(Lifecycle::new(analysis, Arc::clone(&transmitter)));

        let controller = PatternController::new(config.patterns.selection, config.patterns.seed);
        let control_loop = ControlLoop::new(
            Arc::clone(&lifecycle),
            Arc::clone(&state),
            controller,
            config.build_fixtures(),
            transmitter,
        );

        Self {
            state,
            lifecycle,
            microphone: Arc::new(RwLock::new(config.microphone.clone())),
            running: Arc::new(AtomicBool::new(true)),
            media_ids: AtomicU64::new(0),
            backend,
            pending: Mutex::new(Some(Pending {
                extractor,
                control_loop,
            })),
            extractor_thread: Mutex::new(None),
            control_task: Mutex::new(None),
        }
    }

    /// Spawn the extractor thread and the control loop on `runtime`. Output
    /// stays disabled until [`Stage::set_enabled`]. Calling this again does
    /// nothing.
    pub fn start(&self, runtime: &Handle) -> std::io::Result<()> {
        let Some(pending) = self.pending.lock().take() else {
            return Ok(());
        };

        let thread = pending.extractor.spawn(
            Arc::clone(&self.backend),
            Arc::clone(&self.microphone),
            Arc::clone(&self.running),
        )?;
        *self.extractor_thread.lock() = Some(thread);

        let task = runtime.spawn(pending.control_loop.run(Arc::clone(&self.running)));
        *self.control_task.lock() = Some(task);

        log::info!("Stage started");
        Ok(())
    }

    /// Disable output and stop both loops, waiting for them to exit.
    pub async fn shutdown(&self) {
        log::info!("Stage shutting down");
        self.set_enabled(false);
        self.running.store(false, Ordering::Relaxed);

        let task = self.control_task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                log::error!("Control loop task failed: {}", e);
            }
        }

        let thread = self.extractor_thread.lock().take();
        if let Some(thread) = thread {
            let joined = tokio::task::spawn_blocking(move || thread.join()).await;
            if !matches!(joined, Ok(Ok(()))) {
                log::error!("Feature extractor thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Replace the current track. The track gets a fresh media id, so the
    /// next tick sees a media change even if the metadata is identical.
    pub fn reset_track(&self, track: Track) -> MediaId {
        let id = MediaId(self.media_ids.fetch_add(1, Ordering::Relaxed) + 1);
        *self.state.track.write() = Arc::new(Track { id, ..track });
        id
    }

    pub fn reset_media(&self, payload: MediaPayload) -> Result<MediaId, PayloadError> {
        Ok(self.reset_track(payload.into_track(MediaId::default())?))
    }

    /// Correct only the start instant of the current track.
    pub fn resync(&self, start_datetime: DateTime<Utc>) {
        let mut track = self.state.track.write();
        *track = Arc::new(track.resynced(start_datetime));
    }

    pub fn track(&self) -> Arc<Track> {
        Arc::clone(&self.state.track.read())
    }

    pub fn set_manual_control(&self, control: ManualControlState) {
        *self.state.control.write() = control;
    }

    /// Request an output transition. Returns whether anything changed.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        self.lifecycle.set_enabled(enabled)
    }

    pub fn is_enabled(&self) -> bool {
        self.lifecycle.is_enabled()
    }

    /// Select the capture device. The extractor re-opens on its next read.
    pub fn set_microphone(&self, microphone: Option<String>) {
        let mut current = self.microphone.write();
        if *current != microphone {
            log::info!("Microphone changed: {:?} -> {:?}", *current, microphone);
            *current = microphone;
        }
    }

    pub fn status(&self) -> StageStatus {
        let features = self.state.features.read().clone();
        StageStatus {
            enabled: self.is_enabled(),
            beat: features.beat,
            tempo: features.tempo,
            spectrum_adjusted: features.spectrum,
            track: self.state.track.read().summary(Utc::now()),
            microphone: self.microphone.read().clone(),
            pattern: *self.state.pattern.read(),
        }
    }

    /// Apply one command from the control surface.
    pub fn apply(&self, command: StageCommand) -> CommandReply {
        match command {
            StageCommand::Media(payload) => {
                if let Err(e) = self.reset_media(payload) {
                    return CommandReply::error(e);
                }
            }
            StageCommand::Position(position) => match position.start_instant() {
                Ok(start) => self.resync(start),
                Err(e) => return CommandReply::error(e),
            },
            StageCommand::Enabled { enabled } => {
                self.set_enabled(enabled);
            }
            StageCommand::Control(control) => self.set_manual_control(control),
            StageCommand::Microphone { microphone } => self.set_microphone(microphone),
            StageCommand::Status => return CommandReply::Status(self.status()),
        }
        CommandReply::ok()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::audio::{CaptureDevice, CaptureError};
    use crate::control_loop::tests::CountingTransmitter;

    struct NoDevices {
        opens: AtomicUsize,
    }

    impl CaptureBackend for NoDevices {
        fn open(
            &self,
            device: &str,
            _sample_rate: u32,
            _channels: u16,
            _block_size: usize,
        ) -> Result<Box<dyn CaptureDevice>, CaptureError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Err(CaptureError::DeviceNotFound(device.to_string()))
        }
    }

    fn stage() -> (Stage, Arc<CountingTransmitter>) {
        let transmitter = Arc::new(CountingTransmitter::default());
        let backend = Arc::new(NoDevices {
            opens: AtomicUsize::new(0),
        });
        let stage = Stage::new(
            &StageConfig::default(),
            backend,
            Arc::clone(&transmitter) as Arc<dyn Transmitter>,
        );
        (stage, transmitter)
    }

    #[test]
    fn test_reset_and_resync() {
        let (stage, _) = stage();
        assert_eq!(stage.track().id, MediaId(0));

        let first = stage.reset_track(Track::default());
        let second = stage.reset_track(Track::default());
        assert_eq!(first, MediaId(1));
        assert_eq!(second, MediaId(2));

        let start = Utc::now() - ChronoDuration::seconds(30);
        stage.resync(start);
        let track = stage.track();
        assert_eq!(track.id, second);
        assert_eq!(track.start_datetime, Some(start));
    }

    #[test]
    fn test_apply_commands() {
        let (stage, transmitter) = stage();

        let reply = stage.apply(r#"{"command": "enabled", "enabled": true}"#.parse().unwrap());
        assert!(matches!(reply, CommandReply::Success { success: true }));
        stage.apply(r#"{"command": "enabled", "enabled": true}"#.parse().unwrap());
        assert_eq!(transmitter.starts.load(Ordering::SeqCst), 1);

        stage.apply(
            r#"{"command": "media", "artist": "A", "title": "B", "analysis": {"energy": 0.5}}"#
                .parse()
                .unwrap(),
        );
        stage.apply(r#"{"command": "microphone", "microphone": "USB Mic"}"#.parse().unwrap());
        stage.apply(r#"{"command": "control", "triangle": true}"#.parse().unwrap());

        let CommandReply::Status(status) = stage.apply(StageCommand::Status) else {
            panic!("expected status");
        };
        assert!(status.enabled);
        assert_eq!(status.track.title.as_deref(), Some("B"));
        assert_eq!(status.track.position, None);
        assert_eq!(status.microphone.as_deref(), Some("USB Mic"));
        assert_eq!(status.spectrum_adjusted, vec![0.0; 8]);
        assert!(stage.state.control.read().triangle);

        stage.apply(r#"{"command": "enabled", "enabled": false}"#.parse().unwrap());
        assert_eq!(transmitter.stops.load(Ordering::SeqCst), 1);
        assert!(!stage.status().enabled);
    }

    #[test]
    fn test_out_of_range_position_is_an_error_reply() {
        let (stage, _transmitter) = stage();
        let id = stage.reset_track(Track::default());

        let command = r#"{"command": "position", "elapsed": 1e300, "at": "2024-05-01T20:00:00Z"}"#;
        let reply = stage.apply(command.parse().unwrap());
        assert!(matches!(reply, CommandReply::Error { .. }));

        let command = r#"{
            "command": "media",
            "title": "Song",
            "start_datetime": {"elapsed": 1e300, "at": "2024-05-01T20:00:00Z"}
        }"#;
        let reply = stage.apply(command.parse().unwrap());
        assert!(matches!(reply, CommandReply::Error { .. }));

        // The current track is untouched
        let track = stage.track();
        assert_eq!(track.id, id);
        assert!(track.start_datetime.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_start_render_and_shutdown() {
        let (stage, transmitter) = stage();
        stage.start(&Handle::current()).unwrap();
        // Second start is a no-op
        stage.start(&Handle::current()).unwrap();

        stage.set_enabled(true);
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert!(transmitter.sends.load(Ordering::SeqCst) > 0);
        assert!(stage.status().pattern.is_some());

        stage.shutdown().await;
        assert!(!stage.is_running());
        assert!(!stage.is_enabled());
        assert_eq!(transmitter.stops.load(Ordering::SeqCst), 1);
    }
}
