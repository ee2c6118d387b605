use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use homestage_fixtures::{Fixture, Frame};
use parking_lot::{Mutex, RwLock};
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};

use crate::audio::FeatureSnapshot;
use crate::control::ManualControlState;
use crate::model::Track;
use crate::output::Transmitter;
use crate::pattern::{PatternController, PatternKind};

/// Render interval while output is enabled.
pub const TICK_INTERVAL: Duration = Duration::from_millis(10);
/// Poll interval while output is disabled.
pub const IDLE_INTERVAL: Duration = Duration::from_secs(1);

/// Values pushed in from outside and read by the control loop every tick.
/// Each is replaced whole.
#[derive(Debug, Default)]
pub struct StageState {
    pub track: RwLock<Arc<Track>>,
    pub features: Arc<RwLock<FeatureSnapshot>>,
    pub control: RwLock<ManualControlState>,
    /// Variant the control loop rendered last.
    pub pattern: RwLock<Option<PatternKind>>,
}

impl StageState {
    pub fn new(features: Arc<RwLock<FeatureSnapshot>>) -> Self {
        Self {
            track: RwLock::new(Arc::new(Track::default())),
            features,
            control: RwLock::new(ManualControlState::default()),
            pattern: RwLock::new(None),
        }
    }
}

/// Output enable/disable. Enabling turns on audio analysis and starts the
/// transmitter; disabling turns both off. Transitions are serialized and
/// repeating the current state does nothing.
pub struct Lifecycle {
    enabled: Mutex<bool>,
    analysis: Arc<AtomicBool>,
    transmitter: Arc<dyn Transmitter>,
}

impl Lifecycle {
    pub fn new(analysis: Arc<AtomicBool>, transmitter: Arc<dyn Transmitter>) -> Self {
        Self {
            enabled: Mutex::new(false),
            analysis,
            transmitter,
        }
    }

    /// Returns whether the state changed.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        let mut current = self.enabled.lock();
        if *current == enabled {
            return false;
        }

        if enabled {
            log::info!("Output enabled");
            self.analysis.store(true, Ordering::Relaxed);
            self.transmitter.start();
        } else {
            log::info!("Output disabled");
            self.analysis.store(false, Ordering::Relaxed);
            self.transmitter.stop();
        }
        *current = enabled;
        true
    }

    pub fn is_enabled(&self) -> bool {
        *self.enabled.lock()
    }
}

/// Fixed-rate render loop: pattern pass, frame assembly, hand-off.
pub struct ControlLoop {
    lifecycle: Arc<Lifecycle>,
    state: Arc<StageState>,
    controller: PatternController,
    fixtures: Vec<Fixture>,
    transmitter: Arc<dyn Transmitter>,
}

impl ControlLoop {
    pub fn new(
        lifecycle: Arc<Lifecycle>,
        state: Arc<StageState>,
        controller: PatternController,
        fixtures: Vec<Fixture>,
        transmitter: Arc<dyn Transmitter>,
    ) -> Self {
        Self {
            lifecycle,
            state,
            controller,
            fixtures,
            transmitter,
        }
    }

    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    /// One render pass at `now`. The frame is handed to the transmitter and
    /// also returned.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Frame {
        let track = Arc::clone(&self.state.track.read());
        let features = self.state.features.read().clone();
        let control = self.state.control.read().clone();

        self.controller
            .update(&mut self.fixtures, &track, &features, &control, now);
        *self.state.pattern.write() = Some(self.controller.active().kind());

        let frame = Frame::from_fixtures(&self.fixtures);
        self.transmitter.send(frame.clone());
        frame
    }

    /// Render while enabled, idle while disabled, until `running` clears.
    pub async fn run(mut self, running: Arc<AtomicBool>) {
        log::info!(
            "Control loop started with {} fixtures",
            self.fixtures.len()
        );

        let mut ticker = interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while running.load(Ordering::Relaxed) {
            if self.lifecycle.is_enabled() {
                ticker.tick().await;
                self.tick(Utc::now());
            } else {
                sleep(IDLE_INTERVAL).await;
            }
        }

        log::info!("Control loop stopped");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::AtomicUsize;

    use homestage_fixtures::{ChannelField, FixtureKind};

    use super::*;
    use crate::pattern::SelectionPolicy;

    /// Transmitter that only counts calls. `send_delay` stands in for slow
    /// rendering.
    #[derive(Default)]
    pub(crate) struct CountingTransmitter {
        pub send_delay: Duration,
        pub starts: AtomicUsize,
        pub stops: AtomicUsize,
        pub sends: AtomicUsize,
        pub last: Mutex<Option<Frame>>,
    }

    impl Transmitter for CountingTransmitter {
        fn start(&self) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }

        fn send(&self, frame: Frame) {
            if !self.send_delay.is_zero() {
                std::thread::sleep(self.send_delay);
            }
            self.sends.fetch_add(1, Ordering::SeqCst);
            *self.last.lock() = Some(frame);
        }
    }

    fn lifecycle() -> (Arc<Lifecycle>, Arc<AtomicBool>, Arc<CountingTransmitter>) {
        let analysis = Arc::new(AtomicBool::new(false));
        let transmitter = Arc::new(CountingTransmitter::default());
        let lifecycle = Arc::new(Lifecycle::new(
            Arc::clone(&analysis),
            Arc::clone(&transmitter) as Arc<dyn Transmitter>,
        ));
        (lifecycle, analysis, transmitter)
    }

    #[test]
    fn test_enable_twice_starts_once() {
        let (lifecycle, analysis, transmitter) = lifecycle();
        assert!(!lifecycle.is_enabled());

        assert!(lifecycle.set_enabled(true));
        assert!(!lifecycle.set_enabled(true));
        assert_eq!(transmitter.starts.load(Ordering::SeqCst), 1);
        assert!(analysis.load(Ordering::SeqCst));

        assert!(lifecycle.set_enabled(false));
        assert!(!lifecycle.set_enabled(false));
        assert_eq!(transmitter.stops.load(Ordering::SeqCst), 1);
        assert!(!analysis.load(Ordering::SeqCst));
    }

    #[test]
    fn test_disable_while_disabled_never_stops() {
        let (lifecycle, _analysis, transmitter) = lifecycle();
        lifecycle.set_enabled(false);
        lifecycle.set_enabled(false);
        assert_eq!(transmitter.stops.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_concurrent_toggles_stay_balanced() {
        let (lifecycle, _analysis, transmitter) = lifecycle();

        let threads: Vec<_> = (0..8)
            .map(|i| {
                let lifecycle = Arc::clone(&lifecycle);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        lifecycle.set_enabled(i % 2 == 0);
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        let starts = transmitter.starts.load(Ordering::SeqCst);
        let stops = transmitter.stops.load(Ordering::SeqCst);
        let expected_stops = if lifecycle.is_enabled() { starts - 1 } else { starts };
        assert_eq!(stops, expected_stops);
    }

    fn control_loop(
        transmitter: Arc<CountingTransmitter>,
        lifecycle: Arc<Lifecycle>,
    ) -> ControlLoop {
        let state = Arc::new(StageState::default());
        let fixtures = vec![
            Fixture::new("left", FixtureKind::LedWash, 0),
            Fixture::new("right", FixtureKind::LedWash, 100),
        ];
        ControlLoop::new(
            lifecycle,
            state,
            PatternController::new(SelectionPolicy::Random, Some(8)),
            fixtures,
            transmitter,
        )
    }

    #[test]
    fn test_tick_places_fixtures_in_frame() {
        let (lifecycle, _analysis, transmitter) = lifecycle();
        let mut control_loop = control_loop(Arc::clone(&transmitter), lifecycle);

        let frame = control_loop.tick(Utc::now());
        assert_eq!(transmitter.sends.load(Ordering::SeqCst), 1);

        let fixtures = control_loop.fixtures();
        assert_eq!(&frame.as_slice()[0..7], fixtures[0].values());
        assert_eq!(&frame.as_slice()[100..107], fixtures[1].values());
        assert_eq!(frame.get(0), fixtures[0].get(ChannelField::Brightness));
        assert_eq!(transmitter.last.lock().as_ref(), Some(&frame));
    }

    #[tokio::test]
    async fn test_run_renders_only_while_enabled() {
        let (lifecycle, _analysis, transmitter) = lifecycle();
        let control_loop = control_loop(Arc::clone(&transmitter), Arc::clone(&lifecycle));
        let running = Arc::new(AtomicBool::new(true));

        lifecycle.set_enabled(true);
        let handle = tokio::spawn(control_loop.run(Arc::clone(&running)));

        sleep(Duration::from_millis(100)).await;
        let rendered = transmitter.sends.load(Ordering::SeqCst);
        assert!(rendered > 2, "only {} frames rendered", rendered);

        lifecycle.set_enabled(false);
        // Let an in-flight tick finish
        sleep(Duration::from_millis(30)).await;
        let after_disable = transmitter.sends.load(Ordering::SeqCst);
        sleep(Duration::from_millis(100)).await;
        assert_eq!(transmitter.sends.load(Ordering::SeqCst), after_disable);

        running.store(false, Ordering::Relaxed);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_tick_rate_absorbs_render_time() {
        let analysis = Arc::new(AtomicBool::new(false));
        let transmitter = Arc::new(CountingTransmitter {
            send_delay: Duration::from_millis(6),
            ..CountingTransmitter::default()
        });
        let lifecycle = Arc::new(Lifecycle::new(
            analysis,
            Arc::clone(&transmitter) as Arc<dyn Transmitter>,
        ));
        let control_loop = control_loop(Arc::clone(&transmitter), Arc::clone(&lifecycle));
        let running = Arc::new(AtomicBool::new(true));

        lifecycle.set_enabled(true);
        let handle = tokio::spawn(control_loop.run(Arc::clone(&running)));
        sleep(Duration::from_millis(500)).await;
        running.store(false, Ordering::Relaxed);
        handle.await.unwrap();

        // A fixed 10ms period gives ~50 frames; sleeping after each 6ms
        // render would give ~31
        let rendered = transmitter.sends.load(Ordering::SeqCst);
        assert!(rendered >= 40, "only {} frames rendered", rendered);
    }
}
