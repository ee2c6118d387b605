use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;

use artnet_protocol::{ArtCommand, Output, PortAddress};
use homestage_fixtures::Frame;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

use super::network_config::{ArtNetConfig, ArtNetMode};
use super::{OutputError, Transmitter};

/// Encodes frames as ArtDmx packets for one universe.
struct ArtNet {
    socket: UdpSocket,
    destination: SocketAddr,
    port_address: PortAddress,
    sequence: u8,
}

impl ArtNet {
    fn new(config: &ArtNetConfig) -> Result<Self, OutputError> {
        let source = config.source();
        let socket = UdpSocket::bind(source).map_err(|source_err| OutputError::Bind {
            addr: source,
            source: source_err,
        })?;

        match config.mode() {
            ArtNetMode::Broadcast => {
                socket.set_broadcast(true)?;
                log::debug!("Broadcast mode set up OK");
            }
            ArtNetMode::Unicast(src, destination) => {
                log::debug!(
                    "Will connect from interface {} to destination {}",
                    src,
                    destination
                );
                socket.set_broadcast(false)?;
            }
        }

        let port_address = PortAddress::try_from(config.universe)
            .map_err(|_| OutputError::Universe(config.universe))?;

        Ok(ArtNet {
            socket,
            destination: config.target(),
            port_address,
            sequence: 0,
        })
    }

    fn packet(&mut self, frame: &Frame) -> Result<Vec<u8>, OutputError> {
        // 0 means "sequencing disabled", so wrap 255 -> 1
        self.sequence = self.sequence.checked_add(1).unwrap_or(1);

        let command = ArtCommand::Output(Output {
            sequence: self.sequence,
            port_address: self.port_address,
            data: frame.to_vec().into(),
            ..Output::default()
        });
        command
            .write_to_buffer()
            .map_err(|err| OutputError::Encode(format!("{:?}", err)))
    }

    fn send_data(&mut self, frame: &Frame) -> Result<(), OutputError> {
        let bytes = self.packet(frame)?;
        self.socket.send_to(&bytes, self.destination)?;
        Ok(())
    }
}

struct SendTask {
    handle: JoinHandle<()>,
    shutdown: oneshot::Sender<()>,
}

/// Art-Net sink with its own send clock.
///
/// The socket is bound when the transmitter is built. While started, a tokio
/// task resends the most recent frame at the configured rate whether or not a
/// new one arrived.
pub struct ArtNetTransmitter {
    config: ArtNetConfig,
    runtime: Handle,
    artnet: Arc<Mutex<ArtNet>>,
    latest: Arc<Mutex<Option<Frame>>>,
    task: Mutex<Option<SendTask>>,
}

impl ArtNetTransmitter {
    pub fn new(config: ArtNetConfig, runtime: Handle) -> Result<Self, OutputError> {
        log::info!("Initializing Art-Net output: {}", config);
        let artnet = ArtNet::new(&config)?;

        Ok(Self {
            config,
            runtime,
            artnet: Arc::new(Mutex::new(artnet)),
            latest: Arc::new(Mutex::new(None)),
            task: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &ArtNetConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }
}

impl Transmitter for ArtNetTransmitter {
    fn start(&self) {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            return;
        }

        let (shutdown, shutdown_rx) = oneshot::channel();
        let handle = self.runtime.spawn(run_send_loop(
            Arc::clone(&self.artnet),
            Arc::clone(&self.latest),
            self.config.fps,
            shutdown_rx,
        ));
        *task = Some(SendTask { handle, shutdown });
    }

    fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            // The loop may already be gone; either way it won't send again
            let _ = task.shutdown.send(());
        }
    }

    fn send(&self, frame: Frame) {
        *self.latest.lock() = Some(frame);
    }
}

impl Drop for ArtNetTransmitter {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_send_loop(
    artnet: Arc<Mutex<ArtNet>>,
    latest: Arc<Mutex<Option<Frame>>>,
    fps: f64,
    mut shutdown: oneshot::Receiver<()>,
) {
    let fps = fps.max(1.0);
    let mut frame_interval = interval(Duration::from_secs_f64(1.0 / fps));
    frame_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let status_every = (fps as u64 * 5).max(1);
    let mut frames_sent: u64 = 0;

    log::info!("Art-Net output started, running at {}Hz", fps);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = frame_interval.tick() => {
                let Some(frame) = latest.lock().clone() else {
                    continue;
                };

                if let Err(e) = artnet.lock().send_data(&frame) {
                    log::warn!("Art-Net send failed: {}", e);
                    continue;
                }

                frames_sent += 1;
                // Every 5 seconds
                if frames_sent % status_every == 0 {
                    log::debug!("Art-Net: {} frames sent", frames_sent);
                }
            }
        }
    }

    log::info!(
        "Art-Net output shutting down after sending {} frames",
        frames_sent
    );
}
