/*!
 # Device session

 [`LightSession`] owns everything about one strip: the cached
 [`LightState`], the connection state machine, the write channel, and the
 idle-disconnect timer. Commands connect lazily, write through the
 transport, and re-arm the timer; after an idle window with no commands the
 radio link is dropped until the next command needs it.
*/

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use crate::discovery::DeviceIdentity;
use crate::protocol::{color_frame, frame_hex, power_frame, LightState};
use crate::transport::{BleTransport, LightTransport};
use crate::{Error, Result};

/// Idle window after the last command before the radio link is dropped
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection state of one session.
///
/// Transitions are driven only by session operations and the idle timer.
enum Connection<C> {
    Disconnected,
    Connecting,
    Connected { channel: C },
}

/// Which frame a command dispatch encodes.
enum FrameKind {
    Power,
    Color,
}

struct SessionInner<T: LightTransport> {
    transport: T,
    state: LightState,
    connection: Connection<T::Channel>,
    /// Whether a write channel has ever been acquired for this session
    ever_connected: bool,
    idle_task: Option<JoinHandle<()>>,
    /// Bumped on every re-arm; a firing timer with a stale epoch is a no-op
    idle_epoch: u64,
}

/// Session for controlling one LED strip through a [`LightTransport`].
///
/// All operations on one session are serialized behind a single lock, so
/// concurrent commands never interleave a half-acquired channel and at most
/// one write is in flight at a time. Sessions for different strips are
/// fully independent.
pub struct LightSession<T: LightTransport> {
    inner: Arc<Mutex<SessionInner<T>>>,
    identity: DeviceIdentity,
    idle_timeout: Duration,
}

/// btleplug-backed session, the type the binaries use
pub type BleLight = LightSession<BleTransport>;

impl<T: LightTransport> LightSession<T> {
    /// Creates a session over a matched transport. Does not connect; the
    /// first command does.
    pub fn new(transport: T, identity: DeviceIdentity) -> Self {
        Self::with_idle_timeout(transport, identity, DEFAULT_IDLE_TIMEOUT)
    }

    /// Creates a session with a custom idle window.
    pub fn with_idle_timeout(
        transport: T,
        identity: DeviceIdentity,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                transport,
                state: LightState::default(),
                connection: Connection::Disconnected,
                ever_connected: false,
                idle_task: None,
                idle_epoch: 0,
            })),
            identity,
            idle_timeout,
        }
    }

    /// The identity this session was created for.
    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Turns the strip on or off.
    ///
    /// Sends only the power frame; color fields are untouched.
    #[instrument(skip(self))]
    pub async fn set_power(&self, on: bool) -> Result<()> {
        debug!("Setting power to {}", if on { "ON" } else { "OFF" });
        self.dispatch(move |state| state.power = on, FrameKind::Power)
            .await
    }

    /// Sets the brightness percentage (0-100) and re-sends the full color.
    #[instrument(skip(self))]
    pub async fn set_brightness(&self, percent: u8) -> Result<()> {
        let limited = percent.min(100);
        if percent > 100 {
            warn!(
                "Brightness value {} out of range (0-100), limiting to 100",
                percent
            );
        }
        debug!("Setting brightness to {}%", limited);
        self.dispatch(move |state| state.brightness = limited, FrameKind::Color)
            .await
    }

    /// Sets the hue in degrees (wrapped modulo 360) and re-sends the full
    /// color.
    #[instrument(skip(self))]
    pub async fn set_hue(&self, degrees: u16) -> Result<()> {
        let wrapped = degrees % 360;
        debug!("Setting hue to {}°", wrapped);
        self.dispatch(move |state| state.hue = wrapped, FrameKind::Color)
            .await
    }

    /// Sets the saturation percentage (0-100) and re-sends the full color.
    #[instrument(skip(self))]
    pub async fn set_saturation(&self, percent: u8) -> Result<()> {
        let limited = percent.min(100);
        if percent > 100 {
            warn!(
                "Saturation value {} out of range (0-100), limiting to 100",
                percent
            );
        }
        debug!("Setting saturation to {}%", limited);
        self.dispatch(move |state| state.saturation = limited, FrameKind::Color)
            .await
    }

    /// Returns the cached power state.
    ///
    /// Until a write channel has been acquired at least once the cache is
    /// only an assumption, so this reports [`Error::DeviceUnreachable`]
    /// instead of a default.
    pub async fn get_power(&self) -> Result<bool> {
        let inner = self.inner.lock().await;
        if !inner.ever_connected {
            return Err(Error::DeviceUnreachable);
        }
        debug!(
            "Reporting cached power state: {}",
            if inner.state.power { "ON" } else { "OFF" }
        );
        Ok(inner.state.power)
    }

    /// Snapshot of the cached logical state.
    pub async fn state(&self) -> LightState {
        self.inner.lock().await.state
    }

    /// Whether the radio link is currently up.
    pub async fn is_connected(&self) -> bool {
        matches!(
            self.inner.lock().await.connection,
            Connection::Connected { .. }
        )
    }

    /// Acknowledges an identify request from the host platform.
    ///
    /// No device interaction; the strip has no identify routine.
    pub fn identify(&self) {
        info!("Identifying light: {}", self.identity.display_name);
    }

    /// Runs one command: ensure connected, update state, encode from the
    /// full current state, write, re-arm the idle timer.
    async fn dispatch<F>(&self, apply: F, kind: FrameKind) -> Result<()>
    where
        F: FnOnce(&mut LightState),
    {
        let mut inner = self.inner.lock().await;
        self.ensure_connected(&mut inner).await?;

        apply(&mut inner.state);
        let frame = match kind {
            FrameKind::Power => power_frame(inner.state.power).to_vec(),
            FrameKind::Color => color_frame(&inner.state).to_vec(),
        };

        let channel = match &inner.connection {
            Connection::Connected { channel } => channel.clone(),
            _ => return Err(Error::DeviceUnreachable),
        };

        trace!("Writing frame {}", frame_hex(&frame));
        let outcome = inner.transport.write(&channel, &frame).await;
        if let Err(ref e) = outcome {
            // The cache keeps the optimistic value; the strip may now
            // disagree until the next successful command.
            warn!("Command write failed for {}: {e}", self.identity.display_name);
        }

        self.arm_idle_disconnect(&mut inner);
        outcome
    }

    /// Brings the connection up if it is not already.
    ///
    /// The request that triggered a failed connect is dropped, not retried;
    /// the next command is the retry vector.
    async fn ensure_connected(&self, inner: &mut SessionInner<T>) -> Result<()> {
        if matches!(inner.connection, Connection::Connected { .. }) {
            return Ok(());
        }

        info!("Connecting to {}", self.identity.display_name);
        inner.connection = Connection::Connecting;

        if let Err(e) = inner.transport.connect().await {
            warn!("Connect to {} failed: {e}", self.identity.display_name);
            inner.connection = Connection::Disconnected;
            return Err(e);
        }

        match inner.transport.acquire_channel().await {
            Ok(channel) => {
                debug!("Write channel acquired");
                inner.connection = Connection::Connected { channel };
                inner.ever_connected = true;
                Ok(())
            }
            Err(e) => {
                // Terminal for this attempt: drop the link entirely.
                warn!(
                    "Channel acquisition on {} failed: {e}",
                    self.identity.display_name
                );
                if let Err(teardown) = inner.transport.disconnect().await {
                    warn!("Teardown after failed acquisition failed: {teardown}");
                }
                inner.connection = Connection::Disconnected;
                Err(e)
            }
        }
    }

    /// Arms the idle-disconnect timer, replacing any pending one.
    ///
    /// Abort plus epoch check keeps the invariant of at most one pending
    /// disconnect: a timer that fires concurrently with a re-arm sees a
    /// stale epoch under the lock and does nothing.
    fn arm_idle_disconnect(&self, inner: &mut SessionInner<T>) {
        if let Some(task) = inner.idle_task.take() {
            task.abort();
        }
        inner.idle_epoch += 1;
        let epoch = inner.idle_epoch;

        let session: Weak<Mutex<SessionInner<T>>> = Arc::downgrade(&self.inner);
        let delay = self.idle_timeout;
        let name = self.identity.display_name.clone();

        trace!("Arming idle disconnect in {:?}", delay);
        inner.idle_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let Some(session) = session.upgrade() else {
                return;
            };
            let mut inner = session.lock().await;
            if inner.idle_epoch != epoch {
                return;
            }
            inner.idle_task = None;

            if matches!(inner.connection, Connection::Connected { .. }) {
                info!("Idle timeout, disconnecting from {name}");
                inner.connection = Connection::Disconnected;
                if let Err(e) = inner.transport.disconnect().await {
                    warn!("Idle disconnect from {name} failed: {e}");
                }
            }
        }));
    }
}
