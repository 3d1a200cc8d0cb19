/*!
 # Radio transport seam

 [`LightTransport`] is the narrow surface the session drives: connect,
 acquire the write channel, write, disconnect. [`BleTransport`] implements
 it over a matched btleplug peripheral; tests substitute a scripted
 transport instead of a radio.
*/

use async_trait::async_trait;
use btleplug::api::{CharPropFlags, Characteristic, Peripheral as _, WriteType};
use btleplug::platform::Peripheral;
use tracing::{debug, instrument, trace};
use uuid::Uuid;

use crate::{Error, Result};

/// Service and characteristic UUIDs for one hardware revision.
///
/// Two incompatible UUID schemes ship under the KS03 name; the protocol has
/// no negotiation, so the right profile must be configured per install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GattProfile {
    /// Advertised service UUID, also usable as a discovery filter
    pub service: Uuid,
    /// Characteristic all commands are written to
    pub write: Uuid,
    /// Optional state-read characteristic
    pub read: Option<Uuid>,
}

/// Hardware revisions with distinct GATT layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareRevision {
    /// Revision advertising the `0000afdX` UUID family
    Afd,
    /// Revision advertising the short-form `EEA0`/`EE01` family
    Ee,
}

impl HardwareRevision {
    /// Returns the GATT profile for this revision.
    pub fn profile(self) -> GattProfile {
        match self {
            HardwareRevision::Afd => GattProfile {
                service: Uuid::from_u128(0x0000afd0_0000_1000_8000_00805f9b34fb),
                write: Uuid::from_u128(0x0000afd1_0000_1000_8000_00805f9b34fb),
                read: Some(Uuid::from_u128(0x0000afd3_0000_1000_8000_00805f9b34fb)),
            },
            HardwareRevision::Ee => GattProfile {
                service: Uuid::from_u128(0x0000eea0_0000_1000_8000_00805f9b34fb),
                write: Uuid::from_u128(0x0000ee01_0000_1000_8000_00805f9b34fb),
                read: None,
            },
        }
    }
}

/// Radio operations the session needs from a matched peripheral.
///
/// Completion of each call is the only acknowledgment the session sees;
/// command-level timeouts belong to the radio layer underneath.
#[async_trait]
pub trait LightTransport: Send + Sync + 'static {
    /// Handle to the write channel; valid until the next disconnect.
    type Channel: Clone + Send + Sync + 'static;

    /// Establishes the radio connection.
    async fn connect(&self) -> Result<()>;

    /// Discovers services and returns the write channel.
    async fn acquire_channel(&self) -> Result<Self::Channel>;

    /// Writes one command frame to the channel.
    async fn write(&self, channel: &Self::Channel, payload: &[u8]) -> Result<()>;

    /// Tears the radio connection down.
    async fn disconnect(&self) -> Result<()>;
}

/// btleplug-backed transport over a matched peripheral.
pub struct BleTransport {
    peripheral: Peripheral,
    profile: GattProfile,
}

impl BleTransport {
    /// Wraps a matched peripheral with the GATT profile of its revision.
    pub fn new(peripheral: Peripheral, profile: GattProfile) -> Self {
        Self {
            peripheral,
            profile,
        }
    }

    /// The GATT profile this transport was configured with.
    pub fn profile(&self) -> GattProfile {
        self.profile
    }
}

#[async_trait]
impl LightTransport for BleTransport {
    type Channel = Characteristic;

    #[instrument(skip(self))]
    async fn connect(&self) -> Result<()> {
        let connected = self
            .peripheral
            .is_connected()
            .await
            .map_err(|e| Error::ConnectFailed(e.to_string()))?;
        if !connected {
            debug!("Connecting to peripheral");
            self.peripheral
                .connect()
                .await
                .map_err(|e| Error::ConnectFailed(e.to_string()))?;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn acquire_channel(&self) -> Result<Characteristic> {
        debug!("Discovering services...");
        self.peripheral
            .discover_services()
            .await
            .map_err(|e| Error::ConnectFailed(e.to_string()))?;

        let write_char = self
            .peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == self.profile.write)
            .ok_or_else(|| Error::NoMatchingCharacteristic(self.profile.write.to_string()))?;

        debug!("Found write characteristic: {}", write_char.uuid);

        if let Some(read_uuid) = self.profile.read {
            let read_char = self
                .peripheral
                .characteristics()
                .into_iter()
                .find(|c| c.uuid == read_uuid);
            if read_char.is_some() {
                debug!("Found read characteristic: {}", read_uuid);
            } else {
                debug!("Read characteristic not found, but this is optional");
            }
        }

        Ok(write_char)
    }

    #[instrument(skip(self, channel, payload), fields(cmd_length = payload.len()))]
    async fn write(&self, channel: &Characteristic, payload: &[u8]) -> Result<()> {
        // Prefer WriteWithResponse when the characteristic supports it
        let write_type = if channel.properties.contains(CharPropFlags::WRITE) {
            WriteType::WithResponse
        } else {
            WriteType::WithoutResponse
        };

        trace!("Writing command frame");
        self.peripheral
            .write(channel, payload, write_type)
            .await
            .map_err(|e| Error::WriteFailed(e.to_string()))
    }

    #[instrument(skip(self))]
    async fn disconnect(&self) -> Result<()> {
        debug!("Disconnecting from peripheral");
        self.peripheral.disconnect().await?;
        Ok(())
    }
}
