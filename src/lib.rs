/*!
 # KS03 Bluetooth LED Strip Controller Library

 A Rust library for controlling KS03 and similar Bluetooth LED strip lights.

 The controller discovers a single strip by advertised identity, connects
 lazily on the first command, translates high-level light state (power,
 brightness, hue, saturation) into the vendor binary protocol, and drops the
 radio connection again after an idle period.

 ## Features

 * Power on/off control
 * Color control via hue and saturation
 * Brightness adjustment
 * Discovery by address, advertised name, or advertised service
 * Debounced disconnect after an idle window

 ## Example

 ```no_run
 use std::time::Duration;
 use ks03_led_controller::*;

 #[tokio::main]
 async fn main() -> Result<()> {
     // Initialize tracing for logs
     tracing_subscriber::fmt::init();

     // Find the strip by its advertised name and wrap it in a session.
     let identity = DeviceIdentity::new("Bedroom strip", DeviceFilter::NameContains("KS03".into()));
     let transport = find_light(&identity, HardwareRevision::Afd, Duration::from_secs(10)).await?;
     let light = BleLight::new(transport, identity);

     // The first command connects; the session disconnects on its own
     // after the idle window.
     light.set_power(true).await?;
     light.set_hue(0).await?;        // Red
     light.set_saturation(100).await?;
     light.set_brightness(80).await?;

     Ok(())
 }
 ```
*/

use thiserror::Error;

/// Custom error types for the KS03 LED controller library
#[derive(Error, Debug)]
pub enum Error {
    /// No Bluetooth adapters found
    #[error("No Bluetooth adapters found")]
    NoBluetoothAdapters,

    /// No matching LED device found within the scan window
    #[error("No matching LED device found")]
    DeviceNotFound,

    /// No connection has ever been established for this session
    #[error("Device unreachable: no connection established yet")]
    DeviceUnreachable,

    /// Radio-level connect failed
    #[error("Failed to connect to device: {0}")]
    ConnectFailed(String),

    /// Expected write characteristic absent after service discovery
    #[error("No matching write characteristic: {0}")]
    NoMatchingCharacteristic(String),

    /// Characteristic write rejected or timed out
    #[error("Failed to write command: {0}")]
    WriteFailed(String),

    /// Error from btleplug
    #[error(transparent)]
    BtlePlugError(#[from] btleplug::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

// Re-export modules
pub mod color;
pub mod device;
pub mod discovery;
pub mod protocol;
pub mod transport;

// Re-export key types
pub use color::hsv_to_rgb;
pub use device::{BleLight, LightSession, DEFAULT_IDLE_TIMEOUT};
pub use discovery::{find_light, Advertisement, DeviceFilter, DeviceIdentity};
pub use protocol::{color_frame, frame_hex, power_frame, LightState};
pub use transport::{BleTransport, GattProfile, HardwareRevision, LightTransport};
