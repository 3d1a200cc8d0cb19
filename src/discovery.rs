/*!
 # Device discovery and advertisement matching

 A configured [`DeviceFilter`] decides from an advertisement record whether
 a discovered peripheral is the target strip. Exactly one matching policy is
 active per filter; policies never chain at runtime, so re-runs with several
 strips nearby stay deterministic.

 [`find_light`] drives the btleplug discovery stream until the filter
 matches once, then stops scanning and hands the peripheral over.
*/

use std::time::Duration;

use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager};
use futures::StreamExt;
use tokio::time;
use tracing::{debug, error, info, instrument, trace};
use uuid::Uuid;

use crate::transport::{BleTransport, HardwareRevision};
use crate::{Error, Result};

/// One advertisement record as seen during a scan.
#[derive(Debug, Clone, Default)]
pub struct Advertisement {
    /// Advertised device name, if broadcast
    pub local_name: Option<String>,
    /// Radio address of the peripheral
    pub address: String,
    /// Platform identifier of the peripheral (macOS hides the address)
    pub id: String,
    /// Advertised service UUIDs
    pub services: Vec<Uuid>,
}

/// Matching policy for picking the target strip out of a scan.
///
/// Only the configured policy is evaluated; there is no fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceFilter {
    /// Exact radio address or platform id, case-insensitive
    Address(String),
    /// Advertised name contains this substring
    NameContains(String),
    /// Advertised service list contains this UUID
    Service(Uuid),
}

impl DeviceFilter {
    /// Decides whether an advertisement belongs to the configured device.
    pub fn matches(&self, adv: &Advertisement) -> bool {
        match self {
            DeviceFilter::Address(addr) => {
                adv.address.eq_ignore_ascii_case(addr) || adv.id.eq_ignore_ascii_case(addr)
            }
            DeviceFilter::NameContains(needle) => adv
                .local_name
                .as_deref()
                .is_some_and(|name| name.contains(needle.as_str())),
            DeviceFilter::Service(uuid) => adv.services.contains(uuid),
        }
    }
}

/// Identity of one physical strip: how to find it, and what to call it.
#[derive(Debug, Clone)]
pub struct DeviceIdentity {
    /// Human-readable display name used in logs
    pub display_name: String,
    /// Matching policy for discovery
    pub filter: DeviceFilter,
}

impl DeviceIdentity {
    pub fn new(display_name: impl Into<String>, filter: DeviceFilter) -> Self {
        Self {
            display_name: display_name.into(),
            filter,
        }
    }
}

/// Gets the default Bluetooth adapter
#[instrument(skip(manager))]
async fn get_central(manager: &Manager) -> Result<Adapter> {
    debug!("Getting default Bluetooth adapter");
    let mut adapters = manager.adapters().await?.into_iter();
    let adapter = adapters.next().ok_or_else(|| {
        error!("No Bluetooth adapters found");
        Error::NoBluetoothAdapters
    })?;
    debug!("Using Bluetooth adapter");
    Ok(adapter)
}

/// Scans for the strip described by `identity` and returns its transport.
///
/// Subscribes to the adapter's discovery stream, starts scanning, and stops
/// again as soon as the filter matches once (single-target acquisition).
/// `scan_timeout` bounds the whole scan; expiry is [`Error::DeviceNotFound`].
#[instrument(skip(identity), fields(device = %identity.display_name))]
pub async fn find_light(
    identity: &DeviceIdentity,
    revision: HardwareRevision,
    scan_timeout: Duration,
) -> Result<BleTransport> {
    info!("Initializing BLE LED controller");
    let manager = Manager::new().await?;
    let central = get_central(&manager).await?;

    // Subscribe before scanning so no advertisement is missed.
    let mut events = central.events().await?;

    info!("Scanning for {}...", identity.display_name);
    central.start_scan(ScanFilter::default()).await?;

    let matched = time::timeout(scan_timeout, async {
        while let Some(event) = events.next().await {
            let peripheral_id = match event {
                CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                _ => continue,
            };

            let Ok(peripheral) = central.peripheral(&peripheral_id).await else {
                continue;
            };
            let Ok(Some(props)) = peripheral.properties().await else {
                continue;
            };

            let adv = Advertisement {
                local_name: props.local_name,
                address: peripheral.address().to_string(),
                id: peripheral.id().to_string(),
                services: props.services,
            };

            trace!(
                "Saw advertisement: {} ({})",
                adv.local_name.as_deref().unwrap_or("<unnamed>"),
                adv.address
            );

            if identity.filter.matches(&adv) {
                info!(
                    "Found {}: {} ({})",
                    identity.display_name,
                    adv.local_name.as_deref().unwrap_or("<unnamed>"),
                    adv.address
                );
                return Ok(peripheral);
            }
        }
        Err(Error::DeviceNotFound)
    })
    .await;

    // Scanning stops on match and on timeout alike.
    central.stop_scan().await?;

    let peripheral = match matched {
        Ok(found) => found?,
        Err(_) => {
            error!(
                "No matching LED device found within {} seconds",
                scan_timeout.as_secs()
            );
            return Err(Error::DeviceNotFound);
        }
    };

    Ok(BleTransport::new(peripheral, revision.profile()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adverts() -> Vec<Advertisement> {
        vec![
            Advertisement {
                local_name: Some("KS03~1A2B".into()),
                address: "aa:bb:cc:dd:ee:01".into(),
                id: "hci0/dev_AA_BB_CC_DD_EE_01".into(),
                services: vec![HardwareRevision::Afd.profile().service],
            },
            Advertisement {
                local_name: Some("Living Room TV".into()),
                address: "aa:bb:cc:dd:ee:02".into(),
                id: "hci0/dev_AA_BB_CC_DD_EE_02".into(),
                services: vec![],
            },
            Advertisement {
                local_name: None,
                address: "aa:bb:cc:dd:ee:03".into(),
                id: "hci0/dev_AA_BB_CC_DD_EE_03".into(),
                services: vec![Uuid::from_u128(0x0000180f_0000_1000_8000_00805f9b34fb)],
            },
        ]
    }

    #[test]
    fn name_filter_matches_exactly_one_of_three() {
        let filter = DeviceFilter::NameContains("KS03".into());
        let matches: Vec<_> = adverts().into_iter().filter(|a| filter.matches(a)).collect();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].address, "aa:bb:cc:dd:ee:01");
    }

    #[test]
    fn address_filter_is_case_insensitive_and_accepts_platform_id() {
        let by_addr = DeviceFilter::Address("AA:BB:CC:DD:EE:01".into());
        let by_id = DeviceFilter::Address("hci0/dev_aa_bb_cc_dd_ee_01".into());
        let target = &adverts()[0];
        assert!(by_addr.matches(target));
        assert!(by_id.matches(target));
    }

    #[test]
    fn service_filter_matches_advertised_service() {
        let filter = DeviceFilter::Service(HardwareRevision::Afd.profile().service);
        let matches: Vec<_> = adverts().into_iter().filter(|a| filter.matches(a)).collect();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].address, "aa:bb:cc:dd:ee:01");
    }

    #[test]
    fn policies_do_not_fall_back() {
        // An address filter that matches nothing must not fall back to the
        // name policy, even though a KS03 name is advertised.
        let filter = DeviceFilter::Address("00:00:00:00:00:00".into());
        assert!(adverts().iter().all(|a| !filter.matches(a)));
    }

    #[test]
    fn name_filter_ignores_unnamed_advertisements() {
        let filter = DeviceFilter::NameContains("KS03".into());
        assert!(!filter.matches(&adverts()[2]));
    }
}
