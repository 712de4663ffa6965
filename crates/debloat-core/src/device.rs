//! Device directory: discovery of reachable devices and their identity
//! properties. Each listing is a wholesale snapshot; devices are correlated
//! across refreshes by their bridge-assigned serial.

use crate::adb::{ACommand, AdbError};
use log::{error, warn};
use retry::{delay::Fixed, retry, OperationResult};

/// An Android device, typically a phone. Immutable snapshot per
/// discovery cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Unique serial identifier assigned by the bridge
    pub id: String,
    /// Non-market name (`ro.product.model`)
    pub model: String,
    pub manufacturer: String,
    /// Human version string, e.g. "14" (`ro.build.version.release`)
    pub android_version: String,
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.manufacturer, self.model)
    }
}

/// List authorized devices currently reachable through the bridge.
///
/// Returns an empty vec (not an error) when nothing is attached;
/// fails only when the bridge itself is unreachable. Unauthorized and
/// offline entries are skipped with a warning.
pub fn list_devices() -> Result<Vec<Device>, AdbError> {
    let entries = retry(
        Fixed::from_millis(500).take(if cfg!(debug_assertions) { 3 } else { 10 }),
        || match ACommand::new().devices() {
            Ok(entries) => OperationResult::Ok(entries),
            Err(e @ AdbError::Unavailable(_)) => OperationResult::Err(e),
            Err(e) => {
                error!("list_devices() -> {e}");
                OperationResult::Retry(e)
            }
        },
    )
    .map_err(|e| e.error)?;

    let mut devices = Vec::with_capacity(entries.len());
    for (serial, state) in entries {
        if state != "device" {
            warn!("Skipping {serial}: state is '{state}' (unauthorized or offline?)");
            continue;
        }
        devices.push(Device {
            model: get_device_prop(&serial, "ro.product.model"),
            manufacturer: get_device_prop(&serial, "ro.product.manufacturer"),
            android_version: get_device_prop(&serial, "ro.build.version.release"),
            id: serial,
        });
    }
    Ok(devices)
}

/// Query one `getprop` property, defaulting to "Unknown" when the
/// device does not answer.
fn get_device_prop(serial: &str, prop: &str) -> String {
    ACommand::new()
        .shell(serial)
        .getprop(prop)
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|err| {
            error!("getprop {prop} on {serial}: {err}");
            "Unknown".to_string()
        })
}

/// Pick the device a fresh session should target: the previously selected
/// one when still present, otherwise the first listed entry.
///
/// The listing keeps the bridge's own ordering, which is stable only as far
/// as the bridge's is; callers needing a reproducible order should apply
/// [`sort_devices_by_id`] first.
#[must_use]
pub fn choose_default<'d>(devices: &'d [Device], current: Option<&str>) -> Option<&'d Device> {
    if let Some(cur) = current {
        if let Some(d) = devices.iter().find(|d| d.id == cur) {
            return Some(d);
        }
    }
    devices.first()
}

/// Deterministic tie-break: lexicographic by serial.
pub fn sort_devices_by_id(devices: &mut [Device]) {
    devices.sort_by(|a, b| a.id.cmp(&b.id));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev(id: &str) -> Device {
        Device {
            id: id.to_string(),
            model: "Pixel 8".to_string(),
            manufacturer: "Google".to_string(),
            android_version: "14".to_string(),
        }
    }

    #[test]
    fn default_is_first_when_nothing_selected() {
        let devices = vec![dev("b"), dev("a")];
        assert_eq!(choose_default(&devices, None).map(|d| d.id.as_str()), Some("b"));
    }

    #[test]
    fn default_keeps_current_selection_when_still_present() {
        let devices = vec![dev("b"), dev("a")];
        assert_eq!(
            choose_default(&devices, Some("a")).map(|d| d.id.as_str()),
            Some("a")
        );
    }

    #[test]
    fn default_falls_back_when_selection_gone() {
        let devices = vec![dev("b")];
        assert_eq!(
            choose_default(&devices, Some("gone")).map(|d| d.id.as_str()),
            Some("b")
        );
        assert!(choose_default(&[], Some("gone")).is_none());
    }

    #[test]
    fn sorting_is_lexicographic() {
        let mut devices = vec![dev("zz"), dev("aa"), dev("mm")];
        sort_devices_by_id(&mut devices);
        let ids: Vec<_> = devices.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["aa", "mm", "zz"]);
    }
}
