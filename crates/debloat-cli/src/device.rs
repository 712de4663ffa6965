use debloat_core::config::Config;
use debloat_core::device::{choose_default, list_devices, Device};

/// Resolve the device a command targets: explicit serial, then the
/// configured default, then the first listed entry.
pub fn get_target_device(device: Option<String>) -> Result<Device, Box<dyn std::error::Error>> {
    let devices = list_devices()?;

    if devices.is_empty() {
        eprintln!("Error: No devices found. Make sure USB debugging is enabled.");
        return Err("No devices found".into());
    }

    if let Some(device_id) = device {
        return devices
            .iter()
            .find(|d| d.id == device_id)
            .cloned()
            .ok_or_else(|| "Device not found".into());
    }

    let config = Config::load_configuration_file();
    let target = choose_default(&devices, config.general.default_device.as_deref())
        .cloned()
        .unwrap_or_else(|| unreachable!("non-empty device list has a default"));

    if devices.len() > 1 {
        eprintln!(
            "Warning: Multiple devices found, using: {} ({})",
            target, target.id
        );
    }

    Ok(target)
}
