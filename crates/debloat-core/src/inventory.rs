//! Package inventory: the live, per-device package listing merged with the
//! safety catalog. The merge is pure and total: every installed package
//! produces exactly one record, catalog absence never drops a package.

use crate::adb::{ACommand, AdbError, PmListPacksFlag};
use crate::catalog::{CatalogMap, SafetyInfo, FALLBACK_GROUP};
use std::collections::HashSet;

#[derive(Debug, Clone, thiserror::Error)]
pub enum InventoryError {
    /// The device id is stale or the device dropped off the bridge.
    /// Callers should suggest a directory refresh.
    #[error("device unreachable: {0}")]
    DeviceUnreachable(String),
    #[error(transparent)]
    Bridge(#[from] AdbError),
}

/// One installed package on one device. `is_enabled` is live state,
/// refreshed by re-listing; `safety` is attached catalog metadata,
/// absent for unlisted packages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub name: String,
    pub label: String,
    pub is_system_app: bool,
    pub is_enabled: bool,
    pub description: Option<String>,
    pub vendor: Option<String>,
    pub safety: Option<SafetyInfo>,
}

impl PackageRecord {
    /// Eligible for the curated safe-to-remove view.
    #[must_use]
    pub fn is_safe_tab_eligible(&self) -> bool {
        self.safety.as_ref().is_some_and(|s| s.safe_to_remove)
    }

    /// Display-grouping tag, `other` for unlisted packages.
    #[must_use]
    pub fn group(&self) -> &str {
        self.safety
            .as_ref()
            .map_or(FALLBACK_GROUP, |s| s.group.as_str())
    }
}

/// List installed packages on `device_id`, merged with the catalog.
pub fn list_packages(
    device_id: &str,
    catalog: &CatalogMap,
) -> Result<Vec<PackageRecord>, InventoryError> {
    let with_paths = ACommand::new()
        .shell(device_id)
        .pm()
        .list_packages_with_paths()
        .map_err(|e| classify_bridge_error(device_id, e))?;

    let disabled: HashSet<String> = ACommand::new()
        .shell(device_id)
        .pm()
        .list_packages(Some(PmListPacksFlag::OnlyDisabled))
        .map_err(|e| classify_bridge_error(device_id, e))?
        .into_iter()
        .collect();

    Ok(merge_packages(with_paths, &disabled, catalog))
}

/// Stale device ids show up as command failures with a recognizable
/// message, not as transport failures.
fn classify_bridge_error(device_id: &str, err: AdbError) -> InventoryError {
    if let AdbError::Command(ref msg) = err {
        if msg.contains("not found") || msg.contains("offline") || msg.contains("no devices") {
            return InventoryError::DeviceUnreachable(format!("{device_id}: {msg}"));
        }
    }
    InventoryError::Bridge(err)
}

/// Pure merge of the raw listing with the disabled set and the catalog.
/// Output is sorted by lowercased label, the order the primary view shows.
#[must_use]
pub fn merge_packages(
    with_paths: Vec<(String, String)>,
    disabled: &HashSet<String>,
    catalog: &CatalogMap,
) -> Vec<PackageRecord> {
    let mut records: Vec<PackageRecord> = Vec::with_capacity(with_paths.len());

    for (path, name) in with_paths {
        let is_system_app =
            path.contains("/system/") || path.contains("/vendor/") || path.contains("/product/");
        let is_enabled = !disabled.contains(&name);

        let record = match catalog.get(&name) {
            Some(entry) => PackageRecord {
                label: entry.label.clone(),
                is_system_app,
                is_enabled,
                description: Some(entry.description.clone()),
                vendor: Some(entry.vendor.clone()),
                safety: Some(entry.info.clone()),
                name,
            },
            None => PackageRecord {
                label: fallback_label(&name),
                is_system_app,
                is_enabled,
                description: None,
                vendor: None,
                safety: None,
                name,
            },
        };
        records.push(record);
    }

    records.sort_by(|a, b| a.label.to_lowercase().cmp(&b.label.to_lowercase()));
    records
}

/// Last package-name segment, as a stand-in label for unlisted packages.
fn fallback_label(name: &str) -> String {
    name.rsplit('.').next().unwrap_or(name).to_string()
}

/// The curated safe-tab view: safe-to-remove packages grouped by their
/// catalog group, in first-seen group order over the (label-sorted) records.
/// That order is stable across refreshes of an unchanged device.
#[must_use]
pub fn safe_tab_groups(records: &[PackageRecord]) -> Vec<(String, Vec<&PackageRecord>)> {
    let mut groups: Vec<(String, Vec<&PackageRecord>)> = Vec::new();

    for record in records.iter().filter(|r| r.is_safe_tab_eligible()) {
        let tag = record.group();
        match groups.iter_mut().find(|(g, _)| g == tag) {
            Some((_, members)) => members.push(record),
            None => groups.push((tag.to_string(), vec![record])),
        }
    }
    groups
}
