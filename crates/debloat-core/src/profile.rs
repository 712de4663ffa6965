//! Backup profiles: a named selection plus a device descriptor, portable
//! as JSON. Restoring to a different device, or one whose package set has
//! drifted, is expected: missing packages are skipped and reported, never
//! an error.

use crate::device::Device;
use crate::selection::SelectionSet;
use chrono::{SecondsFormat, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, thiserror::Error)]
pub enum ProfileError {
    #[error("could not access profile file: {0}")]
    Io(String),
    #[error("profile file is malformed: {0}")]
    Parse(String),
}

/// Portable record of one selection.
/// Serialized schema: `{"name", "date", "deviceModel", "packages"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupProfile {
    pub name: String,
    /// ISO-8601 creation timestamp
    pub date: String,
    /// Human identification only, never used for matching
    pub device_model: String,
    pub packages: Vec<String>,
}

/// Pure construction from the current selection. No I/O.
#[must_use]
pub fn snapshot(name: &str, device: &Device, selection: &SelectionSet) -> BackupProfile {
    BackupProfile {
        name: name.to_string(),
        date: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        device_model: device.to_string(),
        packages: selection.iter().map(String::from).collect(),
    }
}

/// Rebuild a selection from `profile`, pruned against the *target* device's
/// current inventory. Returns the new selection and the profile members
/// absent from the target (in profile order) for the caller to surface.
#[must_use]
pub fn restore(
    profile: &BackupProfile,
    current_ids: &HashSet<String>,
) -> (SelectionSet, Vec<String>) {
    let mut selection = SelectionSet::new();
    let mut skipped = Vec::new();

    for package in &profile.packages {
        if current_ids.contains(package) {
            selection.toggle(package);
        } else {
            skipped.push(package.clone());
        }
    }

    if !skipped.is_empty() {
        warn!(
            "restore: {} package(s) from '{}' not present on target, skipped",
            skipped.len(),
            profile.name
        );
    }
    (selection, skipped)
}

/// Write `profile` under `dir` as `<name>.json` (name sanitized for the
/// filesystem). Returns the written path.
pub fn save_profile(dir: &Path, profile: &BackupProfile) -> Result<PathBuf, ProfileError> {
    fs::create_dir_all(dir).map_err(|e| ProfileError::Io(e.to_string()))?;

    let path = dir.join(format!("{}.json", sanitize_name(&profile.name)));
    let json = serde_json::to_string_pretty(profile).map_err(|e| ProfileError::Parse(e.to_string()))?;
    fs::write(&path, json).map_err(|e| ProfileError::Io(e.to_string()))?;

    info!("saved profile '{}' to {}", profile.name, path.display());
    Ok(path)
}

pub fn load_profile(path: &Path) -> Result<BackupProfile, ProfileError> {
    let data = fs::read_to_string(path).map_err(|e| ProfileError::Io(e.to_string()))?;
    serde_json::from_str(&data).map_err(|e| ProfileError::Parse(e.to_string()))
}

/// Profiles available under `dir`, unreadable dir treated as empty.
#[must_use]
pub fn list_profiles(dir: &Path) -> Vec<PathBuf> {
    match fs::read_dir(dir) {
        Ok(files) => {
            let mut paths: Vec<PathBuf> = files
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect();
            paths.sort();
            paths
        }
        Err(_) => vec![],
    }
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> Device {
        Device {
            id: "serial".to_string(),
            model: "Redmi Note 12".to_string(),
            manufacturer: "Xiaomi".to_string(),
            android_version: "13".to_string(),
        }
    }

    fn selection(ids: &[&str]) -> SelectionSet {
        let mut sel = SelectionSet::new();
        sel.set_many(ids.iter().copied());
        sel
    }

    #[test]
    fn schema_field_names_are_camel_case() {
        let profile = snapshot("weekly", &device(), &selection(&["a.a.a"]));
        let value = serde_json::to_value(&profile).unwrap();
        let obj = value.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["date", "deviceModel", "name", "packages"]);
        assert_eq!(obj["deviceModel"], "Xiaomi Redmi Note 12");
    }

    #[test]
    fn restore_against_unchanged_inventory_is_identity() {
        let profile = snapshot("weekly", &device(), &selection(&["a.a.a", "b.b.b"]));
        let current: HashSet<String> = ["a.a.a".to_string(), "b.b.b".to_string(), "c.c.c".to_string()].into();

        let (restored, skipped) = restore(&profile, &current);
        assert!(skipped.is_empty());
        let ids: Vec<&str> = restored.iter().collect();
        assert_eq!(ids, vec!["a.a.a", "b.b.b"]);
    }

    #[test]
    fn restore_reports_drifted_packages_as_skipped() {
        let profile = snapshot("weekly", &device(), &selection(&["a.a.a", "x.x.x"]));
        let current: HashSet<String> = ["a.a.a".to_string()].into();

        let (restored, skipped) = restore(&profile, &current);
        assert_eq!(skipped, vec!["x.x.x".to_string()]);
        assert!(restored.contains("a.a.a"));
        assert!(!restored.contains("x.x.x"));
    }

    #[test]
    fn profile_file_round_trip() {
        let dir = std::env::temp_dir().join("debloat_profile_test");
        let profile = snapshot("test profile/1", &device(), &selection(&["a.a.a"]));

        let path = save_profile(&dir, &profile).unwrap();
        assert_eq!(path.file_name().unwrap(), "test_profile_1.json");

        let loaded = load_profile(&path).unwrap();
        assert_eq!(loaded, profile);

        assert!(list_profiles(&dir).contains(&path));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn listing_missing_dir_is_empty() {
        assert!(list_profiles(Path::new("/nonexistent/debloat")).is_empty());
    }
}
