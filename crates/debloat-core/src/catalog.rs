//! The safety catalog: curated, static metadata classifying known packages
//! by removal risk. Pure lookup; the catalog never decides anything, it only
//! informs the caller's presentation and warnings.

use crate::CACHE_DIR;
use log::warn;
use retry::{delay::Fixed, retry, OperationResult};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

pub const CATALOG_FNAME: &str = "package_catalog.json";

pub const REMOTE_CATALOG_URL: &str =
    "https://raw.githubusercontent.com/debloat-tools/debloat/main/resources/assets/package_catalog.json";

// not `const`, because it may grow big
pub static DATA: &str = include_str!("../resources/assets/package_catalog.json");

/// Group tag packages fall back to when the catalog has no entry
/// or the entry carries no group.
pub const FALLBACK_GROUP: &str = "other";

/// Curated classification attached to a known package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyInfo {
    pub safety_level: SafetyLevel,
    pub risk_level: RiskLevel,
    pub battery_impact: Impact,
    pub ram_impact: Impact,
    pub reversible: bool,
    pub safe_to_remove: bool,
    pub notes: String,
    /// Display-grouping tag only; carries no gating semantics.
    pub group: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    Safe,
    Caution,
    Unsafe,
}

impl SafetyLevel {
    pub const ALL: [Self; 3] = [Self::Safe, Self::Caution, Self::Unsafe];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Caution => "caution",
            Self::Unsafe => "unsafe",
        }
    }
}

impl std::fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SafetyLevel> for Cow<'_, str> {
    fn from(level: SafetyLevel) -> Self {
        Cow::Borrowed(level.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }

    /// Risk classes map onto safety levels the way the curated database
    /// was authored: high risk means unsafe, low risk means safe.
    #[must_use]
    pub const fn to_safety_level(self) -> SafetyLevel {
        match self {
            Self::Low => SafetyLevel::Safe,
            Self::Medium => SafetyLevel::Caution,
            Self::High => SafetyLevel::Unsafe,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Battery or RAM footprint of a package while installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Impact {
    Low,
    Medium,
    High,
}

impl Impact {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl std::fmt::Display for Impact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One catalog record: human label, prose, and the classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub label: String,
    pub description: String,
    pub vendor: String,
    pub info: SafetyInfo,
}

pub type CatalogMap = HashMap<String, CatalogEntry>;

// On-disk schema of the curated database: vendor groups, each holding
// its packages. Flattened into `CatalogMap` on load.
#[derive(Debug, Deserialize)]
struct RawCatalog {
    groups: Vec<RawGroup>,
}

#[derive(Debug, Deserialize)]
struct RawGroup {
    group: String,
    vendor: String,
    packages: Vec<RawPackage>,
}

#[derive(Debug, Deserialize)]
struct RawPackage {
    package_name: String,
    app_name: String,
    description: String,
    safe_to_remove: bool,
    risk_level: RiskLevel,
    battery_impact: Impact,
    ram_impact: Impact,
    reversible: bool,
    notes: String,
}

fn flatten(raw: RawCatalog) -> CatalogMap {
    let mut map = CatalogMap::new();
    for group in raw.groups {
        for pack in group.packages {
            let info = SafetyInfo {
                safety_level: pack.risk_level.to_safety_level(),
                risk_level: pack.risk_level,
                battery_impact: pack.battery_impact,
                ram_impact: pack.ram_impact,
                reversible: pack.reversible,
                safe_to_remove: pack.safe_to_remove,
                notes: pack.notes,
                group: group.group.clone(),
            };
            map.insert(
                pack.package_name,
                CatalogEntry {
                    label: pack.app_name,
                    description: pack.description,
                    vendor: group.vendor.clone(),
                    info,
                },
            );
        }
    }
    map
}

fn parse_catalog(json: &str) -> Result<CatalogMap, serde_json::Error> {
    serde_json::from_str::<RawCatalog>(json).map(flatten)
}

/// Load the catalog. With `remote`, try refreshing from the project
/// repository first, caching the result; on `Err` the returned map is the
/// local fallback (cached file or the embedded copy).
pub fn load_catalog(remote: bool) -> Result<CatalogMap, CatalogMap> {
    let cached: PathBuf = CACHE_DIR.join(CATALOG_FNAME);
    let mut error = false;
    let map = if remote {
        retry(Fixed::from_millis(1000).take(3), || {
            match ureq::get(REMOTE_CATALOG_URL).call() {
                Ok(resp) => match resp.into_string() {
                    Ok(text) => match parse_catalog(&text) {
                        Ok(map) => {
                            if let Err(e) = fs::write(&cached, &text) {
                                warn!("Could not cache catalog: {e}");
                            }
                            OperationResult::Ok(map)
                        }
                        Err(e) => {
                            warn!("Remote catalog is malformed: {e}");
                            error = true;
                            OperationResult::Err(CatalogMap::new())
                        }
                    },
                    Err(e) => {
                        warn!("Could not read remote catalog: {e}");
                        error = true;
                        OperationResult::Retry(CatalogMap::new())
                    }
                },
                Err(e) => {
                    warn!("Could not fetch remote catalog: {e}");
                    error = true;
                    OperationResult::Retry(CatalogMap::new())
                }
            }
        })
        .unwrap_or_else(|_| local_catalog())
    } else {
        local_catalog()
    };

    (if error { Err } else { Ok })(map)
}

/// The cached copy if present and valid, otherwise the embedded database.
#[must_use]
pub fn local_catalog() -> CatalogMap {
    let cached = CACHE_DIR.join(CATALOG_FNAME);
    if let Ok(text) = fs::read_to_string(cached) {
        match parse_catalog(&text) {
            Ok(map) => return map,
            Err(e) => warn!("Cached catalog is malformed, using embedded copy: {e}"),
        }
    }
    parse_catalog(DATA).unwrap_or_else(|e| unreachable!("embedded catalog must parse: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_catalog_parses() {
        let map = parse_catalog(DATA).expect("Unable to parse");
        assert!(!map.is_empty());
    }

    #[test]
    fn known_package_lookup() {
        let map = parse_catalog(DATA).unwrap();
        let entry = map
            .get("com.miui.analytics")
            .expect("analytics should be in the embedded catalog");
        assert_eq!(entry.info.group, "miui_ads");
        assert!(entry.info.safe_to_remove);
    }

    #[test]
    fn unknown_package_lookup_misses() {
        let map = parse_catalog(DATA).unwrap();
        assert!(map.get("com.example.not.in.catalog").is_none());
    }

    #[test]
    fn risk_maps_to_safety() {
        assert_eq!(RiskLevel::High.to_safety_level(), SafetyLevel::Unsafe);
        assert_eq!(RiskLevel::Medium.to_safety_level(), SafetyLevel::Caution);
        assert_eq!(RiskLevel::Low.to_safety_level(), SafetyLevel::Safe);
    }

    #[test]
    fn risk_level_serde_repr() {
        let high: RiskLevel = serde_json::from_str("\"HIGH\"").unwrap();
        assert_eq!(high, RiskLevel::High);
        assert_eq!(serde_json::to_string(&RiskLevel::Low).unwrap(), "\"LOW\"");
    }
}
