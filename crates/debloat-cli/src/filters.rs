use clap::ValueEnum;
use debloat_core::catalog::SafetyLevel;
use debloat_core::inventory::PackageRecord;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LevelFilter {
    /// Show all packages regardless of classification
    All,
    /// Catalog-flagged safe packages
    Safe,
    /// Catalog-flagged caution packages
    Caution,
    /// Catalog-flagged unsafe packages
    Unsafe,
    /// Packages the catalog knows nothing about
    Unlisted,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StateFilter {
    /// Show all packages regardless of state
    All,
    /// Show only enabled packages
    Enabled,
    /// Show only disabled packages
    Disabled,
}

impl LevelFilter {
    pub fn matches(self, record: &PackageRecord) -> bool {
        let level = record.safety.as_ref().map(|s| s.safety_level);
        match self {
            Self::All => true,
            Self::Safe => level == Some(SafetyLevel::Safe),
            Self::Caution => level == Some(SafetyLevel::Caution),
            Self::Unsafe => level == Some(SafetyLevel::Unsafe),
            Self::Unlisted => level.is_none(),
        }
    }

    pub fn is_specific(self) -> bool {
        !matches!(self, Self::All)
    }
}

impl StateFilter {
    pub fn matches(self, record: &PackageRecord) -> bool {
        match self {
            Self::All => true,
            Self::Enabled => record.is_enabled,
            Self::Disabled => !record.is_enabled,
        }
    }

    pub fn is_specific(self) -> bool {
        !matches!(self, Self::All)
    }
}

/// Case-insensitive match against package name or label.
pub fn matches_search(record: &PackageRecord, term: &str) -> bool {
    let term = term.to_lowercase();
    record.name.to_lowercase().contains(&term) || record.label.to_lowercase().contains(&term)
}

#[cfg(test)]
mod tests {
    use super::*;
    use debloat_core::catalog::{Impact, RiskLevel, SafetyInfo};

    fn record(level: Option<SafetyLevel>, enabled: bool) -> PackageRecord {
        PackageRecord {
            name: "com.example.app".to_string(),
            label: "Example".to_string(),
            is_system_app: true,
            is_enabled: enabled,
            description: None,
            vendor: None,
            safety: level.map(|safety_level| SafetyInfo {
                safety_level,
                risk_level: RiskLevel::Low,
                battery_impact: Impact::Low,
                ram_impact: Impact::Low,
                reversible: true,
                safe_to_remove: true,
                notes: String::new(),
                group: "g".to_string(),
            }),
        }
    }

    #[test]
    fn level_filter() {
        let safe = record(Some(SafetyLevel::Safe), true);
        let unlisted = record(None, true);
        assert!(LevelFilter::Safe.matches(&safe));
        assert!(!LevelFilter::Safe.matches(&unlisted));
        assert!(LevelFilter::Unlisted.matches(&unlisted));
        assert!(LevelFilter::All.matches(&unlisted));
    }

    #[test]
    fn state_filter() {
        let disabled = record(None, false);
        assert!(StateFilter::Disabled.matches(&disabled));
        assert!(!StateFilter::Enabled.matches(&disabled));
        assert!(StateFilter::All.matches(&disabled));
    }

    #[test]
    fn search_matches_name_and_label() {
        let r = record(None, true);
        assert!(matches_search(&r, "example"));
        assert!(matches_search(&r, "EXAMPLE"));
        assert!(matches_search(&r, "com.example"));
        assert!(!matches_search(&r, "nomatch"));
    }
}
