//! The device-scoped session: single owner of one device's inventory and
//! selection. Switching the active device atomically swaps both, so a
//! selection can never reference another device's packages.

use crate::catalog::CatalogMap;
use crate::device::Device;
use crate::executor::{execute, ActionOutcome, CommandRunner};
use crate::inventory::{self, InventoryError, PackageRecord};
use crate::plan::{plan, ActionKind, ActionPlan, EmptySelection};
use crate::profile::{self, BackupProfile};
use crate::selection::SelectionSet;
use log::{info, warn};
use std::collections::HashSet;

pub struct DeviceSession {
    device: Device,
    packages: Vec<PackageRecord>,
    selection: SelectionSet,
}

impl DeviceSession {
    /// Open a session on `device` with an empty inventory; callers follow
    /// up with [`Self::refresh_inventory`].
    #[must_use]
    pub fn new(device: Device) -> Self {
        Self {
            device,
            packages: Vec::new(),
            selection: SelectionSet::new(),
        }
    }

    #[must_use]
    pub fn device(&self) -> &Device {
        &self.device
    }

    #[must_use]
    pub fn packages(&self) -> &[PackageRecord] {
        &self.packages
    }

    #[must_use]
    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    /// Re-list the device's packages and reconcile the selection.
    /// This is the authoritative state after any batch action.
    pub fn refresh_inventory(&mut self, catalog: &CatalogMap) -> Result<Vec<String>, InventoryError> {
        let records = inventory::list_packages(&self.device.id, catalog)?;
        Ok(self.install_inventory(records))
    }

    /// Replace the inventory wholesale and prune the selection against it.
    /// Returns the pruned ids. State transition only; normal callers go
    /// through [`Self::refresh_inventory`].
    pub fn install_inventory(&mut self, records: Vec<PackageRecord>) -> Vec<String> {
        self.packages = records;
        let current = self.current_ids();
        let pruned = self.selection.prune(&current);
        if !pruned.is_empty() {
            info!("selection pruned after refresh: {}", pruned.join(", "));
        }
        pruned
    }

    /// Switch the session to another device: inventory replaced wholesale,
    /// selection cleared, even if the new device's inventory happens to
    /// contain identical package identifiers.
    pub fn switch_device(&mut self, device: Device, catalog: &CatalogMap) -> Result<(), InventoryError> {
        self.swap_device(device, Vec::new());
        self.refresh_inventory(catalog)?;
        Ok(())
    }

    /// The atomic swap underlying [`Self::switch_device`].
    pub fn swap_device(&mut self, device: Device, records: Vec<PackageRecord>) {
        info!("switching device: {} -> {}", self.device.id, device.id);
        self.device = device;
        self.packages = records;
        self.selection.clear();
    }

    #[must_use]
    pub fn current_ids(&self) -> HashSet<String> {
        self.packages.iter().map(|p| p.name.clone()).collect()
    }

    /// Flip selection membership for `id`. Returns the new membership
    /// state, or `None` (no-op) when the id is not in the inventory:
    /// selecting a package the device does not have is always a caller
    /// mistake.
    pub fn toggle(&mut self, id: &str) -> Option<bool> {
        if !self.packages.iter().any(|p| p.name == id) {
            warn!("toggle ignored, not in inventory: {id}");
            return None;
        }
        self.selection.toggle(id);
        Some(self.selection.contains(id))
    }

    /// Bulk-select every safe-tab eligible package.
    pub fn select_all_safe(&mut self) -> usize {
        let safe: Vec<String> = self
            .packages
            .iter()
            .filter(|p| p.is_safe_tab_eligible())
            .map(|p| p.name.clone())
            .collect();
        let count = safe.len();
        self.selection.set_many(safe);
        count
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Build the (immutable) plan for the current selection.
    pub fn plan(&self, kind: ActionKind) -> Result<ActionPlan, EmptySelection> {
        plan(&self.device.id, kind, &self.selection)
    }

    /// Plan and execute a batch action. The selection is cleared once the
    /// batch has run to completion; callers then re-run
    /// [`Self::refresh_inventory`] for ground truth, since the outcomes'
    /// own state is optimistic.
    pub fn apply(
        &mut self,
        kind: ActionKind,
        runner: &dyn CommandRunner,
    ) -> Result<Vec<ActionOutcome>, EmptySelection> {
        let plan = self.plan(kind)?;
        let outcomes = execute(&plan, runner);
        self.selection.clear();
        Ok(outcomes)
    }

    /// Snapshot the current selection as a named profile.
    #[must_use]
    pub fn snapshot_profile(&self, name: &str) -> BackupProfile {
        profile::snapshot(name, &self.device, &self.selection)
    }

    /// Replace the selection from a profile, pruned against this device's
    /// inventory. Returns the skipped package ids for the caller to show.
    pub fn restore_profile(&mut self, profile: &BackupProfile) -> Vec<String> {
        let (selection, skipped) = profile::restore(profile, &self.current_ids());
        self.selection = selection;
        skipped
    }

    /// Packages in the selection flagged unsafe or non-reversible by the
    /// catalog. Presentation-layer gating input only: the planner itself
    /// never refuses.
    #[must_use]
    pub fn risky_selected(&self) -> Vec<&PackageRecord> {
        self.packages
            .iter()
            .filter(|p| self.selection.contains(&p.name))
            .filter(|p| {
                p.safety
                    .as_ref()
                    .is_none_or(|s| !s.safe_to_remove || !s.reversible)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Impact, RiskLevel, SafetyInfo, SafetyLevel};
    use crate::executor::CommandRunner;

    fn device(id: &str) -> Device {
        Device {
            id: id.to_string(),
            model: "Pixel 8".to_string(),
            manufacturer: "Google".to_string(),
            android_version: "14".to_string(),
        }
    }

    fn record(name: &str, safe: bool) -> PackageRecord {
        PackageRecord {
            name: name.to_string(),
            label: name.to_string(),
            is_system_app: true,
            is_enabled: true,
            description: None,
            vendor: None,
            safety: Some(SafetyInfo {
                safety_level: SafetyLevel::Safe,
                risk_level: RiskLevel::Low,
                battery_impact: Impact::Low,
                ram_impact: Impact::Low,
                reversible: true,
                safe_to_remove: safe,
                notes: String::new(),
                group: "g".to_string(),
            }),
        }
    }

    struct OkRunner;
    impl CommandRunner for OkRunner {
        fn run(&self, _device_id: &str, _action: &str) -> Result<String, String> {
            Ok("Success".to_string())
        }
    }

    fn session_with(ids: &[&str]) -> DeviceSession {
        let mut s = DeviceSession::new(device("serial-1"));
        s.install_inventory(ids.iter().map(|id| record(id, true)).collect());
        s
    }

    #[test]
    fn toggle_requires_inventory_membership() {
        let mut s = session_with(&["a.a.a"]);
        assert_eq!(s.toggle("a.a.a"), Some(true));
        assert_eq!(s.toggle("not.on.device"), None);
        assert_eq!(s.toggle("a.a.a"), Some(false));
    }

    #[test]
    fn refresh_prunes_but_keeps_survivors() {
        let mut s = session_with(&["a.a.a", "b.b.b"]);
        s.toggle("a.a.a");
        s.toggle("b.b.b");

        let pruned = s.install_inventory(vec![record("a.a.a", true)]);
        assert_eq!(pruned, vec!["b.b.b".to_string()]);
        assert!(s.selection().contains("a.a.a"));
        assert!(!s.selection().contains("b.b.b"));
    }

    #[test]
    fn device_switch_clears_selection_even_with_identical_ids() {
        let mut s = session_with(&["a.a.a"]);
        s.toggle("a.a.a");
        assert!(!s.selection().is_empty());

        // new device has the very same package id
        s.swap_device(device("serial-2"), vec![record("a.a.a", true)]);
        assert!(s.selection().is_empty());
        assert_eq!(s.device().id, "serial-2");
        assert_eq!(s.packages().len(), 1);
    }

    #[test]
    fn apply_runs_batch_and_clears_selection() {
        let mut s = session_with(&["b.b.b", "a.a.a"]);
        s.toggle("b.b.b");
        s.toggle("a.a.a");

        let outcomes = s.apply(ActionKind::Disable, &OkRunner).unwrap();
        let order: Vec<&str> = outcomes.iter().map(|o| o.package.as_str()).collect();
        assert_eq!(order, vec!["b.b.b", "a.a.a"]);
        assert!(s.selection().is_empty(), "selection clears after a batch");
    }

    #[test]
    fn apply_on_empty_selection_is_rejected() {
        let mut s = session_with(&["a.a.a"]);
        assert!(s.apply(ActionKind::Uninstall, &OkRunner).is_err());
    }

    #[test]
    fn select_all_safe_skips_ineligible() {
        let mut s = DeviceSession::new(device("serial-1"));
        s.install_inventory(vec![record("a.a.a", true), record("b.b.b", false)]);
        assert_eq!(s.select_all_safe(), 1);
        assert!(s.selection().contains("a.a.a"));
        assert!(!s.selection().contains("b.b.b"));
    }

    #[test]
    fn profile_round_trip_through_session() {
        let mut s = session_with(&["a.a.a", "b.b.b"]);
        s.toggle("a.a.a");
        s.toggle("b.b.b");
        let profile = s.snapshot_profile("nightly");

        // drift: b.b.b is gone on the restore target
        let mut target = session_with(&["a.a.a", "c.c.c"]);
        let skipped = target.restore_profile(&profile);
        assert_eq!(skipped, vec!["b.b.b".to_string()]);
        assert!(target.selection().contains("a.a.a"));
    }

    #[test]
    fn risky_selected_flags_unlisted_packages() {
        let mut s = DeviceSession::new(device("serial-1"));
        let mut unlisted = record("x.y.z", true);
        unlisted.safety = None;
        s.install_inventory(vec![record("a.a.a", true), unlisted]);
        s.toggle("a.a.a");
        s.toggle("x.y.z");

        let risky: Vec<&str> = s.risky_selected().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(risky, vec!["x.y.z"]);
    }
}
