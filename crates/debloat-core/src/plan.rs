//! Action planner: deterministic, pure rendering of the command batch a
//! selection implies. No I/O, no safety gating; warning on unsafe packages
//! is a presentation concern and the user keeps the ability to act on
//! anything they explicitly selected.

use crate::selection::SelectionSet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Uninstall,
    Disable,
}

impl ActionKind {
    pub const ALL: [Self; 2] = [Self::Uninstall, Self::Disable];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninstall => "uninstall",
            Self::Disable => "disable",
        }
    }

    /// The package-manager invocation this action maps to, user-scoped to
    /// the primary user. These strings are a bit-exact contract: users may
    /// copy the previews verbatim.
    #[must_use]
    pub const fn pm_command(self) -> &'static str {
        match self {
            Self::Uninstall => "pm uninstall --user 0",
            Self::Disable => "pm disable-user --user 0",
        }
    }

    /// The action string handed to the device shell for one package.
    #[must_use]
    pub fn shell_action(self, package: &str) -> String {
        format!("{} {}", self.pm_command(), package)
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(package id → rendered command)` pair of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedCommand {
    pub package: String,
    /// Full host-side command line, for preview and audit.
    pub preview: String,
}

/// The ordered batch of commands one action implies. Immutable once built;
/// a new plan is built if the selection changes before execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionPlan {
    pub device_id: String,
    pub kind: ActionKind,
    pub commands: Vec<PlannedCommand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("a batch action is never valid on zero packages")]
pub struct EmptySelection;

/// Render the plan for `selection` on `device_id`. Command order equals the
/// selection's iteration order, and that order is preserved through to the
/// outcomes so callers can correlate positionally.
pub fn plan(
    device_id: &str,
    kind: ActionKind,
    selection: &SelectionSet,
) -> Result<ActionPlan, EmptySelection> {
    if selection.is_empty() {
        return Err(EmptySelection);
    }

    let commands = selection
        .iter()
        .map(|package| PlannedCommand {
            package: package.to_string(),
            preview: format!("adb -s {} shell {}", device_id, kind.shell_action(package)),
        })
        .collect();

    Ok(ActionPlan {
        device_id: device_id.to_string(),
        kind,
        commands,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(ids: &[&str]) -> SelectionSet {
        let mut sel = SelectionSet::new();
        sel.set_many(ids.iter().copied());
        sel
    }

    #[test]
    fn empty_selection_is_rejected_for_both_kinds() {
        let sel = SelectionSet::new();
        for kind in ActionKind::ALL {
            assert_eq!(plan("serial", kind, &sel), Err(EmptySelection));
        }
    }

    #[test]
    fn uninstall_preview_is_bit_exact() {
        let sel = selection(&["com.miui.analytics"]);
        let p = plan("emulator-5554", ActionKind::Uninstall, &sel).unwrap();
        assert_eq!(
            p.commands[0].preview,
            "adb -s emulator-5554 shell pm uninstall --user 0 com.miui.analytics"
        );
    }

    #[test]
    fn disable_preview_is_bit_exact() {
        let sel = selection(&["com.miui.analytics"]);
        let p = plan("emulator-5554", ActionKind::Disable, &sel).unwrap();
        assert_eq!(
            p.commands[0].preview,
            "adb -s emulator-5554 shell pm disable-user --user 0 com.miui.analytics"
        );
    }

    #[test]
    fn plan_preserves_selection_order_and_length() {
        let sel = selection(&["c.c.c", "a.a.a", "b.b.b"]);
        let p = plan("serial", ActionKind::Disable, &sel).unwrap();
        assert_eq!(p.commands.len(), sel.len());
        let order: Vec<&str> = p.commands.iter().map(|c| c.package.as_str()).collect();
        assert_eq!(order, vec!["c.c.c", "a.a.a", "b.b.b"]);
    }
}
