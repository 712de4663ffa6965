//! Action executor: runs a planned batch against the device, one command
//! per package, sequentially. A failure in one package's command never
//! aborts the remainder of the batch; batch actions are independent per
//! package, not transactional.

use crate::adb::ACommand;
use crate::plan::{ActionKind, ActionPlan};
use chrono::Local;
use csv::Writer;
use log::{error, info};
use std::fs;
use std::path::PathBuf;

/// The seam to the device shell. The default implementation goes through
/// ADB; tests substitute a stub.
pub trait CommandRunner {
    /// Run one shell action on `device_id`; `Ok` carries raw stdout,
    /// `Err` the failure detail.
    fn run(&self, device_id: &str, action: &str) -> Result<String, String>;
}

/// Production runner issuing real `adb shell` invocations.
#[derive(Debug, Default, Clone, Copy)]
pub struct AdbRunner;

impl CommandRunner for AdbRunner {
    fn run(&self, device_id: &str, action: &str) -> Result<String, String> {
        ACommand::new()
            .shell(device_id)
            .raw(action)
            .map_err(|e| e.to_string())
    }
}

/// Optimistic state implied by a successful command. Not authoritative:
/// callers re-list the inventory for ground truth, since a disable or
/// uninstall can partially apply in ways the exit status does not reflect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultingState {
    pub installed: bool,
    pub enabled: bool,
}

impl ResultingState {
    const fn after(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Uninstall => Self {
                installed: false,
                enabled: false,
            },
            ActionKind::Disable => Self {
                installed: true,
                enabled: false,
            },
        }
    }
}

/// Per-package result of one planned command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub package: String,
    pub success: bool,
    /// Error detail (with a vendor hint where one is known) on failure.
    pub detail: Option<String>,
    /// `Some` on success, `None` when the state is unknown.
    pub state: Option<ResultingState>,
}

/// Run all planned commands in plan order, collecting one outcome per
/// command. Never short-circuits; outcome `k` corresponds to command `k`.
/// There is no cancellation mid-batch: once started, the batch runs to
/// completion over all planned commands.
pub fn execute(plan: &ActionPlan, runner: &dyn CommandRunner) -> Vec<ActionOutcome> {
    plan.commands
        .iter()
        .map(|cmd| {
            let action = plan.kind.shell_action(&cmd.package);
            match runner.run(&plan.device_id, &action) {
                Ok(out) => match classify_output(&out) {
                    Ok(()) => {
                        info!("{action} -> {out}");
                        ActionOutcome {
                            package: cmd.package.clone(),
                            success: true,
                            detail: None,
                            state: Some(ResultingState::after(plan.kind)),
                        }
                    }
                    Err(detail) => {
                        error!("{action} -> {detail}");
                        failure_outcome(&cmd.package, detail)
                    }
                },
                Err(err) => {
                    error!("{action} -> {err}");
                    failure_outcome(&cmd.package, err)
                }
            }
        })
        .collect()
}

fn failure_outcome(package: &str, detail: String) -> ActionOutcome {
    let detail = match friendly_hint(&detail) {
        Some(hint) => format!("{detail} ({hint})"),
        None => detail,
    };
    ActionOutcome {
        package: package.to_string(),
        success: false,
        detail: Some(detail),
        state: None,
    }
}

/// On old devices `pm` can exit 0 even on error, so the output text is
/// scanned as well as the exit status.
fn classify_output(out: &str) -> Result<(), String> {
    if ["Error", "Failure"].iter().any(|&e| out.contains(e)) {
        return Err(out.to_string());
    }
    Ok(())
}

/// Nice hints for common vendor messages.
#[must_use]
pub fn friendly_hint(err_msg: &str) -> Option<&'static str> {
    let e = err_msg;
    if e.contains("DELETE_FAILED_USER_RESTRICTED") || e.contains("package is protected") {
        Some("this package is protected by the vendor, try disable instead")
    } else if e.contains("NOT_INSTALLED_FOR_USER") || e.contains("not installed for") {
        Some("already gone for this user, refresh the list")
    } else if e.contains("DELETE_FAILED_DEVICE_POLICY_MANAGER") {
        Some("managed by device policy (MDM), contact the device administrator")
    } else if e.contains("Shell does not have permission to access user") {
        Some("wrong user/profile, use the primary user")
    } else {
        None
    }
}

/// Aggregate view of a finished batch. Partial success is the common case
/// for heterogeneous device states, so callers report per-package rather
/// than pass/fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<(String, String)>,
}

#[must_use]
pub fn summarize(outcomes: &[ActionOutcome]) -> BatchSummary {
    let mut summary = BatchSummary {
        succeeded: 0,
        failed: 0,
        failures: Vec::new(),
    };
    for o in outcomes {
        if o.success {
            summary.succeeded += 1;
        } else {
            summary.failed += 1;
            summary.failures.push((
                o.package.clone(),
                o.detail.clone().unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
    }
    summary
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} succeeded, {} failed", self.succeeded, self.failed)
    }
}

/// Export a finished batch as a CSV report in the working directory.
/// Columns: package, action, result, detail.
pub fn export_outcomes_csv(
    kind: ActionKind,
    outcomes: &[ActionOutcome],
) -> Result<PathBuf, String> {
    let report_file = PathBuf::from(format!(
        "debloat_report_{}.csv",
        Local::now().format("%Y%m%d_%H%M%S")
    ));

    let file = fs::File::create(&report_file).map_err(|err| err.to_string())?;
    let mut wtr = Writer::from_writer(file);

    wtr.write_record(["Package", "Action", "Result", "Detail"])
        .map_err(|err| err.to_string())?;

    for o in outcomes {
        wtr.write_record([
            o.package.as_str(),
            kind.as_str(),
            if o.success { "ok" } else { "failed" },
            o.detail.as_deref().unwrap_or(""),
        ])
        .map_err(|err| err.to_string())?;
    }

    wtr.flush().map_err(|err| err.to_string())?;
    Ok(report_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::plan;
    use crate::selection::SelectionSet;

    /// Stub runner that fails for a fixed set of packages.
    struct StubRunner {
        fail_for: Vec<&'static str>,
    }

    impl CommandRunner for StubRunner {
        fn run(&self, _device_id: &str, action: &str) -> Result<String, String> {
            if self.fail_for.iter().any(|p| action.ends_with(p)) {
                Err("Failure [DELETE_FAILED_INTERNAL_ERROR]".to_string())
            } else {
                Ok("Success".to_string())
            }
        }
    }

    fn plan_for(ids: &[&str], kind: ActionKind) -> ActionPlan {
        let mut sel = SelectionSet::new();
        sel.set_many(ids.iter().copied());
        plan("serial", kind, &sel).unwrap()
    }

    #[test]
    fn batch_never_short_circuits() {
        let p = plan_for(&["a.a.a", "b.b.b", "c.c.c"], ActionKind::Uninstall);
        let runner = StubRunner {
            fail_for: vec!["b.b.b"],
        };

        let outcomes = execute(&p, &runner);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].success);
        assert!(!outcomes[1].success);
        assert!(outcomes[2].success, "failure must not abort the remainder");
        // outcome order equals plan order
        let order: Vec<&str> = outcomes.iter().map(|o| o.package.as_str()).collect();
        assert_eq!(order, vec!["a.a.a", "b.b.b", "c.c.c"]);
    }

    #[test]
    fn failure_detail_is_recorded() {
        let p = plan_for(&["a.a.a"], ActionKind::Disable);
        let runner = StubRunner {
            fail_for: vec!["a.a.a"],
        };

        let outcomes = execute(&p, &runner);
        assert!(!outcomes[0].success);
        assert!(outcomes[0]
            .detail
            .as_ref()
            .unwrap()
            .contains("DELETE_FAILED_INTERNAL_ERROR"));
        assert_eq!(outcomes[0].state, None);
    }

    #[test]
    fn success_carries_optimistic_state() {
        let p = plan_for(&["a.a.a"], ActionKind::Disable);
        let runner = StubRunner { fail_for: vec![] };

        let outcomes = execute(&p, &runner);
        assert_eq!(
            outcomes[0].state,
            Some(ResultingState {
                installed: true,
                enabled: false
            })
        );

        let p = plan_for(&["a.a.a"], ActionKind::Uninstall);
        let outcomes = execute(&p, &runner);
        assert_eq!(
            outcomes[0].state,
            Some(ResultingState {
                installed: false,
                enabled: false
            })
        );
    }

    #[test]
    fn zero_exit_error_text_is_a_failure() {
        // Old devices report errors on stdout with a 0 exit code.
        assert!(classify_output("Failure [not installed for 0]").is_err());
        assert!(classify_output("Error: unknown package").is_err());
        assert!(classify_output("Success").is_ok());
    }

    #[test]
    fn vendor_hints() {
        assert!(friendly_hint("Failure [DELETE_FAILED_USER_RESTRICTED]").is_some());
        assert!(friendly_hint("Failure [DELETE_FAILED_DEVICE_POLICY_MANAGER]").is_some());
        assert!(friendly_hint("some novel failure").is_none());
    }

    #[test]
    fn summary_counts_and_reasons() {
        let p = plan_for(&["a.a.a", "b.b.b", "c.c.c"], ActionKind::Uninstall);
        let runner = StubRunner {
            fail_for: vec!["a.a.a", "c.c.c"],
        };

        let summary = summarize(&execute(&p, &runner));
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.failures.len(), 2);
        assert_eq!(summary.failures[0].0, "a.a.a");
        assert_eq!(summary.to_string(), "1 succeeded, 2 failed");
    }
}
