use debloat_core::catalog::CatalogMap;
use debloat_core::config::Config;
use debloat_core::device::list_devices;
use debloat_core::executor::{export_outcomes_csv, summarize, AdbRunner};
use debloat_core::plan::ActionKind;
use debloat_core::profile::{load_profile, save_profile};
use debloat_core::session::DeviceSession;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::Write;

use crate::commands::build_session;
use crate::device::get_target_device;
use crate::filters::matches_search;
use crate::println_or_exit;

/// Start the interactive session: select, preview, apply.
pub fn session_mode(device: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    println!("debloat - Interactive Session");
    println!("Type 'help' for available commands, 'exit' or 'quit' to leave\n");

    let (mut session, catalog) = build_session(device)?;
    println!(
        "Connected to: {} ({}), {} package(s)\n",
        session.device(),
        session.device().id,
        session.packages().len()
    );

    let mut rl = DefaultEditor::new()?;
    let history_file = dirs::cache_dir().map(|d| d.join("debloat").join("session_history.txt"));
    if let Some(ref path) = history_file {
        let _ = rl.load_history(path);
    }

    loop {
        let readline = rl.readline("debloat> ");
        match readline {
            Ok(line) => {
                if let Err(e) = handle_line(&line, &mut rl, &mut session, &catalog) {
                    if e.to_string() == "exit" {
                        break;
                    }
                    eprintln!("Error: {}", e);
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Interrupted (Ctrl-C). Type 'exit' to quit.");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    if let Some(ref path) = history_file {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = rl.save_history(path);
    }

    Ok(())
}

/// Handle a single line of session input
fn handle_line(
    line: &str,
    rl: &mut DefaultEditor,
    session: &mut DeviceSession,
    catalog: &CatalogMap,
) -> Result<(), Box<dyn std::error::Error>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }

    let _ = rl.add_history_entry(line);

    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts[0] {
        "help" => print_session_help(),
        "exit" | "quit" => {
            println!("Goodbye!");
            return Err("exit".into());
        }
        "device" => {
            println!(
                "Device: {} ({}), Android {}, {} package(s), {} selected",
                session.device(),
                session.device().id,
                session.device().android_version,
                session.packages().len(),
                session.selection().len()
            );
        }
        "devices" => {
            for d in list_devices()? {
                let marker = if d.id == session.device().id { " *" } else { "" };
                println!("  {} ({}){}", d, d.id, marker);
            }
        }
        "switch" => {
            if parts.len() != 2 {
                eprintln!("Usage: switch <serial>");
                return Ok(());
            }
            let target = get_target_device(Some(parts[1].to_string()))?;
            session.switch_device(target, catalog)?;
            println!(
                "Switched to {} ({}), {} package(s). Selection cleared.",
                session.device(),
                session.device().id,
                session.packages().len()
            );
        }
        "refresh" => {
            let pruned = session.refresh_inventory(catalog)?;
            println!("Refreshed: {} package(s)", session.packages().len());
            for pkg in pruned {
                println!("  pruned from selection (no longer installed): {pkg}");
            }
        }
        "list" | "ls" => handle_list(&parts[1..], session),
        "select" => handle_select(&parts[1..], session, true),
        "unselect" => handle_select(&parts[1..], session, false),
        "select-safe" => {
            let n = session.select_all_safe();
            println!("Selected {} safe-to-remove package(s)", n);
        }
        "selection" => {
            if session.selection().is_empty() {
                println!("Selection is empty.");
            } else {
                for pkg in session.selection().iter() {
                    println!("  - {pkg}");
                }
            }
        }
        "clear" => {
            session.clear_selection();
            println!("Selection cleared.");
        }
        "preview" => match parse_action(&parts[1..]) {
            Some(kind) => match session.plan(kind) {
                Ok(plan) => {
                    for cmd in &plan.commands {
                        println!("  {}", cmd.preview);
                    }
                    warn_risky(session);
                }
                Err(e) => eprintln!("Error: {e}"),
            },
            None => eprintln!("Usage: preview <uninstall|disable>"),
        },
        "apply" => handle_apply(&parts[1..], session, catalog)?,
        "backup" => {
            if parts.len() != 2 {
                eprintln!("Usage: backup <name>");
                return Ok(());
            }
            if session.selection().is_empty() {
                eprintln!("Selection is empty, nothing to back up.");
                return Ok(());
            }
            let profile = session.snapshot_profile(parts[1]);
            let dir = Config::load_configuration_file().general.backup_folder;
            let path = save_profile(&dir, &profile)?;
            println!("Saved to {}", path.display());
        }
        "restore" => {
            if parts.len() != 2 {
                eprintln!("Usage: restore <name>");
                return Ok(());
            }
            let dir = Config::load_configuration_file().general.backup_folder;
            let profile = load_profile(&dir.join(format!("{}.json", parts[1])))?;
            let skipped = session.restore_profile(&profile);
            println!("Restored {} package(s) into the selection", session.selection().len());
            for pkg in skipped {
                println!("  skipped (not installed here): {pkg}");
            }
        }
        _ => {
            eprintln!(
                "Unknown command: '{}'. Type 'help' for available commands.",
                parts[0]
            );
        }
    }

    Ok(())
}

/// Parsed arguments of the `list` command
struct ListArgs {
    safe: bool,
    search: Option<String>,
    selected_only: bool,
}

impl ListArgs {
    fn parse(args: &[&str]) -> Result<Self, String> {
        let mut safe = false;
        let mut search = None;
        let mut selected_only = false;
        let mut i = 0;

        while i < args.len() {
            match args[i] {
                "--safe" => {
                    safe = true;
                    i += 1;
                }
                "--selected" => {
                    selected_only = true;
                    i += 1;
                }
                "--search" | "-q" => {
                    if i + 1 >= args.len() {
                        return Err("--search requires a value".to_string());
                    }
                    search = Some(args[i + 1].to_string());
                    i += 2;
                }
                _ => return Err(format!("Unknown option: {}", args[i])),
            }
        }

        Ok(Self {
            safe,
            search,
            selected_only,
        })
    }
}

fn handle_list(args: &[&str], session: &DeviceSession) {
    let parsed = match ListArgs::parse(args) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {e}");
            return;
        }
    };

    let mut shown = 0usize;
    for record in session.packages() {
        if parsed.safe && !record.is_safe_tab_eligible() {
            continue;
        }
        if parsed.selected_only && !session.selection().contains(&record.name) {
            continue;
        }
        if let Some(ref term) = parsed.search {
            if !matches_search(record, term) {
                continue;
            }
        }
        let mark = if session.selection().contains(&record.name) {
            "[x]"
        } else {
            "[ ]"
        };
        let state = if record.is_enabled { "" } else { " (disabled)" };
        println_or_exit!("  {} {} - {}{}", mark, record.name, record.label, state);
        shown += 1;
    }
    println_or_exit!("\n{} package(s)", shown);
}

fn handle_select(args: &[&str], session: &mut DeviceSession, selecting: bool) {
    if args.is_empty() {
        eprintln!(
            "Usage: {} <package_name> [package_name...]",
            if selecting { "select" } else { "unselect" }
        );
        return;
    }

    for pkg in args {
        let already = session.selection().contains(pkg);
        if already == selecting {
            println!("  {pkg} {}", if selecting { "already selected" } else { "not selected" });
            continue;
        }
        match session.toggle(pkg) {
            Some(true) => println!("  + {pkg}"),
            Some(false) => println!("  - {pkg}"),
            None => eprintln!("  ✗ {pkg} is not installed on this device"),
        }
    }
}

fn parse_action(args: &[&str]) -> Option<ActionKind> {
    match args.first().copied() {
        Some("uninstall") => Some(ActionKind::Uninstall),
        Some("disable") => Some(ActionKind::Disable),
        _ => None,
    }
}

fn warn_risky(session: &DeviceSession) {
    for record in session.risky_selected() {
        println!(
            "  ⚠ WARNING: {} is {}",
            record.name,
            match &record.safety {
                Some(info) if !info.safe_to_remove => "not flagged safe to remove",
                Some(_) => "not reversible without a factory reset",
                None => "unknown to the safety catalog",
            }
        );
    }
}

fn handle_apply(
    args: &[&str],
    session: &mut DeviceSession,
    catalog: &CatalogMap,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(kind) = parse_action(args) else {
        eprintln!("Usage: apply <uninstall|disable> [--report]");
        return Ok(());
    };
    let report = args.contains(&"--report");

    if session.selection().is_empty() {
        eprintln!("Selection is empty. Use 'select' first.");
        return Ok(());
    }

    warn_risky(session);
    print!(
        "Apply {} to {} package(s)? [y/N] ",
        kind,
        session.selection().len()
    );
    let _ = std::io::stdout().flush();
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    if !matches!(answer.trim(), "y" | "Y" | "yes") {
        println!("Aborted.");
        return Ok(());
    }

    let outcomes = session.apply(kind, &AdbRunner)?;
    for o in &outcomes {
        if o.success {
            println!("  ✓ {}", o.package);
        } else {
            println!(
                "  ✗ {} - {}",
                o.package,
                o.detail.as_deref().unwrap_or("unknown error")
            );
        }
    }
    println!("\nBatch result: {}", summarize(&outcomes));

    if report {
        match export_outcomes_csv(kind, &outcomes) {
            Ok(path) => println!("Report written to {}", path.display()),
            Err(e) => eprintln!("Could not write report: {e}"),
        }
    }

    // the device's own listing is the ground truth after a batch
    if let Err(e) = session.refresh_inventory(catalog) {
        eprintln!("Warning: could not refresh the package list afterwards: {e}");
    }
    Ok(())
}

/// Print session help message
fn print_session_help() {
    println!("Available commands:");
    println!("  list [--safe] [--selected] [--search <term>]");
    println!("      List packages; [x] marks selected ones");
    println!("  select <package> [package...]");
    println!("  unselect <package> [package...]");
    println!("  select-safe");
    println!("      Select every catalog-flagged safe-to-remove package");
    println!("  selection");
    println!("      Show the current selection");
    println!("  clear");
    println!("      Clear the selection");
    println!("  preview <uninstall|disable>");
    println!("      Show the exact commands the batch would run");
    println!("  apply <uninstall|disable> [--report]");
    println!("      Execute the batch (asks for confirmation)");
    println!("  backup <name> / restore <name>");
    println!("      Save or load the selection as a profile");
    println!("  device / devices / switch <serial> / refresh");
    println!("  help / exit / quit");
}
