use clap::CommandFactory;
use clap_complete::{generate, Shell};
use debloat_core::adb::PackageId;
use debloat_core::catalog::{load_catalog, local_catalog, CatalogMap};
use debloat_core::config::Config;
use debloat_core::device::{list_devices as bridge_list_devices, sort_devices_by_id};
use debloat_core::executor::{export_outcomes_csv, summarize, ActionOutcome, AdbRunner};
use debloat_core::inventory::{safe_tab_groups, PackageRecord};
use debloat_core::plan::{ActionKind, ActionPlan};
use debloat_core::profile::{list_profiles as profiles_in, load_profile, save_profile};
use debloat_core::session::DeviceSession;
use std::io::Write;
use std::path::PathBuf;

use crate::device::get_target_device;
use crate::filters::{matches_search, LevelFilter, StateFilter};
use crate::{print_or_exit, println_or_exit, Cli};

/// List all connected Android devices
pub fn list_devices(sorted: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("Scanning for connected devices...");
    let mut devices = bridge_list_devices()?;
    if sorted {
        sort_devices_by_id(&mut devices);
    }

    if devices.is_empty() {
        eprintln!("No devices found. Make sure USB debugging is enabled and the device is authorized.");
        return Err("No devices found".into());
    }

    println!("\nFound {} device(s):\n", devices.len());
    for device in &devices {
        println!("  Model:        {}", device.model);
        println!("  Manufacturer: {}", device.manufacturer);
        println!("  Serial:       {}", device.id);
        println!("  Android:      {}", device.android_version);
        println!();
    }

    Ok(())
}

/// Open a session on the target device with a freshly listed inventory.
pub fn build_session(
    device: Option<String>,
) -> Result<(DeviceSession, CatalogMap), Box<dyn std::error::Error>> {
    let catalog = local_catalog();
    let target = get_target_device(device)?;
    let mut session = DeviceSession::new(target);
    session.refresh_inventory(&catalog)?;
    Ok((session, catalog))
}

/// List packages on a device with filtering
pub fn list_packages(
    device: Option<String>,
    level: Option<LevelFilter>,
    state: Option<StateFilter>,
    group: Option<String>,
    search: Option<String>,
    safe: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (session, _catalog) = build_session(device)?;

    println_or_exit!(
        "Listing packages on: {} ({})\n",
        session.device(),
        session.device().id
    );

    if safe {
        return display_safe_tab(session.packages());
    }

    let show_level = level.is_none_or(|f| !f.is_specific());
    let show_state = state.is_none_or(|f| !f.is_specific());
    let mut displayed = 0usize;

    for record in session.packages() {
        if let Some(f) = level {
            if !f.matches(record) {
                continue;
            }
        }
        if let Some(f) = state {
            if !f.matches(record) {
                continue;
            }
        }
        if let Some(ref g) = group {
            if record.group() != g {
                continue;
            }
        }
        if let Some(ref term) = search {
            if !matches_search(record, term) {
                continue;
            }
        }
        display_package_entry(record, show_level, show_state);
        displayed += 1;
    }

    if displayed == 0 {
        println_or_exit!("  No packages found matching the specified filters.");
    } else {
        println_or_exit!("\nTotal: {} package(s)", displayed);
    }
    Ok(())
}

/// The curated safe-to-remove view, grouped by catalog group.
fn display_safe_tab(records: &[PackageRecord]) -> Result<(), Box<dyn std::error::Error>> {
    let groups = safe_tab_groups(records);
    if groups.is_empty() {
        println_or_exit!("  No catalog-flagged safe-to-remove packages on this device.");
        return Ok(());
    }

    let mut total = 0usize;
    for (tag, members) in &groups {
        println_or_exit!("== {} ==", tag);
        for record in members {
            let info = record.safety.as_ref().unwrap_or_else(|| unreachable!("safe-tab members carry safety info"));
            println_or_exit!(
                "  {}{} - {} (battery {}, ram {}{})",
                record.name,
                if record.is_enabled { "" } else { " [disabled]" },
                record.label,
                info.battery_impact,
                info.ram_impact,
                if info.reversible { "" } else { ", NOT reversible" },
            );
            total += 1;
        }
        println_or_exit!();
    }
    println_or_exit!("Total: {} package(s) in {} group(s)", total, groups.len());
    Ok(())
}

/// Display a single package entry
fn display_package_entry(record: &PackageRecord, show_level: bool, show_state: bool) {
    print_or_exit!("[");
    if show_level {
        match &record.safety {
            Some(info) => print_or_exit!("{}", info.safety_level),
            None => print_or_exit!("unlisted"),
        }
        if show_state {
            print_or_exit!(" - ");
        }
    }
    if show_state {
        print_or_exit!("{}", if record.is_enabled { "enabled" } else { "disabled" });
    }
    print_or_exit!("] {} - {}", record.name, record.label);
    if let Some(ref desc) = record.description {
        print_or_exit!(" - {}", truncate(desc, 72));
    }
    println_or_exit!();
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

/// Fill the session's selection from explicit package arguments.
/// Invalid ids and ids missing from the inventory are reported, not fatal.
fn select_packages(session: &mut DeviceSession, packages: &[String]) -> usize {
    let mut selected = 0usize;
    for pkg in packages {
        if PackageId::new(pkg).is_none() {
            eprintln!("  ✗ '{pkg}' is not a valid package id, skipping");
            continue;
        }
        match session.toggle(pkg) {
            Some(true) => selected += 1,
            Some(false) => {} // duplicate argument toggled it back off
            None => eprintln!("  ✗ {pkg} is not installed on this device, skipping"),
        }
    }
    selected
}

fn print_plan(plan: &ActionPlan) {
    println!("Planned commands ({}):", plan.commands.len());
    for cmd in &plan.commands {
        println!("  {}", cmd.preview);
    }
}

fn warn_risky(session: &DeviceSession) {
    for record in session.risky_selected() {
        match &record.safety {
            Some(info) if !info.safe_to_remove => {
                println!("  ⚠ WARNING: {} is marked {} - {}", record.name, info.safety_level, info.notes);
            }
            Some(_) => {
                println!("  ⚠ WARNING: {} is not reversible without a factory reset", record.name);
            }
            None => {
                println!("  ⚠ WARNING: {} is unknown to the safety catalog", record.name);
            }
        }
    }
}

fn confirm(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    let _ = std::io::stdout().flush();
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y" | "yes")
}

/// Preview the exact batch a selection implies, without running anything.
pub fn preview_action(
    kind: ActionKind,
    packages: &[String],
    device: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    if packages.is_empty() {
        eprintln!("Error: No packages specified");
        return Err("No packages specified".into());
    }

    let (mut session, _catalog) = build_session(device)?;
    if select_packages(&mut session, packages) == 0 {
        return Err("None of the specified packages are installed".into());
    }

    let plan = session.plan(kind)?;
    print_plan(&plan);
    warn_risky(&session);
    Ok(())
}

/// Plan, confirm and execute a batch action, then reconcile.
pub fn run_batch(
    kind: ActionKind,
    packages: &[String],
    device: Option<String>,
    yes: bool,
    dry_run: bool,
    report: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if packages.is_empty() {
        eprintln!("Error: No packages specified");
        return Err("No packages specified".into());
    }

    let (mut session, catalog) = build_session(device)?;
    println!(
        "{} {} package(s) on: {} ({})\n",
        match kind {
            ActionKind::Uninstall => "Uninstalling",
            ActionKind::Disable => "Disabling",
        },
        packages.len(),
        session.device(),
        session.device().id
    );

    if select_packages(&mut session, packages) == 0 {
        return Err("None of the specified packages are installed".into());
    }

    let plan = session.plan(kind)?;
    print_plan(&plan);
    warn_risky(&session);

    if dry_run {
        println!("\nDry run completed. No changes were made.");
        return Ok(());
    }

    if !yes && !confirm("\nProceed?") {
        println!("Aborted. No changes were made.");
        return Ok(());
    }

    println!();
    let outcomes = session.apply(kind, &AdbRunner)?;
    print_outcomes(&outcomes);

    if report {
        match export_outcomes_csv(kind, &outcomes) {
            Ok(path) => println!("Report written to {}", path.display()),
            Err(e) => eprintln!("Could not write report: {e}"),
        }
    }

    // ground truth after a batch: the device's own listing
    if let Err(e) = session.refresh_inventory(&catalog) {
        eprintln!("Warning: could not refresh the package list afterwards: {e}");
    }

    Ok(())
}

fn print_outcomes(outcomes: &[ActionOutcome]) {
    for o in outcomes {
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
    let summary = summarize(outcomes);
    println!("\nBatch result: {summary}");
}

/// Save a named selection profile.
pub fn backup_selection(
    name: &str,
    packages: &[String],
    device: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (mut session, _catalog) = build_session(device)?;

    let count = if packages.is_empty() {
        println!("No packages given, saving all safe-to-remove packages.");
        session.select_all_safe()
    } else {
        select_packages(&mut session, packages)
    };
    if count == 0 {
        return Err("Nothing to back up".into());
    }

    let profile = session.snapshot_profile(name);
    let dir = Config::load_configuration_file().general.backup_folder;
    let path = save_profile(&dir, &profile)?;
    println!(
        "Saved profile '{}' ({} package(s)) to {}",
        name,
        count,
        path.display()
    );
    Ok(())
}

/// Restore a profile's selection against the current device and show it.
pub fn restore_selection(
    name: &str,
    device: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = resolve_profile_path(name)?;
    let profile = load_profile(&path)?;
    println!(
        "Profile '{}' from {} ({}, {} package(s))",
        profile.name,
        profile.date,
        profile.device_model,
        profile.packages.len()
    );

    let (mut session, _catalog) = build_session(device)?;
    let skipped = session.restore_profile(&profile);

    if !skipped.is_empty() {
        println!("\nSkipped (not installed on this device):");
        for pkg in &skipped {
            println!("  - {pkg}");
        }
    }

    if session.selection().is_empty() {
        println!("\nNothing from this profile is installed on the target device.");
        return Ok(());
    }

    println!("\nRestored selection:");
    for pkg in session.selection().iter() {
        println!("  - {pkg}");
    }
    println!(
        "\nRun `debloat uninstall` or `debloat disable` with these packages, or use `debloat session`."
    );
    Ok(())
}

fn resolve_profile_path(name: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let direct = PathBuf::from(name);
    if direct.is_file() {
        return Ok(direct);
    }
    let dir = Config::load_configuration_file().general.backup_folder;
    let candidate = dir.join(format!("{name}.json"));
    if candidate.is_file() {
        return Ok(candidate);
    }
    Err(format!("Profile '{name}' not found (looked in {})", dir.display()).into())
}

/// List saved selection profiles.
pub fn list_profiles() {
    let dir = Config::load_configuration_file().general.backup_folder;
    let profiles = profiles_in(&dir);
    if profiles.is_empty() {
        println!("No profiles saved yet (in {}).", dir.display());
        return;
    }
    println!("Profiles in {}:", dir.display());
    for path in profiles {
        match load_profile(&path) {
            Ok(p) => println!(
                "  {} - {} package(s), {} ({})",
                p.name,
                p.packages.len(),
                p.device_model,
                p.date
            ),
            Err(e) => println!("  {} - unreadable: {}", path.display(), e),
        }
    }
}

/// Refresh the safety catalog from the remote repository.
pub fn update_catalog() -> Result<(), Box<dyn std::error::Error>> {
    println!("Updating safety catalog from remote repository...");
    match load_catalog(true) {
        Ok(map) => {
            println!("✓ Catalog updated ({} packages)", map.len());
            Ok(())
        }
        Err(map) => {
            eprintln!(
                "✗ Failed to update from remote, using local copy ({} packages)",
                map.len()
            );
            Err("Failed to update catalog".into())
        }
    }
}

/// Generate shell completion script
pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
