//! Thin, typed wrappers around the ADB CLI.
//!
//! `*Command` types are intentionally "low-level": one method maps to one
//! ADB invocation, with no chaining of commands and no magic. Output is
//! pre-parsed where the format is stable, so callers get types instead of
//! strings. If an ADB feature is missing here, extend these builders rather
//! than falling back to a raw `Command`.
//!
//! For comprehensive info about ADB,
//! [see this](https://android.googlesource.com/platform/packages/modules/adb/+/refs/heads/master/docs/)

use log::error;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::process::Command;
use std::sync::LazyLock;

#[cfg(target_os = "windows")]
use std::os::windows::process::CommandExt;

/// Errors from the debug-bridge transport itself. Per-package command
/// failures are not transport errors and never surface through this type.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AdbError {
    /// The `adb` binary could not be run at all.
    #[error("cannot run adb (is Android platform-tools installed?): {0}")]
    Unavailable(String),
    /// ADB ran but reported failure.
    #[error("adb failed: {0}")]
    Command(String),
}

pub fn to_trimmed_utf8(v: Vec<u8>) -> String {
    String::from_utf8_lossy(&v).trim_end().to_string()
}

/// A validated Android application ID.
///
/// [Naming rules](https://developer.android.com/build/configure-app-module#set-application-id)
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Hash)]
pub struct PackageId(String);

impl PackageId {
    pub fn new<S: AsRef<str>>(pid: S) -> Option<Self> {
        static RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]*(?:\.[a-zA-Z][a-zA-Z0-9_]*)+$")
                .unwrap_or_else(|_| unreachable!())
        });

        let pid = pid.as_ref();
        RE.is_match(pid).then(|| Self(pid.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PackageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// `pm list packages` flag/state/type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PmListPacksFlag {
    /// Include uninstalled
    IncludeUninstalled,
    /// Only enabled
    OnlyEnabled,
    /// Only disabled
    OnlyDisabled,
}

impl PmListPacksFlag {
    const fn to_str(self) -> &'static str {
        match self {
            Self::IncludeUninstalled => "-u",
            Self::OnlyEnabled => "-e",
            Self::OnlyDisabled => "-d",
        }
    }
}

pub const PACK_URI_SCHEME: &str = "package:";

/// Builder for an ADB CLI command, using the type-state pattern.
/// Only models the subset of ADB this crate needs.
#[derive(Debug)]
pub struct ACommand(Command);

impl ACommand {
    #[must_use]
    pub fn new() -> Self {
        Self(Command::new("adb"))
    }

    /// `shell` sub-command.
    ///
    /// If `device_serial` is empty, it lets ADB choose the default device.
    pub fn shell<S: AsRef<str>>(mut self, device_serial: S) -> ShellCommand {
        let serial = device_serial.as_ref();
        if !serial.is_empty() {
            self.0.args(["-s", serial]);
        }
        self.0.arg("shell");
        ShellCommand(self)
    }

    /// List all detected devices as `(serial, state)` pairs:
    /// USB, TCP/IP and local emulators.
    /// Some may not be authorized by the user (yet).
    pub fn devices(mut self) -> Result<Vec<(String, String)>, AdbError> {
        self.0.arg("devices");
        self.run().map(|out| parse_devices_output(&out))
    }

    fn run(self) -> Result<String, AdbError> {
        let mut cmd = self.0;
        #[cfg(target_os = "windows")]
        let cmd = cmd.creation_flags(0x0800_0000); // do not open a cmd window

        match cmd.output() {
            Err(e) => {
                error!("ADB: {}", e);
                Err(AdbError::Unavailable(e.to_string()))
            }
            Ok(o) => {
                let stdout = to_trimmed_utf8(o.stdout);
                if o.status.success() {
                    Ok(stdout)
                } else {
                    let stderr = to_trimmed_utf8(o.stderr);
                    // ADB does really weird things:
                    // Some errors are not redirected to `stderr`
                    let err = if stdout.is_empty() { stderr } else { stdout };
                    Err(AdbError::Command(err))
                }
            }
        }
    }
}

impl Default for ACommand {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a command that runs on the device's default `sh`
/// implementation. Typically MKSH, but could be Ash.
#[derive(Debug)]
pub struct ShellCommand(ACommand);

impl ShellCommand {
    pub fn pm(mut self) -> PmCommand {
        self.0 .0.arg("pm");
        PmCommand(self)
    }

    /// Query a system property via `getprop`.
    pub fn getprop(mut self, prop: &str) -> Result<String, AdbError> {
        self.0 .0.args(["getprop", prop]);
        self.0.run()
    }

    /// Run an arbitrary action string; `sh` splits on spaces.
    pub fn raw(mut self, action: &str) -> Result<String, AdbError> {
        self.0 .0.arg(action);
        self.0.run()
    }
}

/// Builder for an Android Package Manager command.
///
/// [More info](https://developer.android.com/tools/adb#pm)
#[derive(Debug)]
pub struct PmCommand(ShellCommand);

impl PmCommand {
    /// `list packages` sub-command, names only.
    pub fn list_packages(mut self, f: Option<PmListPacksFlag>) -> Result<Vec<String>, AdbError> {
        let cmd = &mut self.0 .0 .0;
        cmd.args(["list", "packages"]);
        if let Some(s) = f {
            cmd.arg(s.to_str());
        }
        self.0 .0.run().map(|pack_ls| {
            pack_ls
                .lines()
                .filter_map(|ln| ln.strip_prefix(PACK_URI_SCHEME))
                .map(String::from)
                .collect()
        })
    }

    /// `list packages -f` sub-command: `(install_path, package_name)` pairs.
    /// The install path tells apart system and user apps.
    pub fn list_packages_with_paths(mut self) -> Result<Vec<(String, String)>, AdbError> {
        self.0 .0 .0.args(["list", "packages", "-f"]);
        self.0 .0.run().map(|out| {
            out.lines()
                .filter_map(parse_package_path_line)
                .collect::<Vec<_>>()
        })
    }
}

/// Parse one line of `pm list packages -f` output:
/// `package:/system/app/Foo/Foo.apk=com.example.foo`.
fn parse_package_path_line(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix(PACK_URI_SCHEME)?;
    // Split on the *last* '=' as APK paths may contain one.
    let (path, name) = rest.rsplit_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((path.to_string(), name.to_string()))
}

/// Parse `adb devices` output into `(serial, state)` pairs,
/// skipping the header line and daemon chatter.
fn parse_devices_output(out: &str) -> Vec<(String, String)> {
    out.lines()
        .filter(|ln| !ln.starts_with("List of devices") && !ln.starts_with('*'))
        .filter_map(|ln| {
            let mut parts = ln.split_whitespace();
            let serial = parts.next()?;
            let state = parts.next()?;
            Some((serial.to_string(), state.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_package_ids() {
        assert!(PackageId::new("com.example.app").is_some());
        assert!(PackageId::new("a.b").is_some());
        assert!(PackageId::new("com.miui.analytics_2").is_some());
    }

    #[test]
    fn invalid_package_ids() {
        assert!(PackageId::new("").is_none());
        assert!(PackageId::new("nodots").is_none());
        assert!(PackageId::new("1com.example").is_none());
        assert!(PackageId::new("com..example").is_none());
        assert!(PackageId::new("com.example.").is_none());
        assert!(PackageId::new("com.example app").is_none());
    }

    #[test]
    fn devices_output_parsing() {
        let out = "List of devices attached\n\
                   emulator-5554\tdevice\n\
                   R58M123ABC\tunauthorized\n";
        let parsed = parse_devices_output(out);
        assert_eq!(
            parsed,
            vec![
                ("emulator-5554".to_string(), "device".to_string()),
                ("R58M123ABC".to_string(), "unauthorized".to_string()),
            ]
        );
    }

    #[test]
    fn devices_output_empty() {
        assert!(parse_devices_output("List of devices attached\n").is_empty());
    }

    #[test]
    fn package_path_line_parsing() {
        assert_eq!(
            parse_package_path_line("package:/system/app/Gmail/Gmail.apk=com.google.android.gm"),
            Some((
                "/system/app/Gmail/Gmail.apk".to_string(),
                "com.google.android.gm".to_string()
            ))
        );
        assert_eq!(parse_package_path_line("garbage"), None);
        assert_eq!(parse_package_path_line("package:/no/equals/sign"), None);
    }
}
