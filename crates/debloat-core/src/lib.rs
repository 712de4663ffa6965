//! Package action orchestrator for Android debloating over ADB.
//!
//! Tracks per-device package state, classifies packages through the safety
//! catalog, manages a selection, renders batch commands deterministically,
//! executes them without root, and reconciles the resulting state.

#![allow(
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::uninlined_format_args,
    reason = "Doc+style pedantic lints are out-of-scope for this pass"
)]

pub mod adb;
pub mod catalog;
pub mod config;
pub mod device;
pub mod executor;
pub mod inventory;
pub mod plan;
pub mod profile;
pub mod selection;
pub mod session;

use std::path::PathBuf;
use std::sync::LazyLock;

fn setup_app_dir(base: &std::path::Path) -> PathBuf {
    let dir = base.join("debloat");
    if let Err(e) = std::fs::create_dir_all(&dir) {
        log::error!("Can't create directory: {dir:?}");
        panic!("{e}");
    }
    dir
}

pub static CONFIG_DIR: LazyLock<PathBuf> =
    LazyLock::new(|| setup_app_dir(&dirs::config_dir().expect("Can't detect config dir")));
pub static CACHE_DIR: LazyLock<PathBuf> =
    LazyLock::new(|| setup_app_dir(&dirs::cache_dir().expect("Can't detect cache dir")));
