//! Install-time application of the reservation state.
//!
//! The host installer owns the bootloader, the storage layer, the package
//! list, and service activation; this module talks to them through small
//! collaborator traits so the whole flow is testable without a host. The
//! `kdump_addon` early-boot parameter gates everything: when it reads
//! `0`/`off`, the addon is inert end to end.

use anyhow::{bail, Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

use crate::reservation::ReservationState;

/// Package the target system needs for capture-kernel loading.
pub const KDUMP_PACKAGE: &str = "kexec-tools";

/// Service enabled on the installed system when kdump is configured.
pub const KDUMP_SERVICE: &str = "kdump.service";

/// Early-boot parameter gating the whole addon.
pub const ADDON_GATE_PARAM: &str = "kdump_addon";

/// Presence of this path means the firmware supports fadump.
pub const FADUMP_CAPABLE_FILE: &str = "/proc/device-tree/rtas/ibm,configure-kernel-dump";

const PROC_CMDLINE_PATH: &str = "/proc/cmdline";

/// Whether the addon is allowed to run at all, per the kernel command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddonGate {
    enabled: bool,
}

impl AddonGate {
    /// Read the gate from the running kernel's command line. An unreadable
    /// command line leaves the addon enabled.
    pub fn from_proc_cmdline() -> Self {
        match fs::read_to_string(PROC_CMDLINE_PATH) {
            Ok(cmdline) => Self::from_cmdline(&cmdline),
            Err(_) => AddonGate { enabled: true },
        }
    }

    /// Parse the gate out of a kernel command line. Absent means enabled;
    /// only `kdump_addon=0` and `kdump_addon=off` disable (last occurrence
    /// wins, kernel style).
    pub fn from_cmdline(cmdline: &str) -> Self {
        let value = cmdline.split_whitespace().rev().find_map(|token| {
            match token.split_once('=') {
                Some((key, value)) if key == ADDON_GATE_PARAM => Some(value),
                None if token == ADDON_GATE_PARAM => Some(""),
                _ => None,
            }
        });
        AddonGate {
            enabled: !matches!(value, Some("0") | Some("off")),
        }
    }

    pub fn allows_addon(&self) -> bool {
        self.enabled
    }
}

/// Firmware fadump support, detected by path existence.
#[derive(Debug, Clone)]
pub struct FadumpCapability {
    path: PathBuf,
}

impl FadumpCapability {
    pub fn system() -> Self {
        Self::at(FADUMP_CAPABLE_FILE)
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        FadumpCapability { path: path.into() }
    }

    pub fn is_capable(&self) -> bool {
        self.path.exists()
    }
}

/// The host's ordered extra-kernel-arguments store on the bootloader proxy.
pub trait BootloaderProxy {
    fn extra_arguments(&self) -> Vec<String>;
    fn set_extra_arguments(&mut self, args: Vec<String>);
}

/// The storage layer's boot-args set. Optional at install time; when the
/// host has no storage object the update is skipped.
pub trait StorageBootArgs {
    fn boot_args(&self) -> BTreeSet<String>;
    fn add_arg(&mut self, arg: &str);
    fn remove_arg(&mut self, arg: &str);
}

/// The target system's package list.
pub trait PackageList {
    fn append(&mut self, package: &str);
}

/// Enables a named service on the installed target.
pub trait ServiceControl {
    fn enable_service(&mut self, service: &str) -> Result<()>;
}

/// Runs `systemctl enable` against the installed target root.
#[derive(Debug, Clone)]
pub struct SystemctlServiceControl {
    target_root: PathBuf,
}

impl SystemctlServiceControl {
    pub fn new(target_root: impl Into<PathBuf>) -> Self {
        SystemctlServiceControl {
            target_root: target_root.into(),
        }
    }
}

impl ServiceControl for SystemctlServiceControl {
    fn enable_service(&mut self, service: &str) -> Result<()> {
        let output = Command::new("systemctl")
            .arg("enable")
            .arg(service)
            .arg("--root")
            .arg(&self.target_root)
            .output()
            .with_context(|| {
                format!(
                    "running systemctl enable {service} --root '{}'",
                    self.target_root.display()
                )
            })?;

        if !output.status.success() {
            bail!(
                "systemctl enable {} failed: {}",
                service,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

/// One-shot translation of [`ReservationState`] into host mutations.
///
/// `configure` runs at install-configuration time, `activate` after package
/// installation. Both are no-ops when the gate disables the addon. No
/// rollback: the install flow runs each exactly once.
#[derive(Debug)]
pub struct InstallTimeApplier {
    gate: AddonGate,
    fadump: FadumpCapability,
}

impl InstallTimeApplier {
    pub fn new(gate: AddonGate, fadump: FadumpCapability) -> Self {
        InstallTimeApplier { gate, fadump }
    }

    /// Applier wired to the running system's gate and capability paths.
    pub fn system() -> Self {
        Self::new(AddonGate::from_proc_cmdline(), FadumpCapability::system())
    }

    /// Push the state into the package list and both boot-argument stores.
    pub fn configure(
        &self,
        state: &ReservationState,
        bootloader: &mut dyn BootloaderProxy,
        storage: Option<&mut dyn StorageBootArgs>,
        packages: &mut dyn PackageList,
    ) {
        if !self.gate.allows_addon() {
            return;
        }

        if state.enabled {
            packages.append(KDUMP_PACKAGE);
        }

        let capable = self.fadump.is_capable();

        let extra_args = bootloader.extra_arguments();
        bootloader.set_extra_arguments(state.apply_to_arg_list(&extra_args, capable));

        // The storage layer keeps its own copy of the boot arguments; it
        // must end up identical to the bootloader proxy's.
        if let Some(storage) = storage {
            let current = storage.boot_args();
            let updated = state.apply_to_arg_set(&current, capable);
            for stale in current.difference(&updated) {
                storage.remove_arg(stale);
            }
            for fresh in updated.difference(&current) {
                storage.add_arg(fresh);
            }
        }
    }

    /// Enable the kdump service on the installed target.
    pub fn activate(
        &self,
        state: &ReservationState,
        services: &mut dyn ServiceControl,
    ) -> Result<()> {
        if !self.gate.allows_addon() || !state.enabled {
            return Ok(());
        }
        services.enable_service(KDUMP_SERVICE)
    }
}
