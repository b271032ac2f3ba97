//! Memory probing and reservation bounds.
//!
//! The kernel reports how much memory is already reserved for the crash
//! kernel through `/sys/kernel/kexec_crash_size`, and the usable total
//! through `/proc/meminfo`. Both paths are injectable so tests can point a
//! [`MemoryProbe`] at fixture files.
//!
//! Bounds policy is per architecture family: the lower bound is the smallest
//! reservation the capture kernel can boot with, and `min_usable` is what the
//! production system must keep for itself.

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Kernel-reported crash kernel reservation, in bytes.
pub const KEXEC_CRASH_SIZE_PATH: &str = "/sys/kernel/kexec_crash_size";

/// System memory totals, `MemTotal:` line in KB.
pub const PROC_MEMINFO_PATH: &str = "/proc/meminfo";

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Architecture family for the reservation bounds policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchFamily {
    /// Any `ppc64*` machine (ppc64, ppc64le).
    Ppc64,
    Aarch64,
    /// Everything else, x86_64 included.
    Other,
}

impl ArchFamily {
    /// Classify a host-provided architecture string.
    pub fn classify(arch: &str) -> Self {
        if arch.starts_with("ppc64") {
            ArchFamily::Ppc64
        } else if arch == "aarch64" {
            ArchFamily::Aarch64
        } else {
            ArchFamily::Other
        }
    }

    /// (lower bound, minimum usable memory, step), all in MB.
    fn policy(self) -> (u64, u64, u64) {
        match self {
            ArchFamily::Ppc64 => (384, 1024, 1),
            ArchFamily::Aarch64 => (512, 512, 1),
            ArchFamily::Other => (160, 512, 1),
        }
    }
}

/// Allowed reservation range in MB. Derived on demand, never persisted.
///
/// `upper >= lower` always holds; a machine without enough memory for any
/// reservation collapses both to 0 (empty range, kdump cannot be configured).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryBounds {
    pub lower: u64,
    pub upper: u64,
    pub step: u64,
}

impl MemoryBounds {
    /// True when no usable reservation range exists.
    pub fn is_empty(&self) -> bool {
        self.lower == 0 && self.upper == 0
    }

    /// True when `amount_mb` is a valid manual reservation.
    pub fn contains(&self, amount_mb: u64) -> bool {
        !self.is_empty() && (self.lower..=self.upper).contains(&amount_mb)
    }
}

/// Derive the reservation bounds for a machine with `total_mb` of memory.
pub fn memory_bounds(total_mb: u64, arch: ArchFamily) -> MemoryBounds {
    let (lower, min_usable, step) = arch.policy();
    let upper = total_mb
        .saturating_sub(min_usable)
        .saturating_sub(total_mb % step);

    if upper < lower {
        MemoryBounds {
            lower: 0,
            upper: 0,
            step,
        }
    } else {
        MemoryBounds { lower, upper, step }
    }
}

/// Reads memory figures from the kernel's virtual filesystems.
///
/// The reserved-size reading is memoized per probe: the first successful read
/// sticks for the probe's lifetime and is never invalidated. Failed reads
/// return 0 without populating the memo, so later calls retry.
#[derive(Debug)]
pub struct MemoryProbe {
    crash_size_path: PathBuf,
    meminfo_path: PathBuf,
    reserved_mb: OnceLock<u64>,
}

impl MemoryProbe {
    /// Probe the running system's `/sys` and `/proc` paths.
    pub fn system() -> Self {
        Self::with_paths(KEXEC_CRASH_SIZE_PATH, PROC_MEMINFO_PATH)
    }

    pub fn with_paths(crash_size: impl Into<PathBuf>, meminfo: impl Into<PathBuf>) -> Self {
        MemoryProbe {
            crash_size_path: crash_size.into(),
            meminfo_path: meminfo.into(),
            reserved_mb: OnceLock::new(),
        }
    }

    /// Memory currently reserved for the crash kernel, in MB.
    ///
    /// A missing or malformed kernel interface reads as 0 reserved.
    pub fn reserved_memory_mb(&self) -> u64 {
        if let Some(mb) = self.reserved_mb.get() {
            return *mb;
        }
        match read_crash_size_bytes(&self.crash_size_path) {
            Some(bytes) => *self.reserved_mb.get_or_init(|| bytes / BYTES_PER_MB),
            None => 0,
        }
    }

    /// Total system memory in MB: the meminfo total plus whatever is already
    /// reserved for the crash kernel.
    ///
    /// An unreadable meminfo file is an unrecoverable environment error and
    /// propagates.
    pub fn total_memory_mb(&self) -> Result<u64> {
        let contents = fs::read_to_string(&self.meminfo_path).with_context(|| {
            format!("reading memory info '{}'", self.meminfo_path.display())
        })?;
        let mem_kb = parse_mem_total_kb(&contents).ok_or_else(|| {
            anyhow!(
                "no MemTotal entry in memory info '{}'",
                self.meminfo_path.display()
            )
        })?;

        Ok(mem_kb / 1024 + self.reserved_memory_mb())
    }

    /// Reservation bounds for this machine and the given architecture.
    pub fn memory_bounds(&self, arch: ArchFamily) -> Result<MemoryBounds> {
        Ok(memory_bounds(self.total_memory_mb()?, arch))
    }
}

fn read_crash_size_bytes(path: &Path) -> Option<u64> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

fn parse_mem_total_kb(contents: &str) -> Option<u64> {
    contents.lines().find_map(|line| {
        let rest = line.strip_prefix("MemTotal:")?;
        rest.split_whitespace().next()?.parse().ok()
    })
}
