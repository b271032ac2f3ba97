//! Kernel crash-dump (kdump/fadump) reservation addon for OS installers.
//!
//! This crate holds the reusable core of an installer addon that reserves
//! memory for a crash capture kernel. The host installer owns the plugin
//! lifecycle, the bootloader, the package list, and the scripting parser;
//! this crate owns the logic in between:
//!
//! - **Memory bounds** - read reserved/total memory, derive the allowed
//!   reservation range per architecture family
//! - **Reservation state** - the three persisted settings (enabled, amount,
//!   fadump) and their translation into kernel boot arguments
//! - **Directive surface** - parse/serialize the non-interactive
//!   `%addon com_redhat_kdump` installer-script block
//! - **Install-time applier** - push the configured state into the host's
//!   bootloader, package-list, and service-control collaborators
//! - **Spokes** - the graphical and text UI bindings, modeled as a shared
//!   state machine projected into declarative widget descriptions
//!
//! # Architecture
//!
//! ```text
//! directive parser ──┐                     ┌── bootloader proxy
//!                    ├──> ReservationState ├──> storage boot-args set
//! spoke (gui/tui) ───┘          │          ├──> package list
//!                               │          └── service control
//!                    MemoryProbe/MemoryBounds
//!                    (read-only bounds for UI validation)
//! ```
//!
//! # Example
//!
//! ```rust
//! use kdump_addon::{memory_bounds, ArchFamily, ReservationState};
//!
//! let bounds = memory_bounds(4096, ArchFamily::Other);
//! assert_eq!((bounds.lower, bounds.upper), (160, 3584));
//!
//! let state = ReservationState::default();
//! let args = state.apply_to_arg_list(&["quiet".into()], false);
//! assert!(args.contains(&"crashkernel=auto".to_string()));
//! ```

pub mod apply;
pub mod directive;
pub mod memory;
pub mod reservation;
pub mod spokes;

pub use apply::{AddonGate, FadumpCapability, InstallTimeApplier};
pub use directive::{Directive, KdumpDirective, ParseError};
pub use memory::{memory_bounds, ArchFamily, MemoryBounds, MemoryProbe};
pub use reservation::{ReservationState, ReserveAmount};
pub use spokes::{Spoke, SpokeModel, SpokeState};
