//! UI bindings for the reservation settings.
//!
//! Both spokes share one state machine, [`SpokeModel`]: business state lives
//! here, and each binding projects it into a declarative widget description
//! ([`gui::GuiView`], [`tui::TuiEntry`] rows) instead of poking widgets
//! directly. Invalid manual input is rejected without mutating state; that
//! rejection is the only user-facing error path in the addon.

pub mod gui;
pub mod tui;

pub use gui::GraphicalBinding;
pub use tui::TextBinding;

use crate::apply::AddonGate;
use crate::memory::MemoryBounds;
use crate::reservation::{ReservationState, ReserveAmount};

/// The three observable spoke states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpokeState {
    /// Kdump off; every dependent control insensitive.
    Disabled,
    /// Kdump on, kernel picks the reservation.
    Auto,
    /// Kdump on, user-chosen reservation amount.
    Manual,
}

/// What a rendered spoke can and cannot touch. Pure projection of
/// [`SpokeModel`]; bindings translate this into their widget trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub enable_active: bool,
    /// Fadump is shown only on capable platforms.
    pub fadump_visible: bool,
    pub fadump_sensitive: bool,
    pub fadump_active: bool,
    pub reservation_type_sensitive: bool,
    /// Manual amount entry is editable only in the `Manual` state.
    pub amount_editable: bool,
    /// Current spin/entry value in MB, also shown while `auto` is selected.
    pub amount_mb: u64,
    pub bounds: MemoryBounds,
    pub total_mem_mb: u64,
    pub usable_mem_mb: u64,
}

/// Shared spoke state machine.
///
/// Owns a working copy of the reservation settings plus the read-only memory
/// figures the UI validates against. Hosts load it with `refresh` and read
/// it back with `apply` through the [`Spoke`] bindings.
#[derive(Debug, Clone)]
pub struct SpokeModel {
    state: ReservationState,
    bounds: MemoryBounds,
    total_mem_mb: u64,
    fadump_capable: bool,
    /// Last accepted manual amount; kept while `auto` is selected so
    /// switching back restores it.
    manual_amount: u64,
}

impl SpokeModel {
    pub fn new(
        state: ReservationState,
        bounds: MemoryBounds,
        total_mem_mb: u64,
        fadump_capable: bool,
    ) -> Self {
        let manual_amount = match state.reserve_mb {
            ReserveAmount::Fixed(mb) => mb,
            ReserveAmount::Auto => bounds.lower,
        };
        SpokeModel {
            state,
            bounds,
            total_mem_mb,
            fadump_capable,
            manual_amount,
        }
    }

    pub fn state(&self) -> &ReservationState {
        &self.state
    }

    pub fn bounds(&self) -> MemoryBounds {
        self.bounds
    }

    pub fn spoke_state(&self) -> SpokeState {
        if !self.state.enabled {
            SpokeState::Disabled
        } else if self.state.reserve_mb == ReserveAmount::Auto {
            SpokeState::Auto
        } else {
            SpokeState::Manual
        }
    }

    /// Reload the working copy from host-owned addon data.
    pub fn load(&mut self, state: &ReservationState) {
        if let ReserveAmount::Fixed(mb) = state.reserve_mb {
            self.manual_amount = mb;
        }
        self.state = state.clone();
    }

    /// Write the working copy back into host-owned addon data.
    pub fn store(&self, target: &mut ReservationState) {
        *target = self.state.clone();
    }

    /// Toggling kdump off forces fadump off with it.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.state.enabled = enabled;
        if !enabled {
            self.state.fadump = false;
        }
    }

    pub fn set_auto(&mut self) {
        self.state.reserve_mb = ReserveAmount::Auto;
    }

    /// Switch to a manual reservation. Rejected (state untouched) when the
    /// amount falls outside the machine's bounds.
    pub fn set_manual(&mut self, amount_mb: u64) -> bool {
        if !self.bounds.contains(amount_mb) {
            return false;
        }
        self.state.reserve_mb = ReserveAmount::Fixed(amount_mb);
        self.manual_amount = amount_mb;
        true
    }

    /// Text-entry variant: accepts `auto` or an in-range integer with an
    /// optional trailing `M`. Rejected input leaves the state untouched.
    pub fn set_amount_text(&mut self, input: &str) -> bool {
        match input.parse::<ReserveAmount>() {
            Ok(ReserveAmount::Auto) => {
                self.set_auto();
                true
            }
            Ok(ReserveAmount::Fixed(mb)) => self.set_manual(mb),
            Err(_) => false,
        }
    }

    /// Fadump input is accepted only on capable platforms while kdump is on.
    pub fn set_fadump(&mut self, fadump: bool) -> bool {
        if fadump && !(self.fadump_capable && self.state.enabled) {
            return false;
        }
        self.state.fadump = fadump;
        true
    }

    pub fn status(&self) -> &'static str {
        if self.state.enabled {
            "Kdump is enabled"
        } else {
            "Kdump is disabled"
        }
    }

    /// Project the state machine into control sensitivities.
    pub fn controls(&self) -> Controls {
        let spoke_state = self.spoke_state();
        let enabled = self.state.enabled;
        Controls {
            enable_active: enabled,
            fadump_visible: self.fadump_capable,
            fadump_sensitive: self.fadump_capable && enabled,
            fadump_active: self.state.fadump,
            reservation_type_sensitive: enabled,
            amount_editable: spoke_state == SpokeState::Manual,
            amount_mb: self.manual_amount,
            bounds: self.bounds,
            total_mem_mb: self.total_mem_mb,
            usable_mem_mb: self.total_mem_mb.saturating_sub(self.manual_amount),
        }
    }
}

/// Spoke lifecycle capability the host installer drives.
pub trait Spoke {
    /// Spokes run only when the early-boot gate allows the addon.
    fn should_run(gate: &AddonGate) -> bool
    where
        Self: Sized,
    {
        gate.allows_addon()
    }

    /// Reload the spoke from host-owned addon data before presentation.
    fn refresh(&mut self, state: &ReservationState);

    /// Write the spoke's working state back into host-owned addon data.
    fn apply(&self, state: &mut ReservationState);

    /// One-line summary shown on the hub.
    fn status(&self) -> String;

    /// This spoke never blocks installation.
    fn completed(&self) -> bool {
        true
    }
}
