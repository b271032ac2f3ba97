//! Graphical spoke binding.
//!
//! The window is described declaratively: [`GuiView`] is what the host's
//! widget toolkit renders, and the `on_*` handlers are what its signal
//! callbacks forward into. All sensitivity decisions come from the shared
//! [`SpokeModel`] projection, never from widget state.

use crate::apply::FadumpCapability;
use crate::memory::MemoryBounds;
use crate::reservation::ReservationState;
use crate::spokes::{Spoke, SpokeModel, SpokeState};

/// A checkbox with host-toolkit-agnostic visibility and sensitivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckboxView {
    pub active: bool,
    pub sensitive: bool,
    pub visible: bool,
}

/// The auto/manual radio pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationModeView {
    pub auto_active: bool,
    pub manual_active: bool,
    pub sensitive: bool,
}

/// The to-be-reserved spin button, bounds-constrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinView {
    pub value_mb: u64,
    pub lower: u64,
    pub upper: u64,
    pub step: u64,
    pub sensitive: bool,
}

/// Full declarative description of the kdump window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuiView {
    pub enable_check: CheckboxView,
    pub fadump_check: CheckboxView,
    pub reservation_mode: ReservationModeView,
    pub amount_spin: SpinView,
    pub total_mem_mb: u64,
    pub usable_mem_mb: u64,
}

/// The graphical spoke.
#[derive(Debug, Clone)]
pub struct GraphicalBinding {
    model: SpokeModel,
}

impl GraphicalBinding {
    pub fn new(
        state: ReservationState,
        bounds: MemoryBounds,
        total_mem_mb: u64,
        fadump: &FadumpCapability,
    ) -> Self {
        GraphicalBinding {
            model: SpokeModel::new(state, bounds, total_mem_mb, fadump.is_capable()),
        }
    }

    /// Render the current state into a widget description.
    pub fn view(&self) -> GuiView {
        let controls = self.model.controls();
        let spoke_state = self.model.spoke_state();

        GuiView {
            enable_check: CheckboxView {
                active: controls.enable_active,
                sensitive: true,
                visible: true,
            },
            fadump_check: CheckboxView {
                active: controls.fadump_active,
                sensitive: controls.fadump_sensitive,
                visible: controls.fadump_visible,
            },
            reservation_mode: ReservationModeView {
                auto_active: spoke_state == SpokeState::Auto,
                manual_active: spoke_state == SpokeState::Manual,
                sensitive: controls.reservation_type_sensitive,
            },
            amount_spin: SpinView {
                value_mb: controls.amount_mb,
                lower: controls.bounds.lower,
                upper: controls.bounds.upper,
                step: controls.bounds.step,
                sensitive: controls.amount_editable,
            },
            total_mem_mb: controls.total_mem_mb,
            usable_mem_mb: controls.usable_mem_mb,
        }
    }

    pub fn on_enable_toggled(&mut self, active: bool) {
        self.model.set_enabled(active);
    }

    pub fn on_auto_toggled(&mut self, active: bool) {
        if active {
            self.model.set_auto();
        } else if let Some(value) = self.manual_value() {
            // Radio pair: leaving auto enters manual at the spin value.
            self.model.set_manual(value);
        }
    }

    /// Spin input arrives bounds-clamped by the adjustment, but the model
    /// still rejects anything out of range.
    pub fn on_amount_changed(&mut self, value_mb: u64) -> bool {
        self.model.set_manual(value_mb)
    }

    pub fn on_fadump_toggled(&mut self, active: bool) -> bool {
        self.model.set_fadump(active)
    }

    fn manual_value(&self) -> Option<u64> {
        let controls = self.model.controls();
        if self.model.bounds().contains(controls.amount_mb) {
            Some(controls.amount_mb)
        } else {
            None
        }
    }
}

impl Spoke for GraphicalBinding {
    fn refresh(&mut self, state: &ReservationState) {
        self.model.load(state);
    }

    fn apply(&self, state: &mut ReservationState) {
        self.model.store(state);
    }

    fn status(&self) -> String {
        self.model.status().to_string()
    }
}
