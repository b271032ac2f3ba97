//! Text spoke binding.
//!
//! The text UI is a column of checkbox and entry rows; the host renders
//! [`TuiEntry`] rows and dispatches selection back by index. An invalid
//! reserve amount leaves the state untouched and the dialog re-prompts.

use crate::apply::FadumpCapability;
use crate::memory::MemoryBounds;
use crate::reservation::{ReservationState, ReserveAmount};
use crate::spokes::{Spoke, SpokeModel};

/// One selectable row on the text spoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TuiEntry {
    EnableCheckbox { title: String, completed: bool },
    FadumpCheckbox { title: String, completed: bool },
    ReserveEntry { title: String, value: String },
}

/// The text spoke.
#[derive(Debug, Clone)]
pub struct TextBinding {
    model: SpokeModel,
}

impl TextBinding {
    pub fn new(
        state: ReservationState,
        bounds: MemoryBounds,
        total_mem_mb: u64,
        fadump: &FadumpCapability,
    ) -> Self {
        TextBinding {
            model: SpokeModel::new(state, bounds, total_mem_mb, fadump.is_capable()),
        }
    }

    pub fn title(&self) -> &'static str {
        "Kdump"
    }

    /// Rows in display order. Dependent rows only appear while kdump is
    /// enabled, and the fadump row only on capable platforms.
    pub fn entries(&self) -> Vec<TuiEntry> {
        let controls = self.model.controls();
        let mut entries = vec![TuiEntry::EnableCheckbox {
            title: "Enable kdump".to_string(),
            completed: controls.enable_active,
        }];

        if controls.enable_active {
            if controls.fadump_visible {
                entries.push(TuiEntry::FadumpCheckbox {
                    title: "Enable dump mode fadump".to_string(),
                    completed: controls.fadump_active,
                });
            }
            entries.push(TuiEntry::ReserveEntry {
                title: self.reserve_prompt(),
                value: self.model.state().reserve_mb.to_string(),
            });
        }

        entries
    }

    /// Caption for the reserve-amount entry and its dialog.
    pub fn reserve_prompt(&self) -> String {
        let bounds = self.model.bounds();
        format!("Reserve amount ({} - {} MB)", bounds.lower, bounds.upper)
    }

    /// Selection on a checkbox row toggles it.
    pub fn toggle_enabled(&mut self) {
        let enabled = self.model.state().enabled;
        self.model.set_enabled(!enabled);
    }

    pub fn toggle_fadump(&mut self) -> bool {
        let fadump = self.model.state().fadump;
        self.model.set_fadump(!fadump)
    }

    /// Dialog submission for the reserve amount. Returns false (re-prompt)
    /// on malformed or out-of-range input; the state is untouched.
    pub fn submit_reserve_amount(&mut self, input: &str) -> bool {
        self.model.set_amount_text(input)
    }

    /// The dialog's per-keystroke validity check.
    pub fn is_valid_reserve_amount(&self, input: &str) -> bool {
        match input.parse::<ReserveAmount>() {
            Ok(ReserveAmount::Auto) => true,
            Ok(ReserveAmount::Fixed(mb)) => self.model.bounds().contains(mb),
            Err(_) => false,
        }
    }
}

impl Spoke for TextBinding {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::AddonGate;
    use crate::memory::{memory_bounds, ArchFamily};
    use tempfile::TempDir;

    fn binding(capable: bool) -> TextBinding {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("capability");
        if capable {
            std::fs::write(&path, "").unwrap();
        }
        TextBinding::new(
            ReservationState::default(),
            memory_bounds(4096, ArchFamily::Other),
            4096,
            &FadumpCapability::at(path),
        )
    }

    #[test]
    fn test_entries_enabled_capable() {
        let entries = binding(true).entries();
        assert_eq!(entries.len(), 3);
        assert!(matches!(
            &entries[0],
            TuiEntry::EnableCheckbox { completed: true, .. }
        ));
        assert!(matches!(
            &entries[1],
            TuiEntry::FadumpCheckbox { completed: false, .. }
        ));
        assert!(matches!(
            &entries[2],
            TuiEntry::ReserveEntry { value, .. } if value == "auto"
        ));
    }

    #[test]
    fn test_entries_hide_fadump_when_incapable() {
        let entries = binding(false).entries();
        assert_eq!(entries.len(), 2);
        assert!(!entries
            .iter()
            .any(|e| matches!(e, TuiEntry::FadumpCheckbox { .. })));
    }

    #[test]
    fn test_entries_collapse_when_disabled() {
        let mut binding = binding(true);
        binding.toggle_enabled();
        let entries = binding.entries();
        assert_eq!(entries.len(), 1);
        assert!(matches!(
            &entries[0],
            TuiEntry::EnableCheckbox { completed: false, .. }
        ));
    }

    #[test]
    fn test_reserve_prompt_carries_bounds() {
        assert_eq!(binding(true).reserve_prompt(), "Reserve amount (160 - 3584 MB)");
    }

    #[test]
    fn test_submit_reserve_amount() {
        let mut binding = binding(true);
        assert!(binding.submit_reserve_amount("512"));
        assert!(matches!(
            binding.entries().last(),
            Some(TuiEntry::ReserveEntry { value, .. }) if value == "512"
        ));

        // Re-prompt cases leave the previous value in place.
        assert!(!binding.submit_reserve_amount("5000"));
        assert!(!binding.submit_reserve_amount("12abc"));
        assert!(matches!(
            binding.entries().last(),
            Some(TuiEntry::ReserveEntry { value, .. }) if value == "512"
        ));

        assert!(binding.submit_reserve_amount("auto"));
    }

    #[test]
    fn test_is_valid_reserve_amount() {
        let binding = binding(true);
        assert!(binding.is_valid_reserve_amount("auto"));
        assert!(binding.is_valid_reserve_amount("2048"));
        assert!(binding.is_valid_reserve_amount("2048M"));
        assert!(!binding.is_valid_reserve_amount("5000"));
        assert!(!binding.is_valid_reserve_amount("159"));
        assert!(!binding.is_valid_reserve_amount("auto "));
        assert!(!binding.is_valid_reserve_amount(""));
    }

    #[test]
    fn test_toggle_fadump_gated_by_capability() {
        let mut capable = binding(true);
        assert!(capable.toggle_fadump());

        let mut incapable = binding(false);
        assert!(!incapable.toggle_fadump());
    }

    #[test]
    fn test_should_run_follows_gate() {
        assert!(TextBinding::should_run(&AddonGate::from_cmdline("quiet")));
        assert!(!TextBinding::should_run(&AddonGate::from_cmdline(
            "kdump_addon=off"
        )));
    }

    #[test]
    fn test_refresh_apply_status() {
        let mut binding = binding(true);
        let mut data = ReservationState::default();
        binding.toggle_enabled();
        binding.apply(&mut data);
        assert!(!data.enabled);
        assert_eq!(binding.status(), "Kdump is disabled");

        data.enabled = true;
        binding.refresh(&data);
        assert_eq!(binding.status(), "Kdump is enabled");
    }
}
