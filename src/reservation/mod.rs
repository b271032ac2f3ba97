//! Reservation settings and their translation into kernel boot arguments.
//!
//! [`ReservationState`] is the addon's whole persisted configuration: whether
//! kdump is on, how much memory to reserve, and whether firmware-assisted
//! dump is requested. Range checking lives in the UI layer; this module only
//! guarantees well-formed amounts and boot-argument rewrites.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Boot-argument prefix owned by this addon.
pub const CRASHKERNEL_PREFIX: &str = "crashkernel=";

/// Boot argument requesting firmware-assisted dump.
pub const FADUMP_ARG: &str = "fadump=on";

/// A reservation amount that is not `auto` and not a base-10 integer with an
/// optional trailing `M`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid reservation amount '{0}'")]
pub struct InvalidAmount(pub String);

/// Reservation size: `auto` (kernel decides) or a fixed amount in MB.
///
/// Always normalized: a trailing `M` unit is stripped on parse, so
/// `256` and `256M` are the same amount. Serialized for persistence as the
/// strings `"auto"` / `"256"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReserveAmount {
    Auto,
    Fixed(u64),
}

impl ReserveAmount {
    /// Value for the `crashkernel=` boot argument, always carrying the `M`
    /// unit on fixed amounts.
    pub fn crashkernel_value(&self) -> String {
        match self {
            ReserveAmount::Auto => "auto".to_string(),
            ReserveAmount::Fixed(mb) => format!("{mb}M"),
        }
    }
}

impl fmt::Display for ReserveAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReserveAmount::Auto => write!(f, "auto"),
            ReserveAmount::Fixed(mb) => write!(f, "{mb}"),
        }
    }
}

impl FromStr for ReserveAmount {
    type Err = InvalidAmount;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw == "auto" {
            return Ok(ReserveAmount::Auto);
        }

        // Accept one trailing 'M' for consistency with the crashkernel
        // kernel parameter.
        let digits = raw.strip_suffix('M').unwrap_or(raw);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidAmount(raw.to_string()));
        }
        digits
            .parse()
            .map(ReserveAmount::Fixed)
            .map_err(|_| InvalidAmount(raw.to_string()))
    }
}

impl From<ReserveAmount> for String {
    fn from(amount: ReserveAmount) -> String {
        amount.to_string()
    }
}

impl TryFrom<String> for ReserveAmount {
    type Error = InvalidAmount;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

/// The three persisted kdump settings.
///
/// `fadump` is meaningful only while `enabled` is true; the UI transitions
/// force it off when kdump is disabled, and the applier ignores it otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReservationState {
    pub enabled: bool,
    pub reserve_mb: ReserveAmount,
    pub fadump: bool,
}

impl Default for ReservationState {
    fn default() -> Self {
        ReservationState {
            enabled: true,
            reserve_mb: ReserveAmount::Auto,
            fadump: false,
        }
    }
}

impl ReservationState {
    /// Rewrite an ordered boot-argument list (the bootloader proxy's extra
    /// arguments) to match this state.
    ///
    /// Every existing `crashkernel=` argument is dropped; when enabled, the
    /// configured reservation is appended, and `fadump=on` with it when
    /// fadump is requested and the platform is capable. Idempotent: feeding
    /// the output back in yields the same arguments, one of each.
    pub fn apply_to_arg_list(&self, args: &[String], fadump_capable: bool) -> Vec<String> {
        let mut new_args: Vec<String> = args
            .iter()
            .filter(|arg| !arg.starts_with(CRASHKERNEL_PREFIX))
            .cloned()
            .collect();

        if self.enabled {
            new_args.push(format!("{CRASHKERNEL_PREFIX}{}", self.reserve_mb.crashkernel_value()));
            if self.fadump && fadump_capable && !new_args.iter().any(|arg| arg == FADUMP_ARG) {
                new_args.push(FADUMP_ARG.to_string());
            }
        }

        new_args
    }

    /// Same rewrite for the storage layer's boot-args set. The two stores
    /// must end up with identical membership.
    pub fn apply_to_arg_set(
        &self,
        args: &BTreeSet<String>,
        fadump_capable: bool,
    ) -> BTreeSet<String> {
        let ordered: Vec<String> = args.iter().cloned().collect();
        self.apply_to_arg_list(&ordered, fadump_capable)
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_amount_parse_auto() {
        assert_eq!("auto".parse::<ReserveAmount>().unwrap(), ReserveAmount::Auto);
        assert_eq!(ReserveAmount::Auto.to_string(), "auto");
    }

    #[test]
    fn test_amount_parse_normalizes_unit() {
        assert_eq!("256".parse::<ReserveAmount>().unwrap(), ReserveAmount::Fixed(256));
        assert_eq!("256M".parse::<ReserveAmount>().unwrap(), ReserveAmount::Fixed(256));
        assert_eq!(ReserveAmount::Fixed(256).to_string(), "256");
    }

    #[test]
    fn test_amount_parse_rejects_garbage() {
        assert!("256X".parse::<ReserveAmount>().is_err());
        assert!("-5".parse::<ReserveAmount>().is_err());
        assert!("+5".parse::<ReserveAmount>().is_err());
        assert!("".parse::<ReserveAmount>().is_err());
        assert!("M".parse::<ReserveAmount>().is_err());
        assert!("Auto".parse::<ReserveAmount>().is_err());
    }

    #[test]
    fn test_crashkernel_value() {
        assert_eq!(ReserveAmount::Auto.crashkernel_value(), "auto");
        assert_eq!(ReserveAmount::Fixed(512).crashkernel_value(), "512M");
    }

    #[test]
    fn test_state_defaults() {
        let state = ReservationState::default();
        assert!(state.enabled);
        assert_eq!(state.reserve_mb, ReserveAmount::Auto);
        assert!(!state.fadump);
    }

    #[test]
    fn test_apply_replaces_existing_crashkernel() {
        let state = ReservationState {
            reserve_mb: ReserveAmount::Fixed(256),
            ..Default::default()
        };
        let out = state.apply_to_arg_list(&args(&["quiet", "crashkernel=128M", "ro"]), false);
        assert_eq!(out, args(&["quiet", "ro", "crashkernel=256M"]));
    }

    #[test]
    fn test_apply_disabled_adds_nothing() {
        let state = ReservationState {
            enabled: false,
            fadump: true,
            ..Default::default()
        };
        let out = state.apply_to_arg_list(&args(&["quiet", "crashkernel=auto"]), true);
        assert_eq!(out, args(&["quiet"]));
    }

    #[test]
    fn test_apply_fadump_needs_enabled_and_capable() {
        let enabled = ReservationState {
            fadump: true,
            ..Default::default()
        };
        let out = enabled.apply_to_arg_list(&[], true);
        assert!(out.contains(&FADUMP_ARG.to_string()));

        let out = enabled.apply_to_arg_list(&[], false);
        assert!(!out.contains(&FADUMP_ARG.to_string()));

        let no_fadump = ReservationState::default();
        let out = no_fadump.apply_to_arg_list(&[], true);
        assert!(!out.contains(&FADUMP_ARG.to_string()));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let state = ReservationState {
            reserve_mb: ReserveAmount::Fixed(512),
            fadump: true,
            ..Default::default()
        };
        let once = state.apply_to_arg_list(&args(&["quiet"]), true);
        let twice = state.apply_to_arg_list(&once, true);
        assert_eq!(once, twice);
        assert_eq!(
            twice.iter().filter(|a| a.starts_with(CRASHKERNEL_PREFIX)).count(),
            1
        );
        assert_eq!(twice.iter().filter(|a| *a == FADUMP_ARG).count(), 1);
    }

    #[test]
    fn test_apply_set_matches_list_membership() {
        let state = ReservationState {
            reserve_mb: ReserveAmount::Fixed(256),
            fadump: true,
            ..Default::default()
        };
        let existing: BTreeSet<String> =
            args(&["quiet", "crashkernel=auto"]).into_iter().collect();
        let from_set = state.apply_to_arg_set(&existing, true);
        let from_list: BTreeSet<String> = state
            .apply_to_arg_list(&args(&["quiet", "crashkernel=auto"]), true)
            .into_iter()
            .collect();
        assert_eq!(from_set, from_list);
    }

    #[test]
    fn test_state_serde_form() {
        let state = ReservationState {
            enabled: true,
            reserve_mb: ReserveAmount::Fixed(256),
            fadump: false,
        };
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(
            json,
            r#"{"enabled":true,"reserve_mb":"256","fadump":false}"#
        );
        let back: ReservationState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_state_serde_auto_round_trip() {
        let state = ReservationState::default();
        let json = serde_json::to_string(&state).unwrap();
        let back: ReservationState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
