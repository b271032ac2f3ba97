//! The non-interactive installer-script surface.
//!
//! The host's scripting language hands this addon the header tokens of an
//! `%addon com_redhat_kdump` block plus the block body; the body's format is
//! owned by the host and passes through verbatim. Header parsing validates
//! option format only. Range validation is the UI's job, so a script may
//! request a reservation the machine cannot honor.

use crate::reservation::{ReservationState, ReserveAmount};
use thiserror::Error;

/// Addon identifier in the installer scripting language.
pub const ADDON_NAME: &str = "com_redhat_kdump";

/// Header default for `--reserve-mb` when the flag is absent. This is the
/// directive-surface default; the runtime default is `auto`.
pub const HEADER_RESERVE_DEFAULT: u64 = 128;

const RESERVE_FLAG: &str = "--reserve-mb";

/// User-facing directive parse failure. Aborts installation of the block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown option '{option}' for addon com_redhat_kdump{}", line_suffix(.lineno))]
    UnknownOption {
        option: String,
        lineno: Option<u32>,
    },
    #[error("invalid value '{value}' for --reserve-mb{}", line_suffix(.lineno))]
    InvalidReserve {
        value: String,
        lineno: Option<u32>,
    },
}

fn line_suffix(lineno: &Option<u32>) -> String {
    match lineno {
        Some(n) => format!(" on line {n}"),
        None => String::new(),
    }
}

/// Parse/serialize capability the host's directive parser drives.
pub trait Directive {
    /// Consume the header tokens after the addon name. `lineno` is present
    /// when the source is line-numbered and carried into any error.
    fn parse_header(&mut self, lineno: Option<u32>, args: &[&str]) -> Result<(), ParseError>;

    /// Reconstruct the full directive block.
    fn serialize(&self) -> String;
}

/// A parsed `%addon com_redhat_kdump` block: the reservation settings plus
/// the opaque body the host terminates with `%end`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KdumpDirective {
    pub state: ReservationState,
    pub body: String,
}

impl KdumpDirective {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Directive for KdumpDirective {
    fn parse_header(&mut self, lineno: Option<u32>, args: &[&str]) -> Result<(), ParseError> {
        let mut enabled = true;
        let mut fadump = false;
        let mut reserve_raw: Option<String> = None;

        let mut tokens = args.iter();
        while let Some(token) = tokens.next() {
            match *token {
                "--enable" => enabled = true,
                "--disable" => enabled = false,
                "--enablefadump" => fadump = true,
                RESERVE_FLAG => {
                    let value = tokens.next().ok_or_else(|| ParseError::InvalidReserve {
                        value: String::new(),
                        lineno,
                    })?;
                    reserve_raw = Some((*value).to_string());
                }
                _ if token.starts_with("--reserve-mb=") => {
                    reserve_raw = Some(token["--reserve-mb=".len()..].to_string());
                }
                other => {
                    return Err(ParseError::UnknownOption {
                        option: other.to_string(),
                        lineno,
                    })
                }
            }
        }

        let raw = reserve_raw.unwrap_or_else(|| HEADER_RESERVE_DEFAULT.to_string());
        let raw = raw.trim_matches(|c| c == '\'' || c == '"');
        let reserve_mb: ReserveAmount = raw.parse().map_err(|_| ParseError::InvalidReserve {
            value: raw.to_string(),
            lineno,
        })?;

        self.state = ReservationState {
            enabled,
            reserve_mb,
            fadump,
        };
        Ok(())
    }

    fn serialize(&self) -> String {
        let mut header = format!("%addon {ADDON_NAME}");

        header.push_str(if self.state.enabled {
            " --enable"
        } else {
            " --disable"
        });

        header.push_str(&format!(
            " --reserve-mb='{}'",
            directive_value(self.state.reserve_mb)
        ));

        if self.state.fadump {
            header.push_str(" --enablefadump");
        }

        format!("{header}\n{}\n%end\n", self.body.trim())
    }
}

/// Serialized amount carries the `M` unit on fixed values; `auto` is bare.
fn directive_value(amount: ReserveAmount) -> String {
    match amount {
        ReserveAmount::Auto => "auto".to_string(),
        ReserveAmount::Fixed(mb) => format!("{mb}M"),
    }
}
