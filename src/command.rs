//! Line-oriented command language for the interactive editor.
//!
//! | Input | Effect |
//! |---|---|
//! | `o<n>` | set overlap (may be negative: `o-3`) |
//! | `f<n>` | set frame duration in ms |
//! | `c <side><n>` | set one crop edge, side is `l`, `t`, `r` or `b` (`c l12`) |
//! | `e` | export and move to the next file |
//! | `s` | skip to the next file |
//! | `s<n>` | skip ahead `n` files (`s3`) |
//! | `x` | reset every parameter to the defaults |
//! | `p` | print the current status |
//! | `exit`, `q` | quit |
//!
//! Commands are case-insensitive. Values are range-checked against
//! [`Limits`] here, before the session sees them; the session itself only
//! rejects crops that leave no pixels.

use crate::config::LimitsConfig;
use crate::imaging::ParamUpdate;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,
    #[error("Unknown command '{0}'")]
    Unknown(String),
    #[error("Invalid {what}. Use format: {usage}")]
    Syntax {
        what: &'static str,
        usage: &'static str,
    },
    #[error("{what} {value} is outside {min}..={max}")]
    OutOfRange {
        what: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

/// One crop edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Top,
    Right,
    Bottom,
}

impl Side {
    fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'l' => Some(Side::Left),
            't' => Some(Side::Top),
            'r' => Some(Side::Right),
            'b' => Some(Side::Bottom),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Side::Left => "left",
            Side::Top => "top",
            Side::Right => "right",
            Side::Bottom => "bottom",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Overlap(i32),
    FrameDuration(u32),
    Crop(Side, u32),
    /// Back to the parameters every file starts with.
    Reset,
    Export,
    Skip,
    /// Leave this file and move `n` files further on.
    SkipAhead(u32),
    Status,
    Quit,
}

impl ControlCommand {
    /// Parameter edit this command makes, if any.
    pub fn param_update(&self) -> Option<ParamUpdate> {
        let update = match *self {
            ControlCommand::Overlap(v) => ParamUpdate::overlap(v),
            ControlCommand::FrameDuration(ms) => ParamUpdate::frame_duration(ms),
            ControlCommand::Crop(side, v) => {
                let mut update = ParamUpdate::default();
                match side {
                    Side::Left => update.crop_left = Some(v),
                    Side::Top => update.crop_top = Some(v),
                    Side::Right => update.crop_right = Some(v),
                    Side::Bottom => update.crop_bottom = Some(v),
                }
                update
            }
            _ => return None,
        };
        Some(update)
    }
}

/// Caller-side parameter ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub overlap: u32,
    pub crop: u32,
    pub duration_min_ms: u32,
    pub duration_max_ms: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self::from(&LimitsConfig::default())
    }
}

impl From<&LimitsConfig> for Limits {
    fn from(config: &LimitsConfig) -> Self {
        Self {
            overlap: config.overlap,
            crop: config.crop,
            duration_min_ms: config.duration_min_ms,
            duration_max_ms: config.duration_max_ms,
        }
    }
}

impl Limits {
    /// Reject parameter values outside the configured ranges.
    pub fn check(&self, command: &ControlCommand) -> Result<(), CommandError> {
        let in_range = |what, value: i64, min: i64, max: i64| {
            if (min..=max).contains(&value) {
                Ok(())
            } else {
                Err(CommandError::OutOfRange {
                    what,
                    value,
                    min,
                    max,
                })
            }
        };
        let overlap = i64::from(self.overlap);
        match *command {
            ControlCommand::Overlap(v) => in_range("overlap", v.into(), -overlap, overlap),
            ControlCommand::FrameDuration(ms) => in_range(
                "frame duration",
                ms.into(),
                self.duration_min_ms.into(),
                self.duration_max_ms.into(),
            ),
            ControlCommand::Crop(_, v) => in_range("crop", v.into(), 0, self.crop.into()),
            _ => Ok(()),
        }
    }
}

/// Parse one line of input.
pub fn parse_command(line: &str) -> Result<ControlCommand, CommandError> {
    let line = line.trim();
    let lower = line.to_ascii_lowercase();

    match lower.as_str() {
        "" => return Err(CommandError::Empty),
        "e" => return Ok(ControlCommand::Export),
        "s" => return Ok(ControlCommand::Skip),
        "x" => return Ok(ControlCommand::Reset),
        "p" => return Ok(ControlCommand::Status),
        "q" | "exit" => return Ok(ControlCommand::Quit),
        _ => {}
    }

    if let Some(rest) = lower.strip_prefix('o') {
        return rest
            .trim()
            .parse()
            .map(ControlCommand::Overlap)
            .map_err(|_| CommandError::Syntax {
                what: "overlap",
                usage: "o<number>",
            });
    }
    if let Some(rest) = lower.strip_prefix('f') {
        return rest
            .trim()
            .parse()
            .map(ControlCommand::FrameDuration)
            .map_err(|_| CommandError::Syntax {
                what: "frame duration",
                usage: "f<number>",
            });
    }
    if let Some(rest) = lower.strip_prefix('s') {
        return rest
            .trim()
            .parse()
            .ok()
            .filter(|&n| n > 0)
            .map(ControlCommand::SkipAhead)
            .ok_or(CommandError::Syntax {
                what: "skip count",
                usage: "s<number of files>",
            });
    }
    if let Some(rest) = lower.strip_prefix('c') {
        return parse_crop(rest).ok_or(CommandError::Syntax {
            what: "crop",
            usage: "c l<number>, c t<number>, c r<number>, c b<number>",
        });
    }

    Err(CommandError::Unknown(line.to_string()))
}

fn parse_crop(rest: &str) -> Option<ControlCommand> {
    let arg = rest.trim();
    let mut chars = arg.chars();
    let side = Side::from_char(chars.next()?)?;
    let value = chars.as_str().trim().parse().ok()?;
    Some(ControlCommand::Crop(side, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_letter_commands() {
        assert_eq!(parse_command("e"), Ok(ControlCommand::Export));
        assert_eq!(parse_command(" S "), Ok(ControlCommand::Skip));
        assert_eq!(parse_command("p"), Ok(ControlCommand::Status));
        assert_eq!(parse_command("q"), Ok(ControlCommand::Quit));
        assert_eq!(parse_command("EXIT"), Ok(ControlCommand::Quit));
    }

    #[test]
    fn parses_reset_and_skip_ahead() {
        assert_eq!(parse_command("x"), Ok(ControlCommand::Reset));
        assert_eq!(parse_command("s3"), Ok(ControlCommand::SkipAhead(3)));
        assert_eq!(parse_command("S 12"), Ok(ControlCommand::SkipAhead(12)));
        for input in ["s0", "s-1", "skip"] {
            assert!(
                matches!(parse_command(input), Err(CommandError::Syntax { what: "skip count", .. })),
                "{input}"
            );
        }
        assert_eq!(ControlCommand::Reset.param_update(), None);
    }

    #[test]
    fn parses_overlap() {
        assert_eq!(parse_command("o12"), Ok(ControlCommand::Overlap(12)));
        assert_eq!(parse_command("o-7"), Ok(ControlCommand::Overlap(-7)));
        assert_eq!(parse_command("O 3"), Ok(ControlCommand::Overlap(3)));
    }

    #[test]
    fn parses_frame_duration() {
        assert_eq!(parse_command("f200"), Ok(ControlCommand::FrameDuration(200)));
        assert!(matches!(
            parse_command("f-5"),
            Err(CommandError::Syntax { what: "frame duration", .. })
        ));
    }

    #[test]
    fn parses_crop_sides() {
        assert_eq!(parse_command("c l12"), Ok(ControlCommand::Crop(Side::Left, 12)));
        assert_eq!(parse_command("c t0"), Ok(ControlCommand::Crop(Side::Top, 0)));
        assert_eq!(parse_command("C R 5"), Ok(ControlCommand::Crop(Side::Right, 5)));
        assert_eq!(parse_command("cb40"), Ok(ControlCommand::Crop(Side::Bottom, 40)));
    }

    #[test]
    fn bad_crop_is_syntax_error() {
        for input in ["c", "c x10", "c l", "c l-3", "c lten"] {
            assert!(
                matches!(parse_command(input), Err(CommandError::Syntax { what: "crop", .. })),
                "{input}"
            );
        }
    }

    #[test]
    fn bad_overlap_is_syntax_error() {
        assert!(matches!(
            parse_command("o"),
            Err(CommandError::Syntax { what: "overlap", .. })
        ));
        assert!(matches!(
            parse_command("oops"),
            Err(CommandError::Syntax { what: "overlap", .. })
        ));
    }

    #[test]
    fn unknown_and_empty() {
        assert_eq!(parse_command("   "), Err(CommandError::Empty));
        assert_eq!(
            parse_command("zoom 2"),
            Err(CommandError::Unknown("zoom 2".into()))
        );
    }

    #[test]
    fn param_update_for_edits_only() {
        assert_eq!(
            ControlCommand::Overlap(4).param_update(),
            Some(ParamUpdate::overlap(4))
        );
        let crop = ControlCommand::Crop(Side::Bottom, 9).param_update().unwrap();
        assert_eq!(crop.crop_bottom, Some(9));
        assert_eq!(crop.crop_left, None);
        assert_eq!(ControlCommand::Export.param_update(), None);
    }

    #[test]
    fn default_limits() {
        let limits = Limits::default();
        assert!(limits.check(&ControlCommand::Overlap(-100)).is_ok());
        assert!(limits.check(&ControlCommand::Overlap(100)).is_ok());
        assert!(limits.check(&ControlCommand::Crop(Side::Top, 200)).is_ok());
        assert!(limits.check(&ControlCommand::FrameDuration(50)).is_ok());
        assert!(limits.check(&ControlCommand::FrameDuration(1000)).is_ok());
        assert!(limits.check(&ControlCommand::Skip).is_ok());
    }

    #[test]
    fn limits_reject_out_of_range() {
        let limits = Limits::default();
        assert_eq!(
            limits.check(&ControlCommand::Overlap(-101)),
            Err(CommandError::OutOfRange {
                what: "overlap",
                value: -101,
                min: -100,
                max: 100
            })
        );
        assert!(limits.check(&ControlCommand::Crop(Side::Left, 201)).is_err());
        assert!(limits.check(&ControlCommand::FrameDuration(49)).is_err());
        assert!(limits.check(&ControlCommand::FrameDuration(1001)).is_err());
    }

    #[test]
    fn limits_follow_config() {
        let limits = Limits::from(&LimitsConfig {
            overlap: 5,
            ..LimitsConfig::default()
        });
        assert!(limits.check(&ControlCommand::Overlap(6)).is_err());
    }
}
