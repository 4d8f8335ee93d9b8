//! Replay script parsing.
//!
//! One command per line; blank lines and `#` comments are skipped.
//!
//! ```text
//! attach <name>                     detach <name>
//! notify <name> <KIND> [payload]    broadcast <KIND> [payload]
//! paint <name> <part> <mode> <x> <y> <w> <h>
//! invalidate <name> <part> <mode> [<x> <y> <w> <h>]
//! disable|enable|latch|unlatch <name>
//! flush
//! ```

use thiserror::Error;
use tilesync_core::{NotificationKind, ParseError, Part, TileRect};

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: ParseError,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Config(#[from] serde_json::Error),
    #[error("{0}")]
    Usage(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Attach(String),
    Detach(String),
    Notify {
        viewer: String,
        kind: NotificationKind,
        payload: String,
    },
    Broadcast {
        kind: NotificationKind,
        payload: String,
    },
    Paint {
        viewer: String,
        part: i32,
        mode: i32,
        rect: TileRect,
    },
    Invalidate {
        viewer: String,
        part: Part,
        mode: i32,
        rect: Option<TileRect>,
    },
    Disable(String),
    Enable(String),
    Latch(String),
    Unlatch(String),
    Flush,
}

/// A parsed command and the 1-based line it came from.
pub type Line = (usize, Command);

pub fn parse_script(text: &str) -> Result<Vec<Line>, ScriptError> {
    let mut commands = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        commands.push((line, parse_line(line, trimmed)?));
    }
    Ok(commands)
}

fn parse_line(line: usize, text: &str) -> Result<Command, ScriptError> {
    let (verb, rest) = split_word(text);
    let syntax = |message: &str| ScriptError::Syntax {
        line,
        message: message.to_string(),
    };

    let command = match verb {
        "attach" => Command::Attach(single_name(line, rest)?),
        "detach" => Command::Detach(single_name(line, rest)?),
        "disable" => Command::Disable(single_name(line, rest)?),
        "enable" => Command::Enable(single_name(line, rest)?),
        "latch" => Command::Latch(single_name(line, rest)?),
        "unlatch" => Command::Unlatch(single_name(line, rest)?),
        "flush" => Command::Flush,
        "notify" => {
            let (viewer, rest) = split_word(rest);
            if viewer.is_empty() {
                return Err(syntax("notify needs a viewer"));
            }
            let (kind, payload) = split_word(rest);
            Command::Notify {
                viewer: viewer.to_string(),
                kind: parse_kind(line, kind)?,
                payload: payload.to_string(),
            }
        }
        "broadcast" => {
            let (kind, payload) = split_word(rest);
            Command::Broadcast {
                kind: parse_kind(line, kind)?,
                payload: payload.to_string(),
            }
        }
        "paint" => {
            let (viewer, numbers) = viewer_and_numbers(line, rest)?;
            match numbers.as_slice() {
                [part, mode, x, y, w, h] => Command::Paint {
                    viewer,
                    part: to_i32(line, *part)?,
                    mode: to_i32(line, *mode)?,
                    rect: TileRect::new(*x, *y, *w, *h),
                },
                _ => return Err(syntax("paint needs <part> <mode> <x> <y> <w> <h>")),
            }
        }
        "invalidate" => {
            let (viewer, numbers) = viewer_and_numbers(line, rest)?;
            let (part, mode, rect) = match numbers.as_slice() {
                [part, mode] => (*part, *mode, None),
                [part, mode, x, y, w, h] => (*part, *mode, Some(TileRect::new(*x, *y, *w, *h))),
                _ => return Err(syntax("invalidate needs <part> <mode> [<x> <y> <w> <h>]")),
            };
            Command::Invalidate {
                viewer,
                part: Part::from_wire(to_i32(line, part)?),
                mode: to_i32(line, mode)?,
                rect,
            }
        }
        other => return Err(syntax(&format!("unknown command {other:?}"))),
    };
    Ok(command)
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (text, ""),
    }
}

fn single_name(line: usize, rest: &str) -> Result<String, ScriptError> {
    let (name, extra) = split_word(rest);
    if name.is_empty() || !extra.is_empty() {
        return Err(ScriptError::Syntax {
            line,
            message: "expected exactly one viewer name".to_string(),
        });
    }
    Ok(name.to_string())
}

fn parse_kind(line: usize, text: &str) -> Result<NotificationKind, ScriptError> {
    text.parse().map_err(|source| ScriptError::Parse { line, source })
}

fn viewer_and_numbers(line: usize, rest: &str) -> Result<(String, Vec<i64>), ScriptError> {
    let (viewer, rest) = split_word(rest);
    if viewer.is_empty() {
        return Err(ScriptError::Syntax {
            line,
            message: "missing viewer name".to_string(),
        });
    }
    let numbers = rest
        .split_whitespace()
        .map(|word| {
            word.parse::<i64>().map_err(|_| ScriptError::Syntax {
                line,
                message: format!("not a number: {word:?}"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((viewer.to_string(), numbers))
}

fn to_i32(line: usize, value: i64) -> Result<i32, ScriptError> {
    i32::try_from(value).map_err(|_| ScriptError::Syntax {
        line,
        message: format!("out of range: {value}"),
    })
}
