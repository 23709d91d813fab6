//! World script writer.
//!
//! The saved world is a plain command script: replaying it through an
//! ordinary session rebuilds every room. Long texts go in heredocs, one
//! tab-indented line per 65 columns.

use std::fmt::Write as _;
use std::io;
use std::path::Path;

use tracing::info;

use crate::store::World;

pub const BODY_WIDTH: usize = 65;

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("write world script: {0}")]
    Io(#[from] io::Error),
}

/// Greedy word wrap; words longer than `width` get a line of their own.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut cur = String::new();
    for word in text.split_whitespace() {
        if !cur.is_empty() && cur.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut cur));
        }
        if !cur.is_empty() {
            cur.push(' ');
        }
        cur.push_str(word);
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines
}

fn heredoc(out: &mut String, command: &str, text: &str) {
    let body = wrap(text, BODY_WIDTH);
    if body.is_empty() {
        return;
    }
    let _ = writeln!(out, "{command} <");
    for line in body {
        let _ = writeln!(out, "\t{line}");
    }
    out.push_str("\t.\n");
}

/// Script recreating every room, in creation order. Players and items are
/// not saved.
pub fn render(world: &World) -> String {
    let mut out = String::new();
    for id in world.all() {
        let Some(key) = world.key(id) else { continue };
        let Some(room) = world.room(id) else { continue };

        let _ = writeln!(out, "goto {key}");
        for exit in room.exits() {
            let _ = writeln!(out, "dig to:{} {} -", exit.target, exit.key);
        }
        if let Some(title) = world.title(id) {
            heredoc(&mut out, "describe title", title);
        }
        for exit in room.exits() {
            if let Some(travel) = &exit.travel {
                heredoc(&mut out, &format!("describe travel {}", exit.key), travel);
            }
            if let Some(desc) = &exit.desc {
                heredoc(&mut out, &format!("describe exit {}", exit.key), desc);
            }
        }
        out.push('\n');
    }
    out
}

/// Write the rooms to `path`, replacing it only once the new script is
/// complete. Returns the number of bytes written.
pub fn save(world: &World, path: &Path) -> Result<usize, ScriptError> {
    let script = render(world);

    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, &script)?;
    std::fs::rename(&tmp, path)?;
    info!(path = %path.display(), bytes = script.len(), "saved world");
    Ok(script.len())
}
