use std::net::SocketAddr;
use std::rc::Rc;

use burrowio::{LineBuffer, Token};
use mudtext::FmtBuf;
use mudworld::EntityId;
use tokio::net::TcpStream;

/// Longest heredoc body kept; further lines are refused.
pub const HEREDOC_MAX: usize = 64 * 1024;

#[derive(Debug)]
pub struct Conn {
    pub stream: Rc<TcpStream>,
    pub peer: SocketAddr,
    pub read: Token,
    pub write: Token,
}

#[derive(Debug, Default)]
struct Heredoc {
    command: String,
    body: String,
}

/// What a framed input line turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staged {
    /// Run this command now.
    Command(String),
    /// The line went into (or opened) a heredoc.
    Pending,
    /// The heredoc body is full; the line was dropped.
    Refused,
}

#[derive(Debug)]
pub struct Session {
    pub player: EntityId,
    /// Player key, for logs.
    pub label: String,
    /// `None` for the loader session that replays the world script.
    pub conn: Option<Conn>,
    pub input: LineBuffer,
    pub out: FmtBuf,
    /// Commands refused since the owner last looked.
    pub refused: u32,
    heredoc: Option<Heredoc>,
}

impl Session {
    pub fn detached(player: EntityId, label: String) -> Self {
        Self {
            player,
            label,
            conn: None,
            input: LineBuffer::new(),
            out: FmtBuf::new(),
            refused: 0,
            heredoc: None,
        }
    }

    pub fn connected(player: EntityId, label: String, conn: Conn) -> Self {
        Self {
            conn: Some(conn),
            ..Self::detached(player, label)
        }
    }

    pub fn in_heredoc(&self) -> bool {
        self.heredoc.is_some()
    }

    /// Route one input line through heredoc staging.
    ///
    /// A line ending in ` <` opens a heredoc; the text before `<` (trailing
    /// space included) becomes the command. Following lines are joined with
    /// single spaces until a lone `.` runs command and body together.
    pub fn stage(&mut self, line: &str) -> Staged {
        let line = line.trim_start();

        if let Some(doc) = &mut self.heredoc {
            if line == "." {
                let doc = std::mem::take(doc);
                self.heredoc = None;
                return Staged::Command(doc.command + &doc.body);
            }
            let extra = line.len() + usize::from(!doc.body.is_empty());
            if doc.body.len() + extra > HEREDOC_MAX {
                return Staged::Refused;
            }
            if !doc.body.is_empty() {
                doc.body.push(' ');
            }
            doc.body.push_str(line);
            return Staged::Pending;
        }

        if let Some(command) = line.strip_suffix('<').filter(|c| c.ends_with(' ')) {
            self.heredoc = Some(Heredoc {
                command: command.to_string(),
                body: String::new(),
            });
            return Staged::Pending;
        }

        Staged::Command(line.to_string())
    }
}
