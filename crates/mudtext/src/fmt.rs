//! Incremental prose formatter.
//!
//! Sentences are fed in pieces (`push`) and come out word-wrapped at
//! [`WRAP_WIDTH`] columns, indented, with the first word of every sentence
//! capitalized and selected words highlighted. Output accumulates in a
//! bounded buffer that the owner drains when the socket is writable.

use tracing::debug;

pub const WRAP_WIDTH: usize = 65;
pub const INDENT: &str = "     ";
/// Longest word kept in one piece (one slot is reserved, as for a C string).
pub const WORD_MAX: usize = 64;
pub const OUTPUT_CAPACITY: usize = 8192;

pub const BOLD: &str = "\x1b[1;31m";
pub const RESET: &str = "\x1b[0m";
pub const CLEAR_SCREEN: &str = "\x1b[1;1H\x1b[2J";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("output buffer full, dropped {dropped} bytes")]
pub struct Overflow {
    pub dropped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    BeforeWord,
    InWord,
    AfterWord,
}

fn is_sentence_end(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn is_punct(c: char) -> bool {
    matches!(c, ',' | ';' | ':')
}

fn is_quote(c: char) -> bool {
    matches!(c, '"' | '\'')
}

fn is_word_end(c: char) -> bool {
    is_sentence_end(c) || is_punct(c) || c.is_whitespace()
}

#[derive(Debug)]
pub struct FmtBuf {
    out: Vec<u8>,
    cap: usize,
    word: String,
    word_len: usize,
    column: usize,
    rewind: usize,
    state: State,
    upper: bool,
    highlight: Vec<String>,
    dropped: usize,
    split_words: u64,
}

impl FmtBuf {
    pub fn new() -> Self {
        Self::with_capacity(OUTPUT_CAPACITY)
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            out: Vec::with_capacity(cap.min(OUTPUT_CAPACITY)),
            cap,
            word: String::with_capacity(WORD_MAX),
            word_len: 0,
            column: 0,
            rewind: 0,
            state: State::BeforeWord,
            upper: false,
            highlight: Vec::new(),
            dropped: 0,
            split_words: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.out
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.out).into_owned()
    }

    pub fn len(&self) -> usize {
        self.out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    /// Current visual column on the line being built (indent excluded).
    pub fn column(&self) -> usize {
        self.column
    }

    /// Buffer offset just past the last completed word and its terminator,
    /// before any padding.
    pub fn rewind_mark(&self) -> usize {
        self.rewind
    }

    /// Words that had to be split because they outgrew [`WORD_MAX`].
    pub fn split_words(&self) -> u64 {
        self.split_words
    }

    /// Words to wrap in [`BOLD`]/[`RESET`] from now on. Matching is exact.
    pub fn set_highlight<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.highlight = words.into_iter().map(Into::into).collect();
    }

    pub fn clear_highlight(&mut self) {
        self.highlight.clear();
    }

    /// Feed prose. A trailing partial word stays pending until a terminator
    /// or `end()` arrives.
    pub fn push(&mut self, src: &str) -> Result<(), Overflow> {
        self.dropped = 0;
        if self.column == 0 {
            self.emit(INDENT, false);
        }

        let chars: Vec<char> = src.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            match self.state {
                State::BeforeWord => {
                    if is_quote(c) {
                        self.emit_char(c);
                        i += 1;
                    } else if c.is_whitespace() {
                        i += 1;
                    } else {
                        self.state = State::InWord;
                        self.word.clear();
                        self.word_len = 0;
                    }
                }
                State::InWord => {
                    if !is_word_end(c) {
                        if self.word_len + 1 < WORD_MAX {
                            self.word.push(c);
                            self.word_len += 1;
                            i += 1;
                        } else {
                            // Break the word here; `c` starts the next one.
                            self.split_words += 1;
                            debug!(word = %self.word, "split overlong word");
                            self.finish_word(Some(' '), None);
                        }
                        continue;
                    }
                    let took_quote = self.finish_word(Some(c), chars.get(i + 1).copied());
                    i += if took_quote { 2 } else { 1 };
                }
                State::AfterWord => {
                    if is_sentence_end(c) || is_punct(c) {
                        i += 1;
                    } else {
                        self.state = State::BeforeWord;
                    }
                }
            }
        }

        self.take_dropped()
    }

    /// Append bytes verbatim: no wrapping, no column accounting.
    pub fn push_raw(&mut self, s: &str) -> Result<(), Overflow> {
        self.dropped = 0;
        if self.out.len() + s.len() > self.cap {
            self.dropped = s.len();
        } else {
            self.out.extend_from_slice(s.as_bytes());
        }
        self.take_dropped()
    }

    /// Close the paragraph: flush a pending word, add a blank line and reset
    /// the per-paragraph state. Emitted text is kept.
    pub fn end(&mut self) -> Result<(), Overflow> {
        self.dropped = 0;
        if self.state == State::InWord && self.word_len > 0 {
            self.finish_word(None, None);
        }
        self.emit("\n\n", false);
        self.state = State::BeforeWord;
        self.upper = false;
        self.column = 0;
        self.rewind = 0;
        self.word.clear();
        self.word_len = 0;
        self.take_dropped()
    }

    /// Remove the first `n` bytes, e.g. after a partial socket write.
    pub fn drain(&mut self, n: usize) {
        let n = n.min(self.out.len());
        self.out.drain(..n);
        self.rewind = self.rewind.saturating_sub(n);
    }

    /// Drop all output and start from a fresh paragraph.
    pub fn reset(&mut self) {
        self.out.clear();
        self.word.clear();
        self.word_len = 0;
        self.column = 0;
        self.rewind = 0;
        self.state = State::BeforeWord;
        self.upper = false;
    }

    /// Emit the pending word, then `term` and its padding. Returns true when
    /// the closing quote in `next` was consumed as well.
    fn finish_word(&mut self, term: Option<char>, next: Option<char>) -> bool {
        if self.column + self.word_len >= WRAP_WIDTH {
            self.emit("\n", true);
            self.emit(INDENT, false);
        }

        if self.upper && !self.word.is_empty() {
            if let Some(first) = self.word.chars().next() {
                let up: String = first.to_uppercase().collect();
                self.word.replace_range(..first.len_utf8(), &up);
            }
            self.upper = false;
        }

        let word = std::mem::take(&mut self.word);
        let lit = !word.is_empty() && self.highlight.iter().any(|w| *w == word);
        if lit {
            self.emit(BOLD, false);
        }
        self.emit(&word, true);
        if lit {
            self.emit(RESET, false);
        }
        self.word = word;
        self.word.clear();
        self.word_len = 0;
        self.state = State::AfterWord;

        let Some(term) = term else {
            self.rewind = self.out.len();
            return false;
        };

        self.emit_char(term);
        self.rewind = if self.out.last() == Some(&b' ') {
            self.out.len() - 1
        } else {
            self.out.len()
        };

        let end = is_sentence_end(term);
        if end {
            self.upper = true;
        }
        match next {
            Some(q) if is_quote(q) => {
                if end {
                    self.emit_char(q);
                    self.emit("  ", true);
                    return true;
                }
            }
            _ if end => self.emit("  ", true),
            _ if !term.is_whitespace() => self.emit(" ", true),
            _ => {}
        }
        false
    }

    fn emit_char(&mut self, c: char) {
        let mut tmp = [0u8; 4];
        self.emit(c.encode_utf8(&mut tmp), true);
    }

    fn emit(&mut self, s: &str, counted: bool) {
        if self.out.len() + s.len() > self.cap {
            self.dropped += s.len();
            return;
        }
        for c in s.chars() {
            if c == '\n' {
                self.column = 0;
            } else if counted {
                self.column += 1;
            }
        }
        self.out.extend_from_slice(s.as_bytes());
    }

    fn take_dropped(&mut self) -> Result<(), Overflow> {
        match std::mem::take(&mut self.dropped) {
            0 => Ok(()),
            dropped => Err(Overflow { dropped }),
        }
    }
}

impl Default for FmtBuf {
    fn default() -> Self {
        Self::new()
    }
}
