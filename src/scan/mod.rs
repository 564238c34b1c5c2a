//! Keyboard-wedge scan decoder
//!
//! A barcode scanner shows up as a keyboard that "types" the code very
//! fast and finishes with Enter or Tab. The decoder reconstructs discrete
//! codes from the raw key stream: characters arriving within the
//! inter-character window accumulate, a longer gap resets the buffer so
//! stray human keystrokes never leak into the next scan.

use std::time::{Duration, Instant};

/// Gap above which the accumulation buffer is considered stale.
pub const INTER_CHAR_GAP: Duration = Duration::from_millis(1000);

/// A physical key press as seen by the station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A single visible character (letters, digits, symbols, space).
    Char(char),
    Enter,
    Tab,
    /// Modifier/navigation keys; never part of a code.
    Other,
}

/// What the decoder did with a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Decoder is paused or the key is irrelevant; caller should let the
    /// key through untouched.
    Ignored,
    /// Character appended to the in-flight buffer.
    Buffered,
    /// Terminator consumed (suppress its default action). Carries the
    /// finished code, or `None` when the buffer was empty.
    Finished(Option<String>),
}

#[derive(Debug)]
pub struct ScanDecoder {
    buffer: String,
    last_key: Option<Instant>,
    paused: bool,
    gap: Duration,
}

impl Default for ScanDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanDecoder {
    pub fn new() -> Self {
        Self::with_gap(INTER_CHAR_GAP)
    }

    pub fn with_gap(gap: Duration) -> Self {
        Self {
            buffer: String::new(),
            last_key: None,
            paused: false,
            gap,
        }
    }

    /// While paused (e.g., a confirmation prompt is up) key presses are
    /// ignored entirely and do not touch the buffer.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Feed one key press with its arrival time.
    pub fn on_key(&mut self, key: Key, at: Instant) -> KeyOutcome {
        if self.paused {
            return KeyOutcome::Ignored;
        }

        // A stale buffer is dropped before this key is considered, so a
        // terminator after a long pause finishes nothing.
        if let Some(last) = self.last_key {
            if at.duration_since(last) > self.gap {
                self.buffer.clear();
            }
        }
        self.last_key = Some(at);

        match key {
            Key::Enter | Key::Tab => {
                let code = self.buffer.trim().to_string();
                self.buffer.clear();
                if code.is_empty() {
                    KeyOutcome::Finished(None)
                } else {
                    KeyOutcome::Finished(Some(code))
                }
            }
            Key::Char(c) => {
                self.buffer.push(c);
                KeyOutcome::Buffered
            }
            Key::Other => KeyOutcome::Ignored,
        }
    }
}
