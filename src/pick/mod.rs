//! Per-order pick checklist
//!
//! Tracks picked-versus-ordered quantities for the currently claimed
//! order and resolves scanned codes to lines. Completion is edge
//! triggered: the first increment that fills the whole order reports it,
//! repeats do not, and a decrement re-arms the edge.

/// One product line within a claimed order.
#[derive(Debug, Clone, PartialEq)]
pub struct PickLine {
    pub title: String,
    /// SKU; matched case-insensitively against scans.
    pub reference: String,
    /// EAN; matched exactly against scans. Empty means no barcode.
    pub barcode: String,
    pub location: String,
    pub weight: f64,
    pub ordered: u32,
    pub picked: u32,
}

impl PickLine {
    pub fn is_full(&self) -> bool {
        self.picked >= self.ordered
    }
}

/// Result of applying one increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickEvent {
    /// Unit recorded on the line.
    Applied,
    /// Unit recorded and it was the last one of the whole order; fires
    /// exactly once per completion edge.
    AppliedOrderComplete,
    /// Line already full (or index out of range); nothing changed.
    Ignored,
}

/// Result of resolving a scanned code against the checklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A pending line matched and got one unit.
    Picked { line: usize, order_complete: bool },
    /// The code matched only lines that are already fully picked; no
    /// increment, feedback only.
    AlreadyComplete { line: usize },
    /// No line carries that SKU or barcode.
    NotFound,
}

#[derive(Debug, Default)]
pub struct PickState {
    lines: Vec<PickLine>,
    completion_fired: bool,
}

impl PickState {
    pub fn new(lines: Vec<PickLine>) -> Self {
        Self {
            lines,
            completion_fired: false,
        }
    }

    pub fn lines(&self) -> &[PickLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of ordered units across all lines. Derived on read.
    pub fn total_ordered(&self) -> u32 {
        self.lines.iter().map(|l| l.ordered).sum()
    }

    /// Number of fully picked lines. Derived on read.
    pub fn packed_lines(&self) -> usize {
        self.lines.iter().filter(|l| l.is_full()).count()
    }

    /// True iff there is at least one line and every line is full.
    pub fn is_complete(&self) -> bool {
        !self.lines.is_empty() && self.lines.iter().all(|l| l.is_full())
    }

    /// Record one unit on a line; full lines and bad indexes are no-ops.
    pub fn increment(&mut self, idx: usize) -> PickEvent {
        let Some(line) = self.lines.get_mut(idx) else {
            return PickEvent::Ignored;
        };
        if line.is_full() {
            return PickEvent::Ignored;
        }
        line.picked += 1;

        if self.is_complete() && !self.completion_fired {
            self.completion_fired = true;
            PickEvent::AppliedOrderComplete
        } else {
            PickEvent::Applied
        }
    }

    /// Remove one unit from a line; empty lines and bad indexes are
    /// no-ops. Leaving the complete state re-arms the completion edge.
    pub fn decrement(&mut self, idx: usize) {
        let Some(line) = self.lines.get_mut(idx) else {
            return;
        };
        if line.picked == 0 {
            return;
        }
        line.picked -= 1;
        if !self.is_complete() {
            self.completion_fired = false;
        }
    }

    /// Resolve a scanned code and apply the increment when possible.
    ///
    /// Matching is exact: case-insensitive on the SKU, case-sensitive on
    /// the barcode. With duplicate codes across lines the first line that
    /// still has pending units wins, so scanning never keeps hitting an
    /// already-full line while a pending duplicate waits.
    pub fn apply_scan(&mut self, code: &str) -> ScanOutcome {
        match self.find_line(code) {
            Some((idx, true)) => {
                let complete = matches!(self.increment(idx), PickEvent::AppliedOrderComplete);
                ScanOutcome::Picked {
                    line: idx,
                    order_complete: complete,
                }
            }
            Some((idx, false)) => ScanOutcome::AlreadyComplete { line: idx },
            None => ScanOutcome::NotFound,
        }
    }

    /// First matching line with pending units, else the first full match
    /// for feedback. The bool is "has pending units".
    fn find_line(&self, code: &str) -> Option<(usize, bool)> {
        let code_upper = code.to_uppercase();
        let mut first_full_match = None;

        for (idx, line) in self.lines.iter().enumerate() {
            let matches = (!line.reference.is_empty() && line.reference.to_uppercase() == code_upper)
                || (!line.barcode.is_empty() && line.barcode == code);
            if !matches {
                continue;
            }
            if !line.is_full() {
                return Some((idx, true));
            }
            if first_full_match.is_none() {
                first_full_match = Some(idx);
            }
        }

        first_full_match.map(|idx| (idx, false))
    }
}
