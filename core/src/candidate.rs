//! Candidate list with a selection cursor.
//!
//! Candidates are plain strings proposed for the current phonetic input.
//! The list is bounded and deduplicated by the resolver that fills it; this
//! type only tracks which entry is highlighted.

/// Direction for moving the selection cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards the first candidate.
    Previous,
    /// Towards the last candidate.
    Next,
}

/// Ordered candidates plus the index of the highlighted one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateList {
    candidates: Vec<String>,
    selected: usize,
}

impl CandidateList {
    /// Create an empty candidate list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a candidate list from already-ranked strings.
    pub fn from_candidates(candidates: Vec<String>) -> Self {
        Self {
            candidates,
            selected: 0,
        }
    }

    /// Replace the candidates, resetting the selection to the first entry.
    pub fn set_candidates(&mut self, candidates: Vec<String>) {
        self.candidates = candidates;
        self.selected = 0;
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn first(&self) -> Option<&str> {
        self.candidates.first().map(String::as_str)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.candidates.get(index).map(String::as_str)
    }

    /// Index of the highlighted candidate. Stays 0 on an empty list.
    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// The highlighted candidate, if any.
    pub fn selected(&self) -> Option<&str> {
        self.get(self.selected)
    }

    /// Highlight and return the candidate at `index`.
    ///
    /// Out-of-range indices return `None` and leave the selection unchanged.
    pub fn select(&mut self, index: usize) -> Option<&str> {
        if index >= self.candidates.len() {
            return None;
        }
        self.selected = index;
        self.get(index)
    }

    /// Move the highlight one step, clamped to the list bounds.
    /// Returns true if the highlight moved.
    pub fn move_selection(&mut self, direction: Direction) -> bool {
        match direction {
            Direction::Previous if self.selected > 0 => {
                self.selected -= 1;
                true
            }
            Direction::Next if self.selected + 1 < self.candidates.len() => {
                self.selected += 1;
                true
            }
            _ => false,
        }
    }

    /// Drop all candidates.
    pub fn clear(&mut self) {
        self.candidates.clear();
        self.selected = 0;
    }
}
