use std::{collections::VecDeque, sync::Mutex};

use crate::DIAGNOSTIC_BUFFER_CAPACITY;

/// Most recent backend output lines, kept so the log window can be
/// repopulated whenever its page (re)loads.
#[derive(Debug)]
pub(crate) struct DiagnosticBuffer {
    lines: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl Default for DiagnosticBuffer {
    fn default() -> Self {
        Self::with_capacity(DIAGNOSTIC_BUFFER_CAPACITY)
    }
}

impl DiagnosticBuffer {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    /// Stores `line` with a wall-clock prefix and returns the stored text.
    pub(crate) fn push(&self, line: &str) -> String {
        let stamped = format!("[{}] {line}", chrono::Local::now().format("%H:%M:%S"));
        let mut lines = match self.lines.lock() {
            Ok(lines) => lines,
            Err(poisoned) => poisoned.into_inner(),
        };
        while lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(stamped.clone());
        stamped
    }

    pub(crate) fn snapshot(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }
}
