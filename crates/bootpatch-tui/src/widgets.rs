//! Small, reusable UI helpers used by multiple panes.

/// Checkbox state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckboxState {
    Unchecked,
    Checked,
}

impl CheckboxState {
    pub fn symbol(&self) -> &'static str {
        match self {
            CheckboxState::Unchecked => "[ ]",
            CheckboxState::Checked => "[x]",
        }
    }
}

impl From<bool> for CheckboxState {
    fn from(b: bool) -> Self {
        if b {
            CheckboxState::Checked
        } else {
            CheckboxState::Unchecked
        }
    }
}

/// Last `n` lines, for panes that show the end of a log.
pub fn tail(lines: &[String], n: usize) -> &[String] {
    &lines[lines.len().saturating_sub(n)..]
}
