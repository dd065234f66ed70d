use crate::domain::call::{CompletedCall, describe_call};
use crate::domain::ports::CallWriter;
use std::sync::Arc;

/// Numbered plain-text call listing
/// Runs of identical consecutive calls collapse into one line when enabled.
pub struct TextCallWriter {
    max_displayed_calls: usize,
    collapse_repeated_calls: bool,
}

impl Default for TextCallWriter {
    fn default() -> Self {
        Self::new(19, true)
    }
}

impl TextCallWriter {
    pub fn new(max_displayed_calls: usize, collapse_repeated_calls: bool) -> Self {
        Self {
            max_displayed_calls,
            collapse_repeated_calls,
        }
    }

    fn group(&self, calls: &[Arc<CompletedCall>]) -> Vec<(usize, String, usize)> {
        let mut groups: Vec<(usize, String, usize)> = Vec::new();
        for (i, call) in calls.iter().enumerate() {
            let description = describe_call(call.as_ref());
            match groups.last_mut() {
                Some((_, last, count)) if self.collapse_repeated_calls && *last == description => {
                    *count += 1;
                }
                _ => groups.push((i + 1, description, 1)),
            }
        }
        groups
    }
}

impl CallWriter for TextCallWriter {
    fn write_calls(&self, calls: &[Arc<CompletedCall>], out: &mut String) {
        let groups = self.group(calls);
        let mut written = 0;
        for (number, description, count) in groups.iter().take(self.max_displayed_calls) {
            out.push_str(&format!("  {}: {}", number, description));
            if *count > 1 {
                out.push_str(&format!(" repeated {} times", count));
            }
            out.push('\n');
            written += count;
        }
        if written < calls.len() {
            out.push_str(&format!(
                "  ... Found {} more calls not displayed.\n",
                calls.len() - written
            ));
        }
    }
}
