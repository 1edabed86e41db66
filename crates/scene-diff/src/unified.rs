//! Unified diff text

use crate::lines::{grouped_opcodes, opcodes, Tag};
use std::fmt::Write;

/// Render a unified diff of two line sequences
///
/// Produces `---`/`+++` file headers followed by `@@ -a,b +c,d @@` hunks.
/// Returns an empty string when the sequences are identical.
#[must_use]
pub fn unified_diff<S: AsRef<str> + PartialEq>(
    old: &[S],
    new: &[S],
    old_label: &str,
    new_label: &str,
    context: usize,
) -> String {
    let groups = grouped_opcodes(&opcodes(old, new), context);
    if groups.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    let _ = writeln!(out, "--- {old_label}");
    let _ = writeln!(out, "+++ {new_label}");

    for group in &groups {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let _ = writeln!(
            out,
            "@@ -{} +{} @@",
            format_range(first.old.start, last.old.end),
            format_range(first.new.start, last.new.end)
        );

        for code in group {
            if code.tag == Tag::Equal {
                for line in &old[code.old.clone()] {
                    let _ = writeln!(out, " {}", line.as_ref());
                }
                continue;
            }
            for line in &old[code.old.clone()] {
                let _ = writeln!(out, "-{}", line.as_ref());
            }
            for line in &new[code.new.clone()] {
                let _ = writeln!(out, "+{}", line.as_ref());
            }
        }
    }
    out
}

/// Hunk range: 1-based start and length, `start,0` when empty, bare `start`
/// for a single line
fn format_range(start: usize, stop: usize) -> String {
    match stop - start {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        length => format!("{},{length}", start + 1),
    }
}
