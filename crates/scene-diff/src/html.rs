//! Side-by-side HTML diff tables
//!
//! A pure function from two line sequences to a `<table class="diff">`.
//! Each row carries a marker for what happened to it:
//!
//! | marker | row class  | meaning                          |
//! |--------|------------|----------------------------------|
//! | `+`    | `diff_add` | line only on the new side        |
//! | `-`    | `diff_sub` | line only on the old side        |
//! | `!`    | `diff_chg` | old line replaced by new line    |
//! |        | `diff_ctx` | unchanged context                |
//!
//! Hunks are separate `<tbody>` elements. Lines longer than the wrap width
//! continue on extra rows whose line-number cell shows `>`.

use crate::lines::{grouped_opcodes, opcodes, Tag};
use std::fmt::Write;

/// Rendering options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HtmlOptions {
    /// Equal lines shown around each change
    pub context: usize,
    /// Characters per cell row before wrapping
    pub wrap_width: usize,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            context: 3,
            wrap_width: 72,
        }
    }
}

#[derive(Clone, Copy)]
enum RowKind {
    Context,
    Insert,
    Delete,
    Change,
}

impl RowKind {
    const fn marker(self) -> &'static str {
        match self {
            Self::Context => "",
            Self::Insert => "+",
            Self::Delete => "-",
            Self::Change => "!",
        }
    }

    const fn class(self) -> &'static str {
        match self {
            Self::Context => "diff_ctx",
            Self::Insert => "diff_add",
            Self::Delete => "diff_sub",
            Self::Change => "diff_chg",
        }
    }
}

/// One side of a row: 1-based line number and text
type Cell<'a> = Option<(usize, &'a str)>;

/// Render a side-by-side diff table
#[must_use]
pub fn html_table<S: AsRef<str> + PartialEq>(
    old: &[S],
    new: &[S],
    old_label: &str,
    new_label: &str,
    options: HtmlOptions,
) -> String {
    let mut out = String::new();
    out.push_str("<table class=\"diff\">\n");
    let _ = writeln!(
        out,
        "<thead><tr><th class=\"diff_marker\"></th>\
         <th class=\"diff_header\" colspan=\"2\">{}</th>\
         <th class=\"diff_header\" colspan=\"2\">{}</th></tr></thead>",
        escape(old_label),
        escape(new_label)
    );

    let groups = grouped_opcodes(&opcodes(old, new), options.context);
    if groups.is_empty() {
        out.push_str(
            "<tbody><tr class=\"diff_ctx\"><td class=\"diff_marker\"></td>\
             <td colspan=\"4\">No Differences Found</td></tr></tbody>\n",
        );
    }

    for group in &groups {
        out.push_str("<tbody>\n");
        for code in group {
            let olds = &old[code.old.clone()];
            let news = &new[code.new.clone()];
            match code.tag {
                Tag::Equal => {
                    for (offset, line) in olds.iter().enumerate() {
                        let left = (code.old.start + offset + 1, line.as_ref());
                        let right = (code.new.start + offset + 1, news[offset].as_ref());
                        push_row(&mut out, RowKind::Context, Some(left), Some(right), options.wrap_width);
                    }
                }
                Tag::Delete => {
                    for (offset, line) in olds.iter().enumerate() {
                        let left = (code.old.start + offset + 1, line.as_ref());
                        push_row(&mut out, RowKind::Delete, Some(left), None, options.wrap_width);
                    }
                }
                Tag::Insert => {
                    for (offset, line) in news.iter().enumerate() {
                        let right = (code.new.start + offset + 1, line.as_ref());
                        push_row(&mut out, RowKind::Insert, None, Some(right), options.wrap_width);
                    }
                }
                Tag::Replace => {
                    for offset in 0..olds.len().max(news.len()) {
                        let left = olds
                            .get(offset)
                            .map(|l| (code.old.start + offset + 1, l.as_ref()));
                        let right = news
                            .get(offset)
                            .map(|l| (code.new.start + offset + 1, l.as_ref()));
                        let kind = match (left, right) {
                            (Some(_), Some(_)) => RowKind::Change,
                            (Some(_), None) => RowKind::Delete,
                            _ => RowKind::Insert,
                        };
                        push_row(&mut out, kind, left, right, options.wrap_width);
                    }
                }
            }
        }
        out.push_str("</tbody>\n");
    }

    out.push_str("</table>\n");
    out
}

fn push_row(out: &mut String, kind: RowKind, left: Cell<'_>, right: Cell<'_>, wrap_width: usize) {
    let left_chunks = left.map(|(_, text)| wrap(text, wrap_width)).unwrap_or_default();
    let right_chunks = right.map(|(_, text)| wrap(text, wrap_width)).unwrap_or_default();

    for row in 0..left_chunks.len().max(right_chunks.len()).max(1) {
        let marker = if row == 0 { kind.marker() } else { "" };
        let _ = write!(
            out,
            "<tr class=\"{}\"><td class=\"diff_marker\">{marker}</td>",
            kind.class()
        );
        push_cells(out, left.map(|(n, _)| n), left_chunks.get(row), row, "diff_sub");
        push_cells(out, right.map(|(n, _)| n), right_chunks.get(row), row, "diff_add");
        out.push_str("</tr>\n");
    }
}

fn push_cells(out: &mut String, number: Option<usize>, chunk: Option<&String>, row: usize, side_class: &str) {
    match (number, chunk) {
        (Some(n), Some(text)) => {
            let label = if row == 0 { n.to_string() } else { "&gt;".to_string() };
            let _ = write!(
                out,
                "<td class=\"diff_header\">{label}</td><td class=\"{side_class}\">{}</td>",
                escape(text)
            );
        }
        _ => out.push_str("<td class=\"diff_header\"></td><td></td>"),
    }
}

/// Split `text` into chunks of at most `width` characters
///
/// An empty line is one empty chunk.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || width == 0 {
        return vec![text.to_string()];
    }
    chars.chunks(width).map(|c| c.iter().collect()).collect()
}

/// Escape text for HTML element content and attribute values
#[must_use]
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows_with_class(html: &str, class: &str) -> usize {
        html.matches(&format!("<tr class=\"{class}\">")).count()
    }

    #[test]
    fn change_row_pairs_old_and_new() {
        let old = ["{", "  \"description\": \"A\"", "}"];
        let new = ["{", "  \"description\": \"B\"", "}"];
        let html = html_table(&old, &new, "current/alpha", "incoming/alpha", HtmlOptions::default());

        assert!(html.starts_with("<table class=\"diff\">"));
        assert!(html.contains(">current/alpha</th>"));
        assert_eq!(rows_with_class(&html, "diff_chg"), 1);
        assert_eq!(rows_with_class(&html, "diff_ctx"), 2);
        assert!(html.contains("<td class=\"diff_marker\">!</td>"));
        assert!(html.contains("&quot;description&quot;: &quot;B&quot;"));
    }

    #[test]
    fn added_scene_is_all_inserts() {
        let old: [&str; 0] = [];
        let new = ["{", "}"];
        let html = html_table(&old, &new, "current/g", "incoming/g", HtmlOptions::default());
        assert_eq!(rows_with_class(&html, "diff_add"), 2);
        assert_eq!(rows_with_class(&html, "diff_sub"), 0);
    }

    #[test]
    fn long_lines_wrap_onto_continuation_rows() {
        let long = "x".repeat(100);
        let html = html_table(
            &["short"],
            &[long.as_str()],
            "a",
            "b",
            HtmlOptions {
                context: 3,
                wrap_width: 40,
            },
        );
        // 100 chars at width 40 → 3 rows, only the first carries the marker.
        assert_eq!(rows_with_class(&html, "diff_chg"), 3);
        assert_eq!(html.matches("<td class=\"diff_marker\">!</td>").count(), 1);
        assert_eq!(html.matches("<td class=\"diff_header\">&gt;</td>").count(), 2);
    }

    #[test]
    fn identical_inputs_say_so() {
        let html = html_table(&["a"], &["a"], "x", "y", HtmlOptions::default());
        assert!(html.contains("No Differences Found"));
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("<b>&\"</b>"), "&lt;b&gt;&amp;&quot;&lt;/b&gt;");
    }

    #[test]
    fn wrap_respects_char_boundaries() {
        assert_eq!(wrap("ééé", 2), vec!["éé".to_string(), "é".to_string()]);
        assert_eq!(wrap("", 5), vec![String::new()]);
    }
}
