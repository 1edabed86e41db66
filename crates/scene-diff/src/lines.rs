//! Line-based diff
//!
//! Longest-common-subsequence diff of two line sequences, expressed as
//! opcodes over index ranges, plus hunk grouping with surrounding context.

use std::ops::Range;

/// Kind of an opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// `a[old] == b[new]`
    Equal,
    /// `a[old]` should be replaced by `b[new]`
    Replace,
    /// `a[old]` should be deleted (`new` is empty)
    Delete,
    /// `b[new]` should be inserted (`old` is empty)
    Insert,
}

/// One step transforming `a` into `b`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opcode {
    /// What happens over the ranges
    pub tag: Tag,
    /// Range in the old sequence
    pub old: Range<usize>,
    /// Range in the new sequence
    pub new: Range<usize>,
}

impl Opcode {
    fn new(tag: Tag, old: Range<usize>, new: Range<usize>) -> Self {
        Self { tag, old, new }
    }
}

/// Opcodes turning `a` into `b`
///
/// Adjacent deletions and insertions between two equal runs are merged into
/// a single `Replace`. Identical inputs yield one `Equal` opcode (or none
/// when both are empty).
#[must_use]
pub fn opcodes<T: PartialEq>(a: &[T], b: &[T]) -> Vec<Opcode> {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    let a_mid = &a[prefix..a.len() - suffix];
    let b_mid = &b[prefix..b.len() - suffix];

    let mut codes = Vec::new();
    if prefix > 0 {
        codes.push(Opcode::new(Tag::Equal, 0..prefix, 0..prefix));
    }
    for code in middle_opcodes(a_mid, b_mid) {
        codes.push(Opcode::new(
            code.tag,
            code.old.start + prefix..code.old.end + prefix,
            code.new.start + prefix..code.new.end + prefix,
        ));
    }
    if suffix > 0 {
        codes.push(Opcode::new(
            Tag::Equal,
            a.len() - suffix..a.len(),
            b.len() - suffix..b.len(),
        ));
    }
    codes
}

/// LCS walk over the part of the inputs that differs
fn middle_opcodes<T: PartialEq>(a: &[T], b: &[T]) -> Vec<Opcode> {
    let (n, m) = (a.len(), b.len());
    // lcs[i][j] = length of the LCS of a[i..] and b[j..]
    let width = m + 1;
    let mut lcs = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i * width + j] = if a[i] == b[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let mut codes = Vec::new();
    let (mut i, mut j) = (0, 0);
    let mut change_start = (0, 0);
    let mut in_change = false;

    let close_change = |codes: &mut Vec<Opcode>, start: (usize, usize), end: (usize, usize)| {
        let tag = match (start.0 < end.0, start.1 < end.1) {
            (true, true) => Tag::Replace,
            (true, false) => Tag::Delete,
            (false, true) => Tag::Insert,
            (false, false) => return,
        };
        codes.push(Opcode::new(tag, start.0..end.0, start.1..end.1));
    };

    while i < n || j < m {
        if i < n && j < m && a[i] == b[j] {
            if in_change {
                close_change(&mut codes, change_start, (i, j));
                in_change = false;
            }
            let (si, sj) = (i, j);
            while i < n && j < m && a[i] == b[j] {
                i += 1;
                j += 1;
            }
            codes.push(Opcode::new(Tag::Equal, si..i, sj..j));
            continue;
        }

        if !in_change {
            change_start = (i, j);
            in_change = true;
        }
        if j >= m || (i < n && lcs[(i + 1) * width + j] >= lcs[i * width + j + 1]) {
            i += 1;
        } else {
            j += 1;
        }
    }
    if in_change {
        close_change(&mut codes, change_start, (n, m));
    }
    codes
}

/// Group opcodes into hunks with up to `context` equal lines around changes
///
/// Returns no groups when the sequences are identical.
#[must_use]
pub fn grouped_opcodes(codes: &[Opcode], context: usize) -> Vec<Vec<Opcode>> {
    if codes.iter().all(|c| c.tag == Tag::Equal) {
        return Vec::new();
    }

    let mut codes = codes.to_vec();
    if let Some(first) = codes.first_mut() {
        if first.tag == Tag::Equal {
            first.old.start = first.old.start.max(first.old.end.saturating_sub(context));
            first.new.start = first.new.start.max(first.new.end.saturating_sub(context));
        }
    }
    if let Some(last) = codes.last_mut() {
        if last.tag == Tag::Equal {
            last.old.end = last.old.end.min(last.old.start + context);
            last.new.end = last.new.end.min(last.new.start + context);
        }
    }

    let mut groups = Vec::new();
    let mut group = Vec::new();
    for mut code in codes {
        if code.tag == Tag::Equal && code.old.len() > context * 2 {
            group.push(Opcode::new(
                Tag::Equal,
                code.old.start..code.old.end.min(code.old.start + context),
                code.new.start..code.new.end.min(code.new.start + context),
            ));
            groups.push(std::mem::take(&mut group));
            code.old.start = code.old.start.max(code.old.end.saturating_sub(context));
            code.new.start = code.new.start.max(code.new.end.saturating_sub(context));
        }
        group.push(code);
    }
    if !(group.is_empty() || (group.len() == 1 && group[0].tag == Tag::Equal)) {
        groups.push(group);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<&str> {
        text.lines().collect()
    }

    #[test]
    fn identical_inputs_are_one_equal_run() {
        let a = lines("a\nb\nc");
        assert_eq!(opcodes(&a, &a), vec![Opcode::new(Tag::Equal, 0..3, 0..3)]);
        assert!(grouped_opcodes(&opcodes(&a, &a), 3).is_empty());
    }

    #[test]
    fn empty_inputs_have_no_opcodes() {
        let empty: Vec<&str> = Vec::new();
        assert!(opcodes(&empty, &empty).is_empty());
    }

    #[test]
    fn insertion_into_empty() {
        let b = lines("x\ny");
        assert_eq!(opcodes(&[], &b), vec![Opcode::new(Tag::Insert, 0..0, 0..2)]);
    }

    #[test]
    fn single_line_replacement() {
        let a = lines("{\n  \"d\": \"A\"\n}");
        let b = lines("{\n  \"d\": \"B\"\n}");
        assert_eq!(
            opcodes(&a, &b),
            vec![
                Opcode::new(Tag::Equal, 0..1, 0..1),
                Opcode::new(Tag::Replace, 1..2, 1..2),
                Opcode::new(Tag::Equal, 2..3, 2..3),
            ]
        );
    }

    #[test]
    fn mixed_edits_cover_both_sequences() {
        let a = lines("a\nb\nc\nd\ne");
        let b = lines("a\nc\nd\nx\ne\nf");
        let codes = opcodes(&a, &b);
        // Ranges must tile both inputs without gaps.
        let mut old_end = 0;
        let mut new_end = 0;
        for code in &codes {
            assert_eq!(code.old.start, old_end);
            assert_eq!(code.new.start, new_end);
            old_end = code.old.end;
            new_end = code.new.end;
        }
        assert_eq!((old_end, new_end), (a.len(), b.len()));
        assert!(codes.iter().any(|c| c.tag == Tag::Delete));
        assert!(codes.iter().any(|c| c.tag == Tag::Insert));
    }

    #[test]
    fn distant_changes_split_into_hunks() {
        let a: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        let mut b = a.clone();
        b[1] = "one".to_string();
        b[18] = "eighteen".to_string();

        let groups = grouped_opcodes(&opcodes(&a, &b), 3);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].first().unwrap().old, 0..1);
        assert_eq!(groups[0].last().unwrap().old, 2..5);
        assert_eq!(groups[1].first().unwrap().old, 15..18);
        assert_eq!(groups[1].last().unwrap().old, 19..20);
    }

    #[test]
    fn nearby_changes_share_a_hunk() {
        let a: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        let mut b = a.clone();
        b[2] = "two".to_string();
        b[7] = "seven".to_string();
        assert_eq!(grouped_opcodes(&opcodes(&a, &b), 3).len(), 1);
    }
}
