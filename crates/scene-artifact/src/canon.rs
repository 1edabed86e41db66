//! Canonical JSON
//!
//! Deterministic re-expression of JSON values for hashing and comparison.
//! The canonical text form uses sorted keys, `,`/`:` separators and no
//! ASCII escaping of non-ASCII characters.
//!
//! Numbers are written by hand rather than by `serde_json`:
//!
//! - integer literals are copied digit for digit, whatever their size
//! - floats use the shortest round-trip digits, switching to exponent form
//!   (`1e-05`, `1.5e+20`) outside `1e-4 <= |x| < 1e16`, with at least two
//!   exponent digits and a trailing `.0` on integral values

use serde_json::{Map, Number, Value};

/// Recursively rebuild `value` with every object's keys in sorted order
///
/// The input is never mutated; a fresh value is returned.
#[must_use]
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key.clone(), canonicalize(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        scalar => scalar.clone(),
    }
}

/// Compact canonical JSON text of `value`
#[must_use]
pub fn to_canonical_string(value: &Value) -> String {
    let mut writer = CanonicalWriter::new(None);
    writer.value(value, 0);
    writer.out
}

/// Pretty canonical JSON (sorted keys, two-space indent)
#[must_use]
pub fn to_pretty_string(value: &Value) -> String {
    let mut writer = CanonicalWriter::new(Some(2));
    writer.value(value, 0);
    writer.out
}

/// Pretty canonical JSON split into lines; an absent value has no lines
#[must_use]
pub fn to_pretty_lines(value: Option<&Value>) -> Vec<String> {
    value
        .map(|v| to_pretty_string(v).lines().map(str::to_owned).collect())
        .unwrap_or_default()
}

struct CanonicalWriter {
    out: String,
    indent: Option<usize>,
}

impl CanonicalWriter {
    fn new(indent: Option<usize>) -> Self {
        Self {
            out: String::new(),
            indent,
        }
    }

    fn value(&mut self, value: &Value, depth: usize) {
        match value {
            Value::Null => self.out.push_str("null"),
            Value::Bool(true) => self.out.push_str("true"),
            Value::Bool(false) => self.out.push_str("false"),
            Value::Number(number) => self.out.push_str(&format_number(number)),
            Value::String(text) => push_string(&mut self.out, text),
            Value::Array(items) => {
                if items.is_empty() {
                    self.out.push_str("[]");
                    return;
                }
                self.out.push('[');
                for (i, item) in items.iter().enumerate() {
                    self.separator(i, depth + 1);
                    self.value(item, depth + 1);
                }
                self.newline(depth);
                self.out.push(']');
            }
            Value::Object(map) => {
                if map.is_empty() {
                    self.out.push_str("{}");
                    return;
                }
                let mut entries: Vec<(&String, &Value)> = map.iter().collect();
                entries.sort_by(|(a, _), (b, _)| a.cmp(b));
                self.out.push('{');
                for (i, (key, inner)) in entries.into_iter().enumerate() {
                    self.separator(i, depth + 1);
                    push_string(&mut self.out, key);
                    self.out.push_str(if self.indent.is_some() { ": " } else { ":" });
                    self.value(inner, depth + 1);
                }
                self.newline(depth);
                self.out.push('}');
            }
        }
    }

    fn separator(&mut self, index: usize, depth: usize) {
        if index > 0 {
            self.out.push(',');
        }
        self.newline(depth);
    }

    fn newline(&mut self, depth: usize) {
        if let Some(width) = self.indent {
            self.out.push('\n');
            self.out.push_str(&" ".repeat(width * depth));
        }
    }
}

/// JSON string literal; only quotes, backslashes and control characters
/// are escaped
fn push_string(out: &mut String, text: &str) {
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if u32::from(c) < 0x20 => out.push_str(&format!("\\u{:04x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn format_number(number: &Number) -> String {
    let literal = number.to_string();
    if is_integer_literal(&literal) {
        return if literal == "-0" { "0".to_string() } else { literal };
    }
    match number.as_f64() {
        Some(float) if float.is_finite() => format_float(float),
        _ => literal,
    }
}

fn is_integer_literal(literal: &str) -> bool {
    let digits = literal.strip_prefix('-').unwrap_or(literal);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Shortest round-trip text of a finite float
fn format_float(value: f64) -> String {
    let scientific = format!("{:e}", value.abs());
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((&scientific, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let sign = if value.is_sign_negative() { "-" } else { "" };

    // Position of the decimal point relative to the first digit
    let point = exponent + 1;
    let body = if point > -4 && point <= 16 {
        match usize::try_from(point) {
            Ok(point) if point >= digits.len() => {
                format!("{digits}{}.0", "0".repeat(point - digits.len()))
            }
            Ok(0) | Err(_) => {
                let zeros = usize::try_from(-point).unwrap_or(0);
                format!("0.{}{digits}", "0".repeat(zeros))
            }
            Ok(point) => format!("{}.{}", &digits[..point], &digits[point..]),
        }
    } else {
        let (lead, rest) = digits.split_at(1);
        let fraction = if rest.is_empty() { String::new() } else { format!(".{rest}") };
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        format!("{lead}{fraction}e{exp_sign}{:02}", exponent.unsigned_abs())
    };
    format!("{sign}{body}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_string_is_compact_and_sorted() {
        let value: Value = serde_json::from_str(r#"{"b": [1, {"z": 1, "y": 2}], "a": "x"}"#).unwrap();
        assert_eq!(to_canonical_string(&value), r#"{"a":"x","b":[1,{"y":2,"z":1}]}"#);
    }

    #[test]
    fn canonical_string_does_not_escape_unicode() {
        let value = json!({"description": "Café — ünïcode"});
        assert_eq!(
            to_canonical_string(&value),
            "{\"description\":\"Café — ünïcode\"}"
        );
    }

    #[test]
    fn canonical_numbers_keep_integer_digits_and_float_exponents() {
        let value: Value =
            serde_json::from_str(r#"{"x": 1e20, "y": 1e-7, "z": 100000000000000000000}"#).unwrap();
        assert_eq!(
            to_canonical_string(&value),
            r#"{"x":1e+20,"y":1e-07,"z":100000000000000000000}"#
        );
    }

    #[test]
    fn canonical_floats_switch_notation_at_the_usual_bounds() {
        let cases = [
            ("1.0", "1.0"),
            ("1.00", "1.0"),
            ("-0.0", "-0.0"),
            ("-0", "0"),
            ("0.5", "0.5"),
            ("123.456", "123.456"),
            ("0.0001", "0.0001"),
            ("0.00001", "1e-05"),
            ("1.5e-7", "1.5e-07"),
            ("1e15", "1000000000000000.0"),
            ("1e16", "1e+16"),
            ("2.5E3", "2500.0"),
            ("-12345678901234567890123", "-12345678901234567890123"),
        ];
        for (input, expected) in cases {
            let value: Value = serde_json::from_str(input).unwrap();
            assert_eq!(to_canonical_string(&value), expected, "{input}");
        }
    }

    #[test]
    fn equal_numbers_written_differently_hash_alike() {
        let a: Value = serde_json::from_str(r#"{"w": 1.50}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"w": 1.5}"#).unwrap();
        assert_eq!(to_canonical_string(&a), to_canonical_string(&b));
    }

    #[test]
    fn canonical_string_escapes_control_characters_only() {
        let value = json!({"s": "tab\tquote\"back\\\u{1}\u{7f}"});
        assert_eq!(
            to_canonical_string(&value),
            "{\"s\":\"tab\\tquote\\\"back\\\\\\u0001\u{7f}\"}"
        );
    }

    #[test]
    fn pretty_string_nests_with_two_spaces() {
        let value = json!({"b": {"z": [1, 2], "y": {}}, "a": []});
        assert_eq!(
            to_pretty_string(&value),
            "{\n  \"a\": [],\n  \"b\": {\n    \"y\": {},\n    \"z\": [\n      1,\n      2\n    ]\n  }\n}"
        );
    }

    #[test]
    fn canonicalize_leaves_input_untouched() {
        let value = json!({"b": 1, "a": 2});
        let before = value.clone();
        let _ = canonicalize(&value);
        assert_eq!(value, before);
    }

    #[test]
    fn pretty_lines_use_two_space_indent() {
        let lines = to_pretty_lines(Some(&json!({"description": "A", "choices": []})));
        assert_eq!(lines, vec!["{", "  \"choices\": [],", "  \"description\": \"A\"", "}"]);
    }

    #[test]
    fn pretty_lines_of_absent_value_are_empty() {
        assert!(to_pretty_lines(None).is_empty());
    }
}
