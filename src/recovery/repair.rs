//! Text-to-text repair passes for almost-JSON produced by the model.
//!
//! Every pass is a pure `&str -> String` function. Regex-based passes only rewrite text
//! outside double-quoted string literals, so string content is never altered.

use std::sync::LazyLock;

use regex::{Captures, Regex};

pub type Pass = fn(&str) -> String;

/// Applied to every extracted candidate before the first parse attempt.
pub const NORMALIZE: &[Pass] = &[
    strip_control_chars,
    strip_trailing_commas,
    requote_single_quoted,
    replace_undefined,
    quote_bare_keys,
    insert_missing_commas,
    collapse_commas,
    strip_trailing_commas,
];

/// Last-resort rewrite used by the aggressive parse attempt.
pub const AGGRESSIVE: &[Pass] = &[
    trim_to_object,
    normalize_fullwidth_quotes,
    quote_bare_values,
    quote_bare_keys,
];

pub fn apply(passes: &[Pass], text: &str) -> String {
    passes.iter().fold(text.to_string(), |acc, pass| pass(&acc))
}

static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("Invalid trailing comma regex"));
static SINGLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'([^'\\\n]*)'").expect("Invalid single quote regex"));
static UNDEFINED_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\s*undefined\b").expect("Invalid undefined regex"));
static BARE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:").expect("Invalid bare key regex")
});
static COMMA_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(?:\s*,)+").expect("Invalid comma run regex"));
static BARE_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#":\s*([^",{}\[\]]+)\s*([,}])"#).expect("Invalid bare value regex")
});
static JSON_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:true|false|null)$|^-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?$")
        .expect("Invalid literal regex")
});

enum Segment<'a> {
    Code(&'a str),
    /// A double-quoted literal including its quotes; the last one may be unterminated.
    Str(&'a str),
}

fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                out.push(Segment::Str(&text[start..=i]));
                start = i + 1;
                in_string = false;
            }
        } else if ch == '"' {
            if start < i {
                out.push(Segment::Code(&text[start..i]));
            }
            start = i;
            in_string = true;
        }
    }

    if start < text.len() {
        let rest = &text[start..];
        out.push(if in_string { Segment::Str(rest) } else { Segment::Code(rest) });
    }
    out
}

fn rewrite_code(text: &str, rewrite: impl Fn(&str) -> String) -> String {
    segments(text)
        .into_iter()
        .map(|segment| match segment {
            Segment::Code(code) => rewrite(code),
            Segment::Str(literal) => literal.to_string(),
        })
        .collect()
}

/// Removes control characters (below U+0020 and U+007F). Outside string literals the
/// JSON whitespace characters `\n`, `\r` and `\t` are kept.
pub fn strip_control_chars(text: &str) -> String {
    let is_control = |c: char| c < ' ' || c == '\u{7f}';
    segments(text)
        .into_iter()
        .map(|segment| match segment {
            Segment::Code(code) => code
                .chars()
                .filter(|&c| !is_control(c) || matches!(c, '\n' | '\r' | '\t'))
                .collect::<String>(),
            Segment::Str(literal) => literal.chars().filter(|&c| !is_control(c)).collect(),
        })
        .collect()
}

pub fn strip_trailing_commas(text: &str) -> String {
    rewrite_code(text, |code| TRAILING_COMMA.replace_all(code, "$1").into_owned())
}

/// `'name'` becomes `"name"`, for property names and values alike.
pub fn requote_single_quoted(text: &str) -> String {
    rewrite_code(text, |code| SINGLE_QUOTED.replace_all(code, "\"$1\"").into_owned())
}

pub fn replace_undefined(text: &str) -> String {
    rewrite_code(text, |code| UNDEFINED_VALUE.replace_all(code, ": null").into_owned())
}

pub fn quote_bare_keys(text: &str) -> String {
    rewrite_code(text, |code| BARE_KEY.replace_all(code, "$1\"$2\":").into_owned())
}

pub fn collapse_commas(text: &str) -> String {
    rewrite_code(text, |code| COMMA_RUN.replace_all(code, ",").into_owned())
}

fn closes_value(c: char) -> bool {
    matches!(c, '"' | '}' | ']') || c.is_ascii_alphanumeric()
}

/// Inserts the comma a model forgot between two members written on separate lines,
/// e.g. `"a": 1⏎"b": 2` or `}⏎{` inside an array.
pub fn insert_missing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut last: Option<char> = None;
    let mut last_end = 0;
    let mut saw_newline = false;

    for segment in segments(text) {
        match segment {
            Segment::Str(literal) => {
                if saw_newline && last.is_some_and(closes_value) {
                    out.insert(last_end, ',');
                }
                out.push_str(literal);
                last = Some('"');
                last_end = out.len();
                saw_newline = false;
            }
            Segment::Code(code) => {
                for ch in code.chars() {
                    if ch.is_whitespace() {
                        saw_newline |= ch == '\n';
                        out.push(ch);
                        continue;
                    }
                    if ch == '{' && saw_newline && last == Some('}') {
                        out.insert(last_end, ',');
                    }
                    out.push(ch);
                    last = Some(ch);
                    last_end = out.len();
                    saw_newline = false;
                }
            }
        }
    }
    out
}

/// Keeps only the span from the first `{` to the last `}`.
pub fn trim_to_object(text: &str) -> String {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => text[start..=end].to_string(),
        _ => text.to_string(),
    }
}

pub fn normalize_fullwidth_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{FF02}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{FF07}' => '\'',
            other => other,
        })
        .collect()
}

/// Wraps unquoted scalar values in double quotes unless they are JSON literals.
pub fn quote_bare_values(text: &str) -> String {
    rewrite_code(text, |code| {
        BARE_VALUE
            .replace_all(code, |caps: &Captures| {
                let value = caps[1].trim();
                let ending = &caps[2];
                if JSON_LITERAL.is_match(value) {
                    format!(": {value}{ending}")
                } else {
                    format!(": \"{value}\"{ending}")
                }
            })
            .into_owned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn normalize(text: &str) -> String {
        apply(NORMALIZE, text)
    }

    #[test]
    fn strips_trailing_commas() {
        assert_eq!(strip_trailing_commas(r#"{"a":[1,2,],"b":3,}"#), r#"{"a":[1,2],"b":3}"#);
    }

    #[test]
    fn leaves_commas_inside_strings() {
        assert_eq!(strip_trailing_commas(r#"{"a":"x,}"}"#), r#"{"a":"x,}"}"#);
    }

    #[test]
    fn quotes_bare_and_single_quoted_keys() {
        assert_eq!(
            normalize("{days: [], 'totalEstimatedCost': 10, note: 'Kyoto'}"),
            r#"{"days": [], "totalEstimatedCost": 10, "note": "Kyoto"}"#
        );
    }

    #[test]
    fn keeps_colons_inside_string_values() {
        let text = r#"{"time": "09:00", "description": "Note, meet: lobby"}"#;
        assert_eq!(normalize(text), text);
    }

    #[test]
    fn replaces_undefined() {
        assert_eq!(normalize(r#"{"location": undefined}"#), r#"{"location": null}"#);
    }

    #[test]
    fn strips_control_characters() {
        assert_eq!(
            strip_control_chars("{\"a\":\"x\ty\u{7}z\"}\u{0}"),
            "{\"a\":\"xyz\"}"
        );
        assert_eq!(strip_control_chars("{\n\t\"a\": 1\r\n}"), "{\n\t\"a\": 1\r\n}");
    }

    #[test]
    fn inserts_missing_commas_between_lines() {
        let text = "{\n  \"title\": \"Temple\"\n  \"cost\": 400\n  \"reservationRequired\": false\n}";
        let fixed = normalize(text);
        let value: serde_json::Value = serde_json::from_str(&fixed).unwrap();
        assert_eq!(value["cost"], 400);
        assert_eq!(value["reservationRequired"], false);
    }

    #[test]
    fn inserts_missing_commas_between_objects() {
        let text = "[\n  {\"a\": 1}\n  {\"a\": 2}\n]";
        assert_eq!(insert_missing_commas(text), "[\n  {\"a\": 1},\n  {\"a\": 2}\n]");
    }

    #[test]
    fn collapses_comma_runs() {
        assert_eq!(collapse_commas(r#"{"a":1,,, "b":2}"#), r#"{"a":1, "b":2}"#);
        assert_eq!(collapse_commas(r#"{"a":1, ,"b":2}"#), r#"{"a":1,"b":2}"#);
    }

    #[test]
    fn normalization_keeps_valid_json_intact() {
        let text = r#"{"days":[{"date":"2024-11-15","events":[{"title":"It's \"great\"","cost":1}]}]}"#;
        assert_eq!(normalize(text), text);
        assert_eq!(normalize(&normalize(text)), text);
    }

    #[test]
    fn aggressive_quotes_bare_values() {
        let text = "noise {\"title\": Kyoto walk, \"cost\": 1200, \"ok\": true, \"x\": null}";
        assert_eq!(
            apply(AGGRESSIVE, text),
            r#"{"title": "Kyoto walk", "cost": 1200, "ok": true, "x": null}"#
        );
    }

    #[test]
    fn aggressive_normalizes_fullwidth_quotes() {
        let text = "{\u{201C}title\u{201D}: \u{201C}Gion\u{201D}}";
        assert_eq!(apply(AGGRESSIVE, text), r#"{"title": "Gion"}"#);
    }
}
