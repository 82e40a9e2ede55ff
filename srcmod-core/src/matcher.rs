// Matchers - locate the span of text a rewrite rule acts on
//
// Three matcher shapes cover the rule sets we ship: exact substrings,
// anchored delimiter-balanced blocks, and regexes as the escape hatch.
// Block matching scans lexically so that delimiters inside string
// literals, template literals and comments never affect nesting depth.

use std::ops::Range;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Which delimiter pair a block matcher balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delimiter {
    Braces,
    Brackets,
    Parens,
}

impl Delimiter {
    fn open(self) -> u8 {
        match self {
            Delimiter::Braces => b'{',
            Delimiter::Brackets => b'[',
            Delimiter::Parens => b'(',
        }
    }

    fn close(self) -> u8 {
        match self {
            Delimiter::Braces => b'}',
            Delimiter::Brackets => b']',
            Delimiter::Parens => b')',
        }
    }
}

fn default_groups() -> usize {
    1
}

/// How a rule locates the span it acts on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Matcher {
    /// First exact occurrence of `text`.
    Literal { text: String },

    /// A structural span: the line whose trimmed content equals `anchor`,
    /// then `groups` balanced delimiter groups (each taken through the end
    /// of the line that closes it), then up to `trailing_blank_lines`
    /// empty lines. With `groups: 0` the span is the anchor line alone.
    Block {
        anchor: String,
        delimiter: Delimiter,
        #[serde(default = "default_groups")]
        groups: usize,
        #[serde(default)]
        trailing_blank_lines: usize,
    },

    /// First match of a regex. Compiled with `.` matching newlines, so
    /// patterns can span lines the way block matchers do.
    Pattern { pattern: String },
}

impl Matcher {
    /// Compile the matcher into its scan-ready form. Only `Pattern` can
    /// fail, with the regex error surfaced to the caller.
    pub(crate) fn compile(&self) -> Result<CompiledMatcher, regex::Error> {
        Ok(match self {
            Matcher::Literal { text } => CompiledMatcher::Literal { text: text.clone() },
            Matcher::Block {
                anchor,
                delimiter,
                groups,
                trailing_blank_lines,
            } => CompiledMatcher::Block {
                anchor: anchor.clone(),
                delimiter: *delimiter,
                groups: *groups,
                trailing_blank_lines: *trailing_blank_lines,
            },
            Matcher::Pattern { pattern } => CompiledMatcher::Pattern {
                regex: RegexBuilder::new(pattern)
                    .dot_matches_new_line(true)
                    .build()?,
            },
        })
    }
}

/// A matcher with its pattern compiled, ready to scan a buffer.
#[derive(Debug, Clone)]
pub(crate) enum CompiledMatcher {
    Literal {
        text: String,
    },
    Block {
        anchor: String,
        delimiter: Delimiter,
        groups: usize,
        trailing_blank_lines: usize,
    },
    Pattern {
        regex: Regex,
    },
}

impl CompiledMatcher {
    /// Find the first matched byte span at or after `from`.
    /// Returns None when the matcher finds nothing; no-match is never an error.
    pub(crate) fn find_span(&self, hay: &str, from: usize) -> Option<Range<usize>> {
        match self {
            CompiledMatcher::Literal { text } => hay
                .get(from..)?
                .find(text.as_str())
                .map(|offset| from + offset..from + offset + text.len()),
            CompiledMatcher::Block {
                anchor,
                delimiter,
                groups,
                trailing_blank_lines,
            } => block_span(hay, from, anchor, *delimiter, *groups, *trailing_blank_lines),
            CompiledMatcher::Pattern { regex } => {
                regex.find_at(hay, from).map(|m| m.start()..m.end())
            }
        }
    }
}

fn block_span(
    hay: &str,
    from: usize,
    anchor: &str,
    delimiter: Delimiter,
    groups: usize,
    trailing_blank_lines: usize,
) -> Option<Range<usize>> {
    let start = find_anchor_line(hay, from, anchor)?;
    let mut pos = end_of_line(hay, start);
    for _ in 0..groups {
        pos = balanced_group_end(hay, pos, delimiter)?;
    }
    // Blank lines are consumed when present, never required
    for _ in 0..trailing_blank_lines {
        if hay.as_bytes().get(pos) == Some(&b'\n') {
            pos += 1;
        } else {
            break;
        }
    }
    Some(start..pos)
}

/// Byte offset of the first line at or after `from` whose trimmed content
/// equals the trimmed anchor.
fn find_anchor_line(hay: &str, from: usize, anchor: &str) -> Option<usize> {
    let needle = anchor.trim();
    let mut pos = line_start_at_or_after(hay, from)?;
    loop {
        let line_end = hay[pos..]
            .find('\n')
            .map(|offset| pos + offset)
            .unwrap_or(hay.len());
        if hay[pos..line_end].trim() == needle {
            return Some(pos);
        }
        if line_end == hay.len() {
            return None;
        }
        pos = line_end + 1;
    }
}

/// `from` itself when it sits on a line boundary, otherwise the start of
/// the next line.
fn line_start_at_or_after(hay: &str, from: usize) -> Option<usize> {
    if from == 0 || hay.as_bytes().get(from - 1) == Some(&b'\n') {
        return Some(from);
    }
    hay.get(from..)?.find('\n').map(|offset| from + offset + 1)
}

/// Position just past the newline that ends the line containing `at`
/// (or the end of the buffer on the last line).
fn end_of_line(hay: &str, at: usize) -> usize {
    match hay[at..].find('\n') {
        Some(offset) => at + offset + 1,
        None => hay.len(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lex {
    Code,
    Str(u8),
    Template,
    LineComment,
    BlockComment,
}

/// Scan forward from `from` for one balanced delimiter group and return
/// the position just past the end of the line that closes it.
///
/// The scan is lexical: single- and double-quoted literals (which do not
/// span lines; an unterminated quote ends at the newline), backtick
/// template literals (which do), and `//` and `/* */` comments are
/// skipped, so delimiters inside them never change the nesting depth.
/// Closers seen before the first opener are stray and ignored. Returns
/// None when no group opens or the group never closes.
fn balanced_group_end(hay: &str, from: usize, delimiter: Delimiter) -> Option<usize> {
    let bytes = hay.as_bytes();
    let open = delimiter.open();
    let close = delimiter.close();
    let mut state = Lex::Code;
    let mut depth = 0usize;
    let mut opened = false;
    let mut i = from;
    while i < bytes.len() {
        let b = bytes[i];
        match state {
            Lex::Code => match b {
                b'\'' | b'"' => state = Lex::Str(b),
                b'`' => state = Lex::Template,
                b'/' if bytes.get(i + 1) == Some(&b'/') => {
                    state = Lex::LineComment;
                    i += 1;
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    state = Lex::BlockComment;
                    i += 1;
                }
                _ if b == open => {
                    depth += 1;
                    opened = true;
                }
                _ if b == close && opened => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(end_of_line(hay, i));
                    }
                }
                _ => {}
            },
            Lex::Str(quote) => match b {
                b'\\' => i += 1,
                b'\n' => state = Lex::Code,
                _ if b == quote => state = Lex::Code,
                _ => {}
            },
            Lex::Template => match b {
                b'\\' => i += 1,
                b'`' => state = Lex::Code,
                _ => {}
            },
            Lex::LineComment => {
                if b == b'\n' {
                    state = Lex::Code;
                }
            }
            Lex::BlockComment => {
                if b == b'*' && bytes.get(i + 1) == Some(&b'/') {
                    state = Lex::Code;
                    i += 1;
                }
            }
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(matcher: &Matcher, hay: &str) -> Option<Range<usize>> {
        matcher.compile().unwrap().find_span(hay, 0)
    }

    fn block(anchor: &str, delimiter: Delimiter, groups: usize, trailing: usize) -> Matcher {
        Matcher::Block {
            anchor: anchor.to_string(),
            delimiter,
            groups,
            trailing_blank_lines: trailing,
        }
    }

    #[test]
    fn test_literal_finds_first_occurrence() {
        let matcher = Matcher::Literal {
            text: "X".to_string(),
        };
        assert_eq!(span(&matcher, "aXbXc"), Some(1..2));
    }

    #[test]
    fn test_literal_respects_from() {
        let compiled = Matcher::Literal {
            text: "X".to_string(),
        }
        .compile()
        .unwrap();
        assert_eq!(compiled.find_span("aXbXc", 2), Some(3..4));
        assert_eq!(compiled.find_span("aXbXc", 4), None);
    }

    #[test]
    fn test_block_matches_anchor_by_trimmed_line() {
        let hay = "keep\n    // drop me\n    foo() {\n    }\nafter\n";
        let matcher = block("// drop me", Delimiter::Braces, 1, 0);
        let range = span(&matcher, hay).unwrap();
        assert_eq!(&hay[range], "    // drop me\n    foo() {\n    }\n");
    }

    #[test]
    fn test_block_anchor_must_fill_its_line() {
        let hay = "// drop me please\nfoo() {\n}\n";
        let matcher = block("// drop me", Delimiter::Braces, 1, 0);
        assert_eq!(span(&matcher, hay), None);
    }

    #[test]
    fn test_block_anchor_absent_is_no_match() {
        let hay = "nothing here\nat all\n";
        let matcher = block("// drop me", Delimiter::Braces, 1, 0);
        assert_eq!(span(&matcher, hay), None);
    }

    #[test]
    fn test_block_spans_nested_braces() {
        let hay = "// gone\nconst x = {\n  inner: {\n    deep: { a: 1 },\n  },\n};\nkept\n";
        let matcher = block("// gone", Delimiter::Braces, 1, 0);
        let range = span(&matcher, hay).unwrap();
        assert_eq!(
            &hay[range],
            "// gone\nconst x = {\n  inner: {\n    deep: { a: 1 },\n  },\n};\n"
        );
    }

    #[test]
    fn test_block_skips_strings_with_unbalanced_parens() {
        let hay = "// remove\nregister(() => {\n  notify(\"ready :)\");\n});\nafter\n";
        let matcher = block("// remove", Delimiter::Parens, 1, 0);
        let range = span(&matcher, hay).unwrap();
        assert_eq!(
            &hay[range],
            "// remove\nregister(() => {\n  notify(\"ready :)\");\n});\n"
        );
    }

    #[test]
    fn test_block_skips_line_comments() {
        let hay = "// anchor\nrun(\n  // 1) first  2) second\n  arg,\n);\nrest\n";
        let matcher = block("// anchor", Delimiter::Parens, 1, 0);
        let range = span(&matcher, hay).unwrap();
        assert_eq!(
            &hay[range],
            "// anchor\nrun(\n  // 1) first  2) second\n  arg,\n);\n"
        );
    }

    #[test]
    fn test_block_skips_block_comments() {
        let hay = "// anchor\nwrap {\n  /* not a real } closer */\n  body();\n}\nrest\n";
        let matcher = block("// anchor", Delimiter::Braces, 1, 0);
        let range = span(&matcher, hay).unwrap();
        assert_eq!(
            &hay[range],
            "// anchor\nwrap {\n  /* not a real } closer */\n  body();\n}\n"
        );
    }

    #[test]
    fn test_block_skips_template_literal_braces() {
        // the bare `}` inside the backticks would close the group early
        // if templates were not skipped
        let hay = "// t\ninterface W {\n  hash: `0x${string}`;\n  note: `a } inside`;\n}\n\nrest\n";
        let matcher = block("// t", Delimiter::Braces, 1, 1);
        let range = span(&matcher, hay).unwrap();
        assert_eq!(
            &hay[range],
            "// t\ninterface W {\n  hash: `0x${string}`;\n  note: `a } inside`;\n}\n\n"
        );
    }

    #[test]
    fn test_block_escaped_quote_stays_in_string() {
        let hay = "// a\ncall(\"he said \\\" and ( left\", done);\nrest\n";
        let matcher = block("// a", Delimiter::Parens, 1, 0);
        let range = span(&matcher, hay).unwrap();
        assert_eq!(&hay[range], "// a\ncall(\"he said \\\" and ( left\", done);\n");
    }

    #[test]
    fn test_block_ignores_closers_before_first_opener() {
        let hay = "// x\n) stray\ncall(arg);\nrest\n";
        let matcher = block("// x", Delimiter::Parens, 1, 0);
        let range = span(&matcher, hay).unwrap();
        assert_eq!(&hay[range], "// x\n) stray\ncall(arg);\n");
    }

    #[test]
    fn test_block_unclosed_group_is_no_match() {
        let hay = "// x\nfoo(bar\n";
        let matcher = block("// x", Delimiter::Parens, 1, 0);
        assert_eq!(span(&matcher, hay), None);
    }

    #[test]
    fn test_block_requires_every_group() {
        let hay = "// x\nfirst();\n";
        let matcher = block("// x", Delimiter::Parens, 2, 0);
        assert_eq!(span(&matcher, hay), None);
    }

    #[test]
    fn test_block_two_groups_span_both() {
        let hay = "// pair\ninterface A {\n  a: number;\n}\n\ninterface B {\n  b: string;\n}\n\nrest\n";
        let matcher = block("// pair", Delimiter::Braces, 2, 1);
        let range = span(&matcher, hay).unwrap();
        assert_eq!(
            &hay[range],
            "// pair\ninterface A {\n  a: number;\n}\n\ninterface B {\n  b: string;\n}\n\n"
        );
    }

    #[test]
    fn test_block_trailing_blank_optional_at_eof() {
        let hay = "// end\nlast();";
        let matcher = block("// end", Delimiter::Parens, 1, 1);
        assert_eq!(span(&matcher, hay), Some(0..hay.len()));
    }

    #[test]
    fn test_block_trailing_blanks_capped() {
        let hay = "// b\ngo();\n\n\nrest\n";
        let matcher = block("// b", Delimiter::Parens, 1, 1);
        let range = span(&matcher, hay).unwrap();
        assert_eq!(&hay[range.clone()], "// b\ngo();\n\n");
        assert_eq!(&hay[range.end..], "\nrest\n");
    }

    #[test]
    fn test_block_groups_zero_takes_anchor_line_only() {
        let hay = "before\n// just this line\nafter\n";
        let matcher = block("// just this line", Delimiter::Braces, 0, 0);
        let range = span(&matcher, hay).unwrap();
        assert_eq!(&hay[range], "// just this line\n");
    }

    #[test]
    fn test_block_from_mid_line_starts_at_next_line() {
        let hay = "// a\none();\n// a\ntwo();\n";
        let compiled = block("// a", Delimiter::Parens, 1, 0).compile().unwrap();
        // from inside the first anchor line, only the second block matches
        let range = compiled.find_span(hay, 2).unwrap();
        assert_eq!(&hay[range], "// a\ntwo();\n");
    }

    #[test]
    fn test_pattern_dot_matches_newlines() {
        let matcher = Matcher::Pattern {
            pattern: r"a.*?b".to_string(),
        };
        assert_eq!(span(&matcher, "a\nx\nb!"), Some(0..5));
    }

    #[test]
    fn test_invalid_pattern_fails_to_compile() {
        let matcher = Matcher::Pattern {
            pattern: "*(".to_string(),
        };
        assert!(matcher.compile().is_err());
    }
}
