//! Template source compiler.
//!
//! Turns a source string into a flat list of text and placeholder nodes.
//! Recognised tags:
//! - `{{ name }}` / `{{ user.name }}` variable placeholders
//! - `{# ... #}` comments (no output)
//! - `{% ... %}` block tags, rejected
//!
//! A `-` directly inside an opening or closing delimiter (`{{-`, `-}}`)
//! strips all whitespace on that side of the tag.

use super::RenderError;

/// A compiled template fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    Text(String),
    Variable { path: Vec<String>, line: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Variable,
    Comment,
    Block,
}

impl TagKind {
    fn from_opener(c: u8) -> Option<Self> {
        match c {
            b'{' => Some(TagKind::Variable),
            b'#' => Some(TagKind::Comment),
            b'%' => Some(TagKind::Block),
            _ => None,
        }
    }

    fn closer(self) -> &'static str {
        match self {
            TagKind::Variable => "}}",
            TagKind::Comment => "#}",
            TagKind::Block => "%}",
        }
    }
}

/// Find the next tag opener, returning its byte offset and kind
fn find_tag(source: &str) -> Option<(usize, TagKind)> {
    let bytes = source.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(kind) = TagKind::from_opener(bytes[i + 1]) {
                return Some((i, kind));
            }
        }
        i += 1;
    }
    None
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_path(expression: &str, line: usize) -> Result<Vec<String>, RenderError> {
    let expression = expression.trim();
    if expression.is_empty() {
        return Err(RenderError::syntax(line, "expected a variable name inside '{{ }}'"));
    }

    let path: Vec<String> = expression.split('.').map(str::to_string).collect();
    if path.iter().all(|segment| is_identifier(segment)) {
        Ok(path)
    } else {
        Err(RenderError::syntax(
            line,
            format!(
                "'{}' is not a variable name; only plain and dotted names are allowed",
                expression
            ),
        ))
    }
}

/// Strip spaces and tabs between the last line start and the end of `text`.
/// `at_line_start` marks text that begins at the start of the source.
fn lstrip_line(text: &str, at_line_start: bool) -> &str {
    let line_start = match text.rfind('\n') {
        Some(pos) => pos + 1,
        None if at_line_start => 0,
        None => return text,
    };

    if text[line_start..].chars().all(|c| c == ' ' || c == '\t') {
        &text[..line_start]
    } else {
        text
    }
}

/// Compile template source into nodes.
///
/// With `trim_whitespace` enabled, a comment tag also swallows the indentation
/// before it and the single newline after it, so comment-only lines vanish.
pub(crate) fn parse(source: &str, trim_whitespace: bool) -> Result<Vec<Node>, RenderError> {
    let mut nodes = Vec::new();
    let mut rest = source;
    let mut line = 1;
    let mut strip_leading = false;
    let mut at_source_start = true;

    loop {
        let Some((offset, kind)) = find_tag(rest) else {
            let text = if strip_leading { rest.trim_start() } else { rest };
            push_text(&mut nodes, text);
            break;
        };

        let raw_text = &rest[..offset];
        let mut after_open = &rest[offset + 2..];
        let strip_before = after_open.starts_with('-');
        if strip_before {
            after_open = &after_open[1..];
        }

        let mut text = raw_text;
        if strip_leading {
            text = text.trim_start();
        }
        if strip_before {
            text = text.trim_end();
        } else if trim_whitespace && kind == TagKind::Comment {
            text = lstrip_line(text, at_source_start);
        }
        push_text(&mut nodes, text);

        line += raw_text.matches('\n').count();
        let tag_line = line;

        let Some(close) = after_open.find(kind.closer()) else {
            let message = match kind {
                TagKind::Variable => "unclosed variable tag, expected '}}'",
                TagKind::Comment => "unclosed comment, expected '#}'",
                TagKind::Block => "unclosed block tag, expected '%}'",
            };
            return Err(RenderError::syntax(tag_line, message));
        };

        let mut inner = &after_open[..close];
        let strip_after = inner.ends_with('-');
        if strip_after {
            inner = &inner[..inner.len() - 1];
        }

        match kind {
            TagKind::Variable => {
                let path = parse_path(inner, tag_line)?;
                nodes.push(Node::Variable {
                    path,
                    line: tag_line,
                });
            }
            TagKind::Comment => {}
            TagKind::Block => {
                return Err(RenderError::syntax(
                    tag_line,
                    format!(
                        "block tag '{{% {} %}}' is not supported; only '{{{{ name }}}}' placeholders are allowed",
                        inner.trim()
                    ),
                ));
            }
        }

        line += inner.matches('\n').count();
        rest = &after_open[close + 2..];

        if trim_whitespace && kind == TagKind::Comment && !strip_after {
            if let Some(stripped) = rest
                .strip_prefix("\r\n")
                .or_else(|| rest.strip_prefix('\n'))
            {
                rest = stripped;
                line += 1;
            }
        }

        strip_leading = strip_after;
        at_source_start = false;
    }

    Ok(nodes)
}

fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text(previous)) = nodes.last_mut() {
        previous.push_str(text);
    } else {
        nodes.push(Node::Text(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(path: &[&str], line: usize) -> Node {
        Node::Variable {
            path: path.iter().map(|s| s.to_string()).collect(),
            line,
        }
    }

    fn text(s: &str) -> Node {
        Node::Text(s.to_string())
    }

    #[test]
    fn test_parse_plain_text() {
        assert_eq!(parse("no tags here }}", true).unwrap(), vec![text("no tags here }}")]);
        assert!(parse("", true).unwrap().is_empty());
    }

    #[test]
    fn test_parse_placeholders() {
        let nodes = parse("Hello {{ name }}, see {{user.profile_url}}", true).unwrap();
        assert_eq!(
            nodes,
            vec![
                text("Hello "),
                var(&["name"], 1),
                text(", see "),
                var(&["user", "profile_url"], 1),
            ]
        );
    }

    #[test]
    fn test_whitespace_markers() {
        let nodes = parse("a   {{- x -}}\n\n  b", true).unwrap();
        assert_eq!(nodes, vec![text("a"), var(&["x"], 1), text("b")]);
    }

    #[test]
    fn test_comment_lines_vanish() {
        let nodes = parse("line one\n   {# note #}\nline two", true).unwrap();
        assert_eq!(nodes, vec![text("line one\nline two")]);

        let untrimmed = parse("line one\n   {# note #}\nline two", false).unwrap();
        assert_eq!(untrimmed, vec![text("line one\n   \nline two")]);
    }

    #[test]
    fn test_line_numbers_track_newlines() {
        let nodes = parse("first\n{# a\ncomment #}\nthird {{ x }}", false).unwrap();
        assert_eq!(nodes.last(), Some(&var(&["x"], 4)));

        let err = parse("one\ntwo\n{{ oops", true).unwrap_err();
        assert_eq!(
            err,
            RenderError::Syntax {
                line: 3,
                message: "unclosed variable tag, expected '}}'".to_string()
            }
        );
    }

    #[test]
    fn test_rejects_expressions() {
        for source in ["{{ }}", "{{ a + b }}", "{{ name|upper }}", "{{ 1name }}", "{{ a..b }}"] {
            let err = parse(source, true).unwrap_err();
            assert!(matches!(err, RenderError::Syntax { line: 1, .. }), "{}", source);
        }
    }

    #[test]
    fn test_rejects_block_tags() {
        let err = parse("{% if admin %}hi{% endif %}", true).unwrap_err();
        match err {
            RenderError::Syntax { message, .. } => assert!(message.contains("if admin")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unclosed_comment() {
        assert!(matches!(
            parse("text {# never closed", true),
            Err(RenderError::Syntax { .. })
        ));
    }
}
