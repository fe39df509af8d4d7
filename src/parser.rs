use crate::ast::Node;
use crate::attributed::AttributedText;
use crate::error::{SyntaxError, SyntaxErrorKind};

type ParseResult<T> = Result<T, SyntaxError>;

struct Parser<'a, A> {
    source: &'a AttributedText<A>,
    input: &'a str,
    pos: usize,
    /// Current line number (1-indexed)
    line: usize,
    /// The starting location of the current line
    line_start_pos: usize,
}

impl<'a, A: Clone> Parser<'a, A> {
    fn new(source: &'a AttributedText<A>) -> Self {
        Parser {
            source,
            input: source.text(),
            pos: 0,
            line: 1,
            line_start_pos: 0,
        }
    }

    #[inline]
    fn current_column(&self) -> usize {
        self.pos - self.line_start_pos + 1
    }

    #[inline]
    fn make_error(&self, kind: SyntaxErrorKind) -> SyntaxError {
        SyntaxError {
            line: self.line,
            column: self.current_column(),
            kind,
        }
    }

    /// Builds an error anchored at a previously recorded position, used to
    /// point at the opening delimiter of the tag that went wrong.
    #[inline]
    fn make_error_at(&self, line: usize, column: usize, kind: SyntaxErrorKind) -> SyntaxError {
        SyntaxError { line, column, kind }
    }

    /// Advances the parser position by char_len bytes, correctly handling
    /// multi-byte characters. Updates line and column numbers if a newline is
    /// encountered.
    #[inline]
    fn advance_by_char(&mut self, current_char: char, char_len: usize) {
        if current_char == '\n' {
            self.line += 1;
            self.line_start_pos = self.pos + char_len;
        }
        self.pos += char_len;
    }

    /// Advances the parser position by `len` bytes. Only valid for consumed
    /// text known to contain no newlines (the fixed delimiters), otherwise
    /// line/column tracking would drift.
    #[inline]
    fn advance_bytes_no_newline(&mut self, len: usize) {
        self.pos += len;
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Peek if the remaining input starts with `s`
    fn peek(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    /// Consume `s` if the remaining input starts with it.
    /// Assumes `s` does not contain newlines.
    fn consume(&mut self, s: &str) -> bool {
        if self.peek(s) {
            self.advance_bytes_no_newline(s.len());
            true
        } else {
            false
        }
    }

    /// Advances until the remaining input starts with `delim`, returning
    /// the position where it was found, or `None` after consuming the rest
    /// of the input. Tracks newlines, so tag bodies may span lines.
    fn scan_until(&mut self, delim: &str) -> Option<usize> {
        while !self.eof() {
            if self.peek(delim) {
                return Some(self.pos);
            }
            let current_char = self.input[self.pos..].chars().next().unwrap(); // Safe due to !eof()
            self.advance_by_char(current_char, current_char.len_utf8());
        }
        None
    }

    /// Consumes a tag body up to and including `closer`, returning the byte
    /// range of the body. The opening delimiter must already be consumed;
    /// `open_line`/`open_column` anchor the error on the opening tag.
    fn tag_body(
        &mut self,
        closer: &str,
        open_line: usize,
        open_column: usize,
    ) -> ParseResult<(usize, usize)> {
        let start = self.pos;
        match self.scan_until(closer) {
            Some(end) => {
                self.advance_bytes_no_newline(closer.len());
                Ok((start, end))
            }
            None => Err(self.make_error_at(
                open_line,
                open_column,
                SyntaxErrorKind::UnclosedTag {
                    expected: closer.to_string(),
                },
            )),
        }
    }

    /// Shrinks a tag body range to its whitespace-trimmed name region.
    fn trim_range(&self, start: usize, end: usize) -> (usize, usize) {
        let raw = &self.input[start..end];
        let trimmed = raw.trim();
        let leading = raw.len() - raw.trim_start().len();
        (start + leading, start + leading + trimmed.len())
    }

    /// Consumes a tag body and returns the trimmed name as a plain string
    /// slice. Errors if the name is empty after trimming.
    fn tag_name(
        &mut self,
        closer: &str,
        open_line: usize,
        open_column: usize,
    ) -> ParseResult<&'a str> {
        let (start, end) = self.tag_body(closer, open_line, open_column)?;
        let (name_start, name_end) = self.trim_range(start, end);
        if name_start == name_end {
            return Err(self.make_error_at(open_line, open_column, SyntaxErrorKind::EmptyTagName));
        }
        let input: &'a str = self.input;
        Ok(&input[name_start..name_end])
    }

    /// Like [`tag_name`](Self::tag_name), but returns the attributed slice
    /// of the name region so the tag site's attributes travel with the node.
    fn tag_run(
        &mut self,
        closer: &str,
        open_line: usize,
        open_column: usize,
    ) -> ParseResult<AttributedText<A>> {
        let (start, end) = self.tag_body(closer, open_line, open_column)?;
        let (name_start, name_end) = self.trim_range(start, end);
        if name_start == name_end {
            return Err(self.make_error_at(open_line, open_column, SyntaxErrorKind::EmptyTagName));
        }
        Ok(self.source.slice(name_start..name_end))
    }

    /// Parses one tag starting at `{{`. Returns `None` for comments, which
    /// produce no node.
    fn parse_tag(&mut self) -> ParseResult<Option<Node<A>>> {
        let (line, column) = (self.line, self.current_column());

        if self.consume("{{{") {
            let run = self.tag_run("}}}", line, column)?;
            return Ok(Some(Node::UnescapedTag(run)));
        }

        self.advance_bytes_no_newline(2); // "{{"

        if self.consume("&") {
            let run = self.tag_run("}}", line, column)?;
            Ok(Some(Node::UnescapedTag(run)))
        } else if self.consume("#") {
            let name = self.tag_name("}}", line, column)?;
            let children = self.parse_nodes(Some(name))?;
            Ok(Some(Node::Section(name.to_string(), children)))
        } else if self.consume("^") {
            let name = self.tag_name("}}", line, column)?;
            let children = self.parse_nodes(Some(name))?;
            Ok(Some(Node::InvertedSection(name.to_string(), children)))
        } else if self.consume(">") {
            let name = self.tag_name("}}", line, column)?;
            Ok(Some(Node::Partial(name.to_string())))
        } else if self.consume("!") {
            self.tag_body("}}", line, column)?;
            Ok(None)
        } else {
            let run = self.tag_run("}}", line, column)?;
            Ok(Some(Node::Tag(run)))
        }
    }

    /// Parses nodes until EOF (top level) or the close tag of `enclosing`.
    /// When `enclosing` is set, the matching `{{/name}}` is consumed before
    /// returning.
    fn parse_nodes(&mut self, enclosing: Option<&str>) -> ParseResult<Vec<Node<A>>> {
        let mut nodes = Vec::new();
        loop {
            if self.eof() {
                return match enclosing {
                    Some(name) => Err(self.make_error(SyntaxErrorKind::UnclosedSection {
                        name: name.to_string(),
                    })),
                    None => Ok(nodes),
                };
            }

            if self.peek("{{/") {
                let (line, column) = (self.line, self.current_column());
                self.advance_bytes_no_newline(3);
                let found = self.tag_name("}}", line, column)?;
                return match enclosing {
                    Some(name) if name == found => Ok(nodes),
                    Some(name) => Err(self.make_error_at(
                        line,
                        column,
                        SyntaxErrorKind::SectionMismatch {
                            expected: name.to_string(),
                            found: found.to_string(),
                        },
                    )),
                    None => Err(self.make_error_at(
                        line,
                        column,
                        SyntaxErrorKind::UnexpectedSectionClose {
                            name: found.to_string(),
                        },
                    )),
                };
            }

            if self.peek("{{") {
                if let Some(node) = self.parse_tag()? {
                    nodes.push(node);
                }
                continue;
            }

            // Literal text up to the next tag. At least one char is
            // consumed here, so the Text node is never empty.
            let start = self.pos;
            while !self.eof() && !self.peek("{{") {
                let current_char = self.input[self.pos..].chars().next().unwrap();
                self.advance_by_char(current_char, current_char.len_utf8());
            }
            nodes.push(Node::Text(self.source.slice(start..self.pos)));
        }
    }
}

/// Parses an attributed template source into a [`Node::Global`] tree.
pub(crate) fn parse<A: Clone>(source: &AttributedText<A>) -> Result<Node<A>, SyntaxError> {
    let mut parser = Parser::new(source);
    let nodes = parser.parse_nodes(None)?;
    Ok(Node::Global(nodes))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Helper macros for quick AST node creation in tests
    macro_rules! text {
        ($data:expr) => {
            Node::Text(AttributedText::from($data))
        };
    }
    macro_rules! tag {
        ($name:expr) => {
            Node::Tag(AttributedText::from($name))
        };
    }
    macro_rules! raw_tag {
        ($name:expr) => {
            Node::UnescapedTag(AttributedText::from($name))
        };
    }

    fn parse_str(input: &str) -> Result<Node, SyntaxError> {
        parse(&AttributedText::from(input))
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_empty_input() {
        assert_eq!(parse_str("").unwrap(), Node::Global(vec![]));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_simple_text() {
        assert_eq!(
            parse_str("hello world").unwrap(),
            Node::Global(vec![text!("hello world")])
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_simple_tag() {
        assert_eq!(
            parse_str("{{name}}").unwrap(),
            Node::Global(vec![tag!("name")])
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_tag_with_whitespace() {
        assert_eq!(
            parse_str("{{ name }}").unwrap(),
            Node::Global(vec![tag!("name")])
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_text_and_tag() {
        assert_eq!(
            parse_str("Hello {{name}}!").unwrap(),
            Node::Global(vec![text!("Hello "), tag!("name"), text!("!")])
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_adjacent_tags_no_spurious_text() {
        assert_eq!(
            parse_str("{{first}}{{second}}").unwrap(),
            Node::Global(vec![tag!("first"), tag!("second")])
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_triple_brace_unescaped() {
        assert_eq!(
            parse_str("{{{html}}}").unwrap(),
            Node::Global(vec![raw_tag!("html")])
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_ampersand_unescaped() {
        assert_eq!(
            parse_str("{{& html }}").unwrap(),
            Node::Global(vec![raw_tag!("html")])
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_triple_brace_with_trailing_text() {
        assert_eq!(
            parse_str("{{{html}}}}").unwrap(),
            Node::Global(vec![raw_tag!("html"), text!("}")])
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_partial() {
        assert_eq!(
            parse_str("{{> user }}").unwrap(),
            Node::Global(vec![Node::Partial("user".to_string())])
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_comment_produces_no_node() {
        assert_eq!(
            parse_str("a{{! ignore me }}b").unwrap(),
            Node::Global(vec![text!("a"), text!("b")])
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_comment_spanning_lines() {
        assert_eq!(
            parse_str("{{! line one\nline two }}{{name}}").unwrap(),
            Node::Global(vec![tag!("name")])
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_section() {
        assert_eq!(
            parse_str("{{#items}}x{{/items}}").unwrap(),
            Node::Global(vec![Node::Section(
                "items".to_string(),
                vec![text!("x")]
            )])
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_empty_section() {
        assert_eq!(
            parse_str("{{#items}}{{/items}}").unwrap(),
            Node::Global(vec![Node::Section("items".to_string(), vec![])])
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_inverted_section() {
        assert_eq!(
            parse_str("{{^items}}none{{/items}}").unwrap(),
            Node::Global(vec![Node::InvertedSection(
                "items".to_string(),
                vec![text!("none")]
            )])
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_nested_sections() {
        assert_eq!(
            parse_str("{{#outer}}{{#inner}}{{x}}{{/inner}}{{/outer}}").unwrap(),
            Node::Global(vec![Node::Section(
                "outer".to_string(),
                vec![Node::Section("inner".to_string(), vec![tag!("x")])]
            )])
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_section_with_whitespace_in_tags() {
        assert_eq!(
            parse_str("{{# items }}x{{/ items }}").unwrap(),
            Node::Global(vec![Node::Section(
                "items".to_string(),
                vec![text!("x")]
            )])
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_section_containing_partial() {
        assert_eq!(
            parse_str("{{#names}}{{> user}}{{/names}}").unwrap(),
            Node::Global(vec![Node::Section(
                "names".to_string(),
                vec![Node::Partial("user".to_string())]
            )])
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_error_unclosed_tag() {
        let err = parse_str("text {{var").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 6);
        assert!(
            matches!(err.kind, SyntaxErrorKind::UnclosedTag { ref expected } if expected == "}}")
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_error_unclosed_triple_brace() {
        let err = parse_str("{{{var}}").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 1);
        assert!(
            matches!(err.kind, SyntaxErrorKind::UnclosedTag { ref expected } if expected == "}}}")
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_error_empty_tag_name() {
        let err = parse_str("{{}}").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 1);
        assert!(matches!(err.kind, SyntaxErrorKind::EmptyTagName));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_error_whitespace_only_tag_name() {
        let err = parse_str("{{   }}").unwrap_err();
        assert!(matches!(err.kind, SyntaxErrorKind::EmptyTagName));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_error_empty_section_name() {
        let err = parse_str("{{#}}x{{/}}").unwrap_err();
        assert!(matches!(err.kind, SyntaxErrorKind::EmptyTagName));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_error_unclosed_section() {
        let input = "{{#items}}body";
        let err = parse_str(input).unwrap_err();
        // Reported at EOF, where the close tag should have appeared.
        assert_eq!(err.line, 1);
        assert_eq!(err.column, input.len() + 1);
        assert!(
            matches!(err.kind, SyntaxErrorKind::UnclosedSection { ref name } if name == "items")
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_error_unclosed_inverted_section() {
        let err = parse_str("{{^items}}body").unwrap_err();
        assert!(
            matches!(err.kind, SyntaxErrorKind::UnclosedSection { ref name } if name == "items")
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_error_section_close_mismatch() {
        let err = parse_str("{{#a}}body{{/b}}").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 11);
        assert!(matches!(
            err.kind,
            SyntaxErrorKind::SectionMismatch { ref expected, ref found }
                if expected == "a" && found == "b"
        ));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_error_mismatch_against_innermost_section() {
        // The close must match the innermost open section, not an ancestor.
        let err = parse_str("{{#a}}{{#b}}{{/a}}{{/a}}").unwrap_err();
        assert!(matches!(
            err.kind,
            SyntaxErrorKind::SectionMismatch { ref expected, ref found }
                if expected == "b" && found == "a"
        ));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_error_stray_section_close() {
        let err = parse_str("text{{/items}}").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 5);
        assert!(matches!(
            err.kind,
            SyntaxErrorKind::UnexpectedSectionClose { ref name } if name == "items"
        ));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_error_position_tracks_lines() {
        let err = parse_str("line one\nline two {{bad").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 10);
        assert!(matches!(err.kind, SyntaxErrorKind::UnclosedTag { .. }));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_multibyte_text_around_tags() {
        assert_eq!(
            parse_str("héllo {{nâme}} wörld").unwrap(),
            Node::Global(vec![text!("héllo "), tag!("nâme"), text!(" wörld")])
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_single_braces_are_text() {
        assert_eq!(
            parse_str("a { b } c").unwrap(),
            Node::Global(vec![text!("a { b } c")])
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_attributed_text_ranges_survive_parsing() {
        let mut source: AttributedText<&'static str> = AttributedText::new();
        source.push_run("Hi ", "bold");
        source.push_run("{{name}}", "italic");
        source.push_run("!", "bold");

        let tree = parse(&source).unwrap();
        let Node::Global(nodes) = tree else {
            panic!("Expected Global node");
        };
        assert_eq!(nodes.len(), 3);

        let Node::Text(leading) = &nodes[0] else {
            panic!("Expected leading Text node");
        };
        assert_eq!(leading.text(), "Hi ");
        assert_eq!(leading.attributes_at(0), Some(&"bold"));

        // The tag payload carries the tag site's attributes.
        let Node::Tag(name_run) = &nodes[1] else {
            panic!("Expected Tag node");
        };
        assert_eq!(name_run.text(), "name");
        assert_eq!(name_run.attributes_at(0), Some(&"italic"));

        let Node::Text(trailing) = &nodes[2] else {
            panic!("Expected trailing Text node");
        };
        assert_eq!(trailing.attributes_at(0), Some(&"bold"));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_text_spanning_attribute_runs_keeps_both() {
        let mut source: AttributedText<&'static str> = AttributedText::new();
        source.push_run("ab", "x");
        source.push_run("cd", "y");

        let tree = parse(&source).unwrap();
        let Node::Global(nodes) = tree else {
            panic!("Expected Global node");
        };
        let Node::Text(body) = &nodes[0] else {
            panic!("Expected Text node");
        };
        assert_eq!(
            body.runs().collect::<Vec<_>>(),
            vec![("ab", &"x"), ("cd", &"y")]
        );
    }
}
