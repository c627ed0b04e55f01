//! HTML markup accumulation
//!
//! [`MarkupBuilder`] is a string buffer with just enough structure to keep
//! generated HTML readable and balanced: it indents nested elements, keeps a
//! stack of open tags so closing never needs to repeat a tag name, and lets a
//! caller check that a fragment left the stack where it found it.
//!
//! Elements can be written in one step with [`MarkupBuilder::open_tag`], or in
//! three phases for elements whose attributes are assembled piecemeal:
//!
//! ```ignore
//! let mut m = MarkupBuilder::new();
//! m.tg_open("div id='x'").style("width:10em").tg_content();
//! m.a("hello").cr();
//! m.tg_close();
//! ```
//!
//! Closing a three-phase element whose content was never opened produces an
//! empty element (or a bare tag for void elements such as `input`).

use std::fmt::Display;

/// Elements that never have a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const MAX_DEPTH: usize = 100;
const INDENT: &str = "  ";

/// Opaque marker returned by [`MarkupBuilder::verify_begin`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerifyToken(usize);

/// Builder for HTML text
#[derive(Debug, Default)]
pub struct MarkupBuilder {
    buf: String,
    /// Names of elements whose content is currently open
    tags: Vec<String>,
    /// Element started by `tg_open` whose opening tag is not yet terminated
    pending: Option<String>,
    line_start: bool,
}

impl MarkupBuilder {
    pub fn new() -> Self {
        Self {
            line_start: true,
            ..Default::default()
        }
    }

    /// Append raw text
    pub fn a(&mut self, text: &str) -> &mut Self {
        if text.is_empty() {
            return self;
        }
        if self.line_start && !text.starts_with('\n') {
            for _ in 0..self.tags.len() {
                self.buf.push_str(INDENT);
            }
        }
        self.buf.push_str(text);
        self.line_start = text.ends_with('\n');
        self
    }

    /// Append any displayable value
    pub fn pr(&mut self, value: impl Display) -> &mut Self {
        self.a(&value.to_string())
    }

    /// Ensure the next text starts on a fresh line
    pub fn cr(&mut self) -> &mut Self {
        if !self.line_start {
            self.buf.push('\n');
            self.line_start = true;
        }
        self
    }

    pub fn br(&mut self) -> &mut Self {
        self.cr().a("<br>\n")
    }

    pub fn comment(&mut self, text: &str) -> &mut Self {
        assert!(!text.contains("-->"), "comment text contains a terminator");
        self.cr().a("<!-- ").a(text).a(" -->\n")
    }

    /// Append text with HTML special characters escaped
    pub fn escape(&mut self, text: &str) -> &mut Self {
        let escaped = html_escape::encode_text(text);
        self.a(&escaped)
    }

    /// Append text escaped for use inside a single-quoted attribute
    pub fn escape_attr(&mut self, text: &str) -> &mut Self {
        let escaped = html_escape::encode_single_quoted_attribute(text);
        self.a(&escaped)
    }

    /// Append multi-line text as a sequence of escaped paragraphs; blank
    /// lines are dropped
    pub fn paragraphs(&mut self, text: &str) -> &mut Self {
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            self.cr().a("<p>").escape(line).a("</p>\n");
        }
        self
    }

    /// Write `<expr>` and indent until the matching [`close_tag`](Self::close_tag)
    pub fn open_tag(&mut self, expr: &str) -> &mut Self {
        self.tg_open(expr).tg_content()
    }

    /// Close the innermost open element
    pub fn close_tag(&mut self) -> &mut Self {
        assert!(
            self.pending.is_none(),
            "close_tag while an opening tag is unterminated"
        );
        let Some(name) = self.tags.pop() else {
            panic!("close_tag with no open element");
        };
        self.cr().a("</").a(&name).a(">\n")
    }

    /// Write a complete element that has no content, e.g. `<img ...>`
    pub fn void_tag(&mut self, expr: &str) -> &mut Self {
        self.tg_open(expr).tg_close()
    }

    /// Begin an opening tag; attributes may follow until `tg_content` or `tg_close`
    pub fn tg_open(&mut self, expr: &str) -> &mut Self {
        assert!(
            self.pending.is_none(),
            "tg_open while another opening tag is unterminated"
        );
        assert!(self.tags.len() < MAX_DEPTH, "markup nested too deeply");
        let name = tag_name(expr);
        assert!(!name.is_empty(), "tag expression has no element name: {expr:?}");
        self.cr().a("<").a(expr);
        self.pending = Some(name.to_string());
        self
    }

    /// Add a `style` attribute to the tag begun by `tg_open`
    pub fn style(&mut self, css: &str) -> &mut Self {
        assert!(self.pending.is_some(), "style() outside an opening tag");
        self.a(" style='").escape_attr(css).a("'")
    }

    /// Add an arbitrary attribute to the tag begun by `tg_open`
    pub fn attr(&mut self, name: &str, value: &str) -> &mut Self {
        assert!(self.pending.is_some(), "attr() outside an opening tag");
        self.a(" ").a(name).a("='").escape_attr(value).a("'")
    }

    /// Terminate the opening tag and start the element's content
    pub fn tg_content(&mut self) -> &mut Self {
        let Some(name) = self.pending.take() else {
            panic!("tg_content without tg_open");
        };
        self.a(">\n");
        self.tags.push(name);
        self
    }

    /// Close the element begun by `tg_open`
    pub fn tg_close(&mut self) -> &mut Self {
        match self.pending.take() {
            Some(name) if VOID_ELEMENTS.contains(&name.as_str()) => self.a(">\n"),
            Some(name) => self.a("></").a(&name).a(">\n"),
            None => self.close_tag(),
        }
    }

    /// Placeholder for a widget that is not shown, keeping its id addressable
    pub fn render_invisible(&mut self, id: &str, tag: &str) -> &mut Self {
        self.tg_open(tag)
            .attr("id", id)
            .a(" hidden")
            .tg_close()
    }

    /// Record the current nesting depth
    pub fn verify_begin(&self) -> VerifyToken {
        VerifyToken(self.tags.len())
    }

    /// Check that the fragment written since `verify_begin` was balanced
    pub fn verify_end(&self, token: VerifyToken, context: &str) {
        if self.pending.is_some() || self.tags.len() != token.0 {
            panic!(
                "unbalanced markup from {context}: depth {} before, {} after (open: {:?})",
                token.0,
                self.tags.len(),
                self.tags
            );
        }
    }

    /// Depth of currently open elements
    pub fn depth(&self) -> usize {
        self.tags.len()
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consume the builder; every element must have been closed
    pub fn into_string(self) -> String {
        assert!(
            self.tags.is_empty() && self.pending.is_none(),
            "markup finished with open elements: {:?}",
            self.tags
        );
        self.buf
    }
}

/// The element name at the start of a tag expression
fn tag_name(expr: &str) -> &str {
    expr.split(|c: char| c.is_whitespace() || c == '>')
        .next()
        .unwrap_or("")
}
