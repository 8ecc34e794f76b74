//! Terminal rendering of assistant markdown.
//!
//! Answers are rendered line by line so streamed output can be printed as
//! soon as a line is complete. Fenced code blocks are the exception: they are
//! held back until the closing fence arrives and rendered as one block.

use crossterm::style::{Attribute, Color, ContentStyle};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

const CODE_INDENT: &str = "    ";
const RULE_WIDTH: usize = 40;

/// Incremental renderer fed with streamed text.
///
/// [`push`](Self::push) returns whatever became printable;
/// [`finish`](Self::finish) flushes the rest at the end of the answer.
#[derive(Debug, Default)]
pub struct MarkdownStream {
    pending: String,
    fence: Option<Fence>,
}

#[derive(Debug)]
struct Fence {
    marker: String,
    text: String,
}

impl MarkdownStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &str) -> String {
        self.pending.push_str(chunk);
        let mut out = String::new();
        while let Some(end) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=end).collect();
            self.feed_line(&line, &mut out);
        }
        out
    }

    pub fn finish(&mut self) -> String {
        let mut out = String::new();
        let rest = std::mem::take(&mut self.pending);
        if !rest.is_empty() {
            self.feed_line(&rest, &mut out);
        }
        // An unclosed fence is still shown as code.
        if let Some(fence) = self.fence.take() {
            out.push_str(&render_markdown(&fence.text));
        }
        out
    }

    fn feed_line(&mut self, line: &str, out: &mut String) {
        if let Some(fence) = self.fence.as_mut() {
            fence.text.push_str(line);
            if closes_fence(line, &fence.marker) {
                out.push_str(&render_markdown(&fence.text));
                self.fence = None;
            }
            return;
        }

        if let Some(marker) = opening_fence(line) {
            self.fence = Some(Fence {
                marker,
                text: line.to_string(),
            });
            return;
        }

        out.push_str(&render_line(line));
    }
}

/// Render a whole answer at once.
pub fn render_answer(text: &str) -> String {
    let mut stream = MarkdownStream::new();
    let mut out = stream.push(text);
    out.push_str(&stream.finish());
    out
}

/// The run of backticks or tildes opening a fence, if `line` opens one.
fn opening_fence(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    let first = trimmed.chars().next()?;
    if first != '`' && first != '~' {
        return None;
    }
    let marker: String = trimmed.chars().take_while(|&c| c == first).collect();
    (marker.len() >= 3).then_some(marker)
}

fn closes_fence(line: &str, marker: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with(marker) && trimmed.chars().all(|c| Some(c) == marker.chars().next())
}

/// One line outside a code fence. Leading indentation is kept as-is so
/// nested list items do not turn into indented code.
fn render_line(line: &str) -> String {
    let line = line.trim_end_matches(['\n', '\r']);
    if line.trim().is_empty() {
        return "\n".to_string();
    }
    let body = line.trim_start();
    let indent = &line[..line.len() - body.len()];

    let rendered = render_markdown(body);
    let mut out = String::with_capacity(indent.len() + rendered.len() + 1);
    out.push_str(indent);
    out.push_str(&rendered);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

// ─── Event renderer ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Renderer {
    out: String,
    strong: usize,
    emphasis: usize,
    strike: usize,
    heading: Option<u8>,
    quote_depth: usize,
    lists: Vec<Option<u64>>,
    code_block: bool,
    links: Vec<(String, String)>,
}

/// Render markdown to styled terminal text.
pub fn render_markdown(markdown: &str) -> String {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let mut r = Renderer::default();
    for event in Parser::new_ext(markdown, options) {
        r.event(event);
    }
    r.out
}

impl Renderer {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if self.code_block {
                    self.code_text(&text);
                } else {
                    self.text(&text);
                }
            }
            Event::Code(code) => {
                self.begin_line();
                let style = with_color(ContentStyle::new(), Color::Yellow);
                self.out.push_str(&style.apply(&*code).to_string());
                self.track_link_text(&code);
            }
            Event::SoftBreak | Event::HardBreak => self.out.push('\n'),
            Event::Rule => {
                self.begin_line();
                let style = with_color(ContentStyle::new(), Color::DarkGrey);
                self.out.push_str(&style.apply("─".repeat(RULE_WIDTH)).to_string());
                self.out.push('\n');
            }
            Event::TaskListMarker(done) => self.out.push_str(if done { "[x] " } else { "[ ] " }),
            Event::Html(html) | Event::InlineHtml(html) => self.text(&html),
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.begin_line();
                self.heading = Some(level as u8);
            }
            Tag::BlockQuote { .. } => self.quote_depth += 1,
            Tag::List(first) => self.lists.push(first),
            Tag::Item => {
                self.begin_line();
                let depth = self.lists.len().saturating_sub(1);
                self.out.push_str(&"  ".repeat(depth));
                let bullet = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let bullet = format!("{n}. ");
                        *n += 1;
                        bullet
                    }
                    _ => "• ".to_string(),
                };
                let style = with_color(ContentStyle::new(), Color::Cyan);
                self.out.push_str(&style.apply(bullet).to_string());
            }
            Tag::CodeBlock(kind) => {
                self.begin_line();
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        let style = with_color(ContentStyle::new(), Color::DarkGrey);
                        self.out.push_str(&style.apply(format!("── {lang}")).to_string());
                        self.out.push('\n');
                    }
                }
                self.code_block = true;
            }
            Tag::Emphasis => self.emphasis += 1,
            Tag::Strong => self.strong += 1,
            Tag::Strikethrough => self.strike += 1,
            Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. } => {
                self.links.push((dest_url.to_string(), String::new()));
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.end_line(),
            TagEnd::Heading { .. } => {
                self.heading = None;
                self.end_line();
            }
            TagEnd::BlockQuote { .. } => self.quote_depth = self.quote_depth.saturating_sub(1),
            TagEnd::List { .. } => {
                self.lists.pop();
            }
            TagEnd::Item => self.end_line(),
            TagEnd::CodeBlock => self.code_block = false,
            TagEnd::Emphasis => self.emphasis = self.emphasis.saturating_sub(1),
            TagEnd::Strong => self.strong = self.strong.saturating_sub(1),
            TagEnd::Strikethrough => self.strike = self.strike.saturating_sub(1),
            TagEnd::Link | TagEnd::Image => {
                if let Some((url, text)) = self.links.pop() {
                    if !url.is_empty() && url != text {
                        let style = with_color(ContentStyle::new(), Color::DarkGrey);
                        self.out.push_str(&style.apply(format!(" ({url})")).to_string());
                    }
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        self.begin_line();
        let style = self.inline_style();
        if style == ContentStyle::default() {
            self.out.push_str(text);
        } else {
            self.out.push_str(&style.apply(text).to_string());
        }
        self.track_link_text(text);
    }

    fn code_text(&mut self, text: &str) {
        let style = with_color(ContentStyle::new(), Color::Yellow);
        for line in text.split_inclusive('\n') {
            let (code, newline) = match line.strip_suffix('\n') {
                Some(code) => (code, "\n"),
                None => (line, ""),
            };
            self.out.push_str(CODE_INDENT);
            self.out.push_str(&style.apply(code).to_string());
            self.out.push_str(newline);
        }
    }

    fn track_link_text(&mut self, text: &str) {
        if let Some((_, link_text)) = self.links.last_mut() {
            link_text.push_str(text);
        }
    }

    /// Quote bars at the start of a fresh line.
    fn begin_line(&mut self) {
        if self.quote_depth > 0 && (self.out.is_empty() || self.out.ends_with('\n')) {
            let style = with_color(ContentStyle::new(), Color::DarkGrey);
            self.out.push_str(&style.apply("│ ".repeat(self.quote_depth)).to_string());
        }
    }

    fn end_line(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn inline_style(&self) -> ContentStyle {
        let mut style = ContentStyle::new();
        if let Some(level) = self.heading {
            style = with_color(style, Color::Cyan);
            style.attributes.set(Attribute::Bold);
            if level == 1 {
                style.attributes.set(Attribute::Underlined);
            }
        }
        if self.strong > 0 {
            style.attributes.set(Attribute::Bold);
        }
        if self.emphasis > 0 {
            style.attributes.set(Attribute::Italic);
        }
        if self.strike > 0 {
            style.attributes.set(Attribute::CrossedOut);
        }
        style
    }
}

fn with_color(mut style: ContentStyle, color: Color) -> ContentStyle {
    style.foreground_color = Some(color);
    style
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn plain(rendered: &str) -> String {
        Regex::new(r"\x1b\[[0-9;]*m")
            .unwrap()
            .replace_all(rendered, "")
            .into_owned()
    }

    #[test]
    fn test_heading_and_paragraph() {
        let out = render_answer("# Title\n\nSome **bold** and *soft* text.\n");
        assert_eq!(plain(&out), "Title\n\nSome bold and soft text.\n");
    }

    #[test]
    fn test_lists_keep_numbers_and_nesting() {
        let out = render_answer("1. first\n2. second\n  - nested\n- plain\n");
        assert_eq!(plain(&out), "1. first\n2. second\n  • nested\n• plain\n");
    }

    #[test]
    fn test_code_block_is_indented_with_language() {
        let out = render_answer("Look:\n```go\nfunc main() {\n}\n```\nDone.\n");
        assert_eq!(
            plain(&out),
            "Look:\n── go\n    func main() {\n    }\nDone.\n"
        );
    }

    #[test]
    fn test_links_show_target() {
        let out = render_answer("See [docs](https://example.com) or <https://x.dev>.\n");
        assert_eq!(
            plain(&out),
            "See docs (https://example.com) or https://x.dev.\n"
        );
    }

    #[test]
    fn test_quote_rule_and_inline_code() {
        let out = render_answer("> careful\n---\nRun `make`.\n");
        assert_eq!(
            plain(&out),
            format!("│ careful\n{}\nRun make.\n", "─".repeat(RULE_WIDTH))
        );
    }

    #[test]
    fn test_stream_emits_complete_lines_only() {
        let mut stream = MarkdownStream::new();
        assert_eq!(stream.push("Hel"), "");
        assert_eq!(plain(&stream.push("lo\nwor")), "Hello\n");
        assert_eq!(stream.push("ld"), "");
        assert_eq!(plain(&stream.finish()), "world\n");
    }

    #[test]
    fn test_stream_holds_fence_until_closed() {
        let mut stream = MarkdownStream::new();
        assert_eq!(stream.push("```rust\nlet x = 1;\n"), "");
        let out = plain(&stream.push("```\n"));
        assert_eq!(out, "── rust\n    let x = 1;\n");
    }

    #[test]
    fn test_unclosed_fence_flushed_on_finish() {
        let mut stream = MarkdownStream::new();
        stream.push("```\nx = 1\n");
        assert_eq!(plain(&stream.finish()), "    x = 1\n");
    }

    #[test]
    fn test_fence_detection() {
        assert_eq!(opening_fence("```python\n").as_deref(), Some("```"));
        assert_eq!(opening_fence("  ~~~~\n").as_deref(), Some("~~~~"));
        assert_eq!(opening_fence("``inline``\n"), None);
        assert!(closes_fence("```\n", "```"));
        assert!(!closes_fence("```go\n", "```"));
    }
}
