use colored::{Color, Colorize};

use crate::lexer::LINE_FEED;

/// Stand-in glyph for a highlighted line feed, which would otherwise be invisible.
pub const ALT_LINE_FEED: &str = "█";

/// A token with a per-character highlight mask.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RichText {
    pub text: String,
    /// `mask[i]` is true when the `i`-th char differs from its counterpart.
    pub mask: Vec<bool>,
}

impl RichText {
    pub fn new(text: impl Into<String>, mask: Vec<bool>) -> Self {
        let text = text.into();
        debug_assert_eq!(text.chars().count(), mask.len());
        Self { text, mask }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        let mask = vec![false; text.chars().count()];
        Self { text, mask }
    }

    pub fn highlighted(text: impl Into<String>) -> Self {
        let text = text.into();
        let mask = vec![true; text.chars().count()];
        Self { text, mask }
    }

    pub fn is_colorful(&self) -> bool {
        self.mask.iter().any(|&b| b)
    }

    pub fn is_line_feed(&self) -> bool {
        self.text == LINE_FEED
    }

    /// Renders maximal runs of highlighted chars through `highlight`, leaving the rest as is.
    pub fn render_with(&self, highlight: impl Fn(&str) -> String) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut run = String::new();
        for (c, &hl) in self.text.chars().zip(&self.mask) {
            if hl {
                run.push(c);
                continue;
            }
            if !run.is_empty() {
                out += &highlight(&run);
                run.clear();
            }
            out.push(c);
        }
        if !run.is_empty() {
            out += &highlight(&run);
        }
        out
    }

    pub fn colorize(&self, color: Color) -> String {
        self.render_with(|s| s.color(color).to_string())
    }
}

/// Joins tokens with single spaces, starting afresh after each line feed.
pub fn dump_lexemes_with(xms: &[RichText], highlight: impl Fn(&str) -> String) -> String {
    let mut out = String::new();
    let mut at_line_start = true;
    for xm in xms {
        if xm.is_line_feed() {
            if xm.is_colorful() {
                out += &highlight(ALT_LINE_FEED);
            }
            out += LINE_FEED;
            at_line_start = true;
            continue;
        }
        if !at_line_start {
            out.push(' ');
        }
        out += &xm.render_with(&highlight);
        at_line_start = false;
    }
    out
}

pub fn dump_lexemes(xms: &[RichText], color: Color) -> String {
    dump_lexemes_with(xms, |s| s.color(color).to_string())
}

#[cfg(test)]
mod test {
    use super::*;

    fn brackets(s: &str) -> String {
        format!("[{}]", s)
    }

    #[test]
    fn test_render_with_groups_runs() {
        let rt = RichText::new("12345", vec![true, true, false, true, false]);
        assert_eq!(rt.render_with(brackets), "[12]3[4]5");
        assert!(rt.is_colorful());
        assert!(!RichText::plain("abc").is_colorful());
    }

    #[test]
    fn test_mask_counts_chars() {
        assert_eq!(RichText::highlighted("αβ").mask, vec![true, true]);
    }

    #[test]
    fn test_dump_lexemes_with() {
        let xms = vec![
            RichText::plain("1"),
            RichText::new("23", vec![false, true]),
            RichText::plain("\n"),
            RichText::plain("x"),
            RichText::highlighted("\n"),
        ];
        assert_eq!(dump_lexemes_with(&xms, brackets), "1 2[3]\nx[█]\n");
    }

    #[test]
    fn test_dump_lexemes_without_colors() {
        colored::control::set_override(false);
        let xms = vec![RichText::plain("a"), RichText::highlighted("b")];
        assert_eq!(dump_lexemes(&xms, Color::Red), "a b");
    }
}
