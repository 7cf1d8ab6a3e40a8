//! Styled text fragments and inline line breaking.
//!
//! A [`Span`] is a slice of text with a color, an underline flag and an optional link target.
//! [`layout_spans`] breaks a sequence of spans into lines of a given width so custom elements can
//! draw each fragment themselves and know exactly where every link ends up.

use genpdf::style::{Color, Style};

use crate::fitter::TextMeasure;

/// A slice of text together with inline attributes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Span {
    text: String,
    color: Option<Color>,
    underline: bool,
    link: Option<String>,
}

impl Span {
    /// Creates a new span with the provided text and no attributes applied.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Returns the raw text contained in this span.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the configured color for the span, if any.
    pub fn color(&self) -> Option<Color> {
        self.color
    }

    /// Returns whether the span is marked as underlined.
    pub fn is_underlined(&self) -> bool {
        self.underline
    }

    /// Returns the anchor the span links to, if any.
    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    /// Convenience shorthand that marks the span as underlined.
    pub fn underline(mut self) -> Self {
        self.underline = true;
        self
    }

    /// Convenience shorthand that assigns a color to the span.
    pub fn colored(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Makes the span a link to `anchor`.  Empty anchors are ignored.
    pub fn linked(mut self, anchor: impl Into<String>) -> Self {
        let anchor = anchor.into();
        self.link = if anchor.is_empty() { None } else { Some(anchor) };
        self
    }

    /// Applies the span's color on top of `base`.
    pub fn style_on(&self, base: Style) -> Style {
        match self.color {
            Some(color) => base.with_color(color),
            None => base,
        }
    }
}

/// A run of text from a single span placed on a line.
#[derive(Clone, Debug, PartialEq)]
pub struct Fragment {
    /// Index of the originating span.
    pub span: usize,
    pub text: String,
    pub x: f64,
    pub width: f64,
}

/// One laid-out line.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Line {
    pub fragments: Vec<Fragment>,
    /// Position where the line's text ends.
    pub width: f64,
}

impl Line {
    fn push(&mut self, span: usize, text: &str, width: f64) {
        match self.fragments.last_mut() {
            Some(last) if last.span == span => {
                last.text.push_str(text);
                last.width += width;
            }
            _ => self.fragments.push(Fragment {
                span,
                text: text.to_owned(),
                x: self.width,
                width,
            }),
        }
        self.width += width;
    }

    fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Drops trailing whitespace so alignment and follow-up text start at the last glyph.
    fn trim_end(&mut self, measure: &dyn TextMeasure, font_size: f64) {
        while let Some(last) = self.fragments.last_mut() {
            let trimmed_len = last.text.trim_end().len();
            if trimmed_len == last.text.len() {
                break;
            }
            last.text.truncate(trimmed_len);
            last.width = measure.text_width(&last.text, font_size);
            if last.text.is_empty() {
                self.fragments.pop();
            }
        }
        self.width = self
            .fragments
            .last()
            .map(|last| last.x + last.width)
            .unwrap_or_default();
    }
}

/// Splits text into words that keep their trailing whitespace.
fn words(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let word_end = rest
            .char_indices()
            .find(|(_, c)| c.is_whitespace())
            .map(|(index, _)| index)
            .unwrap_or(rest.len());
        let end = rest[word_end..]
            .char_indices()
            .find(|(_, c)| !c.is_whitespace())
            .map(|(index, _)| word_end + index)
            .unwrap_or(rest.len());
        let (word, tail) = rest.split_at(end);
        rest = tail;
        Some(word)
    })
}

/// Breaks `spans` into lines no wider than `width`.
///
/// Words are kept whole where possible; a word wider than a full line (which is the normal case
/// for CJK text without spaces) is broken between characters.
pub fn layout_spans(
    spans: &[Span],
    measure: &dyn TextMeasure,
    font_size: f64,
    width: f64,
) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut line = Line::default();

    for (index, span) in spans.iter().enumerate() {
        for word in words(&span.text) {
            let word_width = measure.text_width(word, font_size);
            let visible_width = measure.text_width(word.trim_end(), font_size);

            if line.width + visible_width <= width {
                line.push(index, word, word_width);
                continue;
            }

            if !line.is_empty() && visible_width <= width {
                line.trim_end(measure, font_size);
                lines.push(std::mem::take(&mut line));
                line.push(index, word, word_width);
                continue;
            }

            for ch in word.chars() {
                let mut buf = [0u8; 4];
                let piece: &str = ch.encode_utf8(&mut buf);
                let piece_width = measure.text_width(piece, font_size);
                if line.width + piece_width > width && !line.is_empty() && !ch.is_whitespace() {
                    line.trim_end(measure, font_size);
                    lines.push(std::mem::take(&mut line));
                }
                line.push(index, piece, piece_width);
            }
        }
    }

    line.trim_end(measure, font_size);
    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitter::testing::MonospaceMeasure;

    const UNIT: MonospaceMeasure = MonospaceMeasure { advance: 1.0 };

    fn texts(line: &Line) -> Vec<&str> {
        line.fragments.iter().map(|f| f.text.as_str()).collect()
    }

    #[test]
    fn words_keep_trailing_whitespace() {
        let collected: Vec<_> = words("see  page 7").collect();
        assert_eq!(collected, ["see  ", "page ", "7"]);
    }

    #[test]
    fn fits_on_one_line() {
        let spans = [Span::new("drug1: "), Span::new("7").linked("x")];
        let lines = layout_spans(&spans, &UNIT, 1.0, 20.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(texts(&lines[0]), ["drug1: ", "7"]);
        assert_eq!(lines[0].fragments[1].x, 7.0);
        assert_eq!(lines[0].width, 8.0);
    }

    #[test]
    fn wraps_between_words() {
        let spans = [Span::new("alpha beta gamma")];
        let lines = layout_spans(&spans, &UNIT, 1.0, 11.0);
        assert_eq!(lines.len(), 2);
        assert_eq!(texts(&lines[0]), ["alpha beta"]);
        assert_eq!(lines[0].width, 10.0);
        assert_eq!(texts(&lines[1]), ["gamma"]);
        assert_eq!(lines[1].fragments[0].x, 0.0);
    }

    #[test]
    fn breaks_long_words_between_characters() {
        let spans = [Span::new("這是文字這是文字")];
        let lines = layout_spans(&spans, &UNIT, 1.0, 3.0);
        let rendered: Vec<_> = lines.iter().map(|line| texts(line).concat()).collect();
        assert_eq!(rendered, ["這是文", "字這是", "文字"]);
    }

    #[test]
    fn link_fragments_keep_their_span_index() {
        let spans = [
            Span::new("see "),
            Span::new("12").linked("a1").underline(),
            Span::new(", "),
            Span::new("34").linked("a2").underline(),
        ];
        let lines = layout_spans(&spans, &UNIT, 1.0, 100.0);
        let linked: Vec<_> = lines[0]
            .fragments
            .iter()
            .filter(|f| spans[f.span].link().is_some())
            .map(|f| (f.text.as_str(), f.x))
            .collect();
        assert_eq!(linked, [("12", 4.0), ("34", 8.0)]);
    }

    #[test]
    fn empty_input_yields_one_empty_line() {
        let lines = layout_spans(&[], &UNIT, 1.0, 10.0);
        assert_eq!(lines, vec![Line::default()]);
    }

    #[test]
    fn empty_link_anchor_is_ignored() {
        assert_eq!(Span::new("7").linked("").link(), None);
    }
}
