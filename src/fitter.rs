//! Page-number text fitting for table of contents rows.
//!
//! The fitter takes the page numbers of one entry, joins them with `", "`, shrinks the font until
//! the string fits into the space left on the current line, and then places the string either
//! right aligned behind a dot leader or inline after a separator.  For every number that carries
//! an anchor it also reports the horizontal span that should become a clickable link.
//!
//! All lengths are in points and relative to the start of the line.  Measuring is delegated to a
//! [`TextMeasure`] so the arithmetic can be exercised without loading fonts.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, Visitor};

/// Smallest font size the fitter shrinks to.
pub const MIN_FONT_SIZE: f64 = 1.0;

/// Factor applied to the font size on every shrink step.
pub const SHRINK_FACTOR: f64 = 0.9;

/// Separator placed between multiple page numbers.
pub const NUMBER_SEPARATOR: &str = ", ";

/// Separator placed in front of the page numbers in inline mode.
pub const INLINE_SEPARATOR: &str = ",  ";

/// Measures rendered text widths.
pub trait TextMeasure {
    /// Width in points of `text` set at `font_size` points.
    fn text_width(&self, text: &str, font_size: f64) -> f64;
}

impl<M: TextMeasure + ?Sized> TextMeasure for &M {
    fn text_width(&self, text: &str, font_size: f64) -> f64 {
        (**self).text_width(text, font_size)
    }
}

/// Size a fractional font size is drawn at when only whole points can be set.
pub fn whole_point_size(size: f64) -> u8 {
    size.floor().clamp(MIN_FONT_SIZE, f64::from(u8::MAX)) as u8
}

/// Measures with the inner measure at [`whole_point_size`], so fitted text is measured at the
/// size it is drawn at.
pub struct WholePoints<M>(pub M);

impl<M: TextMeasure> TextMeasure for WholePoints<M> {
    fn text_width(&self, text: &str, font_size: f64) -> f64 {
        self.0.text_width(text, f64::from(whole_point_size(font_size)))
    }
}

/// How page numbers are attached to the entry text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Leader {
    /// Right align the numbers and fill the gap with repetitions of the string.  An empty string
    /// right aligns the numbers without filling the gap.
    Dots(String),
    /// Continue on the current line after [`INLINE_SEPARATOR`], without right alignment.
    Inline,
}

impl Default for Leader {
    fn default() -> Self {
        Self::Dots(".".to_owned())
    }
}

/// Leaders are configured as a string (dot-leader mode) or `null` (inline mode).  Any other
/// value is rejected while the configuration is loaded.
impl<'de> Deserialize<'de> for Leader {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct LeaderVisitor;

        impl<'de> Visitor<'de> for LeaderVisitor {
            type Value = Leader;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a leader string (dot-leader mode) or null (inline mode)")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Leader, E> {
                Ok(Leader::Dots(value.to_owned()))
            }

            fn visit_string<E: de::Error>(self, value: String) -> Result<Leader, E> {
                Ok(Leader::Dots(value))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Leader, E> {
                Ok(Leader::Inline)
            }

            fn visit_none<E: de::Error>(self) -> Result<Leader, E> {
                Ok(Leader::Inline)
            }
        }

        deserializer.deserialize_any(LeaderVisitor)
    }
}

/// One page number together with the anchor it links to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRef {
    pub page: u32,
    pub anchor: Option<String>,
}

impl PageRef {
    pub fn new(page: u32, anchor: Option<String>) -> Self {
        Self { page, anchor }
    }
}

/// Horizontal extent of a linked page number.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkSpan {
    pub x: f64,
    pub width: f64,
    pub anchor: String,
}

/// Placement computed by [`fit_page_numbers`].
#[derive(Clone, Debug, PartialEq)]
pub struct FittedNumbers {
    /// Font size the numbers are set at.
    pub font_size: f64,
    /// The joined page numbers.
    pub numbers: String,
    /// Width of [`Self::numbers`] at [`Self::font_size`].
    pub numbers_width: f64,
    /// Start of the numbers.
    pub numbers_x: f64,
    /// Text drawn in front of the numbers: the dot leader or the inline separator.
    pub lead: String,
    /// Start of [`Self::lead`].
    pub lead_x: f64,
    /// Number of leader repetitions in [`Self::lead`].
    pub dot_count: usize,
    /// Clickable spans, one per anchored page number.
    pub links: Vec<LinkSpan>,
}

/// Joins page numbers the way they are displayed.
pub fn join_pages(pages: &[PageRef]) -> String {
    pages
        .iter()
        .map(|page| page.page.to_string())
        .collect::<Vec<_>>()
        .join(NUMBER_SEPARATOR)
}

/// Shrinks `nominal_size` in 10% steps until `text` fits into `free_width` or the size reaches
/// [`MIN_FONT_SIZE`].  Returns the chosen size and the width at that size.
pub fn fit_font_size(
    measure: &dyn TextMeasure,
    text: &str,
    nominal_size: f64,
    free_width: f64,
) -> (f64, f64) {
    let mut size = nominal_size;
    let mut width = measure.text_width(text, size);
    while width > free_width && size > MIN_FONT_SIZE {
        size = (size * SHRINK_FACTOR).max(MIN_FONT_SIZE);
        width = measure.text_width(text, size);
    }
    (size, width)
}

/// Places `pages` on a line whose text currently ends at `cursor_x` and which is
/// `available_width` wide.
pub fn fit_page_numbers(
    measure: &dyn TextMeasure,
    pages: &[PageRef],
    cursor_x: f64,
    available_width: f64,
    nominal_size: f64,
    leader: &Leader,
) -> FittedNumbers {
    let numbers = join_pages(pages);
    let free_width = available_width - cursor_x;
    let (font_size, numbers_width) = fit_font_size(measure, &numbers, nominal_size, free_width);

    let (lead, lead_x, dot_count, numbers_x) = match leader {
        Leader::Dots(dot) => {
            let dot_width = if dot.is_empty() {
                0.0
            } else {
                measure.text_width(dot, font_size)
            };
            let dot_count = if dot_width > 0.0 {
                ((free_width - numbers_width) / dot_width).floor().max(0.0) as usize
            } else {
                0
            };
            let numbers_x = available_width - numbers_width;
            let lead_x = numbers_x - dot_count as f64 * dot_width;
            (dot.repeat(dot_count), lead_x, dot_count, numbers_x)
        }
        Leader::Inline => {
            let separator_width = measure.text_width(INLINE_SEPARATOR, font_size);
            (
                INLINE_SEPARATOR.to_owned(),
                cursor_x,
                0,
                cursor_x + separator_width,
            )
        }
    };

    let separator_width = measure.text_width(NUMBER_SEPARATOR, font_size);
    let mut links = Vec::new();
    let mut x = numbers_x;
    for page in pages {
        let label = page.page.to_string();
        let width = measure.text_width(&label, font_size);
        if let Some(anchor) = page.anchor.as_deref().filter(|anchor| !anchor.is_empty()) {
            links.push(LinkSpan {
                x,
                width,
                anchor: anchor.to_owned(),
            });
        }
        x += width + separator_width;
    }

    FittedNumbers {
        font_size,
        numbers,
        numbers_width,
        numbers_x,
        lead,
        lead_x,
        dot_count,
        links,
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MonospaceMeasure;
    use super::*;

    const HALF_EM: MonospaceMeasure = MonospaceMeasure { advance: 0.5 };

    fn pages(numbers: &[(u32, Option<&str>)]) -> Vec<PageRef> {
        numbers
            .iter()
            .map(|(page, anchor)| PageRef::new(*page, anchor.map(str::to_owned)))
            .collect()
    }

    #[test]
    fn shrinks_to_largest_fitting_step() {
        // "123, 456" is eight characters, i.e. 4pt wide per point of font size.
        let (size, width) = fit_font_size(&HALF_EM, "123, 456", 12.0, 40.0);
        assert!((size - 9.72).abs() < 1e-9, "got {size}");
        assert!(width <= 40.0);
        // One step larger would not fit.
        assert!(HALF_EM.text_width("123, 456", size / SHRINK_FACTOR) > 40.0);
    }

    #[test]
    fn keeps_nominal_size_when_text_fits() {
        let (size, _) = fit_font_size(&HALF_EM, "7", 12.0, 100.0);
        assert_eq!(size, 12.0);
    }

    #[test]
    fn stops_at_floor_when_nothing_fits() {
        let (size, width) = fit_font_size(&HALF_EM, "123, 456", 12.0, 0.5);
        assert_eq!(size, MIN_FONT_SIZE);
        assert!(width > 0.5);
    }

    #[test]
    fn fitted_size_fits_or_reaches_floor() {
        for available in [0.0, 3.0, 17.5, 40.0, 41.0, 200.0] {
            let (size, width) = fit_font_size(&HALF_EM, "12, 345, 6789", 12.0, available);
            assert!(width <= available || size == MIN_FONT_SIZE);
        }
    }

    #[test]
    fn dot_leader_uses_maximum_count() {
        let refs = pages(&[(12, Some("a1"))]);
        let fitted = fit_page_numbers(&HALF_EM, &refs, 30.0, 100.0, 10.0, &Leader::default());
        let dot_width = HALF_EM.text_width(".", fitted.font_size);
        let used = fitted.dot_count as f64 * dot_width + fitted.numbers_width;
        assert!(used <= 70.0);
        assert!(used + dot_width > 70.0);
        assert_eq!(fitted.lead, ".".repeat(fitted.dot_count));
        assert!((fitted.numbers_x - 90.0).abs() < 1e-9);
        assert!((fitted.lead_x + used - 100.0).abs() < 1e-9);
    }

    #[test]
    fn whole_point_sizes_round_down() {
        assert_eq!(whole_point_size(9.72), 9);
        assert_eq!(whole_point_size(1.0), 1);
        assert_eq!(whole_point_size(0.4), 1);
        assert_eq!(whole_point_size(12.0), 12);
    }

    #[test]
    fn fitted_numbers_line_up_at_drawn_size() {
        let measure = WholePoints(HALF_EM);
        let refs = pages(&[(123, Some("a1")), (456, Some("a2"))]);
        let fitted = fit_page_numbers(&measure, &refs, 55.0, 100.0, 12.0, &Leader::default());

        // 12pt is too wide for the 45pt gap; 10.8pt is drawn at 10pt, where "123, 456" is 40pt.
        assert!((fitted.font_size - 10.8).abs() < 1e-9, "got {}", fitted.font_size);
        let drawn = f64::from(whole_point_size(fitted.font_size));
        assert_eq!(drawn, 10.0);

        let numbers_end = fitted.numbers_x + HALF_EM.text_width(&fitted.numbers, drawn);
        assert!((numbers_end - 100.0).abs() < 1e-9, "numbers end at {numbers_end}");

        let dot_width = HALF_EM.text_width(".", drawn);
        assert_eq!(fitted.dot_count, 1);
        assert!((fitted.lead_x + dot_width - fitted.numbers_x).abs() < 1e-9);
        assert!(fitted.lead_x >= 55.0);
        assert!(fitted.lead_x - dot_width < 55.0);

        assert!((fitted.links[0].width - HALF_EM.text_width("123", drawn)).abs() < 1e-9);
        let second = fitted.numbers_x + HALF_EM.text_width("123, ", drawn);
        assert!((fitted.links[1].x - second).abs() < 1e-9);
    }

    #[test]
    fn empty_leader_right_aligns_without_dots() {
        let refs = pages(&[(3, None)]);
        let fitted = fit_page_numbers(&HALF_EM, &refs, 10.0, 50.0, 10.0, &Leader::Dots(String::new()));
        assert_eq!(fitted.dot_count, 0);
        assert!(fitted.lead.is_empty());
        assert!((fitted.numbers_x - 45.0).abs() < 1e-9);
    }

    #[test]
    fn inline_mode_continues_from_cursor() {
        let refs = pages(&[(3, Some("a1")), (5, Some("a2"))]);
        let fitted = fit_page_numbers(&HALF_EM, &refs, 20.0, 200.0, 10.0, &Leader::Inline);
        assert_eq!(fitted.lead, INLINE_SEPARATOR);
        assert_eq!(fitted.lead_x, 20.0);
        assert!((fitted.numbers_x - 35.0).abs() < 1e-9);
        assert_eq!(fitted.numbers, "3, 5");
    }

    #[test]
    fn links_follow_each_number() {
        let refs = pages(&[(3, Some("a1")), (45, None), (6, Some("a3"))]);
        let fitted = fit_page_numbers(&HALF_EM, &refs, 0.0, 100.0, 10.0, &Leader::default());
        assert_eq!(fitted.links.len(), 2);
        assert_eq!(fitted.links[0].anchor, "a1");
        assert!((fitted.links[0].x - fitted.numbers_x).abs() < 1e-9);
        // "3, 45, " precede the third number.
        assert!((fitted.links[1].x - (fitted.numbers_x + 35.0)).abs() < 1e-9);
        assert!((fitted.links[1].width - 5.0).abs() < 1e-9);
    }

    #[test]
    fn empty_anchor_is_not_linked() {
        let refs = pages(&[(3, Some(""))]);
        let fitted = fit_page_numbers(&HALF_EM, &refs, 0.0, 100.0, 10.0, &Leader::default());
        assert!(fitted.links.is_empty());
    }

    #[test]
    fn leader_deserializes_from_string_or_null() {
        let dots: Leader = serde_json::from_str("\" . \"").expect("string leader");
        assert_eq!(dots, Leader::Dots(" . ".to_owned()));
        let inline: Leader = serde_json::from_str("null").expect("null leader");
        assert_eq!(inline, Leader::Inline);
    }

    #[test]
    fn leader_rejects_other_values() {
        let err = serde_json::from_str::<Leader>("3").unwrap_err();
        assert!(err.to_string().contains("leader string"), "{err}");
        assert!(serde_json::from_str::<Leader>("true").is_err());
    }
}
