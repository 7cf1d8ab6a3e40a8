//! State shared between the page decorator and the elements during one layout pass.
//!
//! `genpdf` drives the pass: it calls the page decorator whenever a page starts and renders the
//! top-level elements one after another.  The [`PassRecorder`] handed to both keeps the running
//! page number and vertical cursor, and collects what the driver needs once the pass is done:
//! heading events, anchor positions and clickable link regions.

use std::cell::RefCell;
use std::rc::Rc;

use crate::toc::HeadingEvent;
use crate::units::mm_to_pt;

/// Position of the content frame on the page, in millimetres from the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageGeometry {
    pub page_width: f64,
    pub page_height: f64,
    pub content_left: f64,
    pub content_top: f64,
}

/// A placed anchor.  `top` is in PDF points from the bottom of the page.
#[derive(Clone, Debug, PartialEq)]
pub struct AnchorPlacement {
    pub name: String,
    pub page: u32,
    pub top: f64,
}

/// A clickable rectangle `[x1, y1, x2, y2]` in PDF points.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkRegion {
    pub page: u32,
    pub rect: [f64; 4],
    pub anchor: String,
}

/// Everything a finished pass produced.
#[derive(Clone, Debug, Default)]
pub struct PassCapture {
    pub pages: u32,
    pub events: Vec<HeadingEvent>,
    pub anchors: Vec<AnchorPlacement>,
    pub links: Vec<LinkRegion>,
}

#[derive(Debug)]
struct PassState {
    geometry: PageGeometry,
    page: u32,
    cursor: f64,
    block_top: f64,
    capture: PassCapture,
}

/// Cheaply cloneable handle to the state of the running pass.
#[derive(Clone, Debug)]
pub struct PassRecorder {
    state: Rc<RefCell<PassState>>,
}

impl PassRecorder {
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            state: Rc::new(RefCell::new(PassState {
                geometry,
                page: 0,
                cursor: 0.0,
                block_top: 0.0,
                capture: PassCapture::default(),
            })),
        }
    }

    /// Called by the page decorator for every new page; returns the new page number.
    pub fn begin_page(&self) -> u32 {
        let mut state = self.state.borrow_mut();
        state.page += 1;
        state.cursor = 0.0;
        state.block_top = 0.0;
        state.capture.pages = state.page;
        state.page
    }

    /// The page currently being laid out.
    pub fn page(&self) -> u32 {
        self.state.borrow().page
    }

    /// Marks the start of a top-level block at the current cursor.
    pub fn begin_block(&self) {
        let mut state = self.state.borrow_mut();
        state.block_top = state.cursor;
    }

    /// Moves the cursor below a top-level block of the given height (millimetres).
    pub fn advance(&self, height: f64) {
        self.state.borrow_mut().cursor += height;
    }

    pub fn record_heading(&self, event: HeadingEvent) {
        self.state.borrow_mut().capture.events.push(event);
    }

    /// Records an anchor `offset` millimetres below the top of the current block.
    pub fn record_anchor(&self, name: &str, offset: f64) {
        let mut state = self.state.borrow_mut();
        let geometry = state.geometry;
        let top = mm_to_pt(geometry.page_height - geometry.content_top - state.block_top - offset);
        let page = state.page;
        state.capture.anchors.push(AnchorPlacement {
            name: name.to_owned(),
            page,
            top,
        });
    }

    /// Records a link over a box given in millimetres relative to the top-left corner of the
    /// current block.
    pub fn record_link(&self, x: f64, y: f64, width: f64, height: f64, anchor: &str) {
        if anchor.is_empty() {
            return;
        }
        let mut state = self.state.borrow_mut();
        let geometry = state.geometry;
        let left = geometry.content_left + x;
        let top = geometry.content_top + state.block_top + y;
        let rect = [
            mm_to_pt(left),
            mm_to_pt(geometry.page_height - top - height),
            mm_to_pt(left + width),
            mm_to_pt(geometry.page_height - top),
        ];
        let page = state.page;
        state.capture.links.push(LinkRegion {
            page,
            rect,
            anchor: anchor.to_owned(),
        });
    }

    /// Takes what has been recorded so far, leaving an empty capture behind.
    pub fn take_capture(&self) -> PassCapture {
        std::mem::take(&mut self.state.borrow_mut().capture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::pt_to_mm;

    const A4: PageGeometry = PageGeometry {
        page_width: 210.0,
        page_height: 297.0,
        content_left: 20.0,
        content_top: 30.0,
    };

    #[test]
    fn pages_reset_the_cursor() {
        let recorder = PassRecorder::new(A4);
        assert_eq!(recorder.begin_page(), 1);
        recorder.begin_block();
        recorder.advance(40.0);
        recorder.begin_block();
        recorder.record_anchor("a", 0.0);

        assert_eq!(recorder.begin_page(), 2);
        recorder.begin_block();
        recorder.record_anchor("b", 0.0);

        let capture = recorder.take_capture();
        assert_eq!(capture.pages, 2);
        assert_eq!(capture.anchors[0].page, 1);
        assert!((pt_to_mm(capture.anchors[0].top) - (297.0 - 30.0 - 40.0)).abs() < 1e-9);
        assert_eq!(capture.anchors[1].page, 2);
        assert!((pt_to_mm(capture.anchors[1].top) - (297.0 - 30.0)).abs() < 1e-9);
    }

    #[test]
    fn links_are_converted_to_pdf_coordinates() {
        let recorder = PassRecorder::new(A4);
        recorder.begin_page();
        recorder.advance(10.0);
        recorder.begin_block();
        recorder.record_link(5.0, 2.0, 8.0, 4.0, "a1");
        recorder.record_link(0.0, 0.0, 1.0, 1.0, "");

        let capture = recorder.take_capture();
        assert_eq!(capture.links.len(), 1);
        let rect = capture.links[0].rect;
        let expected_mm = [25.0, 297.0 - 42.0 - 4.0, 33.0, 297.0 - 42.0];
        for (actual, expected) in rect.iter().zip(expected_mm) {
            assert!((pt_to_mm(*actual) - expected).abs() < 1e-9);
        }
    }
}
