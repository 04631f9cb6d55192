//! # Grid Layout
//!
//! Fixed pixel geometry of the boxed chart grid.
//!
//! ```text
//!  sidebar  border  box   border  box   border ...  box   border
//! |<-30->|   1   |<-93->|  1  |<-93->|  1  | ... |<-93->|  1  |
//! ```
//!
//! Every line is one row of boxes, every measure one box. The grid always
//! reserves room for `LINE_MAX_MEASURES` boxes, so the chart width is the same
//! whether a chart's longest line has one measure or eight.

use serde::Serialize;

use crate::beat_schema::BeatSchema;
use crate::chart::LINE_MAX_MEASURES;

/// Pixel geometry of the chart grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridGeometry {
    pub box_width: u32,
    pub box_height: u32,
    pub border_width: u32,
    pub section_sidebar_width: u32,
    pub chart_width: u32,
}

impl GridGeometry {
    /// The boxed chart geometry used for every chart
    pub const BOXED: GridGeometry = GridGeometry::new(93, 93, 1, 30);

    pub const fn new(box_width: u32, box_height: u32, border_width: u32, section_sidebar_width: u32) -> Self {
        let chart_width = LINE_MAX_MEASURES as u32 * (box_width + border_width)
            + border_width
            + section_sidebar_width;
        Self {
            box_width,
            box_height,
            border_width,
            section_sidebar_width,
            chart_width,
        }
    }

    /// Left edge of the box in `column`
    pub fn column_x(&self, column: usize) -> u32 {
        self.section_sidebar_width + self.border_width + column as u32 * (self.box_width + self.border_width)
    }

    /// Top edge of the boxes in `row`
    pub fn row_y(&self, row: usize) -> u32 {
        self.border_width + row as u32 * (self.box_height + self.border_width)
    }

    /// Height of a block of `rows` rows including the closing border
    pub fn rows_height(&self, rows: usize) -> u32 {
        self.border_width + rows as u32 * (self.box_height + self.border_width)
    }

    /// Separator lines drawn inside a measure box for its beat schema,
    /// in box-local pixel coordinates.
    pub fn guides(&self, schema: &BeatSchema) -> Vec<Segment> {
        let w = self.box_width as f64;
        let h = self.box_height as f64;
        let anti_diagonal = Segment::new((w, 0.0), (0.0, h));

        match schema.parts() {
            [2, 2] => vec![anti_diagonal],
            [2, 1, 1] => vec![anti_diagonal, Segment::new((w / 2.0, h / 2.0), (w, h))],
            [1, 1, 2] => vec![anti_diagonal, Segment::new((0.0, 0.0), (w / 2.0, h / 2.0))],
            [1, 1, 1, 1] => vec![anti_diagonal, Segment::new((0.0, 0.0), (w, h))],
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// A straight guide line
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
}

impl Segment {
    fn new(from: (f64, f64), to: (f64, f64)) -> Self {
        Self {
            from: Point { x: from.0, y: from.1 },
            to: Point { x: to.0, y: to.1 },
        }
    }
}
