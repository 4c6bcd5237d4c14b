// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Coordinate transforms between PDF user space (origin bottom-left, y up) and
// the top-left pixel space page snapshots are rendered in.

use crate::pdf::handle::PageGeometry;

/// A PDF affine matrix `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix(pub [f32; 6]);

impl Matrix {
    pub const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    pub fn translate(tx: f32, ty: f32) -> Self {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// `self × other` in PDF's row-vector convention: apply `self` first,
    /// then `other`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        let [oa, ob, oc, od, oe, of] = other.0;
        Matrix([
            a * oa + b * oc,
            a * ob + b * od,
            c * oa + d * oc,
            c * ob + d * od,
            e * oa + f * oc + oe,
            e * ob + f * od + of,
        ])
    }

    /// Map a point through the matrix.
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }
}

impl From<[f32; 6]> for Matrix {
    fn from(values: [f32; 6]) -> Self {
        Matrix(values)
    }
}

/// The mapping from page user space into a `width` x `height` bitmap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
    pub transform: Matrix,
}

impl Viewport {
    /// Viewport for a page box `[x0 y0 x1 y1]` at `scale`, honouring a page
    /// rotation of 0, 90, 180 or 270 degrees.
    pub fn new(view_box: [f32; 4], scale: f32, rotation: i32) -> Self {
        let [x0, y0, x1, y1] = view_box;
        let center_x = (x0 + x1) / 2.0;
        let center_y = (y0 + y1) / 2.0;

        let (ra, rb, rc, rd) = match rotation.rem_euclid(360) {
            90 => (0.0, 1.0, 1.0, 0.0),
            180 => (-1.0, 0.0, 0.0, 1.0),
            270 => (0.0, -1.0, -1.0, 0.0),
            _ => (1.0, 0.0, 0.0, -1.0),
        };

        let (offset_x, offset_y, width, height) = if ra == 0.0 {
            (
                (center_y - y0).abs() * scale,
                (center_x - x0).abs() * scale,
                (y1 - y0).abs() * scale,
                (x1 - x0).abs() * scale,
            )
        } else {
            (
                (center_x - x0).abs() * scale,
                (center_y - y0).abs() * scale,
                (x1 - x0).abs() * scale,
                (y1 - y0).abs() * scale,
            )
        };

        let transform = Matrix([
            ra * scale,
            rb * scale,
            rc * scale,
            rd * scale,
            offset_x - ra * scale * center_x - rc * scale * center_y,
            offset_y - rb * scale * center_x - rd * scale * center_y,
        ]);

        Self {
            width,
            height,
            scale,
            transform,
        }
    }

    /// Viewport over a page's visible box.
    pub fn for_page(geometry: &PageGeometry, scale: f32) -> Self {
        Self::new(geometry.visible_box(), scale, geometry.rotation)
    }
}

/// A text item placed in top-left pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelBox {
    pub x: f32,
    /// Top edge; the baseline sits `font_size` below it.
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub font_size: f32,
}

/// Place a text item whose rendering matrix is `item_transform` (font size
/// folded in, user space) into the viewport. `width` and `height` are the
/// item's extent in user-space units.
pub fn to_viewport(item_transform: Matrix, viewport: &Viewport, width: f32, height: f32) -> PixelBox {
    let combined = item_transform.then(&viewport.transform);
    let [_, _, c, d, e, f] = combined.0;
    let font_size = (c * c + d * d).sqrt();
    PixelBox {
        x: e,
        y: f - font_size,
        width: width * viewport.scale,
        height: height * viewport.scale,
        font_size,
    }
}
