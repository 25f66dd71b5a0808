use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// Logical drawing-surface dimensions. The widget renders the buffer 1:1.
pub const PAD_WIDTH: u32 = 400;
pub const PAD_HEIGHT: u32 = 150;

const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Freehand signature surface. The raster buffer is the source of truth;
/// the egui widget only uploads it as a texture. A stroke is active exactly
/// while `last_point` is set, which gives the idle/drawing state machine:
/// stray move events arriving outside a stroke have no last point to draw
/// from and are discarded.
pub struct SignaturePad {
    buffer: RgbaImage,
    last_point: Option<(f32, f32)>,
    committed: Option<Vec<u8>>,
}

impl Default for SignaturePad {
    fn default() -> Self {
        SignaturePad {
            buffer: RgbaImage::new(PAD_WIDTH, PAD_HEIGHT),
            last_point: None,
            committed: None,
        }
    }
}

impl SignaturePad {
    /// Starts a new path at (x, y). No-op if a stroke is already active.
    pub fn begin_stroke(&mut self, x: f32, y: f32) {
        if self.last_point.is_some() {
            return;
        }
        self.plot(x, y);
        self.last_point = Some((x, y));
    }

    /// Draws a segment from the last recorded point to (x, y) and records
    /// (x, y). Ignored while idle.
    pub fn extend_stroke(&mut self, x: f32, y: f32) {
        let Some((lx, ly)) = self.last_point else {
            return;
        };
        self.draw_segment(lx, ly, x, y);
        self.last_point = Some((x, y));
    }

    /// Ends the active stroke; subsequent moves draw nothing.
    pub fn end_stroke(&mut self) {
        self.last_point = None;
    }

    pub fn is_drawing(&self) -> bool {
        self.last_point.is_some()
    }

    /// Encodes the current buffer to PNG and stores it as the committed
    /// image. The encode target is an in-memory Vec, so this cannot fail in
    /// practice; a failed encode just leaves the previous committed image.
    pub fn save(&mut self) {
        let mut out = Cursor::new(Vec::new());
        if image::DynamicImage::ImageRgba8(self.buffer.clone())
            .write_to(&mut out, ImageFormat::Png)
            .is_ok()
        {
            self.committed = Some(out.into_inner());
        }
    }

    /// Blanks the buffer and discards the committed image.
    pub fn clear(&mut self) {
        self.buffer = RgbaImage::new(PAD_WIDTH, PAD_HEIGHT);
        self.last_point = None;
        self.committed = None;
    }

    /// The committed PNG, if a signature has been saved since the last clear.
    pub fn committed_image(&self) -> Option<&[u8]> {
        self.committed.as_deref()
    }

    /// Raw RGBA bytes of the live buffer, row-major, for texture upload.
    pub fn rgba_bytes(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    pub fn is_blank(&self) -> bool {
        self.buffer.pixels().all(|p| p.0[3] == 0)
    }

    fn plot(&mut self, x: f32, y: f32) {
        let (x, y) = (x.round() as i64, y.round() as i64);
        // 2px brush: ink the pixel and its right/down neighbours.
        for (px, py) in [(x, y), (x + 1, y), (x, y + 1), (x + 1, y + 1)] {
            if px >= 0 && py >= 0 && (px as u32) < PAD_WIDTH && (py as u32) < PAD_HEIGHT {
                self.buffer.put_pixel(px as u32, py as u32, INK);
            }
        }
    }

    // Bresenham between the two endpoints, in logical pixel units.
    fn draw_segment(&mut self, x0: f32, y0: f32, x1: f32, y1: f32) {
        let (mut x0, mut y0) = (x0.round() as i64, y0.round() as i64);
        let (x1, y1) = (x1.round() as i64, y1.round() as i64);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.plot(x0 as f32, y0 as f32);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stray_moves_while_idle_draw_nothing() {
        let mut pad = SignaturePad::default();
        pad.extend_stroke(10.0, 10.0);
        pad.extend_stroke(300.0, 120.0);
        assert!(pad.is_blank());
        assert!(!pad.is_drawing());
    }

    #[test]
    fn a_stroke_inks_the_buffer() {
        let mut pad = SignaturePad::default();
        pad.begin_stroke(10.0, 10.0);
        pad.extend_stroke(60.0, 40.0);
        pad.end_stroke();
        assert!(!pad.is_blank());
        assert!(!pad.is_drawing());
    }

    #[test]
    fn moves_after_release_draw_nothing() {
        let mut pad = SignaturePad::default();
        pad.begin_stroke(10.0, 10.0);
        pad.end_stroke();
        let before: Vec<u8> = pad.rgba_bytes().to_vec();
        pad.extend_stroke(200.0, 100.0);
        assert_eq!(pad.rgba_bytes(), &before[..]);
    }

    #[test]
    fn begin_while_drawing_is_a_no_op() {
        let mut pad = SignaturePad::default();
        pad.begin_stroke(10.0, 10.0);
        pad.extend_stroke(20.0, 20.0);
        let before: Vec<u8> = pad.rgba_bytes().to_vec();
        pad.begin_stroke(300.0, 140.0);
        // the second press is swallowed: nothing inked, anchor unchanged
        assert!(pad.is_drawing());
        assert_eq!(pad.rgba_bytes(), &before[..]);
    }

    #[test]
    fn save_commits_a_png() {
        let mut pad = SignaturePad::default();
        pad.begin_stroke(5.0, 5.0);
        pad.extend_stroke(50.0, 30.0);
        pad.end_stroke();
        pad.save();
        let png = pad.committed_image().expect("committed image");
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn clear_discards_the_committed_image() {
        let mut pad = SignaturePad::default();
        pad.begin_stroke(5.0, 5.0);
        pad.extend_stroke(50.0, 30.0);
        pad.end_stroke();
        pad.save();
        assert!(pad.committed_image().is_some());
        pad.clear();
        assert!(pad.committed_image().is_none());
        assert!(pad.is_blank());
    }

    #[test]
    fn segments_clip_at_the_pad_edges() {
        let mut pad = SignaturePad::default();
        pad.begin_stroke(390.0, 140.0);
        pad.extend_stroke(450.0, 200.0);
        pad.end_stroke();
        // out-of-bounds portion is dropped, in-bounds portion is inked
        assert!(!pad.is_blank());
    }
}
