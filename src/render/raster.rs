use ndarray::Array2;

use crate::foundation::{
    core::{ImageShape, Point},
    error::{PoseBatchError, PoseBatchResult},
};

/// One grayscale channel rasterized by `vello_cpu`.
///
/// Every primitive is painted opaque, so a later primitive replaces earlier values where it
/// fully covers a pixel; anti-aliased edges blend with what is underneath.
pub(crate) struct Layer {
    width: u16,
    height: u16,
    ctx: vello_cpu::RenderContext,
    dirty: bool,
}

impl Layer {
    pub(crate) fn new(shape: ImageShape) -> PoseBatchResult<Self> {
        let width: u16 = shape
            .width
            .try_into()
            .map_err(|_| PoseBatchError::render("layer width exceeds u16"))?;
        let height: u16 = shape
            .height
            .try_into()
            .map_err(|_| PoseBatchError::render("layer height exceeds u16"))?;
        Ok(Self {
            width,
            height,
            ctx: vello_cpu::RenderContext::new(width, height),
            dirty: false,
        })
    }

    /// Fill a closed polygon with `value`. Fewer than three vertices draws nothing.
    pub(crate) fn fill_polygon(&mut self, points: &[Point], value: u8) {
        if points.len() < 3 || !points.iter().all(|p| p.is_finite()) {
            return;
        }
        let mut path = vello_cpu::kurbo::BezPath::new();
        path.move_to(point_to_cpu(points[0]));
        for p in &points[1..] {
            path.line_to(point_to_cpu(*p));
        }
        path.close_path();

        self.ctx.set_paint(gray(value));
        self.ctx.fill_path(&path);
        self.dirty = true;
    }

    /// Stroke the segment `a-b` with round caps.
    pub(crate) fn line(&mut self, a: Point, b: Point, value: u8, thickness: f64) {
        if !a.is_finite() || !b.is_finite() {
            return;
        }
        let mut path = vello_cpu::kurbo::BezPath::new();
        path.move_to(point_to_cpu(a));
        path.line_to(point_to_cpu(b));

        self.ctx.set_paint(gray(value));
        self.ctx.set_stroke(
            vello_cpu::kurbo::Stroke::new(thickness)
                .with_caps(vello_cpu::kurbo::Cap::Round)
                .with_join(vello_cpu::kurbo::Join::Round),
        );
        self.ctx.stroke_path(&path);
        self.dirty = true;
    }

    /// Rasterize and return the layer as `(height, width)` samples.
    pub(crate) fn finish(mut self) -> Array2<u8> {
        let mut out = Array2::<u8>::zeros((usize::from(self.height), usize::from(self.width)));
        if !self.dirty {
            return out;
        }

        let mut pixmap = vello_cpu::Pixmap::new(self.width, self.height);
        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut pixmap);

        // Opaque gray paint over a transparent target: premultiplied red equals the sample.
        for (dst, px) in out
            .iter_mut()
            .zip(pixmap.data_as_u8_slice().chunks_exact(4))
        {
            *dst = px[0];
        }
        out
    }
}

fn gray(value: u8) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(value, value, value, 255)
}

// Keypoints address pixel centers; vello places them at +0.5.
fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x + 0.5, p.y + 0.5)
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;
