use nalgebra::Point2;

/// Pixel color in BGR byte order, matching the detector-side video frames.
pub type Bgr = [u8; 3];

/// Borrowed view of a BGR24 frame, row-major, `len = w * h * 3`.
#[derive(Clone, Copy, Debug)]
pub struct FrameBufferView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8],
}

/// Owned BGR24 raster the compositor draws into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl FrameBuffer {
    /// All-black frame of the given size.
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, [0, 0, 0])
    }

    /// Frame filled with a uniform color.
    pub fn filled(width: usize, height: usize, color: Bgr) -> Self {
        let mut data = Vec::with_capacity(width * height * 3);
        for _ in 0..width * height {
            data.extend_from_slice(&color);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn as_view(&self) -> FrameBufferView<'_> {
        FrameBufferView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn put_pixel(&mut self, x: i32, y: i32, color: Bgr) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = (y as usize * self.width + x as usize) * 3;
        self.data[idx..idx + 3].copy_from_slice(&color);
    }

    #[inline]
    pub fn get_pixel(&self, x: i32, y: i32) -> Option<Bgr> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        let idx = (y as usize * self.width + x as usize) * 3;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    /// Fill a horizontal span, clipped to the frame.
    fn fill_span(&mut self, y: i32, x0: i32, x1: i32, color: Bgr) {
        if y < 0 || y >= self.height as i32 {
            return;
        }
        let x0 = x0.max(0);
        let x1 = x1.min(self.width as i32 - 1);
        for x in x0..=x1 {
            let idx = (y as usize * self.width + x as usize) * 3;
            self.data[idx..idx + 3].copy_from_slice(&color);
        }
    }
}

/// Rasterize a filled convex polygon onto the frame.
///
/// Scanline fill: for every row crossed by the polygon, intersect all edges
/// and fill between the leftmost and rightmost crossings. Faces are assumed
/// individually convex; non-convex input is a caller contract violation and
/// simply fills the span hull per row. Polygons with fewer than 3 points
/// are ignored.
pub fn fill_convex_polygon(frame: &mut FrameBuffer, points: &[Point2<f64>], color: Bgr) {
    if points.len() < 3 {
        return;
    }

    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for p in points {
        if !p.x.is_finite() || !p.y.is_finite() {
            return;
        }
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }

    let y_start = (min_y.ceil() as i64).max(0) as i32;
    let y_end = (max_y.floor() as i64).min(frame.height as i64 - 1) as i32;

    for y in y_start..=y_end {
        let yf = y as f64;
        let mut span_min = f64::INFINITY;
        let mut span_max = f64::NEG_INFINITY;

        for i in 0..points.len() {
            let a = points[i];
            let b = points[(i + 1) % points.len()];
            // Half-open edge rule so shared vertices count once.
            let crosses = (a.y <= yf && b.y > yf) || (b.y <= yf && a.y > yf);
            if crosses {
                let t = (yf - a.y) / (b.y - a.y);
                let x = a.x + t * (b.x - a.x);
                span_min = span_min.min(x);
                span_max = span_max.max(x);
            } else if a.y == yf && b.y == yf {
                // Horizontal edge lying exactly on the scanline.
                span_min = span_min.min(a.x.min(b.x));
                span_max = span_max.max(a.x.max(b.x));
            }
        }

        if span_min <= span_max {
            frame.fill_span(y, span_min.round() as i32, span_max.round() as i32, color);
        }
    }
}
