//! Binary pixel masks
//!
//! A mask marks the pixels of one image that take part in the color
//! comparison of a pair. Coordinates follow the feature convention: pixel
//! `(x, y)` has its center at `(x as f32, y as f32)`.

/// Boolean pixel grid the size of an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl Mask {
    /// Create an empty mask
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; width as usize * height as usize],
        }
    }

    /// Create a mask with every pixel set
    pub fn full(width: u32, height: u32) -> Self {
        let mut mask = Self::new(width, height);
        mask.fill(true);
        mask
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn fill(&mut self, value: bool) {
        self.data.iter_mut().for_each(|p| *p = value);
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.data[self.index(x, y)]
    }

    /// Set a pixel; out of bounds coordinates are ignored
    pub fn set(&mut self, x: u32, y: u32) {
        if x < self.width && y < self.height {
            let index = self.index(x, y);
            self.data[index] = true;
        }
    }

    /// Number of set pixels
    pub fn count(&self) -> usize {
        self.data.iter().filter(|p| **p).count()
    }

    /// Set every pixel whose center lies within `radius` of `(cx, cy)`
    pub fn draw_disc(&mut self, cx: f32, cy: f32, radius: f32) {
        let r2 = radius * radius;
        let Some((x0, x1, y0, y1)) = self.clip(cx - radius, cx + radius, cy - radius, cy + radius)
        else {
            return;
        };
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                if dx * dx + dy * dy <= r2 {
                    self.set(x, y);
                }
            }
        }
    }

    /// Set every pixel within `thickness / 2` of the segment `a`-`b`
    pub fn draw_segment(&mut self, a: (f32, f32), b: (f32, f32), thickness: f32) {
        let half = (thickness / 2.0).max(0.5);
        let Some((x0, x1, y0, y1)) = self.clip(
            a.0.min(b.0) - half,
            a.0.max(b.0) + half,
            a.1.min(b.1) - half,
            a.1.max(b.1) + half,
        ) else {
            return;
        };

        let (dx, dy) = (b.0 - a.0, b.1 - a.1);
        let len2 = dx * dx + dy * dy;

        for y in y0..=y1 {
            for x in x0..=x1 {
                let (px, py) = (x as f32 - a.0, y as f32 - a.1);
                let t = if len2 > 0.0 {
                    ((px * dx + py * dy) / len2).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let (ex, ey) = (px - t * dx, py - t * dy);
                if ex * ex + ey * ey <= half * half {
                    self.set(x, y);
                }
            }
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Clip a float bounding box to pixel bounds; `None` if fully outside
    fn clip(&self, min_x: f32, max_x: f32, min_y: f32, max_y: f32) -> Option<(u32, u32, u32, u32)> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let max_col = (self.width - 1) as f32;
        let max_row = (self.height - 1) as f32;
        if max_x < 0.0 || max_y < 0.0 || min_x > max_col || min_y > max_row {
            return None;
        }
        Some((
            min_x.ceil().max(0.0) as u32,
            max_x.floor().min(max_col) as u32,
            min_y.ceil().max(0.0) as u32,
            max_y.floor().min(max_row) as u32,
        ))
    }
}
