use eframe::egui::Pos2;
use glam::{IVec2, Vec2};
use grid::Grid;

/// Coverage mask of a single stroke segment, indexed `[(x, y)]` relative to `origin`.
#[derive(Clone, Debug)]
pub struct Raster {
    pub origin: IVec2,
    pub mask: Grid<u8>,
}

impl Raster {
    pub fn width(&self) -> usize {
        self.mask.rows()
    }

    pub fn height(&self) -> usize {
        self.mask.cols()
    }

    /// Rasterizes a round-capped segment of the given width, clipped to `[0, dims[)`.
    /// Returns `None` when nothing of the segment lands inside the bounds.
    pub fn segment(start: Pos2, end: Pos2, width: f32, dims: [usize; 2]) -> Option<Self> {
        if dims[0] == 0 || dims[1] == 0 {
            return None;
        }
        if !(start.x.is_finite() && start.y.is_finite() && end.x.is_finite() && end.y.is_finite()) {
            return None;
        }
        let radius = if width.is_finite() { width.max(1.) / 2. } else { 0.5 };
        let a = Vec2::new(start.x, start.y);
        let b = Vec2::new(end.x, end.y);
        // one extra pixel around the capsule for the antialiasing ramp
        let reach = Vec2::splat(radius + 1.);
        let lo = (a.min(b) - reach).floor().as_ivec2().max(IVec2::ZERO);
        let hi = (a.max(b) + reach)
            .ceil()
            .as_ivec2()
            .min(IVec2::new(dims[0] as i32, dims[1] as i32));
        if lo.cmpge(hi).any() {
            return None;
        }
        let size = hi - lo;
        let mut mask = Grid::new(size.x as usize, size.y as usize);
        let mut touched = false;
        for ((x, y), pixel) in mask.indexed_iter_mut() {
            let center = (lo + IVec2::new(x as i32, y as i32)).as_vec2() + Vec2::splat(0.5);
            let coverage = (radius + 0.5 - distance_to_segment(center, a, b)).clamp(0., 1.);
            *pixel = (coverage * u8::MAX as f32).round() as u8;
            touched |= *pixel > 0;
        }
        touched.then_some(Self { origin: lo, mask })
    }

    /// Iterates the covered pixels as absolute `(x, y)` positions with their coverage.
    pub fn covered(&self) -> impl Iterator<Item = ((usize, usize), u8)> + '_ {
        let origin = self.origin;
        self.mask
            .indexed_iter()
            .filter(|(_, val)| **val > 0)
            .map(move |((x, y), &val)| ((origin.x as usize + x, origin.y as usize + y), val))
    }
}

fn distance_to_segment(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq == 0. {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0., 1.);
    p.distance(a + ab * t)
}
