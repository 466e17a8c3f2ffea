use std::ops::{Index, IndexMut};

use crate::stencil::{Border, Stencil, SupportStencil};

/// Dense, fixed-size, multi-channel 2D grid of `f32` samples.
///
/// Samples are stored row-major with channels interleaved, so
/// `(x, y, c)` lives at `(y * width + x) * channels + c`.
///
/// The outer ring of cells (row 0, row `height - 1`, column 0 and column
/// `width - 1`) holds ghost values. Only a [`Border`] policy writes them; the
/// stencil sweeps only ever write `x in 1..width-1`, `y in 1..height-1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<f32>,
}

impl Field {
    pub fn new(width: usize, height: usize, channels: usize) -> Self {
        assert!(width >= 3, "width must be >= 3");
        assert!(height >= 3, "height must be >= 3");
        assert!(channels > 0, "channels must be > 0");
        Self {
            width,
            height,
            channels,
            data: vec![0.0; width * height * channels],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn same_extent(&self, other: &Field) -> bool {
        self.width == other.width && self.height == other.height
    }

    #[inline]
    fn idx(&self, x: usize, y: usize, c: usize) -> usize {
        debug_assert!(
            x < self.width && y < self.height && c < self.channels,
            "({x}, {y}, {c}) outside {}x{}x{}",
            self.width,
            self.height,
            self.channels
        );
        (y * self.width + x) * self.channels + c
    }

    /// Hot-path read. Callers keep `(x, y, c)` in range; out-of-range access
    /// is caught by a debug assertion or the slice bounds check, never UB.
    #[inline]
    pub fn at(&self, x: usize, y: usize, c: usize) -> f32 {
        self.data[self.idx(x, y, c)]
    }

    #[inline]
    pub fn at_mut(&mut self, x: usize, y: usize, c: usize) -> &mut f32 {
        let i = self.idx(x, y, c);
        &mut self.data[i]
    }

    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Raw bytes of the samples, for handing to an external texture upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    /// Writes every non-corner ghost cell from its nearest interior cell.
    pub fn fill_border<B: Border>(&mut self, b: &B) {
        let (w, h) = (self.width, self.height);
        for x in 1..w - 1 {
            for c in 0..self.channels {
                self[(x, 0, c)] = b.border(self[(x, 1, c)]);
                self[(x, h - 1, c)] = b.border(self[(x, h - 2, c)]);
            }
        }
        for y in 1..h - 1 {
            for c in 0..self.channels {
                self[(0, y, c)] = b.border(self[(1, y, c)]);
                self[(w - 1, y, c)] = b.border(self[(w - 2, y, c)]);
            }
        }
    }

    /// Runs `iterations` border-fill + interior sweeps, updating in place.
    ///
    /// Each sweep visits rows top to bottom and cells left to right, writing
    /// into the buffer it reads from, so a stencil at `(x, y)` already sees the
    /// new values of `(x - 1, y)` and `(x, y - 1)` (Gauss-Seidel ordering).
    /// The ghost ring is refreshed once more after the last sweep so it
    /// matches the final interior.
    pub fn convolve<S, B>(&mut self, stencil: &S, b: &B, iterations: usize)
    where
        S: Stencil,
        B: Border,
    {
        let (w, h) = (self.width, self.height);
        for _ in 0..iterations {
            self.fill_top(b);
            for y in 1..h - 1 {
                self.fill_left(b, y);
                for x in 1..w - 1 {
                    for c in 0..self.channels {
                        let v = stencil.stencil(self, x, y, c);
                        self[(x, y, c)] = v;
                    }
                }
                self.fill_right(b, y);
            }
            self.fill_bottom(b);
        }
        if iterations > 0 {
            self.fill_border(b);
        }
    }

    /// [`Field::convolve`] with a second read-only field handed to the stencil.
    pub fn convolve_with<S, B>(&mut self, support: &Field, stencil: &S, b: &B, iterations: usize)
    where
        S: SupportStencil,
        B: Border,
    {
        assert!(self.same_extent(support), "support field extent mismatch");
        let (w, h) = (self.width, self.height);
        for _ in 0..iterations {
            self.fill_top(b);
            for y in 1..h - 1 {
                self.fill_left(b, y);
                for x in 1..w - 1 {
                    for c in 0..self.channels {
                        let v = stencil.stencil(self, support, x, y, c);
                        self[(x, y, c)] = v;
                    }
                }
                self.fill_right(b, y);
            }
            self.fill_bottom(b);
        }
        if iterations > 0 {
            self.fill_border(b);
        }
    }

    /// [`Field::convolve`] that keeps flow out of obstacle cells.
    ///
    /// Cells with a non-zero `mask` value skip the stencil and take their
    /// value, through `inbound`, from the first unmasked neighbour in the
    /// order left, right, up (`y - 1`), down (`y + 1`). A cell boxed in by
    /// obstacles on all four sides is zeroed. The outer domain edges use
    /// `outbound`.
    pub fn convolve_masked<S, BI, BO>(
        &mut self,
        stencil: &S,
        inbound: &BI,
        outbound: &BO,
        mask: &Field,
        iterations: usize,
    ) where
        S: Stencil,
        BI: Border,
        BO: Border,
    {
        assert!(self.same_extent(mask), "mask field extent mismatch");
        let (w, h) = (self.width, self.height);
        let open = |x: usize, y: usize| mask.at(x, y, 0) == 0.0;
        for _ in 0..iterations {
            self.fill_top(outbound);
            for y in 1..h - 1 {
                self.fill_left(outbound, y);
                for x in 1..w - 1 {
                    if open(x, y) {
                        for c in 0..self.channels {
                            let v = stencil.stencil(self, x, y, c);
                            self[(x, y, c)] = v;
                        }
                        continue;
                    }
                    let source = [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)]
                        .into_iter()
                        .find(|&(nx, ny)| open(nx, ny));
                    for c in 0..self.channels {
                        self[(x, y, c)] = match source {
                            Some((nx, ny)) => inbound.border(self[(nx, ny, c)]),
                            None => 0.0,
                        };
                    }
                }
                self.fill_right(outbound, y);
            }
            self.fill_bottom(outbound);
        }
        if iterations > 0 {
            self.fill_border(outbound);
        }
    }

    /// Double-buffered variant of [`Field::convolve`].
    ///
    /// Every stencil read within one iteration sees the previous iterate only
    /// (textbook Jacobi). Converges differently from the in-place sweep, so it
    /// is a separate entry point. `scratch` must share this field's extent and
    /// channel count; its contents are overwritten.
    pub fn convolve_jacobi<S, B>(
        &mut self,
        stencil: &S,
        b: &B,
        iterations: usize,
        scratch: &mut Field,
    ) where
        S: Stencil,
        B: Border,
    {
        assert!(
            self.same_extent(scratch) && self.channels == scratch.channels,
            "scratch field shape mismatch"
        );
        for _ in 0..iterations {
            self.fill_border(b);
            scratch.data.copy_from_slice(&self.data);
            for y in 1..self.height - 1 {
                for x in 1..self.width - 1 {
                    for c in 0..self.channels {
                        self[(x, y, c)] = stencil.stencil(scratch, x, y, c);
                    }
                }
            }
        }
        if iterations > 0 {
            self.fill_border(b);
        }
    }

    /// Double-buffered variant of [`Field::convolve_with`].
    pub fn convolve_with_jacobi<S, B>(
        &mut self,
        support: &Field,
        stencil: &S,
        b: &B,
        iterations: usize,
        scratch: &mut Field,
    ) where
        S: SupportStencil,
        B: Border,
    {
        assert!(self.same_extent(support), "support field extent mismatch");
        assert!(
            self.same_extent(scratch) && self.channels == scratch.channels,
            "scratch field shape mismatch"
        );
        for _ in 0..iterations {
            self.fill_border(b);
            scratch.data.copy_from_slice(&self.data);
            for y in 1..self.height - 1 {
                for x in 1..self.width - 1 {
                    for c in 0..self.channels {
                        self[(x, y, c)] = stencil.stencil(scratch, support, x, y, c);
                    }
                }
            }
        }
        if iterations > 0 {
            self.fill_border(b);
        }
    }

    #[inline]
    fn fill_top<B: Border>(&mut self, b: &B) {
        for x in 1..self.width - 1 {
            for c in 0..self.channels {
                self[(x, 0, c)] = b.border(self[(x, 1, c)]);
            }
        }
    }

    #[inline]
    fn fill_bottom<B: Border>(&mut self, b: &B) {
        let h = self.height;
        for x in 1..self.width - 1 {
            for c in 0..self.channels {
                self[(x, h - 1, c)] = b.border(self[(x, h - 2, c)]);
            }
        }
    }

    #[inline]
    fn fill_left<B: Border>(&mut self, b: &B, y: usize) {
        for c in 0..self.channels {
            self[(0, y, c)] = b.border(self[(1, y, c)]);
        }
    }

    #[inline]
    fn fill_right<B: Border>(&mut self, b: &B, y: usize) {
        let w = self.width;
        for c in 0..self.channels {
            self[(w - 1, y, c)] = b.border(self[(w - 2, y, c)]);
        }
    }
}

impl Index<(usize, usize, usize)> for Field {
    type Output = f32;

    #[inline]
    fn index(&self, (x, y, c): (usize, usize, usize)) -> &f32 {
        &self.data[self.idx(x, y, c)]
    }
}

impl IndexMut<(usize, usize, usize)> for Field {
    #[inline]
    fn index_mut(&mut self, (x, y, c): (usize, usize, usize)) -> &mut f32 {
        let i = self.idx(x, y, c);
        &mut self.data[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stencil::{LinearBorder, ViscosityStencil};

    fn ramp(width: usize, height: usize, channels: usize) -> Field {
        let mut f = Field::new(width, height, channels);
        for y in 0..height {
            for x in 0..width {
                for c in 0..channels {
                    f[(x, y, c)] = (x * 7 + y * 3 + c) as f32 * 0.1;
                }
            }
        }
        f
    }

    #[test]
    fn layout_is_row_major_interleaved() {
        let mut f = Field::new(4, 3, 2);
        f[(1, 2, 1)] = 5.0;
        assert_eq!(f.as_slice()[(2 * 4 + 1) * 2 + 1], 5.0);
        assert_eq!(f.at(1, 2, 1), 5.0);
        assert_eq!(f.as_bytes().len(), 4 * 3 * 2 * 4);
    }

    #[test]
    fn clear_zeroes_everything() {
        let mut f = ramp(6, 5, 2);
        f.clear();
        assert!(f.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    #[should_panic(expected = "width must be >= 3")]
    fn rejects_degenerate_extent() {
        Field::new(2, 8, 1);
    }

    #[test]
    fn identity_stencil_only_touches_borders() {
        let mut f = ramp(6, 5, 1);
        let before = f.clone();
        let identity = |f: &Field, x: usize, y: usize, c: usize| f.at(x, y, c);
        f.convolve(&identity, &LinearBorder::ZERO, 1);
        for y in 1..4 {
            for x in 1..5 {
                assert_eq!(f.at(x, y, 0), before.at(x, y, 0));
            }
        }
        assert_eq!(f.at(2, 0, 0), 0.0);
        assert_eq!(f.at(0, 2, 0), 0.0);
        // corners are never written
        assert_eq!(f.at(0, 0, 0), before.at(0, 0, 0));
        assert_eq!(f.at(5, 4, 0), before.at(5, 4, 0));
    }

    #[test]
    fn in_place_sweep_sees_updated_neighbours() {
        // Each cell copies its left neighbour; in place, the value at x=1
        // ripples all the way across the row in one sweep.
        let mut f = Field::new(6, 3, 1);
        f[(1, 1, 0)] = 1.0;
        let shift = |f: &Field, x: usize, y: usize, c: usize| {
            if x == 1 { f.at(x, y, c) } else { f.at(x - 1, y, c) }
        };
        let mut jacobi = f.clone();
        let mut scratch = Field::new(6, 3, 1);
        f.convolve(&shift, &LinearBorder::ZERO, 1);
        jacobi.convolve_jacobi(&shift, &LinearBorder::ZERO, 1, &mut scratch);
        assert_eq!(
            (1..5).map(|x| f.at(x, 1, 0)).collect::<Vec<_>>(),
            vec![1.0, 1.0, 1.0, 1.0]
        );
        assert_eq!(
            (1..5).map(|x| jacobi.at(x, 1, 0)).collect::<Vec<_>>(),
            vec![1.0, 1.0, 0.0, 0.0]
        );
    }

    #[test]
    fn support_stencil_reads_second_field() {
        let mut p = Field::new(5, 5, 1);
        let mut v = Field::new(5, 5, 2);
        v.fill(3.0);
        let take = |_: &Field, s: &Field, x: usize, y: usize, _c: usize| s.at(x, y, 1);
        p.convolve_with(&v, &take, &LinearBorder::REFLECT, 1);
        assert_eq!(p.at(2, 2, 0), 3.0);
        assert_eq!(p.at(0, 2, 0), 3.0);
    }

    #[test]
    fn masked_cells_copy_first_open_neighbour() {
        let mut f = Field::new(7, 7, 1);
        let mut mask = Field::new(7, 7, 1);
        f[(2, 3, 0)] = 4.0;
        f[(4, 3, 0)] = 9.0;
        mask[(3, 3, 0)] = 1.0;
        let identity = |f: &Field, x: usize, y: usize, c: usize| f.at(x, y, c);
        f.convolve_masked(
            &identity,
            &LinearBorder::NO_SLIP,
            &LinearBorder::ZERO,
            &mask,
            1,
        );
        // left wins over right
        assert_eq!(f.at(3, 3, 0), -4.0);
    }

    #[test]
    fn masked_cell_falls_through_priority_order() {
        let mut f = Field::new(7, 7, 1);
        let mut mask = Field::new(7, 7, 1);
        for (x, y) in [(3, 3), (2, 3), (4, 3)] {
            mask[(x, y, 0)] = 1.0;
        }
        f[(3, 2, 0)] = 5.0;
        let identity = |f: &Field, x: usize, y: usize, c: usize| f.at(x, y, c);
        f.convolve_masked(&identity, &LinearBorder::REFLECT, &LinearBorder::ZERO, &mask, 1);
        assert_eq!(f.at(3, 3, 0), 5.0);
    }

    #[test]
    fn masked_cell_falls_through_to_down() {
        let mut f = Field::new(7, 7, 1);
        let mut mask = Field::new(7, 7, 1);
        for (x, y) in [(3, 3), (2, 3), (4, 3), (3, 2)] {
            mask[(x, y, 0)] = 1.0;
        }
        f[(3, 4, 0)] = 6.0;
        let identity = |f: &Field, x: usize, y: usize, c: usize| f.at(x, y, c);
        f.convolve_masked(&identity, &LinearBorder::NO_SLIP, &LinearBorder::ZERO, &mask, 1);
        assert_eq!(f.at(3, 3, 0), -6.0);
    }

    #[test]
    fn enclosed_masked_cell_is_zeroed() {
        let mut f = Field::new(7, 7, 2);
        f.fill(1.0);
        let mut mask = Field::new(7, 7, 1);
        for (x, y) in [(3, 3), (2, 3), (4, 3), (3, 2), (3, 4)] {
            mask[(x, y, 0)] = 1.0;
        }
        let visc = ViscosityStencil::from_params(0.1, 0.1, 1);
        f.convolve_masked(&visc, &LinearBorder::REFLECT, &LinearBorder::REFLECT, &mask, 1);
        assert_eq!(f.at(3, 3, 0), 0.0);
        assert_eq!(f.at(3, 3, 1), 0.0);
    }

    #[test]
    fn zero_iterations_is_a_no_op() {
        let mut f = ramp(5, 5, 1);
        let before = f.clone();
        let visc = ViscosityStencil::from_params(0.1, 0.1, 1);
        f.convolve(&visc, &LinearBorder::ZERO, 0);
        assert_eq!(f, before);
    }
}
