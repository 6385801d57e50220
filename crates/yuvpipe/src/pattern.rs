use yuvpipe_frame::{Dimensions, FrameError, Plane, PlaneKind, VideoFrame};

const PAD_BYTE: u8 = 0xEE;

/// Moving gradient test pattern, rendered into reusable plane buffers.
///
/// Rows are laid out with `pad` extra bytes of stride so a non-zero pad
/// exercises the sink's repacking path.
pub struct TestPattern {
    pad: usize,
    planes: [Vec<u8>; 3],
}

impl TestPattern {
    pub fn new(pad: usize) -> Self {
        Self {
            pad,
            planes: [Vec::new(), Vec::new(), Vec::new()],
        }
    }

    /// Render frame `index` at `dimensions`.
    pub fn render(
        &mut self,
        dimensions: Dimensions,
        index: u64,
        pts: Option<i64>,
    ) -> Result<VideoFrame<'_>, FrameError> {
        for kind in PlaneKind::ALL {
            let (row_width, rows) = dimensions.plane_geometry(kind);
            let stride = row_width + self.pad;
            let plane = &mut self.planes[kind.index()];
            plane.clear();
            plane.resize(stride * rows, PAD_BYTE);
            for (row, line) in plane.chunks_mut(stride.max(1)).take(rows).enumerate() {
                for (col, sample) in line[..row_width].iter_mut().enumerate() {
                    *sample = sample_value(kind, col, row, index);
                }
            }
        }

        let luma_stride = dimensions.width as usize + self.pad;
        let chroma_stride = dimensions.chroma_width() as usize + self.pad;
        let [y, u, v] = &self.planes;
        VideoFrame::new(
            dimensions.width,
            dimensions.height,
            [
                Plane::new(y, luma_stride),
                Plane::new(u, chroma_stride),
                Plane::new(v, chroma_stride),
            ],
            pts,
        )
    }
}

fn sample_value(kind: PlaneKind, col: usize, row: usize, index: u64) -> u8 {
    let shift = (index as usize).wrapping_mul(2);
    match kind {
        PlaneKind::Y => col.wrapping_add(row).wrapping_add(shift) as u8,
        PlaneKind::U => 128u8.wrapping_add((col.wrapping_add(shift) / 4) as u8),
        PlaneKind::V => 128u8.wrapping_sub((row.wrapping_add(shift) / 4) as u8),
    }
}

/// Frame size for frame `index`: `base`, halved on every other run of
/// `resize_every` frames.
pub fn dimensions_at(base: Dimensions, index: u64, resize_every: Option<u64>) -> Dimensions {
    match resize_every {
        Some(n) if n > 0 && (index / n) % 2 == 1 => {
            Dimensions::new((base.width / 2).max(1), (base.height / 2).max(1))
        }
        _ => base,
    }
}
