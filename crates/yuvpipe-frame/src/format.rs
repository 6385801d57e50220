use std::fmt;

use crate::error::{FrameError, Result};

/// Frame size in pixels. Chroma planes are `width/2 × height/2`, truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Sentinel for "nothing announced yet"; never equal to a valid frame.
    pub const UNSET: Dimensions = Dimensions {
        width: 0,
        height: 0,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn chroma_width(&self) -> u32 {
        self.width / 2
    }

    pub fn chroma_height(&self) -> u32 {
        self.height / 2
    }

    /// `(row_width, rows)` of a plane in bytes.
    pub fn plane_geometry(&self, plane: PlaneKind) -> (usize, usize) {
        match plane {
            PlaneKind::Y => (self.width as usize, self.height as usize),
            PlaneKind::U | PlaneKind::V => {
                (self.chroma_width() as usize, self.chroma_height() as usize)
            }
        }
    }

    /// Packed size of one plane.
    pub fn plane_size(&self, plane: PlaneKind) -> usize {
        let (row_width, rows) = self.plane_geometry(plane);
        row_width.saturating_mul(rows)
    }

    pub fn luma_size(&self) -> usize {
        self.plane_size(PlaneKind::Y)
    }

    pub fn chroma_size(&self) -> usize {
        self.plane_size(PlaneKind::U)
    }

    /// Packed payload size of one frame: `w*h + 2*(w/2)*(h/2)`.
    pub fn frame_size(&self) -> usize {
        self.luma_size()
            .saturating_add(self.chroma_size().saturating_mul(2))
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The three planes of a YUV 4:2:0 frame, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneKind {
    Y,
    U,
    V,
}

impl PlaneKind {
    pub const ALL: [PlaneKind; 3] = [PlaneKind::Y, PlaneKind::U, PlaneKind::V];

    pub fn index(self) -> usize {
        match self {
            PlaneKind::Y => 0,
            PlaneKind::U => 1,
            PlaneKind::V => 2,
        }
    }
}

impl fmt::Display for PlaneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlaneKind::Y => "Y",
            PlaneKind::U => "U",
            PlaneKind::V => "V",
        })
    }
}

/// One image plane: a borrowed byte slice and its row stride.
#[derive(Debug, Clone, Copy)]
pub struct Plane<'a> {
    pub data: &'a [u8],
    pub linesize: usize,
}

impl<'a> Plane<'a> {
    pub fn new(data: &'a [u8], linesize: usize) -> Self {
        Self { data, linesize }
    }

    /// Iterate the logical rows of this plane, skipping stride padding.
    ///
    /// Callers must have validated the plane against `row_width` and `rows`.
    pub fn rows(&self, row_width: usize, rows: usize) -> impl Iterator<Item = &'a [u8]> + 'a {
        let data = self.data;
        let linesize = self.linesize;
        (0..rows).map(move |row| {
            let start = row * linesize;
            &data[start..start + row_width]
        })
    }
}

/// A decoded planar YUV 4:2:0 frame, borrowed from the upstream decoder for
/// the duration of a single push.
#[derive(Debug, Clone, Copy)]
pub struct VideoFrame<'a> {
    dimensions: Dimensions,
    planes: [Plane<'a>; 3],
    pts: Option<i64>,
}

impl<'a> VideoFrame<'a> {
    /// Build a frame from three planes in Y, U, V order.
    ///
    /// Fails if either dimension is zero, a stride is shorter than its row,
    /// or a plane slice cannot hold all of its rows.
    pub fn new(width: u32, height: u32, planes: [Plane<'a>; 3], pts: Option<i64>) -> Result<Self> {
        let dimensions = Dimensions::new(width, height);
        if dimensions.is_empty() {
            return Err(FrameError::InvalidDimensions { width, height });
        }

        for kind in PlaneKind::ALL {
            let plane = &planes[kind.index()];
            let (row_width, rows) = dimensions.plane_geometry(kind);
            if plane.linesize < row_width {
                return Err(FrameError::InvalidStride {
                    plane: kind,
                    linesize: plane.linesize,
                    row_width,
                });
            }

            let required = match rows {
                0 => 0,
                rows => (rows - 1)
                    .checked_mul(plane.linesize)
                    .and_then(|n| n.checked_add(row_width))
                    .unwrap_or(usize::MAX),
            };
            if plane.data.len() < required {
                return Err(FrameError::PlaneTooShort {
                    plane: kind,
                    len: plane.data.len(),
                    required,
                });
            }
        }

        Ok(Self {
            dimensions,
            planes,
            pts,
        })
    }

    /// Build a frame over a single tightly packed Y, U, V buffer.
    pub fn from_packed(width: u32, height: u32, data: &'a [u8], pts: Option<i64>) -> Result<Self> {
        let dimensions = Dimensions::new(width, height);
        let luma = dimensions.luma_size();
        let chroma = dimensions.chroma_size();
        if data.len() < dimensions.frame_size() {
            return Err(FrameError::PlaneTooShort {
                plane: PlaneKind::Y,
                len: data.len(),
                required: dimensions.frame_size(),
            });
        }

        let (y, rest) = data.split_at(luma);
        let (u, v) = rest.split_at(chroma);
        Self::new(
            width,
            height,
            [
                Plane::new(y, dimensions.width as usize),
                Plane::new(u, dimensions.chroma_width() as usize),
                Plane::new(v, dimensions.chroma_width() as usize),
            ],
            pts,
        )
    }

    pub fn width(&self) -> u32 {
        self.dimensions.width
    }

    pub fn height(&self) -> u32 {
        self.dimensions.height
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Presentation timestamp in stream time-base units, `None` if unknown.
    pub fn pts(&self) -> Option<i64> {
        self.pts
    }

    pub fn plane(&self, kind: PlaneKind) -> &Plane<'a> {
        &self.planes[kind.index()]
    }

    /// Logical rows of one plane, padding stripped.
    pub fn plane_rows(&self, kind: PlaneKind) -> impl Iterator<Item = &'a [u8]> + 'a {
        let (row_width, rows) = self.dimensions.plane_geometry(kind);
        self.planes[kind.index()].rows(row_width, rows)
    }

    /// The packed bytes of one plane, if it carries no stride padding.
    pub fn packed_plane(&self, kind: PlaneKind) -> Option<&'a [u8]> {
        let (row_width, _) = self.dimensions.plane_geometry(kind);
        let plane = self.planes[kind.index()];
        let size = self.dimensions.plane_size(kind);
        (plane.linesize == row_width).then(|| &plane.data[..size])
    }

    /// True when every stride equals its row width, so the planes can be
    /// written without repacking.
    pub fn is_packed(&self) -> bool {
        PlaneKind::ALL.iter().all(|&kind| {
            let (row_width, _) = self.dimensions.plane_geometry(kind);
            self.planes[kind.index()].linesize == row_width
        })
    }
}

/// Rational time base in seconds per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBase {
    num: i32,
    den: i32,
}

impl TimeBase {
    pub const MICROSECONDS: TimeBase = TimeBase {
        num: 1,
        den: 1_000_000,
    };

    pub fn new(num: i32, den: i32) -> Result<Self> {
        if num <= 0 || den <= 0 {
            return Err(FrameError::InvalidTimeBase { num, den });
        }
        Ok(Self { num, den })
    }

    pub fn num(&self) -> i32 {
        self.num
    }

    pub fn den(&self) -> i32 {
        self.den
    }

    /// Rescale `ticks` to whole microseconds.
    ///
    /// Computes `ticks * num * 1_000_000 / den` in 128-bit arithmetic, so no
    /// intermediate overflows; the result saturates at the i64 range.
    pub fn rescale_to_micros(&self, ticks: i64, rounding: TimestampRounding) -> i64 {
        let scaled = i128::from(ticks).abs() * i128::from(self.num) * 1_000_000;
        let den = i128::from(self.den);
        let magnitude = match rounding {
            TimestampRounding::Truncate => scaled / den,
            TimestampRounding::NearestTiesAway => (scaled + den / 2) / den,
        };
        let value = if ticks < 0 { -magnitude } else { magnitude };
        i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
    }
}

impl fmt::Display for TimeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// How sub-microsecond remainders are resolved when rescaling timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimestampRounding {
    /// Drop the remainder (round toward zero).
    #[default]
    Truncate,
    /// Round to the nearest microsecond, halves away from zero, as
    /// `av_rescale_q` does.
    NearestTiesAway,
}

/// Stream parameters handed to a sink when it opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParams {
    pub time_base: TimeBase,
    pub rounding: TimestampRounding,
}

impl StreamParams {
    pub fn new(time_base: TimeBase) -> Self {
        Self {
            time_base,
            rounding: TimestampRounding::default(),
        }
    }

    /// Frame timestamp in microseconds; frames without one map to 0.
    pub fn timestamp_micros(&self, pts: Option<i64>) -> i64 {
        match pts {
            Some(ticks) => self.time_base.rescale_to_micros(ticks, self.rounding),
            None => 0,
        }
    }
}
