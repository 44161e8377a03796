//! Pixel-level orientation normalization.
//!
//! Raw photos carry one of the eight EXIF orientation tags. [`normalize`]
//! remaps the pixels so the result is upright and unmirrored whatever the
//! tag was.

use crate::capture::Frame;
use serde::Serialize;

/// How stored pixels relate to the upright scene (EXIF tags 1-8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// 1: stored upright.
    Up,
    /// 2: mirrored horizontally.
    UpMirrored,
    /// 3: rotated 180°.
    Down,
    /// 4: mirrored vertically.
    DownMirrored,
    /// 5: transposed.
    LeftMirrored,
    /// 6: needs a 90° clockwise turn to be upright.
    Right,
    /// 7: transversed.
    RightMirrored,
    /// 8: needs a 90° counter-clockwise turn to be upright.
    Left,
}

impl Orientation {
    /// All tags, in EXIF order.
    pub const ALL: [Orientation; 8] = [
        Orientation::Up,
        Orientation::UpMirrored,
        Orientation::Down,
        Orientation::DownMirrored,
        Orientation::LeftMirrored,
        Orientation::Right,
        Orientation::RightMirrored,
        Orientation::Left,
    ];

    /// EXIF tag value.
    pub fn exif(self) -> u8 {
        match self {
            Orientation::Up => 1,
            Orientation::UpMirrored => 2,
            Orientation::Down => 3,
            Orientation::DownMirrored => 4,
            Orientation::LeftMirrored => 5,
            Orientation::Right => 6,
            Orientation::RightMirrored => 7,
            Orientation::Left => 8,
        }
    }

    /// Parses an EXIF tag value.
    pub fn from_exif(tag: u8) -> Option<Self> {
        Self::ALL.get(usize::from(tag).checked_sub(1)?).copied()
    }

    /// Whether the stored pixels are mirrored.
    pub fn is_mirrored(self) -> bool {
        matches!(
            self,
            Orientation::UpMirrored
                | Orientation::DownMirrored
                | Orientation::LeftMirrored
                | Orientation::RightMirrored
        )
    }

    /// The same rotation with mirroring toggled.
    pub fn mirrored(self) -> Self {
        match self {
            Orientation::Up => Orientation::UpMirrored,
            Orientation::UpMirrored => Orientation::Up,
            Orientation::Down => Orientation::DownMirrored,
            Orientation::DownMirrored => Orientation::Down,
            Orientation::LeftMirrored => Orientation::Left,
            Orientation::Left => Orientation::LeftMirrored,
            Orientation::Right => Orientation::RightMirrored,
            Orientation::RightMirrored => Orientation::Right,
        }
    }

    /// Whether normalizing swaps width and height.
    pub fn swaps_dimensions(self) -> bool {
        matches!(
            self,
            Orientation::LeftMirrored
                | Orientation::Right
                | Orientation::RightMirrored
                | Orientation::Left
        )
    }

    /// The tag whose normalization undoes this one's.
    fn inverse(self) -> Self {
        match self {
            Orientation::Right => Orientation::Left,
            Orientation::Left => Orientation::Right,
            other => other,
        }
    }
}

/// Remaps `frame`, stored with `orientation`, into upright pixels.
pub fn normalize(frame: &Frame, orientation: Orientation) -> Frame {
    let (w, h) = (frame.width(), frame.height());
    let (out_w, out_h) = if orientation.swaps_dimensions() {
        (h, w)
    } else {
        (w, h)
    };

    // Source coordinate for each output coordinate.
    let source = |x: u32, y: u32| -> (u32, u32) {
        match orientation {
            Orientation::Up => (x, y),
            Orientation::UpMirrored => (w - 1 - x, y),
            Orientation::Down => (w - 1 - x, h - 1 - y),
            Orientation::DownMirrored => (x, h - 1 - y),
            Orientation::LeftMirrored => (y, x),
            Orientation::Right => (y, h - 1 - x),
            Orientation::RightMirrored => (w - 1 - y, h - 1 - x),
            Orientation::Left => (w - 1 - y, x),
        }
    };

    remap(frame, out_w, out_h, source)
}

/// Stores an upright `frame` as hardware tagging it `orientation` would.
///
/// `normalize(&reorient(f, o), o) == f` for every tag.
pub fn reorient(frame: &Frame, orientation: Orientation) -> Frame {
    normalize(frame, orientation.inverse())
}

/// Decimates `frame` so its longer edge is at most `max_dimension`.
pub fn downscale(frame: &Frame, max_dimension: u32) -> Frame {
    let longest = frame.width().max(frame.height());
    let empty = frame.width() == 0 || frame.height() == 0;
    if empty || max_dimension == 0 || longest <= max_dimension {
        return frame.clone();
    }

    let factor = longest.div_ceil(max_dimension);
    let out_w = (frame.width() / factor).max(1);
    let out_h = (frame.height() / factor).max(1);
    remap(frame, out_w, out_h, |x, y| (x * factor, y * factor))
}

fn remap(frame: &Frame, out_w: u32, out_h: u32, source: impl Fn(u32, u32) -> (u32, u32)) -> Frame {
    let bpp = frame.format().bytes_per_pixel();
    let mut pixels = Vec::with_capacity(out_w as usize * out_h as usize * bpp);
    for y in 0..out_h {
        for x in 0..out_w {
            let (sx, sy) = source(x, y);
            pixels.extend_from_slice(frame.pixel(sx, sy));
        }
    }
    Frame::new(pixels, out_w, out_h, frame.format())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PixelFormat;
    use proptest::prelude::*;

    /// 3x2 grayscale frame:
    /// ```text
    /// 1 2 3
    /// 4 5 6
    /// ```
    fn sample() -> Frame {
        Frame::new(vec![1, 2, 3, 4, 5, 6], 3, 2, PixelFormat::Gray8)
    }

    #[test]
    fn test_up_is_identity() {
        assert_eq!(normalize(&sample(), Orientation::Up), sample());
    }

    #[test]
    fn test_mirror_flip() {
        let out = normalize(&sample(), Orientation::UpMirrored);
        assert_eq!(out.pixels(), &[3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn test_rotate_clockwise() {
        let out = normalize(&sample(), Orientation::Right);
        assert_eq!((out.width(), out.height()), (2, 3));
        assert_eq!(out.pixels(), &[4, 1, 5, 2, 6, 3]);
    }

    #[test]
    fn test_rotate_counter_clockwise() {
        let out = normalize(&sample(), Orientation::Left);
        assert_eq!((out.width(), out.height()), (2, 3));
        assert_eq!(out.pixels(), &[3, 6, 2, 5, 1, 4]);
    }

    #[test]
    fn test_exif_round_trip() {
        for orientation in Orientation::ALL {
            assert_eq!(Orientation::from_exif(orientation.exif()), Some(orientation));
        }
        assert_eq!(Orientation::from_exif(0), None);
        assert_eq!(Orientation::from_exif(9), None);
    }

    #[test]
    fn test_mirrored_toggles() {
        for orientation in Orientation::ALL {
            assert_ne!(orientation.is_mirrored(), orientation.mirrored().is_mirrored());
            assert_eq!(orientation.mirrored().mirrored(), orientation);
        }
    }

    #[test]
    fn test_downscale_caps_longest_edge() {
        let frame = Frame::new(vec![0u8; 10 * 4 * 3], 10, 4, PixelFormat::Rgb8);
        let out = downscale(&frame, 3);
        assert!(out.width().max(out.height()) <= 3);
        assert!(out.is_valid());

        let unchanged = downscale(&frame, 10);
        assert_eq!(unchanged, frame);
    }

    #[test]
    fn test_downscale_leaves_empty_frame_alone() {
        let frame = Frame::new(Vec::new(), 0, 10, PixelFormat::Rgb8);
        assert_eq!(downscale(&frame, 4), frame);
    }

    fn arb_frame() -> impl Strategy<Value = Frame> {
        (1u32..9, 1u32..9).prop_flat_map(|(w, h)| {
            prop::collection::vec(any::<u8>(), (w * h * 3) as usize)
                .prop_map(move |pixels| Frame::new(pixels, w, h, PixelFormat::Rgb8))
        })
    }

    fn arb_orientation() -> impl Strategy<Value = Orientation> {
        prop::sample::select(Orientation::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_normalize_undoes_reorient(frame in arb_frame(), orientation in arb_orientation()) {
            let stored = reorient(&frame, orientation);
            prop_assert_eq!(normalize(&stored, orientation), frame);
        }

        #[test]
        fn prop_normalize_preserves_pixel_count(frame in arb_frame(), orientation in arb_orientation()) {
            let out = normalize(&frame, orientation);
            prop_assert!(out.is_valid());
            prop_assert_eq!(out.pixel_count(), frame.pixel_count());
        }

        #[test]
        fn prop_downscale_bounds(frame in arb_frame(), max in 1u32..10) {
            let out = downscale(&frame, max);
            prop_assert!(out.width().max(out.height()) <= max.max(1));
            prop_assert!(out.is_valid());
        }
    }
}
