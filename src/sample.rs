//! Sample data model: frames, light state, and the per-tick record that
//! pairs them.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// Channel-major frame dimensions (channels × height × width).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameShape {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl FrameShape {
    pub const fn new(channels: usize, height: usize, width: usize) -> Self {
        Self {
            channels,
            height,
            width,
        }
    }

    /// Number of intensity values in one frame.
    pub const fn len(&self) -> usize {
        self.channels * self.height * self.width
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values per channel plane.
    /// [`len`](Self::len) for shapes that come from untrusted input.
    pub fn checked_len(&self) -> Option<usize> {
        self.channels
            .checked_mul(self.height)?
            .checked_mul(self.width)
    }

    pub const fn plane_len(&self) -> usize {
        self.height * self.width
    }
}

/// One captured image.  `data.len() == shape.len()` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    shape: FrameShape,
    data: Box<[u8]>,
    synthetic: bool,
}

impl Frame {
    /// Wrap raw channel-major intensities.  Returns `None` when the data
    /// length does not match the shape.
    pub fn new(shape: FrameShape, data: Vec<u8>) -> Option<Self> {
        if data.len() != shape.len() {
            return None;
        }
        Some(Self {
            shape,
            data: data.into_boxed_slice(),
            synthetic: false,
        })
    }

    /// Test pattern produced when no camera hardware is present.
    /// `seq` moves the gradient so consecutive frames differ.
    pub fn synthetic(shape: FrameShape, seq: u64) -> Self {
        let mut data = vec![0u8; shape.len()];
        let plane = shape.plane_len();
        for (i, v) in data.iter_mut().enumerate() {
            let c = i / plane.max(1);
            let y = (i % plane.max(1)) / shape.width.max(1);
            let x = i % shape.width.max(1);
            *v = ((x + y + c * 64) as u64).wrapping_add(seq.wrapping_mul(7)) as u8;
        }
        Self {
            shape,
            data: data.into_boxed_slice(),
            synthetic: true,
        }
    }

    pub(crate) fn from_parts(shape: FrameShape, data: Box<[u8]>, synthetic: bool) -> Self {
        debug_assert_eq!(data.len(), shape.len());
        Self {
            shape,
            data,
            synthetic,
        }
    }

    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// True when the frame is a generated test pattern, not a capture.
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }
}

// ---------------------------------------------------------------------------
// Light state
// ---------------------------------------------------------------------------

/// Polled state of the smart light.
///
/// `Default` is the fail-closed value used when the device cannot be
/// reached: off, zero brightness, zero colour temperature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightState {
    pub on: bool,
    /// Brightness percentage (0–100).
    pub brightness: u8,
    /// Colour temperature in Kelvin.
    pub color_temperature: u16,
}

// ---------------------------------------------------------------------------
// Sample
// ---------------------------------------------------------------------------

/// A synchronized (frame, light-state) record produced once per tick.
/// Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    timestamp: i64,
    frame: Frame,
    light: LightState,
}

impl Sample {
    pub fn new(timestamp: i64, frame: Frame, light: LightState) -> Self {
        Self {
            timestamp,
            frame,
            light,
        }
    }

    /// Wall-clock seconds at capture.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn light(&self) -> LightState {
        self.light
    }

    pub fn is_on(&self) -> bool {
        self.light.on
    }
}
