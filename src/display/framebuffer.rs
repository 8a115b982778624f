// Frame Buffer - Stores pixel data for display output
//
// The display is 256×240 pixels. Each pixel is a `0x00RRGGBB` color.
// FrameSurface pairs two buffers: the emulation step writes the back buffer
// and `commit` swaps it to the front, so presentation only ever reads whole
// frames.

/// Screen width in pixels
pub const SCREEN_WIDTH: usize = 256;

/// Screen height in pixels
pub const SCREEN_HEIGHT: usize = 240;

/// Total number of pixels in the frame buffer
pub const SCREEN_SIZE: usize = SCREEN_WIDTH * SCREEN_HEIGHT;

/// Frame buffer for storing pixel data
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Pixel data stored as 0x00RRGGBB, row-major
    pixels: Box<[u32]>,
}

impl FrameBuffer {
    /// Create a new frame buffer initialized to black
    pub fn new() -> Self {
        Self {
            pixels: vec![0; SCREEN_SIZE].into_boxed_slice(),
        }
    }

    /// Set a pixel at the given coordinates
    ///
    /// # Panics
    /// Panics if coordinates are out of bounds
    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, rgb: u32) {
        assert!(x < SCREEN_WIDTH, "X coordinate {} out of bounds", x);
        assert!(y < SCREEN_HEIGHT, "Y coordinate {} out of bounds", y);

        self.pixels[y * SCREEN_WIDTH + x] = rgb & 0x00FF_FFFF;
    }

    /// Get a pixel at the given coordinates
    ///
    /// # Panics
    /// Panics if coordinates are out of bounds
    #[inline]
    pub fn get_pixel(&self, x: usize, y: usize) -> u32 {
        assert!(x < SCREEN_WIDTH, "X coordinate {} out of bounds", x);
        assert!(y < SCREEN_HEIGHT, "Y coordinate {} out of bounds", y);

        self.pixels[y * SCREEN_WIDTH + x]
    }

    /// Fill the frame buffer with one color
    pub fn clear(&mut self, rgb: u32) {
        self.pixels.fill(rgb & 0x00FF_FFFF);
    }

    /// Get the raw pixel data
    pub fn as_slice(&self) -> &[u32] {
        &self.pixels
    }

    /// Copy a full frame of pixels into this buffer
    ///
    /// Returns false and leaves the buffer unchanged if `pixels` is not
    /// exactly one frame long.
    pub fn copy_from_slice(&mut self, pixels: &[u32]) -> bool {
        if pixels.len() != SCREEN_SIZE {
            return false;
        }
        for (dst, &src) in self.pixels.iter_mut().zip(pixels) {
            *dst = src & 0x00FF_FFFF;
        }
        true
    }

    /// Convert the frame buffer to RGBA format for display
    ///
    /// # Panics
    /// Panics if output buffer is smaller than SCREEN_SIZE * 4 bytes
    pub fn to_rgba(&self, output: &mut [u8]) {
        assert!(
            output.len() >= SCREEN_SIZE * 4,
            "Output buffer too small for RGBA conversion"
        );

        for (rgb, rgba) in self.pixels.iter().zip(output.chunks_exact_mut(4)) {
            rgba[0] = (rgb >> 16) as u8; // R
            rgba[1] = (rgb >> 8) as u8; // G
            rgba[2] = *rgb as u8; // B
            rgba[3] = 0xFF; // A
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &SCREEN_WIDTH)
            .field("height", &SCREEN_HEIGHT)
            .finish()
    }
}

/// Double-buffered frame surface
#[derive(Debug, Default)]
pub struct FrameSurface {
    front: FrameBuffer,
    back: FrameBuffer,
    frames_committed: u64,
}

impl FrameSurface {
    /// Create a surface whose front buffer is black
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a full frame into the back buffer
    ///
    /// Returns false if `pixels` is not exactly one frame long.
    pub fn write(&mut self, pixels: &[u32]) -> bool {
        self.back.copy_from_slice(pixels)
    }

    /// Publish the back buffer as the new front buffer
    pub fn commit(&mut self) {
        std::mem::swap(&mut self.front, &mut self.back);
        self.frames_committed += 1;
    }

    /// The last committed frame
    pub fn front(&self) -> &FrameBuffer {
        &self.front
    }

    /// Number of frames committed so far
    pub fn frames_committed(&self) -> u64 {
        self.frames_committed
    }
}
