//! In-memory serial flash

use sh1107_hal::flash::FlashReader;

/// Value returned for addresses outside the image (erased flash)
pub const ERASED: u8 = 0xFF;

/// Flash reader streaming from a byte slice mapped at `base`
pub struct MemoryFlash<'a> {
    image: &'a [u8],
    base: u32,
    position: usize,
    remaining: u16,
    hung: bool,
    requests: usize,
}

impl<'a> MemoryFlash<'a> {
    /// Map `image` at flash address `base`
    pub fn new(image: &'a [u8], base: u32) -> Self {
        Self {
            image,
            base,
            position: 0,
            remaining: 0,
            hung: false,
            requests: 0,
        }
    }

    /// Stay busy forever without delivering data
    pub fn hang(&mut self) {
        self.hung = true;
    }

    /// Number of stream requests seen
    pub fn requests(&self) -> usize {
        self.requests
    }
}

impl FlashReader for MemoryFlash<'_> {
    fn request(&mut self, address: u32, length: u16) {
        self.requests += 1;
        self.position = address.wrapping_sub(self.base) as usize;
        self.remaining = length;
    }

    fn busy(&self) -> bool {
        self.hung || self.remaining > 0
    }

    fn poll(&mut self) -> Option<u8> {
        if self.hung || self.remaining == 0 {
            return None;
        }
        let byte = self.image.get(self.position).copied().unwrap_or(ERASED);
        self.position += 1;
        self.remaining -= 1;
        Some(byte)
    }
}
