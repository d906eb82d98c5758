//! Serial flash reader abstractions
//!
//! The boot loader and the diagnostic command read from external SPI flash
//! through a streaming reader: one request, then one byte per ready pulse
//! until the requested length is exhausted.

/// Streaming serial flash reader
pub trait FlashReader {
    /// Begin streaming `length` bytes starting at `address`
    ///
    /// A request made while a previous stream is still running replaces it.
    fn request(&mut self, address: u32, length: u16);

    /// A stream is in progress
    ///
    /// Stays asserted until every requested byte has been delivered.
    fn busy(&self) -> bool;

    /// Take the next streamed byte, if one is ready
    fn poll(&mut self) -> Option<u8>;
}

impl<T: FlashReader + ?Sized> FlashReader for &mut T {
    fn request(&mut self, address: u32, length: u16) {
        (**self).request(address, length)
    }

    fn busy(&self) -> bool {
        (**self).busy()
    }

    fn poll(&mut self) -> Option<u8> {
        (**self).poll()
    }
}
