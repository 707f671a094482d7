//! Display buffers: the game draws into a back buffer that is presented to
//! the visible canvas at the end of each frame.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

pub struct Display {
    /// Frame currently being drawn
    pub buffer: RgbaImage,
    /// What the page shows
    pub visible: RgbaImage,
}

impl Display {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buffer: RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255])),
            visible: RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255])),
        }
    }

    /// Copy the back buffer onto the visible canvas
    pub fn present(&mut self) {
        self.visible.clone_from(&self.buffer);
    }

    /// Encode the visible canvas as a `data:image/png;base64,` URL
    pub fn to_data_url(&self) -> Result<String, image::ImageError> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(self.visible.clone())
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(format!(
            "data:image/png;base64,{}",
            BASE64_STANDARD.encode(&bytes)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_copies_buffer() {
        let mut display = Display::new(4, 4);
        display.buffer.put_pixel(1, 2, Rgba([255, 0, 0, 255]));
        assert_eq!(*display.visible.get_pixel(1, 2), Rgba([0, 0, 0, 255]));
        display.present();
        assert_eq!(*display.visible.get_pixel(1, 2), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_data_url_is_png() {
        let display = Display::new(8, 8);
        let url = display.to_data_url().unwrap();
        let payload = url.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = BASE64_STANDARD.decode(payload).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
