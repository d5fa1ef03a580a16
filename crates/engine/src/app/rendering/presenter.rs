use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use super::frame::Frame;

/// Copies finished [`Frame`]s onto the window surface.
pub struct Presenter {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    width: u32,
    height: u32,
}

impl Presenter {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);
        let pixels = Self::build_pixels(Arc::clone(&window), width, height)?;
        Ok(Self {
            window,
            pixels,
            width,
            height,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub fn present(&mut self, frame: &Frame) -> Result<(), Error> {
        let target = self.pixels.frame_mut();
        if frame.size() == (self.width, self.height) {
            target.copy_from_slice(frame.pixels());
        } else {
            blit_nearest(frame, target, self.width, self.height);
        }
        self.pixels.render()
    }
}

fn blit_nearest(frame: &Frame, target: &mut [u8], width: u32, height: u32) {
    let (src_width, src_height) = frame.size();
    if src_width == 0 || src_height == 0 {
        return;
    }
    let src = frame.pixels();
    for y in 0..height as usize {
        let sy = y * src_height as usize / height as usize;
        for x in 0..width as usize {
            let sx = x * src_width as usize / width as usize;
            let from = (sy * src_width as usize + sx) * 4;
            let to = (y * width as usize + x) * 4;
            if to + 4 > target.len() {
                return;
            }
            target[to..to + 4].copy_from_slice(&src[from..from + 4]);
        }
    }
}
