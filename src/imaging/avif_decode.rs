//! AVIF source decoding: `avif-parse` for the container, `rav1d` for AV1.
//!
//! The `image` crate's `"avif"` feature only enables the encoder (rav1e);
//! its decoder needs the dav1d C library. `rav1d` is the pure Rust port, driven
//! here through its dav1d-compatible C API.
//!
//! Decoded planes are copied out of the rav1d picture immediately, so all
//! color conversion below works on owned buffers. An alpha auxiliary image,
//! when present, is decoded the same way and its luma plane becomes the alpha
//! channel.

use super::backend::BackendError;
use image::{DynamicImage, RgbImage, RgbaImage};
use rav1d::include::dav1d::data::Dav1dData;
use rav1d::include::dav1d::dav1d::Dav1dSettings;
use rav1d::include::dav1d::headers::{
    DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
    DAV1D_PIXEL_LAYOUT_I444,
};
use rav1d::include::dav1d::picture::Dav1dPicture;
use rav1d::src::lib::{
    dav1d_close, dav1d_data_create, dav1d_data_unref, dav1d_default_settings, dav1d_get_picture,
    dav1d_open, dav1d_picture_unref, dav1d_send_data,
};
use std::mem::MaybeUninit;
use std::path::Path;
use std::ptr::NonNull;
use tracing::debug;

/// Decode an AVIF file into RGB8, or RGBA8 when it carries alpha.
pub fn decode_avif(path: &Path) -> Result<DynamicImage, BackendError> {
    let bytes = std::fs::read(path).map_err(|e| BackendError::decode(path, e.to_string()))?;
    let avif = avif_parse::read_avif(&mut std::io::Cursor::new(&bytes))
        .map_err(|e| BackendError::decode(path, format!("invalid AVIF container: {e:?}")))?;

    let color_bytes: &[u8] = &avif.primary_item;
    let color = decode_av1(color_bytes).map_err(|m| BackendError::decode(path, m))?;
    let (width, height) = (color.luma.width, color.luma.height);
    let rgb = color.to_rgb8();

    let alpha = match avif.alpha_item.as_ref() {
        Some(item) => {
            let alpha_bytes: &[u8] = item;
            let frame = decode_av1(alpha_bytes).map_err(|m| BackendError::decode(path, m))?;
            if frame.luma.width == width && frame.luma.height == height {
                Some(frame.luma.to_u8(frame.bit_depth))
            } else {
                debug!(
                    "ignoring alpha plane of {}: {}x{} does not match {}x{}",
                    path.display(),
                    frame.luma.width,
                    frame.luma.height,
                    width,
                    height
                );
                None
            }
        }
        None => None,
    };

    let image = match alpha {
        Some(alpha) => {
            let rgba: Vec<u8> = rgb
                .chunks_exact(3)
                .zip(alpha)
                .flat_map(|(px, a)| [px[0], px[1], px[2], a])
                .collect();
            RgbaImage::from_raw(width, height, rgba).map(DynamicImage::ImageRgba8)
        }
        None => RgbImage::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8),
    };
    image.ok_or_else(|| BackendError::decode(path, "decoded AVIF buffer has the wrong size"))
}

/// One image plane, samples widened to u16, rows packed without padding.
struct Plane {
    width: u32,
    height: u32,
    samples: Vec<u16>,
}

impl Plane {
    fn at(&self, x: u32, y: u32) -> f32 {
        f32::from(self.samples[(y * self.width + x) as usize])
    }

    /// Rescale samples to 8 bits.
    fn to_u8(&self, bit_depth: u32) -> Vec<u8> {
        let max = ((1u32 << bit_depth) - 1) as f32;
        self.samples
            .iter()
            .map(|&s| (f32::from(s) * 255.0 / max).round().clamp(0.0, 255.0) as u8)
            .collect()
    }
}

/// Decoded AV1 frame with optional chroma planes (absent for monochrome).
struct Frame {
    luma: Plane,
    chroma: Option<Chroma>,
    bit_depth: u32,
}

struct Chroma {
    cb: Plane,
    cr: Plane,
    subsample_x: bool,
    subsample_y: bool,
}

impl Frame {
    /// Interleaved RGB8 using BT.601 coefficients.
    fn to_rgb8(&self) -> Vec<u8> {
        let Some(chroma) = &self.chroma else {
            return self
                .luma
                .to_u8(self.bit_depth)
                .into_iter()
                .flat_map(|v| [v, v, v])
                .collect();
        };

        let max = ((1u32 << self.bit_depth) - 1) as f32;
        let center = (1u32 << (self.bit_depth - 1)) as f32;
        let scale = 255.0 / max;
        let to_u8 = |v: f32| (v * scale).round().clamp(0.0, 255.0) as u8;

        let (w, h) = (self.luma.width, self.luma.height);
        let mut rgb = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            let cy = if chroma.subsample_y { y / 2 } else { y };
            for x in 0..w {
                let cx = if chroma.subsample_x { x / 2 } else { x };
                let luma = self.luma.at(x, y);
                let cb = chroma.cb.at(cx, cy) - center;
                let cr = chroma.cr.at(cx, cy) - center;
                rgb.push(to_u8(luma + 1.402 * cr));
                rgb.push(to_u8(luma - 0.344136 * cb - 0.714136 * cr));
                rgb.push(to_u8(luma + 1.772 * cb));
            }
        }
        rgb
    }
}

/// Decode a single AV1 payload with a fresh rav1d context.
fn decode_av1(bytes: &[u8]) -> Result<Frame, String> {
    let mut settings = MaybeUninit::<Dav1dSettings>::uninit();
    let settings_ptr =
        NonNull::new(settings.as_mut_ptr()).ok_or_else(|| "rav1d settings pointer".to_string())?;
    unsafe { dav1d_default_settings(settings_ptr) };
    let mut settings = unsafe { settings.assume_init() };
    settings.n_threads = 1;
    settings.max_frame_delay = 1;

    let mut ctx = None;
    let rc = unsafe { dav1d_open(NonNull::new(&mut ctx), NonNull::new(&mut settings)) };
    if rc.0 != 0 {
        return Err(format!("rav1d open failed ({})", rc.0));
    }

    // The context must be closed on every path, so the body runs as a closure.
    let frame = (|| {
        let mut data = Dav1dData::default();
        let buf = unsafe { dav1d_data_create(NonNull::new(&mut data), bytes.len()) };
        if buf.is_null() {
            return Err("rav1d data_create failed".to_string());
        }
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), buf, bytes.len()) };

        let rc = unsafe { dav1d_send_data(ctx, NonNull::new(&mut data)) };
        if rc.0 != 0 {
            unsafe { dav1d_data_unref(NonNull::new(&mut data)) };
            return Err(format!("rav1d send_data failed ({})", rc.0));
        }

        let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };
        let rc = unsafe { dav1d_get_picture(ctx, NonNull::new(&mut pic)) };
        if rc.0 != 0 {
            return Err(format!("rav1d get_picture failed ({})", rc.0));
        }
        let frame = unsafe { copy_frame(&pic) };
        unsafe { dav1d_picture_unref(NonNull::new(&mut pic)) };
        frame
    })();

    unsafe { dav1d_close(NonNull::new(&mut ctx)) };
    frame
}

/// Copy the planes of a decoded picture into owned buffers.
///
/// # Safety
/// `pic` must be a picture returned by a successful `dav1d_get_picture` that
/// has not been unreferenced yet.
unsafe fn copy_frame(pic: &Dav1dPicture) -> Result<Frame, String> {
    let width = pic.p.w as u32;
    let height = pic.p.h as u32;
    let bit_depth = pic.p.bpc as u32;

    let plane_ptr = |i: usize| {
        pic.data[i]
            .map(|p| p.as_ptr() as *const u8)
            .ok_or_else(|| format!("rav1d picture is missing plane {i}"))
    };

    let luma = unsafe { copy_plane(plane_ptr(0)?, pic.stride[0], width, height, bit_depth) };

    let (subsample_x, subsample_y) = match pic.p.layout {
        DAV1D_PIXEL_LAYOUT_I400 => {
            return Ok(Frame {
                luma,
                chroma: None,
                bit_depth,
            });
        }
        DAV1D_PIXEL_LAYOUT_I420 => (true, true),
        DAV1D_PIXEL_LAYOUT_I422 => (true, false),
        DAV1D_PIXEL_LAYOUT_I444 => (false, false),
        other => return Err(format!("unsupported AVIF pixel layout: {other}")),
    };

    let chroma_w = if subsample_x { width.div_ceil(2) } else { width };
    let chroma_h = if subsample_y { height.div_ceil(2) } else { height };
    let cb = unsafe { copy_plane(plane_ptr(1)?, pic.stride[1], chroma_w, chroma_h, bit_depth) };
    let cr = unsafe { copy_plane(plane_ptr(2)?, pic.stride[1], chroma_w, chroma_h, bit_depth) };

    Ok(Frame {
        luma,
        chroma: Some(Chroma {
            cb,
            cr,
            subsample_x,
            subsample_y,
        }),
        bit_depth,
    })
}

/// Copy one plane; samples are bytes at 8 bpc and native-endian u16 above.
///
/// # Safety
/// `ptr` must point at a plane of at least `height` rows of `stride` bytes,
/// each holding `width` samples.
unsafe fn copy_plane(ptr: *const u8, stride: isize, width: u32, height: u32, bpc: u32) -> Plane {
    let mut samples = Vec::with_capacity((width * height) as usize);
    for y in 0..height as isize {
        let row = unsafe { ptr.offset(y * stride) };
        for x in 0..width as usize {
            let sample = if bpc <= 8 {
                u16::from(unsafe { *row.add(x) })
            } else {
                unsafe { (row.add(x * 2) as *const u16).read_unaligned() }
            };
            samples.push(sample);
        }
    }
    Plane {
        width,
        height,
        samples,
    }
}
