use image::codecs::jpeg::JpegEncoder;
use image::{ImageBuffer, Rgb};

use crate::error::{BridgecamError, Result};

/// Strip the alpha channel from an RGBA readback buffer.
pub fn rgba_to_rgb(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for pixel in rgba.chunks_exact(4) {
        rgb.extend_from_slice(&pixel[..3]);
    }
    rgb
}

/// Compress raw RGB pixel data to JPEG at the given quality (1-100).
pub fn compress_jpeg(data: &[u8], width: u32, height: u32, quality: u8) -> Result<Vec<u8>> {
    let img: ImageBuffer<Rgb<u8>, _> = ImageBuffer::from_raw(width, height, data)
        .ok_or_else(|| BridgecamError::Encode("buffer does not match dimensions".to_string()))?;

    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    img.write_with_encoder(encoder)
        .map_err(|e| BridgecamError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Downscale raw RGB data and encode it as JPEG.
///
/// Uses `fast_image_resize` for SIMD-accelerated resizing, then encodes at
/// the given quality.
pub fn downscale_jpeg(
    data: &[u8],
    width: u32,
    height: u32,
    dst_width: u32,
    dst_height: u32,
    quality: u8,
) -> Result<Vec<u8>> {
    use fast_image_resize as fr;
    use fr::images::Image;

    let src_image = Image::from_vec_u8(width, height, data.to_vec(), fr::PixelType::U8x3)
        .map_err(|e| BridgecamError::Encode(e.to_string()))?;
    let mut dst_image = Image::new(dst_width, dst_height, fr::PixelType::U8x3);

    let mut resizer = fr::Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, None)
        .map_err(|e| BridgecamError::Encode(e.to_string()))?;

    let resized_data = dst_image.into_vec();
    compress_jpeg(&resized_data, dst_width, dst_height, quality)
}
