//! Colour encoding for baked texels.

use terra_math::Vec3;

/// Linear to sRGB transfer for one channel in `[0, 1]`.
#[inline]
pub fn srgb_compress(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// sRGB to linear transfer for one channel in `[0, 1]`.
#[inline]
pub fn srgb_decompress(c: f32) -> f32 {
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Decode an sRGB colour to linear.
pub fn srgb_to_linear(color: &Vec3) -> Vec3 {
    color.map(srgb_decompress)
}

#[inline]
fn unorm8(c: f32) -> u32 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u32
}

/// Pack a linear colour as BGRA8 in a `u32` (`0xAARRGGBB`) with opaque alpha,
/// sRGB-encoding it first when `srgb` is set.
#[inline]
pub fn pack_bgra(color: &Vec3, srgb: bool) -> u32 {
    let encoded = if srgb {
        color.map(|c| srgb_compress(c.clamp(0.0, 1.0)))
    } else {
        *color
    };

    (0xff << 24) | (unorm8(encoded.x) << 16) | (unorm8(encoded.y) << 8) | unorm8(encoded.z)
}
