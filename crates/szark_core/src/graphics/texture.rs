//! RGB texture upload

use super::{Color, GraphicsDevice};
use crate::error::{CoreError, CoreResult};

fn dimensions(width: u32, height: u32, pixels: &[Color]) -> CoreResult<(i32, i32)> {
    let w = i32::try_from(width).map_err(|_| CoreError::InvalidArgument("texture width"))?;
    let h = i32::try_from(height).map_err(|_| CoreError::InvalidArgument("texture height"))?;
    let expected = (width as usize).checked_mul(height as usize);
    if expected != Some(pixels.len()) {
        return Err(CoreError::InvalidArgument("pixel buffer does not match texture size"));
    }
    Ok((w, h))
}

/// Create a nearest-filtered RGB texture from `pixels` and leave it bound
pub fn create_texture(
    device: &mut dyn GraphicsDevice,
    pixels: &[Color],
    width: u32,
    height: u32,
) -> CoreResult<u32> {
    let (w, h) = dimensions(width, height, pixels)?;
    let id = device.create_texture()?;
    device.bind_texture(id);
    device.upload_rgb(w, h, bytemuck::cast_slice(pixels));
    device.set_nearest_filtering();
    Ok(id)
}

/// Replace the contents of texture `id`, which must be at least this large
pub fn update_texture(
    device: &mut dyn GraphicsDevice,
    id: u32,
    pixels: &[Color],
    width: u32,
    height: u32,
) -> CoreResult<()> {
    let (w, h) = dimensions(width, height, pixels)?;
    device.bind_texture(id);
    device.update_rgb(w, h, bytemuck::cast_slice(pixels));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::fake::{FakeDevice, GlLog};

    #[test]
    fn test_create_uploads_packed_rgb() {
        let log = GlLog::default();
        let mut device = FakeDevice::new(log.clone());
        let pixels = vec![Color { r: 255, g: 0, b: 0 }; 6];
        let id = create_texture(&mut device, &pixels, 3, 2).unwrap();
        assert_eq!(id, 1);
        assert_eq!(
            log.calls(),
            vec!["create_texture 1", "bind_texture 1", "upload_rgb 3x2 18", "set_nearest_filtering"]
        );
    }

    #[test]
    fn test_size_mismatch_is_rejected_before_gl() {
        let log = GlLog::default();
        let mut device = FakeDevice::new(log.clone());
        let pixels = vec![Color::default(); 5];
        assert!(create_texture(&mut device, &pixels, 3, 2).is_err());
        assert!(log.calls().is_empty());
    }

    #[test]
    fn test_update_binds_then_replaces() {
        let log = GlLog::default();
        let mut device = FakeDevice::new(log.clone());
        let pixels = vec![Color::default(); 4];
        update_texture(&mut device, 7, &pixels, 2, 2).unwrap();
        assert_eq!(log.calls(), vec!["bind_texture 7", "update_rgb 2x2 12"]);
    }

    #[test]
    fn test_color_layout_is_three_bytes() {
        assert_eq!(std::mem::size_of::<Color>(), 3);
        let pixels = [Color { r: 1, g: 2, b: 3 }, Color { r: 4, g: 5, b: 6 }];
        let bytes: &[u8] = bytemuck::cast_slice(&pixels);
        assert_eq!(bytes, &[1, 2, 3, 4, 5, 6]);
    }
}
