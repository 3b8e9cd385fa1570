use thiserror::Error;

/// Layout of raw pixel bytes handed to a [`Texture`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PixelFormat {
    /// Single 8-bit channel (camera luma).
    R8,
    /// 8-bit RGBA, sRGB encoded.
    Rgba8,
    /// 8-bit BGRA, sRGB encoded (OS window captures).
    Bgra8,
    /// Two half floats (lens distortion lookup).
    Rg16Float,
}

impl PixelFormat {
    #[inline]
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::R8 => 1,
            Self::Rgba8 | Self::Bgra8 | Self::Rg16Float => 4,
        }
    }

    pub const fn wgpu_format(self) -> wgpu::TextureFormat {
        match self {
            Self::R8 => wgpu::TextureFormat::R8Unorm,
            Self::Rgba8 => wgpu::TextureFormat::Rgba8UnormSrgb,
            Self::Bgra8 => wgpu::TextureFormat::Bgra8UnormSrgb,
            Self::Rg16Float => wgpu::TextureFormat::Rg16Float,
        }
    }
}

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("texture `{label}` has zero size")]
    ZeroSize { label: String },

    #[error("texture `{label}`: expected {expected} bytes of pixel data, got {actual}")]
    SizeMismatch { label: String, expected: usize, actual: usize },

    #[error("failed to decode image `{path}`")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

/// Checks that `len` bytes describe a `width`×`height` image of `format`.
pub fn validate_pixels(label: &str, width: u32, height: u32, format: PixelFormat, len: usize) -> Result<(), TextureError> {
    if width == 0 || height == 0 {
        return Err(TextureError::ZeroSize { label: label.to_owned() });
    }
    let expected = width as usize * height as usize * format.bytes_per_pixel() as usize;
    if len != expected {
        return Err(TextureError::SizeMismatch { label: label.to_owned(), expected, actual: len });
    }
    Ok(())
}

/// A sampled 2D texture created from raw bytes.
///
/// Updating with the same dimensions and format reuses the GPU storage;
/// anything else reallocates.
pub struct Texture {
    label: String,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl Texture {
    pub fn from_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        width: u32,
        height: u32,
        format: PixelFormat,
        bytes: &[u8],
    ) -> Result<Self, TextureError> {
        validate_pixels(label, width, height, format, bytes.len())?;
        let (texture, view) = allocate(device, label, width, height, format);
        let out = Self { label: label.to_owned(), texture, view, width, height, format };
        out.write(queue, bytes);
        Ok(out)
    }

    /// Decodes any format the `image` crate reads into an sRGB RGBA texture.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        image: &image::DynamicImage,
    ) -> Result<Self, TextureError> {
        let rgba = image.to_rgba8();
        let (w, h) = rgba.dimensions();
        Self::from_bytes(device, queue, label, w, h, PixelFormat::Rgba8, rgba.as_raw())
    }

    /// Uploads new contents. Returns `true` when the storage was reallocated.
    pub fn update(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        format: PixelFormat,
        bytes: &[u8],
    ) -> Result<bool, TextureError> {
        validate_pixels(&self.label, width, height, format, bytes.len())?;
        let realloc = self.needs_realloc(width, height, format);
        if realloc {
            log::debug!(
                "texture `{}` reallocated: {}x{} {:?} -> {}x{} {:?}",
                self.label, self.width, self.height, self.format, width, height, format,
            );
            let (texture, view) = allocate(device, &self.label, width, height, format);
            self.texture = texture;
            self.view = view;
            self.width = width;
            self.height = height;
            self.format = format;
        }
        self.write(queue, bytes);
        Ok(realloc)
    }

    #[inline]
    pub fn needs_realloc(&self, width: u32, height: u32, format: PixelFormat) -> bool {
        (self.width, self.height, self.format) != (width, height, format)
    }

    fn write(&self, queue: &wgpu::Queue, bytes: &[u8]) {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.width * self.format.bytes_per_pixel()),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d { width: self.width, height: self.height, depth_or_array_layers: 1 },
        );
    }

    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Width over height.
    #[inline]
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("label", &self.label)
            .field("size", &(self.width, self.height))
            .field("format", &self.format)
            .finish()
    }
}

fn allocate(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    format: PixelFormat,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: format.wgpu_format(),
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_data_length_is_checked() {
        assert!(validate_pixels("cam", 4, 2, PixelFormat::R8, 8).is_ok());
        assert!(validate_pixels("cam", 4, 2, PixelFormat::Rg16Float, 32).is_ok());
        let err = validate_pixels("cam", 4, 2, PixelFormat::Rgba8, 8).unwrap_err();
        assert!(matches!(err, TextureError::SizeMismatch { expected: 32, actual: 8, .. }));
    }

    #[test]
    fn zero_sized_textures_are_rejected() {
        assert!(matches!(
            validate_pixels("empty", 0, 4, PixelFormat::R8, 0),
            Err(TextureError::ZeroSize { .. })
        ));
    }
}
