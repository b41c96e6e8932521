//! Still-image capture of the current view.
//!
//! A snapshot re-renders the scene into an offscreen target of the window's
//! size, copies it into a mappable buffer and hands back tightly packed RGBA.

use std::time::Duration;

use image::RgbaImage;
use thiserror::Error;

use crate::{context::Context, data_structures::texture::Texture, render, scene::TunnelScene};

const BYTES_PER_PIXEL: u32 = 4;
const MAP_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("nothing has been rendered yet")]
    NotReady,
    #[error("could not map the readback buffer: {0}")]
    Map(#[from] wgpu::BufferAsyncError),
    #[error("waiting for the device failed: {0}")]
    Poll(#[from] wgpu::PollError),
    #[error("readback was cancelled before it finished")]
    ChannelClosed,
    #[error("readback does not fill a {0}x{1} image")]
    Size(u32, u32),
    #[error("could not encode the image: {0}")]
    Encode(#[from] image::ImageError),
}

/// Row stride of a texture copy, rounded up to the copy alignment.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

fn is_bgra(format: wgpu::TextureFormat) -> bool {
    matches!(
        format,
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
    )
}

/// Strip the row padding of a readback and convert it to RGBA.
pub fn unpad_rows(
    data: &[u8],
    width: u32,
    height: u32,
    padded_bytes_per_row: u32,
    bgra: bool,
) -> Vec<u8> {
    let unpadded = (width * BYTES_PER_PIXEL) as usize;
    let mut pixels = Vec::with_capacity(unpadded * height as usize);
    for row in 0..height as usize {
        let start = row * padded_bytes_per_row as usize;
        pixels.extend_from_slice(&data[start..start + unpadded]);
    }
    if bgra {
        for pixel in pixels.chunks_exact_mut(BYTES_PER_PIXEL as usize) {
            pixel.swap(0, 2);
        }
    }
    pixels
}

/// A snapshot that has been rendered and copied but not yet read back.
///
/// Splitting the two halves lets the caller keep borrowing the scene only
/// while commands are recorded; reading back just needs the device.
#[derive(Debug)]
pub struct Readback {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    padded_bytes_per_row: u32,
    bgra: bool,
}

impl Readback {
    /// Render the scene offscreen and queue the copy into a mappable buffer.
    pub fn submit(ctx: &Context, scene: &TunnelScene) -> Self {
        let [width, height] = ctx.size();
        let target = Texture::create_capture_target(
            &ctx.device,
            [width, height],
            ctx.config.format,
            "snapshot",
        );
        let depth = Texture::create_depth_texture(&ctx.device, [width, height], "snapshot_depth");

        let padded = padded_bytes_per_row(width);
        let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Snapshot Buffer"),
            size: (padded * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Snapshot Encoder"),
            });
        render::encode_frame(ctx, scene, &mut encoder, &target.view, &depth.view);
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        ctx.queue.submit(std::iter::once(encoder.finish()));

        Self {
            buffer,
            width,
            height,
            padded_bytes_per_row: padded,
            bgra: is_bgra(ctx.config.format),
        }
    }

    /// Wait for the copy and return tightly packed RGBA.
    pub async fn read(self, device: &wgpu::Device) -> Result<RgbaImage, SnapshotError> {
        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        let buffer_slice = self.buffer.slice(..);
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            // the receiver only disappears if the read itself was dropped
            let _ = tx.send(result);
        });
        device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: Some(MAP_TIMEOUT),
        })?;
        rx.receive().await.ok_or(SnapshotError::ChannelClosed)??;

        let pixels = {
            let data = buffer_slice.get_mapped_range();
            unpad_rows(
                &data,
                self.width,
                self.height,
                self.padded_bytes_per_row,
                self.bgra,
            )
        };
        self.buffer.unmap();

        RgbaImage::from_raw(self.width, self.height, pixels)
            .ok_or(SnapshotError::Size(self.width, self.height))
    }
}

/// Render the scene offscreen and read it back.
pub async fn capture(ctx: &Context, scene: &TunnelScene) -> Result<RgbaImage, SnapshotError> {
    Readback::submit(ctx, scene).read(&ctx.device).await
}

/// PNG bytes of a snapshot, ready to hand to whoever asked for it.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, SnapshotError> {
    let mut bytes = std::io::Cursor::new(Vec::new());
    image.write_to(&mut bytes, image::ImageFormat::Png)?;
    Ok(bytes.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_the_copy_alignment() {
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(1), 256);
    }

    #[test]
    fn padding_is_stripped_and_bgra_is_swizzled() {
        let width = 2;
        let height = 2;
        let padded = padded_bytes_per_row(width);
        let mut data = vec![0xEE; (padded * height) as usize];
        for row in 0..height as usize {
            for col in 0..width as usize {
                let i = row * padded as usize + col * 4;
                data[i..i + 4].copy_from_slice(&[1, 2, 3, 4]);
            }
        }

        let rgba = unpad_rows(&data, width, height, padded, false);
        assert_eq!(rgba.len(), 16);
        assert!(rgba.chunks(4).all(|p| p == [1, 2, 3, 4]));

        let swizzled = unpad_rows(&data, width, height, padded, true);
        assert!(swizzled.chunks(4).all(|p| p == [3, 2, 1, 4]));
    }

    #[test]
    fn png_encoding_produces_a_png_signature() {
        let image = RgbaImage::from_pixel(3, 2, image::Rgba([255, 0, 0, 255]));
        let png = encode_png(&image).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
