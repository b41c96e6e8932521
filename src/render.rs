//! Frame encoding.
//!
//! The same pass is used for the window and for snapshots; only the colour
//! and depth targets differ.

use crate::{context::Context, scene::TunnelScene};

/// Record one render pass of `scene` into `color` and `depth`.
pub fn encode_frame(
    ctx: &Context,
    scene: &TunnelScene,
    encoder: &mut wgpu::CommandEncoder,
    color: &wgpu::TextureView,
    depth: &wgpu::TextureView,
) {
    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Render Pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: color,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(ctx.clear_colour),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: depth,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        occlusion_query_set: None,
        timestamp_writes: None,
    });

    scene.draw(ctx, &mut render_pass);
}

/// Render `scene` into the window surface and present it.
///
/// Headless contexts have nothing to present and return `Ok` immediately.
pub fn present(ctx: &Context, scene: &TunnelScene) -> Result<(), wgpu::SurfaceError> {
    let Some(surface) = &ctx.surface else {
        return Ok(());
    };
    let output = surface.get_current_texture()?;
    let view = output
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });
    encode_frame(ctx, scene, &mut encoder, &view, &ctx.depth_texture.view);
    ctx.queue.submit(std::iter::once(encoder.finish()));

    output.present();
    Ok(())
}
