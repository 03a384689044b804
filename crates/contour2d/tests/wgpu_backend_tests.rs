//! Tests against a real wgpu device.
//!
//! Skipped unless `CONTOUR2D_FORCE_GPU_TESTS` is set and an adapter is
//! available.

use std::sync::Arc;

use contour2d::{Contour2d, ContourOptions, PlotView, Rect, WgpuBackend, WgpuBackendConfig};
use pollster::FutureExt;

const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

fn device() -> Option<(Arc<wgpu::Device>, Arc<wgpu::Queue>)> {
    if std::env::var("CONTOUR2D_FORCE_GPU_TESTS").is_err() {
        return None;
    }
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .block_on()?;
    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("contour2d-test-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
            },
            None,
        )
        .block_on()
        .ok()?;
    Some((Arc::new(device), Arc::new(queue)))
}

fn target(device: &wgpu::Device) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("contour2d-test-target"),
            size: wgpu::Extent3d {
                width: 64,
                height: 64,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

#[test]
fn uniform_slots_are_reused_across_frames() {
    let _ = env_logger::builder().is_test(true).try_init();
    let Some((device, queue)) = device() else {
        return;
    };
    let view_target = target(&device);
    let mut backend = WgpuBackend::new(
        device,
        queue,
        WgpuBackendConfig {
            format: FORMAT,
            msaa_samples: 1,
        },
    );

    let options = ContourOptions::new([2, 2])
        .with_values(vec![0.0, 0.0, 1.0, 1.0])
        .with_level(0.5, [1.0, 0.0, 0.0, 1.0]);
    let mut contour = Contour2d::new(&mut backend).unwrap();
    contour.update(&mut backend, &options).unwrap();
    let view = PlotView {
        view_box: Rect::new(0.0, 0.0, 64.0, 64.0),
        data_box: Rect::new(0.0, 0.0, 1.0, 1.0),
        pixel_ratio: 1.0,
    };

    for _ in 0..3 {
        contour.draw(&mut backend, &view).unwrap();
        backend.render(&view_target, None).unwrap();
        assert!(backend.pending_draws().is_empty());
        // one slot per draw in the frame: ribbons and caps
        assert_eq!(backend.uniform_slot_count(), 2);
    }

    contour.dispose(&mut backend);
}
