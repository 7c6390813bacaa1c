use crate::error::RendererError;
use crate::renderer::internal::pipeline::{DEPTH_FORMAT, SCENE_COLOR_FORMAT, SKY_COLOR_FORMAT};
use crate::renderer::internal::{scoped, BindLayouts};

/// What validation needs to know about one attachment.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AttachmentInfo {
    pub(crate) label: &'static str,
    pub(crate) size: wgpu::Extent3d,
    pub(crate) format: wgpu::TextureFormat,
    pub(crate) usage: wgpu::TextureUsages,
}

impl AttachmentInfo {
    fn of(label: &'static str, texture: &wgpu::Texture) -> Self {
        Self {
            label,
            size: texture.size(),
            format: texture.format(),
            usage: texture.usage(),
        }
    }
}

/// Checks that a set of attachments can be bound to one pass: equal extents
/// matching the surface, renderable formats, exactly one depth attachment.
pub(crate) fn validate_attachments(
    expected: (u32, u32),
    attachments: &[AttachmentInfo],
    features: wgpu::Features,
) -> Result<(), String> {
    if attachments.is_empty() {
        return Err("no attachments".to_string());
    }

    let mut depth_count = 0;
    for attachment in attachments {
        let size = attachment.size;
        if (size.width, size.height) != expected || size.depth_or_array_layers != 1 {
            return Err(format!(
                "{} is {}x{}x{}, expected {}x{}x1",
                attachment.label,
                size.width,
                size.height,
                size.depth_or_array_layers,
                expected.0,
                expected.1
            ));
        }
        if !attachment
            .usage
            .contains(wgpu::TextureUsages::RENDER_ATTACHMENT)
        {
            return Err(format!("{} lacks render attachment usage", attachment.label));
        }
        let renderable = attachment
            .format
            .guaranteed_format_features(features)
            .allowed_usages
            .contains(wgpu::TextureUsages::RENDER_ATTACHMENT);
        if !renderable {
            return Err(format!(
                "{} format {:?} is not renderable",
                attachment.label, attachment.format
            ));
        }
        if attachment.format.is_depth_stencil_format() {
            depth_count += 1;
        }
    }

    if depth_count != 1 {
        return Err(format!("expected one depth attachment, found {depth_count}"));
    }
    Ok(())
}

/// Surface-sized offscreen attachments of the scene pass and the bind group
/// the composite pass reads them through. Replaced wholesale on resize.
pub(crate) struct OffscreenTargets {
    scene_color: wgpu::Texture,
    sky_color: wgpu::Texture,
    depth: wgpu::Texture,
    pub(crate) scene_view: wgpu::TextureView,
    pub(crate) sky_view: wgpu::TextureView,
    pub(crate) depth_view: wgpu::TextureView,
    pub(crate) composite_bind_group: wgpu::BindGroup,
    generation: u64,
}

impl OffscreenTargets {
    pub(crate) fn new(
        device: &wgpu::Device,
        layouts: &BindLayouts,
        size: (u32, u32),
        generation: u64,
    ) -> Result<Self, RendererError> {
        let (width, height) = (size.0.max(1), size.1.max(1));

        let targets = scoped(device, "offscreen attachments", || {
            Self::create(device, layouts, width, height, generation)
        })
        .map_err(|err| match err {
            RendererError::ResourceCreation { reason, .. } => {
                RendererError::IncompleteAttachments { reason }
            }
            other => other,
        })?;

        validate_attachments(
            (width, height),
            &[
                AttachmentInfo::of("scene color", &targets.scene_color),
                AttachmentInfo::of("sky color", &targets.sky_color),
                AttachmentInfo::of("depth", &targets.depth),
            ],
            device.features(),
        )
        .map_err(|reason| RendererError::IncompleteAttachments { reason })?;

        log::debug!(
            "Created offscreen targets {}x{} (generation {})",
            width,
            height,
            generation
        );
        Ok(targets)
    }

    fn create(
        device: &wgpu::Device,
        layouts: &BindLayouts,
        width: u32,
        height: u32,
        generation: u64,
    ) -> Self {
        let scene_color = attachment(
            device,
            "SceneColorTarget",
            width,
            height,
            SCENE_COLOR_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );
        let sky_color = attachment(
            device,
            "SkyColorTarget",
            width,
            height,
            SKY_COLOR_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );
        let depth = attachment(
            device,
            "SceneDepthTarget",
            width,
            height,
            DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );

        let scene_view = scene_color.create_view(&wgpu::TextureViewDescriptor::default());
        let sky_view = sky_color.create_view(&wgpu::TextureViewDescriptor::default());
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("CompositeSampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let composite_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("CompositeBindGroup"),
            layout: &layouts.composite,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&scene_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&sky_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        Self {
            scene_color,
            sky_color,
            depth,
            scene_view,
            sky_view,
            depth_view,
            composite_bind_group,
            generation,
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }
}

fn attachment(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(
        label: &'static str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> AttachmentInfo {
        AttachmentInfo {
            label,
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        }
    }

    fn offscreen(width: u32, height: u32) -> Vec<AttachmentInfo> {
        vec![
            info("scene color", width, height, SCENE_COLOR_FORMAT),
            info("sky color", width, height, SKY_COLOR_FORMAT),
            info("depth", width, height, DEPTH_FORMAT),
        ]
    }

    #[test]
    fn matching_attachments_pass() {
        assert_eq!(
            validate_attachments((640, 480), &offscreen(640, 480), wgpu::Features::empty()),
            Ok(())
        );
    }

    #[test]
    fn mismatched_extent_is_reported() {
        let mut attachments = offscreen(640, 480);
        attachments[1].size.width = 320;

        let err = validate_attachments((640, 480), &attachments, wgpu::Features::empty())
            .unwrap_err();
        assert!(err.contains("sky color"), "{err}");
    }

    #[test]
    fn missing_depth_is_reported() {
        let attachments = offscreen(640, 480);

        let err = validate_attachments((640, 480), &attachments[..2], wgpu::Features::empty())
            .unwrap_err();
        assert!(err.contains("depth"), "{err}");
    }

    #[test]
    fn non_renderable_format_is_reported() {
        let mut attachments = offscreen(64, 64);
        attachments[0].format = wgpu::TextureFormat::Rgb9e5Ufloat;

        let err =
            validate_attachments((64, 64), &attachments, wgpu::Features::empty()).unwrap_err();
        assert!(err.contains("not renderable"), "{err}");
    }

    #[test]
    fn missing_usage_is_reported() {
        let mut attachments = offscreen(64, 64);
        attachments[2].usage = wgpu::TextureUsages::TEXTURE_BINDING;

        let err =
            validate_attachments((64, 64), &attachments, wgpu::Features::empty()).unwrap_err();
        assert!(err.contains("render attachment"), "{err}");
    }
}
