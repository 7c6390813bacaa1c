use crate::error::RendererError;

/// A square texture (or texture array) the renderer is about to allocate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TextureRequest {
    pub(crate) resource: &'static str,
    pub(crate) size: u32,
    pub(crate) layers: u32,
}

impl TextureRequest {
    pub(crate) fn new(resource: &'static str, size: u32, layers: u32) -> Self {
        Self {
            resource,
            size,
            layers,
        }
    }
}

/// Rejects textures the device cannot hold before anything is allocated.
pub(crate) fn check_texture_limits(
    limits: &wgpu::Limits,
    requests: &[TextureRequest],
) -> Result<(), RendererError> {
    for request in requests {
        if request.size > limits.max_texture_dimension_2d {
            return Err(RendererError::ExceedsLimit {
                resource: request.resource,
                what: "texels per side",
                requested: request.size,
                limit: limits.max_texture_dimension_2d,
            });
        }
        if request.layers > limits.max_texture_array_layers {
            return Err(RendererError::ExceedsLimit {
                resource: request.resource,
                what: "array layers",
                requested: request.layers,
                limit: limits.max_texture_array_layers,
            });
        }
    }
    Ok(())
}

/// Runs `build` inside out-of-memory and validation error scopes, turning
/// anything the device reports into a [`RendererError`] instead of leaving
/// it to the uncaptured error handler.
pub(crate) fn scoped<T>(
    device: &wgpu::Device,
    resource: &'static str,
    build: impl FnOnce() -> T,
) -> Result<T, RendererError> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let value = build();

    let validation = pollster::block_on(device.pop_error_scope());
    let out_of_memory = pollster::block_on(device.pop_error_scope());
    if out_of_memory.is_some() {
        log::error!("Out of memory while creating {}", resource);
        return Err(RendererError::OutOfMemory);
    }
    if let Some(err) = validation {
        return Err(RendererError::ResourceCreation {
            resource,
            reason: err.to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_within_default_limits_pass() {
        let limits = wgpu::Limits::default();
        let requests = [
            TextureRequest::new("material texture array", 1024, 255),
            TextureRequest::new("shadow cascade array", 4096, 4),
            TextureRequest::new("skybox cube map", 2048, 6),
        ];

        assert!(check_texture_limits(&limits, &requests).is_ok());
    }

    #[test]
    fn too_many_material_layers_are_rejected() {
        let limits = wgpu::Limits::default();
        // 86 materials, three layers each.
        let requests = [TextureRequest::new("material texture array", 512, 258)];

        let err = check_texture_limits(&limits, &requests).unwrap_err();
        match err {
            RendererError::ExceedsLimit {
                resource,
                requested,
                limit,
                ..
            } => {
                assert_eq!(resource, "material texture array");
                assert_eq!(requested, 258);
                assert_eq!(limit, limits.max_texture_array_layers);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn oversized_shadow_map_is_rejected() {
        let limits = wgpu::Limits::default();
        let requests = [
            TextureRequest::new("material texture array", 256, 3),
            TextureRequest::new("shadow cascade array", 16384, 4),
        ];

        let err = check_texture_limits(&limits, &requests).unwrap_err();
        assert!(err.to_string().contains("shadow cascade array"), "{err}");
        assert!(err.to_string().contains("16384"), "{err}");
    }
}
