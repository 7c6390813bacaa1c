//! WGSL program compilation with constant injection.
//!
//! Every stage is compiled inside a validation error scope so that a broken
//! shader surfaces as a [`ProgramError`] naming the stage instead of a device
//! panic later on.

use crate::error::{ProgramError, ShaderStage};

/// Shader texts and named constants for one program.
#[derive(Debug, Clone, Copy)]
pub struct ProgramSource<'a> {
    pub label: &'a str,
    pub vertex: &'a str,
    pub fragment: Option<&'a str>,
    pub constants: &'a [(&'a str, u32)],
}

/// Compiled stage modules of one program. Pipelines are created from it by
/// [`Program::link`].
pub struct Program {
    label: String,
    vertex: wgpu::ShaderModule,
    fragment: Option<wgpu::ShaderModule>,
}

impl Program {
    pub fn compile(device: &wgpu::Device, source: &ProgramSource<'_>) -> Result<Self, ProgramError> {
        let vertex = compile_stage(device, source, ShaderStage::Vertex, source.vertex)?;
        let fragment = source
            .fragment
            .map(|text| compile_stage(device, source, ShaderStage::Fragment, text))
            .transpose()?;

        log::debug!("Compiled program '{}'", source.label);
        Ok(Self {
            label: source.label.to_string(),
            vertex,
            fragment,
        })
    }

    pub fn vertex_module(&self) -> &wgpu::ShaderModule {
        &self.vertex
    }

    /// Falls back to the vertex module for single-file programs.
    pub fn fragment_module(&self) -> &wgpu::ShaderModule {
        self.fragment.as_ref().unwrap_or(&self.vertex)
    }

    /// Runs `create` under a validation scope and reports failures as link
    /// errors of this program.
    pub fn link<T>(
        &self,
        device: &wgpu::Device,
        create: impl FnOnce(&Self) -> T,
    ) -> Result<T, ProgramError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let linked = create(self);
        match pollster::block_on(device.pop_error_scope()) {
            None => Ok(linked),
            Some(err) => Err(ProgramError::Link {
                program: self.label.clone(),
                message: err.to_string(),
            }),
        }
    }
}

fn compile_stage(
    device: &wgpu::Device,
    source: &ProgramSource<'_>,
    stage: ShaderStage,
    text: &str,
) -> Result<wgpu::ShaderModule, ProgramError> {
    let code = inject_constants(text, source.constants);
    let label = format!("{}::{}", source.label, stage);

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&label),
        source: wgpu::ShaderSource::Wgsl(code.into()),
    });
    match pollster::block_on(device.pop_error_scope()) {
        None => Ok(module),
        Some(err) => Err(ProgramError::Compile {
            program: source.label.to_string(),
            stage,
            message: err.to_string(),
        }),
    }
}

/// Prepends one module-scope `const NAME: u32 = N;` per entry.
pub fn inject_constants(text: &str, constants: &[(&str, u32)]) -> String {
    let mut code = String::with_capacity(text.len() + constants.len() * 32);
    for (name, value) in constants {
        code.push_str(&format!("const {name}: u32 = {value}u;\n"));
    }
    code.push_str(text);
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_prepended_in_order() {
        let code = inject_constants("fn main() {}", &[("MAX_CASCADES", 4), ("LAYERS", 3)]);
        assert_eq!(
            code,
            "const MAX_CASCADES: u32 = 4u;\nconst LAYERS: u32 = 3u;\nfn main() {}"
        );
    }

    #[test]
    fn no_constants_leaves_source_untouched() {
        assert_eq!(inject_constants("fn main() {}", &[]), "fn main() {}");
    }
}
