use wgpu::{Device, ShaderModule};

/// Compile WGSL source into a ShaderModule.
/// Validation runs inside an error scope so a bad shader comes back as a
/// message instead of reaching the device's uncaptured-error handler.
pub fn compile_shader(device: &Device, source: &str, label: &str) -> Result<ShaderModule, String> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(format!("{label}: {err}")),
        None => Ok(module),
    }
}
