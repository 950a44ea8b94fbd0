pub mod compiler;
pub mod hot_reload;

pub use compiler::compile_shader;
pub use hot_reload::ShaderWatcher;
