use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::PostFx;
use crate::gpu::fullscreen_quad::VIDEO_QUAD_VS;

/// Resolve the assets directory once (CWD-relative → exe-relative → macOS bundle).
pub fn assets_dir() -> &'static Path {
    static DIR: OnceLock<PathBuf> = OnceLock::new();
    DIR.get_or_init(|| {
        // 1. CWD-relative (dev workflow)
        let cwd = PathBuf::from("assets");
        if cwd.join("shaders").is_dir() {
            log::info!("Assets: CWD-relative ({})", cwd.display());
            return cwd;
        }

        // 2. Exe-relative (installed binary)
        if let Ok(exe) = std::env::current_exe() {
            if let Some(exe_dir) = exe.parent() {
                let beside = exe_dir.join("assets");
                if beside.join("shaders").is_dir() {
                    log::info!("Assets: exe-relative ({})", beside.display());
                    return beside;
                }

                // 3. macOS .app bundle: exe is in Foo.app/Contents/MacOS/
                let bundle = exe_dir.join("../Resources/assets");
                if bundle.join("shaders").is_dir() {
                    let canonical = bundle.canonicalize().unwrap_or(bundle);
                    log::info!("Assets: macOS bundle ({})", canonical.display());
                    return canonical;
                }
            }
        }

        // Builtin effect sources cover a missing directory
        log::warn!("Assets directory not found; using builtin shaders");
        cwd
    })
}

/// Standard uniform block and bindings prepended to every effect shader.
/// Must be kept in sync with `gpu::uniforms::EffectUniforms`.
const UNIFORM_BLOCK: &str = r#"
struct EffectUniforms {
    time: f32,
    paused: f32,
    resolution: vec2f,
    video_size: vec2f,
    scale: vec2f,
    offset: vec2f,
    _pad: vec2f,
}

@group(0) @binding(0) var video_tex: texture_2d<f32>;
@group(0) @binding(1) var video_sampler: sampler;
@group(0) @binding(2) var<uniform> u: EffectUniforms;
"#;

fn builtin_source(fx: PostFx) -> &'static str {
    match fx {
        PostFx::None => include_str!("../../../../assets/shaders/none.wgsl"),
        PostFx::Glitch => include_str!("../../../../assets/shaders/glitch.wgsl"),
        PostFx::Scanlines => include_str!("../../../../assets/shaders/scanlines.wgsl"),
    }
}

/// Where effect sources come from, and how they are assembled into a
/// complete WGSL module.
pub struct EffectLoader {
    shader_dir: PathBuf,
}

impl EffectLoader {
    /// Use `dir`, or `assets/shaders` when none is given.
    pub fn new(dir: Option<PathBuf>) -> Self {
        let shader_dir = dir.unwrap_or_else(|| assets_dir().join("shaders"));
        Self { shader_dir }
    }

    pub fn shader_dir(&self) -> &Path {
        &self.shader_dir
    }

    pub fn resolve_shader_path(&self, fx: PostFx) -> PathBuf {
        self.shader_dir.join(fx.file_name())
    }

    /// The effect a changed file belongs to, if it is one of ours.
    pub fn effect_for_path(&self, path: &Path) -> Option<PostFx> {
        let name = path.file_name()?.to_str()?;
        PostFx::from_file_name(name)
    }

    /// Fragment source for `fx` from disk, falling back to the builtin copy
    /// when the file cannot be read.
    pub fn fragment_source(&self, fx: PostFx) -> String {
        let path = self.resolve_shader_path(fx);
        match std::fs::read_to_string(&path) {
            Ok(src) => src,
            Err(e) => {
                log::debug!("Using builtin {} ({}: {e})", fx.file_name(), path.display());
                builtin_source(fx).to_string()
            }
        }
    }

    pub fn builtin_fragment(&self, fx: PostFx) -> &'static str {
        builtin_source(fx)
    }

    /// Complete module source for `fx`: uniforms, vertex stage, fragment stage.
    pub fn load_effect_source(&self, fx: PostFx) -> String {
        Self::assemble(&self.fragment_source(fx))
    }

    pub fn assemble(fragment: &str) -> String {
        format!("{UNIFORM_BLOCK}\n{VIDEO_QUAD_VS}\n{fragment}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_effect_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("glitch.wgsl"), "// custom glitch").unwrap();
        let loader = EffectLoader::new(Some(dir.path().to_path_buf()));

        let src = loader.load_effect_source(PostFx::Glitch);
        assert!(src.contains("// custom glitch"));
        assert!(src.contains("struct EffectUniforms"));
        assert!(src.contains("fn vs_main"));
    }

    #[test]
    fn missing_file_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let loader = EffectLoader::new(Some(dir.path().to_path_buf()));
        for fx in PostFx::ALL {
            let frag = loader.fragment_source(fx);
            assert_eq!(frag, builtin_source(fx));
            assert!(frag.contains("fn fs_main"));
        }
    }

    #[test]
    fn uniform_block_precedes_stages() {
        let src = EffectLoader::assemble("FRAG");
        let uniforms = src.find("var<uniform> u").unwrap();
        let vertex = src.find("fn vs_main").unwrap();
        let fragment = src.find("FRAG").unwrap();
        assert!(uniforms < vertex && vertex < fragment);
    }

    #[test]
    fn maps_changed_paths_to_effects() {
        let loader = EffectLoader::new(Some(PathBuf::from("shaders")));
        assert_eq!(
            loader.effect_for_path(Path::new("/x/shaders/scanlines.wgsl")),
            Some(PostFx::Scanlines)
        );
        assert_eq!(loader.effect_for_path(Path::new("/x/shaders/lib.wgsl")), None);
        assert_eq!(
            loader.resolve_shader_path(PostFx::None),
            PathBuf::from("shaders/none.wgsl")
        );
    }
}
