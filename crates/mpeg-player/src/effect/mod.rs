pub mod loader;

pub use loader::EffectLoader;

/// The post-processing effects, in cycling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PostFx {
    #[default]
    None,
    Glitch,
    Scanlines,
}

impl PostFx {
    pub const ALL: [PostFx; 3] = [PostFx::None, PostFx::Glitch, PostFx::Scanlines];

    pub fn index(self) -> usize {
        match self {
            PostFx::None => 0,
            PostFx::Glitch => 1,
            PostFx::Scanlines => 2,
        }
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    /// HUD label.
    pub fn label(self) -> &'static str {
        match self {
            PostFx::None => "NONE",
            PostFx::Glitch => "GLITCH",
            PostFx::Scanlines => "SCANLINES",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            PostFx::None => "none.wgsl",
            PostFx::Glitch => "glitch.wgsl",
            PostFx::Scanlines => "scanlines.wgsl",
        }
    }

    /// The effect whose source file this is, if any.
    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|fx| fx.file_name() == name)
    }
}
