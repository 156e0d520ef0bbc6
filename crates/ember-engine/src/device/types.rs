use std::fmt;

macro_rules! gpu_name {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl $name {
            /// The reserved "no object" name.
            pub const NONE: Self = Self(0);

            #[inline]
            pub fn is_none(self) -> bool {
                self.0 == 0
            }
        }
    };
}

gpu_name!(
    /// GPU buffer object name.
    BufferId
);
gpu_name!(
    /// GPU texture object name.
    TextureId
);
gpu_name!(
    /// Framebuffer object name. `NONE` is the default (window) framebuffer.
    FramebufferId
);
gpu_name!(
    /// Linked GPU program name.
    ProgramId
);
gpu_name!(
    /// Single shader stage object name.
    ShaderId
);

/// Location of a uniform inside a linked program. `-1` means "not active".
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UniformLocation(pub i32);

impl UniformLocation {
    pub const UNKNOWN: Self = Self(-1);

    #[inline]
    pub fn is_known(self) -> bool {
        self.0 >= 0
    }
}

impl Default for UniformLocation {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Vertex attribute data.
    Array,
    /// Index data.
    ElementArray,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PrimitiveMode {
    /// Independent triangles, three indices each.
    Triangles,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        })
    }
}

/// Uniform payload. Matrices are column-major.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat4([f32; 16]),
}

/// Texture binding point.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TextureTarget {
    Texture2D,
    CubeMap,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    /// Faces in upload order (+X, -X, +Y, -Y, +Z, -Z).
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];
}

/// Image upload target: the 2D texture itself or one face of a cube map.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TexImageTarget {
    Texture2D,
    CubeFace(CubeFace),
}

impl TexImageTarget {
    /// Binding point the upload goes through.
    pub fn binding(self) -> TextureTarget {
        match self {
            TexImageTarget::Texture2D => TextureTarget::Texture2D,
            TexImageTarget::CubeFace(_) => TextureTarget::CubeMap,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Rgb,
    Rgba,
    DepthComponent,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
            PixelFormat::DepthComponent => 1,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PixelType {
    UnsignedByte,
    UnsignedShort,
    UnsignedInt,
    Float,
}

impl PixelType {
    pub fn size(self) -> usize {
        match self {
            PixelType::UnsignedByte => 1,
            PixelType::UnsignedShort => 2,
            PixelType::UnsignedInt | PixelType::Float => 4,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MinFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    NearestMipmapLinear,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MagFilter {
    Nearest,
    Linear,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Wrap {
    ClampToEdge,
    Repeat,
}

/// One texture parameter assignment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TexParameter {
    MinFilter(MinFilter),
    MagFilter(MagFilter),
    WrapS(Wrap),
    WrapT(Wrap),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Attachment {
    Color0,
    Depth,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FramebufferStatus {
    Complete,
    IncompleteAttachment,
    IncompleteMissingAttachment,
    IncompleteDimensions,
    Unsupported,
}
