use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::device::{
    BufferId, BufferTarget, FramebufferId, FramebufferStatus, GlError, MagFilter, MinFilter,
    PixelFormat, PixelType, PrimitiveMode, ProgramId, ShaderId, ShaderStage, TexImageTarget,
    TextureId, TextureTarget, UniformValue, Wrap,
};

/// Where a vertex attribute reads from. `stride` and `offset` are in bytes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AttribPointer {
    pub buffer: BufferId,
    pub components: i32,
    pub stride: i32,
    pub offset: i32,
}

#[derive(Debug, Clone)]
pub struct ShaderObject {
    pub stage: ShaderStage,
    pub source: String,
    pub compiled: bool,
    pub log: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProgramObject {
    pub shaders: Vec<ShaderId>,
    pub attrib_bindings: BTreeMap<String, u32>,
    pub linked: bool,
    pub log: String,
    /// Active uniform name to location, assigned at link time.
    pub uniforms: BTreeMap<String, i32>,
    pub values: BTreeMap<i32, UniformValue>,
}

/// Level-0 image of a texture or cube face.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ImageSpec {
    pub format: PixelFormat,
    pub ty: PixelType,
    pub width: u32,
    pub height: u32,
    pub has_pixels: bool,
}

#[derive(Debug, Clone)]
pub struct TextureObject {
    /// Set by the first bind; a texture never changes target afterwards.
    pub target: Option<TextureTarget>,
    pub images: BTreeMap<TexImageTarget, ImageSpec>,
    pub min_filter: MinFilter,
    pub mag_filter: MagFilter,
    pub wrap_s: Wrap,
    pub wrap_t: Wrap,
    pub mipmapped: bool,
}

impl Default for TextureObject {
    fn default() -> Self {
        // GL initial sampling state.
        Self {
            target: None,
            images: BTreeMap::new(),
            min_filter: MinFilter::NearestMipmapLinear,
            mag_filter: MagFilter::Linear,
            wrap_s: Wrap::Repeat,
            wrap_t: Wrap::Repeat,
            mipmapped: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FramebufferObject {
    pub color: TextureId,
    pub depth: TextureId,
}

/// One recorded `draw_elements` call with the state it observed.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub mode: PrimitiveMode,
    pub count: i32,
    pub offset: i32,
    pub program: ProgramId,
    pub framebuffer: FramebufferId,
    pub element_buffer: BufferId,
    pub attribs: Vec<(u32, AttribPointer)>,
}

/// Complete simulated context state.
///
/// Fields are public so tests can inspect anything; mutate only through
/// [`GlApi`](crate::device::GlApi).
#[derive(Debug, Clone)]
pub struct HeadlessState {
    pub buffers: BTreeMap<BufferId, Vec<u8>>,
    pub array_buffer: BufferId,
    pub element_buffer: BufferId,

    pub attribs: BTreeMap<u32, AttribPointer>,
    pub enabled_attribs: BTreeSet<u32>,
    pub max_vertex_attribs: u32,

    pub shaders: BTreeMap<ShaderId, ShaderObject>,
    pub programs: BTreeMap<ProgramId, ProgramObject>,
    pub current_program: ProgramId,

    pub textures: BTreeMap<TextureId, TextureObject>,
    /// Deleted textures whose images stay alive because a framebuffer other
    /// than the bound one still has them attached.
    pub orphaned_textures: BTreeMap<TextureId, TextureObject>,
    pub active_unit: u32,
    pub max_texture_units: u32,
    pub texture_bindings: BTreeMap<(u32, TextureTarget), TextureId>,

    pub framebuffers: BTreeMap<FramebufferId, FramebufferObject>,
    pub framebuffer: FramebufferId,
    pub viewport: Option<[i32; 4]>,

    pub draw_calls: Vec<DrawCall>,
    /// One line per state-changing call, e.g. `bind_framebuffer(0)`.
    pub trace: Vec<String>,
    pub errors: VecDeque<GlError>,

    next_name: u32,
}

impl Default for HeadlessState {
    fn default() -> Self {
        Self {
            buffers: BTreeMap::new(),
            array_buffer: BufferId::NONE,
            element_buffer: BufferId::NONE,
            attribs: BTreeMap::new(),
            enabled_attribs: BTreeSet::new(),
            max_vertex_attribs: 16,
            shaders: BTreeMap::new(),
            programs: BTreeMap::new(),
            current_program: ProgramId::NONE,
            textures: BTreeMap::new(),
            orphaned_textures: BTreeMap::new(),
            active_unit: 0,
            max_texture_units: 8,
            texture_bindings: BTreeMap::new(),
            framebuffers: BTreeMap::new(),
            framebuffer: FramebufferId::NONE,
            viewport: None,
            draw_calls: Vec::new(),
            trace: Vec::new(),
            errors: VecDeque::new(),
            next_name: 1,
        }
    }
}

impl HeadlessState {
    // ── queries ───────────────────────────────────────────────────────────

    /// Number of GPU names still allocated across all object kinds.
    pub fn live_names(&self) -> usize {
        self.buffers.len()
            + self.shaders.len()
            + self.programs.len()
            + self.textures.len()
            + self.framebuffers.len()
    }

    pub fn texture(&self, id: TextureId) -> Option<&TextureObject> {
        self.textures.get(&id)
    }

    pub fn bound_texture(&self, target: TextureTarget) -> TextureId {
        self.texture_bindings
            .get(&(self.active_unit, target))
            .copied()
            .unwrap_or(TextureId::NONE)
    }

    /// Value last uploaded to uniform `name` of `program`.
    pub fn uniform_value(&self, program: ProgramId, name: &str) -> Option<UniformValue> {
        let p = self.programs.get(&program)?;
        let loc = p.uniforms.get(name)?;
        p.values.get(loc).copied()
    }

    /// Trace lines starting with `call`.
    pub fn calls(&self, call: &str) -> Vec<&str> {
        self.trace
            .iter()
            .map(String::as_str)
            .filter(|line| line.starts_with(call))
            .collect()
    }

    pub fn framebuffer_status(&self) -> FramebufferStatus {
        if self.framebuffer.is_none() {
            return FramebufferStatus::Complete;
        }
        let Some(fbo) = self.framebuffers.get(&self.framebuffer) else {
            return FramebufferStatus::Unsupported;
        };

        if fbo.color.is_none() && fbo.depth.is_none() {
            return FramebufferStatus::IncompleteMissingAttachment;
        }
        let (Some(color), Some(depth)) = (self.attached_image(fbo.color), self.attached_image(fbo.depth))
        else {
            // Attached texture without level-0 storage.
            return FramebufferStatus::IncompleteAttachment;
        };

        let color_ok = color.is_none_or(|c| matches!(c.format, PixelFormat::Rgb | PixelFormat::Rgba));
        let depth_ok = depth.is_none_or(|d| d.format == PixelFormat::DepthComponent);
        if !color_ok || !depth_ok {
            return FramebufferStatus::IncompleteAttachment;
        }

        match (color, depth) {
            (Some(c), Some(d)) if (c.width, c.height) != (d.width, d.height) => {
                FramebufferStatus::IncompleteDimensions
            }
            _ => FramebufferStatus::Complete,
        }
    }

    // ── bookkeeping used by the GlApi impl ────────────────────────────────

    pub(super) fn alloc_name(&mut self) -> u32 {
        let name = self.next_name;
        self.next_name += 1;
        name
    }

    pub(super) fn raise(&mut self, err: GlError) {
        // GL records each error kind once until it is polled.
        if !self.errors.contains(&err) {
            self.errors.push_back(err);
        }
    }

    pub(super) fn record(&mut self, line: String) {
        self.trace.push(line);
    }

    pub(super) fn buffer_slot(&mut self, target: BufferTarget) -> &mut BufferId {
        match target {
            BufferTarget::Array => &mut self.array_buffer,
            BufferTarget::ElementArray => &mut self.element_buffer,
        }
    }

    pub(super) fn bound_texture_mut(&mut self, target: TextureTarget) -> Option<&mut TextureObject> {
        let id = self.bound_texture(target);
        if id.is_none() {
            return None;
        }
        self.textures.get_mut(&id)
    }

    /// `Some(None)` for an empty attachment point, `None` when the attached
    /// texture has no level-0 image.
    fn attached_image(&self, texture: TextureId) -> Option<Option<ImageSpec>> {
        if texture.is_none() {
            return Some(None);
        }
        let obj = self
            .textures
            .get(&texture)
            .or_else(|| self.orphaned_textures.get(&texture))?;
        let image = obj.images.get(&TexImageTarget::Texture2D)?;
        Some(Some(*image))
    }

    /// Whether any framebuffer still has `texture` attached.
    pub(super) fn is_attached(&self, texture: TextureId) -> bool {
        self.framebuffers
            .values()
            .any(|fbo| fbo.color == texture || fbo.depth == texture)
    }

    /// Frees orphaned images that no framebuffer references any more.
    pub(super) fn release_orphans(&mut self) {
        let mut orphans = std::mem::take(&mut self.orphaned_textures);
        orphans.retain(|id, _| self.is_attached(*id));
        self.orphaned_textures = orphans;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique_and_nonzero() {
        let mut s = HeadlessState::default();
        let a = s.alloc_name();
        let b = s.alloc_name();
        assert_ne!(a, 0);
        assert_ne!(a, b);
    }

    #[test]
    fn errors_are_recorded_once_per_kind() {
        let mut s = HeadlessState::default();
        s.raise(GlError::InvalidValue);
        s.raise(GlError::InvalidValue);
        s.raise(GlError::InvalidOperation);
        assert_eq!(s.errors.len(), 2);
    }

    #[test]
    fn default_framebuffer_is_complete() {
        let s = HeadlessState::default();
        assert_eq!(s.framebuffer_status(), FramebufferStatus::Complete);
    }
}
