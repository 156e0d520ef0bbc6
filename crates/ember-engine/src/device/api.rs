use super::types::*;
use super::GlError;

/// The immediate-mode GPU API surface the resource layer is written against.
///
/// Mirrors the subset of OpenGL ES 2.0 the engine uses, with typed names in
/// place of raw integers. Calls are synchronous and operate on the context's
/// global binding slots (bound buffers, textures, program, framebuffer); the
/// caller is responsible for pairing binds and unbinds.
///
/// Implementations report failures through [`GlApi::get_error`] the way GL does;
/// no call returns an error directly.
pub trait GlApi {
    // ── buffers ───────────────────────────────────────────────────────────

    fn create_buffer(&self) -> BufferId;
    fn delete_buffer(&self, buffer: BufferId);
    fn bind_buffer(&self, target: BufferTarget, buffer: BufferId);
    /// Uploads `data` into the buffer bound at `target` as static draw storage.
    fn buffer_data(&self, target: BufferTarget, data: &[u8]);
    /// Draws `count` unsigned-short indices from the bound element buffer,
    /// starting at byte `offset`.
    fn draw_elements(&self, mode: PrimitiveMode, count: i32, offset: i32);

    // ── vertex attributes ─────────────────────────────────────────────────

    fn enable_vertex_attrib_array(&self, index: u32);
    fn disable_vertex_attrib_array(&self, index: u32);
    /// Points attribute `index` at float data in the bound array buffer.
    /// `stride` and `offset` are in bytes.
    fn vertex_attrib_pointer(&self, index: u32, components: i32, stride: i32, offset: i32);
    fn is_vertex_attrib_enabled(&self, index: u32) -> bool;
    fn max_vertex_attribs(&self) -> u32;

    // ── shaders and programs ──────────────────────────────────────────────

    fn create_shader(&self, stage: ShaderStage) -> ShaderId;
    fn shader_source(&self, shader: ShaderId, source: &str);
    fn compile_shader(&self, shader: ShaderId);
    fn shader_compile_status(&self, shader: ShaderId) -> bool;
    fn shader_info_log(&self, shader: ShaderId) -> String;
    fn delete_shader(&self, shader: ShaderId);

    fn create_program(&self) -> ProgramId;
    fn attach_shader(&self, program: ProgramId, shader: ShaderId);
    fn bind_attrib_location(&self, program: ProgramId, index: u32, name: &str);
    fn link_program(&self, program: ProgramId);
    fn program_link_status(&self, program: ProgramId) -> bool;
    fn program_info_log(&self, program: ProgramId) -> String;
    fn delete_program(&self, program: ProgramId);
    fn use_program(&self, program: ProgramId);

    fn uniform_location(&self, program: ProgramId, name: &str) -> UniformLocation;
    /// Sets a uniform of the program in use. Unknown locations are ignored.
    fn set_uniform(&self, location: UniformLocation, value: UniformValue);

    // ── textures ──────────────────────────────────────────────────────────

    fn create_texture(&self) -> TextureId;
    fn delete_texture(&self, texture: TextureId);
    /// Selects texture unit `unit` (0-based) for subsequent texture binds.
    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, target: TextureTarget, texture: TextureId);
    /// Texture bound at `target` on the active unit.
    fn bound_texture(&self, target: TextureTarget) -> TextureId;
    /// Specifies level 0 of the texture bound at `target.binding()`.
    /// `pixels = None` allocates storage without contents.
    fn tex_image_2d(
        &self,
        target: TexImageTarget,
        format: PixelFormat,
        width: u32,
        height: u32,
        ty: PixelType,
        pixels: Option<&[u8]>,
    );
    fn tex_parameter(&self, target: TextureTarget, param: TexParameter);
    fn generate_mipmap(&self, target: TextureTarget);

    // ── framebuffers ──────────────────────────────────────────────────────

    fn create_framebuffer(&self) -> FramebufferId;
    fn delete_framebuffer(&self, framebuffer: FramebufferId);
    fn bind_framebuffer(&self, framebuffer: FramebufferId);
    fn bound_framebuffer(&self) -> FramebufferId;
    /// Attaches level 0 of a 2D texture to the bound framebuffer.
    /// `TextureId::NONE` detaches.
    fn framebuffer_texture_2d(&self, attachment: Attachment, texture: TextureId);
    fn check_framebuffer_status(&self) -> FramebufferStatus;
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);

    // ── errors ────────────────────────────────────────────────────────────

    /// Pops the oldest pending error, if any.
    fn get_error(&self) -> Option<GlError>;
}
