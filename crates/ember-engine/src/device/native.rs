//! [`GlApi`] over a real OpenGL (ES) context through `glow`.
//!
//! Window and context creation stay with the caller: hand over a
//! `glow::Context` that is current on this thread.

use std::cell::Cell;
use std::num::NonZeroU32;

use glow::HasContext;

use super::types::*;
use super::{GlApi, GlError};

/// Missing from desktop GL headers; ES 2.0 still reports it.
const FRAMEBUFFER_INCOMPLETE_DIMENSIONS: u32 = 0x8CD9;

pub struct GlowGl {
    gl: glow::Context,
    /// Enabled attribute slots, one bit per index below 32.
    enabled_attribs: Cell<u32>,
}

impl GlowGl {
    /// Wraps a loaded context.
    ///
    /// # Safety
    ///
    /// `gl` must stay current on the calling thread for as long as this value
    /// or any [`Context`](super::Context) built from it is alive, and nothing
    /// else may change its vertex attribute enable state.
    pub unsafe fn new(gl: glow::Context) -> Self {
        log::info!(
            "glow backend: {} ({})",
            unsafe { gl.get_parameter_string(glow::RENDERER) },
            unsafe { gl.get_parameter_string(glow::VERSION) }
        );
        Self {
            gl,
            enabled_attribs: Cell::new(0),
        }
    }

    /// The wrapped context, for calls the engine does not cover.
    pub fn raw(&self) -> &glow::Context {
        &self.gl
    }
}

fn name(id: u32) -> Option<NonZeroU32> {
    NonZeroU32::new(id)
}

fn created<T>(what: &str, result: Result<T, String>, id: impl FnOnce(T) -> u32) -> u32 {
    match result {
        Ok(obj) => id(obj),
        Err(err) => {
            log::error!("failed to create {what}: {err}");
            0
        }
    }
}

fn buffer_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Array => glow::ARRAY_BUFFER,
        BufferTarget::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
    }
}

fn primitive(mode: PrimitiveMode) -> u32 {
    match mode {
        PrimitiveMode::Triangles => glow::TRIANGLES,
    }
}

fn shader_stage(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

fn texture_target(target: TextureTarget) -> u32 {
    match target {
        TextureTarget::Texture2D => glow::TEXTURE_2D,
        TextureTarget::CubeMap => glow::TEXTURE_CUBE_MAP,
    }
}

fn texture_binding(target: TextureTarget) -> u32 {
    match target {
        TextureTarget::Texture2D => glow::TEXTURE_BINDING_2D,
        TextureTarget::CubeMap => glow::TEXTURE_BINDING_CUBE_MAP,
    }
}

fn tex_image_target(target: TexImageTarget) -> u32 {
    match target {
        TexImageTarget::Texture2D => glow::TEXTURE_2D,
        TexImageTarget::CubeFace(face) => match face {
            CubeFace::PositiveX => glow::TEXTURE_CUBE_MAP_POSITIVE_X,
            CubeFace::NegativeX => glow::TEXTURE_CUBE_MAP_NEGATIVE_X,
            CubeFace::PositiveY => glow::TEXTURE_CUBE_MAP_POSITIVE_Y,
            CubeFace::NegativeY => glow::TEXTURE_CUBE_MAP_NEGATIVE_Y,
            CubeFace::PositiveZ => glow::TEXTURE_CUBE_MAP_POSITIVE_Z,
            CubeFace::NegativeZ => glow::TEXTURE_CUBE_MAP_NEGATIVE_Z,
        },
    }
}

fn pixel_format(format: PixelFormat) -> u32 {
    match format {
        PixelFormat::Rgb => glow::RGB,
        PixelFormat::Rgba => glow::RGBA,
        PixelFormat::DepthComponent => glow::DEPTH_COMPONENT,
    }
}

fn pixel_type(ty: PixelType) -> u32 {
    match ty {
        PixelType::UnsignedByte => glow::UNSIGNED_BYTE,
        PixelType::UnsignedShort => glow::UNSIGNED_SHORT,
        PixelType::UnsignedInt => glow::UNSIGNED_INT,
        PixelType::Float => glow::FLOAT,
    }
}

/// `(pname, value)` for a texture parameter.
fn tex_parameter(param: TexParameter) -> (u32, u32) {
    let wrap = |w: Wrap| match w {
        Wrap::ClampToEdge => glow::CLAMP_TO_EDGE,
        Wrap::Repeat => glow::REPEAT,
    };
    match param {
        TexParameter::MinFilter(f) => (
            glow::TEXTURE_MIN_FILTER,
            match f {
                MinFilter::Nearest => glow::NEAREST,
                MinFilter::Linear => glow::LINEAR,
                MinFilter::NearestMipmapNearest => glow::NEAREST_MIPMAP_NEAREST,
                MinFilter::NearestMipmapLinear => glow::NEAREST_MIPMAP_LINEAR,
            },
        ),
        TexParameter::MagFilter(f) => (
            glow::TEXTURE_MAG_FILTER,
            match f {
                MagFilter::Nearest => glow::NEAREST,
                MagFilter::Linear => glow::LINEAR,
            },
        ),
        TexParameter::WrapS(w) => (glow::TEXTURE_WRAP_S, wrap(w)),
        TexParameter::WrapT(w) => (glow::TEXTURE_WRAP_T, wrap(w)),
    }
}

fn attachment(attachment: Attachment) -> u32 {
    match attachment {
        Attachment::Color0 => glow::COLOR_ATTACHMENT0,
        Attachment::Depth => glow::DEPTH_ATTACHMENT,
    }
}

fn framebuffer_status(code: u32) -> FramebufferStatus {
    match code {
        glow::FRAMEBUFFER_COMPLETE => FramebufferStatus::Complete,
        glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => FramebufferStatus::IncompleteAttachment,
        glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => {
            FramebufferStatus::IncompleteMissingAttachment
        }
        FRAMEBUFFER_INCOMPLETE_DIMENSIONS => FramebufferStatus::IncompleteDimensions,
        _ => FramebufferStatus::Unsupported,
    }
}

fn error_from_code(code: u32) -> Option<GlError> {
    match code {
        glow::NO_ERROR => None,
        glow::INVALID_ENUM => Some(GlError::InvalidEnum),
        glow::INVALID_VALUE => Some(GlError::InvalidValue),
        glow::INVALID_FRAMEBUFFER_OPERATION => Some(GlError::InvalidFramebufferOperation),
        glow::OUT_OF_MEMORY => Some(GlError::OutOfMemory),
        // Desktop-only codes (stack over/underflow) have no ES counterpart.
        _ => Some(GlError::InvalidOperation),
    }
}

impl GlApi for GlowGl {
    // ── buffers ───────────────────────────────────────────────────────────

    fn create_buffer(&self) -> BufferId {
        let result = unsafe { self.gl.create_buffer() };
        BufferId(created("buffer", result, |b| b.0.get()))
    }

    fn delete_buffer(&self, buffer: BufferId) {
        if let Some(id) = name(buffer.0) {
            unsafe { self.gl.delete_buffer(glow::NativeBuffer(id)) };
        }
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: BufferId) {
        let buffer = name(buffer.0).map(glow::NativeBuffer);
        unsafe { self.gl.bind_buffer(buffer_target(target), buffer) };
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8]) {
        unsafe {
            self.gl
                .buffer_data_u8_slice(buffer_target(target), data, glow::STATIC_DRAW)
        };
    }

    fn draw_elements(&self, mode: PrimitiveMode, count: i32, offset: i32) {
        unsafe {
            self.gl
                .draw_elements(primitive(mode), count, glow::UNSIGNED_SHORT, offset)
        };
    }

    // ── vertex attributes ─────────────────────────────────────────────────

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) };
        if index < 32 {
            self.enabled_attribs.set(self.enabled_attribs.get() | 1 << index);
        }
    }

    fn disable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.gl.disable_vertex_attrib_array(index) };
        if index < 32 {
            self.enabled_attribs.set(self.enabled_attribs.get() & !(1 << index));
        }
    }

    fn vertex_attrib_pointer(&self, index: u32, components: i32, stride: i32, offset: i32) {
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(index, components, glow::FLOAT, false, stride, offset)
        };
    }

    fn is_vertex_attrib_enabled(&self, index: u32) -> bool {
        index < 32 && self.enabled_attribs.get() & 1 << index != 0
    }

    fn max_vertex_attribs(&self) -> u32 {
        let n = unsafe { self.gl.get_parameter_i32(glow::MAX_VERTEX_ATTRIBS) };
        (n.max(0) as u32).min(32)
    }

    // ── shaders and programs ──────────────────────────────────────────────

    fn create_shader(&self, stage: ShaderStage) -> ShaderId {
        let result = unsafe { self.gl.create_shader(shader_stage(stage)) };
        ShaderId(created("shader", result, |s| s.0.get()))
    }

    fn shader_source(&self, shader: ShaderId, source: &str) {
        if let Some(id) = name(shader.0) {
            unsafe { self.gl.shader_source(glow::NativeShader(id), source) };
        }
    }

    fn compile_shader(&self, shader: ShaderId) {
        if let Some(id) = name(shader.0) {
            unsafe { self.gl.compile_shader(glow::NativeShader(id)) };
        }
    }

    fn shader_compile_status(&self, shader: ShaderId) -> bool {
        name(shader.0)
            .is_some_and(|id| unsafe { self.gl.get_shader_compile_status(glow::NativeShader(id)) })
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        name(shader.0)
            .map(|id| unsafe { self.gl.get_shader_info_log(glow::NativeShader(id)) })
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: ShaderId) {
        if let Some(id) = name(shader.0) {
            unsafe { self.gl.delete_shader(glow::NativeShader(id)) };
        }
    }

    fn create_program(&self) -> ProgramId {
        let result = unsafe { self.gl.create_program() };
        ProgramId(created("program", result, |p| p.0.get()))
    }

    fn attach_shader(&self, program: ProgramId, shader: ShaderId) {
        if let (Some(p), Some(s)) = (name(program.0), name(shader.0)) {
            unsafe {
                self.gl
                    .attach_shader(glow::NativeProgram(p), glow::NativeShader(s))
            };
        }
    }

    fn bind_attrib_location(&self, program: ProgramId, index: u32, attrib: &str) {
        if let Some(id) = name(program.0) {
            unsafe {
                self.gl
                    .bind_attrib_location(glow::NativeProgram(id), index, attrib)
            };
        }
    }

    fn link_program(&self, program: ProgramId) {
        if let Some(id) = name(program.0) {
            unsafe { self.gl.link_program(glow::NativeProgram(id)) };
        }
    }

    fn program_link_status(&self, program: ProgramId) -> bool {
        name(program.0)
            .is_some_and(|id| unsafe { self.gl.get_program_link_status(glow::NativeProgram(id)) })
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        name(program.0)
            .map(|id| unsafe { self.gl.get_program_info_log(glow::NativeProgram(id)) })
            .unwrap_or_default()
    }

    fn delete_program(&self, program: ProgramId) {
        if let Some(id) = name(program.0) {
            unsafe { self.gl.delete_program(glow::NativeProgram(id)) };
        }
    }

    fn use_program(&self, program: ProgramId) {
        let program = name(program.0).map(glow::NativeProgram);
        unsafe { self.gl.use_program(program) };
    }

    fn uniform_location(&self, program: ProgramId, uniform: &str) -> UniformLocation {
        let Some(id) = name(program.0) else {
            return UniformLocation::UNKNOWN;
        };
        match unsafe { self.gl.get_uniform_location(glow::NativeProgram(id), uniform) } {
            Some(loc) => UniformLocation(loc.0 as i32),
            None => UniformLocation::UNKNOWN,
        }
    }

    fn set_uniform(&self, location: UniformLocation, value: UniformValue) {
        if !location.is_known() {
            return;
        }
        let loc = glow::NativeUniformLocation(location.0 as u32);
        let loc = Some(&loc);
        unsafe {
            match value {
                UniformValue::Int(v) => self.gl.uniform_1_i32(loc, v),
                UniformValue::Vec3([x, y, z]) => self.gl.uniform_3_f32(loc, x, y, z),
                UniformValue::Vec4([x, y, z, w]) => self.gl.uniform_4_f32(loc, x, y, z, w),
                UniformValue::Mat4(m) => self.gl.uniform_matrix_4_f32_slice(loc, false, &m),
            }
        }
    }

    // ── textures ──────────────────────────────────────────────────────────

    fn create_texture(&self) -> TextureId {
        let result = unsafe { self.gl.create_texture() };
        TextureId(created("texture", result, |t| t.0.get()))
    }

    fn delete_texture(&self, texture: TextureId) {
        if let Some(id) = name(texture.0) {
            unsafe { self.gl.delete_texture(glow::NativeTexture(id)) };
        }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) };
    }

    fn bind_texture(&self, target: TextureTarget, texture: TextureId) {
        let texture = name(texture.0).map(glow::NativeTexture);
        unsafe { self.gl.bind_texture(texture_target(target), texture) };
    }

    fn bound_texture(&self, target: TextureTarget) -> TextureId {
        let id = unsafe { self.gl.get_parameter_i32(texture_binding(target)) };
        TextureId(id.max(0) as u32)
    }

    fn tex_image_2d(
        &self,
        target: TexImageTarget,
        format: PixelFormat,
        width: u32,
        height: u32,
        ty: PixelType,
        pixels: Option<&[u8]>,
    ) {
        let format = pixel_format(format);
        unsafe {
            self.gl.tex_image_2d(
                tex_image_target(target),
                0,
                format as i32,
                width as i32,
                height as i32,
                0,
                format,
                pixel_type(ty),
                pixels,
            )
        };
    }

    fn tex_parameter(&self, target: TextureTarget, param: TexParameter) {
        let (pname, value) = tex_parameter(param);
        unsafe {
            self.gl
                .tex_parameter_i32(texture_target(target), pname, value as i32)
        };
    }

    fn generate_mipmap(&self, target: TextureTarget) {
        unsafe { self.gl.generate_mipmap(texture_target(target)) };
    }

    // ── framebuffers ──────────────────────────────────────────────────────

    fn create_framebuffer(&self) -> FramebufferId {
        let result = unsafe { self.gl.create_framebuffer() };
        FramebufferId(created("framebuffer", result, |f| f.0.get()))
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferId) {
        if let Some(id) = name(framebuffer.0) {
            unsafe { self.gl.delete_framebuffer(glow::NativeFramebuffer(id)) };
        }
    }

    fn bind_framebuffer(&self, framebuffer: FramebufferId) {
        let framebuffer = name(framebuffer.0).map(glow::NativeFramebuffer);
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer) };
    }

    fn bound_framebuffer(&self) -> FramebufferId {
        let id = unsafe { self.gl.get_parameter_i32(glow::FRAMEBUFFER_BINDING) };
        FramebufferId(id.max(0) as u32)
    }

    fn framebuffer_texture_2d(&self, point: Attachment, texture: TextureId) {
        let texture = name(texture.0).map(glow::NativeTexture);
        unsafe {
            self.gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                attachment(point),
                glow::TEXTURE_2D,
                texture,
                0,
            )
        };
    }

    fn check_framebuffer_status(&self) -> FramebufferStatus {
        framebuffer_status(unsafe { self.gl.check_framebuffer_status(glow::FRAMEBUFFER) })
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) };
    }

    // ── errors ────────────────────────────────────────────────────────────

    fn get_error(&self) -> Option<GlError> {
        error_from_code(unsafe { self.gl.get_error() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_faces_map_in_upload_order() {
        let targets: Vec<_> = CubeFace::ALL
            .into_iter()
            .map(|f| tex_image_target(TexImageTarget::CubeFace(f)))
            .collect();
        let expected: Vec<_> = (0..6).map(|i| glow::TEXTURE_CUBE_MAP_POSITIVE_X + i).collect();
        assert_eq!(targets, expected);
    }

    #[test]
    fn texture_parameters_pair_name_and_value() {
        assert_eq!(
            tex_parameter(TexParameter::MinFilter(MinFilter::NearestMipmapLinear)),
            (glow::TEXTURE_MIN_FILTER, glow::NEAREST_MIPMAP_LINEAR)
        );
        assert_eq!(
            tex_parameter(TexParameter::WrapT(Wrap::ClampToEdge)),
            (glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE)
        );
    }

    #[test]
    fn framebuffer_status_codes() {
        assert_eq!(framebuffer_status(glow::FRAMEBUFFER_COMPLETE), FramebufferStatus::Complete);
        assert_eq!(
            framebuffer_status(FRAMEBUFFER_INCOMPLETE_DIMENSIONS),
            FramebufferStatus::IncompleteDimensions
        );
        assert_eq!(
            framebuffer_status(glow::FRAMEBUFFER_UNSUPPORTED),
            FramebufferStatus::Unsupported
        );
    }

    #[test]
    fn error_codes() {
        assert_eq!(error_from_code(glow::NO_ERROR), None);
        assert_eq!(error_from_code(glow::OUT_OF_MEMORY), Some(GlError::OutOfMemory));
        assert_eq!(error_from_code(glow::INVALID_OPERATION), Some(GlError::InvalidOperation));
    }

    #[test]
    fn depth_uploads_use_depth_formats() {
        assert_eq!(pixel_format(PixelFormat::DepthComponent), glow::DEPTH_COMPONENT);
        assert_eq!(pixel_type(PixelType::UnsignedShort), glow::UNSIGNED_SHORT);
        assert_eq!(attachment(Attachment::Depth), glow::DEPTH_ATTACHMENT);
    }
}
