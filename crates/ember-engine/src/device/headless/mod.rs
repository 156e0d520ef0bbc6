//! Software implementation of [`GlApi`] that runs without a GPU.
//!
//! `HeadlessGl` simulates the parts of a GL ES 2.0 context the engine relies on:
//! - object names, buffer contents and the global bound-object slots,
//! - vertex attribute enable state and pointers,
//! - texture images, sampling parameters and mipmap generation,
//! - framebuffer attachments and completeness,
//! - shader compilation, program linking and uniform discovery from source,
//! - issued draw calls and a textual call trace.
//!
//! Invalid usage raises [`GlError`]s the way a driver would. Names must come
//! from the matching `create_*` call; binding any other name is an invalid
//! operation.
//!
//! Clones share state, so a test can keep one clone for inspection and hand
//! the other to a [`Context`](crate::device::Context).

mod glsl;
mod state;

use std::cell::{Ref, RefCell};
use std::rc::Rc;

pub use state::{
    AttribPointer, DrawCall, FramebufferObject, HeadlessState, ImageSpec, ProgramObject,
    ShaderObject, TextureObject,
};

use super::types::*;
use super::{GlApi, GlError};

#[derive(Clone, Default)]
pub struct HeadlessGl {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessGl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access to the simulated context.
    ///
    /// Drop the guard before issuing further calls.
    pub fn state(&self) -> Ref<'_, HeadlessState> {
        self.state.borrow()
    }

    /// Forgets recorded draw calls and trace lines, keeping all objects.
    pub fn clear_history(&self) {
        let mut s = self.state.borrow_mut();
        s.draw_calls.clear();
        s.trace.clear();
    }
}

impl std::fmt::Debug for HeadlessGl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.state.borrow();
        f.debug_struct("HeadlessGl")
            .field("live_names", &s.live_names())
            .field("draw_calls", &s.draw_calls.len())
            .finish_non_exhaustive()
    }
}

fn compile(source: &str) -> Result<(), String> {
    if source.trim().is_empty() {
        return Err("ERROR: 0:0: empty shader source".to_string());
    }
    for (n, line) in source.lines().enumerate() {
        let line = line.trim_start();
        if let Some(msg) = line.strip_prefix("#error") {
            return Err(format!("ERROR: 0:{}: '#error' :{}", n + 1, msg));
        }
    }
    if !source.contains("main") {
        return Err("ERROR: 0:0: 'main' : function not defined".to_string());
    }
    Ok(())
}

/// First varying the fragment stage consumes that no vertex stage declares.
fn unmatched_varying(stages: &[&ShaderObject]) -> Option<String> {
    let of = |stage: ShaderStage| -> Vec<String> {
        stages
            .iter()
            .filter(|sh| sh.stage == stage)
            .flat_map(|sh| glsl::declared_varyings(&sh.source))
            .collect()
    };
    let written = of(ShaderStage::Vertex);
    of(ShaderStage::Fragment)
        .into_iter()
        .find(|name| !written.contains(name))
}

impl GlApi for HeadlessGl {
    // ── buffers ───────────────────────────────────────────────────────────

    fn create_buffer(&self) -> BufferId {
        let mut s = self.state.borrow_mut();
        let id = BufferId(s.alloc_name());
        s.buffers.insert(id, Vec::new());
        s.record(format!("create_buffer() -> {}", id.0));
        id
    }

    fn delete_buffer(&self, buffer: BufferId) {
        let mut s = self.state.borrow_mut();
        s.record(format!("delete_buffer({})", buffer.0));
        if s.buffers.remove(&buffer).is_none() {
            return;
        }
        if s.array_buffer == buffer {
            s.array_buffer = BufferId::NONE;
        }
        if s.element_buffer == buffer {
            s.element_buffer = BufferId::NONE;
        }
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: BufferId) {
        let mut s = self.state.borrow_mut();
        s.record(format!("bind_buffer({target:?}, {})", buffer.0));
        if !buffer.is_none() && !s.buffers.contains_key(&buffer) {
            s.raise(GlError::InvalidOperation);
            return;
        }
        *s.buffer_slot(target) = buffer;
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8]) {
        let mut s = self.state.borrow_mut();
        s.record(format!("buffer_data({target:?}, {} bytes)", data.len()));
        let bound = *s.buffer_slot(target);
        match s.buffers.get_mut(&bound) {
            Some(storage) => *storage = data.to_vec(),
            None => s.raise(GlError::InvalidOperation),
        }
    }

    fn draw_elements(&self, mode: PrimitiveMode, count: i32, offset: i32) {
        let mut s = self.state.borrow_mut();
        s.record(format!("draw_elements({mode:?}, {count}, {offset})"));
        if count < 0 || offset < 0 {
            s.raise(GlError::InvalidValue);
            return;
        }
        if s.framebuffer_status() != FramebufferStatus::Complete {
            s.raise(GlError::InvalidFramebufferOperation);
            return;
        }
        let Some(indices) = s.buffers.get(&s.element_buffer) else {
            s.raise(GlError::InvalidOperation);
            return;
        };
        if (offset as usize) + (count as usize) * 2 > indices.len() {
            s.raise(GlError::InvalidOperation);
            return;
        }

        let attribs = s
            .enabled_attribs
            .iter()
            .filter_map(|i| s.attribs.get(i).map(|p| (*i, *p)))
            .collect();
        let call = DrawCall {
            mode,
            count,
            offset,
            program: s.current_program,
            framebuffer: s.framebuffer,
            element_buffer: s.element_buffer,
            attribs,
        };
        s.draw_calls.push(call);
    }

    // ── vertex attributes ─────────────────────────────────────────────────

    fn enable_vertex_attrib_array(&self, index: u32) {
        let mut s = self.state.borrow_mut();
        s.record(format!("enable_vertex_attrib_array({index})"));
        if index >= s.max_vertex_attribs {
            s.raise(GlError::InvalidValue);
            return;
        }
        s.enabled_attribs.insert(index);
    }

    fn disable_vertex_attrib_array(&self, index: u32) {
        let mut s = self.state.borrow_mut();
        s.record(format!("disable_vertex_attrib_array({index})"));
        if index >= s.max_vertex_attribs {
            s.raise(GlError::InvalidValue);
            return;
        }
        s.enabled_attribs.remove(&index);
    }

    fn vertex_attrib_pointer(&self, index: u32, components: i32, stride: i32, offset: i32) {
        let mut s = self.state.borrow_mut();
        s.record(format!(
            "vertex_attrib_pointer({index}, {components}, {stride}, {offset})"
        ));
        if index >= s.max_vertex_attribs || !(1..=4).contains(&components) || stride < 0 {
            s.raise(GlError::InvalidValue);
            return;
        }
        if s.array_buffer.is_none() {
            s.raise(GlError::InvalidOperation);
            return;
        }
        let pointer = AttribPointer {
            buffer: s.array_buffer,
            components,
            stride,
            offset,
        };
        s.attribs.insert(index, pointer);
    }

    fn is_vertex_attrib_enabled(&self, index: u32) -> bool {
        self.state.borrow().enabled_attribs.contains(&index)
    }

    fn max_vertex_attribs(&self) -> u32 {
        self.state.borrow().max_vertex_attribs
    }

    // ── shaders and programs ──────────────────────────────────────────────

    fn create_shader(&self, stage: ShaderStage) -> ShaderId {
        let mut s = self.state.borrow_mut();
        let id = ShaderId(s.alloc_name());
        s.shaders.insert(
            id,
            ShaderObject {
                stage,
                source: String::new(),
                compiled: false,
                log: String::new(),
            },
        );
        s.record(format!("create_shader({stage}) -> {}", id.0));
        id
    }

    fn shader_source(&self, shader: ShaderId, source: &str) {
        let mut s = self.state.borrow_mut();
        s.record(format!("shader_source({})", shader.0));
        match s.shaders.get_mut(&shader) {
            Some(obj) => obj.source = source.to_string(),
            None => s.raise(GlError::InvalidValue),
        }
    }

    fn compile_shader(&self, shader: ShaderId) {
        let mut s = self.state.borrow_mut();
        s.record(format!("compile_shader({})", shader.0));
        let Some(obj) = s.shaders.get_mut(&shader) else {
            s.raise(GlError::InvalidValue);
            return;
        };
        match compile(&obj.source) {
            Ok(()) => {
                obj.compiled = true;
                obj.log.clear();
            }
            Err(log) => {
                obj.compiled = false;
                obj.log = log;
            }
        }
    }

    fn shader_compile_status(&self, shader: ShaderId) -> bool {
        let s = self.state.borrow();
        s.shaders.get(&shader).is_some_and(|obj| obj.compiled)
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        let s = self.state.borrow();
        s.shaders.get(&shader).map(|obj| obj.log.clone()).unwrap_or_default()
    }

    fn delete_shader(&self, shader: ShaderId) {
        let mut s = self.state.borrow_mut();
        s.record(format!("delete_shader({})", shader.0));
        s.shaders.remove(&shader);
    }

    fn create_program(&self) -> ProgramId {
        let mut s = self.state.borrow_mut();
        let id = ProgramId(s.alloc_name());
        s.programs.insert(id, ProgramObject::default());
        s.record(format!("create_program() -> {}", id.0));
        id
    }

    fn attach_shader(&self, program: ProgramId, shader: ShaderId) {
        let mut s = self.state.borrow_mut();
        s.record(format!("attach_shader({}, {})", program.0, shader.0));
        if !s.shaders.contains_key(&shader) {
            s.raise(GlError::InvalidValue);
            return;
        }
        match s.programs.get_mut(&program) {
            Some(p) if p.shaders.contains(&shader) => s.raise(GlError::InvalidOperation),
            Some(p) => p.shaders.push(shader),
            None => s.raise(GlError::InvalidValue),
        }
    }

    fn bind_attrib_location(&self, program: ProgramId, index: u32, name: &str) {
        let mut s = self.state.borrow_mut();
        s.record(format!("bind_attrib_location({}, {index}, {name})", program.0));
        if index >= s.max_vertex_attribs {
            s.raise(GlError::InvalidValue);
            return;
        }
        if name.starts_with("gl_") {
            s.raise(GlError::InvalidOperation);
            return;
        }
        match s.programs.get_mut(&program) {
            Some(p) => {
                p.attrib_bindings.insert(name.to_string(), index);
            }
            None => s.raise(GlError::InvalidValue),
        }
    }

    fn link_program(&self, program: ProgramId) {
        let mut s = self.state.borrow_mut();
        s.record(format!("link_program({})", program.0));
        let Some(p) = s.programs.get(&program) else {
            s.raise(GlError::InvalidValue);
            return;
        };

        let stages: Vec<&ShaderObject> = p.shaders.iter().filter_map(|id| s.shaders.get(id)).collect();
        let has = |stage: ShaderStage| stages.iter().any(|sh| sh.stage == stage && sh.compiled);
        let result = if !has(ShaderStage::Vertex) {
            Err("error: no compiled vertex shader attached".to_string())
        } else if !has(ShaderStage::Fragment) {
            Err("error: no compiled fragment shader attached".to_string())
        } else if let Some(missing) = unmatched_varying(&stages) {
            Err(format!(
                "error: varying {missing} is read by the fragment shader but not written by the vertex shader"
            ))
        } else {
            let mut names: Vec<String> = Vec::new();
            for sh in &stages {
                for name in glsl::declared_uniforms(&sh.source) {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
            }
            Ok(names)
        };

        let Some(p) = s.programs.get_mut(&program) else { return };
        p.values.clear();
        match result {
            Ok(names) => {
                p.linked = true;
                p.log.clear();
                p.uniforms = names.into_iter().zip(0..).collect();
            }
            Err(log) => {
                p.linked = false;
                p.log = log;
                p.uniforms.clear();
            }
        }
    }

    fn program_link_status(&self, program: ProgramId) -> bool {
        self.state.borrow().programs.get(&program).is_some_and(|p| p.linked)
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        let s = self.state.borrow();
        s.programs.get(&program).map(|p| p.log.clone()).unwrap_or_default()
    }

    fn delete_program(&self, program: ProgramId) {
        let mut s = self.state.borrow_mut();
        s.record(format!("delete_program({})", program.0));
        if s.programs.remove(&program).is_some() && s.current_program == program {
            s.current_program = ProgramId::NONE;
        }
    }

    fn use_program(&self, program: ProgramId) {
        let mut s = self.state.borrow_mut();
        s.record(format!("use_program({})", program.0));
        if program.is_none() {
            s.current_program = program;
            return;
        }
        match s.programs.get(&program) {
            Some(p) if p.linked => s.current_program = program,
            Some(_) => s.raise(GlError::InvalidOperation),
            None => s.raise(GlError::InvalidValue),
        }
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> UniformLocation {
        let mut s = self.state.borrow_mut();
        match s.programs.get(&program) {
            Some(p) if p.linked => p
                .uniforms
                .get(name)
                .map_or(UniformLocation::UNKNOWN, |loc| UniformLocation(*loc)),
            Some(_) => {
                s.raise(GlError::InvalidOperation);
                UniformLocation::UNKNOWN
            }
            None => {
                s.raise(GlError::InvalidValue);
                UniformLocation::UNKNOWN
            }
        }
    }

    fn set_uniform(&self, location: UniformLocation, value: UniformValue) {
        let mut s = self.state.borrow_mut();
        s.record(format!("set_uniform({}, {value:?})", location.0));
        if !location.is_known() {
            return;
        }
        let current = s.current_program;
        let Some(p) = s.programs.get_mut(&current) else {
            s.raise(GlError::InvalidOperation);
            return;
        };
        if !p.uniforms.values().any(|loc| *loc == location.0) {
            s.raise(GlError::InvalidOperation);
            return;
        }
        p.values.insert(location.0, value);
    }

    // ── textures ──────────────────────────────────────────────────────────

    fn create_texture(&self) -> TextureId {
        let mut s = self.state.borrow_mut();
        let id = TextureId(s.alloc_name());
        s.textures.insert(id, TextureObject::default());
        s.record(format!("create_texture() -> {}", id.0));
        id
    }

    fn delete_texture(&self, texture: TextureId) {
        let mut s = self.state.borrow_mut();
        s.record(format!("delete_texture({})", texture.0));
        let Some(obj) = s.textures.remove(&texture) else {
            return;
        };
        s.texture_bindings.retain(|_, bound| *bound != texture);
        // Only the bound framebuffer drops its attachments.
        let current = s.framebuffer;
        if let Some(fbo) = s.framebuffers.get_mut(&current) {
            if fbo.color == texture {
                fbo.color = TextureId::NONE;
            }
            if fbo.depth == texture {
                fbo.depth = TextureId::NONE;
            }
        }
        // The name is gone, but the image lives on while attached elsewhere.
        if s.is_attached(texture) {
            s.orphaned_textures.insert(texture, obj);
        }
    }

    fn active_texture(&self, unit: u32) {
        let mut s = self.state.borrow_mut();
        s.record(format!("active_texture({unit})"));
        if unit >= s.max_texture_units {
            s.raise(GlError::InvalidEnum);
            return;
        }
        s.active_unit = unit;
    }

    fn bind_texture(&self, target: TextureTarget, texture: TextureId) {
        let mut s = self.state.borrow_mut();
        s.record(format!("bind_texture({target:?}, {})", texture.0));
        let unit = s.active_unit;
        if texture.is_none() {
            s.texture_bindings.remove(&(unit, target));
            return;
        }
        let Some(obj) = s.textures.get_mut(&texture) else {
            s.raise(GlError::InvalidOperation);
            return;
        };
        match obj.target {
            Some(t) if t != target => {
                s.raise(GlError::InvalidOperation);
                return;
            }
            _ => obj.target = Some(target),
        }
        s.texture_bindings.insert((unit, target), texture);
    }

    fn bound_texture(&self, target: TextureTarget) -> TextureId {
        self.state.borrow().bound_texture(target)
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
        let mut s = self.state.borrow_mut();
        s.record(format!(
            "tex_image_2d({target:?}, {format:?}, {width}, {height}, {ty:?}, {})",
            if pixels.is_some() { "data" } else { "null" }
        ));

        let type_ok = match format {
            PixelFormat::DepthComponent => {
                matches!(ty, PixelType::UnsignedShort | PixelType::UnsignedInt)
            }
            PixelFormat::Rgb | PixelFormat::Rgba => {
                matches!(ty, PixelType::UnsignedByte | PixelType::Float)
            }
        };
        if !type_ok {
            s.raise(GlError::InvalidOperation);
            return;
        }
        if matches!(target, TexImageTarget::CubeFace(_)) && width != height {
            s.raise(GlError::InvalidValue);
            return;
        }
        if let Some(data) = pixels {
            let expected = width as usize * height as usize * format.channels() * ty.size();
            if data.len() < expected {
                s.raise(GlError::InvalidValue);
                return;
            }
        }

        let Some(obj) = s.bound_texture_mut(target.binding()) else {
            s.raise(GlError::InvalidOperation);
            return;
        };
        obj.images.insert(
            target,
            ImageSpec {
                format,
                ty,
                width,
                height,
                has_pixels: pixels.is_some(),
            },
        );
        obj.mipmapped = false;
    }

    fn tex_parameter(&self, target: TextureTarget, param: TexParameter) {
        let mut s = self.state.borrow_mut();
        s.record(format!("tex_parameter({target:?}, {param:?})"));
        let Some(obj) = s.bound_texture_mut(target) else {
            s.raise(GlError::InvalidOperation);
            return;
        };
        match param {
            TexParameter::MinFilter(f) => obj.min_filter = f,
            TexParameter::MagFilter(f) => obj.mag_filter = f,
            TexParameter::WrapS(w) => obj.wrap_s = w,
            TexParameter::WrapT(w) => obj.wrap_t = w,
        }
    }

    fn generate_mipmap(&self, target: TextureTarget) {
        let mut s = self.state.borrow_mut();
        s.record(format!("generate_mipmap({target:?})"));
        let Some(obj) = s.bound_texture_mut(target) else {
            s.raise(GlError::InvalidOperation);
            return;
        };

        let required = match target {
            TextureTarget::Texture2D => 1,
            TextureTarget::CubeMap => CubeFace::ALL.len(),
        };
        let pot = |n: u32| n.is_power_of_two();
        let ok = obj.images.len() >= required
            && obj.images.values().all(|img| pot(img.width) && pot(img.height));
        if ok {
            obj.mipmapped = true;
        } else {
            s.raise(GlError::InvalidOperation);
        }
    }

    // ── framebuffers ──────────────────────────────────────────────────────

    fn create_framebuffer(&self) -> FramebufferId {
        let mut s = self.state.borrow_mut();
        let id = FramebufferId(s.alloc_name());
        s.framebuffers.insert(id, FramebufferObject::default());
        s.record(format!("create_framebuffer() -> {}", id.0));
        id
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferId) {
        let mut s = self.state.borrow_mut();
        s.record(format!("delete_framebuffer({})", framebuffer.0));
        if s.framebuffers.remove(&framebuffer).is_some() && s.framebuffer == framebuffer {
            s.framebuffer = FramebufferId::NONE;
        }
        s.release_orphans();
    }

    fn bind_framebuffer(&self, framebuffer: FramebufferId) {
        let mut s = self.state.borrow_mut();
        s.record(format!("bind_framebuffer({})", framebuffer.0));
        if !framebuffer.is_none() && !s.framebuffers.contains_key(&framebuffer) {
            s.raise(GlError::InvalidOperation);
            return;
        }
        s.framebuffer = framebuffer;
    }

    fn bound_framebuffer(&self) -> FramebufferId {
        self.state.borrow().framebuffer
    }

    fn framebuffer_texture_2d(&self, attachment: Attachment, texture: TextureId) {
        let mut s = self.state.borrow_mut();
        s.record(format!("framebuffer_texture_2d({attachment:?}, {})", texture.0));
        if !texture.is_none() {
            match s.textures.get(&texture) {
                Some(obj) if obj.target != Some(TextureTarget::CubeMap) => {}
                _ => {
                    s.raise(GlError::InvalidOperation);
                    return;
                }
            }
        }
        let current = s.framebuffer;
        let Some(fbo) = s.framebuffers.get_mut(&current) else {
            // Framebuffer 0 has no attachment points.
            s.raise(GlError::InvalidOperation);
            return;
        };
        match attachment {
            Attachment::Color0 => fbo.color = texture,
            Attachment::Depth => fbo.depth = texture,
        }
        s.release_orphans();
    }

    fn check_framebuffer_status(&self) -> FramebufferStatus {
        self.state.borrow().framebuffer_status()
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        let mut s = self.state.borrow_mut();
        s.record(format!("viewport({x}, {y}, {width}, {height})"));
        if width < 0 || height < 0 {
            s.raise(GlError::InvalidValue);
            return;
        }
        s.viewport = Some([x, y, width, height]);
    }

    // ── errors ────────────────────────────────────────────────────────────

    fn get_error(&self) -> Option<GlError> {
        self.state.borrow_mut().errors.pop_front()
    }
}
