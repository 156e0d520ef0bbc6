use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::core::{Managed, Object};
use crate::device::{Context, ProgramId, ShaderId, ShaderStage, UniformLocation};

use super::Semantic;

/// Binds a named vertex shader input to a fixed attribute slot before linking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderAttribute {
    pub name: Cow<'static, str>,
    pub location: u32,
}

impl ShaderAttribute {
    pub const fn new(name: &'static str, semantic: Semantic) -> Self {
        Self {
            name: Cow::Borrowed(name),
            location: semantic as u32,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("failed to read shader source {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage} shader source is empty")]
    Empty { stage: ShaderStage },

    #[error("failed to compile {stage} shader: {log}")]
    Compile { stage: ShaderStage, log: String },

    #[error("failed to link shader program: {log}")]
    Link { log: String },
}

/// Linked vertex + fragment program.
///
/// A `Shader` only exists in the linked state; construction reports compile and
/// link failures as [`ShaderError`]. The program name is released on drop.
pub struct Shader {
    object: Object,
    ctx: Context,
    program: ProgramId,
}

impl Shader {
    /// Compiles and links a program from in-memory sources.
    pub fn from_source(
        ctx: &Context,
        vertex: &str,
        fragment: &str,
        attributes: &[ShaderAttribute],
    ) -> Result<Self, ShaderError> {
        let program = Self::compile_program(ctx, vertex, fragment, attributes)?;
        Ok(Self {
            object: Object::new("Shader"),
            ctx: ctx.clone(),
            program,
        })
    }

    /// Reads both stages from disk, then behaves like [`Shader::from_source`].
    pub fn from_files(
        ctx: &Context,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
        attributes: &[ShaderAttribute],
    ) -> Result<Self, ShaderError> {
        let vertex = read_source(vertex_path.as_ref())?;
        let fragment = read_source(fragment_path.as_ref())?;
        Self::from_source(ctx, &vertex, &fragment, attributes)
    }

    /// Compiles both stages, binds `attributes`, links, and returns the program name.
    ///
    /// The stage objects are deleted whether or not linking succeeds; on failure
    /// the program is deleted too, so nothing leaks. The caller owns the returned
    /// program.
    pub fn compile_program(
        ctx: &Context,
        vertex: &str,
        fragment: &str,
        attributes: &[ShaderAttribute],
    ) -> Result<ProgramId, ShaderError> {
        let gl = ctx.gl();

        let vs = compile_stage(ctx, ShaderStage::Vertex, vertex)?;
        let fs = match compile_stage(ctx, ShaderStage::Fragment, fragment) {
            Ok(fs) => fs,
            Err(err) => {
                gl.delete_shader(vs);
                return Err(err);
            }
        };

        let program = gl.create_program();
        gl.attach_shader(program, vs);
        gl.attach_shader(program, fs);
        for attr in attributes {
            gl.bind_attrib_location(program, attr.location, &attr.name);
        }
        gl.link_program(program);

        let linked = gl.program_link_status(program);
        gl.delete_shader(vs);
        gl.delete_shader(fs);

        if !linked {
            let log = gl.program_info_log(program);
            gl.delete_program(program);
            ctx.check_errors("Shader::compile_program");
            log::error!("shader program failed to link: {log}");
            return Err(ShaderError::Link { log });
        }

        ctx.check_errors("Shader::compile_program");
        log::debug!("linked shader program {}", program.0);
        Ok(program)
    }

    pub fn program(&self) -> ProgramId {
        self.program
    }

    /// Makes this program current for subsequent uniform uploads and draws.
    pub fn bind(&self, ctx: &Context) {
        debug_assert!(ctx.same(&self.ctx), "Shader bound on a foreign context");
        ctx.gl().use_program(self.program);
        ctx.check_errors("Shader::bind");
    }

    pub fn uniform_location(&self, ctx: &Context, name: &str) -> UniformLocation {
        let loc = ctx.gl().uniform_location(self.program, name);
        if !loc.is_known() {
            log::trace!("uniform {name} is not active in program {}", self.program.0);
        }
        loc
    }
}

impl Managed for Shader {
    fn object(&self) -> &Object {
        &self.object
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        self.ctx.gl().delete_program(self.program);
        self.ctx.check_errors("Shader::drop");
    }
}

fn read_source(path: &Path) -> Result<String, ShaderError> {
    std::fs::read_to_string(path).map_err(|source| {
        log::error!("could not load shader file {}: {source}", path.display());
        ShaderError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn compile_stage(ctx: &Context, stage: ShaderStage, source: &str) -> Result<ShaderId, ShaderError> {
    if source.trim().is_empty() {
        log::error!("{stage} shader source is empty");
        return Err(ShaderError::Empty { stage });
    }

    let gl = ctx.gl();
    let shader = gl.create_shader(stage);
    gl.shader_source(shader, source);
    gl.compile_shader(shader);

    if !gl.shader_compile_status(shader) {
        let log = gl.shader_info_log(shader);
        gl.delete_shader(shader);
        log::error!("unable to compile {stage} shader: {log}");
        log::debug!("{stage} shader source:\n{source}");
        return Err(ShaderError::Compile { stage, log });
    }
    Ok(shader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::GlApi;
    use crate::render::test_context as context;

    const VS: &str = "uniform mat4 g_matModelViewProj;\n\
                      attribute vec4 g_vPositionOS;\n\
                      void main() { gl_Position = g_matModelViewProj * g_vPositionOS; }\n";
    const FS: &str = "precision mediump float;\n\
                      void main() { gl_FragColor = vec4(1.0); }\n";
    const ATTRIBUTES: [ShaderAttribute; 1] =
        [ShaderAttribute::new("g_vPositionOS", Semantic::Position)];

    #[test]
    fn builds_a_linked_program() {
        let (gl, ctx) = context();
        let shader = Shader::from_source(&ctx, VS, FS, &ATTRIBUTES).unwrap();
        assert!(!shader.program().is_none());
        assert!(gl.program_link_status(shader.program()));
        assert!(shader.uniform_location(&ctx, "g_matModelViewProj").is_known());

        let s = gl.state();
        let program = &s.programs[&shader.program()];
        assert_eq!(program.attrib_bindings["g_vPositionOS"], 0);
        // Stage objects are released once linked.
        assert!(s.shaders.is_empty());
    }

    #[test]
    fn bind_makes_the_program_current() {
        let (gl, ctx) = context();
        let shader = Shader::from_source(&ctx, VS, FS, &ATTRIBUTES).unwrap();
        shader.bind(&ctx);
        assert_eq!(gl.state().current_program, shader.program());
    }

    #[test]
    fn compile_failure_is_reported_with_the_log() {
        let (gl, ctx) = context();
        let broken = "void main() {}\n#error no way\n";
        let err = Shader::from_source(&ctx, VS, broken, &ATTRIBUTES)
            .err()
            .unwrap();
        match err {
            ShaderError::Compile { stage, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(log.contains("no way"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(gl.state().live_names(), 0);
    }

    #[test]
    fn empty_source_is_rejected() {
        let (_, ctx) = context();
        let err = Shader::from_source(&ctx, " \n", FS, &[]).err().unwrap();
        assert!(matches!(err, ShaderError::Empty { stage: ShaderStage::Vertex }));
    }

    #[test]
    fn link_failure_deletes_the_program() {
        let (gl, ctx) = context();
        // Both stages compile, but the fragment stage reads a varying the
        // vertex stage never writes.
        let fs = "precision mediump float;\nvarying vec2 v_uv;\n\
                  void main() { gl_FragColor = vec4(v_uv, 0.0, 1.0); }\n";
        let err = Shader::compile_program(&ctx, VS, fs, &ATTRIBUTES);
        match err {
            Err(ShaderError::Link { log }) => assert!(log.contains("v_uv")),
            other => panic!("expected a link error, got {other:?}"),
        }
        assert_eq!(gl.state().live_names(), 0);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let (_, ctx) = context();
        let err = Shader::from_files(&ctx, "missing.vs", "missing.fs", &ATTRIBUTES)
            .err()
            .unwrap();
        assert!(matches!(err, ShaderError::Io { .. }));
        assert!(err.to_string().contains("missing.vs"));
    }

    #[test]
    fn drop_deletes_the_program() {
        let (gl, ctx) = context();
        let shader = Shader::from_source(&ctx, VS, FS, &ATTRIBUTES).unwrap();
        let program = shader.program();
        drop(shader);
        assert!(!gl.state().programs.contains_key(&program));
    }
}
