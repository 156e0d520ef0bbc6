//! Headless ember demo.
//!
//! Usage: `ember-demo [frames] [width] [height]` (defaults 120, 800, 600).
//!
//! Renders a lit cube and a textured cube drawn through an off-screen render
//! target on the software backend, then reports leaked engine objects.
//! `RUST_LOG` controls log output; `EMBER_TRACK_OBJECTS=1` names leaked objects.

mod geometry;
mod scenes;

use anyhow::Context as _;
use ember_engine::core::{registry, LeakReport, RegistryConfig};
use ember_engine::device::headless::HeadlessGl;
use ember_engine::device::{Context, ContextConfig};
use ember_engine::logging::{init_logging, LoggingConfig};

use scenes::{Frame, LitScene, Scene, TexturedScene};

/// Simulated frame interval.
const FRAME_TIME: f32 = 1.0 / 60.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct DemoConfig {
    frames: u32,
    width: u32,
    height: u32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            frames: 120,
            width: 800,
            height: 600,
        }
    }
}

impl DemoConfig {
    fn from_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        let mut config = Self::default();
        let fields = [
            ("frames", &mut config.frames),
            ("width", &mut config.width),
            ("height", &mut config.height),
        ];
        for ((name, slot), arg) in fields.into_iter().zip(args) {
            *slot = arg
                .parse()
                .with_context(|| format!("invalid {name} argument {arg:?}"))?;
        }
        anyhow::ensure!(
            config.width > 0 && config.height > 0,
            "viewport must not be empty ({}x{})",
            config.width,
            config.height
        );
        Ok(config)
    }
}

fn run(ctx: &Context, gl: &HeadlessGl, config: DemoConfig) -> anyhow::Result<()> {
    let lit = LitScene::new(ctx).context("building lit scene")?;
    let textured = TexturedScene::new(ctx, config.width / 2, config.height / 2)
        .context("building textured scene")?;
    let mut scenes: Vec<Box<dyn Scene>> = vec![Box::new(lit), Box::new(textured)];
    let names: Vec<_> = scenes.iter().map(|s| s.name()).collect();
    log::info!(
        "scenes [{}] ready, {} live object(s)",
        names.join(", "),
        registry::live_objects()
    );

    for index in 0..config.frames {
        let frame = Frame {
            time: index as f32 * FRAME_TIME,
            width: config.width,
            height: config.height,
        };
        ctx.gl().viewport(0, 0, config.width as i32, config.height as i32);
        for scene in &mut scenes {
            scene.render(ctx, &frame);
        }

        if (index + 1) % 60 == 0 || index + 1 == config.frames {
            let draws = gl.state().draw_calls.len();
            log::info!("frame {}: {draws} draw call(s) since last report", index + 1);
            gl.clear_history();
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());
    registry::configure(RegistryConfig::from_env());

    let config = DemoConfig::from_args(std::env::args().skip(1))?;
    log::info!(
        "ember demo: {} frame(s) at {}x{}",
        config.frames,
        config.width,
        config.height
    );

    let gl = HeadlessGl::new();
    {
        let ctx = Context::new(gl.clone(), ContextConfig::default());
        run(&ctx, &gl, config)?;
    }
    shutdown(&gl);
    Ok(())
}

/// Logs leaked engine objects and GPU names. Leaks are diagnostics only; they
/// become fatal solely through `EMBER_ASSERT_ON_LEAKS`.
fn shutdown(gl: &HeadlessGl) -> LeakReport {
    let leaks = registry::report_leaks();
    let names = gl.state().live_names();
    if names > 0 {
        log::warn!("{names} GPU name(s) still allocated at shutdown");
    }
    leaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_engine::core::Handle;
    use ember_engine::render::SharedShaderValues;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_without_arguments() {
        assert_eq!(DemoConfig::from_args(args(&[])).unwrap(), DemoConfig::default());
    }

    #[test]
    fn positional_arguments_override_in_order() {
        let config = DemoConfig::from_args(args(&["3", "64"])).unwrap();
        assert_eq!(
            config,
            DemoConfig {
                frames: 3,
                width: 64,
                height: 600
            }
        );
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = DemoConfig::from_args(args(&["many"])).unwrap_err();
        assert!(err.to_string().contains("invalid frames argument"));
        assert!(DemoConfig::from_args(args(&["1", "0"])).is_err());
    }

    #[test]
    fn a_short_run_leaves_nothing_behind() {
        let gl = HeadlessGl::new();
        let objects = registry::live_objects();
        {
            let ctx = Context::new(
                gl.clone(),
                ContextConfig {
                    check_errors: true,
                    assert_on_error: true,
                },
            );
            let config = DemoConfig {
                frames: 2,
                width: 64,
                height: 64,
            };
            run(&ctx, &gl, config).unwrap();
        }
        assert_eq!(registry::live_objects(), objects);
        assert_eq!(gl.state().live_names(), 0);
    }

    #[test]
    fn shutdown_reports_leaks_without_failing() {
        let gl = HeadlessGl::new();
        let before = registry::live_objects();
        std::mem::forget(Handle::new(SharedShaderValues::default()));

        let leaks = shutdown(&gl);
        assert!(!leaks.is_clean());
        assert_eq!(leaks.live, before + 1);
    }
}
