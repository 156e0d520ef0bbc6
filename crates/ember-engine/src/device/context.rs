use std::fmt;
use std::rc::Rc;

use super::GlApi;

/// Error-checking policy for a [`Context`].
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Drain and log pending GPU errors after every resource operation.
    ///
    /// Enabled by default in debug builds only; polling errors stalls real drivers.
    pub check_errors: bool,

    /// Panic on the first reported GPU error instead of only logging it.
    pub assert_on_error: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            check_errors: cfg!(debug_assertions),
            assert_on_error: false,
        }
    }
}

/// Handle to one current GPU API instance.
///
/// Cloning is cheap and yields a handle to the same context. Resources keep a
/// clone so they can release their GPU names on destruction; bind and draw
/// operations take the context explicitly so call sites show which global
/// binding state they touch.
#[derive(Clone)]
pub struct Context {
    inner: Rc<ContextInner>,
}

struct ContextInner {
    api: Box<dyn GlApi>,
    config: ContextConfig,
}

impl Context {
    pub fn new(api: impl GlApi + 'static, config: ContextConfig) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                api: Box::new(api),
                config,
            }),
        }
    }

    #[inline]
    pub fn gl(&self) -> &dyn GlApi {
        self.inner.api.as_ref()
    }

    pub fn config(&self) -> &ContextConfig {
        &self.inner.config
    }

    /// Whether both handles refer to the same context.
    pub fn same(&self, other: &Context) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Drains pending GPU errors and reports each one, labelled with `what`.
    ///
    /// Returns the number of errors drained. Does nothing unless
    /// `check_errors` is configured.
    pub fn check_errors(&self, what: &str) -> usize {
        if !self.inner.config.check_errors {
            return 0;
        }

        // GL keeps one flag per error kind; a handful of polls drains them all.
        let mut count = 0;
        while count < 8 {
            let Some(err) = self.gl().get_error() else { break };
            log::error!("gl error after {what}: {err}");
            count += 1;
            if self.inner.config.assert_on_error {
                panic!("gl error after {what}: {err}");
            }
        }
        count
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
