use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;

/// Leak-tracking configuration.
///
/// `track_names` is the debug mode: every live object remembers its type name so
/// the leak report can identify what was left behind. Only objects created after
/// the flag is switched on are named.
///
/// `assert_on_leaks` turns a non-empty report at registry teardown into a panic.
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    pub track_names: bool,
    pub assert_on_leaks: bool,
}

impl RegistryConfig {
    /// Reads `EMBER_TRACK_OBJECTS` and `EMBER_ASSERT_ON_LEAKS`.
    ///
    /// Accepted truthy values: `1`, `true`, `yes`, `on` (case-insensitive).
    pub fn from_env() -> Self {
        Self {
            track_names: env_flag("EMBER_TRACK_OBJECTS"),
            assert_on_leaks: env_flag("EMBER_ASSERT_ON_LEAKS"),
        }
    }
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// A live object reported by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveObject {
    pub id: u64,
    /// `None` unless name tracking was on when the object was created.
    pub name: Option<&'static str>,
}

/// Snapshot of the objects still alive on this thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeakReport {
    pub live: usize,
    /// Identified objects, ordered by creation. Empty unless names are tracked.
    pub objects: Vec<LiveObject>,
}

impl LeakReport {
    pub fn is_clean(&self) -> bool {
        self.live == 0
    }
}

impl fmt::Display for LeakReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return write!(f, "no leaks detected");
        }
        write!(f, "{} object(s) leaked", self.live)?;
        for obj in &self.objects {
            match obj.name {
                Some(name) => write!(f, "\n  #{} {}", obj.id, name)?,
                None => write!(f, "\n  #{} <unnamed>", obj.id)?,
            }
        }
        Ok(())
    }
}

struct ObjectRegistry {
    config: RegistryConfig,
    next_id: u64,
    live: usize,
    names: BTreeMap<u64, &'static str>,
}

impl ObjectRegistry {
    fn new() -> Self {
        Self {
            config: RegistryConfig::default(),
            next_id: 1,
            live: 0,
            names: BTreeMap::new(),
        }
    }

    fn report(&self) -> LeakReport {
        LeakReport {
            live: self.live,
            objects: self
                .names
                .iter()
                .map(|(&id, &name)| LiveObject { id, name: Some(name) })
                .collect(),
        }
    }
}

impl Drop for ObjectRegistry {
    fn drop(&mut self) {
        let report = self.report();
        emit(&report);
        if self.config.assert_on_leaks && !std::thread::panicking() {
            assert!(report.is_clean(), "{report}");
        }
    }
}

thread_local! {
    static REGISTRY: RefCell<ObjectRegistry> = RefCell::new(ObjectRegistry::new());
}

fn emit(report: &LeakReport) {
    if report.is_clean() {
        log::info!("{report}");
    } else {
        log::error!("{report}");
    }
}

/// Replaces the registry configuration for the current thread.
pub fn configure(config: RegistryConfig) {
    REGISTRY.with(|r| r.borrow_mut().config = config);
}

pub(crate) fn register(name: &'static str) -> u64 {
    REGISTRY
        .try_with(|r| {
            let mut r = r.borrow_mut();
            let id = r.next_id;
            r.next_id += 1;
            r.live += 1;
            if r.config.track_names {
                r.names.insert(id, name);
            }
            id
        })
        // Objects created during thread teardown are not tracked.
        .unwrap_or(0)
}

pub(crate) fn unregister(id: u64) {
    if id == 0 {
        return;
    }
    let _ = REGISTRY.try_with(|r| {
        let mut r = r.borrow_mut();
        r.live = r.live.saturating_sub(1);
        r.names.remove(&id);
    });
}

/// Number of objects currently alive on this thread.
pub fn live_objects() -> usize {
    REGISTRY.with(|r| r.borrow().live)
}

/// Returns the current leak report without logging it.
pub fn leak_report() -> LeakReport {
    REGISTRY.with(|r| r.borrow().report())
}

/// Logs the current leak report and returns it.
///
/// Panics when the report is not clean and `assert_on_leaks` is configured.
pub fn report_leaks() -> LeakReport {
    let (report, fatal) = REGISTRY.with(|r| {
        let r = r.borrow();
        (r.report(), r.config.assert_on_leaks)
    });
    emit(&report);
    if fatal {
        assert!(report.is_clean(), "{report}");
    }
    report
}
