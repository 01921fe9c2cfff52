//! UI providers: per-platform core factories.

use crate::backend::Core;
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::handle::Handle;
use crate::view::View;
use core::fmt;
use core::str::FromStr;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Revision of the [`CoreKind`] enumeration. Bumped whenever a kind is added.
pub const CORE_KINDS_VERSION: u32 = 1;

/// Kinds of cores a view can ask for.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CoreKind {
    Container,
    Button,
    Window,
    ScrollView,
}

impl CoreKind {
    pub const ALL: [CoreKind; 4] = [
        CoreKind::Container,
        CoreKind::Button,
        CoreKind::Window,
        CoreKind::ScrollView,
    ];

    /// Stable name of the kind.
    pub fn name(self) -> &'static str {
        match self {
            CoreKind::Container => "container",
            CoreKind::Button => "button",
            CoreKind::Window => "window",
            CoreKind::ScrollView => "scroll_view",
        }
    }
}

impl fmt::Display for CoreKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CoreKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<CoreKind> {
        CoreKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| Error::CoreTypeNotSupported(name.to_string()))
    }
}

/// A per-platform core factory.
pub trait UiProvider: Send + Sync {
    /// Identifies the backend.
    fn name(&self) -> &str;

    /// The dispatcher of the UI context this provider's cores live on.
    fn dispatcher(&self) -> &Handle<Dispatcher>;

    /// Creates a core of the given kind for `view`, which must not be bound yet.
    ///
    /// Fails with [`Error::CoreTypeNotSupported`] if this provider has no such core; it never
    /// substitutes a different one.
    fn create_core(&self, kind: CoreKind, view: &Handle<View>) -> Result<Handle<dyn Core>>;

    /// Like [`create_core`](UiProvider::create_core), with the kind given by its name.
    fn create_core_by_name(&self, name: &str, view: &Handle<View>) -> Result<Handle<dyn Core>> {
        let kind = name.parse::<CoreKind>().map_err(|err| {
            tracing::warn!(provider = self.name(), name, "unknown core type");
            err
        })?;
        self.create_core(kind, view)
    }
}

/// Builds a core for a view.
pub type CoreConstructor = Box<dyn Fn(&Handle<View>) -> Handle<dyn Core> + Send + Sync>;

/// A provider backed by a table of constructors.
pub struct CoreRegistry {
    name: String,
    dispatcher: Handle<Dispatcher>,
    constructors: BTreeMap<CoreKind, CoreConstructor>,
}

impl CoreRegistry {
    pub fn new<S: Into<String>>(name: S, dispatcher: Handle<Dispatcher>) -> CoreRegistry {
        CoreRegistry {
            name: name.into(),
            dispatcher,
            constructors: BTreeMap::new(),
        }
    }

    /// Registers (or replaces) the constructor for `kind`.
    pub fn register<F>(&mut self, kind: CoreKind, constructor: F) -> &mut Self
    where
        F: Fn(&Handle<View>) -> Handle<dyn Core> + Send + Sync + 'static,
    {
        self.constructors.insert(kind, Box::new(constructor));
        self
    }

    pub fn supports(&self, kind: CoreKind) -> bool {
        self.constructors.contains_key(&kind)
    }

    /// Registered kinds, in declaration order.
    pub fn kinds(&self) -> impl Iterator<Item = CoreKind> + '_ {
        self.constructors.keys().copied()
    }
}

impl UiProvider for CoreRegistry {
    fn name(&self) -> &str {
        &self.name
    }

    fn dispatcher(&self) -> &Handle<Dispatcher> {
        &self.dispatcher
    }

    fn create_core(&self, kind: CoreKind, view: &Handle<View>) -> Result<Handle<dyn Core>> {
        let constructor = match self.constructors.get(&kind) {
            Some(constructor) => constructor,
            None => {
                tracing::warn!(provider = %self.name, %kind, "core type not supported");
                return Err(Error::CoreTypeNotSupported(kind.name().to_string()));
            }
        };
        if view.is_bound() {
            return Err(Error::AlreadyBound(view.id()));
        }

        let core = constructor(view);
        tracing::debug!(provider = %self.name, %kind, view = %view.id(), "created core");
        Ok(core)
    }
}

impl fmt::Debug for CoreRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CoreRegistry")
            .field("name", &self.name)
            .field("kinds", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The provider of the platform this process runs on.
///
/// Created on first use and shared afterwards.
pub fn platform_provider() -> Handle<dyn UiProvider> {
    static PROVIDER: OnceLock<Handle<dyn UiProvider>> = OnceLock::new();
    PROVIDER.get_or_init(crate::headless::provider).clone()
}
