//! Errors.

use crate::backend::Capability;
use crate::provider::CoreKind;
use crate::view::ViewId;
use thiserror::Error;

/// Errors raised by views, cores and providers.
#[derive(Error, Debug)]
pub enum Error {
    /// The provider has no core for the requested kind or name.
    #[error("core type not supported: {0}")]
    CoreTypeNotSupported(String),

    /// A core was queried for a capability it does not implement.
    #[error("capability not implemented: {kind:?} core is not {capability:?}")]
    CapabilityNotImplemented { kind: CoreKind, capability: Capability },

    /// `bind` was called on a view that already has a core.
    #[error("view {0} is already bound to a core")]
    AlreadyBound(ViewId),

    /// Adding the child would make a view its own ancestor.
    #[error("adding view {child} to view {parent} would create a cycle")]
    HierarchyCycle { parent: ViewId, child: ViewId },

    /// The view has no core yet.
    #[error("view {0} is not bound to a core")]
    Unbound(ViewId),

    /// A weak handle was used after its target was destroyed.
    #[error("weak reference target has been destroyed")]
    Detached,

    /// An observed geometry value is outside the accepted envelope.
    #[error("{what}: observed {observed}, expected {expected} ± {tolerance}")]
    ToleranceViolation {
        what: &'static str,
        observed: f64,
        expected: f64,
        tolerance: f64,
    },

    /// A settle condition was still not satisfied on its last try.
    #[error("operation did not settle after {attempts} attempts")]
    SettleTimeout { attempts: u32 },

    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
