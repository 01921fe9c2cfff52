//! Platform-independent views backed by per-platform cores.
//!
//! A [`View`] holds its state and is bound to a [`Core`] obtained from a [`UiProvider`], usually
//! [`platform_provider`]. Asynchronous native effects are awaited with [`Settle`] on a
//! [`Dispatcher`].

mod backend;
pub mod config;
pub mod dispatch;
mod error;
pub mod geometry;
mod handle;
pub mod headless;
pub mod layout;
mod provider;
pub mod scroll;
pub mod settle;
mod view;

pub use backend::{scroll_core, Capability, Core, InvalidateReason, ScrollCore};
pub use config::Config;
pub use dispatch::{Clock, DispatchSender, Dispatcher, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use geometry::{Point, Rect, Size, SizeExt};
pub use handle::{Handle, WeakHandle};
pub use layout::{PixelGrid, RoundType, Tolerances, ViewportNegotiation};
pub use provider::{
    platform_provider, CoreConstructor, CoreKind, CoreRegistry, UiProvider, CORE_KINDS_VERSION,
};
pub use scroll::ScrollIntoView;
pub use settle::{Settle, SettlePolicy, SettleState};
pub use view::{View, ViewId};
