//! Traits for the platform side of a view.
//!
//! A [`Core`] is created by a [`UiProvider`](crate::provider::UiProvider) for exactly one
//! [`View`] and realizes it natively. The view owns the core; the core only keeps a
//! [`WeakHandle`](crate::handle::WeakHandle) back to the view.
//!
//! Optional behaviour is expressed as capabilities. A core that has one reports it from
//! [`Core::capabilities`] and hands out the matching trait object from the corresponding
//! `into_*` method; everything else refuses with its own handle.

use crate::error::{Error, Result};
use crate::geometry::{Rect, Size};
use crate::handle::Handle;
use crate::layout::{PixelGrid, RoundType};
use crate::provider::CoreKind;
use crate::view::View;
use std::sync::Arc;

/// Behavioural contracts a core may implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Implements [`ScrollCore`].
    Scrollable,
    /// Lays out child views.
    Container,
}

/// Why a core has to recompute its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidateReason {
    /// One of the view's own properties changed.
    StandardPropertyChanged,
    /// A property of a child view changed that does not affect its size.
    StandardChildPropertyChanged,
    ChildAddedOrRemoved,
    /// A child's preferred size may have changed.
    ChildSizingInfoInvalidated,
    /// Application-defined data changed; the core should lay out again.
    CustomDataChanged,
}

impl InvalidateReason {
    /// True if the view's preferred size may have changed, which also concerns its parent.
    pub fn affects_sizing(self) -> bool {
        match self {
            InvalidateReason::StandardPropertyChanged
            | InvalidateReason::ChildAddedOrRemoved
            | InvalidateReason::ChildSizingInfoInvalidated => true,
            InvalidateReason::StandardChildPropertyChanged
            | InvalidateReason::CustomDataChanged => false,
        }
    }
}

/// Platform counterpart of a [`View`].
pub trait Core: Send + Sync {
    /// The kind this core was created for.
    fn kind(&self) -> CoreKind;

    /// The view this core belongs to, or [`Error::Detached`] once it has been destroyed.
    fn view(&self) -> Result<Handle<View>>;

    fn capabilities(&self) -> &'static [Capability] {
        &[]
    }

    /// Receives every invalidation the view raises. May recompute immediately or coalesce.
    fn invalidate(&self, reason: InvalidateReason);

    /// The size the core would like to have.
    ///
    /// Each component of `available_space` may be infinite, meaning "no constraint".
    fn calc_preferred_size(&self, available_space: Size) -> Size;

    /// The native grid bounds are aligned to.
    fn pixel_grid(&self) -> PixelGrid;

    /// Aligns `bounds` the way this core would if they were applied.
    fn adjust_bounds(&self, bounds: Rect, position_round: RoundType, size_round: RoundType) -> Rect {
        self.pixel_grid().adjust_bounds(bounds, position_round, size_round)
    }

    /// Applies new bounds natively and returns the bounds that were actually used.
    fn set_bounds(&self, bounds: Rect) -> Rect;

    /// Positions child views, if there are any.
    fn layout(&self) {}

    /// The [`Capability::Scrollable`] view of this core.
    fn into_scrollable(self: Arc<Self>) -> core::result::Result<Arc<dyn ScrollCore>, Arc<dyn Core>>;
}

/// Cores of views whose content can be larger than the view itself.
pub trait ScrollCore: Core {
    /// The part of the content view that is currently visible, in content coordinates.
    fn visible_client_rect(&self) -> Rect;

    /// Scrolls the minimal amount needed to make `target` visible.
    ///
    /// Coordinates may be infinite to scroll to the content edges. The scroll may complete
    /// asynchronously.
    fn scroll_client_rect_to_visible(&self, target: Rect);

    /// The current size of the area the content is shown in.
    fn viewport_size(&self) -> Size;

    /// Starts resizing the view so that its viewport gets `viewport_size`.
    ///
    /// The resize may complete asynchronously. Returns the viewport size the view will end up
    /// with once it has, after native adjustments.
    fn resize_for_viewport(&self, viewport_size: Size) -> Size;
}

/// Casts a core handle to its scrollable view without touching the reference count.
pub fn scroll_core(core: Handle<dyn Core>) -> Result<Handle<dyn ScrollCore>> {
    let kind = core.kind();
    Handle::cast(core, |core| core.into_scrollable()).map_err(|_| {
        tracing::warn!(?kind, "core is not scrollable");
        Error::CapabilityNotImplemented {
            kind,
            capability: Capability::Scrollable,
        }
    })
}
