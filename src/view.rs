//! Views and their binding to cores.

use crate::backend::{self, Core, InvalidateReason, ScrollCore};
use crate::error::{Error, Result};
use crate::geometry::{Point, Rect, Size, SizeExt};
use crate::handle::{Handle, WeakHandle};
use crate::layout::RoundType;
use crate::provider::{CoreKind, UiProvider};
use cgmath::{Vector2, Zero};
use core::fmt;
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

/// A unique identifier for a view.
///
/// (this is just a UUID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewId(Uuid);

impl ViewId {
    pub(crate) fn new() -> ViewId {
        ViewId(Uuid::new_v4())
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

enum Binding {
    Unbound,
    Bound(Handle<dyn Core>),
}

struct ViewState {
    bounds: Rect,
    preferred_size_hint: Size,
    preferred_size_minimum: Size,
    preferred_size_maximum: Size,
    visible: bool,
    horizontal_scrolling: bool,
    vertical_scrolling: bool,
    parent: Option<WeakHandle<View>>,
    children: Vec<Handle<View>>,
}

/// A platform-independent widget.
///
/// Views are always held through [`Handle`]s. A view is created unbound and gets its core, of the
/// view's [`CoreKind`], from a [`UiProvider`] exactly once; the kind never changes afterwards.
///
/// Every change that matters to layout or rendering goes through [`View::invalidate`], which
/// forwards it to the core and, if the view's preferred size may have changed, to the parent.
///
/// View state is meant to be mutated from the UI context only. Locks are never held while calling
/// into a core, so cores are free to read the view back.
pub struct View {
    id: ViewId,
    kind: CoreKind,
    state: Mutex<ViewState>,
    binding: RwLock<Binding>,
}

impl View {
    /// Creates an unbound view.
    pub fn new(kind: CoreKind) -> Handle<View> {
        Handle::new(View {
            id: ViewId::new(),
            kind,
            state: Mutex::new(ViewState {
                bounds: Rect::zero(),
                preferred_size_hint: Size::none(),
                preferred_size_minimum: Vector2::zero(),
                preferred_size_maximum: Size::none(),
                visible: true,
                horizontal_scrolling: false,
                vertical_scrolling: true,
                parent: None,
                children: Vec::new(),
            }),
            binding: RwLock::new(Binding::Unbound),
        })
    }

    /// Creates a view and binds it to a core from `provider`.
    pub fn create(kind: CoreKind, provider: &dyn UiProvider) -> Result<Handle<View>> {
        let view = View::new(kind);
        View::bind(&view, provider)?;
        Ok(view)
    }

    /// Obtains the core for this view from `provider`.
    ///
    /// Fails with [`Error::AlreadyBound`] if the view already has a core, and with whatever the
    /// provider reports if it can't create one; the view stays unbound in that case.
    pub fn bind(this: &Handle<View>, provider: &dyn UiProvider) -> Result<()> {
        if this.is_bound() {
            return Err(Error::AlreadyBound(this.id));
        }

        let core = provider.create_core(this.kind, this)?;

        let mut binding = this.binding.write();
        if let Binding::Bound(_) = *binding {
            return Err(Error::AlreadyBound(this.id));
        }
        *binding = Binding::Bound(core);
        drop(binding);

        tracing::debug!(view = %this.id, kind = %this.kind, provider = provider.name(), "view bound");
        Ok(())
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn kind(&self) -> CoreKind {
        self.kind
    }

    pub fn is_bound(&self) -> bool {
        matches!(*self.binding.read(), Binding::Bound(_))
    }

    /// The core of this view.
    pub fn core(&self) -> Result<Handle<dyn Core>> {
        match &*self.binding.read() {
            Binding::Bound(core) => Ok(core.clone()),
            Binding::Unbound => Err(Error::Unbound(self.id)),
        }
    }

    /// The core of this view as a scroll core.
    pub fn scroll_core(&self) -> Result<Handle<dyn ScrollCore>> {
        backend::scroll_core(self.core()?)
    }

    /// Notifies the core that something changed.
    ///
    /// If the change may affect the preferred size, the parent is told that a child's sizing
    /// information changed.
    pub fn invalidate(&self, reason: InvalidateReason) {
        tracing::trace!(view = %self.id, ?reason, "invalidate");

        if let Ok(core) = self.core() {
            core.invalidate(reason);
        }

        if reason.affects_sizing() {
            if let Some(parent) = self.parent() {
                parent.invalidate(InvalidateReason::ChildSizingInfoInvalidated);
            }
        }
    }

    /// Applies `change` to the state and invalidates if it reports a change.
    fn update<F>(&self, reason: InvalidateReason, change: F)
    where
        F: FnOnce(&mut ViewState) -> bool,
    {
        let changed = change(&mut self.state.lock());
        if changed {
            self.invalidate(reason);
        }
    }

    pub fn bounds(&self) -> Rect {
        self.state.lock().bounds
    }

    pub fn position(&self) -> Point {
        self.bounds().origin
    }

    pub fn size(&self) -> Size {
        self.bounds().size
    }

    /// Moves and resizes the view, as done by the parent's layout.
    ///
    /// The core aligns the bounds to its native grid; the aligned bounds are stored and returned.
    pub fn set_bounds(&self, bounds: Rect) -> Result<Rect> {
        let applied = self.core()?.set_bounds(bounds);
        self.state.lock().bounds = applied;
        Ok(applied)
    }

    /// Records bounds that the native side changed on its own (e.g. a finished resize).
    ///
    /// Called by cores; does not call back into the core.
    pub fn update_bounds_from_core(&self, bounds: Rect) {
        self.state.lock().bounds = bounds;
    }

    /// Aligns `bounds` the way the core would.
    pub fn adjust_bounds(&self, bounds: Rect, position_round: RoundType, size_round: RoundType) -> Result<Rect> {
        Ok(self.core()?.adjust_bounds(bounds, position_round, size_round))
    }

    /// The size the view would like to have within `available_space`.
    ///
    /// The core's answer is limited by the preferred maximum and then raised to the preferred
    /// minimum.
    pub fn calc_preferred_size(&self, available_space: Size) -> Result<Size> {
        let size = self.core()?.calc_preferred_size(available_space);
        let state = self.state.lock();
        Ok(size
            .at_most(state.preferred_size_maximum)
            .at_least(state.preferred_size_minimum))
    }

    /// Lets the core position the children.
    pub fn layout(&self) -> Result<()> {
        self.core()?.layout();
        Ok(())
    }

    pub fn preferred_size_hint(&self) -> Size {
        self.state.lock().preferred_size_hint
    }

    pub fn set_preferred_size_hint(&self, hint: Size) {
        self.update(InvalidateReason::StandardPropertyChanged, |state| {
            let changed = state.preferred_size_hint != hint;
            state.preferred_size_hint = hint;
            changed
        });
    }

    pub fn preferred_size_minimum(&self) -> Size {
        self.state.lock().preferred_size_minimum
    }

    pub fn set_preferred_size_minimum(&self, minimum: Size) {
        self.update(InvalidateReason::StandardPropertyChanged, |state| {
            let changed = state.preferred_size_minimum != minimum;
            state.preferred_size_minimum = minimum;
            changed
        });
    }

    pub fn preferred_size_maximum(&self) -> Size {
        self.state.lock().preferred_size_maximum
    }

    pub fn set_preferred_size_maximum(&self, maximum: Size) {
        self.update(InvalidateReason::StandardPropertyChanged, |state| {
            let changed = state.preferred_size_maximum != maximum;
            state.preferred_size_maximum = maximum;
            changed
        });
    }

    pub fn visible(&self) -> bool {
        self.state.lock().visible
    }

    pub fn set_visible(&self, visible: bool) {
        self.update(InvalidateReason::StandardPropertyChanged, |state| {
            let changed = state.visible != visible;
            state.visible = visible;
            changed
        });
    }

    pub fn parent(&self) -> Option<Handle<View>> {
        let parent = self.state.lock().parent.clone()?;
        parent.upgrade().ok()
    }

    pub fn children(&self) -> Vec<Handle<View>> {
        self.state.lock().children.clone()
    }

    /// Appends `child`, detaching it from its previous parent first.
    ///
    /// Fails with [`Error::HierarchyCycle`] if `child` is this view or one of its ancestors; the
    /// tree is left unchanged in that case.
    pub fn add_child(this: &Handle<View>, child: Handle<View>) -> Result<()> {
        View::check_acyclic(this, &child)?;

        if let Some(previous) = child.parent() {
            View::remove_child(&previous, &child);
        }

        child.state.lock().parent = Some(Handle::downgrade(this));
        this.update(InvalidateReason::ChildAddedOrRemoved, |state| {
            state.children.push(child);
            true
        });
        Ok(())
    }

    /// Fails if `child` is `this` or one of its ancestors.
    fn check_acyclic(this: &Handle<View>, child: &Handle<View>) -> Result<()> {
        let mut ancestor = Some(this.clone());
        while let Some(view) = ancestor {
            if Handle::ptr_eq(&view, child) {
                tracing::warn!(parent = %this.id, child = %child.id, "refusing to create a view cycle");
                return Err(Error::HierarchyCycle {
                    parent: this.id,
                    child: child.id,
                });
            }
            ancestor = view.parent();
        }
        Ok(())
    }

    /// Removes `child`. Returns false if it was not a child of this view.
    pub fn remove_child(this: &Handle<View>, child: &Handle<View>) -> bool {
        let mut removed = false;
        this.update(InvalidateReason::ChildAddedOrRemoved, |state| {
            let before = state.children.len();
            state.children.retain(|c| !Handle::ptr_eq(c, child));
            removed = state.children.len() != before;
            removed
        });
        if removed {
            child.state.lock().parent = None;
        }
        removed
    }

    /// The single child of a scroll view.
    pub fn content_view(&self) -> Option<Handle<View>> {
        self.state.lock().children.first().cloned()
    }

    /// Replaces all children with `content`. Nothing changes if `content` would form a cycle.
    pub fn set_content_view(this: &Handle<View>, content: Option<Handle<View>>) -> Result<()> {
        if let Some(content) = &content {
            View::check_acyclic(this, content)?;
        }
        for child in this.children() {
            View::remove_child(this, &child);
        }
        match content {
            Some(content) => View::add_child(this, content),
            None => Ok(()),
        }
    }

    pub fn horizontal_scrolling_enabled(&self) -> bool {
        self.state.lock().horizontal_scrolling
    }

    pub fn set_horizontal_scrolling_enabled(&self, enabled: bool) {
        self.update(InvalidateReason::StandardPropertyChanged, |state| {
            let changed = state.horizontal_scrolling != enabled;
            state.horizontal_scrolling = enabled;
            changed
        });
    }

    pub fn vertical_scrolling_enabled(&self) -> bool {
        self.state.lock().vertical_scrolling
    }

    pub fn set_vertical_scrolling_enabled(&self, enabled: bool) {
        self.update(InvalidateReason::StandardPropertyChanged, |state| {
            let changed = state.vertical_scrolling != enabled;
            state.vertical_scrolling = enabled;
            changed
        });
    }

    /// The visible part of the content view; requires a scrollable core.
    pub fn visible_client_rect(&self) -> Result<Rect> {
        Ok(self.scroll_core()?.visible_client_rect())
    }

    /// Scrolls so that `target` (in content coordinates) becomes visible; may be asynchronous.
    pub fn scroll_client_rect_to_visible(&self, target: Rect) -> Result<()> {
        self.scroll_core()?.scroll_client_rect_to_visible(target);
        Ok(())
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("View")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("bound", &self.is_bound())
            .field("bounds", &self.bounds())
            .finish()
    }
}

impl Drop for View {
    fn drop(&mut self) {
        tracing::trace!(view = %self.id, kind = %self.kind, "view destroyed");
    }
}
