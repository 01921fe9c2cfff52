//! A backend without a native UI.
//!
//! The headless backend behaves like a real one where it matters for the abstraction layer: bounds
//! are aligned to a pixel grid of configurable density, scroll views have chrome around their
//! viewport, and resizing or scrolling a scroll view takes effect only after a configurable
//! native delay, posted to the UI dispatcher.

use crate::backend::{Capability, Core, InvalidateReason, ScrollCore};
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::geometry::{Point, Rect, Size, SizeExt};
use crate::handle::{Handle, WeakHandle};
use crate::layout::{PixelGrid, RoundType};
use crate::provider::{CoreKind, CoreRegistry, UiProvider};
use crate::scroll;
use crate::view::View;
use cgmath::{Point2, Vector2};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Headless backend settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeadlessConfig {
    /// Device pixels per layout unit.
    #[serde(default = "default_scale")]
    pub scale: f64,

    /// Width of the border around a scroll view's viewport.
    #[serde(default = "default_viewport_inset")]
    pub viewport_inset: f64,

    /// How long resizes and scrolls take to apply. Zero applies them immediately.
    #[serde(default)]
    pub native_delay_ms: u64,
}

fn default_scale() -> f64 {
    1.
}

fn default_viewport_inset() -> f64 {
    1.
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        HeadlessConfig {
            scale: default_scale(),
            viewport_inset: default_viewport_inset(),
            native_delay_ms: 0,
        }
    }
}

impl HeadlessConfig {
    pub fn native_delay(&self) -> Duration {
        Duration::from_millis(self.native_delay_ms)
    }
}

/// Intrinsic size of a button without a size hint.
pub const BUTTON_SIZE: (f64, f64) = (72., 24.);

/// The headless platform provider, with default settings and its own dispatcher.
pub fn provider() -> Handle<dyn UiProvider> {
    let registry = registry(HeadlessConfig::default(), Handle::new(Dispatcher::new()));
    Handle::from(Arc::new(registry) as Arc<dyn UiProvider>)
}

/// Creates a headless provider whose cores run on `dispatcher`.
pub fn registry(config: HeadlessConfig, dispatcher: Handle<Dispatcher>) -> CoreRegistry {
    let mut registry = CoreRegistry::new("headless", dispatcher.clone());

    for &kind in &[CoreKind::Container, CoreKind::Window] {
        let dispatcher = dispatcher.clone();
        registry.register(kind, move |view| {
            let base = CoreBase::new(kind, view, &config, dispatcher.clone());
            Handle::from(Arc::new(ContainerCore { base }) as Arc<dyn Core>)
        });
    }

    let d = dispatcher.clone();
    registry.register(CoreKind::Button, move |view| {
        let base = CoreBase::new(CoreKind::Button, view, &config, d.clone());
        Handle::from(Arc::new(ButtonCore { base }) as Arc<dyn Core>)
    });

    registry.register(CoreKind::ScrollView, move |view| {
        let base = CoreBase::new(CoreKind::ScrollView, view, &config, dispatcher.clone());
        Handle::from(Arc::new(ScrollViewCore {
            base,
            inset: config.viewport_inset,
            native_delay: config.native_delay(),
            position: Arc::new(Mutex::new(Point2::new(0., 0.))),
        }) as Arc<dyn Core>)
    });

    registry
}

/// State every headless core has.
struct CoreBase {
    kind: CoreKind,
    view: WeakHandle<View>,
    grid: PixelGrid,
    dispatcher: Handle<Dispatcher>,
    /// Native bounds; shared with deferred native effects.
    bounds: Arc<Mutex<Rect>>,
    layout_pending: Arc<AtomicBool>,
}

impl CoreBase {
    fn new(
        kind: CoreKind,
        view: &Handle<View>,
        config: &HeadlessConfig,
        dispatcher: Handle<Dispatcher>,
    ) -> CoreBase {
        CoreBase {
            kind,
            view: Handle::downgrade(view),
            grid: PixelGrid::new(config.scale),
            dispatcher,
            bounds: Arc::new(Mutex::new(Rect::zero())),
            layout_pending: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Queues one layout pass; further requests before it runs are merged into it.
    fn schedule_layout(&self) {
        if self.layout_pending.swap(true, Ordering::SeqCst) {
            return;
        }

        let view = self.view.clone();
        let pending = self.layout_pending.clone();
        self.dispatcher.post(move |_| {
            pending.store(false, Ordering::SeqCst);
            // a view destroyed in the meantime has nothing left to lay out
            if let Ok(core) = view.upgrade().and_then(|view| view.core()) {
                core.layout();
            }
        });
    }

    /// Aligns and applies bounds. Returns the applied bounds and whether the size changed.
    fn apply_bounds(&self, bounds: Rect) -> (Rect, bool) {
        let adjusted = self
            .grid
            .adjust_bounds(bounds, RoundType::Nearest, RoundType::Nearest);
        let mut current = self.bounds.lock();
        let resized = current.size != adjusted.size;
        *current = adjusted;
        (adjusted, resized)
    }

    fn invalidate(&self, reason: InvalidateReason) {
        tracing::trace!(kind = %self.kind, ?reason, "headless core invalidated");
        if reason != InvalidateReason::StandardChildPropertyChanged {
            self.schedule_layout();
        }
    }
}

/// Lays out children in a column, each as wide as the container.
struct ContainerCore {
    base: CoreBase,
}

impl Core for ContainerCore {
    fn kind(&self) -> CoreKind {
        self.base.kind
    }

    fn view(&self) -> Result<Handle<View>> {
        self.base.view.upgrade()
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Container]
    }

    fn invalidate(&self, reason: InvalidateReason) {
        self.base.invalidate(reason);
    }

    fn calc_preferred_size(&self, available_space: Size) -> Size {
        let view = match self.view() {
            Ok(view) => view,
            Err(_) => return Vector2::new(0., 0.),
        };

        let mut size: Size = Vector2::new(0., 0.);
        for child in view.children().iter().filter(|child| child.visible()) {
            if let Ok(child_size) =
                child.calc_preferred_size(Vector2::new(available_space.x, f64::INFINITY))
            {
                size.x = size.x.max(child_size.x);
                size.y += child_size.y;
            }
        }
        self.base.grid.align_size(size, RoundType::Up)
    }

    fn pixel_grid(&self) -> PixelGrid {
        self.base.grid
    }

    fn set_bounds(&self, bounds: Rect) -> Rect {
        let (applied, resized) = self.base.apply_bounds(bounds);
        if resized {
            self.base.schedule_layout();
        }
        applied
    }

    fn layout(&self) {
        let view = match self.view() {
            Ok(view) => view,
            Err(_) => return,
        };

        let width = self.base.bounds.lock().size.x;
        let mut y: f64 = 0.;
        for child in view.children().iter().filter(|child| child.visible()) {
            let height = match child.calc_preferred_size(Vector2::new(width, f64::INFINITY)) {
                Ok(size) => size.y,
                Err(err) => {
                    tracing::warn!(child = %child.id(), %err, "skipping child in layout");
                    continue;
                }
            };
            if let Ok(applied) = child.set_bounds(Rect::from_xywh(0., y, width, height)) {
                y += applied.size.y;
            }
        }
    }

    fn into_scrollable(self: Arc<Self>) -> core::result::Result<Arc<dyn ScrollCore>, Arc<dyn Core>> {
        Err(self)
    }
}

struct ButtonCore {
    base: CoreBase,
}

impl Core for ButtonCore {
    fn kind(&self) -> CoreKind {
        self.base.kind
    }

    fn view(&self) -> Result<Handle<View>> {
        self.base.view.upgrade()
    }

    fn invalidate(&self, reason: InvalidateReason) {
        tracing::trace!(kind = %self.base.kind, ?reason, "button invalidated");
    }

    fn calc_preferred_size(&self, available_space: Size) -> Size {
        let hint = self
            .view()
            .map(|view| view.preferred_size_hint())
            .unwrap_or_else(|_| Size::none());
        let intrinsic = Vector2::new(
            if hint.x.is_finite() { hint.x } else { BUTTON_SIZE.0 },
            if hint.y.is_finite() { hint.y } else { BUTTON_SIZE.1 },
        );
        self.base
            .grid
            .align_size(intrinsic.at_most(available_space), RoundType::Up)
    }

    fn pixel_grid(&self) -> PixelGrid {
        self.base.grid
    }

    fn set_bounds(&self, bounds: Rect) -> Rect {
        self.base.apply_bounds(bounds).0
    }

    fn into_scrollable(self: Arc<Self>) -> core::result::Result<Arc<dyn ScrollCore>, Arc<dyn Core>> {
        Err(self)
    }
}

/// A scroll view with a border of `inset` around its viewport.
struct ScrollViewCore {
    base: CoreBase,
    inset: f64,
    native_delay: Duration,
    /// Scroll position; shared with deferred native effects.
    position: Arc<Mutex<Point>>,
}

impl ScrollViewCore {
    fn chrome(&self) -> Size {
        Vector2::new(2. * self.inset, 2. * self.inset)
    }

    /// Runs a native effect, after the native delay if there is one.
    fn apply_natively<F: FnOnce() + Send + 'static>(&self, effect: F) {
        if self.native_delay == Duration::from_millis(0) {
            effect();
        } else {
            self.base.dispatcher.post_after(self.native_delay, move |_| effect());
        }
    }

    /// Size of the scrollable area for a given viewport.
    ///
    /// Axes that scroll are at least as large as the viewport; others match it exactly.
    fn content_size(&self, view: &View, viewport: Size) -> Size {
        let horizontal = view.horizontal_scrolling_enabled();
        let vertical = view.vertical_scrolling_enabled();
        let content = match view.content_view() {
            Some(content) => content,
            None => return viewport,
        };

        let available = Vector2::new(
            if horizontal { f64::INFINITY } else { viewport.x },
            if vertical { f64::INFINITY } else { viewport.y },
        );
        let preferred = content.calc_preferred_size(available).unwrap_or(viewport);

        Vector2::new(
            if horizontal { preferred.x.max(viewport.x) } else { viewport.x },
            if vertical { preferred.y.max(viewport.y) } else { viewport.y },
        )
    }
}

impl Core for ScrollViewCore {
    fn kind(&self) -> CoreKind {
        self.base.kind
    }

    fn view(&self) -> Result<Handle<View>> {
        self.base.view.upgrade()
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Scrollable, Capability::Container]
    }

    fn invalidate(&self, reason: InvalidateReason) {
        self.base.invalidate(reason);
    }

    fn calc_preferred_size(&self, available_space: Size) -> Size {
        let view = match self.view() {
            Ok(view) => view,
            Err(_) => return self.chrome(),
        };

        let chrome = self.chrome();
        let horizontal = view.horizontal_scrolling_enabled();
        let vertical = view.vertical_scrolling_enabled();
        let inner = available_space - chrome;
        let preferred = match view.content_view() {
            Some(content) => content
                .calc_preferred_size(Vector2::new(
                    if horizontal { f64::INFINITY } else { inner.x },
                    if vertical { f64::INFINITY } else { inner.y },
                ))
                .unwrap_or_else(|_| Vector2::new(0., 0.)),
            None => Vector2::new(0., 0.),
        };

        // scrolling axes can always make do with the space there is
        let mut size = preferred + chrome;
        if horizontal {
            size.x = size.x.min(available_space.x);
        }
        if vertical {
            size.y = size.y.min(available_space.y);
        }
        self.base.grid.align_size(size, RoundType::Up)
    }

    fn pixel_grid(&self) -> PixelGrid {
        self.base.grid
    }

    fn set_bounds(&self, bounds: Rect) -> Rect {
        let (applied, resized) = self.base.apply_bounds(bounds);
        if resized {
            self.base.schedule_layout();
        }
        applied
    }

    fn layout(&self) {
        let view = match self.view() {
            Ok(view) => view,
            Err(_) => return,
        };

        let viewport = self.viewport_size();
        let content_size = self.content_size(&view, viewport);
        if let Some(content) = view.content_view() {
            if let Err(err) = content.set_bounds(Rect::new(Point2::new(0., 0.), content_size)) {
                tracing::warn!(content = %content.id(), %err, "could not place content view");
            }
        }

        let max = content_size - viewport;
        let mut position = self.position.lock();
        position.x = position.x.min(max.x).max(0.);
        position.y = position.y.min(max.y).max(0.);
    }

    fn into_scrollable(self: Arc<Self>) -> core::result::Result<Arc<dyn ScrollCore>, Arc<dyn Core>> {
        Ok(self)
    }
}

impl ScrollCore for ScrollViewCore {
    fn visible_client_rect(&self) -> Rect {
        Rect::new(*self.position.lock(), self.viewport_size())
    }

    fn scroll_client_rect_to_visible(&self, target: Rect) {
        let view = match self.view() {
            Ok(view) => view,
            Err(_) => return,
        };

        let visible = self.visible_client_rect();
        let content = match view.content_view() {
            Some(content) => content.size(),
            None => visible.size,
        };
        let origin = scroll::scroll_rect_to_visible(visible, target, content);
        let origin = Point2::new(
            self.base.grid.align(origin.x, RoundType::Nearest),
            self.base.grid.align(origin.y, RoundType::Nearest),
        );

        tracing::trace!(?target, ?origin, "scrolling");
        let position = self.position.clone();
        self.apply_natively(move || *position.lock() = origin);
    }

    fn viewport_size(&self) -> Size {
        self.base.bounds.lock().inset(self.inset, self.inset).size
    }

    fn resize_for_viewport(&self, viewport_size: Size) -> Size {
        let chrome = self.chrome();
        let current = *self.base.bounds.lock();
        let outer = self.base.grid.adjust_bounds(
            current.with_size(viewport_size + chrome),
            RoundType::Nearest,
            RoundType::Nearest,
        );

        let bounds = self.base.bounds.clone();
        let view = self.base.view.clone();
        self.apply_natively(move || {
            *bounds.lock() = outer;
            if let Ok(view) = view.upgrade() {
                view.update_bounds_from_core(outer);
                if let Ok(core) = view.core() {
                    core.layout();
                }
            }
        });

        let viewport = outer.size - chrome;
        Vector2::new(viewport.x.max(0.), viewport.y.max(0.))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::ManualClock;
    use crate::error::Error;

    fn setup(config: HeadlessConfig) -> (CoreRegistry, Handle<Dispatcher>, Arc<ManualClock>) {
        let (dispatcher, clock) = Dispatcher::manual();
        let dispatcher = Handle::new(dispatcher);
        (registry(config, dispatcher.clone()), dispatcher, clock)
    }

    #[test]
    fn registers_every_kind() {
        let (registry, _, _) = setup(HeadlessConfig::default());
        assert_eq!(registry.kinds().collect::<Vec<_>>(), CoreKind::ALL.to_vec());
        assert_eq!(registry.name(), "headless");
    }

    #[test]
    fn button_sizes() {
        let (registry, _, _) = setup(HeadlessConfig {
            scale: 2.,
            ..HeadlessConfig::default()
        });
        let button = View::create(CoreKind::Button, &registry).expect("button");

        assert_eq!(
            button.calc_preferred_size(Size::none()).expect("bound"),
            Vector2::new(BUTTON_SIZE.0, BUTTON_SIZE.1)
        );

        button.set_preferred_size_hint(Vector2::new(100.2, f64::INFINITY));
        assert_eq!(
            button.calc_preferred_size(Size::none()).expect("bound"),
            Vector2::new(100.5, BUTTON_SIZE.1)
        );

        button.set_preferred_size_minimum(Vector2::new(0., 40.));
        button.set_preferred_size_maximum(Vector2::new(90., f64::INFINITY));
        assert_eq!(
            button.calc_preferred_size(Size::none()).expect("bound"),
            Vector2::new(90., 40.)
        );

        let applied = button
            .set_bounds(Rect::from_xywh(0.3, 0.2, 10.1, 10.))
            .expect("bound");
        assert_eq!(applied, Rect::from_xywh(0.5, 0., 10., 10.));
        assert_eq!(button.bounds(), applied);
    }

    #[test]
    fn container_stacks_children() {
        let (registry, dispatcher, _clock) = setup(HeadlessConfig::default());
        let window = View::create(CoreKind::Window, &registry).expect("window");
        let a = View::create(CoreKind::Button, &registry).expect("button");
        let b = View::create(CoreKind::Button, &registry).expect("button");
        b.set_preferred_size_hint(Vector2::new(120., 30.));
        View::add_child(&window, a.clone()).expect("no cycle");
        View::add_child(&window, b.clone()).expect("no cycle");

        assert_eq!(
            window.calc_preferred_size(Size::none()).expect("bound"),
            Vector2::new(120., BUTTON_SIZE.1 + 30.)
        );

        window
            .set_bounds(Rect::from_xywh(0., 0., 200., 400.))
            .expect("bound");
        dispatcher.run_until_idle();

        assert_eq!(a.bounds(), Rect::from_xywh(0., 0., 200., BUTTON_SIZE.1));
        assert_eq!(b.bounds(), Rect::from_xywh(0., BUTTON_SIZE.1, 200., 30.));

        a.set_visible(false);
        dispatcher.run_until_idle();
        assert_eq!(b.bounds(), Rect::from_xywh(0., 0., 200., 30.));
    }

    #[test]
    fn only_scroll_views_are_scrollable() {
        let (registry, _, _) = setup(HeadlessConfig::default());
        let scroll = View::create(CoreKind::ScrollView, &registry).expect("scroll view");
        assert!(scroll.scroll_core().is_ok());
        assert!(scroll
            .core()
            .expect("bound")
            .capabilities()
            .contains(&Capability::Scrollable));

        let container = View::create(CoreKind::Container, &registry).expect("container");
        match container.scroll_core() {
            Err(Error::CapabilityNotImplemented { kind, capability }) => {
                assert_eq!(kind, CoreKind::Container);
                assert_eq!(capability, Capability::Scrollable);
            }
            Err(err) => panic!("unexpected error {}", err),
            Ok(_) => panic!("containers do not scroll"),
        }
        assert!(container.visible_client_rect().is_err());
    }

    #[test]
    fn resize_applies_after_native_delay() {
        let (registry, dispatcher, clock) = setup(HeadlessConfig {
            native_delay_ms: 250,
            ..HeadlessConfig::default()
        });
        let scroll = View::create(CoreKind::ScrollView, &registry).expect("scroll view");
        let core = scroll.scroll_core().expect("scrollable");

        let promised = core.resize_for_viewport(Vector2::new(300., 200.));
        assert_eq!(promised, Vector2::new(300., 200.));
        assert_eq!(core.viewport_size(), Vector2::new(0., 0.), "not applied yet");

        clock.advance(Duration::from_millis(249));
        dispatcher.run_pending();
        assert_eq!(core.viewport_size(), Vector2::new(0., 0.));

        clock.advance(Duration::from_millis(1));
        dispatcher.run_pending();
        assert_eq!(core.viewport_size(), Vector2::new(300., 200.));
        assert_eq!(scroll.size(), Vector2::new(302., 202.));
    }

    #[test]
    fn core_outliving_view_is_detached() {
        let (registry, dispatcher, _clock) = setup(HeadlessConfig::default());
        let view = View::create(CoreKind::Container, &registry).expect("container");
        let core = view.core().expect("bound");
        assert!(core.view().is_ok());

        // a pending layout only holds a weak reference
        view.invalidate(InvalidateReason::CustomDataChanged);
        drop(view);

        assert!(matches!(core.view(), Err(Error::Detached)));
        dispatcher.run_until_idle();
        assert_eq!(core.calc_preferred_size(Size::none()), Vector2::new(0., 0.));
    }
}
