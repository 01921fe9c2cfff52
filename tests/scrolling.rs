mod common;

use cgmath::{Point2, Vector2};
use common::{Fixture, Outcome};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use viewcore::headless::HeadlessConfig;
use viewcore::{
    Clock, Core, CoreKind, CoreRegistry, Error, Handle, PixelGrid, Rect, Result, ScrollCore,
    ScrollIntoView, SettlePolicy, Size, Tolerances, View, ViewportNegotiation, WeakHandle,
};

const CONTENT: f64 = 1000.;
const VIEWPORT: f64 = 300.;
const END: f64 = CONTENT - VIEWPORT;
const INF: f64 = f64::INFINITY;

fn slow_native() -> HeadlessConfig {
    HeadlessConfig {
        scale: 2.,
        viewport_inset: 1.,
        native_delay_ms: 250,
    }
}

/// A scroll view around a 1000×1000 button, scrolling in both directions.
fn scroll_view(fixture: &Fixture) -> Handle<View> {
    let scroll = View::create(CoreKind::ScrollView, &fixture.provider).expect("scroll view");
    scroll.set_horizontal_scrolling_enabled(true);

    let content = View::create(CoreKind::Button, &fixture.provider).expect("button");
    content.set_preferred_size_minimum(Vector2::new(CONTENT, CONTENT));
    content.set_preferred_size_maximum(Vector2::new(CONTENT, CONTENT));
    View::set_content_view(&scroll, Some(content)).expect("no cycle");

    scroll
}

fn negotiate(fixture: &Fixture, view: &Handle<View>, policy: SettlePolicy, size: Size) -> Result<Size> {
    let outcome = Outcome::new();
    ViewportNegotiation::new(policy, Tolerances::default()).start(
        view.clone(),
        size,
        &fixture.dispatcher,
        outcome.setter(),
    )?;
    fixture.run();
    outcome.take()
}

fn scroll_to(fixture: &Fixture, view: &Handle<View>, target: Rect) -> Rect {
    let outcome = Outcome::new();
    ScrollIntoView::new(SettlePolicy::default())
        .start(view.clone(), target, &fixture.dispatcher, outcome.setter())
        .expect("scrollable");
    fixture.run();
    outcome.take().expect("scroll settled")
}

fn ready_view(fixture: &Fixture) -> Handle<View> {
    let view = scroll_view(fixture);
    let viewport = negotiate(
        fixture,
        &view,
        SettlePolicy::default(),
        Vector2::new(VIEWPORT, VIEWPORT),
    )
    .expect("viewport negotiated");
    assert_eq!(viewport, Vector2::new(VIEWPORT, VIEWPORT));
    view
}

/// Moves the visible rect to start at `start` on both axes.
fn scroll_to_start(fixture: &Fixture, view: &Handle<View>, start: f64) {
    scroll_to(fixture, view, Rect::from_xywh(INF, INF, 0., 0.));
    let visible = scroll_to(fixture, view, Rect::from_xywh(start, start, 0., 0.));
    assert_eq!(visible.origin, Point2::new(start, start));
}

#[test]
fn viewport_negotiation_waits_for_native_resize() {
    let fixture = Fixture::new(slow_native());
    let view = scroll_view(&fixture);
    let core = view.scroll_core().expect("scrollable");

    let viewport = negotiate(
        &fixture,
        &view,
        SettlePolicy::default(),
        Vector2::new(VIEWPORT, VIEWPORT),
    )
    .expect("viewport negotiated");

    assert_eq!(viewport, Vector2::new(VIEWPORT, VIEWPORT));
    assert_eq!(core.viewport_size(), viewport);
    assert_eq!(view.size(), Vector2::new(VIEWPORT + 2., VIEWPORT + 2.));
    // first check at 0 ms, the resize lands at 250 ms, the check at 300 ms sees it
    assert_eq!(fixture.clock.now(), Duration::from_millis(300));

    let content = view.content_view().expect("content");
    assert_eq!(content.size(), Vector2::new(CONTENT, CONTENT));
}

#[test]
fn viewport_negotiation_fails_strictly_when_native_side_is_too_slow() {
    let fixture = Fixture::new(slow_native());
    let view = scroll_view(&fixture);
    let hasty = SettlePolicy {
        interval_ms: 100,
        timeout_ms: 200,
    };

    match negotiate(&fixture, &view, hasty, Vector2::new(VIEWPORT, VIEWPORT)) {
        Err(Error::ToleranceViolation { observed, expected, .. }) => {
            assert_eq!(observed, 0.);
            assert_eq!(expected, VIEWPORT);
        }
        other => panic!("expected a tolerance violation, got {:?}", other),
    }
}

#[test]
fn viewport_negotiation_needs_a_scroll_view() {
    let fixture = Fixture::new(slow_native());
    let button = View::create(CoreKind::Button, &fixture.provider).expect("button");
    let outcome = Outcome::<Result<Size>>::new();

    let started = ViewportNegotiation::new(SettlePolicy::default(), Tolerances::default()).start(
        button,
        Vector2::new(VIEWPORT, VIEWPORT),
        &fixture.dispatcher,
        outcome.setter(),
    );

    assert!(matches!(started, Err(Error::CapabilityNotImplemented { .. })));
    fixture.run();
    assert!(!outcome.is_set());
}

/// A scroll core whose viewport lands `offset` units away from the requested size.
struct OffsetScrollCore {
    view: WeakHandle<View>,
    offset: f64,
    viewport: Mutex<Size>,
}

impl Core for OffsetScrollCore {
    fn kind(&self) -> CoreKind {
        CoreKind::ScrollView
    }

    fn view(&self) -> Result<Handle<View>> {
        self.view.upgrade()
    }

    fn invalidate(&self, _reason: viewcore::InvalidateReason) {}

    fn calc_preferred_size(&self, _available_space: Size) -> Size {
        *self.viewport.lock()
    }

    fn pixel_grid(&self) -> PixelGrid {
        PixelGrid::default()
    }

    fn set_bounds(&self, bounds: Rect) -> Rect {
        bounds
    }

    fn into_scrollable(self: Arc<Self>) -> std::result::Result<Arc<dyn ScrollCore>, Arc<dyn Core>> {
        Ok(self)
    }
}

impl ScrollCore for OffsetScrollCore {
    fn visible_client_rect(&self) -> Rect {
        Rect::new(Point2::new(0., 0.), self.viewport_size())
    }

    fn scroll_client_rect_to_visible(&self, _target: Rect) {}

    fn viewport_size(&self) -> Size {
        *self.viewport.lock()
    }

    fn resize_for_viewport(&self, viewport_size: Size) -> Size {
        let landed = viewport_size + Vector2::new(self.offset, self.offset);
        *self.viewport.lock() = landed;
        if let Ok(view) = self.view.upgrade() {
            view.update_bounds_from_core(Rect::new(view.position(), landed + Vector2::new(2., 2.)));
        }
        viewport_size
    }
}

fn offset_scroll_view(fixture: &Fixture, offset: f64) -> Handle<View> {
    let mut provider = CoreRegistry::new("offset", fixture.dispatcher.clone());
    provider.register(CoreKind::ScrollView, move |view| {
        Handle::from(Arc::new(OffsetScrollCore {
            view: Handle::downgrade(view),
            offset,
            viewport: Mutex::new(Vector2::new(0., 0.)),
        }) as Arc<dyn Core>)
    });
    View::create(CoreKind::ScrollView, &provider).expect("scroll view")
}

#[test]
fn viewport_may_land_within_slack_of_request() {
    let fixture = Fixture::new(HeadlessConfig::default());
    let view = offset_scroll_view(&fixture, 3.);

    let viewport = negotiate(
        &fixture,
        &view,
        SettlePolicy::default(),
        Vector2::new(VIEWPORT, VIEWPORT),
    )
    .expect("within the viewport slack");
    assert_eq!(viewport, Vector2::new(VIEWPORT + 3., VIEWPORT + 3.));
}

#[test]
fn viewport_landing_outside_slack_fails() {
    let fixture = Fixture::new(HeadlessConfig::default());
    let view = offset_scroll_view(&fixture, 8.);
    let hasty = SettlePolicy {
        interval_ms: 100,
        timeout_ms: 300,
    };

    match negotiate(&fixture, &view, hasty, Vector2::new(VIEWPORT, VIEWPORT)) {
        Err(Error::ToleranceViolation {
            observed,
            expected,
            tolerance,
            ..
        }) => {
            assert_eq!(observed, VIEWPORT + 8.);
            assert_eq!(expected, VIEWPORT);
            assert_eq!(tolerance, Tolerances::default().viewport_slack);
        }
        other => panic!("expected a tolerance violation, got {:?}", other),
    }
    assert_eq!(fixture.clock.now(), Duration::from_millis(200), "failed on the last try");
}

#[test]
fn scrolling_is_asynchronous() {
    let fixture = Fixture::new(slow_native());
    let view = ready_view(&fixture);

    view.scroll_client_rect_to_visible(Rect::from_xywh(500., 500., 10., 10.))
        .expect("scrollable");
    assert_eq!(view.visible_client_rect().expect("scrollable").origin, Point2::new(0., 0.));

    fixture.clock.advance(Duration::from_millis(250));
    fixture.dispatcher.run_pending();
    assert_eq!(
        view.visible_client_rect().expect("scrollable"),
        Rect::from_xywh(210., 210., VIEWPORT, VIEWPORT)
    );
}

#[test]
fn scroll_into_view_cases() {
    let fixture = Fixture::new(slow_native());
    let view = ready_view(&fixture);

    let cases = [
        // already visible
        (10., 0., 10.),
        (10. + VIEWPORT, 0., 10.),
        // just outside
        (9., 0., 9.),
        (11. + VIEWPORT, 0., 11.),
        // edges
        (0., 0., 0.),
        (-INF, 0., 0.),
        (INF, 0., END),
        (CONTENT, 0., END),
        (CONTENT - 5., 5., END),
        (970., 0., 670.),
        // outside the content
        (-100., 5., 0.),
        (CONTENT + 1., 0., END),
        // larger than the viewport
        (5., 10. + VIEWPORT, 10.),
        (11., 2. + VIEWPORT, 11.),
        (5., 4. + VIEWPORT, 9.),
    ];

    for &(position, size, expected) in cases.iter() {
        scroll_to_start(&fixture, &view, 10.);
        let visible = scroll_to(&fixture, &view, Rect::from_xywh(position, position, size, size));
        assert_eq!(
            visible,
            Rect::from_xywh(expected, expected, VIEWPORT, VIEWPORT),
            "target {} size {}",
            position,
            size
        );
    }
}

#[test]
fn content_fills_non_scrolling_axis() {
    let fixture = Fixture::new(slow_native());
    let view = ready_view(&fixture);
    view.set_horizontal_scrolling_enabled(false);
    fixture.run();

    let content = view.content_view().expect("content");
    assert_eq!(content.size(), Vector2::new(VIEWPORT, CONTENT));

    let visible = scroll_to(&fixture, &view, Rect::from_xywh(INF, INF, 0., 0.));
    assert_eq!(visible.origin, Point2::new(0., END));
}
