//! Scroll-into-view geometry.
//!
//! Both axes use the same one-dimensional rule, applied independently. The rule moves the visible
//! interval as little as possible to reveal a target interval, never scrolls outside the content,
//! and treats infinite target positions as "jump to the edge".

use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::geometry::{Point, Rect, Size};
use crate::handle::Handle;
use crate::layout::discretization_slack;
use crate::settle::{self, Attempt, Settle, SettlePolicy};
use crate::view::View;
use cgmath::Point2;

/// One of the two scroll axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub const BOTH: [Axis; 2] = [Axis::Horizontal, Axis::Vertical];

    /// The point's coordinate along this axis.
    pub fn of_point(self, point: Point) -> f64 {
        match self {
            Axis::Horizontal => point.x,
            Axis::Vertical => point.y,
        }
    }

    /// The size's extent along this axis.
    pub fn of_size(self, size: Size) -> f64 {
        match self {
            Axis::Horizontal => size.x,
            Axis::Vertical => size.y,
        }
    }
}

/// Computes the new start of the visible interval along one axis.
///
/// - `visible_start`, `visible_extent`: the current visible interval in content coordinates.
/// - `target_position`, `target_size`: the interval that should become visible; the size may
///   be zero. `-∞` scrolls to the start and `+∞` to the end, regardless of the size.
/// - `content_extent`: size of the scrollable content along this axis.
pub fn scroll_start(
    visible_start: f64,
    visible_extent: f64,
    target_position: f64,
    target_size: f64,
    content_extent: f64,
) -> f64 {
    let max_start = (content_extent - visible_extent).max(0.);

    if target_position == f64::NEG_INFINITY {
        return 0.;
    }
    if target_position == f64::INFINITY {
        return max_start;
    }

    let target_end = target_position + target_size;
    let visible_end = visible_start + visible_extent;

    if target_position >= visible_start && target_end <= visible_end {
        return visible_start;
    }
    if target_end >= content_extent {
        return max_start;
    }

    let start = if target_size > visible_extent {
        // can't show all of it; keep whatever part is already visible
        if target_position <= visible_start && target_end >= visible_end {
            visible_start
        } else if target_position > visible_start {
            target_position
        } else {
            target_end - visible_extent
        }
    } else if target_position < visible_start {
        target_position
    } else {
        target_end - visible_extent
    };

    start.max(0.).min(max_start)
}

/// Computes the new visible origin that reveals `target` inside content of size `content`.
pub fn scroll_rect_to_visible(visible: Rect, target: Rect, content: Size) -> Point {
    let start = |axis: Axis| {
        scroll_start(
            axis.of_point(visible.origin),
            axis.of_size(visible.size),
            axis.of_point(target.origin),
            axis.of_size(target.size),
            axis.of_size(content),
        )
    };

    Point2::new(start(Axis::Horizontal), start(Axis::Vertical))
}

/// Scrolls a view so that a rect of its content becomes visible, and waits until it has.
///
/// The expected visible origin is computed up front with [`scroll_rect_to_visible`]. The settle
/// then waits for the scroll core to report it, up to the content's pixel-grid slack; the visible
/// size must stay the same.
pub struct ScrollIntoView {
    pub policy: SettlePolicy,
}

impl ScrollIntoView {
    pub fn new(policy: SettlePolicy) -> ScrollIntoView {
        ScrollIntoView { policy }
    }

    /// Starts scrolling; `on_done` receives the visible rect once it matches.
    pub fn start<F>(
        &self,
        view: Handle<View>,
        target: Rect,
        dispatcher: &Dispatcher,
        on_done: F,
    ) -> Result<()>
    where
        F: FnOnce(Result<Rect>) + Send + 'static,
    {
        let scroll = view.scroll_core()?;
        let visible = scroll.visible_client_rect();

        let expected;
        let slack = match view.content_view() {
            Some(content) => {
                let origin = scroll_rect_to_visible(visible, target, content.size());
                expected = Rect::new(origin, visible.size);
                discretization_slack(&*content.core()?, expected)
            }
            None => {
                expected = visible;
                discretization_slack(&*scroll, expected)
            }
        };

        tracing::debug!(view = %view.id(), ?target, ?expected, "scrolling into view");
        scroll.scroll_client_rect_to_visible(target);

        let settled_scroll = scroll.clone();
        let condition = move |attempt: Attempt| -> Result<bool> {
            let observed = settled_scroll.visible_client_rect();
            Ok(settle::compare(attempt, "visible x", observed.origin.x, expected.origin.x, slack.x)?
                && settle::compare(attempt, "visible y", observed.origin.y, expected.origin.y, slack.y)?
                && settle::compare(attempt, "visible width", observed.size.x, expected.size.x, 0.)?
                && settle::compare(attempt, "visible height", observed.size.y, expected.size.y, 0.)?)
        };

        Settle::new("scroll into view", self.policy, condition, move |result| {
            on_done(result.map(|_| scroll.visible_client_rect()))
        })
        .start(dispatcher);

        Ok(())
    }
}
