//! Pixel alignment and size negotiation.
//!
//! Layout happens in continuous units, but native views live on a discrete device-pixel grid.
//! [`PixelGrid::adjust_bounds`] performs that discretization with independently chosen rounding
//! for position and size. Because the exact grid is platform-dependent, callers that verify
//! geometry compute both the rounded-down and the rounded-up alignment and accept anything in
//! between (see [`discretization_slack`]).

use crate::backend::{Core, InvalidateReason};
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::geometry::{Rect, Size};
use crate::handle::Handle;
use crate::settle::{self, Attempt, Settle, SettlePolicy};
use crate::view::View;
use cgmath::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// How a continuous value is mapped onto the pixel grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundType {
    Down,
    Up,
    Nearest,
}

impl RoundType {
    fn apply(self, value: f64) -> f64 {
        match self {
            RoundType::Down => value.floor(),
            RoundType::Up => value.ceil(),
            RoundType::Nearest => value.round(),
        }
    }
}

/// A device-pixel grid with `scale` pixels per layout unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelGrid {
    pub scale: f64,
}

impl PixelGrid {
    pub fn new(scale: f64) -> PixelGrid {
        PixelGrid { scale }
    }

    /// Aligns a single value. Infinite values are returned unchanged.
    pub fn align(&self, value: f64, round: RoundType) -> f64 {
        if !value.is_finite() || self.scale <= 0. {
            return value;
        }
        round.apply(value * self.scale) / self.scale
    }

    /// Aligns a size, as used for preferred sizes.
    pub fn align_size(&self, size: Size, round: RoundType) -> Size {
        Vector2::new(self.align(size.x, round), self.align(size.y, round))
    }

    /// Aligns the position of `bounds` with `position_round` and its size with `size_round`.
    pub fn adjust_bounds(&self, bounds: Rect, position_round: RoundType, size_round: RoundType) -> Rect {
        Rect::new(
            Point2::new(
                self.align(bounds.origin.x, position_round),
                self.align(bounds.origin.y, position_round),
            ),
            self.align_size(bounds.size, size_round),
        )
    }
}

impl Default for PixelGrid {
    fn default() -> Self {
        PixelGrid::new(1.)
    }
}

/// How far a position may drift from `rect` when it is aligned by `core`.
///
/// This is the distance between the rounded-up and the rounded-down alignment of the origin.
pub fn discretization_slack<C: Core + ?Sized>(core: &C, rect: Rect) -> Size {
    let down = core.adjust_bounds(rect, RoundType::Down, RoundType::Nearest);
    let up = core.adjust_bounds(rect, RoundType::Up, RoundType::Nearest);
    Vector2::new(
        (up.origin.x - down.origin.x).abs(),
        (up.origin.y - down.origin.y).abs(),
    )
}

/// Fixed tolerances for native chrome, independent of the pixel grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    /// Allowed deviation of a negotiated viewport from the requested size, per axis.
    #[serde(default = "default_viewport_slack")]
    pub viewport_slack: f64,

    /// How much larger than its viewport a scroll view may be, per axis.
    #[serde(default = "default_decoration_allowance")]
    pub decoration_allowance: f64,
}

fn default_viewport_slack() -> f64 {
    5.
}

fn default_decoration_allowance() -> f64 {
    50.
}

impl Default for Tolerances {
    fn default() -> Self {
        Tolerances {
            viewport_slack: default_viewport_slack(),
            decoration_allowance: default_decoration_allowance(),
        }
    }
}

/// Checks that `outer` lies in `[inner, inner + allowance]` on both axes.
pub fn require_enclosing(what: &'static str, outer: Size, inner: Size, allowance: f64) -> Result<()> {
    for (observed, low) in [(outer.x, inner.x), (outer.y, inner.y)] {
        if observed < low || observed > low + allowance {
            return Err(Error::ToleranceViolation {
                what,
                observed,
                expected: low + allowance / 2.,
                tolerance: allowance / 2.,
            });
        }
    }
    Ok(())
}

/// Gives a scroll view a particular viewport size and waits until the native side has applied it.
///
/// 1. The scroll core is asked to resize so its viewport gets the requested size. The size it
///    promises must be within [`Tolerances::viewport_slack`] of the request.
/// 2. The observed viewport is polled until it is within the same slack of the request.
/// 3. The view's outer size must then enclose the pixel-aligned viewport, with at most
///    [`Tolerances::decoration_allowance`] of chrome on each axis.
/// 4. Layout is requested again and the observed viewport size is reported.
///
/// Early polls are tolerant; the last one reports the specific violation.
pub struct ViewportNegotiation {
    pub policy: SettlePolicy,
    pub tolerances: Tolerances,
}

impl ViewportNegotiation {
    pub fn new(policy: SettlePolicy, tolerances: Tolerances) -> ViewportNegotiation {
        ViewportNegotiation { policy, tolerances }
    }

    /// Starts the negotiation; `on_done` receives the negotiated viewport size.
    ///
    /// Errors that can be detected right away (the view is not scrollable, the promised size is
    /// off) are returned directly and `on_done` is not called.
    pub fn start<F>(
        &self,
        view: Handle<View>,
        requested: Size,
        dispatcher: &Dispatcher,
        on_done: F,
    ) -> Result<()>
    where
        F: FnOnce(Result<Size>) + Send + 'static,
    {
        let scroll = view.scroll_core()?;
        let slack = self.tolerances.viewport_slack;
        let promised = scroll.resize_for_viewport(requested);
        settle::require_within_tolerance("promised viewport width", promised.x, requested.x, slack)?;
        settle::require_within_tolerance("promised viewport height", promised.y, requested.y, slack)?;

        tracing::debug!(?requested, ?promised, "negotiating viewport");

        let allowance = self.tolerances.decoration_allowance;
        let settled_view = view.clone();
        let settled_scroll = scroll.clone();
        let condition = move |attempt: Attempt| -> Result<bool> {
            let observed = settled_scroll.viewport_size();
            let viewport_settled =
                settle::compare(attempt, "viewport width", observed.x, requested.x, slack)?
                    && settle::compare(attempt, "viewport height", observed.y, requested.y, slack)?;
            if !viewport_settled {
                return Ok(false);
            }

            let aligned = settled_view.adjust_bounds(
                Rect::new(settled_view.position(), observed),
                RoundType::Nearest,
                RoundType::Nearest,
            )?;
            match require_enclosing("scroll view size", settled_view.size(), aligned.size, allowance) {
                Ok(()) => Ok(true),
                Err(err) if attempt.last_try => Err(err),
                Err(_) => Ok(false),
            }
        };

        Settle::new("viewport negotiation", self.policy, condition, move |result| {
            let result = result.map(|_| {
                view.invalidate(InvalidateReason::CustomDataChanged);
                scroll.viewport_size()
            });
            on_done(result)
        })
        .start(dispatcher);

        Ok(())
    }
}
