//! Points, sizes and rectangles.
//!
//! All coordinates are continuous `f64` layout units. Infinities are valid: a size component of
//! `+∞` means "no constraint" in that dimension (see [`SizeExt::none`]).

use cgmath::{Point2, Vector2, Zero};

/// A position.
pub type Point = Point2<f64>;

/// A size; `x` is the width and `y` the height.
pub type Size = Vector2<f64>;

/// Size helpers that cgmath does not provide.
pub trait SizeExt: Sized {
    /// The "unconstrained" sentinel in both dimensions.
    fn none() -> Self;

    /// True if no component is smaller than the corresponding one in `other`.
    fn all_ge(&self, other: Self) -> bool;

    /// True if no component is larger than the corresponding one in `other`.
    fn all_le(&self, other: Self) -> bool;

    /// Raises each component to at least the corresponding one in `minimum`.
    fn at_least(self, minimum: Self) -> Self;

    /// Lowers each component to at most the corresponding one in `maximum`.
    fn at_most(self, maximum: Self) -> Self;
}

impl SizeExt for Size {
    fn none() -> Size {
        Vector2::new(f64::INFINITY, f64::INFINITY)
    }

    fn all_ge(&self, other: Size) -> bool {
        self.x >= other.x && self.y >= other.y
    }

    fn all_le(&self, other: Size) -> bool {
        self.x <= other.x && self.y <= other.y
    }

    fn at_least(self, minimum: Size) -> Size {
        Vector2::new(self.x.max(minimum.x), self.y.max(minimum.y))
    }

    fn at_most(self, maximum: Size) -> Size {
        Vector2::new(self.x.min(maximum.x), self.y.min(maximum.y))
    }
}

/// A rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Rectangle origin.
    pub origin: Point,

    /// Rectangle size.
    pub size: Size,
}

impl Rect {
    /// Creates a new rectangle.
    pub fn new(origin: Point, size: Size) -> Rect {
        Rect { origin, size }
    }

    /// Creates a new rectangle from its components.
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Rect {
        Rect {
            origin: Point2::new(x, y),
            size: Vector2::new(width, height),
        }
    }

    /// Returns a zero-sized rectangle at the origin.
    pub fn zero() -> Rect {
        Rect {
            origin: Point2::new(0., 0.),
            size: Vector2::zero(),
        }
    }

    /// Returns a new rectangle inset by the specified amount on every side.
    ///
    /// The size never becomes negative.
    pub fn inset(&self, horiz: f64, vert: f64) -> Rect {
        Rect {
            origin: (self.origin.x + horiz, self.origin.y + vert).into(),
            size: (
                (self.size.x - 2. * horiz).max(0.),
                (self.size.y - 2. * vert).max(0.),
            )
                .into(),
        }
    }

    /// Returns a new rectangle with the given size.
    pub fn with_size(&self, size: Size) -> Rect {
        Rect {
            origin: self.origin,
            size,
        }
    }
}
