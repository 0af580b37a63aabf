//! View transforms for the artifact viewer: zoom, rotation, pan.
//!
//! [`ViewerState`] is a small `Copy` value. Every operation takes the state
//! by value and returns the next one, so the transform math can be tested
//! without a rendering surface and a presentation layer can keep history
//! trivially.
//!
//! ## Invariants
//!
//! - `zoom` stays within [`MIN_ZOOM`, `MAX_ZOOM`].
//! - `rotation` is always a quarter turn (see [`Rotation`]).
//! - `pan` is `(0, 0)` whenever `zoom <= 1.0`; there is nothing to pan
//!   when the image fits the view.
//! - `drag_anchor` is only set while a pointer drag is in progress.
//!
//! [`Viewer`] ties a state to the artifact being shown. Switching artifacts
//! always starts from a fresh state.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 5.0;
/// Multiplier applied by one zoom step.
pub const ZOOM_STEP: f64 = 1.2;

/// A 2D point or offset in view coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

/// Clockwise rotation in quarter turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// The next quarter turn clockwise, wrapping 270 → 0.
    pub fn next(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg180,
            Rotation::Deg180 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg0,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }
}

/// How one artifact is being viewed.
///
/// Fields are only reachable through the transforms below, and a
/// deserialized state is checked against the same invariants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawViewerState")]
pub struct ViewerState {
    zoom: f64,
    rotation: Rotation,
    pan: Point,
    drag_anchor: Option<Point>,
}

#[derive(Deserialize)]
struct RawViewerState {
    zoom: f64,
    rotation: Rotation,
    pan: Point,
    drag_anchor: Option<Point>,
}

impl TryFrom<RawViewerState> for ViewerState {
    type Error = String;

    fn try_from(raw: RawViewerState) -> Result<Self, Self::Error> {
        if !(MIN_ZOOM..=MAX_ZOOM).contains(&raw.zoom) {
            return Err(format!(
                "zoom {} outside {MIN_ZOOM}..={MAX_ZOOM}",
                raw.zoom
            ));
        }
        if raw.zoom <= 1.0 && (raw.pan != Point::ORIGIN || raw.drag_anchor.is_some()) {
            return Err(format!("cannot pan at zoom {}", raw.zoom));
        }
        Ok(Self {
            zoom: raw.zoom,
            rotation: raw.rotation,
            pan: raw.pan,
            drag_anchor: raw.drag_anchor,
        })
    }
}

impl Default for ViewerState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            rotation: Rotation::Deg0,
            pan: Point::ORIGIN,
            drag_anchor: None,
        }
    }
}

impl ViewerState {
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn pan(&self) -> Point {
        self.pan
    }

    /// Pointer offset from the pan origin while a drag is active.
    pub fn drag_anchor(&self) -> Option<Point> {
        self.drag_anchor
    }

    pub fn zoom_in(self) -> Self {
        self.with_zoom(self.zoom * ZOOM_STEP)
    }

    pub fn zoom_out(self) -> Self {
        self.with_zoom(self.zoom / ZOOM_STEP)
    }

    /// Set zoom to `zoom`, clamped, re-centering when the image fits the view.
    pub fn with_zoom(self, zoom: f64) -> Self {
        let zoom = if zoom.is_nan() {
            self.zoom
        } else {
            zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        };
        if zoom <= 1.0 {
            Self {
                zoom,
                pan: Point::ORIGIN,
                drag_anchor: None,
                ..self
            }
        } else {
            Self { zoom, ..self }
        }
    }

    pub fn rotate(self) -> Self {
        Self {
            rotation: self.rotation.next(),
            ..self
        }
    }

    pub fn reset(self) -> Self {
        Self::default()
    }

    /// Start a pointer drag at `pointer`.
    ///
    /// Ignored unless zoomed past fit-to-view.
    pub fn begin_drag(self, pointer: Point) -> Self {
        if !self.can_pan() {
            return self;
        }
        Self {
            drag_anchor: Some(pointer - self.pan),
            ..self
        }
    }

    /// Move the image with the pointer while a drag is active.
    pub fn continue_drag(self, pointer: Point) -> Self {
        match self.drag_anchor {
            Some(anchor) => Self {
                pan: pointer - anchor,
                ..self
            },
            None => self,
        }
    }

    pub fn end_drag(self) -> Self {
        Self {
            drag_anchor: None,
            ..self
        }
    }

    pub fn can_pan(&self) -> bool {
        self.zoom > 1.0
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_anchor.is_some()
    }
}

/// Index of the next artifact, stopping at the last one.
pub fn next_index(index: usize, total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    (index + 1).min(total - 1)
}

/// Index of the previous artifact, stopping at the first one.
pub fn previous_index(index: usize, total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    index.saturating_sub(1).min(total - 1)
}

/// The viewer for one artifact list: which artifact is shown and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawViewer")]
pub struct Viewer {
    index: usize,
    total: usize,
    state: ViewerState,
}

#[derive(Deserialize)]
struct RawViewer {
    index: usize,
    total: usize,
    state: ViewerState,
}

impl TryFrom<RawViewer> for Viewer {
    type Error = String;

    fn try_from(raw: RawViewer) -> Result<Self, Self::Error> {
        if raw.index > raw.total.saturating_sub(1) {
            return Err(format!(
                "viewer index {} out of range (have {})",
                raw.index, raw.total
            ));
        }
        Ok(Self {
            index: raw.index,
            total: raw.total,
            state: raw.state,
        })
    }
}

impl Viewer {
    /// Open the viewer on `index` within a list of `total` artifacts.
    pub fn open(index: usize, total: usize) -> Self {
        Self {
            index: index.min(total.saturating_sub(1)),
            total,
            state: ViewerState::default(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn state(&self) -> ViewerState {
        self.state
    }

    /// Apply a transform to the current view.
    ///
    /// The result is re-clamped, so zoom stays in range and a view that
    /// fits the screen is never panned.
    pub fn apply(&mut self, transform: impl FnOnce(ViewerState) -> ViewerState) {
        let next = transform(self.state);
        self.state = next.with_zoom(next.zoom);
    }

    pub fn next(&mut self) {
        self.select(next_index(self.index, self.total));
    }

    pub fn previous(&mut self) {
        self.select(previous_index(self.index, self.total));
    }

    /// Show artifact `index` (clamped) with a fresh view.
    ///
    /// The view is reset even when `index` is the current artifact.
    pub fn select(&mut self, index: usize) {
        self.index = index.min(self.total.saturating_sub(1));
        self.state = self.state.reset();
    }

    /// Close the viewer, discarding the transient view state.
    pub fn close(&mut self) {
        self.state = self.state.reset();
    }
}
