//! Screen → game-window coordinate transform.
//!
//! The tracker reports gaze in screen pixels (origin top-left, y down). The
//! smoother and downstream consumers work in the coordinate space produced
//! here:
//! - no viewport: screen pixels minus the window offset
//! - with a viewport: pixels relative to the viewport centre, y up
//!
//! Saccade thresholds are therefore in pixels for client-side smoothing.

use serde::Deserialize;

use crate::error::Result;
use crate::protocol::Sample;
use crate::smoother::RawPoint;

/// Height of the window title bar added to the vertical offset, pixels.
pub const DEFAULT_TITLE_BAR_HEIGHT: f32 = 17.0;

/// Outer rectangle of the game window on screen, pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindowRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Size of the rendered area inside the game window, pixels.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

/// Looks up where the game window currently is.
///
/// Discovering window geometry is platform specific and lives outside this
/// crate; plug it in as a closure.
pub trait WindowLocator: Send + 'static {
    fn window_rect(&self) -> Result<WindowRect>;
}

impl<F> WindowLocator for F
where
    F: Fn() -> Result<WindowRect> + Send + 'static,
{
    fn window_rect(&self) -> Result<WindowRect> {
        self()
    }
}

/// Maps tracker samples into game-window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenMapping {
    viewport: Option<Viewport>,
    offset: [f32; 2],
}

impl ScreenMapping {
    /// Pass screen pixels through unchanged.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Centre-origin, y-up coordinates inside `viewport`.
    pub fn centered(viewport: Viewport) -> Self {
        Self {
            viewport: Some(viewport),
            offset: [0.0, 0.0],
        }
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn offset(&self) -> [f32; 2] {
        self.offset
    }

    pub fn set_offset(&mut self, offset: [f32; 2]) {
        self.offset = offset;
    }

    /// Derive the viewport's screen offset from the outer window rectangle.
    ///
    /// The viewport is assumed to be centred in the window below a title bar.
    pub fn update_from_window(&mut self, rect: WindowRect, title_bar: f32) {
        let (width, height) = match self.viewport {
            Some(v) => (v.width, v.height),
            None => (rect.width, rect.height),
        };
        self.set_offset([
            rect.x + (rect.width - width) / 2.0,
            rect.y + (rect.height - height) / 2.0 + title_bar,
        ]);
    }

    /// Transform a sample into a [`RawPoint`] in game-window space.
    pub fn apply(&self, sample: &Sample) -> RawPoint {
        let [ox, oy] = self.offset;
        let (x, y) = match self.viewport {
            None => (sample.x - ox, sample.y - oy),
            Some(v) => (
                sample.x - v.width / 2.0 - ox,
                v.height / 2.0 - (sample.y - oy),
            ),
        };
        RawPoint::new(sample.ts, x, y)
    }
}
