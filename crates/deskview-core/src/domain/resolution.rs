//! Resolution state: the remote screen size and the local overlay size.
//!
//! The viewer shows the remote desktop in a video surface with a transparent
//! overlay canvas on top that captures pointer input.  Two independent pairs
//! of dimensions are tracked:
//!
//! - **screen** – the remote desktop resolution, reported by the server in
//!   reply to a `screensize` request.
//! - **canvas** – the rendered size of the local overlay, refreshed
//!   periodically from the video surface.
//!
//! No invariant links the two pairs; they are advisory data for mapping a
//! pointer position on the canvas to a pixel on the remote screen.
//!
//! ```text
//!   canvas (640 × 360)               screen (1920 × 1080)
//!   ┌──────────────┐                 ┌──────────────────────────┐
//!   │      • (320, 180)   ──────►    │            • (960, 540)  │
//!   └──────────────┘                 └──────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

/// A width/height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Creates a new pair.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `true` when either side is zero (nothing rendered / nothing reported).
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// The four resolution fields tracked for a viewer.
///
/// All fields start at zero.  Zero means "unknown yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResolutionState {
    /// Remote screen width reported by the server.
    pub screen_width: u32,
    /// Remote screen height reported by the server.
    pub screen_height: u32,
    /// Local overlay canvas width.
    pub canvas_width: u32,
    /// Local overlay canvas height.
    pub canvas_height: u32,
}

impl ResolutionState {
    /// Creates a state with every field at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the remote screen size.
    pub fn set_screen(&mut self, size: Dimensions) {
        self.screen_width = size.width;
        self.screen_height = size.height;
    }

    /// Records the local overlay canvas size.
    pub fn set_canvas(&mut self, size: Dimensions) {
        self.canvas_width = size.width;
        self.canvas_height = size.height;
    }

    /// The remote screen size as a [`Dimensions`] pair.
    pub fn screen(&self) -> Dimensions {
        Dimensions::new(self.screen_width, self.screen_height)
    }

    /// The overlay canvas size as a [`Dimensions`] pair.
    pub fn canvas(&self) -> Dimensions {
        Dimensions::new(self.canvas_width, self.canvas_height)
    }

    /// Maps a position on the overlay canvas to remote screen pixels.
    ///
    /// Scales each axis independently (the canvas mirrors the video element,
    /// which may letterbox) and rounds to the nearest pixel.  Positions
    /// outside the canvas are clamped to the screen edges.
    ///
    /// Returns `None` while either pair is still unknown (any field zero).
    ///
    /// # Example
    ///
    /// ```rust
    /// use deskview_core::{Dimensions, ResolutionState};
    ///
    /// let mut state = ResolutionState::new();
    /// state.set_screen(Dimensions::new(1920, 1080));
    /// state.set_canvas(Dimensions::new(640, 360));
    /// assert_eq!(state.canvas_to_screen(320.0, 180.0), Some((960, 540)));
    /// ```
    pub fn canvas_to_screen(&self, canvas_x: f64, canvas_y: f64) -> Option<(i32, i32)> {
        if self.screen().is_empty() || self.canvas().is_empty() {
            return None;
        }

        let scale_x = f64::from(self.screen_width) / f64::from(self.canvas_width);
        let scale_y = f64::from(self.screen_height) / f64::from(self.canvas_height);

        // Clamp to the last addressable pixel on each axis.
        let max_x = f64::from(self.screen_width - 1);
        let max_y = f64::from(self.screen_height - 1);

        let x = (canvas_x * scale_x).round().clamp(0.0, max_x);
        let y = (canvas_y * scale_y).round().clamp(0.0, max_y);

        Some((x as i32, y as i32))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn state(screen: (u32, u32), canvas: (u32, u32)) -> ResolutionState {
        let mut s = ResolutionState::new();
        s.set_screen(Dimensions::new(screen.0, screen.1));
        s.set_canvas(Dimensions::new(canvas.0, canvas.1));
        s
    }

    #[test]
    fn test_new_state_is_all_zero() {
        let s = ResolutionState::new();
        assert_eq!(s.screen(), Dimensions::new(0, 0));
        assert_eq!(s.canvas(), Dimensions::new(0, 0));
    }

    #[test]
    fn test_set_screen_does_not_touch_canvas() {
        // Arrange
        let mut s = ResolutionState::new();
        s.set_canvas(Dimensions::new(640, 480));

        // Act
        s.set_screen(Dimensions::new(1920, 1080));

        // Assert
        assert_eq!(s.screen_width, 1920);
        assert_eq!(s.screen_height, 1080);
        assert_eq!(s.canvas(), Dimensions::new(640, 480));
    }

    #[test]
    fn test_dimensions_is_empty_when_either_side_is_zero() {
        assert!(Dimensions::new(0, 10).is_empty());
        assert!(Dimensions::new(10, 0).is_empty());
        assert!(!Dimensions::new(1, 1).is_empty());
    }

    #[test]
    fn test_canvas_to_screen_scales_centre_point() {
        let s = state((1920, 1080), (640, 360));
        assert_eq!(s.canvas_to_screen(320.0, 180.0), Some((960, 540)));
    }

    #[test]
    fn test_canvas_to_screen_scales_axes_independently() {
        // Canvas is letterboxed: same width ratio, different height ratio.
        let s = state((1000, 1000), (500, 250));
        assert_eq!(s.canvas_to_screen(100.0, 100.0), Some((200, 400)));
    }

    #[test]
    fn test_canvas_to_screen_clamps_outside_positions() {
        let s = state((1920, 1080), (640, 360));
        assert_eq!(s.canvas_to_screen(-10.0, 5000.0), Some((0, 1079)));
    }

    #[test]
    fn test_canvas_to_screen_returns_none_without_screen_size() {
        let s = state((0, 0), (640, 360));
        assert_eq!(s.canvas_to_screen(1.0, 1.0), None);
    }

    #[test]
    fn test_canvas_to_screen_returns_none_without_canvas_size() {
        let s = state((1920, 1080), (0, 360));
        assert_eq!(s.canvas_to_screen(1.0, 1.0), None);
    }
}
