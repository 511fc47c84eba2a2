//! Renderer-reported geometry and the controls it contains.

use crate::geometry::{Point, Rect, Size};
use crate::tree::NodePath;

/// A tappable control drawn by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    /// Hide the explorer and return to the menu.
    Close,
    /// Return to the menu.
    Back,
    /// Ask the host to export the current tree.
    Export,
    /// Scroll the tree up one page.
    ScrollUp,
    /// Scroll the tree down one page.
    ScrollDown,
    /// Collapse the panel to its header.
    Minimize,
    /// Move the floating panel to the next corner.
    Move,
    /// Capture a dump and show the tree.
    ShowTree,
    /// Show the metrics panel.
    ShowMetrics,
}

impl Control {
    /// Navigational controls share the button debounce window; scroll
    /// buttons repeat freely.
    #[must_use]
    pub fn is_debounced(self) -> bool {
        !matches!(self, Self::ScrollUp | Self::ScrollDown)
    }
}

/// Viewport corner the floating panel snaps to on `Move`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Corner {
    /// Top right.
    #[default]
    TopRight,
    /// Bottom right.
    BottomRight,
    /// Bottom left.
    BottomLeft,
    /// Top left.
    TopLeft,
}

impl Corner {
    /// Next corner, clockwise.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::TopRight => Self::BottomRight,
            Self::BottomRight => Self::BottomLeft,
            Self::BottomLeft => Self::TopLeft,
            Self::TopLeft => Self::TopRight,
        }
    }

    /// Top-left position of a `panel`-sized box in this corner, `inset`
    /// pixels from the edges.
    #[must_use]
    pub fn position(self, viewport: Size, panel: Size, inset: f32) -> Point {
        let left = inset;
        let top = inset;
        let right = viewport.width - panel.width - inset;
        let bottom = viewport.height - panel.height - inset;
        match self {
            Self::TopRight => Point::new(right, top),
            Self::BottomRight => Point::new(right, bottom),
            Self::BottomLeft => Point::new(left, bottom),
            Self::TopLeft => Point::new(left, top),
        }
    }
}

/// Geometry of the last drawn frame, reported by the renderer.
///
/// All rectangles share the viewport's coordinate space. Anything the
/// renderer did not draw is left empty.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PanelLayout {
    /// Drawable area.
    pub viewport: Size,
    /// Whole panel.
    pub panel: Rect,
    /// Title bar; the only tap-capturing area in metrics mode.
    pub header: Rect,
    /// Tree rows or metric lines.
    pub list: Rect,
    /// Tappable controls.
    pub buttons: Vec<(Control, Rect)>,
    /// Scrollbar track (tree mode).
    pub scroll_track: Option<Rect>,
    /// Scrollbar thumb (tree mode).
    pub scroll_thumb: Option<Rect>,
    /// One rectangle per visible tree row.
    pub node_rows: Vec<(NodePath, Rect)>,
}

impl PanelLayout {
    /// Control under `point`, if any.
    #[must_use]
    pub fn button_at(&self, point: Point) -> Option<Control> {
        self.buttons.iter().find(|(_, rect)| rect.contains(point)).map(|(control, _)| *control)
    }

    /// Tree row under `point`, if any.
    #[must_use]
    pub fn row_at(&self, point: Point) -> Option<&NodePath> {
        self.node_rows.iter().find(|(_, rect)| rect.contains(point)).map(|(path, _)| path)
    }

    /// Pixels the thumb can travel along the track.
    #[must_use]
    pub fn thumb_travel(&self) -> f32 {
        match (self.scroll_track, self.scroll_thumb) {
            (Some(track), Some(thumb)) => (track.height - thumb.height).max(0.0),
            _ => 0.0,
        }
    }

    /// Returns true once the renderer has reported a non-empty viewport.
    #[must_use]
    pub fn has_viewport(&self) -> bool {
        self.viewport.width > 0.0 && self.viewport.height > 0.0
    }
}
