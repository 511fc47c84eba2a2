//! Explorer interaction state machine.

use super::debounce::Debouncer;
use super::layout::{Control, Corner, PanelLayout};
use super::DumpSource;
use crate::config::ExplorerConfig;
use crate::geometry::{Point, Rect};
use crate::gesture::PanEvent;
use crate::store::SampleStore;
use crate::tree::{node_at_mut, visible_line_count, DumpParser, TreeNode};
use std::time::{Duration, Instant};

/// Which view the explorer shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Entry screen.
    #[default]
    Menu,
    /// Parsed hierarchy.
    Tree,
    /// Floating metrics panel.
    Metrics,
}

/// What a drag session moves, with the value it started from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragKind {
    /// Scrollbar thumb drag in tree mode.
    ScrollbarDrag {
        /// Scroll offset at press time.
        start_offset: f32,
    },
    /// Header drag of the floating panel in metrics mode.
    PanelMove {
        /// Panel position at press time.
        start_position: Point,
    },
}

/// An active drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    /// What is being dragged.
    pub kind: DragKind,
    /// Press point.
    pub start: Point,
}

/// Requests for the host, drained with [`Explorer::drain_effects`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorerEffect {
    /// The user asked to export the current tree.
    ExportRequested,
    /// The user closed the explorer.
    Closed,
}

/// Interaction state over the parsed tree and the metrics panel.
///
/// Driven from a single UI thread. The renderer reports geometry with
/// [`Explorer::set_layout`] after each draw and polls
/// [`Explorer::take_redraw`].
pub struct Explorer {
    line_height: f32,
    redraw_epsilon: f32,
    safe_inset: f32,
    tap_slop: f32,
    button_debounce: Debouncer,
    ribbon_debounce: Debouncer,

    mode: Mode,
    visible: bool,
    minimized: bool,
    corner: Corner,
    forest: Vec<TreeNode>,
    scroll_offset: f32,
    floating_position: Option<Point>,
    drag: Option<DragSession>,
    layout: PanelLayout,

    redraw: bool,
    effects: Vec<ExplorerEffect>,

    parser: DumpParser,
    source: Option<Box<dyn DumpSource>>,
    store: Option<SampleStore>,
}

impl std::fmt::Debug for Explorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Explorer")
            .field("mode", &self.mode)
            .field("visible", &self.visible)
            .field("minimized", &self.minimized)
            .field("scroll_offset", &self.scroll_offset)
            .field("floating_position", &self.floating_position)
            .field("drag", &self.drag)
            .field("roots", &self.forest.len())
            .finish_non_exhaustive()
    }
}

impl Default for Explorer {
    fn default() -> Self {
        Self::new(&ExplorerConfig::default())
    }
}

impl Explorer {
    /// Creates a hidden explorer in menu mode.
    #[must_use]
    pub fn new(config: &ExplorerConfig) -> Self {
        Self {
            line_height: config.line_height,
            redraw_epsilon: config.redraw_epsilon,
            safe_inset: config.safe_inset,
            tap_slop: config.tap_slop,
            button_debounce: Debouncer::new(Duration::from_millis(config.button_debounce_ms)),
            ribbon_debounce: Debouncer::new(Duration::from_millis(config.ribbon_debounce_ms)),
            mode: Mode::Menu,
            visible: false,
            minimized: false,
            corner: Corner::default(),
            forest: Vec::new(),
            scroll_offset: 0.0,
            floating_position: None,
            drag: None,
            layout: PanelLayout::default(),
            redraw: false,
            effects: Vec::new(),
            parser: DumpParser::new(),
            source: None,
            store: None,
        }
    }

    /// Sets where `ShowTree` pulls dump text from.
    pub fn attach_source(&mut self, source: impl DumpSource + 'static) {
        self.source = Some(Box::new(source));
    }

    /// Sets the store used to annotate parsed trees with load times.
    pub fn attach_store(&mut self, store: SampleStore) {
        self.store = Some(store);
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns true while the panel is shown.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Returns true while the panel is collapsed to its header.
    #[must_use]
    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    /// Tree scroll offset in pixels.
    #[must_use]
    pub fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    /// Floating panel position, once placed.
    #[must_use]
    pub fn floating_position(&self) -> Option<Point> {
        self.floating_position
    }

    /// Corner used by the next `Move`.
    #[must_use]
    pub fn corner(&self) -> Corner {
        self.corner
    }

    /// Active drag, if any.
    #[must_use]
    pub fn drag(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    /// The forest shown in tree mode.
    #[must_use]
    pub fn forest(&self) -> &[TreeNode] {
        &self.forest
    }

    /// Last reported layout.
    #[must_use]
    pub fn layout(&self) -> &PanelLayout {
        &self.layout
    }

    /// Largest scroll offset for the current forest and list height.
    #[must_use]
    pub fn max_scroll_offset(&self) -> f32 {
        let content = visible_line_count(&self.forest) as f32 * self.line_height;
        (content - self.layout.list.height).max(0.0)
    }

    /// Returns and clears the redraw request.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.redraw)
    }

    /// Returns and clears pending host effects, oldest first.
    pub fn drain_effects(&mut self) -> Vec<ExplorerEffect> {
        std::mem::take(&mut self.effects)
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Shows `forest` in tree mode with the scroll reset.
    pub fn show_tree(&mut self, forest: Vec<TreeNode>) {
        tracing::info!(roots = forest.len(), "explorer: tree");
        self.forest = forest;
        self.scroll_offset = 0.0;
        self.enter(Mode::Tree);
    }

    /// Shows the metrics panel, placing it in the current corner on first use.
    pub fn show_metrics(&mut self) {
        tracing::info!("explorer: metrics");
        self.enter(Mode::Metrics);
        self.place_floating_panel();
    }

    /// Returns to the menu. Leaving tree mode discards the forest.
    /// Returns false if already in the menu.
    pub fn back(&mut self) -> bool {
        match self.mode {
            Mode::Menu => return false,
            Mode::Tree => {
                self.forest.clear();
                self.scroll_offset = 0.0;
            }
            Mode::Metrics => {}
        }
        tracing::info!(from = ?self.mode, "explorer: back to menu");
        self.enter(Mode::Menu);
        true
    }

    /// Ribbon show/hide toggle at the current instant.
    pub fn toggle_visibility(&mut self) -> bool {
        self.toggle_visibility_at(Instant::now())
    }

    /// Ribbon show/hide toggle. Returns false if swallowed by the debounce.
    pub fn toggle_visibility_at(&mut self, now: Instant) -> bool {
        if !self.ribbon_debounce.accept(now) {
            tracing::debug!("ribbon toggle debounced");
            return false;
        }
        self.visible = !self.visible;
        if !self.visible {
            self.drag = None;
        }
        self.redraw = true;
        true
    }

    fn enter(&mut self, mode: Mode) {
        self.mode = mode;
        self.drag = None;
        self.redraw = true;
    }

    fn place_floating_panel(&mut self) {
        if self.floating_position.is_some() || !self.layout.has_viewport() {
            return;
        }
        self.floating_position = Some(self.corner_position());
    }

    fn corner_position(&self) -> Point {
        let position =
            self.corner.position(self.layout.viewport, self.layout.panel.size(), self.safe_inset);
        self.clamp_to_viewport(position)
    }

    fn clamp_to_viewport(&self, position: Point) -> Point {
        let max_x = (self.layout.viewport.width - self.layout.panel.width).max(0.0);
        let max_y = (self.layout.viewport.height - self.layout.panel.height).max(0.0);
        Point::new(position.x.clamp(0.0, max_x), position.y.clamp(0.0, max_y))
    }

    // ------------------------------------------------------------------
    // Layout and scrolling
    // ------------------------------------------------------------------

    /// Stores the geometry of the frame just drawn and re-clamps scroll and
    /// panel position against it.
    pub fn set_layout(&mut self, layout: PanelLayout) {
        self.layout = layout;
        self.apply_scroll(0.0);
        if self.mode == Mode::Metrics {
            self.place_floating_panel();
        }
        if let Some(position) = self.floating_position {
            if self.layout.has_viewport() {
                self.floating_position = Some(self.clamp_to_viewport(position));
            }
        }
    }

    /// Adds `delta_px` to the scroll offset, clamped to
    /// `[0, max_scroll_offset]`. Returns true if a redraw was requested.
    pub fn apply_scroll(&mut self, delta_px: f32) -> bool {
        if !delta_px.is_finite() {
            return false;
        }
        let next = (self.scroll_offset + delta_px).clamp(0.0, self.max_scroll_offset());
        let moved = (next - self.scroll_offset).abs() > self.redraw_epsilon;
        self.scroll_offset = next;
        if moved {
            self.redraw = true;
        }
        moved
    }

    fn page_height(&self) -> f32 {
        (self.layout.list.height - self.line_height).max(self.line_height)
    }

    // ------------------------------------------------------------------
    // Taps
    // ------------------------------------------------------------------

    /// Handles a tap at the current instant.
    pub fn handle_tap(&mut self, point: Point) -> bool {
        self.handle_tap_at(point, Instant::now())
    }

    /// Handles a tap. Returns false if the tap should pass through to the
    /// host application.
    pub fn handle_tap_at(&mut self, point: Point, now: Instant) -> bool {
        if !self.visible || !self.capture_area().contains(point) {
            return false;
        }

        if let Some(control) = self.layout.button_at(point) {
            if control.is_debounced() && !self.button_debounce.accept(now) {
                tracing::debug!(?control, "button tap debounced");
                return true;
            }
            self.run_control(control);
            return true;
        }

        if self.mode == Mode::Tree && !self.minimized {
            if let Some(path) = self.layout.row_at(point).cloned() {
                self.toggle_node(&path);
            }
        }
        true
    }

    /// Panel area that consumes taps: the header in metrics mode or while
    /// minimized, otherwise the whole panel.
    fn capture_area(&self) -> Rect {
        if self.mode == Mode::Metrics || self.minimized {
            self.layout.header
        } else {
            self.layout.panel
        }
    }

    fn toggle_node(&mut self, path: &[usize]) {
        let Some(node) = node_at_mut(&mut self.forest, path) else {
            return;
        };
        if node.is_property() || !node.toggle() {
            return;
        }
        tracing::trace!(?path, expanded = node.expanded, "node toggled");
        self.redraw = true;
        // Collapsing can shrink the content below the current offset.
        self.apply_scroll(0.0);
    }

    fn run_control(&mut self, control: Control) {
        tracing::debug!(?control, mode = ?self.mode, "control");
        match control {
            Control::Close => {
                self.back();
                self.visible = false;
                self.drag = None;
                // The next session's first tap must not be swallowed.
                self.button_debounce.reset();
                self.redraw = true;
                self.effects.push(ExplorerEffect::Closed);
            }
            Control::Back => {
                self.back();
            }
            Control::Export => self.effects.push(ExplorerEffect::ExportRequested),
            Control::ScrollUp if self.mode == Mode::Tree => {
                self.apply_scroll(-self.page_height());
            }
            Control::ScrollDown if self.mode == Mode::Tree => {
                self.apply_scroll(self.page_height());
            }
            Control::ScrollUp | Control::ScrollDown => {}
            Control::Minimize => {
                self.minimized = !self.minimized;
                self.drag = None;
                self.redraw = true;
            }
            Control::Move => {
                self.corner = self.corner.next();
                if self.layout.has_viewport() {
                    self.floating_position = Some(self.corner_position());
                }
                self.redraw = true;
            }
            Control::ShowTree => self.capture_tree(),
            Control::ShowMetrics => self.show_metrics(),
        }
    }

    fn capture_tree(&mut self) {
        let Some(source) = self.source.as_mut() else {
            tracing::warn!("show tree requested with no dump source attached");
            return;
        };
        let text = source.dump();
        let forest = match &self.store {
            Some(store) => self.parser.parse_annotated(&text, &store.snapshot()),
            None => self.parser.parse(&text),
        };
        self.show_tree(forest);
    }

    // ------------------------------------------------------------------
    // Drags
    // ------------------------------------------------------------------

    /// Handles a pan event at the current instant.
    pub fn handle_pan(&mut self, event: PanEvent) -> bool {
        self.handle_pan_at(event, Instant::now())
    }

    /// Handles a pan event. Returns true if it started, moved or ended a
    /// drag session, or completed within `tap_slop` as a captured tap.
    ///
    /// Hosts that route every pointer stream through a
    /// [`GestureNormalizer`](crate::gesture::GestureNormalizer) get taps
    /// from here and need not call [`Explorer::handle_tap`] as well.
    pub fn handle_pan_at(&mut self, event: PanEvent, now: Instant) -> bool {
        match event {
            PanEvent::Started(point) => self.begin_drag(point),
            PanEvent::Running { total, .. } => self.update_drag(total),
            PanEvent::Completed { total, .. } => {
                let dragged = self.update_drag(total);
                self.drag = None;
                let tapped = event
                    .as_tap(self.tap_slop)
                    .is_some_and(|point| self.handle_tap_at(point, now));
                dragged || tapped
            }
        }
    }

    fn begin_drag(&mut self, point: Point) -> bool {
        self.drag = None;
        if !self.visible || self.minimized {
            return false;
        }

        let kind = match self.mode {
            Mode::Tree if self.layout.scroll_thumb.is_some_and(|thumb| thumb.contains(point)) => {
                DragKind::ScrollbarDrag { start_offset: self.scroll_offset }
            }
            Mode::Metrics
                if self.layout.header.contains(point) && self.layout.button_at(point).is_none() =>
            {
                let start_position =
                    self.floating_position.unwrap_or_else(|| self.layout.panel.origin());
                DragKind::PanelMove { start_position }
            }
            _ => return false,
        };

        tracing::trace!(?kind, "drag started");
        self.drag = Some(DragSession { kind, start: point });
        true
    }

    fn update_drag(&mut self, total: Point) -> bool {
        let Some(session) = self.drag else {
            return false;
        };

        match (session.kind, self.mode) {
            (DragKind::ScrollbarDrag { start_offset }, Mode::Tree) => {
                let travel = self.layout.thumb_travel();
                let ratio = if travel > 0.0 { self.max_scroll_offset() / travel } else { 0.0 };
                let target = start_offset + total.y * ratio;
                self.apply_scroll(target - self.scroll_offset);
                true
            }
            (DragKind::PanelMove { start_position }, Mode::Metrics) => {
                let position = self.clamp_to_viewport(start_position + total);
                if self.floating_position != Some(position) {
                    self.floating_position = Some(position);
                    self.redraw = true;
                }
                true
            }
            _ => {
                self.drag = None;
                false
            }
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn explorer_with(lines: usize, list_height: f32) -> Explorer {
        let mut explorer = Explorer::default();
        explorer.show_tree((0..lines).map(|i| TreeNode::new(format!("n{i}"), "", 0)).collect());
        explorer.set_layout(PanelLayout {
            list: Rect::new(0.0, 0.0, 100.0, list_height),
            ..PanelLayout::default()
        });
        explorer
    }

    proptest! {
        #[test]
        fn prop_scroll_stays_in_bounds(
            lines in 0usize..200,
            list_height in 0.0f32..2000.0,
            deltas in prop::collection::vec(-5000.0f32..5000.0, 1..50)
        ) {
            let mut explorer = explorer_with(lines, list_height);
            let max = explorer.max_scroll_offset();
            for delta in deltas {
                explorer.apply_scroll(delta);
                prop_assert!(explorer.scroll_offset() >= 0.0);
                prop_assert!(explorer.scroll_offset() <= max);
            }
        }

        #[test]
        fn prop_zero_scroll_is_idempotent(
            lines in 0usize..200,
            delta in -5000.0f32..5000.0
        ) {
            let mut explorer = explorer_with(lines, 360.0);
            explorer.apply_scroll(delta);
            let settled = explorer.scroll_offset();
            for _ in 0..5 {
                prop_assert!(!explorer.apply_scroll(0.0));
                prop_assert_eq!(explorer.scroll_offset(), settled);
            }
        }
    }
}
