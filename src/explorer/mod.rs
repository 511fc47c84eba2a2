//! Interactive explorer over the parsed hierarchy and the metrics panel.
//!
//! The explorer owns no rendering. A renderer draws from
//! [`Explorer::forest`], [`Explorer::scroll_offset`] and
//! [`Explorer::floating_position`], then reports what it drew as a
//! [`PanelLayout`]; taps and pans are hit-tested against that layout.

pub mod debounce;
pub mod layout;
pub mod state;

pub use debounce::Debouncer;
pub use layout::{Control, Corner, PanelLayout};
pub use state::{DragKind, DragSession, Explorer, ExplorerEffect, Mode};

/// Supplies dump text when the user asks to see the tree.
pub trait DumpSource {
    /// Captures the current hierarchy as indented text.
    fn dump(&mut self) -> String;
}

impl<F> DumpSource for F
where
    F: FnMut() -> String,
{
    fn dump(&mut self) -> String {
        self()
    }
}
