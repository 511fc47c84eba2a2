//! # Trueno-Inspect
//!
//! In-process diagnostics engine: smoothed frame and process metrics, a
//! parser for indented view-hierarchy dumps, and an interactive explorer
//! state machine over the parsed tree.
//!
//! The engine draws nothing. A host feeds it dump text, frame deltas,
//! scheduler ticks and pointer events; a renderer reads the resulting state
//! and reports back the rectangles it drew.
//!
//! ## Quick Start
//!
//! ```rust
//! use trueno_inspect::prelude::*;
//!
//! let forest = DumpParser::new().parse("Grid\n  Size: 100x50\n  Label \"Hi\"");
//! assert_eq!(forest[0].children.len(), 2);
//!
//! let mut metrics = MetricsAggregator::new(&MetricsConfig::default());
//! metrics.start();
//! metrics.on_frame_time(16.0);
//! assert_eq!(metrics.snapshot().ema_frame_time_ms, 16.0);
//!
//! let mut explorer = Explorer::default();
//! explorer.show_tree(forest);
//! assert_eq!(explorer.mode(), Mode::Tree);
//! ```
//!
//! ## Feature Flags
//!
//! - `crossterm`: map crossterm mouse events into [`gesture::PointerEvent`]s
//!
//! ## Logging
//!
//! State transitions and sensor degradation are reported through
//! [`tracing`]. The library installs no subscriber.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
// Allow unwrap() in tests only - banned in production code
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Core Modules
// ============================================================================

/// Configuration loading and validation.
pub mod config;

/// Error types.
pub mod error;

/// Points, sizes and rectangles for hit-testing.
pub mod geometry;

/// Bounded history buffer.
pub mod ring_buffer;

// ============================================================================
// Engine Modules
// ============================================================================

/// Thread-safe correlation-id to load-time store.
pub mod store;

/// Dump parsing and tree nodes.
pub mod tree;

/// Frame and process metrics.
pub mod metrics;

/// Pointer stream to pan gesture normalisation.
pub mod gesture;

/// Explorer interaction state machine.
pub mod explorer;

pub use error::{InspectorError, Result};

// ============================================================================
// Prelude
// ============================================================================

/// Commonly used types and traits for convenient imports.
///
/// ```rust
/// use trueno_inspect::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{ExplorerConfig, InspectorConfig, MetricsConfig, StoreConfig};
    pub use crate::error::{InspectorError, Result};
    pub use crate::explorer::{Control, DumpSource, Explorer, ExplorerEffect, Mode, PanelLayout};
    pub use crate::geometry::{Point, Rect, Size};
    pub use crate::gesture::{GestureNormalizer, PanEvent, PointerEvent};
    pub use crate::metrics::{MetricSnapshot, MetricsAggregator, PowerSensor, ProcessSensors};
    pub use crate::store::{ChangeEvent, SampleStore, SlowLoadWarning, StoreSnapshot};
    pub use crate::tree::{DumpParser, NodeKind, TreeNode};
}
