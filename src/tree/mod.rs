//! Hierarchy snapshot: dump parsing and the node forest it produces.

pub mod node;
pub mod parser;

pub use node::{
    node_at, node_at_mut, node_count, set_all_expanded, visible_line_count, visible_rows,
    NodeKind, NodePath, TreeNode, VisibleRow,
};
pub use parser::{indent_depth, parse_line, DumpParser, INDENT_UNIT};
