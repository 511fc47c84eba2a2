//! Tree nodes and expand-aware traversal.
//!
//! Traversals use an explicit stack; dumps come from live hierarchies with no
//! depth limit.

/// How a dump line was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeKind {
    /// A view/object in the hierarchy.
    #[default]
    Element,
    /// A property annotation of the enclosing element (size, position, ...).
    Property,
}

/// One node of a parsed dump forest.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TreeNode {
    /// Correlation id taken from a `#Uid:<token>#` marker.
    pub id: Option<String>,
    /// Display name.
    pub name: String,
    /// Free-form details shown next to the name.
    pub details: String,
    /// Element or property line.
    pub kind: NodeKind,
    /// Load time recorded for `id` when the dump was annotated.
    pub load_time_ms: Option<f64>,
    /// Children in dump order.
    pub children: Vec<TreeNode>,
    /// Indentation depth computed at parse time.
    pub depth: usize,
    /// Whether children are shown.
    pub expanded: bool,
}

impl TreeNode {
    /// Creates a collapsed leaf element.
    #[must_use]
    pub fn new(name: impl Into<String>, details: impl Into<String>, depth: usize) -> Self {
        Self {
            id: None,
            name: name.into(),
            details: details.into(),
            kind: NodeKind::Element,
            load_time_ms: None,
            children: Vec::new(),
            depth,
            expanded: false,
        }
    }

    /// Builder-style correlation id setter.
    #[must_use]
    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }

    /// Builder-style kind setter.
    #[must_use]
    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Builder-style expansion setter.
    #[must_use]
    pub fn with_expanded(mut self, expanded: bool) -> Self {
        self.expanded = expanded;
        self
    }

    /// Builder-style child append.
    #[must_use]
    pub fn with_child(mut self, child: TreeNode) -> Self {
        self.children.push(child);
        self
    }

    /// Returns true if this node has children.
    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Returns true if this is a property line.
    #[must_use]
    pub fn is_property(&self) -> bool {
        self.kind == NodeKind::Property
    }

    /// Flips `expanded` if the node has children. Returns true if it changed.
    pub fn toggle(&mut self) -> bool {
        if !self.has_children() {
            return false;
        }
        self.expanded = !self.expanded;
        true
    }
}

// Dropping a deep chain through the derived glue recurses once per level.
impl Drop for TreeNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Index path from the root list down to a node.
pub type NodePath = Vec<usize>;

/// Resolves a path to a node.
#[must_use]
pub fn node_at<'a>(forest: &'a [TreeNode], path: &[usize]) -> Option<&'a TreeNode> {
    let (first, rest) = path.split_first()?;
    let mut node = forest.get(*first)?;
    for index in rest {
        node = node.children.get(*index)?;
    }
    Some(node)
}

/// Resolves a path to a mutable node.
pub fn node_at_mut<'a>(forest: &'a mut [TreeNode], path: &[usize]) -> Option<&'a mut TreeNode> {
    let (first, rest) = path.split_first()?;
    let mut node = forest.get_mut(*first)?;
    for index in rest {
        node = node.children.get_mut(*index)?;
    }
    Some(node)
}

/// Number of rows shown: every root, plus the children of each expanded
/// node whose own row is shown.
#[must_use]
pub fn visible_line_count(forest: &[TreeNode]) -> usize {
    let mut count = 0;
    let mut stack: Vec<&TreeNode> = forest.iter().collect();
    while let Some(node) = stack.pop() {
        count += 1;
        if node.expanded {
            stack.extend(node.children.iter());
        }
    }
    count
}

/// Total number of nodes regardless of expansion.
#[must_use]
pub fn node_count(forest: &[TreeNode]) -> usize {
    let mut count = 0;
    let mut stack: Vec<&TreeNode> = forest.iter().collect();
    while let Some(node) = stack.pop() {
        count += 1;
        stack.extend(node.children.iter());
    }
    count
}

/// A row the renderer should draw.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleRow<'a> {
    /// Path used to report the row's rectangle back to the explorer.
    pub path: NodePath,
    /// The node shown on this row.
    pub node: &'a TreeNode,
}

/// Rows in display (pre-)order, honoring `expanded`.
#[must_use]
pub fn visible_rows(forest: &[TreeNode]) -> Vec<VisibleRow<'_>> {
    let mut rows = Vec::new();
    let mut stack: Vec<(NodePath, &TreeNode)> =
        forest.iter().enumerate().rev().map(|(i, node)| (vec![i], node)).collect();

    while let Some((path, node)) = stack.pop() {
        if node.expanded {
            for (i, child) in node.children.iter().enumerate().rev() {
                let mut child_path = path.clone();
                child_path.push(i);
                stack.push((child_path, child));
            }
        }
        rows.push(VisibleRow { path, node });
    }
    rows
}

/// Sets `expanded` on every node that has children.
pub fn set_all_expanded(forest: &mut [TreeNode], expanded: bool) {
    let mut stack: Vec<&mut TreeNode> = forest.iter_mut().collect();
    while let Some(node) = stack.pop() {
        if node.has_children() {
            node.expanded = expanded;
        }
        stack.extend(node.children.iter_mut());
    }
}
