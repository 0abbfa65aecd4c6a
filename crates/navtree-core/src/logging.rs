//! Logging and debugging facilities for the navigator tree.
//!
//! This module provides:
//! - Target constants for filtering the crate's `tracing` output by subsystem
//! - [`NodeTreeDebug`], a text dump of the loaded part of a model's tree
//!
//! # Tracing Integration
//!
//! The crate only emits events; install a subscriber in the application to
//! see them:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("navtree_core::loader=debug,navtree_core::registry=warn")
//!     .init();
//! ```
//!
//! # Debug Visualization
//!
//! ```
//! use navtree_core::NavigatorModel;
//! use navtree_core::logging::{NodeTreeDebug, TreeFormatOptions};
//! use navtree_core::value::PropertyRegistry;
//!
//! let model = NavigatorModel::new(PropertyRegistry::new());
//! let dump = NodeTreeDebug::with_options(TreeFormatOptions::minimal()).format_all(&model);
//! assert!(dump.starts_with("Navigator Tree"));
//! ```

use std::fmt::Write as FmtWrite;

use crate::error::Result;
use crate::model::NavigatorModel;
use crate::node::NodeId;

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Crate-wide target.
    pub const CORE: &str = "navtree_core";
    /// Model lifecycle, node creation and disposal.
    pub const MODEL: &str = "navtree_core::model";
    /// Children loading.
    pub const LOADER: &str = "navtree_core::loader";
    /// Identity registry diagnostics.
    pub const REGISTRY: &str = "navtree_core::registry";
    /// Listener bookkeeping and event delivery.
    pub const EVENT: &str = "navtree_core::event";
    /// Icon resolution.
    pub const ICON: &str = "navtree_core::icon";
    /// Path naming and path lookups.
    pub const PATH: &str = "navtree_core::path";
    /// Signal emission.
    pub const SIGNAL: &str = "navtree_core::signal";
}

/// Style options for tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Compact single-line representation.
    Compact,
}

/// Configuration for tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Whether to show node ids.
    pub show_ids: bool,
    /// Whether to show node kinds.
    pub show_kinds: bool,
    /// Whether to show load state (unloaded, filtered, locked).
    pub show_state: bool,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_kinds: true,
            show_state: false,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Create options for detailed debugging output.
    pub fn detailed() -> Self {
        Self {
            show_state: true,
            ..Default::default()
        }
    }

    /// Create options for minimal output.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_kinds: false,
            show_state: false,
            ..Default::default()
        }
    }
}

/// Renders the already loaded part of a navigator tree.
///
/// Formatting never triggers a children load; unloaded containers are shown
/// without children (and marked when [`TreeFormatOptions::show_state`] is set).
#[derive(Debug, Clone, Default)]
pub struct NodeTreeDebug {
    options: TreeFormatOptions,
}

impl NodeTreeDebug {
    /// Create a new debug visualizer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a debug visualizer with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format the whole tree starting from the root.
    pub fn format_all(&self, model: &NavigatorModel) -> String {
        let mut output = String::new();
        writeln!(output, "Navigator Tree ({} nodes):", model.node_count()).expect("write to String");

        if model.connections().is_empty() {
            writeln!(output, "  (empty)").expect("write to String");
            return output;
        }
        if let Err(err) = self.format_subtree_into(model, model.root(), 0, true, &mut output) {
            writeln!(output, "  (error: {err})").expect("write to String");
        }
        output
    }

    /// Format a subtree starting from a specific node.
    pub fn format_subtree(&self, model: &NavigatorModel, root: NodeId) -> Result<String> {
        let mut output = String::new();
        self.format_subtree_into(model, root, 0, true, &mut output)?;
        Ok(output)
    }

    fn format_subtree_into(
        &self,
        model: &NavigatorModel,
        id: NodeId,
        depth: usize,
        is_last: bool,
        output: &mut String,
    ) -> Result<()> {
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return Ok(());
        }

        let node = model.node(id)?;
        output.push_str(&self.build_prefix(depth, is_last));
        output.push_str(&node.name());

        if self.options.show_ids {
            write!(output, " [{id:?}]").expect("write to String");
        }

        if self.options.show_kinds {
            write!(output, " ({})", node.kind().kind_name()).expect("write to String");
        }

        if self.options.show_state {
            if node.kind().is_container() && node.children().is_none() {
                output.push_str(" <unloaded>");
            }
            if node.is_filtered() {
                output.push_str(" <filtered>");
            }
            if node.is_locked() {
                output.push_str(" <locked>");
            }
        }

        output.push('\n');

        let children = node.children().map(<[NodeId]>::to_vec).unwrap_or_default();
        let child_count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            self.format_subtree_into(model, child, depth + 1, i + 1 == child_count, output)?;
        }

        Ok(())
    }

    /// Build the prefix string for a tree node.
    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, corner, last) = match self.options.style {
            TreeStyle::Ascii => ("|", "+--", "`--"),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500}", "\u{2514}\u{2500}\u{2500}"),
            TreeStyle::Compact => ("", "-", "-"),
        };

        let mut prefix = String::new();
        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            for _ in 0..self.options.indent_size {
                prefix.push(' ');
            }
        }
        prefix.push_str(if is_last { last } else { corner });
        prefix.push(' ');
        prefix
    }
}
