//! Declarative shape descriptors.
//!
//! A [`Shape`] tells the loader which child slots a node of a given kind has.
//! Shapes are immutable and shared (`Arc<Shape>`); the node tree holds references
//! into them and compares them by identity.
//!
//! ```
//! use navtree_core::shape::{Icon, Shape};
//!
//! let database = Shape::container("postgres")
//!     .child(
//!         Shape::folder("Schemas").type_tag("schemas").child(
//!             Shape::item("Schema", "schemas")
//!                 .icon(Icon::new("schema"))
//!                 .child(Shape::folder("Tables").child(Shape::item("Table", "tables"))),
//!         ),
//!     )
//!     .into_shared();
//!
//! assert!(database.has_children());
//! assert_eq!(database.children()[0].label(), "Schemas");
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::PropertyError;
use crate::value::Value;

/// Icon identifier, resolved to an image by the UI layer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Icon(String);

impl Icon {
    /// Stock icon for nodes that can have children.
    pub const FOLDER: &'static str = "tree-folder";
    /// Stock icon for nodes without children.
    pub const LEAF: &'static str = "tree-leaf";

    /// Create an icon from its name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The stock folder icon.
    pub fn folder() -> Self {
        Self::new(Self::FOLDER)
    }

    /// The stock leaf icon.
    pub fn leaf() -> Self {
        Self::new(Self::LEAF)
    }

    /// Icon name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An external editor bound to a terminal object slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditorAssociation {
    /// Editor identifier.
    pub id: String,
    /// Icon shown for nodes opened with this editor.
    pub icon: Icon,
}

impl EditorAssociation {
    pub fn new(id: impl Into<String>, icon: Icon) -> Self {
        Self { id: id.into(), icon }
    }
}

/// What a slot produces when its parent is expanded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlotKind {
    /// Top-level shape of a connection; never appears as a child slot.
    Container,
    /// One grouping node.
    Folder {
        /// Stable tag used in node paths (falls back to the label).
        type_tag: Option<String>,
    },
    /// One item node per element of a collection-valued property.
    Item {
        property: String,
        /// When the collection is empty, inline this slot's own child slots instead.
        optional: bool,
    },
    /// One synthetic leaf not backed by a discovered domain object.
    Object { editor: Option<EditorAssociation> },
}

/// Compiled icon predicate over a node's value object.
pub type IconPredicate = Arc<dyn Fn(&Value) -> Result<bool, PropertyError> + Send + Sync>;

/// An icon chosen when its predicate holds.
#[derive(Clone)]
pub struct IconRule {
    predicate: IconPredicate,
    icon: Icon,
}

impl IconRule {
    pub fn new<F>(icon: Icon, predicate: F) -> Self
    where
        F: Fn(&Value) -> Result<bool, PropertyError> + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
            icon,
        }
    }

    /// Evaluate the predicate. Evaluation errors count as `false`.
    pub fn matches(&self, value: &Value) -> bool {
        match (self.predicate)(value) {
            Ok(matched) => matched,
            Err(err) => {
                tracing::debug!(
                    target: crate::logging::targets::ICON,
                    icon = %self.icon,
                    error = %err,
                    "icon rule evaluation failed"
                );
                false
            }
        }
    }

    pub fn icon(&self) -> &Icon {
        &self.icon
    }
}

impl fmt::Debug for IconRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IconRule").field("icon", &self.icon).finish_non_exhaustive()
    }
}

/// A shape descriptor node.
#[derive(Clone, Debug)]
pub struct Shape {
    kind: SlotKind,
    label: String,
    description: Option<String>,
    children: Vec<Arc<Shape>>,
    icon_rules: Vec<IconRule>,
    default_icon: Option<Icon>,
}

impl Shape {
    fn with_kind(kind: SlotKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            description: None,
            children: Vec::new(),
            icon_rules: Vec::new(),
            default_icon: None,
        }
    }

    /// Top-level shape bound to a connection.
    pub fn container(label: impl Into<String>) -> Self {
        Self::with_kind(SlotKind::Container, label)
    }

    /// Folder slot.
    pub fn folder(label: impl Into<String>) -> Self {
        Self::with_kind(SlotKind::Folder { type_tag: None }, label)
    }

    /// Item slot enumerating collection property `property`.
    pub fn item(label: impl Into<String>, property: impl Into<String>) -> Self {
        Self::with_kind(
            SlotKind::Item {
                property: property.into(),
                optional: false,
            },
            label,
        )
    }

    /// Terminal object slot.
    pub fn object(label: impl Into<String>) -> Self {
        Self::with_kind(SlotKind::Object { editor: None }, label)
    }

    /// Mark an item slot optional. No effect on other slot kinds.
    pub fn optional(mut self) -> Self {
        if let SlotKind::Item { optional, .. } = &mut self.kind {
            *optional = true;
        }
        self
    }

    /// Set the path tag of a folder slot. No effect on other slot kinds.
    pub fn type_tag(mut self, tag: impl Into<String>) -> Self {
        if let SlotKind::Folder { type_tag } = &mut self.kind {
            *type_tag = Some(tag.into());
        }
        self
    }

    /// Bind a terminal object slot to an editor. No effect on other slot kinds.
    pub fn editor(mut self, editor: EditorAssociation) -> Self {
        if let SlotKind::Object { editor: slot_editor } = &mut self.kind {
            *slot_editor = Some(editor);
        }
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a child slot.
    pub fn child(self, child: Shape) -> Self {
        self.child_shared(Arc::new(child))
    }

    /// Append an already shared child slot.
    pub fn child_shared(mut self, child: Arc<Shape>) -> Self {
        self.children.push(child);
        self
    }

    /// Default icon when no rule matches.
    pub fn icon(mut self, icon: Icon) -> Self {
        self.default_icon = Some(icon);
        self
    }

    /// Append a conditional icon rule. Rules are evaluated in order.
    pub fn icon_rule<F>(mut self, icon: Icon, predicate: F) -> Self
    where
        F: Fn(&Value) -> Result<bool, PropertyError> + Send + Sync + 'static,
    {
        self.icon_rules.push(IconRule::new(icon, predicate));
        self
    }

    /// Finish building.
    pub fn into_shared(self) -> Arc<Shape> {
        Arc::new(self)
    }

    pub fn kind(&self) -> &SlotKind {
        &self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Ordered child slots.
    pub fn children(&self) -> &[Arc<Shape>] {
        &self.children
    }

    /// Whether nodes of this shape have any children at all.
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn icon_rules(&self) -> &[IconRule] {
        &self.icon_rules
    }

    pub fn default_icon(&self) -> Option<&Icon> {
        self.default_icon.as_ref()
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, SlotKind::Folder { .. })
    }

    pub fn is_item(&self) -> bool {
        matches!(self.kind, SlotKind::Item { .. })
    }

    /// Property name of an item slot.
    pub fn item_property(&self) -> Option<&str> {
        match &self.kind {
            SlotKind::Item { property, .. } => Some(property),
            _ => None,
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self.kind, SlotKind::Item { optional: true, .. })
    }

    /// Path tag of a folder slot: the explicit tag or the label.
    pub fn path_tag(&self) -> &str {
        match &self.kind {
            SlotKind::Folder {
                type_tag: Some(tag),
            } => tag,
            _ => &self.label,
        }
    }

    pub fn editor_association(&self) -> Option<&EditorAssociation> {
        match &self.kind {
            SlotKind::Object { editor } => editor.as_ref(),
            _ => None,
        }
    }

    /// The single item slot, when this shape has exactly one child slot and it is an item slot.
    pub fn single_item_slot(&self) -> Option<&Arc<Shape>> {
        match self.children.as_slice() {
            [only] if only.is_item() => Some(only),
            _ => None,
        }
    }
}
