//! Error types for the navigator tree.

use crate::node::NodeId;

/// Error raised by backend code (domain objects, property accessors, connection hooks).
pub type DomainError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias for navigator operations.
pub type Result<T> = std::result::Result<T, NavigatorError>;

/// Errors surfaced by [`NavigatorModel`](crate::NavigatorModel) operations.
///
/// Registry inconsistencies and property-extraction failures are *not* represented
/// here: they are logged and the triggering operation carries on.
#[derive(Debug, thiserror::Error)]
pub enum NavigatorError {
    /// The node handle is the null handle.
    #[error("Invalid node handle {0:?}")]
    InvalidNode(NodeId),

    /// The node has been disposed.
    #[error("Node {0:?} has been disposed")]
    Disposed(NodeId),

    /// An object filter mask could not be compiled.
    #[error("Invalid filter mask '{mask}': {source}")]
    InvalidFilterMask {
        mask: String,
        #[source]
        source: regex::Error,
    },

    /// The operation requires a container node.
    #[error("Node {0:?} cannot have children")]
    NotContainer(NodeId),

    /// The node's children have not been loaded yet.
    #[error("Children of node {0:?} are not loaded")]
    ChildrenNotLoaded(NodeId),

    /// The node's initialization hook failed (e.g. the connection could not be opened).
    #[error("Failed to initialize node {node:?}: {source}")]
    Initialization {
        node: NodeId,
        #[source]
        source: DomainError,
    },

    /// The node's shape descriptor does not allow the requested operation.
    #[error("Shape of node {node:?} does not allow this operation: {message}")]
    ShapeMismatch { node: NodeId, message: String },

    /// A connection node already exists for this connection handle.
    #[error("Connection '{0}' is already registered")]
    ConnectionExists(String),

    /// The model has been disposed.
    #[error("Navigator model has been disposed")]
    ModelDisposed,
}

impl NavigatorError {
    /// Create an initialization error.
    pub fn initialization(node: NodeId, source: DomainError) -> Self {
        Self::Initialization { node, source }
    }

    /// Create a shape mismatch error.
    pub fn shape_mismatch(node: NodeId, message: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            node,
            message: message.into(),
        }
    }
}

/// Errors from named-property extraction.
#[derive(Debug, thiserror::Error)]
pub enum PropertyError {
    /// No accessor is registered for the property on this object type.
    #[error("Property '{property}' not found on '{type_name}'")]
    NotFound {
        type_name: &'static str,
        property: String,
    },

    /// The property value has an unexpected shape.
    #[error("Property '{property}' has unexpected value: expected {expected}, got {got}")]
    TypeMismatch {
        property: String,
        expected: &'static str,
        got: &'static str,
    },

    /// The accessor itself failed.
    #[error("Can't read property '{property}': {source}")]
    Extraction {
        property: String,
        #[source]
        source: DomainError,
    },

    /// An icon predicate failed to evaluate.
    #[error("Predicate evaluation failed: {0}")]
    Predicate(String),
}

impl PropertyError {
    /// Create a not-found error.
    pub fn not_found(type_name: &'static str, property: impl Into<String>) -> Self {
        Self::NotFound {
            type_name,
            property: property.into(),
        }
    }

    /// Create a type mismatch error.
    pub fn type_mismatch(
        property: impl Into<String>,
        expected: &'static str,
        got: &'static str,
    ) -> Self {
        Self::TypeMismatch {
            property: property.into(),
            expected,
            got,
        }
    }

    /// Create an extraction error.
    pub fn extraction(property: impl Into<String>, source: DomainError) -> Self {
        Self::Extraction {
            property: property.into(),
            source,
        }
    }
}
