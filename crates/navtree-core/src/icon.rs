//! Node icon resolution.
//!
//! Order of precedence:
//!
//! 1. the node's intrinsic icon (the bound object's own icon, or the editor
//!    icon of a terminal object slot);
//! 2. the first shape icon rule whose predicate holds for the value object;
//! 3. the shape's default icon;
//! 4. [`Icon::FOLDER`] or [`Icon::LEAF`], by whether the node has children.

use crate::error::Result;
use crate::logging::targets;
use crate::model::NavigatorModel;
use crate::node::{NodeId, NodeKind};
use crate::shape::Icon;
use crate::value::Value;

impl NavigatorModel {
    /// Effective icon of `node`.
    pub fn icon(&self, node: NodeId) -> Result<Icon> {
        let data = self.tree.get(node)?;

        let intrinsic = match &data.kind {
            NodeKind::Connection { handle: object, .. } | NodeKind::Item { object, .. } => {
                object.object_icon()
            }
            NodeKind::Object { shape } => shape.editor_association().map(|editor| editor.icon.clone()),
            NodeKind::Root | NodeKind::Folder { .. } => None,
        };
        if let Some(icon) = intrinsic {
            return Ok(icon);
        }

        if let Some(shape) = data.kind.shape() {
            if !shape.icon_rules().is_empty() {
                let value = self.value_object(node).map_or(Value::Null, Value::Object);
                if let Some(rule) = shape.icon_rules().iter().find(|rule| rule.matches(&value)) {
                    tracing::trace!(target: targets::ICON, ?node, icon = %rule.icon(), "icon rule matched");
                    return Ok(rule.icon().clone());
                }
            }
            if let Some(icon) = shape.default_icon() {
                return Ok(icon.clone());
            }
        }

        Ok(if self.has_children(node)? {
            Icon::folder()
        } else {
            Icon::leaf()
        })
    }
}
