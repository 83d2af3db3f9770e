//! Breadth-first UI-tree search for accessibility-driven interaction
//!
//! BFS is deliberate: UI hierarchies are shallow and wide, and visiting
//! level by level means the shallowest (usually most prominent) match wins
//! when scores tie. Node handles are owned boxes; every handle that is not
//! the retained best match is dropped as the traversal moves on, and the
//! best match itself is dropped when the operation returns.

use std::collections::VecDeque;

use tracing::debug;

use super::ActionResult;
use crate::nlu::fuzzy::{self, NODE_THRESHOLD};

/// Read cap for [`screen_text`], in characters
const SCREEN_TEXT_CAP: usize = 2000;

/// One node of a UI accessibility tree.
///
/// Handles are exclusively owned; dropping a box releases the underlying
/// platform node. Implementations must not require release calls beyond
/// `Drop`.
pub trait UiNode: Send {
    /// Primary visible text, if any
    fn text(&self) -> Option<String>;

    /// Secondary description (content description / tooltip), if any
    fn description(&self) -> Option<String>;

    fn is_clickable(&self) -> bool;

    fn child_count(&self) -> usize;

    fn child(&self, index: usize) -> Option<Box<dyn UiNode>>;

    /// Activate the node; true if the platform accepted the action
    fn click(&self) -> bool;

    /// Replace the node's text content; true if accepted
    fn set_text(&self, text: &str) -> bool;
}

/// The currently active UI window, as exposed by the platform
pub trait UiTree: Send + Sync {
    /// Root of the active window, if there is one
    fn active_root(&self) -> Option<Box<dyn UiNode>>;

    /// Node currently holding input focus, if any
    fn focused_input(&self) -> Option<Box<dyn UiNode>>;
}

/// Find the best fuzzy match for `description` among clickable nodes and
/// activate it.
pub fn find_and_activate(tree: &dyn UiTree, description: &str) -> ActionResult {
    let Some(root) = tree.active_root() else {
        return ActionResult::Failed {
            reason: "No active window".to_string(),
        };
    };

    let best = find_best_node(root, description);

    match best {
        Some((node, score)) => {
            debug!(score, "activating matched node");
            if node.click() {
                ActionResult::Success
            } else {
                ActionResult::Failed {
                    reason: "Element found but activation failed".to_string(),
                }
            }
        }
        None => ActionResult::Failed {
            reason: format!("No matching UI element found for: {description}"),
        },
    }
}

/// Type literal text into whichever node currently holds input focus
pub fn type_into_focused(tree: &dyn UiTree, text: &str) -> ActionResult {
    let Some(node) = tree.focused_input() else {
        return ActionResult::Failed {
            reason: "No focused input field".to_string(),
        };
    };

    if node.set_text(text) {
        ActionResult::Success
    } else {
        ActionResult::Failed {
            reason: "Failed to type text".to_string(),
        }
    }
}

/// Concatenate all non-blank node text in BFS order, capped for downstream
/// consumption. Read-only; no node is activated.
pub fn screen_text(tree: &dyn UiTree) -> String {
    let Some(root) = tree.active_root() else {
        return String::new();
    };

    let mut content = String::new();
    let mut queue: VecDeque<Box<dyn UiNode>> = VecDeque::new();
    queue.push_back(root);

    while let Some(node) = queue.pop_front() {
        if let Some(text) = node.text() {
            if !text.trim().is_empty() {
                content.push_str(&text);
                content.push('\n');
            }
        }
        for i in 0..node.child_count() {
            if let Some(child) = node.child(i) {
                queue.push_back(child);
            }
        }
    }

    if content.chars().count() > SCREEN_TEXT_CAP {
        content.chars().take(SCREEN_TEXT_CAP).collect()
    } else {
        content
    }
}

/// BFS for the best-scoring clickable node. The returned handle is the only
/// one still alive when this returns; everything else was dropped on the way.
fn find_best_node(root: Box<dyn UiNode>, description: &str) -> Option<(Box<dyn UiNode>, u8)> {
    let mut queue: VecDeque<Box<dyn UiNode>> = VecDeque::new();
    queue.push_back(root);

    let mut best: Option<Box<dyn UiNode>> = None;
    let mut best_score = NODE_THRESHOLD;

    while let Some(node) = queue.pop_front() {
        for i in 0..node.child_count() {
            if let Some(child) = node.child(i) {
                queue.push_back(child);
            }
        }

        let text_score = node
            .text()
            .filter(|t| !t.trim().is_empty())
            .map(|t| fuzzy::score(&t, description))
            .unwrap_or(0);
        let desc_score = node
            .description()
            .filter(|d| !d.trim().is_empty())
            .map(|d| fuzzy::score(&d, description))
            .unwrap_or(0);
        let score = text_score.max(desc_score);

        // Strictly greater: ties keep the node found earlier in BFS order.
        if score > best_score && node.is_clickable() {
            best = Some(node);
            best_score = score;
        }
    }

    best.map(|node| (node, best_score))
}
