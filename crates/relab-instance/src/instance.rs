//! Resolved instance tree
//!
//! Instances live in an arena owned by [`InstanceTree`]. Parents own their
//! children through the arena; children point back with a plain
//! [`InstanceId`], so the tree has no reference cycles.

use crate::error::ElaborationError;
use crate::trigger::{ActionInstance, PortInstance, TimerInstance, TriggerInstance, TriggerKind};
use crate::value::ParameterInstance;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Handle of an instance within its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub usize);

impl InstanceId {
    pub const ROOT: InstanceId = InstanceId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// One reactor instantiation in the hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactorInstance {
    pub id: InstanceId,
    /// Instantiation name; the root uses the main reactor's name
    pub name: String,
    /// Name of the reactor definition this instance was created from
    pub reactor: String,
    pub parent: Option<InstanceId>,
    /// Distance from the root
    pub depth: usize,
    qualified_name: String,
    /// Contained instances in declaration order
    pub children: Vec<InstanceId>,
    pub parameters: IndexMap<String, ParameterInstance>,
    /// Startup trigger first, then ports, timers and actions as declared
    pub triggers: Vec<TriggerInstance>,
}

impl ReactorInstance {
    pub fn new(
        id: InstanceId,
        name: impl Into<String>,
        reactor: impl Into<String>,
        parent: Option<InstanceId>,
        depth: usize,
        qualified_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            reactor: reactor.into(),
            parent,
            depth,
            qualified_name: qualified_name.into(),
            children: Vec::new(),
            parameters: IndexMap::new(),
            triggers: Vec::new(),
        }
    }

    /// Instantiation names from the root down to this instance, joined by `.`
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterInstance> {
        self.parameters.get(name)
    }

    pub fn trigger(&self, name: &str) -> Option<&TriggerInstance> {
        self.triggers.iter().find(|t| t.name == name)
    }

    /// The implicit startup trigger
    pub fn startup(&self) -> Option<&TimerInstance> {
        self.timers()
            .map(|(_, timer)| timer)
            .find(|timer| timer.startup)
    }

    pub fn timers(&self) -> impl Iterator<Item = (&TriggerInstance, &TimerInstance)> {
        self.triggers.iter().filter_map(|t| match &t.kind {
            TriggerKind::Timer(timer) => Some((t, timer)),
            _ => None,
        })
    }

    pub fn actions(&self) -> impl Iterator<Item = (&TriggerInstance, &ActionInstance)> {
        self.triggers.iter().filter_map(|t| match &t.kind {
            TriggerKind::Action(action) => Some((t, action)),
            _ => None,
        })
    }

    pub fn ports(&self) -> impl Iterator<Item = (&TriggerInstance, &PortInstance)> {
        self.triggers.iter().filter_map(|t| match &t.kind {
            TriggerKind::Port(port) => Some((t, port)),
            _ => None,
        })
    }
}

/// The finished, read-only instance hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SerializedTree", into = "SerializedTree")]
pub struct InstanceTree {
    nodes: Vec<ReactorInstance>,
    by_name: IndexMap<String, InstanceId>,
}

/// On-disk form; the name index is rebuilt on load
#[derive(Serialize, Deserialize)]
struct SerializedTree {
    instances: Vec<ReactorInstance>,
}

impl TryFrom<SerializedTree> for InstanceTree {
    type Error = ElaborationError;

    /// Node 0 is the root, ids match positions, parents precede children
    fn try_from(tree: SerializedTree) -> Result<Self, Self::Error> {
        let nodes = tree.instances;
        let malformed = |msg: String| Err(ElaborationError::MalformedTree(msg));

        match nodes.first() {
            None => return malformed("no root instance".to_string()),
            Some(root) if !root.is_root() => {
                return malformed(format!("first instance {} has a parent", root.qualified_name))
            }
            Some(_) => {}
        }

        for (index, node) in nodes.iter().enumerate() {
            if node.id.index() != index {
                return malformed(format!(
                    "instance {} has id {} at position {}",
                    node.qualified_name, node.id.0, index
                ));
            }
            if index > 0 && !node.parent.is_some_and(|p| p.index() < index) {
                return malformed(format!(
                    "instance {} does not follow its parent",
                    node.qualified_name
                ));
            }
            for child in &node.children {
                let parent = nodes.get(child.index()).and_then(|c| c.parent);
                if child.index() <= index || parent != Some(node.id) {
                    return malformed(format!(
                        "instance {} lists {} as a child",
                        node.qualified_name, child.0
                    ));
                }
            }
        }

        let tree = InstanceTree::from_nodes(nodes);
        if tree.by_name.len() != tree.nodes.len() {
            return malformed("qualified names are not unique".to_string());
        }
        Ok(tree)
    }
}

impl From<InstanceTree> for SerializedTree {
    fn from(tree: InstanceTree) -> Self {
        SerializedTree {
            instances: tree.nodes,
        }
    }
}

impl InstanceTree {
    /// Wrap a complete arena; `nodes[0]` must be the root
    pub(crate) fn from_nodes(nodes: Vec<ReactorInstance>) -> Self {
        let by_name = nodes
            .iter()
            .map(|n| (n.qualified_name.clone(), n.id))
            .collect();
        Self { nodes, by_name }
    }

    pub fn root(&self) -> &ReactorInstance {
        &self.nodes[InstanceId::ROOT.index()]
    }

    pub fn get(&self, id: InstanceId) -> Option<&ReactorInstance> {
        self.nodes.get(id.index())
    }

    /// Look up an instance by qualified name, e.g. `Main.sensor.filter`
    pub fn find(&self, qualified_name: &str) -> Option<&ReactorInstance> {
        self.by_name.get(qualified_name).and_then(|id| self.get(*id))
    }

    pub fn parent_of(&self, id: InstanceId) -> Option<&ReactorInstance> {
        self.get(id)?.parent.and_then(|p| self.get(p))
    }

    pub fn children_of(&self, id: InstanceId) -> impl Iterator<Item = &ReactorInstance> {
        self.get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|c| self.get(*c))
    }

    /// Pre-order traversal in declaration order
    pub fn iter_depth_first(&self) -> DepthFirst<'_> {
        DepthFirst {
            tree: self,
            stack: vec![InstanceId::ROOT],
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every timer with its owning instance, for scheduler registration
    pub fn timers(
        &self,
    ) -> impl Iterator<Item = (&ReactorInstance, &TriggerInstance, &TimerInstance)> {
        self.iter_depth_first().flat_map(|inst| {
            inst.timers()
                .map(move |(trigger, timer)| (inst, trigger, timer))
        })
    }

    /// Stable indented dump of the whole tree
    pub fn render(&self) -> String {
        let mut out = String::new();
        for inst in self.iter_depth_first() {
            let indent = "  ".repeat(inst.depth);
            let _ = writeln!(out, "{}{} : {}", indent, inst.name, inst.reactor);
            for param in inst.parameters.values() {
                let origin = if param.is_overridden() { "override" } else { "default" };
                let _ = writeln!(
                    out,
                    "{}  param {} = {} [{}]",
                    indent, param.name, param.value, origin
                );
            }
            for trigger in &inst.triggers {
                let _ = writeln!(out, "{}  {}", indent, trigger);
            }
        }
        out
    }
}

/// Depth-first iterator over an [`InstanceTree`]
pub struct DepthFirst<'a> {
    tree: &'a InstanceTree,
    stack: Vec<InstanceId>,
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = &'a ReactorInstance;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.tree.get(id)?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> InstanceTree {
        let mut root = ReactorInstance::new(InstanceId(0), "Main", "Main", None, 0, "Main");
        let mut a = ReactorInstance::new(InstanceId(1), "a", "A", Some(InstanceId(0)), 1, "Main.a");
        let a1 = ReactorInstance::new(InstanceId(2), "x", "X", Some(InstanceId(1)), 2, "Main.a.x");
        let b = ReactorInstance::new(InstanceId(3), "b", "B", Some(InstanceId(0)), 1, "Main.b");
        root.children = vec![InstanceId(1), InstanceId(3)];
        a.children = vec![InstanceId(2)];
        InstanceTree::from_nodes(vec![root, a, a1, b])
    }

    #[test]
    fn test_depth_first_order() {
        let tree = sample_tree();
        let names: Vec<_> = tree.iter_depth_first().map(|n| n.qualified_name()).collect();
        assert_eq!(names, vec!["Main", "Main.a", "Main.a.x", "Main.b"]);
    }

    #[test]
    fn test_navigation() {
        let tree = sample_tree();
        let x = tree.find("Main.a.x").unwrap();
        assert_eq!(tree.parent_of(x.id).unwrap().name, "a");
        assert!(tree.parent_of(InstanceId::ROOT).is_none());
        assert!(tree.root().is_root());

        let children: Vec<_> = tree.children_of(InstanceId::ROOT).map(|c| c.name.as_str()).collect();
        assert_eq!(children, vec!["a", "b"]);
        assert!(tree.find("Main.c").is_none());
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn test_find_after_json_round_trip() {
        let tree = sample_tree();
        let json = serde_json::to_string(&tree).unwrap();
        let restored: InstanceTree = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.find("Main.b").unwrap().id, InstanceId(3));
        assert_eq!(restored, tree);
    }

    fn load(json: &str) -> Result<InstanceTree, String> {
        serde_json::from_str::<InstanceTree>(json).map_err(|e| e.to_string())
    }

    #[test]
    fn test_reject_malformed_trees() {
        let err = load(r#"{"instances":[]}"#).unwrap_err();
        assert!(err.contains("no root instance"), "{}", err);

        // Ids out of order
        let mut value = serde_json::to_value(sample_tree()).unwrap();
        value["instances"][1]["id"] = serde_json::json!(2);
        let err = load(&value.to_string()).unwrap_err();
        assert!(err.contains("has id 2 at position 1"), "{}", err);

        // Child that does not point back
        let mut value = serde_json::to_value(sample_tree()).unwrap();
        value["instances"][3]["parent"] = serde_json::json!(1);
        let err = load(&value.to_string()).unwrap_err();
        assert!(err.contains("Main lists 3 as a child"), "{}", err);

        // Two instances answering to one name
        let mut value = serde_json::to_value(sample_tree()).unwrap();
        value["instances"][3]["qualified_name"] = serde_json::json!("Main.a");
        let err = load(&value.to_string()).unwrap_err();
        assert!(err.contains("not unique"), "{}", err);
    }
}
