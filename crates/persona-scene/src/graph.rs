//! Scene graph arena
//!
//! Nodes live in generational slots. Detaching a subtree frees its slots
//! and bumps their generation, so handles into a removed model stop
//! resolving instead of pointing at whatever reuses the slot.

use persona_core::{NodeId, PersonaError, PersonaResult};

use crate::{Color, NodeData, NodeTree, Transform};

#[derive(Debug)]
struct Entry {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// The renderable scene
#[derive(Debug)]
pub struct Scene {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    /// Clear color
    pub background: Color,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Create an empty scene with a root group
    pub fn new() -> Self {
        let mut scene = Scene {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId::new(0, 0),
            background: Color::from_hex(0xf0f0f0),
        };
        scene.root = scene.alloc(Entry {
            data: NodeData::group("scene"),
            parent: None,
            children: Vec::new(),
        });
        scene
    }

    /// Root group every model hangs under
    pub fn root(&self) -> NodeId {
        self.root
    }

    fn alloc(&mut self, entry: Entry) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(entry);
                NodeId::new(index, slot.generation)
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                NodeId::new((self.slots.len() - 1) as u32, 0)
            }
        }
    }

    fn entry(&self, id: NodeId) -> Option<&Entry> {
        self.slots
            .get(id.index())
            .filter(|s| s.generation == id.generation())
            .and_then(|s| s.entry.as_ref())
    }

    fn entry_mut(&mut self, id: NodeId) -> Option<&mut Entry> {
        self.slots
            .get_mut(id.index())
            .filter(|s| s.generation == id.generation())
            .and_then(|s| s.entry.as_mut())
    }

    /// Whether the handle still points at a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.entry(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.entry(id).map(|e| &e.data)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.entry_mut(id).map(|e| &mut e.data)
    }

    pub fn transform_mut(&mut self, id: NodeId) -> Option<&mut Transform> {
        self.get_mut(id).map(|d| &mut d.transform)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.entry(id).and_then(|e| e.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.entry(id).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    /// Live node count, including the scene root
    pub fn node_count(&self) -> usize {
        self.slots.iter().filter(|s| s.entry.is_some()).count()
    }

    /// Insert a single node under `parent`
    pub fn insert(&mut self, data: NodeData, parent: NodeId) -> PersonaResult<NodeId> {
        if !self.contains(parent) {
            return Err(PersonaError::StaleNode(parent));
        }
        let id = self.alloc(Entry {
            data,
            parent: Some(parent),
            children: Vec::new(),
        });
        if let Some(p) = self.entry_mut(parent) {
            p.children.push(id);
        }
        Ok(id)
    }

    /// Attach a detached tree under `parent`.
    ///
    /// Returns the handles in the tree's local index order; the first one is
    /// the subtree root.
    pub fn attach_tree(&mut self, tree: NodeTree, parent: NodeId) -> PersonaResult<Vec<NodeId>> {
        if !self.contains(parent) {
            return Err(PersonaError::StaleNode(parent));
        }
        let mut ids: Vec<NodeId> = Vec::with_capacity(tree.len());
        for (data, local_parent) in tree.into_entries() {
            let p = match local_parent {
                Some(i) if i < ids.len() => ids[i],
                _ => parent,
            };
            ids.push(self.insert(data, p)?);
        }
        Ok(ids)
    }

    /// Remove a node and everything below it. Returns false for stale
    /// handles and for the scene root.
    pub fn detach(&mut self, id: NodeId) -> bool {
        if id == self.root || !self.contains(id) {
            return false;
        }
        if let Some(parent) = self.parent(id) {
            if let Some(p) = self.entry_mut(parent) {
                p.children.retain(|c| *c != id);
            }
        }
        for node in self.traverse(id) {
            let slot = &mut self.slots[node.index()];
            slot.entry = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(node.index() as u32);
        }
        true
    }

    /// Pre-order walk of the subtree rooted at `id`
    pub fn traverse(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            for child in self.children(node).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    /// First node named exactly `name` in the subtree
    pub fn find_by_name(&self, root: NodeId, name: &str) -> Option<NodeId> {
        self.traverse(root)
            .into_iter()
            .find(|id| self.get(*id).map_or(false, |d| d.name == name))
    }

    /// Whether `node` sits somewhere below `ancestor`
    pub fn is_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent(p);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> NodeTree {
        let mut t = NodeTree::new(NodeData::group("model"));
        let spine = t.add(NodeData::bone("Spine"), 0);
        t.add(NodeData::bone("Head"), spine);
        t.add(NodeData::group("Prop"), 0);
        t
    }

    #[test]
    fn test_attach_and_traverse() {
        let mut scene = Scene::new();
        let ids = scene.attach_tree(tree(), scene.root()).unwrap();
        assert_eq!(ids.len(), 4);
        assert_eq!(scene.node_count(), 5);

        let order: Vec<String> = scene
            .traverse(ids[0])
            .iter()
            .map(|id| scene.get(*id).unwrap().name.clone())
            .collect();
        assert_eq!(order, vec!["model", "Spine", "Head", "Prop"]);
        assert!(scene.is_descendant(ids[2], ids[0]));
    }

    #[test]
    fn test_detach_invalidates_handles() {
        let mut scene = Scene::new();
        let ids = scene.attach_tree(tree(), scene.root()).unwrap();
        let head = ids[2];

        assert!(scene.detach(ids[0]));
        assert!(!scene.contains(head));
        assert!(scene.get_mut(head).is_none());
        assert_eq!(scene.node_count(), 1);
        assert!(scene.children(scene.root()).is_empty());

        // Slots are reused with a new generation
        let again = scene.attach_tree(tree(), scene.root()).unwrap();
        let reused = again
            .iter()
            .find(|id| id.index() == head.index())
            .copied()
            .unwrap();
        assert_ne!(reused.generation(), head.generation());
        assert!(!scene.contains(head));
        assert!(scene.contains(reused));
    }

    #[test]
    fn test_detach_twice_and_root() {
        let mut scene = Scene::new();
        let ids = scene.attach_tree(tree(), scene.root()).unwrap();
        assert!(scene.detach(ids[0]));
        assert!(!scene.detach(ids[0]));
        assert!(!scene.detach(scene.root()));
    }

    #[test]
    fn test_insert_under_stale_parent() {
        let mut scene = Scene::new();
        let ids = scene.attach_tree(tree(), scene.root()).unwrap();
        scene.detach(ids[0]);
        let err = scene.insert(NodeData::group("x"), ids[0]);
        assert!(matches!(err, Err(PersonaError::StaleNode(_))));
    }

    #[test]
    fn test_find_by_name() {
        let mut scene = Scene::new();
        let ids = scene.attach_tree(tree(), scene.root()).unwrap();
        assert_eq!(scene.find_by_name(ids[0], "Head"), Some(ids[2]));
        assert_eq!(scene.find_by_name(ids[0], "Tail"), None);
    }
}
