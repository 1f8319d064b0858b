use std::collections::HashMap;

use cgmath::{EuclideanSpace, Matrix4, Point3, Quaternion, SquareMatrix, Vector3};
use thiserror::Error;

use crate::common::look_at_rotation;

/// Unique identifier for a node in a [`TransformTree`]. Never reused.
pub type NodeId = u32;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TransformError {
    #[error("Transform node {0} not found")]
    NodeNotFound(NodeId),
    #[error("Parenting node {child} under {parent} would create a cycle")]
    WouldCreateCycle { child: NodeId, parent: NodeId },
}

/// A node in the transform hierarchy.
///
/// Local components are edited through the setters, which flag the node dirty.
/// Cached matrices are only refreshed by [`TransformTree::update`].
#[derive(Debug, Clone)]
pub struct TransformNode {
    pub id: NodeId,

    // Local transform components
    position: Point3<f32>,
    orientation: Quaternion<f32>,
    scale: Vector3<f32>,

    // Cached matrices, valid when `dirty` is false
    local_matrix: Matrix4<f32>,
    world_matrix: Matrix4<f32>,
    dirty: bool,

    // Hierarchy
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl TransformNode {
    /// Creates an identity node. It starts dirty so the first update computes it.
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            position: Point3::new(0.0, 0.0, 0.0),
            orientation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
            local_matrix: Matrix4::identity(),
            world_matrix: Matrix4::identity(),
            dirty: true,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Computes the local transform matrix from position, orientation, and scale.
    ///
    /// The order of operations is: Translation * Rotation * Scale (TRS)
    pub fn compute_local_transform(&self) -> Matrix4<f32> {
        let translation = Matrix4::from_translation(self.position.to_vec());
        let rotation = Matrix4::from(self.orientation);
        let scale = Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z);

        translation * rotation * scale
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn set_position(&mut self, position: Point3<f32>) {
        self.position = position;
        self.dirty = true;
    }

    pub fn orientation(&self) -> Quaternion<f32> {
        self.orientation
    }

    pub fn set_orientation(&mut self, orientation: Quaternion<f32>) {
        self.orientation = orientation;
        self.dirty = true;
    }

    pub fn scale(&self) -> Vector3<f32> {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Vector3<f32>) {
        self.scale = scale;
        self.dirty = true;
    }

    /// Moves the node by `offset` in its parent's space.
    pub fn translate(&mut self, offset: Vector3<f32>) {
        self.set_position(self.position + offset);
    }

    /// Applies `rotation` in the node's own frame (`orientation * rotation`).
    pub fn rotate(&mut self, rotation: Quaternion<f32>) {
        self.set_orientation(self.orientation * rotation);
    }

    /// Turns the node so its local -Z faces `target`, keeping local +Y near `up`.
    /// Both are in the parent's space. Does nothing when `target` is the node's position.
    pub fn look_at(&mut self, target: Point3<f32>, up: Vector3<f32>) {
        if let Some(orientation) = look_at_rotation(self.position, target, up) {
            self.set_orientation(orientation);
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Cached local matrix as of the last update.
    pub fn local_matrix(&self) -> Matrix4<f32> {
        self.local_matrix
    }

    /// Cached world matrix as of the last update.
    pub fn world_matrix(&self) -> Matrix4<f32> {
        self.world_matrix
    }

    /// World-space origin of the node as of the last update.
    pub fn world_position(&self) -> Point3<f32> {
        Point3::from_vec(self.world_matrix.w.truncate())
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    fn add_child(&mut self, child: NodeId) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    fn remove_child(&mut self, child: NodeId) {
        self.children.retain(|&id| id != child);
    }
}

/// Arena of transform nodes linked by [`NodeId`] handles.
#[derive(Debug, Clone, Default)]
pub struct TransformTree {
    nodes: HashMap<NodeId, TransformNode>,
    root_nodes: Vec<NodeId>,
    next_node_id: NodeId,
}

impl TransformTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an identity node under `parent`, or as a root when `parent` is None.
    ///
    /// # Errors
    /// Returns [`TransformError::NodeNotFound`] if `parent` is `Some` but the node doesn't exist.
    pub fn add_node(&mut self, parent: Option<NodeId>) -> Result<NodeId, TransformError> {
        if let Some(parent_id) = parent {
            if !self.nodes.contains_key(&parent_id) {
                return Err(TransformError::NodeNotFound(parent_id));
            }
        }

        let id = self.next_node_id;
        self.next_node_id += 1;

        let mut node = TransformNode::new(id);
        node.parent = parent;
        match parent.and_then(|parent_id| self.nodes.get_mut(&parent_id)) {
            Some(parent_node) => parent_node.add_child(id),
            None => self.root_nodes.push(id),
        }

        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Moves `child` under `parent`, or detaches it to a root when `parent` is None.
    ///
    /// # Errors
    /// Fails if either node is missing, or if `parent` is `child` itself or one
    /// of its descendants.
    pub fn set_parent(&mut self, child: NodeId, parent: Option<NodeId>) -> Result<(), TransformError> {
        let old_parent = self
            .nodes
            .get(&child)
            .ok_or(TransformError::NodeNotFound(child))?
            .parent;

        if let Some(parent_id) = parent {
            if !self.nodes.contains_key(&parent_id) {
                return Err(TransformError::NodeNotFound(parent_id));
            }
            if parent_id == child || self.is_descendant(parent_id, child) {
                return Err(TransformError::WouldCreateCycle {
                    child,
                    parent: parent_id,
                });
            }
        }

        if old_parent == parent {
            return Ok(());
        }

        match old_parent.and_then(|id| self.nodes.get_mut(&id)) {
            Some(old) => old.remove_child(child),
            None => self.root_nodes.retain(|&id| id != child),
        }
        match parent.and_then(|id| self.nodes.get_mut(&id)) {
            Some(new) => new.add_child(child),
            None => self.root_nodes.push(child),
        }

        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = parent;
            node.dirty = true;
        }
        Ok(())
    }

    /// Removes a node and its whole subtree, returning the removed ids
    /// (the node first, then descendants depth-first).
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<Vec<NodeId>, TransformError> {
        let parent = self
            .nodes
            .get(&node_id)
            .ok_or(TransformError::NodeNotFound(node_id))?
            .parent;

        match parent.and_then(|id| self.nodes.get_mut(&id)) {
            Some(parent_node) => parent_node.remove_child(node_id),
            None => self.root_nodes.retain(|&id| id != node_id),
        }

        let mut removed = Vec::new();
        let mut stack = vec![node_id];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.remove(&id) {
                removed.push(id);
                stack.extend(node.children.iter().rev());
            }
        }
        Ok(removed)
    }

    /// True when `node` sits somewhere below `ancestor`. A node is not its own descendant.
    pub fn is_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.nodes.get(&node).and_then(|n| n.parent);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    /// Recomputes the matrices of every dirty node and of everything below one.
    ///
    /// Parents are always refreshed before their children, so after this call
    /// `world(n) == world(parent(n)) * local(n)` holds for every node. Returns
    /// the number of nodes recomputed; a tree with no pending edits returns 0
    /// and leaves every matrix untouched.
    pub fn update(&mut self) -> usize {
        // Phase 1: collect effectively dirty nodes, parents before children.
        let mut pending = Vec::new();
        let mut stack: Vec<(NodeId, bool)> = self.root_nodes.iter().rev().map(|&id| (id, false)).collect();
        while let Some((id, parent_dirty)) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            let dirty = parent_dirty || node.dirty;
            if dirty {
                pending.push(id);
            }
            stack.extend(node.children.iter().rev().map(|&child| (child, dirty)));
        }

        // Phase 2: recompute in collection order.
        for &id in &pending {
            let parent_world = self
                .nodes
                .get(&id)
                .and_then(|node| node.parent)
                .and_then(|parent_id| self.nodes.get(&parent_id))
                .map(|parent| parent.world_matrix);

            if let Some(node) = self.nodes.get_mut(&id) {
                let local = node.compute_local_transform();
                node.local_matrix = local;
                node.world_matrix = match parent_world {
                    Some(parent_world) => parent_world * local,
                    None => local,
                };
                node.dirty = false;
            }
        }

        pending.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&TransformNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut TransformNode> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.root_nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn world_matrix(&self, id: NodeId) -> Option<Matrix4<f32>> {
        self.get(id).map(TransformNode::world_matrix)
    }

    pub fn local_matrix(&self, id: NodeId) -> Option<Matrix4<f32>> {
        self.get(id).map(TransformNode::local_matrix)
    }

    pub fn world_position(&self, id: NodeId) -> Option<Point3<f32>> {
        self.get(id).map(TransformNode::world_position)
    }
}
