use crate::math::Point3;

slotmap::new_key_type! {
    /// Unique identifier for a node in the lattice store.
    pub struct NodeId;
}

/// Data associated with a lattice node.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// The 3D position of the node.
    pub point: Point3,
}

impl NodeData {
    /// Creates a new node at the given point.
    #[must_use]
    pub fn new(point: Point3) -> Self {
        Self { point }
    }
}
