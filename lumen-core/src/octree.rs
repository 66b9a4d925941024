//! A bounded spatial index parameterized by payload type.
//!
//! Used for the scene's object index, its source index, and internally by
//! meshes over their own triangles. The octree never ranks hits itself: it
//! invokes [`OctreeVisitor::apply`] once per payload whose containing leaf a
//! ray reaches, and leaves ranking (nearest distance, etc.) entirely to the
//! visitor.

use crate::bbox::BoundingBox;
use crate::ray::Ray;
use nalgebra::Vector3;

/// Callable invoked on every payload reached by a ray during traversal.
/// Its state lives for the duration of a single `Octree::accept` call.
pub trait OctreeVisitor<Payload> {
    fn apply(&mut self, ray: &Ray, payload: &Payload);
}

/// Blanket impl so plain closures can be used as visitors directly.
impl<Payload, F: FnMut(&Ray, &Payload)> OctreeVisitor<Payload> for F {
    fn apply(&mut self, ray: &Ray, payload: &Payload) {
        (self)(ray, payload)
    }
}

#[derive(Clone)]
enum Node<Payload> {
    Leaf {
        bounds: BoundingBox,
        items: Vec<(Payload, BoundingBox)>,
    },
    Branch {
        bounds: BoundingBox,
        children: [usize; 8],
    },
}

/// Accumulates `(payload, bounds)` pairs before a one-shot build, mirroring
/// how meshes and the scenery assemble their index once all objects are
/// known and then freeze it.
pub struct OctreeBuilder<Payload> {
    items: Vec<(Payload, BoundingBox)>,
}

impl<Payload> Default for OctreeBuilder<Payload> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<Payload: Clone> OctreeBuilder<Payload> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, payload: Payload, bounds: BoundingBox) {
        self.items.push((payload, bounds));
    }

    /// Builds the tree. Depth is chosen as roughly `log10(element count)`,
    /// per the spatial-index design goal of keeping leaves small without
    /// hand-tuning a split threshold per scene.
    pub fn build(self) -> Octree<Payload> {
        let n = self.items.len();
        let max_depth = if n <= 1 {
            0
        } else {
            ((n as f32).log10().round() as usize).max(1)
        };

        let mut bounds = BoundingBox::default();
        for (_, b) in &self.items {
            bounds.add_box(b);
        }
        if n == 0 {
            bounds = BoundingBox::from_point(Vector3::zeros());
        }
        let inflation = 2.0 * f32::EPSILON;
        bounds.inflate(Vector3::new(inflation, inflation, inflation));

        let mut nodes = Vec::new();
        let indices: Vec<usize> = (0..n).collect();
        let root = build_recursive(&mut nodes, &self.items, bounds, indices, 0, max_depth);
        Octree { nodes, root }
    }
}

/// A bounded octree over arbitrary bounded payloads.
#[derive(Clone)]
pub struct Octree<Payload> {
    nodes: Vec<Node<Payload>>,
    root: usize,
}

impl<Payload> Octree<Payload> {
    pub fn empty() -> Self
    where
        Payload: Clone,
    {
        OctreeBuilder::default().build()
    }

    /// Runs `visitor.apply(ray, payload)` once for every payload stored in
    /// a leaf whose bounds the ray intersects. Branch bounds are tested
    /// first so whole subtrees are skipped cheaply.
    pub fn accept(&self, ray: &Ray, visitor: &mut impl OctreeVisitor<Payload>) {
        if self.nodes.is_empty() {
            return;
        }
        self.accept_recursive(self.root, ray, visitor);
    }

    fn accept_recursive(&self, node: usize, ray: &Ray, visitor: &mut impl OctreeVisitor<Payload>) {
        match &self.nodes[node] {
            Node::Leaf { bounds, items } => {
                if ray.box_intersection(bounds).is_some() {
                    for (payload, _) in items {
                        visitor.apply(ray, payload);
                    }
                }
            }
            Node::Branch { bounds, children } => {
                if ray.box_intersection(bounds).is_some() {
                    for child in children {
                        self.accept_recursive(*child, ray, visitor);
                    }
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.nodes
            .iter()
            .map(|n| match n {
                Node::Leaf { items, .. } => items.len(),
                Node::Branch { .. } => 0,
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn build_recursive<Payload: Clone>(
    nodes: &mut Vec<Node<Payload>>,
    items: &[(Payload, BoundingBox)],
    bounds: BoundingBox,
    indices: Vec<usize>,
    depth: usize,
    max_depth: usize,
) -> usize {
    if depth >= max_depth || indices.len() <= 1 {
        let leaf_items = indices.into_iter().map(|i| items[i].clone()).collect();
        let index = nodes.len();
        nodes.push(Node::Leaf {
            bounds,
            items: leaf_items,
        });
        index
    } else {
        let octants = split(&bounds);
        let mut children = [0usize; 8];
        for (oct, octant_bounds) in octants.iter().enumerate() {
            let octant_indices: Vec<usize> = indices
                .iter()
                .copied()
                .filter(|&i| items[i].1.intersects_box(octant_bounds))
                .collect();
            children[oct] = build_recursive(nodes, items, *octant_bounds, octant_indices, depth + 1, max_depth);
        }
        let index = nodes.len();
        nodes.push(Node::Branch { bounds, children });
        index
    }
}

fn split(bounds: &BoundingBox) -> [BoundingBox; 8] {
    let center = bounds.center();
    let mut result = [BoundingBox::default(); 8];
    for (oct, slot) in result.iter_mut().enumerate() {
        let min = Vector3::new(
            if oct & 1 == 0 { bounds.min.x } else { center.x },
            if oct & 2 == 0 { bounds.min.y } else { center.y },
            if oct & 4 == 0 { bounds.min.z } else { center.z },
        );
        let max = Vector3::new(
            if oct & 1 == 0 { center.x } else { bounds.max.x },
            if oct & 2 == 0 { center.y } else { bounds.max.y },
            if oct & 4 == 0 { center.z } else { bounds.max.z },
        );
        *slot = BoundingBox::from_min_max(min, max);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box_at(pos: Vector3<f32>) -> BoundingBox {
        BoundingBox::from_min_max(pos - Vector3::new(0.5, 0.5, 0.5), pos + Vector3::new(0.5, 0.5, 0.5))
    }

    #[test]
    fn no_false_negatives_for_hit_primitive() {
        let mut builder = OctreeBuilder::new();
        for i in 0..64 {
            let pos = Vector3::new((i % 4) as f32 * 3.0, (i / 4 % 4) as f32 * 3.0, (i / 16) as f32 * 3.0);
            builder.insert(i, unit_box_at(pos));
        }
        let target_pos = Vector3::new(3.0, 6.0, 9.0);
        builder.insert(999, unit_box_at(target_pos));
        let octree = builder.build();

        let ray = Ray::new(target_pos - Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, 1.0));
        let mut hit = false;
        let mut visitor = |_: &Ray, payload: &i32| {
            if *payload == 999 {
                hit = true;
            }
        };
        octree.accept(&ray, &mut visitor);
        assert!(hit, "octree visitor must visit the primitive the ray demonstrably hits");
    }

    #[test]
    fn empty_octree_visits_nothing() {
        let octree: Octree<i32> = Octree::empty();
        let ray = Ray::new(Vector3::zeros(), Vector3::new(1.0, 0.0, 0.0));
        let mut count = 0;
        let mut visitor = |_: &Ray, _: &i32| count += 1;
        octree.accept(&ray, &mut visitor);
        assert_eq!(count, 0);
    }

    #[test]
    fn ray_missing_every_bound_visits_nothing() {
        let mut builder = OctreeBuilder::new();
        builder.insert(1, unit_box_at(Vector3::new(10.0, 10.0, 10.0)));
        let octree = builder.build();
        let ray = Ray::new(Vector3::zeros(), Vector3::new(1.0, 0.0, 0.0));
        let mut count = 0;
        let mut visitor = |_: &Ray, _: &i32| count += 1;
        octree.accept(&ray, &mut visitor);
        assert_eq!(count, 0);
    }
}
