//! A balanced KD-tree over stored photons, supporting radius-bounded
//! nearest-neighbor gather queries (spec.md §4.4 PhotonMappingRenderer pass
//! 1's "build balanced KD-trees over both photon maps, keyed on position").
//! No KD-tree exists anywhere in `original_source/` (the distillation's
//! photon map build is described only in prose in spec.md/SPEC_FULL.md
//! §4.4), so the structure itself follows the textbook median-split
//! approach, with nodes held in a flat `Vec` addressed by explicit child
//! indices rather than owning pointers — the same arena-of-indices
//! convention `lumen-scene`'s own `arena.rs` uses for scene elements.

use lumen_core::prelude::*;
use nalgebra::Vector3;

struct Node {
    photon: MultispectralPhoton,
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

/// A photon map: an immutable KD-tree built once from every photon stored
/// during pass 1, queried many times during pass 2's gather step.
pub struct PhotonMap {
    nodes: Vec<Node>,
    root: Option<usize>,
}

impl PhotonMap {
    /// Builds a balanced tree over `photons` by recursive median-of-widest-
    /// axis splitting. An empty photon list produces an empty map (gather
    /// queries against it simply find nothing).
    pub fn build(photons: Vec<MultispectralPhoton>) -> Self {
        let mut nodes = Vec::with_capacity(photons.len());
        let mut working = photons;
        let root = Self::build_range(&mut working, &mut nodes, 0);
        Self { nodes, root }
    }

    /// Recursively splits `photons[..]` on its widest axis's median,
    /// pushing one [`Node`] per photon into `nodes` and returning the index
    /// of the subtree's root (`None` for an empty slice).
    fn build_range(photons: &mut [MultispectralPhoton], nodes: &mut Vec<Node>, depth: usize) -> Option<usize> {
        if photons.is_empty() {
            return None;
        }
        let axis = Self::widest_axis(photons, depth);
        let median = photons.len() / 2;
        photons.select_nth_unstable_by(median, |a, b| {
            Self::component(a.position, axis).partial_cmp(&Self::component(b.position, axis)).unwrap()
        });
        let (left_slice, rest) = photons.split_at_mut(median);
        let (pivot, right_slice) = rest.split_first_mut().expect("median index is within bounds for a non-empty slice");
        let left = Self::build_range(left_slice, nodes, depth + 1);
        let right = Self::build_range(right_slice, nodes, depth + 1);
        let pivot_photon = std::mem::replace(
            pivot,
            MultispectralPhoton::new(pivot.radiance.len(), Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0)),
        );
        nodes.push(Node {
            photon: pivot_photon,
            axis,
            left,
            right,
        });
        Some(nodes.len() - 1)
    }

    /// Widest axis of the node's bounding box; falls back to a round-robin
    /// axis-by-depth split if fewer than two photons remain (where "widest"
    /// is degenerate).
    fn widest_axis(photons: &[MultispectralPhoton], depth: usize) -> usize {
        if photons.len() < 2 {
            return depth % 3;
        }
        let mut min = photons[0].position;
        let mut max = photons[0].position;
        for p in &photons[1..] {
            min = min.zip_map(&p.position, f32::min);
            max = max.zip_map(&p.position, f32::max);
        }
        let extent = max - min;
        if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        }
    }

    fn component(v: Vector3<f32>, axis: usize) -> f32 {
        match axis {
            0 => v.x,
            1 => v.y,
            _ => v.z,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Every stored photon, in no particular order — rebuilding a map from
    /// this list via [`PhotonMap::build`] reproduces an equivalent (if not
    /// bit-identical, since median ties may break differently) tree.
    pub fn photons(&self) -> impl Iterator<Item = &MultispectralPhoton> {
        self.nodes.iter().map(|node| &node.photon)
    }

    /// Gathers every stored photon within `radius` of `position`, appending
    /// `(&photon, squared_distance)` pairs into `out`.
    pub fn gather<'a>(&'a self, position: Vector3<f32>, radius: f32, out: &mut Vec<(&'a MultispectralPhoton, f32)>) {
        let Some(root) = self.root else {
            return;
        };
        self.gather_node(root, position, radius * radius, out);
    }

    fn gather_node<'a>(&'a self, node_index: usize, position: Vector3<f32>, radius_sq: f32, out: &mut Vec<(&'a MultispectralPhoton, f32)>) {
        let node = &self.nodes[node_index];
        let delta = node.photon.position - position;
        let dist_sq = delta.norm_squared();
        if dist_sq <= radius_sq {
            out.push((&node.photon, dist_sq));
        }
        let signed_axis_distance = Self::component(position, node.axis) - Self::component(node.photon.position, node.axis);
        let (near, far) = if signed_axis_distance <= 0.0 { (node.left, node.right) } else { (node.right, node.left) };
        if let Some(near) = near {
            self.gather_node(near, position, radius_sq, out);
        }
        if signed_axis_distance * signed_axis_distance <= radius_sq {
            if let Some(far) = far {
                self.gather_node(far, position, radius_sq, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photon_at(x: f32, y: f32, z: f32) -> MultispectralPhoton {
        MultispectralPhoton::new(3, Vector3::new(x, y, z), Vector3::new(0.0, 0.0, -1.0))
    }

    #[test]
    fn empty_map_gathers_nothing() {
        let map = PhotonMap::build(Vec::new());
        assert!(map.is_empty());
        let mut out = Vec::new();
        map.gather(Vector3::zeros(), 1.0, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn gather_finds_only_photons_within_radius() {
        let photons = vec![
            photon_at(0.0, 0.0, 0.0),
            photon_at(0.5, 0.0, 0.0),
            photon_at(10.0, 0.0, 0.0),
            photon_at(-0.3, 0.2, 0.1),
            photon_at(7.0, -2.0, 3.0),
        ];
        let map = PhotonMap::build(photons);
        assert_eq!(map.len(), 5);
        let mut out = Vec::new();
        map.gather(Vector3::zeros(), 1.0, &mut out);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|(p, _)| p.position.norm() <= 1.0 + 1.0e-5));
    }

    #[test]
    fn gather_squared_distance_matches_euclidean() {
        let map = PhotonMap::build(vec![photon_at(3.0, 4.0, 0.0)]);
        let mut out = Vec::new();
        map.gather(Vector3::zeros(), 10.0, &mut out);
        assert_eq!(out.len(), 1);
        assert!((out[0].1 - 25.0).abs() < 1.0e-4);
    }

    #[test]
    fn gather_handles_odd_sized_uneven_splits_without_panicking() {
        let photons: Vec<MultispectralPhoton> = (0..37).map(|i| photon_at(i as f32 * 0.1, (i % 5) as f32, -(i as f32) * 0.05)).collect();
        let map = PhotonMap::build(photons);
        assert_eq!(map.len(), 37);
        let mut out = Vec::new();
        map.gather(Vector3::new(1.0, 2.0, -0.5), 2.0, &mut out);
        assert!(out.iter().all(|(_, d2)| *d2 <= 4.0 + 1.0e-4));
    }
}
