//! Quadtree over height-field triangles
//!
//! The tree is built once from the grid. Footprints on the XZ plane are
//! fixed by subdivision; only the Y range of each node follows the
//! triangles as heights are edited.

use glam::Vec3;

use super::collision::{Aabb, Ray, Triangle};

/// Leaves stop subdividing once they span this many cells per side
pub const LEAF_CELLS: usize = 4;

/// Half-open range of grid cells `[x0, x1) x [y0, y1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellRect {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
}

impl CellRect {
    fn is_leaf(&self) -> bool {
        self.x1 - self.x0 <= LEAF_CELLS && self.y1 - self.y0 <= LEAF_CELLS
    }

    /// Quadrants in the order lower-left, lower-right, upper-left, upper-right
    fn quadrants(&self) -> [CellRect; 4] {
        let mx = (self.x0 + self.x1) / 2;
        let my = (self.y0 + self.y1) / 2;
        [
            CellRect { x0: self.x0, y0: self.y0, x1: mx, y1: my },
            CellRect { x0: mx, y0: self.y0, x1: self.x1, y1: my },
            CellRect { x0: self.x0, y0: my, x1: mx, y1: self.y1 },
            CellRect { x0: mx, y0: my, x1: self.x1, y1: self.y1 },
        ]
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    Leaf { triangles: Vec<usize> },
    Internal { children: [usize; 4] },
}

#[derive(Debug, Clone)]
struct QuadNode {
    bounds: Aabb,
    kind: NodeKind,
}

/// Spatial index used for terrain picking
#[derive(Debug, Clone)]
pub struct QuadTree {
    /// Node arena, root at index 0
    nodes: Vec<QuadNode>,
}

impl QuadTree {
    /// Build the tree for a grid of `cells_per_side`² cells.
    ///
    /// Triangle `2 * (x + y * cells_per_side)` and the one after it belong to
    /// cell `(x, y)`.
    #[must_use]
    pub fn build(triangles: &[Triangle], cells_per_side: usize, cell_size: f32) -> Self {
        let mut tree = Self {
            nodes: Vec::with_capacity(Self::estimate_nodes(cells_per_side)),
        };
        let root = CellRect {
            x0: 0,
            y0: 0,
            x1: cells_per_side,
            y1: cells_per_side,
        };
        tree.build_node(root, triangles, cells_per_side, cell_size);
        log::debug!(
            "Built terrain quadtree: {} nodes over {} triangles",
            tree.nodes.len(),
            triangles.len()
        );
        tree
    }

    fn estimate_nodes(cells_per_side: usize) -> usize {
        let leaves_per_side = cells_per_side.div_ceil(LEAF_CELLS).max(1);
        // Geometric series 1 + 1/4 + 1/16 + ... of the leaf count
        leaves_per_side * leaves_per_side * 4 / 3 + 1
    }

    fn build_node(
        &mut self,
        rect: CellRect,
        triangles: &[Triangle],
        cells_per_side: usize,
        cell_size: f32,
    ) -> usize {
        let index = self.nodes.len();
        self.nodes.push(QuadNode {
            bounds: Aabb::new(Vec3::ZERO, Vec3::ZERO),
            kind: NodeKind::Leaf {
                triangles: Vec::new(),
            },
        });

        let (kind, (min_y, max_y)) = if rect.is_leaf() {
            let mut ids = Vec::with_capacity((rect.x1 - rect.x0) * (rect.y1 - rect.y0) * 2);
            for y in rect.y0..rect.y1 {
                for x in rect.x0..rect.x1 {
                    let first = (x + y * cells_per_side) * 2;
                    ids.extend((first..first + 2).filter(|&id| id < triangles.len()));
                }
            }
            let range = y_range(&ids, triangles);
            (NodeKind::Leaf { triangles: ids }, range)
        } else {
            let quadrants = rect.quadrants();
            let mut children = [0; 4];
            let mut range = (f32::INFINITY, f32::NEG_INFINITY);
            for (slot, quadrant) in children.iter_mut().zip(quadrants) {
                *slot = self.build_node(quadrant, triangles, cells_per_side, cell_size);
                let (low, high) = self.nodes[*slot].bounds.y_range();
                range = (range.0.min(low), range.1.max(high));
            }
            (NodeKind::Internal { children }, range)
        };

        let node = &mut self.nodes[index];
        node.bounds = Aabb::new(
            Vec3::new(rect.x0 as f32 * cell_size, min_y, rect.y0 as f32 * cell_size),
            Vec3::new(rect.x1 as f32 * cell_size, max_y, rect.y1 as f32 * cell_size),
        );
        node.kind = kind;
        index
    }

    /// Bounding box of the whole tree
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        self.nodes[0].bounds
    }

    /// Total number of nodes
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaves
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node.kind, NodeKind::Leaf { .. }))
            .count()
    }

    /// Closest hit distance along `ray`, if any triangle is hit
    #[must_use]
    pub fn intersect_closest(&self, ray: &Ray, triangles: &[Triangle]) -> Option<f32> {
        let root = &self.nodes[0].bounds;
        if root.intersect_ray(ray).is_none() && !root.contains_point(ray.origin) {
            return None;
        }

        let mut candidates = Vec::new();
        self.collect_candidates(0, ray, &mut candidates);

        candidates
            .iter()
            .filter_map(|&id| triangles.get(id)?.intersect_ray(ray))
            .fold(None, |closest: Option<f32>, distance| {
                Some(closest.map_or(distance, |c| c.min(distance)))
            })
    }

    fn collect_candidates(&self, index: usize, ray: &Ray, out: &mut Vec<usize>) {
        match &self.nodes[index].kind {
            NodeKind::Leaf { triangles } => out.extend_from_slice(triangles),
            NodeKind::Internal { children } => {
                for &child in children {
                    let bounds = &self.nodes[child].bounds;
                    if bounds.intersect_ray(ray).is_some() || bounds.contains_point(ray.origin) {
                        self.collect_candidates(child, ray, out);
                    }
                }
            }
        }
    }

    /// Restore the Y bounds after triangle `triangle_index` moved.
    ///
    /// Leaves touching the triangle's first vertex are recomputed exactly;
    /// their ancestors only grow. XZ footprints never change.
    pub fn refresh_bounding_box(&mut self, triangle_index: usize, triangles: &[Triangle]) {
        let Some(triangle) = triangles.get(triangle_index) else {
            log::warn!("Refresh for unknown triangle {triangle_index}");
            return;
        };
        self.refresh_node(0, triangle.v0, triangles);
    }

    fn refresh_node(&mut self, index: usize, point: Vec3, triangles: &[Triangle]) -> Option<(f32, f32)> {
        if !self.nodes[index].bounds.contains_xz(point) {
            return None;
        }

        let children = match &self.nodes[index].kind {
            NodeKind::Leaf { triangles: ids } => {
                let (low, high) = y_range(ids, triangles);
                self.nodes[index].bounds.set_y_range(low, high);
                return Some((low, high));
            }
            NodeKind::Internal { children } => *children,
        };

        for child in children {
            if let Some((low, high)) = self.refresh_node(child, point, triangles) {
                self.nodes[index].bounds.grow_y(low, high);
            }
        }
        Some(self.nodes[index].bounds.y_range())
    }

    /// Check that every leaf bounds its triangles and every internal node
    /// bounds its children.
    #[must_use]
    pub fn is_sound(&self, triangles: &[Triangle]) -> bool {
        const SLACK: f32 = 1e-4;
        self.nodes.iter().all(|node| {
            let (low, high) = node.bounds.y_range();
            match &node.kind {
                NodeKind::Leaf { triangles: ids } => ids.iter().all(|&id| {
                    triangles
                        .get(id)
                        .is_some_and(|t| t.min_y() >= low - SLACK && t.max_y() <= high + SLACK)
                }),
                NodeKind::Internal { children } => children.iter().all(|&child| {
                    let (child_low, child_high) = self.nodes[child].bounds.y_range();
                    child_low >= low - SLACK && child_high <= high + SLACK
                }),
            }
        })
    }
}

/// Vertical extent of a set of triangles; `(0, 0)` when empty
fn y_range(ids: &[usize], triangles: &[Triangle]) -> (f32, f32) {
    let (low, high) = ids
        .iter()
        .filter_map(|&id| triangles.get(id))
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(low, high), t| {
            (low.min(t.min_y()), high.max(t.max_y()))
        });
    if low > high { (0.0, 0.0) } else { (low, high) }
}
