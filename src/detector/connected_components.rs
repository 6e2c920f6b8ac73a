//! Connected components over an edge mask, plus outer-boundary tracing
//! Finds 8-connected edge regions so each one can be traced as a contour

use crate::models::{BitMatrix, PointI};

/// Union-Find data structure
pub struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    /// `n` singleton sets
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n as u32).collect(),
        }
    }

    /// Root of `x`, compressing the path on the way
    pub fn find(&mut self, x: u32) -> u32 {
        let mut root = x;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        // Path compression
        let mut cur = x;
        while self.parent[cur as usize] != root {
            let next = self.parent[cur as usize];
            self.parent[cur as usize] = root;
            cur = next;
        }
        root
    }

    /// Merge the sets of `x` and `y`; the smaller root wins
    pub fn union(&mut self, x: u32, y: u32) {
        let root_x = self.find(x);
        let root_y = self.find(y);
        if root_x != root_y {
            let (lo, hi) = if root_x < root_y {
                (root_x, root_y)
            } else {
                (root_y, root_x)
            };
            self.parent[hi as usize] = lo;
        }
    }
}

/// One 8-connected region of set pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Label stored in [`ComponentMap::labels`]
    pub label: u32,
    /// Left edge of the inclusive bounding box
    pub min_x: usize,
    /// Top edge
    pub min_y: usize,
    /// Right edge
    pub max_x: usize,
    /// Bottom edge
    pub max_y: usize,
    /// First pixel in raster order (top-most, then left-most)
    pub start: PointI,
    /// Pixel count
    pub pixels: usize,
}

impl Component {
    /// Bounding-box area, an upper bound on the enclosed contour area
    pub fn bbox_area(&self) -> usize {
        (self.max_x - self.min_x + 1) * (self.max_y - self.min_y + 1)
    }
}

/// Label image plus per-component statistics
pub struct ComponentMap {
    /// Mask width
    pub width: usize,
    /// Mask height
    pub height: usize,
    /// 0 = background, otherwise component label
    pub labels: Vec<u32>,
    /// One entry per label, in label order
    pub components: Vec<Component>,
}

impl ComponentMap {
    fn label_at(&self, p: PointI) -> u32 {
        if p.x < 0 || p.y < 0 || p.x >= self.width as i32 || p.y >= self.height as i32 {
            return 0;
        }
        self.labels[p.y as usize * self.width + p.x as usize]
    }
}

/// Label 8-connected regions of set pixels
pub fn label_components(matrix: &BitMatrix) -> ComponentMap {
    let width = matrix.width();
    let height = matrix.height();

    let mut labels = vec![0u32; width * height];
    let mut next_label = 1u32;
    let mut uf = UnionFind::new(width * height / 2 + 2);

    // First pass: provisional labels
    for y in 0..height {
        for x in 0..width {
            if !matrix.get(x, y) {
                continue;
            }

            let mut neighbors = [0u32; 4];
            let mut count = 0;
            // Left, above, upper-left, upper-right
            if x > 0 && matrix.get(x - 1, y) {
                neighbors[count] = labels[y * width + x - 1];
                count += 1;
            }
            if y > 0 && matrix.get(x, y - 1) {
                neighbors[count] = labels[(y - 1) * width + x];
                count += 1;
            }
            if x > 0 && y > 0 && matrix.get(x - 1, y - 1) {
                neighbors[count] = labels[(y - 1) * width + x - 1];
                count += 1;
            }
            if x + 1 < width && y > 0 && matrix.get(x + 1, y - 1) {
                neighbors[count] = labels[(y - 1) * width + x + 1];
                count += 1;
            }

            let idx = y * width + x;
            match neighbors[..count].iter().min() {
                None => {
                    if next_label as usize >= uf.parent.len() {
                        uf.parent.push(next_label);
                    }
                    labels[idx] = next_label;
                    next_label += 1;
                }
                Some(&min_label) => {
                    labels[idx] = min_label;
                    for &l in &neighbors[..count] {
                        if l != min_label {
                            uf.union(min_label, l);
                        }
                    }
                }
            }
        }
    }

    // Second pass: resolve to compact labels and gather stats
    let mut compact = vec![0u32; next_label as usize];
    let mut components: Vec<Component> = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            if labels[idx] == 0 {
                continue;
            }
            let root = uf.find(labels[idx]) as usize;
            if compact[root] == 0 {
                components.push(Component {
                    label: components.len() as u32 + 1,
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                    start: PointI::new(x as i32, y as i32),
                    pixels: 0,
                });
                compact[root] = components.len() as u32;
            }
            let label = compact[root];
            labels[idx] = label;
            let c = &mut components[label as usize - 1];
            c.min_x = c.min_x.min(x);
            c.max_x = c.max_x.max(x);
            c.max_y = c.max_y.max(y);
            c.pixels += 1;
        }
    }

    ComponentMap {
        width,
        height,
        labels,
        components,
    }
}

/// Clockwise neighbour offsets (y grows downwards), starting west
const MOORE: [(i32, i32); 8] = [
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
];

/// Trace the outer boundary of a component with Moore-neighbour tracing.
///
/// Returns boundary pixels in clockwise order, starting at
/// [`Component::start`]. Holes are never visited.
pub fn trace_outer_boundary(map: &ComponentMap, component: &Component) -> Vec<PointI> {
    let start = component.start;
    let label = component.label;
    let mut boundary = vec![start];

    // The start pixel is raster-first, so its west neighbour is outside
    let mut backtrack = 0usize;
    let mut current = start;
    let mut first_move: Option<usize> = None;
    let max_steps = component.pixels * 4 + 16;

    for _ in 0..max_steps {
        let mut moved = None;
        for k in 1..=8 {
            let dir = (backtrack + k) % 8;
            let (dx, dy) = MOORE[dir];
            let next = PointI::new(current.x + dx, current.y + dy);
            if map.label_at(next) == label {
                moved = Some((dir, next));
                break;
            }
        }
        let Some((dir, next)) = moved else {
            // Isolated pixel
            break;
        };

        if current == start {
            match first_move {
                Some(first) if first == dir => break,
                None => first_move = Some(dir),
                _ => {}
            }
        }

        // Backtrack becomes the neighbour examined just before `next`
        backtrack = if dir % 2 == 0 { (dir + 6) % 8 } else { (dir + 5) % 8 };
        current = next;
        if current != start {
            boundary.push(current);
        }
    }

    boundary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_components() {
        let mut matrix = BitMatrix::new(10, 10);
        // 2x2 block and a diagonal pair elsewhere
        for (x, y) in [(2, 2), (3, 2), (2, 3), (3, 3), (7, 7), (8, 8)] {
            matrix.set(x, y, true);
        }

        let map = label_components(&matrix);
        assert_eq!(map.components.len(), 2);
        let block = &map.components[0];
        assert_eq!((block.min_x, block.min_y, block.max_x, block.max_y), (2, 2, 3, 3));
        assert_eq!(block.pixels, 4);
        assert_eq!(map.components[1].pixels, 2);
    }

    #[test]
    fn test_u_shape_merges() {
        // Two arms joined only at the bottom row
        let matrix = BitMatrix::from_fn(7, 5, |x, y| x == 1 || x == 5 || y == 4);
        let map = label_components(&matrix);
        assert_eq!(map.components.len(), 1);
        assert_eq!(map.components[0].start, PointI::new(1, 0));
    }

    #[test]
    fn test_trace_ring_outer_boundary() {
        // 3px thick square ring from (2,2) to (17,17)
        let matrix = BitMatrix::from_fn(20, 20, |x, y| {
            let inside = (2..=17).contains(&x) && (2..=17).contains(&y);
            let hole = (5..=14).contains(&x) && (5..=14).contains(&y);
            inside && !hole
        });
        let map = label_components(&matrix);
        assert_eq!(map.components.len(), 1);
        let boundary = trace_outer_boundary(&map, &map.components[0]);

        // Outer perimeter of a 16x16 block has 60 pixels
        assert_eq!(boundary.len(), 60);
        assert!(boundary.iter().all(|p| p.x == 2 || p.x == 17 || p.y == 2 || p.y == 17));
        assert!(boundary.contains(&PointI::new(17, 17)));
        // Clockwise: second pixel is to the right of the start
        assert_eq!(boundary[1], PointI::new(3, 2));
    }

    #[test]
    fn test_trace_single_pixel() {
        let mut matrix = BitMatrix::new(5, 5);
        matrix.set(2, 2, true);
        let map = label_components(&matrix);
        let boundary = trace_outer_boundary(&map, &map.components[0]);
        assert_eq!(boundary, vec![PointI::new(2, 2)]);
    }
}
