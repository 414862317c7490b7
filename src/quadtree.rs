//! Flat indexing for fully populated quadtrees.
//!
//! Both the chunk table of contents and the per-chunk collision tree are laid
//! out as flat arrays in breadth-first order. `node_index` assigns every node
//! at every depth a unique rank, with all shallower nodes ordered first and
//! each depth stored row-major.

/// The number of nodes in a fully populated quadtree with `depth` levels.
///
/// Equivalently the rank of the first node at depth `depth`.
pub fn node_count(depth: u32) -> u32 {
    debug_assert!(depth <= 16);

    (0x5555_5555_5555_5555 & ((1_u64 << (2 * depth)) - 1)) as u32
}

/// The breadth-first rank of the node at `(x, y)` on level `depth`.
///
/// `x` and `y` are measured in node sizes, so both lie in `0..(1 << depth)`.
pub fn node_index(depth: u32, x: u32, y: u32) -> u32 {
    debug_assert!(x < (1 << depth) && y < (1 << depth));

    node_count(depth) + (y << depth) + x
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::iproduct;

    #[test]
    fn node_index_bijection() {
        let depth = 5;
        let total = node_count(depth);

        let mut seen = vec![false; total as usize];

        for level in 0..depth {
            for (y, x) in iproduct!(0..1 << level, 0..1 << level) {
                let index = node_index(level, x, y);

                assert!(index < total);
                assert!(!seen[index as usize], "rank {index} assigned twice");
                seen[index as usize] = true;
            }
        }

        assert!(seen.iter().all(|&hit| hit));
    }

    #[test]
    fn node_counts() {
        assert_eq!(node_count(0), 0);
        assert_eq!(node_count(1), 1);
        assert_eq!(node_count(2), 5);
        assert_eq!(node_count(3), 21);
        assert_eq!(node_count(16), 0x5555_5555);
    }
}
