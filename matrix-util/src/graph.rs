//! Small undirected-graph helpers: disjoint sets, connected components
//! and the combinatorial Laplacian.

use nalgebra::DMatrix;

/// Union-Find (disjoint set) with path halving and union by rank.
///
/// `union` keeps the smaller index as the representative when ranks
/// tie, so component labels depend only on the edge set and the order
/// in which edges are visited.
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    #[inline]
    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    #[inline]
    pub fn union(&mut self, a: usize, b: usize) -> usize {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return ra;
        }
        let (big, small) = if self.rank[ra] > self.rank[rb]
            || (self.rank[ra] == self.rank[rb] && ra < rb)
        {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent[small] = big;
        if self.rank[big] == self.rank[small] {
            self.rank[big] += 1;
        }
        big
    }

    /// Groups of element indices, each sorted, ordered by their
    /// smallest element
    pub fn groups(&mut self) -> Vec<Vec<usize>> {
        let n = self.parent.len();
        let mut label = vec![usize::MAX; n];
        let mut groups: Vec<Vec<usize>> = vec![];
        for i in 0..n {
            let r = self.find(i);
            if label[r] == usize::MAX {
                label[r] = groups.len();
                groups.push(vec![]);
            }
            groups[label[r]].push(i);
        }
        groups
    }
}

/// Connected components of an undirected graph on `n` nodes
pub fn connected_components(n: usize, edges: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let mut uf = UnionFind::new(n);
    for &(i, j) in edges {
        uf.union(i, j);
    }
    uf.groups()
}

/// Edges `(i, j)` with `i < j` whose weight exceeds `threshold`
pub fn edges_above(adjacency: &DMatrix<f64>, threshold: f64) -> Vec<(usize, usize)> {
    let n = adjacency.nrows();
    let mut edges = vec![];
    for j in 0..n {
        for i in 0..j {
            if adjacency[(i, j)] > threshold {
                edges.push((i, j));
            }
        }
    }
    edges
}

/// Combinatorial Laplacian `L = D - A` of a symmetric adjacency
/// matrix; the diagonal of `A` is ignored.
pub fn graph_laplacian(adjacency: &DMatrix<f64>) -> anyhow::Result<DMatrix<f64>> {
    let n = adjacency.nrows();
    anyhow::ensure!(
        n == adjacency.ncols(),
        "adjacency must be square, got {} x {}",
        n,
        adjacency.ncols()
    );

    let mut lap = -adjacency.clone();
    for i in 0..n {
        let degree: f64 = (0..n).filter(|&j| j != i).map(|j| adjacency[(i, j)]).sum();
        lap[(i, i)] = degree;
    }
    Ok(lap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components() {
        let comps = connected_components(6, &[(0, 1), (1, 2), (4, 5)]);
        assert_eq!(comps, vec![vec![0, 1, 2], vec![3], vec![4, 5]]);
    }

    #[test]
    fn test_union_find_groups() {
        let mut uf = UnionFind::new(4);
        uf.union(3, 2);
        uf.union(2, 1);
        assert_eq!(uf.find(1), uf.find(3));
        assert_ne!(uf.find(0), uf.find(1));
        assert_eq!(uf.groups(), vec![vec![0], vec![1, 2, 3]]);
    }

    #[test]
    fn test_laplacian_rows_sum_to_zero() -> anyhow::Result<()> {
        let adj = DMatrix::from_row_slice(3, 3, &[0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        let lap = graph_laplacian(&adj)?;
        assert_eq!(lap[(0, 0)], 2.0);
        for i in 0..3 {
            assert_eq!(lap.row(i).sum(), 0.0);
        }
        Ok(())
    }
}
