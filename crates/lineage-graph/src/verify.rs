//! DAG verification over index-based adjacency.

use lineage_core::error::{Error, Result};

/// DFS-based cycle detection. Nodes are `0..node_count`; `edges` are
/// `(from, to)` pairs. Returns the nodes of one cycle, in edge order, if any.
pub fn find_cycle(node_count: usize, edges: &[(usize, usize)]) -> Option<Vec<usize>> {
    let mut adj = vec![Vec::new(); node_count];
    for &(from, to) in edges {
        if from < node_count && to < node_count {
            adj[from].push(to);
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        Visiting,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; node_count];
    let mut path: Vec<usize> = Vec::new();

    for start in 0..node_count {
        if marks[start] != Mark::Unvisited {
            continue;
        }
        // Iterative DFS: (node, next neighbor position).
        let mut stack = vec![(start, 0usize)];
        marks[start] = Mark::Visiting;
        path.push(start);

        while let Some(top) = stack.last_mut() {
            let (node, pos) = *top;
            if let Some(&next) = adj[node].get(pos) {
                top.1 += 1;
                match marks[next] {
                    Mark::Visiting => {
                        let at = path.iter().position(|&n| n == next).unwrap_or(0);
                        return Some(path[at..].to_vec());
                    }
                    Mark::Unvisited => {
                        marks[next] = Mark::Visiting;
                        path.push(next);
                        stack.push((next, 0));
                    }
                    Mark::Done => {}
                }
            } else {
                marks[node] = Mark::Done;
                path.pop();
                stack.pop();
            }
        }
    }
    None
}

/// `GraphCorruption` naming the cycle (rendered through `label`) if one exists.
pub fn assert_acyclic<F>(node_count: usize, edges: &[(usize, usize)], label: F) -> Result<()>
where
    F: Fn(usize) -> String,
{
    match find_cycle(node_count, edges) {
        None => Ok(()),
        Some(cycle) => {
            let mut names: Vec<String> = cycle.iter().map(|&n| label(n)).collect();
            if let Some(first) = names.first().cloned() {
                names.push(first);
            }
            Err(Error::GraphCorruption(format!(
                "dependency cycle: {}",
                names.join(" -> ")
            )))
        }
    }
}
