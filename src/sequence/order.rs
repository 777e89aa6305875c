//! Directory-grouped file ordering.

use std::collections::HashMap;
use std::path::Path;

/// Compute a permutation that groups files by directory while preserving, inside
/// each directory, the original insertion order.
///
/// Directories are kept in order of first appearance, so a single camera's
/// shots for one trigger event end up contiguous regardless of how the file
/// listing interleaved them.
pub fn directory_order<'a, I>(dirs: I) -> Vec<usize>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut dir_index: HashMap<&Path, usize> = HashMap::new();
    let mut assigned = Vec::new();
    for dir in dirs {
        let next = dir_index.len();
        let idx = *dir_index.entry(dir).or_insert(next);
        assigned.push(idx);
    }

    let mut order: Vec<usize> = (0..assigned.len()).collect();
    order.sort_by_key(|&k| assigned[k]);
    order
}
