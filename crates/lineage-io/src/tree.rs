//! Directory view over a flat `path -> file hash` snapshot.

use std::collections::{BTreeMap, BTreeSet};

use lineage_core::hash::collection_hash;
use lineage_core::provider::TreeEntry;

pub(crate) type Snapshot = BTreeMap<String, String>;

/// Files strictly below `dir` (everything for the root).
fn below<'a>(files: &'a Snapshot, dir: &'a str) -> impl Iterator<Item = (&'a String, &'a String)> + 'a {
    let prefix = if dir == "." {
        String::new()
    } else {
        format!("{dir}/")
    };
    files
        .range(prefix.clone()..)
        .take_while(move |(p, _)| p.starts_with(&prefix))
}

pub(crate) fn is_dir(files: &Snapshot, path: &str) -> bool {
    below(files, path).next().is_some()
}

/// File hash, or the derived collection hash for a directory.
pub(crate) fn hash_at(files: &Snapshot, path: &str) -> Option<String> {
    if let Some(hash) = files.get(path) {
        return Some(hash.clone());
    }
    let entries = children(files, path)?;
    let hashes: Vec<(String, String)> = entries
        .into_iter()
        .filter_map(|e| hash_at(files, &e.path).map(|h| (e.path, h)))
        .collect();
    Some(collection_hash(
        hashes.iter().map(|(p, h)| (p.as_str(), h.as_str())),
    ))
}

/// Direct entries of `dir`; `None` when it is not a directory.
pub(crate) fn children(files: &Snapshot, dir: &str) -> Option<Vec<TreeEntry>> {
    if files.contains_key(dir) || !is_dir(files, dir) {
        return None;
    }
    let skip = if dir == "." { 0 } else { dir.len() + 1 };
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for (path, _) in below(files, dir) {
        let rest = &path[skip..];
        let (name, nested) = match rest.split_once('/') {
            Some((name, _)) => (name, true),
            None => (rest, false),
        };
        if seen.insert(name.to_string()) {
            let full = if dir == "." {
                name.to_string()
            } else {
                format!("{dir}/{name}")
            };
            out.push(TreeEntry {
                path: full,
                is_dir: nested,
            });
        }
    }
    Some(out)
}
