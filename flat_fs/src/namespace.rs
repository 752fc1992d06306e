use std::collections::BTreeMap;

/// Flat absolute-path → descriptor-slot table.
///
/// There is no directory tree: hierarchy is emulated by string prefixes, so
/// listing and recursive deletes scan every key. Note the documented edge
/// case that comes with that: `/dir1` as a prefix also matches `/dir10/x`,
/// because the match is on raw strings, not path segments.
pub struct Namespace {
    entries: BTreeMap<String, usize>,
}

impl Namespace {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Make `path` absolute. Already-absolute paths pass through; relative
    /// ones are glued onto `current_dir` with a single separator.
    pub fn resolve(current_dir: &str, path: &str) -> String {
        if path.starts_with('/') {
            path.to_string()
        } else {
            format!("{}/{}", current_dir.trim_end_matches('/'), path)
        }
    }

    pub fn get(&self, path: &str) -> Option<usize> {
        self.entries.get(path).copied()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn insert(&mut self, path: String, descriptor: usize) {
        self.entries.insert(path, descriptor);
    }

    pub fn remove(&mut self, path: &str) -> Option<usize> {
        self.entries.remove(path)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// All paths literally starting with `prefix`, in sorted order.
    pub fn paths_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .keys()
            .filter(|path| path.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Whether any entry lives "inside" `path` in the prefix sense.
    pub fn has_children(&self, path: &str) -> bool {
        let prefix = format!("{}/", path);
        self.entries.keys().any(|key| key.starts_with(&prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_absolute_and_relative() {
        assert_eq!(Namespace::resolve("/", "/a/b"), "/a/b");
        assert_eq!(Namespace::resolve("/", "a"), "/a");
        assert_eq!(Namespace::resolve("/dir1", "file.txt"), "/dir1/file.txt");
        assert_eq!(Namespace::resolve("/dir1/", "file.txt"), "/dir1/file.txt");
    }

    #[test]
    fn prefix_listing_is_string_based() {
        let mut ns = Namespace::new();
        ns.insert("/dir1".to_string(), 1);
        ns.insert("/dir1/a".to_string(), 2);
        ns.insert("/dir10/b".to_string(), 3);
        // raw prefix match: /dir10/b counts as "under" /dir1
        assert_eq!(
            ns.paths_with_prefix("/dir1"),
            vec!["/dir1", "/dir1/a", "/dir10/b"]
        );
        // the separator-suffixed form used by rmdir/rm_rf excludes it
        assert!(ns.has_children("/dir1"));
        assert_eq!(ns.paths_with_prefix("/dir1/"), vec!["/dir1/a"]);
    }

    #[test]
    fn remove_returns_slot() {
        let mut ns = Namespace::new();
        ns.insert("/a".to_string(), 7);
        assert_eq!(ns.remove("/a"), Some(7));
        assert_eq!(ns.remove("/a"), None);
    }
}
