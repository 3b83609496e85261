//! Prefix tree over `/`-separated paths, used to track which directories a
//! higher layer has marked opaque so IndexBuilder/Emitter can mask out every
//! descendant path in one `has_prefix` check instead of walking parents by hand.
//!
//! Reads are the hot path (one `has_prefix` call per tar entry); writes happen
//! once per opaque marker found. Sibling counts in practice are tiny (1-2), so
//! the linear scan over `children` below is simpler and just as fast as a map.

use crate::utils::clean_components;

#[derive(Debug, Clone)]
pub struct PathTree {
    name: String,
    children: Vec<PathTree>,
    terminal: bool,
}

impl PathTree {
    /// Construct an empty tree, optionally pre-populated with `paths`.
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = PathTree {
            name: ".".to_string(),
            children: Vec::new(),
            terminal: false,
        };
        for path in paths {
            tree.add(path.as_ref());
        }
        tree
    }

    pub fn empty() -> Self {
        Self::new::<[&str; 0], &str>([])
    }

    /// Insert `path`, creating intermediate nodes as needed.
    pub fn add(&mut self, path: &str) {
        self.add_components(&clean_components(path));
    }

    fn add_components(&mut self, components: &[&str]) {
        let Some((head, rest)) = components.split_first() else {
            self.terminal = true;
            return;
        };

        if let Some(child) = self.children.iter_mut().find(|c| c.name == *head) {
            child.add_components(rest);
            return;
        }

        let mut child = PathTree {
            name: head.to_string(),
            children: Vec::new(),
            terminal: false,
        };
        child.add_components(rest);
        self.children.push(child);
    }

    /// True if some terminal path in the tree is a component-prefix of `path`.
    pub fn has_prefix(&self, path: &str) -> bool {
        self.has_prefix_components(&clean_components(path))
    }

    fn has_prefix_components(&self, components: &[&str]) -> bool {
        if self.terminal {
            return true;
        }
        let Some((head, rest)) = components.split_first() else {
            return false;
        };
        match self.children.iter().find(|c| c.name == *head) {
            Some(child) => child.has_prefix_components(rest),
            None => false,
        }
    }

    /// Insert every terminal path of `other` into `self`.
    pub fn merge(&mut self, other: &PathTree) {
        self.merge_children(other, &[]);
    }

    fn merge_children(&mut self, other: &PathTree, acc: &[String]) {
        if other.terminal {
            self.add_components(&acc.iter().map(String::as_str).collect::<Vec<_>>());
        }
        for child in &other.children {
            let mut next = acc.to_vec();
            next.push(child.name.clone());
            self.merge_children(child, &next);
        }
    }

    /// Depth-first collection of terminal paths, sorted and `:`-joined. For
    /// debugging/tests only.
    pub fn stringify(&self) -> String {
        let mut out = Vec::new();
        self.collect_terminals(&mut vec![self.name.clone()], &mut out);
        if out.is_empty() {
            return "<empty>".to_string();
        }
        out.sort();
        out.join(":")
    }

    fn collect_terminals(&self, acc: &mut Vec<String>, out: &mut Vec<String>) {
        if self.terminal {
            out.push(acc.join("/"));
        }
        for child in &self.children {
            acc.push(child.name.clone());
            child.collect_terminals(acc, out);
            acc.pop();
        }
    }
}

impl Default for PathTree {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree_has_no_prefix() {
        let t = PathTree::empty();
        assert!(!t.has_prefix("a/b/c"));
        assert_eq!(t.stringify(), "<empty>");
    }

    #[test]
    fn add_and_has_prefix() {
        let t = PathTree::new(["a/b"]);
        assert!(t.has_prefix("a/b"));
        assert!(t.has_prefix("a/b/c"));
        assert!(!t.has_prefix("a"));
        assert!(!t.has_prefix("a/c"));
    }

    #[test]
    fn terminal_with_children_still_matches_descendants() {
        let mut t = PathTree::new(["a"]);
        t.add("a/b");
        assert!(t.has_prefix("a"));
        assert!(t.has_prefix("a/b"));
        assert!(t.has_prefix("a/anything/deep"));
    }

    #[test]
    fn merge_is_commutative_for_has_prefix() {
        let mut a = PathTree::new(["bin/ar", "var/cache/apt"]);
        let mut b = PathTree::new(["bin/ar", "bin/busybox", "usr/share/doc"]);

        let mut a_then_b = a.clone();
        a_then_b.merge(&b);

        let mut b_then_a = b.clone();
        b_then_a.merge(&a);

        for probe in ["bin/ar", "bin/busybox", "var/cache/apt/x", "usr/share/doc/y", "nope"] {
            assert_eq!(
                a_then_b.has_prefix(probe),
                b_then_a.has_prefix(probe),
                "probe {probe}"
            );
        }

        // mutating the originals afterward must not retroactively change the merged copies
        a.add("zzz");
        b.add("yyy");
        assert!(!a_then_b.has_prefix("zzz"));
        assert!(!b_then_a.has_prefix("yyy"));
    }

    #[test]
    fn stringify_sorts_and_joins() {
        let t = PathTree::new(["b", "a", "a/c"]);
        assert_eq!(t.stringify(), "./a:./a/c:./b");
    }
}
