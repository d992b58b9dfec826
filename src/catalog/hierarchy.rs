//! Category path resolution and subtree indexing.
//!
//! Paths are built by walking parent links from a category up to the
//! synthetic root. The root's own name is dropped from every path except its
//! own. Walks are iterative with a visited set and a hop cap, so a corrupted
//! store surfaces as [`AppError::CyclicHierarchy`] instead of a hang.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::errors::AppError;
use crate::models::Category;

/// Maximum number of parent/child hops a single walk may take.
pub const MAX_HIERARCHY_DEPTH: usize = 1000;

/// Separator between path segments.
pub const PATH_SEPARATOR: &str = " > ";

/// Incremental ancestry walk.
///
/// The walk does not know where categories come from: callers feed it the
/// parent it asks for via [`AncestryWalk::pending_parent`], either from an
/// in-memory [`CategoryTree`] or from the store one lookup at a time.
#[derive(Debug)]
pub struct AncestryWalk {
    /// Names collected so far, leaf first.
    names: Vec<String>,
    visited: HashSet<i64>,
    /// (child id, parent id) of the next hop.
    next: Option<(i64, i64)>,
}

impl AncestryWalk {
    pub fn start(category: &Category) -> Self {
        let mut visited = HashSet::new();
        visited.insert(category.id);
        Self {
            names: vec![category.name.clone()],
            visited,
            next: category.parent_id.map(|parent| (category.id, parent)),
        }
    }

    /// Id of the parent that must be supplied next, or `None` once the root is reached.
    pub fn pending_parent(&self) -> Option<i64> {
        self.next.map(|(_, parent)| parent)
    }

    /// Supply the parent requested by [`pending_parent`](Self::pending_parent).
    /// `None` means the store has no such category.
    pub fn advance(&mut self, parent: Option<&Category>) -> Result<(), AppError> {
        let Some((child_id, parent_id)) = self.next.take() else {
            return Ok(());
        };
        let parent = parent.ok_or(AppError::BrokenHierarchy {
            category_id: child_id,
            missing_parent_id: parent_id,
        })?;

        if !self.visited.insert(parent.id) || self.names.len() >= MAX_HIERARCHY_DEPTH {
            return Err(AppError::CyclicHierarchy {
                category_id: parent.id,
            });
        }

        self.names.push(parent.name.clone());
        self.next = parent.parent_id.map(|grandparent| (parent.id, grandparent));
        Ok(())
    }

    /// Segments root-to-leaf with the synthetic root removed.
    pub fn into_segments(mut self) -> Vec<String> {
        self.names.reverse();
        if self.names.len() > 1 {
            self.names.remove(0);
        }
        self.names
    }

    pub fn into_path(self) -> String {
        self.into_segments().join(PATH_SEPARATOR)
    }
}

/// Keep only the last `depth` segments of a path.
pub fn shorten(segments: Vec<String>, depth: usize) -> String {
    let skip = segments.len().saturating_sub(depth);
    segments[skip..].join(PATH_SEPARATOR)
}

/// Read-only snapshot of every category, addressed by id.
///
/// Built once per request; never shared across requests.
#[derive(Debug, Default)]
pub struct CategoryTree {
    categories: HashMap<i64, Category>,
    children: HashMap<i64, Vec<i64>>,
}

impl CategoryTree {
    pub fn new(categories: Vec<Category>) -> Self {
        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
        for category in &categories {
            if let Some(parent) = category.parent_id {
                children.entry(parent).or_default().push(category.id);
            }
        }
        for ids in children.values_mut() {
            ids.sort_unstable();
        }

        Self {
            categories: categories.into_iter().map(|c| (c.id, c)).collect(),
            children,
        }
    }

    pub fn get(&self, id: i64) -> Option<&Category> {
        self.categories.get(&id)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    fn walk(&self, id: i64) -> Result<AncestryWalk, AppError> {
        let category = self
            .get(id)
            .ok_or_else(|| AppError::not_found("Category", id))?;
        let mut walk = AncestryWalk::start(category);
        while let Some(parent_id) = walk.pending_parent() {
            walk.advance(self.get(parent_id))?;
        }
        Ok(walk)
    }

    /// Full display path, e.g. `"Drinks > Soda"`.
    pub fn resolve_path(&self, id: i64) -> Result<String, AppError> {
        Ok(self.walk(id)?.into_path())
    }

    /// Path limited to its last `depth` segments.
    pub fn short_path(&self, id: i64, depth: usize) -> Result<String, AppError> {
        Ok(shorten(self.walk(id)?.into_segments(), depth))
    }

    /// `root_id` plus every transitive descendant.
    pub fn subtree_ids(&self, root_id: i64) -> Result<BTreeSet<i64>, AppError> {
        if !self.categories.contains_key(&root_id) {
            return Err(AppError::not_found("Category", root_id));
        }

        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([(root_id, 0usize)]);
        while let Some((id, depth)) = queue.pop_front() {
            if !seen.insert(id) || depth > MAX_HIERARCHY_DEPTH {
                return Err(AppError::CyclicHierarchy { category_id: id });
            }
            for &child in self.children.get(&id).into_iter().flatten() {
                queue.push_back((child, depth + 1));
            }
        }
        Ok(seen)
    }
}
