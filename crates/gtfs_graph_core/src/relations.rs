use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};

/// Parent key to child keys index kept beside the collections so dependents
/// can be found without scanning.
#[derive(Debug, Clone)]
pub(crate) struct OneToMany<P: Ord, C: Ord> {
    links: BTreeMap<P, BTreeSet<C>>,
}

impl<P: Ord, C: Ord> Default for OneToMany<P, C> {
    fn default() -> Self {
        Self {
            links: BTreeMap::new(),
        }
    }
}

impl<P: Ord + Clone, C: Ord + Clone> OneToMany<P, C> {
    pub(crate) fn link(&mut self, parent: P, child: C) {
        self.links.entry(parent).or_default().insert(child);
    }

    pub(crate) fn unlink<Q>(&mut self, parent: &Q, child: &C)
    where
        P: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        if let Some(children) = self.links.get_mut(parent) {
            children.remove(child);
            if children.is_empty() {
                self.links.remove(parent);
            }
        }
    }

    pub(crate) fn children<Q>(&self, parent: &Q) -> impl Iterator<Item = &C>
    where
        P: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.links.get(parent).into_iter().flatten()
    }

    pub(crate) fn children_vec<Q>(&self, parent: &Q) -> Vec<C>
    where
        P: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.children(parent).cloned().collect()
    }

    pub(crate) fn count<Q>(&self, parent: &Q) -> usize
    where
        P: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.links.get(parent).map_or(0, BTreeSet::len)
    }

    pub(crate) fn has_children<Q>(&self, parent: &Q) -> bool
    where
        P: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.count(parent) > 0
    }
}
