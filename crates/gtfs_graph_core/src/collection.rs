use std::borrow::Borrow;
use std::collections::btree_map::{self, BTreeMap};

use gtfs_graph_model::Record;

use crate::GraphError;

/// Keyed store of one entity kind, iterated in key order.
#[derive(Debug, Clone)]
pub struct EntityCollection<E: Record> {
    objects: BTreeMap<E::Key, E>,
}

impl<E: Record> Default for EntityCollection<E> {
    fn default() -> Self {
        Self {
            objects: BTreeMap::new(),
        }
    }
}

impl<E: Record> EntityCollection<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&E>
    where
        E::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.objects.get(key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        E::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.objects.contains_key(key)
    }

    pub fn iter(&self) -> btree_map::Values<'_, E::Key, E> {
        self.objects.values()
    }

    pub fn keys(&self) -> btree_map::Keys<'_, E::Key, E> {
        self.objects.keys()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub(crate) fn insert(&mut self, entity: E) -> Result<E::Key, GraphError> {
        let key = entity.key();
        match self.objects.entry(key.clone()) {
            btree_map::Entry::Occupied(_) => Err(GraphError::duplicate(E::KIND, &key)),
            btree_map::Entry::Vacant(slot) => {
                slot.insert(entity);
                Ok(key)
            }
        }
    }

    pub(crate) fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut E>
    where
        E::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.objects.get_mut(key)
    }

    pub(crate) fn take<Q>(&mut self, key: &Q) -> Option<E>
    where
        E::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.objects.remove(key)
    }

    /// Keys of every entity matching `predicate`.
    pub(crate) fn keys_where(&self, mut predicate: impl FnMut(&E) -> bool) -> Vec<E::Key> {
        self.objects
            .iter()
            .filter(|(_, entity)| predicate(entity))
            .map(|(key, _)| key.clone())
            .collect()
    }
}

impl<E: Record> PartialEq for EntityCollection<E> {
    fn eq(&self, other: &Self) -> bool {
        self.objects == other.objects
    }
}

impl<'a, E: Record> IntoIterator for &'a EntityCollection<E> {
    type Item = &'a E;
    type IntoIter = btree_map::Values<'a, E::Key, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gtfs_graph_model::{EntityKind, Route};

    fn route(route_id: &str, short_name: &str) -> Route {
        Route {
            route_id: route_id.to_string(),
            agency_id: 1,
            route_short_name: short_name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn rejects_duplicate_keys() {
        let mut routes = EntityCollection::new();
        routes.insert(route("1001", "1")).unwrap();
        let err = routes.insert(route("1001", "2")).unwrap_err();
        assert!(matches!(
            err,
            GraphError::DuplicateKey { kind: EntityKind::Route, ref key } if key == "1001"
        ));
        assert_eq!(routes.get("1001").unwrap().route_short_name, "1");
    }

    #[test]
    fn iterates_in_key_order() {
        let mut routes = EntityCollection::new();
        routes.insert(route("b", "2")).unwrap();
        routes.insert(route("a", "1")).unwrap();
        let keys: Vec<&String> = routes.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(routes.keys_where(|r| r.route_short_name == "2"), vec!["b"]);
    }
}
