//! Insertion-ordered containers of named child nodes.

use std::borrow::Borrow;
use std::fmt::Display;
use std::hash::Hash;
use std::str::FromStr;

use linked_hash_map::{Entry, LinkedHashMap};
use openpmd_backend::{NodeId, Operation};

use crate::attributable::{Attributable, Attributed};
use crate::context::{FlushContext, ReadContext};
use crate::error::{Error, Result};
use crate::writable::{Node, NodeAllocator};

/// Key type a [`Container`] indexes by.
///
/// Iteration indices are numeric, mesh and record names are strings.
/// `FromStr` turns stored group names back into keys when reading; a name
/// that does not parse is a format violation.
pub trait ContainerKey: Clone + Eq + Hash + Display + FromStr {}

impl ContainerKey for String {}
impl ContainerKey for u64 {}

/// An insertion-ordered map of child nodes that is itself a node.
///
/// The container owns one backend group; its children hang under that
/// group. Iteration order is insertion order, which also fixes the order
/// children reach the backend in.
#[derive(Debug)]
pub struct Container<T, K: Eq + Hash = String> {
    node: Attributable,
    children: LinkedHashMap<K, T>,
    alloc: NodeAllocator,
}

impl<T, K> Container<T, K>
where
    T: Node,
    K: ContainerKey,
{
    pub(crate) fn new(alloc: &NodeAllocator) -> Self {
        Container {
            node: Attributable::new(alloc),
            children: LinkedHashMap::new(),
            alloc: alloc.clone(),
        }
    }

    pub(crate) fn attach(&mut self, parent: NodeId) {
        self.node.writable_mut().set_parent(parent);
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the container has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Whether a child is stored under `key`.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.children.contains_key(key)
    }

    /// The child stored under `key`, if any.
    pub fn get<Q>(&self, key: &Q) -> Option<&T>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.children.get(key)
    }

    /// The child stored under `key`, mutably, if any.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut T>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.children.get_mut(key)
    }

    /// The child stored under `key`, creating and attaching a fresh one
    /// if absent. The flag reports whether a creation happened.
    pub fn get_or_create(&mut self, key: K) -> (&mut T, bool) {
        let parent = self.node.writable().id();
        let mut created = false;
        let child = match self.children.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                created = true;
                let mut child = T::fresh(&self.alloc);
                child.attach(parent);
                entry.insert(child)
            }
        };
        (child, created)
    }

    /// Remove the child stored under `key`.
    ///
    /// Removal is purely in-memory and enqueues nothing. A child that
    /// already has a backend object behind it cannot be removed; that
    /// would leave stored data no node accounts for.
    pub fn remove<Q>(&mut self, key: &Q) -> Result<Option<T>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Display + ?Sized,
    {
        match self.children.get(key) {
            Some(child) if child.written() => Err(Error::Logic(format!(
                "cannot remove `{key}`: node is already persisted"
            ))),
            Some(_) => Ok(self.children.remove(key)),
            None => Ok(None),
        }
    }

    /// Children in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &T)> {
        self.children.iter()
    }

    /// Children in insertion order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut T)> {
        self.children.iter_mut()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.children.keys()
    }

    /// Persist the container group under `name`, then every child under
    /// its stringified key.
    pub(crate) fn flush(&mut self, name: &str, cx: &mut FlushContext<'_>) -> Result<()> {
        if !self.node.writable().written() {
            let task = self.node.writable().task(Operation::CreatePath {
                path: name.to_string(),
            });
            cx.run(task)?;
            self.node.writable_mut().set_written(true);
        }
        self.node.flush_attributes(cx.handler)?;
        for (key, child) in self.children.iter_mut() {
            let label = key.to_string();
            let mark = cx.enter(&label);
            let result = child.flush_node(&label, cx);
            cx.exit(mark);
            result?;
        }
        Ok(())
    }

    /// Repopulate the container from storage.
    ///
    /// The caller has already bound this container's position. Every
    /// sub-path becomes a child keyed by its parsed name.
    pub(crate) fn read(&mut self, cx: &mut ReadContext<'_>) -> Result<()> {
        self.node.read_attributes(cx.handler)?;
        let paths = cx.list_paths(self.node.writable())?;
        for name in paths {
            let key: K = name
                .parse()
                .map_err(|_| cx.format_violation(format!("cannot interpret `{name}` as a child key")))?;
            let (child, _) = self.get_or_create(key);
            cx.open_path(child.attributable().writable(), &name)?;
            let mark = cx.enter(&name);
            let result = child.read_node(cx);
            cx.exit(mark);
            result?;
        }
        Ok(())
    }
}

impl<T, K: Eq + Hash> Attributed for Container<T, K> {
    fn attributable(&self) -> &Attributable {
        &self.node
    }

    fn attributable_mut(&mut self) -> &mut Attributable {
        &mut self.node
    }
}
