//! Attribute storage with per-attribute change tracking.
//!
//! Attributes live in memory until a flush pushes the changed ones to the
//! backend. Each attribute carries its own dirty flag, so reflushing an
//! unmodified node writes nothing, and flushing a node where one
//! attribute changed rewrites only that attribute.

use linked_hash_map::LinkedHashMap;

use openpmd_backend::{IOHandler, Operation, TaskOutput};
use openpmd_core::{Floating, Value};

use crate::error::{Error, Result};
use crate::writable::{NodeAllocator, Writable};

// ============================================================================
// Attribute
// ============================================================================

/// One stored attribute: its value and whether it still needs flushing.
#[derive(Debug, Clone)]
pub struct Attribute {
    value: Value,
    dirty: bool,
}

impl Attribute {
    fn new(value: Value) -> Self {
        Attribute { value, dirty: true }
    }

    fn clean(value: Value) -> Self {
        Attribute {
            value,
            dirty: false,
        }
    }

    /// The stored value.
    #[inline]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Whether the value has changed since it was last flushed.
    #[inline]
    pub fn dirty(&self) -> bool {
        self.dirty
    }
}

// ============================================================================
// Attributable
// ============================================================================

/// Shared per-node state: identity, lifecycle flags and attributes.
///
/// Attribute iteration order is insertion order, which is also the order
/// writes reach the backend in.
#[derive(Debug)]
pub struct Attributable {
    writable: Writable,
    attributes: LinkedHashMap<String, Attribute>,
}

impl Attributable {
    pub(crate) fn new(alloc: &NodeAllocator) -> Self {
        Attributable {
            writable: Writable::new(alloc),
            attributes: LinkedHashMap::new(),
        }
    }

    /// Identity and lifecycle state.
    #[inline]
    pub fn writable(&self) -> &Writable {
        &self.writable
    }

    pub(crate) fn writable_mut(&mut self) -> &mut Writable {
        &mut self.writable
    }

    /// Stored value for `name`, if present.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name).map(Attribute::value)
    }

    /// Stored attribute for `name`, including its dirty flag.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Whether an attribute named `name` is stored.
    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Attribute names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.attributes.keys().map(String::as_str).collect()
    }

    /// Number of stored attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Whether no attributes are stored.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Store `value` under `name`, marking it dirty.
    pub(crate) fn set(&mut self, name: String, value: Value) {
        self.attributes.insert(name, Attribute::new(value));
    }

    /// Store `value` under `name` without marking it dirty.
    ///
    /// Used when repopulating from storage, where the stored state is the
    /// flushed state by definition.
    pub(crate) fn set_clean(&mut self, name: String, value: Value) {
        self.attributes.insert(name, Attribute::clean(value));
    }

    /// Store `value` under `name` only if nothing is stored there yet.
    pub(crate) fn set_default(&mut self, name: &str, value: Value) {
        if !self.attributes.contains_key(name) {
            self.attributes.insert(name.to_string(), Attribute::new(value));
        }
    }

    /// Mark every stored attribute dirty again.
    ///
    /// File-based series call this per output file, so that attributes
    /// already flushed into one file are flushed into the next as well.
    pub(crate) fn touch_all(&mut self) {
        for (_, attribute) in self.attributes.iter_mut() {
            attribute.dirty = true;
        }
    }

    /// Typed floating-point getter, exact on storage width.
    ///
    /// A value stored as `Float` comes back through `f32` only; asking
    /// for the other width is a type error, not a conversion.
    pub(crate) fn get_float<F: Floating>(&self, name: &str) -> Result<F> {
        let value = self
            .get(name)
            .ok_or_else(|| Error::Internal(format!("attribute `{name}` is not set")))?;
        F::from_value(value).ok_or_else(|| Error::WrongType {
            expected: F::LABEL.to_string(),
            actual: value.type_name().to_string(),
        })
    }

    /// Enqueue every dirty attribute as a write and flush immediately.
    ///
    /// Dirty flags clear only after the flush succeeds; a failed flush
    /// leaves them set so the next round retries the writes.
    pub(crate) fn flush_attributes(&mut self, handler: &mut IOHandler) -> Result<()> {
        let writable = &self.writable;
        let mut queued = false;
        for (name, attribute) in self.attributes.iter() {
            if !attribute.dirty {
                continue;
            }
            handler.enqueue(writable.task(Operation::WriteAttribute {
                name: name.clone(),
                value: attribute.value.clone(),
            }));
            queued = true;
        }
        if !queued {
            return Ok(());
        }
        handler.flush()?;
        for (_, attribute) in self.attributes.iter_mut() {
            attribute.dirty = false;
        }
        Ok(())
    }

    /// Flush a single attribute if it is stored and dirty.
    pub(crate) fn flush_attribute(&mut self, name: &str, handler: &mut IOHandler) -> Result<()> {
        let task = match self.attributes.get(name) {
            Some(attribute) if attribute.dirty => {
                self.writable.task(Operation::WriteAttribute {
                    name: name.to_string(),
                    value: attribute.value.clone(),
                })
            }
            _ => return Ok(()),
        };
        handler.dispatch(task)?;
        if let Some(attribute) = self.attributes.get_mut(name) {
            attribute.dirty = false;
        }
        Ok(())
    }

    /// Repopulate the store from the backend.
    ///
    /// Lists the attributes at this node's position, reads each one, and
    /// stores them clean in listing order. Marks the node written.
    pub(crate) fn read_attributes(&mut self, handler: &mut IOHandler) -> Result<()> {
        let mut outputs = handler.dispatch(self.writable.task(Operation::ListAttributes))?;
        let names = match outputs.pop() {
            Some(TaskOutput::Attributes(names)) => names,
            other => {
                return Err(Error::Internal(format!(
                    "unexpected output for LIST_ATTS: {other:?}"
                )))
            }
        };
        for name in &names {
            handler.enqueue(self.writable.task(Operation::ReadAttribute {
                name: name.clone(),
            }));
        }
        let outputs = handler.flush()?;
        if outputs.len() != names.len() {
            return Err(Error::Internal(format!(
                "attribute read returned {} outputs for {} reads",
                outputs.len(),
                names.len()
            )));
        }
        for (name, output) in names.into_iter().zip(outputs) {
            match output {
                TaskOutput::Attribute { value, .. } => self.set_clean(name, value),
                other => {
                    return Err(Error::Internal(format!(
                        "unexpected output for READ_ATT: {other:?}"
                    )))
                }
            }
        }
        self.writable.set_written(true);
        Ok(())
    }
}

// ============================================================================
// Attributed
// ============================================================================

/// Attribute access shared by every node in the hierarchy.
///
/// Implemented by the built-in node types; it cannot be implemented
/// outside the crate because the underlying state has no public
/// constructor.
pub trait Attributed {
    /// Shared node state.
    fn attributable(&self) -> &Attributable;

    /// Shared node state, mutably.
    fn attributable_mut(&mut self) -> &mut Attributable;

    /// Store `value` under `name`, marking it for the next flush.
    fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributable_mut().set(name.into(), value.into());
    }

    /// Stored value for `name`, if present.
    fn get_attribute(&self, name: &str) -> Option<&Value> {
        self.attributable().get(name)
    }

    /// Whether an attribute named `name` is stored.
    fn contains_attribute(&self, name: &str) -> bool {
        self.attributable().contains(name)
    }

    /// Attribute names in insertion order.
    fn attribute_names(&self) -> Vec<&str> {
        self.attributable().names()
    }

    /// Whether this node has a backend object behind it.
    fn written(&self) -> bool {
        self.attributable().writable().written()
    }
}

impl Attributed for Attributable {
    fn attributable(&self) -> &Attributable {
        self
    }

    fn attributable_mut(&mut self) -> &mut Attributable {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openpmd_backend::{Backend, IOTask, MemoryBackend};

    fn handler() -> (IOHandler, MemoryBackend) {
        let backend = MemoryBackend::new();
        let observer = backend.clone();
        (IOHandler::new(Box::new(backend)), observer)
    }

    fn rooted(alloc: &NodeAllocator, handler: &mut IOHandler) -> Attributable {
        let mut a = Attributable::new(alloc);
        handler
            .dispatch(IOTask::new(
                a.writable().id(),
                None,
                Operation::CreateFile {
                    name: "run.h5".into(),
                },
            ))
            .unwrap();
        a.writable_mut().set_written(true);
        a
    }

    #[test]
    fn test_set_marks_dirty_and_set_clean_does_not() {
        let alloc = NodeAllocator::new();
        let mut a = Attributable::new(&alloc);
        a.set("openPMD".into(), Value::String("1.0.1".into()));
        a.set_clean("basePath".into(), Value::String("/data/%T/".into()));
        assert!(a.attribute("openPMD").unwrap().dirty());
        assert!(!a.attribute("basePath").unwrap().dirty());
        assert_eq!(a.names(), vec!["openPMD", "basePath"]);
    }

    #[test]
    fn test_set_default_leaves_existing_value() {
        let alloc = NodeAllocator::new();
        let mut a = Attributable::new(&alloc);
        a.set("meshesPath".into(), Value::String("fields/".into()));
        a.set_default("meshesPath", Value::String("meshes/".into()));
        a.set_default("particlesPath", Value::String("particles/".into()));
        assert_eq!(
            a.get("meshesPath"),
            Some(&Value::String("fields/".into()))
        );
        assert_eq!(
            a.get("particlesPath"),
            Some(&Value::String("particles/".into()))
        );
    }

    #[test]
    fn test_flush_writes_only_dirty_attributes() {
        let (mut h, observer) = handler();
        let alloc = NodeAllocator::new();
        let mut a = rooted(&alloc, &mut h);

        a.set("iterationEncoding".into(), Value::String("groupBased".into()));
        a.set_clean("stale".into(), Value::Bool(true));
        a.flush_attributes(&mut h).unwrap();

        assert_eq!(
            observer.attribute("run.h5", "", "iterationEncoding"),
            Some(Value::String("groupBased".into()))
        );
        assert_eq!(observer.attribute("run.h5", "", "stale"), None);
        assert!(!a.attribute("iterationEncoding").unwrap().dirty());

        // A second flush has nothing to write.
        let before = h.metrics().attributes_written;
        a.flush_attributes(&mut h).unwrap();
        assert_eq!(h.metrics().attributes_written, before);
    }

    #[test]
    fn test_touch_all_redirties_flushed_attributes() {
        let (mut h, _observer) = handler();
        let alloc = NodeAllocator::new();
        let mut a = rooted(&alloc, &mut h);
        a.set("openPMD".into(), Value::String("1.0.1".into()));
        a.flush_attributes(&mut h).unwrap();
        assert!(!a.attribute("openPMD").unwrap().dirty());
        a.touch_all();
        assert!(a.attribute("openPMD").unwrap().dirty());
    }

    #[test]
    fn test_flush_single_attribute_respects_dirty_flag() {
        let (mut h, observer) = handler();
        let alloc = NodeAllocator::new();
        let mut a = rooted(&alloc, &mut h);
        a.set("meshesPath".into(), Value::String("meshes/".into()));
        a.set("particlesPath".into(), Value::String("particles/".into()));

        a.flush_attribute("meshesPath", &mut h).unwrap();
        assert_eq!(
            observer.attribute("run.h5", "", "meshesPath"),
            Some(Value::String("meshes/".into()))
        );
        assert_eq!(observer.attribute("run.h5", "", "particlesPath"), None);

        // Clean now, so flushing again writes nothing.
        let before = h.metrics().attributes_written;
        a.flush_attribute("meshesPath", &mut h).unwrap();
        assert_eq!(h.metrics().attributes_written, before);

        // Absent names are a no-op.
        a.flush_attribute("missing", &mut h).unwrap();
    }

    #[test]
    fn test_read_attributes_repopulates_clean_in_listing_order() {
        let mut seed = MemoryBackend::new();
        let file = seed.create_file("run.h5").unwrap();
        seed.write_attribute(file, "openPMD", &Value::String("1.0.1".into()))
            .unwrap();
        seed.write_attribute(file, "openPMDextension", &Value::Uint32(0))
            .unwrap();
        let mut h2 = IOHandler::new(Box::new(seed));

        let alloc = NodeAllocator::new();
        let mut a = Attributable::new(&alloc);
        h2.dispatch(IOTask::new(
            a.writable().id(),
            None,
            Operation::OpenFile {
                name: "run.h5".into(),
            },
        ))
        .unwrap();
        a.read_attributes(&mut h2).unwrap();

        assert_eq!(a.names(), vec!["openPMD", "openPMDextension"]);
        assert!(!a.attribute("openPMD").unwrap().dirty());
        assert!(a.writable().written());
    }

    #[test]
    fn test_typed_float_getter_is_width_exact() {
        let alloc = NodeAllocator::new();
        let mut a = Attributable::new(&alloc);
        a.set("time".into(), Value::Float(0.5));
        assert_eq!(a.get_float::<f32>("time").unwrap(), 0.5f32);
        let err = a.get_float::<f64>("time").unwrap_err();
        assert!(matches!(err, Error::WrongType { .. }));
    }
}
