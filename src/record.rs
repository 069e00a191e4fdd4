//! Records: named collections of components sharing physics metadata.
//!
//! A record is not a node that happens to contain components; the record
//! and its component container are one node. A scalar record goes one
//! step further and shares its backend object with its lone component:
//! the component persists under the record's own name and the record's
//! attributes land next to the component's.

use openpmd_backend::NodeId;
use openpmd_core::{unit_dimension_array, Floating, UnitDimension};

use crate::attributable::{Attributable, Attributed};
use crate::container::Container;
use crate::context::{FlushContext, ReadContext};
use crate::error::{Error, Result};
use crate::record_component::{RecordComponent, SCALAR};
use crate::writable::{Node, NodeAllocator};

// ============================================================================
// BaseRecord
// ============================================================================

/// Common record behavior behind [`crate::Mesh`], [`Record`] and
/// [`crate::PatchRecord`].
#[derive(Debug)]
pub(crate) struct BaseRecord {
    components: Container<RecordComponent>,
}

impl BaseRecord {
    pub(crate) fn fresh(alloc: &NodeAllocator) -> Self {
        let mut base = BaseRecord {
            components: Container::new(alloc),
        };
        base.components
            .attributable_mut()
            .set("unitDimension".to_string(), [0.0f64; 7].into());
        base
    }

    pub(crate) fn attach(&mut self, parent: NodeId) {
        self.components.attach(parent);
    }

    pub(crate) fn attributable(&self) -> &Attributable {
        self.components.attributable()
    }

    pub(crate) fn attributable_mut(&mut self) -> &mut Attributable {
        self.components.attributable_mut()
    }

    /// Whether the record stores its data as a single anonymous component.
    pub(crate) fn is_scalar(&self) -> bool {
        self.components.contains(SCALAR)
    }

    pub(crate) fn len(&self) -> usize {
        self.components.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub(crate) fn get(&self, name: &str) -> Option<&RecordComponent> {
        self.components.get(name)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&String, &RecordComponent)> {
        self.components.iter()
    }

    /// The named component `name`, created on first access, with a flag
    /// reporting whether this call created it.
    ///
    /// Named components and the scalar component are mutually exclusive.
    pub(crate) fn component(&mut self, name: String) -> Result<(&mut RecordComponent, bool)> {
        if name == SCALAR {
            return Err(Error::Logic(
                "the scalar component is reached through the scalar accessor".to_string(),
            ));
        }
        if self.is_scalar() {
            return Err(Error::Logic(format!(
                "record holds a scalar component; named component `{name}` cannot coexist"
            )));
        }
        Ok(self.components.get_or_create(name))
    }

    /// The scalar component, created on first access, with a flag
    /// reporting whether this call created it.
    pub(crate) fn scalar(&mut self) -> Result<(&mut RecordComponent, bool)> {
        if !self.is_empty() && !self.is_scalar() {
            return Err(Error::Logic(
                "record holds named components; a scalar component cannot coexist".to_string(),
            ));
        }
        Ok(self.components.get_or_create(SCALAR.to_string()))
    }

    pub(crate) fn remove(&mut self, name: &str) -> Result<Option<RecordComponent>> {
        self.components.remove(name)
    }

    /// Persist the record under `name`.
    ///
    /// A scalar record flushes its component under the record's own name
    /// and then adopts the component's backend position, so the record's
    /// attributes land at the same location. A non-scalar record is an
    /// ordinary group of named components.
    pub(crate) fn flush(&mut self, name: &str, cx: &mut FlushContext<'_>) -> Result<()> {
        if !self.written() && self.is_empty() {
            return Err(Error::Logic(format!(
                "record `{name}` cannot be persisted without components"
            )));
        }
        if self.is_scalar() {
            let record_id = self.components.attributable().writable().id();
            let record_parent = self
                .components
                .attributable()
                .writable()
                .parent()
                .ok_or_else(|| Error::Internal("flushing a detached record".to_string()))?;
            if let Some(component) = self.components.get_mut(SCALAR) {
                component.attach(record_parent);
                component.flush_node(name, cx)?;
                let component_id = component.attributable().writable().id();
                cx.handler.adopt_position(record_id, component_id)?;
            }
            self.components.attributable_mut().writable_mut().set_written(true);
            self.components.attributable_mut().flush_attributes(cx.handler)
        } else {
            self.components.flush(name, cx)
        }
    }

    /// Repopulate the record from storage. Its position is already bound.
    pub(crate) fn read(&mut self, cx: &mut ReadContext<'_>) -> Result<()> {
        if self.is_scalar() {
            if let Some(component) = self.components.get_mut(SCALAR) {
                component.read_node(cx)?;
            }
        } else {
            // Sub-groups hold constant components, datasets the rest.
            let writable_paths = cx.list_paths(self.components.attributable().writable())?;
            for name in writable_paths {
                let (component, _) = self.components.get_or_create(name.clone());
                cx.open_path(component.attributable().writable(), &name)?;
                let mark = cx.enter(&name);
                let result = component.read_node(cx);
                cx.exit(mark);
                result?;
            }
            let datasets = cx.list_datasets(self.components.attributable().writable())?;
            for name in datasets {
                let (component, _) = self.components.get_or_create(name.clone());
                let descriptor = cx.open_dataset(component.attributable().writable(), &name)?;
                component.set_descriptor(descriptor);
                component.mark_written();
                let mark = cx.enter(&name);
                let result = component.read_node(cx);
                cx.exit(mark);
                result?;
            }
        }
        self.components.attributable_mut().read_attributes(cx.handler)
    }

    /// Repopulate a scalar record stored as a bare dataset under its
    /// parent group.
    ///
    /// Binds the record to the dataset, re-parents the scalar component
    /// beside it and binds it to the same dataset, then reads as usual.
    pub(crate) fn read_as_scalar_dataset(
        &mut self,
        name: &str,
        cx: &mut ReadContext<'_>,
    ) -> Result<()> {
        let record_parent = self
            .components
            .attributable()
            .writable()
            .parent()
            .ok_or_else(|| Error::Internal("reading a detached record".to_string()))?;
        cx.open_dataset(self.components.attributable().writable(), name)?;
        self.components.attributable_mut().writable_mut().set_written(true);

        let (component, _) = self.components.get_or_create(SCALAR.to_string());
        component.attach(record_parent);
        let descriptor = cx.open_dataset(component.attributable().writable(), name)?;
        component.set_descriptor(descriptor);
        component.mark_written();

        self.read(cx)
    }

    /// Repopulate after the caller listed this record's attributes.
    ///
    /// A record group carrying both `value` and `shape` is a constant
    /// scalar record: the scalar component is re-parented beside the
    /// record and bound to the same group before the ordinary read.
    pub(crate) fn read_with_attribute_hint(
        &mut self,
        name: &str,
        listed: &[String],
        cx: &mut ReadContext<'_>,
    ) -> Result<()> {
        let constant = listed.iter().any(|a| a == "value") && listed.iter().any(|a| a == "shape");
        if constant {
            let record_parent = self
                .components
                .attributable()
                .writable()
                .parent()
                .ok_or_else(|| Error::Internal("reading a detached record".to_string()))?;
            let (component, _) = self.components.get_or_create(SCALAR.to_string());
            component.attach(record_parent);
            cx.open_path(component.attributable().writable(), name)?;
        }
        self.read(cx)
    }

    fn written(&self) -> bool {
        self.components.attributable().writable().written()
    }
}

// ============================================================================
// Record
// ============================================================================

/// A particle record, e.g. `momentum` or `charge`.
#[derive(Debug)]
pub struct Record {
    base: BaseRecord,
}

impl Record {
    /// Whether the record stores its data as a single anonymous component.
    pub fn is_scalar(&self) -> bool {
        self.base.is_scalar()
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.base.len()
    }

    /// Whether the record has no components.
    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    /// The named component `name`, created on first access.
    pub fn component(&mut self, name: impl Into<String>) -> Result<&mut RecordComponent> {
        let (component, _) = self.base.component(name.into())?;
        Ok(component)
    }

    /// The scalar component, created on first access.
    pub fn scalar(&mut self) -> Result<&mut RecordComponent> {
        let (component, _) = self.base.scalar()?;
        Ok(component)
    }

    /// The component stored under `name`, if any.
    pub fn get_component(&self, name: &str) -> Option<&RecordComponent> {
        self.base.get(name)
    }

    /// Components in insertion order.
    pub fn components(&self) -> impl Iterator<Item = (&String, &RecordComponent)> {
        self.base.iter()
    }

    /// Remove the component stored under `name` if it is not persisted.
    pub fn remove_component(&mut self, name: &str) -> Result<Option<RecordComponent>> {
        self.base.remove(name)
    }

    /// Powers of the seven SI base measures describing the record's unit.
    pub fn unit_dimension(&self) -> [f64; 7] {
        self.base
            .attributable()
            .get("unitDimension")
            .and_then(openpmd_core::Value::as_arr_double7)
            .copied()
            .unwrap_or([0.0; 7])
    }

    /// Set the record's unit dimension from per-measure exponents.
    pub fn set_unit_dimension(
        &mut self,
        dimensions: impl IntoIterator<Item = (UnitDimension, f64)>,
    ) {
        self.set_attribute("unitDimension", unit_dimension_array(dimensions));
    }

    /// Offset of the record within its iteration's time step, exact on
    /// the stored floating-point width.
    pub fn time_offset<F: Floating>(&self) -> Result<F> {
        self.base.attributable().get_float("timeOffset")
    }

    /// Set the record's in-step time offset.
    pub fn set_time_offset<F: Floating>(&mut self, time_offset: F) {
        self.set_attribute("timeOffset", time_offset.into_value());
    }

    pub(crate) fn read_as_scalar_dataset(
        &mut self,
        name: &str,
        cx: &mut ReadContext<'_>,
    ) -> Result<()> {
        self.base.read_as_scalar_dataset(name, cx)
    }
}

impl Attributed for Record {
    fn attributable(&self) -> &Attributable {
        self.base.attributable()
    }

    fn attributable_mut(&mut self) -> &mut Attributable {
        self.base.attributable_mut()
    }
}

impl Node for Record {
    fn fresh(alloc: &NodeAllocator) -> Self {
        let mut record = Record {
            base: BaseRecord::fresh(alloc),
        };
        record.set_time_offset(0.0f32);
        record
    }

    fn attach(&mut self, parent: NodeId) {
        self.base.attach(parent);
    }

    fn flush_node(&mut self, name: &str, cx: &mut FlushContext<'_>) -> Result<()> {
        self.base.flush(name, cx)
    }

    fn read_node(&mut self, cx: &mut ReadContext<'_>) -> Result<()> {
        self.base.read(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SeriesScope;
    use openpmd_backend::{IOHandler, MemoryBackend, Operation};
    use openpmd_core::{Dataset, Datatype, Value};

    fn handler() -> (IOHandler, MemoryBackend) {
        let backend = MemoryBackend::new();
        let observer = backend.clone();
        (IOHandler::new(Box::new(backend)), observer)
    }

    fn file_rooted(alloc: &NodeAllocator, handler: &mut IOHandler) -> Attributable {
        let mut root = Attributable::new(alloc);
        handler
            .dispatch(root.writable().task(Operation::CreateFile {
                name: "run.h5".into(),
            }))
            .unwrap();
        root.writable_mut().set_written(true);
        root
    }

    #[test]
    fn test_scalar_and_named_components_exclude_each_other() {
        let alloc = NodeAllocator::new();
        let mut r = Record::fresh(&alloc);
        r.scalar().unwrap();
        assert!(r.component("x").unwrap_err().is_logic());

        let mut r = Record::fresh(&alloc);
        r.component("x").unwrap();
        assert!(r.scalar().unwrap_err().is_logic());
    }

    #[test]
    fn test_empty_record_cannot_flush() {
        let (mut h, _observer) = handler();
        let alloc = NodeAllocator::new();
        let mut root = file_rooted(&alloc, &mut h);
        let root_id = root.writable().id();

        let mut r = Record::fresh(&alloc);
        r.attach(root_id);
        let mut cx = FlushContext::new(
            &mut h,
            SeriesScope {
                filename: "run.h5",
                root: &mut root,
                iterations_id: root_id,
            },
        );
        assert!(r.flush_node("charge", &mut cx).unwrap_err().is_logic());
    }

    #[test]
    fn test_scalar_record_shares_its_component_location() {
        let (mut h, observer) = handler();
        let alloc = NodeAllocator::new();
        let mut root = file_rooted(&alloc, &mut h);
        let root_id = root.writable().id();

        let mut r = Record::fresh(&alloc);
        r.attach(root_id);
        r.set_unit_dimension([(UnitDimension::I, 1.0), (UnitDimension::T, 1.0)]);
        {
            let c = r.scalar().unwrap();
            c.reset_dataset(Dataset::new(Datatype::Double, vec![128])).unwrap();
            c.make_constant(1.602e-19f64).unwrap();
        }

        let mut cx = FlushContext::new(
            &mut h,
            SeriesScope {
                filename: "run.h5",
                root: &mut root,
                iterations_id: root_id,
            },
        );
        r.flush_node("charge", &mut cx).unwrap();

        // One group holds the component's value and the record's
        // metadata side by side.
        assert!(observer.has_group("run.h5", "charge"));
        assert_eq!(
            observer.attribute("run.h5", "charge", "value"),
            Some(Value::Double(1.602e-19))
        );
        assert_eq!(
            observer.attribute("run.h5", "charge", "shape"),
            Some(Value::VecUint64(vec![128]))
        );
        let dims = observer.attribute("run.h5", "charge", "unitDimension");
        assert_eq!(
            dims,
            Some(Value::ArrDouble7([0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0]))
        );
        assert_eq!(
            observer.attribute("run.h5", "charge", "timeOffset"),
            Some(Value::Float(0.0))
        );
        assert!(r.written());
    }

    #[test]
    fn test_named_components_flush_as_subgroups() {
        let (mut h, observer) = handler();
        let alloc = NodeAllocator::new();
        let mut root = file_rooted(&alloc, &mut h);
        let root_id = root.writable().id();

        let mut r = Record::fresh(&alloc);
        r.attach(root_id);
        for (name, value) in [("x", 0.1f64), ("y", 0.2f64)] {
            let c = r.component(name).unwrap();
            c.reset_dataset(Dataset::new(Datatype::Double, vec![64])).unwrap();
            c.make_constant(value).unwrap();
        }

        let mut cx = FlushContext::new(
            &mut h,
            SeriesScope {
                filename: "run.h5",
                root: &mut root,
                iterations_id: root_id,
            },
        );
        r.flush_node("momentum", &mut cx).unwrap();

        assert_eq!(
            observer.group_names("run.h5", "momentum"),
            Some(vec!["x".to_string(), "y".to_string()])
        );
        assert_eq!(
            observer.attribute("run.h5", "momentum/x", "value"),
            Some(Value::Double(0.1))
        );
        assert_eq!(
            observer.attribute("run.h5", "momentum", "timeOffset"),
            Some(Value::Float(0.0))
        );
    }

    #[test]
    fn test_time_offset_is_width_exact() {
        let alloc = NodeAllocator::new();
        let mut r = Record::fresh(&alloc);
        assert_eq!(r.time_offset::<f32>().unwrap(), 0.0f32);
        assert!(matches!(
            r.time_offset::<f64>(),
            Err(Error::WrongType { .. })
        ));

        r.set_time_offset(0.25f64);
        assert_eq!(r.time_offset::<f64>().unwrap(), 0.25);
        assert!(r.time_offset::<f32>().is_err());
    }
}
