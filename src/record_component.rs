//! Record components: the dataset-shaped leaves of the hierarchy.

use openpmd_backend::{NodeId, Operation};
use openpmd_core::{Dataset, Value};

use crate::attributable::{Attributable, Attributed};
use crate::context::{FlushContext, ReadContext};
use crate::error::{Error, Result};
use crate::writable::{Node, NodeAllocator};

/// Key under which a record stores its lone component when the record is
/// scalar. The vertical tab keeps it from colliding with any name a
/// backend could store.
pub const SCALAR: &str = "\u{B}Scalar";

/// One component of a record.
///
/// A component either maps to a dataset in storage or is marked constant,
/// in which case a single value plus the logical shape stand in for the
/// whole dataset: the component persists as a group carrying `value` and
/// `shape` attributes instead of a dataset.
#[derive(Debug)]
pub struct RecordComponent {
    node: Attributable,
    dataset: Option<Dataset>,
    constant: Option<Value>,
}

impl RecordComponent {
    /// Declare the shape and type of the component's data.
    ///
    /// Must happen before the component is marked constant and cannot
    /// happen once the component is persisted.
    pub fn reset_dataset(&mut self, dataset: Dataset) -> Result<()> {
        if self.written() {
            return Err(Error::Logic(
                "the dataset of a persisted component cannot be redefined".to_string(),
            ));
        }
        if let Some(constant) = &self.constant {
            if constant.datatype() != dataset.dtype {
                return Err(Error::WrongType {
                    expected: constant.datatype().to_string(),
                    actual: dataset.dtype.to_string(),
                });
            }
        }
        self.dataset = Some(dataset);
        Ok(())
    }

    /// Mark the component constant: every cell of its logical extent
    /// holds `value`.
    ///
    /// Requires a prior [`RecordComponent::reset_dataset`] whose type
    /// matches the value's type.
    pub fn make_constant(&mut self, value: impl Into<Value>) -> Result<()> {
        if self.written() {
            return Err(Error::Logic(
                "a persisted component cannot be made constant".to_string(),
            ));
        }
        let value = value.into();
        let dataset = self.dataset.as_ref().ok_or_else(|| {
            Error::Logic("declare the dataset before marking a component constant".to_string())
        })?;
        if value.datatype() != dataset.dtype {
            return Err(Error::WrongType {
                expected: dataset.dtype.to_string(),
                actual: value.datatype().to_string(),
            });
        }
        self.constant = Some(value);
        Ok(())
    }

    /// The constant value, if any.
    pub fn constant(&self) -> Option<&Value> {
        self.constant.as_ref()
    }

    /// Whether the component is constant.
    pub fn is_constant(&self) -> bool {
        self.constant.is_some()
    }

    /// The declared dataset, if any.
    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    /// Conversion factor to SI units.
    pub fn unit_si(&self) -> f64 {
        self.node
            .get("unitSI")
            .and_then(Value::as_double)
            .unwrap_or(1.0)
    }

    /// Set the conversion factor to SI units.
    pub fn set_unit_si(&mut self, unit_si: f64) {
        self.set_attribute("unitSI", unit_si);
    }

    /// Position of the component on the grid, in cell fractions.
    ///
    /// Meaningful for mesh components; particle components carry none.
    pub fn position(&self) -> Option<&[f64]> {
        self.node.get("position").and_then(Value::as_vec_double)
    }

    /// Set the in-cell position of the component.
    pub fn set_position(&mut self, position: Vec<f64>) {
        self.set_attribute("position", position);
    }

    /// Adopt a descriptor recovered from storage.
    pub(crate) fn set_descriptor(&mut self, dataset: Dataset) {
        self.dataset = Some(dataset);
    }

    pub(crate) fn mark_written(&mut self) {
        self.node.writable_mut().set_written(true);
    }
}

impl Attributed for RecordComponent {
    fn attributable(&self) -> &Attributable {
        &self.node
    }

    fn attributable_mut(&mut self) -> &mut Attributable {
        &mut self.node
    }
}

impl Node for RecordComponent {
    fn fresh(alloc: &NodeAllocator) -> Self {
        let mut component = RecordComponent {
            node: Attributable::new(alloc),
            dataset: None,
            constant: None,
        };
        component.set_unit_si(1.0);
        component
    }

    fn attach(&mut self, parent: NodeId) {
        self.node.writable_mut().set_parent(parent);
    }

    fn flush_node(&mut self, name: &str, cx: &mut FlushContext<'_>) -> Result<()> {
        if !self.written() {
            let (value, dataset) = match (&self.constant, &self.dataset) {
                (Some(value), Some(dataset)) => (value.clone(), dataset.clone()),
                (Some(_), None) => {
                    return Err(Error::Internal(
                        "constant component without a dataset".to_string(),
                    ))
                }
                (None, _) => {
                    return Err(Error::Logic(format!(
                        "cannot persist component at {}: writing dataset payloads is not \
                         supported, only constant components",
                        cx.location()
                    )))
                }
            };
            let task = self.node.writable().task(Operation::CreatePath {
                path: name.to_string(),
            });
            cx.run(task)?;
            self.node.writable_mut().set_written(true);
            self.node.set("value".to_string(), value);
            self.node
                .set("shape".to_string(), Value::VecUint64(dataset.extent));
        }
        self.node.flush_attributes(cx.handler)
    }

    fn read_node(&mut self, cx: &mut ReadContext<'_>) -> Result<()> {
        if self.dataset.is_none() {
            // No dataset was found here, so the component has to be
            // constant: value and shape reconstruct the descriptor.
            let (_, value) = cx.read_attribute(self.node.writable(), "value")?;
            let (_, shape) = cx.read_attribute(self.node.writable(), "shape")?;
            let extent = shape.as_vec_uint64().map(<[u64]>::to_vec).ok_or_else(|| {
                cx.format_violation(format!(
                    "constant shape has type {}, expected VecUint64",
                    shape.type_name()
                ))
            })?;
            self.dataset = Some(Dataset::new(value.datatype(), extent));
            self.constant = Some(value);
        }
        self.node.read_attributes(cx.handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ReadScope, SeriesScope};
    use openpmd_backend::{Backend, IOHandler, MemoryBackend};
    use openpmd_core::Datatype;

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
    fn test_fresh_component_defaults_unit_si() {
        let alloc = NodeAllocator::new();
        let c = RecordComponent::fresh(&alloc);
        assert_eq!(c.unit_si(), 1.0);
        assert!(!c.is_constant());
        assert!(c.dataset().is_none());
    }

    #[test]
    fn test_make_constant_requires_matching_dataset() {
        let alloc = NodeAllocator::new();
        let mut c = RecordComponent::fresh(&alloc);

        // No dataset declared yet.
        assert!(c.make_constant(1.0f64).unwrap_err().is_logic());

        c.reset_dataset(Dataset::new(Datatype::Double, vec![16, 16])).unwrap();
        assert!(matches!(
            c.make_constant(3i32),
            Err(Error::WrongType { .. })
        ));

        c.make_constant(42.0f64).unwrap();
        assert_eq!(c.constant(), Some(&Value::Double(42.0)));
    }

    #[test]
    fn test_redefinition_locks_after_persistence() {
        let alloc = NodeAllocator::new();
        let mut c = RecordComponent::fresh(&alloc);
        c.reset_dataset(Dataset::new(Datatype::Double, vec![4])).unwrap();
        c.make_constant(1.5f64).unwrap();
        c.mark_written();
        assert!(c
            .reset_dataset(Dataset::new(Datatype::Double, vec![8]))
            .unwrap_err()
            .is_logic());
        assert!(c.make_constant(2.5f64).unwrap_err().is_logic());
    }

    #[test]
    fn test_constant_component_persists_value_and_shape() {
        let (mut h, observer) = handler();
        let alloc = NodeAllocator::new();
        let mut root = file_rooted(&alloc, &mut h);
        let root_id = root.writable().id();

        let mut c = RecordComponent::fresh(&alloc);
        c.attach(root_id);
        c.reset_dataset(Dataset::new(Datatype::Double, vec![16, 16])).unwrap();
        c.make_constant(42.0f64).unwrap();

        let iterations_id = root_id;
        let mut cx = FlushContext::new(
            &mut h,
            SeriesScope {
                filename: "run.h5",
                root: &mut root,
                iterations_id,
            },
        );
        c.flush_node("rho", &mut cx).unwrap();

        assert!(observer.has_group("run.h5", "rho"));
        assert_eq!(
            observer.attribute("run.h5", "rho", "value"),
            Some(Value::Double(42.0))
        );
        assert_eq!(
            observer.attribute("run.h5", "rho", "shape"),
            Some(Value::VecUint64(vec![16, 16]))
        );
        assert_eq!(
            observer.attribute("run.h5", "rho", "unitSI"),
            Some(Value::Double(1.0))
        );
    }

    #[test]
    fn test_non_constant_component_cannot_flush() {
        let (mut h, _observer) = handler();
        let alloc = NodeAllocator::new();
        let mut root = file_rooted(&alloc, &mut h);
        let root_id = root.writable().id();

        let mut c = RecordComponent::fresh(&alloc);
        c.attach(root_id);
        c.reset_dataset(Dataset::new(Datatype::Double, vec![16])).unwrap();

        let mut cx = FlushContext::new(
            &mut h,
            SeriesScope {
                filename: "run.h5",
                root: &mut root,
                iterations_id: root_id,
            },
        );
        let err = c.flush_node("rho", &mut cx).unwrap_err();
        assert!(err.is_logic());
    }

    #[test]
    fn test_read_reconstructs_constant_from_value_and_shape() {
        let mut seed = MemoryBackend::new();
        let at = seed.create_file("run.h5").unwrap();
        let rho = seed.create_path(at, "rho").unwrap();
        seed.write_attribute(rho, "value", &Value::Double(42.0)).unwrap();
        seed.write_attribute(rho, "shape", &Value::VecUint64(vec![16, 16]))
            .unwrap();
        seed.write_attribute(rho, "unitSI", &Value::Double(2.0)).unwrap();
        let mut h = IOHandler::new(Box::new(seed));

        let alloc = NodeAllocator::new();
        let root = Attributable::new(&alloc);
        let file = Attributable::new(&alloc);
        h.dispatch(file.writable().task(Operation::OpenFile {
            name: "run.h5".into(),
        }))
        .unwrap();

        let mut c = RecordComponent::fresh(&alloc);
        c.attach(file.writable().id());
        h.dispatch(c.attributable().writable().task(Operation::OpenPath {
            path: "rho".into(),
        }))
        .unwrap();

        let mut cx = ReadContext::new(&mut h, ReadScope { root: &root });
        c.read_node(&mut cx).unwrap();

        assert!(c.is_constant());
        assert_eq!(c.constant(), Some(&Value::Double(42.0)));
        assert_eq!(
            c.dataset(),
            Some(&Dataset::new(Datatype::Double, vec![16, 16]))
        );
        assert_eq!(c.unit_si(), 2.0);
        assert!(c.written());
    }
}
