//! Particle patches: per-patch bookkeeping for chunked particle data.
//!
//! A species may carve its particles into patches, each described by
//! `numParticles`, `numParticlesOffset` and per-axis `offset` and
//! `extent` records. The two counters are scalar records stored as bare
//! datasets directly under the `particlePatches` group.

use openpmd_backend::NodeId;
use openpmd_core::{unit_dimension_array, UnitDimension, Value};

use crate::attributable::{Attributable, Attributed};
use crate::container::Container;
use crate::context::{FlushContext, ReadContext};
use crate::error::Result;
use crate::record::BaseRecord;
use crate::record_component::RecordComponent;
use crate::writable::{Node, NodeAllocator};

// ============================================================================
// PatchRecord
// ============================================================================

/// One record describing particle patches, e.g. `offset` or
/// `numParticles`.
#[derive(Debug)]
pub struct PatchRecord {
    base: BaseRecord,
}

impl PatchRecord {
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
            .and_then(Value::as_arr_double7)
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
}

impl Attributed for PatchRecord {
    fn attributable(&self) -> &Attributable {
        self.base.attributable()
    }

    fn attributable_mut(&mut self) -> &mut Attributable {
        self.base.attributable_mut()
    }
}

impl Node for PatchRecord {
    fn fresh(alloc: &NodeAllocator) -> Self {
        PatchRecord {
            base: BaseRecord::fresh(alloc),
        }
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

// ============================================================================
// ParticlePatches
// ============================================================================

/// The `particlePatches` group of one species.
#[derive(Debug)]
pub struct ParticlePatches {
    records: Container<PatchRecord>,
}

impl ParticlePatches {
    pub(crate) fn fresh(alloc: &NodeAllocator) -> Self {
        ParticlePatches {
            records: Container::new(alloc),
        }
    }

    pub(crate) fn attach(&mut self, parent: NodeId) {
        self.records.attach(parent);
    }

    /// Number of patch records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no patch records exist.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether a patch record is stored under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.records.contains(name)
    }

    /// The patch record `name`, created on first access.
    pub fn record(&mut self, name: impl Into<String>) -> &mut PatchRecord {
        let (record, _) = self.records.get_or_create(name.into());
        record
    }

    /// The patch record stored under `name`, if any.
    pub fn get_record(&self, name: &str) -> Option<&PatchRecord> {
        self.records.get(name)
    }

    /// Patch records in insertion order.
    pub fn records(&self) -> impl Iterator<Item = (&String, &PatchRecord)> {
        self.records.iter()
    }

    /// Remove the patch record stored under `name` if it is not persisted.
    pub fn remove_record(&mut self, name: &str) -> Result<Option<PatchRecord>> {
        self.records.remove(name)
    }

    pub(crate) fn flush(&mut self, name: &str, cx: &mut FlushContext<'_>) -> Result<()> {
        self.records.flush(name, cx)
    }

    /// Repopulate from storage. The group's position is already bound.
    ///
    /// Sub-groups are patch records; datasets are the two patch counters
    /// stored scalar, and any other dataset name is a format violation.
    pub(crate) fn read(&mut self, cx: &mut ReadContext<'_>) -> Result<()> {
        self.records
            .attributable_mut()
            .read_attributes(cx.handler)?;

        let paths = cx.list_paths(self.records.attributable().writable())?;
        for name in paths {
            let (record, _) = self.records.get_or_create(name.clone());
            cx.open_path(record.attributable().writable(), &name)?;
            let mark = cx.enter(&name);
            let result = record.read_node(cx);
            cx.exit(mark);
            result?;
        }

        let datasets = cx.list_datasets(self.records.attributable().writable())?;
        for name in datasets {
            if name != "numParticles" && name != "numParticlesOffset" {
                return Err(cx.format_violation(format!(
                    "unexpected dataset `{name}` among particle patches"
                )));
            }
            let (record, _) = self.records.get_or_create(name.clone());
            let mark = cx.enter(&name);
            let result = record.base.read_as_scalar_dataset(&name, cx);
            cx.exit(mark);
            result?;
        }
        Ok(())
    }
}

impl Attributed for ParticlePatches {
    fn attributable(&self) -> &Attributable {
        self.records.attributable()
    }

    fn attributable_mut(&mut self) -> &mut Attributable {
        self.records.attributable_mut()
    }
}
