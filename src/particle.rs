//! Particle species: named groups of particle records.

use openpmd_backend::NodeId;

use crate::attributable::{Attributable, Attributed};
use crate::container::Container;
use crate::context::{FlushContext, ReadContext};
use crate::error::Result;
use crate::patches::ParticlePatches;
use crate::record::Record;
use crate::writable::{Node, NodeAllocator};

/// One particle species, e.g. `electrons`.
///
/// The species is a container of [`Record`]s and additionally owns the
/// `particlePatches` group. Scalar records persist as bare datasets
/// directly under the species group; reading recovers them from the
/// dataset listing rather than the path listing.
#[derive(Debug)]
pub struct ParticleSpecies {
    records: Container<Record>,
    patches: ParticlePatches,
}

impl ParticleSpecies {
    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the species has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether a record is stored under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.records.contains(name)
    }

    /// The record `name`, created on first access.
    pub fn record(&mut self, name: impl Into<String>) -> &mut Record {
        let (record, _) = self.records.get_or_create(name.into());
        record
    }

    /// The record stored under `name`, if any.
    pub fn get_record(&self, name: &str) -> Option<&Record> {
        self.records.get(name)
    }

    /// Records in insertion order.
    pub fn records(&self) -> impl Iterator<Item = (&String, &Record)> {
        self.records.iter()
    }

    /// Remove the record stored under `name` if it is not persisted.
    pub fn remove_record(&mut self, name: &str) -> Result<Option<Record>> {
        self.records.remove(name)
    }

    /// The per-patch bookkeeping of this species.
    pub fn particle_patches(&self) -> &ParticlePatches {
        &self.patches
    }

    /// The per-patch bookkeeping of this species, mutably.
    pub fn particle_patches_mut(&mut self) -> &mut ParticlePatches {
        &mut self.patches
    }
}

impl Attributed for ParticleSpecies {
    fn attributable(&self) -> &Attributable {
        self.records.attributable()
    }

    fn attributable_mut(&mut self) -> &mut Attributable {
        self.records.attributable_mut()
    }
}

impl Node for ParticleSpecies {
    fn fresh(alloc: &NodeAllocator) -> Self {
        let records: Container<Record> = Container::new(alloc);
        let mut patches = ParticlePatches::fresh(alloc);
        patches.attach(records.attributable().writable().id());
        ParticleSpecies { records, patches }
    }

    fn attach(&mut self, parent: NodeId) {
        self.records.attach(parent);
    }

    fn flush_node(&mut self, name: &str, cx: &mut FlushContext<'_>) -> Result<()> {
        self.records.flush(name, cx)?;
        if !self.patches.is_empty() {
            let mark = cx.enter("particlePatches");
            let result = self.patches.flush("particlePatches", cx);
            cx.exit(mark);
            result?;
        }
        Ok(())
    }

    fn read_node(&mut self, cx: &mut ReadContext<'_>) -> Result<()> {
        let paths = cx.list_paths(self.records.attributable().writable())?;
        for name in paths {
            if name == "particlePatches" {
                cx.open_path(self.patches.attributable().writable(), &name)?;
                let mark = cx.enter(&name);
                let result = self.patches.read(cx);
                cx.exit(mark);
                result?;
            } else {
                let (record, _) = self.records.get_or_create(name.clone());
                cx.open_path(record.attributable().writable(), &name)?;
                let mark = cx.enter(&name);
                let result = record.read_node(cx);
                cx.exit(mark);
                result?;
            }
        }

        // Bare datasets under the species group are scalar records.
        let datasets = cx.list_datasets(self.records.attributable().writable())?;
        for name in datasets {
            let (record, _) = self.records.get_or_create(name.clone());
            let mark = cx.enter(&name);
            let result = record.read_as_scalar_dataset(&name, cx);
            cx.exit(mark);
            result?;
        }

        self.records
            .attributable_mut()
            .read_attributes(cx.handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ReadScope, SeriesScope};
    use crate::record_component::SCALAR;
    use openpmd_backend::{Backend, IOHandler, MemoryBackend, Operation};
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
    fn test_species_flushes_records_and_patches() {
        let (mut h, observer) = handler();
        let alloc = NodeAllocator::new();
        let mut root = file_rooted(&alloc, &mut h);
        let root_id = root.writable().id();

        let mut species = ParticleSpecies::fresh(&alloc);
        species.attach(root_id);
        {
            let c = species.record("charge").scalar().unwrap();
            c.reset_dataset(Dataset::new(Datatype::Double, vec![100])).unwrap();
            c.make_constant(-1.0f64).unwrap();
        }
        {
            let patch = species.particle_patches_mut().record("offset");
            let c = patch.component("x").unwrap();
            c.reset_dataset(Dataset::new(Datatype::Uint64, vec![2])).unwrap();
            c.make_constant(0u64).unwrap();
        }

        let mut cx = FlushContext::new(
            &mut h,
            SeriesScope {
                filename: "run.h5",
                root: &mut root,
                iterations_id: root_id,
            },
        );
        species.flush_node("electrons", &mut cx).unwrap();

        assert!(observer.has_group("run.h5", "electrons"));
        assert_eq!(
            observer.attribute("run.h5", "electrons/charge", "value"),
            Some(Value::Double(-1.0))
        );
        assert!(observer.has_group("run.h5", "electrons/particlePatches"));
        assert_eq!(
            observer.attribute("run.h5", "electrons/particlePatches/offset/x", "value"),
            Some(Value::Uint64(0))
        );
    }

    #[test]
    fn test_empty_patches_flush_no_group() {
        let (mut h, observer) = handler();
        let alloc = NodeAllocator::new();
        let mut root = file_rooted(&alloc, &mut h);
        let root_id = root.writable().id();

        let mut species = ParticleSpecies::fresh(&alloc);
        species.attach(root_id);
        {
            let c = species.record("weighting").scalar().unwrap();
            c.reset_dataset(Dataset::new(Datatype::Double, vec![10])).unwrap();
            c.make_constant(1.0f64).unwrap();
        }

        let mut cx = FlushContext::new(
            &mut h,
            SeriesScope {
                filename: "run.h5",
                root: &mut root,
                iterations_id: root_id,
            },
        );
        species.flush_node("ions", &mut cx).unwrap();
        assert!(!observer.has_group("run.h5", "ions/particlePatches"));
    }

    #[test]
    fn test_read_recovers_scalar_records_from_datasets() {
        let mut seed = MemoryBackend::new();
        let at = seed.create_file("run.h5").unwrap();
        let momentum = seed.create_path(at, "electrons/momentum").unwrap();
        seed.write_attribute(momentum, "unitDimension", &Value::ArrDouble7([0.0; 7]))
            .unwrap();
        seed.insert_dataset(
            "run.h5",
            "electrons/momentum",
            "x",
            Dataset::new(Datatype::Double, vec![100]),
        )
        .unwrap();
        seed.insert_dataset(
            "run.h5",
            "electrons",
            "weighting",
            Dataset::new(Datatype::Double, vec![100]),
        )
        .unwrap();
        let mut h = IOHandler::new(Box::new(seed));

        let alloc = NodeAllocator::new();
        let root = Attributable::new(&alloc);
        let file = Attributable::new(&alloc);
        h.dispatch(file.writable().task(Operation::OpenFile {
            name: "run.h5".into(),
        }))
        .unwrap();

        let mut species = ParticleSpecies::fresh(&alloc);
        species.attach(file.writable().id());
        h.dispatch(
            species
                .attributable()
                .writable()
                .task(Operation::OpenPath {
                    path: "electrons".into(),
                }),
        )
        .unwrap();

        let mut cx = ReadContext::new(&mut h, ReadScope { root: &root });
        species.read_node(&mut cx).unwrap();

        // momentum came from the path listing, weighting from datasets.
        let momentum = species.get_record("momentum").unwrap();
        assert!(!momentum.is_scalar());
        assert_eq!(
            momentum.get_component("x").unwrap().dataset(),
            Some(&Dataset::new(Datatype::Double, vec![100]))
        );

        let weighting = species.get_record("weighting").unwrap();
        assert!(weighting.is_scalar());
        assert_eq!(
            weighting.get_component(SCALAR).unwrap().dataset(),
            Some(&Dataset::new(Datatype::Double, vec![100]))
        );
    }
}
