//! Iterations: one simulation snapshot each.
//!
//! An iteration carries its point in simulation time and two containers,
//! meshes and particles, living under the series-level `meshesPath` and
//! `particlesPath` groups. How an iteration reaches storage depends on
//! the series encoding: group-based iterations are groups under one
//! shared file, file-based iterations each bring their own file into
//! position before flushing into it.

use openpmd_backend::{IOTask, NodeId, Operation};
use openpmd_core::strings::{replace_first, replace_last};
use openpmd_core::{Floating, FloatWidth, Value};

use crate::attributable::{Attributable, Attributed};
use crate::container::Container;
use crate::context::{FlushContext, ReadContext};
use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::particle::ParticleSpecies;
use crate::series::{BASE_PATH, DEFAULT_MESHES_PATH, DEFAULT_PARTICLES_PATH};
use crate::writable::{Node, NodeAllocator};

/// One snapshot of the simulation at a point in time.
#[derive(Debug)]
pub struct Iteration {
    node: Attributable,
    meshes: Container<Mesh>,
    particles: Container<ParticleSpecies>,
}

impl Iteration {
    /// Simulation time of this snapshot, exact on the stored
    /// floating-point width.
    pub fn time<F: Floating>(&self) -> Result<F> {
        self.node.get_float("time")
    }

    /// Set the simulation time of this snapshot.
    pub fn set_time<F: Floating>(&mut self, time: F) {
        self.set_attribute("time", time.into_value());
    }

    /// Length of the time step leading to this snapshot, exact on the
    /// stored floating-point width.
    pub fn dt<F: Floating>(&self) -> Result<F> {
        self.node.get_float("dt")
    }

    /// Set the length of the time step leading to this snapshot.
    pub fn set_dt<F: Floating>(&mut self, dt: F) {
        self.set_attribute("dt", dt.into_value());
    }

    /// Conversion factor from simulation time units to seconds.
    pub fn time_unit_si(&self) -> f64 {
        self.node
            .get("timeUnitSI")
            .and_then(Value::as_double)
            .unwrap_or(1.0)
    }

    /// Set the conversion factor from simulation time units to seconds.
    pub fn set_time_unit_si(&mut self, time_unit_si: f64) {
        self.set_attribute("timeUnitSI", time_unit_si);
    }

    /// The meshes of this snapshot.
    pub fn meshes(&self) -> &Container<Mesh> {
        &self.meshes
    }

    /// The meshes of this snapshot, mutably.
    pub fn meshes_mut(&mut self) -> &mut Container<Mesh> {
        &mut self.meshes
    }

    /// The particle species of this snapshot.
    pub fn particles(&self) -> &Container<ParticleSpecies> {
        &self.particles
    }

    /// The particle species of this snapshot, mutably.
    pub fn particles_mut(&mut self) -> &mut Container<ParticleSpecies> {
        &mut self.particles
    }

    /// Flush this iteration into its own file.
    ///
    /// The first flush of an iteration substitutes the first `%T` in the
    /// filename pattern and creates the file; later flushes substitute
    /// the last `%T` and open it. Each flush brings the file, the base
    /// path group and the iteration group into position, one task round
    /// apiece, then flushes the body. A fresh file gets the full set of
    /// series-level attributes rewritten into it.
    pub(crate) fn flush_file_based(
        &mut self,
        label: &str,
        cx: &mut FlushContext<'_>,
    ) -> Result<()> {
        let root_id = cx.series_root_id();
        let iterations_id = cx.series_iterations_id();
        if !self.written() {
            let filename = replace_first(cx.series_filename(), "%T", label);
            cx.run(IOTask::new(
                root_id,
                None,
                Operation::CreateFile { name: filename },
            ))?;
            cx.mark_series_written();
            cx.run(IOTask::new(
                iterations_id,
                Some(root_id),
                Operation::CreatePath {
                    path: replace_first(BASE_PATH, "%T/", ""),
                },
            ))?;
            cx.run(self.node.writable().task(Operation::CreatePath {
                path: label.to_string(),
            }))?;
            self.node.writable_mut().set_written(true);
            cx.touch_series_attributes();
        } else {
            let filename = replace_last(cx.series_filename(), "%T", label);
            cx.run(IOTask::new(
                root_id,
                None,
                Operation::OpenFile { name: filename },
            ))?;
            cx.run(IOTask::new(
                iterations_id,
                Some(root_id),
                Operation::OpenPath {
                    path: replace_first(BASE_PATH, "%T/", ""),
                },
            ))?;
            cx.run(self.node.writable().task(Operation::OpenPath {
                path: label.to_string(),
            }))?;
        }
        cx.flush_series_attributes()?;
        self.flush_body(cx)
    }

    fn flush_body(&mut self, cx: &mut FlushContext<'_>) -> Result<()> {
        // TODO: warn when the standard version is >= 1.1.0 and meshesPath
        // is set but no meshes exist
        if !self.meshes.is_empty() || cx.series_has_attribute("meshesPath") {
            cx.ensure_series_default(
                "meshesPath",
                Value::String(DEFAULT_MESHES_PATH.to_string()),
            );
            cx.flush_series_attribute("meshesPath")?;
            let path = cx.meshes_path();
            let mark = cx.enter(&path);
            let result = self.meshes.flush(&path, cx);
            cx.exit(mark);
            result?;
        }
        if !self.particles.is_empty() || cx.series_has_attribute("particlesPath") {
            cx.ensure_series_default(
                "particlesPath",
                Value::String(DEFAULT_PARTICLES_PATH.to_string()),
            );
            cx.flush_series_attribute("particlesPath")?;
            let path = cx.particles_path();
            let mark = cx.enter(&path);
            let result = self.particles.flush(&path, cx);
            cx.exit(mark);
            result?;
        }
        self.node.flush_attributes(cx.handler)
    }

    fn read_time_attributes(&mut self, cx: &mut ReadContext<'_>) -> Result<()> {
        let (dtype, value) = cx.read_attribute(self.node.writable(), "dt")?;
        match dtype.float_width() {
            FloatWidth::Single => self.set_dt(float_value::<f32>(&value)?),
            FloatWidth::Double => self.set_dt(float_value::<f64>(&value)?),
            FloatWidth::Unsupported(dt) => {
                return Err(cx.format_violation(format!(
                    "attribute `dt` has type {dt}, expected Float or Double"
                )))
            }
        }
        let (dtype, value) = cx.read_attribute(self.node.writable(), "time")?;
        match dtype.float_width() {
            FloatWidth::Single => self.set_time(float_value::<f32>(&value)?),
            FloatWidth::Double => self.set_time(float_value::<f64>(&value)?),
            FloatWidth::Unsupported(dt) => {
                return Err(cx.format_violation(format!(
                    "attribute `time` has type {dt}, expected Float or Double"
                )))
            }
        }
        let (dtype, value) = cx.read_attribute(self.node.writable(), "timeUnitSI")?;
        match value.as_double() {
            Some(time_unit_si) => self.set_time_unit_si(time_unit_si),
            None => {
                return Err(cx.format_violation(format!(
                    "attribute `timeUnitSI` has type {dtype}, expected Double"
                )))
            }
        }
        Ok(())
    }

    fn read_meshes(&mut self, name: &str, cx: &mut ReadContext<'_>) -> Result<()> {
        cx.open_path(self.meshes.attributable().writable(), name)?;
        let mark = cx.enter(name);
        let result = self.read_meshes_inner(cx);
        cx.exit(mark);
        result
    }

    fn read_meshes_inner(&mut self, cx: &mut ReadContext<'_>) -> Result<()> {
        self.meshes.attributable_mut().read_attributes(cx.handler)?;
        let names = cx.list_paths(self.meshes.attributable().writable())?;
        for name in names {
            let (mesh, _) = self.meshes.get_or_create(name.clone());
            // Open and list in one round; the listing decides whether the
            // group is a constant scalar mesh before reading it.
            let listed =
                cx.open_path_listing_attributes(mesh.attributable().writable(), &name)?;
            let mark = cx.enter(&name);
            let result = mesh.read_with_attribute_hint(&name, &listed, cx);
            cx.exit(mark);
            result?;
        }
        Ok(())
    }

    fn read_particles(&mut self, name: &str, cx: &mut ReadContext<'_>) -> Result<()> {
        cx.open_path(self.particles.attributable().writable(), name)?;
        let mark = cx.enter(name);
        let result = self.read_particles_inner(cx);
        cx.exit(mark);
        result
    }

    fn read_particles_inner(&mut self, cx: &mut ReadContext<'_>) -> Result<()> {
        self.particles
            .attributable_mut()
            .read_attributes(cx.handler)?;
        let names = cx.list_paths(self.particles.attributable().writable())?;
        for name in names {
            let (species, _) = self.particles.get_or_create(name.clone());
            cx.open_path(species.attributable().writable(), &name)?;
            let mark = cx.enter(&name);
            let result = species.read_node(cx);
            cx.exit(mark);
            result?;
        }
        Ok(())
    }
}

fn float_value<F: Floating>(value: &Value) -> Result<F> {
    F::from_value(value).ok_or_else(|| {
        Error::Internal(format!(
            "attribute value does not match its reported type: {value:?}"
        ))
    })
}

impl Attributed for Iteration {
    fn attributable(&self) -> &Attributable {
        &self.node
    }

    fn attributable_mut(&mut self) -> &mut Attributable {
        &mut self.node
    }
}

impl Node for Iteration {
    fn fresh(alloc: &NodeAllocator) -> Self {
        let node = Attributable::new(alloc);
        let mut meshes = Container::new(alloc);
        let mut particles = Container::new(alloc);
        meshes.attach(node.writable().id());
        particles.attach(node.writable().id());
        let mut iteration = Iteration {
            node,
            meshes,
            particles,
        };
        iteration.set_time(0.0f64);
        iteration.set_dt(1.0f64);
        iteration.set_time_unit_si(1.0);
        iteration
    }

    fn attach(&mut self, parent: NodeId) {
        self.node.writable_mut().set_parent(parent);
    }

    /// Group-based entry: the iteration group is created on the first
    /// flush and left alone afterwards.
    fn flush_node(&mut self, name: &str, cx: &mut FlushContext<'_>) -> Result<()> {
        if !self.written() {
            cx.run(self.node.writable().task(Operation::CreatePath {
                path: name.to_string(),
            }))?;
            self.node.writable_mut().set_written(true);
        }
        self.flush_body(cx)
    }

    fn read_node(&mut self, cx: &mut ReadContext<'_>) -> Result<()> {
        self.node.writable_mut().set_written(false);
        self.read_time_attributes(cx)?;

        let meshes_name = replace_last(&cx.meshes_path(), "/", "");
        let particles_name = replace_last(&cx.particles_path(), "/", "");
        // Standard versions up to 1.0.1 require the group to exist even
        // when empty, so presence is decided by listing; later versions
        // decide by the series-level path attributes.
        let (has_meshes, has_particles) = match cx.standard_version() {
            Some("1.0.0") | Some("1.0.1") => {
                let paths = cx.list_paths(self.node.writable())?;
                (
                    paths.iter().any(|p| p == &meshes_name),
                    paths.iter().any(|p| p == &particles_name),
                )
            }
            _ => (
                cx.series_has_attribute("meshesPath"),
                cx.series_has_attribute("particlesPath"),
            ),
        };
        if has_meshes {
            self.read_meshes(&meshes_name, cx)?;
        }
        if has_particles {
            self.read_particles(&particles_name, cx)?;
        }

        self.node.read_attributes(cx.handler)
    }
}
