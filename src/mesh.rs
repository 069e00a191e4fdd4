//! Meshes: records sampled on a structured grid.

use std::fmt;
use std::str::FromStr;

use openpmd_backend::NodeId;
use openpmd_core::{unit_dimension_array, Floating, UnitDimension, Value};

use crate::attributable::{Attributable, Attributed};
use crate::context::{FlushContext, ReadContext};
use crate::error::{Error, Result};
use crate::record::BaseRecord;
use crate::record_component::RecordComponent;
use crate::writable::{Node, NodeAllocator};

/// Geometry of the grid a mesh is sampled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geometry {
    /// Regular cartesian grid.
    Cartesian,
    /// Cylindrical grid with azimuthal modes.
    ThetaMode,
    /// Cylindrical grid.
    Cylindrical,
    /// Spherical grid.
    Spherical,
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Geometry::Cartesian => "cartesian",
            Geometry::ThetaMode => "thetaMode",
            Geometry::Cylindrical => "cylindrical",
            Geometry::Spherical => "spherical",
        };
        f.write_str(name)
    }
}

impl FromStr for Geometry {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cartesian" => Ok(Geometry::Cartesian),
            "thetaMode" => Ok(Geometry::ThetaMode),
            "cylindrical" => Ok(Geometry::Cylindrical),
            "spherical" => Ok(Geometry::Spherical),
            other => Err(Error::WrongType {
                expected: "cartesian, thetaMode, cylindrical or spherical".to_string(),
                actual: other.to_string(),
            }),
        }
    }
}

/// Row-major or column-major layout of a mesh's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOrder {
    /// Row-major.
    C,
    /// Column-major.
    F,
}

impl fmt::Display for DataOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataOrder::C => "C",
            DataOrder::F => "F",
        })
    }
}

impl FromStr for DataOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "C" => Ok(DataOrder::C),
            "F" => Ok(DataOrder::F),
            other => Err(Error::WrongType {
                expected: "C or F".to_string(),
                actual: other.to_string(),
            }),
        }
    }
}

/// A record sampled on a structured grid, e.g. a field.
///
/// Freshly created meshes carry the standard's defaults: a cartesian
/// grid in row-major order with unit spacing at the origin.
#[derive(Debug)]
pub struct Mesh {
    base: BaseRecord,
}

impl Mesh {
    /// Whether the mesh stores its data as a single anonymous component.
    pub fn is_scalar(&self) -> bool {
        self.base.is_scalar()
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.base.len()
    }

    /// Whether the mesh has no components.
    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    /// The named component `name`, created on first access.
    ///
    /// A created component starts at the cell origin, `position = [0.0]`.
    pub fn component(&mut self, name: impl Into<String>) -> Result<&mut RecordComponent> {
        let (component, created) = self.base.component(name.into())?;
        if created {
            component.set_position(vec![0.0]);
        }
        Ok(component)
    }

    /// The scalar component, created on first access.
    pub fn scalar(&mut self) -> Result<&mut RecordComponent> {
        let (component, created) = self.base.scalar()?;
        if created {
            component.set_position(vec![0.0]);
        }
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

    /// The grid geometry.
    pub fn geometry(&self) -> Result<Geometry> {
        match self.base.attributable().get("geometry").and_then(Value::as_str) {
            Some(stored) => stored.parse(),
            None => Err(Error::Internal("attribute `geometry` is not set".to_string())),
        }
    }

    /// Set the grid geometry.
    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.set_attribute("geometry", geometry.to_string());
    }

    /// The data layout.
    pub fn data_order(&self) -> Result<DataOrder> {
        match self.base.attributable().get("dataOrder").and_then(Value::as_str) {
            Some(stored) => stored.parse(),
            None => Err(Error::Internal("attribute `dataOrder` is not set".to_string())),
        }
    }

    /// Set the data layout.
    pub fn set_data_order(&mut self, order: DataOrder) {
        self.set_attribute("dataOrder", order.to_string());
    }

    /// Labels of the grid axes, slowest-varying first.
    pub fn axis_labels(&self) -> Option<&[String]> {
        self.base
            .attributable()
            .get("axisLabels")
            .and_then(Value::as_vec_string)
    }

    /// Set the labels of the grid axes.
    pub fn set_axis_labels(&mut self, labels: Vec<String>) {
        self.set_attribute("axisLabels", labels);
    }

    /// Distance between grid points per axis, widened to doubles.
    pub fn grid_spacing(&self) -> Option<Vec<f64>> {
        vector_as_doubles(self.base.attributable().get("gridSpacing"))
    }

    /// Set the distance between grid points per axis.
    pub fn set_grid_spacing(&mut self, spacing: Vec<f64>) {
        self.set_attribute("gridSpacing", spacing);
    }

    /// Offset of the grid origin in global coordinates, widened to
    /// doubles.
    pub fn grid_global_offset(&self) -> Option<Vec<f64>> {
        vector_as_doubles(self.base.attributable().get("gridGlobalOffset"))
    }

    /// Set the offset of the grid origin in global coordinates.
    pub fn set_grid_global_offset(&mut self, offset: Vec<f64>) {
        self.set_attribute("gridGlobalOffset", offset);
    }

    /// Conversion factor from grid units to SI.
    pub fn grid_unit_si(&self) -> f64 {
        self.base
            .attributable()
            .get("gridUnitSI")
            .and_then(Value::as_double)
            .unwrap_or(1.0)
    }

    /// Set the conversion factor from grid units to SI.
    pub fn set_grid_unit_si(&mut self, unit_si: f64) {
        self.set_attribute("gridUnitSI", unit_si);
    }

    /// Powers of the seven SI base measures describing the mesh's unit.
    pub fn unit_dimension(&self) -> [f64; 7] {
        self.base
            .attributable()
            .get("unitDimension")
            .and_then(Value::as_arr_double7)
            .copied()
            .unwrap_or([0.0; 7])
    }

    /// Set the mesh's unit dimension from per-measure exponents.
    pub fn set_unit_dimension(
        &mut self,
        dimensions: impl IntoIterator<Item = (UnitDimension, f64)>,
    ) {
        self.set_attribute("unitDimension", unit_dimension_array(dimensions));
    }

    /// Offset of the mesh within its iteration's time step, exact on the
    /// stored floating-point width.
    pub fn time_offset<F: Floating>(&self) -> Result<F> {
        self.base.attributable().get_float("timeOffset")
    }

    /// Set the mesh's in-step time offset.
    pub fn set_time_offset<F: Floating>(&mut self, time_offset: F) {
        self.set_attribute("timeOffset", time_offset.into_value());
    }

    pub(crate) fn read_with_attribute_hint(
        &mut self,
        name: &str,
        listed: &[String],
        cx: &mut ReadContext<'_>,
    ) -> Result<()> {
        self.base.read_with_attribute_hint(name, listed, cx)
    }
}

fn vector_as_doubles(value: Option<&Value>) -> Option<Vec<f64>> {
    match value {
        Some(Value::VecDouble(v)) => Some(v.clone()),
        Some(Value::VecFloat(v)) => Some(v.iter().map(|&f| f64::from(f)).collect()),
        _ => None,
    }
}

impl Attributed for Mesh {
    fn attributable(&self) -> &Attributable {
        self.base.attributable()
    }

    fn attributable_mut(&mut self) -> &mut Attributable {
        self.base.attributable_mut()
    }
}

impl Node for Mesh {
    fn fresh(alloc: &NodeAllocator) -> Self {
        let mut mesh = Mesh {
            base: BaseRecord::fresh(alloc),
        };
        mesh.set_time_offset(0.0f32);
        mesh.set_geometry(Geometry::Cartesian);
        mesh.set_data_order(DataOrder::C);
        mesh.set_grid_spacing(vec![1.0]);
        mesh.set_grid_global_offset(vec![0.0]);
        mesh.set_grid_unit_si(1.0);
        mesh
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

    #[test]
    fn test_fresh_mesh_carries_standard_defaults() {
        let alloc = NodeAllocator::new();
        let m = Mesh::fresh(&alloc);
        assert_eq!(m.geometry().unwrap(), Geometry::Cartesian);
        assert_eq!(m.data_order().unwrap(), DataOrder::C);
        assert_eq!(m.grid_spacing(), Some(vec![1.0]));
        assert_eq!(m.grid_global_offset(), Some(vec![0.0]));
        assert_eq!(m.grid_unit_si(), 1.0);
        assert_eq!(m.unit_dimension(), [0.0; 7]);
        assert_eq!(m.time_offset::<f32>().unwrap(), 0.0f32);
    }

    #[test]
    fn test_created_components_start_at_cell_origin() {
        let alloc = NodeAllocator::new();
        let mut m = Mesh::fresh(&alloc);
        {
            let c = m.component("x").unwrap();
            assert_eq!(c.position(), Some(&[0.0][..]));
            c.set_position(vec![0.5, 0.5]);
        }
        // Re-access must not reset the position.
        let c = m.component("x").unwrap();
        assert_eq!(c.position(), Some(&[0.5, 0.5][..]));
    }

    #[test]
    fn test_geometry_round_trips_through_strings() {
        let alloc = NodeAllocator::new();
        let mut m = Mesh::fresh(&alloc);
        for geometry in [
            Geometry::Cartesian,
            Geometry::ThetaMode,
            Geometry::Cylindrical,
            Geometry::Spherical,
        ] {
            m.set_geometry(geometry);
            assert_eq!(m.geometry().unwrap(), geometry);
        }
        assert_eq!(
            m.get_attribute("geometry"),
            Some(&Value::String("spherical".into()))
        );

        m.set_attribute("geometry", "dodecahedral");
        assert!(matches!(m.geometry(), Err(Error::WrongType { .. })));
    }

    #[test]
    fn test_data_order_rejects_unknown_layouts() {
        let alloc = NodeAllocator::new();
        let mut m = Mesh::fresh(&alloc);
        m.set_data_order(DataOrder::F);
        assert_eq!(m.data_order().unwrap(), DataOrder::F);
        m.set_attribute("dataOrder", "Z");
        assert!(m.data_order().is_err());
    }

    #[test]
    fn test_grid_vectors_widen_from_floats() {
        let alloc = NodeAllocator::new();
        let mut m = Mesh::fresh(&alloc);
        m.set_attribute("gridSpacing", Value::VecFloat(vec![0.5f32, 0.25f32]));
        assert_eq!(m.grid_spacing(), Some(vec![0.5, 0.25]));
    }

    #[test]
    fn test_axis_labels_round_trip() {
        let alloc = NodeAllocator::new();
        let mut m = Mesh::fresh(&alloc);
        assert_eq!(m.axis_labels(), None);
        m.set_axis_labels(vec!["z".into(), "y".into(), "x".into()]);
        assert_eq!(
            m.axis_labels(),
            Some(&["z".to_string(), "y".to_string(), "x".to_string()][..])
        );
    }
}
