//! Specifications of the N-body simulations Galacticus models are grown in:
//! cosmological parameters, box geometry, particle properties and the
//! snapshot ↔ redshift table.
//!
//! Specifications are static XML documents shipped with the Galacticus
//! datasets repository under `static/simulations/<name>.xml`.

use std::fmt;
use std::path::Path;

use itertools::izip;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::data::GalacticusData;
use crate::fileformats::xmltree::XmlTree;

/// Out-of-range policy for table lookups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bounds {
    /// Out-of-range queries return `None`.
    Exclude,
    /// Out-of-range queries clamp to the nearest table extreme.
    Clamp,
}

/// One output epoch: snapshot index and its redshift.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub index: i32,
    pub redshift: f64,
}

/// Cubic simulation volume, optionally with periodic boundaries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationBox {
    /// Side lengths per axis.
    pub size: [f64; 3],
    pub units: Option<String>,
    pub periodic: bool,
}

impl SimulationBox {
    pub fn new(size: [f64; 3], units: Option<&str>, periodic: bool) -> SimulationBox {
        SimulationBox {
            size,
            units: units.map(str::to_string),
            periodic,
        }
    }

    /// Reduce a coordinate into `[0, side)` along one axis.
    #[must_use]
    pub fn wrap_dimension(&self, axis: usize, x: f64) -> f64 {
        let side = self.size[axis];
        let wrapped = x.rem_euclid(side);
        // rem_euclid can round up to the divisor for tiny negative inputs.
        if wrapped >= side {
            wrapped - side
        } else {
            wrapped
        }
    }

    /// Wrap a position into the box, per axis independently. A non-periodic
    /// box logs a warning and returns the position unchanged.
    #[must_use]
    pub fn wrap(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        if !self.periodic {
            warn!("cannot wrap positions, simulation box is not periodic");
            return (x, y, z);
        }
        (
            self.wrap_dimension(0, x),
            self.wrap_dimension(1, y),
            self.wrap_dimension(2, z),
        )
    }

    /// Wrap coordinate arrays in place.
    pub fn wrap_positions(&self, x: &mut [f64], y: &mut [f64], z: &mut [f64]) {
        if !self.periodic {
            warn!("cannot wrap positions, simulation box is not periodic");
            return;
        }
        for (xi, yi, zi) in izip!(x.iter_mut(), y.iter_mut(), z.iter_mut()) {
            *xi = self.wrap_dimension(0, *xi);
            *yi = self.wrap_dimension(1, *yi);
            *zi = self.wrap_dimension(2, *zi);
        }
    }
}

/// Particle load of the simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationParticles {
    pub number: u64,
    pub mass: f64,
    pub units: Option<String>,
}

/// An immutable-after-load simulation specification.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Simulation {
    pub name: String,
    /// Ω_m, total matter density.
    pub omega0: f64,
    /// Ω_Λ, dark energy density.
    pub lambda0: f64,
    /// Ω_b, baryon density.
    pub omega_b: f64,
    /// H0 in km/s/Mpc.
    pub hubble: f64,
    /// H0 / 100.
    pub h0: f64,
    pub sigma8: f64,
    /// Primordial power spectrum index.
    pub ns: f64,
    /// CMB temperature in K.
    pub temperature_cmb: f64,
    pub box_: SimulationBox,
    pub particles: SimulationParticles,
    /// Output epochs ordered by snapshot index (descending redshift).
    snapshots: Vec<Snapshot>,
}

pub const DEFAULT_TEMPERATURE_CMB: f64 = 2.726;

impl Simulation {
    /// Load a named simulation from the datasets repository. The error for
    /// an unknown name lists the specifications that are available.
    pub fn load(simulation: &str) -> Result<Simulation, anyhow::Error> {
        let path = locate_simulation_specs_file(simulation)?;
        Simulation::from_file(path)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Simulation, anyhow::Error> {
        Simulation::from_tree(&XmlTree::from_file(path)?)
    }

    pub fn from_str(document: &str) -> Result<Simulation, anyhow::Error> {
        Simulation::from_tree(&XmlTree::from_str(document)?)
    }

    fn from_tree(tree: &XmlTree) -> Result<Simulation, anyhow::Error> {
        let root = tree.root();
        let name = root
            .attribute("name")
            .ok_or_else(|| anyhow!("simulation specification has no name attribute"))?
            .to_string();

        let cosmology = root
            .child("cosmology")
            .ok_or_else(|| anyhow!("simulation '{name}' has no cosmology block"))?;
        let scalar = |tag: &str| -> Result<f64, anyhow::Error> {
            let text = cosmology
                .child(tag)
                .and_then(|c| c.text.as_deref())
                .ok_or_else(|| anyhow!("cosmology block of '{name}' is missing '{tag}'"))?;
            Ok(text.trim().parse()?)
        };
        let omega0 = scalar("OmegaM")?;
        let lambda0 = scalar("OmegaL")?;
        let omega_b = scalar("OmegaB")?;
        let sigma8 = scalar("sigma8")?;
        let ns = scalar("ns")?;
        let hubble = scalar("H0")?;
        let temperature_cmb = match cosmology.child("temperatureCMB") {
            Some(t) => t
                .text
                .as_deref()
                .ok_or_else(|| anyhow!("empty temperatureCMB element"))?
                .trim()
                .parse()?,
            None => DEFAULT_TEMPERATURE_CMB,
        };

        let box_elem = root
            .child("boxSize")
            .ok_or_else(|| anyhow!("simulation '{name}' has no boxSize element"))?;
        let side: f64 = box_elem
            .text
            .as_deref()
            .ok_or_else(|| anyhow!("empty boxSize element"))?
            .trim()
            .parse()?;
        let box_ = SimulationBox::new([side; 3], box_elem.attribute("units"), true);

        let particles_elem = root
            .child("particles")
            .ok_or_else(|| anyhow!("simulation '{name}' has no particles element"))?;
        let mass_elem = particles_elem
            .child("mass")
            .ok_or_else(|| anyhow!("particles block is missing 'mass'"))?;
        let mass: f64 = mass_elem
            .text
            .as_deref()
            .ok_or_else(|| anyhow!("empty particle mass element"))?
            .trim()
            .parse()?;
        let number: u64 = particles_elem
            .child("number")
            .and_then(|c| c.text.as_deref())
            .ok_or_else(|| anyhow!("particles block is missing 'number'"))?
            .trim()
            .parse()?;
        let particles = SimulationParticles {
            number,
            mass,
            units: mass_elem.attribute("units").map(str::to_string),
        };

        let snapshots_elem = root
            .child("snapshots")
            .ok_or_else(|| anyhow!("simulation '{name}' has no snapshots table"))?;
        let mut snapshots = Vec::new();
        for snap in snapshots_elem.children_named("snapshot") {
            let index: i32 = snap
                .attribute("number")
                .ok_or_else(|| anyhow!("snapshot entry without a number attribute"))?
                .parse()?;
            let redshift: f64 = snap
                .text
                .as_deref()
                .ok_or_else(|| anyhow!("snapshot {index} has no redshift value"))?
                .trim()
                .parse()?;
            snapshots.push(Snapshot { index, redshift });
        }
        ensure!(!snapshots.is_empty(), "simulation '{name}' has an empty snapshot table");
        snapshots.sort_by_key(|s| s.index);

        Ok(Simulation {
            name,
            omega0,
            lambda0,
            omega_b,
            hubble,
            h0: hubble / 100.0,
            sigma8,
            ns,
            temperature_cmb,
            box_,
            particles,
            snapshots,
        })
    }

    /// The snapshot table, ordered by index.
    #[must_use]
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Redshift of a snapshot index. Inside the table's index range the
    /// stored value is returned (an absent index resolves to the next entry
    /// above it); outside the range the [`Bounds`] policy applies.
    #[must_use]
    pub fn redshift(&self, snapshot: i32, bounds: Bounds) -> Option<f64> {
        let first = self.snapshots.first().expect("table is never empty");
        let last = self.snapshots.last().expect("table is never empty");
        if snapshot < first.index || snapshot > last.index {
            return match bounds {
                Bounds::Exclude => None,
                Bounds::Clamp => {
                    let extreme = if snapshot < first.index { first } else { last };
                    Some(extreme.redshift)
                }
            };
        }
        let entry = match self.snapshots.binary_search_by_key(&snapshot, |s| s.index) {
            Ok(i) => &self.snapshots[i],
            Err(i) => &self.snapshots[i],
        };
        Some(entry.redshift)
    }

    /// Shape-preserving form of [`Simulation::redshift`].
    #[must_use]
    pub fn redshifts(&self, snapshots: &[i32], bounds: Bounds) -> Vec<Option<f64>> {
        snapshots.iter().map(|&s| self.redshift(s, bounds)).collect()
    }

    /// Snapshot whose redshift is nearest to `z` (minimum |Δz|, ties broken
    /// by table order). Outside the table's redshift range the [`Bounds`]
    /// policy applies.
    #[must_use]
    pub fn snapshot(&self, z: f64, bounds: Bounds) -> Option<i32> {
        self.snapshot_with_redshift(z, bounds).map(|(index, _)| index)
    }

    /// As [`Simulation::snapshot`], also returning the matched entry's
    /// redshift.
    #[must_use]
    pub fn snapshot_with_redshift(&self, z: f64, bounds: Bounds) -> Option<(i32, f64)> {
        let first = self.snapshots.first().expect("table is never empty");
        let last = self.snapshots.last().expect("table is never empty");
        // Redshift decreases with snapshot index: the extremes of the table
        // are z(first) (highest) and z(last) (lowest).
        let (z_max, z_min) = (first.redshift, last.redshift);
        if z > z_max || z < z_min {
            return match bounds {
                Bounds::Exclude => None,
                Bounds::Clamp => {
                    let extreme = if z > z_max { first } else { last };
                    Some((extreme.index, extreme.redshift))
                }
            };
        }
        self.snapshots
            .iter()
            .fold(None, |best: Option<&Snapshot>, entry| match best {
                Some(b) if (b.redshift - z).abs() <= (entry.redshift - z).abs() => Some(b),
                _ => Some(entry),
            })
            .map(|s| (s.index, s.redshift))
    }

    /// Shape-preserving form of [`Simulation::snapshot`].
    #[must_use]
    pub fn snapshots_of(&self, zs: &[f64], bounds: Bounds) -> Vec<Option<i32>> {
        zs.iter().map(|&z| self.snapshot(z, bounds)).collect()
    }
}

impl fmt::Display for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dashes = "-".repeat(65);
        let z_min = self
            .snapshots
            .iter()
            .map(|s| s.redshift)
            .fold(f64::INFINITY, f64::min);
        let units = self.box_.units.as_deref().unwrap_or("");
        let mass_units = self.particles.units.as_deref().unwrap_or("");
        writeln!(f, "{dashes}")?;
        writeln!(f, " SPECIFICATIONS: {}", self.name)?;
        writeln!(f, "            BOX SIZE        = {:?} {units}", self.box_.size)?;
        writeln!(f, "            NUM. PARTICLES  = {}", self.particles.number)?;
        writeln!(f, "            PARTICLE MASS   = {} {mass_units}", self.particles.mass)?;
        writeln!(f, "            MIN. REDSHIFT   = {z_min}")?;
        writeln!(f, "       Cosmology:")?;
        writeln!(f, "            OMEGA_MATTER    = {}", self.omega0)?;
        writeln!(f, "            OMEGA_VACUUM    = {}", self.lambda0)?;
        writeln!(f, "            HUBBLE PARAM.   = {}", self.h0)?;
        writeln!(f, "            OMEGA_BARYON    = {}", self.omega_b)?;
        writeln!(f, "            SIGMA_8         = {}", self.sigma8)?;
        writeln!(f, "            POWER SPEC.IND. = {}", self.ns)?;
        write!(f, "{dashes}")
    }
}

/// Locate `static/simulations/<name>.xml` in the datasets repository.
pub fn locate_simulation_specs_file(simulation: &str) -> Result<std::path::PathBuf, anyhow::Error> {
    let data = GalacticusData::locate()?;
    let dir = data.static_path().join("simulations");
    ensure!(
        dir.is_dir(),
        "sub-directory 'simulations' not found in datasets repository"
    );
    let path = dir.join(format!("{}.xml", simulation.to_lowercase()));
    if !path.is_file() {
        let mut available: Vec<String> = std::fs::read_dir(&dir)?
            .filter_map(Result::ok)
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                name.strip_suffix(".xml").map(str::to_string)
            })
            .collect();
        available.sort();
        bail!(
            "no specifications for simulation '{}'; available: {}",
            simulation,
            available.join(", ")
        );
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    // An abbreviated Millennium specification.
    const MILLENNIUM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<simulation name="Millennium">
  <cosmology>
    <OmegaM>0.25</OmegaM>
    <OmegaL>0.75</OmegaL>
    <OmegaB>0.045</OmegaB>
    <H0>73.0</H0>
    <sigma8>0.9</sigma8>
    <ns>1.0</ns>
  </cosmology>
  <boxSize units="Mpc/h">500.0</boxSize>
  <particles>
    <number>10077696000</number>
    <mass units="Msol/h">8.606567e8</mass>
  </particles>
  <snapshots>
    <snapshot number="7">15.343074</snapshot>
    <snapshot number="8">13.557219</snapshot>
    <snapshot number="9">11.896569</snapshot>
    <snapshot number="60">0.116846</snapshot>
    <snapshot number="61">0.075562</snapshot>
    <snapshot number="62">0.036090</snapshot>
    <snapshot number="63">0.0</snapshot>
  </snapshots>
</simulation>"#;

    fn millennium() -> Simulation {
        Simulation::from_str(MILLENNIUM).unwrap()
    }

    #[test]
    fn specification_fields() {
        let sim = millennium();
        assert_eq!(sim.name, "Millennium");
        assert_eq!(sim.omega0, 0.25);
        assert_eq!(sim.lambda0, 0.75);
        assert_eq!(sim.omega_b, 0.045);
        assert_eq!(sim.hubble, 73.0);
        assert_eq!(sim.h0, 0.73);
        assert_eq!(sim.sigma8, 0.9);
        assert_eq!(sim.ns, 1.0);
        assert_eq!(sim.temperature_cmb, DEFAULT_TEMPERATURE_CMB);
        assert_eq!(sim.box_.size, [500.0; 3]);
        assert_eq!(sim.box_.units.as_deref(), Some("Mpc/h"));
        assert!(sim.box_.periodic);
        assert_eq!(sim.particles.number, 10_077_696_000);
        assert_eq!(sim.particles.mass, 8.606567e8);
        assert_eq!(sim.particles.units.as_deref(), Some("Msol/h"));
        assert_eq!(sim.snapshots().first().unwrap().index, 7);
        assert_eq!(sim.snapshots().last().unwrap().index, 63);
    }

    #[test]
    fn redshift_returns_stored_values() {
        let sim = millennium();
        for snap in sim.snapshots() {
            assert_eq!(sim.redshift(snap.index, Bounds::Exclude), Some(snap.redshift));
        }
        assert_eq!(sim.redshift(63, Bounds::Exclude), Some(0.0));
    }

    #[test]
    fn redshift_out_of_bounds_policy() {
        let sim = millennium();
        assert_eq!(sim.redshift(72, Bounds::Exclude), None);
        assert_eq!(sim.redshift(72, Bounds::Clamp), Some(0.0));
        assert_eq!(sim.redshift(0, Bounds::Exclude), None);
        assert_eq!(sim.redshift(0, Bounds::Clamp), Some(15.343074));
        let shaped = sim.redshifts(&[0, 7, 63, 72], Bounds::Exclude);
        assert_eq!(shaped, vec![None, Some(15.343074), Some(0.0), None]);
    }

    #[test]
    fn snapshot_exact_and_nearest() {
        let sim = millennium();
        for snap in sim.snapshots() {
            assert_eq!(sim.snapshot(snap.redshift, Bounds::Exclude), Some(snap.index));
        }
        // Nearest match: 0.1 sits between 0.116846 (60) and 0.075562 (61).
        assert_eq!(sim.snapshot(0.09, Bounds::Exclude), Some(61));
        assert_eq!(sim.snapshot(0.11, Bounds::Exclude), Some(60));
        assert_eq!(
            sim.snapshot_with_redshift(0.11, Bounds::Exclude),
            Some((60, 0.116846))
        );
    }

    #[test]
    fn snapshot_out_of_bounds_policy() {
        let sim = millennium();
        assert_eq!(sim.snapshot(30.0, Bounds::Exclude), None);
        assert_eq!(sim.snapshot(30.0, Bounds::Clamp), Some(7));
        assert_eq!(sim.snapshot(-0.5, Bounds::Exclude), None);
        assert_eq!(sim.snapshot(-0.5, Bounds::Clamp), Some(63));
        let shaped = sim.snapshots_of(&[30.0, 0.0, -0.5], Bounds::Clamp);
        assert_eq!(shaped, vec![Some(7), Some(63), Some(63)]);
    }

    #[test]
    fn wrap_lands_in_box_and_is_idempotent() {
        let bx = SimulationBox::new([10.0, 15.0, 5.0], None, true);
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let x = rng.gen::<f64>() * 40.0 - 20.0;
            let y = rng.gen::<f64>() * 50.0 - 20.0;
            let z = rng.gen::<f64>() * 30.0 - 20.0;
            let (wx, wy, wz) = bx.wrap(x, y, z);
            for (w, side) in [(wx, 10.0), (wy, 15.0), (wz, 5.0)] {
                assert!((0.0..side).contains(&w), "{w} outside [0, {side})");
            }
            assert_eq!(bx.wrap(wx, wy, wz), (wx, wy, wz));
        }
        // Tiny negative offsets must not wrap onto the boundary itself.
        let (wx, _, _) = bx.wrap(-1.0e-18, 0.0, 0.0);
        assert!((0.0..10.0).contains(&wx));
    }

    #[test]
    fn wrap_non_periodic_is_identity() {
        let bx = SimulationBox::new([10.0, 10.0, 10.0], None, false);
        assert_eq!(bx.wrap(-3.0, 12.0, 4.0), (-3.0, 12.0, 4.0));
    }

    #[test]
    fn wrap_positions_in_place() {
        let bx = SimulationBox::new([10.0, 15.0, 5.0], None, true);
        let mut x = vec![-1.0, 11.0];
        let mut y = vec![-2.0, 16.0];
        let mut z = vec![-3.0, 6.0];
        bx.wrap_positions(&mut x, &mut y, &mut z);
        assert_eq!(x, vec![9.0, 1.0]);
        assert_eq!(y, vec![13.0, 1.0]);
        assert_eq!(z, vec![2.0, 1.0]);
    }
}
