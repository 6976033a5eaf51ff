//! # GALACTICUS
//!
//! An analysis toolkit for output from the
//! [Galacticus](https://github.com/galacticusorg/galacticus) semi-analytic
//! model of galaxy formation.
//!
//! The toolkit wraps the pieces an analysis pipeline keeps reaching for: the
//! HDF5 output files ([`fileformats::hdf5`], [`io`]), the XML parameter
//! documents that configure a run ([`fileformats::xmltree`], [`parameters`]),
//! and the specifications of the N-body simulations the models are grown in
//! ([`simulations`]). Physical constants and method defaults live in
//! [`constants`] and [`config`]; data files are resolved through the
//! datasets repository ([`data`]).
//!
//! ## Usage
//!
//! Open an output file and query its epochs:
//!
//! ```no_run
//! use galacticus::fileformats::hdf5::FileMode;
//! use galacticus::io::GalacticusHdf5;
//!
//! let out = GalacticusHdf5::open("galacticus.hdf5", FileMode::ReadOnly).unwrap();
//! let masses = out.galaxy_dataset::<f64>(0.0, "diskMassStellar").unwrap();
//! println!("{} galaxies at z=0", masses.len());
//! ```
//!
//! Look up epochs of a simulation specification:
//!
//! ```no_run
//! use galacticus::simulations::{Bounds, Simulation};
//!
//! let sim = Simulation::load("millennium").unwrap();
//! let snap = sim.snapshot(1.0, Bounds::Clamp).unwrap();
//! println!("snapshot nearest z=1: {snap}");
//! ```

#[macro_use]
extern crate anyhow;

pub mod config;
pub mod constants;
pub mod data;
pub mod errors;
pub mod fileformats;
pub mod io;
pub mod parameters;
pub mod simulations;

pub use errors::GalacticusError;
pub use fileformats::hdf5::{AttrValue, FileMode, Hdf5File, WriteOptions, WritePolicy};
pub use io::GalacticusHdf5;
pub use parameters::Parameters;
pub use simulations::{Bounds, Simulation};
