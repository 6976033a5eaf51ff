//! Readers and writers for the on-disk formats the toolkit deals with:
//! Galacticus HDF5 output files and XML parameter documents.

pub mod hdf5;
pub mod xmltree;
