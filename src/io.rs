//! Reading Galacticus output files: the `Outputs/Output<N>` epoch groups,
//! version and parameter metadata, and the per-galaxy `nodeData` datasets.

use std::collections::HashMap;
use std::path::Path;

use hdf5::H5Type;
use ndarray::ArrayD;

use crate::fileformats::hdf5::{AttrValue, FileMode, Hdf5File};

/// One output epoch group.
#[derive(Clone, Debug, PartialEq)]
pub struct Output {
    /// Numeric suffix of the `Output<N>` group name.
    pub index: u32,
    /// Expansion factor at output.
    pub a: f64,
    /// Redshift, z = 1/a - 1.
    pub z: f64,
    /// Group name under `Outputs`.
    pub name: String,
}

/// A Galacticus output file.
///
/// Opening reads the version attributes, the flattened parameter map (the
/// `/Parameters` group and its immediate sub-groups) and the output epoch
/// table; datasets are read on demand.
#[derive(Debug)]
pub struct GalacticusHdf5 {
    file: Hdf5File,
    version: HashMap<String, AttrValue>,
    build: Option<HashMap<String, AttrValue>>,
    parameters: HashMap<String, AttrValue>,
    parameter_parents: HashMap<String, String>,
    outputs: Vec<Output>,
}

impl GalacticusHdf5 {
    pub fn open<P: AsRef<Path>>(path: P, mode: FileMode) -> Result<GalacticusHdf5, anyhow::Error> {
        let file = Hdf5File::open(path, mode)?;

        ensure!(
            file.has_object("Version"),
            "'{}' is not a Galacticus output file: no Version group",
            file.filename().display()
        );
        let version = file.read_attributes("Version", None, false)?;
        let build = if file.has_object("Build") {
            Some(file.read_attributes("Build", None, false)?)
        } else {
            None
        };

        let mut parameters = HashMap::new();
        let mut parameter_parents = HashMap::new();
        if file.has_object("Parameters") {
            for (key, value) in file.read_attributes("Parameters", None, false)? {
                parameter_parents.insert(key.clone(), "parameters".to_string());
                parameters.insert(key, value);
            }
            for group in file.ls_groups("Parameters", false)? {
                let attrs =
                    file.read_attributes(&format!("Parameters/{group}"), None, false)?;
                for (key, value) in attrs {
                    parameter_parents.insert(key.clone(), group.clone());
                    parameters.insert(key, value);
                }
            }
        }

        let mut outputs = Vec::new();
        if file.has_object("Outputs") {
            for name in file.ls_groups("Outputs", false)? {
                let Some(index) = name
                    .strip_prefix("Output")
                    .and_then(|s| s.parse::<u32>().ok())
                else {
                    continue;
                };
                let attrs = file.read_attributes(
                    &format!("Outputs/{name}"),
                    Some(&["outputExpansionFactor"]),
                    true,
                )?;
                let a = attrs["outputExpansionFactor"]
                    .as_f64()
                    .ok_or_else(|| anyhow!("outputExpansionFactor of {name} is not numeric"))?;
                outputs.push(Output {
                    index,
                    a,
                    z: 1.0 / a - 1.0,
                    name,
                });
            }
            outputs.sort_by_key(|o| o.index);
        }

        Ok(GalacticusHdf5 {
            file,
            version,
            build,
            parameters,
            parameter_parents,
            outputs,
        })
    }

    #[must_use]
    pub fn version(&self) -> &HashMap<String, AttrValue> {
        &self.version
    }

    #[must_use]
    pub fn build(&self) -> Option<&HashMap<String, AttrValue>> {
        self.build.as_ref()
    }

    /// Flattened run parameters (attribute name → value).
    #[must_use]
    pub fn parameters(&self) -> &HashMap<String, AttrValue> {
        &self.parameters
    }

    /// Parent parameter group of a flattened parameter name.
    #[must_use]
    pub fn parameter_parent(&self, name: &str) -> Option<&str> {
        self.parameter_parents.get(name).map(String::as_str)
    }

    /// The output epoch table, ordered by output index.
    #[must_use]
    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// Redshift of a specific output index.
    #[must_use]
    pub fn output_redshift(&self, index: u32) -> Option<f64> {
        self.outputs.iter().find(|o| o.index == index).map(|o| o.z)
    }

    /// The output whose redshift is nearest to `z`.
    #[must_use]
    pub fn select_output(&self, z: f64) -> Option<&Output> {
        self.outputs.iter().fold(None, |best: Option<&Output>, o| match best {
            Some(b) if (b.z - z).abs() <= (o.z - z).abs() => Some(b),
            _ => Some(o),
        })
    }

    /// Redshift of the output nearest to `z`.
    #[must_use]
    pub fn nearest_redshift(&self, z: f64) -> Option<f64> {
        self.select_output(z).map(|o| o.z)
    }

    /// Galaxy properties available in the output nearest to `z`.
    pub fn available_datasets(&self, z: f64) -> Result<Vec<String>, anyhow::Error> {
        let Some(out) = self.select_output(z) else {
            return Ok(Vec::new());
        };
        let path = format!("Outputs/{}/nodeData", out.name);
        if !self.file.has_object(&path) {
            return Ok(Vec::new());
        }
        self.file.ls_datasets(&path, false)
    }

    /// Number of galaxies in the output nearest to `z`.
    pub fn count_galaxies_at(&self, z: f64) -> Result<usize, anyhow::Error> {
        let Some(out) = self.select_output(z) else {
            return Ok(0);
        };
        let datasets = self.available_datasets(z)?;
        let Some(first) = datasets.first() else {
            return Ok(0);
        };
        self.file
            .dataset_size(&format!("Outputs/{}/nodeData/{first}", out.name))
    }

    /// Number of galaxies over every output.
    pub fn count_galaxies(&self) -> Result<usize, anyhow::Error> {
        let mut total = 0;
        for z in self.outputs.iter().map(|o| o.z).collect::<Vec<_>>() {
            total += self.count_galaxies_at(z)?;
        }
        Ok(total)
    }

    /// Whether a galaxy dataset exists in the output nearest to `z`.
    pub fn dataset_exists(&self, z: f64, name: &str) -> Result<bool, anyhow::Error> {
        Ok(self.available_datasets(z)?.iter().any(|d| d == name))
    }

    /// Read one galaxy dataset from the output nearest to `z`.
    pub fn galaxy_dataset<T: H5Type>(
        &self,
        z: f64,
        name: &str,
    ) -> Result<ArrayD<T>, anyhow::Error> {
        let out = self
            .select_output(z)
            .ok_or_else(|| anyhow!("file has no outputs"))?;
        self.file
            .read_dataset(&format!("Outputs/{}/nodeData/{name}", out.name))
    }

    /// The underlying file wrapper.
    #[must_use]
    pub fn inner(&self) -> &Hdf5File {
        &self.file
    }
}
