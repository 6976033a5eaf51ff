//! Galacticus run parameters: an XML tree rooted at `<parameters>`, addressed
//! by parameter name via the tree's flattened index.
//!
//! Each parameter element carries its value in a `value` attribute (or as
//! text content) representing a scalar or a space-delimited list; coercion is
//! left to the caller via [`parse_values`].

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use crate::errors::GalacticusError;
use crate::fileformats::hdf5::{AttrValue, Hdf5File};
use crate::fileformats::xmltree::XmlTree;

pub const ROOT_TAG: &str = "parameters";

#[derive(Clone, Debug)]
pub struct Parameters {
    tree: XmlTree,
}

impl Parameters {
    /// An empty parameter set.
    pub fn new() -> Parameters {
        Parameters {
            tree: XmlTree::new(ROOT_TAG),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Parameters, anyhow::Error> {
        Parameters::from_tree(XmlTree::from_file(path)?)
    }

    pub fn from_str(document: &str) -> Result<Parameters, anyhow::Error> {
        Parameters::from_tree(XmlTree::from_str(document)?)
    }

    fn from_tree(tree: XmlTree) -> Result<Parameters, anyhow::Error> {
        ensure!(
            tree.root().tag == ROOT_TAG,
            "not a parameters document: root element is '{}'",
            tree.root().tag
        );
        Ok(Parameters { tree })
    }

    /// Path of a named parameter in the tree.
    pub fn parameter_path(&self, name: &str) -> Result<&str, anyhow::Error> {
        self.tree
            .path_of(name)
            .ok_or_else(|| GalacticusError::ParameterNotFound(name.to_string()).into())
    }

    /// Value of a named parameter: the `value` attribute, falling back to
    /// text content.
    pub fn get_parameter(&self, name: &str) -> Result<String, anyhow::Error> {
        let path = self.parameter_path(name)?.to_string();
        let elem = self
            .tree
            .get_element(&path)
            .ok_or_else(|| anyhow!("index out of sync with tree at '{path}'"))?;
        elem.attribute("value")
            .map(str::to_string)
            .or_else(|| elem.text.clone())
            .ok_or_else(|| anyhow!("parameter '{name}' has no value"))
    }

    /// Set a named parameter. With `self_create`, a missing parameter is
    /// created under `parent` (itself created if absent); otherwise a missing
    /// name is an error.
    pub fn set_parameter<T: Display>(
        &mut self,
        name: &str,
        value: T,
        parent: Option<&str>,
        self_create: bool,
    ) -> Result<(), anyhow::Error> {
        let value = value.to_string();
        self.tree
            .set_element(name, &[("value", &value)], None, parent, self_create)
    }

    /// Set a named parameter to a space-delimited list.
    pub fn set_parameter_list<T: Display>(
        &mut self,
        name: &str,
        values: &[T],
        parent: Option<&str>,
        self_create: bool,
    ) -> Result<(), anyhow::Error> {
        let joined = values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_parameter(name, joined, parent, self_create)
    }

    /// Remove a parameter and its subtree; the name index entry goes with it.
    pub fn remove_parameter(&mut self, name: &str) -> Result<(), anyhow::Error> {
        self.tree.remove_element(name)
    }

    /// Serialize the current state, independent of the originating file.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), anyhow::Error> {
        self.tree.write_to_file(path)
    }

    pub fn to_document(&self) -> Result<String, anyhow::Error> {
        self.tree.to_document()
    }

    pub fn tree(&self) -> &XmlTree {
        &self.tree
    }

    /// Rebuild a parameter set from the `/Parameters` attribute tree of a
    /// Galacticus output file. Attributes of the group become top-level
    /// parameters; attributes of its immediate sub-groups are placed under an
    /// element named for the sub-group.
    pub fn from_galacticus_output(file: &Hdf5File) -> Result<Parameters, anyhow::Error> {
        let mut params = Parameters::new();
        let attrs = file.read_attributes("Parameters", None, false)?;
        for (key, value) in sorted(attrs) {
            params.set_parameter(&key, value, None, true)?;
        }
        for group in file.ls_groups("Parameters", false)? {
            let attrs = file.read_attributes(&format!("Parameters/{group}"), None, false)?;
            for (key, value) in sorted(attrs) {
                params.set_parameter(&key, value, Some(&group), true)?;
            }
        }
        Ok(params)
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters::new()
    }
}

/// Coerce a scalar or space-delimited parameter value.
pub fn parse_values<T: FromStr>(value: &str) -> Result<Vec<T>, anyhow::Error>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .split_whitespace()
        .map(|v| v.parse::<T>().map_err(Into::into))
        .collect()
}

fn sorted(
    attrs: std::collections::HashMap<String, AttrValue>,
) -> impl Iterator<Item = (String, AttrValue)> {
    let mut attrs = attrs.into_iter().collect::<Vec<_>>();
    attrs.sort_by(|a, b| a.0.cmp(&b.0));
    attrs.into_iter()
}
