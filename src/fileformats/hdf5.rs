//! Thin object wrapper over the HDF5 library for Galacticus files.
//!
//! A [`Hdf5File`] is bound to exactly one access mode for its lifetime;
//! every mutating operation is guarded by a read-only check. Group and
//! dataset addressing uses slash-delimited paths throughout.

use std::collections::HashMap;
use std::ffi::CString;
use std::fmt;
use std::path::{Path, PathBuf};

use hdf5::types::{FixedAscii, FixedUnicode, TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::{Attribute, Dataset, Group, H5Type, Location};
use log::warn;
use ndarray::{s, ArrayD, ArrayView1, ArrayViewD};

use crate::errors::GalacticusError;

/// Access mode fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileMode {
    /// Open an existing file for reading only.
    ReadOnly,
    /// Open an existing file for reading and writing.
    ReadWrite,
    /// Open for reading and writing, creating the file if absent.
    Append,
    /// Create a new file, truncating any existing one.
    Create,
}

/// Dataset write policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Write only when the dataset does not exist; an existing dataset is
    /// left alone with a logged warning.
    #[default]
    CreateIfAbsent,
    /// Delete an existing dataset and recreate it.
    Overwrite,
    /// Resize an existing dataset along axis 0 and concatenate; falls back
    /// to creation when absent.
    Append,
}

/// Per-call dataset creation parameters.
#[derive(Clone, Debug)]
pub struct WriteOptions {
    pub policy: WritePolicy,
    /// Chunk shape; `None` chunks the full array extent.
    pub chunks: Option<Vec<usize>>,
    /// Gzip compression level.
    pub compression: Option<u8>,
    pub shuffle: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            policy: WritePolicy::default(),
            chunks: None,
            compression: Some(6),
            shuffle: false,
        }
    }
}

impl WriteOptions {
    pub fn with_policy(policy: WritePolicy) -> WriteOptions {
        WriteOptions {
            policy,
            ..WriteOptions::default()
        }
    }
}

/// A typed HDF5 attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Str(String),
    IntVec(Vec<i64>),
    FloatVec(Vec<f64>),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Int(v) => write!(f, "{v}"),
            AttrValue::Float(v) => write!(f, "{v}"),
            AttrValue::Str(v) => write!(f, "{v}"),
            AttrValue::IntVec(v) => {
                let items: Vec<String> = v.iter().map(ToString::to_string).collect();
                write!(f, "{}", items.join(" "))
            }
            AttrValue::FloatVec(v) => {
                let items: Vec<String> = v.iter().map(ToString::to_string).collect();
                write!(f, "{}", items.join(" "))
            }
        }
    }
}

impl AttrValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Str(v.to_string())
    }
}

/// An open HDF5 file with a fixed access mode.
#[derive(Debug)]
pub struct Hdf5File {
    file: hdf5::File,
    filename: PathBuf,
    read_only: bool,
}

impl Hdf5File {
    pub fn open<P: AsRef<Path>>(path: P, mode: FileMode) -> Result<Hdf5File, anyhow::Error> {
        let path = path.as_ref();
        let file = match mode {
            FileMode::ReadOnly => hdf5::File::open(path)?,
            FileMode::ReadWrite => hdf5::File::open_rw(path)?,
            FileMode::Append => hdf5::File::append(path)?,
            FileMode::Create => hdf5::File::create(path)?,
        };
        Ok(Hdf5File {
            file,
            filename: path.to_path_buf(),
            read_only: mode == FileMode::ReadOnly,
        })
    }

    pub fn close(self) -> Result<(), anyhow::Error> {
        self.file.close()?;
        Ok(())
    }

    #[must_use]
    pub fn filename(&self) -> &Path {
        &self.filename
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Direct access to the underlying handle.
    pub fn inner(&self) -> &hdf5::File {
        &self.file
    }

    fn writable(&self, operation: &'static str) -> Result<(), anyhow::Error> {
        if self.read_only {
            return Err(GalacticusError::ReadOnly {
                file: self.filename.clone(),
                operation,
            }
            .into());
        }
        Ok(())
    }

    fn group_at(&self, path: &str) -> Result<Group, anyhow::Error> {
        let path = normalize(path);
        if path.is_empty() || path == "/" {
            return Ok(self.file.group("/")?);
        }
        Ok(self.file.group(&path)?)
    }

    /// Whether an object (group or dataset) exists at a path. Intermediate
    /// segments are checked one by one so a missing branch is not an error.
    #[must_use]
    pub fn has_object(&self, path: &str) -> bool {
        let path = normalize(path);
        if path.is_empty() || path == "/" {
            return true;
        }
        let Ok(mut group) = self.file.group("/") else {
            return false;
        };
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        for (i, segment) in segments.iter().enumerate() {
            if !group.link_exists(segment) {
                return false;
            }
            if i + 1 < segments.len() {
                match group.group(segment) {
                    Ok(g) => group = g,
                    Err(_) => return false,
                }
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Groups
    // ------------------------------------------------------------------

    /// List immediate members, or every object in the subtree when
    /// `recursive` (groups and leaf datasets, slash-delimited).
    pub fn ls_objects(&self, path: &str, recursive: bool) -> Result<Vec<String>, anyhow::Error> {
        let group = self.group_at(path)?;
        let mut out = Vec::new();
        self.walk_members(&group, &normalize(path), recursive, &mut |p, _| {
            out.push(p.to_string())
        })?;
        Ok(out)
    }

    /// List sub-groups (shallow names, or full subtree paths when
    /// `recursive`).
    pub fn ls_groups(&self, path: &str, recursive: bool) -> Result<Vec<String>, anyhow::Error> {
        let group = self.group_at(path)?;
        let mut out = Vec::new();
        self.walk_members(&group, &normalize(path), recursive, &mut |p, kind| {
            if kind == MemberKind::Group {
                out.push(p.to_string());
            }
        })?;
        Ok(out)
    }

    /// List datasets (shallow names, or full subtree leaf paths when
    /// `recursive`).
    pub fn ls_datasets(&self, path: &str, recursive: bool) -> Result<Vec<String>, anyhow::Error> {
        let group = self.group_at(path)?;
        let mut out = Vec::new();
        self.walk_members(&group, &normalize(path), recursive, &mut |p, kind| {
            if kind == MemberKind::Dataset {
                out.push(p.to_string());
            }
        })?;
        Ok(out)
    }

    fn walk_members(
        &self,
        group: &Group,
        prefix: &str,
        recursive: bool,
        visit: &mut dyn FnMut(&str, MemberKind),
    ) -> Result<(), anyhow::Error> {
        for name in group.member_names()? {
            let path = join(prefix, &name);
            if let Ok(sub) = group.group(&name) {
                if recursive {
                    visit(&path, MemberKind::Group);
                    self.walk_members(&sub, &path, recursive, visit)?;
                } else {
                    visit(&name, MemberKind::Group);
                }
            } else if recursive {
                visit(&path, MemberKind::Dataset);
            } else {
                visit(&name, MemberKind::Dataset);
            }
        }
        Ok(())
    }

    /// Create a group, including missing intermediate segments.
    pub fn mk_group(&self, path: &str) -> Result<(), anyhow::Error> {
        self.writable("mk_group")?;
        let path = normalize(path);
        let mut group = self.file.group("/")?;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            group = if group.link_exists(segment) {
                group.group(segment)?
            } else {
                group.create_group(segment)?
            };
        }
        Ok(())
    }

    /// Remove a group and its subtree. Removing an absent group is a no-op.
    pub fn rm_group(&self, path: &str) -> Result<(), anyhow::Error> {
        self.writable("rm_group")?;
        let path = normalize(path);
        if !self.has_object(&path) {
            return Ok(());
        }
        let (parent, name) = split_parent(&path);
        self.group_at(parent)?.unlink(name)?;
        Ok(())
    }

    /// Copy a group (subtree, datasets and attributes) from another file.
    /// The source's parent path structure is recreated here; `dstdir`
    /// defaults to the source path.
    pub fn cp_group(
        &self,
        src: &Hdf5File,
        srcdir: &str,
        dstdir: Option<&str>,
    ) -> Result<(), anyhow::Error> {
        self.writable("cp_group")?;
        let srcdir = normalize(srcdir);
        let dstdir = dstdir.map_or_else(|| srcdir.clone(), normalize);
        let (src_parent, _) = split_parent(&srcdir);
        if !src_parent.is_empty() {
            self.mk_group(src_parent)?;
        }
        let source = src.group_at(&srcdir)?;
        self.mk_group(&dstdir)?;
        let destination = self.group_at(&dstdir)?;
        copy_attributes(&source, &destination)?;
        self.copy_members(src, &source, &srcdir, &destination, &dstdir)
    }

    fn copy_members(
        &self,
        src: &Hdf5File,
        source: &Group,
        srcdir: &str,
        destination: &Group,
        dstdir: &str,
    ) -> Result<(), anyhow::Error> {
        for name in source.member_names()? {
            if let Ok(sub) = source.group(&name) {
                let new = destination.create_group(&name)?;
                copy_attributes(&sub, &new)?;
                self.copy_members(src, &sub, &join(srcdir, &name), &new, &join(dstdir, &name))?;
            } else {
                let ds = source.dataset(&name)?;
                copy_dataset(&ds, destination, &name)?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Datasets
    // ------------------------------------------------------------------

    pub fn dataset_exists(&self, hdfdir: &str, name: &str) -> bool {
        let path = join(&normalize(hdfdir), name);
        self.has_object(&path) && self.file.dataset(&path).is_ok()
    }

    pub fn dataset_size(&self, path: &str) -> Result<usize, anyhow::Error> {
        let path = normalize(path);
        ensure_dataset_present(self, &path)?;
        Ok(self.file.dataset(&path)?.size())
    }

    /// Read one dataset into a dynamic-dimensional array.
    pub fn read_dataset<T: H5Type>(&self, path: &str) -> Result<ArrayD<T>, anyhow::Error> {
        let path = normalize(path);
        ensure_dataset_present(self, &path)?;
        Ok(self.file.dataset(&path)?.read_dyn::<T>()?)
    }

    /// Read several datasets of one group into a name → array map.
    ///
    /// `required` filters by name, `*`/`?` wildcards allowed; with `strict`
    /// unmatched patterns produce an error naming the missing keys,
    /// otherwise they are logged and skipped.
    pub fn read_datasets<T: H5Type>(
        &self,
        hdfdir: &str,
        required: Option<&[&str]>,
        recursive: bool,
        strict: bool,
    ) -> Result<HashMap<String, ArrayD<T>>, anyhow::Error> {
        let names = match required {
            Some(patterns) => {
                self.find_matching_datasets(hdfdir, patterns, recursive, strict)?
            }
            None => self.ls_datasets(hdfdir, recursive)?,
        };
        let dir = normalize(hdfdir);
        let mut out = HashMap::with_capacity(names.len());
        for name in names {
            let path = if recursive { name.clone() } else { join(&dir, &name) };
            out.insert(name, self.file.dataset(&path)?.read_dyn::<T>()?);
        }
        Ok(out)
    }

    /// Match dataset names in a group against wildcard patterns.
    pub fn find_matching_datasets(
        &self,
        hdfdir: &str,
        patterns: &[&str],
        recursive: bool,
        strict: bool,
    ) -> Result<Vec<String>, anyhow::Error> {
        let names = self.ls_datasets(hdfdir, recursive)?;
        let matches = find_matching(&names, patterns);
        let missing = find_missing(&names, patterns);
        if !missing.is_empty() {
            if strict {
                return Err(GalacticusError::KeyNotFound {
                    location: normalize(hdfdir),
                    missing,
                }
                .into());
            }
            warn!(
                "no datasets in '{}' match: {}",
                normalize(hdfdir),
                missing.join(", ")
            );
        }
        Ok(matches)
    }

    /// Write a dataset according to the caller's [`WritePolicy`]. The
    /// containing group is created on demand. Datasets are created with
    /// unlimited extents so a later append can resize them.
    pub fn write_dataset<T: H5Type>(
        &self,
        hdfdir: &str,
        name: &str,
        data: ArrayViewD<'_, T>,
        opts: &WriteOptions,
    ) -> Result<(), anyhow::Error> {
        self.writable("write_dataset")?;
        if let WritePolicy::Append = opts.policy {
            return self.append_dataset(hdfdir, name, data, opts);
        }
        self.mk_group(hdfdir)?;
        let group = self.group_at(hdfdir)?;
        if group.link_exists(name) {
            match opts.policy {
                WritePolicy::CreateIfAbsent => {
                    warn!(
                        "dataset '{}' exists in '{}', not overwriting",
                        name,
                        normalize(hdfdir)
                    );
                    return Ok(());
                }
                WritePolicy::Overwrite => group.unlink(name)?,
                WritePolicy::Append => unreachable!(),
            }
        }
        create_dataset(&group, name, data, opts)?;
        Ok(())
    }

    /// Append along axis 0 of a 1-D dataset, creating it when absent.
    pub fn append_dataset<T: H5Type>(
        &self,
        hdfdir: &str,
        name: &str,
        data: ArrayViewD<'_, T>,
        opts: &WriteOptions,
    ) -> Result<(), anyhow::Error> {
        self.writable("append_dataset")?;
        if !self.dataset_exists(hdfdir, name) {
            self.mk_group(hdfdir)?;
            let group = self.group_at(hdfdir)?;
            create_dataset(&group, name, data, opts)?;
            return Ok(());
        }
        ensure!(
            data.ndim() == 1,
            "append is only implemented along axis 0 of 1-d datasets"
        );
        let flat: ArrayView1<T> = data.into_dimensionality()?;
        let ds = self.file.dataset(&join(&normalize(hdfdir), name))?;
        ensure!(
            ds.ndim() == 1,
            "dataset '{}' is not 1-d, cannot append",
            name
        );
        let n = ds.shape()[0];
        let m = flat.len();
        ds.resize((n + m,))?;
        ds.write_slice(flat, s![n..n + m])?;
        Ok(())
    }

    /// Remove a dataset. Removing an absent dataset is a no-op.
    pub fn rm_dataset(&self, hdfdir: &str, name: &str) -> Result<(), anyhow::Error> {
        self.writable("rm_dataset")?;
        if !self.dataset_exists(hdfdir, name) {
            return Ok(());
        }
        self.group_at(hdfdir)?.unlink(name)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    /// Read attributes of an object. With `required`, only the listed keys
    /// are returned; absent keys are logged, or, with `strict`, reported in
    /// a key-not-found error.
    pub fn read_attributes(
        &self,
        path: &str,
        required: Option<&[&str]>,
        strict: bool,
    ) -> Result<HashMap<String, AttrValue>, anyhow::Error> {
        let object = self.object_at(path)?;
        let location = object.location();
        let names = location.attr_names()?;
        let wanted: Vec<String> = match required {
            None => names.clone(),
            Some(keys) => {
                let missing: Vec<String> = keys
                    .iter()
                    .filter(|k| !names.iter().any(|n| n == *k))
                    .map(ToString::to_string)
                    .collect();
                if !missing.is_empty() {
                    if strict {
                        return Err(GalacticusError::KeyNotFound {
                            location: normalize(path),
                            missing,
                        }
                        .into());
                    }
                    warn!(
                        "attributes not present in '{}': {}",
                        normalize(path),
                        missing.join(", ")
                    );
                }
                keys.iter()
                    .filter(|k| names.iter().any(|n| n == *k))
                    .map(ToString::to_string)
                    .collect()
            }
        };
        let mut out = HashMap::with_capacity(wanted.len());
        for name in wanted {
            let attr = location.attr(&name)?;
            out.insert(name, read_attr_value(&attr)?);
        }
        Ok(out)
    }

    /// Write attributes onto an object. Existing keys are skipped unless
    /// `overwrite`, in which case they are replaced.
    pub fn write_attributes(
        &self,
        path: &str,
        attributes: &[(&str, AttrValue)],
        overwrite: bool,
    ) -> Result<(), anyhow::Error> {
        self.writable("write_attributes")?;
        ensure!(
            self.has_object(path),
            "'{}' not found in HDF5 file",
            normalize(path)
        );
        let object = self.object_at(path)?;
        let location = object.location();
        let names = location.attr_names()?;
        for (name, value) in attributes {
            if names.iter().any(|n| n == name) {
                if !overwrite {
                    warn!("attribute '{name}' already exists, ignoring");
                    continue;
                }
                delete_attribute(location, name)?;
            }
            write_attr_value(location, name, value)?;
        }
        Ok(())
    }

    /// Remove the named attributes, or every attribute when `names` is
    /// `None`. Absent names are ignored.
    pub fn rm_attributes(
        &self,
        path: &str,
        names: Option<&[&str]>,
    ) -> Result<(), anyhow::Error> {
        self.writable("rm_attributes")?;
        ensure!(
            self.has_object(path),
            "'{}' not found in HDF5 file",
            normalize(path)
        );
        let object = self.object_at(path)?;
        let location = object.location();
        let present = location.attr_names()?;
        let targets: Vec<String> = match names {
            None => present,
            Some(keys) => keys
                .iter()
                .filter(|k| present.iter().any(|n| n == *k))
                .map(ToString::to_string)
                .collect(),
        };
        for name in targets {
            delete_attribute(location, &name)?;
        }
        Ok(())
    }

    fn object_at(&self, path: &str) -> Result<ObjectHandle, anyhow::Error> {
        let path = normalize(path);
        if path.is_empty() || path == "/" {
            return Ok(ObjectHandle::Group(self.file.group("/")?));
        }
        if let Ok(group) = self.file.group(&path) {
            return Ok(ObjectHandle::Group(group));
        }
        Ok(ObjectHandle::Dataset(self.file.dataset(&path)?))
    }
}

/// A group or dataset; both carry attributes.
enum ObjectHandle {
    Group(Group),
    Dataset(Dataset),
}

impl ObjectHandle {
    fn location(&self) -> &Location {
        match self {
            ObjectHandle::Group(g) => g,
            ObjectHandle::Dataset(d) => d,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MemberKind {
    Group,
    Dataset,
}

fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(segment);
    }
    out
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() || prefix == "/" {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

fn split_parent(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((parent, name)) => (parent, name),
        None => ("", path),
    }
}

fn ensure_dataset_present(file: &Hdf5File, path: &str) -> Result<(), anyhow::Error> {
    if !file.has_object(path) {
        let (dir, name) = split_parent(path);
        return Err(GalacticusError::KeyNotFound {
            location: dir.to_string(),
            missing: vec![name.to_string()],
        }
        .into());
    }
    Ok(())
}

/// Wildcard (`*`, `?`) name match.
pub fn name_matches(pattern: &str, name: &str) -> bool {
    fn matches(p: &[char], n: &[char]) -> bool {
        match (p.first(), n.first()) {
            (None, None) => true,
            (Some('*'), _) => {
                matches(&p[1..], n) || (!n.is_empty() && matches(p, &n[1..]))
            }
            (Some('?'), Some(_)) => matches(&p[1..], &n[1..]),
            (Some(a), Some(b)) if a == b => matches(&p[1..], &n[1..]),
            _ => false,
        }
    }
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();
    matches(&p, &n)
}

fn find_matching(names: &[String], patterns: &[&str]) -> Vec<String> {
    let mut out: Vec<String> = names
        .iter()
        .filter(|n| patterns.iter().any(|p| name_matches(p, n)))
        .cloned()
        .collect();
    out.dedup();
    out
}

fn find_missing(names: &[String], patterns: &[&str]) -> Vec<String> {
    patterns
        .iter()
        .filter(|p| !names.iter().any(|n| name_matches(p, n)))
        .map(ToString::to_string)
        .collect()
}

fn create_dataset<T: H5Type>(
    group: &Group,
    name: &str,
    data: ArrayViewD<'_, T>,
    opts: &WriteOptions,
) -> Result<Dataset, anyhow::Error> {
    let shape: Vec<usize> = data.shape().to_vec();
    if shape.is_empty() {
        // Scalar dataset, no extent to chunk or resize.
        let ds = group.new_dataset_builder().with_data(data).create(name)?;
        return Ok(ds);
    }
    let chunks = opts
        .chunks
        .clone()
        .unwrap_or_else(|| shape.iter().map(|&d| d.max(1)).collect());
    let mut builder = group
        .new_dataset::<T>()
        .shape(hdf5::SimpleExtents::resizable(shape))
        .chunk(chunks);
    if let Some(level) = opts.compression {
        builder = builder.deflate(level);
    }
    if opts.shuffle {
        builder = builder.shuffle();
    }
    let ds = builder.create(name)?;
    ds.write(data)?;
    Ok(ds)
}

/// Copy one dataset, dispatching on the source element type. Unsupported
/// element types are skipped with a warning.
fn copy_dataset(ds: &Dataset, destination: &Group, name: &str) -> Result<(), anyhow::Error> {
    let td = ds.dtype()?.to_descriptor()?;
    let opts = WriteOptions::default();
    match td {
        TypeDescriptor::Integer(_) | TypeDescriptor::Boolean => {
            let data = ds.read_dyn::<i64>()?;
            create_dataset(destination, name, data.view(), &opts)?;
        }
        TypeDescriptor::Unsigned(_) => {
            let data = ds.read_dyn::<u64>()?;
            create_dataset(destination, name, data.view(), &opts)?;
        }
        TypeDescriptor::Float(hdf5::types::FloatSize::U4) => {
            let data = ds.read_dyn::<f32>()?;
            create_dataset(destination, name, data.view(), &opts)?;
        }
        TypeDescriptor::Float(_) => {
            let data = ds.read_dyn::<f64>()?;
            create_dataset(destination, name, data.view(), &opts)?;
        }
        other => {
            warn!("dataset '{name}' has unsupported element type {other:?}, skipping copy");
            return Ok(());
        }
    }
    let copied = destination.dataset(name)?;
    copy_attributes(ds, &copied)?;
    Ok(())
}

fn copy_attributes(source: &Location, destination: &Location) -> Result<(), anyhow::Error> {
    for name in source.attr_names()? {
        let value = read_attr_value(&source.attr(&name)?)?;
        write_attr_value(destination, &name, &value)?;
    }
    Ok(())
}

fn read_attr_value(attr: &Attribute) -> Result<AttrValue, anyhow::Error> {
    let td = attr.dtype()?.to_descriptor()?;
    let scalar = attr.ndim() == 0;
    let value = match td {
        TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) | TypeDescriptor::Boolean => {
            if scalar {
                AttrValue::Int(attr.read_scalar::<i64>()?)
            } else {
                AttrValue::IntVec(attr.read_raw::<i64>()?)
            }
        }
        TypeDescriptor::Float(_) => {
            if scalar {
                AttrValue::Float(attr.read_scalar::<f64>()?)
            } else {
                AttrValue::FloatVec(attr.read_raw::<f64>()?)
            }
        }
        TypeDescriptor::VarLenUnicode => AttrValue::Str(attr.read_scalar::<VarLenUnicode>()?.to_string()),
        TypeDescriptor::VarLenAscii => AttrValue::Str(attr.read_scalar::<VarLenAscii>()?.to_string()),
        TypeDescriptor::FixedAscii(_) | TypeDescriptor::FixedUnicode(_) => {
            AttrValue::Str(read_fixed_string(attr)?)
        }
        other => bail!("unsupported attribute type: {other:?}"),
    };
    Ok(value)
}

/// Fixed-size strings have to be read with a capacity at least as large as
/// the stored size; try from largest to smallest.
fn read_fixed_string(attr: &Attribute) -> Result<String, anyhow::Error> {
    macro_rules! try_sizes {
        ($($n:expr),*) => {
            $(
                if let Ok(s) = attr.read_scalar::<FixedAscii<$n>>() {
                    return Ok(s.to_string().trim_end_matches('\0').to_string());
                }
                if let Ok(s) = attr.read_scalar::<FixedUnicode<$n>>() {
                    return Ok(s.to_string().trim_end_matches('\0').to_string());
                }
            )*
        };
    }
    try_sizes!(1024, 512, 256, 128, 64, 32, 16, 8, 4, 2, 1);
    bail!("fixed-size string attribute larger than 1024 bytes")
}

fn write_attr_value(location: &Location, name: &str, value: &AttrValue) -> Result<(), anyhow::Error> {
    match value {
        AttrValue::Int(v) => {
            location.new_attr::<i64>().create(name)?.write_scalar(v)?;
        }
        AttrValue::Float(v) => {
            location.new_attr::<f64>().create(name)?.write_scalar(v)?;
        }
        AttrValue::Str(v) => {
            let v: VarLenUnicode = v
                .parse()
                .map_err(|e| anyhow!("invalid utf-8 attribute: {e}"))?;
            location
                .new_attr::<VarLenUnicode>()
                .create(name)?
                .write_scalar(&v)?;
        }
        AttrValue::IntVec(v) => {
            location
                .new_attr::<i64>()
                .shape((v.len(),))
                .create(name)?
                .write(ArrayView1::from(v.as_slice()))?;
        }
        AttrValue::FloatVec(v) => {
            location
                .new_attr::<f64>()
                .shape((v.len(),))
                .create(name)?
                .write(ArrayView1::from(v.as_slice()))?;
        }
    }
    Ok(())
}

/// The high-level API has no attribute deletion; go through the C library.
fn delete_attribute(location: &Location, name: &str) -> Result<(), anyhow::Error> {
    let cname = CString::new(name)?;
    let err = hdf5::sync::sync(|| unsafe {
        hdf5_sys::h5a::H5Adelete(location.id(), cname.as_ptr())
    });
    ensure!(err >= 0, "could not delete attribute '{name}'");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matching() {
        assert!(name_matches("*", "anything"));
        assert!(name_matches("diskMassStellar", "diskMassStellar"));
        assert!(name_matches("disk*", "diskMassGaseous"));
        assert!(name_matches("*Stellar", "spheroidMassStellar"));
        assert!(name_matches("Output?", "Output1"));
        assert!(!name_matches("Output?", "Output12"));
        assert!(!name_matches("disk*", "spheroidMassStellar"));
    }

    #[test]
    fn path_helpers() {
        assert_eq!(normalize("/Outputs/Output1/"), "Outputs/Output1");
        assert_eq!(normalize("//"), "");
        assert_eq!(join("", "a"), "a");
        assert_eq!(join("a/b", "c"), "a/b/c");
        assert_eq!(split_parent("a/b/c"), ("a/b", "c"));
        assert_eq!(split_parent("a"), ("", "a"));
    }

    #[test]
    fn missing_patterns_reported() {
        let names = vec!["nodeIndex".to_string(), "diskMassStellar".to_string()];
        let missing = find_missing(&names, &["disk*", "spheroid*"]);
        assert_eq!(missing, vec!["spheroid*".to_string()]);
        let matched = find_matching(&names, &["disk*", "node*"]);
        assert_eq!(matched.len(), 2);
    }
}
