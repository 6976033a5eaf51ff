//! An explicit XML element tree with a flattened tag-name index.
//!
//! Galacticus configuration documents address parameters by tag name rather
//! than by path, so the tree keeps a name → slash-delimited-path map built by
//! one full traversal. Tag names are not required to be unique; when a name
//! repeats, the last-seen path wins, which mirrors the behaviour of the
//! Galacticus tooling this format comes from.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Write};
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::errors::GalacticusError;

/// One element: a tag, its attributes in document order, optional text
/// content and child elements.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: &str) -> Element {
        Element {
            tag: tag.to_string(),
            ..Element::default()
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing value for the same key.
    pub fn set_attribute(&mut self, key: &str, value: &str) {
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attributes.push((key.to_string(), value.to_string())),
        }
    }

    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    pub fn child_mut(&mut self, tag: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|c| c.tag == tag)
    }

    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.tag == tag)
    }
}

/// A rooted element tree plus the name → path index.
#[derive(Clone, Debug)]
pub struct XmlTree {
    root: Element,
    map: HashMap<String, String>,
}

impl XmlTree {
    /// Create an empty tree with the given root tag.
    pub fn new(root_tag: &str) -> XmlTree {
        let root = Element::new(root_tag);
        let map = map_elements(&root);
        XmlTree { root, map }
    }

    /// Parse a document from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<XmlTree, anyhow::Error> {
        let fd = File::open(path.as_ref())?;
        XmlTree::from_reader(BufReader::new(fd))
    }

    pub fn from_str(document: &str) -> Result<XmlTree, anyhow::Error> {
        XmlTree::from_reader(Cursor::new(document.as_bytes()))
    }

    pub fn from_reader<R: std::io::BufRead>(rd: R) -> Result<XmlTree, anyhow::Error> {
        let mut reader = Reader::from_reader(rd);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    stack.push(element_from_start(&e)?);
                }
                Event::Empty(e) => {
                    let elem = element_from_start(&e)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(elem),
                        None => root = Some(elem),
                    }
                }
                Event::Text(e) => {
                    let text = e.unescape()?.into_owned();
                    if !text.is_empty() {
                        if let Some(elem) = stack.last_mut() {
                            elem.text = Some(text);
                        }
                    }
                }
                Event::End(_) => {
                    let elem = stack.pop().ok_or_else(|| anyhow!("unbalanced document"))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(elem),
                        None => root = Some(elem),
                    }
                }
                Event::Eof => break,
                _ => (),
            }
            buf.clear();
        }

        ensure!(stack.is_empty(), "unbalanced document");
        let root = root.ok_or_else(|| anyhow!("document has no root element"))?;
        let map = map_elements(&root);

        Ok(XmlTree { root, map })
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Path registered for a tag name, if any.
    #[must_use]
    pub fn path_of(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }

    /// Rebuild the name → path index from the live tree.
    pub fn update_map(&mut self) {
        self.map = map_elements(&self.root);
    }

    /// Resolve a slash-delimited path (starting at the root tag).
    #[must_use]
    pub fn get_element(&self, path: &str) -> Option<&Element> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        match segments.next() {
            Some(tag) if tag == self.root.tag => (),
            _ => return None,
        }
        let mut elem = &self.root;
        for tag in segments {
            elem = elem.child(tag)?;
        }
        Some(elem)
    }

    fn get_element_mut(&mut self, path: &str) -> Option<&mut Element> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        match segments.next() {
            Some(tag) if tag == self.root.tag => (),
            _ => return None,
        }
        let mut elem = &mut self.root;
        for tag in segments {
            elem = elem.child_mut(tag)?;
        }
        Some(elem)
    }

    /// Create an element under `parent` (a tag name, not a path). Missing
    /// parent branches are created on demand. An already-indexed name is left
    /// untouched.
    pub fn create_element(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
        parent: Option<&str>,
        text: Option<&str>,
    ) -> Result<(), anyhow::Error> {
        if self.map.contains_key(name) {
            return Ok(());
        }
        let parent_path = match parent {
            None => self.root.tag.clone(),
            Some(p) if p == self.root.tag => self.root.tag.clone(),
            Some(p) => {
                if !self.map.contains_key(p) {
                    self.create_branch(p)?;
                }
                self.map[p].clone()
            }
        };
        let node = self
            .get_element_mut(&parent_path)
            .ok_or_else(|| anyhow!("broken path to parent element: {parent_path}"))?;
        let mut elem = Element::new(name);
        for (k, v) in attributes {
            elem.set_attribute(k, v);
        }
        elem.text = text.map(str::to_string);
        node.children.push(elem);
        self.map.insert(name.to_string(), format!("{parent_path}/{name}"));
        Ok(())
    }

    /// Create every missing element along a slash-delimited branch under the
    /// root.
    pub fn create_branch(&mut self, branch: &str) -> Result<(), anyhow::Error> {
        let mut parent_path = self.root.tag.clone();
        for tag in branch.split('/').filter(|s| !s.is_empty()) {
            let node = self
                .get_element_mut(&parent_path)
                .ok_or_else(|| anyhow!("broken path to parent element: {parent_path}"))?;
            if node.child(tag).is_none() {
                node.children.push(Element::new(tag));
            }
            parent_path = format!("{parent_path}/{tag}");
            self.map.insert(tag.to_string(), parent_path.clone());
        }
        Ok(())
    }

    /// Update an indexed element's attributes and text. With `self_create`
    /// an unindexed name is created first (under `parent`); otherwise it is
    /// an error.
    pub fn set_element(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
        text: Option<&str>,
        parent: Option<&str>,
        self_create: bool,
    ) -> Result<(), anyhow::Error> {
        if !self.map.contains_key(name) {
            if self_create {
                return self.create_element(name, attributes, parent, text);
            }
            return Err(GalacticusError::ParameterNotFound(name.to_string()).into());
        }
        let path = self.map[name].clone();
        let elem = self
            .get_element_mut(&path)
            .ok_or_else(|| anyhow!("index out of sync with tree at '{path}'"))?;
        for (k, v) in attributes {
            elem.set_attribute(k, v);
        }
        if text.is_some() {
            elem.text = text.map(str::to_string);
        }
        Ok(())
    }

    /// Remove an indexed element and its subtree, dropping every index entry
    /// that pointed into the removed branch.
    pub fn remove_element(&mut self, name: &str) -> Result<(), anyhow::Error> {
        let path = self
            .map
            .get(name)
            .cloned()
            .ok_or_else(|| GalacticusError::ParameterNotFound(name.to_string()))?;
        let (parent_path, tag) = path
            .rsplit_once('/')
            .ok_or_else(|| anyhow!("cannot remove the root element"))?;
        let tag = tag.to_string();
        let parent = self
            .get_element_mut(parent_path)
            .ok_or_else(|| anyhow!("index out of sync with tree at '{parent_path}'"))?;
        let at = parent
            .children
            .iter()
            .position(|c| c.tag == tag)
            .ok_or_else(|| anyhow!("index out of sync with tree at '{path}'"))?;
        parent.children.remove(at);
        let prefix = format!("{path}/");
        self.map
            .retain(|_, p| p != &path && !p.starts_with(&prefix));
        Ok(())
    }

    /// Serialize the current tree, independent of whatever file it was
    /// parsed from.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), anyhow::Error> {
        let mut fd = File::create(path.as_ref())?;
        fd.write_all(self.to_document()?.as_bytes())?;
        Ok(())
    }

    pub fn to_document(&self) -> Result<String, anyhow::Error> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write_element(&mut writer, &self.root)?;
        let mut out = writer.into_inner();
        out.push(b'\n');
        Ok(String::from_utf8(out)?)
    }
}

/// Build the name → path index by one traversal; the last-seen path wins on
/// duplicate tag names.
fn map_elements(root: &Element) -> HashMap<String, String> {
    fn walk(elem: &Element, path: &str, map: &mut HashMap<String, String>) {
        map.insert(elem.tag.clone(), path.to_string());
        for child in &elem.children {
            walk(child, &format!("{path}/{}", child.tag), map);
        }
    }
    let mut map = HashMap::new();
    walk(root, &root.tag, &mut map);
    map
}

fn element_from_start(e: &BytesStart) -> Result<Element, anyhow::Error> {
    let tag = String::from_utf8(e.name().as_ref().to_vec())?;
    let mut elem = Element::new(&tag);
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8(attr.key.as_ref().to_vec())?;
        let value = attr.unescape_value()?.into_owned();
        elem.attributes.push((key, value));
    }
    Ok(elem)
}

fn write_element<W: Write>(writer: &mut Writer<W>, elem: &Element) -> Result<(), anyhow::Error> {
    let mut start = BytesStart::new(elem.tag.as_str());
    for (k, v) in &elem.attributes {
        start.push_attribute((k.as_str(), v.as_str()));
    }
    if elem.children.is_empty() && elem.text.is_none() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    if let Some(text) = &elem.text {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    for child in &elem.children {
        write_element(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(elem.tag.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<parameters>
  <cosmology>
    <OmegaM value="0.25"/>
    <OmegaL value="0.75"/>
  </cosmology>
  <boxSize units="Mpc/h">500.0</boxSize>
</parameters>"#;

    #[test]
    fn parse_and_map() {
        let tree = XmlTree::from_str(DOC).unwrap();
        assert_eq!(tree.root().tag, "parameters");
        assert_eq!(tree.path_of("OmegaM"), Some("parameters/cosmology/OmegaM"));
        assert_eq!(tree.path_of("boxSize"), Some("parameters/boxSize"));
        assert_eq!(tree.path_of("nope"), None);

        let omega = tree.get_element("parameters/cosmology/OmegaM").unwrap();
        assert_eq!(omega.attribute("value"), Some("0.25"));
        let boxsize = tree.get_element("parameters/boxSize").unwrap();
        assert_eq!(boxsize.text.as_deref(), Some("500.0"));
        assert_eq!(boxsize.attribute("units"), Some("Mpc/h"));
    }

    #[test]
    fn create_element_with_missing_branch() {
        let mut tree = XmlTree::new("parameters");
        tree.create_element("sigma8", &[("value", "0.9")], Some("cosmology"), None)
            .unwrap();
        assert_eq!(tree.path_of("sigma8"), Some("parameters/cosmology/sigma8"));
        let elem = tree.get_element("parameters/cosmology/sigma8").unwrap();
        assert_eq!(elem.attribute("value"), Some("0.9"));
    }

    #[test]
    fn set_element_updates_in_place() {
        let mut tree = XmlTree::from_str(DOC).unwrap();
        tree.set_element("OmegaM", &[("value", "0.30")], None, None, false)
            .unwrap();
        let elem = tree.get_element("parameters/cosmology/OmegaM").unwrap();
        assert_eq!(elem.attribute("value"), Some("0.30"));

        let err = tree
            .set_element("H0", &[("value", "73.0")], None, None, false)
            .unwrap_err();
        assert!(err.downcast_ref::<GalacticusError>().is_some());

        tree.set_element("H0", &[("value", "73.0")], None, Some("cosmology"), true)
            .unwrap();
        assert_eq!(tree.path_of("H0"), Some("parameters/cosmology/H0"));
    }

    #[test]
    fn remove_element_prunes_index() {
        let mut tree = XmlTree::from_str(DOC).unwrap();
        tree.remove_element("cosmology").unwrap();
        assert_eq!(tree.path_of("cosmology"), None);
        assert_eq!(tree.path_of("OmegaM"), None);
        assert_eq!(tree.path_of("OmegaL"), None);
        assert_eq!(tree.path_of("boxSize"), Some("parameters/boxSize"));
        assert!(tree.get_element("parameters/cosmology").is_none());
    }

    #[test]
    fn round_trip_preserves_map_and_values() {
        let tree = XmlTree::from_str(DOC).unwrap();
        let doc = tree.to_document().unwrap();
        let again = XmlTree::from_str(&doc).unwrap();
        assert_eq!(tree.map, again.map);
        assert_eq!(
            again
                .get_element("parameters/cosmology/OmegaL")
                .unwrap()
                .attribute("value"),
            Some("0.75")
        );
        assert_eq!(
            again.get_element("parameters/boxSize").unwrap().text.as_deref(),
            Some("500.0")
        );
    }
}
