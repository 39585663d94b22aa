// Flat element arena built from quick-xml events
//
// experiment.xml call-path sections nest as deep as the profiled call
// stacks, so elements are stored in a Vec with index links rather than as
// owned recursive children. Building, walking and dropping the document
// never recurse.

use super::IngestError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Handle to an element of a `Document`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementRef(usize);

/// One markup element: tag, attributes and child elements in order
#[derive(Debug)]
pub struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<ElementRef>,
}

impl Element {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Attribute that must be present
    pub fn require(&self, name: &'static str) -> Result<&str, IngestError> {
        self.attr(name).ok_or_else(|| IngestError::MissingAttribute {
            element: self.tag.clone(),
            attribute: name,
        })
    }

    pub fn children(&self) -> &[ElementRef] {
        &self.children
    }
}

/// Parsed markup document
#[derive(Debug, Default)]
pub struct Document {
    elements: Vec<Element>,
}

impl Document {
    /// Parse markup text into an element arena
    ///
    /// Text, comments, processing instructions and the DOCTYPE are dropped;
    /// only the element structure and attributes are kept.
    pub fn parse(text: &str) -> Result<Self, IngestError> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut document = Document::default();
        let mut open: Vec<ElementRef> = Vec::new();

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    let element = document.push(&start, open.last().copied())?;
                    open.push(element);
                }
                Event::Empty(start) => {
                    document.push(&start, open.last().copied())?;
                }
                Event::End(_) => {
                    open.pop();
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !open.is_empty() {
            return Err(IngestError::Malformed(format!(
                "{} element(s) left unclosed at end of document",
                open.len()
            )));
        }
        if document.elements.is_empty() {
            return Err(IngestError::Malformed("document has no elements".to_string()));
        }

        Ok(document)
    }

    fn push(
        &mut self,
        start: &BytesStart<'_>,
        parent: Option<ElementRef>,
    ) -> Result<ElementRef, IngestError> {
        if parent.is_none() && !self.elements.is_empty() {
            return Err(IngestError::Malformed(
                "more than one top-level element".to_string(),
            ));
        }

        let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute.unescape_value()?.into_owned();
            attributes.push((key, value));
        }

        let element = ElementRef(self.elements.len());
        self.elements.push(Element {
            tag,
            attributes,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.elements[parent.0].children.push(element);
        }
        Ok(element)
    }

    /// The top-level element
    pub fn root(&self) -> ElementRef {
        ElementRef(0)
    }

    pub fn element(&self, element: ElementRef) -> &Element {
        &self.elements[element.0]
    }

    /// Elements below `start` (excluding it) in document order
    pub fn descendants(&self, start: ElementRef) -> impl Iterator<Item = ElementRef> + '_ {
        let mut stack: Vec<ElementRef> = self.element(start).children.iter().rev().copied().collect();
        std::iter::from_fn(move || {
            let current = stack.pop()?;
            stack.extend(self.element(current).children.iter().rev().copied());
            Some(current)
        })
    }

    /// Elements below `start` with the given tag, in document order
    pub fn descendants_named<'a>(
        &'a self,
        start: ElementRef,
        tag: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.descendants(start)
            .map(|element| self.element(element))
            .filter(move |element| element.tag == tag)
    }

    /// First element anywhere in the document with the given tag
    pub fn find(&self, tag: &str) -> Option<ElementRef> {
        let root = self.root();
        if self.element(root).tag == tag {
            return Some(root);
        }
        self.descendants(root)
            .find(|&element| self.element(element).tag == tag)
    }

    /// Required section, by tag
    pub fn section(&self, tag: &'static str) -> Result<ElementRef, IngestError> {
        self.find(tag).ok_or(IngestError::MissingSection(tag))
    }
}
