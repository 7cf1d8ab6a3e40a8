//! Document navigation built on top of `lopdf`.
//!
//! `genpdf` has no notion of internal links, so the final pass is post-processed: every placed
//! anchor becomes a named destination in the catalog's `/Dests` dictionary, every recorded link
//! region becomes a `/Link` annotation on its page and the table of contents is mirrored as a flat
//! document outline.

use std::collections::BTreeMap;

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, StringFormat};

use crate::pass::{AnchorPlacement, LinkRegion};

/// Errors that can occur while embedding navigation structures into a rendered PDF document.
#[derive(Debug)]
pub enum NavigationError {
    /// The PDF bytes could not be parsed or written by `lopdf`.
    Parse(lopdf::Error),
    /// The trailer has no usable `/Root` entry.
    MissingCatalog,
    /// The catalog object is not a dictionary.
    InvalidCatalog,
    /// An anchor or link refers to a page the document does not have.
    MissingPage {
        /// Anchor involved in the lookup.
        anchor: String,
        /// The requested (1-indexed) page number.
        page: u32,
    },
    /// A link or outline item targets an anchor that was never placed.
    UndefinedAnchor(String),
}

impl From<lopdf::Error> for NavigationError {
    fn from(err: lopdf::Error) -> Self {
        Self::Parse(err)
    }
}

impl From<std::io::Error> for NavigationError {
    fn from(err: std::io::Error) -> Self {
        Self::Parse(err.into())
    }
}

impl std::fmt::Display for NavigationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "Failed to process PDF bytes: {err}"),
            Self::MissingCatalog => write!(f, "PDF catalog entry is missing"),
            Self::InvalidCatalog => write!(f, "PDF catalog entry is not a dictionary"),
            Self::MissingPage { anchor, page } => write!(
                f,
                "Anchor '{}' refers to missing page {}",
                anchor, page
            ),
            Self::UndefinedAnchor(anchor) => {
                write!(f, "Link target '{anchor}' was never placed in the document")
            }
        }
    }
}

impl std::error::Error for NavigationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::MissingCatalog
            | Self::InvalidCatalog
            | Self::MissingPage { .. }
            | Self::UndefinedAnchor(_) => None,
        }
    }
}

/// A top-level bookmark pointing at an anchor.
#[derive(Clone, Debug, PartialEq)]
pub struct OutlineItem {
    pub title: String,
    pub anchor: String,
}

/// Everything that is added to the rendered bytes.
#[derive(Clone, Debug, Default)]
pub struct Navigation {
    pub anchors: Vec<AnchorPlacement>,
    pub links: Vec<LinkRegion>,
    pub outline: Vec<OutlineItem>,
}

impl Navigation {
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty() && self.links.is_empty() && self.outline.is_empty()
    }
}

/// Adds named destinations, link annotations and the outline to `pdf_bytes`.
pub fn apply_navigation(
    pdf_bytes: &[u8],
    navigation: &Navigation,
) -> Result<Vec<u8>, NavigationError> {
    if navigation.is_empty() {
        return Ok(pdf_bytes.to_vec());
    }

    let mut document = Document::load_mem(pdf_bytes)?;
    let pages = document.get_pages();

    let destinations = resolve_destinations(&navigation.anchors, &pages)?;
    for link in &navigation.links {
        if !destinations.contains_key(link.anchor.as_str()) {
            return Err(NavigationError::UndefinedAnchor(link.anchor.clone()));
        }
    }

    add_link_annotations(&mut document, &navigation.links, &pages)?;
    let outlines_id = add_outline(&mut document, &navigation.outline, &destinations)?;

    let mut dests = Dictionary::new();
    for (name, destination) in &destinations {
        dests.set(name.as_bytes().to_vec(), destination.clone());
    }
    let dests_id = document.add_object(dests);

    let catalog = catalog_mut(&mut document)?;
    catalog.set("Dests", Object::Reference(dests_id));
    if let Some(outlines_id) = outlines_id {
        catalog.set("Outlines", Object::Reference(outlines_id));
        catalog.set("PageMode", Object::Name(b"UseOutlines".to_vec()));
    }

    let mut buffer = Vec::new();
    document.save_to(&mut buffer)?;
    Ok(buffer)
}

/// `[page /XYZ null top null]` for every anchor; the first placement of a name wins.
fn resolve_destinations<'a>(
    anchors: &'a [AnchorPlacement],
    pages: &BTreeMap<u32, ObjectId>,
) -> Result<BTreeMap<&'a str, Object>, NavigationError> {
    let mut destinations = BTreeMap::new();
    for anchor in anchors {
        if destinations.contains_key(anchor.name.as_str()) {
            continue;
        }
        let page_id = pages
            .get(&anchor.page)
            .copied()
            .ok_or_else(|| NavigationError::MissingPage {
                anchor: anchor.name.clone(),
                page: anchor.page,
            })?;
        let destination = Object::Array(vec![
            Object::Reference(page_id),
            Object::Name(b"XYZ".to_vec()),
            Object::Null,
            (anchor.top as f32).into(),
            Object::Null,
        ]);
        destinations.insert(anchor.name.as_str(), destination);
    }
    Ok(destinations)
}

fn add_link_annotations(
    document: &mut Document,
    links: &[LinkRegion],
    pages: &BTreeMap<u32, ObjectId>,
) -> Result<(), NavigationError> {
    let mut by_page: BTreeMap<ObjectId, Vec<Object>> = BTreeMap::new();

    for link in links {
        let page_id = pages
            .get(&link.page)
            .copied()
            .ok_or_else(|| NavigationError::MissingPage {
                anchor: link.anchor.clone(),
                page: link.page,
            })?;
        let rect: Vec<Object> = link.rect.iter().map(|value| (*value as f32).into()).collect();
        let annotation = dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => rect,
            "Border" => vec![0.into(), 0.into(), 0.into()],
            "Dest" => Object::Name(link.anchor.as_bytes().to_vec()),
        };
        let annotation_id = document.add_object(annotation);
        by_page
            .entry(page_id)
            .or_default()
            .push(Object::Reference(annotation_id));
    }

    for (page_id, mut annotations) in by_page {
        let page = document.get_object_mut(page_id)?.as_dict_mut()?;
        if let Ok(Object::Array(existing)) = page.get(b"Annots") {
            let mut merged = existing.clone();
            merged.append(&mut annotations);
            annotations = merged;
        }
        page.set("Annots", Object::Array(annotations));
    }

    Ok(())
}

fn add_outline(
    document: &mut Document,
    items: &[OutlineItem],
    destinations: &BTreeMap<&str, Object>,
) -> Result<Option<ObjectId>, NavigationError> {
    if items.is_empty() {
        return Ok(None);
    }

    let outlines_id = document.new_object_id();
    let ids: Vec<ObjectId> = items.iter().map(|_| document.new_object_id()).collect();

    for (index, item) in items.iter().enumerate() {
        let destination = destinations
            .get(item.anchor.as_str())
            .cloned()
            .ok_or_else(|| NavigationError::UndefinedAnchor(item.anchor.clone()))?;

        let mut dictionary = Dictionary::new();
        dictionary.set("Title", text_string(&item.title));
        dictionary.set("Dest", destination);
        dictionary.set("Parent", Object::Reference(outlines_id));
        if index > 0 {
            dictionary.set("Prev", Object::Reference(ids[index - 1]));
        }
        if index + 1 < ids.len() {
            dictionary.set("Next", Object::Reference(ids[index + 1]));
        }
        document
            .objects
            .insert(ids[index], Object::Dictionary(dictionary));
    }

    let mut root = Dictionary::new();
    root.set("Type", Object::Name(b"Outlines".to_vec()));
    root.set("Count", Object::Integer(ids.len() as i64));
    if let (Some(first), Some(last)) = (ids.first(), ids.last()) {
        root.set("First", Object::Reference(*first));
        root.set("Last", Object::Reference(*last));
    }
    document
        .objects
        .insert(outlines_id, Object::Dictionary(root));

    Ok(Some(outlines_id))
}

fn catalog_mut(document: &mut Document) -> Result<&mut Dictionary, NavigationError> {
    let catalog_id = document
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| NavigationError::MissingCatalog)?;

    document
        .objects
        .get_mut(&catalog_id)
        .ok_or(NavigationError::MissingCatalog)?
        .as_dict_mut()
        .map_err(|_| NavigationError::InvalidCatalog)
}

/// Encodes `text` as a UTF-16BE PDF text string so non-Latin titles survive.
fn text_string(text: &str) -> Object {
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_are_utf16_with_bom() {
        match text_string("目錄") {
            Object::String(bytes, StringFormat::Hexadecimal) => {
                assert_eq!(&bytes[..2], &[0xFE, 0xFF]);
                assert_eq!(bytes.len(), 2 + 2 * 2);
            }
            other => panic!("unexpected object {other:?}"),
        }
    }

    #[test]
    fn empty_navigation_leaves_bytes_untouched() {
        let bytes = b"not even a pdf".to_vec();
        let result = apply_navigation(&bytes, &Navigation::default()).expect("no-op");
        assert_eq!(result, bytes);
    }

    #[test]
    fn unparsable_input_is_reported() {
        let navigation = Navigation {
            outline: vec![OutlineItem {
                title: "x".to_owned(),
                anchor: "a".to_owned(),
            }],
            ..Navigation::default()
        };
        assert!(matches!(
            apply_navigation(b"garbage", &navigation),
            Err(NavigationError::Parse(_))
        ));
    }
}
