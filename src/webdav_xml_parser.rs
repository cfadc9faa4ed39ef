use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use quick_xml::Writer;
use std::str;

use crate::errors::{Result, WebDavError};
use crate::models::{ListedResource, PropertyOption, ResourceInfo};
use crate::urn::{href_url_path, unquote, Urn, SEPARATOR};

pub const DAV_NAMESPACE: &str = "DAV:";

/// Declaration emitted at the top of every request body. Some servers compare
/// bodies byte-for-byte, so the quoting style is fixed.
pub const XML_DECLARATION: &str = "<?xml version='1.0' encoding='UTF-8'?>\n";

/// Element of a parsed XML document with its resolved namespace
#[derive(Debug, Clone, Default)]
pub struct XmlElement {
    pub namespace: Option<String>,
    pub local_name: String,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn from_start(
        namespace: &ResolveResult<'_>,
        start: &BytesStart<'_>,
    ) -> std::result::Result<Self, String> {
        let local = start.local_name();
        let local_name = str::from_utf8(local.as_ref())
            .map_err(|e| format!("Invalid UTF-8 in element name: {}", e))?
            .to_string();
        let namespace = match namespace {
            ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
            _ => None,
        };

        Ok(Self {
            namespace,
            local_name,
            ..Default::default()
        })
    }

    /// True when the element has the given namespace URI and local name
    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.local_name == local_name && self.namespace.as_deref() == Some(namespace)
    }

    /// First direct child with the given qualified name
    pub fn find_child(&self, namespace: &str, local_name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.is(namespace, local_name))
    }

    /// First descendant (depth-first, self excluded) with the given qualified name
    pub fn find_descendant(&self, namespace: &str, local_name: &str) -> Option<&XmlElement> {
        for child in &self.children {
            if child.is(namespace, local_name) {
                return Some(child);
            }
            if let Some(found) = child.find_descendant(namespace, local_name) {
                return Some(found);
            }
        }
        None
    }

    /// First element (self included) with the given local name, in any namespace
    pub fn find_by_local_name(&self, local_name: &str) -> Option<&XmlElement> {
        if self.local_name == local_name {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|child| child.find_by_local_name(local_name))
    }

    /// All descendants with the given qualified name, in document order
    pub fn descendants(&self, namespace: &str, local_name: &str) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        self.collect_descendants(namespace, local_name, &mut found);
        found
    }

    fn collect_descendants<'a>(
        &'a self,
        namespace: &str,
        local_name: &str,
        found: &mut Vec<&'a XmlElement>,
    ) {
        for child in &self.children {
            if child.is(namespace, local_name) {
                found.push(child);
            }
            child.collect_descendants(namespace, local_name, found);
        }
    }

    /// Text of the first descendant with the given qualified name
    pub fn find_text(&self, namespace: &str, local_name: &str) -> Option<String> {
        self.find_descendant(namespace, local_name)
            .map(|element| element.text.clone())
    }
}

/// Parses a whole XML document into an element tree.
///
/// Fails on syntax errors, unbalanced tags and documents without a root element.
pub fn parse_document(content: &[u8]) -> std::result::Result<XmlElement, String> {
    let mut reader = NsReader::from_reader(content);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    let mut buf = Vec::new();

    loop {
        let (namespace, event) = reader
            .read_resolved_event_into(&mut buf)
            .map_err(|e| format!("XML parsing error: {}", e))?;

        match event {
            Event::Start(e) => {
                let element = XmlElement::from_start(&namespace, &e)?;
                stack.push(element);
            }
            Event::Empty(e) => {
                let element = XmlElement::from_start(&namespace, &e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| "Unexpected closing tag".to_string())?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(e) => {
                let text = e.unescape().map_err(|e| format!("Invalid text content: {}", e))?;
                match stack.last_mut() {
                    Some(current) => current.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => return Err("Text outside of the root element".to_string()),
                }
            }
            Event::CData(e) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }

        buf.clear();
    }

    if !stack.is_empty() {
        return Err("Unexpected end of document".to_string());
    }
    root.ok_or_else(|| "Document has no root element".to_string())
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> std::result::Result<(), String> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        Ok(())
    } else if root.is_none() {
        *root = Some(element);
        Ok(())
    } else {
        Err("Document has more than one root element".to_string())
    }
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| WebDavError::Xml { details: e.to_string() })
}

fn open(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new(name)))
}

/// Opens `name` with `DAV:` as its default namespace
fn open_dav(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<()> {
    let start = BytesStart::new(name).with_attributes([("xmlns", DAV_NAMESPACE)]);
    emit(writer, Event::Start(start))
}

fn close(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<()> {
    emit(writer, Event::End(BytesEnd::new(name)))
}

/// Serializes the elements written by `body` behind the fixed declaration
fn to_document<F>(body: F) -> Result<Vec<u8>>
where
    F: FnOnce(&mut Writer<Vec<u8>>) -> Result<()>,
{
    let mut writer = Writer::new(Vec::new());
    body(&mut writer)?;

    let mut document = XML_DECLARATION.as_bytes().to_vec();
    document.extend_from_slice(&writer.into_inner());
    Ok(document)
}

/// PROPFIND body asking for the quota properties
pub fn create_free_space_request_content() -> Result<Vec<u8>> {
    to_document(|writer| {
        open_dav(writer, "propfind")?;
        open(writer, "prop")?;
        emit(writer, Event::Empty(BytesStart::new("quota-available-bytes")))?;
        emit(writer, Event::Empty(BytesStart::new("quota-used-bytes")))?;
        close(writer, "prop")?;
        close(writer, "propfind")
    })
}

/// PROPFIND body asking for a single property
pub fn create_get_property_request_content(option: &PropertyOption) -> Result<Vec<u8>> {
    to_document(|writer| {
        open_dav(writer, "propfind")?;
        open(writer, "prop")?;
        emit(
            writer,
            Event::Empty(
                BytesStart::new(option.name.as_str())
                    .with_attributes([("xmlns", option.namespace_or_empty())]),
            ),
        )?;
        close(writer, "prop")?;
        close(writer, "propfind")
    })
}

/// PROPPATCH body setting every option, in order, under a single `<prop>`
pub fn create_set_property_batch_request_content(options: &[PropertyOption]) -> Result<Vec<u8>> {
    to_document(|writer| {
        open_dav(writer, "propertyupdate")?;
        open(writer, "set")?;
        open(writer, "prop")?;
        for option in options {
            emit(
                writer,
                Event::Start(
                    BytesStart::new(option.name.as_str())
                        .with_attributes([("xmlns", option.namespace_or_empty())]),
                ),
            )?;
            emit(writer, Event::Text(BytesText::new(option.value_or_empty())))?;
            close(writer, &option.name)?;
        }
        close(writer, "prop")?;
        close(writer, "set")?;
        close(writer, "propertyupdate")
    })
}

fn is_collection(response: &XmlElement) -> bool {
    response
        .find_descendant(DAV_NAMESPACE, "resourcetype")
        .and_then(|resource_type| resource_type.find_child(DAV_NAMESPACE, "collection"))
        .is_some()
}

fn decoded_href_path(href: &str) -> String {
    format!("{}{}", SEPARATOR, unquote(&href_url_path(href)))
}

fn extract_info(response: &XmlElement) -> ResourceInfo {
    ResourceInfo {
        created: response.find_text(DAV_NAMESPACE, "creationdate"),
        name: response.find_text(DAV_NAMESPACE, "displayname"),
        size: response.find_text(DAV_NAMESPACE, "getcontentlength"),
        modified: response.find_text(DAV_NAMESPACE, "getlastmodified"),
        etag: response.find_text(DAV_NAMESPACE, "getetag"),
    }
}

/// Extracts one URN per `<response>` carrying an `<href>`.
///
/// Collections get a directory URN. A malformed body yields an empty list.
pub fn parse_get_list_response(content: &[u8]) -> Vec<Urn> {
    let document = match parse_document(content) {
        Ok(document) => document,
        Err(_) => return Vec::new(),
    };

    document
        .descendants(DAV_NAMESPACE, "response")
        .into_iter()
        .filter_map(|response| {
            let href = response.find_child(DAV_NAMESPACE, "href")?;
            if href.text.trim().is_empty() {
                return None;
            }
            let path = decoded_href_path(&href.text);
            Some(if is_collection(response) {
                Urn::dir(&path)
            } else {
                Urn::new(&path)
            })
        })
        .collect()
}

/// Same as [`parse_get_list_response`] but keeps the properties of every entry
pub fn parse_get_list_info_response(content: &[u8]) -> Vec<ListedResource> {
    let document = match parse_document(content) {
        Ok(document) => document,
        Err(_) => return Vec::new(),
    };

    document
        .descendants(DAV_NAMESPACE, "response")
        .into_iter()
        .filter_map(|response| {
            let href = response.find_child(DAV_NAMESPACE, "href")?;
            if href.text.trim().is_empty() {
                return None;
            }
            let is_dir = is_collection(response);
            let path = decoded_href_path(&href.text);
            let urn = if is_dir { Urn::dir(&path) } else { Urn::new(&path) };
            Some(ListedResource {
                path: urn.path(),
                is_dir,
                info: extract_info(response),
            })
        })
        .collect()
}

/// Reads `quota-available-bytes`.
///
/// A malformed body yields `None`; a missing or non-numeric node means the
/// server does not support quota reporting.
pub fn parse_free_space_response(content: &[u8], hostname: &str) -> Result<Option<u64>> {
    let document = match parse_document(content) {
        Ok(document) => document,
        Err(_) => return Ok(None),
    };

    let node = document
        .find_descendant(DAV_NAMESPACE, "quota-available-bytes")
        .ok_or_else(|| WebDavError::method_not_supported("free", hostname))?;

    node.text
        .trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| WebDavError::method_not_supported("free", hostname))
}

/// Finds the `<response>` describing `path`.
///
/// Hrefs are compared as-is and with the URL path of `hostname` stripped, so
/// servers mounted under a sub-path still match.
pub fn extract_response_for_path<'a>(
    document: &'a XmlElement,
    path: &str,
    hostname: &str,
) -> Result<&'a XmlElement> {
    let normalized_path = Urn::normalize_path(path);

    document
        .descendants(DAV_NAMESPACE, "response")
        .into_iter()
        .find(|response| {
            response
                .find_child(DAV_NAMESPACE, "href")
                .is_some_and(|href| Urn::matches_href(&normalized_path, href.text.trim(), hostname))
        })
        .ok_or_else(|| WebDavError::remote_not_found(path))
}

/// Extracts the [`ResourceInfo`] of `path` from a multistatus body
pub fn parse_info_response(content: &[u8], path: &str, hostname: &str) -> Result<ResourceInfo> {
    let document =
        parse_document(content).map_err(|_| WebDavError::method_not_supported("info", hostname))?;
    let response = extract_response_for_path(&document, path, hostname)?;
    Ok(extract_info(response))
}

/// Tells whether `path` is a collection according to a multistatus body
pub fn parse_is_dir_response(content: &[u8], path: &str, hostname: &str) -> Result<bool> {
    let document =
        parse_document(content).map_err(|_| WebDavError::method_not_supported("is_dir", hostname))?;
    let response = extract_response_for_path(&document, path, hostname)?;

    let resource_type = response
        .find_descendant(DAV_NAMESPACE, "resourcetype")
        .ok_or_else(|| WebDavError::method_not_supported("is_dir", hostname))?;

    Ok(resource_type.find_child(DAV_NAMESPACE, "collection").is_some())
}

/// Text of the first element named `name` in any namespace.
///
/// Returns `None` when the property is absent or the body cannot be parsed.
pub fn parse_get_property_response(content: &[u8], name: &str) -> Option<String> {
    let document = parse_document(content).ok()?;
    document
        .find_by_local_name(name)
        .map(|element| element.text.clone())
}
