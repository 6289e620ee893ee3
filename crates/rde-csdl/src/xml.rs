//! A minimal, generic XML element tree, used as the intermediate
//! representation for CSDL/EDMX documents before we interpret them.

use quick_xml::Reader;
use quick_xml::events::Event;

/// A generic XML element: a local name (namespace prefix stripped),
/// attributes, and child elements. CSDL has no mixed text content we care
/// about, so text nodes are dropped.
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Element>,
    /// The 1-based line number the opening tag started on, used for
    /// fatal-error source-line reporting.
    pub line: u32,
}

impl Element {
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }
}

fn strip_prefix(qname: &str) -> String {
    qname.rsplit(':').next().unwrap_or(qname).to_string()
}

/// Parses a buffer of CSDL/EDMX XML into an [`Element`] tree rooted at the
/// document's outermost element.
///
/// # Errors
///
/// Returns a `quick_xml::Error` on malformed XML.
pub fn parse(bytes: &[u8]) -> Result<Element, quick_xml::Error> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut buf = Vec::new();

    loop {
        let line = u32::try_from(reader.buffer_position()).unwrap_or(u32::MAX);
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => {
                let mut element = Element {
                    name: strip_prefix(&String::from_utf8_lossy(start.name().as_ref())),
                    line,
                    ..Element::default()
                };
                for attr in start.attributes().flatten() {
                    let key = strip_prefix(&String::from_utf8_lossy(attr.key.as_ref()));
                    let value = attr.unescape_value().unwrap_or_default().into_owned();
                    element.attrs.push((key, value));
                }
                stack.push(element);
            }
            Event::Empty(start) => {
                let mut element = Element {
                    name: strip_prefix(&String::from_utf8_lossy(start.name().as_ref())),
                    line,
                    ..Element::default()
                };
                for attr in start.attributes().flatten() {
                    let key = strip_prefix(&String::from_utf8_lossy(attr.key.as_ref()));
                    let value = attr.unescape_value().unwrap_or_default().into_owned();
                    element.attrs.push((key, value));
                }
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(element);
                } else {
                    root = Some(element);
                }
            }
            Event::End(_) => {
                if let Some(finished) = stack.pop() {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(finished);
                    } else {
                        root = Some(finished);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(root.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_with_attrs() {
        let xml = br#"<edmx:Edmx Version="4.0">
            <edmx:DataServices>
                <Schema Namespace="Drive.v1_7_0">
                    <EntityType Name="Drive" BaseType="Resource.v1_0_0.Resource" />
                </Schema>
            </edmx:DataServices>
        </edmx:Edmx>"#;
        let root = parse(xml).expect("parse");
        assert_eq!(root.name, "Edmx");
        assert_eq!(root.attr("Version"), Some("4.0"));
        let schema = &root.children[0].children[0];
        assert_eq!(schema.name, "Schema");
        assert_eq!(schema.attr("Namespace"), Some("Drive.v1_7_0"));
        let entity = &schema.children[0];
        assert_eq!(entity.attr("BaseType"), Some("Resource.v1_0_0.Resource"));
    }
}
