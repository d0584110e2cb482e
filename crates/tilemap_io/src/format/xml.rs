//! Minimal element tree over quick-xml, enough for TMX and TSX files

use crate::error::{Result, SaveFormatError};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Builder-style attribute append
    pub fn attr(mut self, key: &str, value: impl ToString) -> Self {
        self.attributes.push((key.to_string(), value.to_string()));
        self
    }

    pub fn push_attr(&mut self, key: &str, value: impl ToString) {
        self.attributes.push((key.to_string(), value.to_string()));
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Required attribute
    pub fn req(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| SaveFormatError::missing(key))
    }

    /// Optional attribute parsed with `FromStr`
    pub fn parse_opt<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)
            .map(|v| {
                v.trim().parse::<T>().map_err(|_| {
                    SaveFormatError::BadFile(format!("bad value '{}' for '{}'", v, key))
                })
            })
            .transpose()
    }

    /// Required attribute parsed with `FromStr`
    pub fn parse_req<T: std::str::FromStr>(&self, key: &str) -> Result<T> {
        self.parse_opt(key)?
            .ok_or_else(|| SaveFormatError::missing(key))
    }

    pub fn first(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Parse a document and return its root element
    pub fn parse(text: &str) -> Result<Element> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(element_from(&start)?),
                Event::Empty(start) => {
                    let element = element_from(&start)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => return Ok(element),
                    }
                }
                Event::End(_) => {
                    let Some(element) = stack.pop() else {
                        return Err(SaveFormatError::BadFile("unbalanced end tag".into()));
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => return Ok(element),
                    }
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text.unescape()?);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current
                            .text
                            .push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => {
                    return Err(SaveFormatError::BadFile("no root element".into()));
                }
                _ => {}
            }
        }
    }

    /// Serialize as a document with an XML declaration
    pub fn to_document(&self, indent: bool) -> Result<String> {
        let mut writer = if indent {
            Writer::new_with_indent(Vec::new(), b' ', 1)
        } else {
            Writer::new(Vec::new())
        };
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(write_error)?;
        self.write(&mut writer)?;
        let mut text = String::from_utf8(writer.into_inner())
            .map_err(|e| SaveFormatError::BadFile(e.to_string()))?;
        text.push('\n');
        Ok(text)
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        if self.children.is_empty() && self.text.is_empty() {
            return writer.write_event(Event::Empty(start)).map_err(write_error);
        }
        writer.write_event(Event::Start(start)).map_err(write_error)?;
        if !self.text.is_empty() {
            writer
                .write_event(Event::Text(BytesText::new(&self.text)))
                .map_err(write_error)?;
        }
        for child in &self.children {
            child.write(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(write_error)
    }
}

fn element_from(start: &BytesStart) -> Result<Element> {
    let mut element = Element::new(&String::from_utf8_lossy(start.name().as_ref()));
    for attribute in start.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn write_error(error: impl std::fmt::Display) -> SaveFormatError {
    SaveFormatError::BadFile(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_document() {
        let doc = r#"<?xml version="1.0"?>
<map width="2" name="a &amp; b">
 <layer id="1"><data encoding="csv">
1,2
</data></layer>
 <objectgroup/>
</map>"#;
        let root = Element::parse(doc).unwrap();
        assert_eq!(root.name, "map");
        assert_eq!(root.get("name"), Some("a & b"));
        assert_eq!(root.parse_req::<u32>("width").unwrap(), 2);
        assert_eq!(
            root.parse_req::<u32>("height"),
            Err(SaveFormatError::MissingKey("height".into()))
        );
        let data = root.first("layer").unwrap().first("data").unwrap();
        assert_eq!(data.text, "1,2");
        assert_eq!(root.all("objectgroup").count(), 1);
    }

    #[test]
    fn test_write_then_parse() {
        let element = Element::new("tileset")
            .attr("name", "<odd> \"name\"")
            .child(Element::new("image").attr("source", "a.png"));
        let text = element.to_document(true).unwrap();
        assert!(text.starts_with("<?xml"));
        assert_eq!(Element::parse(&text).unwrap(), element);
    }

    #[test]
    fn test_unclosed_document_fails() {
        assert!(Element::parse("<map><layer>").is_err());
    }
}
