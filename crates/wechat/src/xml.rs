//! Flat `<xml>` documents as used by the callback protocol.

use std::collections::BTreeMap;

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{Result, WechatError};

/// Read the direct children of the root element into a name → value map.
///
/// Values may be plain text or CDATA. Elements nested deeper than one level
/// are skipped.
pub fn parse_fields(xml: &str) -> Result<BTreeMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut fields = BTreeMap::new();
    let mut depth = 0usize;
    let mut saw_root = false;
    let mut current: Option<String> = None;
    let mut value = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                match depth {
                    1 => saw_root = true,
                    2 => {
                        current = Some(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                        value.clear();
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => match depth {
                0 => saw_root = true,
                1 => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    fields.insert(name, String::new());
                }
                _ => {}
            },
            Ok(Event::Text(t)) if depth == 2 => {
                let text = t.unescape().map_err(|e| WechatError::Xml(e.to_string()))?;
                value.push_str(&text);
            }
            Ok(Event::CData(c)) if depth == 2 => {
                let text = std::str::from_utf8(&c).map_err(|e| WechatError::Xml(e.to_string()))?;
                value.push_str(text);
            }
            Ok(Event::End(_)) => {
                if depth == 2 {
                    if let Some(name) = current.take() {
                        fields.insert(name, std::mem::take(&mut value));
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(WechatError::Xml(format!(
                    "at position {}: {}",
                    reader.error_position(),
                    e
                )))
            }
        }
    }

    if !saw_root {
        return Err(WechatError::Xml("document has no root element".to_string()));
    }

    Ok(fields)
}

/// Builds a flat `<xml>` document, fields in insertion order.
#[derive(Debug, Default, Clone)]
pub struct XmlBuilder {
    body: String,
}

impl XmlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a CDATA field.
    pub fn text(mut self, name: &str, value: &str) -> Self {
        // "]]>" cannot appear inside one CDATA section
        let value = value.replace("]]>", "]]]]><![CDATA[>");
        self.body
            .push_str(&format!("<{name}><![CDATA[{value}]]></{name}>"));
        self
    }

    /// Add an unquoted field such as a number or timestamp.
    pub fn raw(mut self, name: &str, value: &str) -> Self {
        self.body
            .push_str(&format!("<{name}>{}</{name}>", escape(value)));
        self
    }

    pub fn number(self, name: &str, value: i64) -> Self {
        self.raw(name, &value.to_string())
    }

    pub fn build(self) -> String {
        format!("<xml>{}</xml>", self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cdata_and_text() {
        let xml = r#"<xml>
            <ToUserName><![CDATA[gh_123]]></ToUserName>
            <FromUserName><![CDATA[o_abc]]></FromUserName>
            <CreateTime>1700000000</CreateTime>
            <MsgType><![CDATA[text]]></MsgType>
            <Content><![CDATA[  hello <world> ]]></Content>
            <MsgId>42</MsgId>
        </xml>"#;

        let fields = parse_fields(xml).unwrap();
        assert_eq!(fields["ToUserName"], "gh_123");
        assert_eq!(fields["CreateTime"], "1700000000");
        assert_eq!(fields["Content"], "  hello <world> ");
        assert_eq!(fields["MsgId"], "42");
    }

    #[test]
    fn test_nested_elements_are_skipped() {
        let xml = "<xml><Event>scancode_push</Event>\
                   <ScanCodeInfo><ScanType>qrcode</ScanType></ScanCodeInfo>\
                   <Empty/></xml>";
        let fields = parse_fields(xml).unwrap();
        assert_eq!(fields["Event"], "scancode_push");
        assert_eq!(fields["ScanCodeInfo"], "");
        assert_eq!(fields["Empty"], "");
        assert!(!fields.contains_key("ScanType"));
    }

    #[test]
    fn test_invalid_documents() {
        assert!(matches!(parse_fields(""), Err(WechatError::Xml(_))));
        assert!(matches!(
            parse_fields("<xml><A>1</B></xml>"),
            Err(WechatError::Xml(_))
        ));
    }

    #[test]
    fn test_builder_output_parses_back() {
        let xml = XmlBuilder::new()
            .text("ToUserName", "o_abc")
            .number("CreateTime", 1_700_000_000)
            .text("Content", "a ]]> b & c")
            .raw("Note", "x < y")
            .build();

        assert!(xml.starts_with("<xml><ToUserName><![CDATA[o_abc]]></ToUserName>"));
        let fields = parse_fields(&xml).unwrap();
        assert_eq!(fields["CreateTime"], "1700000000");
        assert_eq!(fields["Content"], "a ]]> b & c");
        assert_eq!(fields["Note"], "x < y");
    }
}
