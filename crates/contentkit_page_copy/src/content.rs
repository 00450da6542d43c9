//! Locale blocks of structured element content.
//!
//! Element content is a root element holding one `<Content language="..">`
//! child per locale. Moving a locale renames the `language` attribute of one
//! block; everything else is written back byte for byte.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};
use roxmltree::Document;

use crate::spec::PageXmlError;

const C_TAG_CONTENT: &str = "Content";
const C_ATTR_LANGUAGE: &str = "language";

/// Outcome of a locale move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumLocaleMove {
    /// Block renamed; carries the rewritten document.
    Moved(String),
    /// No block under the source locale.
    MissingSource,
    /// A block under the target locale already exists.
    TargetExists,
    /// Source and target locale are the same.
    SameLocale,
}

/// Locales present in `txt`, in document order.
pub fn list_locales(txt: &str) -> Result<Vec<String>, PageXmlError> {
    let doc = Document::parse(txt)?;
    Ok(doc
        .root_element()
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == C_TAG_CONTENT)
        .filter_map(|n| n.attribute(C_ATTR_LANGUAGE).map(str::to_string))
        .collect())
}

/// Move the block of `c_locale_old` to `c_locale_new`.
pub fn move_locale(
    txt: &str,
    c_locale_old: &str,
    c_locale_new: &str,
) -> Result<EnumLocaleMove, PageXmlError> {
    if c_locale_old == c_locale_new {
        return Ok(EnumLocaleMove::SameLocale);
    }
    let l_locales = list_locales(txt)?;
    if !l_locales.iter().any(|c| c == c_locale_old) {
        return Ok(EnumLocaleMove::MissingSource);
    }
    if l_locales.iter().any(|c| c == c_locale_new) {
        return Ok(EnumLocaleMove::TargetExists);
    }

    let mut reader = Reader::from_str(txt);
    let mut writer = Writer::new(Vec::new());
    let mut n_depth: usize = 0;
    loop {
        let event = reader
            .read_event()
            .map_err(|e| PageXmlError::Structure(e.to_string()))?;
        match event {
            Event::Eof => break,
            Event::Start(tag) => {
                let tag_out = if n_depth == 1 {
                    relocate_tag(&tag, c_locale_old, c_locale_new)?
                } else {
                    tag.into_owned()
                };
                n_depth += 1;
                write_event(&mut writer, Event::Start(tag_out))?;
            }
            Event::Empty(tag) => {
                let tag_out = if n_depth == 1 {
                    relocate_tag(&tag, c_locale_old, c_locale_new)?
                } else {
                    tag.into_owned()
                };
                write_event(&mut writer, Event::Empty(tag_out))?;
            }
            Event::End(tag) => {
                n_depth = n_depth.saturating_sub(1);
                write_event(&mut writer, Event::End(tag))?;
            }
            other => write_event(&mut writer, other)?,
        }
    }

    let txt_out =
        String::from_utf8(writer.into_inner()).map_err(|e| PageXmlError::Write(e.to_string()))?;
    Ok(EnumLocaleMove::Moved(txt_out))
}

fn relocate_tag(
    tag: &BytesStart<'_>,
    c_locale_old: &str,
    c_locale_new: &str,
) -> Result<BytesStart<'static>, PageXmlError> {
    if tag.local_name().as_ref() != C_TAG_CONTENT.as_bytes() {
        return Ok(tag.to_owned().into_owned());
    }
    let mut if_match = false;
    for attr in tag.attributes() {
        let attr = attr.map_err(|e| PageXmlError::Structure(e.to_string()))?;
        if attr.key.as_ref() == C_ATTR_LANGUAGE.as_bytes()
            && attr
                .unescape_value()
                .map_err(|e| PageXmlError::Structure(e.to_string()))?
                == c_locale_old
        {
            if_match = true;
        }
    }
    if !if_match {
        return Ok(tag.to_owned().into_owned());
    }

    let mut tag_new = tag.to_owned().into_owned();
    tag_new.clear_attributes();
    for attr in tag.attributes() {
        let attr = attr.map_err(|e| PageXmlError::Structure(e.to_string()))?;
        if attr.key.as_ref() == C_ATTR_LANGUAGE.as_bytes() {
            tag_new.push_attribute((C_ATTR_LANGUAGE, c_locale_new));
        } else {
            tag_new.push_attribute(attr);
        }
    }
    Ok(tag_new)
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), PageXmlError> {
    writer
        .write_event(event)
        .map_err(|e| PageXmlError::Write(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{EnumLocaleMove, list_locales, move_locale};

    const TXT_CONTENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Articles>
  <Content language="en" kind="main">
    <Title>Hello &amp; welcome</Title>
    <Content language="en">nested block is not a locale</Content>
  </Content>
  <Content language="fr"><Title>Bonjour</Title></Content>
</Articles>"#;

    #[test]
    fn locales_listed_in_order() {
        assert_eq!(list_locales(TXT_CONTENT).expect("list"), vec!["en", "fr"]);
    }

    #[test]
    fn move_renames_only_top_level_block() {
        let outcome = move_locale(TXT_CONTENT, "en", "de").expect("move");
        let EnumLocaleMove::Moved(txt) = outcome else {
            panic!("expected move, got {outcome:?}");
        };
        assert_eq!(list_locales(&txt).expect("list"), vec!["de", "fr"]);
        assert!(txt.contains(r#"<Content language="de" kind="main">"#));
        assert!(txt.contains(r#"<Content language="en">nested block"#));
        assert!(txt.contains("Hello &amp; welcome"));
    }

    #[test]
    fn inapplicable_moves_are_reported() {
        assert_eq!(
            move_locale(TXT_CONTENT, "it", "de").expect("move"),
            EnumLocaleMove::MissingSource
        );
        assert_eq!(
            move_locale(TXT_CONTENT, "en", "fr").expect("move"),
            EnumLocaleMove::TargetExists
        );
        assert_eq!(
            move_locale(TXT_CONTENT, "en", "en").expect("move"),
            EnumLocaleMove::SameLocale
        );
        assert!(move_locale("<broken", "en", "de").is_err());
    }

    #[test]
    fn move_matches_prefixed_content_blocks() {
        let txt = r#"<x:A xmlns:x="urn:a"><x:Content language="en"/></x:A>"#;
        let outcome = move_locale(txt, "en", "de").expect("move");
        let EnumLocaleMove::Moved(txt_out) = outcome else {
            panic!("expected move, got {outcome:?}");
        };
        assert_eq!(txt_out, r#"<x:A xmlns:x="urn:a"><x:Content language="de"/></x:A>"#);
        assert_eq!(list_locales(&txt_out).expect("list"), vec!["de"]);
    }
}
