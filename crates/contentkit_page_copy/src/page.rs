//! Container page body: XML <-> [`SpecContainerPage`].
//!
//! ```xml
//! <ContainerPage>
//!   <Container name="main" type="content" parent="...">
//!     <Element id="..." formatter="..." create-new="true">
//!       <Setting name="key">value</Setting>
//!     </Element>
//!   </Container>
//! </ContainerPage>
//! ```

use std::collections::BTreeMap;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use roxmltree::{Document, Node};
use uuid::Uuid;

use crate::spec::{PageXmlError, SpecContainer, SpecContainerElement, SpecContainerPage};

const C_TAG_PAGE: &str = "ContainerPage";
const C_TAG_CONTAINER: &str = "Container";
const C_TAG_ELEMENT: &str = "Element";
const C_TAG_SETTING: &str = "Setting";

////////////////////////////////////////////////////////////////////////////////
// #region Parse

/// Parse a container page body.
pub fn parse_container_page(txt: &str) -> Result<SpecContainerPage, PageXmlError> {
    let doc = Document::parse(txt)?;
    let node_root = doc.root_element();
    if node_root.tag_name().name() != C_TAG_PAGE {
        return Err(PageXmlError::Structure(format!(
            "expected <{C_TAG_PAGE}>, found <{}>",
            node_root.tag_name().name()
        )));
    }

    let mut containers = Vec::new();
    for node_container in element_children(node_root, C_TAG_CONTAINER) {
        containers.push(parse_container(node_container)?);
    }
    Ok(SpecContainerPage { containers })
}

fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

fn required_attribute<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str, PageXmlError> {
    node.attribute(name).ok_or_else(|| {
        PageXmlError::Structure(format!(
            "<{}> is missing attribute `{name}`",
            node.tag_name().name()
        ))
    })
}

fn parse_uuid(value: &str) -> Result<Uuid, PageXmlError> {
    Uuid::parse_str(value.trim())
        .map_err(|e| PageXmlError::Structure(format!("invalid id `{value}`: {e}")))
}

fn parse_container(node: Node<'_, '_>) -> Result<SpecContainer, PageXmlError> {
    let mut elements = Vec::new();
    for node_element in element_children(node, C_TAG_ELEMENT) {
        elements.push(parse_element(node_element)?);
    }
    Ok(SpecContainer {
        name: required_attribute(node, "name")?.to_string(),
        type_container: node.attribute("type").unwrap_or_default().to_string(),
        id_parent_instance: node.attribute("parent").map(str::to_string),
        elements,
    })
}

fn parse_element(node: Node<'_, '_>) -> Result<SpecContainerElement, PageXmlError> {
    let id_structure = parse_uuid(required_attribute(node, "id")?)?;
    let id_formatter = node.attribute("formatter").map(parse_uuid).transpose()?;
    let if_create_new = node
        .attribute("create-new")
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));

    let mut settings = BTreeMap::new();
    for node_setting in element_children(node, C_TAG_SETTING) {
        let name = required_attribute(node_setting, "name")?;
        settings.insert(
            name.to_string(),
            node_setting.text().unwrap_or_default().to_string(),
        );
    }

    Ok(SpecContainerElement {
        id_structure,
        id_formatter,
        settings,
        if_create_new,
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Write

/// Serialize a container page body.
pub fn write_container_page(page: &SpecContainerPage) -> Result<String, PageXmlError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_event(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    write_event(&mut writer, Event::Start(BytesStart::new(C_TAG_PAGE)))?;

    for container in &page.containers {
        let mut tag_container = BytesStart::new(C_TAG_CONTAINER);
        tag_container.push_attribute(("name", container.name.as_str()));
        tag_container.push_attribute(("type", container.type_container.as_str()));
        if let Some(id_parent) = &container.id_parent_instance {
            tag_container.push_attribute(("parent", id_parent.as_str()));
        }
        write_event(&mut writer, Event::Start(tag_container))?;
        for element in &container.elements {
            write_element(&mut writer, element)?;
        }
        write_event(&mut writer, Event::End(BytesEnd::new(C_TAG_CONTAINER)))?;
    }

    write_event(&mut writer, Event::End(BytesEnd::new(C_TAG_PAGE)))?;
    String::from_utf8(writer.into_inner()).map_err(|e| PageXmlError::Write(e.to_string()))
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    element: &SpecContainerElement,
) -> Result<(), PageXmlError> {
    let c_id = element.id_structure.to_string();
    let c_formatter = element.id_formatter.map(|id| id.to_string());

    let mut tag_element = BytesStart::new(C_TAG_ELEMENT);
    tag_element.push_attribute(("id", c_id.as_str()));
    if let Some(c_formatter) = &c_formatter {
        tag_element.push_attribute(("formatter", c_formatter.as_str()));
    }
    if element.if_create_new {
        tag_element.push_attribute(("create-new", "true"));
    }

    if element.settings.is_empty() {
        return write_event(writer, Event::Empty(tag_element));
    }

    write_event(writer, Event::Start(tag_element))?;
    for (name, value) in &element.settings {
        let mut tag_setting = BytesStart::new(C_TAG_SETTING);
        tag_setting.push_attribute(("name", name.as_str()));
        write_event(writer, Event::Start(tag_setting))?;
        write_event(writer, Event::Text(BytesText::new(value)))?;
        write_event(writer, Event::End(BytesEnd::new(C_TAG_SETTING)))?;
    }
    write_event(writer, Event::End(BytesEnd::new(C_TAG_ELEMENT)))
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), PageXmlError> {
    writer
        .write_event(event)
        .map_err(|e| PageXmlError::Write(e.to_string()))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{parse_container_page, write_container_page};
    use crate::spec::PageXmlError;

    const ID_A: &str = "0b5a3e36-1f0e-4d8c-9a51-6f3a3c2e1d01";
    const ID_B: &str = "0b5a3e36-1f0e-4d8c-9a51-6f3a3c2e1d02";
    const ID_FMT: &str = "0b5a3e36-1f0e-4d8c-9a51-6f3a3c2e1dff";

    fn sample_page() -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ContainerPage>
  <Container name="main" type="content">
    <Element id="{ID_A}" formatter="{ID_FMT}">
      <Setting name="style">wide &amp; dark</Setting>
      <Setting name="empty"></Setting>
    </Element>
    <Element id="{ID_B}" create-new="true"/>
  </Container>
  <Container name="main-nested" type="row" parent="inst-1">
    <Element id="{ID_A}"/>
  </Container>
</ContainerPage>"#
        )
    }

    #[test]
    fn parse_reads_containers_and_elements() {
        let page = parse_container_page(&sample_page()).expect("parse");
        assert_eq!(page.containers.len(), 2);

        let container_main = &page.containers[0];
        assert_eq!(container_main.name, "main");
        assert_eq!(container_main.type_container, "content");
        assert_eq!(container_main.id_parent_instance, None);
        assert_eq!(container_main.elements.len(), 2);

        let element_a = &container_main.elements[0];
        assert_eq!(element_a.id_structure.to_string(), ID_A);
        assert_eq!(element_a.id_formatter.map(|v| v.to_string()).as_deref(), Some(ID_FMT));
        assert_eq!(element_a.settings["style"], "wide & dark");
        assert_eq!(element_a.settings["empty"], "");
        assert!(!element_a.if_create_new);
        assert!(container_main.elements[1].if_create_new);

        let container_nested = &page.containers[1];
        assert_eq!(container_nested.id_parent_instance.as_deref(), Some("inst-1"));
    }

    #[test]
    fn written_page_parses_back_identically() {
        let page = parse_container_page(&sample_page()).expect("parse");
        let txt = write_container_page(&page).expect("write");
        assert!(txt.contains("wide &amp; dark"));
        assert_eq!(parse_container_page(&txt).expect("reparse"), page);
    }

    #[test]
    fn structural_errors_are_reported() {
        let err = parse_container_page("<Other/>").expect_err("wrong root");
        assert!(matches!(err, PageXmlError::Structure(_)));

        let err = parse_container_page("<ContainerPage><Container/></ContainerPage>")
            .expect_err("missing name");
        assert!(matches!(err, PageXmlError::Structure(_)));

        let err = parse_container_page(
            r#"<ContainerPage><Container name="m"><Element id="nope"/></Container></ContainerPage>"#,
        )
        .expect_err("bad id");
        assert!(matches!(err, PageXmlError::Structure(_)));

        let err = parse_container_page("<ContainerPage>").expect_err("malformed");
        assert!(matches!(err, PageXmlError::Parse(_)));
    }
}
