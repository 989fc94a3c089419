//! Atom 1.0 writer. Reading time has no Atom representation and is omitted.

use super::{FeedChannel, FeedError, FeedItem, GENERATOR, image_mime_type, write_text_element};
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};

const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn write_link(
    writer: &mut Writer<Vec<u8>>,
    rel: &str,
    href: &str,
    mime: Option<&str>,
) -> Result<(), FeedError> {
    let mut link = BytesStart::new("link");
    link.push_attribute(("rel", rel));
    link.push_attribute(("href", href));
    if let Some(mime) = mime {
        link.push_attribute(("type", mime));
    }
    writer.write_event(Event::Empty(link))?;
    Ok(())
}

fn write_category(writer: &mut Writer<Vec<u8>>, term: &str) -> Result<(), FeedError> {
    let mut category = BytesStart::new("category");
    category.push_attribute(("term", term));
    writer.write_event(Event::Empty(category))?;
    Ok(())
}

pub fn write(channel: &FeedChannel, items: &[FeedItem]) -> Result<String, FeedError> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut root = BytesStart::new("feed");
    root.push_attribute(("xmlns", ATOM_NAMESPACE));
    writer.write_event(Event::Start(root))?;

    write_text_element(&mut writer, "id", &channel.link)?;
    write_text_element(&mut writer, "title", &channel.title)?;
    write_text_element(&mut writer, "updated", &timestamp(&channel.updated))?;
    write_text_element(&mut writer, "generator", GENERATOR)?;
    write_link(&mut writer, "alternate", &channel.link, None)?;
    write_link(&mut writer, "self", &channel.links.atom, Some("application/atom+xml"))?;
    write_text_element(&mut writer, "subtitle", &channel.description)?;
    if let Some(image) = &channel.image {
        write_text_element(&mut writer, "logo", image)?;
    }
    write_text_element(&mut writer, "rights", &channel.copyright)?;
    for category in &channel.categories {
        write_category(&mut writer, category)?;
    }

    for item in items {
        writer.write_event(Event::Start(BytesStart::new("entry")))?;
        write_text_element(&mut writer, "title", &item.title)?;
        write_text_element(&mut writer, "id", &item.id)?;
        write_link(&mut writer, "alternate", &item.link, None)?;
        write_text_element(&mut writer, "updated", &timestamp(&item.date))?;
        write_text_element(&mut writer, "published", &timestamp(&item.date))?;
        write_text_element(&mut writer, "summary", &item.body)?;
        for category in &item.categories {
            write_category(&mut writer, category)?;
        }
        if let Some(image) = &item.image {
            write_link(&mut writer, "enclosure", image, Some(image_mime_type(image)))?;
        }
        writer.write_event(Event::End(BytesEnd::new("entry")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("feed")))?;
    Ok(String::from_utf8(writer.into_inner())?)
}
