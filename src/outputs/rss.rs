//! RSS 2.0 writer.
//!
//! The root always declares `xmlns:atom` for the self link. `xmlns:cn` is
//! declared only when at least one item carries a reading time, and each such
//! item gets a `<cn:readingTime>` element.

use super::{
    CN_NAMESPACE, FeedChannel, FeedError, FeedItem, GENERATOR, image_mime_type, write_text_element,
};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";
const RSS_DOCS: &str = "https://validator.w3.org/feed/docs/rss2.html";

pub fn write(channel: &FeedChannel, items: &[FeedItem]) -> Result<String, FeedError> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut root = BytesStart::new("rss");
    root.push_attribute(("version", "2.0"));
    root.push_attribute(("xmlns:atom", ATOM_NAMESPACE));
    if items.iter().any(|item| item.reading_time.is_some()) {
        root.push_attribute(("xmlns:cn", CN_NAMESPACE));
    }
    writer.write_event(Event::Start(root))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    write_text_element(&mut writer, "title", &channel.title)?;
    write_text_element(&mut writer, "link", &channel.link)?;
    write_text_element(&mut writer, "description", &channel.description)?;
    write_text_element(&mut writer, "lastBuildDate", &channel.updated.to_rfc2822())?;
    write_text_element(&mut writer, "docs", RSS_DOCS)?;
    write_text_element(&mut writer, "generator", GENERATOR)?;
    write_text_element(&mut writer, "language", channel.language)?;
    write_text_element(&mut writer, "copyright", &channel.copyright)?;
    if let Some(image) = &channel.image {
        writer.write_event(Event::Start(BytesStart::new("image")))?;
        write_text_element(&mut writer, "title", &channel.title)?;
        write_text_element(&mut writer, "url", image)?;
        write_text_element(&mut writer, "link", &channel.link)?;
        writer.write_event(Event::End(BytesEnd::new("image")))?;
    }
    let mut self_link = BytesStart::new("atom:link");
    self_link.push_attribute(("href", channel.links.rss.as_str()));
    self_link.push_attribute(("rel", "self"));
    self_link.push_attribute(("type", "application/rss+xml"));
    writer.write_event(Event::Empty(self_link))?;
    for category in &channel.categories {
        write_text_element(&mut writer, "category", category)?;
    }

    for item in items {
        write_item(&mut writer, item)?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;
    Ok(String::from_utf8(writer.into_inner())?)
}

fn write_item(writer: &mut Writer<Vec<u8>>, item: &FeedItem) -> Result<(), FeedError> {
    writer.write_event(Event::Start(BytesStart::new("item")))?;
    write_text_element(writer, "title", &item.title)?;
    write_text_element(writer, "link", &item.link)?;

    let mut guid = BytesStart::new("guid");
    if item.id != item.link {
        guid.push_attribute(("isPermaLink", "false"));
    }
    writer.write_event(Event::Start(guid))?;
    writer.write_event(Event::Text(BytesText::new(&item.id)))?;
    writer.write_event(Event::End(BytesEnd::new("guid")))?;

    write_text_element(writer, "pubDate", &item.date.to_rfc2822())?;
    write_text_element(writer, "description", &item.body)?;
    for category in &item.categories {
        write_text_element(writer, "category", category)?;
    }
    if let Some(image) = &item.image {
        let mut enclosure = BytesStart::new("enclosure");
        enclosure.push_attribute(("url", image.as_str()));
        enclosure.push_attribute(("length", "0"));
        enclosure.push_attribute(("type", image_mime_type(image)));
        writer.write_event(Event::Empty(enclosure))?;
    }
    if let Some(minutes) = item.reading_time {
        write_text_element(writer, "cn:readingTime", &minutes.to_string())?;
    }
    writer.write_event(Event::End(BytesEnd::new("item")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::FeedAssembler;
    use crate::outputs::tests::{SOURCE, sample_articles};

    fn rss_for(articles: &[crate::models::Article]) -> String {
        FeedAssembler::new("http://localhost:3000")
            .generate_feeds(SOURCE, articles, "Huskies")
            .unwrap()
            .rss
    }

    #[test]
    fn test_rss_document_shape() {
        let rss = rss_for(&sample_articles());
        assert!(rss.starts_with("<?xml"));
        assert!(rss.contains("<rss version=\"2.0\""));
        assert!(rss.ends_with("</rss>"));
        assert_eq!(rss.matches("<item>").count(), 2);
        assert!(rss.contains("<category>Washington Huskies Football</category>"));
        assert!(rss.contains("format=rss"));
    }

    #[test]
    fn test_rss_item_fields() {
        let rss = rss_for(&sample_articles());
        assert!(rss.contains(
            "<enclosure url=\"https://images.seattletimes.com/opener.png\" length=\"0\" type=\"image/png\"/>"
        ));
        assert!(rss.contains("<category>Research</category>"));
        assert!(rss.contains("<description>A strong start &amp; a loud stadium</description>"));
        // empty description falls back to the title
        assert!(rss.contains("<description>Depth chart questions remain</description>"));
        assert!(rss.contains("<pubDate>Tue, 1 Sep 2026 12:00:00 +0000</pubDate>"));
    }

    #[test]
    fn test_reading_time_extension() {
        let rss = rss_for(&sample_articles());
        assert!(rss.contains(&format!("xmlns:cn=\"{CN_NAMESPACE}\"")));
        assert!(rss.contains("<cn:readingTime>5</cn:readingTime>"));
        assert_eq!(rss.matches("<cn:readingTime>").count(), 1);
    }

    #[test]
    fn test_no_namespace_without_reading_time() {
        let mut articles = sample_articles();
        articles[0].reading_time = None;
        let rss = rss_for(&articles);
        assert!(!rss.contains("xmlns:cn"));
        assert!(!rss.contains("cn:readingTime"));
    }

    #[test]
    fn test_empty_article_list_is_a_valid_channel() {
        let rss = rss_for(&[]);
        assert!(rss.contains("<channel>"));
        assert!(!rss.contains("<item>"));
        assert!(!rss.contains("<image>"));
    }
}
