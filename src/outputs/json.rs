//! JSON Feed 1 writer.
//!
//! Reading time travels as a nested extension object, `"_cn": {"readingTime": N}`,
//! never as a flat custom field. Categories become `tags`.

use super::{FeedChannel, FeedError, FeedItem};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

pub const JSON_FEED_VERSION: &str = "https://jsonfeed.org/version/1";

#[derive(Debug, Serialize)]
struct JsonFeed<'a> {
    version: &'static str,
    title: &'a str,
    home_page_url: &'a str,
    feed_url: &'a str,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<&'a str>,
    items: Vec<JsonItem<'a>>,
}

#[derive(Debug, Serialize)]
struct JsonItem<'a> {
    id: &'a str,
    url: &'a str,
    title: &'a str,
    content_html: &'a str,
    summary: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
    date_published: String,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    tags: &'a [String],
    #[serde(rename = "_cn", skip_serializing_if = "Option::is_none")]
    cn: Option<CnExtension>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CnExtension {
    reading_time: u32,
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn write(channel: &FeedChannel, items: &[FeedItem]) -> Result<String, FeedError> {
    let feed = JsonFeed {
        version: JSON_FEED_VERSION,
        title: &channel.title,
        home_page_url: &channel.link,
        feed_url: &channel.links.json,
        description: &channel.description,
        icon: channel.image.as_deref(),
        items: items
            .iter()
            .map(|item| JsonItem {
                id: &item.id,
                url: &item.link,
                title: &item.title,
                content_html: &item.body,
                summary: &item.body,
                image: item.image.as_deref(),
                date_published: timestamp(&item.date),
                tags: &item.categories,
                cn: item.reading_time.map(|reading_time| CnExtension { reading_time }),
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&feed)?)
}
