//! Stream descriptors handed to the player
//!
//! A descriptor is owned by the catalog and only borrowed (as an `Arc`)
//! by a playback session. Embedded streams never reach the media engine;
//! the caller renders them through a third-party embed whose URL is built
//! by [`embed_url`].

use log::error;
use serde::{Deserialize, Serialize};
use url::Url;

/// How a stream is played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKind {
    /// Third-party embed (an iframe player)
    #[serde(rename = "youtube")]
    EmbeddedVideo,

    /// Segmented adaptive stream driven by the media engine
    #[serde(rename = "m3u8")]
    AdaptiveStream,
}

/// Immutable description of one catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamDescriptor {
    pub id: u64,
    pub title: String,
    pub channel_name: String,
    #[serde(rename = "url")]
    pub source_url: String,
    pub is_live: bool,
    #[serde(rename = "streamType")]
    pub kind: StreamKind,
    #[serde(default)]
    pub thumbnail_url: String,
}

impl StreamDescriptor {
    /// Shorthand used by the builtin catalog and tests
    pub fn adaptive(id: u64, title: &str, url: &str, is_live: bool) -> Self {
        Self {
            id,
            title: title.to_string(),
            channel_name: String::new(),
            source_url: url.to_string(),
            is_live,
            kind: StreamKind::AdaptiveStream,
            thumbnail_url: String::new(),
        }
    }

    pub fn embedded(id: u64, title: &str, url: &str, is_live: bool) -> Self {
        Self {
            kind: StreamKind::EmbeddedVideo,
            ..Self::adaptive(id, title, url, is_live)
        }
    }

    pub fn is_adaptive(&self) -> bool {
        self.kind == StreamKind::AdaptiveStream
    }
}

/// Build the URL for an embedded stream
///
/// A muted start forces `autoplay=1&mute=1`. An unmuted start, which is
/// only requested after an explicit user action, drops both parameters
/// because hosts block unmuted autoplay. If the URL cannot be parsed it is
/// returned unchanged.
pub fn embed_url(stream: &StreamDescriptor, start_unmuted: bool) -> String {
    let mut url = match Url::parse(&stream.source_url) {
        Ok(url) => url,
        Err(e) => {
            error!("Failed to parse stream URL {}: {}", stream.source_url, e);
            return stream.source_url.clone();
        }
    };

    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "autoplay" && key != "mute")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    {
        let mut query = url.query_pairs_mut();
        query.clear();
        query.extend_pairs(retained.iter());
        if !start_unmuted {
            query.append_pair("autoplay", "1");
            query.append_pair("mute", "1");
        }
    }

    if url.query() == Some("") {
        url.set_query(None);
    }

    url.to_string()
}
