//! Clip references: what a scheduled clip actually points at.
//!
//! The wire format discriminates on a `mediatype` string. This module
//! closes that open string set into a tagged union so downstream dispatch
//! is exhaustive; tag values outside the known set deserialize into
//! [`ClipRef::Unsupported`] carrying the offending tag rather than failing
//! the whole document.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An in/out trim window in milliseconds, applied to the underlying media
/// independent of placement on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutMs {
    /// Trim-in point (milliseconds into the media).
    #[serde(rename = "start", default)]
    pub start_ms: i64,

    /// Trim-out point (milliseconds into the media).
    #[serde(rename = "end", default)]
    pub end_ms: i64,
}

/// A reference to remote media plus its transfer metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRef {
    /// Remote media identifier used for chunk transfer.
    #[serde(rename = "mediaid")]
    pub media_id: String,

    /// MIME type, when the server supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,

    /// Human-readable title; its extension is the fallback when no MIME
    /// type is available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Optional trim window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cut: Option<CutMs>,
}

/// Discriminated union of clip reference types.
///
/// Closed over the five known `mediatype` tags; anything else becomes
/// `Unsupported` so one bad clip never aborts a build.
#[derive(Debug, Clone, PartialEq)]
pub enum ClipRef {
    Video(MediaRef),
    Audio(MediaRef),
    Image(MediaRef),
    Text { text: String },
    Scene,
    Unsupported { media_type: String },
}

impl ClipRef {
    /// The wire tag for this variant.
    pub fn media_type(&self) -> &str {
        match self {
            ClipRef::Video(_) => "video",
            ClipRef::Audio(_) => "audio",
            ClipRef::Image(_) => "image",
            ClipRef::Text { .. } => "text",
            ClipRef::Scene => "scene",
            ClipRef::Unsupported { media_type } => media_type,
        }
    }

    /// The media reference, for variants that carry one.
    pub fn media(&self) -> Option<&MediaRef> {
        match self {
            ClipRef::Video(m) | ClipRef::Audio(m) | ClipRef::Image(m) => Some(m),
            _ => None,
        }
    }
}

/// Wire shape: a flat object discriminated by `mediatype`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RawClipRef {
    mediatype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mediaid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cut: Option<CutMs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl<'de> Deserialize<'de> for ClipRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawClipRef::deserialize(deserializer)?;

        let media = |raw: &RawClipRef| -> Result<MediaRef, D::Error> {
            Ok(MediaRef {
                media_id: raw
                    .mediaid
                    .clone()
                    .ok_or_else(|| D::Error::missing_field("mediaid"))?,
                mime: raw.mime.clone(),
                title: raw.title.clone(),
                cut: raw.cut,
            })
        };

        Ok(match raw.mediatype.as_str() {
            "video" => ClipRef::Video(media(&raw)?),
            "audio" => ClipRef::Audio(media(&raw)?),
            "image" => ClipRef::Image(media(&raw)?),
            "text" => ClipRef::Text {
                text: raw.text.unwrap_or_default(),
            },
            "scene" => ClipRef::Scene,
            _ => ClipRef::Unsupported {
                media_type: raw.mediatype,
            },
        })
    }
}

impl Serialize for ClipRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut raw = RawClipRef {
            mediatype: self.media_type().to_string(),
            ..RawClipRef::default()
        };
        match self {
            ClipRef::Video(m) | ClipRef::Audio(m) | ClipRef::Image(m) => {
                raw.mediaid = Some(m.media_id.clone());
                raw.mime = m.mime.clone();
                raw.title = m.title.clone();
                raw.cut = m.cut;
            }
            ClipRef::Text { text } => raw.text = Some(text.clone()),
            ClipRef::Scene | ClipRef::Unsupported { .. } => {}
        }
        raw.serialize(serializer)
    }
}
