use std::fmt::Display;

use serde::{Deserialize, Serialize};
use url::Url;

const VIDEO_EXTENSION: &str = ".mp4";
const VIDEO_FORMAT_QUERY_PARAM: &str = "format";

/// GraphQL `__typename` of a Frontify asset node.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum AssetType {
    Image,
    Video,
    Document,
    Audio,
    File,
    Other(String),
}

impl From<String> for AssetType {
    fn from(typename: String) -> Self {
        match typename.as_str() {
            "Image" => AssetType::Image,
            "Video" => AssetType::Video,
            "Document" => AssetType::Document,
            "Audio" => AssetType::Audio,
            "File" => AssetType::File,
            _ => AssetType::Other(typename),
        }
    }
}

impl Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetType::Image => write!(f, "Image"),
            AssetType::Video => write!(f, "Video"),
            AssetType::Document => write!(f, "Document"),
            AssetType::Audio => write!(f, "Audio"),
            AssetType::File => write!(f, "File"),
            AssetType::Other(typename) => write!(f, "{}", typename),
        }
    }
}

impl AssetType {
    pub fn is_visual(&self) -> bool {
        matches!(self, AssetType::Image | AssetType::Video)
    }
}

/// What a poll of `AssetById` reported about the processed asset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteAssetState {
    pub asset_type: Option<AssetType>,
    pub preview_url: Option<String>,
    pub download_url: Option<String>,
}

impl RemoteAssetState {
    /// Images and videos are usable as soon as they exist, other assets once
    /// their download URL has been issued.
    pub fn is_ready(&self) -> bool {
        self.asset_type.as_ref().is_some_and(AssetType::is_visual) || self.download_url.is_some()
    }
}

/// Result of an upload as handed back to the caller. A present `error_message`
/// marks a failed upload; the other fields then hold whatever was already known.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    pub asset_id: Option<String>,
    pub url: Option<String>,
    pub extension: Option<String>,
    pub error_message: Option<String>,
}

impl UploadOutcome {
    pub fn failed(asset_id: Option<String>, error_message: impl Into<String>) -> Self {
        Self {
            asset_id,
            error_message: Some(error_message.into()),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_message.is_none()
    }
}

/// Maps a processed asset onto the URL the caller should reference.
///
/// Videos get a fixed `.mp4` extension and a `format=.mp4` hint on their preview
/// URL. Assets that are neither images nor videos are not previewable, so their
/// download URL is used instead.
pub fn map_asset(
    asset_id: &str,
    asset_type: &AssetType,
    preview_url: Option<&str>,
    download_url: Option<&str>,
) -> UploadOutcome {
    let mut outcome = UploadOutcome {
        asset_id: Some(asset_id.to_string()),
        ..Default::default()
    };

    outcome.url = match asset_type {
        AssetType::Video => {
            outcome.extension = Some(VIDEO_EXTENSION.to_string());
            preview_url.map(with_video_format)
        }
        AssetType::Image => preview_url.map(str::to_string),
        _ => download_url.map(str::to_string),
    };

    outcome
}

fn with_video_format(url: &str) -> String {
    if has_format_param(url) {
        return url.to_string();
    }

    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{VIDEO_FORMAT_QUERY_PARAM}={VIDEO_EXTENSION}")
}

fn has_format_param(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed
            .query_pairs()
            .any(|(key, _)| key == VIDEO_FORMAT_QUERY_PARAM),
        Err(_) => url.contains(VIDEO_FORMAT_QUERY_PARAM),
    }
}
