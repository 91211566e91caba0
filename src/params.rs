use serde_json::{Map, Value};
use url::Url;

use crate::chunk::ChunkSize;
use crate::error::UploadError;
use crate::timing::Timing;

pub const DEFAULT_FRONTIFY_URL: &str = "https://partners.frontify.com/graphql";

pub const DIRECTORIES_PARAMETER_KEY: &str = "FoldersPath";
pub const TOKEN_PARAMETER_KEY: &str = "Token";
pub const PROJECT_ID_PARAMETER_KEY: &str = "ProjectId";
pub const FRONTIFY_URL_PARAMETER_KEY: &str = "FrontifyUrl";

/// What to do when the PUT of a chunk to its pre-signed URL fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChunkFailurePolicy {
    /// Log the failure and carry on with asset creation.
    #[default]
    Ignore,
    /// Attempt every chunk, then fail the upload if any of them failed.
    Fail,
}

#[derive(Debug, Clone)]
pub struct UploaderConfig {
    pub folders_path: Vec<String>,
    pub token: String,
    pub project_id: String,
    pub frontify_url: Url,
    pub chunk_size: ChunkSize,
    pub chunk_failures: ChunkFailurePolicy,
    pub timing: Timing,
}

impl UploaderConfig {
    pub fn new(token: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            folders_path: Vec::new(),
            token: token.into(),
            project_id: project_id.into(),
            frontify_url: default_frontify_url(),
            chunk_size: ChunkSize::default(),
            chunk_failures: ChunkFailurePolicy::default(),
            timing: Timing::default(),
        }
    }

    pub fn with_folders_path(mut self, folders_path: Vec<String>) -> Self {
        self.folders_path = folders_path;
        self
    }

    pub fn with_frontify_url(mut self, frontify_url: Url) -> Self {
        self.frontify_url = frontify_url;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: ChunkSize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_chunk_failures(mut self, chunk_failures: ChunkFailurePolicy) -> Self {
        self.chunk_failures = chunk_failures;
        self
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// Builds a config from the uploader parameter dictionary a host hands
    /// over (`FoldersPath`, `Token`, `ProjectId`, `FrontifyUrl`).
    pub fn from_params(params: &Map<String, Value>) -> Result<Self, UploadError> {
        let folders_path = match params.get(DIRECTORIES_PARAMETER_KEY) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(UploadError::InvalidConfig(format!(
                        "{} entries must be strings, got {}",
                        DIRECTORIES_PARAMETER_KEY, other
                    ))),
                })
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(UploadError::InvalidConfig(format!(
                    "{} must be a list of strings, got {}",
                    DIRECTORIES_PARAMETER_KEY, other
                )));
            }
        };

        let token = string_param(params, TOKEN_PARAMETER_KEY)
            .ok_or_else(|| UploadError::InvalidConfig(format!("{} is required", TOKEN_PARAMETER_KEY)))?;
        let project_id = string_param(params, PROJECT_ID_PARAMETER_KEY).ok_or_else(|| {
            UploadError::InvalidConfig(format!("{} is required", PROJECT_ID_PARAMETER_KEY))
        })?;
        let frontify_url = match string_param(params, FRONTIFY_URL_PARAMETER_KEY) {
            Some(url) => Url::parse(&url).map_err(|e| {
                UploadError::InvalidConfig(format!("{} is not a valid URL: {}", FRONTIFY_URL_PARAMETER_KEY, e))
            })?,
            None => default_frontify_url(),
        };

        Ok(Self::new(token, project_id)
            .with_folders_path(folders_path)
            .with_frontify_url(frontify_url))
    }

    pub fn to_params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert(
            DIRECTORIES_PARAMETER_KEY.to_string(),
            Value::from(self.folders_path.clone()),
        );
        params.insert(TOKEN_PARAMETER_KEY.to_string(), Value::from(self.token.clone()));
        params.insert(
            PROJECT_ID_PARAMETER_KEY.to_string(),
            Value::from(self.project_id.clone()),
        );
        params.insert(
            FRONTIFY_URL_PARAMETER_KEY.to_string(),
            Value::from(self.frontify_url.as_str()),
        );
        params
    }
}

fn default_frontify_url() -> Url {
    Url::parse(DEFAULT_FRONTIFY_URL).expect("default Frontify URL is valid")
}

fn string_param(params: &Map<String, Value>, key: &str) -> Option<String> {
    match params.get(key)? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
