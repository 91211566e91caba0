use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("GraphQL request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Frontify responded with {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Unable to parse GraphQL response: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    /// Messages of the `errors` array of a GraphQL response, joined together.
    #[error("{0}")]
    Remote(String),

    #[error("Missing property values after UploadFile mutation")]
    MissingUploadSession,

    #[error("Upload session returned {urls} chunk URLs for {chunks} chunks")]
    ChunkCountMismatch { chunks: usize, urls: usize },

    #[error("Upload of chunk(s) {indices:?} failed")]
    TransportFailure { indices: Vec<usize> },

    #[error("Asset Id cannot be obtained from CreateAsset mutation result")]
    MissingAssetId,

    #[error("DeleteAsset did not confirm deletion of asset {asset_id}")]
    AssetNotDeleted { asset_id: String },

    #[error("Missing property values after query by asset id {asset_id}")]
    AssetNotReady { asset_id: String },

    #[error("Chunk size {0} bytes is outside the allowed range of 5MB to 1GB")]
    InvalidChunkSize(u64),

    #[error("Invalid uploader configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
