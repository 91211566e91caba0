//! Typed request and response shapes of the Frontify GraphQL operations used
//! by the uploader.

use graphql_client::{GraphQLQuery, QueryBody};
use serde::{Deserialize, Serialize};

use crate::asset::AssetType;
use crate::media::MediaKind;

const UPLOAD_FILE_QUERY: &str = include_str!("graphql/upload_file.graphql");
const CREATE_ASSET_QUERY: &str = include_str!("graphql/create_asset.graphql");
const DELETE_ASSET_QUERY: &str = include_str!("graphql/delete_asset.graphql");

const ASSET_BY_ID_IMAGE_QUERY: &str = include_str!("graphql/asset_by_id_image.graphql");
const ASSET_BY_ID_VIDEO_QUERY: &str = include_str!("graphql/asset_by_id_video.graphql");
const ASSET_BY_ID_FILE_QUERY: &str = include_str!("graphql/asset_by_id_file.graphql");

pub struct UploadFile;

pub mod upload_file {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub file: UploadFileInput,
    }

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct UploadFileInput {
        pub filename: String,
        pub size: u64,
        pub chunk_size: u64,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub upload_file: Option<UploadFileUploadFile>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct UploadFileUploadFile {
        pub id: Option<String>,
        #[serde(default)]
        pub urls: Option<Vec<String>>,
    }
}

impl GraphQLQuery for UploadFile {
    type Variables = upload_file::Variables;
    type ResponseData = upload_file::ResponseData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: UPLOAD_FILE_QUERY,
            operation_name: "UploadFile",
        }
    }
}

pub struct CreateAsset;

pub mod create_asset {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub asset: CreateAssetInput,
    }

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CreateAssetInput {
        pub project_id: String,
        pub file_id: String,
        pub title: String,
        pub description: String,
        pub directory: Vec<String>,
        pub author: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub create_asset: Option<CreateAssetCreateAsset>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct CreateAssetCreateAsset {
        pub job: Option<CreateAssetCreateAssetJob>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CreateAssetCreateAssetJob {
        pub asset_id: Option<String>,
    }

    impl ResponseData {
        pub fn asset_id(self) -> Option<String> {
            self.create_asset?
                .job?
                .asset_id
                .filter(|id| !id.is_empty())
        }
    }
}

impl GraphQLQuery for CreateAsset {
    type Variables = create_asset::Variables;
    type ResponseData = create_asset::ResponseData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: CREATE_ASSET_QUERY,
            operation_name: "CreateAsset",
        }
    }
}

pub struct DeleteAsset;

pub mod delete_asset {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub asset: DeleteAssetInput,
    }

    #[derive(Debug, Clone, Serialize)]
    pub struct DeleteAssetInput {
        pub id: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub delete_asset: Option<DeleteAssetDeleteAsset>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct DeleteAssetDeleteAsset {
        pub asset: Option<DeleteAssetDeleteAssetAsset>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct DeleteAssetDeleteAssetAsset {
        pub id: String,
    }
}

impl GraphQLQuery for DeleteAsset {
    type Variables = delete_asset::Variables;
    type ResponseData = delete_asset::ResponseData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: DELETE_ASSET_QUERY,
            operation_name: "DeleteAsset",
        }
    }
}

/// The selection set of `AssetById` depends on the media kind, so unlike the
/// other operations it is built from a kind instead of through [`GraphQLQuery`].
pub struct AssetById;

pub mod asset_by_id {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    pub struct Variables {
        pub id: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ResponseData {
        pub asset: Option<AssetByIdAsset>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AssetByIdAsset {
        #[serde(rename = "type")]
        pub type_: Option<AssetType>,
        pub id: Option<String>,
        pub title: Option<String>,
        pub filename: Option<String>,
        pub extension: Option<String>,
        pub preview_url: Option<String>,
        pub download_url: Option<String>,
    }
}

impl AssetById {
    /// Images and videos are selected on their own type, everything else on
    /// the Document/Audio/File variants with a permanent download URL.
    pub fn document(kind: MediaKind) -> &'static str {
        match kind {
            MediaKind::Image => ASSET_BY_ID_IMAGE_QUERY,
            MediaKind::Video => ASSET_BY_ID_VIDEO_QUERY,
            MediaKind::Other => ASSET_BY_ID_FILE_QUERY,
        }
    }

    pub fn build_query(
        kind: MediaKind,
        variables: asset_by_id::Variables,
    ) -> QueryBody<asset_by_id::Variables> {
        QueryBody {
            variables,
            query: Self::document(kind),
            operation_name: "AssetById",
        }
    }
}
