pub mod ecr;

use error::*;
use result::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// The Docker image manifest, version 2 schema 2.
pub const DOCKER_MANIFEST_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";
/// The OCI image manifest, version 1.
pub const OCI_MANIFEST_V1: &str = "application/vnd.oci.image.manifest.v1+json";

/// The manifest formats asked for when looking up an image. Both are single-platform
/// manifests, so whatever comes back can be written under a new tag as is.
pub const ACCEPTED_MEDIA_TYPES: [&str; 2] = [DOCKER_MANIFEST_V2, OCI_MANIFEST_V1];

/// A `Registry` is the collaborator the [Promoter](crate::promoter::Promoter) reads
/// manifests from and writes tags to. Its two operations mirror the ECR API calls of the
/// same name, and any error either of them returns is expected to carry the registry's
/// own error code as its [kind](Kind::kind).
pub trait Registry {
    /// Looks up the images matching `input.image_ids`.
    fn batch_get_image(
        &self,
        input: &BatchGetImageInput,
    ) -> impl Future<Output = Result<BatchGetImageOutput>> + Send;

    /// Writes `input.image_manifest` under `input.image_tag`, returning the registry's
    /// response untouched.
    fn put_image(&self, input: &PutImageInput)
        -> impl Future<Output = Result<PromotionResult>> + Send;
}

/// An image manifest exactly as the registry handed it over. It is never parsed, only
/// carried from the lookup to the write.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
#[serde(transparent)]
pub struct Manifest(String);

impl From<&str> for Manifest {
    fn from(manifest: &str) -> Self {
        Self(manifest.to_string())
    }
}

/// Identifies an image by digest, tag, or both.
#[derive(Serialize, Deserialize, Debug, Clone, Default, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageIdentifier {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_tag: Option<String>,
}

impl ImageIdentifier {
    pub fn tag<T: Into<String>>(tag: T) -> Self {
        Self {
            image_digest: None,
            image_tag: Some(tag.into()),
        }
    }
}

/// The request of [batch-get-image](https://docs.aws.amazon.com/AmazonECR/latest/APIReference/API_BatchGetImage.html).
#[derive(Serialize, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchGetImageInput {
    pub repository_name: String,
    pub image_ids: Vec<ImageIdentifier>,
    pub accepted_media_types: Vec<String>,
}

impl BatchGetImageInput {
    /// Asks for the single image tagged `tag`, in any of the [ACCEPTED_MEDIA_TYPES].
    pub fn for_tag<R: Into<String>, T: Into<String>>(repository_name: R, tag: T) -> Self {
        Self {
            repository_name: repository_name.into(),
            image_ids: vec![ImageIdentifier::tag(tag)],
            accepted_media_types: ACCEPTED_MEDIA_TYPES
                .iter()
                .map(|media_type| media_type.to_string())
                .collect(),
        }
    }
}

/// The response of batch-get-image. ECR reports per-image problems in `failures`
/// rather than failing the call, so both lists have to be checked.
#[derive(Deserialize, Debug, Default, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchGetImageOutput {
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub failures: Vec<ImageFailure>,
}

/// An image found by batch-get-image. ECR sends more than this (registry ID, repository,
/// media type), none of which the promoter needs.
#[derive(Deserialize, Debug, Clone, Default, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub image_id: Option<ImageIdentifier>,
    pub image_manifest: Option<Manifest>,
}

/// A per-image failure of batch-get-image. It serializes back into the same shape it
/// was read from so that it can be reported verbatim.
#[derive(Serialize, Deserialize, Debug, Clone, Default, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageFailure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<ImageIdentifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// The request of [put-image](https://docs.aws.amazon.com/AmazonECR/latest/APIReference/API_PutImage.html).
#[derive(Serialize, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PutImageInput {
    pub repository_name: String,
    pub image_manifest: Manifest,
    pub image_tag: String,
}

/// Whatever the registry answered to the tag write. It is handed back to the caller of
/// the function without being looked at.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(transparent)]
pub struct PromotionResult(serde_json::Value);

impl From<serde_json::Value> for PromotionResult {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// A `RegistryError` is an error the registry itself raised for an API call, such as
/// `RepositoryNotFoundException` or `LimitExceededException`.
///
/// It displays the same way the AWS tooling reports it, and its [kind](Kind::kind) is
/// the registry's error code rather than the name of this type. That way the code reaches
/// whoever invoked the function unchanged.
#[derive(Error, PromoterError, Debug, Clone, Eq, PartialEq)]
#[error("An error occurred ({code}) when calling the {operation} operation: {message}")]
pub struct RegistryError {
    code: String,
    operation: String,
    message: String,
}

impl RegistryError {
    pub fn new<C, O, M>(code: C, operation: O, message: M) -> Self
    where
        C: Into<String>,
        O: Into<String>,
        M: Into<String>,
    {
        Self {
            code: code.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl Kind for RegistryError {
    fn kind(&self) -> String {
        self.code.clone()
    }
}
