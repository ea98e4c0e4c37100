use crate::registry::{
    BatchGetImageInput, BatchGetImageOutput, Image, ImageFailure, Manifest, PromotionResult,
    PutImageInput, Registry,
};
use error::*;
use log::info;
use result::Result;
use serde::{Deserialize, Serialize};
use serde_json::ser::Formatter;
use std::io;

/// A `PromotionRequest` asks for `destination_tag` to be pointed at whatever image
/// `source_tag` points at, within a single repository.
///
/// It is the deserialization target of the message published to SNS:
///
/// ```text
/// {"ecr_repo_name": "testrepo", "ecr_tag_to_update": "latest", "ecr_tag_to_add": "newtag"}
/// ```
///
/// Names are not validated here; the registry rejects the ones it does not accept.
#[derive(Deserialize, Debug, Clone, Eq, PartialEq)]
pub struct PromotionRequest {
    #[serde(rename = "ecr_repo_name")]
    repository_name: String,
    #[serde(rename = "ecr_tag_to_update")]
    source_tag: String,
    #[serde(rename = "ecr_tag_to_add")]
    destination_tag: String,
}

impl PromotionRequest {
    #[cfg(test)]
    pub fn new<R, S, D>(repository_name: R, source_tag: S, destination_tag: D) -> Self
    where
        R: Into<String>,
        S: Into<String>,
        D: Into<String>,
    {
        Self {
            repository_name: repository_name.into(),
            source_tag: source_tag.into(),
            destination_tag: destination_tag.into(),
        }
    }

    pub fn repository_name(&self) -> &str {
        &self.repository_name
    }

    pub fn source_tag(&self) -> &str {
        &self.source_tag
    }

    pub fn destination_tag(&self) -> &str {
        &self.destination_tag
    }
}

/// The `Promoter` re-publishes the manifest behind one tag under another tag.
pub struct Promoter<R> {
    registry: R,
}

impl<R: Registry> Promoter<R> {
    pub fn new(registry: R) -> Self {
        Self { registry }
    }

    /// Points the request's destination tag at the image currently tagged with its
    /// source tag, returning the registry's answer to the write untouched.
    ///
    /// Nothing is written unless the source tag resolves to exactly one manifest. Errors
    /// from the registry are passed through as they are, with their codes intact.
    pub async fn promote(&self, request: &PromotionRequest) -> Result<PromotionResult> {
        let manifest = self
            .manifest(request.repository_name(), request.source_tag())
            .await?;
        info!(
            "Tagging the image {}:{} as {}.",
            request.repository_name(),
            request.source_tag(),
            request.destination_tag()
        );
        self.registry
            .put_image(&PutImageInput {
                repository_name: request.repository_name().to_string(),
                image_manifest: manifest,
                image_tag: request.destination_tag().to_string(),
            })
            .await
    }

    async fn manifest(&self, repository_name: &str, tag: &str) -> Result<Manifest> {
        let response = self
            .registry
            .batch_get_image(&BatchGetImageInput::for_tag(repository_name, tag))
            .await?;
        let image = resolve(response, tag)?;
        if let Some(digest) = image.image_id.and_then(|id| id.image_digest) {
            info!("The tag {} currently points at {}.", tag, digest);
        }
        Ok(image
            .image_manifest
            .ok_or_else(|| ResolutionError::MissingManifest {
                tag: tag.to_string(),
            })?)
    }
}

/// Extracts the one image a tag lookup must produce.
fn resolve(response: BatchGetImageOutput, tag: &str) -> std::result::Result<Image, ResolutionError> {
    if !response.failures.is_empty() {
        return Err(ResolutionError::Failures {
            tag: tag.to_string(),
            failures: response.failures,
        });
    }
    match <[_; 1]>::try_from(response.images) {
        Ok([image]) => Ok(image),
        Err(images) => Err(ResolutionError::UnexpectedImageCount {
            tag: tag.to_string(),
            count: images.len(),
        }),
    }
}

/// Renders the failures on one line with a space after every `,` and `:`.
fn to_json(failures: &[ImageFailure]) -> String {
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    match failures.serialize(&mut serializer) {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => format!("{:?}", failures),
    }
}

struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

#[derive(Error, PromoterError, Kind, Debug)]
pub enum ResolutionError {
    #[error("Failures trying to get image manifest with tag {tag}. {}", to_json(.failures))]
    Failures {
        tag: String,
        failures: Vec<ImageFailure>,
    },
    #[error("Got {count} images when looking for image with tag {tag}. Should be 1")]
    UnexpectedImageCount { tag: String, count: usize },
    #[error("The image with tag {tag} was found, but the registry returned no manifest for it")]
    MissingManifest { tag: String },
}
