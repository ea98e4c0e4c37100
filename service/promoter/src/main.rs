mod env;
mod event;
mod promoter;
mod registry;

use crate::event::SnsEvent;
use crate::promoter::Promoter;
use crate::registry::ecr::Ecr;
use crate::registry::PromotionResult;
use error::{Kind, PromoterError};
use lambda_runtime::{service_fn, Diagnostic, LambdaEvent};
use log::{error, info};

/// Promotes an ECR image tag in response to an SNS notification.
///
/// The notification's message names a repository, the tag to promote, and the new tag
/// to give the same image.
///
/// ```text
/// {"ecr_repo_name": "testrepo", "ecr_tag_to_update": "latest", "ecr_tag_to_add": "newtag"}
/// ```
///
/// On success the function returns ECR's
/// [PutImage](https://docs.aws.amazon.com/AmazonECR/latest/APIReference/API_PutImage.html)
/// response as is.
///
/// ```text
/// {
///   "image": {
///     "registryId": "12345678",
///     "repositoryName": "testrepo",
///     "imageId": {"imageDigest": "sha256:12345abc", "imageTag": "newtag"},
///     "imageManifest": "..."
///   }
/// }
/// ```
///
/// On failure the invocation fails with the error's [kind](Kind::kind) as its
/// `errorType`. For errors raised by ECR itself that is ECR's error code, such as
/// `RepositoryNotFoundException`.
async fn handle_notification(event: LambdaEvent<SnsEvent>) -> Result<PromotionResult, Failure> {
    let LambdaEvent { payload, context } = event;
    info!("Handling invocation {}.", context.request_id);
    promote(&payload).await.map_err(|err| {
        error!(
            "Promotion failed: {}",
            serde_json::to_string(&err).unwrap_or_else(|_| err.to_string())
        );
        Failure(err)
    })
}

async fn promote(event: &SnsEvent) -> result::Result<PromotionResult> {
    let request = event.promotion_request()?;
    Promoter::new(Ecr::from_env()).promote(&request).await
}

/// A `Failure` carries a [PromoterError] out of the handler and into the Lambda runtime,
/// which reports it to the invoking service.
#[derive(Debug)]
struct Failure(Box<dyn PromoterError>);

impl From<Failure> for Diagnostic {
    fn from(failure: Failure) -> Self {
        Diagnostic {
            error_type: failure.0.kind(),
            error_message: failure.0.to_string(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    // CloudWatch stamps every line itself and renders no colors.
    env_logger::Builder::new()
        .parse_filters(&env::log_filter())
        .format_timestamp(None)
        .write_style(env_logger::WriteStyle::Never)
        .init();
    lambda_runtime::run(service_fn(handle_notification)).await
}
