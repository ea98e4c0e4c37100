use crate::env;
use crate::registry::{
    BatchGetImageInput, BatchGetImageOutput, PromotionResult, PutImageInput, Registry,
    RegistryError,
};
use error::*;
use log::{debug, warn};
use result::Result;
use serde::Serialize;

/// `ecr` is a convenience macro for running an
/// [AWS CLI v2 ECR Subcommand](https://awscli.amazonaws.com/v2/documentation/api/latest/reference/ecr/index.html)
/// whose request is read, as JSON, from stdin.
///
/// The request goes through `--cli-input-json` so that it reaches ECR exactly as
/// serialized, manifest included, without any shell quoting or argument length limits
/// getting in the way. The macro returns a future of the [Output](os::process::Output) of
/// the command.
///
/// ```ignore
/// let output = ecr!(stdin = request, "aws", "batch-get-image").await?;
/// ```
macro_rules! ecr {
    (stdin=$stdin:expr, $aws:expr, $subcommand:expr) => {
        os::output!(
            stdin = $stdin,
            $aws,
            "ecr",
            $subcommand,
            "--cli-input-json",
            "file:///dev/stdin",
            "--output",
            "json"
        )
    };
}

/// `Ecr` talks to the Elastic Container Registry through the AWS CLI. Region and
/// credentials are whatever the CLI picks up from its environment (for a Lambda
/// function, the execution role).
#[derive(Debug, Clone)]
pub struct Ecr {
    aws: String,
}

impl Ecr {
    /// Uses the AWS CLI found at `aws`, which may be a bare name to be looked up on the PATH.
    pub fn new<T: Into<String>>(aws: T) -> Self {
        Self { aws: aws.into() }
    }

    /// Uses the AWS CLI configured by the [AWS_CLI](env::aws_cli) environment variable.
    pub fn from_env() -> Self {
        Self::new(env::aws_cli())
    }

    /// Runs the `subcommand` for the ECR API `operation` and returns its stdout.
    async fn call<I: Serialize>(
        &self,
        operation: &'static str,
        subcommand: &'static str,
        input: &I,
    ) -> Result<String> {
        let request =
            serde_json::to_string(input).map_err(|error| EcrRequestSerdeError { operation, error })?;
        debug!("Calling the ECR {} operation.", operation);
        let output = ecr!(stdin = request, &self.aws, subcommand).await?;
        if output.success() {
            Ok(output.stdout)
        } else {
            Err(failure(operation, &output.stderr))
        }
    }
}

impl Registry for Ecr {
    async fn batch_get_image(&self, input: &BatchGetImageInput) -> Result<BatchGetImageOutput> {
        let operation = "BatchGetImage";
        let stdout = self.call(operation, "batch-get-image", input).await?;
        Ok(serde_json::from_str(&stdout)
            .map_err(|error| EcrResponseSerdeError { operation, error })?)
    }

    async fn put_image(&self, input: &PutImageInput) -> Result<PromotionResult> {
        let operation = "PutImage";
        let stdout = self.call(operation, "put-image", input).await?;
        let response: serde_json::Value = serde_json::from_str(&stdout)
            .map_err(|error| EcrResponseSerdeError { operation, error })?;
        Ok(response.into())
    }
}

/// Converts the stderr of a failed CLI call into the error ECR reported, or into an
/// [UnrecognizedRegistryFailure] if the CLI never got an answer from ECR in the first place
/// (missing credentials, no network, and so on).
fn failure(operation: &'static str, stderr: &str) -> Box<dyn PromoterError> {
    match service_error(stderr) {
        Some(err) => {
            warn!("ECR rejected the {} operation with {}.", err.operation(), err.code());
            err.into()
        }
        None => UnrecognizedRegistryFailure {
            operation,
            stderr: stderr.trim().into(),
        }
        .into(),
    }
}

/// Picks the service error out of the AWS CLI's stderr, which looks like either of
///
/// ```text
/// An error occurred (RepositoryNotFoundException) when calling the BatchGetImage operation: The repository ...
/// An error occurred (ThrottlingException) when calling the PutImage operation (reached max retries: 2): Rate exceeded
/// ```
///
/// The message runs to the end of stderr, so a detail spanning several lines is kept whole.
fn service_error(stderr: &str) -> Option<RegistryError> {
    const PREFIX: &str = "An error occurred (";
    let start = stderr.find(PREFIX)?;
    let (code, rest) = stderr[start + PREFIX.len()..].split_once(") when calling the ")?;
    let (operation, rest) = rest.split_once(" operation")?;
    let message = if rest.starts_with(" (") {
        rest.split_once("): ").map(|(_, message)| message)
    } else {
        rest.strip_prefix(':')
    }
    .unwrap_or_default();
    Some(RegistryError::new(code, operation, message.trim()))
}

#[derive(Error, PromoterError, Kind, Debug)]
#[error("Failed to serialize the request for ECR's {operation} operation.")]
struct EcrRequestSerdeError {
    operation: &'static str,
    #[source]
    error: serde_json::Error,
}

#[derive(Error, PromoterError, Kind, Debug)]
#[error(
    "A failure occurred while deserializing the JSON returned by ECR's {operation} operation. \
We expected a data structure similar to that documented in \
https://docs.aws.amazon.com/AmazonECR/latest/APIReference/API_{operation}.html"
)]
struct EcrResponseSerdeError {
    operation: &'static str,
    #[source]
    error: serde_json::Error,
}

#[derive(Error, PromoterError, Kind, Debug)]
#[error(
    "The AWS CLI failed to complete ECR's {operation} operation without reporting an ECR error. \
This is usually a problem with the CLI's environment, such as missing credentials or no route \
to the registry."
)]
struct UnrecognizedRegistryFailure {
    operation: &'static str,
    #[source]
    stderr: StringError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Manifest;
    use serde_json::json;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    #[test]
    fn parse_service_error() {
        let stderr = "\nAn error occurred (RepositoryNotFoundException) when calling the BatchGetImage \
operation: The repository with name 'testrepo' does not exist in the registry with id '12345678'\n";
        let want = RegistryError::new(
            "RepositoryNotFoundException",
            "BatchGetImage",
            "The repository with name 'testrepo' does not exist in the registry with id '12345678'",
        );
        assert_eq!(Some(want), service_error(stderr));
    }

    #[test]
    fn parse_service_error_after_retries() {
        let stderr = "An error occurred (LimitExceededException) when calling the PutImage operation \
(reached max retries: 2): The operation did not succeed because it would have exceeded a service limit";
        let want = RegistryError::new(
            "LimitExceededException",
            "PutImage",
            "The operation did not succeed because it would have exceeded a service limit",
        );
        assert_eq!(Some(want), service_error(stderr));
    }

    #[test]
    fn parse_service_error_multiline() {
        let stderr = "An error occurred (InvalidParameterException) when calling the PutImage \
operation: line one\nline two\n";
        let want = RegistryError::new("InvalidParameterException", "PutImage", "line one\nline two");
        assert_eq!(Some(want), service_error(stderr));
    }

    #[test]
    fn unrecognized_failure() {
        let stderr = "\nUnable to locate credentials. You can configure credentials by running \"aws configure\".\n";
        assert!(service_error(stderr).is_none());
        let err = failure("PutImage", stderr);
        assert_eq!("UnrecognizedRegistryFailure", err.kind());
        assert_eq!(
            Some("Unable to locate credentials. You can configure credentials by running \"aws configure\".".to_string()),
            err.source().map(|cause| cause.to_string())
        );
    }

    /// Writes a stand-in for the AWS CLI which records its arguments and stdin next to
    /// itself, then prints `stdout` and `stderr` and exits with `status`.
    fn fake_aws(dir: &Path, stdout: &str, stderr: &str, status: i32) -> PathBuf {
        let path = dir.join("aws");
        let script = format!(
            "#!/bin/sh\n\
             echo \"$@\" > \"$(dirname \"$0\")/args\"\n\
             cat > \"$(dirname \"$0\")/request.json\"\n\
             cat <<'STDOUT'\n{}\nSTDOUT\n\
             printf '%s' '{}' >&2\n\
             exit {}\n",
            stdout, stderr, status
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn recorded(dir: &Path) -> (String, serde_json::Value) {
        let args = std::fs::read_to_string(dir.join("args")).unwrap();
        let request = std::fs::read_to_string(dir.join("request.json")).unwrap();
        (args.trim_end().to_string(), serde_json::from_str(&request).unwrap())
    }

    // One test so that no fake CLI is being written while another test spawns one.
    #[tokio::test]
    async fn drives_the_aws_cli() {
        let lookup = tempfile::tempdir().unwrap();
        let aws = fake_aws(
            lookup.path(),
            r#"{"images": [{"imageId": {"imageTag": "latest"}, "imageManifest": "fake_manifest"}], "failures": []}"#,
            "",
            0,
        );
        let response = Ecr::new(aws.to_string_lossy())
            .batch_get_image(&BatchGetImageInput::for_tag("testrepo", "latest"))
            .await
            .unwrap();
        assert_eq!(1, response.images.len());
        assert_eq!(
            Some(Manifest::from("fake_manifest")),
            response.images[0].image_manifest
        );
        let (args, request) = recorded(lookup.path());
        assert_eq!(
            "ecr batch-get-image --cli-input-json file:///dev/stdin --output json",
            args
        );
        assert_eq!(
            serde_json::to_value(BatchGetImageInput::for_tag("testrepo", "latest")).unwrap(),
            request
        );

        let write = tempfile::tempdir().unwrap();
        let aws = fake_aws(
            write.path(),
            "",
            "\nAn error occurred (LimitExceededException) when calling the PutImage operation: Too many tags\n",
            254,
        );
        let input = PutImageInput {
            repository_name: "testrepo".to_string(),
            image_manifest: "fake_manifest".into(),
            image_tag: "newtag".to_string(),
        };
        let err = Ecr::new(aws.to_string_lossy())
            .put_image(&input)
            .await
            .unwrap_err();
        assert_eq!("LimitExceededException", err.kind());
        let (args, request) = recorded(write.path());
        assert_eq!(
            "ecr put-image --cli-input-json file:///dev/stdin --output json",
            args
        );
        assert_eq!(
            json!({
                "repositoryName": "testrepo",
                "imageManifest": "fake_manifest",
                "imageTag": "newtag",
            }),
            request
        );

        let garbled = tempfile::tempdir().unwrap();
        let aws = fake_aws(garbled.path(), "not json", "", 0);
        let err = Ecr::new(aws.to_string_lossy())
            .batch_get_image(&BatchGetImageInput::for_tag("testrepo", "latest"))
            .await
            .unwrap_err();
        assert_eq!("EcrResponseSerdeError", err.kind());
    }
}
