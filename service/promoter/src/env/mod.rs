use std::env::VarError;

/// The AWS CLI configured under the `AWS_CLI` environment variable. If no such environment
/// variable is set, then this function defaults to `aws`, which is looked up on the `PATH`.
///
/// The CLI MUST be version 2, as only version 2 understands `file://` arguments to
/// `--cli-input-json` the way the [ECR client](crate::registry::ecr::Ecr) uses them.
pub fn aws_cli() -> String {
    std::env::var("AWS_CLI")
        .and_then(map_empty_to_error)
        .unwrap_or_else(|_| String::from("aws"))
}

/// The logging filter, in [env_logger](https://docs.rs/env_logger) syntax.
///
/// `RUST_LOG` wins when set. Otherwise the level chosen through Lambda's own log level
/// control (`AWS_LAMBDA_LOG_LEVEL`) is used, and failing that, `info`.
pub fn log_filter() -> String {
    log_filter_from(
        std::env::var("RUST_LOG").and_then(map_empty_to_error).ok(),
        std::env::var("AWS_LAMBDA_LOG_LEVEL")
            .and_then(map_empty_to_error)
            .ok(),
    )
}

fn log_filter_from(rust_log: Option<String>, lambda_log_level: Option<String>) -> String {
    if let Some(filter) = rust_log {
        return filter;
    }
    match lambda_log_level.map(|level| level.to_lowercase()) {
        // env_logger has no notion of FATAL.
        Some(level) if level == "fatal" => String::from("error"),
        Some(level) => level,
        None => String::from("info"),
    }
}

/// If an environment variable is technically present, albeit empty, then we would like to
/// take that to mean that it doesn't actually exist.
fn map_empty_to_error(var: String) -> Result<String, VarError> {
    if var.is_empty() {
        Err(VarError::NotPresent)
    } else {
        Ok(var)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_wins() {
        assert_eq!(
            "promoter=debug",
            log_filter_from(Some("promoter=debug".into()), Some("ERROR".into()))
        );
    }

    #[test]
    fn lambda_log_level() {
        assert_eq!("warn", log_filter_from(None, Some("WARN".into())));
        assert_eq!("error", log_filter_from(None, Some("FATAL".into())));
    }

    #[test]
    fn default_filter() {
        assert_eq!("info", log_filter_from(None, None));
    }

    #[test]
    fn empty_is_absent() {
        assert_eq!(Err(VarError::NotPresent), map_empty_to_error(String::new()));
        assert_eq!(Ok("aws".to_string()), map_empty_to_error("aws".to_string()));
    }
}
