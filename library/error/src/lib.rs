pub use error_derive::PromoterError;
pub use kind::Kind;
use serde::{Serialize, Serializer};
use serde_json::json;
pub use thiserror;
pub use thiserror::Error;

/// A PromoterError is the trait to which every error returned by the tag promoter
/// and its libraries MUST adhere.
///
/// The easiest way to implement it is with the derive macros re-exported by this
/// library: [Error](thiserror::Error), [PromoterError](error_derive::PromoterError)
/// and [Kind](kind::Kind). [Debug](std::fmt::Debug) is required to fulfill the
/// standard library [Error](std::error::Error).
///
/// ```
/// use error::*;
///
/// #[derive(Error, PromoterError, Kind, Debug)]
/// #[error("The tag {tag} could not be written to {repository}")]
/// struct MyError {
///     tag: String,
///     repository: String,
///     // Any error annotated as a source is serialized into the 'cause' key.
///     #[source]
///     cause: std::io::Error,
/// }
/// ```
///
/// The [kind](kind::Kind::kind) of an error is what the invoking infrastructure
/// sees as the type of the failure, so types that wrap a foreign error code are
/// free to implement `Kind` by hand and report that code instead of their own name.
pub trait PromoterError: std::error::Error + Kind + Send + Sync {}

/// This conversion supports the automatic boxing of any type that
/// implements [PromoterError](crate::PromoterError), which is what lets `?`
/// lift concrete errors into a [result::Result].
impl<T: 'static + PromoterError> From<T> for Box<dyn PromoterError> {
    fn from(err: T) -> Self {
        Box::new(err)
    }
}

/// A boxed [PromoterError](crate::PromoterError) serializes to the following JSON object.
///
/// ```ignore
/// {
///     "kind": "ResolutionError::UnexpectedImageCount",
///     "message": "Got 0 images when looking for image with tag latest. Should be 1",
///     "cause": null
/// }
/// ```
///
/// `cause` is the display of the error's [source](std::error::Error::source), if any.
impl Serialize for Box<dyn PromoterError> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        json!({
            "kind": self.kind(),
            "message": format!("{}", self),
            "cause": self.source().map(|cause| format!("{}", cause)),
        })
        .serialize(serializer)
    }
}

/// A `StringError` turns a raw string into a first class PromoterError. This is
/// mostly useful for embedding raw output (say, a subprocess's stderr) as the
/// [source](std::error::Error::source) of a higher level error.
///
/// ```
/// use error::*;
///
/// #[derive(Error, PromoterError, Kind, Debug)]
/// #[error("The registry rejected the request.")]
/// struct HigherError {
///     #[source]
///     cause: StringError
/// }
///
/// fn do_work() -> Result<(), HigherError> {
///     Err(HigherError{cause: "and this is what it actually said".into()})
/// }
/// ```
#[derive(Error, PromoterError, Kind, Debug)]
#[error("{inner}")]
pub struct StringError {
    inner: String,
}

impl<T: AsRef<str>> From<T> for StringError {
    fn from(inner: T) -> Self {
        Self {
            inner: inner.as_ref().to_string(),
        }
    }
}
