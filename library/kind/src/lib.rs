pub use kind_derive::*;

/// A type that implements Kind is capable of describing itself to outside systems,
/// typically by returning the name of its type. For errors, the kind is what the
/// Lambda runtime reports as the `errorType` of a failed invocation.
///
/// ```
/// use kind::Kind;
///
/// #[derive(Kind)]
/// struct Manifest {}
///
/// #[derive(Kind)]
/// enum Lookup {
///     Found(String),
///     Missing { tag: String },
/// }
///
/// assert_eq!("Manifest", Manifest {}.kind());
/// assert_eq!("Lookup::Found", Lookup::Found("latest".into()).kind());
/// assert_eq!("Lookup::Missing", Lookup::Missing { tag: "latest".into() }.kind());
/// ```
///
/// The derive does not work on unions.
pub trait Kind {
    fn kind(&self) -> String;
}
