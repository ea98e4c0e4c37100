use error::PromoterError;

/// A Result is an alias of [std::result::Result](std::result::Result) with its error variant
/// pre-populated with a `Box<dyn PromoterError>`.
///
/// Instead of writing...
///
/// ```
/// use error::PromoterError;
///
/// fn tag() -> Result<&'static str, Box<dyn PromoterError>> {
///     Ok("latest")
/// }
/// ```
///
/// ...you can simply say...
///
/// ```
/// use result::Result;
///
/// fn tag() -> Result<&'static str> {
///     Ok("latest")
/// }
/// ```
///
/// Any function returning this alias has already converted its failures into
/// project native [PromoterError](error::PromoterError)s.
pub type Result<T> = std::result::Result<T, Box<dyn PromoterError>>;
