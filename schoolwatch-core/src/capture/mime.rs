/// Pick the recording content type.
///
/// Returns the first preferred type the platform supports. When none is
/// supported the last entry is used anyway; recorders that support nothing
/// on the list usually still produce the WebM family.
pub fn negotiate_content_type<'a>(
    preferred: &'a [String],
    is_supported: impl Fn(&str) -> bool,
) -> Option<&'a str> {
    preferred
        .iter()
        .find(|t| is_supported(t))
        .or_else(|| preferred.last())
        .map(String::as_str)
}
