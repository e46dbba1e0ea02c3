//! Filename derivation for saved media.

/// Replace every character that is not an ASCII letter or digit with `_`,
/// one for one.
#[must_use]
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `{collection}_{index + 1}_{sanitized name}.jpg`.
///
/// `collection` must already be sanitized; it is computed once per batch.
#[must_use]
pub fn item_filename(collection: &str, index: usize, name: &str) -> String {
    format!("{collection}_{}_{}.jpg", index + 1, sanitize(name))
}

/// Swap whatever extension `filename` carries for `.jpg`.
#[must_use]
pub fn force_jpg_extension(filename: &str) -> String {
    let stem = match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    };
    format!("{stem}.jpg")
}
