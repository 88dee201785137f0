use chrono::Utc;
use rand::Rng;

const FALLBACK_SLUG: &str = "upload";
const FALLBACK_EXTENSION: &str = "bin";

/// Lower-cases `title` and collapses every run of non-alphanumeric characters into one hyphen.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Picks the stored extension from the client file name, then the declared content type.
pub fn file_extension(file_name: &str, content_type: Option<&str>) -> String {
    let from_name = std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase());

    from_name
        .or_else(|| {
            content_type
                .and_then(mime_guess::get_mime_extensions_str)
                .and_then(|exts| exts.first())
                .map(|ext| ext.to_string())
        })
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

/// `<slug>-<epoch-ms>-<random>.<ext>`
pub fn storage_file_name(title: &str, extension: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let random: u32 = rand::rng().random_range(0..=1_000_000_000);
    format!("{}-{}-{}.{}", slugify(title), millis, random, extension)
}
