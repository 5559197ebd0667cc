/// Image file extensions accepted for project uploads.
const IMAGE_EXTENSIONS: &[&str] = &["avif", "gif", "jpeg", "jpg", "png", "svg", "webp"];

const MAX_FILENAME_CHARS: usize = 200;

/// Validate an uploaded image filename: a single flat path segment with an
/// image extension. Returns the trimmed name.
pub fn validate_image_filename(name: &str) -> Result<String, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Filename must not be empty".into());
    }
    if name.chars().count() > MAX_FILENAME_CHARS {
        return Err(format!("Filename must be at most {MAX_FILENAME_CHARS} characters"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err("Filename must not contain path separators".into());
    }
    if name.chars().any(char::is_control) {
        return Err("Filename must not contain control characters".into());
    }
    if name == "." || name == ".." || name.starts_with('.') {
        return Err("Filename must not start with a dot".into());
    }

    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .ok_or_else(|| "Filename must have an image extension".to_string())?;
    if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(format!(
            "Unsupported image type '.{extension}' (expected one of: {})",
            IMAGE_EXTENSIONS.join(", ")
        ));
    }

    Ok(name.to_string())
}
