use uuid::Uuid;

pub type Id = String;

/// Sentinel used when no color hint is known for an item
pub const UNKNOWN_COLOR: &str = "unknown";

/// Stored as the raw label when the caller supplied an empty one
pub const UNKNOWN_LABEL: &str = "unknown";

pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}

/// Strip an optional `data:<mime>;base64,` header from an encoded image
pub fn strip_data_uri(encoded: &str) -> &str {
    let trimmed = encoded.trim();
    if trimmed.starts_with("data:") {
        match trimmed.find(',') {
            Some(comma) => &trimmed[comma + 1..],
            None => trimmed,
        }
    } else {
        trimmed
    }
}
