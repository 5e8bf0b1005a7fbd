use crate::constants::*;

/// Collapse every run of whitespace into a single space and trim the ends.
pub fn normalize_message_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize and validate message text, returning the text to store.
pub fn validate_message_text(text: &str) -> Result<String, String> {
    let normalized = normalize_message_text(text);
    if normalized.is_empty() {
        return Err("Message text is required".into());
    }
    if normalized.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(format!(
            "Message must be at most {} characters",
            MAX_MESSAGE_LENGTH
        ));
    }
    Ok(normalized)
}

pub fn validate_room_title(title: &str) -> Result<String, String> {
    let trimmed = normalize_message_text(title);
    if trimmed.is_empty() {
        return Err("Room title is required".into());
    }
    if trimmed.chars().count() > MAX_ROOM_TITLE_LENGTH {
        return Err(format!(
            "Room title must be at most {} characters",
            MAX_ROOM_TITLE_LENGTH
        ));
    }
    Ok(trimmed)
}

/// Clamp a requested page size into `1..=max`, falling back to `default`.
pub fn clamp_page_size(requested: Option<i64>, default: i64, max: i64) -> i64 {
    match requested {
        Some(n) if n >= 1 => n.min(max),
        _ => default,
    }
}
