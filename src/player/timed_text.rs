//! Subtitle payload conversion into WebVTT for text-track attachment.

/// Converts a subtitle payload into WebVTT. WebVTT input passes through with
/// normalised line endings; anything else is treated as SubRip.
pub fn to_webvtt(payload: &str) -> String {
    let text = payload
        .trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    if text.trim_start().starts_with("WEBVTT") {
        return text;
    }

    let mut out = String::with_capacity(text.len() + 8);
    out.push_str("WEBVTT\n\n");
    for line in text.trim_start().lines() {
        if line.contains("-->") {
            // SubRip uses a comma before the milliseconds
            out.push_str(&line.replace(',', "."));
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}
