//! Splitting of long replies for platforms with a message size limit.

/// Telegram hard limit for text messages, in characters.
pub const TELEGRAM_MAX_CHARS: usize = 4096;

/// Split `text` into pieces of at most `max_chars` characters.
///
/// Prefers a paragraph break, then a line break, then a space inside the
/// window; falls back to a hard cut on a char boundary. Whitespace after a
/// split point is dropped and whitespace-only pieces are never emitted, since
/// Telegram rejects empty messages. Text that already fits is returned as-is.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        let window_end = match remaining.char_indices().nth(max_chars) {
            Some((i, _)) => i,
            None => {
                push_non_blank(&mut chunks, remaining);
                break;
            }
        };

        let window = &remaining[..window_end];
        let (cut, skip) = find_split_point(window);
        push_non_blank(&mut chunks, &remaining[..cut]);
        remaining = remaining[cut + skip..].trim_start();
    }

    chunks
}

fn push_non_blank(chunks: &mut Vec<String>, piece: &str) {
    if !piece.trim().is_empty() {
        chunks.push(piece.to_string());
    }
}

/// Returns (end of this chunk, separator bytes to skip).
fn find_split_point(window: &str) -> (usize, usize) {
    for sep in ["\n\n", "\n", " "] {
        if let Some(pos) = window.rfind(sep)
            && pos > 0
        {
            return (pos, sep.len());
        }
    }
    (window.len(), 0)
}
