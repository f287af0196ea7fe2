//! Formatting utilities

use humansize::{DECIMAL, format_size};
use sprite_models::ModelFlags;

/// Format file size in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    format_size(bytes, DECIMAL)
}

/// Format a model frame slot, `-` for the "no such frame" sentinel
pub fn format_frame(frame: Option<usize>) -> String {
    frame.map_or_else(|| "-".to_string(), |f| f.to_string())
}

/// Frame letter of a frame number
pub fn frame_letter(frame: u8) -> char {
    char::from(b'A' + frame)
}

/// Flag names joined with `|`, or `none`
pub fn format_flags(flags: ModelFlags) -> String {
    if flags.is_empty() {
        return "none".to_string();
    }
    flags
        .iter_names()
        .map(|(name, _)| name.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1024), "1.02 kB");
    }

    #[test]
    fn test_format_frame() {
        assert_eq!(format_frame(Some(3)), "3");
        assert_eq!(format_frame(None), "-");
        assert_eq!(frame_letter(0), 'A');
        assert_eq!(frame_letter(28), ']');
    }

    #[test]
    fn test_format_flags() {
        assert_eq!(format_flags(ModelFlags::empty()), "none");
        assert_eq!(
            format_flags(ModelFlags::ROTATING | ModelFlags::NO_INTERPOLATION),
            "rotating|no_interpolation"
        );
    }
}
