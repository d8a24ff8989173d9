//! Text preparation for speech synthesis

use std::ops::RangeInclusive;

/// Pictographic blocks that synthesizers read out as noise
const PICTOGRAPH_RANGES: [RangeInclusive<u32>; 8] = [
    0x1F600..=0x1F64F, // emoticons
    0x1F300..=0x1F5FF, // symbols & pictographs
    0x1F680..=0x1F6FF, // transport & map
    0x1F1E0..=0x1F1FF, // regional indicators
    0x2600..=0x26FF,   // miscellaneous symbols
    0x2700..=0x27BF,   // dingbats
    0x1F900..=0x1F9FF, // supplemental symbols & pictographs
    0x1FA70..=0x1FAFF, // symbols & pictographs extended-A
];

/// Markdown and symbol characters dropped before speaking
const SPOKEN_NOISE: [char; 10] = ['*', '_', '~', '`', '#', '@', '$', '%', '^', '&'];

fn is_pictograph(c: char) -> bool {
    let code = u32::from(c);
    PICTOGRAPH_RANGES.iter().any(|r| r.contains(&code))
}

/// Strip pictographs and markdown symbols, then collapse whitespace
#[must_use]
pub fn clean_for_speech(text: &str) -> String {
    let kept: String = text
        .chars()
        .filter(|&c| !is_pictograph(c) && !SPOKEN_NOISE.contains(&c))
        .collect();

    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_markdown() {
        assert_eq!(clean_for_speech("**Bold** and _italic_ `code`"), "Bold and italic code");
        assert_eq!(clean_for_speech("# Title\n\n50% off & more"), "Title 50 off more");
    }

    #[test]
    fn test_strips_pictographs() {
        assert_eq!(clean_for_speech("Great job \u{1F389}\u{1F680} see you \u{2764}"), "Great job see you");
        assert_eq!(clean_for_speech("\u{1F600}"), "");
    }

    #[test]
    fn test_keeps_plain_punctuation() {
        assert_eq!(clean_for_speech("  Hello, world!  How are you?  "), "Hello, world! How are you?");
    }
}
