//! Output resolution presets.

use serde::{Deserialize, Serialize};

/// Requested output resolution for the assembled video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Resolution {
    #[serde(rename = "480p")]
    Sd480,
    #[default]
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    Hd1080,
}

impl Resolution {
    /// Output dimensions as (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Resolution::Sd480 => (854, 480),
            Resolution::Hd720 => (1280, 720),
            Resolution::Hd1080 => (1920, 1080),
        }
    }

    /// Returns the resolution label ("720p" etc.).
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Sd480 => "480p",
            Resolution::Hd720 => "720p",
            Resolution::Hd1080 => "1080p",
        }
    }

    /// Parse from a form-field label.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "480p" => Some(Resolution::Sd480),
            "720p" => Some(Resolution::Hd720),
            "1080p" => Some(Resolution::Hd1080),
            _ => None,
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_720p() {
        assert_eq!(Resolution::default(), Resolution::Hd720);
    }

    #[test]
    fn test_dimensions() {
        assert_eq!(Resolution::Hd1080.dimensions(), (1920, 1080));
        assert_eq!(Resolution::Sd480.dimensions(), (854, 480));
    }

    #[test]
    fn test_label_round_trip() {
        for r in [Resolution::Sd480, Resolution::Hd720, Resolution::Hd1080] {
            assert_eq!(Resolution::from_str(r.as_str()), Some(r));
        }
        assert_eq!(Resolution::from_str("4k"), None);
    }
}
