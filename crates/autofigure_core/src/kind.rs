use std::fmt;

use serde::{Deserialize, Serialize};

/// Pipeline stage that produced an artifact.
///
/// Parsed leniently from either the server's wire label (`figure`, `samed`,
/// ...) or the descriptive label (`generated-image`, ...). Labels that match
/// neither are kept verbatim as [`ArtifactKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ArtifactKind {
    GeneratedImage,
    SegmentationMask,
    IconRaw,
    IconBackgroundRemoved,
    SvgTemplate,
    SvgOptimized,
    SvgFinal,
    RunLog,
    Other(String),
}

impl ArtifactKind {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "figure" | "generated-image" => Self::GeneratedImage,
            "samed" | "segmentation-mask" => Self::SegmentationMask,
            "icon_raw" | "icon-raw" => Self::IconRaw,
            "icon_nobg" | "icon-background-removed" => Self::IconBackgroundRemoved,
            "template_svg" | "svg-template" => Self::SvgTemplate,
            "optimized_svg" | "svg-optimized" => Self::SvgOptimized,
            "final_svg" | "svg-final" => Self::SvgFinal,
            "log" | "run-log" => Self::RunLog,
            other => Self::Other(other.to_string()),
        }
    }

    /// Label as the server spells it on the wire.
    pub fn wire_label(&self) -> &str {
        match self {
            Self::GeneratedImage => "figure",
            Self::SegmentationMask => "samed",
            Self::IconRaw => "icon_raw",
            Self::IconBackgroundRemoved => "icon_nobg",
            Self::SvgTemplate => "template_svg",
            Self::SvgOptimized => "optimized_svg",
            Self::SvgFinal => "final_svg",
            Self::RunLog => "log",
            Self::Other(label) => label,
        }
    }

    /// Pipeline step (1..=5) this kind belongs to, if it marks progress at all.
    pub fn step(&self) -> Option<u8> {
        match self {
            Self::GeneratedImage => Some(1),
            Self::SegmentationMask => Some(2),
            Self::IconRaw | Self::IconBackgroundRemoved => Some(3),
            Self::SvgTemplate | Self::SvgOptimized => Some(4),
            Self::SvgFinal => Some(5),
            Self::RunLog | Self::Other(_) => None,
        }
    }

    pub fn is_svg(&self) -> bool {
        matches!(
            self,
            Self::SvgTemplate | Self::SvgOptimized | Self::SvgFinal
        )
    }
}

impl From<String> for ArtifactKind {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<ArtifactKind> for String {
    fn from(kind: ArtifactKind) -> Self {
        kind.wire_label().to_string()
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_label())
    }
}
