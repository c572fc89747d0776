use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Which derivative slot of an archived file a blob fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivativeKind {
    Thumbnail,
    Preview,
}

impl Display for DerivativeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DerivativeKind::Thumbnail => write!(f, "thumbnail"),
            DerivativeKind::Preview => write!(f, "preview"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivativeFormat {
    Jpeg,
    Mp4,
}

impl DerivativeFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            DerivativeFormat::Jpeg => "image/jpeg",
            DerivativeFormat::Mp4 => "video/mp4",
        }
    }
}

/// A generated blob derived from an archived file's original.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Derivative {
    pub kind: DerivativeKind,
    pub path: String,
    pub format: DerivativeFormat,
}
