use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// Frame size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Size {
    type Err = CaptureError;

    /// Parses `WIDTHxHEIGHT`, e.g. `1280x720`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid =
            || CaptureError::Configuration(format!("invalid size: {s:?} (expected WIDTHxHEIGHT)"));
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width = w.trim().parse::<u32>().map_err(|_| invalid())?;
        let height = h.trim().parse::<u32>().map_err(|_| invalid())?;
        Ok(Self { width, height })
    }
}

/// Which camera to open.
///
/// Resolving `Auto` to a concrete device is left to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraSelector {
    #[default]
    Auto,
    Explicit(String),
}

impl CameraSelector {
    pub fn explicit(id: impl Into<String>) -> Self {
        Self::Explicit(id.into())
    }

    pub fn explicit_id(&self) -> Option<&str> {
        match self {
            Self::Auto => None,
            Self::Explicit(id) => Some(id),
        }
    }
}

impl fmt::Display for CameraSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Explicit(id) => f.write_str(id),
        }
    }
}

impl FromStr for CameraSelector {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("auto") {
            Ok(Self::Auto)
        } else {
            Ok(Self::Explicit(s.to_string()))
        }
    }
}

/// Request template the repeating request is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestTemplate {
    Preview,
    StillCapture,
    #[default]
    Record,
    VideoSnapshot,
    ZeroShutterLag,
    Manual,
}

/// One output of a capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfiguration<S> {
    pub surface: S,
}

impl<S> OutputConfiguration<S> {
    pub fn new(surface: S) -> Self {
        Self { surface }
    }
}

/// Regular-mode session description handed to the provider during negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfiguration<S> {
    pub outputs: Vec<OutputConfiguration<S>>,
}

/// Immutable capture request. Built once per session with [`CaptureRequestBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest<S> {
    template: RequestTemplate,
    targets: Vec<S>,
}

impl<S> CaptureRequest<S> {
    pub fn builder(template: RequestTemplate) -> CaptureRequestBuilder<S> {
        CaptureRequestBuilder {
            template,
            targets: Vec::new(),
        }
    }

    pub fn template(&self) -> RequestTemplate {
        self.template
    }

    pub fn targets(&self) -> &[S] {
        &self.targets
    }
}

#[derive(Debug)]
pub struct CaptureRequestBuilder<S> {
    template: RequestTemplate,
    targets: Vec<S>,
}

impl<S> CaptureRequestBuilder<S> {
    pub fn add_target(mut self, surface: S) -> Self {
        self.targets.push(surface);
        self
    }

    pub fn build(self) -> Result<CaptureRequest<S>, CaptureError> {
        if self.targets.is_empty() {
            return Err(CaptureError::Configuration("capture request has no target".into()));
        }
        Ok(CaptureRequest {
            template: self.template,
            targets: self.targets,
        })
    }
}
