//! Seam to the external face recognition engine.
//!
//! Detection, encoding and matching live outside this crate. An engine
//! hands back one [`Recognition`] per detected face; the recorder only
//! consumes the labels.

use crate::types::{Identity, UNKNOWN_LABEL};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Pixel box of a detected face, in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Region {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

/// Match result for one face.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    Known(String),
    Unknown,
}

impl Label {
    pub fn as_str(&self) -> &str {
        match self {
            Label::Known(name) => name,
            Label::Unknown => UNKNOWN_LABEL,
        }
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        if s == UNKNOWN_LABEL {
            Label::Unknown
        } else {
            Label::Known(s.to_string())
        }
    }
}

// Engines speak plain strings on the wire, with "Unknown" as the sentinel.
impl Serialize for Label {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Ok(Label::from(s.as_str()))
    }
}

/// One detected face and who it matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recognition {
    #[serde(default)]
    pub region: Region,
    pub label: Label,
}

/// A face recognition engine: given a frame, returns zero or more matches.
pub trait Recognizer {
    type Frame;
    type Error: std::error::Error;

    fn recognize(&mut self, frame: &Self::Frame) -> Result<Vec<Recognition>, Self::Error>;
}

/// Identities worth recording from one frame, in detection order.
///
/// Drops unmatched faces and labels that cannot form an [`Identity`].
/// Repeats within a frame are kept; the recorder suppresses them.
pub fn loggable_identities(recognitions: &[Recognition]) -> Vec<Identity> {
    recognitions
        .iter()
        .filter_map(|r| match &r.label {
            Label::Known(name) => Identity::new(name).ok(),
            Label::Unknown => None,
        })
        .collect()
}
