//! Frame-indexed view of one annotation document.
//!
//! The document is CVAT-track shaped JSON:
//!
//! ```json
//! { "tracks": [ { "id": 0, "label": "person", "boxes": [
//!     { "frame": 0, "xtl": "10.4", "ytl": 12, "xbr": 50.9, "ybr": "60",
//!       "occluded": "1", "attributes": { "behavior": "waving" } } ] } ] }
//! ```
//!
//! A box with a missing or unparsable frame or coordinate is dropped on its
//! own; the rest of the document is kept.

use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use super::record::{BoundingBox, SubjectRecord};
use crate::error::AnnotationError;
use crate::shared::constants;
use crate::utils::logger;

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    tracks: Vec<RawTrack>,
}

#[derive(Deserialize)]
struct RawTrack {
    id: Option<u32>,
    #[serde(default)]
    label: String,
    #[serde(default)]
    boxes: Vec<RawBox>,
}

#[derive(Deserialize)]
struct RawBox {
    frame: Option<Value>,
    xtl: Option<Value>,
    ytl: Option<Value>,
    xbr: Option<Value>,
    ybr: Option<Value>,
    occluded: Option<Value>,
    #[serde(default)]
    attributes: HashMap<String, Value>,
}

#[derive(Debug, Default)]
pub struct AnnotationIndex {
    frames: BTreeMap<u64, Vec<SubjectRecord>>,
    malformed: usize,
}

impl AnnotationIndex {
    pub fn from_file(path: &Path, subject_label: &str) -> Result<Self, AnnotationError> {
        let file = File::open(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => AnnotationError::Missing(path.to_path_buf()),
            _ => AnnotationError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        Self::from_reader(BufReader::new(file), subject_label)
    }

    pub fn from_reader<R: Read>(reader: R, subject_label: &str) -> Result<Self, AnnotationError> {
        let document: RawDocument = serde_json::from_reader(reader)?;
        Ok(Self::from_document(document, subject_label))
    }

    pub fn from_str(content: &str, subject_label: &str) -> Result<Self, AnnotationError> {
        let document: RawDocument = serde_json::from_str(content)?;
        Ok(Self::from_document(document, subject_label))
    }

    fn from_document(document: RawDocument, subject_label: &str) -> Self {
        let mut index = Self::default();

        for (position, track) in document.tracks.into_iter().enumerate() {
            if track.label != subject_label {
                continue;
            }
            let track_id = track.id.unwrap_or(position as u32);

            for raw in track.boxes {
                match parse_box(track_id, raw) {
                    Ok((frame, record)) => index.frames.entry(frame).or_default().push(record),
                    Err(err) => {
                        logger::warn(&format!("dropping annotation entry: {}", err));
                        index.malformed += 1;
                    }
                }
            }
        }

        index
    }

    /// Records annotated at `frame`, in track discovery order.
    pub fn records_at(&self, frame: u64) -> &[SubjectRecord] {
        self.frames.get(&frame).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of frames carrying at least one record.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn record_count(&self) -> usize {
        self.frames.values().map(Vec::len).sum()
    }

    pub fn last_frame(&self) -> Option<u64> {
        self.frames.keys().next_back().copied()
    }

    pub fn malformed_entries(&self) -> usize {
        self.malformed
    }
}

fn parse_box(track_id: u32, raw: RawBox) -> Result<(u64, SubjectRecord), AnnotationError> {
    let malformed = |reason: String| AnnotationError::Malformed { track_id, reason };

    let frame = raw
        .frame
        .as_ref()
        .and_then(parse_frame)
        .ok_or_else(|| malformed(format!("bad frame index {:?}", raw.frame)))?;

    let coordinate = |name: &str, value: &Option<Value>| {
        value
            .as_ref()
            .and_then(parse_coordinate)
            .ok_or_else(|| malformed(format!("frame {}: bad {} {:?}", frame, name, value)))
    };

    let bbox = BoundingBox::new(
        coordinate("xtl", &raw.xtl)?,
        coordinate("ytl", &raw.ytl)?,
        coordinate("xbr", &raw.xbr)?,
        coordinate("ybr", &raw.ybr)?,
    );

    let behavior = raw
        .attributes
        .get(constants::BEHAVIOR_ATTRIBUTE)
        .and_then(parse_text);

    let occluded = raw.occluded.as_ref().map_or(false, parse_flag);

    Ok((
        frame,
        SubjectRecord {
            track_id,
            bbox,
            behavior,
            occluded,
        },
    ))
}

fn parse_frame(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parsed as a float, then truncated toward zero.
fn parse_coordinate(value: &Value) -> Option<i32> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then(|| parsed.trunc() as i32)
}

fn parse_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => return None,
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

fn parse_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => {
            let s = s.trim();
            s == "1" || s.eq_ignore_ascii_case("true")
        }
        _ => false,
    }
}
