// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! File bundles: companion files sharing one basename.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// One unit of navigation: the image stack, audio, alignment and cached
/// frames recorded under a common basename.
///
/// Bundles form a doubly linked chain sorted by `name`; the ends of the
/// chain have `None` in the respective direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileBundle {
    pub name: String,
    #[serde(rename = "_prev")]
    pub prev: Option<String>,
    #[serde(rename = "_next")]
    pub next: Option<String>,
    /// Pre-extracted frames, keyed by frame number, relative to the project root.
    #[serde(default, deserialize_with = "deserialize_processed")]
    pub processed: Option<BTreeMap<u32, PathBuf>>,
    /// Extension key (e.g. `.wav`, `US.txt`) -> path relative to the project root.
    #[serde(flatten)]
    pub companions: BTreeMap<String, Option<PathBuf>>,
}

impl FileBundle {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            prev: None,
            next: None,
            processed: None,
            companions: BTreeMap::new(),
        }
    }

    /// Path of the companion file recorded under `extension`, if any.
    pub fn companion(&self, extension: &str) -> Option<&PathBuf> {
        self.companions.get(extension).and_then(Option::as_ref)
    }

    /// Path of the cached frame image, if the frame was pre-extracted.
    pub fn processed_frame(&self, frame: u32) -> Option<&PathBuf> {
        self.processed.as_ref().and_then(|frames| frames.get(&frame))
    }

    pub(crate) fn set_processed(&mut self, frame: u32, path: PathBuf) {
        self.processed
            .get_or_insert_with(BTreeMap::new)
            .insert(frame, path);
    }
}

/// Frame-number map key that accepts both `"3"` (JSON) and `3` (YAML).
///
/// Needed because `companions` is flattened, which routes every sibling
/// field through serde's buffered content and loses JSON's string-keyed
/// integer parsing.
#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct FrameKey(u32);

impl<'de> Deserialize<'de> for FrameKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FrameKeyVisitor;

        impl Visitor<'_> for FrameKeyVisitor {
            type Value = FrameKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative frame number")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<FrameKey, E> {
                u32::try_from(v)
                    .map(FrameKey)
                    .map_err(|_| E::custom(format!("frame number {v} out of range")))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<FrameKey, E> {
                u64::try_from(v)
                    .map_err(|_| E::custom(format!("negative frame number {v}")))
                    .and_then(|v| self.visit_u64(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<FrameKey, E> {
                v.parse()
                    .map(FrameKey)
                    .map_err(|_| E::custom(format!("invalid frame key `{v}`")))
            }
        }

        deserializer.deserialize_any(FrameKeyVisitor)
    }
}

fn deserialize_processed<'de, D>(
    deserializer: D,
) -> Result<Option<BTreeMap<u32, PathBuf>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<FrameKey, PathBuf>> = Option::deserialize(deserializer)?;
    Ok(raw.map(|frames| frames.into_iter().map(|(k, v)| (k.0, v)).collect()))
}

/// Sort bundles by name and rewrite their `prev`/`next` links.
pub fn link_chain(bundles: &mut [FileBundle]) {
    bundles.sort_by(|a, b| a.name.cmp(&b.name));
    let names: Vec<String> = bundles.iter().map(|b| b.name.clone()).collect();
    for (i, bundle) in bundles.iter_mut().enumerate() {
        bundle.prev = i.checked_sub(1).map(|j| names[j].clone());
        bundle.next = names.get(i + 1).cloned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_chain_sorts_and_links() {
        let mut bundles = vec![FileBundle::new("02"), FileBundle::new("00"), FileBundle::new("01")];
        link_chain(&mut bundles);

        let names: Vec<&str> = bundles.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["00", "01", "02"]);
        assert_eq!(bundles[0].prev, None);
        assert_eq!(bundles[0].next.as_deref(), Some("01"));
        assert_eq!(bundles[1].prev.as_deref(), Some("00"));
        assert_eq!(bundles[2].next, None);
    }

    #[test]
    fn test_bundle_json_layout() {
        let mut bundle = FileBundle::new("00");
        bundle
            .companions
            .insert(".wav".to_string(), Some(PathBuf::from("00.wav")));
        bundle.set_processed(3, PathBuf::from("00_dicom_to_png/00_frame_0003.png"));

        let value = serde_json::to_value(&bundle).unwrap();
        assert_eq!(value["name"], "00");
        assert!(value["_prev"].is_null());
        assert_eq!(value[".wav"], "00.wav");
        assert_eq!(value["processed"]["3"], "00_dicom_to_png/00_frame_0003.png");

        let back: FileBundle = serde_json::from_value(value).unwrap();
        assert_eq!(back, bundle);
    }

    #[test]
    fn test_bundle_accepts_null_companions() {
        let json = r#"{"name":"a","_prev":null,"_next":"b","processed":null,".dicom":null,".wav":"a.wav"}"#;
        let bundle: FileBundle = serde_json::from_str(json).unwrap();
        assert_eq!(bundle.companion(".dicom"), None);
        assert_eq!(bundle.companion(".wav"), Some(&PathBuf::from("a.wav")));
        assert_eq!(bundle.next.as_deref(), Some("b"));
    }
}
