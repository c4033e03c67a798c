// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Persisted state of root and extension instances.
//!
//! Every field decodes leniently: a value of the wrong type reads as the
//! field's default instead of failing the whole document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::TransitError;
use crate::slots::Slot;

/// Deserializes a field, replacing malformed values with the type's default.
pub fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Deserializes a list one element at a time. A malformed element reads as the
/// element type's default and keeps its position; anything but a list reads as
/// empty.
pub fn lenient_items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let serde_json::Value::Array(items) = serde_json::Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .map(|item| serde_json::from_value(item).unwrap_or_default())
        .collect())
}

/// A bound parameter as persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    /// Negative for a column whose binding was released.
    #[serde(default, deserialize_with = "lenient")]
    pub owner_id: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub param_index: i64,
}

/// Persisted state of a root instance.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default, deserialize_with = "lenient")]
    pub panel_theme: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub mapping_indicator_hidden: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub process_division: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub slot_cv_mode: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub out_mode: i64,
    /// -1 when no slot is current.
    #[serde(default, deserialize_with = "lenient")]
    pub current_slot: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub active_count: i64,
    #[serde(default, deserialize_with = "lenient_items")]
    pub source_maps: Vec<SourceMap>,
    #[serde(default, deserialize_with = "lenient_items")]
    pub slots: Vec<Slot>,
}

impl Document {
    /// Parses a document. Only input that is not a JSON object at all is an error.
    pub fn from_json(json: &str) -> Result<Document, TransitError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, TransitError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Persisted state of an extension instance.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionDocument {
    #[serde(default, deserialize_with = "lenient")]
    pub panel_theme: i64,
    #[serde(default, deserialize_with = "lenient_items")]
    pub slots: Vec<Slot>,
}

impl ExtensionDocument {
    pub fn from_json(json: &str) -> Result<ExtensionDocument, TransitError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, TransitError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_field_names() {
        let document = Document {
            current_slot: -1,
            active_count: 12,
            source_maps: vec![SourceMap {
                owner_id: 3,
                param_index: 1,
            }],
            ..Default::default()
        };
        let json: serde_json::Value = serde_json::from_str(
            &document.to_json().expect("document should serialize"),
        )
        .expect("document should be json");

        for key in [
            "panelTheme",
            "mappingIndicatorHidden",
            "processDivision",
            "slotCvMode",
            "outMode",
            "currentSlot",
            "activeCount",
            "sourceMaps",
            "slots",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["sourceMaps"][0]["ownerId"], 3);
        assert_eq!(json["sourceMaps"][0]["paramIndex"], 1);
    }

    #[test]
    fn test_malformed_fields_read_as_default() {
        let document = Document::from_json(
            r#"{
                "panelTheme": "dark",
                "mappingIndicatorHidden": true,
                "processDivision": 64,
                "slotCvMode": null,
                "outMode": 1.5,
                "currentSlot": 2,
                "activeCount": [],
                "sourceMaps": [{"ownerId": 4, "paramIndex": "x"}, {"ownerId": 5, "paramIndex": 2}],
                "slots": {"not": "a list"},
                "unknown": true
            }"#,
        )
        .expect("document should parse");

        assert_eq!(document.panel_theme, 0);
        assert!(document.mapping_indicator_hidden);
        assert_eq!(document.process_division, 64);
        assert_eq!(document.slot_cv_mode, 0);
        assert_eq!(document.out_mode, 0);
        assert_eq!(document.current_slot, 2);
        assert_eq!(document.active_count, 0);
        assert_eq!(
            document.source_maps,
            vec![
                SourceMap {
                    owner_id: 4,
                    param_index: 0
                },
                SourceMap {
                    owner_id: 5,
                    param_index: 2
                }
            ]
        );
        assert!(document.slots.is_empty());
    }

    #[test]
    fn test_bad_list_entries_keep_their_place() {
        let document = Document::from_json(
            r#"{
                "sourceMaps": [{"ownerId": 1, "paramIndex": 0}, {"ownerId": 2, "paramIndex": 1}, 7],
                "slots": [{"used": true, "values": [4.0]}, "broken", {"used": true}]
            }"#,
        )
        .expect("document should parse");

        assert_eq!(
            document.source_maps,
            vec![
                SourceMap {
                    owner_id: 1,
                    param_index: 0
                },
                SourceMap {
                    owner_id: 2,
                    param_index: 1
                },
                SourceMap::default()
            ]
        );
        assert_eq!(document.slots.len(), 3);
        assert_eq!(document.slots[0].values(), &[4.0]);
        assert!(!document.slots[1].is_used());
        assert!(document.slots[2].is_used());
    }

    #[test]
    fn test_not_json_is_an_error() {
        assert!(matches!(
            Document::from_json("not json"),
            Err(TransitError::Document(_))
        ));
        assert_eq!(
            ExtensionDocument::from_json("{}").expect("empty object should parse"),
            ExtensionDocument::default()
        );
    }
}
