//! Filmfolio API wire types
//!
//! The service speaks a JSON:API-style envelope: every payload carries a
//! `data` member holding one resource (or a list of them) with `id`,
//! `type` and `attributes`. These types model exactly the fields the
//! publish engine consumes; unknown fields are ignored on the way in and
//! absent options are omitted on the way out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One resource inside the envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource<A> {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: A,
}

/// Envelope around a single resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document<A> {
    pub data: Resource<A>,
}

/// Envelope around a resource list, with the pagination cursor.
#[derive(Debug, Clone, Deserialize)]
pub struct ListDocument<A> {
    pub data: Vec<Resource<A>>,
    #[serde(default)]
    pub links: Option<PageLinks>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageLinks {
    /// Absolute URL of the next page; absent on the last page.
    #[serde(default)]
    pub next: Option<String>,
}

/// Roll attributes as the server reports (and accepts) them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollAttributes {
    #[serde(default)]
    pub name: Option<String>,
    /// ISO date (`YYYY-MM-DD`) the roll is filed under
    #[serde(default)]
    pub date: Option<String>,
}

/// A server-side roll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roll {
    pub id: String,
    pub name: Option<String>,
    pub date: Option<String>,
}

impl From<Resource<RollAttributes>> for Roll {
    fn from(resource: Resource<RollAttributes>) -> Self {
        Roll {
            id: resource.id,
            name: resource.attributes.name,
            date: resource.attributes.date,
        }
    }
}

/// Pre-signed upload target issued by the service.
#[derive(Debug, Clone)]
pub struct UploadTarget {
    /// Photograph id pre-issued alongside the target
    pub photograph_id: String,
    /// Object storage URL the bytes go to, via raw PUT
    pub upload_url: String,
    /// Headers the storage endpoint requires on that PUT
    pub upload_headers: HashMap<String, String>,
    /// Storage key the photograph record must reference
    pub storage_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadTargetAttributes {
    pub upload_url: String,
    #[serde(default)]
    pub upload_headers: HashMap<String, String>,
    pub storage_key: String,
}

/// Attributes submitted when creating a photograph record.
#[derive(Debug, Clone, Serialize)]
pub struct NewPhotographAttributes {
    pub roll_id: String,
    pub storage_key: String,
    pub filename: String,
    pub position: u32,
}

/// Descriptive metadata for a photograph, used for partial updates.
///
/// Never carries the storage key or roll membership; those are fixed at
/// creation time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhotographMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    pub selected: bool,
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GpsPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_roll_page_with_next_link() {
        let json = r#"{
            "data": [
                {"id": "r1", "type": "rolls", "attributes": {"name": "Summer", "date": "2024-07-01"}},
                {"id": "r2", "type": "rolls", "attributes": {"name": "Autumn"}}
            ],
            "links": {"next": "https://api.example.com/rolls?page=2"}
        }"#;

        let page: ListDocument<RollAttributes> = serde_json::from_str(json).unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(
            page.links.as_ref().and_then(|l| l.next.as_deref()),
            Some("https://api.example.com/rolls?page=2")
        );

        let roll: Roll = page.data[0].clone().into();
        assert_eq!(roll.id, "r1");
        assert_eq!(roll.date.as_deref(), Some("2024-07-01"));
    }

    #[test]
    fn test_deserialize_last_page_without_links() {
        let json = r#"{"data": []}"#;
        let page: ListDocument<RollAttributes> = serde_json::from_str(json).unwrap();
        assert!(page.data.is_empty());
        assert!(page.links.is_none());
    }

    #[test]
    fn test_metadata_omits_absent_fields() {
        let metadata = PhotographMetadata {
            rating: Some(4),
            selected: true,
            keywords: vec!["film".to_string()],
            ..Default::default()
        };

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["rating"], 4);
        assert_eq!(json["selected"], true);
        assert!(json.get("description").is_none());
        assert!(json.get("location").is_none());
        assert!(json.get("captured_at").is_none());
    }

    #[test]
    fn test_upload_target_attributes_default_headers() {
        let json = r#"{
            "data": {
                "id": "p1",
                "type": "photographs",
                "attributes": {
                    "upload_url": "https://storage.example.com/abc",
                    "storage_key": "abc"
                }
            }
        }"#;

        let doc: Document<UploadTargetAttributes> = serde_json::from_str(json).unwrap();
        assert_eq!(doc.data.id, "p1");
        assert!(doc.data.attributes.upload_headers.is_empty());
    }
}
