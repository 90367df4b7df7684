//! Persisted blueprint document.
//!
//! A blueprint is position-based: part records are identified only by their
//! index in `parts`, and connection records store the world positions of
//! both endpoints at save time instead of point indices. Rebuilding a graph
//! therefore has to infer which points were joined (see
//! [`BlueprintCodec::build`](super::codec::BlueprintCodec::build)).

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use glam::{Quat, Vec3};
use regex_lite::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::canonical::{canonical_hash_hex, quantize_float, quantize_vec3};
use crate::types::{AttachmentPoint, Health, Part, PartKind, PartProperties, PointKind, Pose};
use super::stats::BlueprintStats;
use super::BLUEPRINT_SCHEMA_VERSION;

/// Highest rating a blueprint can carry.
pub const MAX_RATING: f32 = 5.0;

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

/// Lower-case, trim, join inner whitespace with `-`, drop empties and
/// duplicates (first occurrence wins).
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = whitespace()
            .replace_all(tag.as_ref().trim(), "-")
            .to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

fn clamp_rating(rating: f32) -> f32 {
    if rating.is_finite() {
        rating.clamp(0.0, MAX_RATING)
    } else {
        0.0
    }
}

fn deserialize_tags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Vec::<String>::deserialize(deserializer).map(normalize_tags)
}

fn deserialize_rating<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
    f32::deserialize(deserializer).map(clamp_rating)
}

/// Descriptive data. Not used when rebuilding the graph.
///
/// Tags and rating are normalised on deserialization and again whenever a
/// snapshot is assembled, so direct writes to the fields cannot leak out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintMetadata {
    /// Blueprint identity.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Author name.
    pub author: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last save time.
    pub updated_at: DateTime<Utc>,
    /// Normalised free-form tags.
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
    /// Rating in `0.0..=5.0`.
    #[serde(default, deserialize_with = "deserialize_rating")]
    pub rating: f32,
}

impl BlueprintMetadata {
    /// Fresh metadata stamped now.
    pub fn new(name: impl Into<String>, author: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            author: author.into(),
            created_at: now,
            updated_at: now,
            tags: Vec::new(),
            rating: 0.0,
        }
    }

    /// Replace tags (normalised).
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_tags(tags);
        self
    }

    /// Set the rating, clamped to `0.0..=5.0`.
    pub fn with_rating(mut self, rating: f32) -> Self {
        self.rating = clamp_rating(rating);
        self
    }

    /// Re-apply tag normalisation and rating clamping in place.
    pub fn normalize(&mut self) {
        self.tags = normalize_tags(&self.tags);
        self.rating = clamp_rating(self.rating);
    }

    /// Bump `updated_at` to now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn default_active() -> bool {
    true
}

/// Geometric description of one attachment point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    /// Point kind.
    pub kind: PointKind,
    /// Part-local position.
    pub local_offset: Vec3,
    /// Part-local direction.
    pub direction: Vec3,
    /// Match tolerance.
    pub radius: f32,
    /// Whether the point is enabled.
    #[serde(default = "default_active")]
    pub active: bool,
}

impl From<&AttachmentPoint> for PointRecord {
    fn from(point: &AttachmentPoint) -> Self {
        Self {
            kind: point.kind,
            local_offset: point.local_offset,
            direction: point.direction,
            radius: point.radius,
            active: point.active,
        }
    }
}

impl PointRecord {
    /// Instantiate an unoccupied point.
    pub fn to_point(&self) -> AttachmentPoint {
        let mut point = AttachmentPoint::new(self.kind, self.local_offset, self.direction, self.radius);
        point.active = self.active;
        point
    }
}

/// One part, as saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartRecord {
    /// Part kind.
    pub kind: PartKind,
    /// World pose at save time.
    pub pose: Pose,
    /// Mass.
    pub mass: f32,
    /// Health.
    pub health: Health,
    /// Type-specific data.
    #[serde(default)]
    pub properties: PartProperties,
    /// Points in index order.
    pub points: Vec<PointRecord>,
}

impl From<&Part> for PartRecord {
    fn from(part: &Part) -> Self {
        Self {
            kind: part.kind,
            pose: part.pose,
            mass: part.mass,
            health: part.health,
            properties: part.properties.clone(),
            points: part.points().iter().map(PointRecord::from).collect(),
        }
    }
}

impl PartRecord {
    /// Instantiate the part with all points unoccupied.
    pub fn to_part(&self) -> Part {
        Part::new(
            self.kind,
            self.pose,
            self.mass,
            self.points.iter().map(PointRecord::to_point).collect(),
        )
        .with_health(self.health)
        .with_properties(self.properties.clone())
    }
}

/// One connection, as saved: part indices plus endpoint world positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Index of the first part in `parts`.
    pub part_a: usize,
    /// Index of the second part in `parts`.
    pub part_b: usize,
    /// World position of the first endpoint at save time.
    pub position_a: Vec3,
    /// World position of the second endpoint at save time.
    pub position_b: Vec3,
    /// Break threshold; the policy default is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_threshold: Option<f32>,
}

/// A complete persisted assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintSnapshot {
    /// Blueprint schema version.
    pub schema_version: String,
    /// Descriptive data.
    pub metadata: BlueprintMetadata,
    /// Parts in emission order; the index is the part's only identity.
    pub parts: Vec<PartRecord>,
    /// Connections between parts.
    pub connections: Vec<ConnectionRecord>,
    /// Derived statistics for display.
    pub stats: BlueprintStats,
}

type PointKey = (PointKind, [i64; 3], [i64; 3], i64, bool);
type PartKey = (PartKind, [i64; 3], [i64; 4], i64, Vec<PointKey>);
type ConnectionKey = (usize, usize, [i64; 3], [i64; 3]);

/// Quantized structure for fingerprinting.
#[derive(Serialize)]
struct FingerprintInput<'a> {
    schema_version: &'a str,
    parts: Vec<PartKey>,
    connections: Vec<ConnectionKey>,
}

fn quantize_quat(q: Quat) -> [i64; 4] {
    [
        quantize_float(q.x),
        quantize_float(q.y),
        quantize_float(q.z),
        quantize_float(q.w),
    ]
}

impl BlueprintSnapshot {
    /// Assemble a snapshot with the current schema version.
    pub fn new(
        metadata: BlueprintMetadata,
        parts: Vec<PartRecord>,
        connections: Vec<ConnectionRecord>,
        stats: BlueprintStats,
    ) -> Self {
        let mut metadata = metadata;
        metadata.normalize();
        Self {
            schema_version: BLUEPRINT_SCHEMA_VERSION.to_string(),
            metadata,
            parts,
            connections,
            stats,
        }
    }

    /// Deterministic hash of the structural content (parts and connection
    /// records). Metadata and stats are excluded; floats are quantized.
    pub fn fingerprint(&self) -> String {
        let parts = self
            .parts
            .iter()
            .map(|p| {
                let points = p
                    .points
                    .iter()
                    .map(|pt| {
                        (
                            pt.kind,
                            quantize_vec3(pt.local_offset),
                            quantize_vec3(pt.direction),
                            quantize_float(pt.radius),
                            pt.active,
                        )
                    })
                    .collect();
                (
                    p.kind,
                    quantize_vec3(p.pose.position),
                    quantize_quat(p.pose.orientation),
                    quantize_float(p.mass),
                    points,
                )
            })
            .collect();
        let connections = self
            .connections
            .iter()
            .map(|c| {
                (
                    c.part_a,
                    c.part_b,
                    quantize_vec3(c.position_a),
                    quantize_vec3(c.position_b),
                )
            })
            .collect();

        canonical_hash_hex(&FingerprintInput {
            schema_version: &self.schema_version,
            parts,
            connections,
        })
    }

    /// Path of the first NaN or infinite float, if any.
    ///
    /// JSON has no encoding for these, so a snapshot holding one would be
    /// written with `null` in its place and could never be read back.
    pub fn non_finite_field(&self) -> Option<String> {
        if !self.metadata.rating.is_finite() {
            return Some("metadata.rating".to_string());
        }
        for (i, part) in self.parts.iter().enumerate() {
            let mut floats = vec![
                ("pose.position", part.pose.position.is_finite()),
                ("pose.orientation", part.pose.orientation.is_finite()),
                ("mass", part.mass.is_finite()),
                ("health", part.health.current.is_finite() && part.health.max.is_finite()),
            ];
            match &part.properties {
                PartProperties::Wheel { wheel_radius, grip } => {
                    floats.push(("properties", wheel_radius.is_finite() && grip.is_finite()));
                }
                PartProperties::Motor { torque, max_speed } => {
                    floats.push(("properties", torque.is_finite() && max_speed.is_finite()));
                }
                PartProperties::Plain | PartProperties::Seat { .. } | PartProperties::Tool { .. } => {}
            }
            if let Some((field, _)) = floats.iter().find(|(_, ok)| !ok) {
                return Some(format!("parts[{i}].{field}"));
            }
            for (j, point) in part.points.iter().enumerate() {
                let ok = point.local_offset.is_finite()
                    && point.direction.is_finite()
                    && point.radius.is_finite();
                if !ok {
                    return Some(format!("parts[{i}].points[{j}]"));
                }
            }
        }
        for (i, c) in self.connections.iter().enumerate() {
            let ok = c.position_a.is_finite()
                && c.position_b.is_finite()
                && c.break_threshold.map_or(true, f32::is_finite);
            if !ok {
                return Some(format!("connections[{i}]"));
            }
        }
        if !self.stats.total_mass.is_finite() || !self.stats.center_of_mass.is_finite() {
            return Some("stats".to_string());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    #[test]
    fn test_normalize_tags() {
        let tags = normalize_tags(["  Off Road ", "off-road", "", "Racer", "RACER"]);
        assert_eq!(tags, vec!["off-road".to_string(), "racer".to_string()]);
    }

    #[test]
    fn test_rating_clamped() {
        let meta = BlueprintMetadata::new("buggy", "sam").with_rating(9.0);
        assert_eq!(meta.rating, MAX_RATING);
        let meta = meta.with_rating(f32::NAN);
        assert_eq!(meta.rating, 0.0);
    }

    #[test]
    fn test_part_record_roundtrip_keeps_geometry() {
        let part = catalog::motor(Pose::from_position(Vec3::new(1.0, 2.0, 3.0)));
        let record = PartRecord::from(&part);
        assert_eq!(record.to_part(), part);
    }

    #[test]
    fn test_inactive_point_survives_record() {
        let mut point = AttachmentPoint::with_default_radius(PointKind::Linkage, Vec3::X, Vec3::X);
        point.active = false;
        let record = PointRecord::from(&point);
        assert!(!record.to_point().active);
    }

    #[test]
    fn test_active_defaults_true_when_missing() {
        let json = r#"{"kind":"Structural","local_offset":[0.0,0.0,0.0],"direction":[1.0,0.0,0.0],"radius":0.5}"#;
        let record: PointRecord = serde_json::from_str(json).unwrap();
        assert!(record.active);
    }

    #[test]
    fn test_fingerprint_ignores_metadata() {
        let parts = vec![PartRecord::from(&catalog::block(Pose::default()))];
        let a = BlueprintSnapshot::new(
            BlueprintMetadata::new("a", "x"),
            parts.clone(),
            vec![],
            BlueprintStats::default(),
        );
        let b = BlueprintSnapshot::new(
            BlueprintMetadata::new("b", "y").with_rating(4.0),
            parts,
            vec![],
            BlueprintStats::default(),
        );
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_metadata_normalised_on_read() {
        let mut value = serde_json::to_value(BlueprintMetadata::new("buggy", "sam")).unwrap();
        value["tags"] = serde_json::json!(["  Mud Runner", "mud-runner", "FAST"]);
        value["rating"] = serde_json::json!(42.0);

        let meta: BlueprintMetadata = serde_json::from_value(value).unwrap();
        assert_eq!(meta.tags, vec!["mud-runner", "fast"]);
        assert_eq!(meta.rating, MAX_RATING);
    }

    #[test]
    fn test_snapshot_normalises_direct_writes() {
        let mut meta = BlueprintMetadata::new("buggy", "sam");
        meta.tags = vec!["Two  Seat".to_string(), "two-seat".to_string()];
        meta.rating = -3.0;

        let snapshot = BlueprintSnapshot::new(meta, vec![], vec![], BlueprintStats::default());
        assert_eq!(snapshot.metadata.tags, vec!["two-seat"]);
        assert_eq!(snapshot.metadata.rating, 0.0);
    }

    #[test]
    fn test_non_finite_field_located() {
        let part = PartRecord::from(&catalog::block(Pose::default()));
        let mut snapshot = BlueprintSnapshot::new(
            BlueprintMetadata::new("buggy", "sam"),
            vec![part.clone(), part],
            vec![],
            BlueprintStats::default(),
        );
        assert_eq!(snapshot.non_finite_field(), None);

        snapshot.parts[1].pose.position.z = f32::NAN;
        assert_eq!(snapshot.non_finite_field().as_deref(), Some("parts[1].pose.position"));
    }
}
