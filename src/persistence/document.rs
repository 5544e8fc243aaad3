use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{StoreError, StoreResult};
use crate::scene::{EditIntent, ObjectType, SceneGraph, SceneObject, Shape, Style, TransformRecord};

pub const FORMAT_VERSION: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Persisted scene blob. Ephemeral objects never reach this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDocument {
    pub version: u64,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub objects: Vec<ObjectRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRecord {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: ObjectType,
    pub geometry: Value,
    pub style: Style,
    pub z_index: i64,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub transform_records: Vec<TransformRecord>,
    #[serde(default)]
    pub intent: EditIntent,
}

impl ObjectRecord {
    fn capture(object: &SceneObject) -> StoreResult<Self> {
        let geometry = match serde_json::to_value(&object.shape)? {
            Value::Object(mut tagged) => tagged.remove("geometry").unwrap_or(Value::Null),
            other => other,
        };
        Ok(Self {
            id: object.id,
            kind: object.object_type(),
            geometry,
            style: object.style.clone(),
            z_index: object.z_index,
            locked: object.locked,
            transform_records: object.transform_records.clone(),
            intent: object.intent.clone(),
        })
    }

    fn into_object(self) -> StoreResult<SceneObject> {
        let shape: Shape = serde_json::from_value(json!({
            "type": self.kind,
            "geometry": self.geometry,
        }))?;
        Ok(SceneObject {
            id: self.id,
            shape,
            style: self.style,
            z_index: self.z_index,
            locked: self.locked,
            transform_records: self.transform_records,
            intent: self.intent,
            ephemeral: None,
        })
    }
}

impl SceneDocument {
    pub fn capture(graph: &SceneGraph, canvas: CanvasSize) -> Self {
        let objects = graph
            .persistent()
            .filter_map(|object| match ObjectRecord::capture(object) {
                Ok(record) => Some(record),
                Err(err) => {
                    tracing::warn!(id = object.id, ?err, "object could not be captured; skipped");
                    None
                }
            })
            .collect();
        Self {
            version: FORMAT_VERSION,
            canvas_width: canvas.width,
            canvas_height: canvas.height,
            objects,
        }
    }

    pub fn canvas_size(&self) -> CanvasSize {
        CanvasSize::new(self.canvas_width, self.canvas_height)
    }

    pub fn to_json(&self) -> StoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(blob: &str) -> StoreResult<Self> {
        let raw: Value = serde_json::from_str(blob)?;
        let migrated = migrate(raw)?;
        Ok(serde_json::from_value(migrated)?)
    }

    pub fn into_objects(self) -> StoreResult<Vec<SceneObject>> {
        self.objects
            .into_iter()
            .map(ObjectRecord::into_object)
            .collect()
    }
}

/// Upgrades a raw blob to `FORMAT_VERSION`, one version step at a time.
pub fn migrate(mut raw: Value) -> StoreResult<Value> {
    let mut version = raw.get("version").and_then(Value::as_u64).unwrap_or(1);
    if version > FORMAT_VERSION {
        return Err(StoreError::UnsupportedVersion(version));
    }
    while version < FORMAT_VERSION {
        raw = match version {
            1 => migrate_v1_to_v2(raw)?,
            other => return Err(StoreError::UnsupportedVersion(other)),
        };
        version += 1;
        tracing::debug!(version, "migrated scene document");
    }
    Ok(raw)
}

/// v1 kept the canvas as a nested object and implied z-order by array
/// position; transform records and locks did not exist yet.
fn migrate_v1_to_v2(raw: Value) -> StoreResult<Value> {
    let Value::Object(mut root) = raw else {
        return Err(StoreError::Malformed("document root is not an object"));
    };
    if let Some(Value::Object(canvas)) = root.remove("canvas") {
        for (from, to) in [("width", "canvasWidth"), ("height", "canvasHeight")] {
            if let Some(value) = canvas.get(from) {
                root.entry(to).or_insert_with(|| value.clone());
            }
        }
    }
    root.entry("canvasWidth").or_insert(json!(0));
    root.entry("canvasHeight").or_insert(json!(0));

    let objects = match root.remove("objects") {
        Some(Value::Array(objects)) => objects,
        Some(_) => return Err(StoreError::Malformed("objects is not an array")),
        None => Vec::new(),
    };
    let objects = objects
        .into_iter()
        .enumerate()
        .map(|(position, object)| {
            let Value::Object(mut object) = object else {
                return Err(StoreError::Malformed("object entry is not an object"));
            };
            object.entry("zIndex").or_insert(json!(position));
            object.entry("locked").or_insert(json!(false));
            object
                .entry("transformRecords")
                .or_insert_with(|| Value::Array(Vec::new()));
            object
                .entry("style")
                .or_insert_with(|| Value::Object(Map::new()));
            Ok(Value::Object(object))
        })
        .collect::<StoreResult<Vec<_>>>()?;
    root.insert("objects".to_string(), Value::Array(objects));
    root.insert("version".to_string(), json!(2));
    Ok(Value::Object(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Color, Point};
    use crate::scene::{
        BoxGeometry, EphemeralRole, GroupGeometry, ImageGeometry, PointsGeometry, TextGeometry,
        TransformKind,
    };

    fn sample_graph() -> SceneGraph {
        let mut graph = SceneGraph::new();
        let mut rectangle = SceneObject::new(
            Shape::Rectangle(BoxGeometry::new(10.0, 10.0, 90.0, 70.0)),
            Style {
                fill: Some(Color::new(255, 0, 0)),
                ..Style::default()
            },
        );
        rectangle.transform_records.push(TransformRecord {
            kind: TransformKind::CropMask,
            path: vec![
                Point::new(0.0, 0.0),
                Point::new(5.0, 0.0),
                Point::new(5.0, 5.0),
            ],
            id: 1,
            timestamp: 99,
        });
        graph.add(rectangle);
        graph.add(SceneObject::new(
            Shape::Path(PointsGeometry::new(vec![
                Point::new(1.0, 1.0),
                Point::new(9.0, 4.0),
            ])),
            Style::default(),
        ));
        graph.add(SceneObject::new(
            Shape::Text(TextGeometry::new(Point::new(3.0, 4.0), "hello", 16.0)),
            Style::default(),
        ));
        graph.add(SceneObject::new(
            Shape::Image(ImageGeometry::natural("base.png", Point::new(0.0, 0.0), 64, 48)),
            Style::default(),
        ));
        graph.add(SceneObject::new(
            Shape::Group(GroupGeometry {
                children: vec![Shape::Ellipse(BoxGeometry::new(1.0, 2.0, 3.0, 4.0))],
            }),
            Style::default(),
        ));
        graph.upsert_ephemeral(
            EphemeralRole::Preview,
            Shape::Rectangle(BoxGeometry::new(0.0, 0.0, 1.0, 1.0)),
            Style::default(),
        );
        graph
    }

    #[test]
    fn round_trip_preserves_persistent_objects_and_drops_ephemeral() {
        let graph = sample_graph();
        let blob = graph
            .serialize(CanvasSize::new(640, 480))
            .expect("graph should serialize");
        let (restored, canvas) = SceneGraph::deserialize(&blob).expect("blob should restore");
        assert_eq!(canvas, CanvasSize::new(640, 480));
        assert_eq!(restored.persistent_objects(), graph.persistent_objects());
        assert!(restored.objects().iter().all(|object| !object.is_ephemeral()));
        assert_eq!(
            restored
                .serialize(CanvasSize::new(640, 480))
                .expect("restored graph should serialize"),
            blob
        );
    }

    #[test]
    fn blob_uses_camel_case_wire_keys() {
        let blob = sample_graph()
            .serialize(CanvasSize::new(10, 20))
            .expect("graph should serialize");
        let value: Value = serde_json::from_str(&blob).expect("blob should be json");
        assert_eq!(value["version"], 2);
        assert_eq!(value["canvasWidth"], 10);
        let first = &value["objects"][0];
        assert_eq!(first["type"], "rectangle");
        assert_eq!(first["style"]["fill"], "#ff0000");
        assert_eq!(first["zIndex"], 0);
        assert_eq!(first["transformRecords"][0]["type"], "crop_mask");
        assert_eq!(value["objects"].as_array().map(Vec::len), Some(5));
    }

    #[test]
    fn v1_documents_migrate_with_positional_z_order() {
        let v1 = r#"{
            "canvas": { "width": 300, "height": 200 },
            "objects": [
                { "id": 7, "type": "ellipse", "geometry": { "x": 0, "y": 0, "width": 5, "height": 5 } },
                { "id": 3, "type": "rectangle", "geometry": { "x": 1, "y": 1, "width": 5, "height": 5 } }
            ]
        }"#;
        let document = SceneDocument::from_json(v1).expect("v1 blob should migrate");
        assert_eq!(document.version, FORMAT_VERSION);
        assert_eq!(document.canvas_size(), CanvasSize::new(300, 200));
        let objects = document.into_objects().expect("objects should convert");
        assert_eq!(objects[0].z_index, 0);
        assert_eq!(objects[1].z_index, 1);
        assert!(objects.iter().all(|object| object.transform_records.is_empty()));
        assert_eq!(objects[1].object_type(), ObjectType::Rectangle);
    }

    #[test]
    fn future_versions_are_rejected() {
        let err = SceneDocument::from_json(r#"{"version": 9, "objects": []}"#)
            .expect_err("unknown version should fail");
        assert!(matches!(err, StoreError::UnsupportedVersion(9)));
    }
}
