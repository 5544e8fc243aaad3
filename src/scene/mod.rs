//! Ordered object store, z-order and hit testing.

pub mod object;

use std::collections::HashSet;

use crate::geometry::{Bounds, Point};
use crate::persistence::{CanvasSize, SceneDocument, StoreError};

pub use object::{
    BoxGeometry, EditIntent, EphemeralRole, GroupGeometry, ImageGeometry, IntentUpdate,
    ObjectId, ObjectType, OperationKind, PixelRect, PointsGeometry, SceneObject, Shape, Style,
    StylePatch, TextGeometry, TransformKind, TransformRecord, UNASSIGNED_ID,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZDirection {
    /// One step toward the viewer.
    Forward,
    Backward,
}

/// Object collection kept sorted by ascending `z_index`.
///
/// `z_index` values are handed out from a monotonic counter and swapped on
/// reorder, so they stay unique without being renumbered; gaps left by removed
/// objects are allowed.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    objects: Vec<SceneObject>,
    next_id: ObjectId,
    next_z: i64,
    next_record_id: u64,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            next_id: 1,
            next_z: 0,
            next_record_id: 1,
        }
    }

    fn allocate_id(&mut self) -> ObjectId {
        while self.contains(self.next_id) || self.next_id == UNASSIGNED_ID {
            self.next_id = self.next_id.wrapping_add(1);
        }
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    pub(crate) fn allocate_record_id(&mut self) -> u64 {
        let id = self.next_record_id;
        self.next_record_id = self.next_record_id.saturating_add(1);
        id
    }

    fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|object| object.id == id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.index_of(id).is_some()
    }

    /// Appends `object` at the top of the z-order and returns its id.
    ///
    /// A missing or colliding id is regenerated rather than rejected.
    pub fn add(&mut self, mut object: SceneObject) -> ObjectId {
        if object.id == UNASSIGNED_ID {
            object.id = self.allocate_id();
        } else if self.contains(object.id) {
            let requested = object.id;
            object.id = self.allocate_id();
            tracing::debug!(requested, assigned = object.id, "object id collision; regenerated");
        } else {
            self.next_id = self.next_id.max(object.id.saturating_add(1));
        }
        object.z_index = self.next_z;
        self.next_z = self.next_z.saturating_add(1);
        let id = object.id;
        self.objects.push(object);
        id
    }

    /// Removes `id`; unknown ids are a silent no-op.
    pub fn remove(&mut self, id: ObjectId) -> Option<SceneObject> {
        let index = self.index_of(id)?;
        Some(self.objects.remove(index))
    }

    /// Shifts `id` one step in z-order past its nearest persistent neighbour.
    /// Returns `false` at either end or for unknown and ephemeral ids.
    pub fn reorder(&mut self, id: ObjectId, direction: ZDirection) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        if self.objects[index].is_ephemeral() {
            return false;
        }
        let neighbour = match direction {
            ZDirection::Forward => self.objects[index + 1..]
                .iter()
                .position(|object| !object.is_ephemeral())
                .map(|offset| index + 1 + offset),
            ZDirection::Backward => self.objects[..index]
                .iter()
                .rposition(|object| !object.is_ephemeral()),
        };
        let Some(neighbour) = neighbour else {
            return false;
        };
        let z_a = self.objects[index].z_index;
        let z_b = self.objects[neighbour].z_index;
        self.objects[index].z_index = z_b;
        self.objects[neighbour].z_index = z_a;
        self.objects.swap(index, neighbour);
        true
    }

    /// Returns `Some(changed)` for a known id.
    pub fn set_locked(&mut self, id: ObjectId, locked: bool) -> Option<bool> {
        let object = self.get_mut(id)?;
        if object.is_ephemeral() {
            return Some(false);
        }
        let changed = object.locked != locked;
        object.locked = locked;
        Some(changed)
    }

    pub fn unlock_all(&mut self) -> usize {
        let mut unlocked = 0;
        for object in self.objects.iter_mut().filter(|object| object.locked) {
            object.locked = false;
            unlocked += 1;
        }
        unlocked
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|object| object.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|object| object.id == id)
    }

    /// Every object in paint order, ephemeral ones included.
    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn persistent(&self) -> impl DoubleEndedIterator<Item = &SceneObject> {
        self.objects.iter().filter(|object| !object.is_ephemeral())
    }

    pub fn persistent_objects(&self) -> Vec<SceneObject> {
        self.persistent().cloned().collect()
    }

    pub fn z_order(&self) -> Vec<ObjectId> {
        self.persistent().map(|object| object.id).collect()
    }

    pub fn len(&self) -> usize {
        self.persistent().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Swaps in a persisted object set, dropping every ephemeral object.
    /// Repeated ids are regenerated and tied z values are pushed upward.
    pub fn replace_objects(&mut self, mut objects: Vec<SceneObject>) {
        objects.retain(|object| !object.is_ephemeral());
        objects.sort_by_key(|object| object.z_index);

        let mut spare_id = objects
            .iter()
            .map(|object| object.id)
            .max()
            .unwrap_or(0)
            .saturating_add(1);
        let mut seen = HashSet::with_capacity(objects.len());
        let mut previous_z: Option<i64> = None;
        for object in &mut objects {
            if object.id == UNASSIGNED_ID || !seen.insert(object.id) {
                let repeated = object.id;
                object.id = spare_id;
                spare_id = spare_id.saturating_add(1);
                seen.insert(object.id);
                tracing::warn!(repeated, assigned = object.id, "duplicate object id in scene; regenerated");
            }
            if let Some(below) = previous_z.filter(|below| object.z_index <= *below) {
                let repeated = object.z_index;
                object.z_index = below.saturating_add(1);
                tracing::warn!(id = object.id, repeated, assigned = object.z_index, "tied z index in scene; renumbered");
            }
            previous_z = Some(object.z_index);
        }
        self.objects = objects;
        self.next_id = self
            .objects
            .iter()
            .map(|object| object.id)
            .max()
            .unwrap_or(0)
            .saturating_add(1);
        self.next_z = self
            .objects
            .iter()
            .map(|object| object.z_index)
            .max()
            .map_or(0, |z| z.saturating_add(1));
        self.next_record_id = self
            .objects
            .iter()
            .flat_map(|object| object.transform_records.iter().map(|record| record.id))
            .max()
            .unwrap_or(0)
            .saturating_add(1)
            .max(self.next_record_id);
    }

    /// Replaces the object stored under `id`, keeping its id and z-position.
    pub fn replace_in_place(&mut self, id: ObjectId, mut replacement: SceneObject) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        replacement.id = id;
        replacement.z_index = self.objects[index].z_index;
        self.objects[index] = replacement;
        true
    }

    /// Removes every unlocked persistent object; locked ones survive.
    pub fn clear_unlocked(&mut self) -> Vec<ObjectId> {
        let removed = self
            .objects
            .iter()
            .filter(|object| !object.locked && !object.is_ephemeral())
            .map(|object| object.id)
            .collect::<Vec<_>>();
        self.objects
            .retain(|object| object.locked || object.is_ephemeral());
        removed
    }

    /// Inserts or updates the single ephemeral object holding `role`.
    pub fn upsert_ephemeral(&mut self, role: EphemeralRole, shape: Shape, style: Style) -> ObjectId {
        if let Some(existing) = self
            .objects
            .iter_mut()
            .find(|object| object.ephemeral == Some(role))
        {
            existing.shape = shape;
            existing.style = style;
            return existing.id;
        }
        self.add(SceneObject::ephemeral(shape, style, role))
    }

    pub fn remove_ephemeral_where(&mut self, predicate: impl Fn(EphemeralRole) -> bool) {
        self.objects
            .retain(|object| object.ephemeral.is_none_or(|role| !predicate(role)));
    }

    pub fn clear_ephemeral(&mut self) {
        self.objects.retain(|object| !object.is_ephemeral());
    }

    /// Regenerates translucent overlays for non-image objects that carry
    /// `crop_mask` records.
    pub fn rebuild_crop_overlays(&mut self, opacity: f64) {
        self.remove_ephemeral_where(|role| matches!(role, EphemeralRole::CropOverlay { .. }));
        let overlays = self
            .persistent()
            .filter(|object| object.object_type() != ObjectType::Image)
            .flat_map(|object| {
                object.crop_masks().map(move |record| (object.id, record.path.clone()))
            })
            .collect::<Vec<_>>();
        for (target, path) in overlays {
            let mut style = Style {
                fill: Some(crate::geometry::Color::new(64, 156, 255)),
                stroke: Some(crate::geometry::Color::new(64, 156, 255)),
                stroke_width: 1.0,
                opacity: 1.0,
                dashed: true,
            };
            style.set_opacity(opacity);
            self.add(SceneObject::ephemeral(
                Shape::Polygon(PointsGeometry::new(path)),
                style,
                EphemeralRole::CropOverlay { target },
            ));
        }
    }

    /// Topmost interactive object whose bounds contain `point`.
    pub fn top_object_at(&self, point: Point, padding: f64) -> Option<ObjectId> {
        self.persistent()
            .rev()
            .filter(|object| !object.locked)
            .find(|object| object.bounds().contains(point, padding))
            .map(|object| object.id)
    }

    /// Interactive objects intersecting `area`, topmost first.
    pub fn ids_intersecting(&self, area: &Bounds) -> Vec<ObjectId> {
        self.persistent()
            .rev()
            .filter(|object| !object.locked && object.bounds().intersects(area))
            .map(|object| object.id)
            .collect()
    }

    pub fn serialize(&self, canvas: CanvasSize) -> Result<String, StoreError> {
        SceneDocument::capture(self, canvas).to_json()
    }

    pub fn deserialize(blob: &str) -> Result<(Self, CanvasSize), StoreError> {
        let document = SceneDocument::from_json(blob)?;
        let canvas = document.canvas_size();
        let mut graph = Self::new();
        graph.replace_objects(document.into_objects()?);
        Ok((graph, canvas))
    }
}
