use super::{Editor, EditorTask, PendingImage};
use crate::crop::{apply_crop, plan_crop, resolve_targets, CropOutcome};
use crate::error::{EditorError, EditorResult, RejectReason};
use crate::events::EditorEvent;
use crate::geometry::{union_all, Bounds, Point};
use crate::scene::{
    GroupGeometry, ImageGeometry, IntentUpdate, ObjectId, SceneGraph, SceneObject, Shape, Style,
    StylePatch, TransformKind, TransformRecord, ZDirection,
};
use crate::selection::SelectMode;
use crate::tools::MIN_PATH_POINTS;

pub type ImageRequest = u64;

impl Editor {
    pub fn select(&mut self, ids: &[ObjectId], mode: SelectMode) -> bool {
        match self.selection.select(ids, mode, &self.graph) {
            Some(ids) => {
                self.events.emit(&EditorEvent::SelectionChanged { ids });
                true
            }
            None => false,
        }
    }

    pub fn clear_selection(&mut self) -> bool {
        match self.selection.clear() {
            Some(ids) => {
                self.events.emit(&EditorEvent::SelectionChanged { ids });
                true
            }
            None => false,
        }
    }

    fn require(&mut self, id: ObjectId) -> EditorResult<&SceneObject> {
        if self.object(id).is_none() {
            return Err(self.report(EditorError::UnknownObject(id)));
        }
        self.object(id).ok_or(EditorError::UnknownObject(id))
    }

    /// Adds `object` on top as a committed mutation.
    pub fn add_object(&mut self, object: SceneObject) -> ObjectId {
        let id = self.commit("add", |graph| graph.add(object));
        tracing::debug!(id, "object added");
        id
    }

    pub fn delete_selection(&mut self) -> usize {
        let ids = self.selection.ids();
        self.remove_objects(&ids)
    }

    /// Removes the given ids; locked objects are skipped.
    pub fn remove_objects(&mut self, ids: &[ObjectId]) -> usize {
        let removable = ids
            .iter()
            .copied()
            .filter(|id| match self.object(*id) {
                Some(object) if object.locked => {
                    tracing::debug!(id, "locked object is not deletable");
                    false
                }
                Some(_) => true,
                None => {
                    tracing::warn!(id, "delete references unknown object; ignored");
                    false
                }
            })
            .collect::<Vec<_>>();
        if removable.is_empty() {
            return 0;
        }
        self.commit("delete", |graph| {
            removable
                .iter()
                .filter(|id| graph.remove(**id).is_some())
                .count()
        })
    }

    /// Removes every unlocked object.
    pub fn clear(&mut self) -> usize {
        self.cancel_gesture();
        self.commit("clear", |graph| graph.clear_unlocked().len())
    }

    pub fn reorder(&mut self, id: ObjectId, direction: ZDirection) -> EditorResult<bool> {
        if self.require(id)?.locked {
            tracing::debug!(id, "locked object keeps its z-position");
            return Ok(false);
        }
        Ok(self.commit("reorder", |graph| graph.reorder(id, direction)))
    }

    pub fn set_locked(&mut self, id: ObjectId, locked: bool) -> EditorResult<bool> {
        self.require(id)?;
        let changed = self.commit("set_locked", |graph| graph.set_locked(id, locked));
        Ok(changed.unwrap_or(false))
    }

    pub fn unlock_all(&mut self) -> usize {
        self.commit("unlock_all", |graph| graph.unlock_all())
    }

    /// Property-panel write path for per-object intent.
    pub fn update_intent(&mut self, id: ObjectId, update: IntentUpdate) -> EditorResult<()> {
        self.require(id)?;
        self.commit("update_intent", |graph| {
            if let Some(object) = graph.get_mut(id) {
                update.apply(&mut object.intent);
            }
        });
        Ok(())
    }

    pub fn set_style(&mut self, ids: &[ObjectId], patch: &StylePatch) -> usize {
        let known = ids
            .iter()
            .copied()
            .filter(|id| {
                let known = self.object(*id).is_some();
                if !known {
                    tracing::warn!(id, "style update references unknown object; ignored");
                }
                known
            })
            .collect::<Vec<_>>();
        self.commit("set_style", |graph| {
            let mut changed = 0;
            for id in known {
                if let Some(object) = graph.get_mut(id) {
                    let before = object.style.clone();
                    patch.apply(&mut object.style);
                    changed += usize::from(object.style != before);
                }
            }
            changed
        })
    }

    /// Replaces the content of a text object; `Ok(false)` for other types.
    pub fn update_text(&mut self, id: ObjectId, content: impl Into<String>) -> EditorResult<bool> {
        if !matches!(self.require(id)?.shape, Shape::Text(_)) {
            return Ok(false);
        }
        let content = content.into();
        Ok(self.commit("update_text", |graph| match graph.get_mut(id) {
            Some(SceneObject {
                shape: Shape::Text(text),
                ..
            }) if text.content != content => {
                text.content = content;
                true
            }
            _ => false,
        }))
    }

    /// Appends a non-destructive record for a downstream consumer. Only
    /// `commit_crop` bakes.
    pub fn attach_transform(
        &mut self,
        id: ObjectId,
        kind: TransformKind,
        path: Vec<Point>,
    ) -> EditorResult<u64> {
        self.require(id)?;
        if path.len() < MIN_PATH_POINTS {
            return Err(self.report(
                RejectReason::TooFewPoints {
                    required: MIN_PATH_POINTS,
                    got: path.len(),
                }
                .into(),
            ));
        }
        let now = self.clock.now_ms();
        Ok(self.commit("attach_transform", |graph| {
            let record_id = graph.allocate_record_id();
            if let Some(object) = graph.get_mut(id) {
                object.transform_records.push(TransformRecord {
                    kind,
                    path,
                    id: record_id,
                    timestamp: now,
                });
            }
            record_id
        }))
    }

    fn selection_pivot(&self) -> Option<Point> {
        let bounds = self
            .selection
            .ids()
            .into_iter()
            .filter_map(|id| self.graph.get(id).map(SceneObject::bounds));
        union_all(bounds).map(|bounds| bounds.center())
    }

    pub fn move_selection_by(&mut self, dx: f64, dy: f64) -> bool {
        if self.selection.is_empty() || (dx == 0.0 && dy == 0.0) {
            return false;
        }
        let ids = self.selection.ids();
        self.commit("move", |graph| translate_all(graph, &ids, dx, dy));
        true
    }

    /// Scales the selection about its bounding-box centre.
    pub fn scale_selection(&mut self, sx: f64, sy: f64) -> bool {
        if !(sx.is_finite() && sy.is_finite()) || sx <= 0.0 || sy <= 0.0 {
            tracing::debug!(sx, sy, "scale factors must be positive");
            return false;
        }
        let Some(pivot) = self.selection_pivot() else {
            return false;
        };
        let ids = self.selection.ids();
        self.commit("scale", |graph| {
            for id in &ids {
                if let Some(object) = graph.get_mut(*id) {
                    object.scale_about(pivot, sx, sy);
                }
            }
        });
        true
    }

    pub fn rotate_selection(&mut self, degrees: f64) -> bool {
        if !degrees.is_finite() || degrees == 0.0 {
            return false;
        }
        let Some(pivot) = self.selection_pivot() else {
            return false;
        };
        let ids = self.selection.ids();
        self.commit("rotate", |graph| {
            for id in &ids {
                if let Some(object) = graph.get_mut(*id) {
                    object.rotate_about(pivot, degrees);
                }
            }
        });
        true
    }

    /// Starts a live transform of the selection. Frames applied through
    /// [`Editor::update_transform`] are transient; only `end_transform`
    /// records history.
    pub fn begin_transform(&mut self) -> bool {
        if self.transform_origin.is_some() || self.selection.is_empty() {
            return false;
        }
        self.transform_origin = Some(self.graph.persistent_objects());
        self.autosave.begin_transform();
        self.scheduler.cancel(&EditorTask::Autosave);
        tracing::debug!(ids = ?self.selection.ids(), "transform started");
        true
    }

    pub fn update_transform(&mut self, dx: f64, dy: f64) {
        if self.transform_origin.is_none() {
            tracing::debug!("transform frame without an active transform; ignored");
            return;
        }
        let ids = self.selection.ids();
        translate_all(&mut self.graph, &ids, dx, dy);
    }

    pub fn end_transform(&mut self) {
        let Some(before) = self.transform_origin.take() else {
            return;
        };
        let now = self.clock.now_ms();
        let changed = self.graph.persistent().ne(before.iter());
        if changed {
            self.history.record(before, now);
            // The post-transform delay from `end_transform` schedules the save.
            self.autosave.mark_dirty();
            self.graph
                .rebuild_crop_overlays(self.config.crop_overlay_opacity);
        }
        if let Some(delay) = self.autosave.end_transform(now) {
            self.scheduler.schedule(EditorTask::Autosave, now, delay);
        }
        tracing::debug!(changed, "transform ended");
        if changed {
            self.events.emit(&EditorEvent::SceneChanged);
        }
    }

    /// Merges two or more selected objects into one group that takes the
    /// topmost member's id and z-position.
    pub fn group_selection(&mut self) -> Option<ObjectId> {
        let members = self
            .graph
            .persistent()
            .filter(|object| self.selection.contains(object.id))
            .cloned()
            .collect::<Vec<_>>();
        let top = members.last()?.clone();
        if members.len() < 2 {
            return None;
        }
        let mut group = SceneObject::new(
            Shape::Group(GroupGeometry {
                children: members.iter().map(|member| member.shape.clone()).collect(),
            }),
            top.style.clone(),
        );
        group.intent = top.intent.clone();
        group.transform_records = members
            .iter()
            .flat_map(|member| member.transform_records.iter().cloned())
            .collect();
        self.commit("group", |graph| {
            for member in &members[..members.len() - 1] {
                graph.remove(member.id);
            }
            graph.replace_in_place(top.id, group);
        });
        self.select(&[top.id], SelectMode::Replace);
        Some(top.id)
    }

    /// Splits a group back into top-level objects sharing its style.
    pub fn ungroup(&mut self, id: ObjectId) -> EditorResult<Vec<ObjectId>> {
        let group = self.require(id)?.clone();
        let Shape::Group(geometry) = group.shape else {
            return Ok(Vec::new());
        };
        if group.locked {
            return Ok(Vec::new());
        }
        let mut children = geometry.children.into_iter();
        let Some(first) = children.next() else {
            return Ok(Vec::new());
        };
        let style = group.style;
        let ids = self.commit("ungroup", |graph| {
            let mut head = SceneObject::new(first, style.clone());
            head.intent = group.intent;
            head.transform_records = group.transform_records;
            graph.replace_in_place(id, head);
            let mut ids = vec![id];
            ids.extend(children.map(|shape| graph.add(SceneObject::new(shape, style.clone()))));
            ids
        });
        self.select(&ids, SelectMode::Replace);
        Ok(ids)
    }

    /// Records `path` on the selection, or on every eligible object under it
    /// when nothing is selected. Image targets are baked immediately.
    pub fn commit_crop(&mut self, path: Vec<Point>) -> EditorResult<CropOutcome> {
        if path.len() < MIN_PATH_POINTS {
            return Err(self.report(
                RejectReason::TooFewPoints {
                    required: MIN_PATH_POINTS,
                    got: path.len(),
                }
                .into(),
            ));
        }
        let path_bounds = Bounds::from_points(&path).unwrap_or_default();
        let targets = resolve_targets(&self.graph, &self.selection, &path_bounds);
        if targets.ids.is_empty() {
            return Err(self.report(RejectReason::NoTargets.into()));
        }
        let effects = match plan_crop(
            &self.graph,
            &targets.ids,
            &path,
            &mut self.rasters,
            self.images.as_ref(),
        ) {
            Ok(effects) => effects,
            Err(err) => return Err(self.report(err)),
        };
        if targets.auto_selected {
            self.select(&targets.ids, SelectMode::Replace);
        }
        let now = self.clock.now_ms();
        let outcome = self.commit("crop", |graph| apply_crop(graph, effects, &path, now));
        tracing::info!(
            attached = ?outcome.attached,
            baked = ?outcome.baked,
            "crop committed"
        );
        Ok(outcome)
    }

    /// Queues a deferred load; the object is committed by a later `tick`.
    pub fn insert_image(&mut self, reference: impl Into<String>, at: Point) -> ImageRequest {
        let request = self.next_request;
        self.next_request += 1;
        let reference = reference.into();
        tracing::debug!(request, %reference, "image load queued");
        self.pending_images
            .insert(request, PendingImage { reference, at });
        let now = self.clock.now_ms();
        self.scheduler
            .schedule(EditorTask::ResolveImage(request), now, 0);
        request
    }

    pub(super) fn resolve_image(&mut self, request: ImageRequest) -> Option<ObjectId> {
        let Some(pending) = self.pending_images.remove(&request) else {
            tracing::debug!(request, "image request already resolved");
            return None;
        };
        let source = match self.rasters.source(&pending.reference, self.images.as_ref()) {
            Ok(source) => source,
            Err(source) => {
                self.report(EditorError::ResourceUnavailable {
                    reference: pending.reference,
                    source,
                });
                return None;
            }
        };
        let geometry = ImageGeometry::natural(
            pending.reference,
            pending.at,
            source.width(),
            source.height(),
        );
        let style = Style {
            stroke: None,
            ..Default::default()
        };
        let id = self.add_object(SceneObject::new(Shape::Image(geometry), style));
        self.select(&[id], SelectMode::Replace);
        Some(id)
    }
}

fn translate_all(graph: &mut SceneGraph, ids: &[ObjectId], dx: f64, dy: f64) {
    for id in ids {
        match graph.get_mut(*id) {
            Some(object) if object.is_interactive() => object.translate(dx, dy),
            Some(_) => tracing::debug!(id, "locked object is not movable"),
            None => {}
        }
    }
}
