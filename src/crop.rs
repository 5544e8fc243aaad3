//! Transform-first crop: paths are recorded as data on their targets, and only
//! image targets are baked into a new pixel window right away.
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use image::RgbaImage;

use crate::assets::{ImageLoadError, ImageProvider};
use crate::error::{EditorError, EditorResult, RejectReason};
use crate::geometry::{Bounds, Point};
use crate::scene::{
    ImageGeometry, ObjectId, ObjectType, PixelRect, SceneGraph, SceneObject, Shape,
    TransformKind, TransformRecord,
};
use crate::selection::SelectionManager;
use crate::tools::MIN_PATH_POINTS;

const CROP_ELIGIBLE: [ObjectType; 7] = [
    ObjectType::Image,
    ObjectType::Rectangle,
    ObjectType::Ellipse,
    ObjectType::Polygon,
    ObjectType::Path,
    ObjectType::Text,
    ObjectType::Group,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropTargets {
    pub ids: Vec<ObjectId>,
    /// Targets were picked by intersection because nothing was selected.
    pub auto_selected: bool,
}

/// One planned change per target; computed before the graph is touched so a
/// failed bake aborts the whole crop.
#[derive(Debug, Clone, PartialEq)]
pub enum CropEffect {
    Attach { id: ObjectId },
    Bake { id: ObjectId, geometry: ImageGeometry },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CropOutcome {
    pub attached: Vec<ObjectId>,
    pub baked: Vec<ObjectId>,
}

pub fn resolve_targets(
    graph: &SceneGraph,
    selection: &SelectionManager,
    path_bounds: &Bounds,
) -> CropTargets {
    let eligible = |id: &ObjectId| {
        graph.get(*id).is_some_and(|object| {
            object.is_interactive() && CROP_ELIGIBLE.contains(&object.object_type())
        })
    };
    if !selection.is_empty() {
        return CropTargets {
            ids: selection.ids().into_iter().filter(eligible).collect(),
            auto_selected: false,
        };
    }
    CropTargets {
        ids: graph
            .ids_intersecting(path_bounds)
            .into_iter()
            .filter(eligible)
            .collect(),
        auto_selected: true,
    }
}

pub fn plan_crop(
    graph: &SceneGraph,
    targets: &[ObjectId],
    path: &[Point],
    rasters: &mut RasterStore,
    provider: &dyn ImageProvider,
) -> EditorResult<Vec<CropEffect>> {
    if path.len() < MIN_PATH_POINTS {
        return Err(RejectReason::TooFewPoints {
            required: MIN_PATH_POINTS,
            got: path.len(),
        }
        .into());
    }
    let mut effects = Vec::with_capacity(targets.len());
    for &id in targets {
        let Some(object) = graph.get(id) else {
            tracing::warn!(id, "crop target vanished before commit; skipped");
            continue;
        };
        let Some(image) = object.shape.as_image() else {
            effects.push(CropEffect::Attach { id });
            continue;
        };
        let Some(geometry) = baked_geometry(image, path) else {
            tracing::debug!(id, "crop path misses image; skipped");
            continue;
        };
        rasters
            .raster_for(&geometry, provider)
            .map_err(|source| EditorError::ResourceUnavailable {
                reference: image.reference.clone(),
                source,
            })?;
        effects.push(CropEffect::Bake { id, geometry });
    }
    if effects.is_empty() {
        return Err(RejectReason::OutsideImage.into());
    }
    Ok(effects)
}

/// Applies planned effects; one record id per target.
pub fn apply_crop(
    graph: &mut SceneGraph,
    effects: Vec<CropEffect>,
    path: &[Point],
    now_ms: u64,
) -> CropOutcome {
    let mut outcome = CropOutcome::default();
    for effect in effects {
        let record = TransformRecord {
            kind: TransformKind::CropMask,
            path: path.to_vec(),
            id: graph.allocate_record_id(),
            timestamp: now_ms,
        };
        match effect {
            CropEffect::Attach { id } => {
                if let Some(object) = graph.get_mut(id) {
                    object.transform_records.push(record);
                    outcome.attached.push(id);
                }
            }
            CropEffect::Bake { id, geometry } => {
                let Some(original) = graph.get(id).cloned() else {
                    continue;
                };
                let replacement = baked_replacement(original, geometry, &record);
                if graph.replace_in_place(id, replacement) {
                    outcome.baked.push(id);
                }
            }
        }
    }
    outcome
}

/// The consumed record is appended and dropped again so it is never applied
/// twice; earlier pending records survive.
fn baked_replacement(
    mut object: SceneObject,
    geometry: ImageGeometry,
    consumed: &TransformRecord,
) -> SceneObject {
    object.transform_records.push(consumed.clone());
    object.shape = Shape::Image(geometry);
    object
        .transform_records
        .retain(|record| record.id != consumed.id);
    object
}

/// Maps the path's bounding box into the image's local frame, clamps it to
/// the placed box and derives the new placement plus source pixel window.
pub fn baked_geometry(image: &ImageGeometry, path: &[Point]) -> Option<ImageGeometry> {
    if image.width <= 0.0 || image.height <= 0.0 {
        return None;
    }
    let local = path
        .iter()
        .map(|point| image.to_local(*point))
        .collect::<Vec<_>>();
    let area = Bounds::from_points(&local)?;
    let x0 = area.x.clamp(0.0, image.width);
    let x1 = area.right().clamp(0.0, image.width);
    let y0 = area.y.clamp(0.0, image.height);
    let y1 = area.bottom().clamp(0.0, image.height);
    if x1 - x0 <= 0.0 || y1 - y0 <= 0.0 {
        return None;
    }

    let source = image.source_rect;
    let scale_x = f64::from(source.width) / image.width;
    let scale_y = f64::from(source.height) / image.height;
    let px0 = snap_floor(x0 * scale_x).min(source.width.saturating_sub(1));
    let py0 = snap_floor(y0 * scale_y).min(source.height.saturating_sub(1));
    let px1 = snap_ceil(x1 * scale_x).min(source.width);
    let py1 = snap_ceil(y1 * scale_y).min(source.height);
    let source_rect = PixelRect::new(
        source.x + px0,
        source.y + py0,
        px1.saturating_sub(px0).max(1),
        py1.saturating_sub(py0).max(1),
    );

    let origin = image.to_scene(Point::new(x0, y0));
    Some(ImageGeometry {
        x: origin.x,
        y: origin.y,
        width: x1 - x0,
        height: y1 - y0,
        rotation: image.rotation,
        reference: image.reference.clone(),
        source_rect,
    })
}

const PIXEL_SNAP_EPSILON: f64 = 1e-6;

// Rotation round trips leave values like 9.999999999999998.
fn snap_floor(value: f64) -> u32 {
    (value + PIXEL_SNAP_EPSILON).floor().max(0.0) as u32
}

fn snap_ceil(value: f64) -> u32 {
    (value - PIXEL_SNAP_EPSILON).ceil().max(0.0) as u32
}

/// Decoded sources by reference plus cropped windows by `(reference, rect)`.
#[derive(Debug, Default)]
pub struct RasterStore {
    sources: HashMap<String, Rc<RgbaImage>>,
    windows: HashMap<(String, PixelRect), Rc<RgbaImage>>,
}

impl RasterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(
        &mut self,
        reference: &str,
        provider: &dyn ImageProvider,
    ) -> Result<Rc<RgbaImage>, ImageLoadError> {
        if let Some(source) = self.sources.get(reference) {
            return Ok(Rc::clone(source));
        }
        let source = Rc::new(provider.load(reference)?);
        tracing::debug!(
            reference,
            width = source.width(),
            height = source.height(),
            "source raster decoded"
        );
        self.sources
            .insert(reference.to_string(), Rc::clone(&source));
        Ok(source)
    }

    pub fn raster_for(
        &mut self,
        image: &ImageGeometry,
        provider: &dyn ImageProvider,
    ) -> Result<Rc<RgbaImage>, ImageLoadError> {
        let source = self.source(&image.reference, provider)?;
        let rect = image.source_rect;
        if rect == PixelRect::new(0, 0, source.width(), source.height()) {
            return Ok(source);
        }
        let key = (image.reference.clone(), rect);
        if let Some(window) = self.windows.get(&key) {
            return Ok(Rc::clone(window));
        }
        let window = Rc::new(crop_window(&source, rect)?);
        self.windows.insert(key, Rc::clone(&window));
        Ok(window)
    }

    /// Cached raster without touching the provider.
    pub fn cached(&self, image: &ImageGeometry) -> Option<Rc<RgbaImage>> {
        let source = self.sources.get(&image.reference)?;
        if image.source_rect == PixelRect::new(0, 0, source.width(), source.height()) {
            return Some(Rc::clone(source));
        }
        self.windows
            .get(&(image.reference.clone(), image.source_rect))
            .cloned()
    }

    /// Drops sources and windows that none of `in_use` shows. Returns how
    /// many rasters were released.
    pub fn retain_used<'a>(&mut self, in_use: impl IntoIterator<Item = &'a ImageGeometry>) -> usize {
        let mut references = HashSet::new();
        let mut windows = HashSet::new();
        for image in in_use {
            references.insert(image.reference.as_str());
            windows.insert((image.reference.as_str(), image.source_rect));
        }
        let before = self.sources.len() + self.windows.len();
        self.sources
            .retain(|reference, _| references.contains(reference.as_str()));
        self.windows
            .retain(|(reference, rect), _| windows.contains(&(reference.as_str(), *rect)));
        before - self.sources.len() - self.windows.len()
    }
}

fn crop_window(source: &RgbaImage, rect: PixelRect) -> Result<RgbaImage, ImageLoadError> {
    let fits_x = rect.x.checked_add(rect.width).is_some_and(|end| end <= source.width());
    let fits_y = rect.y.checked_add(rect.height).is_some_and(|end| end <= source.height());
    if rect.width == 0 || rect.height == 0 || !fits_x || !fits_y {
        return Err(ImageLoadError::OutOfBounds {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        });
    }
    Ok(image::imageops::crop_imm(source, rect.x, rect.y, rect.width, rect.height).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryImageProvider;
    use crate::scene::{BoxGeometry, Style};
    use crate::selection::SelectMode;
    use image::Rgba;

    fn square(x: f64, y: f64, side: f64) -> Vec<Point> {
        vec![
            Point::new(x, y),
            Point::new(x + side, y),
            Point::new(x + side, y + side),
            Point::new(x, y + side),
        ]
    }

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 0, 255]))
    }

    #[test]
    fn baked_geometry_clamps_to_image_box() {
        let image = ImageGeometry::natural("a.png", Point::new(100.0, 100.0), 50, 40);
        let baked = baked_geometry(&image, &square(130.0, 120.0, 100.0))
            .expect("path overlaps the image");
        assert_eq!((baked.x, baked.y), (130.0, 120.0));
        assert_eq!((baked.width, baked.height), (20.0, 20.0));
        assert_eq!(baked.source_rect, PixelRect::new(30, 20, 20, 20));
    }

    #[test]
    fn baked_geometry_scales_into_source_pixels() {
        let mut image = ImageGeometry::natural("a.png", Point::new(0.0, 0.0), 100, 100);
        image.width = 50.0;
        image.height = 50.0;
        let baked = baked_geometry(&image, &square(10.0, 10.0, 20.0)).expect("overlap");
        assert_eq!(baked.source_rect, PixelRect::new(20, 20, 40, 40));
        assert_eq!((baked.width, baked.height), (20.0, 20.0));
    }

    #[test]
    fn baked_geometry_keeps_rotation_and_maps_origin() {
        let mut image = ImageGeometry::natural("a.png", Point::new(0.0, 0.0), 100, 100);
        image.rotation = 90.0;
        let path = [
            image.to_scene(Point::new(10.0, 20.0)),
            image.to_scene(Point::new(60.0, 20.0)),
            image.to_scene(Point::new(60.0, 50.0)),
        ];
        let baked = baked_geometry(&image, &path).expect("overlap");
        let origin = image.to_scene(Point::new(10.0, 20.0));
        assert!((baked.x - origin.x).abs() < 1e-9);
        assert!((baked.y - origin.y).abs() < 1e-9);
        assert_eq!(baked.rotation, 90.0);
        assert_eq!(baked.source_rect, PixelRect::new(10, 20, 50, 30));
    }

    #[test]
    fn baked_geometry_rejects_disjoint_path() {
        let image = ImageGeometry::natural("a.png", Point::new(0.0, 0.0), 10, 10);
        assert!(baked_geometry(&image, &square(50.0, 50.0, 5.0)).is_none());
    }

    #[test]
    fn targets_prefer_selection_then_intersection() {
        let mut graph = SceneGraph::new();
        let inside = graph.add(SceneObject::new(
            Shape::Rectangle(BoxGeometry::new(0.0, 0.0, 20.0, 20.0)),
            Style::default(),
        ));
        let locked = graph.add(SceneObject::new(
            Shape::Ellipse(BoxGeometry::new(5.0, 5.0, 20.0, 20.0)),
            Style::default(),
        ));
        let outside = graph.add(SceneObject::new(
            Shape::Rectangle(BoxGeometry::new(500.0, 500.0, 20.0, 20.0)),
            Style::default(),
        ));
        graph.set_locked(locked, true);
        let path_bounds = Bounds::new(0.0, 0.0, 30.0, 30.0);

        let mut selection = SelectionManager::new();
        let auto = resolve_targets(&graph, &selection, &path_bounds);
        assert_eq!(auto.ids, vec![inside]);
        assert!(auto.auto_selected);

        selection.select(&[outside], SelectMode::Replace, &graph);
        let chosen = resolve_targets(&graph, &selection, &path_bounds);
        assert_eq!(chosen.ids, vec![outside]);
        assert!(!chosen.auto_selected);
    }

    #[test]
    fn failed_source_load_aborts_plan() {
        let mut graph = SceneGraph::new();
        let id = graph.add(SceneObject::new(
            Shape::Image(ImageGeometry::natural("gone.png", Point::default(), 10, 10)),
            Style::default(),
        ));
        let mut rasters = RasterStore::new();
        let err = plan_crop(
            &graph,
            &[id],
            &square(1.0, 1.0, 5.0),
            &mut rasters,
            &MemoryImageProvider::new(),
        )
        .expect_err("missing raster should fail");
        assert!(matches!(
            err,
            EditorError::ResourceUnavailable { reference, .. } if reference == "gone.png"
        ));
    }

    #[test]
    fn raster_store_crops_and_caches_windows() {
        let provider = MemoryImageProvider::new();
        provider.insert("g.png", gradient(16, 16));
        let mut rasters = RasterStore::new();
        let mut geometry = ImageGeometry::natural("g.png", Point::default(), 16, 16);
        geometry.source_rect = PixelRect::new(4, 6, 5, 3);
        let window = rasters
            .raster_for(&geometry, &provider)
            .expect("window should crop");
        assert_eq!(window.dimensions(), (5, 3));
        assert_eq!(window.get_pixel(0, 0), &Rgba([4, 6, 0, 255]));
        provider.remove("g.png");
        assert!(rasters.cached(&geometry).is_some());
        assert_eq!(rasters.retain_used(std::iter::empty()), 2);
        assert!(rasters.cached(&geometry).is_none());
    }

    #[test]
    fn retain_used_keeps_only_shown_windows() {
        let provider = MemoryImageProvider::new();
        provider.insert("g.png", gradient(16, 16));
        let mut rasters = RasterStore::new();
        let mut first = ImageGeometry::natural("g.png", Point::default(), 16, 16);
        first.source_rect = PixelRect::new(0, 0, 8, 8);
        let mut second = first.clone();
        second.source_rect = PixelRect::new(8, 8, 8, 8);
        for geometry in [&first, &second] {
            rasters
                .raster_for(geometry, &provider)
                .expect("window should crop");
        }

        assert_eq!(rasters.retain_used([&second]), 1);
        assert!(rasters.cached(&first).is_none());
        assert!(rasters.cached(&second).is_some());
    }

    #[test]
    fn out_of_bounds_window_is_an_error() {
        let source = gradient(4, 4);
        assert!(matches!(
            crop_window(&source, PixelRect::new(2, 2, 4, 1)),
            Err(ImageLoadError::OutOfBounds { .. })
        ));
    }
}
