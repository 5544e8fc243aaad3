use serde::{Deserialize, Serialize};

use crate::geometry::{union_all, Bounds, Color, Point};

pub type ObjectId = u64;

/// Placeholder id for objects that have not been added to a graph yet.
pub const UNASSIGNED_ID: ObjectId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Rectangle,
    Ellipse,
    Polygon,
    Path,
    Text,
    Image,
    Group,
}

impl ObjectType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Ellipse => "ellipse",
            Self::Polygon => "polygon",
            Self::Path => "path",
            Self::Text => "text",
            Self::Image => "image",
            Self::Group => "group",
        }
    }
}

/// Axis box with a rotation in degrees about its `(x, y)` corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxGeometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
}

impl BoxGeometry {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            rotation: 0.0,
        }
    }

    pub fn from_bounds(bounds: Bounds) -> Self {
        Self::new(bounds.x, bounds.y, bounds.width, bounds.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    fn bounds(&self) -> Bounds {
        rotated_box_bounds(
            self.origin(),
            self.width,
            self.height,
            self.rotation,
        )
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    fn scale_about(&mut self, pivot: Point, sx: f64, sy: f64) {
        let origin = self.origin().scaled_about(pivot, sx, sy);
        self.x = origin.x.min(origin.x + self.width * sx);
        self.y = origin.y.min(origin.y + self.height * sy);
        self.width *= sx.abs();
        self.height *= sy.abs();
    }

    fn rotate_about(&mut self, pivot: Point, degrees: f64) {
        let origin = self.origin().rotated_about(pivot, degrees);
        self.x = origin.x;
        self.y = origin.y;
        self.rotation = normalize_degrees(self.rotation + degrees);
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointsGeometry {
    pub points: Vec<Point>,
}

impl PointsGeometry {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextGeometry {
    pub x: f64,
    pub y: f64,
    pub content: String,
    pub font_size: f64,
    #[serde(default)]
    pub rotation: f64,
}

impl TextGeometry {
    pub fn new(at: Point, content: impl Into<String>, font_size: f64) -> Self {
        Self {
            x: at.x,
            y: at.y,
            content: content.into(),
            font_size,
            rotation: 0.0,
        }
    }

    pub fn line_height(&self) -> f64 {
        (self.font_size.max(1.0) * 1.3).max(2.0)
    }

    /// Estimated extent from character counts; hosts with real font metrics
    /// only use this for hit testing.
    pub fn dimensions(&self) -> (f64, f64) {
        let char_width = (self.font_size.max(1.0) * 0.62).max(1.0);
        let lines = if self.content.is_empty() {
            vec![""]
        } else {
            self.content.split('\n').collect::<Vec<_>>()
        };
        let widest = lines
            .iter()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);
        let width = (widest as f64 * char_width).max(8.0);
        let height = (lines.len() as f64 * self.line_height()).max(self.font_size);
        (width, height)
    }
}

/// Pixel window of a source raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageGeometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
    pub reference: String,
    pub source_rect: PixelRect,
}

impl ImageGeometry {
    /// Places a raster at its natural size.
    pub fn natural(reference: impl Into<String>, at: Point, width: u32, height: u32) -> Self {
        Self {
            x: at.x,
            y: at.y,
            width: f64::from(width),
            height: f64::from(height),
            rotation: 0.0,
            reference: reference.into(),
            source_rect: PixelRect::new(0, 0, width, height),
        }
    }

    pub fn placement(&self) -> BoxGeometry {
        BoxGeometry {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            rotation: self.rotation,
        }
    }

    fn set_placement(&mut self, placement: BoxGeometry) {
        self.x = placement.x;
        self.y = placement.y;
        self.width = placement.width;
        self.height = placement.height;
        self.rotation = placement.rotation;
    }

    /// Maps a scene point into the unrotated local frame of the image box.
    pub fn to_local(&self, point: Point) -> Point {
        let origin = Point::new(self.x, self.y);
        let unrotated = point.rotated_about(origin, -self.rotation);
        Point::new(unrotated.x - self.x, unrotated.y - self.y)
    }

    pub fn to_scene(&self, local: Point) -> Point {
        let origin = Point::new(self.x, self.y);
        Point::new(self.x + local.x, self.y + local.y).rotated_about(origin, self.rotation)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupGeometry {
    pub children: Vec<Shape>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "geometry", rename_all = "lowercase")]
pub enum Shape {
    Rectangle(BoxGeometry),
    Ellipse(BoxGeometry),
    Polygon(PointsGeometry),
    Path(PointsGeometry),
    Text(TextGeometry),
    Image(ImageGeometry),
    Group(GroupGeometry),
}

impl Shape {
    pub const fn object_type(&self) -> ObjectType {
        match self {
            Self::Rectangle(_) => ObjectType::Rectangle,
            Self::Ellipse(_) => ObjectType::Ellipse,
            Self::Polygon(_) => ObjectType::Polygon,
            Self::Path(_) => ObjectType::Path,
            Self::Text(_) => ObjectType::Text,
            Self::Image(_) => ObjectType::Image,
            Self::Group(_) => ObjectType::Group,
        }
    }

    pub fn bounds(&self) -> Bounds {
        match self {
            Self::Rectangle(geometry) | Self::Ellipse(geometry) => geometry.bounds(),
            Self::Polygon(geometry) | Self::Path(geometry) => {
                Bounds::from_points(&geometry.points).unwrap_or_default()
            }
            Self::Text(text) => {
                let (width, height) = text.dimensions();
                rotated_box_bounds(Point::new(text.x, text.y), width, height, text.rotation)
            }
            Self::Image(image) => image.placement().bounds(),
            Self::Group(group) => {
                union_all(group.children.iter().map(Shape::bounds)).unwrap_or_default()
            }
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        match self {
            Self::Rectangle(geometry) | Self::Ellipse(geometry) => geometry.translate(dx, dy),
            Self::Polygon(geometry) | Self::Path(geometry) => {
                for point in &mut geometry.points {
                    *point = point.offset(dx, dy);
                }
            }
            Self::Text(text) => {
                text.x += dx;
                text.y += dy;
            }
            Self::Image(image) => {
                image.x += dx;
                image.y += dy;
            }
            Self::Group(group) => {
                for child in &mut group.children {
                    child.translate(dx, dy);
                }
            }
        }
    }

    pub fn scale_about(&mut self, pivot: Point, sx: f64, sy: f64) {
        match self {
            Self::Rectangle(geometry) | Self::Ellipse(geometry) => {
                geometry.scale_about(pivot, sx, sy)
            }
            Self::Polygon(geometry) | Self::Path(geometry) => {
                for point in &mut geometry.points {
                    *point = point.scaled_about(pivot, sx, sy);
                }
            }
            Self::Text(text) => {
                let origin = Point::new(text.x, text.y).scaled_about(pivot, sx, sy);
                text.x = origin.x;
                text.y = origin.y;
                text.font_size = (text.font_size * sy.abs()).max(1.0);
            }
            Self::Image(image) => {
                let mut placement = image.placement();
                placement.scale_about(pivot, sx, sy);
                image.set_placement(placement);
            }
            Self::Group(group) => {
                for child in &mut group.children {
                    child.scale_about(pivot, sx, sy);
                }
            }
        }
    }

    pub fn rotate_about(&mut self, pivot: Point, degrees: f64) {
        match self {
            Self::Rectangle(geometry) | Self::Ellipse(geometry) => {
                geometry.rotate_about(pivot, degrees)
            }
            Self::Polygon(geometry) | Self::Path(geometry) => {
                for point in &mut geometry.points {
                    *point = point.rotated_about(pivot, degrees);
                }
            }
            Self::Text(text) => {
                let origin = Point::new(text.x, text.y).rotated_about(pivot, degrees);
                text.x = origin.x;
                text.y = origin.y;
                text.rotation = normalize_degrees(text.rotation + degrees);
            }
            Self::Image(image) => {
                let mut placement = image.placement();
                placement.rotate_about(pivot, degrees);
                image.set_placement(placement);
            }
            Self::Group(group) => {
                for child in &mut group.children {
                    child.rotate_about(pivot, degrees);
                }
            }
        }
    }

    pub fn as_image(&self) -> Option<&ImageGeometry> {
        match self {
            Self::Image(image) => Some(image),
            _ => None,
        }
    }

    /// Image geometries in this shape, descending into groups.
    pub fn images(&self) -> Vec<&ImageGeometry> {
        match self {
            Self::Image(image) => vec![image],
            Self::Group(group) => group.children.iter().flat_map(Shape::images).collect(),
            _ => Vec::new(),
        }
    }
}

fn rotated_box_bounds(origin: Point, width: f64, height: f64, rotation: f64) -> Bounds {
    let local = Bounds::new(origin.x, origin.y, width, height);
    if rotation == 0.0 {
        return local;
    }
    let corners = local
        .corners()
        .map(|corner| corner.rotated_about(origin, rotation));
    Bounds::from_points(&corners).unwrap_or(local)
}

fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    #[serde(default)]
    pub fill: Option<Color>,
    #[serde(default)]
    pub stroke: Option<Color>,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default)]
    pub dashed: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: None,
            stroke: Some(Color::new(0, 0, 0)),
            stroke_width: default_stroke_width(),
            opacity: default_opacity(),
            dashed: false,
        }
    }
}

impl Style {
    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    pub fn set_stroke_width(&mut self, width: f64) {
        self.stroke_width = width.max(0.0);
    }
}

fn default_stroke_width() -> f64 {
    3.0
}

fn default_opacity() -> f64 {
    1.0
}

/// Partial style update written by the property panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StylePatch {
    pub fill: Option<Option<Color>>,
    pub stroke: Option<Option<Color>>,
    pub stroke_width: Option<f64>,
    pub opacity: Option<f64>,
}

impl StylePatch {
    pub fn apply(&self, style: &mut Style) {
        if let Some(fill) = self.fill {
            style.fill = fill;
        }
        if let Some(stroke) = self.stroke {
            style.stroke = stroke;
        }
        if let Some(width) = self.stroke_width {
            style.set_stroke_width(width);
        }
        if let Some(opacity) = self.opacity {
            style.set_opacity(opacity);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    CropMask,
    InpaintMask,
    Perspective,
}

/// Pending geometric operation recorded as data for a downstream consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformRecord {
    #[serde(rename = "type")]
    pub kind: TransformKind,
    pub path: Vec<Point>,
    pub id: u64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Inpaint,
    Remove,
    Replace,
    Restyle,
    Outpaint,
}

/// Per-object editing intent consumed by the generative pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditIntent {
    #[serde(default)]
    pub operation: Option<OperationKind>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntentUpdate {
    pub operation: Option<Option<OperationKind>>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl IntentUpdate {
    pub fn apply(self, intent: &mut EditIntent) {
        if let Some(operation) = self.operation {
            intent.operation = operation;
        }
        if let Some(description) = self.description {
            intent.description = description;
        }
        if let Some(tags) = self.tags {
            intent.tags = tags;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EphemeralRole {
    Preview,
    Marquee,
    VertexMarker,
    CropOverlay { target: ObjectId },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub id: ObjectId,
    pub shape: Shape,
    pub style: Style,
    pub z_index: i64,
    pub locked: bool,
    pub transform_records: Vec<TransformRecord>,
    pub intent: EditIntent,
    pub ephemeral: Option<EphemeralRole>,
}

impl SceneObject {
    pub fn new(shape: Shape, style: Style) -> Self {
        Self {
            id: UNASSIGNED_ID,
            shape,
            style,
            z_index: 0,
            locked: false,
            transform_records: Vec::new(),
            intent: EditIntent::default(),
            ephemeral: None,
        }
    }

    pub fn ephemeral(shape: Shape, style: Style, role: EphemeralRole) -> Self {
        Self {
            ephemeral: Some(role),
            ..Self::new(shape, style)
        }
    }

    pub const fn object_type(&self) -> ObjectType {
        self.shape.object_type()
    }

    pub const fn is_ephemeral(&self) -> bool {
        self.ephemeral.is_some()
    }

    /// Neither locked nor ephemeral.
    pub const fn is_interactive(&self) -> bool {
        !self.locked && self.ephemeral.is_none()
    }

    pub fn bounds(&self) -> Bounds {
        self.shape.bounds()
    }

    pub fn crop_masks(&self) -> impl Iterator<Item = &TransformRecord> {
        self.transform_records
            .iter()
            .filter(|record| record.kind == TransformKind::CropMask)
    }

    // Record paths are in scene space and travel with the shape.
    fn map_record_points(&mut self, map: impl Fn(Point) -> Point) {
        for record in &mut self.transform_records {
            for point in &mut record.path {
                *point = map(*point);
            }
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.shape.translate(dx, dy);
        self.map_record_points(|point| point.offset(dx, dy));
    }

    pub fn scale_about(&mut self, pivot: Point, sx: f64, sy: f64) {
        self.shape.scale_about(pivot, sx, sy);
        self.map_record_points(|point| point.scaled_about(pivot, sx, sy));
    }

    pub fn rotate_about(&mut self, pivot: Point, degrees: f64) {
        self.shape.rotate_about(pivot, degrees);
        self.map_record_points(|point| point.rotated_about(pivot, degrees));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_serializes_with_type_and_geometry_keys() {
        let shape = Shape::Rectangle(BoxGeometry::new(10.0, 10.0, 90.0, 70.0));
        let value = serde_json::to_value(&shape).expect("shape should serialize");
        assert_eq!(value["type"], "rectangle");
        assert_eq!(value["geometry"]["width"], 90.0);
        let back: Shape = serde_json::from_value(value).expect("shape should deserialize");
        assert_eq!(back, shape);
    }

    #[test]
    fn rotated_box_bounds_cover_all_corners() {
        let mut geometry = BoxGeometry::new(0.0, 0.0, 10.0, 20.0);
        geometry.rotate_about(Point::default(), 90.0);
        let bounds = Shape::Rectangle(geometry).bounds();
        assert!((bounds.x + 20.0).abs() < 1e-9);
        assert!((bounds.width - 20.0).abs() < 1e-9);
        assert!((bounds.height - 10.0).abs() < 1e-9);
    }

    #[test]
    fn group_bounds_are_union_of_children() {
        let group = Shape::Group(GroupGeometry {
            children: vec![
                Shape::Rectangle(BoxGeometry::new(0.0, 0.0, 10.0, 10.0)),
                Shape::Ellipse(BoxGeometry::new(20.0, 5.0, 10.0, 10.0)),
            ],
        });
        assert_eq!(group.bounds(), Bounds::new(0.0, 0.0, 30.0, 15.0));
    }

    #[test]
    fn scale_about_center_keeps_center_fixed() {
        let mut shape = Shape::Rectangle(BoxGeometry::new(0.0, 0.0, 10.0, 10.0));
        shape.scale_about(Point::new(5.0, 5.0), 2.0, 2.0);
        assert_eq!(shape.bounds(), Bounds::new(-5.0, -5.0, 20.0, 20.0));
    }

    #[test]
    fn image_local_mapping_round_trips_through_rotation() {
        let mut image = ImageGeometry::natural("a.png", Point::new(10.0, 20.0), 40, 30);
        image.rotation = 30.0;
        let scene = image.to_scene(Point::new(12.0, 7.0));
        let local = image.to_local(scene);
        assert!((local.x - 12.0).abs() < 1e-9);
        assert!((local.y - 7.0).abs() < 1e-9);
    }

    #[test]
    fn intent_update_only_touches_provided_fields() {
        let mut intent = EditIntent {
            operation: Some(OperationKind::Inpaint),
            description: "sky".to_string(),
            tags: vec!["a".to_string()],
        };
        IntentUpdate {
            description: Some("sunset sky".to_string()),
            ..Default::default()
        }
        .apply(&mut intent);
        assert_eq!(intent.operation, Some(OperationKind::Inpaint));
        assert_eq!(intent.description, "sunset sky");
        assert_eq!(intent.tags, vec!["a".to_string()]);
    }
}
