use std::rc::Rc;

use image::{Rgba, RgbaImage};
use inpaint_canvas::input::Modifiers;
use inpaint_canvas::scene::{BoxGeometry, PixelRect, Shape, TransformKind};
use inpaint_canvas::{
    Color, Editor, EditorConfig, ManualClock, MemoryImageProvider, MemorySceneStore, Point,
    PointerButton, SelectMode, StylePatch, ToolKind,
};

struct Session {
    editor: Editor,
    store: MemorySceneStore,
    images: MemoryImageProvider,
}

fn session() -> Session {
    let store = MemorySceneStore::new();
    let images = MemoryImageProvider::new();
    let editor = Editor::new(
        EditorConfig::default(),
        store.clone(),
        images.clone(),
        Rc::new(ManualClock::new(0)),
    );
    Session {
        editor,
        store,
        images,
    }
}

fn drag(editor: &mut Editor, from: Point, to: Point) {
    let modifiers = Modifiers::default();
    editor.pointer_down(from, PointerButton::Primary, modifiers);
    editor.pointer_move(to, modifiers);
    editor.pointer_up(to, PointerButton::Primary, modifiers);
}

fn click(editor: &mut Editor, at: Point, modifiers: Modifiers) {
    editor.pointer_down(at, PointerButton::Primary, modifiers);
    editor.pointer_up(at, PointerButton::Primary, modifiers);
}

fn quad(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point> {
    vec![
        Point::new(x0, y0),
        Point::new(x1, y0),
        Point::new(x1, y1),
        Point::new(x0, y1),
    ]
}

#[test]
fn scenario_a_drag_draws_red_rectangle() {
    let mut s = session();
    s.editor.select_tool(ToolKind::Rectangle);
    s.editor
        .tool_options_mut()
        .style_mut(ToolKind::Rectangle)
        .expect("rectangle tool has a style")
        .fill = Some(Color::new(255, 0, 0));

    drag(&mut s.editor, Point::new(10.0, 10.0), Point::new(100.0, 80.0));

    let objects = s.editor.graph().persistent().collect::<Vec<_>>();
    assert_eq!(objects.len(), 1);
    assert_eq!(
        objects[0].shape,
        Shape::Rectangle(BoxGeometry::new(10.0, 10.0, 90.0, 70.0))
    );
    assert_eq!(objects[0].style.fill, Some(Color::new(255, 0, 0)));
    assert_eq!(s.editor.graph().objects().len(), 1, "no preview left behind");

    s.editor.save_now().expect("memory store accepts the save");
    let blob: serde_json::Value =
        serde_json::from_str(&s.store.blob().expect("scene was saved")).expect("blob is json");
    let record = &blob["objects"][0];
    assert_eq!(record["type"], "rectangle");
    assert_eq!(record["geometry"]["x"], 10.0);
    assert_eq!(record["geometry"]["width"], 90.0);
    assert_eq!(record["geometry"]["height"], 70.0);
    assert_eq!(record["style"]["fill"], "#ff0000");
}

#[test]
fn scenario_b_modifier_click_toggles_membership() {
    let mut s = session();
    s.editor.select_tool(ToolKind::Rectangle);
    drag(&mut s.editor, Point::new(0.0, 0.0), Point::new(20.0, 20.0));
    drag(&mut s.editor, Point::new(50.0, 0.0), Point::new(70.0, 20.0));
    let ids = s.editor.graph().z_order();
    let (a, b) = (ids[0], ids[1]);
    s.editor.select_tool(ToolKind::Select);

    click(&mut s.editor, Point::new(10.0, 10.0), Modifiers::default());
    assert_eq!(s.editor.selection(), vec![a]);

    let toggle = Modifiers::new(false, true);
    click(&mut s.editor, Point::new(60.0, 10.0), toggle);
    assert_eq!(s.editor.selection(), vec![a, b]);

    click(&mut s.editor, Point::new(60.0, 10.0), toggle);
    assert_eq!(s.editor.selection(), vec![a]);
}

#[test]
fn scenario_c_crop_on_shape_attaches_one_record() {
    let mut s = session();
    s.editor.select_tool(ToolKind::Rectangle);
    drag(&mut s.editor, Point::new(10.0, 10.0), Point::new(100.0, 80.0));
    let id = s.editor.selection()[0];
    let before = s.editor.object(id).expect("rectangle exists").shape.clone();

    s.editor.select_tool(ToolKind::Crop);
    for point in quad(20.0, 20.0, 60.0, 50.0) {
        click(&mut s.editor, point, Modifiers::default());
    }
    s.editor.finish_path();

    let object = s.editor.object(id).expect("rectangle survives the crop");
    assert_eq!(object.shape, before);
    let masks = object.crop_masks().collect::<Vec<_>>();
    assert_eq!(masks.len(), 1);
    assert_eq!(masks[0].path, quad(20.0, 20.0, 60.0, 50.0));
    assert_eq!(masks[0].kind, TransformKind::CropMask);
}

#[test]
fn scenario_d_crop_on_image_bakes_replacement() {
    let mut s = session();
    s.images.insert(
        "street.png",
        RgbaImage::from_fn(100, 100, |x, y| Rgba([x as u8, y as u8, 7, 255])),
    );
    s.editor.insert_image("street.png", Point::new(0.0, 0.0));
    assert_eq!(s.editor.tick(), 1);
    let id = s.editor.selection()[0];
    let pending = s
        .editor
        .attach_transform(id, TransformKind::InpaintMask, quad(70.0, 70.0, 90.0, 90.0))
        .expect("image accepts records");

    let outcome = s
        .editor
        .commit_crop(quad(10.0, 10.0, 60.0, 40.0))
        .expect("crop bakes the image");

    assert_eq!(outcome.baked, vec![id]);
    let baked = s.editor.object(id).expect("replacement keeps the id");
    let Shape::Image(image) = &baked.shape else {
        panic!("replacement is still an image");
    };
    assert_eq!(
        (image.x, image.y, image.width, image.height),
        (10.0, 10.0, 50.0, 30.0)
    );
    assert_eq!(image.source_rect, PixelRect::new(10, 10, 50, 30));
    assert_eq!(baked.crop_masks().count(), 0);
    let kept = baked
        .transform_records
        .iter()
        .map(|record| record.id)
        .collect::<Vec<_>>();
    assert_eq!(kept, vec![pending]);

    let raster = s.editor.raster(id).expect("baked raster is available");
    assert_eq!(raster.dimensions(), (50, 30));
    for (x, y) in [(0, 0), (49, 0), (0, 29), (49, 29), (25, 15)] {
        assert_eq!(
            raster.get_pixel(x, y),
            &Rgba([(x + 10) as u8, (y + 10) as u8, 7, 255])
        );
    }
}

#[test]
fn scenario_e_three_undos_and_three_redos() {
    let mut s = session();
    let initial = s.editor.graph().persistent_objects();

    s.editor.select_tool(ToolKind::Ellipse);
    drag(&mut s.editor, Point::new(0.0, 0.0), Point::new(40.0, 40.0));
    let id = s.editor.selection()[0];
    s.editor.select(&[id], SelectMode::Replace);
    s.editor.move_selection_by(5.0, 5.0);
    s.editor.set_style(
        &[id],
        &StylePatch {
            stroke_width: Some(8.0),
            ..StylePatch::default()
        },
    );
    let last = s.editor.graph().persistent_objects();

    for _ in 0..3 {
        assert!(s.editor.undo());
    }
    assert_eq!(s.editor.graph().persistent_objects(), initial);
    assert!(!s.editor.undo(), "undo stack is exhausted");

    for _ in 0..3 {
        assert!(s.editor.redo());
    }
    assert_eq!(s.editor.graph().persistent_objects(), last);
    assert!(!s.editor.redo(), "redo stack is exhausted");
}
