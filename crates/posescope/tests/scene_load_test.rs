//! Scene loading integration tests for posescope-rs.
//!
//! Loads are driven by a scripted in-memory loader whose fetches can be made
//! to stay pending for a number of polls. Two loads are then polled in
//! turn, which reproduces a user clicking a second gallery item while the
//! first is still fetching.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::pin::{pin, Pin};
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};

use glam::UVec3;
use posescope_rs::*;
use serde_json::{json, Value};

struct NoopWake;

impl Wake for NoopWake {
    fn wake(self: Arc<Self>) {}
}

/// Stays pending for the given number of polls.
struct YieldNow(u32);

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 == 0 {
            return Poll::Ready(());
        }
        self.0 -= 1;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Polls two futures alternately, `a` first, until both finish.
fn run_interleaved<A: Future, B: Future>(a: A, b: B) -> (A::Output, B::Output) {
    let waker = Waker::from(Arc::new(NoopWake));
    let mut cx = Context::from_waker(&waker);
    let mut a = pin!(a);
    let mut b = pin!(b);
    let mut out_a = None;
    let mut out_b = None;
    loop {
        if out_a.is_none() {
            if let Poll::Ready(v) = a.as_mut().poll(&mut cx) {
                out_a = Some(v);
            }
        }
        if out_b.is_none() {
            if let Poll::Ready(v) = b.as_mut().poll(&mut cx) {
                out_b = Some(v);
            }
        }
        match (out_a.take(), out_b.take()) {
            (Some(a), Some(b)) => return (a, b),
            (a, b) => {
                out_a = a;
                out_b = b;
            }
        }
    }
}

#[derive(Default)]
struct ScriptedLoader {
    metadata: HashMap<String, Value>,
    meshes: HashMap<String, MeshGeometry>,
    images: HashMap<String, ImageSize>,
    delays: HashMap<String, u32>,
    requests: RefCell<Vec<String>>,
    disposed: Rc<RefCell<Vec<String>>>,
}

impl ScriptedLoader {
    fn with_metadata(mut self, path: &str, doc: Value) -> Self {
        self.metadata.insert(path.to_string(), doc);
        self
    }

    fn with_mesh(mut self, path: &str) -> Self {
        self.meshes.insert(
            path.to_string(),
            MeshGeometry::new(
                vec![Vec3::new(-0.5, 0.0, 0.0), Vec3::new(0.5, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)],
                vec![UVec3::new(0, 1, 2)],
            ),
        );
        self
    }

    fn with_image(mut self, path: &str, width: u32, height: u32) -> Self {
        self.images.insert(path.to_string(), ImageSize::new(width, height));
        self
    }

    fn with_delay(mut self, path: &str, polls: u32) -> Self {
        self.delays.insert(path.to_string(), polls);
        self
    }

    async fn fetch(&self, path: &str) {
        self.requests.borrow_mut().push(path.to_string());
        YieldNow(self.delays.get(path).copied().unwrap_or(0)).await;
    }

    fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl AssetLoader for ScriptedLoader {
    async fn fetch_metadata(&self, path: &str) -> Result<SceneMetadata> {
        self.fetch(path).await;
        let doc = self
            .metadata
            .get(path)
            .ok_or_else(|| PosescopeError::asset_load(path, "not found"))?;
        Ok(serde_json::from_value(doc.clone())?)
    }

    async fn load_mesh(&self, path: &str) -> Result<MeshAsset> {
        self.fetch(path).await;
        let geometry = self
            .meshes
            .get(path)
            .cloned()
            .ok_or_else(|| PosescopeError::asset_load(path, "not found"))?;
        let disposed = Rc::clone(&self.disposed);
        Ok(MeshAsset::new(path, geometry)
            .with_release_hook(move |p| disposed.borrow_mut().push(p.to_string())))
    }

    async fn load_image(&self, path: &str) -> Result<ImageAsset> {
        self.fetch(path).await;
        let size = self
            .images
            .get(path)
            .copied()
            .ok_or_else(|| PosescopeError::asset_load(path, "not found"))?;
        Ok(ImageAsset {
            path: path.to_string(),
            size,
        })
    }
}

const K: [[f32; 3]; 3] = [[0.8, 0.0, 0.5], [0.0, 0.8, 0.5], [0.0, 0.0, 1.0]];

fn translation(t: [f32; 3]) -> Value {
    json!([
        [1.0, 0.0, 0.0, t[0]],
        [0.0, 1.0, 0.0, t[1]],
        [0.0, 0.0, 1.0, t[2]],
        [0.0, 0.0, 0.0, 1.0]
    ])
}

fn single_scene(z: f32) -> Value {
    json!({ "intrinsic": K, "extrinsic": translation([0.0, 0.0, z]) })
}

fn new_session() -> RefCell<ViewerSession> {
    RefCell::new(ViewerSession::new(ViewerOptions::default(), 1024, 768))
}

/// Names and mesh sources of every node, in creation order.
fn scene_summary(session: &ViewerSession) -> Vec<(String, Option<String>)> {
    session
        .scene()
        .iter()
        .map(|(_, node)| {
            let source = match &node.content {
                NodeContent::Mesh(mesh) => Some(mesh.source().to_string()),
                _ => None,
            };
            (node.name.clone(), source)
        })
        .collect()
}

#[test]
fn test_single_object_scene() {
    let loader = ScriptedLoader::default()
        .with_metadata("a/meta.json", single_scene(2.0))
        .with_mesh("a/mesh.glb")
        .with_image("a/images_crop/input_no_mask.png", 640, 480);
    let session = new_session();

    let outcome = pollster::block_on(load_scene(&session, &loader, &GalleryItem::new("a/meta.json")));
    assert_eq!(outcome, SceneLoadOutcome::Completed);
    assert_eq!(
        loader.requests(),
        vec!["a/meta.json", "a/mesh.glb", "a/images_crop/input_no_mask.png"]
    );

    let session = session.borrow();
    assert_eq!(session.frustums().len(), 1);
    let model = session.current_model().unwrap();
    assert_eq!(session.scene().mesh(model).unwrap().source(), "a/mesh.glb");
    assert!((session.ground_height() - -0.5).abs() < 1e-6);
    assert!(session
        .scene()
        .iter()
        .any(|(_, node)| matches!(node.content, NodeContent::ImagePlane { .. })));
}

#[test]
fn test_newer_load_supersedes_older() {
    let loader = ScriptedLoader::default()
        .with_metadata("a/meta.json", single_scene(2.0))
        .with_mesh("a/mesh.glb")
        .with_image("a/images_crop/input_no_mask.png", 640, 480)
        .with_delay("a/mesh.glb", 10)
        .with_metadata("b/meta.json", single_scene(3.0))
        .with_mesh("b/mesh.glb")
        .with_image("b/images_crop/input_no_mask.png", 800, 600);

    let session = new_session();
    let first_item = GalleryItem::new("a/meta.json");
    let first = load_scene(&session, &loader, &first_item);
    let second = async {
        // Let the first load reach its mesh fetch before switching scenes.
        YieldNow(3).await;
        load_scene(&session, &loader, &GalleryItem::new("b/meta.json")).await
    };
    let (first, second) = run_interleaved(first, second);

    assert_eq!(first, SceneLoadOutcome::Superseded);
    assert_eq!(second, SceneLoadOutcome::Completed);
    assert_eq!(*loader.disposed.borrow(), vec!["a/mesh.glb".to_string()]);
    // The first load never got as far as its image.
    assert!(!loader
        .requests()
        .contains(&"a/images_crop/input_no_mask.png".to_string()));

    let solo_loader = ScriptedLoader::default()
        .with_metadata("b/meta.json", single_scene(3.0))
        .with_mesh("b/mesh.glb")
        .with_image("b/images_crop/input_no_mask.png", 800, 600);
    let solo = new_session();
    pollster::block_on(load_scene(&solo, &solo_loader, &GalleryItem::new("b/meta.json")));

    assert_eq!(scene_summary(&session.borrow()), scene_summary(&solo.borrow()));
    let interleaved = session.borrow();
    let solo = solo.borrow();
    let a = interleaved.scene().frustum(interleaved.frustums()[0]).unwrap();
    let b = solo.scene().frustum(solo.frustums()[0]).unwrap();
    assert_eq!(a.snapshot(), b.snapshot());
}

#[test]
fn test_multi_object_scene_loads_in_order_and_skips_failures() {
    let pose = |z: f32, scale: &str| {
        json!({
            "original_extrinsic": translation([0.0, 0.0, z]),
            "new_extrinsic": translation([0.0, 0.0, 0.0]),
            "scale": scale,
            "new_intrinsic": [K]
        })
    };
    let doc = json!({
        "glb_path": ["mesh0.glb", "mesh1.glb", "mesh2.glb"],
        "pose": { "0": pose(2.0, "2.0"), "1": pose(3.0, "1.0"), "2": pose(4.0, "1.0") }
    });
    let loader = ScriptedLoader::default()
        .with_metadata("m/meta.json", doc)
        .with_mesh("m/mesh0.glb")
        .with_mesh("m/mesh2.glb")
        .with_image("m/images_crop/input_no_mask.png", 640, 480);
    let session = new_session();

    let outcome = pollster::block_on(load_scene(&session, &loader, &GalleryItem::new("m/meta.json")));
    assert_eq!(outcome, SceneLoadOutcome::Completed);
    assert_eq!(
        loader.requests(),
        vec![
            "m/meta.json",
            "m/mesh0.glb",
            "m/mesh1.glb",
            "m/mesh2.glb",
            "m/images_crop/input_no_mask.png"
        ]
    );

    let session = session.borrow();
    let group = session.current_model().unwrap();
    let node = session.scene().get(group).unwrap();
    assert_eq!(node.name, "multiObjectGroup");
    let children: Vec<_> = node
        .children
        .iter()
        .map(|&id| session.scene().get(id).unwrap().name.clone())
        .collect();
    assert_eq!(children, vec!["object_0", "object_2"]);
    // Ground follows object 0's scale.
    assert!((session.ground_height() - -1.0).abs() < 1e-6);
    assert!((session.grid_height() - -0.98).abs() < 1e-6);
    assert_eq!(session.frustums().len(), 1);
}

#[test]
fn test_newer_load_supersedes_multi_object_loop() {
    let pose = |z: f32| {
        json!({
            "original_extrinsic": translation([0.0, 0.0, z]),
            "new_extrinsic": translation([0.0, 0.0, 0.0]),
            "scale": "2.0",
            "new_intrinsic": [K]
        })
    };
    let doc = json!({
        "glb_path": ["mesh0.glb", "mesh1.glb", "mesh2.glb"],
        "pose": { "0": pose(2.0), "1": pose(3.0), "2": pose(4.0) }
    });
    let loader = ScriptedLoader::default()
        .with_metadata("m/meta.json", doc)
        .with_mesh("m/mesh0.glb")
        .with_mesh("m/mesh1.glb")
        .with_mesh("m/mesh2.glb")
        .with_delay("m/mesh1.glb", 10)
        .with_image("m/images_crop/input_no_mask.png", 640, 480)
        .with_metadata("b/meta.json", single_scene(3.0))
        .with_mesh("b/mesh.glb")
        .with_image("b/images_crop/input_no_mask.png", 800, 600);

    let session = new_session();
    let first_item = GalleryItem::new("m/meta.json");
    let first = load_scene(&session, &loader, &first_item);
    let second = async {
        // Object 0 is in the scene and object 1 is still fetching.
        YieldNow(3).await;
        let placed = {
            let session = session.borrow();
            let group = session.current_model().unwrap();
            session.scene().get(group).unwrap().children.len()
        };
        (placed, load_scene(&session, &loader, &GalleryItem::new("b/meta.json")).await)
    };
    let (first, (placed, second)) = run_interleaved(first, second);

    assert_eq!(placed, 1);
    assert_eq!(first, SceneLoadOutcome::Superseded);
    assert_eq!(second, SceneLoadOutcome::Completed);
    assert_eq!(*loader.disposed.borrow(), vec!["m/mesh1.glb".to_string()]);
    let requests = loader.requests();
    assert!(!requests.contains(&"m/mesh2.glb".to_string()));
    assert!(!requests.contains(&"m/images_crop/input_no_mask.png".to_string()));

    let session = session.borrow();
    assert!(session
        .scene()
        .iter()
        .all(|(_, node)| node.name != "multiObjectGroup" && !node.name.starts_with("object_")));
    assert!((session.ground_height() - -0.5).abs() < 1e-6);

    let solo_loader = ScriptedLoader::default()
        .with_metadata("b/meta.json", single_scene(3.0))
        .with_mesh("b/mesh.glb")
        .with_image("b/images_crop/input_no_mask.png", 800, 600);
    let solo = new_session();
    pollster::block_on(load_scene(&solo, &solo_loader, &GalleryItem::new("b/meta.json")));
    assert_eq!(scene_summary(&session), scene_summary(&solo.borrow()));
}

#[test]
fn test_missing_image_uses_placeholder() {
    let loader = ScriptedLoader::default()
        .with_metadata("a/meta.json", single_scene(2.0))
        .with_mesh("a/mesh.glb");
    let session = new_session();

    let outcome = pollster::block_on(load_scene(&session, &loader, &GalleryItem::new("a/meta.json")));
    assert_eq!(outcome, SceneLoadOutcome::Completed);

    let session = session.borrow();
    let frustum = session.scene().frustum(session.frustums()[0]).unwrap();
    assert!(frustum.image_plane().is_none());
    // Square placeholder: the frozen view is the full square window.
    let view = frustum.snapshot().view.unwrap();
    assert_eq!(view.full_width, 1024.0);
    assert_eq!(view.full_height, 1024.0);
}

#[test]
fn test_empty_image_uses_placeholder() {
    let loader = ScriptedLoader::default()
        .with_metadata("a/meta.json", single_scene(2.0))
        .with_mesh("a/mesh.glb")
        .with_image("a/images_crop/input_no_mask.png", 0, 0);
    let session = new_session();

    let outcome = pollster::block_on(load_scene(&session, &loader, &GalleryItem::new("a/meta.json")));
    assert_eq!(outcome, SceneLoadOutcome::Completed);

    let session = session.borrow();
    assert_eq!(session.frustums().len(), 1);
    let frustum = session.scene().frustum(session.frustums()[0]).unwrap();
    assert!(frustum.image_plane().is_none());
    assert_eq!(frustum.intrinsics().size, ImageSize::square(1024));
    assert!(frustum.snapshot().fov_degrees.is_finite());
}

#[test]
fn test_missing_metadata_abandons_load() {
    let loader = ScriptedLoader::default();
    let session = new_session();
    let before = session.borrow().scene().len();

    let outcome = pollster::block_on(load_scene(&session, &loader, &GalleryItem::new("x/meta.json")));
    assert_eq!(outcome, SceneLoadOutcome::Abandoned);
    assert_eq!(session.borrow().scene().len(), before);
    assert_eq!(session.borrow().load_token(), 1);
}

#[test]
fn test_missing_single_mesh_abandons_before_frustum() {
    let loader = ScriptedLoader::default()
        .with_metadata("a/meta.json", single_scene(2.0))
        .with_image("a/images_crop/input_no_mask.png", 640, 480);
    let session = new_session();

    let outcome = pollster::block_on(load_scene(&session, &loader, &GalleryItem::new("a/meta.json")));
    assert_eq!(outcome, SceneLoadOutcome::Abandoned);
    assert!(session.borrow().frustums().is_empty());
    assert!(session.borrow().current_model().is_none());
}

#[test]
fn test_new_load_clears_previous_scene() {
    let loader = ScriptedLoader::default()
        .with_metadata("a/meta.json", single_scene(2.0))
        .with_mesh("a/mesh.glb")
        .with_metadata("b/meta.json", single_scene(3.0))
        .with_mesh("b/mesh.glb");
    let session = new_session();

    pollster::block_on(load_scene(&session, &loader, &GalleryItem::new("a/meta.json")));
    pollster::block_on(load_scene(&session, &loader, &GalleryItem::new("b/meta.json")));

    let session = session.borrow();
    assert_eq!(session.frustums().len(), 1);
    let sources: Vec<_> = scene_summary(&session)
        .into_iter()
        .filter_map(|(_, source)| source)
        .collect();
    assert_eq!(sources, vec!["".to_string(), "b/mesh.glb".to_string()]);
}
