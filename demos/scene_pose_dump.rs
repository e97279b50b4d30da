//! Loads every scene of a gallery from disk and prints the recovered camera
//! poses, then flies the live camera into each frustum.
//!
//! Run with: cargo run --example `scene_pose_dump` -- <data dir> [gallery.json]
//!
//! Meshes are read as `.obj` files next to the `.glb` names the metadata
//! layout uses.

use std::cell::RefCell;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use posescope_rs::*;

fn main() {
    init_logging();

    let mut args = std::env::args().skip(1);
    let root = PathBuf::from(args.next().unwrap_or_else(|| "data".to_string()));
    let gallery_path = args
        .next()
        .map_or_else(|| root.join("gallery.json"), PathBuf::from);

    let gallery = gallery_from_json_file(&gallery_path).expect("Failed to read gallery");
    let loader = FsAssetLoader::new(&root).with_mesh_extension("obj");
    let session = RefCell::new(ViewerSession::new(ViewerOptions::default(), 1280, 720));

    for (index, item) in gallery.iter().enumerate() {
        let outcome = pollster::block_on(load_scene(&session, &loader, item));
        println!("{} ({}): {outcome:?}", item.display_label(index), item.metadata_path);

        let mut session = session.borrow_mut();
        let proxies = session.frustums().to_vec();
        for proxy in proxies {
            let Some(frustum) = session.scene().frustum(proxy) else {
                continue;
            };
            let snapshot = *frustum.snapshot();
            let intrinsics = *frustum.intrinsics();
            println!(
                "  camera at {:.3} fov {:.2} deg, image {}x{}, principal offset {:.1}",
                snapshot.position,
                intrinsics.fov_degrees,
                intrinsics.size.width,
                intrinsics.size.height,
                intrinsics.principal_offset()
            );

            // Step the transition the way a render loop would.
            let start = Instant::now();
            session.transition_to_frustum(proxy, start);
            let mut now = start;
            while session.is_animating() {
                now += Duration::from_millis(16);
                session.frame(now);
            }
            let camera = session.camera();
            println!(
                "  live camera now at {:.3}, view offset {:?}",
                camera.position,
                camera.view_offset()
            );
        }
        if let Some((lo, hi)) = session
            .current_model()
            .and_then(|model| session.scene().subtree_bounds(model))
        {
            println!("  model bounds {lo:.3} .. {hi:.3}");
        }
    }
}
