//! Scene loading.
//!
//! A scene load fetches a metadata document, then meshes, then the
//! reference photo, awaiting between each step. Loads are not cancelled
//! when the user picks another scene; instead every load holds a
//! [`LoadTicket`] and each commit into the session checks that the ticket
//! still matches the session's load token. A superseded load disposes
//! whatever it fetched and stops quietly.

use std::cell::RefCell;
use std::fmt;
use std::path::{Path, PathBuf};

use glam::{Mat4, UVec3, Vec3};
use posescope_core::{
    resolve_multi, resolve_single, GalleryItem, ImageSize, NormalizedIntrinsics, ObjectPlacement,
    PosescopeError, Result, SceneAssets, SceneDescription, SceneMetadata,
};
use posescope_structures::{FrustumView, MeshGeometry, MeshModel};

use crate::scene::{NodeContent, NodeId, NodeMeta};
use crate::session::ViewerSession;

/// Name of the group holding the meshes of a multi-object scene.
pub const MULTI_OBJECT_GROUP: &str = "multiObjectGroup";

/// Source of scene assets.
#[allow(async_fn_in_trait)]
pub trait AssetLoader {
    /// Fetches and parses a scene metadata document.
    async fn fetch_metadata(&self, path: &str) -> Result<SceneMetadata>;

    /// Fetches a mesh.
    async fn load_mesh(&self, path: &str) -> Result<MeshAsset>;

    /// Fetches an image. Only its size is used.
    async fn load_image(&self, path: &str) -> Result<ImageAsset>;
}

/// A fetched mesh not yet placed in the scene.
pub struct MeshAsset {
    path: String,
    geometry: MeshGeometry,
    on_release: Option<Box<dyn FnOnce(&str)>>,
}

impl fmt::Debug for MeshAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshAsset")
            .field("path", &self.path)
            .field("vertices", &self.geometry.vertices.len())
            .field("triangles", &self.geometry.triangles.len())
            .finish_non_exhaustive()
    }
}

impl MeshAsset {
    pub fn new(path: impl Into<String>, geometry: MeshGeometry) -> Self {
        Self {
            path: path.into(),
            geometry,
            on_release: None,
        }
    }

    /// Registers a callback run when the asset is disposed without being
    /// placed in a scene.
    #[must_use]
    pub fn with_release_hook(mut self, hook: impl FnOnce(&str) + 'static) -> Self {
        self.on_release = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn geometry(&self) -> &MeshGeometry {
        &self.geometry
    }

    /// Releases the asset.
    pub fn dispose(mut self) {
        log::debug!("disposing unused mesh {}", self.path);
        if let Some(hook) = self.on_release.take() {
            hook(&self.path);
        }
    }

    /// Turns the asset into a scene model.
    pub fn into_model(self, name: impl Into<String>) -> MeshModel {
        MeshModel::new(name, self.path, self.geometry)
    }
}

/// A fetched image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub path: String,
    pub size: ImageSize,
}

/// Proof that a scene load was started, checked on every commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    token: u64,
}

impl LoadTicket {
    #[must_use]
    pub fn token(self) -> u64 {
        self.token
    }

    /// Whether no newer load has started since this one.
    #[must_use]
    pub fn is_current(self, session: &ViewerSession) -> bool {
        self.token == session.load_token()
    }
}

/// Result of committing a fetched asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The asset is in the scene under this node.
    Committed(NodeId),
    /// A newer load started; the asset was discarded.
    Stale,
}

impl CommitOutcome {
    #[must_use]
    pub fn is_stale(self) -> bool {
        self == Self::Stale
    }
}

/// How a [`load_scene`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneLoadOutcome {
    /// Everything that could be loaded was committed.
    Completed,
    /// A newer load took over part way through.
    Superseded,
    /// A required asset was unusable; whatever was committed stays.
    Abandoned,
}

impl ViewerSession {
    /// Clears the current scene and starts a new load.
    pub fn begin_scene_load(&mut self) -> LoadTicket {
        self.clear_scene();
        self.load_token += 1;
        LoadTicket {
            token: self.load_token,
        }
    }

    /// Places the mesh of a single-object scene.
    pub fn commit_single_model(&mut self, ticket: LoadTicket, mesh: MeshAsset) -> CommitOutcome {
        if !ticket.is_current(self) {
            mesh.dispose();
            return CommitOutcome::Stale;
        }
        let id = self
            .scene
            .add_root("model", NodeContent::Mesh(mesh.into_model("model")));
        self.current_model = Some(id);
        CommitOutcome::Committed(id)
    }

    /// Places one mesh of a multi-object scene under the shared group.
    pub fn commit_object(
        &mut self,
        ticket: LoadTicket,
        placement: &ObjectPlacement,
        mesh: MeshAsset,
    ) -> Result<CommitOutcome> {
        if !ticket.is_current(self) {
            mesh.dispose();
            return Ok(CommitOutcome::Stale);
        }
        let group = match self.current_model {
            Some(group) if self.scene.contains(group) => group,
            _ => {
                let group = self.scene.add_root(MULTI_OBJECT_GROUP, NodeContent::Group);
                self.current_model = Some(group);
                group
            }
        };
        self.place_object(group, placement, mesh).map(CommitOutcome::Committed)
    }

    /// Adds `mesh` under `group`. The mesh is disposed if the group is gone.
    fn place_object(
        &mut self,
        group: NodeId,
        placement: &ObjectPlacement,
        mesh: MeshAsset,
    ) -> Result<NodeId> {
        let name = format!("object_{}", placement.index);
        let id = match self.scene.add_child(group, name.clone(), NodeContent::Group) {
            Ok(id) => id,
            Err(e) => {
                mesh.dispose();
                return Err(e);
            }
        };
        let mut model = mesh.into_model(name);
        model.set_transform(placement.transform);
        if let Some(node) = self.scene.get_mut(id) {
            node.content = NodeContent::Mesh(model);
        }
        Ok(id)
    }

    /// Moves ground and grid for the scene scale.
    pub fn commit_ground_scale(&mut self, ticket: LoadTicket, scale: f32) -> CommitOutcome {
        if !ticket.is_current(self) {
            return CommitOutcome::Stale;
        }
        self.set_ground_scale(scale);
        CommitOutcome::Committed(self.ground())
    }

    /// Builds the frustum for a camera pose and adds it to the scene: a
    /// clickable proxy, its camera node, and the image plane under the
    /// camera. `image` is `None` when the reference photo failed to load.
    pub fn commit_frustum(
        &mut self,
        ticket: LoadTicket,
        intrinsic: &NormalizedIntrinsics,
        camera_to_world: Mat4,
        image: Option<ImageSize>,
    ) -> Result<CommitOutcome> {
        if !ticket.is_current(self) {
            log::debug!("dropping stale frustum");
            return Ok(CommitOutcome::Stale);
        }
        let view = FrustumView::build(intrinsic, camera_to_world, image, &self.options)?;
        let has_plane = view.image_plane().is_some();

        let proxy = self.scene.add_root("frustum", NodeContent::Frustum(view));
        self.scene.set_meta(
            proxy,
            NodeMeta {
                clickable: true,
                frustum: true,
                ..NodeMeta::default()
            },
        );
        let camera = self
            .scene
            .add_root("frustum_camera", NodeContent::FrustumCamera { proxy });
        self.scene.set_clickable_owner(camera, proxy);
        if has_plane {
            let plane = self
                .scene
                .add_child(camera, "image_plane", NodeContent::ImagePlane { proxy })?;
            self.scene.set_meta(
                plane,
                NodeMeta {
                    image_plane: true,
                    ..NodeMeta::default()
                },
            );
        }
        self.frustums.push(proxy);
        Ok(CommitOutcome::Committed(proxy))
    }
}

/// Loads a gallery scene into `session`.
///
/// The session is borrowed only between awaits, so other loads and input
/// handling may interleave with this one.
pub async fn load_scene<L: AssetLoader>(
    session: &RefCell<ViewerSession>,
    loader: &L,
    item: &GalleryItem,
) -> SceneLoadOutcome {
    let ticket = session.borrow_mut().begin_scene_load();
    log::info!("loading scene {}", item.metadata_path);

    let metadata = match loader.fetch_metadata(&item.metadata_path).await {
        Ok(metadata) => metadata,
        Err(e) => {
            log::warn!("scene metadata unavailable: {e}");
            return SceneLoadOutcome::Abandoned;
        }
    };
    if !ticket.is_current(&session.borrow()) {
        return SceneLoadOutcome::Superseded;
    }
    let description = match metadata.describe() {
        Ok(description) => description,
        Err(e) => {
            log::warn!("scene metadata unusable: {e}");
            return SceneLoadOutcome::Abandoned;
        }
    };

    let assets = item.assets();
    let outcome = match description {
        SceneDescription::Single {
            intrinsic,
            extrinsic,
        } => load_single(session, loader, ticket, &assets, &intrinsic, extrinsic).await,
        SceneDescription::Multi { poses } => match resolve_multi(&poses) {
            Ok(layout) => {
                if session
                    .borrow_mut()
                    .commit_ground_scale(ticket, layout.reference_scale)
                    .is_stale()
                {
                    return SceneLoadOutcome::Superseded;
                }
                for placement in &layout.placements {
                    let path = assets.object_mesh(placement.index);
                    let mesh = match loader.load_mesh(&path).await {
                        Ok(mesh) => mesh,
                        Err(e) => {
                            log::warn!("skipping object {}: {e}", placement.index);
                            continue;
                        }
                    };
                    let committed = session.borrow_mut().commit_object(ticket, placement, mesh);
                    match committed {
                        Ok(CommitOutcome::Committed(_)) => {}
                        Ok(CommitOutcome::Stale) => return SceneLoadOutcome::Superseded,
                        Err(e) => log::warn!("could not place object {}: {e}", placement.index),
                    }
                }
                match layout.reference_intrinsic {
                    Some(intrinsic) => {
                        load_frustum(
                            session,
                            loader,
                            ticket,
                            &assets,
                            &intrinsic,
                            layout.reference_camera_to_world,
                        )
                        .await
                    }
                    None => {
                        log::warn!("object {} has no intrinsic, no frustum shown", layout.reference_index);
                        SceneLoadOutcome::Completed
                    }
                }
            }
            Err(e) => {
                log::warn!("multi-object scene unusable: {e}");
                SceneLoadOutcome::Abandoned
            }
        },
    };

    if outcome == SceneLoadOutcome::Completed {
        log::info!("scene {} loaded", item.metadata_path);
    }
    outcome
}

async fn load_single<L: AssetLoader>(
    session: &RefCell<ViewerSession>,
    loader: &L,
    ticket: LoadTicket,
    assets: &SceneAssets,
    intrinsic: &NormalizedIntrinsics,
    extrinsic: Mat4,
) -> SceneLoadOutcome {
    let camera_to_world = match resolve_single(extrinsic) {
        Ok(c2w) => c2w,
        Err(e) => {
            log::warn!("scene camera unusable: {e}");
            return SceneLoadOutcome::Abandoned;
        }
    };

    let mesh = match loader.load_mesh(&assets.single_mesh()).await {
        Ok(mesh) => mesh,
        Err(e) => {
            log::warn!("scene mesh unavailable: {e}");
            return SceneLoadOutcome::Abandoned;
        }
    };
    {
        let mut session = session.borrow_mut();
        if session.commit_single_model(ticket, mesh).is_stale() {
            return SceneLoadOutcome::Superseded;
        }
        session.commit_ground_scale(ticket, 1.0);
    }

    load_frustum(session, loader, ticket, assets, intrinsic, camera_to_world).await
}

async fn load_frustum<L: AssetLoader>(
    session: &RefCell<ViewerSession>,
    loader: &L,
    ticket: LoadTicket,
    assets: &SceneAssets,
    intrinsic: &NormalizedIntrinsics,
    camera_to_world: Mat4,
) -> SceneLoadOutcome {
    let image = match loader.load_image(&assets.reference_image()).await {
        Ok(image) => Some(image.size),
        Err(e) => {
            log::warn!("reference image unavailable, using placeholder: {e}");
            None
        }
    };

    let committed = session
        .borrow_mut()
        .commit_frustum(ticket, intrinsic, camera_to_world, image);
    match committed {
        Ok(CommitOutcome::Committed(_)) => SceneLoadOutcome::Completed,
        Ok(CommitOutcome::Stale) => SceneLoadOutcome::Superseded,
        Err(e) => {
            log::warn!("could not build frustum: {e}");
            SceneLoadOutcome::Abandoned
        }
    }
}

/// Loads assets from a directory tree.
///
/// Meshes are read as OBJ. Scene layouts name meshes `mesh.glb`; set
/// [`FsAssetLoader::with_mesh_extension`] to read a sibling file with
/// another extension instead.
#[derive(Debug, Clone)]
pub struct FsAssetLoader {
    root: PathBuf,
    mesh_extension: Option<String>,
}

impl FsAssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            mesh_extension: None,
        }
    }

    /// Reads `mesh.<extension>` wherever the layout names a mesh file.
    #[must_use]
    pub fn with_mesh_extension(mut self, extension: impl Into<String>) -> Self {
        self.mesh_extension = Some(extension.into());
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    fn mesh_path(&self, path: &str) -> PathBuf {
        let full = self.resolve(path);
        match &self.mesh_extension {
            Some(extension) => full.with_extension(extension),
            None => full,
        }
    }
}

impl AssetLoader for FsAssetLoader {
    async fn fetch_metadata(&self, path: &str) -> Result<SceneMetadata> {
        SceneMetadata::from_json_file(&self.resolve(path))
            .map_err(|e| PosescopeError::asset_load(path, e))
    }

    async fn load_mesh(&self, path: &str) -> Result<MeshAsset> {
        let full = self.mesh_path(path);
        let (models, _materials) = tobj::load_obj(
            &full,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )
        .map_err(|e| PosescopeError::asset_load(path, e))?;

        let mut vertices = Vec::new();
        let mut triangles = Vec::new();
        for model in models {
            let mesh = model.mesh;
            let vertex_offset = u32::try_from(vertices.len())
                .map_err(|_| PosescopeError::asset_load(path, "too many vertices"))?;
            vertices.extend(
                mesh.positions
                    .chunks_exact(3)
                    .map(|p| Vec3::new(p[0], p[1], p[2])),
            );
            triangles.extend(
                mesh.indices
                    .chunks_exact(3)
                    .map(|t| UVec3::new(t[0], t[1], t[2]) + UVec3::splat(vertex_offset)),
            );
        }
        if vertices.is_empty() {
            return Err(PosescopeError::asset_load(path, "mesh has no vertices"));
        }
        log::debug!(
            "loaded {} ({} vertices, {} triangles)",
            full.display(),
            vertices.len(),
            triangles.len()
        );
        Ok(MeshAsset::new(path, MeshGeometry::new(vertices, triangles)))
    }

    async fn load_image(&self, path: &str) -> Result<ImageAsset> {
        let (width, height) = image::image_dimensions(self.resolve(path))
            .map_err(|e| PosescopeError::asset_load(path, e))?;
        Ok(ImageAsset {
            path: path.to_string(),
            size: ImageSize::new(width, height),
        })
    }
}
