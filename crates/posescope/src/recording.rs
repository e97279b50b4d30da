//! Recording playback with a small LRU cache.
//!
//! Recordings are played by an external widget behind [`RecordingPlayer`].
//! [`RecordingViewer`] decides what to ask it for: in preload mode every
//! recording is handed over at start and selection only switches between
//! them; in load-on-click mode recordings are opened on demand, kept in a
//! [`RecordingCache`], and closed again once they fall out of it.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::path::Path;

use posescope_core::{PosescopeError, Result};
use serde::{Deserialize, Serialize};

/// Most-recently-used list of loaded recordings.
#[derive(Debug, Clone)]
pub struct RecordingCache {
    max_size: usize,
    // Least recently used first.
    order: VecDeque<String>,
}

impl Default for RecordingCache {
    fn default() -> Self {
        Self::new(1)
    }
}

impl RecordingCache {
    /// Creates a cache holding at most `max_size` recordings (at least one).
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            max_size,
            order: VecDeque::with_capacity(max_size + 1),
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, rrd: &str) -> bool {
        self.order.iter().any(|r| r == rrd)
    }

    /// Marks a cached recording as most recently used. Returns `false` if it
    /// is not cached.
    pub fn touch(&mut self, rrd: &str) -> bool {
        let Some(pos) = self.order.iter().position(|r| r == rrd) else {
            return false;
        };
        if let Some(entry) = self.order.remove(pos) {
            self.order.push_back(entry);
        }
        true
    }

    /// Records `rrd` as most recently used and returns the recording pushed
    /// out, if the cache was full.
    pub fn insert(&mut self, rrd: impl Into<String>) -> Option<String> {
        let rrd = rrd.into();
        if self.touch(&rrd) {
            return None;
        }
        self.order.push_back(rrd);
        if self.order.len() > self.max_size {
            self.order.pop_front()
        } else {
            None
        }
    }

    pub fn remove(&mut self, rrd: &str) -> bool {
        let before = self.order.len();
        self.order.retain(|r| r != rrd);
        self.order.len() != before
    }

    /// Cached recordings, least recently used first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn most_recent(&self) -> Option<&str> {
        self.order.back().map(String::as_str)
    }
}

/// Recording id the player uses for an `.rrd` file name.
pub fn recording_id(rrd: &str) -> &str {
    rrd.strip_suffix(".rrd").unwrap_or(rrd)
}

/// Panel visibility override passed to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PanelState {
    Hidden,
    Collapsed,
    Expanded,
}

/// Per-panel overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelStateOverrides {
    pub blueprint: PanelState,
    pub time: PanelState,
    pub top: PanelState,
}

/// Options handed to [`RecordingPlayer::start`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerOptions {
    pub render_backend: String,
    pub hide_welcome_screen: bool,
    pub panel_state_overrides: PanelStateOverrides,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            render_backend: "webgl".to_string(),
            hide_welcome_screen: true,
            panel_state_overrides: PanelStateOverrides {
                blueprint: PanelState::Hidden,
                time: PanelState::Hidden,
                top: PanelState::Hidden,
            },
        }
    }
}

/// The external playback widget.
#[allow(async_fn_in_trait)]
pub trait RecordingPlayer {
    /// Starts the widget in `container_id` with an initial set of URLs.
    async fn start(&self, urls: &[String], container_id: &str, options: &PlayerOptions) -> Result<()>;

    /// Opens a recording (and its blueprint) and makes it active.
    async fn open(&self, urls: &[String]) -> Result<()>;

    /// Unloads a recording.
    async fn close(&self, recording_id: &str) -> Result<()>;

    /// Makes an already loaded recording active.
    async fn set_active_recording_id(&self, recording_id: &str) -> Result<()>;
}

/// One recording of the gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RecordingEntryRepr")]
pub struct RecordingEntry {
    pub rrd: String,
    pub blueprint: Option<String>,
    pub thumbnail: Option<String>,
}

impl RecordingEntry {
    pub fn new(rrd: impl Into<String>) -> Self {
        Self {
            rrd: rrd.into(),
            blueprint: None,
            thumbnail: None,
        }
    }

    #[must_use]
    pub fn with_blueprint(mut self, blueprint: impl Into<String>) -> Self {
        self.blueprint = Some(blueprint.into());
        self
    }
}

/// Entries may be written as a bare file name.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordingEntryRepr {
    Path(String),
    Full {
        rrd: String,
        #[serde(default)]
        blueprint: Option<String>,
        #[serde(default)]
        thumbnail: Option<String>,
    },
}

impl From<RecordingEntryRepr> for RecordingEntry {
    fn from(repr: RecordingEntryRepr) -> Self {
        match repr {
            RecordingEntryRepr::Path(rrd) => Self::new(rrd),
            RecordingEntryRepr::Full {
                rrd,
                blueprint,
                thumbnail,
            } => Self {
                rrd,
                blueprint,
                thumbnail,
            },
        }
    }
}

fn default_container_id() -> String {
    "viewer".to_string()
}

/// Recording viewer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingViewerConfig {
    #[serde(default = "default_container_id")]
    pub container_id: String,
    /// Prefix joined onto every recording and blueprint file name.
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub recordings: Vec<RecordingEntry>,
    /// Recordings kept loaded in load-on-click mode; 1 when unset.
    #[serde(default)]
    pub max_cache_size: Option<usize>,
    /// Open recordings on selection instead of all at start.
    #[serde(default)]
    pub load_on_click: bool,
}

impl Default for RecordingViewerConfig {
    fn default() -> Self {
        Self {
            container_id: default_container_id(),
            base_url: String::new(),
            recordings: Vec::new(),
            max_cache_size: None,
            load_on_click: false,
        }
    }
}

impl RecordingViewerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// URLs of a recording and its blueprint, if it has one.
    pub fn urls_for(&self, rrd: &str) -> Vec<String> {
        let mut urls = vec![format!("{}{rrd}", self.base_url)];
        let blueprint = self
            .recordings
            .iter()
            .find(|entry| entry.rrd == rrd)
            .and_then(|entry| entry.blueprint.as_deref());
        if let Some(blueprint) = blueprint {
            urls.push(format!("{}{blueprint}", self.base_url));
        }
        urls
    }

    /// URLs of every recording, last recording first, so that the player
    /// ends up showing the first one.
    pub fn preload_urls(&self) -> Vec<String> {
        self.recordings
            .iter()
            .rev()
            .flat_map(|entry| self.urls_for(&entry.rrd))
            .collect()
    }
}

/// Status line shown next to the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingStatus {
    Starting,
    Ready,
    ReadyToLoad,
    Loading,
    LoadFailed,
    StartFailed(String),
}

impl fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => write!(f, "Starting..."),
            Self::Ready => write!(f, "Ready"),
            Self::ReadyToLoad => write!(f, "Ready - Click to load"),
            Self::Loading => write!(f, "Loading..."),
            Self::LoadFailed => write!(f, "Error loading recording"),
            Self::StartFailed(reason) => write!(f, "Error: {reason}"),
        }
    }
}

/// What [`RecordingViewer::load_recording`] or
/// [`RecordingViewer::switch_recording`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Another load is in progress; nothing was done.
    Rejected,
    /// The recording was already showing.
    AlreadyActive,
    /// A cached recording was made active.
    CacheHit,
    /// A preloaded recording was made active.
    Switched,
    /// The recording was opened; `evicted` was closed to make room.
    Loaded { evicted: Option<String> },
}

/// Drives a [`RecordingPlayer`] from gallery selections.
///
/// Methods take `&self` so that a selection can arrive while an earlier
/// one is still awaiting the player; the busy flag rejects it.
#[derive(Debug)]
pub struct RecordingViewer<P> {
    config: RecordingViewerConfig,
    player: P,
    started: Cell<bool>,
    busy: Cell<bool>,
    current: RefCell<Option<String>>,
    cache: RefCell<RecordingCache>,
    status: RefCell<RecordingStatus>,
}

/// Holds the viewer's busy flag for the duration of a load.
struct BusyGuard<'a>(&'a Cell<bool>);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<P: RecordingPlayer> RecordingViewer<P> {
    pub fn new(config: RecordingViewerConfig, player: P) -> Self {
        let cache = RecordingCache::new(config.max_cache_size.unwrap_or(1));
        Self {
            config,
            player,
            started: Cell::new(false),
            busy: Cell::new(false),
            current: RefCell::new(None),
            cache: RefCell::new(cache),
            status: RefCell::new(RecordingStatus::Starting),
        }
    }

    pub fn config(&self) -> &RecordingViewerConfig {
        &self.config
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    /// The recording currently showing.
    pub fn current(&self) -> Option<String> {
        self.current.borrow().clone()
    }

    pub fn status(&self) -> RecordingStatus {
        self.status.borrow().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    /// Cached recordings, least recently used first.
    pub fn cached(&self) -> Vec<String> {
        self.cache.borrow().iter().map(str::to_string).collect()
    }

    fn set_status(&self, status: RecordingStatus) {
        *self.status.borrow_mut() = status;
    }

    /// Starts the player. In preload mode every recording is handed over and
    /// the first becomes current; in load-on-click mode the player starts
    /// empty.
    pub async fn start(&self) -> Result<()> {
        let urls = if self.config.load_on_click {
            Vec::new()
        } else {
            self.config.preload_urls()
        };
        let options = PlayerOptions::default();
        if let Err(e) = self
            .player
            .start(&urls, &self.config.container_id, &options)
            .await
        {
            self.set_status(RecordingStatus::StartFailed(e.to_string()));
            return Err(PosescopeError::Recording(format!("player failed to start: {e}")));
        }
        self.started.set(true);

        if self.config.load_on_click {
            self.set_status(RecordingStatus::ReadyToLoad);
        } else {
            *self.current.borrow_mut() = self.config.recordings.first().map(|entry| entry.rrd.clone());
            self.set_status(RecordingStatus::Ready);
        }
        log::info!(
            "recording viewer started with {} recordings ({})",
            self.config.recordings.len(),
            if self.config.load_on_click { "load on click" } else { "preloaded" }
        );
        Ok(())
    }

    /// Handles a gallery selection according to the configured mode.
    pub async fn select(&self, rrd: &str) -> Result<LoadOutcome> {
        if self.config.load_on_click {
            self.load_recording(rrd).await
        } else {
            self.switch_recording(rrd).await
        }
    }

    /// Shows `rrd`, opening it if it is not cached.
    pub async fn load_recording(&self, rrd: &str) -> Result<LoadOutcome> {
        if !self.started.get() {
            return Err(PosescopeError::NotInitialized);
        }
        if self.busy.get() {
            log::info!("already loading, ignoring {rrd}");
            return Ok(LoadOutcome::Rejected);
        }
        if self.current.borrow().as_deref() == Some(rrd) {
            return Ok(LoadOutcome::AlreadyActive);
        }
        let _busy = BusyGuard::acquire(&self.busy);

        if self.cache.borrow().contains(rrd) {
            match self.player.set_active_recording_id(recording_id(rrd)).await {
                Ok(()) => {
                    self.cache.borrow_mut().touch(rrd);
                    *self.current.borrow_mut() = Some(rrd.to_string());
                    self.set_status(RecordingStatus::Ready);
                    log::info!("using cached {rrd}");
                    return Ok(LoadOutcome::CacheHit);
                }
                Err(e) => {
                    log::warn!("cache switch to {rrd} failed, reloading: {e}");
                    self.cache.borrow_mut().remove(rrd);
                }
            }
        }

        self.set_status(RecordingStatus::Loading);
        self.open_uncached(rrd).await
    }

    async fn open_uncached(&self, rrd: &str) -> Result<LoadOutcome> {
        let urls = self.config.urls_for(rrd);
        if let Err(e) = self.player.open(&urls).await {
            self.set_status(RecordingStatus::LoadFailed);
            return Err(PosescopeError::Recording(format!("could not open {rrd}: {e}")));
        }

        let evicted = self.cache.borrow_mut().insert(rrd);
        if let Some(old) = &evicted {
            log::debug!("evicting {old}");
            if let Err(e) = self.player.close(recording_id(old)).await {
                log::warn!("could not close {old}: {e}");
            }
        }
        *self.current.borrow_mut() = Some(rrd.to_string());
        self.set_status(RecordingStatus::Ready);
        log::info!("loaded {rrd}");
        Ok(LoadOutcome::Loaded { evicted })
    }

    /// Makes a preloaded recording active.
    pub async fn switch_recording(&self, rrd: &str) -> Result<LoadOutcome> {
        if !self.started.get() {
            return Err(PosescopeError::NotInitialized);
        }
        if self.current.borrow().as_deref() == Some(rrd) {
            return Ok(LoadOutcome::AlreadyActive);
        }
        let id = recording_id(rrd);
        self.player
            .set_active_recording_id(id)
            .await
            .map_err(|e| PosescopeError::Recording(format!("could not switch to {id}: {e}")))?;
        *self.current.borrow_mut() = Some(rrd.to_string());
        log::info!("switched to {id}");
        Ok(LoadOutcome::Switched)
    }
}
