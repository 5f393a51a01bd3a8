use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ar_overlay_mesh::{load_obj, MeshAsset, MeshError, ObjLoadOptions};
use ar_overlay_track::Uid;
use log::debug;
use serde::{Deserialize, Serialize};

/// Name of the animation every new identity starts in.
pub const DEFAULT_ANIMATION: &str = "default";

/// One asset-map value: which model/animation/texture a marker class uses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMapEntry {
    pub model: String,
    #[serde(default)]
    pub texture: Option<String>,
    #[serde(default = "default_animation")]
    pub animation: String,
}

fn default_animation() -> String {
    DEFAULT_ANIMATION.to_string()
}

/// Composite lookup key for one animation sequence.
///
/// Replaces nested model -> animation -> texture dictionaries with a single
/// key and explicit existence checks.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceKey {
    pub model: String,
    pub animation: String,
    pub texture: Option<String>,
}

impl SequenceKey {
    pub fn new(
        model: impl Into<String>,
        animation: impl Into<String>,
        texture: Option<String>,
    ) -> Self {
        Self {
            model: model.into(),
            animation: animation.into(),
            texture,
        }
    }
}

/// Per-UID animation bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationState {
    pub animation: String,
    pub frame_index: usize,
}

impl Default for AnimationState {
    fn default() -> Self {
        Self {
            animation: default_animation(),
            frame_index: 0,
        }
    }
}

/// Errors raised while registering assets. Always registration-time: a
/// missing model or texture is a one-time load failure, never a per-frame
/// condition.
#[derive(thiserror::Error, Debug)]
pub enum RegisterError {
    #[error("failed to read asset map {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("asset map is not valid JSON")]
    Map(#[from] serde_json::Error),

    #[error("asset map key `{0}` is not an integer")]
    BadMapKey(String),

    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error("sequence {model}/{animation} has no frames")]
    EmptySequence { model: String, animation: String },
}

/// Maps tracked identities to the mesh frame to draw this render call.
///
/// Owns the `(dictionary, id)` asset map, the loaded animation sequences
/// (shared immutable frames) and the per-UID animation state. A global
/// `frozen` flag pauses frame advancement for all identities uniformly
/// while projection continues.
pub struct AssetRegister {
    map: HashMap<(i32, i32), AssetMapEntry>,
    sequences: HashMap<SequenceKey, Vec<Arc<MeshAsset>>>,
    states: HashMap<Uid, AnimationState>,
    default_sequence: Vec<Arc<MeshAsset>>,
    frozen: bool,
}

impl AssetRegister {
    /// Register with a single-frame process-wide default asset.
    pub fn new(default_asset: Arc<MeshAsset>) -> Self {
        Self {
            map: HashMap::new(),
            sequences: HashMap::new(),
            states: HashMap::new(),
            default_sequence: vec![default_asset],
            frozen: false,
        }
    }

    /// Register with an animated default sequence.
    pub fn with_default_sequence(frames: Vec<Arc<MeshAsset>>) -> Result<Self, RegisterError> {
        if frames.is_empty() {
            return Err(RegisterError::EmptySequence {
                model: "<default>".into(),
                animation: DEFAULT_ANIMATION.into(),
            });
        }
        Ok(Self {
            map: HashMap::new(),
            sequences: HashMap::new(),
            states: HashMap::new(),
            default_sequence: frames,
            frozen: false,
        })
    }

    /// Map a `(dictionary, id)` marker class to an asset entry.
    pub fn set_mapping(&mut self, dictionary: i32, id: i32, entry: AssetMapEntry) {
        self.map.insert((dictionary, id), entry);
    }

    /// Load an asset map in the JSON shape
    /// `{"<dictionary>": {"<id>": {"model": ..., "texture": ...}}}`.
    /// Returns the number of entries added.
    pub fn load_map_json(&mut self, text: &str) -> Result<usize, RegisterError> {
        let parsed: HashMap<String, HashMap<String, AssetMapEntry>> = serde_json::from_str(text)?;
        let mut added = 0;
        for (dict_key, ids) in parsed {
            let dictionary: i32 = dict_key
                .parse()
                .map_err(|_| RegisterError::BadMapKey(dict_key.clone()))?;
            for (id_key, entry) in ids {
                let id: i32 = id_key
                    .parse()
                    .map_err(|_| RegisterError::BadMapKey(id_key.clone()))?;
                self.set_mapping(dictionary, id, entry);
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn load_map_file(&mut self, path: &Path) -> Result<usize, RegisterError> {
        let text = std::fs::read_to_string(path).map_err(|source| RegisterError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_map_json(&text)
    }

    /// Register a loaded animation sequence under its composite key.
    pub fn insert_sequence(
        &mut self,
        key: SequenceKey,
        frames: Vec<Arc<MeshAsset>>,
    ) -> Result<(), RegisterError> {
        if frames.is_empty() {
            return Err(RegisterError::EmptySequence {
                model: key.model,
                animation: key.animation,
            });
        }
        self.sequences.insert(key, frames);
        Ok(())
    }

    pub fn contains_sequence(&self, key: &SequenceKey) -> bool {
        self.sequences.contains_key(key)
    }

    /// Eagerly load every mapped model (with its texture) from `root` as a
    /// single-frame default-animation sequence. Already-registered
    /// sequences are kept. Returns the number of sequences loaded.
    pub fn preload(&mut self, root: &Path) -> Result<usize, RegisterError> {
        let entries: Vec<AssetMapEntry> = self.map.values().cloned().collect();
        let mut loaded = 0;
        for entry in entries {
            let key = SequenceKey::new(&entry.model, &entry.animation, entry.texture.clone());
            if self.contains_sequence(&key) {
                continue;
            }
            let options = ObjLoadOptions {
                texture: entry.texture.as_ref().map(|t| root.join(t)),
                ..ObjLoadOptions::default()
            };
            let mesh = load_obj(&root.join(&entry.model), &options)?;
            self.insert_sequence(key, vec![Arc::new(mesh)])?;
            loaded += 1;
        }
        debug!("preloaded {loaded} asset sequence(s)");
        Ok(loaded)
    }

    /// Switch a UID's active animation and restart it from frame 0.
    pub fn set_active_animation(&mut self, uid: Uid, animation: impl Into<String>) {
        let state = self.states.entry(uid).or_default();
        state.animation = animation.into();
        state.frame_index = 0;
    }

    /// Flip the global freeze flag; returns the new value.
    pub fn toggle_frozen(&mut self) -> bool {
        self.frozen = !self.frozen;
        self.frozen
    }

    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    pub fn frozen(&self) -> bool {
        self.frozen
    }

    pub fn animation_state(&self, uid: &Uid) -> Option<&AnimationState> {
        self.states.get(uid)
    }

    /// Drop animation state for identities no longer tracked.
    pub fn retain_states(&mut self, live: &[Uid]) {
        self.states.retain(|uid, _| live.contains(uid));
    }

    /// Resolve the mesh frame to draw for `uid` this render call.
    ///
    /// First call for a UID initializes its animation state, starting in
    /// the mapped entry's animation (or `"default"`). An unmapped marker
    /// class, or a mapped class whose sequence was never registered,
    /// silently resolves to the default sequence. Unless frozen, the frame
    /// index advances by one modulo the active sequence length.
    pub fn resolve_asset(&mut self, uid: Uid) -> Arc<MeshAsset> {
        if !self.states.contains_key(&uid) {
            let animation = self
                .map
                .get(&(uid.dictionary, uid.id))
                .map(|entry| entry.animation.clone())
                .unwrap_or_else(default_animation);
            self.states.insert(
                uid,
                AnimationState {
                    animation,
                    frame_index: 0,
                },
            );
        }
        let (animation, frame_index) = {
            let state = &self.states[&uid];
            (state.animation.clone(), state.frame_index)
        };

        let sequence: &[Arc<MeshAsset>] = match self.map.get(&(uid.dictionary, uid.id)) {
            Some(entry) => {
                let key = SequenceKey::new(&entry.model, &animation, entry.texture.clone());
                match self.sequences.get(&key) {
                    Some(frames) => frames,
                    None => {
                        debug!(
                            "sequence {}/{animation} not registered for {uid}, using default",
                            entry.model
                        );
                        &self.default_sequence
                    }
                }
            }
            None => {
                debug!("no asset mapping for {uid}, using default");
                &self.default_sequence
            }
        };

        let len = sequence.len();
        let asset = Arc::clone(&sequence[frame_index % len]);

        let next = if self.frozen {
            // Keep the index in range if a shorter sequence became active.
            frame_index % len
        } else {
            (frame_index + 1) % len
        };
        if let Some(state) = self.states.get_mut(&uid) {
            state.frame_index = next;
        }

        asset
    }
}
