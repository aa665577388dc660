use std::ffi::OsString;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::bind::{self, Bind};
use crate::error::StrataError;
use crate::file::{self, FileLoader};
use crate::fs::{Filesystem, OsFilesystem};
use crate::help::Usage;
use crate::persist;
use crate::registry::{Registry, Setting};
use crate::resolve::{self, Layers, Resolution, ResolveInput};
use crate::tree;
use crate::types::{Outcome, SearchPath};

/// Builder for a [`Strata`] handle.
///
/// Controls three concerns:
///
/// - **Settings**: [`setting()`](Self::setting) registers the env bindings and
///   command-line aliases; [`default_value()`](Self::default_value) seeds the
///   lowest layer.
/// - **Discovery**: [`file()`](Self::file) and
///   [`search_paths()`](Self::search_paths) list where the config file may live.
/// - **Collaborators**: [`args()`](Self::args), [`env_vars()`](Self::env_vars)
///   and [`filesystem()`](Self::filesystem) replace the process environment,
///   mostly for tests.
pub struct StrataBuilder<T> {
    app_name: Option<String>,
    file_name: Option<String>,
    search_paths: Option<Vec<SearchPath>>,
    files: Vec<PathBuf>,
    registry: Registry,
    defaults: Map<String, Value>,
    args: Option<Vec<String>>,
    env_vars: Option<Vec<(String, String)>>,
    fs: Arc<dyn Filesystem>,
    _phantom: PhantomData<T>,
}

impl<T> StrataBuilder<T> {
    fn new() -> Self {
        Self {
            app_name: None,
            file_name: None,
            search_paths: None,
            files: Vec::new(),
            registry: Registry::new(),
            defaults: Map::new(),
            args: None,
            env_vars: None,
            fs: Arc::new(OsFilesystem),
            _phantom: PhantomData,
        }
    }

    /// Set the application name. This derives sensible defaults:
    /// - `file_name` → `"{app_name}.json"`
    /// - `search_paths` → `[SearchPath::Platform]`
    pub fn app_name(mut self, name: &str) -> Self {
        self.app_name = Some(name.to_string());
        self
    }

    /// Override the config file name (default: `"{app_name}.json"`).
    pub fn file_name(mut self, name: &str) -> Self {
        self.file_name = Some(name.to_string());
        self
    }

    /// Replace the default search paths entirely. Earlier entries are tried first.
    pub fn search_paths(mut self, paths: Vec<SearchPath>) -> Self {
        self.search_paths = Some(paths);
        self
    }

    /// Append a search path without replacing the defaults.
    /// If no paths have been set yet, starts from the default `[Platform]`.
    pub fn add_search_path(mut self, path: SearchPath) -> Self {
        self.search_paths
            .get_or_insert_with(|| vec![SearchPath::Platform])
            .push(path);
        self
    }

    /// Add an explicit config file path, tried before any search path.
    /// An empty path is ignored.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if !path.as_os_str().is_empty() {
            self.files.push(path);
        }
        self
    }

    /// Program description shown at the top of the help text. Also enables
    /// `-h` and `--help` as help requests.
    pub fn description(mut self, text: &str) -> Self {
        self.registry.set_description(text);
        self
    }

    /// A usage example listed at the end of the help text.
    pub fn example(mut self, text: &str) -> Self {
        self.registry.add_example(text);
        self
    }

    /// Register a setting. Settings with neither an env binding nor an alias
    /// are dropped.
    pub fn setting(mut self, setting: Setting) -> Self {
        self.registry.add(setting);
        self
    }

    /// Seed the defaults layer at a dotted path.
    pub fn default_value(mut self, path: &str, value: impl Into<Value>) -> Self {
        tree::insert(&mut self.defaults, path, value.into());
        self
    }

    /// Use these arguments instead of the process arguments (without the program name).
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Use these variables instead of the process environment.
    pub fn env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Replace the file system used for loading and saving.
    pub fn filesystem(mut self, fs: impl Filesystem + 'static) -> Self {
        self.fs = Arc::new(fs);
        self
    }

    /// Resolve the effective search paths.
    fn effective_search_paths(&self) -> Vec<SearchPath> {
        match (&self.search_paths, &self.app_name) {
            (Some(paths), _) => paths.clone(),
            (None, Some(_)) => vec![SearchPath::Platform],
            (None, None) => Vec::new(),
        }
    }

    /// Resolve the effective file name.
    fn effective_file_name(&self) -> Result<String, StrataError> {
        if let Some(name) = &self.file_name {
            return Ok(name.clone());
        }
        let app = self.app_name.as_deref().ok_or(StrataError::AppNameRequired)?;
        Ok(format!("{app}.json"))
    }

    fn candidates(&self) -> Result<Vec<PathBuf>, StrataError> {
        let search_paths = self.effective_search_paths();
        if search_paths.is_empty() {
            return Ok(self.files.clone());
        }

        let file_name = self.effective_file_name()?;
        let app_name = match (&self.app_name, search_paths.contains(&SearchPath::Platform)) {
            (Some(app), _) => app.as_str(),
            (None, false) => "",
            (None, true) => return Err(StrataError::AppNameRequired),
        };
        Ok(file::candidate_paths(&self.files, &search_paths, &file_name, app_name))
    }

    /// Finish the builder, taking ownership of the destination.
    ///
    /// Nothing is read yet; call [`Strata::load`] to populate `target`.
    pub fn build(self, target: T) -> Result<Strata<T>, StrataError> {
        let candidates = self.candidates()?;
        debug!(
            settings = self.registry.len(),
            candidates = candidates.len(),
            "Built configuration handle"
        );

        let loader = FileLoader::new(Arc::clone(&self.fs), candidates);
        Ok(Strata {
            shared: Arc::new(Shared {
                registry: self.registry,
                args: self.args,
                env_vars: self.env_vars,
                fs: self.fs,
                state: Mutex::new(State {
                    target,
                    loader,
                    layers: Layers {
                        defaults: self.defaults,
                        ..Layers::default()
                    },
                }),
            }),
        })
    }
}

/// A shared handle to a loaded configuration.
///
/// Cloning is cheap; every clone sees the same destination. The destination,
/// the file state and the cached layers sit behind one mutex, so a reload
/// never interleaves with a [`read`](Self::read).
pub struct Strata<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Strata<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<T> {
    registry: Registry,
    args: Option<Vec<String>>,
    env_vars: Option<Vec<(String, String)>>,
    fs: Arc<dyn Filesystem>,
    state: Mutex<State<T>>,
}

struct State<T> {
    target: T,
    loader: FileLoader,
    layers: Layers,
}

impl<T> Strata<T> {
    pub fn builder() -> StrataBuilder<T> {
        StrataBuilder::new()
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the destination while holding the lock.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.lock().target)
    }

    /// A copy of the destination.
    pub fn snapshot(&self) -> T
    where
        T: Clone,
    {
        self.read(T::clone)
    }

    pub fn registry(&self) -> &Registry {
        &self.shared.registry
    }

    /// The rendered usage text.
    pub fn help(&self) -> String {
        Usage(&self.shared.registry).to_string()
    }

    /// The configuration file in use, once one has been found.
    pub fn config_file(&self) -> Option<PathBuf> {
        self.lock().loader.path().map(PathBuf::from)
    }

    /// Write the destination to the configuration file, or to the first
    /// candidate path when no file has been found yet.
    pub fn try_save(&self) -> Result<PathBuf, StrataError>
    where
        T: Serialize,
    {
        let state = self.lock();
        let path = state.loader.save_target().ok_or(StrataError::NoConfigFile)?;
        persist::write_json(self.shared.fs.as_ref(), &path, &state.target)?;
        info!(path = %path.display(), "Saved configuration");
        Ok(path)
    }

    /// Like [`try_save`](Self::try_save), logging failures instead of
    /// returning them.
    pub fn save(&self)
    where
        T: Serialize,
    {
        if let Err(e) = self.try_save() {
            warn!(error = %e, "Failed to save configuration");
        }
    }
}

impl<T: Bind> Strata<T> {
    /// Read every source and bind the merged result onto the destination.
    ///
    /// Precedence, lowest first: defaults, file, environment, command line.
    /// The file is always re-read. A help request on the command line leaves
    /// the destination untouched and returns the usage text.
    pub fn load(&self) -> Outcome {
        let args = self
            .shared
            .args
            .clone()
            .unwrap_or_else(|| lossy_args(std::env::args_os().skip(1)));
        let env_vars = self
            .shared
            .env_vars
            .clone()
            .unwrap_or_else(|| utf8_vars(std::env::vars_os()));

        let mut guard = self.lock();
        let state = &mut *guard;
        state.loader.reset();
        let file = state.loader.load();

        let input = ResolveInput {
            registry: &self.shared.registry,
            defaults: state.layers.defaults.clone(),
            file,
            env_vars,
            args,
        };
        match resolve::resolve(input) {
            Resolution::Help => {
                state.loader.reset();
                debug!("Help requested on the command line");
                Outcome::Help(self.help())
            }
            Resolution::Layers(layers) => {
                let assigned = bind::to(&mut state.target, &layers.merged());
                state.layers = layers;
                debug!(fields = assigned, "Loaded configuration");
                Outcome::Loaded
            }
        }
    }

    /// Re-read the configuration file and, if it changed, merge it with the
    /// cached defaults, environment and command-line layers and bind again.
    ///
    /// Returns `false` when the file is unchanged, missing or unreadable; the
    /// destination is then left as it was.
    pub fn reload(&self) -> bool {
        let mut guard = self.lock();
        let state = &mut *guard;

        let file = state.loader.load();
        if file.is_empty() {
            debug!("Configuration file unchanged, nothing to reload");
            return false;
        }

        state.layers.file = file;
        let assigned = bind::to(&mut state.target, &state.layers.merged());
        if let Some(path) = state.loader.path() {
            info!(path = %path.display(), fields = assigned, "Reloaded configuration");
        }
        true
    }
}

/// Arguments that are not valid UTF-8 are converted lossily so later
/// arguments keep their positions.
fn lossy_args(args: impl IntoIterator<Item = OsString>) -> Vec<String> {
    args.into_iter()
        .map(|arg| match arg.into_string() {
            Ok(arg) => arg,
            Err(raw) => {
                debug!(arg = ?raw, "Argument is not valid UTF-8, converting lossily");
                raw.to_string_lossy().into_owned()
            }
        })
        .collect()
}

/// Variables whose name or value is not valid UTF-8 are skipped.
fn utf8_vars(vars: impl IntoIterator<Item = (OsString, OsString)>) -> Vec<(String, String)> {
    vars.into_iter()
        .filter_map(|(name, value)| match (name.into_string(), value.into_string()) {
            (Ok(name), Ok(value)) => Some((name, value)),
            (name, _) => {
                debug!(name = ?name, "Skipping environment variable that is not valid UTF-8");
                None
            }
        })
        .collect()
}
