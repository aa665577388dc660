#[cfg(test)]
pub mod test {
    use std::collections::HashMap;
    use std::io;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, SystemTime};

    use serde::Serialize;

    use crate::bind::{Bind, Schema};
    use crate::fs::Filesystem;

    /// A destination with every shape the binder supports: leaves, an
    /// optional, a nested struct, an embedded struct with a colliding key,
    /// and members that must never be bound.
    #[derive(Serialize, Debug, Default, Clone, PartialEq)]
    pub struct MockConfig {
        pub conflict: String,
        pub name: String,
        pub number: f32,
        pub boolean: bool,
        pub nickname: Option<String>,
        pub ignored: bool,
        pub named: Named,
        #[serde(flatten)]
        pub composite: Composite,
        #[serde(skip)]
        pub log: Vec<String>,
    }

    #[derive(Serialize, Debug, Default, Clone, PartialEq)]
    pub struct Named {
        pub data: i32,
    }

    #[derive(Serialize, Debug, Default, Clone, PartialEq)]
    pub struct Composite {
        #[serde(rename = "Implicit")]
        pub implicit: bool,
        #[serde(rename = "implicit")]
        pub tagged: i32,
        #[serde(skip)]
        pub conflict: i32,
    }

    impl Bind for MockConfig {
        fn schema() -> Schema<Self> {
            Schema::new()
                .embed(|c: &mut Self| &mut c.composite)
                .field("conflict", |c: &mut Self| &mut c.conflict)
                .field("name", |c: &mut Self| &mut c.name)
                .field("number", |c: &mut Self| &mut c.number)
                .field("boolean", |c: &mut Self| &mut c.boolean)
                .field("nickname", |c: &mut Self| &mut c.nickname)
                .nested("named", |c: &mut Self| &mut c.named)
        }
    }

    impl Bind for Named {
        fn schema() -> Schema<Self> {
            Schema::new().field("data", |n: &mut Self| &mut n.data)
        }
    }

    impl Bind for Composite {
        fn schema() -> Schema<Self> {
            Schema::new()
                .field("Implicit", |c: &mut Self| &mut c.implicit)
                .field("implicit", |c: &mut Self| &mut c.tagged)
                .field("conflict", |c: &mut Self| &mut c.conflict)
        }
    }

    /// A small server-style config used by the loader and builder tests.
    #[derive(Serialize, Debug, Clone, PartialEq)]
    pub struct ServerConfig {
        pub host: String,
        pub port: u16,
        pub debug: bool,
        pub database: DbConfig,
    }

    #[derive(Serialize, Debug, Clone, PartialEq)]
    pub struct DbConfig {
        pub url: Option<String>,
        pub pool_size: usize,
    }

    impl Default for ServerConfig {
        fn default() -> Self {
            Self {
                host: "localhost".into(),
                port: 8080,
                debug: false,
                database: DbConfig {
                    url: None,
                    pool_size: 5,
                },
            }
        }
    }

    impl Bind for ServerConfig {
        fn schema() -> Schema<Self> {
            Schema::new()
                .field("host", |c: &mut Self| &mut c.host)
                .field("port", |c: &mut Self| &mut c.port)
                .field("debug", |c: &mut Self| &mut c.debug)
                .nested("database", |c: &mut Self| &mut c.database)
        }
    }

    impl Bind for DbConfig {
        fn schema() -> Schema<Self> {
            Schema::new()
                .field("url", |d: &mut Self| &mut d.url)
                .field("pool_size", |d: &mut Self| &mut d.pool_size)
        }
    }

    /// In-memory [`Filesystem`]. Clones share the same files, so a test can
    /// keep a handle and rewrite a file after handing the other to a loader.
    #[derive(Clone, Default)]
    pub struct MemoryFs {
        files: Arc<Mutex<HashMap<PathBuf, (Vec<u8>, SystemTime)>>>,
        dirs: Arc<Mutex<Vec<PathBuf>>>,
        fail_reads: Arc<AtomicBool>,
        fail_writes: Arc<AtomicBool>,
    }

    impl MemoryFs {
        pub fn new() -> Self {
            Self::default()
        }

        /// Store `contents` at `path` with a modification time of `secs`
        /// after the epoch.
        pub fn put(&self, path: impl Into<PathBuf>, contents: &str, secs: u64) {
            let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(secs);
            self.files
                .lock()
                .unwrap()
                .insert(path.into(), (contents.as_bytes().to_vec(), stamp));
        }

        pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
            self.files
                .lock()
                .unwrap()
                .get(path.as_ref())
                .map(|(bytes, _)| String::from_utf8_lossy(bytes).into_owned())
        }

        pub fn created_dirs(&self) -> Vec<PathBuf> {
            self.dirs.lock().unwrap().clone()
        }

        pub fn fail_reads(&self, fail: bool) {
            self.fail_reads.store(fail, Ordering::SeqCst);
        }

        pub fn fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display()))
    }

    impl Filesystem for MemoryFs {
        fn modified(&self, path: &Path) -> io::Result<SystemTime> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .map(|(_, stamp)| *stamp)
                .ok_or_else(|| not_found(path))
        }

        fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read denied"));
            }
            self.files
                .lock()
                .unwrap()
                .get(path)
                .map(|(bytes, _)| bytes.clone())
                .ok_or_else(|| not_found(path))
        }

        fn create_dir_all(&self, path: &Path) -> io::Result<()> {
            self.dirs.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }

        fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "write denied"));
            }
            let mut files = self.files.lock().unwrap();
            let stamp = files
                .get(path)
                .map(|(_, s)| *s + Duration::from_secs(1))
                .unwrap_or(SystemTime::UNIX_EPOCH + Duration::from_secs(1));
            files.insert(path.to_path_buf(), (contents.to_vec(), stamp));
            Ok(())
        }
    }

    #[test]
    fn server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8080);
        assert!(!config.debug);
        assert_eq!(config.database.url, None);
        assert_eq!(config.database.pool_size, 5);
    }

    #[test]
    fn memory_fs_shares_state_between_clones() {
        let fs = MemoryFs::new();
        let other = fs.clone();
        fs.put("/etc/app.json", "{}", 5);
        assert_eq!(other.contents("/etc/app.json").as_deref(), Some("{}"));
        assert!(other.modified(Path::new("/etc/app.json")).is_ok());
        assert!(other.modified(Path::new("/missing")).is_err());
    }
}
