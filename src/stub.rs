use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::{Context, Result};

/// Init process used when the caller does not name one.
pub const DEFAULT_INIT_PROC: &str = "usershell";

/// Where the stub is written, relative to the working directory.
pub const OUTPUT_PATH: &str = "os/initproc.S";

/// Label the kernel's loader resolves as `extern char INIT_PROC[]`.
pub const SYMBOL: &str = "INIT_PROC";

/// What to generate and where to put it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubConfig {
    pub init_proc: String,
    pub output: PathBuf,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self::new(DEFAULT_INIT_PROC)
    }
}

impl StubConfig {
    /// Stub for `init_proc` at the default [`OUTPUT_PATH`].
    pub fn new(init_proc: impl Into<String>) -> Self {
        Self {
            init_proc: init_proc.into(),
            output: PathBuf::from(OUTPUT_PATH),
        }
    }

    /// Redirect the stub to another file.
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn write(&self) -> Result<()> {
        generate_to(&self.output, &self.init_proc)
    }
}

/// Render the assembly stub for `init_proc`.
///
/// The name is inserted verbatim between the quotes of the `.string`
/// directive. Nothing is escaped: a `"` or a line break in the name produces
/// a file the assembler will reject (see [`needs_escaping`]).
pub fn render(init_proc: &str) -> String {
    format!("\n    .global {SYMBOL}\n{SYMBOL}:\n    .string \"{init_proc}\"\n")
}

/// Whether `init_proc` contains characters that break the `.string` literal.
pub fn needs_escaping(init_proc: &str) -> bool {
    init_proc.contains(['"', '\n', '\r'])
}

/// Write the stub for `init_proc` to [`OUTPUT_PATH`].
pub fn generate(init_proc: &str) -> Result<()> {
    StubConfig::new(init_proc).write()
}

/// Write the stub for `init_proc` to `path`, replacing any existing file.
///
/// The content goes to a temporary sibling first and is then renamed over
/// `path`, so an interrupted run never leaves a half-written stub behind.
/// Each call gets its own temporary file; concurrent writers to the same
/// `path` each rename a complete stub and the last rename wins.
/// The parent directory must already exist.
pub fn generate_to(path: impl AsRef<Path>, init_proc: &str) -> Result<()> {
    let path = path.as_ref();
    if needs_escaping(init_proc) {
        info!(
            "init process name {init_proc:?} contains a quote or line break; \
             {} will not assemble",
            path.display()
        );
    }

    let content = render(init_proc);
    let (tmp, file) =
        create_temp(path).with_context(|| format!("failed to write {}", path.display()))?;
    debug!("writing {} bytes to {}", content.len(), tmp.display());

    if let Err(err) = write_synced(file, content.as_bytes()) {
        let _ = fs::remove_file(&tmp);
        return Err(err).with_context(|| format!("failed to write {}", path.display()));
    }
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(err).with_context(|| {
            format!("failed to rename {} to {}", tmp.display(), path.display())
        });
    }

    info!("{}: {SYMBOL} = {init_proc:?}", path.display());
    Ok(())
}

fn write_synced(mut file: File, bytes: &[u8]) -> io::Result<()> {
    file.write_all(bytes)?;
    file.sync_all()
}

/// Per-process counter distinguishing temporary files of concurrent writers.
static SEQ: AtomicU32 = AtomicU32::new(0);

/// Create a fresh temporary sibling of `path`, never reusing an existing one.
fn create_temp(path: &Path) -> io::Result<(PathBuf, File)> {
    loop {
        let tmp = temp_path(path, std::process::id(), SEQ.fetch_add(1, Ordering::Relaxed));
        match OpenOptions::new().write(true).create_new(true).open(&tmp) {
            Ok(file) => return Ok((tmp, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }
}

/// `os/initproc.S` -> `os/.initproc.S.<pid>.<seq>.tmp`
fn temp_path(path: &Path, pid: u32, seq: u32) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{pid}.{seq}.tmp"))
}
