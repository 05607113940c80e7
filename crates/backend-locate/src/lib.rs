//! # backend-locate
//!
//! Find the two native backends a scan-to-text run depends on:
//!
//! * the [PDFium](https://pdfium.googlesource.com/pdfium/) shared library used
//!   by `pdfium-render` to rasterise PDF pages, and
//! * the `tesseract` executable used for local OCR.
//!
//! Neither backend is downloaded. Discovery walks a fixed list of candidate
//! locations and reports every path it tried when nothing matches, so the
//! caller can print an actionable "install it here" message.
//!
//! ## Search order
//!
//! An explicit path handed in by the caller is used as-is and never falls
//! back to the other candidates: if it does not exist, lookup fails.
//!
//! PDFium:
//!
//! 1. an explicit path handed in by the caller
//! 2. `PDFIUM_LIB_PATH`
//! 3. the per-user cache dir (`~/.cache/scan2text/pdfium/`, override with
//!    `SCAN2TEXT_CACHE_DIR`)
//! 4. the current working directory
//! 5. common system library directories
//!
//! Tesseract:
//!
//! 1. an explicit path handed in by the caller
//! 2. `TESSERACT_CMD`
//! 3. common install locations (`/usr/bin`, `/usr/local/bin`, Homebrew, the
//!    default Windows installer directory)
//! 4. every entry of `PATH`
//!
//! ```rust,no_run
//! use backend_locate::{bind_pdfium, locate_tesseract};
//!
//! let pdfium = bind_pdfium(None).expect("PDFium unavailable");
//! let tesseract = locate_tesseract(None).expect("tesseract unavailable");
//! println!("tesseract at {}", tesseract.display());
//! # drop(pdfium);
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use pdfium_render::prelude::Pdfium;
use thiserror::Error;

// ── Error type ───────────────────────────────────────────────────────────────

/// Which native backend a lookup was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Pdfium,
    Tesseract,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Pdfium => f.write_str("pdfium"),
            Backend::Tesseract => f.write_str("tesseract"),
        }
    }
}

/// Errors returned by backend discovery.
#[derive(Error, Debug)]
pub enum LocateError {
    /// The current OS/architecture combination has no known library name.
    #[error("Unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// None of the candidate locations exist.
    #[error("{backend} not found; searched {} location(s): {}", .searched.len(), join_paths(.searched))]
    NotFound {
        backend: Backend,
        searched: Vec<PathBuf>,
    },

    /// `pdfium-render` could not load the library that was found.
    #[error("Failed to bind PDFium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },
}

impl LocateError {
    /// The backend this error is about, when there is one.
    pub fn backend(&self) -> Option<Backend> {
        match self {
            LocateError::NotFound { backend, .. } => Some(*backend),
            LocateError::Bind { .. } => Some(Backend::Pdfium),
            LocateError::UnsupportedPlatform { .. } => None,
        }
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Platform metadata ────────────────────────────────────────────────────────

/// File names the backends use on the current platform.
#[derive(Debug, Clone, Copy)]
pub struct PlatformInfo {
    /// PDFium shared-library file name, e.g. `libpdfium.so`.
    pub pdfium_lib: &'static str,
    /// Tesseract executable file name, e.g. `tesseract.exe`.
    pub tesseract_exe: &'static str,
}

/// Detect library and executable names for the running OS/architecture.
pub fn detect_platform() -> Result<PlatformInfo, LocateError> {
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;

    match (os, arch) {
        ("macos", "aarch64" | "x86_64") => Ok(PlatformInfo {
            pdfium_lib: "libpdfium.dylib",
            tesseract_exe: "tesseract",
        }),
        ("linux", "x86_64" | "aarch64") => Ok(PlatformInfo {
            pdfium_lib: "libpdfium.so",
            tesseract_exe: "tesseract",
        }),
        ("windows", "x86_64" | "aarch64" | "x86") => Ok(PlatformInfo {
            pdfium_lib: "pdfium.dll",
            tesseract_exe: "tesseract.exe",
        }),
        (os, arch) => Err(LocateError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        }),
    }
}

// ── Cache directory resolution ───────────────────────────────────────────────

/// Directory where a user may drop a PDFium library for scan2text to pick up.
///
/// Default locations:
/// - **macOS**: `~/Library/Caches/scan2text/pdfium/`
/// - **Linux**: `~/.cache/scan2text/pdfium/`
/// - **Windows**: `%LOCALAPPDATA%\scan2text\pdfium\`
///
/// Override by setting `SCAN2TEXT_CACHE_DIR`.
pub fn pdfium_cache_dir() -> PathBuf {
    if let Ok(override_dir) = std::env::var("SCAN2TEXT_CACHE_DIR") {
        return PathBuf::from(override_dir).join("pdfium");
    }

    let base = dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir);

    base.join("scan2text").join("pdfium")
}

// ── Candidate lists ──────────────────────────────────────────────────────────

const PDFIUM_SYSTEM_DIRS: &[&str] = &[
    "/usr/local/lib",
    "/usr/lib",
    "/usr/lib/x86_64-linux-gnu",
    "/usr/lib/aarch64-linux-gnu",
    "/opt/homebrew/lib",
    "C:\\Program Files\\pdfium\\bin",
];

const TESSERACT_INSTALL_DIRS: &[&str] = &[
    "/usr/bin",
    "/usr/local/bin",
    "/opt/homebrew/bin",
    "C:\\Program Files\\Tesseract-OCR",
];

/// Ordered PDFium library locations to try.
pub fn pdfium_candidates(explicit: Option<&Path>) -> Result<Vec<PathBuf>, LocateError> {
    let info = detect_platform()?;
    let mut out = Vec::new();

    if let Some(p) = explicit {
        out.push(p.to_path_buf());
    }
    if let Ok(p) = std::env::var("PDFIUM_LIB_PATH") {
        if !p.is_empty() {
            out.push(PathBuf::from(p));
        }
    }
    out.push(pdfium_cache_dir().join(info.pdfium_lib));
    if let Ok(cwd) = std::env::current_dir() {
        out.push(cwd.join(info.pdfium_lib));
    }
    out.extend(
        PDFIUM_SYSTEM_DIRS
            .iter()
            .map(|d| Path::new(d).join(info.pdfium_lib)),
    );

    Ok(out)
}

/// Ordered Tesseract executable locations to try.
pub fn tesseract_candidates(explicit: Option<&Path>) -> Result<Vec<PathBuf>, LocateError> {
    let info = detect_platform()?;
    let mut out = Vec::new();

    if let Some(p) = explicit {
        out.push(p.to_path_buf());
    }
    if let Ok(p) = std::env::var("TESSERACT_CMD") {
        if !p.is_empty() {
            out.push(PathBuf::from(p));
        }
    }
    out.extend(
        TESSERACT_INSTALL_DIRS
            .iter()
            .map(|d| Path::new(d).join(info.tesseract_exe)),
    );
    if let Some(path_var) = std::env::var_os("PATH") {
        out.extend(std::env::split_paths(&path_var).map(|d| d.join(info.tesseract_exe)));
    }

    Ok(out)
}

/// First candidate that exists as a regular file.
pub fn first_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|p| p.is_file()).cloned()
}

// ── Public API ───────────────────────────────────────────────────────────────

/// An explicit path must exist; it is never silently swapped for another
/// install.
fn check_explicit(backend: Backend, path: &Path) -> Result<PathBuf, LocateError> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(LocateError::NotFound {
            backend,
            searched: vec![path.to_path_buf()],
        })
    }
}

/// Resolve the PDFium shared library.
pub fn locate_pdfium(explicit: Option<&Path>) -> Result<PathBuf, LocateError> {
    if let Some(path) = explicit {
        return check_explicit(Backend::Pdfium, path);
    }
    let candidates = pdfium_candidates(None)?;
    first_existing(&candidates).ok_or(LocateError::NotFound {
        backend: Backend::Pdfium,
        searched: candidates,
    })
}

/// Resolve the Tesseract executable.
pub fn locate_tesseract(explicit: Option<&Path>) -> Result<PathBuf, LocateError> {
    if let Some(path) = explicit {
        return check_explicit(Backend::Tesseract, path);
    }
    let candidates = tesseract_candidates(None)?;
    first_existing(&candidates).ok_or(LocateError::NotFound {
        backend: Backend::Tesseract,
        searched: candidates,
    })
}

/// Resolve PDFium and bind to it.
pub fn bind_pdfium(explicit: Option<&Path>) -> Result<Pdfium, LocateError> {
    let lib_path = locate_pdfium(explicit)?;
    bind_pdfium_from_path(&lib_path)
}

/// Binds to a PDFium library at an explicit `path`.
pub fn bind_pdfium_from_path(path: &Path) -> Result<Pdfium, LocateError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| LocateError::Bind {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
