//! Runtime side of the trampoline contract.
//!
//! Generated trampolines resolve their real entry point once, on first call,
//! through a replaceable resolver. This module provides the same building
//! blocks for Rust callers: a [`SymbolResolver`] capability, a
//! [`DynamicLibrary`] resolver and the [`LazyEntry`] cell.

use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::OnceLock;

use thiserror::Error;

/// Errors raised while binding entry points.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("unable to open `{}`", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("unable to resolve `{name}`")]
    Unresolved { name: String },
}

/// Address of a resolved function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryPoint(NonNull<c_void>);

// A code address carries no thread affinity.
unsafe impl Send for EntryPoint {}
unsafe impl Sync for EntryPoint {}

impl EntryPoint {
    /// Wrap a raw address. Null is not an entry point.
    pub fn new(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(EntryPoint)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }

    /// Reinterpret the address as a function pointer type.
    ///
    /// # Safety
    ///
    /// `F` must be a function pointer type matching the symbol's real
    /// signature and calling convention.
    pub unsafe fn cast<F: Copy>(self) -> F {
        assert_eq!(
            std::mem::size_of::<F>(),
            std::mem::size_of::<*mut c_void>(),
            "entry points can only be cast to pointer-sized types"
        );
        std::mem::transmute_copy(&self.0)
    }
}

/// Resolves symbol names to entry points.
pub trait SymbolResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<EntryPoint>;
}

impl<F> SymbolResolver for F
where
    F: Fn(&str) -> Option<EntryPoint> + Send + Sync,
{
    fn resolve(&self, name: &str) -> Option<EntryPoint> {
        self(name)
    }
}

/// A shared library opened with the platform loader.
#[derive(Debug)]
pub struct DynamicLibrary {
    path: PathBuf,
    library: libloading::Library,
}

impl DynamicLibrary {
    /// Open the library at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let path = path.as_ref();
        // SAFETY: loading runs the library's initializers; callers pick the path.
        let library = unsafe { libloading::Library::new(path) }.map_err(|source| {
            RuntimeError::Open {
                path: path.to_path_buf(),
                source,
            }
        })?;

        tracing::debug!("opened {}", path.display());
        Ok(DynamicLibrary {
            path: path.to_path_buf(),
            library,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SymbolResolver for DynamicLibrary {
    fn resolve(&self, name: &str) -> Option<EntryPoint> {
        // SAFETY: the symbol is only read as an address, never called here.
        let symbol = unsafe { self.library.get::<*mut c_void>(name.as_bytes()) }.ok()?;
        EntryPoint::new(*symbol)
    }
}

/// A lazily resolved entry point.
///
/// The first [`get`](LazyEntry::get) resolves the symbol; later calls return
/// the cached address. Threads racing on first use may each call the
/// resolver, but only one result is stored and every caller observes it.
#[derive(Debug)]
pub struct LazyEntry {
    name: &'static str,
    slot: OnceLock<EntryPoint>,
}

impl LazyEntry {
    pub const fn new(name: &'static str) -> Self {
        LazyEntry {
            name,
            slot: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The resolved address, if resolution already happened.
    pub fn cached(&self) -> Option<EntryPoint> {
        self.slot.get().copied()
    }

    /// Resolve through `resolver` on first use, then return the cached address.
    ///
    /// A failed resolution is not cached; the next call tries again.
    pub fn get(&self, resolver: &dyn SymbolResolver) -> Result<EntryPoint, RuntimeError> {
        if let Some(entry) = self.slot.get() {
            return Ok(*entry);
        }

        let resolved = resolver
            .resolve(self.name)
            .ok_or_else(|| RuntimeError::Unresolved {
                name: self.name.to_string(),
            })?;

        Ok(*self.slot.get_or_init(|| resolved))
    }
}
