//! Idempotent step-definition source loading with a toggleable legacy
//! always-reload strategy.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rustc_hash::FxHashSet;

use crate::error::BoxError;
use crate::surface::RegistrationSurface;

/// Run-time-toggleable loading strategy.
///
/// Cloned handles share one flag, so external configuration can flip the
/// strategy mid-run and the loader observes the change on its next call. The
/// loader reads the flag; it never owns or sets it.
#[derive(Debug, Clone, Default)]
pub struct ReloadPolicy {
	always_reload: Arc<AtomicBool>,
}

impl ReloadPolicy {
	pub fn new(always_reload: bool) -> Self {
		Self {
			always_reload: Arc::new(AtomicBool::new(always_reload)),
		}
	}

	/// True when every load re-executes the file (legacy strategy).
	pub fn always_reload(&self) -> bool {
		self.always_reload.load(Ordering::Relaxed)
	}

	pub fn set_always_reload(&self, value: bool) {
		self.always_reload.store(value, Ordering::Relaxed);
	}
}

/// Executes loaded source against the registration surface.
///
/// The execution engine is an external collaborator: this crate reads the
/// file and routes registrations, everything in between is opaque. The
/// executor also declares which file extensions it understands, so discovery
/// can hand the loader arbitrary paths and unrecognized ones fall through
/// silently.
pub trait SourceExecutor {
	/// File extensions (without the dot) this executor recognizes.
	fn extensions(&self) -> &[&str];

	/// Executes `source` read from `path`. Registrations performed during
	/// execution land on `surface`. Errors propagate to the driver
	/// unmodified.
	fn execute(
		&mut self,
		path: &Path,
		source: &str,
		surface: &mut dyn RegistrationSurface,
	) -> Result<(), BoxError>;
}

/// What a [`crate::Registry::load_code_file`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadAction {
	/// The file was read and executed.
	Executed,
	/// Default strategy and the canonical path was already loaded.
	AlreadyLoaded,
	/// Extension not recognized; nothing happened.
	Skipped,
}

/// The loader's decision for one path.
#[derive(Debug)]
pub(crate) enum LoadPlan {
	Skip,
	AlreadyLoaded,
	Execute { canonical: PathBuf },
}

/// Tracks which source files have been ingested for the registry lifetime.
///
/// The set holds canonical paths, so the same file reached through different
/// spellings still loads once. It is populated only under the default
/// strategy and never cleared.
pub struct SourceLoader {
	policy: ReloadPolicy,
	loaded: FxHashSet<PathBuf>,
}

impl SourceLoader {
	pub fn new(policy: ReloadPolicy) -> Self {
		Self {
			policy,
			loaded: FxHashSet::default(),
		}
	}

	pub fn policy(&self) -> &ReloadPolicy {
		&self.policy
	}

	/// Number of files recorded under the default strategy.
	pub fn loaded_count(&self) -> usize {
		self.loaded.len()
	}

	fn recognizes(path: &Path, extensions: &[&str]) -> bool {
		path.extension()
			.and_then(|ext| ext.to_str())
			.is_some_and(|ext| extensions.contains(&ext))
	}

	/// Decides what to do with `path` under the current strategy.
	///
	/// Canonicalization failures (missing file and friends) propagate as the
	/// platform reports them. Under always-reload the loaded set is neither
	/// consulted nor updated, so no canonicalization happens here either.
	pub(crate) fn plan(&self, path: &Path, extensions: &[&str]) -> std::io::Result<LoadPlan> {
		if !Self::recognizes(path, extensions) {
			tracing::trace!(path = %path.display(), "skipping file with unrecognized extension");
			return Ok(LoadPlan::Skip);
		}
		if self.policy.always_reload() {
			return Ok(LoadPlan::Execute {
				canonical: path.to_path_buf(),
			});
		}
		let canonical = std::fs::canonicalize(path)?;
		if self.loaded.contains(&canonical) {
			tracing::trace!(path = %canonical.display(), "source file already loaded");
			return Ok(LoadPlan::AlreadyLoaded);
		}
		Ok(LoadPlan::Execute { canonical })
	}

	/// Records a successful load. No-op under the legacy strategy so the set
	/// never influences later calls while it is active.
	pub(crate) fn record(&mut self, canonical: PathBuf) {
		if !self.policy.always_reload() {
			self.loaded.insert(canonical);
		}
	}
}
