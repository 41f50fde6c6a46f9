//! World composition: ordered capability providers merged into a fresh
//! per-scenario context.
//!
//! Providers register once, at load time, and are applied in registration
//! order every time [`WorldBuilder::build`] runs. Anonymous providers extend
//! the world root directly; namespaced providers extend a sub-object created
//! lazily on first use of the namespace and shared by every provider
//! registered under it. Member collisions resolve by overwrite, so the last
//! registration wins.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::SupportError;
use crate::site::RegistrationSite;

/// A single world member. Downcast through [`Namespace::get`].
pub type Member = Arc<dyn Any + Send + Sync>;

/// Named members contributed by one capability provider.
///
/// Insertion order is preserved so the merge pass is deterministic: when the
/// same name appears twice, the later value wins.
#[derive(Clone, Default)]
pub struct CapabilitySet {
	members: Vec<(Box<str>, Member)>,
}

impl CapabilitySet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
		self.insert(name, value);
		self
	}

	pub fn insert<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
		self.members.push((name.into().into_boxed_str(), Arc::new(value)));
	}

	pub fn is_empty(&self) -> bool {
		self.members.is_empty()
	}

	fn merge_into(&self, table: &mut FxHashMap<Box<str>, Member>) {
		for (name, value) in &self.members {
			table.insert(name.clone(), value.clone());
		}
	}
}

impl fmt::Debug for CapabilitySet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list()
			.entries(self.members.iter().map(|(name, _)| name))
			.finish()
	}
}

/// Produces a capability set when the world is built.
pub enum CapabilitySource {
	/// The literal capability set to mix in.
	Literal(CapabilitySet),
	/// Deferred constructor, run once per build. `None` is the null
	/// capability and fails the whole build.
	Procedure(Box<dyn Fn() -> Option<CapabilitySet> + Send + Sync>),
}

impl CapabilitySource {
	pub fn procedure(f: impl Fn() -> Option<CapabilitySet> + Send + Sync + 'static) -> Self {
		CapabilitySource::Procedure(Box::new(f))
	}

	fn produce(&self) -> Option<CapabilitySet> {
		match self {
			CapabilitySource::Literal(set) => Some(set.clone()),
			CapabilitySource::Procedure(f) => f(),
		}
	}
}

impl From<CapabilitySet> for CapabilitySource {
	fn from(set: CapabilitySet) -> Self {
		CapabilitySource::Literal(set)
	}
}

impl fmt::Debug for CapabilitySource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CapabilitySource::Literal(set) => f.debug_tuple("Literal").field(set).finish(),
			CapabilitySource::Procedure(_) => f.write_str("Procedure(..)"),
		}
	}
}

#[derive(Debug)]
enum EntryKind {
	Anonymous,
	Namespaced(Box<str>),
}

/// One registered capability provider. Immutable once recorded, never removed.
#[derive(Debug)]
struct BuilderEntry {
	kind: EntryKind,
	source: CapabilitySource,
	site: RegistrationSite,
}

/// A flat member table: the world root or one named sub-object.
#[derive(Default)]
pub struct Namespace {
	members: FxHashMap<Box<str>, Member>,
}

impl Namespace {
	pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<&T> {
		self.members.get(name).and_then(|member| member.downcast_ref::<T>())
	}

	pub fn has(&self, name: &str) -> bool {
		self.members.contains_key(name)
	}

	pub fn len(&self) -> usize {
		self.members.len()
	}

	pub fn is_empty(&self) -> bool {
		self.members.is_empty()
	}
}

impl fmt::Debug for Namespace {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_set().entries(self.members.keys()).finish()
	}
}

/// The per-scenario context object.
///
/// Exactly one world is live at a time; [`crate::Registry::begin_scenario`]
/// replaces it wholesale, never merges across scenarios.
#[derive(Debug, Default)]
pub struct World {
	root: Namespace,
	namespaces: FxHashMap<Box<str>, Namespace>,
}

impl World {
	/// Looks up a root member by name and concrete type.
	pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<&T> {
		self.root.get(name)
	}

	pub fn has(&self, name: &str) -> bool {
		self.root.has(name)
	}

	/// Looks up a member inside a namespace.
	pub fn get_in<T: Any + Send + Sync>(&self, namespace: &str, name: &str) -> Option<&T> {
		self.namespaces.get(namespace)?.get(name)
	}

	/// The sub-object for `name`, if any provider registered under it.
	pub fn namespace(&self, name: &str) -> Option<&Namespace> {
		self.namespaces.get(name)
	}

	pub fn is_empty(&self) -> bool {
		self.root.is_empty() && self.namespaces.is_empty()
	}
}

/// Registry of capability providers applied to every scenario's world.
#[derive(Debug, Default)]
pub struct WorldBuilder {
	entries: Vec<BuilderEntry>,
	anonymous_sites: Vec<RegistrationSite>,
}

impl WorldBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers the anonymous provider that extends the world root.
	///
	/// At most one may ever exist. A second attempt fails immediately with
	/// [`SupportError::MultipleWorldBuilders`] enumerating every anonymous
	/// registration site in order; the rejected provider is not recorded, but
	/// its site is, so later attempts enumerate all of them.
	pub fn register_anonymous(
		&mut self,
		source: impl Into<CapabilitySource>,
		site: RegistrationSite,
	) -> Result<(), SupportError> {
		self.anonymous_sites.push(site.clone());
		if self.anonymous_sites.len() > 1 {
			return Err(SupportError::MultipleWorldBuilders {
				sites: self.anonymous_sites.clone(),
			});
		}
		tracing::debug!(site = %site, "registered anonymous world builder");
		self.entries.push(BuilderEntry {
			kind: EntryKind::Anonymous,
			source: source.into(),
			site,
		});
		Ok(())
	}

	/// Registers a provider under `namespace`. Unlimited providers may share
	/// a namespace; all of them are applied.
	pub fn register_namespaced(
		&mut self,
		namespace: impl Into<String>,
		source: impl Into<CapabilitySource>,
		site: RegistrationSite,
	) {
		let namespace = namespace.into().into_boxed_str();
		tracing::debug!(namespace = %namespace, site = %site, "registered namespaced world builder");
		self.entries.push(BuilderEntry {
			kind: EntryKind::Namespaced(namespace),
			source: source.into(),
			site,
		});
	}

	/// Applies every registered provider, in registration order, to a fresh
	/// base world.
	///
	/// All-or-nothing: the first provider producing a null capability fails
	/// the call with [`SupportError::NilWorld`] naming that provider's
	/// registration site. Given the same registration sequence the result is
	/// always the same composition.
	pub fn build(&self) -> Result<World, SupportError> {
		let mut world = World::default();
		for entry in &self.entries {
			let set = entry.source.produce().ok_or_else(|| SupportError::NilWorld {
				site: entry.site.clone(),
			})?;
			match &entry.kind {
				EntryKind::Anonymous => set.merge_into(&mut world.root.members),
				EntryKind::Namespaced(name) => {
					let ns = world.namespaces.entry(name.clone()).or_default();
					set.merge_into(&mut ns.members);
				}
			}
		}
		tracing::trace!(
			providers = self.entries.len(),
			namespaces = world.namespaces.len(),
			"world built"
		);
		Ok(world)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
