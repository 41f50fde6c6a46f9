//! The registration surface executed source files mutate through.
//!
//! These are the only mutation entry points the support core exposes; the
//! rest of [`crate::Registry`] is driver-facing and read-only with respect to
//! registered state.

use crate::error::SupportError;
use crate::hooks::{HookFn, HookRegistry, Phase, TagPredicate};
use crate::site::RegistrationSite;
use crate::world::{CapabilitySource, WorldBuilder};

/// Registration calls available while a source file executes.
pub trait RegistrationSurface {
	/// Declares the anonymous world builder. At most one may ever exist.
	fn world(
		&mut self,
		source: CapabilitySource,
		site: RegistrationSite,
	) -> Result<(), SupportError>;

	/// Declares a world builder under `namespace`.
	fn world_in(&mut self, namespace: &str, source: CapabilitySource, site: RegistrationSite);

	/// Declares a lifecycle hook with an optional tag predicate.
	fn hook(
		&mut self,
		phase: Phase,
		predicate: Option<TagPredicate>,
		action: HookFn,
		site: RegistrationSite,
	);
}

/// Surface implementation borrowing the registry's mutable state.
pub struct SupportSurface<'a> {
	pub(crate) worlds: &'a mut WorldBuilder,
	pub(crate) hooks: &'a mut HookRegistry,
}

impl RegistrationSurface for SupportSurface<'_> {
	fn world(
		&mut self,
		source: CapabilitySource,
		site: RegistrationSite,
	) -> Result<(), SupportError> {
		self.worlds.register_anonymous(source, site)
	}

	fn world_in(&mut self, namespace: &str, source: CapabilitySource, site: RegistrationSite) {
		self.worlds.register_namespaced(namespace, source, site);
	}

	fn hook(
		&mut self,
		phase: Phase,
		predicate: Option<TagPredicate>,
		action: HookFn,
		site: RegistrationSite,
	) {
		self.hooks.register(phase, predicate, action, site);
	}
}
