//! Lifecycle hooks keyed by phase, filtered per scenario by tag predicates.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::site::RegistrationSite;
use crate::world::World;

/// Lifecycle phase a hook attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
	Before,
	After,
	Around,
	AfterStep,
}

/// Tag predicate evaluated against a scenario's tag names.
///
/// How tag expressions are parsed into one of these is the caller's business;
/// the registry only stores and exposes it.
pub type TagPredicate = Arc<dyn Fn(&[String]) -> bool + Send + Sync>;

/// Opaque hook action. Stored and handed back to the driver in query results;
/// this crate never invokes it.
pub type HookFn = Arc<dyn Fn(&World) + Send + Sync>;

/// An immutable registered hook.
pub struct Hook {
	phase: Phase,
	predicate: Option<TagPredicate>,
	action: HookFn,
	site: RegistrationSite,
}

impl Hook {
	pub fn phase(&self) -> Phase {
		self.phase
	}

	pub fn site(&self) -> &RegistrationSite {
		&self.site
	}

	pub fn action(&self) -> &HookFn {
		&self.action
	}

	/// Evaluates the tag predicate; hooks without one match every scenario.
	pub fn accepts_tags(&self, tags: &[String]) -> bool {
		match &self.predicate {
			Some(predicate) => predicate(tags),
			None => true,
		}
	}
}

impl fmt::Debug for Hook {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Hook")
			.field("phase", &self.phase)
			.field("tagged", &self.predicate.is_some())
			.field("site", &self.site)
			.finish()
	}
}

/// The narrow capability a scenario-like value implements to filter hooks.
///
/// Hooks and scenarios never otherwise reference each other's concrete type;
/// a typical implementation calls [`Hook::accepts_tags`] with its own tags.
pub trait ScenarioHooks {
	fn accept_hook(&self, hook: &Hook) -> bool;
}

/// Ordered hook storage per phase. Registration order is preserved and is the
/// order queries report.
#[derive(Debug, Default)]
pub struct HookRegistry {
	by_phase: FxHashMap<Phase, Vec<Arc<Hook>>>,
}

impl HookRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a hook to the sequence for `phase`.
	pub fn register(
		&mut self,
		phase: Phase,
		predicate: Option<TagPredicate>,
		action: HookFn,
		site: RegistrationSite,
	) {
		tracing::debug!(?phase, site = %site, "registered hook");
		self.by_phase.entry(phase).or_default().push(Arc::new(Hook {
			phase,
			predicate,
			action,
			site,
		}));
	}

	/// Hooks for `phase` the scenario accepts, in registration order.
	///
	/// `accept_hook` runs exactly once per registered hook, in registration
	/// order, with no short-circuiting across hooks. Queries never mutate or
	/// reorder the registry.
	pub fn hooks_for(&self, phase: Phase, scenario: &dyn ScenarioHooks) -> Vec<Arc<Hook>> {
		let Some(hooks) = self.by_phase.get(&phase) else {
			return Vec::new();
		};
		let mut selected = Vec::new();
		for hook in hooks {
			if scenario.accept_hook(hook) {
				selected.push(hook.clone());
			}
		}
		selected
	}

	pub fn len(&self, phase: Phase) -> usize {
		self.by_phase.get(&phase).map_or(0, Vec::len)
	}

	pub fn is_empty(&self) -> bool {
		self.by_phase.values().all(Vec::is_empty)
	}
}
