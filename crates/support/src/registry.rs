//! Composition root owning the loader, the world builders, and the hooks.

use std::path::Path;
use std::sync::Arc;

use crate::error::{LoadError, SupportError};
use crate::hooks::{Hook, HookRegistry, Phase, ScenarioHooks};
use crate::loader::{LoadAction, LoadPlan, ReloadPolicy, SourceExecutor, SourceLoader};
use crate::surface::SupportSurface;
use crate::world::{World, WorldBuilder};

/// The driver-facing support registry.
///
/// Registered state (loaded files, world builders, hooks) persists for the
/// registry's lifetime and is never reset between scenarios; only the current
/// world is replaced per scenario.
pub struct Registry {
	loader: SourceLoader,
	worlds: WorldBuilder,
	hooks: HookRegistry,
	executor: Box<dyn SourceExecutor>,
	current_world: Option<World>,
}

impl Registry {
	pub fn new(policy: ReloadPolicy, executor: Box<dyn SourceExecutor>) -> Self {
		Self {
			loader: SourceLoader::new(policy),
			worlds: WorldBuilder::new(),
			hooks: HookRegistry::new(),
			executor,
			current_world: None,
		}
	}

	/// The shared reload policy handle the loader reads.
	pub fn reload_policy(&self) -> &ReloadPolicy {
		self.loader.policy()
	}

	/// Registration surface for driver-side registrations (builtins, tests).
	/// Executed source files get the same surface during
	/// [`load_code_file`](Self::load_code_file).
	pub fn surface(&mut self) -> SupportSurface<'_> {
		SupportSurface {
			worlds: &mut self.worlds,
			hooks: &mut self.hooks,
		}
	}

	/// Loads one step-definition source file.
	///
	/// Paths with an unrecognized extension are skipped silently. Under the
	/// default strategy a canonical path executes at most once per registry
	/// lifetime; under always-reload every call re-executes the file. The
	/// path is recorded only after a successful execution, so a file that
	/// failed stays eligible for another attempt.
	pub fn load_code_file(&mut self, path: &Path) -> Result<LoadAction, LoadError> {
		let canonical = match self.loader.plan(path, self.executor.extensions())? {
			LoadPlan::Skip => return Ok(LoadAction::Skipped),
			LoadPlan::AlreadyLoaded => return Ok(LoadAction::AlreadyLoaded),
			LoadPlan::Execute { canonical } => canonical,
		};
		let source = std::fs::read_to_string(path)?;
		tracing::debug!(path = %path.display(), "executing source file");
		let mut surface = SupportSurface {
			worlds: &mut self.worlds,
			hooks: &mut self.hooks,
		};
		self.executor
			.execute(path, &source, &mut surface)
			.map_err(LoadError::Exec)?;
		self.loader.record(canonical);
		Ok(LoadAction::Executed)
	}

	/// Number of source files recorded as loaded under the default strategy.
	pub fn loaded_file_count(&self) -> usize {
		self.loader.loaded_count()
	}

	/// Builds and installs the world for the scenario about to run.
	///
	/// On failure the previously installed world (if any) stays in place and
	/// the error surfaces unchanged; no partial world is ever installed.
	pub fn begin_scenario(&mut self) -> Result<&World, SupportError> {
		let world = self.worlds.build()?;
		Ok(self.current_world.insert(world))
	}

	/// The most recently built world, or `None` before the first scenario.
	pub fn current_world(&self) -> Option<&World> {
		self.current_world.as_ref()
	}

	/// Applicable hooks for `phase`, in registration order.
	pub fn hooks_for(&self, phase: Phase, scenario: &dyn ScenarioHooks) -> Vec<Arc<Hook>> {
		self.hooks.hooks_for(phase, scenario)
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;
	use std::path::PathBuf;
	use std::rc::Rc;

	use super::*;
	use crate::error::BoxError;
	use crate::site::RegistrationSite;
	use crate::surface::RegistrationSurface;
	use crate::world::{CapabilitySet, CapabilitySource};

	/// Records every execution and replays simple registration directives,
	/// one per line:
	///
	/// - `world NAME=VALUE` registers the anonymous builder
	/// - `world_in NS NAME=VALUE` registers a namespaced builder
	/// - `hook before @TAG` registers a tagged Before hook
	/// - `fail` aborts execution
	struct ScriptExecutor {
		log: Rc<RefCell<Vec<(PathBuf, String)>>>,
	}

	impl ScriptExecutor {
		fn new() -> (Self, Rc<RefCell<Vec<(PathBuf, String)>>>) {
			let log = Rc::new(RefCell::new(Vec::new()));
			(Self { log: log.clone() }, log)
		}
	}

	impl SourceExecutor for ScriptExecutor {
		fn extensions(&self) -> &[&str] {
			&["steps"]
		}

		fn execute(
			&mut self,
			path: &Path,
			source: &str,
			surface: &mut dyn RegistrationSurface,
		) -> Result<(), BoxError> {
			self.log.borrow_mut().push((path.to_path_buf(), source.to_owned()));
			for (lineno, line) in source.lines().enumerate() {
				let site =
					RegistrationSite::with_line(path.display().to_string(), lineno as u32 + 1);
				let mut words = line.split_whitespace();
				match words.next() {
					Some("world") => {
						let (name, value) = parse_member(words.next());
						surface.world(CapabilitySet::new().with(name, value).into(), site)?;
					}
					Some("world_in") => {
						let ns = words.next().unwrap_or_default().to_owned();
						let (name, value) = parse_member(words.next());
						surface.world_in(&ns, CapabilitySet::new().with(name, value).into(), site);
					}
					Some("hook") => {
						let _phase = words.next();
						let tag = words.next().unwrap_or_default().to_owned();
						surface.hook(
							Phase::Before,
							Some(Arc::new(move |tags: &[String]| {
								tags.iter().any(|t| *t == tag)
							})),
							Arc::new(|_world| {}),
							site,
						);
					}
					Some("fail") => return Err("scripted failure".into()),
					_ => {}
				}
			}
			Ok(())
		}
	}

	fn parse_member(word: Option<&str>) -> (String, String) {
		let word = word.unwrap_or_default();
		match word.split_once('=') {
			Some((name, value)) => (name.to_owned(), value.to_owned()),
			None => (word.to_owned(), String::new()),
		}
	}

	struct AcceptAll;

	impl ScenarioHooks for AcceptAll {
		fn accept_hook(&self, _hook: &Hook) -> bool {
			true
		}
	}

	struct TaggedScenario(Vec<String>);

	impl ScenarioHooks for TaggedScenario {
		fn accept_hook(&self, hook: &Hook) -> bool {
			hook.accepts_tags(&self.0)
		}
	}

	fn registry() -> (Registry, Rc<RefCell<Vec<(PathBuf, String)>>>) {
		let (executor, log) = ScriptExecutor::new();
		(Registry::new(ReloadPolicy::default(), Box::new(executor)), log)
	}

	#[test]
	fn default_strategy_keeps_the_first_loads_effect() {
		let dir = tempfile::tempdir().expect("temp dir");
		let path = dir.path().join("env.steps");
		let (mut registry, log) = registry();

		std::fs::write(&path, "world answer=one").expect("write");
		assert_eq!(registry.load_code_file(&path).expect("load"), LoadAction::Executed);

		std::fs::write(&path, "world answer=two").expect("write");
		assert_eq!(registry.load_code_file(&path).expect("load"), LoadAction::AlreadyLoaded);
		assert_eq!(registry.load_code_file(&path).expect("load"), LoadAction::AlreadyLoaded);

		let log = log.borrow();
		assert_eq!(log.len(), 1);
		assert_eq!(log[0].1, "world answer=one");
	}

	#[test]
	fn legacy_strategy_takes_the_last_loads_effect() {
		let dir = tempfile::tempdir().expect("temp dir");
		let path = dir.path().join("env.steps");
		let (executor, log) = ScriptExecutor::new();
		let mut registry = Registry::new(ReloadPolicy::new(true), Box::new(executor));

		std::fs::write(&path, "world_in Deck cards=52").expect("write");
		registry.load_code_file(&path).expect("load");
		std::fs::write(&path, "world_in Deck cards=54").expect("write");
		registry.load_code_file(&path).expect("load");

		assert_eq!(log.borrow().len(), 2);

		// Both executions registered a builder; the later one wins the member.
		let world = registry.begin_scenario().expect("world");
		assert_eq!(
			world.get_in::<String>("Deck", "cards").map(String::as_str),
			Some("54")
		);
	}

	#[test]
	fn unrecognized_extension_never_executes() {
		let dir = tempfile::tempdir().expect("temp dir");
		let path = dir.path().join("notes.txt");
		std::fs::write(&path, "world ignored=yes").expect("write");

		let (mut registry, log) = registry();
		assert_eq!(registry.load_code_file(&path).expect("load"), LoadAction::Skipped);

		registry.reload_policy().set_always_reload(true);
		assert_eq!(registry.load_code_file(&path).expect("load"), LoadAction::Skipped);
		assert!(log.borrow().is_empty());
	}

	#[test]
	fn missing_file_surfaces_the_io_error() {
		let (mut registry, _log) = registry();
		let err = registry
			.load_code_file(Path::new("/no/such/env.steps"))
			.expect_err("missing file");
		assert!(matches!(err, LoadError::Io(_)));
	}

	#[test]
	fn failed_execution_is_not_recorded_as_loaded() {
		let dir = tempfile::tempdir().expect("temp dir");
		let path = dir.path().join("env.steps");
		let (mut registry, log) = registry();

		std::fs::write(&path, "fail").expect("write");
		let err = registry.load_code_file(&path).expect_err("scripted failure");
		assert!(matches!(err, LoadError::Exec(_)));
		assert_eq!(registry.loaded_file_count(), 0);

		// The fixed file loads on the next attempt.
		std::fs::write(&path, "world answer=42").expect("write");
		assert_eq!(registry.load_code_file(&path).expect("load"), LoadAction::Executed);
		assert_eq!(registry.loaded_file_count(), 1);
		assert_eq!(log.borrow().len(), 2);
	}

	#[test]
	fn registrations_survive_a_mid_run_policy_flip() {
		let dir = tempfile::tempdir().expect("temp dir");
		let path = dir.path().join("env.steps");
		std::fs::write(&path, "hook before @wip").expect("write");
		let (mut registry, log) = registry();

		registry.load_code_file(&path).expect("load");
		registry.reload_policy().set_always_reload(true);
		registry.load_code_file(&path).expect("load");
		assert_eq!(log.borrow().len(), 2);

		// Flipping back consults the set recorded before the flip.
		registry.reload_policy().set_always_reload(false);
		assert_eq!(registry.load_code_file(&path).expect("load"), LoadAction::AlreadyLoaded);
	}

	#[test]
	fn begin_scenario_builds_and_installs_the_world() {
		let (mut registry, _log) = registry();
		assert!(registry.current_world().is_none());

		registry.surface().world_in(
			"Kitchen",
			CapabilitySet::new().with("plates", 6_i32).into(),
			RegistrationSite::new("builtin"),
		);

		let world = registry.begin_scenario().expect("world");
		assert_eq!(world.get_in::<i32>("Kitchen", "plates"), Some(&6));
		assert!(registry.current_world().is_some());
	}

	#[test]
	fn each_scenario_gets_a_replacement_world() {
		let (mut registry, _log) = registry();
		registry.surface().world(
			CapabilitySet::new().with("counter", 0_i32).into(),
			RegistrationSite::new("builtin"),
		).expect("anonymous registration");

		registry.begin_scenario().expect("first world");
		registry.begin_scenario().expect("second world");
		// Fresh base object per scenario, not a merge of the previous one.
		assert_eq!(
			registry.current_world().and_then(|w| w.get::<i32>("counter")),
			Some(&0)
		);
	}

	#[test]
	fn failed_begin_scenario_leaves_the_previous_world_installed() {
		let (mut registry, _log) = registry();
		registry.surface().world_in(
			"Stable",
			CapabilitySet::new().with("horses", 3_i32).into(),
			RegistrationSite::new("builtin"),
		);
		registry.begin_scenario().expect("first world");

		registry.surface().world_in(
			"Broken",
			CapabilitySource::procedure(|| None),
			RegistrationSite::new("broken"),
		);
		let err = registry.begin_scenario().expect_err("null capability");
		assert!(matches!(err, SupportError::NilWorld { .. }));

		let world = registry.current_world().expect("previous world still installed");
		assert_eq!(world.get_in::<i32>("Stable", "horses"), Some(&3));
		assert!(world.namespace("Broken").is_none());
	}

	#[test]
	fn multiple_anonymous_builders_fail_during_file_execution() {
		let dir = tempfile::tempdir().expect("temp dir");
		let path = dir.path().join("env.steps");
		std::fs::write(&path, "world a=1\nworld b=2").expect("write");
		let (mut registry, _log) = registry();

		let err = registry.load_code_file(&path).expect_err("duplicate anonymous builder");
		let inner = match err {
			LoadError::Exec(inner) => inner,
			other => panic!("expected executor failure, got {other:?}"),
		};
		let msg = inner.to_string();
		assert!(msg.contains("2 places"));
		assert!(msg.contains("env.steps:1"));
		assert!(msg.contains("env.steps:2"));
	}

	#[test]
	fn hooks_registered_from_files_filter_by_scenario_tags() {
		let dir = tempfile::tempdir().expect("temp dir");
		let path = dir.path().join("hooks.steps");
		std::fs::write(&path, "hook before @fish\nhook before @meat").expect("write");
		let (mut registry, _log) = registry();
		registry.load_code_file(&path).expect("load");

		let fishy = TaggedScenario(vec!["@fish".to_owned()]);
		let hooks = registry.hooks_for(Phase::Before, &fishy);
		assert_eq!(hooks.len(), 1);
		assert!(hooks[0].site().label().ends_with("hooks.steps"));
		assert_eq!(hooks[0].site().line(), Some(1));

		let all = registry.hooks_for(Phase::Before, &AcceptAll);
		assert_eq!(all.len(), 2);
		assert_eq!(all[0].site().line(), Some(1));
		assert_eq!(all[1].site().line(), Some(2));
	}
}
