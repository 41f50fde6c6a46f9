//! Runtime support layer for a behavior-driven test runner.
//!
//! Three mechanisms are exercised together in every scenario run:
//!
//! - **[`SourceLoader`]** ingests step-definition source files at most once
//!   per registry lifetime, or on every call under the legacy always-reload
//!   strategy ([`ReloadPolicy`]).
//! - **[`WorldBuilder`]** composes the per-scenario context ([`World`]) from
//!   capability providers applied in registration order, anonymous or under a
//!   namespace, with last-registration-wins conflict resolution.
//! - **[`HookRegistry`]** stores lifecycle hooks per [`Phase`] and answers
//!   ordered, tag-filtered queries through the [`ScenarioHooks`] capability.
//!
//! [`Registry`] is the composition root the driver talks to: it routes
//! [`Registry::load_code_file`] through an opaque [`SourceExecutor`] whose
//! registrations land on the [`RegistrationSurface`], replaces the current
//! world on [`Registry::begin_scenario`], and delegates
//! [`Registry::hooks_for`]. Step matching, source discovery, and reporting
//! live in the driver, outside this crate.
//!
//! The model is single-threaded and synchronous: one driver processes one
//! scenario at a time, and callers running scenarios concurrently are
//! responsible for serializing access.

pub mod error;
pub mod hooks;
pub mod loader;
pub mod registry;
pub mod site;
pub mod surface;
pub mod world;

pub use error::{BoxError, LoadError, SupportError};
pub use hooks::{Hook, HookFn, HookRegistry, Phase, ScenarioHooks, TagPredicate};
pub use loader::{LoadAction, ReloadPolicy, SourceExecutor, SourceLoader};
pub use registry::Registry;
pub use site::RegistrationSite;
pub use surface::{RegistrationSurface, SupportSurface};
pub use world::{CapabilitySet, CapabilitySource, Member, Namespace, World, WorldBuilder};
