use std::fmt::Write;

use crate::site::RegistrationSite;

/// Opaque executor failure, propagated without translation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Fatal world-composition errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SupportError {
	/// A second anonymous world builder was registered.
	#[error("{}", multiple_builders_message(.sites))]
	MultipleWorldBuilders { sites: Vec<RegistrationSite> },

	/// A world-construction procedure produced a null capability.
	#[error(
		"world procedure registered at {site} returned no capability; \
		 world-construction procedures must never return null"
	)]
	NilWorld { site: RegistrationSite },
}

/// Errors surfaced by [`Registry::load_code_file`](crate::Registry::load_code_file).
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
	/// Platform file errors (missing file, bad permissions) pass through.
	#[error(transparent)]
	Io(#[from] std::io::Error),

	/// Failure executing a loaded source file, unmodified.
	#[error("{0}")]
	Exec(BoxError),
}

fn multiple_builders_message(sites: &[RegistrationSite]) -> String {
	let mut msg = format!(
		"the anonymous world builder can only be registered once, but it was registered in {} places:\n",
		sites.len()
	);
	for site in sites {
		let _ = writeln!(msg, "  {site}");
	}
	msg.push_str("register additional extensions under a namespace instead of a second anonymous builder");
	msg
}
