use std::fmt;

/// Where a registration call came from.
///
/// A lightweight token captured at every registration and rendered into
/// diagnostics, instead of relying on stack introspection at error time. The
/// label is whatever the registering caller supplies: for file-driven
/// registrations the executor passes the source path, for Rust-side
/// registrations the [`site!`](crate::site!) macro captures `file!()` and
/// `line!()`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistrationSite {
	label: Box<str>,
	line: Option<u32>,
}

impl RegistrationSite {
	pub fn new(label: impl Into<String>) -> Self {
		Self {
			label: label.into().into_boxed_str(),
			line: None,
		}
	}

	pub fn with_line(label: impl Into<String>, line: u32) -> Self {
		Self {
			label: label.into().into_boxed_str(),
			line: Some(line),
		}
	}

	pub fn label(&self) -> &str {
		&self.label
	}

	pub fn line(&self) -> Option<u32> {
		self.line
	}
}

impl fmt::Display for RegistrationSite {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.line {
			Some(line) => write!(f, "{}:{line}", self.label),
			None => f.write_str(&self.label),
		}
	}
}

/// Captures the current Rust source location as a [`RegistrationSite`].
#[macro_export]
macro_rules! site {
	() => {
		$crate::RegistrationSite::with_line(file!(), line!())
	};
}
