use std::path::{ Path, PathBuf };
use serde::Deserialize ;
use thiserror::Error ;

use crate::element::index_path ;



/// Runtime settings. Every field has a default, so an empty document is valid.
///
/// ```toml
/// index-prefix = "META-INF/annotations"
/// loop-warning-threshold = 9999
/// verbose-diagnostics = false
/// member-injection = true
/// ```
#[derive( Clone, Debug, PartialEq, Eq, Deserialize )]
#[serde( default, rename_all = "kebab-case", deny_unknown_fields )]
pub struct Config {
	/// Directory, inside every class root, that holds index resources.
	pub index_prefix: String,
	/// Number of internal steps a single index lookup may take before a warning is logged.
	pub loop_warning_threshold: usize,
	/// Log each plugin's state, classpath and dependencies as it is wrapped.
	pub verbose_diagnostics: bool,
	/// Allow [`Container::inject_members`]( crate::Container::inject_members ).
	pub member_injection: bool,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			index_prefix: crate::index::DEFAULT_INDEX_PREFIX.to_string(),
			loop_warning_threshold: 9999,
			verbose_diagnostics: false,
			member_injection: true,
		}
	}
}

#[derive( Debug, Error )]
pub enum ConfigError {
	#[error( "Failed to read config {}: {source}", path.display() )]
	Io { path: PathBuf, #[source] source: std::io::Error },
	#[error( "Invalid config: {0}" )]
	Parse( #[from] toml::de::Error ),
}

impl Config {

	/// # Errors
	/// Fails on malformed TOML or unknown keys.
	pub fn from_toml_str( source: &str ) -> Result<Self, ConfigError> {
		Ok( toml::from_str( source )? )
	}

	/// # Errors
	/// Fails if the file cannot be read or does not parse.
	pub fn load( path: impl AsRef<Path> ) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		std::fs::read_to_string( path )
			.map_err(| source | ConfigError::Io { path: path.to_path_buf(), source })
			.and_then(| source | Self::from_toml_str( &source ))
	}

	/// Resource path of the index for `kind`.
	pub fn index_resource( &self, kind: &str ) -> String {
		index_path( &self.index_prefix, kind )
	}

}
