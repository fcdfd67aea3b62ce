use std::collections::BTreeMap ;
use std::path::{ Path, PathBuf };

use crate::class::BoxError ;



/// Entry point of a plugin.
///
/// A plugin names the class implementing this trait in its manifest; the
/// strategy constructs it through the container, hands it the host
/// environment and then starts it. Plugins without an entry point get a
/// [`NoopPlugin`].
pub trait Plugin: Send + Sync + 'static {
	/// Called once, before [`start`]( Plugin::start ).
	fn set_environment( &self, _environment: &HostEnvironment ) {}

	/// # Errors
	/// A failure marks the plugin as failed.
	fn start( &self ) -> Result<(), BoxError> { Ok(()) }
}

/// Entry point used when a plugin declares none.
#[derive( Debug, Default, Clone, Copy )]
pub struct NoopPlugin ;

impl Plugin for NoopPlugin {}

/// What the host exposes to every plugin it starts.
#[derive( Clone, Debug, Default, PartialEq, Eq )]
pub struct HostEnvironment {
	root_dir: PathBuf,
	properties: BTreeMap<String, String>,
}

impl HostEnvironment {

	pub fn new( root_dir: impl Into<PathBuf> ) -> Self {
		Self { root_dir: root_dir.into(), properties: BTreeMap::new() }
	}

	pub fn with_property( mut self, key: impl Into<String>, value: impl Into<String> ) -> Self {
		self.properties.insert( key.into(), value.into() );
		self
	}

	#[inline] pub fn root_dir( &self ) -> &Path { &self.root_dir }
	pub fn property( &self, key: &str ) -> Option<&str> { self.properties.get( key ).map( String::as_str ) }
	#[inline] pub fn properties( &self ) -> &BTreeMap<String, String> { &self.properties }

}
