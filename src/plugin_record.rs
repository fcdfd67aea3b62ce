use std::path::{ Path, PathBuf };
use std::sync::{ Arc, OnceLock };
use parking_lot::Mutex ;
use serde::{ Deserialize, Serialize };
use tracing::trace ;

use crate::class_loader::ClassLoader ;
use crate::plugin::Plugin ;



/// Lifecycle of a plugin. Any state after `Discovered` may move to `Failed`.
#[derive( Copy, Clone, Debug, Eq, PartialEq, Hash )]
pub enum PluginState {
	Discovered,
	ClassLoaderCreated,
	Wrapped,
	Registered,
	Instantiated,
	Started,
	Failed,
}

impl std::fmt::Display for PluginState {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.write_str( match self {
			Self::Discovered => "discovered",
			Self::ClassLoaderCreated => "class-loader-created",
			Self::Wrapped => "wrapped",
			Self::Registered => "registered",
			Self::Instantiated => "instantiated",
			Self::Started => "started",
			Self::Failed => "failed",
		})
	}
}

/// A dependency on another plugin, as declared in a manifest.
#[derive( Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize )]
pub struct Dependency {
	#[serde( rename = "name" )]
	pub short_name: String,
	pub version: String,
	#[serde( default )]
	pub optional: bool,
}

impl std::fmt::Display for Dependency {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		write!( f, "{} ({})", self.short_name, self.version )
	}
}

#[derive( Copy, Clone, Debug, Default, PartialEq, Eq )]
pub struct PluginFlags {
	pub active: bool,
	pub enabled: bool,
	pub pinned: bool,
	pub downgradable: bool,
}

/// Everything an archive strategy learns about a plugin before wrapping it.
#[derive( Clone, Debug )]
pub struct PluginDescriptor {
	pub archive: PathBuf,
	pub short_name: String,
	pub version: String,
	/// Entry-point class; `None` means the plugin has no entry point.
	pub plugin_class: Option<String>,
	pub dependencies: Vec<Dependency>,
	pub flags: PluginFlags,
}

/// A wrapped plugin: its metadata, its isolated class loader, its lifecycle
/// state and, once loaded, its entry-point instance.
pub struct PluginRecord {
	archive: PathBuf,
	short_name: String,
	version: String,
	plugin_class: Option<String>,
	class_loader: Arc<ClassLoader>,
	dependencies: Vec<Dependency>,
	optional_dependencies: Vec<Dependency>,
	flags: Mutex<PluginFlags>,
	state: Mutex<PluginState>,
	instance: OnceLock<Arc<dyn Plugin>>,
}

impl PluginRecord {

	pub fn new( descriptor: PluginDescriptor, class_loader: Arc<ClassLoader> ) -> Self {
		let ( optional_dependencies, dependencies ): ( Vec<_>, Vec<_> ) = descriptor.dependencies.into_iter()
			.partition(| dependency | dependency.optional );
		Self {
			archive: descriptor.archive,
			short_name: descriptor.short_name,
			version: descriptor.version,
			plugin_class: descriptor.plugin_class,
			class_loader,
			dependencies,
			optional_dependencies,
			flags: Mutex::new( descriptor.flags ),
			state: Mutex::new( PluginState::Wrapped ),
			instance: OnceLock::new(),
		}
	}

	#[inline] pub fn archive( &self ) -> &Path { &self.archive }
	#[inline] pub fn short_name( &self ) -> &str { &self.short_name }
	#[inline] pub fn version( &self ) -> &str { &self.version }
	#[inline] pub fn plugin_class( &self ) -> Option<&str> { self.plugin_class.as_deref() }
	#[inline] pub fn class_loader( &self ) -> &Arc<ClassLoader> { &self.class_loader }
	#[inline] pub fn dependencies( &self ) -> &[Dependency] { &self.dependencies }
	#[inline] pub fn optional_dependencies( &self ) -> &[Dependency] { &self.optional_dependencies }

	pub fn flags( &self ) -> PluginFlags { *self.flags.lock() }
	pub fn is_active( &self ) -> bool { self.flags.lock().active }
	pub fn set_active( &self, active: bool ) { self.flags.lock().active = active }

	pub fn state( &self ) -> PluginState { *self.state.lock() }

	pub(crate) fn set_state( &self, state: PluginState ) {
		let previous = std::mem::replace( &mut *self.state.lock(), state );
		trace!( "Plugin {} moved from {} to {}", self.short_name, previous, state );
	}

	/// Moves a `Wrapped` plugin to `Registered`. Any other state is left as it
	/// is and returned, so a plugin is only ever loaded once.
	pub(crate) fn claim_for_load( &self ) -> Result<(), PluginState> {
		let mut state = self.state.lock();
		match *state {
			PluginState::Wrapped => {
				*state = PluginState::Registered ;
				trace!( "Plugin {} moved from {} to {}", self.short_name, PluginState::Wrapped, PluginState::Registered );
				Ok(())
			}
			other => Err( other ),
		}
	}

	/// The entry-point instance, once the plugin has been instantiated.
	pub fn instance( &self ) -> Option<Arc<dyn Plugin>> { self.instance.get().cloned() }

	pub(crate) fn set_instance( &self, instance: Arc<dyn Plugin> ) -> bool {
		let stored = self.instance.set( instance ).is_ok();
		if stored { self.set_state( PluginState::Instantiated ) }
		stored
	}

}

impl std::fmt::Display for PluginRecord {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		write!( f, "{} ({})", self.short_name, self.version )
	}
}

impl std::fmt::Debug for PluginRecord {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "PluginRecord" )
			.field( "short_name", &self.short_name )
			.field( "version", &self.version )
			.field( "archive", &self.archive )
			.field( "plugin_class", &self.plugin_class )
			.field( "loader", &self.class_loader.id() )
			.field( "state", &self.state() )
			.finish_non_exhaustive()
	}
}
