//! Wrapping and loading plugins.
//!
//! Loading a plugin registers it with the container, then instantiates and
//! starts its entry point with the plugin's own loader installed as the
//! thread's context loader. The previous context loader is restored before
//! `load` returns, whatever the outcome. Panics raised by plugin code are
//! caught and reported as load or start failures.

use std::any::Any ;
use std::panic::{ catch_unwind, AssertUnwindSafe };
use std::path::{ Path, PathBuf };
use std::sync::Arc ;
use thiserror::Error ;
use tracing::{ debug, trace, Level };

use crate::archive::ArchiveError ;
use crate::class::BoxError ;
use crate::class_loader::ClassSpace ;
use crate::config::Config ;
use crate::container::Container ;
use crate::context ;
use crate::plugin::{ HostEnvironment, NoopPlugin, Plugin };
use crate::plugin_record::{ PluginRecord, PluginState };
use crate::wrapper_factory::PluginWrapperFactory ;



#[derive( Debug, Error )]
pub enum PluginError {
	#[error( "Failed to create plugin wrapper for {}: {source}", archive.display() )]
	FailedToCreateWrapper { archive: PathBuf, #[source] source: ArchiveError },
	#[error( "Failed to load plugin instance for: {plugin}" )]
	FailedToLoadInstance { plugin: String, #[source] source: BoxError },
	#[error( "Failed to start plugin: {plugin}" )]
	FailedToStart { plugin: String, #[source] source: BoxError },
	#[error( "Plugin {plugin} cannot be loaded again; it is already {state}" )]
	AlreadyLoaded { plugin: String, state: PluginState },
}

/// A panic raised by plugin code.
#[derive( Debug, Error )]
#[error( "plugin code panicked: {0}" )]
pub struct PluginPanic( pub String );

impl PluginPanic {
	fn from_payload( payload: &( dyn Any + Send )) -> Self {
		let message = payload.downcast_ref::<&str>().map( ToString::to_string )
			.or_else(|| payload.downcast_ref::<String>().cloned() )
			.unwrap_or_else(|| "<non-string panic payload>".to_string() );
		Self( message )
	}
}

fn isolate_panics<T>( body: impl FnOnce() -> Result<T, BoxError> ) -> Result<T, BoxError> {
	match catch_unwind( AssertUnwindSafe( body )) {
		Ok( result ) => result,
		Err( payload ) => Err( Box::new( PluginPanic::from_payload( &*payload ))),
	}
}

/// How plugins are turned from archives into running instances.
pub trait PluginStrategy {

	/// # Errors
	/// Fails if the archive cannot be read.
	fn create_plugin_wrapper( &self, archive: &Path ) -> Result<Arc<PluginRecord>, PluginError>;

	/// # Errors
	/// Fails if the entry point cannot be instantiated or fails to start, or
	/// if the plugin has been loaded before.
	fn load( &self, plugin: &Arc<PluginRecord> ) -> Result<(), PluginError>;

	/// Component discovery happens through the index, so per-plugin
	/// component initialisation is not an operation this strategy offers.
	///
	/// # Panics
	/// Always.
	fn initialize_components( &self, plugin: &PluginRecord );

}

/// Loads plugins into a shared [`Container`].
pub struct SpacePluginStrategy {
	container: Arc<Container>,
	factory: PluginWrapperFactory,
	environment: HostEnvironment,
	verbose: bool,
}

impl SpacePluginStrategy {

	pub fn new( container: Arc<Container>, factory: PluginWrapperFactory, environment: HostEnvironment, config: &Config ) -> Self {
		Self { container, factory, environment, verbose: config.verbose_diagnostics }
	}

	#[inline] pub fn container( &self ) -> &Arc<Container> { &self.container }
	#[inline] pub fn environment( &self ) -> &HostEnvironment { &self.environment }

	fn instantiate( &self, plugin: &Arc<PluginRecord> ) -> Result<Arc<dyn Plugin>, PluginError> {
		let Some( class_name ) = plugin.plugin_class() else {
			trace!( "Plugin {} has no entry point", plugin );
			return Ok( Arc::new( NoopPlugin ))
		};
		let injector = self.container.injector( plugin );
		let instance = isolate_panics(|| -> Result<Arc<dyn Plugin>, BoxError> {
			let class = plugin.class_loader().load_class( class_name )?;
			Ok( injector.instantiate::<dyn Plugin>( &class )? )
		}).map_err(| source | PluginError::FailedToLoadInstance { plugin: plugin.to_string(), source })?;
		trace!( "Instantiated {} for {}", class_name, plugin );
		Ok( instance )
	}

	fn start( &self, plugin: &PluginRecord, instance: &Arc<dyn Plugin> ) -> Result<(), PluginError> {
		debug!( "Starting plugin {}", plugin );
		isolate_panics(|| {
			instance.set_environment( &self.environment );
			instance.start()
		}).map_err(| source | PluginError::FailedToStart { plugin: plugin.to_string(), source })
	}

	fn log_details( &self, plugin: &PluginRecord ) {
		if !self.verbose || !tracing::enabled!( Level::DEBUG ) { return }
		let flags = plugin.flags();
		debug!( "Loaded plugin: {}", plugin );
		debug!( "  State: active={}, enabled={}, pinned={}, downgradable={}", flags.active, flags.enabled, flags.pinned, flags.downgradable );

		let classpath = plugin.class_loader().classpath();
		if classpath.len() > 1 {
			let full_paths = tracing::enabled!( Level::TRACE );
			debug!( "  Classpath:" );
			for entry in classpath.iter().skip( 1 ) {
				match full_paths {
					true => debug!( "    {}", entry.display() ),
					false => debug!( "    {}", entry.file_name().map_or_else(|| entry.display().to_string(), | name | name.to_string_lossy().into_owned() )),
				}
			}
		}

		if !plugin.dependencies().is_empty() {
			debug!( "  Dependencies:" );
			for dependency in plugin.dependencies() { debug!( "    {}", dependency ) }
		}
		if !plugin.optional_dependencies().is_empty() {
			debug!( "  Optional dependencies:" );
			for dependency in plugin.optional_dependencies() { debug!( "    {}", dependency ) }
		}
	}

}

impl PluginStrategy for SpacePluginStrategy {

	fn create_plugin_wrapper( &self, archive: &Path ) -> Result<Arc<PluginRecord>, PluginError> {
		let plugin = self.factory.create( archive )
			.map_err(| source | PluginError::FailedToCreateWrapper { archive: archive.to_path_buf(), source })?;
		self.log_details( &plugin );
		Ok( plugin )
	}

	fn load( &self, plugin: &Arc<PluginRecord> ) -> Result<(), PluginError> {
		plugin.claim_for_load()
			.map_err(| state | PluginError::AlreadyLoaded { plugin: plugin.to_string(), state })?;
		debug!( "Configuring plugin {}", plugin );
		self.container.register( Arc::clone( plugin ));

		let _context = context::enter( Arc::clone( plugin.class_loader() ));
		let result = self.instantiate( plugin ).and_then(| instance | match plugin.set_instance( Arc::clone( &instance )) {
			true => self.start( plugin, &instance ),
			false => Err( PluginError::AlreadyLoaded { plugin: plugin.to_string(), state: plugin.state() }),
		});
		plugin.set_state( match result {
			Ok(()) => PluginState::Started,
			Err( _ ) => PluginState::Failed,
		});
		result
	}

	fn initialize_components( &self, _plugin: &PluginRecord ) {
		panic!( "Unused operation" )
	}

}

impl std::fmt::Debug for SpacePluginStrategy {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "SpacePluginStrategy" )
			.field( "factory", &self.factory )
			.field( "environment", &self.environment )
			.field( "verbose", &self.verbose )
			.finish_non_exhaustive()
	}
}
