use std::sync::Arc ;
use std::sync::atomic::{ AtomicBool, AtomicUsize, Ordering };
use parking_lot::Mutex ;
use plugin_space::{
	BoxError, ClassCatalog, ClassDef, Container, HostEnvironment, LoaderId, NoopPlugin, Plugin, PluginRecord, PluginState,
	PluginError, PluginStrategy, Qualifier, context,
};
use crate::fixture_archive::{ environment, strategy, write_archive };

trait Speaker: Send + Sync {
	fn speak( &self ) -> String ;
}

struct Welcome ;
impl Speaker for Welcome {
	fn speak( &self ) -> String { "welcome".to_string() }
}

/// What the entry point saw while it was being built and started.
#[derive( Default )]
struct Observed {
	context_loader: Mutex<Option<LoaderId>>,
	plugin: Mutex<Option<String>>,
	greeting: Mutex<Option<String>>,
	environment: Mutex<Option<HostEnvironment>>,
	started: AtomicBool,
	starts: AtomicUsize,
}

struct Entry {
	observed: Arc<Observed>,
	speaker: Arc<dyn Speaker>,
}

impl Plugin for Entry {
	fn set_environment( &self, environment: &HostEnvironment ) {
		*self.observed.environment.lock() = Some( environment.clone() );
	}
	fn start( &self ) -> Result<(), BoxError> {
		*self.observed.greeting.lock() = Some( self.speaker.speak() );
		self.observed.started.store( true, Ordering::SeqCst );
		self.observed.starts.fetch_add( 1, Ordering::SeqCst );
		Ok(())
	}
}

fn entry_class( observed: &Arc<Observed> ) -> ClassDef {
	let observed = Arc::clone( observed );
	ClassDef::new( "demo.Entry" ).provides::<dyn Plugin>( move | injector | {
		*observed.context_loader.lock() = context::current_id();
		*observed.plugin.lock() = injector.plugin().map(| plugin | plugin.short_name().to_string() );
		let speaker = injector.get_named::<dyn Speaker>( "welcome" )?;
		Ok( Arc::new( Entry { observed: Arc::clone( &observed ), speaker }) as Arc<dyn Plugin> )
	})
}

#[test]
fn entry_point_is_injected_and_started() {

	let dir = tempfile::tempdir().unwrap();
	let archive = write_archive( dir.path(), "demo", "plugin-class = \"demo.Entry\"" );

	let observed = Arc::new( Observed::default() );
	let container = Arc::new( Container::new() );
	container.bind_instance::<dyn Speaker>( Qualifier::named( "welcome" ), Arc::new( Welcome ));
	let strategy = strategy( &container, ClassCatalog::new().with( "demo", entry_class( &observed )));

	let record = strategy.create_plugin_wrapper( &archive ).unwrap();
	assert_eq!( record.state(), PluginState::Wrapped );
	assert!( record.instance().is_none() );

	if let Err( err ) = strategy.load( &record ) { panic!( "Unexpected error: {}", err ) }

	assert_eq!( record.state(), PluginState::Started );
	assert!( record.instance().is_some() );
	assert!( observed.started.load( Ordering::SeqCst ));
	assert_eq!( observed.greeting.lock().as_deref(), Some( "welcome" ));
	assert_eq!( *observed.context_loader.lock(), Some( record.class_loader().id() ));
	assert_eq!( observed.plugin.lock().as_deref(), Some( "demo" ));
	assert_eq!( observed.environment.lock().as_ref(), Some( &environment() ));
	assert_eq!( observed.environment.lock().as_ref().and_then(| env | env.property( "mode" ).map( str::to_string )), Some( "test".to_string() ));

	assert_eq!( context::current_id(), None );

}

#[test]
fn second_load_is_rejected() {

	let dir = tempfile::tempdir().unwrap();
	let archive = write_archive( dir.path(), "demo", "plugin-class = \"demo.Entry\"" );

	let observed = Arc::new( Observed::default() );
	let container = Arc::new( Container::new() );
	container.bind_instance::<dyn Speaker>( Qualifier::named( "welcome" ), Arc::new( Welcome ));
	let strategy = strategy( &container, ClassCatalog::new().with( "demo", entry_class( &observed )));

	let record = strategy.create_plugin_wrapper( &archive ).unwrap();
	strategy.load( &record ).unwrap();
	let instance = record.instance().unwrap();

	match strategy.load( &record ) {
		Err( PluginError::AlreadyLoaded { plugin, state }) => {
			assert_eq!( plugin, "demo (1.0)" );
			assert_eq!( state, PluginState::Started );
		}
		Err( err ) => panic!( "Unexpected error: {}", err ),
		Ok(()) => panic!( "Expected the second load to fail" ),
	}

	assert!( Arc::ptr_eq( &record.instance().unwrap(), &instance ));
	assert_eq!( observed.starts.load( Ordering::SeqCst ), 1 );
	assert_eq!( record.state(), PluginState::Started );
	assert_eq!( container.binding_count(), 2 );

}

#[test]
fn loaded_plugin_is_registered_and_attached() {

	let dir = tempfile::tempdir().unwrap();
	let archive = write_archive( dir.path(), "demo", "" );
	let container = Arc::new( Container::new() );
	let strategy = strategy( &container, ClassCatalog::new() );

	let record = strategy.create_plugin_wrapper( &archive ).unwrap();
	assert!( Arc::ptr_eq( &record.class_loader().plugin().unwrap(), &record ));
	assert!( container.plugin( "demo" ).is_none() );

	strategy.load( &record ).unwrap();
	assert!( Arc::ptr_eq( &container.plugin( "demo" ).unwrap(), &record ));
	assert!( Arc::ptr_eq( &container.get_named::<PluginRecord>( "demo" ).unwrap(), &record ));
	assert_eq!( container.plugins().len(), 1 );
	assert_eq!( record.to_string(), "demo (1.0)" );

}

#[test]
fn plugin_without_entry_point_gets_a_noop() {

	let dir = tempfile::tempdir().unwrap();
	let archive = write_archive( dir.path(), "quiet", "" );
	let container = Arc::new( Container::new() );
	let strategy = strategy( &container, ClassCatalog::new() );

	let record = strategy.create_plugin_wrapper( &archive ).unwrap();
	assert_eq!( record.plugin_class(), None );
	strategy.load( &record ).unwrap();

	assert_eq!( record.state(), PluginState::Started );
	let instance = record.instance().unwrap();
	assert!( instance.start().is_ok() );
	NoopPlugin.set_environment( &environment() );

}

#[test]
fn reloading_a_short_name_replaces_the_registration() {

	let first_dir = tempfile::tempdir().unwrap();
	let second_dir = tempfile::tempdir().unwrap();
	let container = Arc::new( Container::new() );
	let strategy = strategy( &container, ClassCatalog::new() );

	let first = strategy.create_plugin_wrapper( &write_archive( first_dir.path(), "demo", "" )).unwrap();
	let second = strategy.create_plugin_wrapper( &write_archive( second_dir.path(), "demo", "" )).unwrap();
	strategy.load( &first ).unwrap();
	strategy.load( &second ).unwrap();

	assert_eq!( container.plugins().len(), 1 );
	assert!( Arc::ptr_eq( &container.plugin( "demo" ).unwrap(), &second ));
	assert!( Arc::ptr_eq( &container.get_named::<PluginRecord>( "demo" ).unwrap(), &second ));
	assert_eq!( container.binding_count(), 1 );

}
