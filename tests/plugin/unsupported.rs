use std::sync::Arc ;
use plugin_space::{ ClassCatalog, Container, PluginStrategy };
use crate::fixture_archive::{ strategy, write_archive };

#[test]
#[should_panic( expected = "Unused operation" )]
fn component_initialisation_is_not_offered() {
	let dir = tempfile::tempdir().unwrap();
	let strategy = strategy( &Arc::new( Container::new() ), ClassCatalog::new() );
	let record = strategy.create_plugin_wrapper( &write_archive( dir.path(), "demo", "" )).unwrap();
	strategy.initialize_components( &record );
}
