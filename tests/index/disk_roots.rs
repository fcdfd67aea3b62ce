use std::sync::Arc ;
use plugin_space::{ ClassLoader, ClassRoot, ClassSpace, Config, DeclaredElement, Indexable, SpaceIndex, nev };
use crate::fixture_space::{ Greeter, Greeting, greeter_class, index_bytes, with_index };

fn write_index_file( dir: &std::path::Path, elements: &[DeclaredElement] ) {
	let path = dir.join( Config::default().index_resource( Greeting::NAME ));
	std::fs::create_dir_all( path.parent().unwrap() ).unwrap();
	std::fs::write( path, index_bytes( elements )).unwrap();
}

#[test]
fn index_files_are_read_from_disk() {

	let dir = tempfile::tempdir().unwrap();
	write_index_file( dir.path(), &[ DeclaredElement::type_level( "a.OnDisk" ).with_value( "value", "disk" )]);

	let space: Arc<dyn ClassSpace> = Arc::new( ClassLoader::new(
		nev![ ClassRoot::new( dir.path() ).with_class( greeter_class( "a.OnDisk", "from disk" ))],
		None,
	));

	let index = SpaceIndex::<Greeting, dyn Greeter>::load( space ).unwrap();
	let items = index.iter().collect::<Result<Vec<_>, _>>().unwrap();

	assert_eq!( items.len(), 1 );
	assert_eq!( items[0].resource().root(), dir.path() );
	assert_eq!( items[0].annotation().unwrap().value.as_deref(), Some( "disk" ));
	assert_eq!( items[0].instance().unwrap().greet(), "from disk" );

}

#[test]
fn parent_entries_come_first() {

	let parent: Arc<dyn ClassSpace> = Arc::new( ClassLoader::new( nev![ with_index(
		ClassRoot::new( "host" ).with_class( greeter_class( "a.FromHost", "host" )),
		Greeting::NAME,
		&[ DeclaredElement::type_level( "a.FromHost" )],
	)], None ));

	let child: Arc<dyn ClassSpace> = Arc::new( ClassLoader::new( nev![ with_index(
		ClassRoot::new( "plugin" ).with_class( greeter_class( "a.FromPlugin", "plugin" )),
		Greeting::NAME,
		&[ DeclaredElement::type_level( "a.FromPlugin" ), DeclaredElement::type_level( "a.FromHost" )],
	)], Some( parent )));

	let index = SpaceIndex::<Greeting, dyn Greeter>::load( child ).unwrap();
	let greetings = index.iter().map(| item | item.unwrap().instance().unwrap().greet() ).collect::<Vec<_>>();
	assert_eq!( greetings, vec![ "host", "plugin" ]);

}

#[test]
fn custom_prefix_is_honoured() {

	let dir = tempfile::tempdir().unwrap();
	let config = Config::from_toml_str( "index-prefix = \"index\"" ).unwrap();
	std::fs::create_dir_all( dir.path().join( "index" )).unwrap();
	std::fs::write(
		dir.path().join( config.index_resource( Greeting::NAME )),
		index_bytes( &[ DeclaredElement::type_level( "a.Custom" )]),
	).unwrap();

	let space: Arc<dyn ClassSpace> = Arc::new( ClassLoader::new( nev![ ClassRoot::new( dir.path() )], None ));
	let index = SpaceIndex::<Greeting, ()>::with_config( space, &config ).unwrap();
	assert_eq!( index.iter().map(| item | item.unwrap().key().to_string() ).collect::<Vec<_>>(), vec![ "a.Custom" ]);

}
