use std::sync::Arc ;
use plugin_space::{ Bootstrap, BootstrapError, ClassDef, ClassRoot, Config, DeclaredElement, IndexError, ScanModule, nev };
use crate::fixture_space::{ Greeter, greeter_class, space, with_index, with_raw_index };

#[test]
fn components_are_bound_by_name_or_class_name() {

	let root = with_index( ClassRoot::new( "host" )
		.with_class( greeter_class( "app.Hello", "hello" ))
		.with_class( greeter_class( "app.Goodbye", "goodbye" )), "named", &[
		DeclaredElement::type_level( "app.Hello" ).with_value( "value", "hello" ),
		DeclaredElement::type_level( "app.Goodbye" ),
	]);

	let ( container, warnings ) = Bootstrap::default().bootstrap( ScanModule::new( nev![ root ])).unwrap();
	assert_no_warnings!( warnings );

	assert_eq!( container.get_named::<dyn Greeter>( "hello" ).unwrap().greet(), "hello" );
	assert_eq!( container.get_named::<dyn Greeter>( "app.Goodbye" ).unwrap().greet(), "goodbye" );
	assert!( container.get_named::<dyn Greeter>( "app.Hello" ).is_err() );
	// Two components plus the default finder.
	assert_eq!( container.binding_count(), 3 );
	assert!( container.class_space().is_some() );

	container.dispose();

}

#[test]
fn classes_providing_several_types_bind_each() {

	let multi = ClassDef::new( "app.Multi" )
		.provides::<dyn Greeter>(| _ | Ok( Arc::new( crate::fixture_space::Fixed( "multi".to_string() )) as Arc<dyn Greeter> ))
		.provides::<str>(| _ | Ok( Arc::from( "label" )));
	let root = with_index( ClassRoot::new( "host" ).with_class( multi ), "named", &[
		DeclaredElement::type_level( "app.Multi" ).with_value( "value", "multi" ),
	]);

	let ( container, warnings ) = Bootstrap::default().bootstrap( ScanModule::new( nev![ root ])).unwrap();
	assert_no_warnings!( warnings );
	assert_eq!( container.get_named::<dyn Greeter>( "multi" ).unwrap().greet(), "multi" );
	assert_eq!( &*container.get_named::<str>( "multi" ).unwrap(), "label" );

	container.dispose();

}

#[test]
fn parent_components_are_bound_too() {

	let host = space( nev![ with_index( ClassRoot::new( "host" ).with_class( greeter_class( "host.Base", "base" )), "named", &[
		DeclaredElement::type_level( "host.Base" ),
	])]);
	let extension = with_index( ClassRoot::new( "ext" ).with_class( greeter_class( "ext.Extra", "extra" )), "named", &[
		DeclaredElement::type_level( "ext.Extra" ),
	]);

	let ( container, warnings ) = Bootstrap::default().bootstrap( ScanModule::new( nev![ extension ]).with_parent( host )).unwrap();
	assert_no_warnings!( warnings );
	assert_eq!( container.get_named::<dyn Greeter>( "host.Base" ).unwrap().greet(), "base" );
	assert_eq!( container.get_named::<dyn Greeter>( "ext.Extra" ).unwrap().greet(), "extra" );

	container.dispose();

}

#[test]
fn corrupt_index_aborts_the_bootstrap() {
	let root = with_raw_index( ClassRoot::new( "host" ), "named", "{\"owner-type\":\"app.Hello\"}\n" );
	match Bootstrap::default().bootstrap( ScanModule::new( nev![ root ])) {
		Err( BootstrapError::Index( IndexError::Truncated { .. })) => {}
		Err( err ) => panic!( "Unexpected error: {}", err ),
		Ok( _ ) => panic!( "Expected failure" ),
	}
}

#[test]
fn custom_index_prefix_is_used() {

	let config = Config::from_toml_str( "index-prefix = \"components\"" ).unwrap();
	let root = ClassRoot::new( "host" )
		.with_class( greeter_class( "app.Hello", "hello" ))
		.with_resource( config.index_resource( "named" ), crate::fixture_space::index_bytes( &[ DeclaredElement::type_level( "app.Hello" )]));

	let ( container, warnings ) = Bootstrap::new( config ).bootstrap( ScanModule::new( nev![ root ])).unwrap();
	assert_no_warnings!( warnings );
	assert_eq!( container.get_named::<dyn Greeter>( "app.Hello" ).unwrap().greet(), "hello" );

	container.dispose();

}
