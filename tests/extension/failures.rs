use std::sync::Arc ;
use plugin_space::{ Container, ExtensionFinder, Qualifier, ResolveError, SpaceExtensionFinder };
use crate::fixture_space::{ Fixed, Greeter, init_tracing };

fn container_with_failing_extension() -> Arc<Container> {
	let container = Arc::new( Container::new() );
	container.bind_instance::<dyn Greeter>( Qualifier::named( "fine" ), Arc::new( Fixed( "fine".to_string() )));
	container.bind::<dyn Greeter>( Qualifier::named( "broken" ), | _ | Err( "provider exploded".into() ));
	container
}

#[test]
fn failing_provider_yields_no_extensions() {
	init_tracing();
	let finder = SpaceExtensionFinder::new( container_with_failing_extension() );
	assert!( finder.find::<dyn Greeter>().is_empty() );
}

#[test]
fn try_find_reports_the_failure() {
	let finder = SpaceExtensionFinder::new( container_with_failing_extension() );
	match finder.try_find::<dyn Greeter>() {
		Err( ResolveError::Provider { key, source, .. }) => {
			assert!( key.is::<dyn Greeter>() );
			assert_eq!( source.to_string(), "provider exploded" );
		}
		Err( err ) => panic!( "Unexpected error: {}", err ),
		Ok( found ) => panic!( "Expected failure, found {} extension(s)", found.len() ),
	}
}

#[test]
fn other_extension_types_are_unaffected() {
	let container = container_with_failing_extension();
	container.bind_instance::<str>( Qualifier::named( "label" ), Arc::from( "label" ));
	let finder = SpaceExtensionFinder::new( container );
	assert_eq!( &**finder.find::<str>()[0].instance(), "label" );
}
