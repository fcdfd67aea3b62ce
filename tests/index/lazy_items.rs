use std::sync::Arc ;
use std::sync::atomic::{ AtomicUsize, Ordering };
use plugin_space::{ ClassDef, ClassRoot, DeclaredElement, ElementHandle, ElementKind, Indexable, InstantiationError, SpaceIndex, nev };
use crate::fixture_space::{ Fixed, Greeter, Greeting, greeter_class, space, with_index };

fn counting_class( name: &str, constructed: &Arc<AtomicUsize> ) -> ClassDef {
	let constructed = Arc::clone( constructed );
	ClassDef::new( name ).provides::<dyn Greeter>( move | _ | {
		constructed.fetch_add( 1, Ordering::SeqCst );
		Ok( Arc::new( Fixed( "counted".to_string() )) as Arc<dyn Greeter> )
	})
}

#[test]
fn instances_are_created_on_demand_and_cached() {

	let constructed = Arc::new( AtomicUsize::new( 0 ));
	let space = space( nev![ with_index(
		ClassRoot::new( "r" ).with_class( counting_class( "a.Counted", &constructed )),
		Greeting::NAME,
		&[ DeclaredElement::type_level( "a.Counted" )],
	)]);

	let index = SpaceIndex::<Greeting, dyn Greeter>::load( space ).unwrap();
	let item = index.iter().next().unwrap().unwrap();
	assert_eq!( constructed.load( Ordering::SeqCst ), 0 );

	let first = item.instance().unwrap();
	let second = item.instance().unwrap();
	assert!( Arc::ptr_eq( &first, &second ));
	assert_eq!( first.greet(), "counted" );
	assert_eq!( constructed.load( Ordering::SeqCst ), 1 );

}

#[test]
fn annotation_values_are_reconstructed() {

	let space = space( nev![ with_index( ClassRoot::new( "r" ), Greeting::NAME, &[
		DeclaredElement::type_level( "a.Named" ).with_value( "value", "hello" ),
		DeclaredElement::type_level( "a.Plain" ),
	])]);

	let index = SpaceIndex::<Greeting, ()>::load( space ).unwrap();
	let items = index.iter().collect::<Result<Vec<_>, _>>().unwrap();

	assert_eq!( items[0].annotation().unwrap().value.as_deref(), Some( "hello" ));
	assert!( std::ptr::eq( items[0].annotation().unwrap(), items[0].annotation().unwrap() ));
	assert_eq!( items[1].annotation().unwrap().value, None );

}

#[test]
fn invalid_annotation_values_are_reported_per_item() {

	let space = space( nev![ with_index( ClassRoot::new( "r" ), Greeting::NAME, &[
		DeclaredElement::type_level( "a.Bad" ).with_value( "value", 5 ),
		DeclaredElement::type_level( "a.Good" ),
	])]);

	let index = SpaceIndex::<Greeting, ()>::load( space ).unwrap();
	let items = index.iter().collect::<Result<Vec<_>, _>>().unwrap();

	assert!( matches!( items[0].annotation(), Err( InstantiationError::InvalidAnnotation { .. })));
	assert!( items[1].annotation().is_ok() );

}

#[test]
fn method_and_field_elements_produce_values() {

	let factory = ClassDef::new( "a.Factory" )
		.method::<dyn Greeter>( "create", | _ | Ok( Arc::new( Fixed( "from method".to_string() )) as Arc<dyn Greeter> ))
		.field::<dyn Greeter>( "INSTANCE", | _ | Ok( Arc::new( Fixed( "from field".to_string() )) as Arc<dyn Greeter> ));
	let space = space( nev![ with_index( ClassRoot::new( "r" ).with_class( factory ), Greeting::NAME, &[
		DeclaredElement::method( "a.Factory", "create" ),
		DeclaredElement::field( "a.Factory", "INSTANCE" ),
	])]);

	let index = SpaceIndex::<Greeting, dyn Greeter>::load( space ).unwrap();
	let items = index.iter().collect::<Result<Vec<_>, _>>().unwrap();

	assert_eq!( items[0].kind(), ElementKind::Method );
	assert!( matches!( items[0].element().unwrap(), ElementHandle::Method( _, name ) if name == "create" ));
	assert_eq!( items[0].instance().unwrap().greet(), "from method" );

	assert_eq!( items[1].kind(), ElementKind::Field );
	assert_eq!( items[1].element().unwrap().member_name(), Some( "INSTANCE" ));
	assert_eq!( items[1].instance().unwrap().greet(), "from field" );

}

#[test]
fn member_of_the_wrong_kind_is_missing() {

	let factory = ClassDef::new( "a.Factory" )
		.field::<dyn Greeter>( "create", | _ | Ok( Arc::new( Fixed( "field".to_string() )) as Arc<dyn Greeter> ));
	let space = space( nev![ with_index( ClassRoot::new( "r" ).with_class( factory ), Greeting::NAME, &[
		DeclaredElement::method( "a.Factory", "create" ),
	])]);

	let index = SpaceIndex::<Greeting, dyn Greeter>::load( space ).unwrap();
	let item = index.iter().next().unwrap().unwrap();
	assert!( matches!( item.element(), Err( InstantiationError::MissingMember { .. })));
	assert!( item.instance().is_err() );

}

#[test]
fn unknown_class_fails_the_item_not_the_iteration() {

	let space = space( nev![ with_index( ClassRoot::new( "r" ).with_class( greeter_class( "a.Known", "known" )), Greeting::NAME, &[
		DeclaredElement::type_level( "a.Unknown" ),
		DeclaredElement::type_level( "a.Known" ),
	])]);

	let index = SpaceIndex::<Greeting, dyn Greeter>::load( space ).unwrap();
	let items = index.iter().collect::<Result<Vec<_>, _>>().unwrap();

	assert!( matches!( items[0].instance(), Err( InstantiationError::ClassNotFound( _ ))));
	assert_eq!( items[1].instance().unwrap().greet(), "known" );

}

#[test]
fn failing_constructor_is_not_cached() {

	let attempts = Arc::new( AtomicUsize::new( 0 ));
	let counter = Arc::clone( &attempts );
	let flaky = ClassDef::new( "a.Flaky" ).provides::<dyn Greeter>( move | _ | {
		match counter.fetch_add( 1, Ordering::SeqCst ) {
			0 => Err( "first attempt fails".into() ),
			_ => Ok( Arc::new( Fixed( "second".to_string() )) as Arc<dyn Greeter> ),
		}
	});
	let space = space( nev![ with_index( ClassRoot::new( "r" ).with_class( flaky ), Greeting::NAME, &[
		DeclaredElement::type_level( "a.Flaky" ),
	])]);

	let index = SpaceIndex::<Greeting, dyn Greeter>::load( space ).unwrap();
	let item = index.iter().next().unwrap().unwrap();

	assert!( matches!( item.instance(), Err( InstantiationError::ConstructorFailed { .. })));
	assert_eq!( item.instance().unwrap().greet(), "second" );
	assert_eq!( attempts.load( Ordering::SeqCst ), 2 );

}
