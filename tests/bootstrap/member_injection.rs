use std::sync::Arc ;
use parking_lot::Mutex ;
use plugin_space::{
	Bootstrap, ClassRoot, Config, Container, DeclaredElement, InjectMembers, Injector, ResolveError, ScanModule, nev,
};
use crate::fixture_space::{ Greeter, greeter_class, with_index };

/// Receives its greeter after construction.
#[derive( Default )]
struct Consumer {
	greeter: Mutex<Option<Arc<dyn Greeter>>>,
}

impl InjectMembers for Consumer {
	fn inject_members( &self, injector: &Injector<'_> ) -> Result<(), ResolveError> {
		*self.greeter.lock() = Some( injector.get_named::<dyn Greeter>( "hello" )?);
		Ok(())
	}
}

fn bootstrap_with( config: Config ) -> Arc<Container> {
	let root = with_index( ClassRoot::new( "host" ).with_class( greeter_class( "app.Hello", "hello" )), "named", &[
		DeclaredElement::type_level( "app.Hello" ).with_value( "value", "hello" ),
	]);
	let ( container, warnings ) = Bootstrap::new( config ).bootstrap( ScanModule::new( nev![ root ])).unwrap();
	assert_no_warnings!( warnings );
	container
}

#[test]
fn members_are_injected_by_default() {

	let container = bootstrap_with( Config::default() );
	assert!( container.member_injection_enabled() );

	let consumer = Consumer::default();
	assert!( container.inject_members( &consumer ).unwrap() );
	assert_eq!( consumer.greeter.lock().as_ref().map(| greeter | greeter.greet() ), Some( "hello".to_string() ));

	container.dispose();

}

#[test]
fn disabled_member_injection_leaves_targets_alone() {

	let container = bootstrap_with( Config::from_toml_str( "member-injection = false" ).unwrap() );
	assert!( !container.member_injection_enabled() );

	let consumer = Consumer::default();
	assert!( !container.inject_members( &consumer ).unwrap() );
	assert!( consumer.greeter.lock().is_none() );

	container.dispose();

}

#[test]
fn injection_failures_are_reported() {

	struct Needy ;
	impl InjectMembers for Needy {
		fn inject_members( &self, injector: &Injector<'_> ) -> Result<(), ResolveError> {
			injector.get_named::<dyn Greeter>( "absent" ).map( drop )
		}
	}

	let container = bootstrap_with( Config::default() );
	assert!( matches!( container.inject_members( &Needy ), Err( ResolveError::Unbound { .. })));
	container.dispose();

}
