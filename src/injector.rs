use std::cell::RefCell ;
use std::sync::Arc ;

use crate::class::{ Class, Erased, InstantiationError, TypeKey, unerase };
use crate::class_loader::{ ClassNotFound, ClassSpace };
use crate::container::{ Binding, Container, Qualifier, ResolveError };
use crate::plugin_record::PluginRecord ;



/// Resolves the dependencies of one construction.
///
/// Factories receive an injector and pull what they need from it. An injector
/// is scoped: it may be backed by a [`Container`], a class space and a plugin,
/// and it tracks the bindings currently being resolved so that a dependency
/// cycle fails instead of recursing forever.
pub struct Injector<'c> {
	container: Option<&'c Container>,
	space: Option<Arc<dyn ClassSpace>>,
	plugin: Option<Arc<PluginRecord>>,
	resolving: RefCell<Vec<( usize, String )>>,
}

impl<'c> Injector<'c> {

	pub(crate) fn new( container: Option<&'c Container>, space: Option<Arc<dyn ClassSpace>>, plugin: Option<Arc<PluginRecord>> ) -> Self {
		Self { container, space, plugin, resolving: RefCell::new( Vec::with_capacity( 0 )) }
	}

	/// An injector that can load classes from `space` but has no bindings.
	pub fn for_space( space: Arc<dyn ClassSpace> ) -> Injector<'static> {
		Injector::new( None, Some( space ), None )
	}

	#[inline] pub fn container( &self ) -> Option<&'c Container> { self.container }
	#[inline] pub fn class_space( &self ) -> Option<&Arc<dyn ClassSpace>> { self.space.as_ref() }
	/// The plugin this injector was created for.
	#[inline] pub fn plugin( &self ) -> Option<&Arc<PluginRecord>> { self.plugin.as_ref() }

	/// The preferred binding of `T`: the one named `default` if present,
	/// otherwise the first qualified binding, otherwise the first unqualified one.
	///
	/// # Errors
	/// Fails if nothing is bound to `T` or its provider fails.
	pub fn get<T: ?Sized + Send + Sync + 'static>( &self ) -> Result<Arc<T>, ResolveError> {
		let container = self.container.ok_or( ResolveError::Detached )?;
		let binding = container.preferred( TypeKey::of::<T>() )
			.ok_or( ResolveError::Unbound { key: TypeKey::of::<T>(), qualifier: None })?;
		self.resolve_as::<T>( &binding )
	}

	/// The binding of `T` named `name`.
	///
	/// # Errors
	/// Fails if no such binding exists or its provider fails.
	pub fn get_named<T: ?Sized + Send + Sync + 'static>( &self, name: &str ) -> Result<Arc<T>, ResolveError> {
		let container = self.container.ok_or( ResolveError::Detached )?;
		let qualifier = Qualifier::named( name );
		let binding = container.named( TypeKey::of::<T>(), &qualifier )
			.ok_or_else(|| ResolveError::Unbound { key: TypeKey::of::<T>(), qualifier: Some( qualifier.clone() )})?;
		self.resolve_as::<T>( &binding )
	}

	/// Loads a class from this injector's class space.
	///
	/// # Errors
	/// Fails if the class is not visible, or if the injector has no class space.
	pub fn load_class( &self, name: &str ) -> Result<Arc<Class>, ClassNotFound> {
		match &self.space {
			Some( space ) => space.load_class( name ),
			None => Err( ClassNotFound { name: name.to_string(), space: "<none>".to_string() }),
		}
	}

	/// Constructs `class` as `T`, resolving its dependencies through this injector.
	///
	/// # Errors
	/// See [`Class::construct`].
	pub fn instantiate<T: ?Sized + Send + Sync + 'static>( &self, class: &Class ) -> Result<Arc<T>, InstantiationError> {
		class.construct::<T>( self )
	}

	pub(crate) fn resolve_as<T: ?Sized + Send + Sync + 'static>( &self, binding: &Arc<Binding> ) -> Result<Arc<T>, ResolveError> {
		let erased = self.resolve( binding )?;
		unerase::<T>( &erased ).ok_or( ResolveError::TypeMismatch { key: TypeKey::of::<T>() })
	}

	pub(crate) fn resolve( &self, binding: &Arc<Binding> ) -> Result<Erased, ResolveError> {
		let id = Arc::as_ptr( binding ) as usize ;
		if self.resolving.borrow().iter().any(|( active, _ )| *active == id ) {
			let path = self.resolving.borrow().iter()
				.map(|( _, label )| label.clone() )
				.chain( std::iter::once( binding.label() ))
				.collect();
			return Err( ResolveError::Circular { path })
		}
		self.resolving.borrow_mut().push(( id, binding.label() ));
		let result = binding.resolve( self );
		self.resolving.borrow_mut().pop();
		result
	}

}

impl std::fmt::Debug for Injector<'_> {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "Injector" )
			.field( "container", &self.container.is_some() )
			.field( "space", &self.space )
			.field( "plugin", &self.plugin.as_ref().map(| plugin | plugin.short_name() ))
			.finish()
	}
}
