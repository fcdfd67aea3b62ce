//! The dependency-injection container.
//!
//! A [`Container`] is a flat list of bindings. Each binding maps a type (any
//! `T: ?Sized`, trait objects included) and a [`Qualifier`] to a provider.
//! Providers run at most once per binding, even when several threads look
//! the binding up together; the value is cached and shared by every later
//! lookup. A failed provider caches nothing. The container also keeps the registry of loaded
//! plugins, which is how injectors created for a plugin can see it.
//!
//! Bindings and plugins hold strong references; plugins whose instances refer
//! back to the container form cycles. [`Container::dispose`] is the teardown
//! that drops them.

use std::sync::Arc ;
use std::sync::atomic::{ AtomicBool, Ordering };
use once_cell::sync::OnceCell ;
use parking_lot::RwLock ;
use thiserror::Error ;
use tracing::{ debug, trace, warn };

use crate::class::{ BoxError, Class, Erased, Factory, TypeKey, erase, unerase };
use crate::class_loader::ClassSpace ;
use crate::injector::Injector ;
use crate::plugin_record::PluginRecord ;



/// How a binding is qualified.
///
/// Unqualified bindings can be fetched with [`Container::get`] but are not
/// listed by [`Container::locate`].
#[derive( Clone, Debug, PartialEq, Eq, Hash )]
pub enum Qualifier {
	Named( String ),
	Unqualified,
}

impl Qualifier {
	pub const DEFAULT: &'static str = "default";

	pub fn named( name: impl Into<String> ) -> Self { Self::Named( name.into() )}

	/// `Named( "default" )`.
	pub fn default_name() -> Self { Self::Named( Self::DEFAULT.to_string() )}

	pub fn name( &self ) -> Option<&str> {
		match self {
			Self::Named( name ) => Some( name ),
			Self::Unqualified => None,
		}
	}

	#[inline] pub fn is_default( &self ) -> bool { self.name() == Some( Self::DEFAULT ) }
	#[inline] pub fn is_qualified( &self ) -> bool { matches!( self, Self::Named( _ )) }
}

impl std::fmt::Display for Qualifier {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		match self {
			Self::Named( name ) => write!( f, "@Named({name:?})" ),
			Self::Unqualified => f.write_str( "unqualified" ),
		}
	}
}

#[derive( Debug, Error )]
pub enum ResolveError {
	#[error( "No binding for {key}{}", .qualifier.as_ref().map(| qualifier | format!( " {qualifier}" )).unwrap_or_default() )]
	Unbound { key: TypeKey, qualifier: Option<Qualifier> },
	#[error( "Provider of {key} ({implementation}) failed: {source}" )]
	Provider { key: TypeKey, implementation: String, #[source] source: BoxError },
	#[error( "Binding for {key} produced a value of another type" )]
	TypeMismatch { key: TypeKey },
	#[error( "Circular dependency: {}", .path.join( " -> " ))]
	Circular { path: Vec<String> },
	#[error( "Injector is not backed by a container" )]
	Detached,
}

pub(crate) struct Binding {
	key: TypeKey,
	qualifier: Qualifier,
	implementation: String,
	provider: Factory,
	singleton: OnceCell<Erased>,
}

impl Binding {

	fn instance<T: ?Sized + Send + Sync + 'static>( qualifier: Qualifier, instance: Arc<T> ) -> Self {
		let value = erase( instance );
		let provided = Arc::clone( &value );
		Self {
			key: TypeKey::of::<T>(),
			qualifier,
			implementation: std::any::type_name::<T>().to_string(),
			provider: Arc::new( move | _: &Injector<'_> | Ok( Arc::clone( &provided ))),
			singleton: OnceCell::with_value( value ),
		}
	}

	pub(crate) fn label( &self ) -> String {
		format!( "{} {} ({})", self.key, self.qualifier, self.implementation )
	}

	/// Runs the provider unless a value is cached. Concurrent callers wait
	/// for the one running the provider. The same injector never re-enters a
	/// binding it is still resolving, so the wait cannot be on itself.
	pub(crate) fn resolve( &self, injector: &Injector<'_> ) -> Result<Erased, ResolveError> {
		self.singleton.get_or_try_init(|| {
			trace!( "Provisioning {}", self.label() );
			( self.provider )( injector ).map_err(| source | match source.downcast::<ResolveError>() {
				Ok( inner ) if matches!( *inner, ResolveError::Circular { .. }) => *inner,
				Ok( inner ) => ResolveError::Provider { key: self.key, implementation: self.implementation.clone(), source: inner },
				Err( source ) => ResolveError::Provider { key: self.key, implementation: self.implementation.clone(), source },
			})
		}).map( Arc::clone )
	}

}

/// A located binding: its value together with how it was qualified.
pub struct QualifiedBean<T: ?Sized> {
	qualifier: Qualifier,
	implementation: String,
	value: Arc<T>,
}

impl<T: ?Sized> QualifiedBean<T> {
	#[inline] pub fn qualifier( &self ) -> &Qualifier { &self.qualifier }
	/// Name of the class or type backing the binding.
	#[inline] pub fn implementation( &self ) -> &str { &self.implementation }
	#[inline] pub fn value( &self ) -> &Arc<T> { &self.value }
	#[inline] pub fn into_value( self ) -> Arc<T> { self.value }
}

impl<T: ?Sized> Clone for QualifiedBean<T> {
	fn clone( &self ) -> Self {
		Self { qualifier: self.qualifier.clone(), implementation: self.implementation.clone(), value: Arc::clone( &self.value ) }
	}
}

impl<T: ?Sized> std::fmt::Debug for QualifiedBean<T> {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "QualifiedBean" )
			.field( "qualifier", &self.qualifier )
			.field( "implementation", &self.implementation )
			.finish_non_exhaustive()
	}
}

impl<T: ?Sized> std::fmt::Display for QualifiedBean<T> {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		write!( f, "{} {}", self.qualifier, self.implementation )
	}
}

/// Objects that receive dependencies after construction rather than through
/// their factory.
pub trait InjectMembers {
	/// # Errors
	/// Fails if a required dependency cannot be resolved.
	fn inject_members( &self, injector: &Injector<'_> ) -> Result<(), ResolveError>;
}

#[derive( Default )]
pub struct Container {
	space: Option<Arc<dyn ClassSpace>>,
	bindings: RwLock<Vec<Arc<Binding>>>,
	plugins: RwLock<Vec<Arc<PluginRecord>>>,
	member_injection: AtomicBool,
}

impl Container {

	pub fn new() -> Self { Self::default() }

	/// A container whose root injector loads classes from `space`.
	pub fn with_space( space: Arc<dyn ClassSpace> ) -> Self {
		Self { space: Some( space ), ..Self::default() }
	}

	#[inline] pub fn class_space( &self ) -> Option<&Arc<dyn ClassSpace>> { self.space.as_ref() }

	/// Binds `T` to a provider. The provider runs on first lookup.
	pub fn bind<T: ?Sized + Send + Sync + 'static>(
		&self,
		qualifier: Qualifier,
		provider: impl Fn( &Injector<'_> ) -> Result<Arc<T>, BoxError> + Send + Sync + 'static,
	) {
		self.push( Binding {
			key: TypeKey::of::<T>(),
			qualifier,
			implementation: std::any::type_name::<T>().to_string(),
			provider: Arc::new( move | injector: &Injector<'_> | provider( injector ).map( erase )),
			singleton: OnceCell::new(),
		});
	}

	/// Binds `T` to an existing value.
	pub fn bind_instance<T: ?Sized + Send + Sync + 'static>( &self, qualifier: Qualifier, instance: Arc<T> ) {
		self.push( Binding::instance( qualifier, instance ));
	}

	/// Binds every type `class` provides, all under the same qualifier.
	/// Returns the number of bindings added.
	pub fn bind_class( &self, qualifier: &Qualifier, class: &Class ) -> usize {
		let bindings = class.provided_types().iter()
			.filter_map(| key | class.constructor( key ).map(| constructor | Binding {
				key: *key,
				qualifier: qualifier.clone(),
				implementation: class.name().to_string(),
				provider: Arc::clone( constructor ),
				singleton: OnceCell::new(),
			}))
			.collect::<Vec<_>>();
		let count = bindings.len();
		let mut registered = self.bindings.write();
		for binding in bindings {
			trace!( "Binding {}", binding.label() );
			registered.push( Arc::new( binding ));
		}
		count
	}

	fn push( &self, binding: Binding ) {
		trace!( "Binding {}", binding.label() );
		self.bindings.write().push( Arc::new( binding ));
	}

	fn matching( &self, key: TypeKey ) -> Vec<Arc<Binding>> {
		self.bindings.read().iter()
			.filter(| binding | binding.key == key )
			.cloned()
			.collect()
	}

	pub(crate) fn preferred( &self, key: TypeKey ) -> Option<Arc<Binding>> {
		let candidates = self.matching( key );
		candidates.iter().find(| binding | binding.qualifier.is_default() )
			.or_else(|| candidates.iter().find(| binding | binding.qualifier.is_qualified() ))
			.or_else(|| candidates.first() )
			.cloned()
	}

	pub(crate) fn named( &self, key: TypeKey, qualifier: &Qualifier ) -> Option<Arc<Binding>> {
		self.bindings.read().iter()
			.find(| binding | binding.key == key && binding.qualifier == *qualifier )
			.cloned()
	}

	/// Every qualified binding of `T`, in binding order.
	///
	/// # Errors
	/// Fails on the first provider that fails.
	pub fn locate<T: ?Sized + Send + Sync + 'static>( &self ) -> Result<Vec<QualifiedBean<T>>, ResolveError> {
		let injector = self.root_injector();
		self.matching( TypeKey::of::<T>() ).into_iter()
			.filter(| binding | binding.qualifier.is_qualified() )
			.map(| binding | {
				let erased = injector.resolve( &binding )?;
				let value = unerase::<T>( &erased ).ok_or( ResolveError::TypeMismatch { key: binding.key })?;
				Ok( QualifiedBean { qualifier: binding.qualifier.clone(), implementation: binding.implementation.clone(), value })
			})
			.collect()
	}

	/// # Errors
	/// See [`Injector::get`].
	pub fn get<T: ?Sized + Send + Sync + 'static>( &self ) -> Result<Arc<T>, ResolveError> {
		self.root_injector().get::<T>()
	}

	/// # Errors
	/// See [`Injector::get_named`].
	pub fn get_named<T: ?Sized + Send + Sync + 'static>( &self, name: &str ) -> Result<Arc<T>, ResolveError> {
		self.root_injector().get_named::<T>( name )
	}

	/// Number of bindings currently held.
	pub fn binding_count( &self ) -> usize { self.bindings.read().len() }

	/// Adds a plugin to the registry and binds it as a [`PluginRecord`] named
	/// after its short name. A plugin with the same short name replaces the earlier one.
	///
	/// The binding and the registry entry change under one lock, so concurrent
	/// registrations of a short name leave exactly one of each.
	pub fn register( &self, plugin: Arc<PluginRecord> ) {
		let qualifier = Qualifier::named( plugin.short_name() );
		let binding = Binding::instance::<PluginRecord>( qualifier.clone(), Arc::clone( &plugin ));

		let mut bindings = self.bindings.write();
		bindings.retain(| existing | !( existing.key.is::<PluginRecord>() && existing.qualifier == qualifier ));
		trace!( "Binding {}", binding.label() );
		bindings.push( Arc::new( binding ));

		let mut plugins = self.plugins.write();
		match plugins.iter().position(| known | known.short_name() == plugin.short_name() ) {
			Some( index ) => {
				warn!( "Replacing registered plugin {} with {}", plugins[index], plugin );
				plugins[index] = plugin ;
			}
			None => {
				debug!( "Registered plugin {}", plugin );
				plugins.push( plugin );
			}
		}
	}

	pub fn plugin( &self, short_name: &str ) -> Option<Arc<PluginRecord>> {
		self.plugins.read().iter().find(| plugin | plugin.short_name() == short_name ).cloned()
	}

	pub fn plugins( &self ) -> Vec<Arc<PluginRecord>> { self.plugins.read().clone() }

	/// An injector backed by this container and the container's own class space.
	pub fn root_injector( &self ) -> Injector<'_> {
		Injector::new( Some( self ), self.space.clone(), None )
	}

	/// An injector backed by this container that loads classes through the
	/// plugin's own loader and exposes the plugin to the code it constructs.
	pub fn injector( &self, plugin: &Arc<PluginRecord> ) -> Injector<'_> {
		let space: Arc<dyn ClassSpace> = Arc::clone( plugin.class_loader() ) as Arc<dyn ClassSpace> ;
		Injector::new( Some( self ), Some( space ), Some( Arc::clone( plugin )))
	}

	pub fn enable_member_injection( &self ) { self.member_injection.store( true, Ordering::Release ) }

	pub fn member_injection_enabled( &self ) -> bool { self.member_injection.load( Ordering::Acquire ) }

	/// Injects `target`'s members from this container.
	/// Returns `false`, without touching the target, when member injection is disabled.
	///
	/// # Errors
	/// Propagates the target's resolution failures.
	pub fn inject_members( &self, target: &dyn InjectMembers ) -> Result<bool, ResolveError> {
		match self.member_injection_enabled() {
			true => target.inject_members( &self.root_injector() ).map(|()| true ),
			false => {
				debug!( "Member injection is disabled; skipping" );
				Ok( false )
			}
		}
	}

	/// Drops every binding, cached value and registered plugin.
	pub fn dispose( &self ) {
		let bindings = std::mem::take( &mut *self.bindings.write() );
		let plugins = std::mem::take( &mut *self.plugins.write() );
		debug!( "Disposing container: {} binding(s), {} plugin(s)", bindings.len(), plugins.len() );
		drop( bindings );
		drop( plugins );
	}

}

impl std::fmt::Debug for Container {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "Container" )
			.field( "bindings", &self.bindings.read().iter().map(| binding | binding.label() ).collect::<Vec<_>>() )
			.field( "plugins", &self.plugins.read().iter().map(| plugin | plugin.short_name().to_string() ).collect::<Vec<_>>() )
			.field( "member_injection", &self.member_injection_enabled() )
			.finish_non_exhaustive()
	}
}
