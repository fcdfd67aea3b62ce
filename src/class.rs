//! Runtime class model.
//!
//! There is no reflective class loading to lean on, so a class is a named
//! registry entry: a [`ClassDef`] maps a stable class name to factory functions,
//! one per instance type the class can produce, plus optional static members
//! (methods and fields) that produce values of their own. Plugins publish their
//! definitions through [`ClassRoot`]( crate::ClassRoot )s; a [`Class`] is a
//! definition after a particular [`ClassLoader`]( crate::ClassLoader ) defined it.
//!
//! Class identity is `( loader, name )`: the same definition loaded through two
//! loaders yields two distinct classes.

use std::any::{ Any, TypeId };
use std::collections::HashMap ;
use std::path::{ Path, PathBuf };
use std::sync::Arc ;
use thiserror::Error ;

use crate::class_loader::{ ClassNotFound, LoaderId };
use crate::injector::Injector ;

/// Error type returned by plugin-provided factories and lifecycle hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A type-erased `Arc<T>`.
pub(crate) type Erased = Arc<dyn Any + Send + Sync>;
pub(crate) type Factory = Arc<dyn Fn( &Injector<'_> ) -> Result<Erased, BoxError> + Send + Sync>;

pub(crate) fn erase<T: ?Sized + Send + Sync + 'static>( value: Arc<T> ) -> Erased { Arc::new( value )}

pub(crate) fn unerase<T: ?Sized + Send + Sync + 'static>( erased: &Erased ) -> Option<Arc<T>> {
	erased.downcast_ref::<Arc<T>>().cloned()
}

fn erase_factory<T, F>( factory: F ) -> Factory
where
	T: ?Sized + Send + Sync + 'static,
	F: Fn( &Injector<'_> ) -> Result<Arc<T>, BoxError> + Send + Sync + 'static,
{
	Arc::new( move | injector: &Injector<'_> | factory( injector ).map( erase ))
}

/// Runtime identity of a Rust type, trait objects included.
#[derive( Copy, Clone, Debug, Eq, PartialEq, Hash )]
pub struct TypeKey {
	id: TypeId,
	name: &'static str,
}

impl TypeKey {
	/// The key of `T`.
	pub fn of<T: ?Sized + 'static>() -> Self {
		Self { id: TypeId::of::<T>(), name: std::any::type_name::<T>() }
	}

	/// Human readable type name, for diagnostics only.
	#[inline] pub fn name( &self ) -> &'static str { self.name }

	/// Whether this key identifies `T`.
	#[inline] pub fn is<T: ?Sized + 'static>( &self ) -> bool { self.id == TypeId::of::<T>() }
}

impl std::fmt::Display for TypeKey {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result { f.write_str( self.name )}
}

/// Whether a static member is a method or a field.
#[derive( Copy, Clone, Debug, Eq, PartialEq, Hash )]
pub enum MemberKind {
	Method,
	Field,
}

impl std::fmt::Display for MemberKind {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		match self {
			Self::Method => f.write_str( "method" ),
			Self::Field => f.write_str( "field" ),
		}
	}
}

#[derive( Clone )]
struct MemberDef {
	kind: MemberKind,
	producers: HashMap<TypeKey, Factory>,
}

/// A class definition as published by the code that owns it.
///
/// # Example
///
/// ```
/// use std::sync::Arc ;
/// use plugin_space::{ ClassDef, TypeKey };
///
/// trait Speaker: Send + Sync { fn speak( &self ) -> String ; }
/// struct Welcome ;
/// impl Speaker for Welcome { fn speak( &self ) -> String { "welcome".into() } }
///
/// let def = ClassDef::new( "example.Welcome" )
/// 	.provides::<dyn Speaker>(| _ | Ok( Arc::new( Welcome ) as Arc<dyn Speaker> ))
/// 	.field::<str>( "GREETING", | _ | Ok( Arc::from( "hi" )));
///
/// assert_eq!( def.provided_types(), &[ TypeKey::of::<dyn Speaker>() ]);
/// ```
#[derive( Clone )]
pub struct ClassDef {
	name: String,
	constructors: HashMap<TypeKey, Factory>,
	provided: Vec<TypeKey>,
	members: HashMap<String, MemberDef>,
}

impl ClassDef {
	/// Creates an empty definition. A class with no constructors can still be
	/// loaded and can still expose static members.
	pub fn new( name: impl Into<String> ) -> Self {
		Self {
			name: name.into(),
			constructors: HashMap::new(),
			provided: Vec::new(),
			members: HashMap::new(),
		}
	}

	/// Declares that instances of this class can be produced as `T`.
	///
	/// The factory receives an [`Injector`] through which constructor
	/// dependencies are resolved. Declaring the same `T` twice replaces the
	/// earlier factory.
	pub fn provides<T: ?Sized + Send + Sync + 'static>(
		mut self,
		factory: impl Fn( &Injector<'_> ) -> Result<Arc<T>, BoxError> + Send + Sync + 'static,
	) -> Self {
		let key = TypeKey::of::<T>();
		if self.constructors.insert( key, erase_factory( factory )).is_none() {
			self.provided.push( key );
		}
		self
	}

	/// Declares a static method producing a `T`.
	pub fn method<T: ?Sized + Send + Sync + 'static>(
		self,
		name: impl Into<String>,
		producer: impl Fn( &Injector<'_> ) -> Result<Arc<T>, BoxError> + Send + Sync + 'static,
	) -> Self {
		self.member( name.into(), MemberKind::Method, TypeKey::of::<T>(), erase_factory( producer ))
	}

	/// Declares a static field holding a `T`.
	pub fn field<T: ?Sized + Send + Sync + 'static>(
		self,
		name: impl Into<String>,
		producer: impl Fn( &Injector<'_> ) -> Result<Arc<T>, BoxError> + Send + Sync + 'static,
	) -> Self {
		self.member( name.into(), MemberKind::Field, TypeKey::of::<T>(), erase_factory( producer ))
	}

	fn member( mut self, name: String, kind: MemberKind, key: TypeKey, producer: Factory ) -> Self {
		let member = self.members.entry( name ).or_insert_with(|| MemberDef { kind, producers: HashMap::new() });
		member.kind = kind ;
		member.producers.insert( key, producer );
		self
	}

	/// Fully qualified class name.
	#[inline] pub fn name( &self ) -> &str { &self.name }

	/// Types this class can be constructed as, in declaration order.
	#[inline] pub fn provided_types( &self ) -> &[TypeKey] { &self.provided }
}

impl std::fmt::Debug for ClassDef {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "ClassDef" )
			.field( "name", &self.name )
			.field( "provided", &self.provided )
			.field( "members", &self.members.keys().collect::<Vec<_>>() )
			.finish_non_exhaustive()
	}
}

/// Errors raised while materialising an element or an instance.
#[derive( Debug, Error )]
pub enum InstantiationError {
	/// The class exists but declares no way to produce the requested type.
	#[error( "Class {class} cannot be instantiated as {requested}" )]
	NotInstantiable { class: String, requested: TypeKey },
	/// The class does not declare the member an index record refers to.
	#[error( "Class {class} declares no {kind} named '{member}'" )]
	MissingMember { class: String, member: String, kind: MemberKind },
	/// A factory ran and failed.
	#[error( "Failed to construct {requested} from {class}: {source}" )]
	ConstructorFailed { class: String, requested: TypeKey, #[source] source: BoxError },
	/// A factory returned something other than the type it was registered for.
	#[error( "Factory of {class} did not produce a {requested}" )]
	TypeMismatch { class: String, requested: TypeKey },
	/// The owning class could not be found in the class space.
	#[error( "{0}" )]
	ClassNotFound( #[from] ClassNotFound ),
	/// The recorded annotation values do not deserialize into the annotation type.
	#[error( "Invalid annotation values on {element}: {source}" )]
	InvalidAnnotation { element: String, #[source] source: serde_json::Error },
}

/// A [`ClassDef`] defined by a specific loader.
pub struct Class {
	def: Arc<ClassDef>,
	loader: LoaderId,
	root: PathBuf,
}

impl Class {
	pub(crate) fn new( def: Arc<ClassDef>, loader: LoaderId, root: PathBuf ) -> Self {
		Self { def, loader, root }
	}

	/// Fully qualified class name.
	#[inline] pub fn name( &self ) -> &str { self.def.name() }

	/// The loader that defined this class.
	#[inline] pub fn loader_id( &self ) -> LoaderId { self.loader }

	/// Location of the root the definition came from.
	#[inline] pub fn root( &self ) -> &Path { &self.root }

	/// Types this class can be constructed as.
	#[inline] pub fn provided_types( &self ) -> &[TypeKey] { self.def.provided_types() }

	/// Whether this class can be constructed as `T`.
	pub fn is_assignable_to<T: ?Sized + 'static>( &self ) -> bool {
		self.def.constructors.contains_key( &TypeKey::of::<T>() )
	}

	/// The kind of the static member called `name`, if declared.
	pub fn member_kind( &self, name: &str ) -> Option<MemberKind> {
		self.def.members.get( name ).map(| member | member.kind )
	}

	pub(crate) fn constructor( &self, key: &TypeKey ) -> Option<&Factory> {
		self.def.constructors.get( key )
	}

	/// Constructs an instance as `T`, resolving dependencies through `injector`.
	///
	/// # Errors
	/// Fails if the class does not provide `T` or if its factory fails.
	pub fn construct<T: ?Sized + Send + Sync + 'static>( &self, injector: &Injector<'_> ) -> Result<Arc<T>, InstantiationError> {
		let requested = TypeKey::of::<T>();
		let factory = self.constructor( &requested ).ok_or_else(|| InstantiationError::NotInstantiable {
			class: self.name().to_string(),
			requested,
		})?;
		self.produce( factory, requested, injector )
	}

	/// Invokes a static method or reads a static field, as `T`.
	///
	/// # Errors
	/// Fails if no member of that name and kind exists, if it cannot produce
	/// `T`, or if its producer fails.
	pub fn member_value<T: ?Sized + Send + Sync + 'static>(
		&self,
		name: &str,
		kind: MemberKind,
		injector: &Injector<'_>,
	) -> Result<Arc<T>, InstantiationError> {
		let requested = TypeKey::of::<T>();
		let member = self.def.members.get( name )
			.filter(| member | member.kind == kind )
			.ok_or_else(|| InstantiationError::MissingMember {
				class: self.name().to_string(),
				member: name.to_string(),
				kind,
			})?;
		let producer = member.producers.get( &requested ).ok_or_else(|| InstantiationError::NotInstantiable {
			class: format!( "{}#{}", self.name(), name ),
			requested,
		})?;
		self.produce( producer, requested, injector )
	}

	fn produce<T: ?Sized + Send + Sync + 'static>(
		&self,
		factory: &Factory,
		requested: TypeKey,
		injector: &Injector<'_>,
	) -> Result<Arc<T>, InstantiationError> {
		let erased = factory( injector ).map_err(| source | InstantiationError::ConstructorFailed {
			class: self.name().to_string(),
			requested,
			source,
		})?;
		unerase::<T>( &erased ).ok_or_else(|| InstantiationError::TypeMismatch {
			class: self.name().to_string(),
			requested,
		})
	}
}

impl PartialEq for Class {
	fn eq( &self, other: &Self ) -> bool { self.loader == other.loader && self.name() == other.name() }
}
impl Eq for Class {}

impl std::hash::Hash for Class {
	fn hash<H: std::hash::Hasher>( &self, state: &mut H ) {
		self.loader.hash( state );
		self.name().hash( state );
	}
}

impl std::fmt::Debug for Class {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "Class" )
			.field( "name", &self.name() )
			.field( "loader", &self.loader )
			.field( "root", &self.root )
			.finish()
	}
}

impl std::fmt::Display for Class {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		write!( f, "{} ({})", self.name(), self.loader )
	}
}
