//! Class spaces and the isolated loader that backs each plugin.

use std::collections::HashMap ;
use std::io::Read ;
use std::path::{ Path, PathBuf };
use std::sync::{ Arc, OnceLock, Weak };
use std::sync::atomic::{ AtomicU64, Ordering };
use nonempty_collections::NEVec ;
use parking_lot::Mutex ;
use thiserror::Error ;

use crate::class::Class ;
use crate::class_root::ClassRoot ;
use crate::plugin_record::PluginRecord ;



static NEXT_LOADER_ID: AtomicU64 = AtomicU64::new( 1 );

/// Process-unique identity of a [`ClassLoader`].
#[derive( Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord )]
pub struct LoaderId( u64 );

impl LoaderId {
	fn next() -> Self { Self( NEXT_LOADER_ID.fetch_add( 1, Ordering::Relaxed ))}
}

impl std::fmt::Display for LoaderId {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result { write!( f, "loader#{}", self.0 )}
}

/// Where a resource was found: the root that holds it and its path inside that root.
///
/// Locations listed by a [`ClassLoader`] also remember which of the loader's
/// roots they came from, so roots sharing a location stay distinguishable.
#[derive( Clone, Debug, Eq, PartialEq, Hash )]
pub struct ResourceLocation {
	root: PathBuf,
	path: String,
	origin: Option<( LoaderId, usize )>,
}

impl ResourceLocation {
	pub fn new( root: impl Into<PathBuf>, path: impl Into<String> ) -> Self {
		Self { root: root.into(), path: path.into(), origin: None }
	}
	fn in_root( loader: LoaderId, index: usize, root: &ClassRoot, path: &str ) -> Self {
		Self { root: root.location().to_path_buf(), path: path.to_string(), origin: Some(( loader, index )) }
	}
	#[inline] pub fn root( &self ) -> &Path { &self.root }
	#[inline] pub fn path( &self ) -> &str { &self.path }
}

impl std::fmt::Display for ResourceLocation {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		write!( f, "{}!/{}", self.root.display(), self.path )
	}
}

#[derive( Debug, Error )]
#[error( "Class not found: {name} (searched {space})" )]
pub struct ClassNotFound {
	pub name: String,
	pub space: String,
}

/// Anything classes and resources can be looked up in.
pub trait ClassSpace: Send + Sync + std::fmt::Debug {

	/// Every resource named `name` under directory `path`, across the whole
	/// space, ancestors first.
	///
	/// # Errors
	/// Fails if the space cannot be enumerated.
	fn find_entries( &self, path: &str, name: &str ) -> std::io::Result<Vec<ResourceLocation>>;

	/// Opens a resource previously returned by [`find_entries`]( Self::find_entries ).
	///
	/// # Errors
	/// Fails if the resource no longer exists or cannot be read.
	fn open_resource( &self, location: &ResourceLocation ) -> std::io::Result<Box<dyn Read + Send>>;

	/// Resolves a class by its fully qualified name.
	///
	/// # Errors
	/// Fails if no root visible from this space defines the class.
	fn load_class( &self, name: &str ) -> Result<Arc<Class>, ClassNotFound>;

	/// Root locations visible from this space, ancestors first.
	fn root_locations( &self ) -> Vec<PathBuf> { Vec::with_capacity( 0 ) }

}

/// A class space scoped to a fixed, ordered list of roots, with an optional parent.
///
/// Classes are resolved from the loader's own roots first and fall back to the
/// parent; each class is defined once per loader and cached. Resource
/// enumeration lists the parent's entries before the loader's own.
pub struct ClassLoader {
	id: LoaderId,
	roots: Vec<ClassRoot>,
	parent: Option<Arc<dyn ClassSpace>>,
	defined: Mutex<HashMap<String, Arc<Class>>>,
	plugin: OnceLock<Weak<PluginRecord>>,
}

impl ClassLoader {

	pub fn new( roots: NEVec<ClassRoot>, parent: Option<Arc<dyn ClassSpace>> ) -> Self {
		Self {
			id: LoaderId::next(),
			roots: roots.into_iter().collect(),
			parent,
			defined: Mutex::new( HashMap::new() ),
			plugin: OnceLock::new(),
		}
	}

	#[inline] pub fn id( &self ) -> LoaderId { self.id }
	#[inline] pub fn roots( &self ) -> &[ClassRoot] { &self.roots }
	#[inline] pub fn parent( &self ) -> Option<&Arc<dyn ClassSpace>> { self.parent.as_ref() }

	/// This loader's own root locations, in lookup order.
	pub fn classpath( &self ) -> Vec<&Path> {
		self.roots.iter().map( ClassRoot::location ).collect()
	}

	/// Associates the loader with the plugin it was created for.
	/// Returns `false` if a plugin was already attached.
	pub fn attach_plugin( &self, plugin: &Arc<PluginRecord> ) -> bool {
		self.plugin.set( Arc::downgrade( plugin )).is_ok()
	}

	/// The plugin this loader belongs to, if any and still alive.
	pub fn plugin( &self ) -> Option<Arc<PluginRecord>> {
		self.plugin.get().and_then( Weak::upgrade )
	}

	fn find_own_class( &self, name: &str ) -> Option<Arc<Class>> {
		let mut defined = self.defined.lock();
		if let Some( class ) = defined.get( name ) { return Some( Arc::clone( class )) }
		let class = self.roots.iter().find_map(| root | root.class_def( name ).map(| def | Arc::new( Class::new(
			Arc::clone( def ),
			self.id,
			root.location().to_path_buf(),
		))))?;
		defined.insert( name.to_string(), Arc::clone( &class ));
		Some( class )
	}

}

impl ClassSpace for ClassLoader {

	fn find_entries( &self, path: &str, name: &str ) -> std::io::Result<Vec<ResourceLocation>> {
		let resource = match path.trim_end_matches( '/' ) {
			"" => name.to_string(),
			dir => format!( "{dir}/{name}" ),
		};
		let inherited = match &self.parent {
			Some( parent ) => parent.find_entries( path, name )?,
			None => Vec::with_capacity( 0 ),
		};
		Ok( inherited.into_iter()
			.chain( self.roots.iter()
				.enumerate()
				.filter(|( _, root )| root.has_resource( &resource ))
				.map(|( index, root )| ResourceLocation::in_root( self.id, index, root, &resource )))
			.collect())
	}

	fn open_resource( &self, location: &ResourceLocation ) -> std::io::Result<Box<dyn Read + Send>> {
		let own = match location.origin {
			Some(( loader, index )) if loader == self.id => self.roots.get( index ),
			Some( _ ) => None,
			None => self.roots.iter().find(| root | root.location() == location.root() ),
		};
		match ( own, &self.parent ) {
			( Some( root ), _ ) => root.open( location.path() ),
			( None, Some( parent )) => parent.open_resource( location ),
			( None, None ) => Err( std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!( "{location} is not visible from {}", self.id ),
			)),
		}
	}

	fn load_class( &self, name: &str ) -> Result<Arc<Class>, ClassNotFound> {
		if let Some( class ) = self.find_own_class( name ) { return Ok( class ) }
		match &self.parent {
			Some( parent ) => parent.load_class( name ).map_err(| err | ClassNotFound {
				name: err.name,
				space: format!( "{} -> {}", self.id, err.space ),
			}),
			None => Err( ClassNotFound { name: name.to_string(), space: self.id.to_string() }),
		}
	}

	fn root_locations( &self ) -> Vec<PathBuf> {
		self.parent.iter()
			.flat_map(| parent | parent.root_locations() )
			.chain( self.roots.iter().map(| root | root.location().to_path_buf() ))
			.collect()
	}

}

impl std::fmt::Debug for ClassLoader {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "ClassLoader" )
			.field( "id", &self.id )
			.field( "classpath", &self.classpath() )
			.field( "parent", &self.parent )
			.finish_non_exhaustive()
	}
}
