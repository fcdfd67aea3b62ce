//! Reading plugin archives from disk.
//!
//! An exploded archive is a directory:
//!
//! ```text
//! my-plugin/
//! 	plugin.toml       manifest
//! 	classes/          primary class root
//! 	lib/*             library class roots, in file name order
//! my-plugin.disabled    optional marker files next to the archive
//! my-plugin.pinned
//! my-plugin.bak
//! ```
//!
//! The manifest describes the plugin; the class definitions themselves come
//! from a [`ClassCatalog`], keyed by the plugin's short name for `classes/`
//! and by file name for each library.

use std::collections::HashMap ;
use std::path::{ Path, PathBuf };
use std::sync::Arc ;
use itertools::Itertools ;
use nonempty_collections::NEVec ;
use pipe_trait::Pipe ;
use serde::Deserialize ;
use thiserror::Error ;

use crate::class::ClassDef ;
use crate::class_loader::ClassLoader ;
use crate::class_root::ClassRoot ;
use crate::plugin_record::{ Dependency, PluginDescriptor, PluginFlags, PluginRecord };



pub const MANIFEST_FILE: &str = "plugin.toml";
pub const CLASSES_DIR: &str = "classes";
pub const LIB_DIR: &str = "lib";

/// Creates the class loader for a plugin once its class roots are known.
pub trait ClassLoaderHook {
	fn create_class_loader( &self, roots: NEVec<ClassRoot> ) -> Arc<ClassLoader>;
}

/// Turns an archive on disk into a plugin record.
pub trait ArchiveStrategy: Send + Sync {
	/// # Errors
	/// Fails if the archive is not readable or its manifest is invalid.
	fn create_plugin_record( &self, archive: &Path, hook: &dyn ClassLoaderHook ) -> Result<PluginRecord, ArchiveError>;
}

#[derive( Debug, Error )]
pub enum ArchiveError {
	#[error( "Not an exploded plugin archive: {}", .0.display() )]
	NotADirectory( PathBuf ),
	#[error( "Failed to read {}: {source}", path.display() )]
	Io { path: PathBuf, #[source] source: std::io::Error },
	#[error( "Malformed manifest {}: {source}", path.display() )]
	Manifest { path: PathBuf, #[source] source: toml::de::Error },
	#[error( "Manifest {} declares an empty short name", .0.display() )]
	EmptyShortName( PathBuf ),
}

/// Contents of `plugin.toml`.
#[derive( Clone, Debug, PartialEq, Eq, Deserialize )]
#[serde( rename_all = "kebab-case" )]
pub struct PluginManifest {
	pub short_name: String,
	pub version: String,
	#[serde( default )]
	pub plugin_class: Option<String>,
	#[serde( default )]
	pub dependencies: Vec<Dependency>,
}

impl PluginManifest {
	/// # Errors
	/// Fails if the file cannot be read or does not parse.
	pub fn load( path: &Path ) -> Result<Self, ArchiveError> {
		let source = std::fs::read_to_string( path )
			.map_err(| source | ArchiveError::Io { path: path.to_path_buf(), source })?;
		let manifest: Self = toml::from_str( &source )
			.map_err(| source | ArchiveError::Manifest { path: path.to_path_buf(), source })?;
		match manifest.short_name.trim().is_empty() {
			true => Err( ArchiveError::EmptyShortName( path.to_path_buf() )),
			false => Ok( manifest ),
		}
	}
}

/// Class definitions available to archives, grouped by class root name.
#[derive( Clone, Debug, Default )]
pub struct ClassCatalog {
	roots: HashMap<String, Vec<Arc<ClassDef>>>,
}

impl ClassCatalog {

	pub fn new() -> Self { Self::default() }

	pub fn define( &mut self, root: impl Into<String>, def: impl Into<Arc<ClassDef>> ) -> &mut Self {
		self.roots.entry( root.into() ).or_default().push( def.into() );
		self
	}

	pub fn with( mut self, root: impl Into<String>, def: impl Into<Arc<ClassDef>> ) -> Self {
		self.define( root, def );
		self
	}

	pub fn classes( &self, root: &str ) -> &[Arc<ClassDef>] {
		self.roots.get( root ).map( Vec::as_slice ).unwrap_or_default()
	}

}

/// Reads exploded archive directories.
#[derive( Clone, Debug, Default )]
pub struct ExplodedArchiveStrategy {
	catalog: ClassCatalog,
}

impl ExplodedArchiveStrategy {

	pub fn new( catalog: ClassCatalog ) -> Self { Self { catalog }}

	#[inline] pub fn catalog( &self ) -> &ClassCatalog { &self.catalog }

	fn root( &self, location: PathBuf, key: &str ) -> ClassRoot {
		ClassRoot::new( location ).with_classes( self.catalog.classes( key ).iter().cloned() )
	}

	fn library_roots( &self, archive: &Path ) -> Result<Vec<ClassRoot>, ArchiveError> {
		let lib = archive.join( LIB_DIR );
		if !lib.is_dir() { return Ok( Vec::with_capacity( 0 )) }
		let io_error = | source: std::io::Error | ArchiveError::Io { path: lib.clone(), source };
		std::fs::read_dir( &lib ).map_err( io_error )?
			.map(| entry | entry.map(| entry | entry.path() ))
			.collect::<Result<Vec<_>, _>>()
			.map_err( io_error )?
			.into_iter()
			.sorted_by(| a, b | a.file_name().cmp( &b.file_name() ))
			.map(| path | {
				let key = path.file_name().map(| name | name.to_string_lossy().into_owned() ).unwrap_or_default();
				self.root( path, &key )
			})
			.collect::<Vec<_>>()
			.pipe( Ok )
	}

}

fn sibling( archive: &Path, extension: &str ) -> PathBuf {
	let mut name = archive.file_name().map( std::ffi::OsStr::to_os_string ).unwrap_or_default();
	name.push( "." );
	name.push( extension );
	archive.with_file_name( name )
}

impl ArchiveStrategy for ExplodedArchiveStrategy {

	fn create_plugin_record( &self, archive: &Path, hook: &dyn ClassLoaderHook ) -> Result<PluginRecord, ArchiveError> {

		if !archive.is_dir() { return Err( ArchiveError::NotADirectory( archive.to_path_buf() )) }
		let manifest = PluginManifest::load( &archive.join( MANIFEST_FILE ))?;

		let mut roots = NEVec::new( self.root( archive.join( CLASSES_DIR ), &manifest.short_name ));
		for library in self.library_roots( archive )? { roots.push( library ); }
		let class_loader = hook.create_class_loader( roots );

		let enabled = !sibling( archive, "disabled" ).exists();
		let flags = PluginFlags {
			active: enabled,
			enabled,
			pinned: sibling( archive, "pinned" ).exists(),
			downgradable: sibling( archive, "bak" ).exists(),
		};

		Ok( PluginRecord::new( PluginDescriptor {
			archive: archive.to_path_buf(),
			short_name: manifest.short_name,
			version: manifest.version,
			plugin_class: manifest.plugin_class,
			dependencies: manifest.dependencies,
			flags,
		}, class_loader ))

	}

}
