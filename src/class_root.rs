use std::collections::HashMap ;
use std::io::{ Cursor, Read };
use std::fs::File ;
use std::path::{ Path, PathBuf };
use std::sync::Arc ;

use crate::class::ClassDef ;



/// One classpath entry: a location on disk together with the class
/// definitions published for it.
///
/// Resources are looked up in memory first and then relative to the
/// location, so a root can describe a real directory, a purely in-memory
/// bundle, or a mix of both.
#[derive( Debug, Clone )]
pub struct ClassRoot {
	location: PathBuf,
	classes: HashMap<String, Arc<ClassDef>>,
	resources: HashMap<String, Arc<[u8]>>,
}

impl ClassRoot {

	pub fn new( location: impl Into<PathBuf> ) -> Self {
		Self {
			location: location.into(),
			classes: HashMap::new(),
			resources: HashMap::new(),
		}
	}

	/// Publishes a class definition in this root. A later definition with the
	/// same name replaces the earlier one.
	pub fn with_class( mut self, def: impl Into<Arc<ClassDef>> ) -> Self {
		let def = def.into();
		self.classes.insert( def.name().to_string(), def );
		self
	}

	pub fn with_classes<D: Into<Arc<ClassDef>>>( self, defs: impl IntoIterator<Item = D> ) -> Self {
		defs.into_iter().fold( self, Self::with_class )
	}

	/// Adds an in-memory resource at a `/`-separated path.
	pub fn with_resource( mut self, path: impl Into<String>, data: impl Into<Vec<u8>> ) -> Self {
		self.resources.insert( path.into(), Arc::from( data.into() ));
		self
	}

	#[inline] pub fn location( &self ) -> &Path { &self.location }

	#[inline] pub fn class_def( &self, name: &str ) -> Option<&Arc<ClassDef>> { self.classes.get( name ) }

	pub fn has_resource( &self, path: &str ) -> bool {
		self.resources.contains_key( path ) || self.location.join( path ).is_file()
	}

	pub fn open( &self, path: &str ) -> std::io::Result<Box<dyn Read + Send>> {
		match self.resources.get( path ) {
			Some( data ) => Ok( Box::new( Cursor::new( Arc::clone( data )))),
			None => Ok( Box::new( File::open( self.location.join( path ))?)),
		}
	}

}
