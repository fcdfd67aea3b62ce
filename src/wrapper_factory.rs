use std::path::Path ;
use std::sync::Arc ;
use nonempty_collections::NEVec ;
use tracing::trace ;

use crate::archive::{ ArchiveError, ArchiveStrategy, ClassCatalog, ClassLoaderHook, ExplodedArchiveStrategy };
use crate::class_loader::{ ClassLoader, ClassSpace };
use crate::class_root::ClassRoot ;
use crate::plugin_record::{ PluginRecord, PluginState };



/// Builds plugin records, giving every plugin its own isolated class loader.
///
/// Archive reading is delegated to an [`ArchiveStrategy`]; the factory only
/// decides how class loaders are made and ties each loader back to the
/// record it was made for.
pub struct PluginWrapperFactory {
	delegate: Box<dyn ArchiveStrategy>,
	parent: Option<Arc<dyn ClassSpace>>,
}

struct IsolatedLoaderHook<'a> {
	archive: &'a Path,
	parent: Option<&'a Arc<dyn ClassSpace>>,
}

impl ClassLoaderHook for IsolatedLoaderHook<'_> {
	fn create_class_loader( &self, roots: NEVec<ClassRoot> ) -> Arc<ClassLoader> {
		let loader = Arc::new( ClassLoader::new( roots, self.parent.cloned() ));
		trace!( "Created {} for {} ({})", loader.id(), self.archive.display(), PluginState::ClassLoaderCreated );
		loader
	}
}

impl PluginWrapperFactory {

	pub fn new( delegate: impl ArchiveStrategy + 'static, parent: Option<Arc<dyn ClassSpace>> ) -> Self {
		Self { delegate: Box::new( delegate ), parent }
	}

	/// A factory over exploded archives whose classes come from `catalog`.
	pub fn exploded( catalog: ClassCatalog, parent: Option<Arc<dyn ClassSpace>> ) -> Self {
		Self::new( ExplodedArchiveStrategy::new( catalog ), parent )
	}

	#[inline] pub fn parent( &self ) -> Option<&Arc<dyn ClassSpace>> { self.parent.as_ref() }

	/// # Errors
	/// Propagates the archive strategy's failure.
	pub fn create( &self, archive: &Path ) -> Result<Arc<PluginRecord>, ArchiveError> {
		trace!( "Creating plugin wrapper for {} ({})", archive.display(), PluginState::Discovered );
		let hook = IsolatedLoaderHook { archive, parent: self.parent.as_ref() };
		let record = Arc::new( self.delegate.create_plugin_record( archive, &hook )? );
		record.class_loader().attach_plugin( &record );
		trace!( "Wrapped plugin {} ({})", record, record.state() );
		Ok( record )
	}

}

impl std::fmt::Debug for PluginWrapperFactory {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "PluginWrapperFactory" )
			.field( "parent", &self.parent )
			.finish_non_exhaustive()
	}
}
