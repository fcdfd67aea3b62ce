#[allow( dead_code )]
mod fixture_archive {

	use std::path::{ Path, PathBuf };
	use std::sync::Arc ;
	use plugin_space::{
		ClassCatalog, ClassSpace, Config, Container, HostEnvironment, PluginWrapperFactory, SpacePluginStrategy,
	};

	/// Writes an exploded archive named after its short name, with an empty `classes/` root.
	/// `manifest_tail` is appended to the generated manifest.
	pub fn write_archive( dir: &Path, short_name: &str, manifest_tail: &str ) -> PathBuf {
		let archive = dir.join( short_name );
		std::fs::create_dir_all( archive.join( plugin_space::CLASSES_DIR )).unwrap();
		std::fs::write(
			archive.join( plugin_space::MANIFEST_FILE ),
			format!( "short-name = \"{short_name}\"\nversion = \"1.0\"\n{manifest_tail}" ),
		).unwrap();
		archive
	}

	pub fn write_library( archive: &Path, file_name: &str ) {
		let lib = archive.join( plugin_space::LIB_DIR );
		std::fs::create_dir_all( &lib ).unwrap();
		std::fs::write( lib.join( file_name ), b"" ).unwrap();
	}

	pub fn environment() -> HostEnvironment {
		HostEnvironment::new( "/opt/host" ).with_property( "mode", "test" )
	}

	pub fn strategy( container: &Arc<Container>, catalog: ClassCatalog ) -> SpacePluginStrategy {
		strategy_with( container, catalog, None, &Config::default() )
	}

	pub fn strategy_with(
		container: &Arc<Container>,
		catalog: ClassCatalog,
		parent: Option<Arc<dyn ClassSpace>>,
		config: &Config,
	) -> SpacePluginStrategy {
		SpacePluginStrategy::new( Arc::clone( container ), PluginWrapperFactory::exploded( catalog, parent ), environment(), config )
	}

}
