//! Building the host container from a scan path.
//!
//! Bootstrapping turns a list of class roots into a class space, binds every
//! component recorded in that space's `named` index, enables member injection
//! when configured, and binds a [`SpaceExtensionFinder`] as the `default`
//! finder. Components that cannot be bound are skipped and reported as
//! warnings; a corrupt index aborts the bootstrap.

use std::sync::Arc ;
use nonempty_collections::NEVec ;
use serde::Deserialize ;
use thiserror::Error ;
use tracing::{ debug, info, Level };

use crate::class::{ Class, InstantiationError };
use crate::class_loader::{ ClassLoader, ClassSpace };
use crate::class_root::ClassRoot ;
use crate::config::Config ;
use crate::container::{ Container, Qualifier };
use crate::element::{ ElementKey, ElementKind };
use crate::extension::SpaceExtensionFinder ;
use crate::index::{ ConfigurationError, IndexError, Indexable, SpaceIndex };
use crate::index_item::SpaceIndexItem ;
use crate::utils::{ Merge, PartialSuccess };



/// Marks a class as a container component, optionally under an explicit name.
#[derive( Clone, Debug, Default, PartialEq, Eq, Deserialize )]
pub struct Named {
	#[serde( default )]
	pub value: Option<String>,
}

impl Indexable for Named {
	const NAME: &'static str = "named";
	type Instance = ();
}

/// The roots to scan, plus the space they are scanned on top of.
#[derive( Debug )]
pub struct ScanModule {
	parent: Option<Arc<dyn ClassSpace>>,
	roots: NEVec<ClassRoot>,
}

impl ScanModule {

	pub fn new( roots: NEVec<ClassRoot> ) -> Self { Self { parent: None, roots }}

	pub fn with_parent( mut self, parent: Arc<dyn ClassSpace> ) -> Self {
		self.parent = Some( parent );
		self
	}

	pub fn create_class_space( self ) -> Arc<ClassLoader> {
		if tracing::enabled!( Level::DEBUG ) {
			debug!( "Path:" );
			for root in &self.roots { debug!( "  {}", root.location().display() ) }
		}
		Arc::new( ClassLoader::new( self.roots, self.parent ))
	}

}

#[derive( Debug, Error )]
pub enum BootstrapError {
	#[error( "Invalid component index configuration: {0}" )]
	Configuration( #[from] ConfigurationError ),
	#[error( "Failed to read component index: {0}" )]
	Index( #[from] IndexError ),
}

/// A component that was found in the index but not bound.
#[derive( Debug, Error )]
pub enum BootstrapWarning {
	#[error( "Skipping component {element}: {source}" )]
	Unresolvable { element: ElementKey, #[source] source: InstantiationError },
	#[error( "Skipping {0}: only classes can be components" )]
	NotAClass( ElementKey ),
	#[error( "Skipping component {0}: it provides no types" )]
	NothingProvided( String ),
}

#[derive( Debug, Default )]
pub struct Bootstrap {
	config: Config,
}

impl Bootstrap {

	pub fn new( config: Config ) -> Self { Self { config }}

	#[inline] pub fn config( &self ) -> &Config { &self.config }

	/// # Errors
	/// Fails if the component index is unreadable. Individual components that
	/// cannot be bound are returned as warnings instead.
	pub fn bootstrap( &self, module: ScanModule ) -> Result<PartialSuccess<Arc<Container>, BootstrapWarning>, BootstrapError> {

		info!( "Bootstrapping container" );
		let space: Arc<dyn ClassSpace> = module.create_class_space();
		let container = Arc::new( Container::with_space( Arc::clone( &space )));

		let warnings = SpaceIndex::<Named, ()>::with_config( space, &self.config )?
			.iter()
			.try_fold( Vec::with_capacity( 0 ), | warnings, item | Ok::<_, BootstrapError>(
				match bind_component( &container, &item? ) {
					Ok(()) => warnings,
					Err( warning ) => warnings.merge( warning ),
				}
			))?;

		if self.config.member_injection { container.enable_member_injection() }
		container.bind_instance( Qualifier::default_name(), Arc::new( SpaceExtensionFinder::new( Arc::clone( &container ))));

		info!( "Container ready: {} binding(s), {} component(s) skipped", container.binding_count(), warnings.len() );
		Ok(( container, warnings ))

	}

}

fn bind_component( container: &Container, item: &SpaceIndexItem<Named, ()> ) -> Result<(), BootstrapWarning> {
	if item.kind() != ElementKind::Type { return Err( BootstrapWarning::NotAClass( item.key() )) }
	let unresolvable = | source: InstantiationError | BootstrapWarning::Unresolvable { element: item.key(), source };
	let class: &Class = item.element().map_err( unresolvable )?.class();
	let name = item.annotation().map_err( unresolvable )?.value.clone()
		.unwrap_or_else(|| class.name().to_string() );
	match container.bind_class( &Qualifier::named( name ), class ) {
		0 => Err( BootstrapWarning::NothingProvided( class.name().to_string() )),
		count => {
			debug!( "Bound {} ({} type(s))", class, count );
			Ok(())
		}
	}
}
