//! Index-driven extension discovery and isolated plugin loading for modular
//! host applications.
//!
//! A host application is assembled from class roots: its own, and one or more
//! per plugin. A build step records every annotated element of a root in a
//! small index resource, so discovery never has to scan code. `plugin_space`
//! reads those indexes lazily, binds the components it finds into a
//! dependency-injection container, and loads each plugin through its own
//! isolated class loader.
//!
//! # Core Concepts
//!
//! - [`ClassDef`]: A named class definition. It maps a stable class name to factories,
//! 	one per type the class can be constructed as, plus optional static members.
//!
//! - [`ClassRoot`]: One classpath entry. A location plus the class definitions and
//! 	in-memory resources published for it; other resources are read from disk.
//!
//! - [`ClassLoader`]: A [`ClassSpace`] over an ordered, non-empty list of roots with an
//! 	optional parent. Classes resolve from the loader's own roots first, so two plugins
//! 	may ship classes with the same name without seeing each other's.
//!
//! - [`SpaceIndex`]: The elements annotated with one [`Indexable`] kind, across a space.
//! 	Iteration is lazy, yields each element once, and materialises annotation values,
//! 	elements and instances only when asked.
//!
//! - [`Container`]: Bindings from types and [`Qualifier`]s to singleton providers, plus
//! 	the registry of loaded plugins. [`Injector`]s resolve constructor dependencies
//! 	against it.
//!
//! - [`ExtensionFinder`]: Lists every implementation of an extension point.
//! 	[`DelegatingExtensionFinder`] forwards to the finder bound as `default`.
//!
//! - [`SpacePluginStrategy`]: Wraps plugin archives and loads them. Each plugin is
//! 	registered, instantiated with its own loader as the thread's context loader
//! 	(see [`context`]), and started.
//!
//! - [`Bootstrap`]: Builds the host container from a [`ScanModule`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc ;
//! use plugin_space::{ ClassDef, ClassLoader, ClassRoot, DeclaredElement, Indexable, SpaceIndex, write_index, nev };
//!
//! trait Greeter: Send + Sync { fn greet( &self ) -> String ; }
//! struct English ;
//! impl Greeter for English { fn greet( &self ) -> String { "hello".into() } }
//!
//! // The annotation's attribute values are read back with serde.
//! #[derive( serde::Deserialize )]
//! struct Greeting { #[serde( default )] priority: i32 }
//!
//! impl Indexable for Greeting {
//! 	const NAME: &'static str = "example.Greeting" ;
//! 	type Instance = dyn Greeter ;
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // What the build step would have written for `@Greeting( priority = 10 ) class English`.
//! let mut index: Vec<u8> = Vec::new();
//! write_index( &mut index, &[ DeclaredElement::type_level( "example.English" ).with_value( "priority", 10 )])?;
//!
//! let root = ClassRoot::new( "app" )
//! 	.with_class( ClassDef::new( "example.English" )
//! 		.provides::<dyn Greeter>(| _ | Ok( Arc::new( English ) as Arc<dyn Greeter> )))
//! 	.with_resource( "META-INF/annotations/example.Greeting", index );
//! let loader = Arc::new( ClassLoader::new( nev![ root ], None ));
//!
//! for item in &SpaceIndex::<Greeting, dyn Greeter>::load( loader )? {
//! 	let item = item?;
//! 	assert_eq!( item.annotation()?.priority, 10 );
//! 	assert_eq!( item.instance()?.greet(), "hello" );
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Bootstrapping a host
//!
//! Classes recorded in the `named` index become container components, and the
//! container answers extension lookups through the finder bound as `default`.
//!
//! ```
//! use std::sync::Arc ;
//! use plugin_space::{
//! 	Bootstrap, ClassDef, ClassRoot, Config, DeclaredElement,
//! 	DelegatingExtensionFinder, ExtensionFinder, ScanModule, write_index, nev,
//! };
//!
//! trait Action: Send + Sync { fn name( &self ) -> &str ; }
//! struct Build ;
//! impl Action for Build { fn name( &self ) -> &str { "build" } }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut named: Vec<u8> = Vec::new();
//! write_index( &mut named, &[ DeclaredElement::type_level( "tasks.Build" ).with_value( "value", "build" )])?;
//! let root = ClassRoot::new( "host" )
//! 	.with_class( ClassDef::new( "tasks.Build" ).provides::<dyn Action>(| _ | Ok( Arc::new( Build ) as Arc<dyn Action> )))
//! 	.with_resource( "META-INF/annotations/named", named );
//!
//! let ( container, warnings ) = Bootstrap::new( Config::default() ).bootstrap( ScanModule::new( nev![ root ]))?;
//! assert!( warnings.is_empty() );
//!
//! let finder: DelegatingExtensionFinder = DelegatingExtensionFinder::from_container( &container )?;
//! let actions = finder.find::<dyn Action>();
//! assert_eq!( actions.len(), 1 );
//! assert_eq!( actions[0].instance().name(), "build" );
//!
//! // Bindings hold the finder, which holds the container.
//! container.dispose();
//! # Ok(())
//! # }
//! ```

mod utils ;
mod class ;
mod class_root ;
mod class_loader ;
pub mod context ;
mod element ;
mod index ;
mod index_item ;
mod container ;
mod injector ;
mod extension ;
mod plugin ;
mod plugin_record ;
mod archive ;
mod wrapper_factory ;
mod strategy ;
mod bootstrap ;
mod config ;

#[doc( no_inline )]
pub use nonempty_collections::{ NEVec, nev };

pub use utils::PartialSuccess ;
pub use class::{ BoxError, ClassDef, Class, InstantiationError, MemberKind, TypeKey };
pub use class_root::ClassRoot ;
pub use class_loader::{ ClassLoader, ClassNotFound, ClassSpace, LoaderId, ResourceLocation };
pub use element::{ DeclaredElement, ElementKey, ElementKind, index_path, write_index };
pub use index::{ ConfigurationError, DEFAULT_INDEX_PREFIX, IndexError, Indexable, LazyIndexIterator, SpaceIndex };
pub use index_item::{ ElementHandle, SpaceIndexItem };
pub use container::{ Container, InjectMembers, QualifiedBean, Qualifier, ResolveError };
pub use injector::Injector ;
pub use extension::{ DelegatingExtensionFinder, ExtensionComponent, ExtensionFinder, SpaceExtensionFinder };
pub use plugin::{ HostEnvironment, NoopPlugin, Plugin };
pub use plugin_record::{ Dependency, PluginDescriptor, PluginFlags, PluginRecord, PluginState };
pub use archive::{
	ArchiveError, ArchiveStrategy, ClassCatalog, ClassLoaderHook, ExplodedArchiveStrategy, PluginManifest,
	CLASSES_DIR, LIB_DIR, MANIFEST_FILE,
};
pub use wrapper_factory::PluginWrapperFactory ;
pub use strategy::{ PluginError, PluginPanic, PluginStrategy, SpacePluginStrategy };
pub use bootstrap::{ Bootstrap, BootstrapError, BootstrapWarning, Named, ScanModule };
pub use config::{ Config, ConfigError };
