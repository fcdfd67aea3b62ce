//! Extension discovery for the host.
//!
//! The host asks a finder for every implementation of an extension-point type
//! and gets back components it can rank. [`SpaceExtensionFinder`] answers from
//! the container's qualified bindings; [`DelegatingExtensionFinder`] is the
//! thin entry the host registers, forwarding to whichever finder is bound under
//! the name `default`.

use std::sync::Arc ;
use tracing::{ debug, error, trace };

use crate::container::{ Container, QualifiedBean, Qualifier, ResolveError };



/// A discovered extension with its ranking.
///
/// The ordinal is the extension's discovery position; lower ordinals come first.
pub struct ExtensionComponent<T: ?Sized> {
	bean: QualifiedBean<T>,
	ordinal: f64,
}

impl<T: ?Sized> ExtensionComponent<T> {
	pub fn new( bean: QualifiedBean<T>, ordinal: f64 ) -> Self { Self { bean, ordinal }}
	#[inline] pub fn instance( &self ) -> &Arc<T> { self.bean.value() }
	#[inline] pub fn into_instance( self ) -> Arc<T> { self.bean.into_value() }
	#[inline] pub fn ordinal( &self ) -> f64 { self.ordinal }
	#[inline] pub fn bean( &self ) -> &QualifiedBean<T> { &self.bean }
	#[inline] pub fn implementation( &self ) -> &str { self.bean.implementation() }
}

impl<T: ?Sized> Clone for ExtensionComponent<T> {
	fn clone( &self ) -> Self { Self { bean: self.bean.clone(), ordinal: self.ordinal }}
}

impl<T: ?Sized> std::fmt::Debug for ExtensionComponent<T> {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "ExtensionComponent" )
			.field( "bean", &self.bean )
			.field( "ordinal", &self.ordinal )
			.finish()
	}
}

impl<T: ?Sized> std::fmt::Display for ExtensionComponent<T> {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		write!( f, "ExtensionComponent{{type={}, priority={}, item={}}}", std::any::type_name::<T>(), self.ordinal, self.bean )
	}
}

pub trait ExtensionFinder {
	/// Every extension of type `T`. Never fails: a finder that cannot
	/// enumerate returns nothing.
	fn find<T: ?Sized + Send + Sync + 'static>( &self ) -> Vec<ExtensionComponent<T>>;
}

/// Finds extensions among a container's qualified bindings.
pub struct SpaceExtensionFinder {
	container: Arc<Container>,
}

impl SpaceExtensionFinder {

	pub fn new( container: Arc<Container> ) -> Self { Self { container }}

	#[inline] pub fn container( &self ) -> &Arc<Container> { &self.container }

	/// Like [`find`]( ExtensionFinder::find ), but reports the failure.
	///
	/// # Errors
	/// Fails if any matching binding cannot be provisioned.
	#[allow( clippy::cast_precision_loss )]
	pub fn try_find<T: ?Sized + Send + Sync + 'static>( &self ) -> Result<Vec<ExtensionComponent<T>>, ResolveError> {
		let components = self.container.locate::<T>()?
			.into_iter()
			.enumerate()
			.map(|( ordinal, bean )| ExtensionComponent::new( bean, ordinal as f64 ))
			.inspect(| component | trace!( "Found {}", component ))
			.collect::<Vec<_>>();
		debug!( "Found {} extension(s) of {}", components.len(), std::any::type_name::<T>() );
		Ok( components )
	}

}

impl ExtensionFinder for SpaceExtensionFinder {
	fn find<T: ?Sized + Send + Sync + 'static>( &self ) -> Vec<ExtensionComponent<T>> {
		match self.try_find::<T>() {
			Ok( components ) => components,
			Err( err ) => {
				error!( "Failed to find extensions of {}: {}", std::any::type_name::<T>(), err );
				Vec::with_capacity( 0 )
			}
		}
	}
}

impl std::fmt::Debug for SpaceExtensionFinder {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "SpaceExtensionFinder" ).finish_non_exhaustive()
	}
}

/// Forwards every request to the finder bound as `default`.
pub struct DelegatingExtensionFinder<F = SpaceExtensionFinder> {
	delegate: Arc<F>,
}

impl<F: ExtensionFinder + Send + Sync + 'static> DelegatingExtensionFinder<F> {

	pub fn new( delegate: Arc<F> ) -> Self { Self { delegate }}

	/// Looks up the delegate once; later requests go straight to it.
	///
	/// # Errors
	/// Fails if no finder of type `F` is bound as `default`.
	pub fn from_container( container: &Container ) -> Result<Self, ResolveError> {
		container.get_named::<F>( Qualifier::DEFAULT ).map( Self::new )
	}

	#[inline] pub fn delegate( &self ) -> &Arc<F> { &self.delegate }

}

impl<F: ExtensionFinder> ExtensionFinder for DelegatingExtensionFinder<F> {
	fn find<T: ?Sized + Send + Sync + 'static>( &self ) -> Vec<ExtensionComponent<T>> {
		self.delegate.find::<T>()
	}
}

impl<F> std::fmt::Debug for DelegatingExtensionFinder<F> {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "DelegatingExtensionFinder" )
			.field( "delegate", &std::any::type_name::<F>() )
			.finish()
	}
}
