//! Lazy, index-driven discovery of annotated elements.
//!
//! A [`SpaceIndex`] describes one kind of annotation (an [`Indexable`] type)
//! over one [`ClassSpace`]. Iterating it walks every `<prefix>/<kind>` index
//! resource visible from the space, reading one record at a time, and yields
//! each distinct element once as a [`SpaceIndexItem`]. Nothing is read until
//! the first item is requested, and every iteration is an independent session:
//! its cursor, open stream and set of already-seen elements belong to that
//! iterator alone.
//!
//! A failure while enumerating, opening or reading an index resource is
//! returned from the iteration step that hit it, closes any open stream, and
//! ends the session.

use std::collections::HashSet ;
use std::io::{ BufReader, Read };
use std::iter::FusedIterator ;
use std::marker::PhantomData ;
use std::sync::Arc ;
use serde::de::DeserializeOwned ;
use serde_json::de::IoRead ;
use thiserror::Error ;
use tracing::{ debug, trace, warn, Level };

use crate::class::TypeKey ;
use crate::class_loader::{ ClassSpace, ResourceLocation };
use crate::config::Config ;
use crate::context ;
use crate::element::{ DeclaredElement, ElementKey };
use crate::index_item::SpaceIndexItem ;



pub const DEFAULT_INDEX_PREFIX: &str = "META-INF/annotations";

/// An annotation kind that the build step records in an index.
///
/// The annotation's attribute values are reconstructed from the recorded
/// values with serde, so the implementing type doubles as the value object.
pub trait Indexable: DeserializeOwned + Send + Sync + 'static {
	/// Index resource name for this kind.
	const NAME: &'static str ;
	/// Type produced by annotated classes and members.
	type Instance: ?Sized + Send + Sync + 'static ;
	/// Further types an index may request instances as.
	fn supertypes() -> Vec<TypeKey> { Vec::with_capacity( 0 ) }
}

#[derive( Debug, Error )]
pub enum ConfigurationError {
	#[error( "Index '{kind}' produces {declared}, which cannot be requested as {requested}" )]
	IncompatibleInstanceType { kind: &'static str, declared: TypeKey, requested: TypeKey },
	#[error( "No context loader is installed on this thread" )]
	NoContextLoader,
}

#[derive( Debug, Error )]
pub enum IndexError {
	#[error( "Failed to enumerate index resources for '{kind}': {source}" )]
	Enumerate { kind: &'static str, #[source] source: std::io::Error },
	#[error( "Failed to open index resource {resource}: {source}" )]
	Open { resource: ResourceLocation, #[source] source: std::io::Error },
	#[error( "Malformed index record in {resource}: {source}" )]
	Read { resource: ResourceLocation, #[source] source: serde_json::Error },
	#[error( "Index resource {resource} ended without a terminator" )]
	Truncated { resource: ResourceLocation },
	#[error( "No more elements in index" )]
	NoSuchElement,
}

/// The elements annotated with `A` in a class space, with instances requested as `I`.
///
/// `I` must be `A::Instance`, one of `A::supertypes()`, or `()` when instances
/// will never be requested.
pub struct SpaceIndex<A: Indexable, I: ?Sized + 'static> {
	space: Arc<dyn ClassSpace>,
	prefix: String,
	loop_warning_threshold: usize,
	_marker: PhantomData<fn() -> ( A, Arc<I> )>,
}

impl<A: Indexable, I: ?Sized + Send + Sync + 'static> SpaceIndex<A, I> {

	/// # Errors
	/// Fails if `I` is not a type instances of `A` can be requested as.
	pub fn load( space: Arc<dyn ClassSpace> ) -> Result<Self, ConfigurationError> {
		Self::with_config( space, &Config::default() )
	}

	/// Indexes the space of the loader installed on the current thread.
	///
	/// # Errors
	/// Fails if no context loader is installed, or as [`load`]( Self::load ).
	pub fn load_context() -> Result<Self, ConfigurationError> {
		let loader = context::current().ok_or( ConfigurationError::NoContextLoader )?;
		Self::load( loader )
	}

	/// # Errors
	/// Fails if `I` is not a type instances of `A` can be requested as.
	pub fn with_config( space: Arc<dyn ClassSpace>, config: &Config ) -> Result<Self, ConfigurationError> {
		check_instance_type::<A, I>()?;
		Ok( Self {
			space,
			prefix: config.index_prefix.clone(),
			loop_warning_threshold: config.loop_warning_threshold,
			_marker: PhantomData,
		})
	}

	#[inline] pub fn space( &self ) -> &Arc<dyn ClassSpace> { &self.space }

	/// Starts a new iteration session.
	pub fn iter( &self ) -> LazyIndexIterator<'_, A, I> {
		if tracing::enabled!( Level::DEBUG ) {
			debug!(
				"Searching for indices of {} in {:?}",
				A::NAME,
				self.space.root_locations().iter().map(| root | root.display().to_string() ).collect::<Vec<_>>(),
			);
		}
		LazyIndexIterator {
			index: self,
			resources: None,
			session: Session::NeedResource,
			seen: HashSet::new(),
		}
	}

}

fn check_instance_type<A: Indexable, I: ?Sized + 'static>() -> Result<(), ConfigurationError> {
	let requested = TypeKey::of::<I>();
	let declared = TypeKey::of::<A::Instance>();
	match requested == declared || requested == TypeKey::of::<()>() || A::supertypes().contains( &requested ) {
		true => Ok(()),
		false => Err( ConfigurationError::IncompatibleInstanceType { kind: A::NAME, declared, requested }),
	}
}

impl<'a, A: Indexable, I: ?Sized + Send + Sync + 'static> IntoIterator for &'a SpaceIndex<A, I> {
	type Item = Result<SpaceIndexItem<A, I>, IndexError>;
	type IntoIter = LazyIndexIterator<'a, A, I>;
	fn into_iter( self ) -> Self::IntoIter { self.iter() }
}

impl<A: Indexable, I: ?Sized + 'static> std::fmt::Debug for SpaceIndex<A, I> {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "SpaceIndex" )
			.field( "kind", &A::NAME )
			.field( "instance", &TypeKey::of::<I>() )
			.field( "space", &self.space )
			.field( "prefix", &self.prefix )
			.finish()
	}
}

type RecordStream = serde_json::StreamDeserializer<'static, IoRead<BufReader<Box<dyn Read + Send>>>, Option<DeclaredElement>>;

struct OpenStream {
	resource: ResourceLocation,
	records: RecordStream,
}

impl OpenStream {
	fn new( resource: ResourceLocation, reader: Box<dyn Read + Send> ) -> Self {
		let records = serde_json::Deserializer::from_reader( BufReader::new( reader )).into_iter();
		Self { resource, records }
	}
}

enum Session<A, I: ?Sized> {
	NeedResource,
	StreamOpen( OpenStream ),
	ItemReady( SpaceIndexItem<A, I>, OpenStream ),
	Done,
}

/// One iteration session over a [`SpaceIndex`].
///
/// Besides [`Iterator`], the session supports an explicit
/// [`has_next`]( Self::has_next ) / [`next_item`]( Self::next_item ) protocol;
/// `has_next` reads ahead just far enough to find the next distinct element
/// and may be called any number of times.
pub struct LazyIndexIterator<'a, A: Indexable, I: ?Sized + 'static> {
	index: &'a SpaceIndex<A, I>,
	resources: Option<std::vec::IntoIter<ResourceLocation>>,
	session: Session<A, I>,
	seen: HashSet<ElementKey>,
}

impl<A: Indexable, I: ?Sized + Send + Sync + 'static> LazyIndexIterator<'_, A, I> {

	/// Whether another distinct element is available.
	///
	/// # Errors
	/// Returns the failure that ended the session; later calls return `Ok( false )`.
	pub fn has_next( &mut self ) -> Result<bool, IndexError> {
		self.advance()?;
		Ok( matches!( self.session, Session::ItemReady( .. )))
	}

	/// The next distinct element.
	///
	/// # Errors
	/// As [`has_next`]( Self::has_next ), plus [`IndexError::NoSuchElement`]
	/// once the session has ended.
	pub fn next_item( &mut self ) -> Result<SpaceIndexItem<A, I>, IndexError> {
		self.next().unwrap_or( Err( IndexError::NoSuchElement ))
	}

	/// Number of distinct elements yielded or read ahead so far.
	#[inline] pub fn seen( &self ) -> usize { self.seen.len() }

	fn next_resource( &mut self ) -> Result<Option<ResourceLocation>, IndexError> {
		if self.resources.is_none() {
			let found = self.index.space.find_entries( &self.index.prefix, A::NAME )
				.map_err(| source | IndexError::Enumerate { kind: A::NAME, source })?;
			debug!( "Found {} index resource(s) for {}", found.len(), A::NAME );
			self.resources = Some( found.into_iter() );
		}
		Ok( self.resources.as_mut().and_then( Iterator::next ))
	}

	/// Moves the session forward until an item is ready or the session is over.
	/// The session is parked in `Done` while a step runs, so any early error return is terminal.
	fn advance( &mut self ) -> Result<(), IndexError> {
		let mut steps = 0_usize ;
		loop {
			if steps == self.index.loop_warning_threshold {
				warn!( "Index lookup for {} has taken {} steps; the index may be corrupt", A::NAME, steps );
			}
			steps += 1 ;
			match std::mem::replace( &mut self.session, Session::Done ) {
				ready @ Session::ItemReady( .. ) => {
					self.session = ready ;
					return Ok(())
				}
				Session::Done => return Ok(()),
				Session::NeedResource => {
					let Some( resource ) = self.next_resource()? else {
						trace!( "Index {} exhausted after {} element(s)", A::NAME, self.seen.len() );
						return Ok(())
					};
					trace!( "Loading index resource {}", resource );
					let reader = self.index.space.open_resource( &resource )
						.map_err(| source | IndexError::Open { resource: resource.clone(), source })?;
					self.session = Session::StreamOpen( OpenStream::new( resource, reader ));
				}
				Session::StreamOpen( mut stream ) => match stream.records.next() {
					None => return Err( IndexError::Truncated { resource: stream.resource }),
					Some( Err( source )) => return Err( IndexError::Read { resource: stream.resource, source }),
					Some( Ok( None )) => self.session = Session::NeedResource,
					Some( Ok( Some( element ))) => {
						let key = element.key();
						if self.seen.contains( &key ) {
							trace!( "Skipping already indexed element {}", key );
							self.session = Session::StreamOpen( stream );
							continue
						}
						self.seen.insert( key );
						let item = SpaceIndexItem::new( element, Arc::clone( &self.index.space ), stream.resource.clone() );
						self.session = Session::ItemReady( item, stream );
						return Ok(())
					}
				},
			}
		}
	}

}

impl<A: Indexable, I: ?Sized + Send + Sync + 'static> Iterator for LazyIndexIterator<'_, A, I> {
	type Item = Result<SpaceIndexItem<A, I>, IndexError>;

	fn next( &mut self ) -> Option<Self::Item> {
		if let Err( err ) = self.advance() { return Some( Err( err )) }
		match std::mem::replace( &mut self.session, Session::Done ) {
			Session::ItemReady( item, stream ) => {
				self.session = Session::StreamOpen( stream );
				Some( Ok( item ))
			}
			_ => None,
		}
	}
}

impl<A: Indexable, I: ?Sized + Send + Sync + 'static> FusedIterator for LazyIndexIterator<'_, A, I> {}

impl<A: Indexable, I: ?Sized + 'static> std::fmt::Debug for LazyIndexIterator<'_, A, I> {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		let state = match &self.session {
			Session::NeedResource => "need-resource",
			Session::StreamOpen( _ ) => "stream-open",
			Session::ItemReady( .. ) => "item-ready",
			Session::Done => "done",
		};
		f.debug_struct( "LazyIndexIterator" )
			.field( "kind", &A::NAME )
			.field( "state", &state )
			.field( "seen", &self.seen.len() )
			.finish()
	}
}
