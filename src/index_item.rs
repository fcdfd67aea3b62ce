use std::sync::{ Arc, OnceLock };
use serde_json::Value ;

use crate::class::{ Class, InstantiationError, MemberKind };
use crate::class_loader::{ ClassSpace, ResourceLocation };
use crate::element::{ DeclaredElement, ElementKey, ElementKind };
use crate::index::Indexable ;
use crate::injector::Injector ;



/// A resolved program element: the owning class, plus the member for
/// method- and field-level annotations.
#[derive( Clone, Debug )]
pub enum ElementHandle {
	Type( Arc<Class> ),
	Method( Arc<Class>, String ),
	Field( Arc<Class>, String ),
}

impl ElementHandle {
	pub fn class( &self ) -> &Arc<Class> {
		match self {
			Self::Type( class ) | Self::Method( class, _ ) | Self::Field( class, _ ) => class,
		}
	}
	pub fn member_name( &self ) -> Option<&str> {
		match self {
			Self::Type( _ ) => None,
			Self::Method( _, name ) | Self::Field( _, name ) => Some( name ),
		}
	}
}

/// One distinct element yielded by a [`SpaceIndex`]( crate::SpaceIndex ) iteration.
///
/// The annotation value, the resolved element and the instance are each
/// materialised on first access and cached, so repeated calls are cheap and
/// return the same value. Failures are not cached.
pub struct SpaceIndexItem<A, I: ?Sized> {
	declared: DeclaredElement,
	space: Arc<dyn ClassSpace>,
	resource: ResourceLocation,
	annotation: OnceLock<A>,
	element: OnceLock<ElementHandle>,
	instance: OnceLock<Arc<I>>,
}

impl<A: Indexable, I: ?Sized + Send + Sync + 'static> SpaceIndexItem<A, I> {

	pub(crate) fn new( declared: DeclaredElement, space: Arc<dyn ClassSpace>, resource: ResourceLocation ) -> Self {
		Self {
			declared,
			space,
			resource,
			annotation: OnceLock::new(),
			element: OnceLock::new(),
			instance: OnceLock::new(),
		}
	}

	/// The raw record this item was read from.
	#[inline] pub fn declared( &self ) -> &DeclaredElement { &self.declared }
	#[inline] pub fn class_name( &self ) -> &str { &self.declared.owner_type }
	#[inline] pub fn member_name( &self ) -> Option<&str> { self.declared.member_name.as_deref() }
	#[inline] pub fn kind( &self ) -> ElementKind { self.declared.kind() }
	#[inline] pub fn key( &self ) -> ElementKey { self.declared.key() }
	/// The index resource the record came from.
	#[inline] pub fn resource( &self ) -> &ResourceLocation { &self.resource }

	/// The annotation value.
	///
	/// # Errors
	/// Fails if the recorded values do not deserialize into `A`.
	pub fn annotation( &self ) -> Result<&A, InstantiationError> {
		if let Some( annotation ) = self.annotation.get() { return Ok( annotation ) }
		let annotation = serde_json::from_value::<A>( Value::Object( self.declared.values.clone() ))
			.map_err(| source | InstantiationError::InvalidAnnotation { element: self.key().to_string(), source })?;
		Ok( self.annotation.get_or_init(|| annotation ))
	}

	/// The annotated element.
	///
	/// # Errors
	/// Fails if the owning class cannot be loaded or lacks the recorded member.
	pub fn element( &self ) -> Result<&ElementHandle, InstantiationError> {
		if let Some( element ) = self.element.get() { return Ok( element ) }
		let element = self.resolve_element()?;
		Ok( self.element.get_or_init(|| element ))
	}

	fn resolve_element( &self ) -> Result<ElementHandle, InstantiationError> {
		let class = self.space.load_class( &self.declared.owner_type )?;
		let kind = match self.kind() {
			ElementKind::Type => return Ok( ElementHandle::Type( class )),
			ElementKind::Method => MemberKind::Method,
			ElementKind::Field => MemberKind::Field,
		};
		let member = self.declared.member_name.clone().unwrap_or_default();
		if class.member_kind( &member ) != Some( kind ) {
			return Err( InstantiationError::MissingMember { class: class.name().to_string(), member, kind })
		}
		Ok( match kind {
			MemberKind::Method => ElementHandle::Method( class, member ),
			MemberKind::Field => ElementHandle::Field( class, member ),
		})
	}

	/// The element's value as `I`: a new instance of an annotated class, the
	/// result of an annotated method, or the value of an annotated field.
	///
	/// # Errors
	/// Fails if the element cannot be resolved or does not produce an `I`.
	pub fn instance( &self ) -> Result<Arc<I>, InstantiationError> {
		if let Some( instance ) = self.instance.get() { return Ok( Arc::clone( instance )) }
		let injector = Injector::for_space( Arc::clone( &self.space ));
		let instance = match self.element()? {
			ElementHandle::Type( class ) => class.construct::<I>( &injector )?,
			ElementHandle::Method( class, name ) => class.member_value::<I>( name, MemberKind::Method, &injector )?,
			ElementHandle::Field( class, name ) => class.member_value::<I>( name, MemberKind::Field, &injector )?,
		};
		Ok( Arc::clone( self.instance.get_or_init(|| instance )))
	}

}

impl<A, I: ?Sized> std::fmt::Debug for SpaceIndexItem<A, I> {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "SpaceIndexItem" )
			.field( "element", &self.declared.key() )
			.field( "resource", &self.resource )
			.finish_non_exhaustive()
	}
}

impl<A, I: ?Sized> std::fmt::Display for SpaceIndexItem<A, I> {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		std::fmt::Display::fmt( &self.declared.key(), f )
	}
}
