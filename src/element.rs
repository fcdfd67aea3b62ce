//! Index records: what a build step writes about every annotated element, and
//! how those records are written.
//!
//! An index resource lives at `<prefix>/<kind>` in a class root and holds a
//! stream of JSON records, one [`DeclaredElement`] per annotated element,
//! followed by a `null` terminator. A resource that ends before the
//! terminator is treated as corrupt.

use std::io::Write ;
use serde::{ Deserialize, Serialize };
use serde_json::{ Map, Value };



/// Which kind of program element a record describes.
#[derive( Copy, Clone, Debug, Eq, PartialEq, Hash )]
pub enum ElementKind {
	Type,
	Method,
	Field,
}

/// One annotated element, as recorded in an index resource.
#[derive( Clone, Debug, PartialEq, Serialize, Deserialize )]
#[serde( rename_all = "kebab-case" )]
pub struct DeclaredElement {
	/// Fully qualified name of the owning class.
	pub owner_type: String,
	/// Member name for method- and field-level annotations.
	#[serde( default, skip_serializing_if = "Option::is_none" )]
	pub member_name: Option<String>,
	#[serde( default )]
	pub is_method: bool,
	/// The annotation's attribute values.
	#[serde( default )]
	pub values: Map<String, Value>,
}

impl DeclaredElement {

	pub fn type_level( owner: impl Into<String> ) -> Self {
		Self { owner_type: owner.into(), member_name: None, is_method: false, values: Map::new() }
	}

	pub fn method( owner: impl Into<String>, name: impl Into<String> ) -> Self {
		Self { owner_type: owner.into(), member_name: Some( name.into() ), is_method: true, values: Map::new() }
	}

	pub fn field( owner: impl Into<String>, name: impl Into<String> ) -> Self {
		Self { owner_type: owner.into(), member_name: Some( name.into() ), is_method: false, values: Map::new() }
	}

	pub fn with_value( mut self, key: impl Into<String>, value: impl Into<Value> ) -> Self {
		self.values.insert( key.into(), value.into() );
		self
	}

	pub fn kind( &self ) -> ElementKind {
		match ( self.is_method, &self.member_name ) {
			( true, _ ) => ElementKind::Method,
			( false, Some( _ )) => ElementKind::Field,
			( false, None ) => ElementKind::Type,
		}
	}

	/// Identity used to suppress duplicates within one iteration:
	/// `Owner#member()` for methods, `Owner#member` for fields, `Owner` for types.
	pub fn key( &self ) -> ElementKey {
		let member = self.member_name.as_deref().unwrap_or_default();
		ElementKey( match self.kind() {
			ElementKind::Method => format!( "{}#{}()", self.owner_type, member ),
			ElementKind::Field => format!( "{}#{}", self.owner_type, member ),
			ElementKind::Type => self.owner_type.clone(),
		})
	}

}

impl std::fmt::Display for DeclaredElement {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result { std::fmt::Display::fmt( &self.key(), f )}
}

/// See [`DeclaredElement::key`].
#[derive( Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord )]
pub struct ElementKey( String );

impl ElementKey {
	#[inline] pub fn as_str( &self ) -> &str { &self.0 }
}

impl std::fmt::Display for ElementKey {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result { f.write_str( &self.0 )}
}

impl PartialEq<str> for ElementKey {
	fn eq( &self, other: &str ) -> bool { self.0 == other }
}

impl PartialEq<&str> for ElementKey {
	fn eq( &self, other: &&str ) -> bool { self.0 == *other }
}

/// Path of the index resource for `kind` under `prefix`.
pub fn index_path( prefix: &str, kind: &str ) -> String {
	match prefix.trim_end_matches( '/' ) {
		"" => kind.to_string(),
		prefix => format!( "{prefix}/{kind}" ),
	}
}

/// Writes `elements` as an index stream, terminator included.
///
/// # Errors
/// Propagates failures of the underlying writer.
pub fn write_index<'a>( mut writer: impl Write, elements: impl IntoIterator<Item = &'a DeclaredElement> ) -> std::io::Result<()> {
	for element in elements {
		serde_json::to_writer( &mut writer, element )?;
		writer.write_all( b"\n" )?;
	}
	writer.write_all( b"null\n" )?;
	writer.flush()
}
