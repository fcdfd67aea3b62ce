//! The per-thread context loader.
//!
//! Code that discovers things "from wherever the caller is running" reads the
//! current loader with [`current`]. Plugin loading installs the plugin's own
//! loader with [`enter`] for the duration of instantiation and startup; the
//! returned guard puts the previous value back when dropped, on success,
//! error and unwinding alike.

use std::cell::RefCell ;
use std::marker::PhantomData ;
use std::sync::Arc ;

use crate::class_loader::{ ClassLoader, LoaderId };



thread_local! {
	static CONTEXT_LOADER: RefCell<Option<Arc<ClassLoader>>> = const { RefCell::new( None ) };
}

/// The loader installed on the current thread, if any.
pub fn current() -> Option<Arc<ClassLoader>> {
	CONTEXT_LOADER.with(| slot | slot.borrow().clone() )
}

/// Identity of the loader installed on the current thread, if any.
pub fn current_id() -> Option<LoaderId> {
	CONTEXT_LOADER.with(| slot | slot.borrow().as_ref().map(| loader | loader.id() ))
}

/// Installs `loader` as the current thread's context loader until the guard is dropped.
pub fn enter( loader: Arc<ClassLoader> ) -> ContextGuard {
	ContextGuard::swap( Some( loader ))
}

/// Clears the current thread's context loader until the guard is dropped.
pub fn clear() -> ContextGuard {
	ContextGuard::swap( None )
}

/// Restores the previous context loader on drop. Bound to the thread it was created on.
#[must_use = "the context loader is restored as soon as the guard is dropped"]
pub struct ContextGuard {
	previous: Option<Arc<ClassLoader>>,
	_thread_bound: PhantomData<*const ()>,
}

impl ContextGuard {
	fn swap( loader: Option<Arc<ClassLoader>> ) -> Self {
		let previous = CONTEXT_LOADER.with(| slot | slot.replace( loader ));
		Self { previous, _thread_bound: PhantomData }
	}
}

impl Drop for ContextGuard {
	fn drop( &mut self ) {
		let previous = self.previous.take();
		// Thread-local may already be gone during thread teardown.
		let _ = CONTEXT_LOADER.try_with(| slot | *slot.borrow_mut() = previous );
	}
}

impl std::fmt::Debug for ContextGuard {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "ContextGuard" )
			.field( "previous", &self.previous.as_ref().map(| loader | loader.id() ))
			.finish()
	}
}
