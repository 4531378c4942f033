//! Reasoner plugins
//!
//! A plugin is a shared object exposing two C-linkage entry points:
//!
//! - `mkb_create_reasoner(id) -> handle` - allocate an instance
//! - `mkb_plugin_name() -> cstring` - the stable plugin identifier
//!
//! The [`reasoner_plugin!`] macro declares both symbols for a type with a
//! single-argument id constructor, plus an in-process
//! [`PluginCapabilities`] record carrying the same two entry points as
//! plain function pointers. The manager consumes the capability record;
//! how a library path is resolved to one is a narrow hook, so the core
//! stays free of loader specifics. The default resolver is a process-wide
//! registration table fed by [`register_plugin`].

use std::sync::{OnceLock, RwLock};

use fnv::FnvHashMap;

use super::{Reasoner, ReasonerFactory};

/// The capability set a plugin exposes: its two entry points as function
/// pointers.
#[derive(Clone, Copy)]
pub struct PluginCapabilities {
    pub create: fn(&str) -> Box<dyn Reasoner>,
    pub name: fn() -> &'static str,
}

impl std::fmt::Debug for PluginCapabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginCapabilities").field("name", &(self.name)()).finish()
    }
}

fn registry() -> &'static RwLock<FnvHashMap<String, PluginCapabilities>> {
    static REGISTRY: OnceLock<RwLock<FnvHashMap<String, PluginCapabilities>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(FnvHashMap::default()))
}

/// Make a plugin's capability record resolvable under `path`. Plugins
/// linked into the process register themselves here; a dynamic loader
/// would do the same after resolving the C symbols of a shared object.
pub fn register_plugin(path: &str, capabilities: PluginCapabilities) {
    registry()
        .write()
        .expect("plugin registry lock poisoned")
        .insert(path.to_string(), capabilities);
}

fn resolve(path: &str) -> Option<PluginCapabilities> {
    registry()
        .read()
        .expect("plugin registry lock poisoned")
        .get(path)
        .copied()
}

/// A (possibly unloaded) plugin handle. A plugin is loaded iff both entry
/// points resolved; an unloaded handle is kept so a failing path is probed
/// only once.
#[derive(Debug)]
pub struct ReasonerPlugin {
    path: String,
    capabilities: Option<PluginCapabilities>,
}

impl ReasonerPlugin {
    /// Resolve `path` to its capability record.
    pub fn open(path: &str) -> Self {
        ReasonerPlugin { path: path.to_string(), capabilities: resolve(path) }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.capabilities.is_some()
    }
}

impl ReasonerFactory for ReasonerPlugin {
    fn name(&self) -> &str {
        match &self.capabilities {
            Some(caps) => (caps.name)(),
            None => &self.path,
        }
    }

    fn create(&self, id: &str) -> Box<dyn Reasoner> {
        let caps = self.capabilities.as_ref().expect("create on unloaded plugin");
        (caps.create)(id)
    }
}

/// Declare a reasoner plugin.
///
/// Generates the two C-linkage entry points loaders look for, and a
/// `plugin_capabilities()` function returning the equivalent in-process
/// capability record. The type must implement
/// [`ReasonerInit`](crate::reasoner::ReasonerInit).
#[macro_export]
macro_rules! reasoner_plugin {
    ($ty:ty, $name:literal) => {
        /// Plugin entry point: allocate a reasoner instance for `id`.
        ///
        /// # Safety
        /// `id` must be a valid NUL-terminated C string.
        #[no_mangle]
        pub unsafe extern "C" fn mkb_create_reasoner(
            id: *const ::std::os::raw::c_char,
        ) -> *mut ::std::os::raw::c_void {
            if id.is_null() {
                return ::std::ptr::null_mut();
            }
            let id = ::std::ffi::CStr::from_ptr(id).to_string_lossy().into_owned();
            let reasoner: ::std::boxed::Box<::std::boxed::Box<dyn $crate::reasoner::Reasoner>> =
                ::std::boxed::Box::new(::std::boxed::Box::new(
                    <$ty as $crate::reasoner::ReasonerInit>::with_id(&id),
                ));
            ::std::boxed::Box::into_raw(reasoner).cast()
        }

        /// Plugin entry point: the stable plugin identifier.
        #[no_mangle]
        pub extern "C" fn mkb_plugin_name() -> *const ::std::os::raw::c_char {
            concat!($name, "\0").as_ptr().cast()
        }

        /// The same entry points as an in-process capability record.
        pub fn plugin_capabilities() -> $crate::reasoner::PluginCapabilities {
            fn create(id: &str) -> ::std::boxed::Box<dyn $crate::reasoner::Reasoner> {
                ::std::boxed::Box::new(<$ty as $crate::reasoner::ReasonerInit>::with_id(id))
            }
            fn name() -> &'static str {
                $name
            }
            $crate::reasoner::PluginCapabilities { create, name }
        }
    };
}
