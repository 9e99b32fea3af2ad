//! Filter compilation and caching.
//!
//! A [`DataFilter`] is what the browser asks for. The [`FilterCompiler`]
//! resolves it against the path space, the registry, permission lists and
//! collections into a [`CompiledFilter`]: flat sets plus enough folder
//! predicate state to answer single-item questions the same way bulk
//! enumeration does.

mod cache;
mod compiled;
mod compiler;
mod request;

pub use cache::{FilterCache, FilterCacheId, FilterCacheIdOwner, FilterCacheKey};
pub use compiled::{CompiledAssetDataFilter, CompiledFilter, UnsupportedAssetFilter};
pub use compiler::{
    CallbackCompiler, FilterCompiler, PrimitiveCompiler, RegistryCompiler, ShortCircuit,
};
pub use request::{
    ClassFilter, CollectionFilter, CompileCallback, CustomSourceAssetsCallback, DataFilter,
    LegacyFilter, ObjectFilter, PackageFilter, UnsupportedClassFilter,
};
