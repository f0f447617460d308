//! Configuration sources: descriptors, resolution and the I/O seams they use.

mod descriptor;
mod env;
mod module;
mod source;
mod transport;

pub use descriptor::{SourceDescriptor, SourceKind};
pub use env::{DEFAULT_ENV_PREFIX, DEFAULT_ENV_SEPARATOR, Env, parse_bool};
pub use module::{BoxError, ConfigModule, FnModule, ModuleArgs, ModuleLoader, ModuleRegistry};
pub use source::{Source, SourceContext};
pub use transport::{DefaultTransport, HttpResponse, Transport};

pub(crate) use module::invoke as invoke_module;
