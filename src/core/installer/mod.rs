pub mod action;
pub mod archive;
pub mod context;
pub mod descriptor;
pub mod executor;
pub mod session;

pub use action::InstallAction;
pub use context::{ActionContext, ResolvedFiles};
pub use descriptor::{FileDeclaration, FileSource, InstallerDescriptor, SUPPORTED_PROTOCOL};
pub use executor::{execute, ActionOutcome};
pub use session::{InstallSession, SessionState};
