pub mod ids;
pub mod project;
pub mod properties;

pub use ids::{DocumentId, IdParseError, ProjectId};
pub use project::{CompilationOptions, DocumentInfo, OutputKind, Platform, ProjectInfo};
pub use properties::{GlobalProperties, SOLUTION_CONFIGURATION_PROPERTY};
