//! Helpers for build tasks sharing one workspace per build

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use crate::error::SnapError;
use crate::host::{BuildHost, LogLevel};
use crate::loader::LoaderFactory;
use crate::workspace::{Project, SnapshotWorkspace};

/// Key under which the build's workspace is registered with the host
pub const WORKSPACE_KEY: &str = "projsnap::SnapshotWorkspace";

/// The workspace shared by every task in the current build, created with
/// `make_factory` on first use
pub fn workspace<F>(host: &dyn BuildHost, make_factory: F) -> Rc<RefCell<SnapshotWorkspace>>
where
    F: FnOnce() -> Box<dyn LoaderFactory>,
{
    if let Some(existing) = host
        .registered_object(WORKSPACE_KEY)
        .and_then(|object| object.downcast::<RefCell<SnapshotWorkspace>>().ok())
    {
        return existing;
    }

    let workspace = Rc::new(RefCell::new(SnapshotWorkspace::new(make_factory())));
    host.register_object(WORKSPACE_KEY, workspace.clone());
    workspace
}

/// Resolve `path` through the build's shared workspace
///
/// Failures are reported to the host as errors and returned; the workspace
/// stays usable for other projects.
pub fn get_or_add_project<F>(host: &dyn BuildHost, path: &Path, make_factory: F) -> Result<Project, SnapError>
where
    F: FnOnce() -> Box<dyn LoaderFactory>,
{
    let workspace = workspace(host, make_factory);
    let result = workspace.borrow_mut().get_or_add(host, path);
    if let Err(e) = &result {
        host.log(LogLevel::Error, &e.to_string());
    }
    result
}
