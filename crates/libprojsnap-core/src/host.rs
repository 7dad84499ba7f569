//! The build host seen by tasks, and introspection of its engine state
//!
//! Hosts do not publish their global properties through any API, so they are
//! recovered from a dump of the live engine state. Known layouts are probed
//! in turn; an unknown layout is an error rather than an empty property set.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use serde_json::{json, Map, Value};
use tracing::{debug, error, info, warn};

use crate::error::SnapError;
use crate::types::GlobalProperties;

/// Severity of a message sent to the build host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Message,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Message => write!(f, "message"),
            LogLevel::Warning => write!(f, "warning"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// The engine a task runs inside
pub trait BuildHost {
    /// Opaque dump of the engine's internal state, if the host exposes one
    fn internal_state(&self) -> Option<&Value>;

    fn log(&self, level: LogLevel, message: &str);

    /// Object registered for the lifetime of the current build
    fn registered_object(&self, key: &str) -> Option<Rc<dyn Any>>;

    fn register_object(&self, key: &str, object: Rc<dyn Any>);
}

/// One known layout of a host's engine state
pub trait AmbientBuildContext {
    fn name(&self) -> &'static str;

    /// The global properties of the running project, or `None` when the
    /// state does not have this layout
    fn global_properties(&self, state: &Value) -> Option<GlobalProperties>;

    fn current_project_path(&self, state: &Value) -> Option<PathBuf>;
}

/// Field naming of the framework-hosted engine
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameworkShape;

/// Field naming of the open-source engine
#[derive(Debug, Clone, Copy, Default)]
pub struct OssShape;

impl AmbientBuildContext for FrameworkShape {
    fn name(&self) -> &'static str {
        "framework"
    }

    fn global_properties(&self, state: &Value) -> Option<GlobalProperties> {
        let instance = state.get("targetBuilderCallback")?.get("projectInstance")?;
        string_map(instance.get("globalProperties")?)
    }

    fn current_project_path(&self, state: &Value) -> Option<PathBuf> {
        let instance = state.get("targetBuilderCallback")?.get("projectInstance")?;
        instance.get("fullPath")?.as_str().map(PathBuf::from)
    }
}

impl AmbientBuildContext for OssShape {
    fn name(&self) -> &'static str {
        "oss"
    }

    fn global_properties(&self, state: &Value) -> Option<GlobalProperties> {
        let instance = state.get("_targetBuilderCallback")?.get("_projectInstance")?;
        string_map(instance.get("_globalProperties")?)
    }

    fn current_project_path(&self, state: &Value) -> Option<PathBuf> {
        let instance = state.get("_targetBuilderCallback")?.get("_projectInstance")?;
        instance.get("_fullPath")?.as_str().map(PathBuf::from)
    }
}

fn string_map(value: &Value) -> Option<GlobalProperties> {
    let object = value.as_object()?;
    let mut properties = GlobalProperties::new();
    for (name, value) in object {
        match value {
            Value::String(s) => properties.set(name.as_str(), s.as_str()),
            Value::Null => properties.set(name.as_str(), ""),
            other => properties.set(name.as_str(), other.to_string()),
        }
    }
    Some(properties)
}

const SHAPES: [&dyn AmbientBuildContext; 2] = [&FrameworkShape, &OssShape];

/// Find the first known layout that matches the host's state
pub fn detect_context(host: &dyn BuildHost) -> Result<&'static dyn AmbientBuildContext, SnapError> {
    let state = host
        .internal_state()
        .ok_or_else(|| SnapError::UnsupportedHost("host exposes no engine state".to_string()))?;

    SHAPES
        .iter()
        .copied()
        .find(|shape| shape.global_properties(state).is_some())
        .ok_or_else(|| {
            SnapError::UnsupportedHost(
                "engine state matches no known layout (tried framework and oss field names)".to_string(),
            )
        })
}

/// Snapshot the host's global properties, minus internal `_` names
pub fn capture_global_properties(host: &dyn BuildHost) -> Result<GlobalProperties, SnapError> {
    let shape = detect_context(host)?;
    let state = host
        .internal_state()
        .ok_or_else(|| SnapError::Internal("engine state disappeared".to_string()))?;
    let properties = shape
        .global_properties(state)
        .ok_or_else(|| SnapError::Internal("engine state changed while probing".to_string()))?
        .without_internal();

    debug!(shape = shape.name(), count = properties.len(), "captured global properties");
    Ok(properties)
}

/// In-memory host used outside a real build engine
///
/// Exposes its properties in the framework layout and records every log
/// message it receives.
pub struct StandaloneHost {
    state: Option<Value>,
    objects: RefCell<HashMap<String, Rc<dyn Any>>>,
    messages: RefCell<Vec<(LogLevel, String)>>,
}

impl StandaloneHost {
    pub fn new(properties: &GlobalProperties) -> Self {
        let globals: Map<String, Value> = properties
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        Self::with_state(json!({
            "targetBuilderCallback": {
                "projectInstance": { "globalProperties": globals }
            }
        }))
    }

    /// Host with an arbitrary engine state dump
    pub fn with_state(state: Value) -> Self {
        Self {
            state: Some(state),
            objects: RefCell::new(HashMap::new()),
            messages: RefCell::new(Vec::new()),
        }
    }

    /// Host that exposes no engine state at all
    pub fn opaque() -> Self {
        Self {
            state: None,
            objects: RefCell::new(HashMap::new()),
            messages: RefCell::new(Vec::new()),
        }
    }

    pub fn messages(&self) -> Vec<(LogLevel, String)> {
        self.messages.borrow().clone()
    }
}

impl Default for StandaloneHost {
    fn default() -> Self {
        Self::new(&GlobalProperties::new())
    }
}

impl BuildHost for StandaloneHost {
    fn internal_state(&self) -> Option<&Value> {
        self.state.as_ref()
    }

    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Message => info!("{}", message),
            LogLevel::Warning => warn!("{}", message),
            LogLevel::Error => error!("{}", message),
        }
        self.messages.borrow_mut().push((level, message.to_string()));
    }

    fn registered_object(&self, key: &str) -> Option<Rc<dyn Any>> {
        self.objects.borrow().get(key).cloned()
    }

    fn register_object(&self, key: &str, object: Rc<dyn Any>) {
        self.objects.borrow_mut().insert(key.to_string(), object);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framework_shape() {
        let props: GlobalProperties = [("Configuration", "Release"), ("_Internal", "x")]
            .into_iter()
            .collect();
        let host = StandaloneHost::new(&props);

        assert_eq!(detect_context(&host).unwrap().name(), "framework");
        let captured = capture_global_properties(&host).unwrap();
        assert_eq!(captured.get("configuration"), Some("Release"));
        assert!(!captured.contains("_Internal"));
    }

    #[test]
    fn test_oss_shape() {
        let host = StandaloneHost::with_state(json!({
            "_targetBuilderCallback": {
                "_projectInstance": {
                    "_fullPath": "/work/App/App.csproj",
                    "_globalProperties": { "Platform": "x64", "_Hidden": "1" }
                }
            }
        }));

        let shape = detect_context(&host).unwrap();
        assert_eq!(shape.name(), "oss");
        assert_eq!(
            shape.current_project_path(host.internal_state().unwrap()),
            Some(PathBuf::from("/work/App/App.csproj"))
        );
        let captured = capture_global_properties(&host).unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured.get("Platform"), Some("x64"));
    }

    #[test]
    fn test_unknown_shape_is_unsupported() {
        let host = StandaloneHost::with_state(json!({ "callback": { "project": {} } }));
        let err = capture_global_properties(&host).unwrap_err();
        assert!(matches!(err, SnapError::UnsupportedHost(_)));

        let err = capture_global_properties(&StandaloneHost::opaque()).unwrap_err();
        assert!(matches!(err, SnapError::UnsupportedHost(_)));
    }

    #[test]
    fn test_empty_properties_are_not_unsupported() {
        let captured = capture_global_properties(&StandaloneHost::default()).unwrap();
        assert!(captured.is_empty());
    }

    #[test]
    fn test_registered_objects_and_log() {
        let host = StandaloneHost::default();
        assert!(host.registered_object("k").is_none());
        host.register_object("k", Rc::new(42u32));
        let value = host.registered_object("k").unwrap().downcast::<u32>().unwrap();
        assert_eq!(*value, 42);

        host.log(LogLevel::Warning, "careful");
        assert_eq!(host.messages(), vec![(LogLevel::Warning, "careful".to_string())]);
    }
}
