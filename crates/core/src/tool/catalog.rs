use std::collections::HashMap;

use release_agent_model::ModelTool;
use serde_json::Value;

use super::{ControlTool, ToolObject};
use crate::Error;

/// How a tool name is served.
pub(crate) enum Entry {
    Control(ControlTool),
    Action(Box<dyn ToolObject>),
}

/// The tool catalog of a session: control tools plus registered actions.
///
/// The catalog is validated once when it is assembled, and the advertised
/// definitions are exactly the names that can be resolved afterwards.
pub(crate) struct Catalog {
    entries: HashMap<String, Entry>,
    definitions: Vec<ModelTool>,
}

impl Catalog {
    pub fn with_tools(tools: Vec<Box<dyn ToolObject>>) -> Result<Self, Error> {
        let mut entries = HashMap::with_capacity(tools.len() + 2);
        let mut definitions = Vec::with_capacity(tools.len() + 2);

        for control in ControlTool::ALL {
            definitions.push(control.definition());
            entries.insert(control.name().to_owned(), Entry::Control(control));
        }

        for tool in tools {
            let name = tool.name().to_owned();
            if ControlTool::from_name(&name).is_some() {
                return Err(Error::InvalidCatalog(format!(
                    "`{name}` is reserved for a control tool"
                )));
            }
            if entries.contains_key(&name) {
                return Err(Error::InvalidCatalog(format!(
                    "`{name}` is registered twice"
                )));
            }
            let parameters = close_schema(&name, tool.parameter_schema())?;
            definitions.push(ModelTool {
                name: name.clone(),
                description: tool.description().to_owned(),
                parameters,
            });
            entries.insert(name, Entry::Action(tool));
        }

        debug!(
            "tool catalog: {:?}",
            definitions.iter().map(|d| &d.name).collect::<Vec<_>>()
        );
        Ok(Self {
            entries,
            definitions,
        })
    }

    #[inline]
    pub fn definitions(&self) -> &[ModelTool] {
        &self.definitions
    }

    #[inline]
    pub fn resolve(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }
}

/// Makes sure the schema describes an object that rejects unknown fields.
fn close_schema(name: &str, schema: &Value) -> Result<Value, Error> {
    let mut schema = schema.clone();
    let Some(object) = schema.as_object_mut() else {
        return Err(Error::InvalidCatalog(format!(
            "parameters of `{name}` are not a JSON schema object"
        )));
    };
    if object.get("type").and_then(Value::as_str) != Some("object") {
        return Err(Error::InvalidCatalog(format!(
            "parameters of `{name}` must have type `object`"
        )));
    }
    match object.get("additionalProperties") {
        None => {
            object.insert("additionalProperties".to_owned(), Value::Bool(false));
        }
        Some(Value::Bool(false)) => {}
        Some(_) => {
            return Err(Error::InvalidCatalog(format!(
                "parameters of `{name}` must not allow additional properties"
            )));
        }
    }
    Ok(schema)
}
