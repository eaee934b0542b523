//! Action-declaration schema shared by executors, agents, and the
//! completion capability.
//!
//! A declaration set is fixed at configuration time and exposed verbatim to
//! the completion capability; executors reject anything outside it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ActionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    String,
    Integer,
}

impl ParameterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.as_i64().is_some(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParameterType,
    pub required: bool,
    pub description: String,
}

impl ParameterSpec {
    pub fn required(
        name: impl Into<String>,
        kind: ParameterType,
        description: impl Into<String>,
    ) -> Self {
        Self { name: name.into(), kind, required: true, description: description.into() }
    }

    pub fn optional(
        name: impl Into<String>,
        kind: ParameterType,
        description: impl Into<String>,
    ) -> Self {
        Self { name: name.into(), kind, required: false, description: description.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
}

impl ActionDeclaration {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self { name: name.into(), description: description.into(), parameters: Vec::new() }
    }

    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Checks a requested argument map against this declaration: every
    /// required parameter present, every present parameter declared and
    /// type-conformant.
    pub fn validate(&self, arguments: &Map<String, Value>) -> Result<(), ActionError> {
        for spec in &self.parameters {
            match arguments.get(&spec.name) {
                Some(value) => {
                    if !spec.kind.matches(value) {
                        return Err(ActionError::invalid_parameter(
                            &self.name,
                            &spec.name,
                            format!("expected {}", spec.kind.as_str()),
                        ));
                    }
                }
                None if spec.required => {
                    return Err(ActionError::invalid_parameter(
                        &self.name,
                        &spec.name,
                        "required parameter is missing",
                    ));
                }
                None => {}
            }
        }

        if let Some(undeclared) =
            arguments.keys().find(|name| !self.parameters.iter().any(|spec| spec.name == **name))
        {
            return Err(ActionError::invalid_parameter(
                &self.name,
                undeclared,
                "parameter is not declared for this action",
            ));
        }

        Ok(())
    }
}

/// A named action group: the full declared surface of one domain executor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionGroup {
    pub name: String,
    pub description: String,
    pub actions: Vec<ActionDeclaration>,
}

impl ActionGroup {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self { name: name.into(), description: description.into(), actions: Vec::new() }
    }

    pub fn with_action(mut self, action: ActionDeclaration) -> Self {
        self.actions.push(action);
        self
    }

    pub fn find(&self, action_name: &str) -> Option<&ActionDeclaration> {
        self.actions.iter().find(|action| action.name == action_name)
    }

    /// Declaration lookup + argument validation in one step; the gate every
    /// executor runs before touching its store.
    pub fn check(&self, request: &ActionRequest) -> Result<&ActionDeclaration, ActionError> {
        let declaration = self
            .find(&request.name)
            .ok_or_else(|| ActionError::UnknownAction(request.name.clone()))?;
        declaration.validate(&request.arguments)?;
        Ok(declaration)
    }
}

/// What the completion capability asks an executor to run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl ActionRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), arguments: Map::new() }
    }

    pub fn with_string(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.insert(name.into(), Value::String(value.into()));
        self
    }

    pub fn with_integer(mut self, name: impl Into<String>, value: i64) -> Self {
        self.arguments.insert(name.into(), Value::from(value));
        self
    }

    pub fn string_arg(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).and_then(Value::as_str)
    }

    pub fn integer_arg(&self, name: &str) -> Option<i64> {
        self.arguments.get(name).and_then(Value::as_i64)
    }
}

/// Outcome of one completion call: either the final reply for this turn or
/// one or more action requests to evaluate sequentially.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "decision")]
pub enum Decision {
    Reply { text: String },
    Act { requests: Vec<ActionRequest> },
}

#[cfg(test)]
mod tests {
    use crate::errors::ActionError;

    use super::{ActionDeclaration, ActionGroup, ActionRequest, ParameterSpec, ParameterType};

    fn group() -> ActionGroup {
        ActionGroup::new("forecast_consumption_actions", "usage forecast actions").with_action(
            ActionDeclaration::new("update_forecasting", "update a forecast month")
                .with_parameter(ParameterSpec::required(
                    "customer_id",
                    ParameterType::String,
                    "unique customer identifier",
                ))
                .with_parameter(ParameterSpec::required(
                    "month",
                    ParameterType::Integer,
                    "target month, MM",
                ))
                .with_parameter(ParameterSpec::optional(
                    "note",
                    ParameterType::String,
                    "optional annotation",
                )),
        )
    }

    #[test]
    fn undeclared_action_is_rejected() {
        let request = ActionRequest::new("drop_all_forecasts");
        let error = group().check(&request).expect_err("undeclared action");
        assert_eq!(error, ActionError::UnknownAction("drop_all_forecasts".to_string()));
    }

    #[test]
    fn missing_required_parameter_names_the_parameter() {
        let request = ActionRequest::new("update_forecasting").with_string("customer_id", "C1");
        let error = group().check(&request).expect_err("missing month");
        assert!(
            matches!(error, ActionError::InvalidParameter { ref parameter, .. } if parameter == "month")
        );
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let request = ActionRequest::new("update_forecasting")
            .with_string("customer_id", "C1")
            .with_string("month", "07");
        let error = group().check(&request).expect_err("month must be integer");
        assert!(
            matches!(error, ActionError::InvalidParameter { ref reason, .. } if reason.contains("integer"))
        );
    }

    #[test]
    fn undeclared_parameter_is_rejected() {
        let request = ActionRequest::new("update_forecasting")
            .with_string("customer_id", "C1")
            .with_integer("month", 7)
            .with_integer("force", 1);
        let error = group().check(&request).expect_err("undeclared parameter");
        assert!(
            matches!(error, ActionError::InvalidParameter { ref parameter, .. } if parameter == "force")
        );
    }

    #[test]
    fn optional_parameters_may_be_omitted() {
        let request = ActionRequest::new("update_forecasting")
            .with_string("customer_id", "C1")
            .with_integer("month", 7);
        assert!(group().check(&request).is_ok());
    }

    #[test]
    fn typed_argument_accessors() {
        let request = ActionRequest::new("update_forecasting")
            .with_string("customer_id", "C1")
            .with_integer("month", 7);

        assert_eq!(request.string_arg("customer_id"), Some("C1"));
        assert_eq!(request.integer_arg("month"), Some(7));
        assert_eq!(request.string_arg("month"), None);
        assert_eq!(request.integer_arg("absent"), None);
    }
}
