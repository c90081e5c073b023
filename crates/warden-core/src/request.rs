//! Invocation request types.
//!
//! An [`InvocationRequest`] describes one attempted call of a remote API
//! operation by an agent. It is built once by the collaborator that resolves
//! the tool, then shared read-only through the pipeline and, for requests
//! held for approval, stored verbatim so the exact arguments can be replayed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::{RequestError, RequestResult};
use crate::ids::ResourceId;

/// Rate-limit key used when a request does not name its caller.
const ANONYMOUS_CALLER: &str = "anonymous";

/// HTTP verb of the upstream operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    /// `GET`
    Get,
    /// `HEAD`
    Head,
    /// `OPTIONS`
    Options,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl HttpVerb {
    /// Canonical upper-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpVerb {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            _ => Err(RequestError::InvalidVerb(s.to_string())),
        }
    }
}

/// Coarse classification of what an operation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    /// Side-effect free.
    Read,
    /// Mutates upstream state.
    Write,
    /// Destructive or high-impact (deletes, payments, permission changes).
    Dangerous,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "READ"),
            Self::Write => write!(f, "WRITE"),
            Self::Dangerous => write!(f, "DANGEROUS"),
        }
    }
}

/// Primitive JSON type expected for a declared argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// JSON string.
    String,
    /// JSON number (integer or float).
    Number,
    /// JSON boolean.
    Boolean,
    /// JSON array.
    Array,
    /// JSON object.
    Object,
}

impl FieldType {
    /// Whether a JSON value has this primitive type.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }

    /// Describe the type of an arbitrary JSON value, for violation messages.
    #[must_use]
    pub fn describe(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        };
        f.write_str(name)
    }
}

/// Declared shape of an operation's argument map.
///
/// Supplied by the tool-resolving collaborator from the API description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentSchema {
    /// Fields that must be present.
    #[serde(default)]
    pub required: BTreeSet<String>,
    /// Expected primitive type per field (checked only when the field is present).
    #[serde(default)]
    pub fields: BTreeMap<String, FieldType>,
}

impl ArgumentSchema {
    /// Create an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a required field with its type.
    #[must_use]
    pub fn require(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        let name = name.into();
        self.required.insert(name.clone());
        self.fields.insert(name, ty);
        self
    }

    /// Declare an optional field with its type.
    #[must_use]
    pub fn optional(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.insert(name.into(), ty);
        self
    }
}

/// One attempted invocation of a remote operation.
///
/// Immutable once built: the builder methods consume `self`, and every
/// pipeline stage only borrows the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRequest {
    resource_id: ResourceId,
    operation_id: String,
    verb: HttpVerb,
    path: String,
    arguments: Map<String, Value>,
    classification: Classification,
    risk_tags: BTreeSet<String>,
    caller: String,
    schema: Option<ArgumentSchema>,
}

impl InvocationRequest {
    /// Create a request with no arguments, classified as [`Classification::Read`].
    #[must_use]
    pub fn new(
        resource_id: impl Into<ResourceId>,
        operation_id: impl Into<String>,
        verb: HttpVerb,
        path: impl Into<String>,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            operation_id: operation_id.into(),
            verb,
            path: path.into(),
            arguments: Map::new(),
            classification: Classification::Read,
            risk_tags: BTreeSet::new(),
            caller: ANONYMOUS_CALLER.to_string(),
            schema: None,
        }
    }

    /// Set the argument map.
    #[must_use]
    pub fn with_arguments(mut self, arguments: Map<String, Value>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Set the argument map from a JSON value; non-objects yield an empty map.
    #[must_use]
    pub fn with_json_arguments(mut self, arguments: Value) -> Self {
        self.arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self
    }

    /// Set the classification.
    #[must_use]
    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = classification;
        self
    }

    /// Add a risk tag.
    #[must_use]
    pub fn with_risk_tag(mut self, tag: impl Into<String>) -> Self {
        self.risk_tags.insert(tag.into());
        self
    }

    /// Set the caller / rate-limit key.
    #[must_use]
    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = caller.into();
        self
    }

    /// Attach the declared argument schema.
    #[must_use]
    pub fn with_schema(mut self, schema: ArgumentSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Protected resource this request targets.
    #[must_use]
    pub fn resource_id(&self) -> &ResourceId {
        &self.resource_id
    }

    /// Operation identifier.
    #[must_use]
    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    /// HTTP verb.
    #[must_use]
    pub fn verb(&self) -> HttpVerb {
        self.verb
    }

    /// Target path, relative to the resource's base URL.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Structured arguments.
    #[must_use]
    pub fn arguments(&self) -> &Map<String, Value> {
        &self.arguments
    }

    /// Classification tag.
    #[must_use]
    pub fn classification(&self) -> Classification {
        self.classification
    }

    /// Free-form risk tags.
    #[must_use]
    pub fn risk_tags(&self) -> &BTreeSet<String> {
        &self.risk_tags
    }

    /// Caller identity used as the rate-limit key.
    #[must_use]
    pub fn rate_limit_key(&self) -> &str {
        &self.caller
    }

    /// Declared argument schema, if any.
    #[must_use]
    pub fn schema(&self) -> Option<&ArgumentSchema> {
        self.schema.as_ref()
    }
}

/// Raw inbound form of a request, as received over the wire.
///
/// Every field is optional so that a malformed payload deserializes and is
/// then rejected by [`InvocationDraft::validate`] with a precise error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvocationDraft {
    /// Protected resource.
    #[serde(default)]
    pub resource_id: Option<String>,
    /// Operation identifier.
    #[serde(default)]
    pub operation_id: Option<String>,
    /// HTTP verb (case-insensitive).
    #[serde(default)]
    pub verb: Option<String>,
    /// Target path.
    #[serde(default)]
    pub path: Option<String>,
    /// Argument map.
    #[serde(default)]
    pub arguments: Map<String, Value>,
    /// Classification; absent means [`Classification::Dangerous`].
    #[serde(default)]
    pub classification: Option<Classification>,
    /// Risk tags.
    #[serde(default)]
    pub risk_tags: BTreeSet<String>,
    /// Caller / rate-limit key.
    #[serde(default)]
    pub caller: Option<String>,
    /// Declared argument schema.
    #[serde(default)]
    pub schema: Option<ArgumentSchema>,
}

impl InvocationDraft {
    /// Validate the draft into an immutable [`InvocationRequest`].
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] if the resource, operation, verb, or path is
    /// missing, the verb is unknown, or the path is not absolute.
    pub fn validate(self) -> RequestResult<InvocationRequest> {
        let resource_id = non_empty(self.resource_id, "resource_id")?;
        let operation_id = non_empty(self.operation_id, "operation_id")?;
        let verb: HttpVerb = non_empty(self.verb, "verb")?.parse()?;
        let path = non_empty(self.path, "path")?;
        if !path.starts_with('/') {
            return Err(RequestError::InvalidPath(path));
        }

        let caller = self
            .caller
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| ANONYMOUS_CALLER.to_string());

        Ok(InvocationRequest {
            resource_id: ResourceId::new(resource_id),
            operation_id,
            verb,
            path,
            arguments: self.arguments,
            classification: self.classification.unwrap_or(Classification::Dangerous),
            risk_tags: self.risk_tags,
            caller,
            schema: self.schema,
        })
    }
}

fn non_empty(value: Option<String>, field: &'static str) -> RequestResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(RequestError::MissingField(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft() -> InvocationDraft {
        InvocationDraft {
            resource_id: Some("shop".to_string()),
            operation_id: Some("createOrder".to_string()),
            verb: Some("post".to_string()),
            path: Some("/orders".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_verb_parse_is_case_insensitive() {
        assert_eq!("delete".parse::<HttpVerb>().unwrap(), HttpVerb::Delete);
        assert_eq!(" Get ".parse::<HttpVerb>().unwrap(), HttpVerb::Get);
        assert!(matches!(
            "TRACE".parse::<HttpVerb>(),
            Err(RequestError::InvalidVerb(_))
        ));
    }

    #[test]
    fn test_draft_validates_into_request() {
        let request = draft().validate().unwrap();
        assert_eq!(request.verb(), HttpVerb::Post);
        assert_eq!(request.path(), "/orders");
        assert_eq!(request.rate_limit_key(), "anonymous");
    }

    #[test]
    fn test_draft_without_classification_is_dangerous() {
        let request = draft().validate().unwrap();
        assert_eq!(request.classification(), Classification::Dangerous);
    }

    #[test]
    fn test_draft_missing_verb_rejected() {
        let mut d = draft();
        d.verb = None;
        assert_eq!(d.validate(), Err(RequestError::MissingField("verb")));
    }

    #[test]
    fn test_draft_blank_path_rejected() {
        let mut d = draft();
        d.path = Some("   ".to_string());
        assert_eq!(d.validate(), Err(RequestError::MissingField("path")));
    }

    #[test]
    fn test_draft_relative_path_rejected() {
        let mut d = draft();
        d.path = Some("orders".to_string());
        assert!(matches!(d.validate(), Err(RequestError::InvalidPath(_))));
    }

    #[test]
    fn test_draft_deserializes_from_json() {
        let d: InvocationDraft = serde_json::from_value(json!({
            "resource_id": "shop",
            "operation_id": "refund",
            "verb": "POST",
            "path": "/refunds",
            "arguments": {"amount": 10},
            "classification": "DANGEROUS",
            "risk_tags": ["payment"],
            "caller": "agent-1"
        }))
        .unwrap();
        let request = d.validate().unwrap();
        assert!(request.risk_tags().contains("payment"));
        assert_eq!(request.arguments()["amount"], json!(10));
    }

    #[test]
    fn test_field_type_matching() {
        assert!(FieldType::Number.matches(&json!(1.5)));
        assert!(!FieldType::Number.matches(&json!("1.5")));
        assert!(FieldType::Object.matches(&json!({})));
        assert_eq!(FieldType::describe(&json!(null)), "null");
    }

    #[test]
    fn test_with_json_arguments_ignores_non_objects() {
        let request = InvocationRequest::new("r", "op", HttpVerb::Get, "/")
            .with_json_arguments(json!([1, 2, 3]));
        assert!(request.arguments().is_empty());
    }
}
