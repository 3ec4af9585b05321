//! Schema - Declarative field schemas for every resource kind
//!
//! Each kind has a [`ResourceSchema`] listing its fields with a default
//! value, a field type, optional select groups, a validity predicate, an
//! invalid-text generator and an optional visibility rule. The functions
//! attached to a field receive a [`FieldInput`] carrying the candidate
//! resource and the validation context explicitly.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::context::SaveContext;
use crate::document::{ConfigDocument, Resource, ResourceExt};
use crate::kind::ResourceKind;

/// Field names reserved for form control and never part of a resource
pub const RESERVED_FIELDS: &[&str] = &["create", "save", "delete", "shouldDisableSave"];

/// Field type, as rendered by the form layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Toggle,
    Select,
    MultiSelect,
    /// A nested JSON object edited as a whole
    Object,
    /// An array of nested sub-resources managed through their own forms
    SubCollection,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Number => "number",
            FieldType::Toggle => "toggle",
            FieldType::Select => "select",
            FieldType::MultiSelect => "multiselect",
            FieldType::Object => "object",
            FieldType::SubCollection => "subcollection",
        };
        f.write_str(name)
    }
}

/// Everything a field function may look at
#[derive(Debug, Clone, Copy)]
pub struct FieldInput<'a> {
    pub kind: ResourceKind,
    pub field: &'a str,
    pub data: &'a Resource,
    pub ctx: &'a SaveContext<'a>,
}

impl<'a> FieldInput<'a> {
    pub fn new(
        kind: ResourceKind,
        field: &'a str,
        data: &'a Resource,
        ctx: &'a SaveContext<'a>,
    ) -> Self {
        Self {
            kind,
            field,
            data,
            ctx,
        }
    }

    /// Raw value of the field
    pub fn value(&self) -> Option<&'a Value> {
        self.data.get(self.field)
    }

    /// String value of the field, `""` when absent
    pub fn text(&self) -> &'a str {
        self.data.text(self.field)
    }

    pub fn is_blank(&self) -> bool {
        self.data.is_blank(self.field)
    }

    pub fn doc(&self) -> &'a ConfigDocument {
        self.ctx.doc
    }
}

/// Validity predicate: returns true when the field is invalid
pub type InvalidFn = fn(&FieldInput<'_>) -> bool;
/// Message for an invalid field
pub type InvalidTextFn = fn(&FieldInput<'_>) -> String;
/// State-dependent select options
pub type GroupsFn = fn(&FieldInput<'_>) -> Vec<String>;
/// Visibility rule: returns true when the field does not apply
pub type HideWhenFn = fn(&FieldInput<'_>) -> bool;

/// Options for a select field
#[derive(Clone)]
pub enum Groups {
    Static(&'static [&'static str]),
    Dynamic(GroupsFn),
}

impl fmt::Debug for Groups {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Groups::Static(values) => f.debug_tuple("Static").field(values).finish(),
            Groups::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Message for an invalid field
#[derive(Clone)]
pub enum InvalidText {
    Static(&'static str),
    Dynamic(InvalidTextFn),
}

impl fmt::Debug for InvalidText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidText::Static(text) => f.debug_tuple("Static").field(text).finish(),
            InvalidText::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Field schema
#[derive(Clone)]
pub struct FieldSchema {
    pub name: &'static str,
    pub field_type: FieldType,
    pub default: Value,
    pub groups: Option<Groups>,
    pub invalid: Option<InvalidFn>,
    pub invalid_text: Option<InvalidText>,
    pub hide_when: Option<HideWhenFn>,
    /// Optional fields may be left blank
    pub optional: bool,
}

impl fmt::Debug for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSchema")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("default", &self.default)
            .field("groups", &self.groups)
            .field("invalid", &self.invalid.is_some())
            .field("invalid_text", &self.invalid_text)
            .field("hide_when", &self.hide_when.is_some())
            .field("optional", &self.optional)
            .finish()
    }
}

impl FieldSchema {
    pub fn new(name: &'static str, field_type: FieldType) -> Self {
        let default = match field_type {
            FieldType::Toggle => Value::Bool(false),
            FieldType::MultiSelect | FieldType::SubCollection => Value::Array(Vec::new()),
            FieldType::Object => Value::Object(Default::default()),
            FieldType::Select | FieldType::Number => Value::Null,
            FieldType::Text | FieldType::Textarea => Value::String(String::new()),
        };
        Self {
            name,
            field_type,
            default,
            groups: None,
            invalid: None,
            invalid_text: None,
            hide_when: None,
            optional: false,
        }
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(name, FieldType::Text)
    }

    pub fn number(name: &'static str) -> Self {
        Self::new(name, FieldType::Number)
    }

    pub fn toggle(name: &'static str) -> Self {
        Self::new(name, FieldType::Toggle)
    }

    pub fn select(name: &'static str) -> Self {
        Self::new(name, FieldType::Select)
    }

    pub fn multiselect(name: &'static str) -> Self {
        Self::new(name, FieldType::MultiSelect)
    }

    pub fn textarea(name: &'static str) -> Self {
        Self::new(name, FieldType::Textarea)
    }

    pub fn object(name: &'static str) -> Self {
        Self::new(name, FieldType::Object)
    }

    pub fn subcollection(name: &'static str) -> Self {
        Self::new(name, FieldType::SubCollection)
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = value;
        self
    }

    pub fn with_groups(mut self, groups: &'static [&'static str]) -> Self {
        self.groups = Some(Groups::Static(groups));
        self
    }

    pub fn with_dynamic_groups(mut self, groups: GroupsFn) -> Self {
        self.groups = Some(Groups::Dynamic(groups));
        self
    }

    pub fn invalid(mut self, invalid: InvalidFn) -> Self {
        self.invalid = Some(invalid);
        self
    }

    pub fn invalid_text(mut self, text: &'static str) -> Self {
        self.invalid_text = Some(InvalidText::Static(text));
        self
    }

    pub fn invalid_text_fn(mut self, text: InvalidTextFn) -> Self {
        self.invalid_text = Some(InvalidText::Dynamic(text));
        self
    }

    pub fn hide_when(mut self, hide_when: HideWhenFn) -> Self {
        self.hide_when = Some(hide_when);
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn is_hidden(&self, input: &FieldInput<'_>) -> bool {
        self.hide_when.is_some_and(|hide| hide(input))
    }

    /// True when the field is visible and its predicate fails. Optional
    /// fields left blank are never invalid.
    pub fn is_invalid(&self, input: &FieldInput<'_>) -> bool {
        if self.is_hidden(input) {
            return false;
        }
        if self.optional && input.is_blank() {
            return false;
        }
        self.invalid.is_some_and(|invalid| invalid(input))
    }

    pub fn message(&self, input: &FieldInput<'_>) -> String {
        match &self.invalid_text {
            Some(InvalidText::Static(text)) => text.to_string(),
            Some(InvalidText::Dynamic(text)) => text(input),
            None => format!("Invalid {}", self.name.replace('_', " ")),
        }
    }

    pub fn options(&self, input: &FieldInput<'_>) -> Vec<String> {
        match &self.groups {
            Some(Groups::Static(values)) => values.iter().map(|v| v.to_string()).collect(),
            Some(Groups::Dynamic(groups)) => groups(input),
            None => Vec::new(),
        }
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub kind: ResourceKind,
    pub fields: Vec<FieldSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            fields: Vec::new(),
            description: None,
        }
    }

    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of the fields that hold resource data: reserved control
    /// fields and sub-resource collections are excluded
    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.field_type != FieldType::SubCollection)
            .filter(|f| !RESERVED_FIELDS.contains(&f.name))
            .map(|f| f.name)
            .collect()
    }

    /// A resource with every field set to its default
    pub fn defaults(&self) -> Resource {
        self.fields
            .iter()
            .filter(|f| !RESERVED_FIELDS.contains(&f.name))
            .map(|f| (f.name.to_string(), f.default.clone()))
            .collect()
    }

    /// First invalid field in declaration order
    pub fn first_invalid(&self, data: &Resource, ctx: &SaveContext<'_>) -> Option<&FieldSchema> {
        self.fields
            .iter()
            .find(|f| f.is_invalid(&FieldInput::new(self.kind, f.name, data, ctx)))
    }

    /// Every invalid field with its message
    pub fn invalid_fields(&self, data: &Resource, ctx: &SaveContext<'_>) -> Vec<(&'static str, String)> {
        self.fields
            .iter()
            .filter_map(|f| {
                let input = FieldInput::new(self.kind, f.name, data, ctx);
                f.is_invalid(&input).then(|| (f.name, f.message(&input)))
            })
            .collect()
    }
}

/// Registry of every resource schema, keyed by kind
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<ResourceKind, ResourceSchema>,
}

impl SchemaRegistry {
    /// Registry holding the built-in schema for every kind
    pub fn new() -> Self {
        Self::from_schemas(crate::schemas::all_schemas())
    }

    pub fn from_schemas(schemas: Vec<ResourceSchema>) -> Self {
        Self {
            schemas: schemas.into_iter().map(|s| (s.kind, s)).collect(),
        }
    }

    pub fn get(&self, kind: ResourceKind) -> Option<&ResourceSchema> {
        self.schemas.get(&kind)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Real field names of a kind
    pub fn field_names(&self, kind: ResourceKind) -> Vec<&'static str> {
        self.get(kind).map(ResourceSchema::field_names).unwrap_or_default()
    }

    /// Evaluate a field's select options against the candidate and context
    pub fn groups(
        &self,
        kind: ResourceKind,
        field: &str,
        data: &Resource,
        ctx: &SaveContext<'_>,
    ) -> Vec<String> {
        self.get(kind)
            .and_then(|s| s.get(field))
            .map(|f| f.options(&FieldInput::new(kind, f.name, data, ctx)))
            .unwrap_or_default()
    }

    /// True when a field is hidden for the candidate
    pub fn is_hidden(
        &self,
        kind: ResourceKind,
        field: &str,
        data: &Resource,
        ctx: &SaveContext<'_>,
    ) -> bool {
        self.get(kind)
            .and_then(|s| s.get(field))
            .is_some_and(|f| f.is_hidden(&FieldInput::new(kind, f.name, data, ctx)))
    }

    /// Invalid-text for a field
    pub fn invalid_text(
        &self,
        kind: ResourceKind,
        field: &str,
        data: &Resource,
        ctx: &SaveContext<'_>,
    ) -> Option<String> {
        self.get(kind)
            .and_then(|s| s.get(field))
            .map(|f| f.message(&FieldInput::new(kind, f.name, data, ctx)))
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}
