//! Data processor group - transform records, render reports and validate
//! documents against a small schema language.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use regex::Regex;
use rmcp::model::JsonObject;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::domains::operations::{NoSettings, Operation, OperationContext, ServiceGroup};

// ============================================================================
// process_data
// ============================================================================

/// A single record with flexible content.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DataItem {
    /// Unique identifier for the data item
    pub id: String,
    /// The value of the data item
    pub value: Value,
    /// Optional metadata for the data item
    #[serde(default)]
    pub metadata: Option<JsonObject>,
}

/// Case transformation applied to string values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CaseTransform {
    Upper,
    Lower,
}

/// Direction of `sort_by`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// How records are processed.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ProcessingParameters {
    /// Metadata fields to keep in the output
    #[serde(default)]
    pub filter_fields: Option<Vec<String>>,
    /// Case transformation for string values
    #[serde(default)]
    pub transform_case: Option<CaseTransform>,
    /// Whether to aggregate numeric values
    #[serde(default)]
    pub aggregate: bool,
    /// Field to sort by: `id`, `value`, or a metadata key
    #[serde(default)]
    pub sort_by: Option<String>,
    /// Sort direction
    #[serde(default)]
    pub sort_order: SortOrder,
}

/// Parameters for `process_data`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ProcessDataParams {
    /// Records to process
    pub data: Vec<DataItem>,
    /// Processing options
    #[serde(default)]
    pub parameters: ProcessingParameters,
}

fn process_item(item: DataItem, params: &ProcessingParameters) -> JsonObject {
    let value = match (item.value, params.transform_case) {
        (Value::String(s), Some(CaseTransform::Upper)) => Value::String(s.to_uppercase()),
        (Value::String(s), Some(CaseTransform::Lower)) => Value::String(s.to_lowercase()),
        (value, _) => value,
    };

    let mut processed = JsonObject::new();
    processed.insert("id".into(), Value::String(item.id));
    processed.insert("value".into(), value);

    if let Some(metadata) = item.metadata.filter(|m| !m.is_empty()) {
        let metadata = match &params.filter_fields {
            Some(fields) => metadata
                .into_iter()
                .filter(|(key, _)| fields.contains(key))
                .collect(),
            None => metadata,
        };
        processed.insert("metadata".into(), Value::Object(metadata));
    }
    processed
}

/// Field used for sorting: `id`, `value`, or a metadata key.
fn sort_key<'a>(item: &'a JsonObject, field: &str) -> Option<&'a Value> {
    match field {
        "id" | "value" => item.get(field),
        key => item.get("metadata").and_then(|m| m.get(key)),
    }
}

/// Numbers before strings before everything else; missing values last.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(x), Value::Number(y)) => {
                let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
                x.total_cmp(&y)
            }
            (Value::Number(_), _) => Ordering::Less,
            (_, Value::Number(_)) => Ordering::Greater,
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::String(_), _) => Ordering::Less,
            (_, Value::String(_)) => Ordering::Greater,
            (x, y) => x.to_string().cmp(&y.to_string()),
        },
    }
}

/// Count, sum, average, min and max of the numeric values. Empty when
/// there are none.
fn aggregate(items: &[JsonObject]) -> JsonObject {
    let numbers: Vec<f64> = items
        .iter()
        .filter_map(|item| item.get("value").and_then(Value::as_f64))
        .collect();

    let mut aggregated = JsonObject::new();
    if numbers.is_empty() {
        return aggregated;
    }

    let sum: f64 = numbers.iter().sum();
    let min = numbers.iter().copied().fold(f64::INFINITY, f64::min);
    let max = numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    aggregated.insert("count".into(), json!(numbers.len()));
    aggregated.insert("sum".into(), json!(sum));
    aggregated.insert("average".into(), json!(sum / numbers.len() as f64));
    aggregated.insert("min".into(), json!(min));
    aggregated.insert("max".into(), json!(max));
    aggregated
}

// ============================================================================
// generate_report
// ============================================================================

/// Output flavour of a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReportStyle {
    #[default]
    Text,
    Markdown,
    Html,
}

/// Report formatting options.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ReportFormat {
    /// Title of the report
    #[serde(default = "default_title")]
    pub title: String,
    /// Whether to include a summary section
    #[serde(default = "enabled")]
    pub include_summary: bool,
    /// Whether to include a timestamp
    #[serde(default = "enabled")]
    pub include_timestamp: bool,
    /// Output format
    #[serde(default)]
    pub format_type: ReportStyle,
}

impl Default for ReportFormat {
    fn default() -> Self {
        Self {
            title: default_title(),
            include_summary: true,
            include_timestamp: true,
            format_type: ReportStyle::default(),
        }
    }
}

fn default_title() -> String {
    "Data Processing Report".to_string()
}

fn enabled() -> bool {
    true
}

/// Parameters for `generate_report`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ReportParams {
    /// Output of `process_data`
    pub processed_data: JsonObject,
    /// Formatting options
    #[serde(default)]
    pub format: ReportFormat,
}

/// Strings render bare; everything else as JSON.
fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

struct Report {
    style: ReportStyle,
    lines: Vec<String>,
}

impl Report {
    fn new(style: ReportStyle) -> Self {
        Self {
            style,
            lines: Vec::new(),
        }
    }

    fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    fn title(&mut self, title: &str) {
        match self.style {
            ReportStyle::Markdown => {
                self.push(format!("# {}", title));
                self.push("");
            }
            ReportStyle::Html => self.push(format!("<h1>{}</h1>", title)),
            ReportStyle::Text => {
                self.push(title);
                self.push("=".repeat(title.chars().count()));
            }
        }
    }

    fn timestamp(&mut self, timestamp: &str) {
        match self.style {
            ReportStyle::Markdown => {
                self.push(format!("**Generated:** {}", timestamp));
                self.push("");
            }
            ReportStyle::Html => {
                self.push(format!("<p><strong>Generated:</strong> {}</p>", timestamp))
            }
            ReportStyle::Text => {
                self.push(format!("Generated: {}", timestamp));
                self.push("");
            }
        }
    }

    fn summary(&mut self, total: usize, aggregated: Option<&JsonObject>) {
        let aggregated = aggregated.filter(|a| !a.is_empty());
        match self.style {
            ReportStyle::Markdown => {
                self.push("## Summary");
                self.push("");
                self.push(format!("**Total items:** {}", total));
                if let Some(aggregated) = aggregated {
                    self.push("");
                    self.push("### Aggregated Data");
                    self.push("");
                    for (key, value) in aggregated {
                        self.push(format!("- **{}:** {}", key, display(value)));
                    }
                }
                self.push("");
            }
            ReportStyle::Html => {
                self.push("<h2>Summary</h2>");
                self.push(format!("<p><strong>Total items:</strong> {}</p>", total));
                if let Some(aggregated) = aggregated {
                    self.push("<h3>Aggregated Data</h3>");
                    self.push("<ul>");
                    for (key, value) in aggregated {
                        self.push(format!("<li><strong>{}:</strong> {}</li>", key, display(value)));
                    }
                    self.push("</ul>");
                }
            }
            ReportStyle::Text => {
                self.push("Summary");
                self.push("-------");
                self.push(format!("Total items: {}", total));
                if let Some(aggregated) = aggregated {
                    self.push("");
                    self.push("Aggregated Data:");
                    for (key, value) in aggregated {
                        self.push(format!("  {}: {}", key, display(value)));
                    }
                }
                self.push("");
            }
        }
    }

    fn items(&mut self, items: &[Value]) {
        match self.style {
            ReportStyle::Markdown => self.push("## Data Items"),
            ReportStyle::Html => self.push("<h2>Data Items</h2>"),
            ReportStyle::Text => self.push("Data Items"),
        }
        match self.style {
            ReportStyle::Markdown => self.push(""),
            ReportStyle::Text => self.push("---------"),
            ReportStyle::Html => {}
        }

        for item in items {
            let id = item.get("id").map(display).unwrap_or_default();
            let value = item.get("value").map(display).unwrap_or_default();
            let metadata = item
                .get("metadata")
                .and_then(Value::as_object)
                .filter(|m| !m.is_empty());

            match self.style {
                ReportStyle::Markdown => {
                    self.push(format!("### Item: {}", id));
                    self.push(format!("- **Value:** {}", value));
                    if let Some(metadata) = metadata {
                        self.push("- **Metadata:**");
                        for (key, value) in metadata {
                            self.push(format!("  - {}: {}", key, display(value)));
                        }
                    }
                    self.push("");
                }
                ReportStyle::Html => {
                    self.push("<div class='item'>");
                    self.push(format!("<h3>Item: {}</h3>", id));
                    self.push(format!("<p><strong>Value:</strong> {}</p>", value));
                    if let Some(metadata) = metadata {
                        self.push("<div class='metadata'>");
                        self.push("<p><strong>Metadata:</strong></p>");
                        self.push("<ul>");
                        for (key, value) in metadata {
                            self.push(format!("<li>{}: {}</li>", key, display(value)));
                        }
                        self.push("</ul>");
                        self.push("</div>");
                    }
                    self.push("</div>");
                }
                ReportStyle::Text => {
                    self.push(format!("Item: {}", id));
                    self.push(format!("Value: {}", value));
                    if let Some(metadata) = metadata {
                        self.push("Metadata:");
                        for (key, value) in metadata {
                            self.push(format!("  {}: {}", key, display(value)));
                        }
                    }
                    self.push("");
                }
            }
        }
    }

    fn finish(self) -> String {
        let separator = if self.style == ReportStyle::Html { "" } else { "\n" };
        self.lines.join(separator)
    }
}

// ============================================================================
// validate_schema
// ============================================================================

/// Value types understood by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

/// A validation schema.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SchemaDefinition {
    /// Expected value type
    #[serde(rename = "type")]
    pub kind: SchemaType,
    /// Property schemas for objects
    #[serde(default)]
    pub properties: Option<BTreeMap<String, SchemaDefinition>>,
    /// Required properties for objects
    #[serde(default)]
    pub required: Option<Vec<String>>,
    /// Schema for array items
    #[serde(default)]
    pub items: Option<Box<SchemaDefinition>>,
    /// Format for strings (`email` is checked)
    #[serde(default)]
    pub format: Option<String>,
    /// Minimum for numbers
    #[serde(default)]
    pub minimum: Option<f64>,
    /// Maximum for numbers
    #[serde(default)]
    pub maximum: Option<f64>,
    /// Regex the start of a string must match
    #[serde(default)]
    pub pattern: Option<String>,
}

/// Parameters for `validate_schema`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ValidateParams {
    /// The data to validate
    pub data: Value,
    /// The schema to validate against
    pub schema: SchemaDefinition,
}

/// One validation failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

/// Outcome of `validate_schema`.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ValidationIssue>>,
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn child_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

/// Whether the start of `data` matches `pattern`. An invalid pattern never
/// matches.
fn matches_pattern(data: &str, pattern: &str) -> bool {
    Regex::new(&format!("^(?:{})", pattern))
        .map(|re| re.is_match(data))
        .unwrap_or(false)
}

fn validate(data: &Value, schema: &SchemaDefinition, path: &str, issues: &mut Vec<ValidationIssue>) {
    let issue = |message: String| ValidationIssue {
        path: path.to_string(),
        message,
    };
    let expected = |name: &str| issue(format!("Expected {}, got {}", name, type_name(data)));

    match schema.kind {
        SchemaType::Object => {
            let Some(object) = data.as_object() else {
                return issues.push(expected("object"));
            };
            for name in schema.required.iter().flatten() {
                if !object.contains_key(name) {
                    issues.push(ValidationIssue {
                        path: child_path(path, name),
                        message: format!("Required property '{}' is missing", name),
                    });
                }
            }
            for (name, property) in schema.properties.iter().flatten() {
                if let Some(value) = object.get(name) {
                    validate(value, property, &child_path(path, name), issues);
                }
            }
        }
        SchemaType::Array => {
            let Some(array) = data.as_array() else {
                return issues.push(expected("array"));
            };
            if let Some(items) = &schema.items {
                for (i, item) in array.iter().enumerate() {
                    validate(item, items, &format!("{}[{}]", path, i), issues);
                }
            }
        }
        SchemaType::String => {
            let Some(text) = data.as_str() else {
                return issues.push(expected("string"));
            };
            if schema.format.as_deref() == Some("email") && !text.contains('@') {
                issues.push(issue("Invalid email format".to_string()));
            }
            if let Some(pattern) = &schema.pattern {
                if !matches_pattern(text, pattern) {
                    issues.push(issue(format!("String does not match pattern: {}", pattern)));
                }
            }
        }
        SchemaType::Number | SchemaType::Integer => {
            let Some(number) = data.as_f64() else {
                return issues.push(expected("number"));
            };
            if schema.kind == SchemaType::Integer && !(data.is_i64() || data.is_u64()) {
                return issues.push(expected("integer"));
            }
            if let Some(minimum) = schema.minimum.filter(|m| number < *m) {
                issues.push(issue(format!(
                    "Value {} is less than minimum {}",
                    display(data),
                    minimum
                )));
            }
            if let Some(maximum) = schema.maximum.filter(|m| number > *m) {
                issues.push(issue(format!(
                    "Value {} is greater than maximum {}",
                    display(data),
                    maximum
                )));
            }
        }
        SchemaType::Boolean => {
            if !data.is_boolean() {
                issues.push(expected("boolean"));
            }
        }
        SchemaType::Null => {
            if !data.is_null() {
                issues.push(expected("null"));
            }
        }
    }
}

// ============================================================================
// Group Definition
// ============================================================================

/// Operations over JSON records.
pub struct DataProcessorGroup;

impl DataProcessorGroup {
    async fn process_data(
        self: Arc<Self>,
        request: ProcessDataParams,
        ctx: OperationContext,
    ) -> anyhow::Result<Value> {
        let params = request.parameters;
        let total = request.data.len();
        ctx.info(format!("Processing {} data items", total));

        let mut processed = Vec::with_capacity(total);
        for (i, item) in request.data.into_iter().enumerate() {
            ctx.report_progress((i + 1) as f64, Some(total as f64)).await;
            processed.push(process_item(item, &params));
        }

        if let Some(field) = &params.sort_by {
            processed.sort_by(|a, b| {
                let ordering = compare_values(sort_key(a, field), sort_key(b, field));
                match params.sort_order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }

        let mut result = JsonObject::new();
        if params.aggregate {
            result.insert("aggregated".into(), Value::Object(aggregate(&processed)));
        }
        result.insert(
            "processed_items".into(),
            Value::Array(processed.into_iter().map(Value::Object).collect()),
        );

        ctx.info("Data processing completed");
        Ok(Value::Object(result))
    }

    async fn generate_report(
        self: Arc<Self>,
        request: ReportParams,
        ctx: OperationContext,
    ) -> anyhow::Result<String> {
        let format = request.format;
        ctx.info(format!("Generating {:?} report", format.format_type));

        let items = request
            .processed_data
            .get("processed_items")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let aggregated = request
            .processed_data
            .get("aggregated")
            .and_then(Value::as_object);

        ctx.report_progress(1.0, Some(3.0)).await;
        let mut report = Report::new(format.format_type);
        report.title(&format.title);
        if format.include_timestamp {
            let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
            report.timestamp(&now);
        }

        ctx.report_progress(2.0, Some(3.0)).await;
        if format.include_summary && !items.is_empty() {
            report.summary(items.len(), aggregated);
        }
        if !items.is_empty() {
            report.items(items);
        }

        ctx.report_progress(3.0, Some(3.0)).await;
        Ok(report.finish())
    }

    async fn validate_schema(
        self: Arc<Self>,
        request: ValidateParams,
        _ctx: OperationContext,
    ) -> anyhow::Result<Value> {
        let mut issues = Vec::new();
        validate(&request.data, &request.schema, "", &mut issues);

        let result = ValidationResult {
            valid: issues.is_empty(),
            errors: (!issues.is_empty()).then_some(issues),
        };
        Ok(serde_json::to_value(result)?)
    }
}

impl ServiceGroup for DataProcessorGroup {
    const KIND: &'static str = "data-processor";
    const DESCRIPTION: &'static str = "Process, report on and validate JSON data";
    type Settings = NoSettings;

    fn new(_settings: Self::Settings) -> anyhow::Result<Self> {
        Ok(Self)
    }

    fn operations() -> Vec<Operation<Self>> {
        vec![
            Operation::with_schema("process_data", Self::process_data)
                .description("Process JSON data according to the given parameters."),
            Operation::with_schema("generate_report", Self::generate_report)
                .description("Generate a text, markdown or HTML report from processed data."),
            Operation::with_schema("validate_schema", Self::validate_schema)
                .description("Validate data against a schema definition."),
        ]
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::operations::context::tests::RecordingProgress;

    fn group() -> Arc<DataProcessorGroup> {
        Arc::new(DataProcessorGroup)
    }

    fn sample() -> Value {
        json!([
            {"id": "item1", "value": "Test Value", "metadata": {"category": "test", "priority": "high"}},
            {"id": "item2", "value": 42, "metadata": {"category": "numeric", "priority": "medium"}},
            {"id": "item3", "value": true, "metadata": {"category": "boolean", "priority": "low"}}
        ])
    }

    async fn process(parameters: Value) -> Value {
        let request: ProcessDataParams =
            serde_json::from_value(json!({"data": sample(), "parameters": parameters})).unwrap();
        group()
            .process_data(request, OperationContext::detached("data-processor.process_data"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_process_data_transforms_and_filters() {
        let recorder = Arc::new(RecordingProgress::default());
        let ctx = OperationContext::detached("data-processor.process_data")
            .with_progress(recorder.clone());
        let request: ProcessDataParams = serde_json::from_value(json!({
            "data": sample(),
            "parameters": {"transform_case": "upper", "filter_fields": ["category"]}
        }))
        .unwrap();

        let result = group().process_data(request, ctx).await.unwrap();
        let items = result["processed_items"].as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["value"], "TEST VALUE");
        assert_eq!(items[0]["metadata"], json!({"category": "test"}));
        assert_eq!(items[1]["value"], 42);
        assert!(result.get("aggregated").is_none());
        assert_eq!(recorder.updates.lock().await.len(), 3);
    }

    #[tokio::test]
    async fn test_process_data_aggregates_numbers() {
        let request: ProcessDataParams = serde_json::from_value(json!({
            "data": [
                {"id": "a", "value": 10},
                {"id": "b", "value": 20.5},
                {"id": "c", "value": "skip"}
            ],
            "parameters": {"aggregate": true}
        }))
        .unwrap();
        let result = group()
            .process_data(request, OperationContext::detached("data-processor.process_data"))
            .await
            .unwrap();

        let aggregated = &result["aggregated"];
        assert_eq!(aggregated["count"], 2);
        assert_eq!(aggregated["sum"], 30.5);
        assert_eq!(aggregated["average"], 15.25);
        assert_eq!(aggregated["min"], 10.0);
        assert_eq!(aggregated["max"], 20.5);

        let result = process(json!({"aggregate": true, "transform_case": "lower"})).await;
        assert_eq!(result["aggregated"]["count"], 1);
        assert_eq!(result["processed_items"][0]["value"], "test value");
    }

    #[tokio::test]
    async fn test_process_data_sorts_by_metadata() {
        let result = process(json!({"sort_by": "priority", "sort_order": "desc"})).await;
        let ids: Vec<_> = result["processed_items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["item2", "item3", "item1"]);
    }

    #[test]
    fn test_unknown_case_transform_is_rejected() {
        let result: Result<ProcessDataParams, _> = serde_json::from_value(json!({
            "data": [],
            "parameters": {"transform_case": "title"}
        }));
        assert!(result.is_err());
    }

    async fn report(format: Value) -> String {
        let processed = process(json!({"aggregate": true})).await;
        let request: ReportParams = serde_json::from_value(json!({
            "processed_data": processed,
            "format": format
        }))
        .unwrap();
        group()
            .generate_report(request, OperationContext::detached("data-processor.generate_report"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_text_report() {
        let text = report(json!({"title": "Items", "include_timestamp": false})).await;
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "Items");
        assert_eq!(lines[1], "=====");
        assert_eq!(lines[2], "Summary");
        assert!(text.contains("Total items: 3"));
        assert!(text.contains("  count: 1"));
        assert!(text.contains("Item: item1\nValue: Test Value\nMetadata:\n  category: test"));
        assert!(!text.contains("Generated:"));
    }

    #[tokio::test]
    async fn test_markdown_and_html_reports() {
        let markdown = report(json!({"format_type": "markdown"})).await;
        assert!(markdown.starts_with("# Data Processing Report\n"));
        assert!(markdown.contains("**Generated:** "));
        assert!(markdown.contains("### Item: item2\n- **Value:** 42"));

        let html = report(json!({"format_type": "html", "include_summary": false})).await;
        assert!(html.starts_with("<h1>Data Processing Report</h1><p><strong>Generated:"));
        assert!(!html.contains('\n'));
        assert!(!html.contains("Summary"));
        assert!(html.contains("<h3>Item: item3</h3><p><strong>Value:</strong> true</p>"));
    }

    #[tokio::test]
    async fn test_report_without_items() {
        let request: ReportParams = serde_json::from_value(json!({
            "processed_data": {},
            "format": {"include_timestamp": false}
        }))
        .unwrap();
        let text = group()
            .generate_report(request, OperationContext::detached("data-processor.generate_report"))
            .await
            .unwrap();
        assert_eq!(text, "Data Processing Report\n======================");
    }

    async fn check(data: Value, schema: Value) -> Value {
        let request: ValidateParams =
            serde_json::from_value(json!({"data": data, "schema": schema})).unwrap();
        group()
            .validate_schema(request, OperationContext::detached("data-processor.validate_schema"))
            .await
            .unwrap()
    }

    fn person_schema() -> Value {
        json!({
            "type": "object",
            "required": ["name", "age"],
            "properties": {
                "name": {"type": "string", "pattern": "[A-Z]"},
                "age": {"type": "integer", "minimum": 0, "maximum": 150},
                "email": {"type": "string", "format": "email"},
                "tags": {"type": "array", "items": {"type": "string"}}
            }
        })
    }

    #[tokio::test]
    async fn test_valid_document() {
        let result = check(
            json!({"name": "Ada", "age": 36, "email": "ada@example.com", "tags": ["x"]}),
            person_schema(),
        )
        .await;
        assert_eq!(result, json!({"valid": true}));
    }

    #[tokio::test]
    async fn test_invalid_document_reports_paths() {
        let result = check(
            json!({"name": "ada", "age": 200, "email": "nope", "tags": ["ok", 3]}),
            person_schema(),
        )
        .await;
        assert_eq!(result["valid"], false);

        let errors: Vec<(String, String)> = result["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| {
                (
                    e["path"].as_str().unwrap().to_string(),
                    e["message"].as_str().unwrap().to_string(),
                )
            })
            .collect();
        assert!(errors.contains(&("age".into(), "Value 200 is greater than maximum 150".into())));
        assert!(errors.contains(&("email".into(), "Invalid email format".into())));
        assert!(errors.contains(&("name".into(), "String does not match pattern: [A-Z]".into())));
        assert!(errors.contains(&("tags[1]".into(), "Expected string, got integer".into())));
    }

    #[tokio::test]
    async fn test_missing_required_and_wrong_types() {
        let result = check(json!({"age": 1.5}), person_schema()).await;
        let errors = result["errors"].as_array().unwrap();
        assert_eq!(errors[0]["path"], "name");
        assert_eq!(errors[0]["message"], "Required property 'name' is missing");
        assert_eq!(errors[1]["message"], "Expected integer, got number");

        let result = check(json!([1]), json!({"type": "object"})).await;
        assert_eq!(result["errors"][0]["message"], "Expected object, got array");

        let result = check(json!(null), json!({"type": "boolean"})).await;
        assert_eq!(result["errors"][0]["message"], "Expected boolean, got null");
    }

    #[test]
    fn test_invalid_pattern_never_matches() {
        assert!(matches_pattern("abc", "a"));
        assert!(!matches_pattern("cab", "a"));
        assert!(!matches_pattern("abc", "("));
    }
}
