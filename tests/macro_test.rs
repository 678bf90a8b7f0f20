use investor_crawler::{completion_schema, tools::Tool, CompletionSchema, CrawlerError, Toolbox};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Deserialize, JsonSchema)]
struct LookupParams {
    company: String,
    #[serde(default)]
    year: Option<u16>,
}

investor_crawler::tool!(
    name = "lookup_deal",
    description = "Look up a deal by company name",
    params = LookupParams,
    |params: LookupParams| async move {
        if params.company.is_empty() {
            return Err("company must not be empty".to_string());
        }
        Ok(json!({
            "company": params.company,
            "year": params.year
        }))
    }
);

/// Fund vehicle raised by an investor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[completion_schema(name = "fund")]
struct Fund {
    /// Fund name, e.g. "Emeram Capital Partners III"
    fund_name: String,
    /// Committed capital as stated; empty if unknown
    #[serde(rename = "fundSize")]
    fund_size: String,
}

#[tokio::test]
async fn test_macro_generated_tool() {
    let tool = LookupDealTool;
    assert_eq!(tool.name(), "lookup_deal");
    assert_eq!(tool.description(), "Look up a deal by company name");

    let schema = tool.parameters_schema();
    assert_eq!(schema["properties"]["company"]["type"], "string");

    let result = tool
        .execute(json!({ "company": "Pflegia", "year": 2022 }))
        .await
        .unwrap();
    assert_eq!(result, json!({ "company": "Pflegia", "year": 2022 }));
}

#[tokio::test]
async fn test_macro_tool_reports_parameter_path() {
    let err = LookupDealTool
        .execute(json!({ "company": "Pflegia", "year": "last year" }))
        .await
        .unwrap_err();
    match err {
        CrawlerError::ToolExecution(message) => {
            assert!(message.contains("lookup_deal"), "{message}");
            assert!(message.contains("year"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_macro_tool_handler_errors() {
    let err = LookupDealTool.execute(json!({ "company": "" })).await.unwrap_err();
    assert!(matches!(err, CrawlerError::ToolExecution(ref m) if m == "company must not be empty"));
}

#[tokio::test]
async fn test_macro_tool_in_toolbox() {
    let mut toolbox = Toolbox::new();
    toolbox.register_tool(LookupDealTool);

    let tools = toolbox.get_openai_tools();
    assert_eq!(tools[0]["function"]["name"], "lookup_deal");

    let result = toolbox
        .execute_function("lookup_deal", json!({ "company": "Jobware" }))
        .await
        .unwrap();
    assert_eq!(result["company"], "Jobware");
}

#[test]
fn test_completion_schema_attribute() {
    let handle = Fund::schema();
    assert_eq!(handle.schema_name(), "fund");
    assert_eq!(handle.type_name(), "Fund");

    let schema = handle.schema_json();
    assert_eq!(schema["description"], "Fund vehicle raised by an investor.");
    assert_eq!(
        schema["properties"]["fundSize"]["description"],
        "Committed capital as stated; empty if unknown"
    );

    // Cached: every call hands out the same handle.
    assert!(std::ptr::eq(Fund::schema(), handle));
}
