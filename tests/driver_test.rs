use async_trait::async_trait;
use investor_crawler::{
    CompletionSchema, CrawlerError, ErrorKind, ExtractionCapability, FailurePolicy, Investor,
    Outcome, PortfolioCompany, SchemaHandle, TaskDriver,
};
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

/// Deterministic capability: answers per URL from a table of canned responses.
#[derive(Default)]
struct MockCapability {
    responses: HashMap<String, Response>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    instructions: Mutex<Vec<String>>,
}

#[derive(Clone)]
enum Response {
    Payload(Value),
    Fail(&'static str),
    Delay(Duration, Value),
}

impl MockCapability {
    fn with(mut self, url: &str, response: Response) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtractionCapability for MockCapability {
    async fn extract(&self, instruction: &str, schema: &SchemaHandle) -> investor_crawler::Result<Value> {
        assert_eq!(schema.schema_name(), "Investor");
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.instructions.lock().unwrap().push(instruction.to_string());

        let response = self
            .responses
            .iter()
            .find(|(url, _)| instruction.contains(url.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or(Response::Fail("no canned response"));

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let result = match response {
            Response::Payload(value) => Ok(value),
            Response::Fail(message) => Err(CrawlerError::Http(message.to_string())),
            Response::Delay(delay, value) => {
                tokio::time::sleep(delay).await;
                Ok(value)
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn canned_investor(name: &str) -> Investor {
    Investor {
        investor_name: name.to_string(),
        investor_description: format!("{name} invests in mid-market companies"),
        investor_website: format!("https://{}.example", name.to_lowercase()),
        portfolio_companies: vec![
            PortfolioCompany {
                company_name: "Pflegia".to_string(),
                company_website: "https://pflegia.de".to_string(),
                holding_status: "Current".to_string(),
                transaction_date: "2022".to_string(),
            },
            PortfolioCompany {
                company_name: "Jobware".to_string(),
                company_website: "https://jobware.de".to_string(),
                holding_status: "Exited".to_string(),
                transaction_date: "2016".to_string(),
            },
        ],
        target_industry: vec!["Healthcare".to_string(), "Software".to_string()],
        ticket_size: "EUR 10-50m".to_string(),
        target_ev: "EUR 20-150m".to_string(),
    }
}

fn payload(investor: &Investor) -> Value {
    serde_json::to_value(investor).unwrap()
}

fn urls(list: &[&str]) -> Vec<String> {
    list.iter().map(|url| url.to_string()).collect()
}

#[tokio::test]
async fn canned_value_comes_back_exactly() {
    let expected = canned_investor("Example");
    let capability = Arc::new(
        MockCapability::default().with("https://example.com/portfolio", Response::Payload(payload(&expected))),
    );
    let driver = TaskDriver::new(capability.clone());

    let records = driver
        .run::<Investor>(&urls(&["https://example.com/portfolio"]))
        .await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, "https://example.com/portfolio");
    assert_eq!(records[0].value(), Some(&expected));
    assert!(records[0].empty_fields().is_empty());
    assert_eq!(capability.calls(), 1);

    let instructions = capability.instructions.lock().unwrap();
    assert!(instructions[0].contains("https://example.com/portfolio"));
    assert!(instructions[0].contains("portfolio company"));
}

#[tokio::test]
async fn empty_url_list_makes_no_calls() {
    let capability = Arc::new(MockCapability::default());
    let driver = TaskDriver::new(capability.clone());

    let records = driver.run::<Investor>(&[]).await;

    assert!(records.is_empty());
    assert_eq!(capability.calls(), 0);
}

#[tokio::test]
async fn one_failure_among_three_keeps_its_slot() {
    let capability = MockCapability::default()
        .with("https://a.example", Response::Payload(payload(&canned_investor("Alpha"))))
        .with("https://b.example", Response::Fail("connection reset"))
        .with("https://c.example", Response::Payload(payload(&canned_investor("Gamma"))));
    let driver = TaskDriver::new(capability);

    let records = driver
        .run::<Investor>(&urls(&["https://a.example", "https://b.example", "https://c.example"]))
        .await;

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].value().unwrap().investor_name, "Alpha");
    assert_eq!(records[2].value().unwrap().investor_name, "Gamma");

    let error = records[1].error().expect("middle slot failed");
    assert_eq!(records[1].url, "https://b.example");
    assert_eq!(error.kind, ErrorKind::CapabilityInvocation);
    assert!(error.message.contains("connection reset"));
    assert_eq!(
        records.iter().map(|r| r.index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
}

#[tokio::test]
async fn repeated_runs_are_identical() {
    let capability = MockCapability::default()
        .with("https://a.example", Response::Payload(payload(&canned_investor("Alpha"))))
        .with("https://b.example", Response::Fail("HTTP 503"));
    let driver = TaskDriver::new(capability);
    let targets = urls(&["https://a.example", "https://b.example"]);

    let project = |records: Vec<investor_crawler::ExtractionRecord<Investor>>| {
        records
            .into_iter()
            .map(|record| (record.index, record.url, record.outcome))
            .collect::<Vec<_>>()
    };

    let first = project(driver.run::<Investor>(&targets).await);
    let second = project(driver.run::<Investor>(&targets).await);
    assert_eq!(first, second);
}

#[tokio::test]
async fn nonconforming_payload_is_schema_error() {
    let capability = MockCapability::default().with(
        "https://a.example",
        Response::Payload(json!({ "investor_name": "Alpha", "portfolio_companies": "many" })),
    );
    let driver = TaskDriver::new(capability);

    let records = driver.run::<Investor>(&urls(&["https://a.example"])).await;

    let error = records[0].error().unwrap();
    assert_eq!(error.kind, ErrorKind::SchemaConformance);
    assert_eq!(error.code, "SCHEMA_CONFORMANCE_ERROR");
}

#[tokio::test]
async fn empty_required_fields_are_flagged_not_failed() {
    let mut partial = canned_investor("Alpha");
    partial.ticket_size.clear();
    partial.target_ev.clear();
    partial.portfolio_companies.clear();

    let capability =
        MockCapability::default().with("https://a.example", Response::Payload(payload(&partial)));
    let driver = TaskDriver::new(capability);

    let records = driver.run::<Investor>(&urls(&["https://a.example"])).await;

    assert!(records[0].is_extracted());
    assert_eq!(records[0].status(), "partial");
    let mut empty = records[0].empty_fields().to_vec();
    empty.sort();
    assert_eq!(empty, vec!["portfolio_companies", "target_EV", "ticket_size"]);

    // Every required field is present on the decoded value's wire form.
    let wire = payload(records[0].value().unwrap());
    for field in Investor::schema().required_fields() {
        assert!(wire.get(field).is_some_and(|v| !v.is_null()), "{field}");
    }
}

#[tokio::test]
async fn slow_call_times_out_as_distinct_failure() {
    let capability = MockCapability::default()
        .with(
            "https://slow.example",
            Response::Delay(Duration::from_secs(30), payload(&canned_investor("Slow"))),
        )
        .with("https://fast.example", Response::Payload(payload(&canned_investor("Fast"))));
    let driver = TaskDriver::new(capability).with_call_timeout(Duration::from_millis(50));

    let records = driver
        .run::<Investor>(&urls(&["https://slow.example", "https://fast.example"]))
        .await;

    let error = records[0].error().unwrap();
    assert_eq!(error.kind, ErrorKind::Timeout);
    assert_eq!(error.code, "TIMEOUT_ERROR");
    assert_eq!(records[1].value().unwrap().investor_name, "Fast");
}

#[tokio::test]
async fn fail_fast_skips_remaining_targets() {
    let capability = Arc::new(
        MockCapability::default()
            .with("https://a.example", Response::Payload(payload(&canned_investor("Alpha"))))
            .with("https://b.example", Response::Fail("HTTP 500")),
    );
    let driver = TaskDriver::new(capability.clone()).with_failure_policy(FailurePolicy::FailFast);

    let records = driver
        .run::<Investor>(&urls(&[
            "https://a.example",
            "https://b.example",
            "https://c.example",
            "https://d.example",
        ]))
        .await;

    assert_eq!(records.len(), 4);
    assert!(records[0].is_extracted());
    assert!(records[1].is_failed());
    assert_eq!(records[2].outcome, Outcome::Skipped);
    assert_eq!(records[3].outcome, Outcome::Skipped);
    assert_eq!(records[3].url, "https://d.example");
    assert_eq!(capability.calls(), 2);
}

#[tokio::test]
async fn concurrent_runs_keep_input_order_and_bound() {
    // Earlier targets finish last.
    let capability = Arc::new(
        MockCapability::default()
            .with(
                "https://a.example",
                Response::Delay(Duration::from_millis(150), payload(&canned_investor("Alpha"))),
            )
            .with(
                "https://b.example",
                Response::Delay(Duration::from_millis(100), payload(&canned_investor("Beta"))),
            )
            .with(
                "https://c.example",
                Response::Delay(Duration::from_millis(50), payload(&canned_investor("Gamma"))),
            )
            .with(
                "https://d.example",
                Response::Delay(Duration::from_millis(10), payload(&canned_investor("Delta"))),
            ),
    );
    let driver = TaskDriver::new(capability.clone()).with_concurrency(2);

    let records = driver
        .run::<Investor>(&urls(&[
            "https://a.example",
            "https://b.example",
            "https://c.example",
            "https://d.example",
        ]))
        .await;

    let names: Vec<&str> = records
        .iter()
        .map(|r| r.value().unwrap().investor_name.as_str())
        .collect();
    assert_eq!(names, vec!["Alpha", "Beta", "Gamma", "Delta"]);
    assert_eq!(capability.max_in_flight.load(Ordering::SeqCst), 2);
}

#[test]
fn sequential_driver_blocks_in_order() {
    let capability = MockCapability::default()
        .with("https://a.example", Response::Payload(payload(&canned_investor("Alpha"))))
        .with("https://b.example", Response::Payload(payload(&canned_investor("Beta"))));
    let driver = TaskDriver::new(capability);

    let records = tokio_test::block_on(
        driver.run::<Investor>(&urls(&["https://a.example", "https://b.example"])),
    );

    assert_eq!(records.len(), 2);
    assert_eq!(records[1].value().unwrap().investor_name, "Beta");
}
