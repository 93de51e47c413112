use async_trait::async_trait;
use page_parser::testing::TestHelper;
use page_parser::{
    Action, ActionContext, ActionSpec, Breaker, Environment, HtmlEnvironment, PageCall,
    PageEvent, ParseConfig, ParserError, Result, Storage, TransformStep,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const PROFILE: &str = r#"
    <div class="profile">
      <span class="name"> Jo </span>
      <span class="phone">555</span>
    </div>
"#;

const ROWS: &str = r#"
    <ul>
      <li class="row"><b>1</b><i>one</i><span class="ready"></span></li>
      <li class="row"><b>2</b><i>two</i></li>
      <li class="row"><b>3</b><i>three</i><span class="ready"></span></li>
    </ul>
"#;

fn rows(count: usize) -> String {
    let items: String = (1..=count)
        .map(|n| format!(r#"<li class="row"><b>{}</b></li>"#, n))
        .collect();
    format!("<ul>{}</ul>", items)
}

async fn run_actions(env: &Arc<HtmlEnvironment>, actions: Value) -> Result<Value> {
    let session = TestHelper::session_for(env.clone());
    let actions = TestHelper::actions(actions)?;
    session
        .orchestrator()
        .perform_actions(&actions, "", Value::Null)
        .await
}

#[tokio::test]
async fn collection_maps_names_to_values() {
    let result = TestHelper::parse_html(
        PROFILE,
        json!({"rules": {
            "scope": ".profile",
            "collection": [
                {"name": "name", "scope": ".name"},
                {"name": "phone", "scope": ".phone"}
            ]
        }}),
    )
    .await
    .unwrap();

    assert_eq!(result, json!({"name": "Jo", "phone": "555"}));
}

#[tokio::test]
async fn split_into_array() {
    let result = TestHelper::parse_html(
        "<div>a, b ,c</div>",
        json!({"rules": {
            "scope": "div",
            "transform": [{"type": "split", "separator": ",", "dataType": "array"}]
        }}),
    )
    .await
    .unwrap();

    assert_eq!(result, json!(["a", "b", "c"]));
}

#[tokio::test]
async fn simple_rules_yield_strings_or_string_arrays() {
    let html = r#"<p>x</p><p>y</p><a href="/a">a</a><a href="/b">b</a>"#;
    let joined = TestHelper::parse_html(html, json!({"rules": {"scope": "p"}}))
        .await
        .unwrap();
    assert_eq!(joined, json!("x y"));

    let separated = TestHelper::parse_html(html, json!({"rules": {"scope": "p", "separator": "|"}}))
        .await
        .unwrap();
    assert_eq!(separated, json!("x|y"));

    let links = TestHelper::parse_html(
        html,
        json!({"rules": {
            "scope": "a",
            "attr": "href",
            "type": "array",
            "transform": [{"type": "prefix", "value": "https://site.test"}]
        }}),
    )
    .await
    .unwrap();
    assert_eq!(links, json!(["https://site.test/a", "https://site.test/b"]));

    let nothing = TestHelper::parse_html(html, json!({"rules": {"scope": ".missing"}}))
        .await
        .unwrap();
    assert_eq!(nothing, json!(""));
}

#[tokio::test]
async fn grid_rows_follow_positional_scopes_from_offset() {
    let env = TestHelper::html_env(ROWS);
    let session = TestHelper::session_for(env);
    let rule = TestHelper::rule(json!({
        "scope": ".row",
        "collection": [[{"name": "n", "scope": "b"}, {"name": "label", "scope": "i"}]]
    }))
    .unwrap();

    let all = session.evaluator().evaluate(&rule).await.unwrap();
    assert_eq!(
        all,
        json!([
            {"n": "1", "label": "one"},
            {"n": "2", "label": "two"},
            {"n": "3", "label": "three"}
        ])
    );

    let tail = session.evaluator().evaluate_from(&rule, 1).await.unwrap();
    assert_eq!(tail, json!([{"n": "2", "label": "two"}, {"n": "3", "label": "three"}]));

    let past_end = session.evaluator().evaluate_from(&rule, 5).await.unwrap();
    assert_eq!(past_end, json!([]));
}

#[tokio::test]
async fn failing_grid_row_keeps_earlier_rows() {
    let result = TestHelper::parse_html(
        ROWS,
        json!({"rules": {
            "scope": ".row",
            "collection": [[{
                "name": "n",
                "scope": "b",
                "actions": [{"type": "waitForElement", "scope": ".ready", "timeout": 20}]
            }]]
        }}),
    )
    .await
    .unwrap();

    assert_eq!(result, json!([{"n": "1"}]));
}

#[tokio::test]
async fn configuration_errors_in_grid_rows_propagate() {
    let err = TestHelper::parse_html(
        ROWS,
        json!({"rules": {
            "scope": ".row",
            "collection": [[{"name": "n", "scope": "b", "transform": [{"type": "nope"}]}]]
        }}),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ParserError::UnsupportedTransform(t) if t == "nope"));
}

#[tokio::test]
async fn malformed_rules_are_invalid() {
    let grid_without_scope = TestHelper::parse_html(
        ROWS,
        json!({"rules": {"collection": [[{"name": "n", "scope": "b"}]]}}),
    )
    .await
    .unwrap_err();
    assert!(matches!(grid_without_scope, ParserError::InvalidRule(_)));

    let unnamed = TestHelper::parse_html(
        PROFILE,
        json!({"rules": {"collection": [{"scope": ".name"}]}}),
    )
    .await
    .unwrap_err();
    assert!(matches!(unnamed, ParserError::InvalidRule(_)));
}

#[tokio::test]
async fn unqueryable_selector_is_an_empty_query() {
    let err = TestHelper::parse_html(PROFILE, json!({"rules": {"scope": "[[["}}))
        .await
        .unwrap_err();
    assert!(matches!(err, ParserError::EmptyQuery { .. }));
}

#[tokio::test]
async fn failed_parse_snapshots_and_still_tears_down() {
    let env = TestHelper::html_env(PROFILE);
    let parser = TestHelper::parser_for(env.clone());
    let config = ParseConfig::from_value(json!({
        "rules": {"scope": ".name", "transform": [{"type": "nope"}]}
    }))
    .unwrap();

    let err = parser.parse(&config).await.unwrap_err();
    assert!(matches!(err, ParserError::UnsupportedTransform(_)));
    assert_eq!(env.snapshots(), vec!["error".to_string()]);
    assert_eq!(env.lifecycle(), (1, 1));
}

#[tokio::test]
async fn virtual_fields_feed_storage_but_not_output() {
    let env = TestHelper::html_env(r#"<div class="p">10</div><div class="c">EUR</div>"#);
    let parser = TestHelper::parser_for(env);
    let storage = Storage::new();
    let config = ParseConfig::from_value(json!({"rules": {"collection": [
        {"name": "price", "scope": ".p", "virtual": true},
        {"name": "currency", "scope": ".c", "virtual": true},
        {"name": "label", "scope": ".p", "transform": [
            {"type": "combine", "fields": ["price", "currency"]},
            {"type": "join", "glue": " "}
        ]}
    ]}}))
    .unwrap();

    let result = parser.parse_with_storage(&config, storage.clone()).await.unwrap();
    assert_eq!(result, json!({"label": "10 EUR"}));
    assert_eq!(storage.get("price"), Some(json!("10")));
    assert_eq!(storage.get("label"), Some(json!("10 EUR")));
}

#[tokio::test]
async fn once_actions_run_a_single_time_per_parse() {
    let env = TestHelper::html_env("<button class='go'>go</button>");
    let session = TestHelper::session_for(env.clone());
    let actions = TestHelper::actions(json!([{"type": "click", "scope": ".go", "once": true}])).unwrap();
    let orchestrator = session.orchestrator();

    orchestrator.perform_actions(&actions, "", Value::Null).await.unwrap();
    orchestrator.perform_actions(&actions, "", Value::Null).await.unwrap();
    let copies = actions.clone();
    orchestrator.perform_actions(&copies, "", Value::Null).await.unwrap();

    assert_eq!(env.interactions(), vec!["click:.go".to_string()]);
}

#[tokio::test]
async fn typing_uses_the_previous_result() {
    let env = Arc::new(HtmlEnvironment::new("<input id='q'>").with_url("https://site.test/search"));
    run_actions(
        &env,
        json!([
            {"type": "url"},
            {"type": "type", "scope": "#q", "useActionResult": true}
        ]),
    )
    .await
    .unwrap();

    assert_eq!(env.value_of("#q").as_deref(), Some("https://site.test/search"));
}

#[tokio::test]
async fn conditions_pick_one_branch() {
    let env = TestHelper::html_env(
        r#"<div class="banner">hi</div><button class="close">x</button><button class="other">y</button>"#,
    );
    let taken = run_actions(
        &env,
        json!([{
            "type": "condition",
            "conditions": [{"type": "exist", "scope": ".banner"}],
            "actions": [{"type": "click", "scope": ".close"}],
            "elseActions": [{"type": "click", "scope": ".other"}]
        }]),
    )
    .await
    .unwrap();
    assert_eq!(taken, json!(true));
    assert_eq!(env.interactions(), vec!["click:.close".to_string()]);

    let skipped = run_actions(
        &env,
        json!([{
            "type": "condition",
            "conditions": [{"type": "exist", "scope": ".absent"}],
            "actions": [{"type": "click", "scope": ".close"}]
        }]),
    )
    .await
    .unwrap();
    assert_eq!(skipped, json!(false));
    assert_eq!(env.interactions().len(), 1);
}

#[tokio::test]
async fn parse_action_evaluates_nested_rules_under_its_scope() {
    let env = TestHelper::html_env(
        r#"<div class="card"><h2 class="t">Inside</h2></div><h2 class="t">Outside</h2>"#,
    );
    let result = run_actions(
        &env,
        json!([{
            "type": "parse",
            "scope": ".card",
            "rules": {"collection": [{"name": "title", "scope": ".t"}]}
        }]),
    )
    .await
    .unwrap();

    assert_eq!(result, json!({"title": "Inside"}));
}

#[tokio::test]
async fn unknown_action_types_fail() {
    let env = TestHelper::html_env(PROFILE);
    let err = run_actions(&env, json!([{"type": "teleport"}])).await.unwrap_err();
    assert!(matches!(err, ParserError::UnsupportedAction(t) if t == "teleport"));
}

#[tokio::test(start_paused = true)]
async fn wait_resolves_on_the_tick_the_element_appears() {
    let env = TestHelper::html_env("<div></div>");
    let updater = env.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(35)).await;
        updater.set_content("<div class='late'>x</div>");
    });

    let start = Instant::now();
    run_actions(
        &env,
        json!([{"type": "waitForElement", "scope": ".late", "interval": 10, "timeout": 1000}]),
    )
    .await
    .unwrap();
    assert_eq!(start.elapsed(), Duration::from_millis(40));
}

#[tokio::test(start_paused = true)]
async fn wait_rejects_at_its_timeout() {
    let env = TestHelper::html_env("<div></div>");
    let start = Instant::now();
    let err = run_actions(
        &env,
        json!([{"type": "waitForVisible", "scope": ".never", "interval": 10, "timeout": 100}]),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ParserError::WaitTimeout { timeout_ms: 100, .. }));
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(100) && elapsed <= Duration::from_millis(110));
}

#[tokio::test(start_paused = true)]
async fn breaker_aborts_a_wait() {
    let env = TestHelper::html_env("<div></div>");
    let session = TestHelper::session_for(env);
    let started = Instant::now();
    let spec = ActionSpec::new("waitForElement")
        .with_scope(".never")
        .with_interval(10)
        .with_timeout(1000)
        .with_breaker(Breaker::new(move || started.elapsed() >= Duration::from_millis(30)));

    let err = session
        .orchestrator()
        .perform_action(&spec, "", Value::Null)
        .await
        .unwrap_err();
    assert!(matches!(err, ParserError::WaitBroken { .. }));
    assert_eq!(started.elapsed(), Duration::from_millis(30));
}

#[tokio::test(start_paused = true)]
async fn first_chain_to_succeed_wins_the_race() {
    let env = Arc::new(
        HtmlEnvironment::new("<button class='go'>go</button>").with_url("https://site.test/"),
    );
    let start = Instant::now();
    let result = run_actions(
        &env,
        json!([{"type": "cases", "cases": [
            [{"type": "wait", "timeout": 50}, {"type": "exist", "scope": ".go"}],
            [{"type": "wait", "timeout": 10}, {"type": "url"}],
            [{"type": "waitForElement", "scope": ".never", "timeout": 100}]
        ]}]),
    )
    .await
    .unwrap();

    assert_eq!(result, json!("https://site.test/"));
    assert_eq!(start.elapsed(), Duration::from_millis(10));
}

#[tokio::test(start_paused = true)]
async fn true_case_wins_even_if_its_chain_later_fails() {
    let env = Arc::new(
        HtmlEnvironment::new("<button class='go'>go</button>").with_url("https://site.test/"),
    );
    let result = run_actions(
        &env,
        json!([{"type": "cases", "cases": [
            [{"type": "wait", "timeout": 30}, {"type": "exist", "scope": ".go"}],
            [
                {"type": "url", "trueCase": true},
                {"type": "waitForElement", "scope": ".never", "timeout": 50}
            ]
        ]}]),
    )
    .await
    .unwrap();

    assert_eq!(result, json!("https://site.test/"));
}

#[tokio::test(start_paused = true)]
async fn race_fails_when_every_chain_fails() {
    let env = TestHelper::html_env("<div></div>");
    let err = run_actions(
        &env,
        json!([{"type": "cases", "cases": [
            [{"type": "waitForElement", "scope": ".a", "timeout": 20}],
            [{"type": "teleport"}]
        ]}]),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ParserError::RaceFailed { chains: 2, .. }));
}

#[tokio::test(start_paused = true)]
async fn failed_once_actions_are_retried() {
    let env = TestHelper::html_env("<div></div>");
    let session = TestHelper::session_for(env.clone());
    let actions = TestHelper::actions(json!([{
        "type": "waitForElement",
        "scope": ".late",
        "once": true,
        "interval": 10,
        "timeout": 50
    }]))
    .unwrap();
    let orchestrator = session.orchestrator();

    let first = orchestrator.perform_actions(&actions, "", Value::Null).await;
    assert!(matches!(first, Err(ParserError::WaitTimeout { .. })));

    env.set_content("<div class='late'>x</div>");
    let second = orchestrator.perform_actions(&actions, "", Value::Null).await;
    assert_eq!(second.unwrap(), json!(true));

    let skipped = orchestrator
        .perform_actions(&actions, "", json!("previous"))
        .await;
    assert_eq!(skipped.unwrap(), json!("previous"));
}

#[tokio::test(start_paused = true)]
async fn wait_for_pattern_resolves_to_the_matching_text() {
    let env = TestHelper::html_env(r#"<p class="status">pending</p>"#);
    let updater = env.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(35)).await;
        updater.set_content(r#"<p class="status">done 42</p>"#);
    });

    let start = Instant::now();
    let text = run_actions(
        &env,
        json!([{
            "type": "waitForPattern",
            "scope": ".status",
            "pattern": ["done \\d+", ""],
            "interval": 10,
            "timeout": 1000
        }]),
    )
    .await
    .unwrap();
    assert_eq!(text, json!("done 42"));
    assert_eq!(start.elapsed(), Duration::from_millis(40));

    let err = run_actions(
        &env,
        json!([{"type": "waitForPattern", "scope": ".status", "pattern": ["failed", "i"], "timeout": 50}]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ParserError::WaitTimeout { timeout_ms: 50, .. }));
}

#[tokio::test(start_paused = true)]
async fn wait_for_invisible_resolves_or_breaks() {
    let env = TestHelper::html_env(r#"<div class="spinner">loading</div>"#);
    let updater = env.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(25)).await;
        updater.set_content(r#"<div class="spinner" hidden>loading</div>"#);
    });

    let start = Instant::now();
    let gone = run_actions(
        &env,
        json!([{"type": "waitForInvisible", "scope": ".spinner", "interval": 10, "timeout": 1000}]),
    )
    .await
    .unwrap();
    assert_eq!(gone, json!(true));
    assert_eq!(start.elapsed(), Duration::from_millis(30));

    env.set_content(r#"<div class="spinner">loading</div>"#);
    let session = TestHelper::session_for(env);
    let started = Instant::now();
    let spec = ActionSpec::new("waitForInvisible")
        .with_scope(".spinner")
        .with_interval(10)
        .with_timeout(1000)
        .with_breaker(Breaker::new(move || started.elapsed() >= Duration::from_millis(20)));
    let err = session
        .orchestrator()
        .perform_action(&spec, "", Value::Null)
        .await
        .unwrap_err();
    assert!(matches!(err, ParserError::WaitBroken { .. }));
}

#[tokio::test(start_paused = true)]
async fn wait_for_ready_state_polls_the_document_state() {
    let env = TestHelper::html_env("<p>ready</p>");
    let loaded = run_actions(&env, json!([{"type": "waitForReadyState"}]))
        .await
        .unwrap();
    assert_eq!(loaded, json!(true));

    let err = run_actions(
        &env,
        json!([{"type": "waitForReadyState", "state": "interactive", "timeout": 30}]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ParserError::WaitTimeout { timeout_ms: 30, .. }));
}

fn two_pages() -> Arc<HtmlEnvironment> {
    Arc::new(
        HtmlEnvironment::new(r#"<h1 class="current">1</h1>"#)
            .with_url("https://shop.test/1")
            .with_page("https://shop.test/2", r#"<h1 class="current">2</h1>"#),
    )
}

#[tokio::test]
async fn open_and_back_move_through_history_and_reinject_helpers() {
    let env = two_pages();
    let opened = run_actions(&env, json!([{"type": "open", "url": "/2"}]))
        .await
        .unwrap();
    assert_eq!(opened, json!("https://shop.test/2"));
    assert_eq!(env.url(), "https://shop.test/2");
    assert_eq!(env.helper_injections(), 1);

    let back = run_actions(&env, json!([{"type": "back"}])).await.unwrap();
    assert_eq!(back, json!("https://shop.test/1"));
    assert_eq!(env.helper_injections(), 2);

    let no_history = run_actions(&env, json!([{"type": "back"}])).await.unwrap();
    assert_eq!(no_history, json!(false));

    let unknown = run_actions(&env, json!([{"type": "open", "url": "/9"}]))
        .await
        .unwrap_err();
    assert!(matches!(unknown, ParserError::NavigationFailed(_)));
}

#[tokio::test(start_paused = true)]
async fn wait_for_page_resolves_after_navigating_back() {
    let env = two_pages();
    env.evaluate(PageCall::Open {
        url: "https://shop.test/2".into(),
    })
    .await
    .unwrap();

    let navigator = env.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(25)).await;
        let _ = navigator.evaluate(PageCall::Back).await;
    });

    let injected = env.helper_injections();
    let url = run_actions(&env, json!([{"type": "waitForPage", "timeout": 1000}]))
        .await
        .unwrap();
    assert_eq!(url, json!("https://shop.test/1"));
    assert_eq!(env.helper_injections(), injected + 1);

    let err = run_actions(&env, json!([{"type": "waitForPage", "timeout": 40}]))
        .await
        .unwrap_err();
    assert!(matches!(err, ParserError::WaitTimeout { timeout_ms: 40, .. }));
}

#[tokio::test(start_paused = true)]
async fn wait_for_page_fails_on_page_errors() {
    let env = two_pages();
    let reporter = env.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        reporter.emit(PageEvent::Error {
            message: "boom".into(),
        });
    });

    let err = run_actions(&env, json!([{"type": "waitForPage", "timeout": 1000}]))
        .await
        .unwrap_err();
    assert!(matches!(err, ParserError::PageError(message) if message == "boom"));
}

#[tokio::test(start_paused = true)]
async fn wait_for_query_matches_request_urls() {
    let env = TestHelper::html_env("<div></div>");
    let reporter = env.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(15)).await;
        reporter.emit(PageEvent::Request {
            url: "https://cdn.test/app.js".into(),
        });
        reporter.emit(PageEvent::Request {
            url: "https://api.test/items?page=2".into(),
        });
    });

    let url = run_actions(
        &env,
        json!([{"type": "waitForQuery", "uri": "items\\?page=\\d", "timeout": 1000}]),
    )
    .await
    .unwrap();
    assert_eq!(url, json!("https://api.test/items?page=2"));

    let err = run_actions(&env, json!([{"type": "waitForQuery", "uri": "orders", "timeout": 40}]))
        .await
        .unwrap_err();
    assert!(matches!(err, ParserError::WaitTimeout { timeout_ms: 40, .. }));
}

#[tokio::test]
async fn click_can_wait_for_the_next_page() {
    let env = Arc::new(
        HtmlEnvironment::new(r#"<a class="next" href="/2">next</a>"#)
            .with_url("https://shop.test/1")
            .with_page("https://shop.test/2", r#"<h1 class="current">2</h1>"#),
    );
    let parser = TestHelper::parser_for(env.clone());
    let config = ParseConfig::from_value(json!({
        "actions": [{"type": "click", "scope": ".next", "waitForPage": true}],
        "rules": {"scope": ".current"}
    }))
    .unwrap();

    assert_eq!(parser.parse(&config).await.unwrap(), json!("2"));
    assert_eq!(env.url(), "https://shop.test/2");
    assert!(env.helper_injections() >= 1);
}

#[tokio::test]
async fn click_can_wait_for_a_matching_request() {
    let env = TestHelper::html_env(
        r#"<button class="load" data-request="https://api.test/items?page=2">more</button>"#,
    );
    let found = run_actions(
        &env,
        json!([{"type": "click", "scope": ".load", "waitForQuery": "items\\?page=2"}]),
    )
    .await;
    assert_eq!(found.unwrap(), json!(true));

    let missed = run_actions(
        &env,
        json!([{"type": "click", "scope": ".load", "waitForQuery": "orders", "timeout": 30}]),
    )
    .await
    .unwrap_err();
    assert!(matches!(missed, ParserError::WaitTimeout { .. }));
}

#[tokio::test]
async fn scroll_pagination_accumulates_new_rows() {
    let env = Arc::new(HtmlEnvironment::new(rows(2)).with_scroll_feed(vec![rows(3), rows(4)]));
    let parser = TestHelper::parser_for(env);
    let config = ParseConfig::from_value(json!({
        "rules": {"scope": ".row", "collection": [[{"name": "n", "scope": "b"}]]},
        "pagination": {"type": "scroll", "maxPagesCount": 3}
    }))
    .unwrap();

    let result = parser.parse(&config).await.unwrap();
    assert_eq!(
        result,
        json!([{"n": "1"}, {"n": "2"}, {"n": "3"}, {"n": "4"}])
    );
}

#[tokio::test]
async fn scroll_pagination_stops_quietly_when_nothing_loads() {
    let env = Arc::new(HtmlEnvironment::new(rows(2)).with_scroll_feed(vec![rows(3)]));
    let parser = TestHelper::parser_for(env);
    let config = ParseConfig::from_value(json!({
        "rules": {"scope": ".row", "collection": [[{"name": "n", "scope": "b"}]]},
        "pagination": {"type": "scroll"}
    }))
    .unwrap();

    let result = parser.parse(&config).await.unwrap();
    assert_eq!(result, json!([{"n": "1"}, {"n": "2"}, {"n": "3"}]));
}

#[tokio::test]
async fn page_pagination_follows_next_links_until_they_run_out() {
    let first = r#"<div class="current">1</div><p class="item">a</p><p class="item">b</p>
                   <a class="next" href="/2">next</a>"#;
    let second = r#"<div class="current">2</div><p class="item">c</p>"#;
    let env = Arc::new(
        HtmlEnvironment::new(first)
            .with_url("https://shop.test/1")
            .with_page("https://shop.test/2", second),
    );
    let parser = TestHelper::parser_for(env);
    let config = ParseConfig::from_value(json!({
        "rules": {"scope": ".item", "type": "array"},
        "pagination": {"type": "page", "scope": ".next", "pageScope": ".current"}
    }))
    .unwrap();

    assert_eq!(parser.parse(&config).await.unwrap(), json!(["a", "b", "c"]));
}

struct RecordSelector;

#[async_trait]
impl Action for RecordSelector {
    fn name(&self) -> &str {
        "record"
    }

    async fn perform(&self, _spec: &ActionSpec, ctx: &ActionContext<'_>) -> Result<Value> {
        let selector = json!(ctx.selector);
        ctx.orchestrator.session().storage().set("seen", selector.clone());
        Ok(selector)
    }
}

#[tokio::test]
async fn custom_actions_and_transforms_extend_the_parser() {
    let env = TestHelper::html_env(PROFILE);
    let mut parser = TestHelper::parser_for(env);
    parser.register_action(RecordSelector).unwrap();
    parser
        .register_transform(
            "shout",
            |value: Value, _step: &TransformStep, _storage: &Storage| -> Result<Value> {
                Ok(json!(format!("{}!", value.as_str().unwrap_or_default())))
            },
        )
        .unwrap();

    let storage = Storage::new();
    let config = ParseConfig::from_value(json!({"rules": {
        "scope": ".profile",
        "collection": [{
            "name": "name",
            "scope": ".name",
            "actions": [{"type": "record"}],
            "transform": [{"type": "shout"}]
        }]
    }}))
    .unwrap();

    let result = parser.parse_with_storage(&config, storage.clone()).await.unwrap();
    assert_eq!(result, json!({"name": "Jo!"}));
    assert_eq!(storage.get("seen"), Some(json!(".profile")));

    let blank = parser.register_transform(
        " ",
        |value: Value, _step: &TransformStep, _storage: &Storage| -> Result<Value> { Ok(value) },
    );
    assert!(matches!(blank, Err(ParserError::Registration(_))));
}
