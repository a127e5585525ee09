use std::sync::{Arc, Mutex};

use bindery_engine::{
    ClientBuilder, ClientError, Request, ResolveError, Response, Strategy, Transport, TransportError, Value,
};
use bindery_types::{DeclarationDocument, HttpMethod, RequestOptions};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

mod expanders {
    use bindery_types::value_to_string;
    use serde_json::Value;

    pub fn slug(value: &Value) -> String {
        value_to_string(value).trim().to_lowercase().replace(' ', "-")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    pub login: String,
    pub contributions: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub total_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
}

include!(concat!(env!("OUT_DIR"), "/github_recipes.rs"));

/// Records every request and answers with a fixed response.
struct MockTransport {
    response: Response,
    sent: Mutex<Vec<(Request, RequestOptions)>>,
}

impl MockTransport {
    fn new(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Response::new(status, body),
            sent: Mutex::new(Vec::new()),
        })
    }

    fn last(&self) -> (Request, RequestOptions) {
        self.sent.lock().expect("lock").last().cloned().expect("a request was sent")
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: Request, options: &RequestOptions) -> Result<Response, TransportError> {
        self.sent.lock().expect("lock").push((request, *options));
        Ok(self.response.clone())
    }
}

fn client(transport: Arc<MockTransport>) -> GitHubClient {
    let builder = ClientBuilder::new(transport).base_url("https://api.github.com/");
    GitHubClient::new(&builder).expect("bind GitHub")
}

#[test]
fn generated_specs_match_live_compilation() {
    let document = DeclarationDocument::from_yaml(include_str!("data/github.yaml")).expect("load fixture");
    let live = bindery_registry::compile_document(&document, "GitHub").expect("live compile");
    assert_eq!(git_hub_specs(), live);
}

#[test]
fn config_keys_are_unique_and_in_declaration_order() {
    let keys: Vec<String> = git_hub_specs().into_iter().map(|spec| spec.config_key).collect();
    assert_eq!(keys.first().map(String::as_str), Some("GitHub#page(String,u32,u32)"));
    assert!(keys.contains(&"GitHub#createIssue(NewIssue,String,String)".to_string()));
    assert!(keys.contains(&"GitHub#file(String,String,String)".to_string()));
    assert!(keys.contains(&"GitHub#rawFile(String,String,String)".to_string()));

    let table = client(MockTransport::new(200, "")).dispatch_table().config_keys().count();
    assert_eq!(table, keys.len());
}

#[test]
fn duplicate_config_keys_are_rejected() {
    let mut specs = git_hub_specs();
    specs.push(contributors_spec());
    let error = ClientBuilder::new(MockTransport::new(200, ""))
        .build(specs)
        .expect_err("duplicate key");
    assert!(error.to_string().contains("GitHub#contributors(String,String)"));
}

#[test]
fn strategies_follow_the_compiled_bindings() {
    let client = client(MockTransport::new(200, ""));
    let table = client.dispatch_table();
    let strategy = |key: &str| table.handler(key).expect("handler").factory().strategy();
    assert_eq!(strategy("GitHub#createIssue(NewIssue,String,String)"), Strategy::BodyEncoded);
    assert_eq!(strategy("GitHub#rename(String,String,String)"), Strategy::FormEncoded);
    assert_eq!(strategy("GitHub#login(String,String)"), Strategy::ResolveOnly);
}

#[tokio::test]
async fn inherited_method_resolves_parent_generics_and_headers() {
    let transport = MockTransport::new(200, r#"[{"name": "bindery"}]"#);
    let repositories = client(transport.clone())
        .page("repositories".into(), 2, 50)
        .await
        .expect("page");
    assert_eq!(repositories, vec![Repository { name: "bindery".into() }]);

    let (request, _) = transport.last();
    assert_eq!(request.url, "https://api.github.com/repositories?page=2&per_page=50");
    assert_eq!(request.header("accept"), Some("application/vnd.github+json"));
    assert_eq!(request.header("User-Agent"), Some("bindery"));
}

#[tokio::test]
async fn arguments_bind_by_index() {
    let transport = MockTransport::new(200, r#"[{"login": "octocat", "contributions": 12}]"#);
    let contributors = client(transport.clone())
        .contributors("rust-lang".into(), "cargo".into())
        .await
        .expect("contributors");
    assert_eq!(contributors[0].contributions, 12);
    assert_eq!(transport.last().0.url, "https://api.github.com/repos/rust-lang/cargo/contributors");
}

#[tokio::test]
async fn body_parameter_is_encoded_as_json() {
    let transport = MockTransport::new(201, r#"{"number": 7}"#);
    let issue = client(transport.clone())
        .create_issue(
            NewIssue {
                title: "Crash".into(),
                body: "on start".into(),
            },
            "octo".into(),
            "hello".into(),
        )
        .await
        .expect("create issue");
    assert_eq!(issue, Issue { number: 7 });

    let (request, _) = transport.last();
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.url, "https://api.github.com/repos/octo/hello/issues");
    assert_eq!(request.header("Content-Type"), Some("application/json"));
    assert_eq!(request.body_text().as_deref(), Some(r#"{"title":"Crash","body":"on start"}"#));
}

#[test]
fn null_path_argument_is_a_missing_variable() {
    let client = client(MockTransport::new(200, ""));
    let error = client
        .dispatch_table()
        .resolve(
            "GitHub#createIssue(NewIssue,String,String)",
            &[json!({"title": "t", "body": "b"}), Value::Null, json!("hello")],
        )
        .expect_err("owner is null");
    assert!(matches!(
        error,
        ClientError::Resolve { source: ResolveError::MissingPathVariable { ref name }, .. } if name == "owner"
    ));
}

#[tokio::test]
async fn query_map_entries_replace_template_parameters() {
    let transport = MockTransport::new(200, r#"{"total_count": 1}"#);
    let client = client(transport.clone());

    client
        .search(vec!["rust".into(), "http client".into()], IndexMap::new())
        .await
        .expect("search");
    assert_eq!(
        transport.last().0.url,
        "https://api.github.com/search/repositories?q=rust,http%20client&sort=stars"
    );

    let filters = IndexMap::from([
        ("sort".to_string(), "updated".to_string()),
        ("order".to_string(), "desc".to_string()),
    ]);
    client.search(vec!["rust".into()], filters).await.expect("search");
    assert_eq!(
        transport.last().0.url,
        "https://api.github.com/search/repositories?q=rust&sort=updated&order=desc"
    );
}

#[tokio::test]
async fn slashes_are_restored_unless_disabled() {
    let transport = MockTransport::new(200, "# readme");
    let client = client(transport.clone());

    let text = client
        .file("octo".into(), "hello".into(), "docs/read me.md".into())
        .await
        .expect("file");
    assert_eq!(text, "# readme");
    assert_eq!(transport.last().0.url, "https://api.github.com/repos/octo/hello/contents/docs/read%20me.md");

    client
        .raw_file("octo".into(), "hello".into(), "docs%2Fread%20me.md".into())
        .await
        .expect("raw file");
    assert_eq!(
        transport.last().0.url,
        "https://api.github.com/repos/octo/hello/contents/docs%2Fread%20me.md"
    );
}

#[tokio::test]
async fn body_template_expands_raw_values() {
    let transport = MockTransport::new(204, "");
    client(transport.clone())
        .login("denominator".into(), "p&ss".into())
        .await
        .expect("login");

    let (request, _) = transport.last();
    assert_eq!(request.header("Content-Type"), Some("application/json"));
    assert_eq!(request.body_text().as_deref(), Some(r#"{"user": "denominator", "password": "p&ss"}"#));
}

#[tokio::test]
async fn request_options_argument_overrides_client_defaults() {
    let transport = MockTransport::new(204, "");
    let options = RequestOptions {
        read_timeout_ms: 1_500,
        follow_redirects: false,
        ..RequestOptions::default()
    };
    client(transport.clone())
        .star("octo".into(), "hello".into(), options)
        .await
        .expect("star");

    let (request, sent_options) = transport.last();
    assert_eq!(request.method, HttpMethod::Put);
    assert_eq!(request.body, None);
    assert_eq!(sent_options, options);
}

#[tokio::test]
async fn uri_argument_replaces_the_base_url() {
    let transport = MockTransport::new(200, r#"{"name": "mirror"}"#);
    let location = Url::parse("https://mirror.example.com/repos/octo/hello").expect("url");
    let repository = client(transport.clone()).at(location).await.expect("at");
    assert_eq!(repository.name, "mirror");
    assert_eq!(transport.last().0.url, "https://mirror.example.com/repos/octo/hello");
}

#[tokio::test]
async fn form_parameters_use_their_custom_expander() {
    let transport = MockTransport::new(200, r#"{"name": "my-new-name"}"#);
    client(transport.clone())
        .rename("octo".into(), "hello".into(), "My New Name".into())
        .await
        .expect("rename");

    let (request, _) = transport.last();
    assert_eq!(request.method, HttpMethod::Patch);
    assert_eq!(request.header("Content-Type"), Some("application/x-www-form-urlencoded; charset=UTF-8"));
    assert_eq!(request.body_text().as_deref(), Some("name=my-new-name"));
}

#[tokio::test]
async fn header_templates_and_header_map_are_combined() {
    let transport = MockTransport::new(200, r#"{"login": "octocat"}"#);
    let extra = IndexMap::from([
        ("Accept".to_string(), "text/plain".to_string()),
        ("X-Trace".to_string(), "abc".to_string()),
    ]);
    let user = client(transport.clone()).me("secret".into(), extra).await.expect("me");
    assert_eq!(user.login, "octocat");

    let (request, _) = transport.last();
    assert_eq!(request.header("Authorization"), Some("token secret"));
    assert_eq!(request.headers["Accept"], vec!["application/vnd.github+json", "text/plain"]);
    assert_eq!(request.header("x-trace"), Some("abc"));
}

#[tokio::test]
async fn not_found_decodes_to_none_when_enabled() {
    let transport = MockTransport::new(404, r#"{"message": "Not Found"}"#);
    let builder = ClientBuilder::new(transport.clone())
        .base_url("https://api.github.com")
        .decode_404(true);
    let client = GitHubClient::new(&builder).expect("bind");
    assert_eq!(client.repository("octo".into(), "gone".into()).await.expect("decode 404"), None);

    let strict = GitHubClient::new(&builder.clone().decode_404(false)).expect("bind");
    let error = strict
        .repository("octo".into(), "gone".into())
        .await
        .expect_err("404 is an error");
    assert_eq!(error.status(), Some(404));
}

#[tokio::test]
async fn error_responses_keep_status_and_body() {
    let transport = MockTransport::new(500, "upstream exploded");
    let error = client(transport)
        .contributors("octo".into(), "hello".into())
        .await
        .expect_err("server error");
    match error {
        ClientError::Status {
            config_key, status, body, ..
        } => {
            assert_eq!(config_key, "GitHub#contributors(String,String)");
            assert_eq!(status, 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn default_headers_do_not_override_method_headers() {
    let transport = MockTransport::new(200, "[]");
    let builder = ClientBuilder::new(transport.clone())
        .base_url("https://api.github.com")
        .default_header("User-Agent", "fallback")
        .default_header("X-GitHub-Api-Version", "2022-11-28");
    GitHubClient::new(&builder)
        .expect("bind")
        .contributors("octo".into(), "hello".into())
        .await
        .expect("contributors");

    let (request, _) = transport.last();
    assert_eq!(request.header("User-Agent"), Some("bindery"));
    assert_eq!(request.header("X-GitHub-Api-Version"), Some("2022-11-28"));
}

#[tokio::test]
async fn unknown_methods_are_reported() {
    let client = client(MockTransport::new(200, ""));
    let error = client
        .dispatch_table()
        .invoke("GitHub#nope()", Vec::new())
        .await
        .expect_err("unknown");
    assert!(matches!(error, ClientError::UnknownMethod(key) if key == "GitHub#nope()"));
}
