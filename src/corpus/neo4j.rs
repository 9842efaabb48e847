/// Neo4j corpus store over the HTTP transactional Cypher endpoint
use super::{CorpusError, CorpusStore};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const GREETING_QUERY: &str = "MATCH (n:Greeting) RETURN n.name AS name, n.msg_reply AS reply";
const QUESTION_QUERY: &str =
    "MATCH (n:Question) RETURN n.question AS question, n.answer AS answer";

/// Reads `Greeting` and `Question` nodes from a Neo4j database
pub struct Neo4jStore {
    client: reqwest::Client,
    commit_url: String,
    user: String,
    password: String,
}

impl Neo4jStore {
    /// Create a store for `{url}/db/{database}/tx/commit`
    pub fn new(
        url: &str,
        database: &str,
        user: &str,
        password: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            commit_url: format!("{}/db/{}/tx/commit", url.trim_end_matches('/'), database),
            user: user.to_string(),
            password,
        })
    }

    /// Run a two-column query and return its rows as string pairs
    async fn query_pairs(&self, statement: &str) -> Result<Vec<(String, String)>, CorpusError> {
        let body = serde_json::json!({
            "statements": [{ "statement": statement }]
        });

        tracing::debug!("Running corpus query: {}", statement);

        let response = self
            .client
            .post(&self.commit_url)
            .basic_auth(&self.user, Some(&self.password))
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CorpusError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let result: CommitResponse = response.json().await?;

        if let Some(error) = result.errors.into_iter().next() {
            return Err(CorpusError::Query {
                code: error.code,
                message: error.message,
            });
        }

        let statement_result = result
            .results
            .into_iter()
            .next()
            .ok_or_else(|| CorpusError::InvalidResponse("No statement result".to_string()))?;

        let mut pairs = Vec::with_capacity(statement_result.data.len());
        for record in statement_result.data {
            match record.row.as_slice() {
                [serde_json::Value::String(key), serde_json::Value::String(value)] => {
                    pairs.push((key.clone(), value.clone()));
                }
                other => {
                    tracing::warn!("Skipping corpus row without two string columns: {:?}", other);
                }
            }
        }

        Ok(pairs)
    }
}

#[async_trait]
impl CorpusStore for Neo4jStore {
    fn name(&self) -> &str {
        "neo4j"
    }

    async fn load_greetings(&self) -> Result<Vec<(String, String)>, CorpusError> {
        self.query_pairs(GREETING_QUERY).await
    }

    async fn load_questions(&self) -> Result<Vec<(String, String)>, CorpusError> {
        self.query_pairs(QUESTION_QUERY).await
    }
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<Neo4jError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    data: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct Record {
    row: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Neo4jError {
    code: String,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> Neo4jStore {
        Neo4jStore::new(
            &server.uri(),
            "neo4j",
            "neo4j",
            "secret".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_load_greetings() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/db/neo4j/tx/commit"))
            .and(header_exists("authorization"))
            .and(body_string_contains("MATCH (n:Greeting)"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{
                    "columns": ["name", "reply"],
                    "data": [
                        { "row": ["hello", "Hi there!"], "meta": [null, null] },
                        { "row": ["hey", null], "meta": [null, null] }
                    ]
                }],
                "errors": []
            })))
            .mount(&server)
            .await;

        let greetings = store(&server).load_greetings().await.unwrap();
        assert_eq!(
            greetings,
            vec![("hello".to_string(), "Hi there!".to_string())]
        );
    }

    #[tokio::test]
    async fn test_query_error_reported() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [],
                "errors": [{
                    "code": "Neo.ClientError.Statement.SyntaxError",
                    "message": "Invalid input"
                }]
            })))
            .mount(&server)
            .await;

        let result = store(&server).load_questions().await;
        assert!(matches!(result, Err(CorpusError::Query { .. })));
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let result = store(&server).load_questions().await;
        assert!(matches!(result, Err(CorpusError::Status { status: 401, .. })));
    }
}
