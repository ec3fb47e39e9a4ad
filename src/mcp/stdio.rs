//! Newline-delimited JSON-RPC over stdin/stdout.
//!
//! Logging goes to stderr; stdout carries protocol messages only.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::api::AppState;
use crate::mcp::server::handle_line;

/// Serves MCP on the process's stdin/stdout until stdin closes.
pub async fn serve_stdio(state: AppState) -> std::io::Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve(state, stdin, stdout).await
}

/// Serves MCP over any line-oriented reader/writer pair.
///
/// Each message is handled on its own task, so a slow tool call does not
/// hold up the ones behind it. Responses are written as they complete and
/// may therefore arrive out of request order; clients match them by id.
/// Returns once the reader is exhausted and every in-flight response has
/// been written.
pub async fn serve<R, W>(state: AppState, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("MCP stdio transport ready");
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let read = async move {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let state = state.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(response) = handle_line(&state, &line).await {
                    if tx.send(response).is_err() {
                        debug!("Output closed, dropping response");
                    }
                }
            });
        }
        info!("stdin closed, finishing in-flight requests");
        Ok::<_, std::io::Error>(())
    };

    let write = async {
        while let Some(mut response) = rx.recv().await {
            response.push('\n');
            writer.write_all(response.as_bytes()).await?;
            writer.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    };

    tokio::try_join!(read, write)?;
    info!("MCP stdio transport stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SearchCache;
    use crate::clients::{BioPortalClient, CedarClient};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_serves_until_eof() {
        let state = AppState {
            cache: SearchCache::bypass(60),
            bioportal: Arc::new(BioPortalClient::new("http://127.0.0.1:9", "bp").unwrap()),
            cedar: Arc::new(CedarClient::new("http://127.0.0.1:9", "http://127.0.0.1:9", "c").unwrap()),
        };
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#, "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#, "\n",
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#, "\n",
        );
        let mut output = Vec::new();

        serve(state, input.as_bytes(), &mut output).await.unwrap();

        let responses: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        let mut ids: Vec<i64> = responses.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_slow_tool_call_does_not_block_ping() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"collection": []}))
                    .set_delay(Duration::from_millis(800)),
            )
            .mount(&upstream)
            .await;
        let state = AppState {
            cache: SearchCache::bypass(60),
            bioportal: Arc::new(BioPortalClient::new(&upstream.uri(), "bp").unwrap()),
            cedar: Arc::new(CedarClient::new(&upstream.uri(), &upstream.uri(), "c").unwrap()),
        };
        let search = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {
                "name": "term_search_from_ontology",
                "arguments": {"search_string": "aspirin", "ontology_acronym": "CHEBI"}
            }
        });
        let input = format!("{search}\n{}\n", r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#);
        let mut output = Vec::new();

        serve(state, input.as_bytes(), &mut output).await.unwrap();

        let responses: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 2);
        assert_eq!(responses[1]["id"], 1);
        assert_eq!(responses[1]["result"]["isError"], false);
    }
}
