//! `PolygonClient` over real HTTP against a local one-shot server.

use reqwest::Url;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tickersnap_core::{FetchError, PageSource, PolygonClient, TickerFetcher, TickerQuery};

/// Canned HTTP reply.
struct Reply {
    status: u16,
    content_type: &'static str,
    body: String,
}

fn json(status: u16, body: &str) -> Reply {
    Reply {
        status,
        content_type: "application/json",
        body: body.to_string(),
    }
}

fn listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    (listener, base)
}

/// Answer one connection per reply, in order. Returns the request lines seen.
fn serve(listener: TcpListener, replies: Vec<Reply>) -> Arc<Mutex<Vec<String>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    thread::spawn(move || {
        for reply in replies {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            log.lock().unwrap().push(request_line.trim_end().to_string());
            loop {
                let mut header = String::new();
                let n = reader.read_line(&mut header).unwrap();
                if n == 0 || header == "\r\n" {
                    break;
                }
            }

            write!(
                stream,
                "HTTP/1.1 {} Stub\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                reply.status,
                reply.content_type,
                reply.body.len(),
                reply.body
            )
            .unwrap();
            stream.flush().unwrap();
        }
    });
    seen
}

fn page_url(base: &str) -> Url {
    Url::parse(&format!(
        "{base}/v3/reference/tickers?market=stocks&apiKey=secret-key"
    ))
    .unwrap()
}

#[test]
fn rate_limited_json_body_decodes_to_error_page() {
    let (listener, base) = listener();
    serve(
        listener,
        vec![json(
            429,
            r#"{"status":"ERROR","request_id":"r1","error":"You've exceeded the maximum requests per minute"}"#,
        )],
    );

    let page = PolygonClient::new().unwrap().get_page(&page_url(&base)).unwrap();

    assert!(page.is_error());
    assert!(page.results.is_none());
    assert_eq!(
        page.error_message(),
        "You've exceeded the maximum requests per minute"
    );
}

#[test]
fn html_gateway_error_is_a_decode_error_without_the_key() {
    let (listener, base) = listener();
    serve(
        listener,
        vec![Reply {
            status: 502,
            content_type: "text/html",
            body: "<html><body>Bad Gateway</body></html>".into(),
        }],
    );

    let err = PolygonClient::new()
        .unwrap()
        .get_page(&page_url(&base))
        .unwrap_err();

    match &err {
        FetchError::Decode { url, reason } => {
            assert!(reason.contains("502"), "unexpected reason: {reason}");
            assert!(url.contains("apiKey=REDACTED"));
        }
        other => panic!("expected decode error, got {other:?}"),
    }
    assert!(!err.to_string().contains("secret-key"));
}

#[test]
fn ok_page_with_odd_field_shapes_keeps_every_record() {
    let (listener, base) = listener();
    serve(
        listener,
        vec![json(
            200,
            r#"{"status":"OK","count":2,"results":[
                {"ticker":"A","active":true,"last_updated_utc":"2024-01-05T00:00:00Z"},
                {"ticker":"C","active":"yes","last_updated_utc":"2024-01-05"}
            ]}"#,
        )],
    );

    let page = PolygonClient::new().unwrap().get_page(&page_url(&base)).unwrap();
    let records = page.results.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].active, Some(true));
    assert!(records[0].last_updated_utc.is_some());
    assert_eq!(records[1].field("active").as_deref(), Some("yes"));
    assert_eq!(records[1].field("last_updated_utc").as_deref(), Some("2024-01-05"));
}

#[test]
fn fetch_over_http_keeps_first_page_when_second_is_unreadable() {
    let (listener, base) = listener();
    let next = format!("{base}/v3/reference/tickers?cursor=p2");
    let requests = serve(
        listener,
        vec![
            json(
                200,
                &format!(
                    r#"{{"status":"OK","results":[{{"ticker":"A"}},{{"ticker":"B"}}],"next_url":"{next}"}}"#
                ),
            ),
            Reply {
                status: 502,
                content_type: "text/html",
                body: "<html>Bad Gateway</html>".into(),
            },
        ],
    );

    let fetcher = TickerFetcher::new(
        Box::new(PolygonClient::new().unwrap()),
        &base,
        "secret-key",
        Duration::ZERO,
    )
    .unwrap();
    let outcome = fetcher.fetch(&TickerQuery::default()).unwrap();

    let tickers: Vec<&str> = outcome.records.iter().map(|r| r.ticker.as_str()).collect();
    assert_eq!(tickers, ["A", "B"]);
    assert_eq!(outcome.halted.as_ref().map(|h| h.page), Some(1));

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].starts_with("GET /v3/reference/tickers?market=stocks"));
    assert!(requests[1].contains("cursor=p2&apiKey=secret-key"));
}
