use async_trait::async_trait;
use blobgate::{AppState, GatewayConfig, serve};
use blobgate_store::{
    BlobStore, MemoryBlobStore, ObjectMetadata, ObjectReader, ReadRange, StoreError,
};
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use futures::StreamExt;
use reqwest::{Client, StatusCode, header};
use std::sync::Arc;
use tokio::net::TcpListener;

// 1994-11-06T08:49:37Z
const UPDATED: i64 = 784_111_777;

// Helper to spawn a server on a random port
async fn spawn_server(config: GatewayConfig, store: Arc<dyn BlobStore>) -> String {
    let state = Arc::new(AppState::with_store(config, store));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        serve(listener, state, std::future::pending::<()>()).await.unwrap();
    });

    format!("http://{}", addr)
}

fn site_store() -> MemoryBlobStore {
    let store = MemoryBlobStore::new();
    let data: Vec<u8> = (0..1000u32).map(|i| (i % 256) as u8).collect();
    store.insert(
        "site",
        "data.bin",
        data,
        ObjectMetadata::default()
            .with_content_type("application/octet-stream")
            .with_updated(Utc.timestamp_opt(UPDATED, 0).unwrap()),
    );
    store.insert(
        "site",
        "index.html",
        "<h1>home</h1>",
        ObjectMetadata::default().with_content_type("text/html; charset=utf-8"),
    );
    store.insert(
        "site",
        "docs/index.html",
        "<h1>docs</h1>",
        ObjectMetadata::default().with_content_type("text/html; charset=utf-8"),
    );
    store
}

#[tokio::test]
async fn test_health_check() {
    let base_url = spawn_server(GatewayConfig::default(), Arc::new(MemoryBlobStore::new())).await;
    let client = Client::new();

    for path in ["/_health", "/health-check"] {
        let res = client.get(format!("{}{}", base_url, path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key("x-request-id"));
        assert_eq!(res.text().await.unwrap(), "OK");
    }
}

#[tokio::test]
async fn test_favicon_and_stray_query_params() {
    let store = site_store();
    let base_url = spawn_server(GatewayConfig::default(), Arc::new(store.clone())).await;
    let client = Client::new();

    let res = client.get(format!("{}/favicon.ico", base_url)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(store.lookups().is_empty());

    // signing is off, so the query is not inspected
    let res = client
        .get(format!("{}/site/index.html?expires=1&expires=2", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "<h1>home</h1>");
}

#[tokio::test]
async fn test_byte_ranges() {
    let base_url = spawn_server(GatewayConfig::default(), Arc::new(site_store())).await;
    let client = Client::new();
    let url = format!("{}/site/data.bin", base_url);

    // 1. First hundred bytes
    let res = client.get(&url).header(header::RANGE, "bytes=0-99").send().await.unwrap();
    assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(res.headers()[header::CONTENT_RANGE], "bytes 0-99/1000");
    assert_eq!(res.headers()[header::CONTENT_LENGTH], "100");
    let body = res.bytes().await.unwrap();
    assert_eq!(body.len(), 100);
    assert_eq!(body[42], 42);

    // 2. Suffix range
    let res = client.get(&url).header(header::RANGE, "bytes=-10").send().await.unwrap();
    assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(res.headers()[header::CONTENT_RANGE], "bytes 990-999/1000");
    let body = res.bytes().await.unwrap();
    assert_eq!(&body[..], &[222, 223, 224, 225, 226, 227, 228, 229, 230, 231]);

    // 3. Past the end
    let res = client.get(&url).header(header::RANGE, "bytes=1000-1500").send().await.unwrap();
    assert_eq!(res.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(res.headers()[header::CONTENT_RANGE], "bytes */1000");
    assert!(res.bytes().await.unwrap().is_empty());

    // 4. Multi-range degrades to the full body
    let res = client.get(&url).header(header::RANGE, "bytes=0-1,5-6").send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.bytes().await.unwrap().len(), 1000);

    // 5. Malformed range degrades to the full body
    let res = client.get(&url).header(header::RANGE, "bytes=9-1").send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.bytes().await.unwrap().len(), 1000);
}

#[tokio::test]
async fn test_if_modified_since() {
    let base_url = spawn_server(GatewayConfig::default(), Arc::new(site_store())).await;
    let client = Client::new();
    let url = format!("{}/site/data.bin", base_url);

    let res = client
        .get(&url)
        .header(header::IF_MODIFIED_SINCE, "Sun, 06 Nov 1994 08:49:37 GMT")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(res.headers()[header::LAST_MODIFIED], "Sun, 06 Nov 1994 08:49:37 GMT");
    assert!(res.bytes().await.unwrap().is_empty());

    let res = client
        .get(&url)
        .header(header::IF_MODIFIED_SINCE, "Sun, 06 Nov 1994 08:49:36 GMT")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.bytes().await.unwrap().len(), 1000);

    // garbage dates are ignored
    let res = client
        .get(&url)
        .header(header::IF_MODIFIED_SINCE, "last tuesday")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_index_document_chain() {
    let store = site_store();
    let config = GatewayConfig {
        index_document: Some("index.html".to_string()),
        redirect_to_index: true,
        ..Default::default()
    };
    let base_url = spawn_server(config, Arc::new(store.clone())).await;
    let client = Client::new();

    // 1. Bucket root resolves straight to the index document
    let res = client.get(format!("{}/site/", base_url)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "<h1>home</h1>");
    assert_eq!(store.lookups(), vec!["site/index.html"]);
    store.clear_lookups();

    // 2. Directory-like path finds its own index
    let res = client.get(format!("{}/site/docs/", base_url)).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "<h1>docs</h1>");
    assert_eq!(store.lookups(), vec!["site/docs", "site/docs/index.html"]);
    store.clear_lookups();

    // 3. Unknown path falls through to the root index
    let res = client.get(format!("{}/site/missing", base_url)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "<h1>home</h1>");
    assert_eq!(
        store.lookups(),
        vec!["site/missing", "site/missing/index.html", "site/index.html"]
    );

    // 4. Nothing anywhere
    let res = client.get(format!("{}/empty/missing", base_url)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_gzip_negotiation() {
    let store = MemoryBlobStore::new();
    store.insert_compressed(
        "site",
        "app.css",
        Bytes::from_static(b"\x1f\x8b\x08\x00gz"),
        Bytes::from_static(b"body { color: red }"),
        ObjectMetadata::default().with_content_type("text/css"),
    );
    let base_url = spawn_server(GatewayConfig::default(), Arc::new(store)).await;
    let client = Client::new();
    let url = format!("{}/site/app.css", base_url);

    let res = client.get(&url).header(header::ACCEPT_ENCODING, "gzip").send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_ENCODING], "gzip");
    assert_eq!(&res.bytes().await.unwrap()[..], b"\x1f\x8b\x08\x00gz");

    let res = client.get(&url).header(header::ACCEPT_ENCODING, "identity").send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get(header::CONTENT_ENCODING).is_none());
    assert_eq!(res.text().await.unwrap(), "body { color: red }");
}

#[tokio::test]
async fn test_head_and_methods() {
    let base_url = spawn_server(GatewayConfig::default(), Arc::new(site_store())).await;
    let client = Client::new();
    let url = format!("{}/site/data.bin", base_url);

    let res = client.head(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_LENGTH], "1000");
    assert_eq!(res.headers()[header::ACCEPT_RANGES], "bytes");

    let res = client.delete(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client.put(&url).body("new").send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

async fn fetch_range(client: &Client, url: &str, range: &str) -> (StatusCode, String, Bytes) {
    let res = client.get(url).header(header::RANGE, range).send().await.unwrap();
    let status = res.status();
    let content_range = res.headers()[header::CONTENT_RANGE].to_str().unwrap().to_string();
    (status, content_range, res.bytes().await.unwrap())
}

#[tokio::test]
async fn test_repeated_gets_are_identical() {
    let base_url = spawn_server(GatewayConfig::default(), Arc::new(site_store())).await;
    let client = Client::new();
    let url = format!("{}/site/data.bin", base_url);

    let first = fetch_range(&client, &url, "bytes=100-599").await;
    let second = fetch_range(&client, &url, "bytes=100-599").await;
    assert_eq!(first.0, StatusCode::PARTIAL_CONTENT);
    assert_eq!(first, second);
}

/// Serves metadata for any key, then fails half way through the body
struct BrokenStream;

#[async_trait]
impl BlobStore for BrokenStream {
    async fn get_metadata(
        &self,
        _bucket: &str,
        _object: &str,
        _want_compressed: bool,
    ) -> blobgate_store::Result<ObjectMetadata> {
        Ok(ObjectMetadata::new(1000))
    }

    async fn open_reader(
        &self,
        _bucket: &str,
        _object: &str,
        _want_compressed: bool,
        _range: Option<ReadRange>,
    ) -> blobgate_store::Result<ObjectReader> {
        let chunks = vec![
            Ok(Bytes::from(vec![0u8; 500])),
            Err(StoreError::Connection("reset by peer".to_string())),
        ];
        Ok(ObjectReader {
            content_length: Some(1000),
            content_encoding: None,
            stream: futures::stream::iter(chunks).boxed(),
        })
    }
}

#[tokio::test]
async fn test_mid_stream_failure_aborts_body() {
    let base_url = spawn_server(GatewayConfig::default(), Arc::new(BrokenStream)).await;
    let client = Client::new();

    let res = client.get(format!("{}/site/big.bin", base_url)).send().await.unwrap();

    // status line was already committed
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_LENGTH], "1000");
    assert!(res.bytes().await.is_err());
}
