use blobgate::{AppState, GatewayConfig, SignatureValidator, serve};
use blobgate_store::{MemoryBlobStore, ObjectMetadata};
use chrono::Utc;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use tokio::net::TcpListener;

const SIGNING_KEY: &str = "integration-signing-key";

async fn spawn_server(config: GatewayConfig, store: MemoryBlobStore) -> String {
    let state = Arc::new(AppState::with_store(config, Arc::new(store)));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        serve(listener, state, std::future::pending::<()>()).await.unwrap();
    });

    format!("http://{}", addr)
}

fn signed_config() -> GatewayConfig {
    GatewayConfig {
        signing_key: Some(SIGNING_KEY.to_string()),
        ..Default::default()
    }
}

fn private_store() -> MemoryBlobStore {
    let store = MemoryBlobStore::new();
    store.insert(
        "private",
        "reports/q3.pdf",
        "%PDF-1.7 quarterly",
        ObjectMetadata::default()
            .with_content_type("application/pdf")
            .with_content_disposition("attachment; filename=\"q3.pdf\""),
    );
    store
}

#[tokio::test]
async fn test_signed_url_lifecycle() {
    let store = private_store();
    let base_url = spawn_server(signed_config(), store.clone()).await;
    let client = Client::new();
    let validator = SignatureValidator::new(SIGNING_KEY);
    let path = "/private/reports/q3.pdf";
    let expires = Utc::now().timestamp() + 600;

    // 1. Valid signature
    let url = format!("{}{}?{}", base_url, path, validator.signed_query(path, expires));
    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-disposition"], "attachment; filename=\"q3.pdf\"");
    assert_eq!(res.text().await.unwrap(), "%PDF-1.7 quarterly");

    // 2. Unsigned
    let res = client.get(format!("{}{}", base_url, path)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // 3. Signature replayed on another path
    let url = format!(
        "{}/private/reports/q4.pdf?{}",
        base_url,
        validator.signed_query(path, expires)
    );
    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // 4. Tampered expiry
    let signature = validator.sign(path, expires);
    let url = format!(
        "{}{}?expires={}&signature={}",
        base_url,
        path,
        expires + 3600,
        unpadded(&signature)
    );
    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // 5. Expired
    let past = Utc::now().timestamp() - 10;
    let url = format!("{}{}?{}", base_url, path, validator.signed_query(path, past));
    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(res.headers()["x-error-code"], "Expired");

    // only the valid request reached storage
    assert_eq!(store.lookups(), vec!["private/reports/q3.pdf"]);
}

#[tokio::test]
async fn test_signature_covers_decoded_path() {
    let store = MemoryBlobStore::new();
    store.insert("private", "my file.txt", "spaced", ObjectMetadata::default());
    let base_url = spawn_server(signed_config(), store).await;
    let client = Client::new();
    let validator = SignatureValidator::new(SIGNING_KEY);
    let expires = Utc::now().timestamp() + 600;

    let query = validator.signed_query("/private/my file.txt", expires);
    let url = format!("{}/private/my%20file.txt?{}", base_url, query);
    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "spaced");
}

#[tokio::test]
async fn test_domain_mode_with_signatures() {
    let store = MemoryBlobStore::new();
    store.insert("static.example.com", "logo.svg", "<svg/>", ObjectMetadata::default());
    let config = GatewayConfig {
        domain_as_bucket: true,
        ..signed_config()
    };
    let base_url = spawn_server(config, store).await;
    let client = Client::new();
    let validator = SignatureValidator::new(SIGNING_KEY);
    let expires = Utc::now().timestamp() + 600;

    let url = format!("{}/logo.svg?{}", base_url, validator.signed_query("/logo.svg", expires));
    let res = client
        .get(&url)
        .header("host", "static.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "<svg/>");

    // same signature, different host: the key does not exist there
    let res = client
        .get(&url)
        .header("host", "other.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

/// base64url without padding needs no percent-encoding
fn unpadded(signature: &str) -> &str {
    signature.trim_end_matches('=')
}
