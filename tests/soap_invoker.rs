// tests/soap_invoker.rs
use fritz_sweep::soap::SoapClient;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

type SeenHeaders = Arc<Mutex<Vec<(String, String, String)>>>;

async fn record_headers(
    req: Request<Body>,
    seen: SeenHeaders,
) -> Result<Response<Body>, Infallible> {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string()
    };
    seen.lock().unwrap().push((
        header("soapaction"),
        header("authorization"),
        header("content-type"),
    ));
    Ok(Response::new(Body::from("<ok/>")))
}

fn spawn_recording_server(seen: SeenHeaders) -> SocketAddr {
    let make_svc = make_service_fn(move |_conn| {
        let seen = seen.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| record_headers(req, seen.clone())))
        }
    });
    let addr: SocketAddr = ([127, 0, 0, 1], 0).into();
    let server = Server::bind(&addr).serve(make_svc);
    let local = server.local_addr();
    tokio::spawn(server);
    local
}

async fn fixture(req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let resp = match req.uri().path() {
        "/desc.xml" => Response::builder()
            .status(200)
            .header("Content-Type", "text/xml; charset=\"utf-8\"")
            .body(Body::from("<root><a>1</a></root>"))
            .unwrap(),
        "/plain" => Response::builder()
            .status(200)
            .header("Content-Type", "text/plain")
            .body(Body::from("not xml"))
            .unwrap(),
        "/fail" => Response::builder()
            .status(500)
            .body(Body::from("UPnPError"))
            .unwrap(),
        _ => Response::builder().status(404).body(Body::empty()).unwrap(),
    };
    Ok(resp)
}

fn spawn_fixture_server() -> SocketAddr {
    let make_svc = make_service_fn(|_conn| async {
        Ok::<_, Infallible>(service_fn(fixture))
    });
    let addr: SocketAddr = ([127, 0, 0, 1], 0).into();
    let server = Server::bind(&addr).serve(make_svc);
    let local = server.local_addr();
    tokio::spawn(server);
    local
}

#[tokio::test]
async fn call_action_sets_headers_and_returns_body() {
    let seen: SeenHeaders = Arc::new(Mutex::new(Vec::new()));
    let addr = spawn_recording_server(seen.clone());

    let client = SoapClient::new(&format!("http://{}", addr), "admin", "secret", 2000, false)
        .unwrap();
    let args = vec![("ConnectionID".to_string(), "17".to_string())];
    let body = client
        .call_action("/upnp/control/x", "urn:x:S:1", "Frobnicate", &args)
        .await
        .unwrap();
    assert_eq!(body, "<ok/>");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (soapaction, authorization, content_type) = &seen[0];
    assert_eq!(soapaction, "\"urn:x:S:1#Frobnicate\"");
    assert!(authorization.starts_with("Basic "));
    assert!(content_type.contains("text/xml"));
}

#[tokio::test]
async fn call_action_accepts_absolute_control_url() {
    let seen: SeenHeaders = Arc::new(Mutex::new(Vec::new()));
    let addr = spawn_recording_server(seen.clone());

    // Base points nowhere useful; the absolute control URL must win.
    let client = SoapClient::new("http://192.0.2.1:49000", "admin", "secret", 2000, false)
        .unwrap();
    let body = client
        .call_action(
            &format!("http://{}/upnp/control/x", addr),
            "urn:x:S:1",
            "Frobnicate",
            &[],
        )
        .await
        .unwrap();
    assert_eq!(body, "<ok/>");
}

#[tokio::test]
async fn call_action_errors_on_http_500() {
    let addr = spawn_fixture_server();
    let client = SoapClient::new(&format!("http://{}", addr), "admin", "secret", 2000, false)
        .unwrap();
    let err = client
        .call_action("/fail", "urn:x:S:1", "Frobnicate", &[])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("500"), "unexpected error: {}", err);
}

#[tokio::test]
async fn get_document_parses_xml_responses() {
    let addr = spawn_fixture_server();
    let client = SoapClient::new(&format!("http://{}", addr), "admin", "secret", 2000, false)
        .unwrap();
    let doc = client.get_document("/desc.xml").await.unwrap();
    assert_eq!(doc.name, "root");
}

#[tokio::test]
async fn get_document_rejects_non_xml_content_type() {
    let addr = spawn_fixture_server();
    let client = SoapClient::new(&format!("http://{}", addr), "admin", "secret", 2000, false)
        .unwrap();
    assert!(client.get_document("/plain").await.is_err());
}

#[tokio::test]
async fn get_document_rejects_missing_document() {
    let addr = spawn_fixture_server();
    let client = SoapClient::new(&format!("http://{}", addr), "admin", "secret", 2000, false)
        .unwrap();
    assert!(client.get_document("/nope.xml").await.is_err());
}
