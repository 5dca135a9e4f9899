use anyhow::{bail, Context, Result};
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tracing::debug;
use xmltree::Element;

/// HTTP/SOAP client for one router. Shared by the description fetch and every
/// action invocation so the timeout, credentials and TLS settings apply to all
/// requests alike.
pub struct SoapClient {
    http: Client,
    base: Url,
    username: String,
    password: String,
}

impl SoapClient {
    pub fn new(
        base: &str,
        username: &str,
        password: &str,
        timeout_ms: u64,
        insecure: bool,
    ) -> Result<Self> {
        let base = Url::parse(base).with_context(|| format!("invalid host URL {}", base))?;
        if base.scheme() != "http" && base.scheme() != "https" {
            bail!("host URL must be http or https, got {}", base.scheme());
        }
        let http = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .danger_accept_invalid_certs(insecure)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base,
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// GET a path relative to the base URL and parse it as an XML document.
    /// Requires HTTP 200 and an XML content type.
    pub async fn get_document(&self, path: &str) -> Result<Element> {
        let url = self.base.join(path)?;
        debug!(%url, "fetching document");
        let resp = self
            .http
            .get(url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;
        let status = resp.status();
        if status != StatusCode::OK {
            bail!("{} returned HTTP {}", url, status);
        }
        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.contains("xml") {
            bail!("{} returned non-XML content type {:?}", url, content_type);
        }
        let body = resp.text().await?;
        Element::parse(body.as_bytes()).with_context(|| format!("invalid XML from {}", url))
    }

    /// Invoke a SOAP action and return the raw response body.
    ///
    /// `control_url` may be absolute or relative to the base URL. Errors on
    /// transport failure or any non-2xx status; the caller parses the body.
    pub async fn call_action(
        &self,
        control_url: &str,
        service_type: &str,
        action: &str,
        args: &[(String, String)],
    ) -> Result<String> {
        let url = self.resolve(control_url)?;
        let envelope = build_envelope(service_type, action, args);
        debug!(%url, action, "sending SOAP action");
        let resp = self
            .http
            .post(url)
            .basic_auth(&self.username, Some(&self.password))
            .header("Content-Type", "text/xml; charset=\"utf-8\"")
            .header("SOAPACTION", soap_action_header(service_type, action))
            .body(envelope)
            .send()
            .await
            .with_context(|| format!("SOAP request for {} failed", action))?;
        let status = resp.status();
        if !status.is_success() {
            bail!("action {} returned HTTP {}", action, status);
        }
        Ok(resp.text().await?)
    }

    fn resolve(&self, control_url: &str) -> Result<Url> {
        if control_url.starts_with("http://") || control_url.starts_with("https://") {
            Url::parse(control_url).with_context(|| format!("invalid control URL {}", control_url))
        } else {
            self.base
                .join(control_url)
                .with_context(|| format!("invalid control URL {}", control_url))
        }
    }
}

/// `SOAPACTION` header value: the quoted service type and action name.
pub fn soap_action_header(service_type: &str, action: &str) -> String {
    format!("\"{}#{}\"", service_type, action)
}

/// Build a SOAP 1.1 envelope with the arguments serialized as flat elements.
pub fn build_envelope(service_type: &str, action: &str, args: &[(String, String)]) -> String {
    let mut arg_xml = String::new();
    for (name, value) in args {
        // TODO: escape argument values before interpolating
        arg_xml.push_str(&format!("<{}>{}</{}>", name, value, name));
    }
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
         <s:Envelope xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\" \
         s:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\">\
         <s:Body><u:{action} xmlns:u=\"{st}\">{args}</u:{action}></s:Body>\
         </s:Envelope>",
        action = action,
        st = service_type,
        args = arg_xml,
    )
}
