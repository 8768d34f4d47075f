//! Azure Blob Storage listing over the REST API.
//!
//! Only the "List Blobs" operation is needed: names are paged through with
//! `NextMarker` and every object URL is derived from the blob endpoint.
//! Account-key connection strings sign requests with SharedKey; SAS and
//! anonymous (public container) connection strings are sent as is.

use crate::source::{BlobItem, BlobSource, SourceError};
use base64::{Engine, engine::general_purpose::STANDARD};
use eyre::Result;
use hmac::{Hmac, Mac};
use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use sha2::Sha256;
use std::collections::HashMap;
use std::str::FromStr;
use url::Url;

const API_VERSION: &str = "2021-08-06";

const DEV_ACCOUNT: &str = "devstoreaccount1";
const DEV_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const DEV_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

/// How requests against the account are authorized.
#[derive(Debug, Clone, PartialEq)]
pub enum Credential {
    SharedKey { account: String, key: Vec<u8> },
    /// SAS query string, without the leading `?`.
    Sas(String),
    Anonymous,
}

/// The parts of a storage connection string that listing needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionString {
    pub blob_endpoint: Url,
    pub credential: Credential,
}

impl FromStr for ConnectionString {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |msg: &str| SourceError::InvalidConnectionString(msg.to_string());

        let mut settings = HashMap::new();
        for pair in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| invalid(&format!("expected key=value, got `{pair}`")))?;
            settings.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }
        let get = |key: &str| settings.get(key).map(String::as_str).filter(|v| !v.is_empty());

        if get("usedevelopmentstorage").is_some_and(|v| v.eq_ignore_ascii_case("true")) {
            let key = STANDARD
                .decode(DEV_ACCOUNT_KEY)
                .map_err(|e| invalid(&e.to_string()))?;
            return Ok(Self {
                blob_endpoint: Url::parse(DEV_BLOB_ENDPOINT).map_err(|e| invalid(&e.to_string()))?,
                credential: Credential::SharedKey {
                    account: DEV_ACCOUNT.to_string(),
                    key,
                },
            });
        }

        let account = get("accountname");
        let blob_endpoint = match (get("blobendpoint"), account) {
            (Some(endpoint), _) => endpoint.to_string(),
            (None, Some(account)) => format!(
                "{}://{account}.blob.{}",
                get("defaultendpointsprotocol").unwrap_or("https"),
                get("endpointsuffix").unwrap_or("core.windows.net"),
            ),
            (None, None) => return Err(invalid("missing BlobEndpoint or AccountName")),
        };
        let blob_endpoint = Url::parse(&blob_endpoint).map_err(|e| invalid(&e.to_string()))?;
        if blob_endpoint.cannot_be_a_base() {
            return Err(invalid("BlobEndpoint is not a hierarchical URL"));
        }

        let credential = match (get("accountkey"), get("sharedaccesssignature")) {
            (Some(key), _) => {
                let account = account.ok_or_else(|| invalid("AccountKey requires AccountName"))?;
                let key = STANDARD
                    .decode(key)
                    .map_err(|e| invalid(&format!("AccountKey is not base64: {e}")))?;
                Credential::SharedKey {
                    account: account.to_string(),
                    key,
                }
            }
            (None, Some(sas)) => Credential::Sas(sas.trim_start_matches('?').to_string()),
            (None, None) => Credential::Anonymous,
        };

        Ok(Self {
            blob_endpoint,
            credential,
        })
    }
}

/// Lists a single container of an Azure storage account.
pub struct AzureSource {
    client: Client,
    connection: ConnectionString,
    container: String,
}

impl AzureSource {
    pub fn new(connection_string: &str, container: &str) -> Result<Self> {
        let connection = connection_string.parse::<ConnectionString>()?;
        let client = Client::builder()
            .user_agent(concat!("voice-archive/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            connection,
            container: container.to_string(),
        })
    }

    fn container_url(&self) -> Result<Url> {
        let mut url = self.connection.blob_endpoint.clone();
        url.set_query(None);
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidConnectionString("BlobEndpoint has no path".into()))?
            .pop_if_empty()
            .push(&self.container);
        Ok(url)
    }

    /// Absolute object URL as the storage SDK reports it: credentials are
    /// never included and each key segment is percent-encoded.
    pub fn blob_url(&self, name: &str) -> Result<String> {
        let mut url = self.container_url()?;
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidConnectionString("BlobEndpoint has no path".into()))?
            .extend(name.split('/'));
        Ok(url.to_string())
    }

    fn list_params<'a>(
        &self,
        prefix: Option<&'a str>,
        marker: Option<&'a str>,
    ) -> Vec<(&'static str, &'a str)> {
        let mut params = vec![("restype", "container"), ("comp", "list")];
        if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
            params.push(("prefix", prefix));
        }
        if let Some(marker) = marker.filter(|m| !m.is_empty()) {
            params.push(("marker", marker));
        }
        params
    }

    pub fn list_url(&self, prefix: Option<&str>, marker: Option<&str>) -> Result<Url> {
        let mut url = self.container_url()?;
        url.query_pairs_mut()
            .extend_pairs(self.list_params(prefix, marker));
        if let Credential::Sas(sas) = &self.connection.credential {
            let query = format!("{}&{sas}", url.query().unwrap_or_default());
            url.set_query(Some(&query));
        }
        Ok(url)
    }

    fn list_page(&self, prefix: Option<&str>, marker: Option<&str>) -> Result<ListPage> {
        let url = self.list_url(prefix, marker)?;
        let date = chrono::Utc::now()
            .format("%a, %d %b %Y %H:%M:%S GMT")
            .to_string();

        let mut request = self
            .client
            .get(url.clone())
            .header("x-ms-date", &date)
            .header("x-ms-version", API_VERSION);

        if let Credential::SharedKey { account, key } = &self.connection.credential {
            let params = self.list_params(prefix, marker);
            let to_sign = string_to_sign(account, url.path(), &date, &params);
            tracing::trace!(%to_sign, "signing list request");
            request = request.header(AUTHORIZATION, sign(account, key, &to_sign)?);
        }

        tracing::debug!(container = %self.container, marker, "requesting blob list page");
        let response = request
            .send()
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(SourceError::RequestFailed {
                status: status.as_u16(),
                message: error_message(&body)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string()),
            }
            .into());
        }

        Ok(parse_listing(&body)?)
    }
}

impl BlobSource for AzureSource {
    fn list(&self, prefix: Option<&str>) -> Result<Vec<BlobItem>> {
        let mut items = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let page = self.list_page(prefix, marker.as_deref())?;
            tracing::info!(
                container = %self.container,
                count = page.names.len(),
                "listed blob page"
            );
            for name in page.names {
                let url = self.blob_url(&name)?;
                items.push(BlobItem { name, url });
            }
            match page.next_marker {
                Some(next) if !next.is_empty() => marker = Some(next),
                _ => break,
            }
        }

        Ok(items)
    }
}

/// Canonical SharedKey string for a body-less GET with only `x-ms-*` headers.
fn string_to_sign(account: &str, path: &str, date: &str, params: &[(&str, &str)]) -> String {
    // VERB plus the eleven standard headers, all empty for this request
    let mut out = String::from("GET\n");
    out.push_str(&"\n".repeat(11));
    out.push_str(&format!("x-ms-date:{date}\nx-ms-version:{API_VERSION}\n"));
    out.push_str(&format!("/{account}{path}"));

    let mut params = params
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), *v))
        .collect::<Vec<_>>();
    params.sort();
    for (k, v) in params {
        out.push_str(&format!("\n{k}:{v}"));
    }
    out
}

fn sign(account: &str, key: &[u8], to_sign: &str) -> Result<String> {
    type HmacSha256 = Hmac<Sha256>;

    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| SourceError::InvalidConnectionString(format!("invalid AccountKey: {e}")))?;
    mac.update(to_sign.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());
    Ok(format!("SharedKey {account}:{signature}"))
}

#[derive(Debug, Default, PartialEq)]
struct ListPage {
    names: Vec<String>,
    next_marker: Option<String>,
}

/// Call `f` with the element path and text of every text node.
fn visit_text(
    xml: &str,
    mut f: impl FnMut(&[&str], String),
) -> std::result::Result<(), SourceError> {
    let mut reader = Reader::from_str(xml.trim_start_matches('\u{feff}'));
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => path.push(String::from_utf8_lossy(e.name().as_ref()).to_string()),
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| SourceError::MalformedListing(e.to_string()))?;
                let segments = path.iter().map(String::as_str).collect::<Vec<_>>();
                f(&segments, text.into_owned());
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SourceError::MalformedListing(e.to_string())),
            _ => {}
        }
    }
    Ok(())
}

fn parse_listing(xml: &str) -> std::result::Result<ListPage, SourceError> {
    let mut page = ListPage::default();
    visit_text(xml, |path, text| match path {
        [.., "Blobs", "Blob", "Name"] => page.names.push(text),
        [.., "NextMarker"] => page.next_marker = Some(text.trim().to_string()),
        _ => {}
    })?;
    Ok(page)
}

fn error_message(xml: &str) -> Option<String> {
    let mut code = None;
    let mut message = None;
    visit_text(xml, |path, text| match path {
        ["Error", "Code"] => code = Some(text.trim().to_string()),
        ["Error", "Message"] => message = text.lines().next().map(|l| l.trim().to_string()),
        _ => {}
    })
    .ok()?;
    match (code, message) {
        (Some(code), Some(message)) => Some(format!("{code}: {message}")),
        (code, message) => code.or(message),
    }
}
