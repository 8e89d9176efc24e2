use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use reqwest::Client;
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://plex.tv";

#[derive(Error, Debug)]
pub enum AccountError {
    #[error("request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("xml parse error: {0}")]
    XmlError(#[from] quick_xml::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Access coordinates for one server, as advertised by the account's device
/// listing. Either field can be missing: the account may know no such device,
/// the device may carry no token, or every connection may be local-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerAccess {
    pub access_token: Option<String>,
    pub base_url: Option<String>,
}

impl ServerAccess {
    pub fn is_complete(&self) -> bool {
        self.access_token.is_some() && self.base_url.is_some()
    }
}

pub struct AccountClient {
    client: Client,
    base_url: String,
}

impl AccountClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Client against a custom account endpoint, used by tests and
    /// self-hosted setups.
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Look up one server in the account's device listing and return its
    /// scoped access token plus a reachable (non-local) address.
    pub async fn resolve_server_access(
        &self,
        account_token: &str,
        server_id: &str,
    ) -> Result<ServerAccess, AccountError> {
        let url = format!(
            "{}/api/resources?includeHttps=1&X-Plex-Token={}",
            self.base_url,
            urlencoding::encode(account_token)
        );

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(AccountError::InvalidResponse(format!(
                "status: {}",
                response.status()
            )));
        }

        let xml = response.text().await?;
        self.parse_resources(&xml, server_id)
    }

    fn parse_resources(&self, xml: &str, server_id: &str) -> Result<ServerAccess, AccountError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut access = ServerAccess::default();
        let mut in_matching_device = false;
        let mut matched = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                    if name == "Device" && !matched && device_matches(e, server_id) {
                        matched = true;
                        in_matching_device = true;
                        access.access_token =
                            attr_value(e, "accessToken").filter(|t| !t.is_empty());
                    } else if name == "Connection"
                        && in_matching_device
                        && access.base_url.is_none()
                    {
                        access.base_url = remote_uri(e);
                    }
                }
                Ok(Event::Empty(ref e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                    // a self-closing Device has no Connection children, so the
                    // in_matching_device flag must not stay on for its siblings
                    if name == "Device" && !matched && device_matches(e, server_id) {
                        matched = true;
                        access.access_token =
                            attr_value(e, "accessToken").filter(|t| !t.is_empty());
                    } else if name == "Connection"
                        && in_matching_device
                        && access.base_url.is_none()
                    {
                        access.base_url = remote_uri(e);
                    }
                }
                Ok(Event::End(ref e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                    if name == "Device" && in_matching_device {
                        // everything about the matching device has been seen
                        break;
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(AccountError::XmlError(e)),
                _ => {}
            }
        }

        Ok(access)
    }
}

fn device_matches(e: &BytesStart, server_id: &str) -> bool {
    attr_value(e, "clientIdentifier").as_deref() == Some(server_id)
}

/// Address of a connection, if it is a non-local one worth dialing.
fn remote_uri(e: &BytesStart) -> Option<String> {
    if attr_value(e, "local").as_deref() != Some("0") {
        return None;
    }
    attr_value(e, "uri").filter(|uri| !uri.is_empty())
}

fn attr_value(e: &BytesStart, wanted: &str) -> Option<String> {
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        if key == wanted {
            return Some(String::from_utf8_lossy(&attr.value).to_string());
        }
    }
    None
}
