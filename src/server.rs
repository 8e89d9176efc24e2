use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use reqwest::Client;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("xml parse error: {0}")]
    XmlError(#[from] quick_xml::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Client for one resolved media server, holding its scoped access token.
pub struct ServerClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl ServerClient {
    pub fn new(base_url: &str, access_token: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// List the download path of every file part backing a library item, in
    /// document order. Multi-part movies and whole seasons yield several.
    pub async fn resolve_file_parts(&self, content_id: &str) -> Result<Vec<String>, ServerError> {
        let url = format!(
            "{}/library/metadata/{}?X-Plex-Token={}",
            self.base_url,
            content_id,
            urlencoding::encode(&self.access_token)
        );

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(ServerError::InvalidResponse(format!(
                "status: {}",
                response.status()
            )));
        }

        let xml = response.text().await?;
        self.parse_parts(&xml)
    }

    fn parse_parts(&self, xml: &str) -> Result<Vec<String>, ServerError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut parts = Vec::new();
        let mut in_media = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                    if name == "Media" {
                        in_media = true;
                    } else if name == "Part" && in_media {
                        push_part_key(e, &mut parts);
                    }
                }
                Ok(Event::Empty(ref e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                    if name == "Part" && in_media {
                        push_part_key(e, &mut parts);
                    }
                }
                Ok(Event::End(ref e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                    if name == "Media" {
                        in_media = false;
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(ServerError::XmlError(e)),
                _ => {}
            }
        }

        Ok(parts)
    }
}

/// Record a part's download path; parts without a key are not downloadable.
fn push_part_key(e: &BytesStart, parts: &mut Vec<String>) {
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        if key == "key" {
            let value = String::from_utf8_lossy(&attr.value).to_string();
            if !value.is_empty() {
                parts.push(value);
            }
            return;
        }
    }
}
