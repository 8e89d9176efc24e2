use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::account::AccountClient;
use crate::config::Config;
use crate::download;
use crate::server::ServerClient;
use crate::weburl;

/// Everything that can stop a run before any download is attempted. The
/// precondition variants each map to their own user-facing message; remote
/// failures surface as a generic one carrying the underlying error text.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no account token available")]
    MissingToken,
    #[error("no server identifier in address")]
    MissingServerId,
    #[error("account has no usable access to this server")]
    MissingServerAccess,
    #[error("no content identifier in address")]
    MissingContentId,
    #[error("item has no downloadable parts")]
    NoParts,
    #[error(transparent)]
    Account(#[from] crate::account::AccountError),
    #[error(transparent)]
    Server(#[from] crate::server::ServerError),
}

impl PipelineError {
    /// What the user gets to read. Diagnostics stay English and structured;
    /// this surface is Spanish like the web client the tool sits next to.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::MissingToken => {
                "No se encontró el token de Plex. Inicia sesión en Plex Web y vuelve a intentarlo."
                    .to_string()
            }
            PipelineError::MissingServerId => {
                "No se pudo identificar el servidor en la dirección.".to_string()
            }
            PipelineError::MissingServerAccess => {
                "No se pudo obtener el acceso al servidor.".to_string()
            }
            PipelineError::MissingContentId => {
                "No se pudo identificar el contenido en la dirección.".to_string()
            }
            PipelineError::NoParts => "No se encontraron archivos descargables.".to_string(),
            PipelineError::Account(e) => format!("Ocurrió un error: {}", e),
            PipelineError::Server(e) => format!("Ocurrió un error: {}", e),
        }
    }
}

/// One run's inputs, resolved from command line and config.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Address of the web client page showing the item.
    pub page_url: String,
    /// Token override; wins over the environment and the config file.
    pub token: Option<String>,
    /// Print the authenticated part URLs instead of downloading them.
    pub print_urls: bool,
    /// Directory downloaded parts are written to.
    pub output_dir: PathBuf,
    /// Account service override, used by tests.
    pub account_url: Option<String>,
}

#[derive(Debug, Default)]
pub struct Summary {
    pub requested: usize,
    pub completed: usize,
    pub files: Vec<PathBuf>,
}

/// Run the whole chain for one page address: token, server identifier,
/// account lookup, content identifier, part listing, then one download per
/// part. Aborts at the first unmet precondition; a failed part download is
/// logged and the remaining parts are still attempted.
pub async fn run(config: &Config, options: &RunOptions) -> Result<Summary, PipelineError> {
    let token = config
        .resolve_token(options.token.as_deref())
        .ok_or(PipelineError::MissingToken)?;

    let server_id =
        weburl::extract_server_id(&options.page_url).ok_or(PipelineError::MissingServerId)?;
    debug!(%server_id, "server identifier extracted");

    let account = match options.account_url.as_deref().or(config.account_url.as_deref()) {
        Some(url) => AccountClient::with_base_url(url),
        None => AccountClient::new(),
    };

    let access = account.resolve_server_access(&token, &server_id).await?;
    let (Some(server_token), Some(base_url)) = (access.access_token, access.base_url) else {
        return Err(PipelineError::MissingServerAccess);
    };
    debug!(%base_url, "server access resolved");

    let content_id =
        weburl::extract_content_id(&options.page_url).ok_or(PipelineError::MissingContentId)?;

    let server = ServerClient::new(&base_url, &server_token);
    let parts = server.resolve_file_parts(&content_id).await?;
    if parts.is_empty() {
        return Err(PipelineError::NoParts);
    }

    info!(%content_id, parts = parts.len(), "resolved downloadable parts");

    let mut summary = Summary {
        requested: parts.len(),
        ..Summary::default()
    };
    let client = reqwest::Client::new();

    for part_key in &parts {
        let url = download::part_download_url(server.base_url(), part_key, server.access_token());

        if options.print_urls {
            println!("{}", url);
            summary.completed += 1;
            continue;
        }

        let name = download::part_file_name(part_key);
        let dest = download::unique_path(&options.output_dir, &name);
        println!("Descargando {}...", dest.display());

        match download::fetch_part(&client, &url, &dest).await {
            Ok(bytes) => {
                debug!(bytes, path = %dest.display(), "part downloaded");
                summary.completed += 1;
                summary.files.push(dest);
            }
            Err(e) => {
                // one bad part does not stop the rest
                error!(part = part_key.as_str(), error = %e, "part download failed");
            }
        }
    }

    Ok(summary)
}
