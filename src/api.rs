//! Typed client for the docking server's REST endpoints.
//!
//! Failures come back as `{"error": "..."}` with a non-2xx status; those map
//! to [`WizardError::Server`]. A non-2xx without that body is
//! [`WizardError::Http`].

use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, WizardError};
use crate::grid::GridBox;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridMode {
    /// Cover every atom of the structure.
    Blind,
    /// Cover only the listed residues, written `chain:number` (e.g. `A:45`).
    Targeted { residues: Vec<String> },
}

impl GridMode {
    /// Targeted mode over residue ids such as `A:45`. Entries are trimmed;
    /// an empty list or a malformed id is rejected before any request.
    pub fn targeted<I, S>(residues: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let residues = residues
            .into_iter()
            .map(|r| parse_residue(r.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        if residues.is_empty() {
            return Err(WizardError::Validation(
                "No residues specified for targeted docking.".to_string(),
            ));
        }
        Ok(GridMode::Targeted { residues })
    }
}

fn parse_residue(id: &str) -> Result<String> {
    let invalid = || WizardError::Validation(format!("residue '{}' is not chain:number (e.g. A:45)", id.trim()));
    let (chain, number) = id.split_once(':').ok_or_else(invalid)?;
    let (chain, number) = (chain.trim(), number.trim());
    if chain.is_empty() || number.parse::<i64>().is_err() {
        return Err(invalid());
    }
    Ok(format!("{chain}:{number}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Completed,
    #[serde(alias = "error")]
    Failed,
    NotFound,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        self != JobStatus::Running
    }

    pub fn succeeded(self) -> bool {
        self == JobStatus::Completed
    }
}

/// One `/run-status` answer. `log` is the whole log so far, not a delta.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunSnapshot {
    pub status: JobStatus,
    #[serde(default)]
    pub log: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Reply {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ReceptorReply {
    filepath: String,
}

#[derive(Deserialize)]
struct GridReply {
    grid_dimensions: GridBox,
}

#[derive(Clone)]
pub struct DockingClient {
    http: reqwest::Client,
    base: Url,
}

impl DockingClient {
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(server_url)
            .map_err(|e| WizardError::Config(format!("server url '{server_url}': {e}")))?;
        if base.cannot_be_a_base() {
            return Err(WizardError::Config(format!("server url '{server_url}' cannot carry paths")));
        }
        // Endpoints resolve relative to the base, so a prefix must end in '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        // The server tracks the active project in a session cookie.
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;
        Ok(DockingClient { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| WizardError::Config(format!("endpoint {path}: {e}")))
    }

    pub async fn create_project(&self, name: &str) -> Result<String> {
        let resp = self
            .http
            .post(self.endpoint("create-project")?)
            .json(&json!({ "project_name": name }))
            .send()
            .await?;
        require_message(read(resp, "create-project").await?)
    }

    /// Returns the server-side path of the stored file.
    pub async fn upload_receptor(&self, file: &Path) -> Result<String> {
        let form = Form::new().part("file", file_part(file).await?);
        let resp = self
            .http
            .post(self.endpoint("rec_upload")?)
            .multipart(form)
            .send()
            .await?;
        let reply: ReceptorReply = read(resp, "rec_upload").await?;
        Ok(reply.filepath)
    }

    pub async fn upload_ligands(&self, files: &[PathBuf]) -> Result<String> {
        let mut form = Form::new();
        for file in files {
            form = form.part("files[]", file_part(file).await?);
        }
        let resp = self
            .http
            .post(self.endpoint("lig_upload")?)
            .multipart(form)
            .send()
            .await?;
        require_message(read(resp, "lig_upload").await?)
    }

    pub async fn generate_grid(&self, filepath: &str, mode: &GridMode) -> Result<GridBox> {
        let body = match mode {
            GridMode::Blind => json!({ "filepath": filepath, "mode": "blind" }),
            GridMode::Targeted { residues } => {
                json!({ "filepath": filepath, "mode": "targeted", "residues": residues })
            }
        };
        let resp = self
            .http
            .post(self.endpoint("grid")?)
            .json(&body)
            .send()
            .await?;
        let reply: GridReply = read(resp, "grid").await?;
        Ok(reply.grid_dimensions)
    }

    pub async fn prepare_receptor(&self, filepath: &str, grid: &GridBox) -> Result<String> {
        let resp = self
            .http
            .post(self.endpoint("prepare_receptor")?)
            .json(&json!({ "filepath": filepath, "grid": grid }))
            .send()
            .await?;
        let reply: Reply = read(resp, "prepare_receptor").await?;
        Ok(reply.message.unwrap_or_else(|| "Receptor prepared.".to_string()))
    }

    pub async fn upload_params(&self, fields: &[(&'static str, String)]) -> Result<String> {
        let form = fields
            .iter()
            .fold(Form::new(), |form, (name, value)| form.text(*name, value.clone()));
        let resp = self
            .http
            .post(self.endpoint("upload-params")?)
            .multipart(form)
            .send()
            .await?;
        require_message(read(resp, "upload-params").await?)
    }

    /// A start without an acknowledgement message counts as a failure.
    pub async fn start_run(&self) -> Result<String> {
        let resp = self.http.post(self.endpoint("run-docking")?).send().await?;
        require_message(read(resp, "run-docking").await?)
    }

    pub async fn run_status(&self) -> Result<RunSnapshot> {
        let resp = self.http.get(self.endpoint("run-status")?).send().await?;
        read(resp, "run-status").await
    }

    /// Raw structure text of an uploaded file.
    pub async fn fetch_structure(&self, filepath: &str) -> Result<String> {
        let resp = self
            .http
            .get(self.endpoint("get_pdb")?)
            .query(&[("filepath", filepath)])
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(server_error(status, &body));
        }
        Ok(body)
    }

    /// Zip of the whole results directory.
    pub async fn download_results(&self, dest: &Path) -> Result<u64> {
        self.download("download-results", dest).await
    }

    /// Per-ligand best affinities as CSV.
    pub async fn download_scores(&self, dest: &Path) -> Result<u64> {
        self.download("download_csv", dest).await
    }

    async fn download(&self, path: &str, dest: &Path) -> Result<u64> {
        let resp = self.http.get(self.endpoint(path)?).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(server_error(status, &body));
        }
        let bytes = resp.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;
        log::info!("saved {} bytes to {}", bytes.len(), dest.display());
        Ok(bytes.len() as u64)
    }
}

async fn file_part(path: &Path) -> Result<Part> {
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(Part::bytes(bytes).file_name(name))
}

async fn read<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(server_error(status, &body));
    }
    serde_json::from_str(&body).map_err(|e| WizardError::Decode(format!("{what}: {e}")))
}

fn server_error(status: StatusCode, body: &str) -> WizardError {
    match serde_json::from_str::<Reply>(body).ok().and_then(|r| r.error) {
        Some(msg) => WizardError::Server(msg),
        None => WizardError::Http {
            status: status.as_u16(),
        },
    }
}

fn require_message(reply: Reply) -> Result<String> {
    match (reply.message, reply.error) {
        (Some(message), _) => Ok(message),
        (None, Some(error)) => Err(WizardError::Server(error)),
        (None, None) => Err(WizardError::Server("Unknown error".to_string())),
    }
}
