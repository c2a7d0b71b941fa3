//! Authenticated portal endpoints: documents, patient linking and access codes.
//!
//! Every request goes through [`PortalApi::request`], which attaches the stored
//! bearer token when one is present.

pub mod models;

use crate::auth::{service::rejection_detail, TokenStore};
use crate::error::ApiError;
use reqwest::{multipart, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

pub use models::{AccessCode, DocumentInfo, LinkOutcome, PatientSummary};

/// Joins `path` onto `base` as a child path, whether or not `base` ends in `/`.
pub(crate) fn join_endpoint(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path.trim_start_matches('/'))
}

#[derive(Clone)]
pub struct PortalApi {
    client: Client,
    base_url: Url,
    store: Arc<dyn TokenStore>,
}

impl PortalApi {
    pub fn new(client: Client, base_url: Url, store: Arc<dyn TokenStore>) -> Self {
        Self {
            client,
            base_url,
            store,
        }
    }

    /// Builds a request to `path`, attaching `Authorization: Bearer` from the token store.
    pub fn request(&self, method: Method, path: &str) -> crate::Result<RequestBuilder> {
        let url = join_endpoint(&self.base_url, path)?;
        let builder = self.client.request(method, url);
        match self.store.get()? {
            Some(credential) => Ok(builder.bearer_auth(credential.as_str())),
            None => Ok(builder),
        }
    }

    async fn send(builder: RequestBuilder, fallback: &str) -> Result<Response, ApiError> {
        let res = builder.send().await?;
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        if status == StatusCode::UNAUTHORIZED {
            warn!("Backend rejected the bearer token");
            return Err(ApiError::Unauthorized);
        }
        let detail = rejection_detail(res, fallback).await;
        warn!("Request rejected ({}): {}", status, detail);
        Err(ApiError::Rejected { status, detail })
    }

    async fn fetch<T: DeserializeOwned>(&self, method: Method, path: &str, fallback: &str) -> crate::Result<T> {
        let builder = self.request(method, path)?;
        let res = Self::send(builder, fallback).await?;
        let body = res.json::<T>().await.map_err(ApiError::from)?;
        Ok(body)
    }

    pub async fn upload_document(&self, filename: &str, contents: Vec<u8>) -> crate::Result<DocumentInfo> {
        debug!("Uploading {} ({} bytes)", filename, contents.len());
        let part = multipart::Part::bytes(contents).file_name(filename.to_string());
        let form = multipart::Form::new().part("file", part);
        let builder = self.request(Method::POST, "patient/upload/")?.multipart(form);

        let res = Self::send(builder, "Upload failed.").await?;
        let document = res.json::<DocumentInfo>().await.map_err(ApiError::from)?;
        info!("Uploaded {}", document.filename);
        Ok(document)
    }

    pub async fn upload_file(&self, path: &Path) -> crate::Result<DocumentInfo> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ApiError::InvalidUpload(format!("Cannot upload {}: no file name", path.display())))?
            .to_string();
        let contents = tokio::fs::read(path)
            .await
            .map_err(|e| ApiError::InvalidUpload(format!("Cannot read {}: {}", path.display(), e)))?;
        self.upload_document(&filename, contents).await
    }

    pub async fn own_documents(&self) -> crate::Result<Vec<DocumentInfo>> {
        self.fetch(Method::GET, "patient/documents", "Failed to load documents.").await
    }

    pub async fn delete_document(&self, document_id: i64) -> crate::Result<()> {
        let builder = self.request(Method::DELETE, &format!("patient/documents/{}", document_id))?;
        Self::send(builder, "Failed to delete document.").await?;
        info!("Deleted document {}", document_id);
        Ok(())
    }

    pub async fn doctor_patients(&self) -> crate::Result<Vec<PatientSummary>> {
        self.fetch(Method::GET, "doctor/patients", "Failed to load patients.").await
    }

    pub async fn patient_documents(&self, patient_id: i64) -> crate::Result<Vec<DocumentInfo>> {
        self.fetch(
            Method::GET,
            &format!("doctor/patients/{}/documents", patient_id),
            "Failed to load patient documents.",
        )
        .await
    }

    pub async fn generate_access_code(&self) -> crate::Result<AccessCode> {
        let code: AccessCode = self
            .fetch(Method::POST, "patient/generate-access-code", "Failed to generate access code.")
            .await?;
        info!("Generated a new patient access code");
        Ok(code)
    }

    pub async fn link_patient(&self, access_code: &str) -> crate::Result<LinkOutcome> {
        let builder = self
            .request(Method::POST, "doctor/link-patient")?
            .query(&[("access_code", access_code)]);
        let res = Self::send(builder, "Failed to link patient.").await?;
        let outcome = res.json::<LinkOutcome>().await.map_err(ApiError::from)?;
        info!("Linked patient: {}", outcome.message);
        Ok(outcome)
    }
}
