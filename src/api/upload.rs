//! Staging of multipart uploads into temp files before they are forwarded to
//! the media host.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use axum::extract::{Multipart, multipart::MultipartRejection};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use super::response::{ApiError, ApiResult};

/// A received file on local disk. The temp file is removed on drop.
#[derive(Debug)]
pub struct StagedFile {
    pub file_name: Option<String>,
    temp: NamedTempFile,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        self.temp.path()
    }
}

/// Text fields and files of one multipart request.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    files: HashMap<String, StagedFile>,
}

impl UploadForm {
    /// Reads the whole form, streaming file parts into `dir`. A repeated field
    /// name keeps the last value.
    pub async fn read(
        multipart: Result<Multipart, MultipartRejection>,
        dir: &Path,
    ) -> ApiResult<Self> {
        let mut multipart =
            multipart.map_err(|rejection| ApiError::validation(rejection.body_text()))?;
        let mut form = UploadForm::default();

        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|err| ApiError::validation(err.body_text()))?
        {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };

            match field.file_name().map(str::to_owned) {
                Some(file_name) => {
                    let temp = staging_file(dir, &file_name)?;
                    let handle = temp
                        .as_file()
                        .try_clone()
                        .map_err(|err| ApiError::operation(format!("staging upload: {err}")))?;
                    let mut out = tokio::fs::File::from_std(handle);
                    while let Some(chunk) = field
                        .chunk()
                        .await
                        .map_err(|err| ApiError::validation(err.body_text()))?
                    {
                        out.write_all(&chunk)
                            .await
                            .map_err(|err| ApiError::operation(format!("staging upload: {err}")))?;
                    }
                    out.flush()
                        .await
                        .map_err(|err| ApiError::operation(format!("staging upload: {err}")))?;
                    form.files.insert(
                        name,
                        StagedFile {
                            file_name: Some(file_name),
                            temp,
                        },
                    );
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|err| ApiError::validation(err.body_text()))?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    pub fn take_text(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    /// Empty file parts count as absent.
    pub fn take_file(&mut self, name: &str) -> Option<StagedFile> {
        self.files.remove(name).filter(|file| {
            file.temp
                .as_file()
                .metadata()
                .map(|meta| meta.len() > 0)
                .unwrap_or(false)
        })
    }
}

/// Keeps the original extension so the media host can sniff the type.
fn staging_file(dir: &Path, file_name: &str) -> ApiResult<NamedTempFile> {
    let suffix = PathBuf::from(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&suffix)
        .tempfile_in(dir)
        .map_err(|err| ApiError::operation(format!("creating staging file: {err}")))
}
