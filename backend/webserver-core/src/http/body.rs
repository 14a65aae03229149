//! PUT/POST body decoding into named uploaded parts.
//!
//! - `multipart/form-data` POST: file parts land in temp files, text parts in the parameters
//! - `application/x-www-form-urlencoded` POST: merged into the parameters
//! - any other POST: the body text is stored as part `postData`
//! - PUT: the body is written to a temp file stored as part `content`

use crate::error::http::HttpError;
use crate::http::request::{Headers, QueryParams, Request};

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use log::debug;
use tempfile::{Builder as TempFileBuilder, TempPath};

pub const POST_DATA_PART: &str = "postData";
pub const PUT_CONTENT_PART: &str = "content";

const TEMP_FILE_PREFIX: &str = "webserver-upload-";

/// Named parts of a request body.
///
/// Values are either inline text or the path of a temporary file. The temp
/// files are deleted when this value is dropped, i.e. after the response for
/// the request has been written.
#[derive(Debug, Default)]
pub struct UploadedParts {
    parts: HashMap<String, String>,
    temp_files: Vec<TempPath>,
}

impl UploadedParts {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.parts.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parts.insert(name.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parts.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    fn insert_file(&mut self, name: String, file: TempPath) {
        self.parts
            .insert(name, file.to_string_lossy().into_owned());
        self.temp_files.push(file);
    }
}

/// Decode `body` into `request.files` and `request.parameters`.
///
/// Methods other than PUT and POST are left untouched.
pub fn parse_body(
    request: &mut Request,
    body: &[u8],
    upload_dir: Option<&Path>,
) -> Result<(), HttpError> {
    if !request.method.carries_body() {
        return Ok(());
    }

    match request.method {
        crate::http::Method::Put => {
            let file = write_temp_file(body, upload_dir)?;
            request.files.insert_file(PUT_CONTENT_PART.to_string(), file);
        }
        _ => {
            let content_type = request
                .headers
                .get("content-type")
                .unwrap_or_default()
                .to_string();
            let media_type = content_type
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase();

            match media_type.as_str() {
                "multipart/form-data" => {
                    let boundary = boundary_of(&content_type).ok_or_else(|| {
                        HttpError::multipart(
                            "Content type is multipart/form-data but boundary is missing",
                        )
                    })?;
                    parse_multipart(
                        body,
                        &boundary,
                        &mut request.parameters,
                        &mut request.files,
                        upload_dir,
                    )?;
                }
                "application/x-www-form-urlencoded" => {
                    request.parameters.extend_from_urlencoded(body);
                }
                _ => {
                    request
                        .files
                        .insert(POST_DATA_PART, String::from_utf8_lossy(body).into_owned());
                }
            }
        }
    }

    Ok(())
}

fn boundary_of(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("boundary") {
            let value = value.trim().trim_matches('"');
            (!value.is_empty()).then(|| value.to_string())
        } else {
            None
        }
    })
}

fn parse_multipart(
    body: &[u8],
    boundary: &str,
    parameters: &mut QueryParams,
    files: &mut UploadedParts,
    upload_dir: Option<&Path>,
) -> Result<(), HttpError> {
    let delimiter = format!("--{boundary}").into_bytes();
    let next_delimiter = format!("\r\n--{boundary}").into_bytes();

    let start = find(body, &delimiter, 0)
        .ok_or_else(|| HttpError::multipart("body does not contain the boundary"))?;
    let mut cursor = start + delimiter.len();

    loop {
        if body[cursor..].starts_with(b"--") {
            return Ok(());
        }
        if !body[cursor..].starts_with(b"\r\n") {
            return Err(HttpError::multipart("boundary not followed by CRLF"));
        }
        cursor += 2;

        let header_end = find(body, b"\r\n\r\n", cursor)
            .ok_or_else(|| HttpError::multipart("part headers are not terminated"))?;
        let part_headers = parse_part_headers(&body[cursor..header_end])?;
        let content_start = header_end + 4;

        let content_end = find(body, &next_delimiter, content_start)
            .ok_or_else(|| HttpError::multipart("missing closing boundary"))?;
        let content = &body[content_start..content_end];

        store_part(&part_headers, content, parameters, files, upload_dir)?;

        cursor = content_end + next_delimiter.len();
    }
}

fn parse_part_headers(raw: &[u8]) -> Result<Headers, HttpError> {
    let text = std::str::from_utf8(raw)
        .map_err(|_| HttpError::multipart("part headers are not valid UTF-8"))?;
    let mut headers = Headers::new();
    for line in text.split("\r\n").filter(|line| !line.is_empty()) {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| HttpError::multipart(format!("bad part header line {line:?}")))?;
        headers.insert(name.trim(), value.trim());
    }
    Ok(headers)
}

fn store_part(
    headers: &Headers,
    content: &[u8],
    parameters: &mut QueryParams,
    files: &mut UploadedParts,
    upload_dir: Option<&Path>,
) -> Result<(), HttpError> {
    let disposition = headers
        .get("content-disposition")
        .ok_or_else(|| HttpError::multipart("part without Content-Disposition"))?;
    let attributes = disposition_attributes(disposition);

    let name = attributes
        .get("name")
        .cloned()
        .ok_or_else(|| HttpError::multipart("Content-Disposition without a name"))?;

    match attributes.get("filename") {
        Some(file_name) => {
            let file = write_temp_file(content, upload_dir)?;
            debug!(
                "Stored upload part {} ({} bytes) at {}",
                name,
                content.len(),
                file.display()
            );
            parameters.append(name.clone(), file_name.clone());
            files.insert_file(name, file);
        }
        None => {
            parameters.append(name, String::from_utf8_lossy(content).into_owned());
        }
    }

    Ok(())
}

fn disposition_attributes(disposition: &str) -> HashMap<String, String> {
    disposition
        .split(';')
        .skip(1)
        .filter_map(|attribute| {
            let (key, value) = attribute.split_once('=')?;
            Some((
                key.trim().to_ascii_lowercase(),
                value.trim().trim_matches('"').to_string(),
            ))
        })
        .collect()
}

fn write_temp_file(content: &[u8], upload_dir: Option<&Path>) -> Result<TempPath, HttpError> {
    let builder = {
        let mut builder = TempFileBuilder::new();
        builder.prefix(TEMP_FILE_PREFIX);
        builder
    };
    let mut file = match upload_dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    file.write_all(content)?;
    file.flush()?;
    Ok(file.into_temp_path())
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|position| position + from)
}
