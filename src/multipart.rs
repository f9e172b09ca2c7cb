//! Multipart form bodies for upload endpoints

use crate::error::{Error, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};

/// One field of a multipart body
#[derive(Debug, Clone)]
pub struct MultipartPart {
    name: String,
    contents: Vec<u8>,
    file_name: Option<String>,
    headers: Vec<(String, String)>,
}

impl MultipartPart {
    pub fn new(name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
            file_name: None,
            headers: Vec::new(),
        }
    }

    /// Send the part as a file upload
    #[must_use]
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Extra header on this part only
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn into_part(self) -> Result<(String, Part)> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::invalid_header(name.as_str(), e))?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| Error::invalid_header(name.as_str(), e))?;
            headers.insert(header_name, header_value);
        }

        let mut part = Part::bytes(self.contents).headers(headers);
        if let Some(file_name) = self.file_name {
            part = part.file_name(file_name);
        }
        Ok((self.name, part))
    }
}

/// Ordered list of parts, converted to a `reqwest` form when sent
#[derive(Debug, Clone, Default)]
pub struct Multipart {
    parts: Vec<MultipartPart>,
}

impl Multipart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plain field
    pub fn add(&mut self, name: impl Into<String>, contents: impl Into<Vec<u8>>) -> &mut Self {
        self.parts.push(MultipartPart::new(name, contents));
        self
    }

    /// Add a prepared part
    pub fn add_part(&mut self, part: MultipartPart) -> &mut Self {
        self.parts.push(part);
        self
    }

    pub fn parts(&self) -> &[MultipartPart] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Build the form body
    pub fn into_form(self) -> Result<Form> {
        self.parts
            .into_iter()
            .try_fold(Form::new(), |form, part| {
                let (name, part) = part.into_part()?;
                Ok(form.part(name, part))
            })
    }
}
