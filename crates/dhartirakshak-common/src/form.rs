use bytes::Bytes;
use rand::Rng;
use smol_str::SmolStr;
use std::path::Path;

/// A file attached to a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// File name sent in the part's `Content-Disposition`
    pub file_name: SmolStr,
    /// MIME type of the file contents
    pub content_type: SmolStr,
    /// Raw file contents
    pub data: Bytes,
}

impl FilePart {
    /// Create a file part from in-memory bytes.
    pub fn new(
        file_name: impl Into<SmolStr>,
        content_type: impl Into<SmolStr>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Read a file from disk, guessing the MIME type from its extension.
    pub async fn read(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_owned());
        let content_type = mime_guess::from_path(path).first_or_octet_stream();
        Ok(Self::new(file_name, content_type.essence_str(), data))
    }
}

/// One form field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    /// Plain text field
    Text(SmolStr),
    /// File upload
    File(FilePart),
}

/// `multipart/form-data` body builder.
///
/// Fields keep insertion order and names may repeat (multi-file fields).
/// The `*_opt` helpers skip `None`, the way the web forms skip unset values.
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: SmolStr,
    parts: Vec<(SmolStr, FormValue)>,
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartForm {
    /// Empty form with a random boundary.
    pub fn new() -> Self {
        let mut rng = rand::rng();
        let boundary = format!(
            "----dhartirakshak{:016x}{:016x}",
            rng.random::<u64>(),
            rng.random::<u64>()
        );
        Self::with_boundary(boundary)
    }

    /// Empty form with a fixed boundary.
    pub fn with_boundary(boundary: impl Into<SmolStr>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    /// Append a text field.
    pub fn text(mut self, name: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Self {
        self.parts.push((name.into(), FormValue::Text(value.into())));
        self
    }

    /// Append a text field when present.
    pub fn text_opt<V: Into<SmolStr>>(self, name: impl Into<SmolStr>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.text(name, v),
            None => self,
        }
    }

    /// Append a text field when present and non-empty.
    pub fn text_non_empty<V: Into<SmolStr>>(
        self,
        name: impl Into<SmolStr>,
        value: Option<V>,
    ) -> Self {
        let value: Option<SmolStr> = value.map(Into::into);
        match value {
            Some(v) if !v.is_empty() => self.text(name, v),
            _ => self,
        }
    }

    /// Append a file field.
    pub fn file(mut self, name: impl Into<SmolStr>, file: FilePart) -> Self {
        self.parts.push((name.into(), FormValue::File(file)));
        self
    }

    /// Append a file field when present.
    pub fn file_opt(self, name: impl Into<SmolStr>, file: Option<FilePart>) -> Self {
        match file {
            Some(f) => self.file(name, f),
            None => self,
        }
    }

    /// Append every file under the same field name.
    pub fn files(mut self, name: impl Into<SmolStr>, files: impl IntoIterator<Item = FilePart>) -> Self {
        let name = name.into();
        for f in files {
            self.parts.push((name.clone(), FormValue::File(f)));
        }
        self
    }

    /// Keep only the fields named in `allowed`.
    pub fn retain_fields(mut self, allowed: &[&str]) -> Self {
        self.parts.retain(|(name, _)| allowed.contains(&name.as_str()));
        self
    }

    /// Field names in order, repeats included.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(n, _)| n.as_str())
    }

    /// First value for a field.
    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.parts.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Number of parts.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// True when there are no parts.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Boundary string.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Encode the body.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (name, value) in &self.parts {
            out.extend_from_slice(b"--");
            out.extend_from_slice(self.boundary.as_bytes());
            out.extend_from_slice(b"\r\n");
            match value {
                FormValue::Text(text) => {
                    out.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                            escape_quoted(name)
                        )
                        .as_bytes(),
                    );
                    out.extend_from_slice(text.as_bytes());
                }
                FormValue::File(file) => {
                    out.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                            escape_quoted(name),
                            escape_quoted(&file.file_name),
                            file.content_type
                        )
                        .as_bytes(),
                    );
                    out.extend_from_slice(&file.data);
                }
            }
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"--");
        out.extend_from_slice(self.boundary.as_bytes());
        out.extend_from_slice(b"--\r\n");
        out
    }
}

// Same escaping browsers apply to names in Content-Disposition.
fn escape_quoted(s: &str) -> String {
    s.replace('"', "%22").replace('\r', "%0D").replace('\n', "%0A")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_absent_values() {
        let form = MultipartForm::new()
            .text("title", "Wheat prices")
            .text_opt("description", None::<&str>)
            .text_non_empty("phone", Some(""))
            .file_opt("image", None);
        assert_eq!(form.field_names().collect::<Vec<_>>(), vec!["title"]);
    }

    #[test]
    fn repeats_multi_file_fields() {
        let a = FilePart::new("a.png", "image/png", &b"A"[..]);
        let b = FilePart::new("b.png", "image/png", &b"B"[..]);
        let form = MultipartForm::new().files("documents", vec![a, b]);
        assert_eq!(form.len(), 2);
        assert_eq!(
            form.field_names().collect::<Vec<_>>(),
            vec!["documents", "documents"]
        );
    }

    #[test]
    fn encodes_text_and_file_parts() {
        let form = MultipartForm::with_boundary("XYZ")
            .text("title", "Rabi sowing")
            .file("pdf", FilePart::new("paper.pdf", "application/pdf", &b"%PDF"[..]));
        let body = String::from_utf8(form.encode()).unwrap();
        assert_eq!(
            body,
            "--XYZ\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nRabi sowing\r\n\
             --XYZ\r\nContent-Disposition: form-data; name=\"pdf\"; filename=\"paper.pdf\"\r\nContent-Type: application/pdf\r\n\r\n%PDF\r\n\
             --XYZ--\r\n"
        );
        assert_eq!(form.content_type(), "multipart/form-data; boundary=XYZ");
    }

    #[test]
    fn retain_fields_filters() {
        let form = MultipartForm::new()
            .text("title", "t")
            .text("is_active", "1")
            .text("description", "d")
            .retain_fields(&["title", "description"]);
        assert_eq!(
            form.field_names().collect::<Vec<_>>(),
            vec!["title", "description"]
        );
    }

    #[tokio::test]
    async fn read_guesses_content_type_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        for (name, expected) in [
            ("scan.PDF", "application/pdf"),
            ("field.jpeg", "image/jpeg"),
            ("leaf.bmp", "image/bmp"),
            ("soil.tiff", "image/tiff"),
            ("notes", "application/octet-stream"),
        ] {
            let path = dir.path().join(name);
            std::fs::write(&path, b"data").unwrap();
            let part = FilePart::read(&path).await.unwrap();
            assert_eq!(part.file_name, name);
            assert_eq!(part.content_type, expected);
            assert_eq!(part.data, &b"data"[..]);
        }
    }
}
