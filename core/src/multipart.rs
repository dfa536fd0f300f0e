//! multipart/form-data items and the byte-level body builder.
//!
//! # Design
//! The builder frames parts exactly as existing consumers of this wire format
//! expect, including the stray quote that terminates the plain-field
//! `Content-Disposition` line and the missing blank line after it. Changing
//! either would break servers tolerant of the historical bytes, so the framing
//! is locked down by golden tests and the vectors under `test-vectors/`.
//!
//! The boundary is a `Boundary_<uuid>` token generated once per builder.
//! Uniqueness is probabilistic; part contents are not scanned for collisions.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::scalar::Scalar;

/// One part of a multipart/form-data body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub name: String,
    pub value: Vec<u8>,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
}

impl Item {
    /// A plain field with no file metadata.
    pub fn field(name: impl Into<String>, value: impl Into<Vec<u8>>) -> Item {
        Item {
            name: name.into(),
            value: value.into(),
            mime_type: None,
            file_name: None,
        }
    }

    /// A file part. Both the MIME type and the file name must be present for
    /// the filename-bearing disposition to be emitted; an item with only one
    /// of the two is framed as a plain field.
    pub fn file(
        name: impl Into<String>,
        value: impl Into<Vec<u8>>,
        mime_type: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Item {
        Item {
            name: name.into(),
            value: value.into(),
            mime_type: Some(mime_type.into()),
            file_name: Some(file_name.into()),
        }
    }
}

/// Builds a multipart/form-data body from a list of items.
#[derive(Debug, Clone)]
pub struct Builder {
    boundary: String,
    items: Vec<Item>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            boundary: format!("Boundary_{}", Uuid::new_v4()),
            items: Vec::new(),
        }
    }

    /// One plain item per field, in key order. Values are the UTF-8 bytes of
    /// the scalar's string form.
    pub fn from_fields(fields: &BTreeMap<String, Scalar>) -> Builder {
        let mut builder = Builder::new();
        for (key, value) in fields {
            builder.add(Item::field(key.clone(), value.to_string().into_bytes()));
        }
        builder
    }

    pub fn from_items(items: Vec<Item>) -> Builder {
        let mut builder = Builder::new();
        builder.items = items;
        builder
    }

    pub fn add(&mut self, item: Item) {
        self.items.push(item);
    }

    /// Boundary token, without the leading dashes.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// `Content-Type` header value carrying the boundary parameter.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data;boundary={}", self.boundary)
    }

    /// Frame every item in order and terminate with the final delimiter.
    /// The final delimiter has no trailing CRLF.
    pub fn build(&self) -> Vec<u8> {
        let mut data = Vec::new();
        for item in &self.items {
            data.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
            if let (Some(file_name), Some(mime_type)) = (&item.file_name, &item.mime_type) {
                data.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        item.name, file_name
                    )
                    .as_bytes(),
                );
                data.extend_from_slice(format!("Content-Type: {mime_type}\r\n\r\n").as_bytes());
            } else {
                // The stray quote after the name attribute and the missing
                // blank line before the value are part of the historical
                // framing; consumers expect these bytes exactly as written.
                data.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\";\"\r\n", item.name)
                        .as_bytes(),
                );
            }
            data.extend_from_slice(&item.value);
            data.extend_from_slice(b"\r\n");
        }
        data.extend_from_slice(format!("--{}--", self.boundary).as_bytes());
        data
    }
}

impl Default for Builder {
    fn default() -> Builder {
        Builder::new()
    }
}
