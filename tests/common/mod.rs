#![allow(dead_code)]

use std::sync::Arc;

use detectserve::bbf::{DetectParams, Detection, ObjectDetector};
use detectserve::http::parser::RequestSink;
use image::GrayImage;

pub const BOUNDARY: &str = "----detectserveXyZ";

/// One multipart part: name, optional filename, bytes.
pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub data: &'a [u8],
}

pub fn field<'a>(name: &'a str, data: &'a [u8]) -> Part<'a> {
    Part { name, filename: None, data }
}

pub fn file<'a>(name: &'a str, filename: &'a str, data: &'a [u8]) -> Part<'a> {
    Part { name, filename: Some(filename), data }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part.filename {
            Some(filename) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                        part.name, filename
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name).as_bytes(),
                );
            }
        }
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn post_multipart(path: &str, parts: &[Part<'_>]) -> Vec<u8> {
    post_body(path, &multipart_body(parts))
}

/// Wraps a hand-written multipart body using [`BOUNDARY`].
pub fn post_body(path: &str, body: &[u8]) -> Vec<u8> {
    let mut request = format!(
        "POST {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: multipart/form-data; boundary={BOUNDARY}\r\nContent-Length: {}\r\n\r\n",
        body.len()
    )
    .into_bytes();
    request.extend_from_slice(body);
    request
}

pub fn get(path: &str) -> Vec<u8> {
    format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n").into_bytes()
}

/// A 1x1 grayscale PNG.
pub fn png_1x1() -> Vec<u8> {
    let img = GrayImage::from_pixel(1, 1, image::Luma([128u8]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Detector that always reports the same regions.
pub struct FixedDetector(pub Vec<Detection>);

impl ObjectDetector for FixedDetector {
    fn detect(&self, _image: &GrayImage, _params: &DetectParams) -> Option<Vec<Detection>> {
        Some(self.0.clone())
    }
}

pub fn fixed_detector(detections: Vec<Detection>) -> Arc<dyn ObjectDetector> {
    Arc::new(FixedDetector(detections))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Path(Vec<u8>),
    Query(Vec<u8>),
    Field(usize, Vec<u8>),
    Value(usize, Vec<u8>),
    Data(Vec<u8>),
    Complete,
}

/// Records tokenizer events, joining chunks of the same piece.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Event>,
}

impl Recorder {
    fn push(&mut self, event: Event) {
        if let Some(last) = self.events.last_mut() {
            match (last, &event) {
                (Event::Field(a, acc), Event::Field(b, more))
                | (Event::Value(a, acc), Event::Value(b, more))
                    if a == b =>
                {
                    acc.extend_from_slice(more);
                    return;
                }
                (Event::Data(acc), Event::Data(more)) => {
                    acc.extend_from_slice(more);
                    return;
                }
                _ => {}
            }
        }
        self.events.push(event);
    }
}

impl RequestSink for Recorder {
    fn on_path(&mut self, path: &[u8]) {
        self.push(Event::Path(path.to_vec()));
    }

    fn on_query_string(&mut self, query: &[u8]) {
        self.push(Event::Query(query.to_vec()));
    }

    fn on_multipart_header_field(&mut self, chunk: &[u8], index: usize) {
        self.push(Event::Field(index, chunk.to_vec()));
    }

    fn on_multipart_header_value(&mut self, chunk: &[u8], index: usize) {
        self.push(Event::Value(index, chunk.to_vec()));
    }

    fn on_part_data(&mut self, chunk: &[u8]) {
        self.push(Event::Data(chunk.to_vec()));
    }

    fn on_complete(&mut self) {
        self.push(Event::Complete);
    }
}
