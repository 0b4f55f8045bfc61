//! Object detection route
//!
//! Serves `/bbf/detect.objects`. A POST carries the detection parameters and
//! the image as `multipart/form-data`; the response is a JSON array of
//! `[x,y,width,height,confidence]` cells. A bare GET returns an upload form.

pub mod detect;
pub mod params;

use crate::buffer::GrowBuf;
use crate::http::request::Method;
use crate::http::response::{Response, StatusCode, CONTENT_TYPE_JSON, HTTP_EMPTY_ARRAY};
use crate::http::writer::header_block;
use crate::uri::{HandlerError, HandlerResult, ParseEvent, UriHandler};

pub use detect::{AnyImageDecoder, DetectParams, Detection, ImageDecoder, ObjectDetector, Size};
pub use params::{Models, ParamParser};

pub const DETECT_OBJECTS_PATH: &str = "/bbf/detect.objects";

const INTRO: &[u8] = b"HTTP/1.1 200 OK\r\nCache-Control: no-cache\r\nContent-Type: text/html\r\nContent-Length: 190\r\n\r\n<html><body><form enctype='multipart/form-data' method='post'><input name='size' value='24x24'><input name='model' value='face'><input type='file' name='source'><input type='submit'></form>\n";

/// Rough bytes per serialised detection, for the first allocation.
const CELL_HINT: usize = 21;

/// Handler context for the detection route.
pub struct DetectObjects {
    models: Models,
    decoder: Box<dyn ImageDecoder>,
}

impl DetectObjects {
    /// Builds the route context around the preloaded models.
    pub fn init(models: Models) -> Self {
        if models.face.is_none() {
            tracing::warn!("no face model loaded; detection requests will be rejected");
        }
        Self {
            models,
            decoder: Box::new(AnyImageDecoder),
        }
    }

    pub fn with_decoder(mut self, decoder: impl ImageDecoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    fn detect(&self, mut parsed: ParamParser) -> HandlerResult {
        parsed.terminate(&self.models);
        if let Some(err) = parsed.take_alloc_error() {
            return Err(err.into());
        }
        let (params, model, source) = parsed.into_parts();
        if source.is_empty() {
            return Err(HandlerError::MissingSource);
        }
        let image = self.decoder.decode(source.as_slice())?;
        drop(source);
        let model = model.ok_or(HandlerError::NoModel)?;
        let detections = model
            .detect(&image, &params)
            .ok_or(HandlerError::DetectionFailed)?;
        tracing::debug!(count = detections.len(), "detection finished");
        render(&detections)
    }
}

impl UriHandler for DetectObjects {
    type Parsed = ParamParser;

    fn parsed(&self) -> ParamParser {
        ParamParser::new(self.models.face.clone())
    }

    fn parse(&self, parsed: &mut ParamParser, event: ParseEvent<'_>) {
        parsed.execute(&self.models, event);
    }

    fn supports(&self, method: &Method) -> bool {
        *method == Method::POST
    }

    fn post(&self, parsed: ParamParser) -> HandlerResult {
        self.detect(parsed)
    }

    fn intro(&self) -> Option<Response> {
        Some(Response::fixed(INTRO))
    }
}

/// Serialises detections into a complete 200 response.
pub fn render(detections: &[Detection]) -> HandlerResult {
    if detections.is_empty() {
        return Ok(Response::fixed(HTTP_EMPTY_ARRAY));
    }
    let mut body = GrowBuf::with_capacity(detections.len() * CELL_HINT + 2)?;
    body.append(b"[")?;
    for (i, d) in detections.iter().enumerate() {
        if i > 0 {
            body.append(b",")?;
        }
        let cell = format!(
            "[{},{},{},{},{:.6}]",
            d.x, d.y, d.width, d.height, d.confidence
        );
        body.append(cell.as_bytes())?;
    }
    body.append(b"]\n")?;
    let header = header_block(StatusCode::Ok, CONTENT_TYPE_JSON, body.len());
    body.prepend(header.as_bytes())?;
    Ok(Response::from_buf(body))
}
