//! Per-request parameter parsing for the detection route.
//!
//! Multipart events drive a small state machine. The part name is collected
//! from the part headers; the first data chunk picks the field and its
//! parser; later chunks go to that parser; the next part header, or the end
//! of the request, commits the value into [`DetectParams`].

use std::collections::TryReserveError;
use std::sync::Arc;

use crate::bbf::detect::{DetectParams, ObjectDetector, Size};
use crate::buffer::GrowBuf;
use crate::form::{BoolParser, CoordParser, FormDataParser, NumericParser, StringParser};
use crate::uri::ParseEvent;

/// Longest part name kept; longer names are truncated.
pub const NAME_CAPACITY: usize = 15;

/// Models a route can hand out by name.
#[derive(Clone, Default)]
pub struct Models {
    pub face: Option<Arc<dyn ObjectDetector>>,
}

impl Models {
    pub fn lookup(&self, name: &[u8]) -> Option<Arc<dyn ObjectDetector>> {
        match name {
            b"face" => self.face.clone(),
            _ => None,
        }
    }
}

/// Field currently being read, with its parser.
#[derive(Debug)]
enum Field {
    Start,
    Skip,
    Interval(NumericParser),
    MinNeighbors(NumericParser),
    Accurate(BoolParser),
    Size(CoordParser),
    Model(StringParser),
    Source,
}

impl Field {
    fn for_name(name: &[u8]) -> Self {
        match name {
            b"interval" => Field::Interval(NumericParser::new()),
            b"min_neighbors" => Field::MinNeighbors(NumericParser::new()),
            b"accurate" => Field::Accurate(BoolParser::new()),
            b"size" => Field::Size(CoordParser::new()),
            b"model" => Field::Model(StringParser::new()),
            b"source" => Field::Source,
            _ => Field::Skip,
        }
    }
}

pub struct ParamParser {
    field: Field,
    form_data: FormDataParser,
    name: [u8; NAME_CAPACITY],
    cursor: usize,
    params: DetectParams,
    model: Option<Arc<dyn ObjectDetector>>,
    source: GrowBuf,
    alloc_error: Option<TryReserveError>,
}

impl ParamParser {
    /// Starts with default parameters and `default_model` selected.
    pub fn new(default_model: Option<Arc<dyn ObjectDetector>>) -> Self {
        Self {
            field: Field::Start,
            form_data: FormDataParser::new(),
            name: [0; NAME_CAPACITY],
            cursor: 0,
            params: DetectParams::default(),
            model: default_model,
            source: GrowBuf::new(),
            alloc_error: None,
        }
    }

    pub fn params(&self) -> &DetectParams {
        &self.params
    }

    pub fn model(&self) -> Option<&Arc<dyn ObjectDetector>> {
        self.model.as_ref()
    }

    pub fn source(&self) -> &[u8] {
        self.source.as_slice()
    }

    /// True when no field is open.
    pub fn is_idle(&self) -> bool {
        matches!(self.field, Field::Start)
    }

    /// The part name collected so far.
    pub fn name(&self) -> &[u8] {
        &self.name[..self.cursor]
    }

    pub fn take_alloc_error(&mut self) -> Option<TryReserveError> {
        self.alloc_error.take()
    }

    pub fn into_parts(self) -> (DetectParams, Option<Arc<dyn ObjectDetector>>, GrowBuf) {
        (self.params, self.model, self.source)
    }

    pub fn execute(&mut self, models: &Models, event: ParseEvent<'_>) {
        match event {
            ParseEvent::QueryString(_) => {}
            ParseEvent::Terminate => self.terminate(models),
            ParseEvent::MultipartHeaderField(chunk, index) => {
                self.terminate(models);
                if index == 0 {
                    self.clear_name();
                }
                self.form_data.header_field(chunk, index);
            }
            ParseEvent::MultipartHeaderValue(chunk, index) => {
                self.terminate(models);
                if let Some(piece) = self.form_data.header_value(chunk, index) {
                    self.push_name(piece);
                }
            }
            ParseEvent::MultipartData(chunk) => self.data(chunk),
        }
    }

    fn push_name(&mut self, piece: &[u8]) {
        let take = piece.len().min(NAME_CAPACITY - self.cursor);
        self.name[self.cursor..self.cursor + take].copy_from_slice(&piece[..take]);
        self.cursor += take;
    }

    fn clear_name(&mut self) {
        self.name = [0; NAME_CAPACITY];
        self.cursor = 0;
    }

    fn data(&mut self, chunk: &[u8]) {
        if let Field::Start = self.field {
            self.field = Field::for_name(self.name());
            if let Field::Source = self.field {
                // a repeated source replaces the earlier payload
                self.source = GrowBuf::new();
                self.alloc_error = None;
            }
        }
        match &mut self.field {
            Field::Start | Field::Skip => {}
            Field::Interval(parser) | Field::MinNeighbors(parser) => parser.execute(chunk),
            Field::Accurate(parser) => parser.execute(chunk),
            Field::Size(parser) => parser.execute(chunk),
            Field::Model(parser) => {
                parser.execute(chunk);
                if parser.is_overflow() {
                    self.field = Field::Skip;
                }
            }
            Field::Source => {
                if let Err(err) = self.source.append(chunk) {
                    tracing::warn!(error = %err, "source buffer allocation failed");
                    self.alloc_error = Some(err);
                    self.field = Field::Skip;
                }
            }
        }
    }

    /// Commits the open field and returns to `Start`. No-op when idle.
    pub fn terminate(&mut self, models: &Models) {
        match std::mem::replace(&mut self.field, Field::Start) {
            Field::Start => return,
            Field::Interval(parser) => self.params.interval = parser.rounded(),
            Field::MinNeighbors(parser) => self.params.min_neighbors = parser.rounded(),
            Field::Accurate(parser) => self.params.accurate = parser.result(),
            Field::Size(parser) => {
                let (width, height) = parser.rounded();
                self.params.size = Size { width, height };
            }
            Field::Model(parser) => {
                self.model = parser.result().and_then(|name| models.lookup(name));
            }
            Field::Skip | Field::Source => {}
        }
        self.clear_name();
    }
}
