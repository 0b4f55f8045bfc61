mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::{field, file, fixed_detector, get, png_1x1, post_multipart};
use detectserve::bbf::{
    DetectObjects, DetectParams, Detection, ImageDecoder, Models, ObjectDetector, DETECT_OBJECTS_PATH,
};
use detectserve::config::ServerConfig;
use detectserve::http::connection::Connection;
use detectserve::http::request::Method;
use detectserve::http::response::{
    Response, StatusCode, CONTENT_TYPE_JSON, HTTP_BAD_REQUEST, HTTP_EMPTY_ARRAY,
    HTTP_INTERNAL_ERROR, HTTP_NOT_FOUND,
};
use detectserve::http::writer::header_block;
use detectserve::server;
use detectserve::uri::{HandlerResult, ParseEvent, Registry, UriHandler};
use image::{GrayImage, ImageError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

async fn exchange_with(registry: Registry, cfg: ServerConfig, request: &[u8]) -> Vec<u8> {
    let (mut client, server_end) = tokio::io::duplex(64 * 1024);
    let registry = Arc::new(registry);
    let server = tokio::spawn(async move {
        let mut conn = Connection::new(server_end, registry, &cfg);
        conn.run().await
    });

    client.write_all(request).await.unwrap();
    let mut response = Vec::new();
    client.read_to_end(&mut response).await.unwrap();
    server.await.unwrap().unwrap();
    response
}

async fn exchange(registry: Registry, request: &[u8]) -> Vec<u8> {
    exchange_with(registry, ServerConfig::default(), request).await
}

fn detect_routes(detections: Vec<Detection>) -> Registry {
    server::routes(Models {
        face: Some(fixed_detector(detections)),
    })
}

fn json(body: &str) -> Vec<u8> {
    let mut out = header_block(StatusCode::Ok, CONTENT_TYPE_JSON, body.len()).into_bytes();
    out.extend_from_slice(body.as_bytes());
    out
}

#[tokio::test]
async fn test_unregistered_path_is_404() {
    let response = exchange(detect_routes(vec![]), &get("/nope")).await;

    assert_eq!(response, HTTP_NOT_FOUND);
    assert!(String::from_utf8_lossy(&response).contains("Content-Length: 6\r\n"));
}

#[tokio::test]
async fn test_unsupported_method_is_404() {
    let request = format!("PUT {DETECT_OBJECTS_PATH} HTTP/1.1\r\nContent-Length: 0\r\n\r\n");
    let response = exchange(detect_routes(vec![]), request.as_bytes()).await;

    assert_eq!(response, HTTP_NOT_FOUND);
}

#[tokio::test]
async fn test_get_serves_intro_page() {
    let response = exchange(detect_routes(vec![]), &get(DETECT_OBJECTS_PATH)).await;
    let text = String::from_utf8(response).unwrap();

    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.contains("Content-Type: text/html\r\n"));
    assert!(text.contains("enctype='multipart/form-data'"));
}

#[tokio::test]
async fn test_no_detections_is_empty_array() {
    let png = png_1x1();
    let request = post_multipart(
        DETECT_OBJECTS_PATH,
        &[field("size", b"24x24"), file("source", "one.png", &png)],
    );
    let response = exchange(detect_routes(vec![]), &request).await;

    assert_eq!(response, HTTP_EMPTY_ARRAY);
}

#[tokio::test]
async fn test_detections_are_serialised() {
    let png = png_1x1();
    let request = post_multipart(DETECT_OBJECTS_PATH, &[file("source", "one.png", &png)]);
    let hit = Detection {
        x: 1,
        y: 2,
        width: 3,
        height: 4,
        confidence: 0.5,
    };
    let response = exchange(detect_routes(vec![hit]), &request).await;

    assert_eq!(response, json("[[1,2,3,4,0.500000]]\n"));
}

#[tokio::test]
async fn test_several_detections_are_comma_separated() {
    let png = png_1x1();
    let request = post_multipart(DETECT_OBJECTS_PATH, &[file("source", "one.png", &png)]);
    let hits = vec![
        Detection { x: 0, y: 0, width: 24, height: 24, confidence: 1.25 },
        Detection { x: -3, y: 7, width: 30, height: 30, confidence: 0.0 },
    ];
    let response = exchange(detect_routes(hits), &request).await;

    assert_eq!(
        response,
        json("[[0,0,24,24,1.250000],[-3,7,30,30,0.000000]]\n")
    );
}

#[tokio::test]
async fn test_small_reads_give_same_response() {
    let png = png_1x1();
    let request = post_multipart(
        DETECT_OBJECTS_PATH,
        &[field("interval", b"3"), file("source", "one.png", &png), field("accurate", b"0")],
    );
    let hit = Detection { x: 5, y: 6, width: 7, height: 8, confidence: 2.0 };
    let cfg = ServerConfig {
        read_buffer_size: 7,
        ..ServerConfig::default()
    };

    let response = exchange_with(detect_routes(vec![hit]), cfg, &request).await;

    assert_eq!(response, json("[[5,6,7,8,2.000000]]\n"));
}

#[tokio::test]
async fn test_missing_source_is_400() {
    let request = post_multipart(DETECT_OBJECTS_PATH, &[field("size", b"24x24")]);
    let response = exchange(detect_routes(vec![]), &request).await;

    assert_eq!(response, HTTP_BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_source_is_400() {
    let request = post_multipart(
        DETECT_OBJECTS_PATH,
        &[field("size", b"24x24"), file("source", "e.png", b"")],
    );
    let response = exchange(detect_routes(vec![]), &request).await;

    assert_eq!(response, HTTP_BAD_REQUEST);
}

#[tokio::test]
async fn test_last_source_part_is_detected() {
    let png = png_1x1();
    let request = post_multipart(
        DETECT_OBJECTS_PATH,
        &[file("source", "junk.bin", b"garbage"), file("source", "one.png", &png)],
    );
    let response = exchange(detect_routes(vec![]), &request).await;

    assert_eq!(response, HTTP_EMPTY_ARRAY);
}

#[tokio::test]
async fn test_undecodable_source_is_400() {
    let request = post_multipart(DETECT_OBJECTS_PATH, &[file("source", "x.png", b"not an image")]);
    let response = exchange(detect_routes(vec![]), &request).await;

    assert_eq!(response, HTTP_BAD_REQUEST);
}

#[tokio::test]
async fn test_face_model_absent_is_400() {
    let png = png_1x1();
    let request = post_multipart(
        DETECT_OBJECTS_PATH,
        &[field("model", b"face"), file("source", "one.png", &png)],
    );
    let response = exchange(server::routes(Models::default()), &request).await;

    assert_eq!(response, HTTP_BAD_REQUEST);
}

#[tokio::test]
async fn test_overflowing_model_keeps_default() {
    let png = png_1x1();
    let request = post_multipart(
        DETECT_OBJECTS_PATH,
        &[
            field("model", b"a-model-name-well-past-sixteen-bytes"),
            file("source", "one.png", &png),
        ],
    );
    let response = exchange(detect_routes(vec![]), &request).await;

    assert_eq!(response, HTTP_EMPTY_ARRAY);
}

#[tokio::test]
async fn test_malformed_request_is_400() {
    let response = exchange(detect_routes(vec![]), b"BREW /pot HTTP/1.1\r\n\r\n").await;

    assert_eq!(response, HTTP_BAD_REQUEST);
}

#[tokio::test]
async fn test_client_gone_before_complete_writes_nothing() {
    let (mut client, server_end) = tokio::io::duplex(1024);
    let registry = Arc::new(detect_routes(vec![]));
    let server = tokio::spawn(async move {
        let mut conn = Connection::new(server_end, registry, &ServerConfig::default());
        conn.run().await
    });

    client.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();
    client.shutdown().await.unwrap();
    let mut response = Vec::new();
    client.read_to_end(&mut response).await.unwrap();

    assert!(response.is_empty());
    server.await.unwrap().unwrap();
}

/// Answers every POST with a heap-built body and counts releases.
struct Releasing {
    released: Arc<AtomicUsize>,
}

impl UriHandler for Releasing {
    type Parsed = ();

    fn parsed(&self) {}

    fn parse(&self, _parsed: &mut (), _event: ParseEvent<'_>) {}

    fn supports(&self, method: &Method) -> bool {
        *method == Method::POST
    }

    fn post(&self, _parsed: ()) -> HandlerResult {
        let body = "[]\n";
        let mut data = header_block(StatusCode::Ok, CONTENT_TYPE_JSON, body.len()).into_bytes();
        data.extend_from_slice(body.as_bytes());
        let released = Arc::clone(&self.released);
        Ok(Response::owned(
            data,
            Box::new(move |_| {
                released.fetch_add(1, Ordering::SeqCst);
            }),
        ))
    }
}

#[tokio::test]
async fn test_release_hook_runs_once_after_write() {
    let released = Arc::new(AtomicUsize::new(0));
    let registry = Registry::builder()
        .route(
            "/r",
            Releasing {
                released: Arc::clone(&released),
            },
        )
        .build();

    let response = exchange(registry, &post_multipart("/r", &[field("a", b"1")])).await;

    assert_eq!(response, HTTP_EMPTY_ARRAY);
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

struct Panicking;

impl UriHandler for Panicking {
    type Parsed = ();

    fn parsed(&self) {}

    fn parse(&self, _parsed: &mut (), _event: ParseEvent<'_>) {}

    fn supports(&self, method: &Method) -> bool {
        *method == Method::POST
    }

    fn post(&self, _parsed: ()) -> HandlerResult {
        panic!("handler blew up");
    }
}

#[tokio::test]
async fn test_panicking_handler_is_500() {
    let registry = Registry::builder().route("/boom", Panicking).build();

    let response = exchange(registry, &post_multipart("/boom", &[])).await;

    assert_eq!(response, HTTP_INTERNAL_ERROR);
}

/// Replies with one letter per kind of event seen, in order.
struct Echo;

impl Echo {
    fn reply(trace: String) -> HandlerResult {
        let mut data = header_block(StatusCode::Ok, CONTENT_TYPE_JSON, trace.len()).into_bytes();
        data.extend_from_slice(trace.as_bytes());
        Ok(Response::owned(data, Box::new(|_| {})))
    }
}

impl UriHandler for Echo {
    type Parsed = String;

    fn parsed(&self) -> String {
        String::new()
    }

    fn parse(&self, trace: &mut String, event: ParseEvent<'_>) {
        let letter = match event {
            ParseEvent::QueryString(_) => 'Q',
            ParseEvent::MultipartHeaderField(..) => 'F',
            ParseEvent::MultipartHeaderValue(..) => 'V',
            ParseEvent::MultipartData(_) => 'D',
            ParseEvent::Terminate => 'T',
        };
        if !trace.ends_with(letter) {
            trace.push(letter);
        }
    }

    fn supports(&self, method: &Method) -> bool {
        *method == Method::GET
    }

    fn get(&self, trace: String) -> HandlerResult {
        Self::reply(trace)
    }
}

fn body_of(response: &[u8]) -> String {
    let text = String::from_utf8_lossy(response);
    let (_, body) = text.split_once("\r\n\r\n").unwrap();
    body.to_string()
}

#[tokio::test]
async fn test_get_with_query_sees_query_then_terminate() {
    let registry = Registry::builder().route("/echo", Echo).build();

    let response = exchange(registry, &get("/echo?x=1")).await;

    assert_eq!(body_of(&response), "QT");
}

#[tokio::test]
async fn test_post_falls_back_to_get_with_part_events() {
    let registry = Registry::builder().route("/echo", Echo).build();
    let request = post_multipart("/echo", &[field("a", b"1"), field("b", b"2")]);

    let response = exchange_with(
        registry,
        ServerConfig {
            read_buffer_size: 3,
            ..ServerConfig::default()
        },
        &request,
    )
    .await;

    assert_eq!(body_of(&response), "FVDFVDT");
}

#[tokio::test]
async fn test_file_part_reports_each_header() {
    let registry = Registry::builder().route("/echo", Echo).build();
    let request = post_multipart("/echo", &[file("source", "a.bin", b"xyz")]);

    let response = exchange(registry, &request).await;

    assert_eq!(body_of(&response), "FVFVDT");
}

/// Treats the upload's length as the width of a one-row image.
struct LengthDecoder;

impl ImageDecoder for LengthDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<GrayImage, ImageError> {
        Ok(GrayImage::new(bytes.len() as u32, 1))
    }
}

/// Reports one region the size of the image, scored by `interval`.
struct WholeImage;

impl ObjectDetector for WholeImage {
    fn detect(&self, image: &GrayImage, params: &DetectParams) -> Option<Vec<Detection>> {
        Some(vec![Detection {
            x: 0,
            y: 0,
            width: image.width() as i32,
            height: image.height() as i32,
            confidence: params.interval as f32,
        }])
    }
}

#[tokio::test]
async fn test_custom_decoder_feeds_detector() {
    let models = Models {
        face: Some(Arc::new(WholeImage)),
    };
    let registry = Registry::builder()
        .route(
            DETECT_OBJECTS_PATH,
            DetectObjects::init(models).with_decoder(LengthDecoder),
        )
        .build();
    let request = post_multipart(
        DETECT_OBJECTS_PATH,
        &[field("interval", b"2.5"), file("source", "raw.bin", b"abcde")],
    );

    let response = exchange(registry, &request).await;

    assert_eq!(response, json("[[0,0,5,1,3.000000]]\n"));
}
