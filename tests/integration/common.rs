use std::path::Path;
use sumi_trawl::config::{parse_config, Config};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing sessions under `base_directory`
///
/// No request delay, a one-second timeout and no cleanup alongside batches.
pub fn test_config(base_directory: &Path) -> Config {
    let mut config = parse_config(
        r#"
[crawler]
request-delay-ms = 0
request-timeout-ms = 1000

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[session]
cleanup-on-start = false
"#,
    )
    .expect("test config is valid");

    config.session.base_directory = base_directory.to_path_buf();
    config
}

/// An HTML response
pub fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html")
}

/// Serves `body` as robots.txt
pub async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/plain"))
        .mount(server)
        .await;
}

/// Answers robots.txt with a 404, which allows everything
pub async fn mount_no_robots(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

/// A page too short for readability, with the given main content
pub fn short_page(title: &str, main: &str) -> String {
    format!(
        r#"<html><head><title>{}</title><meta name="description" content="A test page"></head>
<body><nav><a href="/home">Home</a></nav><main>{}</main><footer>Footer</footer></body></html>"#,
        title, main
    )
}

/// An article long enough for the readability tier
pub fn long_article() -> String {
    let paragraph = "<p>Rust is a systems programming language, focused on safety, speed, and concurrency. \
        It accomplishes these goals without a garbage collector, making it useful for embedding, \
        for low-level code, and for programs that need predictable performance, in many domains.</p>";
    format!(
        "<html><head><title>Why Rust</title></head><body>\
         <nav><a href=\"/\">Home</a></nav>\
         <article><h1>Why Rust</h1>{p}{p}{p}</article>\
         <footer>Copyright</footer></body></html>",
        p = paragraph
    )
}

/// A small PNG image
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::new_rgb8(width, height);
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    img.write_with_encoder(encoder).unwrap();
    buf
}
