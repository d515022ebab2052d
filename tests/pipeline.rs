//! End-to-end: layered configuration -> colors -> loaded shape images.

use std::io::Cursor;
use std::path::PathBuf;

use base64::prelude::*;
use image::{ImageFormat, Rgba, RgbaImage};
use particle_assets::{
    AssetError, ColorSpec, ImageManager, ImageMode, ParsedColor, RecolorParams, Rgb,
    ShapeDefinition, count_color_tokens, merge, recolor_svg_text, resolve_color,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::{Value, json};

const STAR_SVG: &str = concat!(
    r#"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="10">"#,
    r##"<path d="M0 0 L20 0 L10 10 Z" fill="#FFF" stroke="rgb(0,0,0)"/></svg>"##,
);

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn defaults() -> Value {
    json!({
        "particles": {
            "number": { "value": 80, "density": { "enable": true, "value_area": 800 } },
            "color": { "value": "#ffffff" },
            "shape": {
                "type": "circle",
                "stroke": { "width": 0, "color": "#000000" },
                "polygon": { "nb_sides": 5 },
                "image": { "src": "", "width": 100, "height": 100 },
                "images": []
            },
            "opacity": { "value": 0.5, "random": false }
        },
        "retina_detect": false,
        "fps_limit": 60
    })
}

/// Writes a PNG to a per-test temp file and returns its path.
fn temp_png(name: &str, width: u32, height: u32) -> PathBuf {
    let file = format!("particle-assets-{}-{name}.png", std::process::id());
    let path = std::env::temp_dir().join(file);
    let mut bytes = Vec::new();
    RgbaImage::from_pixel(width, height, Rgba([1, 2, 3, 255]))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    std::fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn user_layers_override_defaults() {
    let defaults = defaults();
    let config = merge(
        defaults.clone(),
        &[
            json!({"particles": {"color": {"value": ["#ff0000", "#00ff00"]}}}),
            Value::Null,
            json!({"particles": {"number": {"value": 20}}, "fps_limit": 30}),
        ],
    );

    assert_eq!(config["particles"]["number"]["value"], 20);
    assert_eq!(config["particles"]["number"]["density"]["value_area"], 800);
    assert_eq!(config["fps_limit"], 30);
    assert_eq!(defaults["fps_limit"], 60);

    let value: ColorSpec =
        serde_json::from_value(config["particles"]["color"]["value"].clone()).unwrap();
    let color = resolve_color(&value, &mut StdRng::seed_from_u64(1));
    let rgb = color.rgb().unwrap();
    assert!(rgb == Rgb::new(255, 0, 0) || rgb == Rgb::new(0, 255, 0));
}

#[tokio::test]
async fn image_shape_from_merged_config() {
    init_tracing();
    let png = temp_png("single", 6, 3);

    let config = merge(
        defaults(),
        &[json!({"particles": {"shape": {
            "type": "image",
            "image": { "src": png.to_string_lossy(), "width": 6, "height": 3 }
        }}})],
    );
    let shape = ShapeDefinition::from_config(&config).unwrap();

    let mut manager = ImageManager::default();
    let resolved = manager.resolve_shape(shape).await.unwrap();
    let image = resolved.image.unwrap();

    assert_eq!(image.kind, "png");
    assert_eq!(image.ratio, 2.0);
    assert_eq!(image.raster().unwrap().dimensions(), (6, 3));
    assert_eq!(manager.mode(), ImageMode::Single);
    assert_eq!(manager.image_at(0).unwrap_err(), AssetError::NotMultiple);

    std::fs::remove_file(png).unwrap();
}

#[tokio::test]
async fn image_set_mixing_svg_and_raster() {
    init_tracing();
    let png = temp_png("set", 2, 2);
    let svg_uri = format!("data:image/svg+xml;base64,{}", BASE64_STANDARD.encode(STAR_SVG));

    let config = merge(
        defaults(),
        &[json!({"particles": {"shape": {
            "type": "images",
            "images": [
                { "src": svg_uri, "width": 20, "height": 10 },
                { "src": format!("file://{}", png.to_string_lossy()), "width": 0, "height": 0 }
            ]
        }}})],
    );
    let shape = ShapeDefinition::from_config(&config).unwrap();

    let mut manager = ImageManager::default();
    let resolved = manager.resolve_shape(shape).await.unwrap();
    assert_eq!(resolved.images.len(), 2);

    let svg = manager.image_at(0).unwrap();
    assert_eq!(svg.svg_data(), Some(STAR_SVG));
    assert_eq!(svg.ratio, 2.0);

    let raster = manager.image_at(3).unwrap();
    assert!(raster.raster().is_some());
    assert_eq!(raster.ratio, 1.0);
    assert_eq!(manager.image(), None);

    // Per-particle tint of the SVG
    let color = resolve_color(&ColorSpec::hex("#0000ff"), &mut StdRng::seed_from_u64(0));
    let params = RecolorParams::new(color, 0.75);
    let recolored = recolor_svg_text(STAR_SVG, &params);
    assert_eq!(
        recolored.matches("rgba( 0, 0, 255, 0.75 )").count(),
        count_color_tokens(STAR_SVG)
    );

    let tinted = manager.recolor(svg.svg_data().unwrap(), &params).await.unwrap();
    assert_eq!((tinted.width(), tinted.height()), (20, 10));

    std::fs::remove_file(png).unwrap();
}

#[tokio::test]
async fn missing_file_fails_resolution() {
    init_tracing();
    let config = merge(
        defaults(),
        &[json!({"particles": {"shape": {
            "type": ["image"],
            "image": { "src": "/no/such/particle.png", "width": 1, "height": 1 }
        }}})],
    );
    let shape = ShapeDefinition::from_config(&config).unwrap();

    let mut manager = ImageManager::default();
    let err = manager.resolve_shape(shape).await.unwrap_err();
    assert_eq!(
        err,
        AssetError::Status {
            src: "/no/such/particle.png".into(),
            status: 404
        }
    );
    assert_eq!(manager.image(), None);
}

#[tokio::test]
async fn default_shape_needs_no_images() {
    let shape = ShapeDefinition::from_config(&defaults()).unwrap();
    let mut manager = ImageManager::default();
    let resolved = manager.resolve_shape(shape.clone()).await.unwrap();
    assert_eq!(resolved.shape, shape);
    assert!(resolved.image.is_none() && resolved.images.is_empty());

    assert!(ParsedColor::default().is_empty());
}

#[cfg(feature = "http")]
mod remote {
    use super::*;
    use particle_assets::{HttpFetcher, ImageDefinition};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves `body` with `status` to a single request and returns the URL.
    async fn serve_once(status: &str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let reply = format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            socket.write_all(reply.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/star.svg")
    }

    fn manager() -> ImageManager<HttpFetcher> {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        ImageManager::new(HttpFetcher::new(client))
    }

    #[test]
    fn default_manager_reaches_the_network() {
        let _: ImageManager<HttpFetcher> = ImageManager::default();
    }

    #[tokio::test]
    async fn remote_svg_is_fetched_over_http() {
        init_tracing();
        let src = serve_once("200 OK", STAR_SVG).await;
        let config = merge(
            defaults(),
            &[json!({"particles": {"shape": {
                "type": "image",
                "image": { "src": src, "width": 20, "height": 10 }
            }}})],
        );
        let shape = ShapeDefinition::from_config(&config).unwrap();

        let mut manager = manager();
        let resolved = manager.resolve_shape(shape).await.unwrap();
        let image = resolved.image.unwrap();
        assert!(image.is_svg());
        assert_eq!(image.svg_data(), Some(STAR_SVG));
    }

    #[tokio::test]
    async fn remote_not_found_fails_the_load() {
        let src = serve_once("404 Not Found", "").await;
        let shape = ShapeDefinition::single_image(ImageDefinition::new(src.clone(), 1.0, 1.0));

        let mut manager = manager();
        assert_eq!(
            manager.resolve_shape(shape).await.unwrap_err(),
            AssetError::Status { src, status: 404 }
        );
        assert_eq!(manager.image(), None);
    }
}
