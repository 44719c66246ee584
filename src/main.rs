use std::env;
use std::path::Path;
use std::sync::Arc;

use log::info;

use emoji_grid::{routes, Server};

const DEFAULT_PORT: u16 = 1999;
const TLS_CERT_PATH: &str = "ssl/certificate.pem";
const TLS_KEY_PATH: &str = "ssl/private.key";

#[tokio::main]
async fn main() {
    env_logger::init();

    let port = env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let server = Arc::new(Server::new());
    let routes = routes(server);

    if Path::new(TLS_CERT_PATH).exists() && Path::new(TLS_KEY_PATH).exists() {
        info!("starting secure server (HTTPS/WSS) on port {port}");
        warp::serve(routes)
            .tls()
            .cert_path(TLS_CERT_PATH)
            .key_path(TLS_KEY_PATH)
            .run(([0, 0, 0, 0], port))
            .await;
    } else {
        info!("no TLS certificate found, serving HTTP/WS on port {port}");
        warp::serve(routes).run(([0, 0, 0, 0], port)).await;
    }
}
