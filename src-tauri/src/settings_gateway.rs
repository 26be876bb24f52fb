//! Typed client for the backend's HTTP surface.

use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::{
    device_discovery::{DeviceSnapshot, SettingsSource},
    readiness::BackendProbe,
    DeckError, DeckResult, HTTP_REQUEST_TIMEOUT,
};

const SETTINGS_PATH: &str = "api/settings";
const KEYMAP_PATH: &str = "api/keymap";
const BUTTON_NAMES_PATH: &str = "config";

pub const BUTTON_IDS: [&str; 6] = ["1", "2", "3", "4", "5", "6"];

/// Button index ("1".."6") to a key identifier or a display name.
pub type ButtonMap = BTreeMap<String, String>;

/// Keeps only the six buttons the backend understands.
pub fn normalize_button_map(map: &ButtonMap) -> ButtonMap {
    map.iter()
        .filter(|(button, _)| BUTTON_IDS.contains(&button.as_str()))
        .map(|(button, value)| (button.clone(), value.clone()))
        .collect()
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
}

impl BackendClient {
    pub fn new(base_url: Url) -> DeckResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()
            .map_err(|error| DeckError::Config(format!("failed to build http client: {error}")))?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> DeckResult<Url> {
        self.base_url
            .join(path)
            .map_err(|error| DeckError::Config(format!("invalid endpoint {path}: {error}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> DeckResult<T> {
        let response = self.http.get(self.endpoint(path)?).send().await?;
        decode_response(response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> DeckResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.endpoint(path)?)
            .json(body)
            .send()
            .await?;
        decode_response(response).await
    }

    pub async fn get_settings(&self) -> DeckResult<DeviceSnapshot> {
        self.get_json(SETTINGS_PATH).await
    }

    pub async fn save_settings(&self, settings: &DeviceSnapshot) -> DeckResult<()> {
        let _: serde_json::Value = self.post_json(SETTINGS_PATH, settings).await?;
        Ok(())
    }

    pub async fn get_keymap(&self) -> DeckResult<ButtonMap> {
        self.get_json(KEYMAP_PATH).await
    }

    pub async fn save_keymap(&self, keymap: &ButtonMap) -> DeckResult<ButtonMap> {
        self.post_json(KEYMAP_PATH, &normalize_button_map(keymap)).await
    }

    pub async fn save_button_names(&self, names: &ButtonMap) -> DeckResult<ButtonMap> {
        self.post_json(BUTTON_NAMES_PATH, &normalize_button_map(names)).await
    }
}

async fn decode_response<T: DeserializeOwned>(response: reqwest::Response) -> DeckResult<T> {
    let status = response.status();
    let url = response.url().clone();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(DeckError::Probe(format!("{url} answered {status}: {body}")));
    }
    serde_json::from_str(&body).map_err(DeckError::from)
}

impl BackendProbe for BackendClient {
    async fn probe(&self, url: &Url) -> DeckResult<()> {
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DeckError::Probe(format!("{url} answered {status}")))
        }
    }
}

impl SettingsSource for BackendClient {
    async fn fetch_settings(&self) -> DeckResult<DeviceSnapshot> {
        self.get_settings().await
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{BufRead, BufReader, Read, Write},
        net::TcpListener,
        sync::mpsc,
        thread,
    };

    use super::*;

    struct Captured {
        request_line: String,
        body: String,
    }

    /// Answers exactly one request on a loopback port.
    fn serve_once(status: &'static str, body: &'static str) -> (Url, mpsc::Receiver<Captured>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let port = listener.local_addr().expect("local addr").port();
        let (sender, receiver) = mpsc::channel();

        thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));

            let mut request_line = String::new();
            reader.read_line(&mut request_line).expect("read request line");
            let mut content_length = 0;
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).expect("read header");
                let header = header.trim_end();
                if header.is_empty() {
                    break;
                }
                if let Some((name, value)) = header.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().expect("content length");
                    }
                }
            }
            let mut request_body = vec![0; content_length];
            reader.read_exact(&mut request_body).expect("read body");

            let mut stream = stream;
            write!(
                stream,
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .expect("write response");
            let _ = sender.send(Captured {
                request_line: request_line.trim_end().to_string(),
                body: String::from_utf8_lossy(&request_body).to_string(),
            });
        });

        let base = Url::parse(&format!("http://127.0.0.1:{port}/")).expect("base url");
        (base, receiver)
    }

    const DEFAULT_SETTINGS: &str = r#"{"timeout":900,"background":"0a1e46","active":"b4dcfa","colors":["4682b4","6495ed","48d1cc","5f9ea0","ff6347","8a2be2"],"layout":0,"info_timeout":120,"info_enabled":true}"#;

    #[tokio::test]
    async fn get_settings_decodes_snapshot() {
        let (base, requests) = serve_once("200 OK", DEFAULT_SETTINGS);
        let client = BackendClient::new(base).expect("client");

        let snapshot = client.fetch_settings().await.expect("settings");

        assert!(snapshot.is_factory_default());
        assert_eq!(snapshot.info_enabled, Some(true));
        let captured = requests.recv().expect("captured request");
        assert_eq!(captured.request_line, "GET /api/settings HTTP/1.1");
    }

    #[tokio::test]
    async fn malformed_settings_body_is_reported_as_malformed() {
        let (base, _requests) = serve_once("200 OK", "<html>starting</html>");
        let client = BackendClient::new(base).expect("client");

        let result = client.get_settings().await;

        assert!(matches!(result, Err(DeckError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn probe_rejects_non_success_status() {
        let (base, _requests) = serve_once("503 Service Unavailable", "{}");
        let client = BackendClient::new(base.clone()).expect("client");

        let result = client.probe(&base).await;

        assert!(matches!(result, Err(DeckError::Probe(_))));
    }

    #[tokio::test]
    async fn probe_accepts_success_status() {
        let (base, requests) = serve_once("200 OK", "{}");
        let client = BackendClient::new(base.clone()).expect("client");

        client.probe(&base).await.expect("probe ok");

        assert_eq!(requests.recv().expect("request").request_line, "GET / HTTP/1.1");
    }

    #[tokio::test]
    async fn probe_reports_refused_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);
        let base = Url::parse(&format!("http://127.0.0.1:{port}/")).expect("url");
        let client = BackendClient::new(base.clone()).expect("client");

        assert!(matches!(client.probe(&base).await, Err(DeckError::Probe(_))));
    }

    #[tokio::test]
    async fn save_settings_posts_snapshot_json() {
        let (base, requests) = serve_once("200 OK", r#"{"status":"ok"}"#);
        let client = BackendClient::new(base).expect("client");
        let settings = DeviceSnapshot {
            timeout: 60,
            ..DeviceSnapshot::factory_default()
        };

        client.save_settings(&settings).await.expect("save settings");

        let captured = requests.recv().expect("request");
        assert_eq!(captured.request_line, "POST /api/settings HTTP/1.1");
        let posted: DeviceSnapshot = serde_json::from_str(&captured.body).expect("posted json");
        assert_eq!(posted, settings);
    }

    #[tokio::test]
    async fn save_keymap_drops_unknown_buttons() {
        let (base, requests) = serve_once("200 OK", r#"{"1":"f13","2":"f14"}"#);
        let client = BackendClient::new(base).expect("client");
        let keymap: ButtonMap = [("1", "f13"), ("2", "f14"), ("9", "f20")]
            .into_iter()
            .map(|(button, key)| (button.to_string(), key.to_string()))
            .collect();

        let saved = client.save_keymap(&keymap).await.expect("save keymap");

        assert_eq!(saved.get("1").map(String::as_str), Some("f13"));
        let captured = requests.recv().expect("request");
        assert_eq!(captured.request_line, "POST /api/keymap HTTP/1.1");
        let posted: ButtonMap = serde_json::from_str(&captured.body).expect("posted json");
        assert_eq!(posted.len(), 2);
        assert!(!posted.contains_key("9"));
    }

    #[tokio::test]
    async fn button_names_go_to_config_endpoint() {
        let (base, requests) = serve_once("200 OK", r#"{"1":"Mute"}"#);
        let client = BackendClient::new(base).expect("client");
        let names: ButtonMap = [("1".to_string(), "Mute".to_string())].into_iter().collect();

        let saved = client.save_button_names(&names).await.expect("save names");

        assert_eq!(saved, names);
        assert_eq!(
            requests.recv().expect("request").request_line,
            "POST /config HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn get_keymap_reads_button_map() {
        let (base, _requests) = serve_once("200 OK", r#"{"1":"a","6":"ctrl+c"}"#);
        let client = BackendClient::new(base).expect("client");

        let keymap = client.get_keymap().await.expect("keymap");

        assert_eq!(keymap.get("6").map(String::as_str), Some("ctrl+c"));
    }
}
