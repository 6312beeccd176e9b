use std::{
    fs, io,
    path::PathBuf,
    sync::atomic::{AtomicU64, Ordering},
};

use anyhow::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{debug, info};
use reqwest::{blocking::Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{
    config::RpcConfig,
    form::AddSource,
    model::{Torrent, TorrentListPage, TorrentProperties, TorrentSettings},
};

/// JSON-RPC error code the daemon uses when a list page lies past the end of
/// the collection.
pub const PAGE_OUT_OF_RANGE: i64 = -2;

#[derive(Debug, Error)]
pub enum PorlaError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("authentication failed")]
    Authentication,
    #[error("unexpected http status {0}")]
    HttpStatus(StatusCode),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("response parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("cannot read torrent file {}: {source}", path.display())]
    TorrentFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PorlaError {
    pub fn is_page_out_of_range(&self) -> bool {
        matches!(self, PorlaError::Rpc { code, .. } if *code == PAGE_OUT_OF_RANGE)
    }
}

pub type RpcResult<T> = std::result::Result<T, PorlaError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseAction {
    Paused,
    Resumed,
}

/// The daemon operations the view controller needs. Every call is a single
/// blocking round trip.
pub trait TorrentService {
    fn list(&self, page: usize, page_size: usize) -> RpcResult<TorrentListPage>;

    fn add(&self, source: &str, save_path: &str, mode: AddSource) -> RpcResult<()>;

    fn remove(&self, torrent: &Torrent, keep_data: bool) -> RpcResult<()>;

    fn move_storage(&self, torrent: &Torrent, path: &str) -> RpcResult<()>;

    /// Resumes a paused torrent and pauses any other, judged by the last
    /// polled flags.
    fn pause_or_resume(&self, torrent: &Torrent) -> RpcResult<PauseAction>;

    fn properties(&self, torrent: &Torrent) -> RpcResult<TorrentProperties>;

    fn set_properties(&self, torrent: &Torrent, settings: &TorrentSettings) -> RpcResult<()>;
}

pub struct PorlaClient {
    http: Client,
    endpoint: String,
    secret_key: Option<String>,
    counter: AtomicU64,
}

impl PorlaClient {
    pub fn new(config: RpcConfig) -> Result<Self> {
        let RpcConfig {
            url,
            secret_key,
            timeout,
            verify_ssl,
            user_agent,
        } = config;
        let mut builder = Client::builder().timeout(timeout).user_agent(user_agent);
        if !verify_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder.build()?;
        Ok(Self {
            http,
            endpoint: url,
            secret_key,
            counter: AtomicU64::new(1),
        })
    }

    fn call<T>(&self, method: &str, params: Value) -> RpcResult<T>
    where
        T: DeserializeOwned,
    {
        let value = self.call_raw(method, params)?;
        serde_json::from_value(value).map_err(PorlaError::from)
    }

    fn call_raw(&self, method: &str, params: Value) -> RpcResult<Value> {
        let payload = RpcRequest {
            jsonrpc: "2.0",
            id: self.counter.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!("rpc {} (id {})", method, payload.id);
        let mut request = self.http.post(&self.endpoint).json(&payload);
        if let Some(key) = &self.secret_key {
            request = request.bearer_auth(key);
        }
        let response = request.send()?;
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(PorlaError::Authentication),
            status if !status.is_success() => Err(PorlaError::HttpStatus(status)),
            _ => {
                let body: RpcResponse = response.json()?;
                if let Some(error) = body.error {
                    return Err(PorlaError::Rpc {
                        code: error.code,
                        message: error.message,
                    });
                }
                Ok(body.result.unwrap_or(Value::Null))
            }
        }
    }
}

impl TorrentService for PorlaClient {
    fn list(&self, page: usize, page_size: usize) -> RpcResult<TorrentListPage> {
        self.call(
            "torrents.list",
            json!({
                "page": page,
                "page_size": page_size,
            }),
        )
    }

    fn add(&self, source: &str, save_path: &str, mode: AddSource) -> RpcResult<()> {
        let params = match mode {
            AddSource::MagnetLink => json!({
                "magnet_uri": source,
                "save_path": save_path,
            }),
            AddSource::TorrentFile => {
                let path = PathBuf::from(source);
                let content =
                    fs::read(&path).map_err(|source| PorlaError::TorrentFile { path, source })?;
                json!({
                    "ti": STANDARD.encode(content),
                    "save_path": save_path,
                })
            }
        };
        self.call_raw("torrents.add", params)?;
        info!("added torrent from {source} into {save_path}");
        Ok(())
    }

    fn remove(&self, torrent: &Torrent, keep_data: bool) -> RpcResult<()> {
        let params = json!({
            "info_hashes": [&torrent.info_hash],
            "remove_data": !keep_data,
        });
        self.call_raw("torrents.remove", params)?;
        info!("removed {} (keep data: {keep_data})", torrent.name);
        Ok(())
    }

    fn move_storage(&self, torrent: &Torrent, path: &str) -> RpcResult<()> {
        let params = json!({
            "info_hash": &torrent.info_hash,
            "path": path,
        });
        self.call_raw("torrents.move", params)?;
        info!("moving {} to {path}", torrent.name);
        Ok(())
    }

    fn pause_or_resume(&self, torrent: &Torrent) -> RpcResult<PauseAction> {
        let (method, action) = if torrent.is_paused() {
            ("torrents.resume", PauseAction::Resumed)
        } else {
            ("torrents.pause", PauseAction::Paused)
        };
        self.call_raw(method, json!({ "info_hash": &torrent.info_hash }))?;
        Ok(action)
    }

    fn properties(&self, torrent: &Torrent) -> RpcResult<TorrentProperties> {
        self.call(
            "torrents.properties.get",
            json!({ "info_hash": &torrent.info_hash }),
        )
    }

    fn set_properties(&self, torrent: &Torrent, settings: &TorrentSettings) -> RpcResult<()> {
        let params = json!({
            "info_hash": &torrent.info_hash,
            "set_flags": settings.set_flags(),
            "unset_flags": settings.unset_flags(),
            "download_limit": settings.download_limit,
            "max_connections": settings.max_connections,
            "max_uploads": settings.max_uploads,
            "upload_limit": settings.upload_limit,
        });
        self.call_raw("torrents.properties.set", params)?;
        info!("updated settings of {}", torrent.name);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    #[serde(default)]
    message: String,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::model::{InfoHash, FLAG_AUTO_MANAGED, FLAG_PAUSED, FLAG_SEQUENTIAL_DOWNLOAD};
    use httpmock::prelude::*;
    use httpmock::MockServer;

    const PATH: &str = "/api/v1/jsonrpc";

    fn client_for(server: &MockServer, secret_key: Option<&str>) -> PorlaClient {
        PorlaClient::new(RpcConfig {
            url: server.url(PATH),
            secret_key: secret_key.map(str::to_string),
            timeout: Duration::from_secs(5),
            verify_ssl: true,
            user_agent: "osprey-test".to_string(),
        })
        .unwrap()
    }

    fn sample_torrent(flags: u64) -> Torrent {
        Torrent {
            name: "debian.iso".to_string(),
            info_hash: InfoHash::new("aa11", None),
            flags,
            save_path: "/data".to_string(),
            ..Torrent::default()
        }
    }

    #[test]
    fn list_sends_page_and_bearer_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(PATH)
                .header("authorization", "Bearer s3cret")
                .json_body(json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "method": "torrents.list",
                    "params": {"page": 2, "page_size": 10},
                }));
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "page": 2,
                    "page_size": 10,
                    "torrents_total": 25,
                    "torrents": [
                        {"name": "a", "info_hash": ["aa", null], "state": 3},
                        {"name": "b", "info_hash": ["bb", "cc"], "state": 5},
                    ],
                },
            }));
        });

        let page = client_for(&server, Some("s3cret")).list(2, 10).unwrap();

        mock.assert();
        assert_eq!(page.torrents_total, 25);
        assert_eq!(page.torrents.len(), 2);
        assert!(page.torrents[1].info_hash.is_hybrid());
    }

    #[test]
    fn rpc_error_object_maps_to_rpc_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(PATH);
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": {"code": -2, "message": "page out of range"},
            }));
        });

        let err = client_for(&server, None).list(7, 10).unwrap_err();
        assert!(err.is_page_out_of_range());
    }

    #[test]
    fn unauthorized_maps_to_authentication_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(PATH);
            then.status(401);
        });

        let err = client_for(&server, Some("wrong")).list(0, 10).unwrap_err();
        assert!(matches!(err, PorlaError::Authentication));
        assert!(!err.is_page_out_of_range());
    }

    #[test]
    fn remove_inverts_keep_data_and_writes_null_hash() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path(PATH).json_body(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "torrents.remove",
                "params": {"info_hashes": [["aa11", null]], "remove_data": true},
            }));
            then.status(200).json_body(json!({"jsonrpc": "2.0", "id": 1, "result": {}}));
        });

        client_for(&server, None)
            .remove(&sample_torrent(0), false)
            .unwrap();
        mock.assert();
    }

    #[test]
    fn pause_or_resume_follows_paused_flag() {
        let server = MockServer::start();
        let pause = server.mock(|when, then| {
            when.method(POST).path(PATH).json_body(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "torrents.pause",
                "params": {"info_hash": ["aa11", null]},
            }));
            then.status(200).json_body(json!({"jsonrpc": "2.0", "id": 1, "result": {}}));
        });
        let resume = server.mock(|when, then| {
            when.method(POST).path(PATH).json_body(json!({
                "jsonrpc": "2.0",
                "id": 2,
                "method": "torrents.resume",
                "params": {"info_hash": ["aa11", null]},
            }));
            then.status(200).json_body(json!({"jsonrpc": "2.0", "id": 2, "result": {}}));
        });

        let client = client_for(&server, None);
        let first = client.pause_or_resume(&sample_torrent(0)).unwrap();
        let second = client.pause_or_resume(&sample_torrent(FLAG_PAUSED)).unwrap();

        assert_eq!(first, PauseAction::Paused);
        assert_eq!(second, PauseAction::Resumed);
        pause.assert_hits(1);
        resume.assert_hits(1);
    }

    #[test]
    fn set_properties_splits_flags() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path(PATH).json_body(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "torrents.properties.set",
                "params": {
                    "info_hash": ["aa11", null],
                    "set_flags": FLAG_SEQUENTIAL_DOWNLOAD,
                    "unset_flags": FLAG_AUTO_MANAGED,
                    "download_limit": -1,
                    "max_connections": 50,
                    "max_uploads": 4,
                    "upload_limit": 1024,
                },
            }));
            then.status(200).json_body(json!({"jsonrpc": "2.0", "id": 1, "result": {}}));
        });

        let settings = TorrentSettings {
            auto_managed: false,
            sequential_download: true,
            download_limit: -1,
            max_connections: 50,
            max_uploads: 4,
            upload_limit: 1024,
        };
        client_for(&server, None)
            .set_properties(&sample_torrent(0), &settings)
            .unwrap();
        mock.assert();
    }

    #[test]
    fn properties_are_parsed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(PATH).json_body(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "torrents.properties.get",
                "params": {"info_hash": ["aa11", null]},
            }));
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "flags": FLAG_AUTO_MANAGED,
                    "download_limit": -1,
                    "upload_limit": 2048,
                    "max_connections": 16777215,
                    "max_uploads": 1000,
                },
            }));
        });

        let props = client_for(&server, None)
            .properties(&sample_torrent(0))
            .unwrap();
        assert!(props.is_auto_managed());
        assert!(!props.is_sequential_download());
        assert_eq!(props.upload_limit, 2048);
    }

    #[test]
    fn unreadable_torrent_file_fails_before_any_request() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path(PATH);
            then.status(200).json_body(json!({"jsonrpc": "2.0", "id": 1, "result": {}}));
        });

        let err = client_for(&server, None)
            .add("/definitely/not/here.torrent", "/data", AddSource::TorrentFile)
            .unwrap_err();

        assert!(matches!(err, PorlaError::TorrentFile { .. }));
        mock.assert_hits(0);
    }

    #[test]
    fn magnet_add_sends_uri_and_save_path() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path(PATH).json_body(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "torrents.add",
                "params": {"magnet_uri": "magnet:?xt=urn:btih:aa11", "save_path": "/data"},
            }));
            then.status(200).json_body(json!({"jsonrpc": "2.0", "id": 1, "result": {}}));
        });

        client_for(&server, None)
            .add("magnet:?xt=urn:btih:aa11", "/data", AddSource::MagnetLink)
            .unwrap();
        mock.assert();
    }
}
