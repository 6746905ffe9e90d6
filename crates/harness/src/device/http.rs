//! Device service client. Every control operation maps to one REST call
//! against the forwarding daemon that fronts the device; the live log is a
//! chunked GET held open for the lifetime of the returned stream.

use std::collections::HashMap;
use std::path::PathBuf;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, StatusCode};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::control::{BuildRevisions, DeviceControl, DeviceError, LineStream};
use async_trait::async_trait;

const MEMORY_TAG: &str = "PerformanceMemory";
const TIMING_TAG: &str = "PerformanceTiming";

/// Origin context device-written marks are attributed to.
const SYSTEM_CONTEXT: &str = "system.gaiamobile.org";

pub struct HttpDevice {
    base: String,
    client: Client<HttpConnector, Full<Bytes>>,
}

impl HttpDevice {
    /// `base` is the device service origin, e.g. `http://localhost:9090`.
    pub fn new(base: impl Into<String>) -> Self {
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }

        Self {
            base,
            client: Client::builder(TokioExecutor::new()).build_http(),
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Bytes, DeviceError> {
        let uri = format!("{}{}", self.base, path);
        debug!(%method, %uri, "device service request");

        let mut builder = Request::builder().method(method).uri(&uri);
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Full::new(Bytes::from(value.to_string()))
            }
            None => Full::new(Bytes::new()),
        };

        let request = builder
            .body(body)
            .map_err(|err| DeviceError::Http(err.to_string()))?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|err| DeviceError::Http(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeviceError::Status {
                status: status.as_u16(),
                endpoint: path.to_string(),
            });
        }

        let collected = response
            .into_body()
            .collect()
            .await
            .map_err(|err| DeviceError::Http(err.to_string()))?;

        Ok(collected.to_bytes())
    }

    async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, DeviceError> {
        let bytes = self.send(method, path, body).await?;
        serde_json::from_slice(&bytes)
            .map_err(|err| DeviceError::InvalidResponse(format!("{path}: {err}")))
    }

    /// Write one line into the device log through the service.
    async fn log_message(&self, tag: &str, message: String) -> Result<(), DeviceError> {
        self.send(
            Method::POST,
            "/logs",
            Some(json!({
                "message": message,
                "tag": tag,
                "priority": "i",
            })),
        )
        .await?;
        Ok(())
    }
}

fn revision_of(value: &Value) -> String {
    // Older services report a bare sha string, newer ones an object.
    match value {
        Value::String(sha) => sha.clone(),
        Value::Object(map) => map
            .get("sha")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

#[async_trait]
impl DeviceControl for HttpDevice {
    async fn restart(&self) -> Result<(), DeviceError> {
        self.send(Method::POST, "/restart", None).await?;
        Ok(())
    }

    async fn hard_reboot(&self) -> Result<(), DeviceError> {
        self.send(Method::POST, "/restart?hard=true", None).await?;
        Ok(())
    }

    async fn clear_log(&self) -> Result<(), DeviceError> {
        self.send(Method::DELETE, "/logs", None).await?;
        Ok(())
    }

    async fn mark(&self, name: &str, epoch_ms: i64) -> Result<(), DeviceError> {
        self.log_message(
            TIMING_TAG,
            format!("{SYSTEM_CONTEXT}|mark|{name}|0|0|{epoch_ms}"),
        )
        .await
    }

    async fn write_memory_sample(&self, pid: u32, context: &str) -> Result<(), DeviceError> {
        let sample = self
            .send_json(Method::GET, &format!("/processes/{pid}"), None)
            .await?;

        for name in ["uss", "pss", "rss"] {
            let value = sample.get(name).and_then(Value::as_f64).ok_or_else(|| {
                DeviceError::InvalidResponse(format!("memory sample missing {name}"))
            })?;
            self.log_message(MEMORY_TAG, format!("{context}|{name}|{value}"))
                .await?;
        }

        Ok(())
    }

    async fn kill_process(&self, pid: u32) -> Result<(), DeviceError> {
        self.send(Method::DELETE, &format!("/processes/{pid}"), None)
            .await?;
        Ok(())
    }

    async fn reset_input_state(&self) -> Result<(), DeviceError> {
        self.send(Method::POST, "/events/reset", None).await?;
        Ok(())
    }

    async fn tap(&self, x: u32, y: u32) -> Result<(), DeviceError> {
        self.send(Method::POST, "/events/tap", Some(json!({ "x": x, "y": y })))
            .await?;
        Ok(())
    }

    async fn forward_port(&self, remote_port: u16) -> Result<u16, DeviceError> {
        let body = self
            .send(Method::POST, &format!("/connections/{remote_port}"), None)
            .await?;

        let text = String::from_utf8_lossy(&body);
        text.trim()
            .parse()
            .map_err(|_| DeviceError::InvalidResponse(format!("forwarded port: {text}")))
    }

    async fn build_revisions(&self) -> Result<BuildRevisions, DeviceError> {
        let root = self.send_json(Method::GET, "/", None).await?;

        Ok(BuildRevisions {
            gaia: root.get("gaia").map(revision_of).unwrap_or_default(),
            gecko: root.get("gecko").map(revision_of).unwrap_or_default(),
        })
    }

    async fn properties(&self) -> Result<HashMap<String, String>, DeviceError> {
        let map = self.send_json(Method::GET, "/properties", None).await?;
        let Value::Object(map) = map else {
            return Err(DeviceError::InvalidResponse("properties".into()));
        };

        Ok(map
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(value) => Some((key, value)),
                other => Some((key, other.to_string())),
            })
            .collect())
    }

    async fn open_log_stream(&self, sink: Option<PathBuf>) -> Result<LineStream, DeviceError> {
        let uri = format!("{}/logs", self.base);
        let request = Request::builder()
            .method(Method::GET)
            .uri(&uri)
            .body(Full::new(Bytes::new()))
            .map_err(|err| DeviceError::Http(err.to_string()))?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|err| DeviceError::Http(err.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(DeviceError::Status {
                status: response.status().as_u16(),
                endpoint: "/logs".to_string(),
            });
        }

        let mut tee = match sink {
            Some(path) => Some(
                tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .await?,
            ),
            None => None,
        };

        let mut body = response.into_body();
        let stream = async_stream::stream! {
            let mut buffer: Vec<u8> = Vec::new();

            while let Some(frame) = body.frame().await {
                let frame = match frame {
                    Ok(frame) => frame,
                    Err(err) => {
                        warn!(error = %err, "device log stream errored");
                        break;
                    }
                };

                let Some(data) = frame.data_ref() else {
                    continue;
                };

                if let Some(file) = tee.as_mut() {
                    if let Err(err) = file.write_all(data).await {
                        warn!(error = %err, "log sink write failed, disabling tee");
                        tee = None;
                    }
                }

                buffer.extend_from_slice(data);
                while let Some(newline) = buffer.iter().position(|byte| *byte == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=newline).collect();
                    yield String::from_utf8_lossy(&line).trim_end().to_string();
                }
            }

            if !buffer.is_empty() {
                yield String::from_utf8_lossy(&buffer).trim_end().to_string();
            }
        };

        Ok(Box::pin(stream))
    }
}
