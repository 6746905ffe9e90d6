//! Marionette client. The wire format is `<len>:<json>` frames over TCP;
//! commands are four-element arrays `[0, id, name, params]` answered by
//! `[1, id, error, result]`.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

use super::api::{AutomationSession, SessionError};

const COMMAND: i64 = 0;
const RESPONSE: i64 = 1;

// Largest frame we are willing to buffer. Script results are tiny; this
// only guards against a corrupted length header.
const MAX_FRAME: usize = 1 << 20;

const MINIMIZE_MEMORY_SCRIPT: &str = r#"
    const { Services } = ChromeUtils.import('resource://gre/modules/Services.jsm');
    Services.obs.notifyObservers(null, 'memory-pressure', 'heap-minimize');
"#;

const CLEAR_PERFORMANCE_BUFFER_SCRIPT: &str = r#"
    window.performance.clearMarks();
    window.performance.clearMeasures();
    window.performance.clearResourceTimings();
"#;

const ICON_COORDINATES_SCRIPT: &str = r#"
    const [origin, entryPoint] = arguments;
    const identifier = entryPoint ? origin + '/' + entryPoint : origin;
    const icon = document.querySelector(
        '#icons [data-identifier*="' + identifier + '"]');
    if (!icon) {
        throw new Error('no launch icon for ' + identifier);
    }
    icon.scrollIntoView();
    const rect = icon.getBoundingClientRect();
    return { x: rect.left + rect.width / 2, y: rect.top + rect.height / 2 };
"#;

pub struct MarionetteSession {
    reader: BufReader<ReadHalf<TcpStream>>,
    writer: WriteHalf<TcpStream>,
    next_id: i64,
}

impl MarionetteSession {
    /// Connect and consume the server's handshake frame.
    pub async fn connect(host: &str, port: u16) -> Result<Self, SessionError> {
        let stream = TcpStream::connect((host, port)).await?;
        let (reader, writer) = tokio::io::split(stream);

        let mut session = Self {
            reader: BufReader::new(reader),
            writer,
            next_id: 1,
        };

        let handshake = session.read_frame().await?;
        debug!(?handshake, "automation server handshake");

        Ok(session)
    }

    async fn read_frame(&mut self) -> Result<Value, SessionError> {
        let mut length: usize = 0;
        loop {
            let byte = self.reader.read_u8().await?;
            match byte {
                b'0'..=b'9' => {
                    length = length * 10 + usize::from(byte - b'0');
                    if length > MAX_FRAME {
                        return Err(SessionError::Protocol("frame length overflow".into()));
                    }
                }
                b':' => break,
                other => {
                    return Err(SessionError::Protocol(format!(
                        "unexpected byte {other:#x} in frame header"
                    )));
                }
            }
        }

        let mut payload = vec![0u8; length];
        self.reader.read_exact(&mut payload).await?;

        serde_json::from_slice(&payload)
            .map_err(|err| SessionError::Protocol(format!("bad frame payload: {err}")))
    }

    async fn write_frame(&mut self, frame: &Value) -> Result<(), SessionError> {
        let payload = frame.to_string();
        let framed = format!("{}:{}", payload.len(), payload);
        self.writer.write_all(framed.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn command(&mut self, name: &str, params: Value) -> Result<Value, SessionError> {
        let id = self.next_id;
        self.next_id += 1;

        self.write_frame(&json!([COMMAND, id, name, params]))
            .await?;

        loop {
            let frame = self.read_frame().await?;
            let Some(parts) = frame.as_array() else {
                return Err(SessionError::Protocol("response is not an array".into()));
            };

            match parts.as_slice() {
                [kind, reply_id, error, result]
                    if kind.as_i64() == Some(RESPONSE) && reply_id.as_i64() == Some(id) =>
                {
                    if !error.is_null() {
                        let message = error
                            .get("message")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown error");
                        return Err(SessionError::Command(format!("{name}: {message}")));
                    }
                    return Ok(result.clone());
                }
                // Responses to superseded commands are dropped.
                _ => continue,
            }
        }
    }

    async fn execute_script(&mut self, script: &str, args: Value) -> Result<Value, SessionError> {
        self.command(
            "WebDriver:ExecuteScript",
            json!({ "script": script, "args": args }),
        )
        .await
    }
}

#[async_trait]
impl AutomationSession for MarionetteSession {
    async fn start_session(&mut self) -> Result<(), SessionError> {
        self.command("WebDriver:NewSession", json!({})).await?;
        Ok(())
    }

    async fn delete_session(&mut self) -> Result<(), SessionError> {
        self.command("WebDriver:DeleteSession", json!({})).await?;
        Ok(())
    }

    async fn trigger_memory_minimization(&mut self) -> Result<(), SessionError> {
        self.execute_script(MINIMIZE_MEMORY_SCRIPT, json!([]))
            .await?;
        Ok(())
    }

    async fn clear_performance_buffer(&mut self) -> Result<(), SessionError> {
        self.execute_script(CLEAR_PERFORMANCE_BUFFER_SCRIPT, json!([]))
            .await?;
        Ok(())
    }

    async fn icon_coordinates(
        &mut self,
        app: &str,
        entry_point: Option<&str>,
    ) -> Result<(u32, u32), SessionError> {
        let result = self
            .execute_script(ICON_COORDINATES_SCRIPT, json!([app, entry_point]))
            .await?;

        // ExecuteScript wraps the return value in { value: ... }.
        let value = result.get("value").unwrap_or(&result);
        let coordinate = |axis: &str| {
            value
                .get(axis)
                .and_then(Value::as_f64)
                .ok_or_else(|| SessionError::Protocol(format!("icon coordinates missing {axis}")))
        };

        Ok((coordinate("x")? as u32, coordinate("y")? as u32))
    }
}
