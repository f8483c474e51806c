//! Client helper for sending webhooks to the notehub daemon.
//!
//! The daemon is the only writer. Failures are surfaced to the caller; the
//! CLI never touches the database itself.

use chrono::Utc;
use notehub_protocol::{
    Method, Request, Response, WebhookReply, WebhookRequest, MAX_REQUEST_BYTES, PROTOCOL_VERSION,
};
use rand::RngCore;
use serde_json::Value;
use std::env;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::time::Duration;

const SOCKET_ENV: &str = "NOTEHUB_DAEMON_SOCKET";
const SOCKET_NAME: &str = "daemon.sock";
// Webhooks do SQLite work on the daemon side; leave room for busy_timeout.
const READ_TIMEOUT_MS: u64 = 6000;
const WRITE_TIMEOUT_MS: u64 = 600;
const RETRY_DELAY_MS: u64 = 50;

/// Sends a webhook and decodes the daemon's reply.
///
/// Rejections (bad params, unknown action, critical errors) come back as an
/// `Ok` reply with `error` set. `Err` means the exchange itself failed.
pub fn send_webhook(webhook: &WebhookRequest) -> Result<WebhookReply, String> {
    let params =
        serde_json::to_value(webhook).map_err(|err| format!("Failed to serialize webhook: {}", err))?;
    let request = Request {
        protocol_version: PROTOCOL_VERSION,
        method: Method::Webhook,
        id: Some(make_request_id()),
        params: Some(params),
    };

    let response = send_request_with_retry(&request, "webhook")?;
    decode_reply(response)
}

pub fn daemon_health() -> Result<Value, String> {
    let request = Request {
        protocol_version: PROTOCOL_VERSION,
        method: Method::GetHealth,
        id: Some("health-check".to_string()),
        params: None,
    };

    let response = send_request_with_retry(&request, "health check")?;
    if !response.ok {
        return Err(error_message(response));
    }
    response
        .data
        .ok_or_else(|| "Daemon health response had no data".to_string())
}

fn decode_reply(response: Response) -> Result<WebhookReply, String> {
    match response.data {
        Some(data) => serde_json::from_value(data)
            .map_err(|err| format!("Failed to parse webhook reply: {}", err)),
        None => Err(error_message(response)),
    }
}

fn error_message(response: Response) -> String {
    response
        .error
        .map(|err| format!("{}: {}", err.code, err.message))
        .unwrap_or_else(|| "Unknown daemon error".to_string())
}

fn socket_path() -> Result<PathBuf, String> {
    if let Ok(path) = env::var(SOCKET_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    let home = dirs::home_dir().ok_or_else(|| "Home directory not found".to_string())?;
    Ok(home.join(".notehub").join(SOCKET_NAME))
}

/// Retries only when the connection could not be made. Once a request has
/// been written it may have been applied, so it is never sent twice.
fn send_request_with_retry(request: &Request, label: &str) -> Result<Response, String> {
    let stream = match connect() {
        Ok(stream) => stream,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to reach daemon for {}; retrying", label);
            std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS));
            connect().map_err(|retry_err| {
                tracing::warn!(error = %retry_err, "Retry failed reaching daemon for {}", label);
                retry_err
            })?
        }
    };
    send_request(stream, request)
}

fn connect() -> Result<UnixStream, String> {
    let socket = socket_path()?;
    UnixStream::connect(&socket).map_err(|err| {
        format!(
            "Failed to connect to daemon socket {}: {}",
            socket.display(),
            err
        )
    })
}

fn send_request(mut stream: UnixStream, request: &Request) -> Result<Response, String> {
    let _ = stream.set_read_timeout(Some(Duration::from_millis(READ_TIMEOUT_MS)));
    let _ = stream.set_write_timeout(Some(Duration::from_millis(WRITE_TIMEOUT_MS)));

    serde_json::to_writer(&mut stream, request)
        .map_err(|err| format!("Failed to write request: {}", err))?;
    stream
        .write_all(b"\n")
        .map_err(|err| format!("Failed to flush request: {}", err))?;
    stream.flush().ok();

    read_response(&mut stream)
}

fn read_response(stream: &mut UnixStream) -> Result<Response, String> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buffer.extend_from_slice(&chunk[..n]);
                if buffer.len() > MAX_REQUEST_BYTES {
                    return Err("Response exceeded maximum size".to_string());
                }
                if chunk[..n].contains(&b'\n') {
                    break;
                }
            }
            Err(err)
                if matches!(
                    err.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                return Err("Timed out waiting for daemon response".to_string());
            }
            Err(err) => return Err(format!("Failed to read response: {}", err)),
        }
    }

    let newline_index = buffer.iter().position(|b| *b == b'\n');
    let response_bytes = match newline_index {
        Some(index) => &buffer[..index],
        None => buffer.as_slice(),
    };

    if response_bytes.is_empty() {
        return Err("Daemon response was empty".to_string());
    }

    serde_json::from_slice(response_bytes)
        .map_err(|err| format!("Failed to parse response JSON: {}", err))
}

fn make_request_id() -> String {
    let mut random = rand::thread_rng();
    let rand = random.next_u64();
    format!(
        "req-{}-{}-{:x}",
        Utc::now().timestamp_millis(),
        std::process::id(),
        rand
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixListener;
    use std::sync::{Arc, Mutex, OnceLock};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    struct EnvGuard {
        key: &'static str,
        prior: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let prior = std::env::var(key).ok();
            std::env::set_var(key, value);
            Self { key, prior }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.prior {
                std::env::set_var(self.key, value);
            } else {
                std::env::remove_var(self.key);
            }
        }
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn temp_socket(label: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::Builder::new()
            .prefix(&format!("nh-{}-", label))
            .tempdir_in("/tmp")
            .unwrap();
        let path = dir.path().join("daemon.sock");
        (dir, path)
    }

    fn read_request(stream: &mut UnixStream) -> Option<Request> {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    buffer.extend_from_slice(&chunk[..n]);
                    if buffer.contains(&b'\n') {
                        break;
                    }
                }
                Err(_) => return None,
            }
        }

        let newline_index = buffer.iter().position(|b| *b == b'\n');
        let request_bytes = match newline_index {
            Some(index) => &buffer[..index],
            None => buffer.as_slice(),
        };
        serde_json::from_slice(request_bytes).ok()
    }

    fn reply_with(stream: &mut UnixStream, response: &Response) {
        let mut payload = serde_json::to_vec(response).unwrap();
        payload.push(b'\n');
        let _ = stream.write_all(&payload);
    }

    #[test]
    fn send_webhook_wraps_request_and_decodes_reply() {
        let _guard = env_lock();
        let (_dir, socket_path) = temp_socket("webhook");
        let listener = UnixListener::bind(&socket_path).unwrap();

        let captured = Arc::new(Mutex::new(None::<Request>));
        let captured_clone = Arc::clone(&captured);
        let server = std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let request = read_request(&mut stream);
                let id = request.as_ref().and_then(|request| request.id.clone());
                *captured_clone.lock().unwrap() = request;
                let reply = WebhookReply::success("Content appended");
                reply_with(&mut stream, &Response::from_reply(id, &reply));
            }
        });

        let _socket_guard = EnvGuard::set(SOCKET_ENV, socket_path.to_str().unwrap());
        let webhook = WebhookRequest::default()
            .with_param("token", "tok")
            .with_param("docId", "doc")
            .with_param("text", "hello");
        let reply = send_webhook(&webhook).expect("webhook reply");
        server.join().unwrap();

        assert!(reply.is_success());
        assert_eq!(reply.message.as_deref(), Some("Content appended"));

        let request = captured.lock().unwrap().take().expect("captured request");
        assert!(matches!(request.method, Method::Webhook));
        assert!(request.id.as_deref().unwrap_or_default().starts_with("req-"));
        let sent: WebhookRequest =
            serde_json::from_value(request.params.expect("params")).expect("webhook params");
        assert_eq!(sent, webhook);
    }

    #[test]
    fn rejected_webhook_is_an_ok_reply_with_error() {
        let _guard = env_lock();
        let (_dir, socket_path) = temp_socket("rejected");
        let listener = UnixListener::bind(&socket_path).unwrap();

        let server = std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let _ = read_request(&mut stream);
                let reply = WebhookReply::bad_request("No content to append");
                reply_with(&mut stream, &Response::from_reply(None, &reply));
            }
        });

        let _socket_guard = EnvGuard::set(SOCKET_ENV, socket_path.to_str().unwrap());
        let reply = send_webhook(&WebhookRequest::default()).expect("webhook reply");
        server.join().unwrap();

        assert!(!reply.is_success());
        assert_eq!(reply.error.as_deref(), Some("No content to append"));
    }

    #[test]
    fn envelope_errors_without_data_surface_as_err() {
        let _guard = env_lock();
        let (_dir, socket_path) = temp_socket("envelope");
        let listener = UnixListener::bind(&socket_path).unwrap();

        let server = std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let _ = read_request(&mut stream);
                reply_with(
                    &mut stream,
                    &Response::error(None, "protocol_mismatch", "unsupported protocol version"),
                );
            }
        });

        let _socket_guard = EnvGuard::set(SOCKET_ENV, socket_path.to_str().unwrap());
        let err = send_webhook(&WebhookRequest::default()).unwrap_err();
        server.join().unwrap();

        assert_eq!(err, "protocol_mismatch: unsupported protocol version");
    }

    #[test]
    fn missing_daemon_is_an_error() {
        let _guard = env_lock();
        let (_dir, socket_path) = temp_socket("missing");
        let _socket_guard = EnvGuard::set(SOCKET_ENV, socket_path.to_str().unwrap());

        let err = daemon_health().unwrap_err();
        assert!(err.contains("Failed to connect to daemon socket"), "{}", err);
    }
}
