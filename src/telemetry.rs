use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde::Serialize;

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
const IO_TIMEOUT: Duration = Duration::from_millis(500);

/// One outbound telemetry record: the latest distance readings plus the
/// motor and rudder state. Field names are the wire format.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    pub front_distance: f64,
    pub left_distance: f64,
    pub right_distance: f64,
    pub motor_speed: f64,
    pub rudder_direction: String,
}

/// Fire-and-forget JSON POST client. A push that fails for any reason is
/// logged and dropped; there is no retry and no backoff.
pub struct TelemetryClient {
    addr: String,
    path: String,
}

impl TelemetryClient {
    pub fn new(addr: &str, path: &str) -> Self {
        Self {
            addr: addr.to_string(),
            path: path.to_string(),
        }
    }

    /// Push one snapshot, best effort.
    pub fn push(&self, snapshot: &TelemetrySnapshot) {
        match self.post(snapshot) {
            Ok(status) if (200..300).contains(&status) => {}
            Ok(status) => eprintln!("Telemetry push rejected: HTTP {}", status),
            Err(e) => eprintln!("Telemetry push failed: {}", e),
        }
    }

    fn post(&self, snapshot: &TelemetrySnapshot) -> io::Result<u16> {
        let body = serde_json::to_string(snapshot)?;

        let target = self
            .addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no address"))?;

        let mut stream = TcpStream::connect_timeout(&target, CONNECT_TIMEOUT)?;
        stream.set_read_timeout(Some(IO_TIMEOUT))?;
        stream.set_write_timeout(Some(IO_TIMEOUT))?;

        write!(
            stream,
            "POST {} HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.path,
            self.addr,
            body.len(),
            body
        )?;

        let mut reader = BufReader::new(&stream);
        let mut status_line = String::new();
        reader.read_line(&mut status_line)?;

        // "HTTP/1.1 200 OK" -> 200
        status_line
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse().ok())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "malformed status line"))
    }
}

/// Run the client on its own thread, fed snapshots over a channel, so a
/// slow or unreachable sink never stalls the control loop.
pub fn spawn_reporter(client: TelemetryClient) -> mpsc::Sender<TelemetrySnapshot> {
    let (tx, rx) = mpsc::channel::<TelemetrySnapshot>();

    thread::spawn(move || {
        for snapshot in rx {
            client.push(&snapshot);
        }
    });

    tx
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;

    fn snapshot() -> TelemetrySnapshot {
        TelemetrySnapshot {
            front_distance: 0.42,
            left_distance: 999.0,
            right_distance: 1.5,
            motor_speed: 87.5,
            rudder_direction: "Going straight…".to_string(),
        }
    }

    #[test]
    fn test_wire_field_names() {
        let value = serde_json::to_value(snapshot()).unwrap();
        let object = value.as_object().unwrap();

        for key in [
            "frontDistance",
            "leftDistance",
            "rightDistance",
            "motorSpeed",
            "rudderDirection",
        ] {
            assert!(object.contains_key(key), "missing field {key}");
        }
        assert_eq!(object.len(), 5);
        assert_eq!(object["frontDistance"], 0.42);
        assert_eq!(object["rudderDirection"], "Going straight…");
    }

    #[test]
    fn test_post_reports_server_status() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = vec![0u8; 2048];
            let n = stream.read(&mut request).unwrap();
            let request = String::from_utf8_lossy(&request[..n]).to_string();

            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n")
                .unwrap();
            request
        });

        let client = TelemetryClient::new(&addr.to_string(), "/telemetry");
        let status = client.post(&snapshot()).unwrap();
        assert_eq!(status, 200);

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /telemetry HTTP/1.1"));
        assert!(request.contains("Content-Type: application/json"));
        assert!(request.contains("\"frontDistance\":0.42"));
    }

    #[test]
    fn test_unreachable_sink_is_an_error_not_a_panic() {
        // Nothing listens here; push must swallow the failure.
        let client = TelemetryClient::new("127.0.0.1:1", "/telemetry");
        assert!(client.post(&snapshot()).is_err());
        client.push(&snapshot());
    }
}
