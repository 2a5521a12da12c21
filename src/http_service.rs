use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use crate::power::PowerSwitch;

const CLIENT_TIMEOUT: Duration = Duration::from_millis(500);

/// Inbound control surface: a minimal HTTP service that flips and reports
/// the power switch. Runs on its own thread; the only state it shares with
/// the control loop is the switch itself.
///
/// Routes: `GET /toggle`, `GET /status`, plus an `OPTIONS` preflight.
/// Every response allows any origin so a browser dashboard can call in.
pub struct HttpService {
    listener: TcpListener,
}

impl HttpService {
    pub fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until the process exits. Per-client failures are logged and
    /// the listener keeps accepting.
    pub fn spawn(self, power: PowerSwitch) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            for stream in self.listener.incoming() {
                match stream {
                    Ok(stream) => {
                        if let Err(e) = handle_client(stream, &power) {
                            eprintln!("HTTP client error: {}", e);
                        }
                    }
                    Err(e) => eprintln!("HTTP accept error: {}", e),
                }
            }
        })
    }
}

fn handle_client(stream: TcpStream, power: &PowerSwitch) -> io::Result<()> {
    stream.set_read_timeout(Some(CLIENT_TIMEOUT))?;
    stream.set_write_timeout(Some(CLIENT_TIMEOUT))?;

    let mut reader = BufReader::new(&stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;

    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let path = parts.next().unwrap_or("");

    match (method, path) {
        ("OPTIONS", _) => respond_preflight(&stream),
        ("GET", "/toggle") => respond_text(&stream, "200 OK", state_label(power.toggle())),
        ("GET", "/status") => respond_text(&stream, "200 OK", state_label(power.is_on())),
        _ => respond_text(&stream, "404 Not Found", "Not Found"),
    }
}

fn state_label(on: bool) -> &'static str {
    if on { "ON" } else { "OFF" }
}

fn respond_text(mut stream: &TcpStream, status: &str, body: &str) -> io::Result<()> {
    write!(
        stream,
        "HTTP/1.1 {}\r\nAccess-Control-Allow-Origin: *\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    )
}

fn respond_preflight(mut stream: &TcpStream) -> io::Result<()> {
    write!(
        stream,
        "HTTP/1.1 204 No Content\r\nAccess-Control-Allow-Origin: *\r\nAccess-Control-Allow-Methods: GET, POST, OPTIONS\r\nAccess-Control-Allow-Headers: Content-Type\r\nConnection: close\r\n\r\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn request(addr: SocketAddr, line: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(stream, "{}\r\nHost: test\r\n\r\n", line).unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    fn spawn_service(power: PowerSwitch) -> SocketAddr {
        let service = HttpService::bind("127.0.0.1:0").unwrap();
        let addr = service.local_addr().unwrap();
        service.spawn(power);
        addr
    }

    #[test]
    fn test_toggle_flips_and_reports() {
        let power = PowerSwitch::new(false);
        let addr = spawn_service(power.clone());

        let response = request(addr, "GET /toggle HTTP/1.1");
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("Access-Control-Allow-Origin: *"));
        assert!(response.ends_with("ON"));
        assert!(power.is_on());

        let response = request(addr, "GET /toggle HTTP/1.1");
        assert!(response.ends_with("OFF"));
        assert!(!power.is_on());
    }

    #[test]
    fn test_status_reports_without_flipping() {
        let power = PowerSwitch::new(true);
        let addr = spawn_service(power.clone());

        let response = request(addr, "GET /status HTTP/1.1");
        assert!(response.ends_with("ON"));
        assert!(power.is_on());
    }

    #[test]
    fn test_preflight_carries_cors_headers() {
        let power = PowerSwitch::new(false);
        let addr = spawn_service(power.clone());

        let response = request(addr, "OPTIONS /toggle HTTP/1.1");
        assert!(response.starts_with("HTTP/1.1 204 No Content"));
        assert!(response.contains("Access-Control-Allow-Origin: *"));
        assert!(response.contains("Access-Control-Allow-Methods: GET, POST, OPTIONS"));
        assert!(response.contains("Access-Control-Allow-Headers: Content-Type"));
        assert!(!power.is_on());
    }

    #[test]
    fn test_unknown_route_is_404() {
        let power = PowerSwitch::new(false);
        let addr = spawn_service(power);

        let response = request(addr, "GET /nope HTTP/1.1");
        assert!(response.starts_with("HTTP/1.1 404 Not Found"));
    }
}
