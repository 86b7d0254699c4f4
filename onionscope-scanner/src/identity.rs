//! Network identity rotation.
//!
//! [`IdentityRotator`] counts fetch attempts and asks an [`IdentityControl`]
//! for a fresh identity once the configured threshold is reached.

use crate::error::RotationError;
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

pub const DEFAULT_ROTATION_THRESHOLD: u32 = 10;
pub const DEFAULT_CONTROL_ADDR: &str = "127.0.0.1:9051";
pub const DEFAULT_SOCKS_ADDR: &str = "127.0.0.1:9050";

/// Control surface of the anonymity layer.
#[async_trait]
pub trait IdentityControl: Send + Sync {
    /// Request a new network identity.
    async fn rotate(&mut self) -> Result<(), RotationError>;

    /// Whether the anonymity layer currently accepts connections.
    async fn is_reachable(&self) -> bool;
}

/// Tor control-port client issuing `SIGNAL NEWNYM`.
pub struct TorControl {
    control_addr: String,
    socks_addr: String,
    password: Option<String>,
    probe_timeout: Duration,
}

impl TorControl {
    pub fn new(control_addr: impl Into<String>, socks_addr: impl Into<String>) -> Self {
        Self {
            control_addr: control_addr.into(),
            socks_addr: socks_addr.into(),
            password: None,
            probe_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password;
        self
    }

    fn authenticate_command(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "AUTHENTICATE \"{}\"",
                password.replace('\\', "\\\\").replace('"', "\\\"")
            ),
            None => "AUTHENTICATE".to_string(),
        }
    }

    async fn send_command(
        stream: &mut BufReader<TcpStream>,
        command: &str,
    ) -> Result<(), RotationError> {
        stream
            .get_mut()
            .write_all(format!("{}\r\n", command).as_bytes())
            .await?;

        let mut reply = String::new();
        if stream.read_line(&mut reply).await? == 0 {
            return Err(RotationError::ConnectionClosed);
        }
        let reply = reply.trim_end().to_string();

        if reply.starts_with("250") {
            Ok(())
        } else {
            // Never echo the password back into logs.
            let verb = command.split_whitespace().next().unwrap_or_default();
            Err(RotationError::Rejected {
                command: verb.to_string(),
                reply,
            })
        }
    }
}

impl Default for TorControl {
    fn default() -> Self {
        Self::new(DEFAULT_CONTROL_ADDR, DEFAULT_SOCKS_ADDR)
    }
}

#[async_trait]
impl IdentityControl for TorControl {
    async fn rotate(&mut self) -> Result<(), RotationError> {
        let stream = TcpStream::connect(&self.control_addr).await?;
        let mut stream = BufReader::new(stream);

        Self::send_command(&mut stream, &self.authenticate_command()).await?;
        Self::send_command(&mut stream, "SIGNAL NEWNYM").await?;
        // QUIT's reply is irrelevant; the identity is already requested.
        let _ = stream.get_mut().write_all(b"QUIT\r\n").await;
        Ok(())
    }

    async fn is_reachable(&self) -> bool {
        matches!(
            tokio::time::timeout(self.probe_timeout, TcpStream::connect(&self.socks_addr)).await,
            Ok(Ok(_))
        )
    }
}

/// Request bookkeeping around an [`IdentityControl`].
pub struct IdentityRotator {
    control: Box<dyn IdentityControl>,
    threshold: u32,
    requests_since_rotation: u32,
    settle_min: Duration,
    settle_max: Duration,
    rotations: u64,
}

impl IdentityRotator {
    pub fn new(control: Box<dyn IdentityControl>, threshold: u32) -> Self {
        Self {
            control,
            threshold: threshold.max(1),
            requests_since_rotation: 0,
            settle_min: Duration::from_secs(2),
            settle_max: Duration::from_secs(5),
            rotations: 0,
        }
    }

    /// Bounds of the random pause taken after a successful rotation.
    pub fn with_settle_delay(mut self, min: Duration, max: Duration) -> Self {
        self.settle_min = min.min(max);
        self.settle_max = max.max(min);
        self
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn requests_since_rotation(&self) -> u32 {
        self.requests_since_rotation
    }

    /// Successful rotations so far.
    pub fn rotations(&self) -> u64 {
        self.rotations
    }

    /// Count one fetch attempt. Retries count too.
    pub fn record_request(&mut self) {
        self.requests_since_rotation = self.requests_since_rotation.saturating_add(1);
    }

    pub fn should_rotate(&self) -> bool {
        self.requests_since_rotation >= self.threshold
    }

    /// Ask for a new identity. On failure the counter is left untouched so the
    /// next iteration tries again.
    pub async fn rotate(&mut self) -> bool {
        match self.control.rotate().await {
            Ok(()) => {
                self.requests_since_rotation = 0;
                self.rotations += 1;
                let pause = self.settle_pause();
                info!(
                    "Rotated network identity (rotation #{}), settling for {:?}",
                    self.rotations, pause
                );
                tokio::time::sleep(pause).await;
                true
            }
            Err(e) => {
                warn!("Identity rotation failed, keeping current identity: {}", e);
                false
            }
        }
    }

    pub async fn is_reachable(&self) -> bool {
        self.control.is_reachable().await
    }

    fn settle_pause(&self) -> Duration {
        if self.settle_max <= self.settle_min {
            return self.settle_min;
        }
        let min = self.settle_min.as_millis() as u64;
        let max = self.settle_max.as_millis() as u64;
        let millis = rand::rng().random_range(min..=max);
        debug!("Settle pause chosen: {}ms", millis);
        Duration::from_millis(millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::net::TcpListener;

    struct CountingControl {
        calls: Arc<AtomicUsize>,
        succeed: bool,
    }

    #[async_trait]
    impl IdentityControl for CountingControl {
        async fn rotate(&mut self) -> Result<(), RotationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                Ok(())
            } else {
                Err(RotationError::ConnectionClosed)
            }
        }

        async fn is_reachable(&self) -> bool {
            self.succeed
        }
    }

    fn rotator(succeed: bool, threshold: u32) -> (IdentityRotator, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let control = CountingControl {
            calls: calls.clone(),
            succeed,
        };
        (IdentityRotator::new(Box::new(control), threshold), calls)
    }

    #[test]
    fn test_should_rotate_at_threshold() {
        let (mut rotator, _) = rotator(true, 3);
        rotator.record_request();
        rotator.record_request();
        assert!(!rotator.should_rotate());
        rotator.record_request();
        assert!(rotator.should_rotate());
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_rotation_resets_counter() {
        let (mut rotator, calls) = rotator(true, 2);
        rotator.record_request();
        rotator.record_request();

        assert!(rotator.rotate().await);
        assert_eq!(rotator.requests_since_rotation(), 0);
        assert_eq!(rotator.rotations(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_rotation_keeps_counter() {
        let (mut rotator, calls) = rotator(false, 2);
        rotator.record_request();
        rotator.record_request();

        assert!(!rotator.rotate().await);
        assert_eq!(rotator.requests_since_rotation(), 2);
        assert!(rotator.should_rotate());
        assert_eq!(rotator.rotations(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_pause_is_taken() {
        let (rotator, _) = rotator(true, 1);
        let mut rotator =
            rotator.with_settle_delay(Duration::from_secs(2), Duration::from_secs(5));
        let start = tokio::time::Instant::now();
        rotator.rotate().await;
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(2));
        assert!(waited <= Duration::from_secs(5) + Duration::from_millis(10));
    }

    #[test]
    fn test_zero_threshold_is_clamped() {
        let (rotator, _) = rotator(true, 0);
        assert_eq!(rotator.threshold(), 1);
    }

    #[test]
    fn test_authenticate_command_escapes_password() {
        let control = TorControl::default().with_password(Some("pa\"ss".to_string()));
        assert_eq!(control.authenticate_command(), "AUTHENTICATE \"pa\\\"ss\"");
        assert_eq!(TorControl::default().authenticate_command(), "AUTHENTICATE");
    }

    async fn fake_control_port(replies: &'static [&'static str]) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let handle = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut socket = BufReader::new(socket);
            let mut received = Vec::new();
            for reply in replies {
                let mut line = String::new();
                socket.read_line(&mut line).await.unwrap();
                received.push(line.trim_end().to_string());
                socket.get_mut().write_all(reply.as_bytes()).await.unwrap();
            }
            received
        });
        (addr, handle)
    }

    #[tokio::test]
    async fn test_tor_control_sends_newnym() {
        let (addr, handle) = fake_control_port(&["250 OK\r\n", "250 OK\r\n"]).await;
        let mut control = TorControl::new(addr, DEFAULT_SOCKS_ADDR);

        control.rotate().await.unwrap();
        let received = handle.await.unwrap();
        assert_eq!(received, vec!["AUTHENTICATE", "SIGNAL NEWNYM"]);
    }

    #[tokio::test]
    async fn test_tor_control_rejected_auth() {
        let (addr, handle) =
            fake_control_port(&["515 Authentication failed\r\n"]).await;
        let mut control =
            TorControl::new(addr, DEFAULT_SOCKS_ADDR).with_password(Some("wrong".to_string()));

        let err = control.rotate().await.unwrap_err();
        match err {
            RotationError::Rejected { command, reply } => {
                assert_eq!(command, "AUTHENTICATE");
                assert!(reply.starts_with("515"));
            }
            other => panic!("unexpected error: {other}"),
        }
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_is_reachable_probes_socks_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let control = TorControl::new(DEFAULT_CONTROL_ADDR, addr);
        assert!(control.is_reachable().await);
    }
}
