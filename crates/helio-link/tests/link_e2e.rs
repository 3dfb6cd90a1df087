//! End-to-end tests against an in-process WebSocket device.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

use helio_core::reconnect::ReconnectPolicy;
use helio_link::{DeviceConfig, TelemetryClient};

const TIMEOUT: Duration = Duration::from_secs(5);

/// Reconnect policy tuned for test speed; same shape as production.
fn fast_policy() -> ReconnectPolicy {
    ReconnectPolicy {
        initial_delay_ms: 50,
        max_delay_ms: 200,
        decay: 1.2,
        connect_timeout_ms: 1000,
    }
}

/// Bind a fake device on an ephemeral port.
async fn bind_device() -> (TcpListener, DeviceConfig) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = DeviceConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
    };
    (listener, config)
}

/// Accept the next client connection and complete the WS handshake.
async fn accept_client(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _peer) = timeout(TIMEOUT, listener.accept()).await.unwrap().unwrap();
    timeout(TIMEOUT, accept_async(stream)).await.unwrap().unwrap()
}

/// Poll until `cond` holds or the test times out.
async fn wait_for(mut cond: impl FnMut() -> bool) {
    timeout(TIMEOUT, async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

fn recording_client(policy: ReconnectPolicy) -> (TelemetryClient, Arc<Mutex<Vec<(String, Vec<String>)>>>) {
    let client = TelemetryClient::with_policy(policy);
    let seen = Arc::new(Mutex::new(Vec::new()));
    (client, seen)
}

fn record(seen: &Arc<Mutex<Vec<(String, Vec<String>)>>>, tag: &str) -> helio_link::Handler {
    let seen = Arc::clone(seen);
    let tag = tag.to_owned();
    Box::new(move |fields| seen.lock().push((tag.clone(), fields)))
}

#[tokio::test]
async fn end_to_end_two_channels_in_order() {
    let (listener, config) = bind_device().await;
    let (client, seen) = recording_client(fast_policy());
    client.subscribe("camera", record(&seen, "camera"));
    client.subscribe("adu", record(&seen, "adu"));

    client.connect(&config);
    let mut device = accept_client(&listener).await;

    device
        .send(Message::Text("camera;#;1;#;4095;#;http://x/y.jpg".into()))
        .await
        .unwrap();
    device
        .send(Message::Text("adu;#;120;#;80;#;60".into()))
        .await
        .unwrap();

    wait_for(|| seen.lock().len() == 2).await;
    let calls = seen.lock().clone();
    assert_eq!(calls[0].0, "camera");
    assert_eq!(calls[0].1, vec!["1", "4095", "http://x/y.jpg"]);
    assert_eq!(calls[1].0, "adu");
    assert_eq!(calls[1].1, vec!["120", "80", "60"]);

    client.close();
}

#[tokio::test]
async fn subscriptions_survive_reconnect() {
    let (listener, config) = bind_device().await;
    let (client, seen) = recording_client(fast_policy());
    client.subscribe("camera", record(&seen, "camera"));

    client.connect(&config);
    let mut device = accept_client(&listener).await;
    device
        .send(Message::Text("camera;#;before_drop".into()))
        .await
        .unwrap();
    wait_for(|| seen.lock().len() == 1).await;

    // Kill the connection from the device side; the client reconnects on
    // its own and the camera subscription must keep working without a
    // re-subscribe.
    drop(device);
    let mut device = accept_client(&listener).await;
    device
        .send(Message::Text("camera;#;after_reconnect".into()))
        .await
        .unwrap();

    wait_for(|| seen.lock().len() == 2).await;
    let calls = seen.lock().clone();
    assert_eq!(calls[0].1, vec!["before_drop"]);
    assert_eq!(calls[1].1, vec!["after_reconnect"]);

    client.close();
}

#[tokio::test]
async fn connection_status_tracks_the_socket() {
    let (listener, config) = bind_device().await;
    let client = TelemetryClient::with_policy(fast_policy());
    assert!(!client.is_connected());

    client.connect(&config);
    let device = accept_client(&listener).await;
    wait_for(|| client.is_connected()).await;

    // Device goes away: the flag drops while the client retries.
    drop(device);
    wait_for(|| !client.is_connected()).await;

    // Device comes back: the flag recovers.
    let _device = accept_client(&listener).await;
    wait_for(|| client.is_connected()).await;

    client.close();
}

#[tokio::test]
async fn close_suppresses_reconnection() {
    let (listener, config) = bind_device().await;
    let client = TelemetryClient::with_policy(fast_policy());

    client.connect(&config);
    let _device = accept_client(&listener).await;
    wait_for(|| client.is_connected()).await;

    client.close();
    assert!(!client.is_connected());

    // Well past several backoff windows, no reconnect attempt arrives.
    let outcome = timeout(Duration::from_millis(400), listener.accept()).await;
    assert!(outcome.is_err(), "client reconnected after close()");
}

#[tokio::test]
async fn endpoint_change_moves_the_connection() {
    let (listener_a, config_a) = bind_device().await;
    let (listener_b, config_b) = bind_device().await;
    let client = TelemetryClient::with_policy(fast_policy());

    client.connect(&config_a);
    let mut device_a = accept_client(&listener_a).await;
    wait_for(|| client.is_connected()).await;

    // Address change: old connection torn down, new endpoint dialed.
    client.connect(&config_b);
    let _device_b = accept_client(&listener_b).await;
    wait_for(|| client.is_connected()).await;

    // The old device sees its connection end.
    let closed = timeout(TIMEOUT, async {
        loop {
            match device_a.next().await {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "old connection never closed");

    client.close();
}

#[tokio::test]
async fn malformed_frames_do_not_disrupt_the_stream() {
    let (listener, config) = bind_device().await;
    let (client, seen) = recording_client(fast_policy());
    client.subscribe("adu", record(&seen, "adu"));

    client.connect(&config);
    let mut device = accept_client(&listener).await;

    device
        .send(Message::Text("garbage with no delimiter".into()))
        .await
        .unwrap();
    device
        .send(Message::Text("adu;#;1;#;2;#;3".into()))
        .await
        .unwrap();

    wait_for(|| seen.lock().len() == 1).await;
    assert_eq!(seen.lock()[0].1, vec!["1", "2", "3"]);

    client.close();
}

#[tokio::test]
async fn connect_is_idempotent_for_same_endpoint() {
    let (listener, config) = bind_device().await;
    let client = TelemetryClient::with_policy(fast_policy());

    client.connect(&config);
    let _device = accept_client(&listener).await;
    wait_for(|| client.is_connected()).await;

    // Same address again: no second dial.
    client.connect(&config);
    let outcome = timeout(Duration::from_millis(200), listener.accept()).await;
    assert!(outcome.is_err(), "idempotent connect dialed again");
    assert!(client.is_connected());

    client.close();
}
