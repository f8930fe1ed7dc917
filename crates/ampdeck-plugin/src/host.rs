//! Websocket link to the Stream Deck host.
//!
//! `connect` performs the registration handshake, then splits the socket
//! into a reader task that forwards decoded [`HostEvent`]s to the core and a
//! writer task fed by [`HostHandle`].

use ampdeck_proto::platform;
use ampdeck_proto::protocol::{HostEvent, Outbound, Registration};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::core::CoreEvent;

/// Cloneable sender for outbound host messages.
#[derive(Clone, Debug)]
pub struct HostHandle {
    tx: mpsc::Sender<Outbound>,
}

impl HostHandle {
    /// A handle plus the receiving end, for wiring without a socket.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    pub async fn send(&self, msg: Outbound) {
        if self.tx.send(msg).await.is_err() {
            debug!("host writer gone, dropping message");
        }
    }
}

/// Connect to the host on `port`, register as `plugin_uuid`, and ask for the
/// global settings.
pub async fn connect(
    port: u16,
    register_event: &str,
    plugin_uuid: &str,
    events: mpsc::Sender<CoreEvent>,
) -> anyhow::Result<HostHandle> {
    let address = platform::host_address(port);
    let (ws, _) = connect_async(address.as_str()).await?;
    info!("Host: connected to {}", address);
    let (mut sink, mut stream) = ws.split();

    let registration = serde_json::to_string(&Registration {
        event: register_event.to_string(),
        uuid: plugin_uuid.to_string(),
    })?;
    sink.send(Message::Text(registration)).await?;
    let ask = Outbound::GetGlobalSettings {
        context: plugin_uuid.to_string(),
    }
    .encode()?;
    sink.send(Message::Text(ask)).await?;

    let (handle, mut outbound) = HostHandle::channel(256);

    tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            let text = match msg.encode() {
                Ok(t) => t,
                Err(e) => {
                    warn!("Host: failed to encode outbound message: {}", e);
                    continue;
                }
            };
            if let Err(e) = sink.send(Message::Text(text)).await {
                warn!("Host: write failed: {}", e);
                break;
            }
        }
        let _ = sink.close().await;
        debug!("Host: writer exited");
    });

    tokio::spawn(async move {
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => match HostEvent::decode(&text) {
                    Ok(HostEvent::Unknown) => {}
                    Ok(ev) => {
                        if events.send(CoreEvent::Host(ev)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => debug!("Host: undecodable message: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => {
                    info!("Host: connection closed");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Host: read failed: {}", e);
                    break;
                }
            }
        }
        let _ = events.send(CoreEvent::Shutdown).await;
    });

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_handshake_and_event_forwarding() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            let mut received = Vec::new();
            for _ in 0..2 {
                if let Some(Ok(Message::Text(t))) = ws.next().await {
                    received.push(serde_json::from_str::<serde_json::Value>(&t).unwrap());
                }
            }
            ws.send(Message::Text(
                r#"{"event":"willAppear","action":"com.rackemrack.ampdeck.time","context":"k1","payload":{"settings":{}}}"#.into(),
            ))
            .await
            .unwrap();
            let echoed = ws.next().await;
            (received, echoed)
        });

        let (tx, mut rx) = mpsc::channel(8);
        let handle = connect(port, "registerPlugin", "uuid-1", tx).await.unwrap();

        match rx.recv().await {
            Some(CoreEvent::Host(HostEvent::WillAppear { context, .. })) => assert_eq!(context, "k1"),
            other => panic!("unexpected {:?}", other),
        }
        handle.send(Outbound::set_image("k1", "data:x".into())).await;

        let (received, echoed) = server.await.unwrap();
        assert_eq!(received[0]["event"], "registerPlugin");
        assert_eq!(received[0]["uuid"], "uuid-1");
        assert_eq!(received[1]["event"], "getGlobalSettings");
        assert_eq!(received[1]["context"], "uuid-1");
        match echoed {
            Some(Ok(Message::Text(t))) => assert!(t.contains("\"setImage\"")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
