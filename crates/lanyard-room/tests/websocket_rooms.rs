//! Integration tests that drive [`WebSocketConnector`] against a real
//! in-process WebSocket server.
//!
//! The mock-connection unit tests in the crate cover the lifecycle logic;
//! these cover the actual wire: TCP, the HTTP upgrade, and tungstenite
//! message framing.

#![cfg(feature = "websocket")]

use futures_util::{SinkExt, StreamExt};
use lanyard_protocol::{
    ClientFrame, ErrorCode, RoomTarget, ServerFrame, UserId, UserProfile, PROTOCOL_VERSION,
};
use lanyard_room::{RoomConfig, RoomConnection, RoomError, WebSocketConnector};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

fn profile() -> UserProfile {
    UserProfile {
        id: UserId::from("user-1"),
        display_name: "Alice".into(),
        level: 3,
        currencies: Default::default(),
    }
}

fn encode(frame: &ServerFrame) -> Message {
    Message::binary(serde_json::to_vec(frame).unwrap())
}

fn join_frame() -> ClientFrame {
    ClientFrame::JoinIdentity {
        version: PROTOCOL_VERSION,
        access_token: None,
    }
}

#[tokio::test]
async fn test_websocket_room_join_and_correlated_request() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        let msg = ws.next().await.unwrap().unwrap();
        let frame: ClientFrame = serde_json::from_slice(&msg.into_data()).unwrap();
        assert_eq!(frame, join_frame());

        ws.send(encode(&ServerFrame::Welcome {
            session_id: "sess-ws-1".into(),
            lobby: None,
        }))
        .await
        .unwrap();

        // Answer the first correlated request, then wait for the close.
        while let Some(Ok(msg)) = ws.next().await {
            if !msg.is_binary() && !msg.is_text() {
                break;
            }
            let frame: ClientFrame = serde_json::from_slice(&msg.into_data()).unwrap();
            if let ClientFrame::TicketRequest { cid } = frame {
                ws.send(encode(&ServerFrame::TicketOk {
                    cid,
                    ticket: "tic-1".into(),
                    user: profile(),
                }))
                .await
                .unwrap();
            }
        }
    });

    let joined = RoomConnection::open(
        &WebSocketConnector::new(),
        RoomTarget::Identity,
        &format!("ws://{addr}"),
        join_frame(),
        &RoomConfig::default(),
    )
    .await
    .unwrap();
    assert_eq!(joined.session_id, "sess-ws-1");

    let reply = joined
        .connection
        .request(|cid| ClientFrame::TicketRequest { cid })
        .await
        .unwrap();
    match reply {
        ServerFrame::TicketOk { ticket, user, .. } => {
            assert_eq!(ticket, "tic-1");
            assert_eq!(user.display_name, "Alice");
        }
        other => panic!("expected TicketOk, got {other:?}"),
    }

    joined.connection.close().await;
    server.await.unwrap();
}

#[tokio::test]
async fn test_websocket_room_rejection_surfaces_code() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        let _join = ws.next().await.unwrap().unwrap();
        ws.send(encode(&ServerFrame::Reject {
            code: ErrorCode::TicketExpired,
            message: "ticket aged out".into(),
        }))
        .await
        .unwrap();
    });

    let err = RoomConnection::open(
        &WebSocketConnector::new(),
        RoomTarget::World,
        &format!("ws://{addr}"),
        ClientFrame::JoinWorld {
            ticket: "stale".into(),
        },
        &RoomConfig::default(),
    )
    .await
    .unwrap_err();

    match err {
        RoomError::Rejected { code, .. } => assert_eq!(code, ErrorCode::TicketExpired),
        other => panic!("expected Rejected, got {other:?}"),
    }
    server.await.unwrap();
}
