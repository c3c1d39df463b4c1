//! ReaderLink over a real TCP socket.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use trackside_errors::ReaderError;
use trackside_link::{Connector, ReaderLink, TcpConnector};
use trackside_llrp_protocol::{
    Envelope, HEADER_LEN, LlrpStatus, Message, MessageHeader, MessageType,
};

type TestResult = Result<(), Box<dyn std::error::Error>>;

async fn read_request(socket: &mut TcpStream) -> Result<Envelope, Box<dyn std::error::Error + Send + Sync>> {
    let mut header = [0u8; HEADER_LEN];
    socket.read_exact(&mut header).await?;
    let length = MessageHeader::decode(&header)?.length as usize;
    let mut frame = header.to_vec();
    frame.resize(length, 0);
    socket.read_exact(frame.get_mut(HEADER_LEN..).unwrap_or_default()).await?;
    Ok(Envelope::decode(&frame)?)
}

#[tokio::test]
async fn test_transact_round_trip_over_tcp() -> TestResult {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?.to_string();

    let reader = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await?;
        let request = read_request(&mut socket).await?;
        let keepalive = Message::Keepalive.encode(900)?;
        let response = Message::EnableRoSpecResponse {
            status: Some(LlrpStatus::success()),
        }
        .encode(request.message_id)?;
        socket.write_all(&keepalive).await?;
        socket.write_all(&response).await?;
        socket.flush().await?;
        let ack = read_request(&mut socket).await?;
        Ok::<_, Box<dyn std::error::Error + Send + Sync>>((request, ack))
    });

    let transport = TcpConnector::default()
        .connect(&addr, Duration::from_secs(2))
        .await?;
    let mut link = ReaderLink::new("finish-line", transport);
    let response = link
        .transact(&Message::EnableRoSpec { ro_spec_id: 123 }, Duration::from_secs(2))
        .await?;
    assert!(response.message.answers(MessageType::EnableRoSpec));

    let queued = link.receive(Duration::from_millis(100)).await?;
    assert_eq!(queued.map(|e| e.message), Some(Message::Keepalive));
    link.send(&Message::KeepaliveAck).await?;
    link.close().await?;

    let (request, ack) = reader.await?.map_err(|e| e.to_string())?;
    assert_eq!(request.message, Message::EnableRoSpec { ro_spec_id: 123 });
    assert_eq!(request.message_id, response.message_id);
    assert_eq!(ack.message, Message::KeepaliveAck);
    assert!(ack.message_id > request.message_id);
    Ok(())
}

#[tokio::test]
async fn test_reader_hangup_during_transact_is_transport_error() -> TestResult {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?.to_string();
    let reader = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await?;
        let request = read_request(&mut socket).await?;
        drop(socket);
        Ok::<_, Box<dyn std::error::Error + Send + Sync>>(request)
    });

    let transport = TcpConnector::default()
        .connect(&addr, Duration::from_secs(2))
        .await?;
    let mut link = ReaderLink::new("finish-line", transport);
    let result = link
        .transact(&Message::DeleteRoSpec { ro_spec_id: 0 }, Duration::from_secs(2))
        .await;
    assert!(matches!(result, Err(ReaderError::Transport(_))));
    let request = reader.await?.map_err(|e| e.to_string())?;
    assert_eq!(request.message, Message::DeleteRoSpec { ro_spec_id: 0 });
    Ok(())
}
