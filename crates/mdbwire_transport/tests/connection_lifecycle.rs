use std::net::TcpListener;
use std::time::{Duration, Instant};

use mdbwire_core::{ConnectionConfig, DriverError, EncodeError, ErrorKind, Parameters, Scheme};
use mdbwire_protocol::{DRIVER_PREAMBLE, DataType, IoBuffer, RequestType, SERVER_PREAMBLE};
use mdbwire_test_support::FakeServer;
use mdbwire_transport::{ConnectionState, DriverClient, SocketConnection};

#[test]
fn correct_server_preamble_makes_connection_ready() {
    let server = FakeServer::new().spawn();

    let mut connection = SocketConnection::connect(&server.config()).unwrap();
    assert_eq!(connection.state(), ConnectionState::Ready);
    connection.close();

    let capture = server.join();
    assert_eq!(capture.preamble, DRIVER_PREAMBLE.to_vec());
    assert!(capture.received.is_empty());
}

#[test]
fn seven_byte_reply_then_close_is_a_connection_error() {
    let server = FakeServer::new()
        .with_handshake_reply(&SERVER_PREAMBLE[..7])
        .close_after_reply()
        .spawn();

    let err = SocketConnection::connect(&server.config())
        .err()
        .expect("handshake should fail");

    assert_eq!(err.kind(), ErrorKind::Connection);
    match err {
        DriverError::HandshakeMismatch { actual, .. } => assert_eq!(actual.len(), 7),
        other => panic!("unexpected error: {other:?}"),
    }
    server.join();
}

#[test]
fn wrong_server_preamble_is_a_connection_error() {
    let server = FakeServer::new().with_handshake_reply(b"NOT_MDB!").spawn();

    let err = SocketConnection::connect(&server.config())
        .err()
        .expect("handshake should fail");

    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(err.to_string().contains(&server.addr().to_string()));
    assert!(matches!(
        err,
        DriverError::HandshakeMismatch { ref actual, .. } if actual == b"NOT_MDB!"
    ));

    // The failed handshake closed the client side, so the capture completes.
    let capture = server.join();
    assert!(capture.received.is_empty());
}

#[test]
fn secure_scheme_falls_back_to_plaintext() {
    let server = FakeServer::new().spawn();

    let config = server.config_with_scheme(Scheme::Tls);
    let mut connection = SocketConnection::connect(&config).unwrap();
    assert!(connection.is_ready());
    connection.close();

    server.join();
}

#[test]
fn refused_connection_reports_address() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = ConnectionConfig::new("127.0.0.1", port, Scheme::Tcp);
    let err = SocketConnection::connect(&config)
        .err()
        .expect("nothing is listening");

    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(err.to_string().contains(&format!("127.0.0.1:{port}")));
}

#[test]
fn handshake_runs_only_once() {
    let server = FakeServer::new().spawn();

    let mut connection = SocketConnection::connect(&server.config()).unwrap();
    let err = connection.handshake().unwrap_err();

    assert!(matches!(
        err,
        DriverError::InvalidState {
            state: "ready",
            operation: "handshake",
            ..
        }
    ));
    assert!(connection.is_ready());
    connection.close();
    server.join();
}

#[test]
fn open_then_handshake_walks_the_state_machine() {
    let server = FakeServer::new().spawn();

    let mut connection = SocketConnection::open(&server.config()).unwrap();
    assert_eq!(connection.state(), ConnectionState::HandshakeInProgress);
    assert!(connection.send_all(b"early").is_err());

    connection.handshake().unwrap();
    assert_eq!(connection.state(), ConnectionState::Ready);

    connection.close();
    connection.close();
    assert_eq!(connection.state(), ConnectionState::Closed);
    assert!(server.join().received.is_empty());
}

#[test]
fn cancel_request_reaches_the_server_byte_exact() {
    let server = FakeServer::new().spawn();

    let mut client = DriverClient::connect_url(&server.url()).unwrap();
    client.cancel(3, "abc").unwrap();
    client.close();

    let mut expected = vec![RequestType::Cancel.as_u8(), 0, 0, 0, 3];
    expected.push(DataType::String.as_u8());
    expected.extend_from_slice(&[0, 0, 0, 3]);
    expected.extend_from_slice(b"abc");

    assert_eq!(server.join().received, expected);
}

#[test]
fn rejected_parameters_send_nothing_and_keep_connection() {
    let server = FakeServer::new().spawn();
    let mut client = DriverClient::connect(&server.config()).unwrap();

    let params = Parameters::new().with("a", 1).with(1, "x");
    let err = client.run("RETURN ?a", &params).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ProtocolEncoding);
    assert!(matches!(
        err,
        DriverError::Encoding(EncodeError::NonStringParameterKey { .. })
    ));
    assert!(client.connection().is_ready());

    client.catalog().unwrap();
    client.close();

    assert_eq!(server.join().received, vec![RequestType::Catalog.as_u8()]);
}

#[test]
fn receive_appends_exactly_the_requested_bytes() {
    let server = FakeServer::new().with_response(b"0123456789").spawn();
    let mut client = DriverClient::connect(&server.config()).unwrap();

    let mut buffer = IoBuffer::with_capacity(2);
    buffer.append(b"xx");

    client.receive_into(&mut buffer, 4).unwrap();
    assert_eq!(buffer.used(), b"xx0123");

    client.receive_into(&mut buffer, 6).unwrap();
    assert_eq!(buffer.used(), b"xx0123456789");

    client.close();
    server.join();
}

#[test]
fn peer_closing_mid_read_is_a_transport_error() {
    let server = FakeServer::new()
        .with_response(b"12345")
        .close_after_reply()
        .spawn();
    let mut connection = SocketConnection::connect(&server.config()).unwrap();

    let mut buffer = IoBuffer::new();
    buffer.append(b"head");

    let err = connection.receive_exactly_into(&mut buffer, 10).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TransportIo);
    assert!(err.to_string().contains("no data received"));
    assert_eq!(buffer.used(), b"head");
    assert_eq!(connection.state(), ConnectionState::Closed);

    let err = connection.send_all(b"late").unwrap_err();
    assert!(matches!(err, DriverError::InvalidState { state: "closed", .. }));

    server.join();
}

#[test]
fn slow_reply_after_handshake_is_not_cut_off_by_connection_timeout() {
    let server = FakeServer::new()
        .with_response(b"late result")
        .with_response_delay(Duration::from_millis(800))
        .spawn();
    let config = server.config_with_timeout(Duration::from_millis(200));
    let mut connection = SocketConnection::connect(&config).unwrap();

    let started = Instant::now();
    let mut buffer = IoBuffer::new();
    connection.receive_exactly_into(&mut buffer, 11).unwrap();

    assert!(started.elapsed() >= Duration::from_millis(200));
    assert_eq!(buffer.used(), b"late result");
    assert!(connection.is_ready());

    connection.close();
    server.join();
}

#[test]
fn silent_server_times_out_the_handshake() {
    let server = FakeServer::new()
        .with_handshake_delay(Duration::from_millis(800))
        .close_after_reply()
        .spawn();
    let config = server.config_with_timeout(Duration::from_millis(200));

    let err = SocketConnection::connect(&config)
        .err()
        .expect("handshake should time out");

    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(matches!(err, DriverError::HandshakeIo { .. }));
    // The server's late reply may hit a reset socket, so its result is not checked.
}
