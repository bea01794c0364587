mod common;

use common::*;
use gvcomm::network::error::Error as NetworkError;
use gvcomm::transport::{Error, Info, Link, Payload, QoS, Transport, TransportListener};

#[test]
fn construction_has_no_side_effects() {
    let journal = Journal::default();
    let _transport = Transport::new(MockDriver::new(&journal));
    assert!(journal.entries().is_empty());
}

#[test]
fn subscribing_twice_delivers_once() {
    let stage = Stage::new("");
    let journal = Journal::default();
    let transport = Transport::new(MockDriver::new(&journal));

    transport.subscribe("/t", &stage).unwrap();
    transport.subscribe("/t", &stage).unwrap();
    transport.callback("/t", b"X");

    assert_eq!(transport.subscriber_count("/t"), 1);
    assert_eq!(stage.received(), ["X"]);
}

#[test]
fn subscribers_form_a_pipeline() {
    let first = Stage::new("A");
    let second = Stage::new("B");
    let journal = Journal::default();
    let transport = Transport::new(MockDriver::new(&journal));

    transport.subscribe("/t", &first).unwrap();
    transport.subscribe("/t", &second).unwrap();
    transport.callback("/t", b"X");

    assert_eq!(first.received(), ["X"]);
    assert_eq!(second.received(), ["XA"]);
}

#[test]
fn closures_can_be_subscribed() {
    let seen = std::sync::Mutex::new(Vec::new());
    let record = |payload: Payload| {
        seen.lock().unwrap().push(payload.to_vec());
        payload
    };
    let journal = Journal::default();
    let transport = Transport::new(MockDriver::new(&journal));

    transport.subscribe("/t", &record).unwrap();
    transport.callback("/t", b"on");

    assert_eq!(*seen.lock().unwrap(), [b"on".to_vec()]);
}

#[test]
fn unknown_topic_is_a_no_op() {
    let stage = Stage::new("");
    let listener = RecordingListener::default();
    let journal = Journal::default();
    let transport = Transport::new(MockDriver::new(&journal));
    transport.add_listener(&listener).unwrap();
    transport.subscribe("/known", &stage).unwrap();
    let before = journal.entries();

    transport.callback("/unknown", b"X");

    assert!(stage.received().is_empty());
    assert_eq!(journal.entries(), before);
    assert_eq!(listener.events(), ["subscribe"]);
}

#[test]
fn oversized_inbound_payload_is_dropped() {
    let stage = Stage::new("");
    let journal = Journal::default();
    let transport = Transport::new(MockDriver::new(&journal));
    transport.subscribe("/t", &stage).unwrap();

    transport.callback("/t", &[b'x'; gvcomm::transport::MAX_PAYLOAD_LEN + 1]);

    assert!(stage.received().is_empty());
}

#[test]
fn connect_failure_is_notified_not_returned() {
    let listener = RecordingListener::default();
    let journal = Journal::default();
    let mut driver = MockDriver::new(&journal);
    driver.connect_error = Some(Error::Network(NetworkError::ConnectionRefused));
    let transport = Transport::new(driver);
    transport.add_listener(&listener).unwrap();

    transport.connect();

    assert_eq!(
        listener.seen(),
        [Seen {
            event: "connect_failed",
            topic: None,
            failure: Some(Error::Network(NetworkError::ConnectionRefused)),
        }]
    );
}

#[test]
fn successful_connect_is_notified() {
    let listener = RecordingListener::default();
    let journal = Journal::default();
    let transport = Transport::new(MockDriver::new(&journal));
    transport.add_listener(&listener).unwrap();

    transport.connect();

    assert_eq!(journal.driver_calls(), [Call::Connect]);
    assert_eq!(
        listener.seen(),
        [Seen {
            event: "connect",
            topic: None,
            failure: None,
        }]
    );
}

#[test]
fn before_disconnect_precedes_driver_teardown() {
    let journal = Journal::default();
    let listener = RecordingListener::with_journal(&journal);
    let transport = Transport::new(MockDriver::new(&journal));
    transport.add_listener(&listener).unwrap();

    transport.shutdown().unwrap();

    assert_eq!(
        journal.entries(),
        [
            Entry::Listener("before_disconnect"),
            Entry::Driver(Call::Shutdown)
        ]
    );
}

/// Says goodbye through the transport it is being told about.
struct Farewell;

impl TransportListener for Farewell {
    fn on_before_disconnect(&self, info: &Info<'_>) {
        info.transport
            .send("/devices/dev1/status", br#"{"st":"offline"}"#, QoS::AtMostOnce, false)
            .unwrap();
    }
}

#[test]
fn listener_can_send_before_disconnect() {
    let farewell = Farewell;
    let journal = Journal::default();
    let transport = Transport::new(MockDriver::new(&journal));
    transport.add_listener(&farewell).unwrap();

    transport.shutdown().unwrap();

    assert_eq!(
        journal.sends(),
        [(
            "/devices/dev1/status".to_string(),
            r#"{"st":"offline"}"#.to_string()
        )]
    );
    assert_eq!(journal.driver_calls().last(), Some(&Call::Shutdown));
}

#[test]
fn listener_set_semantics() {
    let listener = RecordingListener::default();
    let journal = Journal::default();
    let transport = Transport::new(MockDriver::new(&journal));

    assert_eq!(transport.add_listener(&listener), Ok(true));
    assert_eq!(transport.add_listener(&listener), Ok(false));
    assert_eq!(transport.listener_count(), 1);

    transport.connect();
    assert_eq!(listener.events(), ["connect"]);

    assert!(transport.remove_listener(&listener));
    assert!(!transport.remove_listener(&listener));
    transport.connect();
    transport.shutdown().unwrap();
    assert_eq!(listener.events(), ["connect"]);
}

#[test]
fn subscribe_notifies_with_topic() {
    let stage = Stage::new("");
    let listener = RecordingListener::default();
    let journal = Journal::default();
    let transport = Transport::new(MockDriver::new(&journal));
    transport.add_listener(&listener).unwrap();

    transport.subscribe("/devices/dev1/input", &stage).unwrap();

    assert_eq!(
        journal.driver_calls(),
        [Call::Subscribe("/devices/dev1/input".into())]
    );
    assert_eq!(
        listener.seen(),
        [Seen {
            event: "subscribe",
            topic: Some("/devices/dev1/input".into()),
            failure: None,
        }]
    );
}

#[test]
fn subscribe_failure_propagates_without_notification() {
    let stage = Stage::new("");
    let listener = RecordingListener::default();
    let journal = Journal::default();
    let mut driver = MockDriver::new(&journal);
    driver.subscribe_error = Some(Error::Network(NetworkError::Rejected(0x80)));
    let transport = Transport::new(driver);
    transport.add_listener(&listener).unwrap();

    assert_eq!(
        transport.subscribe("/t", &stage),
        Err(Error::Network(NetworkError::Rejected(0x80)))
    );
    assert!(listener.events().is_empty());

    // The registration stays, so data the driver still delivers arrives.
    transport.callback("/t", b"late");
    assert_eq!(stage.received(), ["late"]);
}

#[test]
fn last_unsubscribe_tells_listeners_then_driver() {
    let first = Stage::new("");
    let second = Stage::new("");
    let journal = Journal::default();
    let listener = RecordingListener::with_journal(&journal);
    let transport = Transport::new(MockDriver::new(&journal));
    transport.subscribe("/t", &first).unwrap();
    transport.subscribe("/t", &second).unwrap();
    transport.add_listener(&listener).unwrap();

    assert_eq!(transport.unsubscribe("/t", &first), Ok(true));
    assert!(listener.events().is_empty());

    assert_eq!(transport.unsubscribe("/t", &second), Ok(true));
    assert_eq!(transport.unsubscribe("/t", &second), Ok(false));
    assert_eq!(transport.subscriber_count("/t"), 0);

    let tail: Vec<_> = journal.entries().into_iter().rev().take(2).collect();
    assert_eq!(
        tail,
        [
            Entry::Driver(Call::Unsubscribe("/t".into())),
            Entry::Listener("before_unsubscribe"),
        ]
    );
}

#[test]
fn poll_dispatches_everything_pending() {
    let stage = Stage::new("");
    let journal = Journal::default();
    let mut driver = MockDriver::new(&journal);
    driver.deliver("/t", b"one");
    driver.deliver("/other", b"ignored");
    driver.deliver("/t", b"two");
    let transport = Transport::new(driver);
    transport.subscribe("/t", &stage).unwrap();

    transport.poll().unwrap();

    assert_eq!(stage.received(), ["one", "two"]);
    assert_eq!(transport.with_driver(|driver| driver.inbox.len()), Ok(0));
}

#[test]
fn connection_loss_while_polling_is_notified() {
    let listener = RecordingListener::default();
    let journal = Journal::default();
    let mut driver = MockDriver::new(&journal);
    driver
        .inbox
        .push_back(Err(Error::Network(NetworkError::ConnectionClosed)));
    let transport = Transport::new(driver);
    transport.add_listener(&listener).unwrap();

    assert_eq!(transport.poll(), Ok(()));
    assert_eq!(
        listener.seen(),
        [Seen {
            event: "connection_lost",
            topic: None,
            failure: Some(Error::Network(NetworkError::ConnectionClosed)),
        }]
    );
}

#[test]
fn other_poll_errors_propagate() {
    let listener = RecordingListener::default();
    let journal = Journal::default();
    let mut driver = MockDriver::new(&journal);
    driver
        .inbox
        .push_back(Err(Error::Network(NetworkError::ProtocolError)));
    let transport = Transport::new(driver);
    transport.add_listener(&listener).unwrap();

    assert_eq!(
        transport.poll(),
        Err(Error::Network(NetworkError::ProtocolError))
    );
    assert!(listener.events().is_empty());
}

#[test]
fn missing_capabilities_report_not_implemented() {
    let stage = Stage::new("");
    let listener = RecordingListener::default();
    let transport = Transport::new(BareDriver);
    transport.add_listener(&listener).unwrap();

    transport.connect();
    assert_eq!(
        transport.send("/t", b"x", QoS::AtMostOnce, false),
        Err(Error::NotImplemented)
    );
    assert_eq!(transport.poll(), Err(Error::NotImplemented));
    assert_eq!(transport.subscribe("/t", &stage), Err(Error::NotImplemented));
    assert_eq!(transport.shutdown(), Ok(()));
    assert_eq!(listener.events(), ["connect", "before_disconnect"]);
}

#[test]
fn nested_driver_use_is_busy() {
    let journal = Journal::default();
    let transport = Transport::new(MockDriver::new(&journal));

    let nested = transport.with_driver(|_| transport.send("/t", b"x", QoS::AtMostOnce, false));

    assert_eq!(nested, Ok(Err(Error::Busy)));
    assert!(journal.sends().is_empty());
}

#[test]
fn link_reports_subscriber_count() {
    let stage = Stage::new("");
    let journal = Journal::default();
    let transport = Transport::new(MockDriver::new(&journal));
    transport.subscribe("/t", &stage).unwrap();

    let link: &dyn Link = &transport;
    assert_eq!(link.subscriber_count("/t"), 1);
    assert_eq!(link.subscriber_count("/u"), 0);
}

#[test]
fn dispatch_runs_concurrently_with_subscription() {
    let early = Stage::new("");
    let late = Stage::new("");
    let journal = Journal::default();
    let transport = Transport::new(MockDriver::new(&journal));
    transport.subscribe("/t", &early).unwrap();
    let dispatcher = transport.dispatcher();

    std::thread::scope(|scope| {
        let delivery = scope.spawn(|| {
            for _ in 0..500 {
                dispatcher.callback("/t", b"x");
            }
        });
        for i in 0..8 {
            dispatcher.subscribe(&format!("/extra/{}", i), &late).unwrap();
        }
        dispatcher.subscribe("/t", &late).unwrap();
        delivery.join().unwrap();
    });

    assert_eq!(early.received().len(), 500);
    assert!(late.received().len() <= 500);

    // Once subscribe has returned, the next delivery includes it.
    let before = late.received().len();
    transport.callback("/t", b"y");
    assert_eq!(late.received().len(), before + 1);
    assert_eq!(transport.subscriber_count("/extra/7"), 1);
}
