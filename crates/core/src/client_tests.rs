// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use crate::error::CallError;
use crate::transport::transport_tests::MockTransport;
use crate::transport::EventSender;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn setup(builder: RpcClientBuilder) -> (RpcClient, MockTransport, EventSender) {
    let transport = MockTransport::new();
    let (tx, rx) = event_channel();
    let client = builder.with_transport(transport.clone(), rx);
    (client, transport, tx)
}

fn connected() -> (RpcClient, MockTransport, EventSender) {
    let (client, transport, tx) = setup(RpcClient::builder(ClientConfig::default()));
    client.handle_event(TransportEvent::Open);
    (client, transport, tx)
}

fn reply(id: u64, result: Value) -> TransportEvent {
    TransportEvent::Message(json!({"id": id, "result": result}).to_string())
}

fn status_log() -> (Arc<Mutex<Vec<Status>>>, impl Fn(Status) + Send + Sync) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    (log, move |status| sink.lock().unwrap().push(status))
}

#[tokio::test]
async fn calls_get_sequential_ids_in_call_envelope() {
    let (client, transport, _tx) = connected();

    client.call(json!([0, "get_objects", [["1.2.3"]]])).unwrap();
    client.call(json!([0, "get_block", [7]])).unwrap();

    assert_eq!(
        transport.sent_requests(),
        vec![
            json!({"method": "call", "params": [0, "get_objects", [["1.2.3"]]], "id": 0}),
            json!({"method": "call", "params": [0, "get_block", [7]], "id": 1}),
        ]
    );
    assert_eq!(client.pending_calls(), 2);
}

#[tokio::test]
async fn responses_route_by_id_in_any_order() {
    let (client, _transport, _tx) = connected();
    let first = client.call(json!([0, "a", []])).unwrap();
    let second = client.call(json!([0, "b", []])).unwrap();

    client.handle_event(reply(1, json!("b")));
    client.handle_event(reply(0, json!("a")));

    assert_eq!(second.await, Ok(json!("b")));
    assert_eq!(first.await, Ok(json!("a")));
    assert_eq!(client.pending_calls(), 0);
}

#[tokio::test]
async fn remote_error_rejects_call() {
    let (client, _transport, _tx) = connected();
    let pending = client.call(json!([0, "bad", []])).unwrap();

    client.handle_event(TransportEvent::Message(
        r#"{"id":0,"error":{"message":"no such method"}}"#.to_string(),
    ));

    assert_eq!(
        pending.await,
        Err(CallError::Remote(json!({"message": "no such method"})))
    );
}

#[tokio::test]
async fn unparsable_and_unknown_messages_are_dropped() {
    let (client, _transport, _tx) = connected();
    let mut pending = client.call(json!([0, "a", []])).unwrap();

    client.handle_event(TransportEvent::Message("not json".to_string()));
    client.handle_event(reply(42, json!(null)));
    client.handle_event(TransportEvent::Message(r#"{"method":"notice"}"#.to_string()));

    assert!(pending.try_result().is_none());
    assert_eq!(client.pending_calls(), 1);
}

#[tokio::test]
async fn close_rejects_everything_and_restarts_ids() {
    let (client, transport, _tx) = connected();
    let rejected = Arc::new(Mutex::new(Vec::new()));
    let resolved = Arc::new(AtomicUsize::new(0));

    let first = client.call(json!([0, "a", []])).unwrap();
    let on_resolve = resolved.clone();
    let on_reject = rejected.clone();
    let second = client
        .call_with_callback(
            json!([2, BROADCAST, [null, {}]]),
            MethodCallback::with_reject(
                move || {
                    on_resolve.fetch_add(1, Ordering::SeqCst);
                },
                move |err| on_reject.lock().unwrap().push(err),
            ),
        )
        .unwrap();
    let on_resolve = resolved.clone();
    client
        .call_with_callback(
            json!([2, BROADCAST, [null, {}]]),
            MethodCallback::resolve_only(move || {
                on_resolve.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();

    client.handle_event(TransportEvent::Close);

    assert_eq!(first.await, Err(CallError::ConnectionClosed));
    assert_eq!(second.await, Err(CallError::ConnectionClosed));
    assert_eq!(*rejected.lock().unwrap(), vec![CallError::ConnectionClosed]);
    assert_eq!(resolved.load(Ordering::SeqCst), 0);
    assert_eq!(client.pending_calls(), 0);
    assert_eq!(client.pending_callbacks(), 0);
    assert_eq!(client.state(), ConnectionState::Closed);

    client.handle_event(TransportEvent::Open);
    client.call(json!([0, "again", []])).unwrap();
    assert_eq!(transport.sent_requests().last().unwrap()["id"], 0);
}

const BROADCAST: &str = crate::rewrite::BROADCAST_WITH_CALLBACK;

#[tokio::test]
async fn method_callback_gets_call_id_and_settles_first() {
    let (client, transport, _tx) = connected();
    client.call(json!([0, "warmup", []])).unwrap();

    let order = Arc::new(Mutex::new(Vec::new()));
    let log = order.clone();
    let mut pending = client
        .call_with_callback(
            json!([2, BROADCAST, [null, {"ref_block_num": 1}]]),
            MethodCallback::resolve_only(move || log.lock().unwrap().push("callback")),
        )
        .unwrap();

    let sent = transport.sent_requests();
    assert_eq!(sent[1]["id"], 1);
    assert_eq!(sent[1]["params"][2][0], 1);
    assert_eq!(client.pending_callbacks(), 1);

    client.handle_event(reply(1, json!(null)));
    order.lock().unwrap().push("after dispatch");

    assert_eq!(*order.lock().unwrap(), vec!["callback", "after dispatch"]);
    assert_eq!(pending.try_result(), Some(Ok(Value::Null)));
    assert_eq!(client.pending_callbacks(), 0);
}

#[tokio::test]
async fn callback_without_rule_fails_without_sending() {
    let (client, transport, _tx) = connected();

    let err = client
        .call_with_callback(json!([2, "subscribe", []]), MethodCallback::resolve_only(|| {}))
        .unwrap_err();

    assert!(matches!(err, Error::NoCallbackRule(ref method) if method == "subscribe"));
    assert!(transport.get_outgoing().is_empty());

    client.call(json!([0, "a", []])).unwrap();
    assert_eq!(transport.sent_requests()[0]["id"], 0);
}

#[tokio::test]
async fn custom_callback_rule_is_used() {
    struct Subscribe;

    impl CallbackRule for Subscribe {
        fn method(&self) -> &str {
            "set_subscribe_callback"
        }

        fn substitute(&self, params: &mut Value, token: Value) -> Result<()> {
            params[2] = json!([token, true]);
            Ok(())
        }
    }

    let (client, transport, _tx) =
        setup(RpcClient::builder(ClientConfig::default()).callback_rule(Subscribe));
    client.handle_event(TransportEvent::Open);

    client
        .call_with_callback(
            json!([0, "set_subscribe_callback", []]),
            MethodCallback::resolve_only(|| {}),
        )
        .unwrap();

    assert_eq!(transport.sent_requests()[0]["params"][2], json!([0, true]));
}

#[tokio::test]
async fn ready_resolves_on_first_open() {
    let (client, _transport, _tx) = setup(RpcClient::builder(ClientConfig::default()));
    assert_eq!(client.state(), ConnectionState::Connecting);

    client.handle_event(TransportEvent::Open);

    tokio::time::timeout(Duration::from_secs(1), client.ready())
        .await
        .expect("ready settles")
        .unwrap();
    assert_eq!(client.state(), ConnectionState::Open);
}

#[tokio::test]
async fn error_before_first_open_fails_readiness() {
    let (client, _transport, _tx) = setup(RpcClient::builder(ClientConfig::default()));

    client.handle_event(TransportEvent::Error("connection refused".to_string()));
    client.handle_event(TransportEvent::Open);

    let err = client.ready().await.unwrap_err();
    assert!(matches!(err, Error::Connect(ref reason) if reason == "connection refused"));
}

#[tokio::test]
async fn error_after_ready_rejects_only_latest_call() {
    let (client, _transport, _tx) = connected();
    let mut older = client.call(json!([0, "a", []])).unwrap();
    let latest = client.call(json!([0, "b", []])).unwrap();

    client.handle_event(TransportEvent::Error("send failed".to_string()));

    assert_eq!(
        latest.await,
        Err(CallError::Transport("send failed".to_string()))
    );
    assert!(older.try_result().is_none());
    assert_eq!(client.pending_calls(), 1);
    assert!(client.ready().await.is_ok());

    client.handle_event(TransportEvent::Error("again".to_string()));
    assert!(older.try_result().is_none());
}

#[tokio::test]
async fn status_hook_sees_every_transition() {
    let (log, hook) = status_log();
    let reconnects = Arc::new(AtomicUsize::new(0));
    let counter = reconnects.clone();
    let (client, _transport, _tx) = setup(
        RpcClient::builder(ClientConfig::default())
            .on_status(hook)
            .on_reconnect(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
    );

    client.handle_event(TransportEvent::Open);
    assert_eq!(reconnects.load(Ordering::SeqCst), 0);
    client.handle_event(TransportEvent::Error("reset".to_string()));
    client.handle_event(TransportEvent::Close);
    client.handle_event(TransportEvent::Open);
    assert_eq!(reconnects.load(Ordering::SeqCst), 1);
    client.handle_event(TransportEvent::Close);
    client.handle_event(TransportEvent::Open);
    assert_eq!(reconnects.load(Ordering::SeqCst), 2);

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            Status::Open,
            Status::Error,
            Status::Closed,
            Status::Open,
            Status::Closed,
            Status::Open
        ]
    );
}

#[tokio::test]
async fn close_is_idempotent_and_final() {
    let (log, hook) = status_log();
    let (client, transport, _tx) =
        setup(RpcClient::builder(ClientConfig::default()).on_status(hook));
    client.handle_event(TransportEvent::Open);
    let pending = client.call(json!([0, "a", []])).unwrap();

    client.close();
    client.close();

    assert!(transport.is_closed());
    assert!(client.is_closed());
    assert_eq!(pending.await, Err(CallError::ConnectionClosed));
    assert_eq!(*log.lock().unwrap(), vec![Status::Open, Status::Closed]);

    let late = client.call(json!([0, "b", []])).unwrap();
    assert_eq!(late.await, Err(CallError::ConnectionClosed));
    assert_eq!(transport.get_outgoing().len(), 1);

    client.handle_event(TransportEvent::Open);
    client.handle_event(reply(0, json!(1)));
    assert_eq!(log.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn close_from_status_hook_ends_status_stream() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let handle: Arc<std::sync::OnceLock<RpcClient>> = Arc::new(std::sync::OnceLock::new());

    let sink = log.clone();
    let closer = handle.clone();
    let (client, transport, _tx) = setup(RpcClient::builder(ClientConfig::default()).on_status(
        move |status| {
            sink.lock().unwrap().push(status);
            if status == Status::Open {
                if let Some(client) = closer.get() {
                    client.close();
                }
            }
        },
    ));
    handle.set(client.clone()).unwrap();

    client.handle_event(TransportEvent::Open);
    client.handle_event(TransportEvent::Error("late".to_string()));
    client.handle_event(TransportEvent::Open);

    assert!(transport.is_closed());
    assert_eq!(client.state(), ConnectionState::Closed);
    assert_eq!(*log.lock().unwrap(), vec![Status::Open, Status::Closed]);
}

#[tokio::test]
async fn events_after_close_leave_state_untouched() {
    let (client, _transport, _tx) = setup(RpcClient::builder(ClientConfig::default()));
    client.close();

    client.handle_event(TransportEvent::Open);
    assert_eq!(client.state(), ConnectionState::Closed);

    client.handle_event(TransportEvent::Error("refused".to_string()));
    let pending = tokio::time::timeout(Duration::from_millis(50), client.ready()).await;
    assert!(pending.is_err(), "readiness must stay pending after close");
}

#[tokio::test]
async fn callbacks_may_reenter_the_client() {
    let (client, transport, _tx) = connected();
    let reentrant = client.clone();

    client
        .call_with_callback(
            json!([2, BROADCAST, [null, {}]]),
            MethodCallback::resolve_only(move || {
                reentrant.call(json!([0, "follow_up", []])).unwrap();
            }),
        )
        .unwrap();

    client.handle_event(reply(0, json!(null)));

    assert_eq!(transport.sent_requests()[1]["params"][1], "follow_up");
    assert_eq!(client.pending_calls(), 1);
}

#[tokio::test]
async fn get_api_by_name_sends_lookup() {
    let (client, transport, _tx) = connected();
    let pending = client.get_api_by_name("network_broadcast").unwrap();

    assert_eq!(
        transport.sent_requests()[0]["params"],
        json!([1, "get_api_by_name", ["network_broadcast"]])
    );

    client.handle_event(reply(0, json!(2)));
    assert_eq!(pending.await, Ok(json!(2)));
}

#[tokio::test]
async fn login_waits_for_readiness() {
    let (client, transport, tx) = setup(RpcClient::builder(ClientConfig::default()));

    let login = tokio::spawn({
        let client = client.clone();
        async move { client.login("alice", "secret").await }
    });
    tokio::task::yield_now().await;
    assert!(transport.get_outgoing().is_empty());

    tx.send(TransportEvent::Open).unwrap();
    for _ in 0..100 {
        if !transport.get_outgoing().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(
        transport.sent_requests()[0]["params"],
        json!([1, "login", ["alice", "secret"]])
    );

    tx.send(reply(0, json!(true))).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(1), login)
        .await
        .expect("login settles")
        .unwrap();
    assert_eq!(result.unwrap(), json!(true));
}

#[tokio::test]
async fn events_flow_through_pump() {
    let (client, _transport, tx) = setup(RpcClient::builder(ClientConfig::default()));
    let pending = client.call(json!([0, "a", []])).unwrap();

    tx.send(TransportEvent::Open).unwrap();
    tx.send(reply(0, json!("pumped"))).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(1), pending)
        .await
        .expect("reply settles");
    assert_eq!(result, Ok(json!("pumped")));
}

#[tokio::test]
async fn dropping_last_handle_closes_transport() {
    let (client, transport, _tx) = connected();
    let pending = client.call(json!([0, "a", []])).unwrap();

    drop(client);

    assert!(transport.is_closed());
    assert_eq!(pending.await, Err(CallError::ConnectionClosed));
}

#[tokio::test]
async fn oldest_pending_tracks_outstanding_calls() {
    let (client, _transport, _tx) = connected();
    assert!(client.oldest_pending().is_none());

    let before = Utc::now();
    client.call(json!([0, "a", []])).unwrap();
    let oldest = client.oldest_pending().unwrap();
    assert!(oldest >= before);

    client.handle_event(reply(0, json!(null)));
    assert!(client.oldest_pending().is_none());
}
