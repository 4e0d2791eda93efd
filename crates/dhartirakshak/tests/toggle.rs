mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockClient, client, json_response};
use dhartirakshak::controller::{ListController, ToggleController, ToggleError};
use dhartirakshak::notify::{MemoryNotifier, Notification};
use dhartirakshak::resource::{NEWS, Resource, TRENDING_NEWS};
use dhartirakshak::session::StaticToken;
use dhartirakshak_common::error::AuthError;
use dhartirakshak_common::normalize::RecordExt;
use dhartirakshak_common::{ClientError, ItemId};
use http::Method;
use serde_json::{Value, json};

type List = ListController<Resource<MockClient>, StaticToken, MemoryNotifier>;

const LIST_PATH: &str = "/api/admin/trending-news";

async fn loaded(mock: &MockClient, items: Value) -> (Arc<List>, MemoryNotifier) {
    let notifier = MemoryNotifier::default();
    let list = Arc::new(ListController::new(
        client(mock).resource(&TRENDING_NEWS),
        StaticToken::new("admin-token"),
        notifier.clone(),
    ));
    mock.push_json(200, json!({ "data": items })).await;
    list.fetch().await.unwrap();
    mock.take_log().await;
    (list, notifier)
}

fn trending(list: &List, id: u64) -> bool {
    list.get(&ItemId::from(id)).unwrap().flag("is_trending")
}

#[tokio::test]
async fn failed_toggle_rolls_back_and_notifies() {
    let mock = MockClient::default();
    let (list, notifier) = loaded(&mock, json!([{ "id": 1, "is_trending": false }])).await;
    mock.route(
        Method::POST,
        "/api/admin/trending-news/1/mark-trending",
        Duration::from_millis(40),
        json_response(500, json!({ "message": "Server Error" })),
    )
    .await;

    let toggles = ToggleController::new(list.clone());
    let id = ItemId::from(1u64);
    let (result, during) = tokio::join!(toggles.toggle(&id), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        (trending(&list, 1), toggles.is_pending(&id))
    });

    // flipped while the request was out
    assert_eq!(during, (true, true));
    assert!(matches!(result, Err(ToggleError::Client(ClientError::Api(_)))));
    assert!(!trending(&list, 1));
    assert!(!toggles.is_pending(&id));
    assert_eq!(
        notifier.take(),
        vec![Notification::error("Update trending failed")]
    );

    let log = mock.take_log().await;
    assert_eq!(log.len(), 1, "no refetch after a failure");
    assert_eq!(log[0].method(), Method::POST);
    assert_eq!(log[0].body().as_slice(), b"{}");
    assert_eq!(
        log[0].headers().get(http::header::AUTHORIZATION).unwrap(),
        "Bearer admin-token"
    );
}

#[tokio::test]
async fn overlapping_toggles_settle_independently() {
    let mock = MockClient::default();
    let (list, notifier) = loaded(
        &mock,
        json!([
            { "id": 1, "is_trending": false },
            { "id": 2, "is_trending": false }
        ]),
    )
    .await;
    mock.route(
        Method::POST,
        "/api/admin/trending-news/1/mark-trending",
        Duration::from_millis(60),
        json_response(500, json!({})),
    )
    .await;
    mock.route(
        Method::POST,
        "/api/admin/trending-news/2/mark-trending",
        Duration::from_millis(20),
        json_response(200, json!({ "message": "ok" })),
    )
    .await;

    let toggles = ToggleController::new(list.clone()).refetch_on_success(false);
    let one = ItemId::from(1u64);
    let two = ItemId::from(2u64);
    let (first, second, during) = tokio::join!(toggles.toggle(&one), toggles.toggle(&two), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        (trending(&list, 1), trending(&list, 2))
    });

    assert_eq!(during, (true, true));
    assert!(first.is_err());
    assert!(second.unwrap());
    // 2's confirmed value survives 1's rollback
    assert!(!trending(&list, 1));
    assert!(trending(&list, 2));

    let seen = notifier.take();
    assert_eq!(
        seen,
        vec![
            Notification::success("Marked as trending"),
            Notification::error("Update trending failed"),
        ]
    );
}

#[tokio::test]
async fn success_refetches_and_takes_server_state() {
    let mock = MockClient::default();
    let (list, notifier) = loaded(&mock, json!([{ "id": 7, "is_trending": 1 }])).await;
    mock.push_json(200, json!({ "success": true })).await;
    // server reports the item still trending; the fetched state wins
    mock.push_json(200, json!([{ "id": 7, "is_trending": 1, "title": "Monsoon" }]))
        .await;

    let toggles = ToggleController::new(list.clone());
    let now = toggles.toggle(&ItemId::from(7u64)).await.unwrap();
    assert!(!now);
    assert!(trending(&list, 7));
    assert_eq!(list.get(&ItemId::from(7u64)).unwrap().text("title"), "Monsoon");
    assert_eq!(notifier.take(), vec![Notification::success("Unmarked trending")]);

    let log = mock.take_log().await;
    assert_eq!(log.len(), 2);
    assert_eq!(
        log[0].uri().path(),
        "/api/admin/trending-news/7/unmark-trending"
    );
    assert_eq!(log[1].method(), Method::GET);
    assert_eq!(log[1].uri().path(), LIST_PATH);
}

#[tokio::test]
async fn begin_and_settle_use_their_own_snapshots() {
    let mock = MockClient::default();
    let (list, _notifier) = loaded(
        &mock,
        json!([
            { "id": "a", "is_trending": false },
            { "id": "b", "is_trending": true }
        ]),
    )
    .await;
    let toggles = ToggleController::new(list.clone()).refetch_on_success(false);

    let a = toggles.begin(&ItemId::from("a")).unwrap();
    let b = toggles.begin(&ItemId::from("b")).unwrap();
    assert_eq!((a.previous, a.next), (false, true));
    assert_eq!((b.previous, b.next), (true, false));

    toggles.settle(b, Ok(Value::Null)).await.unwrap();
    let err = toggles
        .settle(a, Err(ClientError::invalid("refused")))
        .await
        .unwrap_err();
    assert!(matches!(err, ToggleError::Client(ClientError::InvalidInput(_))));

    let items = list.items();
    assert!(!items[0].flag("is_trending"));
    assert!(!items[1].flag("is_trending"));
    assert_eq!(mock.request_count().await, 0);
}

#[tokio::test]
async fn pending_guard_rejects_second_toggle() {
    let mock = MockClient::default();
    let (list, _notifier) = loaded(&mock, json!([{ "id": 3, "is_trending": false }])).await;
    let toggles = ToggleController::new(list.clone())
        .refetch_on_success(false)
        .reject_while_pending(true);
    let id = ItemId::from(3u64);

    let ticket = toggles.begin(&id).unwrap();
    assert!(toggles.is_pending(&id));
    assert!(matches!(toggles.toggle(&id).await, Err(ToggleError::Pending(_))));
    assert_eq!(mock.request_count().await, 0);
    // the rejected call left the first flip alone
    assert!(trending(&list, 3));

    toggles.settle(ticket, Ok(Value::Null)).await.unwrap();
    assert!(!toggles.is_pending(&id));
}

#[tokio::test]
async fn unguarded_toggles_chain_snapshots() {
    let mock = MockClient::default();
    let (list, _notifier) = loaded(&mock, json!([{ "id": 3, "is_trending": false }])).await;
    let toggles = ToggleController::new(list.clone()).refetch_on_success(false);
    let id = ItemId::from(3u64);

    let first = toggles.begin(&id).unwrap();
    let second = toggles.begin(&id).unwrap();
    assert!(first.next);
    assert_eq!((second.previous, second.next), (true, false));
    assert_eq!(toggles.pending_count(&id), 2);
    toggles
        .settle(second, Err(ClientError::invalid("no")))
        .await
        .unwrap_err();
    // first is still out, so its value stays on screen
    assert!(trending(&list, 3));
    assert!(toggles.is_pending(&id));

    toggles
        .settle(first, Err(ClientError::invalid("no")))
        .await
        .unwrap_err();
    assert!(!trending(&list, 3));
    assert!(!toggles.is_pending(&id));
}

#[tokio::test]
async fn same_item_failures_in_issue_order_restore_confirmed_value() {
    let mock = MockClient::default();
    let (list, notifier) = loaded(&mock, json!([{ "id": 3, "is_trending": false }])).await;
    let toggles = ToggleController::new(list.clone()).refetch_on_success(false);
    let id = ItemId::from(3u64);

    let first = toggles.begin(&id).unwrap();
    let second = toggles.begin(&id).unwrap();
    assert!(second.seq > first.seq);

    toggles
        .settle(first, Err(ClientError::invalid("no")))
        .await
        .unwrap_err();
    // second is still out
    assert!(!trending(&list, 3));
    assert_eq!(toggles.pending_count(&id), 1);

    toggles
        .settle(second, Err(ClientError::invalid("no")))
        .await
        .unwrap_err();
    assert!(!trending(&list, 3));
    assert!(!toggles.is_pending(&id));
    assert_eq!(notifier.take().len(), 2);
}

#[tokio::test]
async fn older_success_is_kept_when_newer_toggle_fails() {
    let mock = MockClient::default();
    let (list, _notifier) = loaded(&mock, json!([{ "id": 3, "is_trending": false }])).await;
    let toggles = ToggleController::new(list.clone()).refetch_on_success(false);
    let id = ItemId::from(3u64);

    let first = toggles.begin(&id).unwrap();
    let second = toggles.begin(&id).unwrap();
    toggles.settle(first, Ok(Value::Null)).await.unwrap();
    toggles
        .settle(second, Err(ClientError::invalid("no")))
        .await
        .unwrap_err();
    assert!(trending(&list, 3));
    assert!(!toggles.is_pending(&id));

    // a fresh toggle starts from what is shown
    let third = toggles.begin(&id).unwrap();
    assert_eq!((third.previous, third.next), (true, false));
}

#[tokio::test]
async fn missing_token_flips_nothing() {
    let mock = MockClient::default();
    let notifier = MemoryNotifier::default();
    let list = Arc::new(ListController::new(
        client(&mock).resource(&TRENDING_NEWS),
        StaticToken::default(),
        notifier.clone(),
    ));
    list.with_items_mut(|items| {
        *items = serde_json::from_value(json!([{ "id": 1, "is_trending": false }])).unwrap()
    });

    let toggles = ToggleController::new(list.clone());
    let err = toggles.toggle(&ItemId::from(1u64)).await.unwrap_err();
    assert!(matches!(
        err,
        ToggleError::Client(ClientError::Auth(AuthError::NotAuthenticated))
    ));
    assert!(!trending(&list, 1));
    assert_eq!(notifier.take(), vec![Notification::error("Update trending failed")]);
    assert_eq!(mock.request_count().await, 0);
}

#[tokio::test]
async fn unknown_item_and_flagless_collection() {
    let mock = MockClient::default();
    let (list, notifier) = loaded(&mock, json!([{ "id": 1, "is_trending": false }])).await;
    let toggles = ToggleController::new(list);
    assert!(matches!(
        toggles.toggle(&ItemId::from(99u64)).await,
        Err(ToggleError::UnknownItem(_))
    ));
    assert_eq!(mock.request_count().await, 0);
    assert!(notifier.snapshot().is_empty());

    let news = Arc::new(ListController::new(
        client(&mock).resource(&NEWS),
        StaticToken::new("t"),
        MemoryNotifier::default(),
    ));
    let err = ToggleController::new(news)
        .begin(&ItemId::from(1u64))
        .unwrap_err();
    assert!(matches!(err, ToggleError::NoFlag(label) if label == "news"));
}
