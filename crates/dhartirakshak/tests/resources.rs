mod common;

use chrono::NaiveDate;
use common::{MockClient, body_json, client, form_fields, form_text};
use dhartirakshak::resource::drafts::{
    AdvertisementDraft, EpaperDraft, ResearchSubmission, TrendingDraft,
};
use dhartirakshak::resource::settings::{BusinessSettings, SettingKey};
use dhartirakshak::resource::{BANNERS, TRENDING_NEWS};
use dhartirakshak_common::{ClientError, FilePart, ItemId, MultipartForm};
use http::Method;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::json;

fn jpg(name: &str) -> FilePart {
    FilePart::new(name, "image/jpeg", &b"\xff\xd8\xff"[..])
}

#[tokio::test]
async fn trending_update_overrides_method_and_filters_fields() {
    let mock = MockClient::default();
    let trending = client(&mock).trending_news();
    mock.push_json(200, json!({ "data": { "id": 5 } })).await;

    let form = MultipartForm::new()
        .text("title", "Locust alert")
        .text("heading", "ignored")
        .text("is_trending", "1")
        .text("description", "Swarms sighted near Jaisalmer")
        .file("image", jpg("locust.jpg"));
    trending.update("tok", &ItemId::from(5u64), form).await.unwrap();

    let log = mock.take_log().await;
    let req = &log[0];
    assert_eq!(req.method(), Method::POST);
    assert_eq!(req.uri().path(), "/api/admin/trending-news/5");
    assert_eq!(form_fields(req), ["title", "description", "image", "_method"]);
    assert_eq!(form_text(req, "_method").as_deref(), Some("PUT"));
    assert!(
        req.headers()
            .get(CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("multipart/form-data; boundary=")
    );
}

#[tokio::test]
async fn trending_update_from_draft_requires_title() {
    let mock = MockClient::default();
    let trending = client(&mock).trending_news();
    let err = trending
        .update_from("tok", &ItemId::from(5u64), TrendingDraft::new().build())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Title is required");
    assert_eq!(mock.request_count().await, 0);

    mock.push_json(200, json!({})).await;
    let draft = TrendingDraft::new().title("Updated").build();
    trending
        .update_from("tok", &ItemId::from(5u64), draft)
        .await
        .unwrap();
    // unset fields are left out entirely
    assert_eq!(
        form_fields(&mock.take_log().await[0]),
        ["title", "_method"]
    );
}

#[tokio::test]
async fn update_styles_per_collection() {
    let mock = MockClient::default();
    let c = client(&mock);
    mock.push_json(200, json!({})).await;
    mock.push_json(200, json!({})).await;

    c.news()
        .update("tok", &ItemId::from(2u64), MultipartForm::new().text("title", "t"))
        .await
        .unwrap();
    let draft = AdvertisementDraft::new()
        .title("Tractor sale")
        .company("Kisan Motors")
        .start_date(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())
        .build();
    c.advertisements()
        .update_from("tok", &ItemId::from(3u64), draft)
        .await
        .unwrap();

    let log = mock.take_log().await;
    assert_eq!(log[0].method(), Method::PUT);
    assert_eq!(log[0].uri().path(), "/api/admin/newsagriculture/2");
    assert_eq!(log[1].method(), Method::POST);
    assert_eq!(log[1].uri().path(), "/api/admin/advertisement/update/3");
    assert_eq!(form_text(&log[1], "start_date").as_deref(), Some("2025-06-01"));
    assert_eq!(form_text(&log[1], "end_date"), None);

    let err = c
        .banners()
        .update("tok", &ItemId::from(1u64), MultipartForm::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidInput(_)));
    assert_eq!(mock.request_count().await, 0);
}

#[tokio::test]
async fn actions_post_empty_json_with_bearer() {
    let mock = MockClient::default();
    let banners = client(&mock).resource(&BANNERS);
    mock.push_json(200, json!({ "message": "Banner activated" })).await;
    banners.activate("admin-tok", &ItemId::from("12")).await.unwrap();

    let req = &mock.take_log().await[0];
    assert_eq!(req.uri().to_string(), "https://api.test/api/admin/banner/12/activate");
    assert_eq!(req.headers().get(AUTHORIZATION).unwrap(), "Bearer admin-tok");
    assert_eq!(req.headers().get(CONTENT_TYPE).unwrap(), "application/json");
    assert_eq!(body_json(req), json!({}));

    let trending = client(&mock).resource(&TRENDING_NEWS);
    assert!(trending.approve("t", &ItemId::from(1u64)).await.is_err());
    assert_eq!(mock.request_count().await, 0);
}

#[tokio::test]
async fn category_create_sends_json_name() {
    let mock = MockClient::default();
    mock.push_json(201, json!({ "data": { "id": 3, "category": "Seeds" } }))
        .await;
    let created = client(&mock).create_category("tok", " Seeds ").await.unwrap();
    assert_eq!(created["category"], "Seeds");

    let req = &mock.take_log().await[0];
    assert_eq!(req.uri().path(), "/api/admin/category");
    assert_eq!(body_json(req), json!({ "category": "Seeds" }));
}

#[tokio::test]
async fn epaper_upload_needs_pdf_and_date() {
    let mock = MockClient::default();
    let epapers = client(&mock).epapers();
    let date = NaiveDate::from_ymd_opt(2025, 1, 26).unwrap();

    let err = epapers
        .create_from("tok", EpaperDraft::new().publish_date(date).build())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "PDF and publish date are required");

    mock.push_json(201, json!({})).await;
    let pdf = FilePart::new("issue.pdf", "application/pdf", &b"%PDF-1.7"[..]);
    epapers
        .create_from("tok", EpaperDraft::new().pdf(pdf).publish_date(date).build())
        .await
        .unwrap();
    let req = &mock.take_log().await[0];
    assert_eq!(form_text(req, "publish_date").as_deref(), Some("2025-01-26"));
    assert!(common::body_str(req).contains("filename=\"issue.pdf\""));
}

#[tokio::test]
async fn research_submission_is_public_with_optional_bearer() {
    let mock = MockClient::default();
    let public = client(&mock).public();

    let err = public
        .submit_research(None, ResearchSubmission::new().build())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Title is required");

    mock.push_json(201, json!({ "data": { "id": 40, "status": "pending" } }))
        .await;
    mock.push_json(201, json!({})).await;
    let submission = ResearchSubmission::new()
        .title("Neem extract trials")
        .kind("pest-control")
        .images(vec![jpg("a.jpg"), jpg("b.jpg")])
        .build();
    let created = public
        .submit_research(None, submission.clone())
        .await
        .unwrap();
    assert_eq!(created["status"], "pending");
    public
        .submit_research(Some("user-tok"), submission)
        .await
        .unwrap();

    let log = mock.take_log().await;
    assert_eq!(log[0].uri().path(), "/api/researches");
    assert!(log[0].headers().get(AUTHORIZATION).is_none());
    assert_eq!(
        form_fields(&log[0]),
        ["title", "description", "type", "images[1]", "images[2]"]
    );
    assert_eq!(form_text(&log[0], "description").as_deref(), Some(""));
    assert_eq!(log[1].headers().get(AUTHORIZATION).unwrap(), "Bearer user-tok");
}

#[tokio::test]
async fn public_reads_normalize_shapes() {
    let mock = MockClient::default();
    let public = client(&mock).public();
    mock.push_json(
        200,
        json!({ "data": [
            { "id": 1, "description": "Wheat MSP raised" },
            { "id": 2, "title": "no headline fields but title" },
            { "id": 3, "headline": "Rain expected in Malwa" }
        ] }),
    )
    .await;
    mock.push_json(
        200,
        json!([{ "category": "Seeds" }, { "name": "Dairy" }, { "title": "" }]),
    )
    .await;

    assert_eq!(
        public.ticker().await.unwrap(),
        ["Wheat MSP raised", "Rain expected in Malwa"]
    );
    assert_eq!(public.category_names().await.unwrap(), ["Seeds", "Dairy"]);

    mock.push_json(
        200,
        json!({ "data": [{ "id": 4, "title": "Kharif sowing", "image": "b4.jpg" }, "stray"] }),
    )
    .await;
    mock.push_json(200, json!({ "message": "no banners" })).await;
    let banners = public.banners().await.unwrap();
    assert_eq!(banners.len(), 1);
    assert_eq!(banners[0]["title"], "Kharif sowing");
    assert!(public.banners().await.unwrap().is_empty());

    let log = mock.take_log().await;
    assert_eq!(log[0].uri().path(), "/api/trending-news-only");
    assert_eq!(log[1].uri().path(), "/api/category");
    assert_eq!(log[2].uri().path(), "/api/banners");
    assert!(log.iter().all(|r| r.headers().get(AUTHORIZATION).is_none()));
}

#[tokio::test]
async fn settings_save_and_load() {
    let mock = MockClient::default();
    let settings = client(&mock).settings();
    mock.push_json(200, json!({ "message": "saved" })).await;
    mock.push_json(
        200,
        json!({ "data": [
            { "key": "google_maps", "value": { "api_key": "maps-key" } },
            { "key": "payment_keys", "value": { "razorpay_key_id": "rzp_id", "razorpay_key_secret": "rzp_secret" } },
            { "key": "weather_api", "value": { "api_key": "owm-key" } }
        ] }),
    )
    .await;

    let edited = BusinessSettings {
        weather_api_key: "owm-key".into(),
        ..Default::default()
    };
    settings
        .save_known("tok", SettingKey::WeatherApi, &edited)
        .await
        .unwrap();
    let loaded = settings.load("tok").await.unwrap();
    assert_eq!(loaded.google_maps_key, "maps-key");
    assert_eq!(loaded.razorpay_key_secret, "rzp_secret");
    assert_eq!(loaded.weather_key(), Some("owm-key"));

    let log = mock.take_log().await;
    assert_eq!(log[0].method(), Method::POST);
    assert_eq!(
        body_json(&log[0]),
        json!({ "key": "weather_api", "value": { "api_key": "owm-key" } })
    );
    assert_eq!(log[1].method(), Method::GET);
    assert_eq!(log[0].uri().path(), log[1].uri().path());

    let err = settings.save("tok", " ", json!(1)).await.unwrap_err();
    assert_eq!(err.to_string(), "Setting key is required");
}
